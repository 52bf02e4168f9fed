use chrono::{DateTime, Local, Utc};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

static REPOST_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^RT @(\w+):").expect("repost pattern is valid"));

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[A-Za-z0-9$\-_@.&+!*(),%/#?=~]+").expect("url pattern is valid")
});

/// One feed item. Immutable once fetched, except for the repost derivation
/// which is computed on first access and cached on the record.
#[derive(Debug, Clone)]
pub struct Status {
    /// Unique within a feed, monotonically comparable. Natural merge key.
    pub id: u64,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    /// Original text carried by the service for native reposts, when present.
    pub repost_source: Option<String>,
    repost: OnceCell<Option<Repost>>,
}

/// Derived repost information: who wrote the original, and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repost {
    pub origin: String,
    pub text: String,
}

impl Status {
    pub fn new(
        id: u64,
        author: impl Into<String>,
        created_at: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            author: author.into(),
            created_at,
            text: text.into(),
            repost_source: None,
            repost: OnceCell::new(),
        }
    }

    pub fn with_repost_source(mut self, source: impl Into<String>) -> Self {
        self.repost_source = Some(source.into());
        self
    }

    /// Repost derivation, computed once and cached.
    pub fn repost(&self) -> Option<&Repost> {
        self.repost
            .get_or_init(|| classify_repost(&self.text, self.repost_source.as_deref()))
            .as_ref()
    }

    pub fn is_repost(&self) -> bool {
        self.repost().is_some()
    }

    /// Text shown in the card body: the origin text for reposts, the raw
    /// text otherwise.
    pub fn display_text(&self) -> &str {
        match self.repost() {
            Some(repost) => &repost.text,
            None => &self.text,
        }
    }

    /// URLs found in the raw text, in order of appearance.
    pub fn urls(&self) -> Vec<&str> {
        URL_PATTERN
            .find_iter(&self.text)
            .map(|m| m.as_str())
            .collect()
    }

    /// Header timestamp, relative ("5m") or local wall clock ("14:03").
    pub fn time_label(&self, relative: bool) -> String {
        if relative {
            relative_label(Utc::now().signed_duration_since(self.created_at))
        } else {
            self.created_at
                .with_timezone(&Local)
                .format("%H:%M")
                .to_string()
        }
    }
}

fn classify_repost(text: &str, source: Option<&str>) -> Option<Repost> {
    let caps = REPOST_PATTERN.captures(text)?;
    let marker = caps.get(0)?;
    let origin = caps.get(1)?.as_str().to_string();
    let text = match source {
        Some(original) if !original.is_empty() => original.to_string(),
        _ => text[marker.end()..].to_string(),
    };
    Some(Repost { origin, text })
}

fn relative_label(elapsed: chrono::Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        "now".to_string()
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(text: &str) -> Status {
        Status::new(1, "alice", Utc::now(), text)
    }

    #[test]
    fn plain_status_is_not_a_repost() {
        let status = status("just a normal update");
        assert!(!status.is_repost());
        assert_eq!(status.display_text(), "just a normal update");
    }

    #[test]
    fn repost_marker_is_detected_and_origin_extracted() {
        let status = status("RT @bob: good morning everyone");
        let repost = status.repost().expect("repost detected");
        assert_eq!(repost.origin, "bob");
        assert_eq!(repost.text, " good morning everyone");
    }

    #[test]
    fn repost_prefers_nested_source_text() {
        let status = status("RT @bob: good mor...").with_repost_source("good morning everyone");
        let repost = status.repost().expect("repost detected");
        assert_eq!(repost.origin, "bob");
        assert_eq!(repost.text, "good morning everyone");
    }

    #[test]
    fn empty_nested_source_falls_back_to_marker_substring() {
        let status = status("RT @bob: hello").with_repost_source("");
        assert_eq!(status.repost().expect("repost").text, " hello");
    }

    #[test]
    fn marker_must_be_at_the_start() {
        let status = status("see RT @bob: hello");
        assert!(!status.is_repost());
    }

    #[test]
    fn marker_requires_word_handle_and_colon() {
        assert!(!status("RT @: hello").is_repost());
        assert!(!status("RT @bob hello").is_repost());
    }

    #[test]
    fn derivation_is_computed_once() {
        let status = status("RT @bob: hi");
        let first = status.repost().expect("repost").clone();
        let second = status.repost().expect("repost");
        assert_eq!(&first, second);
    }

    #[test]
    fn urls_are_extracted_in_order() {
        let status = status("read https://example.com/a then http://example.org");
        assert_eq!(
            status.urls(),
            vec!["https://example.com/a", "http://example.org"]
        );
    }

    #[test]
    fn no_urls_yields_empty_list() {
        assert!(status("nothing to open here").urls().is_empty());
    }

    #[test]
    fn relative_labels_scale_with_age() {
        assert_eq!(relative_label(chrono::Duration::seconds(12)), "now");
        assert_eq!(relative_label(chrono::Duration::seconds(180)), "3m");
        assert_eq!(relative_label(chrono::Duration::hours(5)), "5h");
        assert_eq!(relative_label(chrono::Duration::days(2)), "2d");
    }
}
