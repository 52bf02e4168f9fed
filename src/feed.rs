use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::status::Status;

/// The six feeds a session always carries, in display and cycling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Home,
    Mentions,
    Direct,
    Search,
    User,
    Favorite,
}

impl FeedKind {
    pub const ORDER: [FeedKind; 6] = [
        FeedKind::Home,
        FeedKind::Mentions,
        FeedKind::Direct,
        FeedKind::Search,
        FeedKind::User,
        FeedKind::Favorite,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Home => 0,
            Self::Mentions => 1,
            Self::Direct => 2,
            Self::Search => 3,
            Self::User => 4,
            Self::Favorite => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Mentions => "mentions",
            Self::Direct => "direct",
            Self::Search => "search",
            Self::User => "user",
            Self::Favorite => "favorite",
        }
    }

    /// Letter shown in the activity bar.
    pub fn tab_letter(self) -> &'static str {
        match self {
            Self::Home => "H",
            Self::Mentions => "M",
            Self::Direct => "D",
            Self::Search => "S ",
            Self::User => "U ",
            Self::Favorite => "F",
        }
    }

    /// Only the push-style feeds show an unread counter.
    pub fn counts_unread(self) -> bool {
        matches!(self, Self::Home | Self::Mentions | Self::Direct)
    }
}

/// Query strings the query-driven feeds need before they can fetch.
#[derive(Debug, Clone, Default)]
pub struct FeedQueries {
    pub search: String,
    pub user: String,
}

/// A concrete fetch to perform. Search and user feeds carry their query;
/// building one with an empty query yields `None` and the refresh is
/// silently skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRequest {
    Home,
    Mentions,
    Direct,
    Favorite,
    Search(String),
    User(String),
}

impl FeedRequest {
    pub fn for_kind(kind: FeedKind, queries: &FeedQueries) -> Option<Self> {
        match kind {
            FeedKind::Home => Some(Self::Home),
            FeedKind::Mentions => Some(Self::Mentions),
            FeedKind::Direct => Some(Self::Direct),
            FeedKind::Favorite => Some(Self::Favorite),
            FeedKind::Search => {
                let query = queries.search.trim();
                (!query.is_empty()).then(|| Self::Search(query.to_string()))
            }
            FeedKind::User => {
                let handle = queries.user.trim();
                (!handle.is_empty()).then(|| Self::User(handle.to_string()))
            }
        }
    }

    pub fn kind(&self) -> FeedKind {
        match self {
            Self::Home => FeedKind::Home,
            Self::Mentions => FeedKind::Mentions,
            Self::Direct => FeedKind::Direct,
            Self::Favorite => FeedKind::Favorite,
            Self::Search(_) => FeedKind::Search,
            Self::User(_) => FeedKind::User,
        }
    }
}

/// Where statuses come from. One call per refresh per feed, newest-first.
/// Implementations should bound how long a fetch can take; the UI abandons
/// calls that outlive its configured timeout.
pub trait StatusSource: Send + Sync {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Status>>;
}

/// Offline source with deterministic content, so the binary runs without a
/// network. Each refresh grows the home feed by one status to exercise the
/// merge path.
pub struct SampleSource {
    round: AtomicU64,
}

const SAMPLE_HOME: &[(&str, &str)] = &[
    ("carol", "shipping the new release today #launch"),
    ("bob", "RT @dana: the migration guide is up https://example.com/guide"),
    ("dana", "anyone else seeing cold starts on the edge nodes?"),
    ("erin", "coffee first, merge conflicts second"),
    ("carol", "weekly sync moved to 14:00, same room"),
];

const SAMPLE_MENTIONS: &[(&str, &str)] = &[
    ("bob", "@you saw your patch, reviewing after lunch"),
    ("dana", "@you: the flaky test is yours I think"),
];

const SAMPLE_DIRECT: &[(&str, &str)] = &[("erin", "call me when you are out of the meeting")];

const SAMPLE_FAVORITE: &[(&str, &str)] =
    &[("dana", "profilers do not lie, assumptions do #perf")];

impl SampleSource {
    pub fn new() -> Self {
        Self {
            round: AtomicU64::new(0),
        }
    }

    fn batch(entries: &[(&str, &str)], base_id: u64) -> Vec<Status> {
        let now = Utc::now();
        entries
            .iter()
            .enumerate()
            .map(|(i, (author, text))| {
                let age = Duration::minutes(3 * (i as i64 + 1));
                Status::new(base_id - i as u64, *author, now - age, *text)
            })
            .collect()
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSource for SampleSource {
    fn fetch(&self, request: &FeedRequest) -> Result<Vec<Status>> {
        const HOME_BASE: u64 = 1_000;
        match request {
            FeedRequest::Home => {
                let round = self.round.fetch_add(1, Ordering::SeqCst);
                let mut batch = Self::batch(SAMPLE_HOME, HOME_BASE);
                for extra in 1..=round {
                    let status = Status::new(
                        HOME_BASE + extra,
                        "bot",
                        Utc::now(),
                        format!("refresh #{extra} brought this in"),
                    );
                    batch.insert(0, status);
                }
                Ok(batch)
            }
            FeedRequest::Mentions => Ok(Self::batch(SAMPLE_MENTIONS, 2_000)),
            FeedRequest::Direct => Ok(Self::batch(SAMPLE_DIRECT, 3_000)),
            FeedRequest::Favorite => Ok(Self::batch(SAMPLE_FAVORITE, 4_000)),
            FeedRequest::Search(query) => Ok(vec![Status::new(
                5_000,
                "search",
                Utc::now(),
                format!("results for \"{query}\" would appear here"),
            )]),
            FeedRequest::User(handle) => Ok(vec![Status::new(
                6_000,
                handle.clone(),
                Utc::now(),
                format!("latest statuses by @{handle}"),
            )]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_indexes_agree() {
        for (position, kind) in FeedKind::ORDER.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn search_request_requires_a_query() {
        let queries = FeedQueries::default();
        assert_eq!(FeedRequest::for_kind(FeedKind::Search, &queries), None);

        let queries = FeedQueries {
            search: "  rustlang  ".into(),
            ..Default::default()
        };
        assert_eq!(
            FeedRequest::for_kind(FeedKind::Search, &queries),
            Some(FeedRequest::Search("rustlang".into()))
        );
    }

    #[test]
    fn user_request_requires_a_handle() {
        let queries = FeedQueries::default();
        assert_eq!(FeedRequest::for_kind(FeedKind::User, &queries), None);

        let queries = FeedQueries {
            user: "dana".into(),
            ..Default::default()
        };
        assert_eq!(
            FeedRequest::for_kind(FeedKind::User, &queries),
            Some(FeedRequest::User("dana".into()))
        );
    }

    #[test]
    fn plain_feeds_always_build_a_request() {
        let queries = FeedQueries::default();
        for kind in [
            FeedKind::Home,
            FeedKind::Mentions,
            FeedKind::Direct,
            FeedKind::Favorite,
        ] {
            let request = FeedRequest::for_kind(kind, &queries).expect("request");
            assert_eq!(request.kind(), kind);
        }
    }

    #[test]
    fn sample_batches_are_newest_first() {
        let source = SampleSource::new();
        let batch = source.fetch(&FeedRequest::Home).expect("fetch");
        assert!(!batch.is_empty());
        for pair in batch.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn sample_home_grows_by_one_per_refresh() {
        let source = SampleSource::new();
        let first = source.fetch(&FeedRequest::Home).expect("fetch");
        let second = source.fetch(&FeedRequest::Home).expect("fetch");
        assert_eq!(second.len(), first.len() + 1);
        assert_eq!(second[1].id, first[0].id);
    }
}
