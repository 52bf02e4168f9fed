//! Greedy word-wrap layout for status cards.
//!
//! One routine computes both the height of a card and the exact (row, col)
//! of every word in it. The renderer paints from the same placement the
//! pagination measured, so a card can never occupy more or fewer rows on
//! screen than the space reserved for it.

use unicode_width::UnicodeWidthStr;

/// Column the first word of every row lands on.
const ROW_START: usize = 2;

/// Presentation class of a word. Never affects wrap math.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Text,
    Hashtag,
    Mention,
    SelfMention,
}

/// One word with its final position inside the card body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedWord {
    /// Body row, 1-based (row 0 is the card header).
    pub row: usize,
    /// Column within the card.
    pub col: usize,
    pub kind: WordKind,
    pub text: String,
}

/// Word placement and row count for one status at one width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLayout {
    /// Body rows used by the text. At least 1, even for empty text.
    pub rows: usize,
    pub words: Vec<PlacedWord>,
}

impl CardLayout {
    /// Rows the whole card consumes: body plus the header row and one row
    /// of bottom padding.
    pub fn height(&self) -> usize {
        self.rows + 2
    }
}

/// Lay out `text` into a card of usable width `width` (terminal width minus
/// the left/right margins). Embedded newlines count as spaces. Words are
/// never split: one wider than a full row is placed at the row start and
/// overflows.
pub fn layout_card(text: &str, width: usize, own_handle: &str) -> CardLayout {
    let normalized = text.replace('\n', " ");
    let limit = width.saturating_sub(2);
    let mut x = ROW_START;
    let mut row = 1;
    let mut words = Vec::new();

    for word in normalized.split(' ') {
        let w = word.width();
        if x + w > limit {
            row += 1;
            x = ROW_START;
        }
        if !word.is_empty() {
            words.push(PlacedWord {
                row,
                col: x,
                kind: classify(word, own_handle),
                text: word.to_string(),
            });
        }
        // Empty words (runs of spaces) still take their separator column.
        x += w + 1;
    }

    CardLayout { rows: row, words }
}

fn classify(word: &str, own_handle: &str) -> WordKind {
    if word.starts_with('#') {
        WordKind::Hashtag
    } else if word.starts_with('@') {
        let handle = &word[1..];
        let handle = handle.strip_suffix(':').unwrap_or(handle);
        if !own_handle.is_empty() && handle == own_handle {
            WordKind::SelfMention
        } else {
            WordKind::Mention
        }
    } else {
        WordKind::Text
    }
}
