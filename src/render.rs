//! Paints the active buffer into a character grid.
//!
//! The renderer stacks cards from the top of the viewport, reserving for
//! each status exactly the height the layout engine measured, and stopping
//! at the first card that no longer fits. Everything goes through the
//! `Surface` trait so the same pass drives the real terminal and the test
//! grids.

use ratatui::style::{Color, Modifier, Style};

use crate::buffer::Buffer;
use crate::config::UiConfig;
use crate::feed::FeedKind;
use crate::layout::{layout_card, WordKind};
use crate::status::Status;
use crate::store::BufferStore;

/// Screen column where every card starts.
const CARD_X: usize = 2;

/// Column offset of the header text within a card.
const HEADER_X: usize = 3;

/// Width reserved on the right edge for the activity bar.
const ACTIVITY_BAR_WIDTH: usize = 23;

const HELP_TEXT: &str =
    "help:? up:k down:j refresh:u open:o clear:C home:h mentions:m quit:q";

/// Minimal drawing surface the renderer needs. Implemented for ratatui's
/// `Buffer` and by plain grids in tests.
pub trait Surface {
    /// (height, width) in character cells.
    fn dimensions(&self) -> (usize, usize);
    fn clear(&mut self);
    /// Write `text` starting at (row, col), clipped at the right edge.
    fn write(&mut self, row: usize, col: usize, text: &str, style: Style);
}

impl Surface for ratatui::buffer::Buffer {
    fn dimensions(&self) -> (usize, usize) {
        (self.area.height as usize, self.area.width as usize)
    }

    fn clear(&mut self) {
        self.reset();
    }

    fn write(&mut self, row: usize, col: usize, text: &str, style: Style) {
        let (height, width) = self.dimensions();
        if row >= height || col >= width {
            return;
        }
        self.set_stringn(
            self.area.x + col as u16,
            self.area.y + row as u16,
            text,
            width - col,
            style,
        );
    }
}

/// Transient banner shown at the top of the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub text: String,
    pub level: FlashLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Info,
    Warning,
}

impl Flash {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: FlashLevel::Info,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: FlashLevel::Warning,
        }
    }
}

/// Symbolic style names resolved to concrete styles.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub current_header: Style,
    pub text: Style,
    pub hashtag: Style,
    pub mention: Style,
    pub self_mention: Style,
    pub warning: Style,
    pub info: Style,
    pub unread: Style,
    pub read: Style,
    pub current_tab: Style,
    pub other_tab: Style,
    pub border: Style,
}

impl Theme {
    pub fn named(name: &str) -> Self {
        match name {
            "mono" => Self::mono(),
            _ => Self::default(),
        }
    }

    /// Styles that survive monochrome terminals.
    fn mono() -> Self {
        let plain = Style::default();
        Self {
            header: plain,
            current_header: plain.add_modifier(Modifier::REVERSED),
            text: plain,
            hashtag: plain.add_modifier(Modifier::BOLD),
            mention: plain.add_modifier(Modifier::UNDERLINED),
            self_mention: plain.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            warning: plain.add_modifier(Modifier::REVERSED),
            info: plain,
            unread: plain.add_modifier(Modifier::BOLD),
            read: plain,
            current_tab: plain.add_modifier(Modifier::REVERSED),
            other_tab: plain,
            border: plain,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header: Style::default().fg(Color::Cyan),
            current_header: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            text: Style::default(),
            hashtag: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            mention: Style::default().fg(Color::Blue),
            self_mention: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            warning: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            info: Style::default().fg(Color::Blue),
            unread: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            read: Style::default().fg(Color::DarkGray),
            current_tab: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            other_tab: Style::default(),
            border: Style::default().fg(Color::DarkGray),
        }
    }
}

pub struct Renderer<'a> {
    theme: &'a Theme,
    ui: &'a UiConfig,
    own_handle: &'a str,
}

impl<'a> Renderer<'a> {
    pub fn new(theme: &'a Theme, ui: &'a UiConfig, own_handle: &'a str) -> Self {
        Self {
            theme,
            ui,
            own_handle,
        }
    }

    /// Full render of the active buffer. Displaying a feed advances its
    /// read watermark. If the cursor ended up below the painted window it
    /// is clamped back and the pass re-runs exactly once.
    pub fn render(&self, surface: &mut dyn Surface, store: &mut BufferStore, flash: Option<&Flash>) {
        store.active_mut().mark_read();
        self.paint_cards(surface, store.active_mut());
        if store.active().current() > store.active().last() {
            store.active_mut().clamp_to_last();
            self.paint_cards(surface, store.active_mut());
        }
        if self.ui.activities {
            self.paint_activity_bar(surface, store);
        }
        if self.ui.help_bar {
            self.paint_help_bar(surface);
        }
        if let Some(flash) = flash {
            self.paint_flash(surface, flash);
        }
    }

    /// One pass over the card stack, top to bottom, starting at the scroll
    /// window. Records the bottom-most index that fit.
    fn paint_cards(&self, surface: &mut dyn Surface, buffer: &mut Buffer) {
        surface.clear();
        let (height, width) = surface.dimensions();
        let usable = width.saturating_sub(4);
        let mut paint_y = 1usize;
        let mut last_painted = None;

        for index in buffer.first()..buffer.len() {
            let status = &buffer.statuses()[index];
            let layout = layout_card(status.display_text(), usable, self.own_handle);
            let card_height = layout.height();
            if paint_y + card_height + 1 > height {
                break;
            }

            if self.ui.tweet_border {
                self.paint_border(surface, paint_y, usable, card_height);
            }

            let header_style = if index == buffer.current() {
                self.theme.current_header
            } else {
                self.theme.header
            };
            surface.write(paint_y, CARD_X + HEADER_X, &self.header_for(status), header_style);

            for word in &layout.words {
                let style = match word.kind {
                    WordKind::Text => self.theme.text,
                    WordKind::Hashtag => self.theme.hashtag,
                    WordKind::Mention => self.theme.mention,
                    WordKind::SelfMention => self.theme.self_mention,
                };
                surface.write(paint_y + word.row, CARD_X + word.col, &word.text, style);
            }

            paint_y += if self.ui.compress {
                card_height - 1
            } else {
                card_height
            };
            last_painted = Some(index);
        }

        if let Some(index) = last_painted {
            buffer.set_last(index);
        }
    }

    fn header_for(&self, status: &Status) -> String {
        let time = status.time_label(self.ui.relative_time);
        match status.repost() {
            Some(repost) if self.ui.retweet_by => {
                format!(" {} ({}) RT by {} ", repost.origin, time, status.author)
            }
            _ => format!(" {} ({}) ", status.author, time),
        }
    }

    fn paint_border(&self, surface: &mut dyn Surface, top: usize, width: usize, height: usize) {
        if width < 2 || height < 2 {
            return;
        }
        let horizontal = "─".repeat(width - 2);
        surface.write(top, CARD_X, &format!("┌{horizontal}┐"), self.theme.border);
        for row in 1..height - 1 {
            surface.write(top + row, CARD_X, "│", self.theme.border);
            surface.write(top + row, CARD_X + width - 1, "│", self.theme.border);
        }
        surface.write(
            top + height - 1,
            CARD_X,
            &format!("└{horizontal}┘"),
            self.theme.border,
        );
    }

    fn paint_activity_bar(&self, surface: &mut dyn Surface, store: &BufferStore) {
        let (_, width) = surface.dimensions();
        let mut col = width.saturating_sub(ACTIVITY_BAR_WIDTH);
        for kind in FeedKind::ORDER {
            let tab_style = if kind == store.active_kind() {
                self.theme.current_tab
            } else {
                self.theme.other_tab
            };
            let letter = kind.tab_letter();
            surface.write(0, col, letter, tab_style);
            col += letter.len();

            if kind.counts_unread() {
                let unread = store.buffer(kind).unread();
                let counter_style = if unread == 0 {
                    self.theme.read
                } else {
                    self.theme.unread
                };
                let counter = format!(":{unread} ");
                surface.write(0, col, &counter, counter_style);
                col += counter.len();
            }
        }
    }

    fn paint_help_bar(&self, surface: &mut dyn Surface) {
        let (height, width) = surface.dimensions();
        if height == 0 {
            return;
        }
        let max = width.saturating_sub(4);
        let text: String = HELP_TEXT.chars().take(max).collect();
        surface.write(height - 1, CARD_X, &text, self.theme.text);
    }

    fn paint_flash(&self, surface: &mut dyn Surface, flash: &Flash) {
        let style = match flash.level {
            FlashLevel::Info => self.theme.info,
            FlashLevel::Warning => self.theme.warning,
        };
        surface.write(0, 3, &format!(" {} ", flash.text), style);
    }
}
