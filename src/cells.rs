//! Unicode character cell width calculations.
//!
//! This module measures how many terminal cells text occupies, handling wide
//! characters (CJK, emoji), zero-width marks and embedded escape sequences.
//!
//! Every 7-bit ASCII byte counts as one cell, including tab and other control
//! bytes, so text that [`classify`] puts on the fast path measures the same
//! whichever path is taken.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use crate::ansi::{ESC, escape_len};

bitflags! {
    /// What a piece of text contains beyond plain 7-bit ASCII.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Classification: u8 {
        /// At least one byte outside the 7-bit ASCII range.
        const NON_ASCII = 1 << 0;
        /// At least one `ESC` byte.
        const ESCAPE = 1 << 1;
    }
}

impl Classification {
    /// Whether each byte can be measured as exactly one cell.
    #[must_use]
    pub fn is_fast_path(self) -> bool {
        self.is_empty()
    }
}

/// Classify `text` for measurement.
#[must_use]
pub fn classify(text: &str) -> Classification {
    let mut class = Classification::empty();
    for &b in text.as_bytes() {
        if b == ESC {
            class |= Classification::ESCAPE;
        } else if !b.is_ascii() {
            class |= Classification::NON_ASCII;
        }
        if class.is_all() {
            break;
        }
    }
    class
}

/// Get the cell width of a single character.
///
/// ASCII is always 1 cell. CJK characters and most emoji are 2 cells.
/// Combining marks and non-ASCII control characters are 0 cells.
#[must_use]
pub fn char_width(c: char) -> usize {
    if c.is_ascii() { 1 } else { c.width().unwrap_or(0) }
}

/// Get the display width of `text`, skipping escape sequences.
#[must_use]
pub fn visible_width(text: &str) -> usize {
    measure(text, classify(text)).width
}

/// How much of a string fits within a column budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cut {
    /// Byte offset where the fitting part ends. Always a char boundary and
    /// never inside an escape sequence.
    pub end: usize,
    /// Display width of `text[..end]`.
    pub width: usize,
    /// Whether `text[..end]` holds anything other than escape sequences.
    pub visible: bool,
}

impl Cut {
    /// Width used for layout: a piece with visible symbols never measures
    /// less than one cell, even if it only holds zero-width marks.
    #[must_use]
    pub fn layout_width(&self) -> usize {
        if self.visible { self.width.max(1) } else { 0 }
    }
}

/// Measure the whole of `text`.
#[must_use]
pub fn measure(text: &str, class: Classification) -> Cut {
    cut_to_width(text, usize::MAX, false, class)
}

/// Split off the longest prefix of `text` that fits in `budget` cells.
///
/// Escape sequences are zero width and are taken whenever they come before
/// the first symbol that does not fit. Multi-byte characters are never split.
/// With `force`, the first visible symbol is taken even when it is wider than
/// the budget, so callers always make progress.
///
/// `class` must describe `text` (or a string containing it).
#[must_use]
pub fn cut_to_width(text: &str, budget: usize, force: bool, class: Classification) -> Cut {
    if class.is_fast_path() {
        let mut end = text.len().min(budget);
        if force && end == 0 && !text.is_empty() {
            end = 1;
        }
        return Cut {
            end,
            width: end,
            visible: end > 0,
        };
    }

    let bytes = text.as_bytes();
    let mut cut = Cut::default();
    let mut i = 0;
    while i < bytes.len() {
        let esc = escape_len(bytes, i);
        if esc > 0 {
            i += esc;
            cut.end = i;
            continue;
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        let width = char_width(c);
        let fits = cut.width.saturating_add(width) <= budget;
        if !fits && !(force && !cut.visible) {
            break;
        }
        cut.width += width;
        cut.visible = true;
        i += c.len_utf8();
        cut.end = i;
    }
    cut
}
