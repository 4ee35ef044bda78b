//! Multi-line reflow with an optional row/line mapping.
//!
//! Text is split into logical lines on `\n`, each line is wrapped on its own
//! (see [`crate::line`]), and the rows are joined back with `\n`. When the
//! mapping is requested, the result records which rows each logical line
//! produced so that the UI can translate cursor and selection positions
//! between the wrapped view and the original text.
//!
//! ```rust
//! use reflow::prelude::*;
//!
//! let options = ReflowOptions::new(7).with_mapping(true);
//! let wrapped = reflow_text("one two three\nfour", &options);
//!
//! assert_eq!(wrapped.text(), "one two\nthree\nfour");
//! assert_eq!(wrapped.span(0), Some(Span::new(0, 1)));
//! assert_eq!(wrapped.line_of_row(2), Some(1));
//! ```

use std::ops::RangeInclusive;

use crate::cancel::{CancelSignal, Cancelled, NeverCancel};
use crate::line::{Layout, wrap_body};
use crate::options::ReflowOptions;

/// The rows produced by one logical line, as inclusive row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// First row.
    pub start: usize,
    /// Last row (inclusive).
    pub end: usize,
}

impl Span {
    /// Create a span. Swaps the bounds if they are reversed.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        if start > end {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Number of rows in the span. Never zero.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether `row` belongs to this span.
    #[must_use]
    pub fn contains(&self, row: usize) -> bool {
        (self.start..=self.end).contains(&row)
    }

    /// The row indices covered by the span.
    #[must_use]
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Wrapped text plus, when requested, the row/line mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflowed {
    text: String,
    spans: Vec<Span>,
    row_origins: Vec<usize>,
}

impl Reflowed {
    /// Input returned as-is: each logical line is exactly one row.
    fn identity(text: &str, mapping: bool) -> Self {
        let (spans, row_origins) = if mapping {
            let lines = text.split('\n').count();
            ((0..lines).map(|i| Span::new(i, i)).collect(), (0..lines).collect())
        } else {
            (Vec::new(), Vec::new())
        };
        Self {
            text: text.to_owned(),
            spans,
            row_origins,
        }
    }

    /// The wrapped text, rows joined by `\n`.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Iterate over the rows.
    pub fn rows(&self) -> std::str::Split<'_, char> {
        self.text.split('\n')
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        if self.has_mapping() {
            self.row_origins.len()
        } else {
            self.rows().count()
        }
    }

    /// Whether the mapping was built.
    #[must_use]
    pub fn has_mapping(&self) -> bool {
        !self.row_origins.is_empty()
    }

    /// Rows per logical line. Empty without mapping.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Logical line of each row. Empty without mapping.
    #[must_use]
    pub fn row_origins(&self) -> &[usize] {
        &self.row_origins
    }

    /// Number of logical lines, if the mapping was built.
    #[must_use]
    pub fn line_count(&self) -> Option<usize> {
        self.has_mapping().then_some(self.spans.len())
    }

    /// The span of logical line `line`.
    #[must_use]
    pub fn span(&self, line: usize) -> Option<Span> {
        self.spans.get(line).copied()
    }

    /// The row indices produced by logical line `line`.
    #[must_use]
    pub fn rows_of_line(&self, line: usize) -> Option<RangeInclusive<usize>> {
        self.span(line).map(|span| span.rows())
    }

    /// The logical line that produced `row`.
    #[must_use]
    pub fn line_of_row(&self, row: usize) -> Option<usize> {
        self.row_origins.get(row).copied()
    }

    /// Take the wrapped text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Take the text, spans and row origins.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Span>, Vec<usize>) {
        (self.text, self.spans, self.row_origins)
    }
}

/// Wrap `text` to `options.width` columns.
///
/// `cancel` is polled before every logical line and while a line is being
/// wrapped.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires before the text is finished. No
/// partial output is returned.
pub fn reflow<C>(text: &str, options: &ReflowOptions, cancel: &C) -> Result<Reflowed, Cancelled>
where
    C: CancelSignal + ?Sized,
{
    cancel.checkpoint()?;
    if options.width == 0 {
        return Ok(Reflowed::identity(text, options.mapping));
    }

    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut spans = Vec::new();
    let mut row_origins = Vec::new();
    let mut emitted = 0usize;

    for (index, line) in text.split('\n').enumerate() {
        let (layout, body) = Layout::resolve(
            line,
            options.width,
            options.mode,
            options.continuation_indent,
        );
        let produced = cancel
            .checkpoint()
            .and_then(|()| {
                wrap_body(body, &layout, cancel, |row| {
                    if emitted > 0 {
                        out.push('\n');
                    }
                    out.push_str(row);
                    emitted += 1;
                })
            })
            .inspect_err(|_| log::debug!("reflow cancelled at line {index}"))?;

        if options.mapping {
            spans.push(Span::new(emitted - produced, emitted - 1));
            row_origins.extend(std::iter::repeat_n(index, produced));
        }
    }

    log::trace!(
        "reflowed {} bytes to {emitted} rows (width {}, {:?})",
        text.len(),
        options.width,
        options.mode
    );

    Ok(Reflowed {
        text: out,
        spans,
        row_origins,
    })
}

/// Wrap `text` without cancellation support.
#[must_use]
pub fn reflow_text(text: &str, options: &ReflowOptions) -> Reflowed {
    // NeverCancel cannot fail.
    reflow(text, options, &NeverCancel).unwrap_or_default()
}

/// Wrap raw bytes. Invalid UTF-8 becomes U+FFFD, one cell wide.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires before the text is finished.
pub fn reflow_bytes<C>(
    bytes: &[u8],
    options: &ReflowOptions,
    cancel: &C,
) -> Result<Reflowed, Cancelled>
where
    C: CancelSignal + ?Sized,
{
    reflow(&String::from_utf8_lossy(bytes), options, cancel)
}
