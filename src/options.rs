//! Reflow configuration.

use crate::terminal;

/// Default width of the extra indentation added to continuation rows in
/// [`WrapMode::Structured`].
pub const DEFAULT_CONTINUATION_INDENT: usize = 2;

/// How indentation is treated when a line wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// No special indentation handling.
    #[default]
    Plain,
    /// Continuation rows repeat the line's indentation plus one continuation
    /// unit. Used for syntax-highlighted JSON and other nested text.
    Structured,
    /// The line's leading whitespace is a fixed prefix on every produced row.
    /// Used for preformatted text.
    Pre,
}

/// Options for a reflow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReflowOptions {
    /// Target width in terminal cells. Zero disables wrapping.
    pub width: usize,
    /// Indentation policy.
    pub mode: WrapMode,
    /// Build the row/line mapping.
    pub mapping: bool,
    /// Extra columns given to continuation rows in [`WrapMode::Structured`].
    pub continuation_indent: usize,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            width: 0,
            mode: WrapMode::Plain,
            mapping: false,
            continuation_indent: DEFAULT_CONTINUATION_INDENT,
        }
    }
}

impl ReflowOptions {
    /// Create options for the given width, plain mode, no mapping.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Create options sized to the current terminal.
    #[must_use]
    pub fn for_terminal() -> Self {
        Self::new(terminal::terminal_width())
    }

    /// Set the target width.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the wrap mode.
    #[must_use]
    pub fn mode(mut self, mode: WrapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Request the row/line mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: bool) -> Self {
        self.mapping = mapping;
        self
    }

    /// Set the continuation unit used by [`WrapMode::Structured`].
    #[must_use]
    pub fn continuation_indent(mut self, columns: usize) -> Self {
        self.continuation_indent = columns;
        self
    }
}
