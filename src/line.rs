//! Single-line wrapping.
//!
//! One logical line is split into alternating runs of whitespace and words,
//! then the runs are placed greedily onto rows no wider than the target
//! width. Words are only cut when they cannot fit on a row of their own.
//!
//! SGR sequences that have been emitted are tracked so that every
//! continuation row starts in the style that was active at the wrap point.

use std::borrow::Cow;

use crate::ansi::{ActiveStyle, ESC, escape_len, escapes};
use crate::cancel::{CancelSignal, Cancelled, NeverCancel};
use crate::cells::{Classification, Cut, classify, cut_to_width, measure};
use crate::options::{DEFAULT_CONTINUATION_INDENT, WrapMode};

/// Text written at the start of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Prefix<'a> {
    text: &'a str,
    /// Spaces written after `text`.
    pad: usize,
    /// Display width of `text` plus `pad`.
    width: usize,
}

/// Row geometry for one logical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout<'a> {
    width: usize,
    /// Written verbatim at the start of the first row.
    first: Prefix<'a>,
    /// Written verbatim at the start of each continuation row, before the
    /// continuation padding and the replayed active style.
    rest: Prefix<'a>,
}

impl<'a> Layout<'a> {
    /// Work out the prefixes for `line` and return the part of the line that
    /// still has to be wrapped.
    pub(crate) fn resolve(
        line: &'a str,
        width: usize,
        mode: WrapMode,
        continuation_indent: usize,
    ) -> (Self, &'a str) {
        let plain = Self {
            width,
            first: Prefix::default(),
            rest: Prefix::default(),
        };
        match mode {
            WrapMode::Plain => (plain, line),
            WrapMode::Structured => {
                let (end, indent) = indentation(line);
                if indent >= width {
                    return (plain, line);
                }
                let pad = if indent.saturating_add(continuation_indent) < width {
                    continuation_indent
                } else {
                    0
                };
                let rest = Prefix {
                    text: &line[..end],
                    pad,
                    width: indent + pad,
                };
                (Self { rest, ..plain }, line)
            }
            WrapMode::Pre => {
                let (end, indent) = indentation(line);
                if end == 0 || indent >= width {
                    return (plain, line);
                }
                let prefix = Prefix {
                    text: &line[..end],
                    pad: 0,
                    width: indent,
                };
                (
                    Self {
                        width,
                        first: prefix,
                        rest: prefix,
                    },
                    &line[end..],
                )
            }
        }
    }

    /// Columns available to content on a continuation row.
    fn usable(&self) -> usize {
        self.width.saturating_sub(self.rest.width).max(1)
    }
}

/// Byte length and display width of the leading whitespace of `line`,
/// including escape sequences mixed into it.
fn indentation(line: &str) -> (usize, usize) {
    let bytes = line.as_bytes();
    let (mut end, mut width) = (0, 0);
    while end < bytes.len() {
        match bytes[end] {
            b' ' | b'\t' => {
                end += 1;
                width += 1;
            }
            ESC => match escape_len(bytes, end) {
                0 => break,
                len => end += len,
            },
            _ => break,
        }
    }
    (end, width)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Space,
    Word,
}

/// Alternating whitespace and word runs. Escape sequences join the run they
/// appear in and never start a new one.
struct Tokens<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (TokenKind, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return None;
        }
        let mut kind = None;
        let mut i = start;
        while i < bytes.len() {
            let esc = escape_len(bytes, i);
            if esc > 0 {
                i += esc;
                continue;
            }
            // Continuation bytes of a multi-byte char are never whitespace,
            // so runs only break on char boundaries.
            let here = if matches!(bytes[i], b' ' | b'\t') {
                TokenKind::Space
            } else {
                TokenKind::Word
            };
            match kind {
                None => kind = Some(here),
                Some(current) if current != here => break,
                Some(_) => {}
            }
            i += 1;
        }
        self.pos = i;
        Some((kind.unwrap_or(TokenKind::Word), &self.text[start..i]))
    }
}

/// Working state for one logical line.
struct LineWrap<'l, 'a> {
    layout: &'l Layout<'a>,
    class: Classification,
    /// Row under construction, prefix included.
    row: String,
    row_width: usize,
    /// Length and width of the row before any content was placed on it.
    seed_len: usize,
    seed_width: usize,
    active: ActiveStyle,
    /// A word has been placed on the current row.
    has_content: bool,
    rows: usize,
}

impl<'l, 'a> LineWrap<'l, 'a> {
    fn new(layout: &'l Layout<'a>, class: Classification) -> Self {
        let mut row = String::with_capacity(layout.width + layout.first.text.len());
        row.push_str(layout.first.text);
        let mut active = ActiveStyle::new();
        active.observe(layout.first.text);
        Self {
            layout,
            class,
            seed_len: row.len(),
            row,
            row_width: layout.first.width,
            seed_width: layout.first.width,
            active,
            has_content: false,
            rows: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.layout.width.saturating_sub(self.row_width)
    }

    fn push(&mut self, piece: &str, width: usize, content: bool) {
        self.row.push_str(piece);
        self.row_width += width;
        self.has_content |= content;
        if !self.class.is_fast_path() {
            self.active.observe(piece);
        }
    }

    /// Keep only the escape sequences of a run whose text is dropped.
    fn push_escapes(&mut self, piece: &str) {
        if self.class.is_fast_path() {
            return;
        }
        for seq in escapes(piece) {
            self.row.push_str(seq);
            self.active.apply(seq);
        }
    }

    /// Drop preserved indentation from the current row, keeping its escapes.
    fn rollback(&mut self) {
        let dropped = self.row.split_off(self.seed_len);
        self.row_width = self.seed_width;
        for seq in escapes(&dropped) {
            self.row.push_str(seq);
        }
    }

    fn emit_row(&mut self, emit: &mut impl FnMut(&str)) {
        if self.class.is_fast_path() {
            emit(self.row.trim_end_matches(' '));
        } else {
            emit(&trim_row_end(&self.row));
        }
        self.rows += 1;
    }

    fn start_continuation(&mut self) {
        let rest = self.layout.rest;
        self.row.clear();
        self.row.push_str(rest.text);
        self.row.extend(std::iter::repeat_n(' ', rest.pad));
        self.row.push_str(self.active.as_str());
        self.seed_len = self.row.len();
        self.row_width = rest.width;
        self.seed_width = rest.width;
        self.has_content = false;
    }

    fn flush(&mut self, emit: &mut impl FnMut(&str)) {
        self.emit_row(emit);
        self.start_continuation();
    }

    fn place_space(&mut self, token: &str, emit: &mut impl FnMut(&str)) {
        let width = measure(token, self.class).layout_width();
        let fits = width <= self.remaining();
        // Only the first row keeps the line's own leading whitespace.
        if !self.has_content && (self.rows > 0 || !fits) {
            self.push_escapes(token);
            return;
        }
        if fits {
            self.push(token, width, false);
            return;
        }
        self.push_escapes(token);
        self.flush(emit);
    }

    fn place_word<C>(
        &mut self,
        token: &str,
        cancel: &C,
        emit: &mut impl FnMut(&str),
    ) -> Result<(), Cancelled>
    where
        C: CancelSignal + ?Sized,
    {
        let remaining = self.remaining();
        let cut = cut_to_width(token, remaining, false, self.class);
        if cut.end == token.len() && cut.layout_width() <= remaining {
            self.push(token, cut.layout_width(), cut.visible);
            return Ok(());
        }

        // Indentation is dropped only when keeping it would leave an
        // indentation-only row: the token fits a row of its own, or not even
        // its first symbol fits beside the indentation.
        if !self.has_content
            && self.row_width > self.seed_width
            && (!cut.visible || self.fit_on_fresh_row(token).is_some())
        {
            self.rollback();
            return self.place_word(token, cancel, emit);
        }

        if self.has_content
            && let Some(cut) = self.fit_on_fresh_row(token)
        {
            self.flush(emit);
            self.push(token, cut.layout_width(), cut.visible);
            return Ok(());
        }

        self.split_long(token, cancel, emit)
    }

    fn fit_on_fresh_row(&self, token: &str) -> Option<Cut> {
        let usable = self.layout.usable();
        let cut = cut_to_width(token, usable, false, self.class);
        (cut.end == token.len() && cut.layout_width() <= usable).then_some(cut)
    }

    /// Fill the current row with the start of `token`, then emit full rows
    /// until the rest fits.
    fn split_long<C>(
        &mut self,
        token: &str,
        cancel: &C,
        emit: &mut impl FnMut(&str),
    ) -> Result<(), Cancelled>
    where
        C: CancelSignal + ?Sized,
    {
        let mut rest = token;
        loop {
            cancel.checkpoint()?;
            // An empty row always takes at least one symbol.
            let cut = cut_to_width(rest, self.remaining(), !self.has_content, self.class);
            let (piece, tail) = rest.split_at(cut.end);
            if !piece.is_empty() {
                self.push(piece, cut.layout_width(), cut.visible);
            }
            if tail.is_empty() {
                return Ok(());
            }
            rest = tail;
            self.flush(emit);
        }
    }

    fn finish(mut self, emit: &mut impl FnMut(&str)) -> usize {
        if self.has_content || self.rows == 0 {
            self.emit_row(emit);
        }
        self.rows
    }
}

/// Remove the spaces after the last visible symbol of `row`. Escape
/// sequences among those spaces are kept.
fn trim_row_end(row: &str) -> Cow<'_, str> {
    let bytes = row.as_bytes();
    let mut content_end = 0;
    let mut i = 0;
    while i < bytes.len() {
        let len = escape_len(bytes, i);
        if len > 0 {
            i += len;
            continue;
        }
        if bytes[i] != b' ' {
            content_end = i + 1;
        }
        i += 1;
    }
    let tail = &row[content_end..];
    if !tail.as_bytes().contains(&b' ') {
        return Cow::Borrowed(row);
    }
    let mut trimmed = String::with_capacity(row.len());
    trimmed.push_str(&row[..content_end]);
    trimmed.extend(escapes(tail));
    Cow::Owned(trimmed)
}

/// Wrap `body` using `layout`, handing each finished row to `emit`.
///
/// Returns the number of rows produced, which is always at least one.
pub(crate) fn wrap_body<C, F>(
    body: &str,
    layout: &Layout<'_>,
    cancel: &C,
    mut emit: F,
) -> Result<usize, Cancelled>
where
    C: CancelSignal + ?Sized,
    F: FnMut(&str),
{
    let mut state = LineWrap::new(layout, classify(body));
    for (kind, token) in Tokens::new(body) {
        cancel.checkpoint()?;
        match kind {
            TokenKind::Space => state.place_space(token, &mut emit),
            TokenKind::Word => state.place_word(token, cancel, &mut emit)?,
        }
    }
    Ok(state.finish(&mut emit))
}

/// Wrap one line that the caller has already isolated.
///
/// `line` is expected not to contain `\n`. A `width` of zero returns the
/// line unchanged. Structured mode uses the default continuation indent.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires before the line is finished.
pub fn reflow_line<C>(
    line: &str,
    width: usize,
    mode: WrapMode,
    cancel: &C,
) -> Result<Vec<String>, Cancelled>
where
    C: CancelSignal + ?Sized,
{
    cancel.checkpoint()?;
    if width == 0 {
        return Ok(vec![line.to_owned()]);
    }
    let (layout, body) = Layout::resolve(line, width, mode, DEFAULT_CONTINUATION_INDENT);
    let mut rows = Vec::new();
    wrap_body(body, &layout, cancel, |row| rows.push(row.to_owned()))?;
    Ok(rows)
}

/// Wrap one line without cancellation support.
#[must_use]
pub fn wrap_line(line: &str, width: usize, mode: WrapMode) -> Vec<String> {
    // NeverCancel cannot fail.
    reflow_line(line, width, mode, &NeverCancel).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::cancel::CancelToken;
    use crate::cells::visible_width;

    /// Cancels after a fixed number of polls.
    struct Countdown(Cell<usize>);

    impl CancelSignal for Countdown {
        fn is_cancelled(&self) -> bool {
            let left = self.0.get();
            if left == 0 {
                return true;
            }
            self.0.set(left - 1);
            false
        }
    }

    fn plain(line: &str, width: usize) -> Vec<String> {
        wrap_line(line, width, WrapMode::Plain)
    }

    #[test]
    fn test_wrap_greedy_words() {
        assert_eq!(plain("one two three four", 7), vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_wrap_fits_width() {
        assert_eq!(plain("hello world", 11), vec!["hello world"]);
        assert_eq!(plain("hello world", 80), vec!["hello world"]);
    }

    #[test]
    fn test_wrap_empty_line_yields_one_row() {
        assert_eq!(plain("", 5), vec![""]);
        assert_eq!(wrap_line("", 5, WrapMode::Pre), vec![""]);
        assert_eq!(wrap_line("", 5, WrapMode::Structured), vec![""]);
    }

    #[test]
    fn test_wrap_trims_trailing_spaces() {
        assert_eq!(plain("abc   ", 10), vec!["abc"]);
        assert_eq!(plain("   ", 10), vec![""]);
    }

    #[test]
    fn test_wrap_zero_width_returns_input() {
        assert_eq!(plain("one two three", 0), vec!["one two three"]);
    }

    #[test]
    fn test_wrap_drops_leading_space_on_continuation() {
        assert_eq!(plain("aaa   bbb", 4), vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_wrap_keeps_first_row_indentation() {
        assert_eq!(plain("  ab cd", 5), vec!["  ab", "cd"]);
    }

    #[test]
    fn test_wrap_discards_indentation_instead_of_indent_only_row() {
        assert_eq!(plain("      abcdef", 8), vec!["abcdef"]);
        assert_eq!(plain("          abc", 5), vec!["abc"]);
    }

    #[test]
    fn test_wrap_long_word_fills_indented_first_row() {
        assert_eq!(plain("  abcdefghijkl", 6), vec!["  abcd", "efghij", "kl"]);
    }

    #[test]
    fn test_structured_long_word_keeps_first_row_indentation() {
        let rows = wrap_line("  abcdefghijkl", 6, WrapMode::Structured);
        assert_eq!(rows, vec!["  abcd", "    ef", "    gh", "    ij", "    kl"]);
    }

    #[test]
    fn test_wrap_discards_indentation_that_leaves_no_room() {
        assert_eq!(plain("    abcdefgh", 4), vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_wrap_long_word_fills_current_row_first() {
        assert_eq!(plain("ab cdefghij", 4), vec!["ab c", "defg", "hij"]);
    }

    #[test]
    fn test_wrap_long_word_alone() {
        assert_eq!(plain("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_tabs_are_whitespace() {
        assert_eq!(plain("a\tb", 80), vec!["a\tb"]);
        assert_eq!(plain("aaa\tbbb", 3), vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_wrap_wide_chars_never_split() {
        assert_eq!(plain("日本語テキスト", 5), vec!["日本", "語テ", "キス", "ト"]);
    }

    #[test]
    fn test_wrap_symbol_wider_than_width_makes_progress() {
        assert_eq!(plain("日本", 1), vec!["日", "本"]);
    }

    #[test]
    fn test_wrap_combining_marks_stay_with_base() {
        let rows = plain("e\u{0301}e\u{0301}e\u{0301}", 2);
        assert_eq!(rows, vec!["e\u{0301}e\u{0301}", "e\u{0301}"]);
    }

    #[test]
    fn test_wrap_style_continues_on_split_token() {
        let line = format!("\x1b[0;31m{}\x1b[0m", "X".repeat(12));
        let rows = plain(&line, 5);
        assert_eq!(
            rows,
            vec![
                "\x1b[0;31mXXXXX",
                "\x1b[0;31mXXXXX",
                "\x1b[0;31mXX\x1b[0m",
            ]
        );
    }

    #[test]
    fn test_wrap_style_continues_across_words() {
        let rows = plain("\x1b[32mgreen words here\x1b[0m done", 11);
        assert_eq!(
            rows,
            vec!["\x1b[32mgreen words", "\x1b[32mhere\x1b[0m done"]
        );
    }

    #[test]
    fn test_wrap_reset_stops_replay() {
        let rows = plain("\x1b[31mred\x1b[0m plain text", 9);
        assert_eq!(rows, vec!["\x1b[31mred\x1b[0m plain", "text"]);
    }

    #[test]
    fn test_wrap_indexed_black_is_not_a_reset() {
        let rows = plain("\x1b[1m\x1b[38;5;0maaaa bbbb", 4);
        assert_eq!(rows, vec!["\x1b[1m\x1b[38;5;0maaaa", "\x1b[1m\x1b[38;5;0mbbbb"]);
    }

    #[test]
    fn test_wrap_escapes_in_dropped_whitespace_survive() {
        let rows = plain("aaaa \x1b[32mbbbb", 4);
        assert_eq!(rows, vec!["aaaa\x1b[32m", "\x1b[32mbbbb"]);
    }

    #[test]
    fn test_wrap_hyperlink_does_not_affect_style() {
        let line = "\x1b]8;;http://x\x1b\\link text\x1b]8;;\x1b\\";
        let rows = plain(line, 4);
        assert_eq!(rows, vec!["\x1b]8;;http://x\x1b\\link", "text\x1b]8;;\x1b\\"]);
    }

    #[test]
    fn test_wrap_escape_only_line() {
        assert_eq!(plain("\x1b[0m", 5), vec!["\x1b[0m"]);
    }

    #[test]
    fn test_wrap_unterminated_escape_is_text() {
        let rows = plain("\x1b[31", 2);
        assert_eq!(rows, vec!["\x1b[", "31"]);
    }

    #[test]
    fn test_pre_prefix_on_every_row() {
        let rows = wrap_line("    abc", 6, WrapMode::Pre);
        assert_eq!(rows, vec!["    ab", "    c"]);
        assert!(rows.iter().all(|row| row.trim() != ""));
    }

    #[test]
    fn test_pre_words() {
        let rows = wrap_line("  foo bar baz", 9, WrapMode::Pre);
        assert_eq!(rows, vec!["  foo bar", "  baz"]);
    }

    #[test]
    fn test_pre_indentation_too_wide_falls_back() {
        let rows = wrap_line("      ab", 4, WrapMode::Pre);
        assert_eq!(rows, vec!["ab"]);
    }

    #[test]
    fn test_pre_whitespace_only_line() {
        assert_eq!(wrap_line("   ", 10, WrapMode::Pre), vec![""]);
    }

    #[test]
    fn test_pre_styled_indentation_repeated_verbatim() {
        let rows = wrap_line("\x1b[2m  aaa bbb", 6, WrapMode::Pre);
        assert_eq!(rows, vec!["\x1b[2m  aaa", "\x1b[2m  \x1b[2mbbb"]);
    }

    #[test]
    fn test_pre_prefix_survives_reset_in_body() {
        let rows = wrap_line("\x1b[2m  aa\x1b[0m bb", 5, WrapMode::Pre);
        assert_eq!(rows, vec!["\x1b[2m  aa\x1b[0m", "\x1b[2m  bb"]);
    }

    #[test]
    fn test_structured_styled_indentation_repeated_verbatim() {
        let rows = wrap_line("\x1b[34m  abc defg", 8, WrapMode::Structured);
        assert_eq!(rows, vec!["\x1b[34m  abc", "\x1b[34m    \x1b[34mdefg"]);
    }

    #[test]
    fn test_structured_continuation_indent() {
        let rows = wrap_line("  alpha beta gamma", 12, WrapMode::Structured);
        assert_eq!(rows, vec!["  alpha beta", "    gamma"]);
    }

    #[test]
    fn test_structured_indent_without_room_for_unit() {
        let rows = wrap_line("   ab cd", 5, WrapMode::Structured);
        assert_eq!(rows, vec!["   ab", "   cd"]);
    }

    #[test]
    fn test_structured_indent_wider_than_width() {
        assert_eq!(wrap_line("        x", 4, WrapMode::Structured), vec!["x"]);
    }

    #[test]
    fn test_rows_respect_width() {
        let text = "The quick brown fox jumps over the lazy dog and keeps running";
        for width in 1..30 {
            for row in plain(text, width) {
                assert!(visible_width(&row) <= width, "{row:?} wider than {width}");
            }
        }
    }

    #[test]
    fn test_indentation() {
        assert_eq!(indentation("    x"), (4, 4));
        assert_eq!(indentation("\t x"), (2, 2));
        assert_eq!(indentation("\x1b[1m  x"), (6, 2));
        assert_eq!(indentation("x"), (0, 0));
        assert_eq!(indentation("\x1b[1"), (0, 0));
    }

    #[test]
    fn test_tokens_alternate() {
        let tokens: Vec<_> = Tokens::new("ab  cd\x1b[0m e").collect();
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "ab"),
                (TokenKind::Space, "  "),
                (TokenKind::Word, "cd\x1b[0m"),
                (TokenKind::Space, " "),
                (TokenKind::Word, "e"),
            ]
        );
    }

    #[test]
    fn test_tokens_osc_with_spaces_is_one_word() {
        let tokens: Vec<_> = Tokens::new("\x1b]0;a b\x07x").collect();
        assert_eq!(tokens, vec![(TokenKind::Word, "\x1b]0;a b\x07x")]);
    }

    #[test]
    fn test_trim_row_end_keeps_trailing_escapes() {
        assert_eq!(trim_row_end("\x1b[31mab \x1b[0m"), "\x1b[31mab\x1b[0m");
        assert_eq!(trim_row_end("ab  \x1b[0m \x1b[1m "), "ab\x1b[0m\x1b[1m");
        assert_eq!(trim_row_end("\x1b[2m  "), "\x1b[2m");
        assert_eq!(trim_row_end("日本 "), "日本");
        assert!(matches!(trim_row_end("ab\x1b[0m"), Cow::Borrowed(_)));
        assert_eq!(trim_row_end("x\x1b]0;a b\x07"), "x\x1b]0;a b\x07");
    }

    #[test]
    fn test_wrap_trims_space_before_trailing_reset() {
        let rows = plain("\x1b[31mab \x1b[0mcdefg", 5);
        assert_eq!(rows, vec!["\x1b[31mab\x1b[0m", "cdefg"]);
    }

    #[test]
    fn test_reflow_line_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(reflow_line("abc", 10, WrapMode::Plain, &token), Err(Cancelled));
    }

    #[test]
    fn test_reflow_line_cancelled_inside_long_token() {
        let huge = "x".repeat(100_000);
        let signal = Countdown(Cell::new(10));
        assert_eq!(reflow_line(&huge, 10, WrapMode::Plain, &signal), Err(Cancelled));
    }

    #[test]
    fn test_reflow_line_not_cancelled() {
        let signal = Countdown(Cell::new(usize::MAX));
        let rows = reflow_line("aaa bbb", 3, WrapMode::Plain, &signal);
        assert_eq!(rows, Ok(vec!["aaa".to_owned(), "bbb".to_owned()]));
    }
}
