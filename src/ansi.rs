//! Terminal escape sequence scanning.
//!
//! Styled response bodies arrive with escape sequences already embedded in
//! them. The reflow engine never interprets colors, but it has to know where
//! each sequence starts and ends (so that it is neither measured nor cut in
//! half) and it has to remember which SGR ("set graphic rendition") sequences
//! are in effect so they can be replayed at the start of a continuation row.
//!
//! [`escape_len`] is the single scanner used by every other part of the crate.

use std::borrow::Cow;

use smallvec::SmallVec;

/// The escape byte that introduces every sequence.
pub const ESC: u8 = 0x1b;

const BEL: u8 = 0x07;

/// Longest string-type sequence (OSC, DCS, ...) accepted before the bytes
/// are treated as ordinary text.
const MAX_STRING_SEQUENCE: usize = 8192;

/// Return the length in bytes of the escape sequence starting at `at`.
///
/// Returns 0 when `bytes[at]` is not `ESC` or when the sequence is incomplete
/// or malformed; in that case the caller treats the bytes as ordinary text.
///
/// Recognized forms:
/// - CSI: `ESC [` parameters, intermediates, one final byte (`0x40..=0x7e`)
/// - OSC: `ESC ]` ... terminated by `BEL` or `ESC \`
/// - DCS, SOS, PM, APC: `ESC P`/`X`/`^`/`_` ... terminated by `ESC \`
/// - nF: `ESC` intermediates (`0x20..=0x2f`) then a final byte (`0x30..=0x7e`)
/// - two-byte Fp/Fe/Fs: `ESC` followed by one byte in `0x30..=0x7e`
#[must_use]
pub fn escape_len(bytes: &[u8], at: usize) -> usize {
    if bytes.get(at) != Some(&ESC) {
        return 0;
    }
    let Some(&kind) = bytes.get(at + 1) else {
        return 0;
    };
    let body = at + 2;
    let end = match kind {
        b'[' => csi_end(bytes, body),
        b']' => string_end(bytes, body, true),
        b'P' | b'X' | b'^' | b'_' => string_end(bytes, body, false),
        0x20..=0x2f => nf_end(bytes, body),
        0x30..=0x7e => Some(body),
        _ => None,
    };
    end.map_or(0, |end| end - at)
}

fn csi_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    while matches!(bytes.get(i), Some(0x30..=0x3f)) {
        i += 1;
    }
    while matches!(bytes.get(i), Some(0x20..=0x2f)) {
        i += 1;
    }
    match bytes.get(i) {
        Some(0x40..=0x7e) => Some(i + 1),
        _ => None,
    }
}

fn nf_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    while matches!(bytes.get(i), Some(0x20..=0x2f)) {
        i += 1;
    }
    match bytes.get(i) {
        Some(0x30..=0x7e) => Some(i + 1),
        _ => None,
    }
}

fn string_end(bytes: &[u8], from: usize, bel_terminates: bool) -> Option<usize> {
    let limit = bytes.len().min(from.saturating_add(MAX_STRING_SEQUENCE));
    let mut i = from;
    while i < limit {
        match bytes[i] {
            BEL if bel_terminates => return Some(i + 1),
            ESC => return (bytes.get(i + 1) == Some(&b'\\')).then_some(i + 2),
            _ => i += 1,
        }
    }
    None
}

/// Iterate over the complete escape sequences in `text`, in order.
pub fn escapes(text: &str) -> impl Iterator<Item = &str> + '_ {
    let bytes = text.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            let len = escape_len(bytes, i);
            if len > 0 {
                let seq = &text[i..i + len];
                i += len;
                return Some(seq);
            }
            i += 1;
        }
        None
    })
}

/// Remove every complete escape sequence from `text`.
///
/// Borrows when there is nothing to strip.
#[must_use]
pub fn strip_escapes(text: &str) -> Cow<'_, str> {
    if !text.as_bytes().contains(&ESC) {
        return Cow::Borrowed(text);
    }
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut run_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let len = escape_len(bytes, i);
        if len == 0 {
            i += 1;
            continue;
        }
        out.push_str(&text[run_start..i]);
        i += len;
        run_start = i;
    }
    out.push_str(&text[run_start..]);
    Cow::Owned(out)
}

/// Return the parameter bytes of `seq` if it is a complete SGR sequence
/// (`ESC [` params `m`).
#[must_use]
pub fn sgr_params(seq: &[u8]) -> Option<&[u8]> {
    let params = seq.strip_prefix(b"\x1b[")?.strip_suffix(b"m")?;
    params
        .iter()
        .all(|b| b.is_ascii_digit() || matches!(b, b';' | b':'))
        .then_some(params)
}

/// How an SGR sequence affects the style that is currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SgrEffect {
    /// Everything is reset (`ESC[m`, `ESC[0m`, `ESC[1;0m`, ...).
    Reset,
    /// A reset followed by new attributes (`ESC[0;31m`).
    ResetThenSet,
    /// Attributes layered on top of the current style.
    Set,
}

/// Classify SGR parameters.
///
/// A parameter counts as a reset only when it stands on its own: the `0` in
/// `38;5;0` or `48;2;0;0;0` is a color argument, not a reset.
#[must_use]
pub fn sgr_effect(params: &[u8]) -> SgrEffect {
    if params.is_empty() {
        return SgrEffect::Reset;
    }
    let fields: SmallVec<[&[u8]; 8]> = params.split(|&b| b == b';').collect();
    let mut last_reset = None;
    let mut i = 0;
    while i < fields.len() {
        let field = fields[i];
        if field.iter().all(|&b| b == b'0') {
            last_reset = Some(i);
            i += 1;
            continue;
        }
        i += match sgr_number(field) {
            // Extended colors: 5;n (indexed) or 2;r;g;b (direct).
            Some(38 | 48 | 58) => match fields.get(i + 1).copied().and_then(sgr_number) {
                Some(5) => 3,
                Some(2) => 5,
                _ => 1,
            },
            _ => 1,
        };
    }
    match last_reset {
        None => SgrEffect::Set,
        Some(at) if at + 1 == fields.len() => SgrEffect::Reset,
        Some(_) => SgrEffect::ResetThenSet,
    }
}

fn sgr_number(field: &[u8]) -> Option<u16> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// The SGR sequences in effect at the current position of a row.
///
/// Sequences are recorded verbatim in the order they were seen; a reset
/// clears them. The recorded text is replayed at the start of each
/// continuation row so styling carries across the wrap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveStyle {
    prefix: String,
}

impl ActiveStyle {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The escape bytes to replay at the start of the next row.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Whether no style is in effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Forget every tracked sequence.
    pub fn clear(&mut self) {
        self.prefix.clear();
    }

    /// Update the tracked style from text that has just been emitted.
    ///
    /// Only SGR sequences matter; cursor movement, hyperlinks and other
    /// sequences pass through without changing the tracked style.
    pub fn observe(&mut self, emitted: &str) {
        for seq in escapes(emitted) {
            self.apply(seq);
        }
    }

    /// Apply one complete escape sequence.
    pub fn apply(&mut self, seq: &str) {
        let Some(params) = sgr_params(seq.as_bytes()) else {
            return;
        };
        match sgr_effect(params) {
            SgrEffect::Reset => self.prefix.clear(),
            SgrEffect::ResetThenSet => {
                self.prefix.clear();
                self.prefix.push_str(seq);
            }
            SgrEffect::Set => self.prefix.push_str(seq),
        }
    }
}
