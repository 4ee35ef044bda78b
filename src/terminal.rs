//! Terminal size detection.
//!
//! Callers that wrap for the terminal the process is attached to can use
//! [`terminal_width`] instead of tracking the width themselves.

/// Width used when neither the terminal nor the environment reports one.
pub const DEFAULT_WIDTH: usize = 80;

/// Get the terminal size (width, height) in cells.
///
/// Returns `None` if the terminal size cannot be determined.
#[must_use]
pub fn terminal_size() -> Option<(usize, usize)> {
    crossterm::terminal::size()
        .ok()
        .map(|(w, h)| (usize::from(w), usize::from(h)))
}

/// Get the terminal width in cells.
///
/// Falls back to the `COLUMNS` environment variable, then to
/// [`DEFAULT_WIDTH`].
#[must_use]
pub fn terminal_width() -> usize {
    terminal_size()
        .map(|(w, _)| w)
        .filter(|&w| w > 0)
        .or_else(|| columns_from_env(std::env::var("COLUMNS").ok().as_deref()))
        .unwrap_or(DEFAULT_WIDTH)
}

fn columns_from_env(columns: Option<&str>) -> Option<usize> {
    columns?.trim().parse().ok().filter(|&w: &usize| w > 0)
}
