//! Common test utilities and logging infrastructure
//!
//! This module provides structured logging for tests using the `tracing` crate.
//! The engine itself logs through `log`; `tracing-subscriber` bridges those
//! records so they show up next to the test's own events.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::init_test_logging;
//!
//! #[test]
//! fn my_test() {
//!     init_test_logging();
//!     // test code...
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG=reflow=trace` - Show per-reflow summaries
//! - `TEST_LOG_JSON=1` - Output JSON format for CI parsing
//!
//! Not every helper is used by every test binary.

#![allow(dead_code)]

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize test logging infrastructure.
///
/// Output goes through the test writer, so it is captured by `cargo test`
/// unless `--nocapture` is used. Calling it more than once is fine.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let use_json = std::env::var("TEST_LOG_JSON").is_ok();

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("reflow=debug,test=info"));

        if use_json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_test_writer())
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_test_writer()
                        .with_ansi(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_thread_ids(true)
                        .with_target(true)
                        .compact(),
                )
                .try_init()
                .ok();
        }
    });
}

/// A test span guard that logs entry and exit.
///
/// ```rust,ignore
/// let _setup = test_phase("setup");
/// ```
pub fn test_phase(name: &str) -> tracing::span::EnteredSpan {
    let span = tracing::info_span!("test_phase", phase = name);
    tracing::info!(phase = name, "entering test phase");
    span.entered()
}

/// Log test context information.
pub fn log_test_context(test_name: &str, description: &str) {
    tracing::info!(
        test_name = test_name,
        description = description,
        "test context"
    );
}

/// Assert that every row of `text` fits in `width` cells.
#[track_caller]
pub fn assert_rows_fit(text: &str, width: usize) {
    for (index, row) in text.split('\n').enumerate() {
        let row_width = reflow::cells::visible_width(row);
        if row_width > width {
            tracing::error!(index, row_width, width, row = ?row, "row too wide");
        }
        assert!(
            row_width <= width,
            "row {index} is {row_width} cells wide, limit {width}: {row:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_phase_logging() {
        init_test_logging();
        {
            let _setup = test_phase("setup");
            tracing::debug!("Setting up test resources");
        }
        {
            let _verify = test_phase("verify");
            assert_rows_fit("abc\nde", 3);
        }
    }
}
