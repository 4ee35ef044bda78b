//! # reflow
//!
//! Text reflow for terminal HTTP clients.
//!
//! Request editors and response viewers show JSON bodies, headers and
//! colorized output in panes of a fixed width. This crate re-wraps such text
//! to a display width while keeping embedded ANSI styling intact across wrap
//! points, and can report which visual rows came from which logical lines so
//! cursor and selection positions survive the reflow.
//!
//! ## Quick Start
//!
//! ```rust
//! use reflow::prelude::*;
//!
//! let options = ReflowOptions::new(10).mode(WrapMode::Plain);
//! let wrapped = reflow_text("HTTP/1.1 200 OK\ncontent-type: application/json", &options);
//! assert!(wrapped.rows().all(|row| reflow::cells::visible_width(row) <= 10));
//! ```
//!
//! ## Core Concepts
//!
//! - **Logical line**: one `\n`-delimited line of the input
//! - **Row**: one line of output, no wider than the target width
//! - **Mode**: how indentation carries onto continuation rows
//! - **Span**: the rows one logical line produced
//! - **Cancellation**: long reflows poll a [`CancelSignal`] and stop early
//!
//! The engine holds no global state and performs no I/O; it is safe to call
//! from any number of threads at once.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ansi;
pub mod cancel;
pub mod cells;
pub mod line;
pub mod options;
pub mod reflow;
pub mod terminal;

/// Re-exports for convenient usage
pub mod prelude {
    pub use crate::cancel::{CancelSignal, CancelToken, Cancelled, NeverCancel};
    pub use crate::line::{reflow_line, wrap_line};
    pub use crate::options::{ReflowOptions, WrapMode};
    pub use crate::reflow::{Reflowed, Span, reflow, reflow_bytes, reflow_text};
}

// Re-export key types at crate root
pub use cancel::{CancelSignal, CancelToken, Cancelled, NeverCancel};
pub use line::{reflow_line, wrap_line};
pub use options::{ReflowOptions, WrapMode};
pub use reflow::{Reflowed, Span, reflow, reflow_bytes, reflow_text};
