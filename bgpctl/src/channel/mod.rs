//! Channel layer for pattern matching and PTY operations.
//!
//! Handles the interactive shell: prompt detection on a tail-searched
//! buffer and ANSI stripping.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel};
