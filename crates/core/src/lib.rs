//! Core domain types, errors, and constants for `monoflow`.
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate.
//! - **`types`**: the task state taxonomy, per-workspace outcomes and the
//!   scalar values the task cache stores.
//! - **`constants`**: defaults for file names, widths and timings.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
