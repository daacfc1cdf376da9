//! Shared utilities for monoflow
//!
//! Snapshot file replacement and tracing setup used by the cache, the
//! engine and the command-line front end.

pub mod replace;
pub mod tracing;

pub use replace::replace_file;
