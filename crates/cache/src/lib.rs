//! Task-scoped cache for monoflow
//!
//! A single table maps task name -> entry name -> scalar value. Writes land
//! in memory immediately and reach the backing JSON file after a quiet
//! period with no further writes.

pub mod store;

pub use monoflow_core::CacheValue;
pub use store::{CacheStats, CacheStore, CacheTable};
