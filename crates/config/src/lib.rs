//! Workspace configuration resolution for monoflow
//!
//! The engine never loads configuration itself; it asks a
//! [`ConfigResolver`] for the value a workspace exports under a task name.

pub mod json;
pub mod resolver;

pub use json::{expand_params, JsonConfigResolver, Params};
pub use resolver::{ConfigResolver, FnResolver};
