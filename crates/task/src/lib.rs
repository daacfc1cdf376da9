//! Task execution for monoflow
//!
//! This crate owns the task registry and the workspace registry, runs a
//! task against every workspace with bounded concurrency, and reports one
//! outcome per workspace in registration order.

pub mod console;
pub mod context;
pub mod definition;
pub mod engine;
pub mod parallel;
pub mod process;

pub use console::{format_banner, Console};
pub use context::{TaskContext, TaskScope};
pub use definition::{TaskDefinition, TaskHandler};
pub use engine::{Engine, EngineOptions};
pub use parallel::map_bounded;
pub use process::{run_process, OutputStream, ProcessExit, SpawnOptions};

pub use monoflow_core::{ReportedState, TaskOutcome, TaskState};
