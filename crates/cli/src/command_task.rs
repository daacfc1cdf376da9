//! Built-in task handler running one command per workspace
//!
//! A workspace opts in by exporting, under the task's name:
//!
//! ```json
//! {
//!   "build": {
//!     "command": "cargo",
//!     "args": ["build", "--profile", "$profile"],
//!     "inputs": ["src", "Cargo.toml"],
//!     "warn_exit_codes": [2]
//!   }
//! }
//! ```
//!
//! With `inputs`, the command is skipped while the fingerprint of those
//! files matches the one cached after the last successful run. A configured
//! cache directory is passed to the command as `MONOFLOW_CACHE_DIR`.

use async_trait::async_trait;
use monoflow_core::{CacheValue, Error, ReportedState, Result, TaskState, MONOFLOW_CACHE_DIR_VAR};
use monoflow_task::{ProcessExit, SpawnOptions, TaskContext, TaskHandler};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Relative to the workspace
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub warn_exit_codes: Vec<i32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandTask;

#[async_trait]
impl TaskHandler<Value> for CommandTask {
    async fn execute(&self, ctx: &mut TaskContext, config: Value) -> Result<ReportedState> {
        let config: CommandConfig = serde_json::from_value(config).map_err(|e| {
            Error::configuration(format!("invalid '{}' configuration: {e}", ctx.task()))
        })?;

        let cache_key = ctx.workspace().display().to_string();
        let fingerprint = if config.inputs.is_empty() {
            None
        } else {
            Some(fingerprint(ctx, &config.inputs)?)
        };

        if let Some(current) = &fingerprint {
            let cached = ctx.cache_get(&cache_key);
            if cached.as_ref().and_then(CacheValue::as_str) == Some(current.as_str()) {
                ctx.log("inputs unchanged");
                return Ok(TaskState::Skip.into());
            }
        }

        let mut options = SpawnOptions::new();
        if let Some(cwd) = config.cwd {
            options = options.cwd(cwd);
        }
        if let Some(dir) = ctx.cache_dir() {
            options = options.env(MONOFLOW_CACHE_DIR_VAR, dir.display().to_string());
        }

        let exit = ctx
            .spawn_process(&config.command, &config.args, options)
            .await?;
        if let Some(signal) = exit.signal {
            ctx.log(format!("terminated by signal {signal}"));
        }

        let state = classify(exit, &config.warn_exit_codes);
        if state == TaskState::Success {
            if let Some(current) = fingerprint {
                ctx.cache_set(&cache_key, current);
            }
        }
        Ok(state.into())
    }
}

/// Map an exit status onto the task states
pub fn classify(exit: ProcessExit, warn_exit_codes: &[i32]) -> TaskState {
    match exit.code {
        Some(0) => TaskState::Success,
        Some(code) if warn_exit_codes.contains(&code) => TaskState::Warn,
        _ => TaskState::Error,
    }
}

/// SHA-256 over the path, size and modification time of every file under
/// `inputs`, taken in sorted path order
pub fn fingerprint(ctx: &TaskContext, inputs: &[PathBuf]) -> Result<String> {
    let mut files = Vec::new();
    for input in inputs {
        ctx.scan_tree(input, |path, meta| {
            if meta.is_file() {
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                    .map_or(0, |elapsed| elapsed.as_nanos());
                files.push((path.to_path_buf(), meta.len(), modified));
            }
        })?;
    }
    files.sort();
    files.dedup();

    let mut hasher = Sha256::new();
    for (path, len, modified) in &files {
        let relative = path.strip_prefix(ctx.workspace()).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(len.to_le_bytes());
        hasher.update(modified.to_le_bytes());
    }
    Ok(hex::encode(hasher.finalize()))
}
