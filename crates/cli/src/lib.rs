//! Command-line front end for the monoflow engine
//!
//! Every task named on the command line is registered with the built-in
//! [`CommandTask`] handler and run, in order, across the selected
//! workspaces.

pub mod args;
pub mod command_task;
pub mod discover;

pub use args::Cli;
pub use command_task::{CommandConfig, CommandTask};
pub use discover::discover_workspaces;

use eyre::WrapErr;
use monoflow_config::JsonConfigResolver;
use monoflow_core::{TaskOutcome, TaskState};
use monoflow_task::{Console, Engine, EngineOptions, TaskDefinition};
use serde::Serialize;

/// Outcomes of one task across all workspaces
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub outcomes: Vec<TaskOutcome>,
}

impl TaskReport {
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|o| o.state == TaskState::Error)
    }
}

/// Build an engine from `cli` and run every requested task.
///
/// The cache is flushed before returning, whether or not a task failed.
pub async fn run(cli: &Cli, console: Console) -> eyre::Result<Vec<TaskReport>> {
    let mut engine = Engine::new(JsonConfigResolver::new()).with_console(console);

    let mut options = EngineOptions::new()
        .config_file(cli.config_file.clone())
        .params(cli.param_map());
    if let Some(cache) = &cli.cache {
        options = options.cache_file(cache);
    }
    if let Some(cache_dir) = &cli.cache_dir {
        options = options.cache_dir(cache_dir);
    }
    engine
        .configure(options)
        .wrap_err("failed to configure the engine")?;

    for workspace in &cli.workspaces {
        engine.add_workspace(workspace);
    }
    if let Some(root) = &cli.discover {
        for workspace in discover_workspaces(root, &cli.config_file)? {
            engine.add_workspace(workspace);
        }
    }
    if engine.workspaces().is_empty() {
        let cwd = std::env::current_dir().wrap_err("cannot determine the current directory")?;
        engine.add_workspace(cwd);
    }

    for task in &cli.tasks {
        engine.register(
            task.clone(),
            TaskDefinition::new(task.clone(), CommandTask).concurrency(cli.concurrency),
        );
    }

    let result = run_tasks(&engine, &cli.tasks).await;
    engine
        .cache()
        .flush()
        .wrap_err("failed to write the task cache")?;
    result
}

async fn run_tasks(
    engine: &Engine<JsonConfigResolver>,
    tasks: &[String],
) -> eyre::Result<Vec<TaskReport>> {
    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        let outcomes = engine
            .execute(task)
            .await
            .wrap_err_with(|| format!("task '{task}' failed"))?
            .unwrap_or_default();
        reports.push(TaskReport {
            task: task.clone(),
            outcomes,
        });
    }
    Ok(reports)
}
