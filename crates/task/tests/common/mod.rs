//! Shared fixtures for the engine integration tests
//!
//! Workspaces are directories under one temporary root. A workspace's
//! `.workflow.json` holds a small script that [`ScriptedHandler`] runs:
//! whitespace-separated steps where a number sleeps that many milliseconds,
//! `log:<text>` appends to the workspace log, `throw` fails, `panic`
//! panics, and any other word is returned as the state label. An empty file
//! has no export for any task.

#![allow(dead_code)]

use async_trait::async_trait;
use monoflow_config::{ConfigResolver, FnResolver};
use monoflow_core::{Error, ReportedState, Result, TaskState, DEFAULT_CONFIG_FILE};
use monoflow_task::{Console, Engine, TaskContext, TaskHandler, TaskScope};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temporary monorepo root holding the test workspaces
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create workspace `name`, with a configuration file when `script` is set
    pub fn workspace(&self, name: &str, script: Option<&str>) -> PathBuf {
        let dir = self.root.path().join(name);
        fs::create_dir_all(&dir).expect("create workspace");
        if let Some(script) = script {
            fs::write(dir.join(DEFAULT_CONFIG_FILE), script).expect("write config");
        }
        dir
    }
}

/// Resolver returning the trimmed script; an empty file exports nothing
pub fn script_resolver() -> impl ConfigResolver<Params = (), Config = String> {
    FnResolver::new(|config_file: &Path, _task: &str, _params: &()| {
        let content = fs::read_to_string(config_file)
            .map_err(|e| Error::config_load_with_source(config_file, "cannot read", e))?;
        let script = content.trim();
        Ok((!script.is_empty()).then(|| script.to_string()))
    })
}

pub fn engine() -> Engine<impl ConfigResolver<Params = (), Config = String>> {
    Engine::new(script_resolver()).with_console(Console::capture())
}

/// Observations made by [`ScriptedHandler`]
#[derive(Default)]
pub struct Recorder {
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    pub hooks: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct ScriptedHandler {
    pub recorder: Arc<Recorder>,
    pub fail_pre: bool,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskHandler<String> for ScriptedHandler {
    async fn pre(&self, scope: &TaskScope) -> Result<()> {
        self.recorder.hooks.lock().push(format!("pre:{}", scope.task()));
        if self.fail_pre {
            return Err(Error::task("pre hook refused to start"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut TaskContext, config: String) -> Result<ReportedState> {
        self.recorder.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.peak.fetch_max(active, Ordering::SeqCst);

        let result = run_script(ctx, &config).await;

        self.recorder.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn post(&self, scope: &TaskScope) -> Result<()> {
        self.recorder.hooks.lock().push(format!("post:{}", scope.task()));
        Ok(())
    }
}

async fn run_script(ctx: &mut TaskContext, script: &str) -> Result<ReportedState> {
    for step in script.split_whitespace() {
        if let Ok(delay) = step.parse::<u64>() {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        } else if let Some(text) = step.strip_prefix("log:") {
            ctx.log(text);
        } else if step == "throw" {
            return Err(Error::task(format!(
                "script failed in {}",
                ctx.workspace().display()
            )));
        } else if step == "panic" {
            panic!("script panicked");
        } else {
            return Ok(ReportedState::from(step));
        }
    }
    Ok(TaskState::Success.into())
}
