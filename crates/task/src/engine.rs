//! Execution engine: task registry, workspace registry and bounded dispatch

use crate::console::Console;
use crate::context::{TaskContext, TaskScope};
use crate::definition::TaskDefinition;
use crate::parallel::map_bounded;
use futures::FutureExt;
use indexmap::IndexMap;
use monoflow_cache::CacheStore;
use monoflow_config::ConfigResolver;
use monoflow_core::{Error, Result, TaskOutcome, TaskState, DEFAULT_CONFIG_FILE};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tokio::time::Instant;
use tracing::Instrument;

/// Settings applied by [`Engine::configure`]; unset fields keep their
/// current value.
#[derive(Debug, Clone)]
pub struct EngineOptions<P> {
    config_file: Option<String>,
    params: Option<P>,
    cache_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
}

impl<P> Default for EngineOptions<P> {
    fn default() -> Self {
        Self {
            config_file: None,
            params: None,
            cache_file: None,
            cache_dir: None,
        }
    }
}

impl<P> EngineOptions<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// File name looked up inside every workspace
    pub fn config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = Some(name.into());
        self
    }

    /// Payload forwarded to the resolver for every workspace
    pub fn params(mut self, params: P) -> Self {
        self.params = Some(params);
        self
    }

    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Directory exposed to handlers through `TaskContext::cache_dir`
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }
}

/// Runs registered tasks across the registered workspaces
pub struct Engine<R: ConfigResolver> {
    resolver: R,
    cache: CacheStore,
    console: Console,
    config_file: String,
    params: R::Params,
    workspaces: Vec<PathBuf>,
    tasks: IndexMap<String, TaskDefinition<R::Config>>,
}

impl<R: ConfigResolver> Engine<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            cache: CacheStore::new(),
            console: Console::stdout(),
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            params: R::Params::default(),
            workspaces: Vec::new(),
            tasks: IndexMap::new(),
        }
    }

    /// Share an existing cache store instead of a private one
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Apply `options`. The cache file is loaded first, so a corrupt cache
    /// leaves the engine unchanged.
    pub fn configure(&mut self, options: EngineOptions<R::Params>) -> Result<()> {
        if let Some(cache_file) = options.cache_file {
            self.cache.configure(cache_file)?;
        }
        if let Some(cache_dir) = options.cache_dir {
            self.cache.set_dir(cache_dir);
        }
        if let Some(config_file) = options.config_file {
            self.config_file = config_file;
        }
        if let Some(params) = options.params {
            self.params = params;
        }
        Ok(())
    }

    /// Append a workspace; duplicates run as independent entries
    pub fn add_workspace(&mut self, path: impl Into<PathBuf>) {
        self.workspaces.push(path.into());
    }

    /// Register `definition` under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, definition: TaskDefinition<R::Config>) {
        let name = name.into();
        if self.tasks.insert(name.clone(), definition).is_some() {
            tracing::debug!(task = %name, "Replaced task definition");
        }
    }

    /// Forget every workspace, task and configuration setting. The cache is
    /// left alone.
    pub fn clear(&mut self) {
        self.workspaces.clear();
        self.tasks.clear();
        self.config_file = DEFAULT_CONFIG_FILE.to_string();
        self.params = R::Params::default();
    }

    pub fn workspaces(&self) -> &[PathBuf] {
        &self.workspaces
    }

    pub fn task(&self, name: &str) -> Option<&TaskDefinition<R::Config>> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn params(&self) -> &R::Params {
        &self.params
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Run task `name` against every workspace.
    ///
    /// Returns `Ok(None)` when no task is registered under `name`. Otherwise
    /// the outcomes come back in workspace registration order. Failures
    /// inside a workspace become that workspace's `error` outcome; only a
    /// failing pre or post hook fails the whole call.
    pub async fn execute(&self, name: &str) -> Result<Option<Vec<TaskOutcome>>> {
        let Some(definition) = self.tasks.get(name) else {
            tracing::debug!(task = %name, "No such task");
            return Ok(None);
        };

        let span = monoflow_utils::tracing::task_span(
            name,
            self.workspaces.len(),
            definition.concurrency_limit(),
        );

        async {
            self.console.banner(definition.title());

            let scope = TaskScope::new(name, self.cache.clone(), self.console.clone());
            definition
                .handler()
                .pre(&scope)
                .await
                .map_err(|e| Error::hook(name, "pre", e.to_string()))?;

            let outcomes = map_bounded(
                &self.workspaces,
                definition.concurrency_limit(),
                |workspace| self.run_workspace(name, definition, workspace),
            )
            .await;

            definition
                .handler()
                .post(&scope)
                .await
                .map_err(|e| Error::hook(name, "post", e.to_string()))?;

            tracing::info!(
                elapsed_ms = scope.elapsed().as_millis() as u64,
                "Task finished"
            );
            Ok::<_, Error>(Some(outcomes))
        }
        .instrument(span)
        .await
    }

    async fn run_workspace(
        &self,
        name: &str,
        definition: &TaskDefinition<R::Config>,
        workspace: &Path,
    ) -> TaskOutcome {
        let config_file = workspace.join(&self.config_file);

        if let Err(e) = tokio::fs::metadata(&config_file).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                tracing::debug!(workspace = %workspace.display(), "No configuration file");
                return TaskOutcome::null(workspace);
            }
        }

        let started = Instant::now();
        let mut ctx = TaskContext::new(name, &config_file, self.cache.clone());

        let state = match self.invoke(name, definition, &mut ctx, &config_file).await {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!(workspace = %workspace.display(), error = %e, "Workspace failed");
                ctx.log_error(&e);
                TaskState::Error
            }
        };
        let outcome = TaskOutcome::new(state, workspace, started.elapsed());

        tracing::debug!(
            workspace = %workspace.display(),
            state = %outcome.state,
            duration_ms = outcome.duration_ms() as u64,
            "Workspace settled"
        );

        if !state.is_null() {
            self.console.outcome(&outcome, definition.duration_column());
            ctx.flush_logs(&self.console);
        }
        outcome
    }

    /// Resolve the configuration and run the handler. A missing export is
    /// reported as `Null` without calling the handler.
    async fn invoke(
        &self,
        name: &str,
        definition: &TaskDefinition<R::Config>,
        ctx: &mut TaskContext,
        config_file: &Path,
    ) -> Result<TaskState> {
        let resolved = AssertUnwindSafe(self.resolver.resolve(config_file, name, &self.params))
            .catch_unwind()
            .await
            .map_err(|panic| Error::task_panicked(panic_message(panic.as_ref())))??;
        let Some(config) = resolved else {
            return Ok(TaskState::Null);
        };

        let reported = AssertUnwindSafe(definition.handler().execute(ctx, config))
            .catch_unwind()
            .await
            .map_err(|panic| Error::task_panicked(panic_message(panic.as_ref())))??;

        reported.validate()
    }
}

impl<R: ConfigResolver> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config_file", &self.config_file)
            .field("workspaces", &self.workspaces)
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
