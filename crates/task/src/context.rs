//! Execution contexts handed to task handlers
//!
//! [`TaskContext`] is created fresh for every (task, workspace) invocation
//! and buffers its log lines until the engine has printed the outcome.
//! [`TaskScope`] is the task-wide context the pre/post hooks receive.

use crate::console::Console;
use crate::process::{run_process, LineSplitter, OutputStream, ProcessExit, SpawnOptions};
use monoflow_cache::CacheStore;
use monoflow_core::{CacheValue, Error, Result};
use std::error::Error as StdError;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use walkdir::WalkDir;

/// Context bound to one task running against one workspace
pub struct TaskContext {
    task: String,
    config_file: PathBuf,
    workspace: PathBuf,
    cache: CacheStore,
    logs: Vec<String>,
}

impl TaskContext {
    /// The workspace directory is the parent of `config_file`
    pub fn new(task: impl Into<String>, config_file: impl Into<PathBuf>, cache: CacheStore) -> Self {
        let config_file = config_file.into();
        let workspace = match config_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            task: task.into(),
            config_file,
            workspace,
            cache,
            logs: Vec::new(),
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Lines buffered so far
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Append one line per line of `value`
    pub fn log(&mut self, value: impl fmt::Display) {
        let text = value.to_string();
        if text.is_empty() {
            self.logs.push(String::new());
            return;
        }
        self.logs.extend(text.lines().map(str::to_string));
    }

    /// Append an error's message followed by its chain of causes
    pub fn log_error(&mut self, error: &(dyn StdError + 'static)) {
        self.log(error);
        let mut source = error.source();
        while let Some(cause) = source {
            for line in cause.to_string().lines() {
                self.logs.push(format!("  caused by: {line}"));
            }
            source = cause.source();
        }
    }

    /// Write the buffered lines to `console` and empty the buffer
    pub fn flush_logs(&mut self, console: &Console) {
        console.logs(&std::mem::take(&mut self.logs));
    }

    pub fn cache_get(&self, name: &str) -> Option<CacheValue> {
        self.cache.get(&self.task, name)
    }

    pub fn cache_set(&self, name: &str, value: impl Into<CacheValue>) {
        self.cache.set(&self.task, name, value);
    }

    /// Directory configured for cached artifacts, if any
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache.dir()
    }

    /// Depth-first, pre-order walk of `root`, visiting the root first.
    ///
    /// Relative roots are taken from the workspace directory. Symlinks are
    /// followed. The first entry that cannot be read aborts the walk.
    pub fn scan_tree<F>(&self, root: impl AsRef<Path>, mut visit: F) -> Result<()>
    where
        F: FnMut(&Path, &Metadata),
    {
        let root = self.resolve(root.as_ref());

        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.map_err(|e| walk_error(&root, e))?;
            let metadata = entry.metadata().map_err(|e| walk_error(&root, e))?;
            visit(entry.path(), &metadata);
        }
        Ok(())
    }

    /// Run a process, buffering its output into this context's log.
    ///
    /// Stdout and stderr are split into lines independently.
    pub async fn spawn_process(
        &mut self,
        command: &str,
        args: &[String],
        options: SpawnOptions,
    ) -> Result<ProcessExit> {
        let options = self.with_default_cwd(options);
        let mut stdout = LineSplitter::default();
        let mut stderr = LineSplitter::default();
        let logs = &mut self.logs;

        let exit = run_process(command, args, &options, |stream, chunk| {
            let splitter = match stream {
                OutputStream::Stdout => &mut stdout,
                OutputStream::Stderr => &mut stderr,
            };
            splitter.push(chunk, |line| logs.push(line));
        })
        .await;

        stdout.finish(|line| logs.push(line));
        stderr.finish(|line| logs.push(line));
        exit
    }

    /// Run a process, handing every output chunk to `handler`
    pub async fn spawn_process_with<H>(
        &self,
        command: &str,
        args: &[String],
        options: SpawnOptions,
        handler: H,
    ) -> Result<ProcessExit>
    where
        H: FnMut(OutputStream, &[u8]) + Send,
    {
        let options = self.with_default_cwd(options);
        run_process(command, args, &options, handler).await
    }

    fn with_default_cwd(&self, mut options: SpawnOptions) -> SpawnOptions {
        options.cwd = Some(match options.cwd.take() {
            Some(cwd) => self.resolve(&cwd),
            None => self.workspace.clone(),
        });
        options
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .field("workspace", &self.workspace)
            .field("logs", &self.logs.len())
            .finish_non_exhaustive()
    }
}

fn walk_error(root: &Path, error: walkdir::Error) -> Error {
    let path = error.path().unwrap_or(root).to_path_buf();
    let message = error.to_string();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    Error::file_system(path, "scan", source)
}

/// Task-wide context passed to the pre and post hooks
#[derive(Clone)]
pub struct TaskScope {
    task: String,
    started: Instant,
    cache: CacheStore,
    console: Console,
}

impl TaskScope {
    pub fn new(task: impl Into<String>, cache: CacheStore, console: Console) -> Self {
        Self {
            task: task.into(),
            started: Instant::now(),
            cache,
            console,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn started_at(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn cache_get(&self, name: &str) -> Option<CacheValue> {
        self.cache.get(&self.task, name)
    }

    pub fn cache_set(&self, name: &str, value: impl Into<CacheValue>) {
        self.cache.set(&self.task, name, value);
    }

    /// Directory configured for cached artifacts, if any
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache.dir()
    }

    /// Print straight to the console; hooks have no buffer
    pub fn log(&self, value: impl fmt::Display) {
        for line in value.to_string().lines() {
            self.console.line(line);
        }
    }
}

impl fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScope")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}
