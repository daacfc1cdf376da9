//! Task definitions and the handler trait behind them
//!
//! A definition is registered once under a name and is immutable afterwards.
//! The handler carries the behaviour: an execute callback invoked once per
//! workspace that exports configuration for the task, and optional pre/post
//! hooks invoked once per run with the task-scoped [`TaskScope`].

use crate::context::{TaskContext, TaskScope};
use async_trait::async_trait;
use monoflow_core::{ReportedState, Result, DEFAULT_CONCURRENCY, DEFAULT_DURATION_WIDTH};
use std::fmt;
use std::sync::Arc;

/// Behaviour of a registered task
#[async_trait]
pub trait TaskHandler<C: Send + 'static>: Send + Sync {
    /// Runs once before any workspace is dispatched
    async fn pre(&self, _scope: &TaskScope) -> Result<()> {
        Ok(())
    }

    /// Runs against one workspace with the configuration it exported
    async fn execute(&self, ctx: &mut TaskContext, config: C) -> Result<ReportedState>;

    /// Runs once after every workspace has settled
    async fn post(&self, _scope: &TaskScope) -> Result<()> {
        Ok(())
    }
}

/// Immutable, registered task definition
pub struct TaskDefinition<C: Send + 'static> {
    title: String,
    handler: Arc<dyn TaskHandler<C>>,
    concurrency: usize,
    duration_width: usize,
}

impl<C: Send + 'static> TaskDefinition<C> {
    pub fn new(title: impl Into<String>, handler: impl TaskHandler<C> + 'static) -> Self {
        Self::from_arc(title, Arc::new(handler))
    }

    pub fn from_arc(title: impl Into<String>, handler: Arc<dyn TaskHandler<C>>) -> Self {
        Self {
            title: title.into(),
            handler,
            concurrency: DEFAULT_CONCURRENCY,
            duration_width: DEFAULT_DURATION_WIDTH,
        }
    }

    /// Maximum number of workspaces running at once (at least 1)
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Minimum width of the duration column in the report
    pub fn duration_width(mut self, width: usize) -> Self {
        self.duration_width = width;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn handler(&self) -> &dyn TaskHandler<C> {
        self.handler.as_ref()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency
    }

    pub fn duration_column(&self) -> usize {
        self.duration_width
    }
}

impl<C: Send + 'static> Clone for TaskDefinition<C> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            handler: Arc::clone(&self.handler),
            concurrency: self.concurrency,
            duration_width: self.duration_width,
        }
    }
}

impl<C: Send + 'static> fmt::Debug for TaskDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("title", &self.title)
            .field("concurrency", &self.concurrency)
            .field("duration_width", &self.duration_width)
            .finish_non_exhaustive()
    }
}
