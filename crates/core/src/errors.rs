use std::path::PathBuf;

/// Result type alias for monoflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for monoflow operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted cache file exists but is not a valid cache table
    #[error("cache file '{path}' is corrupt: {source}")]
    CorruptCacheFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A task reported a state outside the recognised taxonomy
    #[error("unknown task state '{state}'")]
    InvalidState { state: String },

    /// An external process could not be started
    #[error("{}", format_spawn_error(.command, .args, .source))]
    ProcessSpawn {
        command: String,
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    /// Failure raised by a task's execute callback
    #[error("{message}")]
    Task {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A task's execute callback panicked
    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    /// A pre or post hook failed
    #[error("{hook} hook of task '{task}' failed: {message}")]
    Hook {
        task: String,
        hook: &'static str,
        message: String,
    },

    /// Workspace configuration could not be loaded or evaluated
    #[error("failed to load configuration '{path}': {message}")]
    ConfigLoad {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_spawn_error(command: &str, args: &[String], source: &std::io::Error) -> String {
    if args.is_empty() {
        format!("failed to spawn '{command}': {source}")
    } else {
        format!("failed to spawn '{command} {}': {source}", args.join(" "))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a corrupt cache file error
    #[must_use]
    pub fn corrupt_cache_file(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::CorruptCacheFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Error::InvalidState {
            state: state.into(),
        }
    }

    /// Create a process spawn error
    #[must_use]
    pub fn process_spawn(
        command: impl Into<String>,
        args: Vec<String>,
        source: std::io::Error,
    ) -> Self {
        Error::ProcessSpawn {
            command: command.into(),
            args,
            source,
        }
    }

    /// Create a task failure from a plain message
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Error::Task {
            message: message.into(),
            source: None,
        }
    }

    /// Create a task failure that wraps its cause
    #[must_use]
    pub fn task_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Task {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn task_panicked(message: impl Into<String>) -> Self {
        Error::TaskPanicked {
            message: message.into(),
        }
    }

    /// Create a hook failure
    #[must_use]
    pub fn hook(task: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Error::Hook {
            task: task.into(),
            hook,
            message: message.into(),
        }
    }

    /// Create a configuration load error
    #[must_use]
    pub fn config_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::ConfigLoad {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration load error with a source error
    #[must_use]
    pub fn config_load_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::ConfigLoad {
            path: path.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Task {
                message: message.into(),
                source: Some(Box::new(base_error)),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Task {
                message: f(),
                source: Some(Box::new(base_error)),
            }
        })
    }
}
