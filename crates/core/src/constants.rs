/// Constants used throughout the monoflow codebase
use std::time::Duration;

// Workspace configuration
pub const DEFAULT_CONFIG_FILE: &str = ".workflow.json";

// Task definition defaults
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_DURATION_WIDTH: usize = 10;

// Console layout
pub const STATE_LABEL_WIDTH: usize = 7;
pub const BANNER_WIDTH: usize = 60;
pub const LOG_INDENT: &str = "  ";

// Cache persistence
pub const CACHE_DEBOUNCE: Duration = Duration::from_millis(1000);

// Environment variable names
pub const MONOFLOW_LOG_VAR: &str = "MONOFLOW_LOG";
pub const MONOFLOW_CACHE_DIR_VAR: &str = "MONOFLOW_CACHE_DIR";
