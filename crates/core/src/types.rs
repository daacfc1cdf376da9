//! Domain types shared by the cache, the task contexts and the engine

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Outcome state of one task invocation against one workspace.
///
/// `Null` means the workspace had no applicable configuration and the
/// execute callback never ran. It is distinct from `Skip`, which the
/// callback chooses explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Success,
    Warn,
    Error,
    Skip,
    Null,
}

impl TaskState {
    pub const ALL: [TaskState; 5] = [
        TaskState::Success,
        TaskState::Warn,
        TaskState::Error,
        TaskState::Skip,
        TaskState::Null,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Success => "success",
            TaskState::Warn => "warn",
            TaskState::Error => "error",
            TaskState::Skip => "skip",
            TaskState::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TaskState::Null)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::invalid_state(s))
    }
}

/// What an execute callback hands back to the engine.
///
/// Callbacks that compute their state dynamically (from a config value, a
/// process's output, ...) may return a free-form label; the engine
/// validates it against [`TaskState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedState {
    State(TaskState),
    Label(String),
}

impl ReportedState {
    /// Resolve into a recognised state, failing with `InvalidState` otherwise
    pub fn validate(self) -> Result<TaskState> {
        match self {
            ReportedState::State(state) => Ok(state),
            ReportedState::Label(label) => label.parse(),
        }
    }
}

impl From<TaskState> for ReportedState {
    fn from(state: TaskState) -> Self {
        ReportedState::State(state)
    }
}

impl From<&str> for ReportedState {
    fn from(label: &str) -> Self {
        ReportedState::Label(label.to_string())
    }
}

impl From<String> for ReportedState {
    fn from(label: String) -> Self {
        ReportedState::Label(label)
    }
}

/// Result of running one task against one workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub state: TaskState,
    pub workspace: PathBuf,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn new(state: TaskState, workspace: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            state,
            workspace: workspace.into(),
            duration,
        }
    }

    /// Outcome for a workspace without any configuration file
    pub fn null(workspace: &Path) -> Self {
        Self::new(TaskState::Null, workspace, Duration::ZERO)
    }

    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// A scalar value stored in the task cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl CacheValue {
    /// Build a numeric value from a float. NaN and infinities are rejected.
    pub fn float(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(CacheValue::Number)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CacheValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CacheValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::String(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::String(value)
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Bool(b) => write!(f, "{b}"),
            CacheValue::Number(n) => write!(f, "{n}"),
            CacheValue::String(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parses_every_label() {
        for state in TaskState::ALL {
            assert_eq!(state.as_str().parse::<TaskState>().unwrap(), state);
        }
    }

    #[test]
    fn test_unknown_label_is_invalid_state() {
        let err = ReportedState::from("finished").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidState { ref state } if state == "finished"));
    }

    #[test]
    fn test_label_is_case_sensitive() {
        assert!("Success".parse::<TaskState>().is_err());
    }

    #[test]
    fn test_outcome_serializes_duration_in_millis() {
        let outcome = TaskOutcome::new(
            TaskState::Warn,
            "/repo/pkg",
            Duration::from_millis(1500),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "warn");
        assert_eq!(json["workspace"], "/repo/pkg");
        assert_eq!(json["duration_ms"], 1500);
    }

    #[test]
    fn test_cache_value_rejects_nested_json() {
        let parsed: std::result::Result<CacheValue, _> = serde_json::from_str(r#"{"a": 1}"#);
        assert!(parsed.is_err());
        let parsed: CacheValue = serde_json::from_str("true").unwrap();
        assert_eq!(parsed, CacheValue::Bool(true));
        let parsed: CacheValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(parsed.as_f64(), Some(2.5));
    }

    #[test]
    fn test_cache_value_float_rejects_nan() {
        assert!(CacheValue::float(f64::NAN).is_none());
    }
}
