//! JSON workspace configuration files
//!
//! A workspace's configuration file is a JSON object keyed by task name:
//!
//! ```json
//! {
//!   "build": { "command": "cargo", "args": ["build", "--profile", "${profile}"] },
//!   "lint": null
//! }
//! ```
//!
//! Resolving a task expands `$name` / `${name}` placeholders in every string
//! of the task's value from the parameter object. A string made of exactly
//! one known placeholder takes the parameter's JSON value as-is.

use crate::resolver::ConfigResolver;
use async_trait::async_trait;
use monoflow_core::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Parameter payload for [`JsonConfigResolver`]
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConfigResolver;

impl JsonConfigResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConfigResolver for JsonConfigResolver {
    type Params = Params;
    type Config = Value;

    async fn resolve(
        &self,
        config_file: &Path,
        task: &str,
        params: &Params,
    ) -> Result<Option<Value>> {
        let content = tokio::fs::read_to_string(config_file)
            .await
            .map_err(|e| Error::config_load_with_source(config_file, "cannot read file", e))?;

        let document: Value = serde_json::from_str(&content)
            .map_err(|e| Error::config_load_with_source(config_file, "invalid JSON", e))?;

        let Value::Object(mut exports) = document else {
            return Err(Error::config_load(
                config_file,
                "expected a JSON object keyed by task name",
            ));
        };

        match exports.remove(task) {
            None | Some(Value::Null) => {
                tracing::trace!(task, file = %config_file.display(), "No export for task");
                Ok(None)
            }
            Some(value) => Ok(Some(expand_params(value, params))),
        }
    }
}

/// Expand parameter placeholders in every string leaf of `value`
pub fn expand_params(value: Value, params: &Params) -> Value {
    match value {
        Value::String(s) => expand_string(s, params),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| expand_params(item, params))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, item)| (key, expand_params(item, params)))
                .collect(),
        ),
        other => other,
    }
}

fn expand_string(s: String, params: &Params) -> Value {
    if let Some(value) = sole_placeholder(&s).and_then(|name| params.get(name)) {
        return value.clone();
    }

    let expanded = shellexpand::env_with_context_no_errors(&s, |name: &str| {
        params.get(name).map(param_text)
    });
    Value::String(expanded.into_owned())
}

/// `"$name"` or `"${name}"` with nothing around it
fn sole_placeholder(s: &str) -> Option<&str> {
    let name = s
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| s.strip_prefix('$'))?;

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
