use clap::Parser;
use monoflow_config::Params;
use monoflow_core::{DEFAULT_CONCURRENCY, DEFAULT_CONFIG_FILE};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "monoflow")]
#[command(about = "Run a task across every workspace of a monorepo", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file looked up in every workspace
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,

    /// JSON file keeping task cache entries between runs
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Directory for artifacts cached by task commands, passed to them as
    /// MONOFLOW_CACHE_DIR
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Workspace directory (repeatable, run in the given order)
    #[arg(short = 'w', long = "workspace", value_name = "DIR")]
    pub workspaces: Vec<PathBuf>,

    /// Register every directory under ROOT holding a configuration file
    #[arg(long, value_name = "ROOT")]
    pub discover: Option<PathBuf>,

    /// Number of workspaces running at once
    #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Parameter available to configuration files as $KEY (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Print the outcomes as JSON once every task has run
    #[arg(long)]
    pub json: bool,

    /// Tasks to run, in order
    #[arg(required = true, value_name = "TASK")]
    pub tasks: Vec<String>,
}

impl Cli {
    /// Parameters as the JSON object handed to the configuration resolver
    pub fn param_map(&self) -> Params {
        self.params.iter().cloned().collect()
    }
}

/// `key=value`, where a value that parses as JSON keeps its JSON type
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;

    if key.is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param_keeps_json_types() {
        assert_eq!(parse_param("jobs=4").unwrap(), ("jobs".to_string(), json!(4)));
        assert_eq!(parse_param("fast=true").unwrap(), ("fast".to_string(), json!(true)));
        assert_eq!(
            parse_param("profile=release").unwrap(),
            ("profile".to_string(), json!("release"))
        );
        assert_eq!(
            parse_param("expr=a=b").unwrap(),
            ("expr".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn test_parse_param_rejects_malformed() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["monoflow", "build"]).unwrap();
        assert_eq!(cli.config_file, DEFAULT_CONFIG_FILE);
        assert_eq!(cli.concurrency, DEFAULT_CONCURRENCY);
        assert!(cli.workspaces.is_empty());
        assert_eq!(cli.tasks, vec!["build"]);
        assert!(!cli.json);
        assert_eq!(cli.cache_dir, None);
    }

    #[test]
    fn test_full_command_line() {
        let cli = Cli::try_parse_from([
            "monoflow",
            "-w",
            "packages/a",
            "--workspace",
            "packages/b",
            "-j",
            "4",
            "-p",
            "profile=release",
            "--cache",
            ".temp/cache.json",
            "--cache-dir",
            ".temp/artifacts",
            "--json",
            "lint",
            "test",
        ])
        .unwrap();

        assert_eq!(
            cli.workspaces,
            vec![PathBuf::from("packages/a"), PathBuf::from("packages/b")]
        );
        assert_eq!(cli.concurrency, 4);
        assert_eq!(cli.param_map()["profile"], json!("release"));
        assert_eq!(cli.cache, Some(PathBuf::from(".temp/cache.json")));
        assert_eq!(cli.cache_dir, Some(PathBuf::from(".temp/artifacts")));
        assert_eq!(cli.tasks, vec!["lint", "test"]);
    }

    #[test]
    fn test_task_is_required() {
        assert!(Cli::try_parse_from(["monoflow"]).is_err());
    }
}
