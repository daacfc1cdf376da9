use clap::Parser;
use monoflow::{Cli, TaskReport};
use monoflow_task::Console;
use serde_json::json;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    if let Err(e) = monoflow_utils::tracing::init() {
        eprintln!("Warning: failed to initialise logging: {e}");
    }

    let cli = Cli::parse();
    let reports = monoflow::run(&cli, Console::stdout()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json_report(&reports))?);
    }

    if reports.iter().any(TaskReport::has_errors) {
        std::process::exit(1);
    }
    Ok(())
}

/// Flat array with one entry per task and workspace
fn json_report(reports: &[TaskReport]) -> serde_json::Value {
    reports
        .iter()
        .flat_map(|report| {
            report.outcomes.iter().map(|outcome| {
                json!({
                    "task": report.task,
                    "state": outcome.state,
                    "workspace": outcome.workspace,
                    "duration_ms": outcome.duration_ms() as u64,
                })
            })
        })
        .collect()
}
