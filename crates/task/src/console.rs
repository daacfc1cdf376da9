//! Human-facing task report: banners, outcome lines and buffered logs

use crossterm::style::Stylize;
use monoflow_core::{TaskOutcome, TaskState, BANNER_WIDTH, LOG_INDENT, STATE_LABEL_WIDTH};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Destination of the task report.
///
/// Each call writes its lines under one lock, so a workspace's outcome line
/// and its flushed log block are never split by another writer.
#[derive(Clone)]
pub struct Console {
    target: Arc<Mutex<Target>>,
    colored: bool,
}

enum Target {
    Stdout,
    Buffer(Vec<u8>),
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Console {
    /// Write to stdout, coloured when stdout is a terminal
    pub fn stdout() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Stdout)),
            colored: std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }

    /// Collect plain (uncoloured) output in memory
    pub fn capture() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Buffer(Vec::new()))),
            colored: false,
        }
    }

    /// Everything written so far to a capturing console
    pub fn captured(&self) -> String {
        match &*self.target.lock() {
            Target::Buffer(buf) => String::from_utf8_lossy(buf).into_owned(),
            Target::Stdout => String::new(),
        }
    }

    pub fn banner(&self, title: &str) {
        let line = format_banner(title);
        let line = if self.colored {
            line.magenta().to_string()
        } else {
            line
        };
        self.write_lines([line]);
    }

    pub fn outcome(&self, outcome: &TaskOutcome, duration_width: usize) {
        let duration = format!("{}ms", outcome.duration_ms());
        let label = format!("{:<width$}", outcome.state, width = STATE_LABEL_WIDTH);
        let label = if self.colored {
            match outcome.state {
                TaskState::Success => label.green().to_string(),
                TaskState::Error => label.red().to_string(),
                _ => label.yellow().to_string(),
            }
        } else {
            label
        };

        self.write_lines([format!(
            "{duration:<duration_width$} {label} {}",
            outcome.workspace.display()
        )]);
    }

    /// Indented block of buffered workspace logs
    pub fn logs(&self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.write_lines(lines.iter().map(|line| format!("{LOG_INDENT}{line}")));
    }

    pub fn line(&self, text: &str) {
        self.write_lines([text.to_string()]);
    }

    fn write_lines(&self, lines: impl IntoIterator<Item = String>) {
        let mut target = self.target.lock();
        match &mut *target {
            Target::Stdout => {
                let mut out = std::io::stdout().lock();
                for line in lines {
                    // a closed stdout must not take the run down with it
                    let _ = writeln!(out, "{line}");
                }
                let _ = out.flush();
            }
            Target::Buffer(buf) => {
                for line in lines {
                    buf.extend_from_slice(line.as_bytes());
                    buf.push(b'\n');
                }
            }
        }
    }
}

/// Centre ` title ` in a line of `=` characters
pub fn format_banner(title: &str) -> String {
    let padded = format!(" {title} ");
    let len = padded.chars().count();
    let start = BANNER_WIDTH / 2 + title.chars().count() / 2;
    let left = start.saturating_sub(len);
    let right = BANNER_WIDTH.saturating_sub(left + len);

    format!("{}{padded}{}", "=".repeat(left), "=".repeat(right))
}
