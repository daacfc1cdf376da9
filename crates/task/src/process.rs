//! External process execution with streamed output capture

use monoflow_core::{Error, Result, ResultExt};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Which pipe a chunk of output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Options applied to a spawned process
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Working directory; the workspace directory when unset
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Start from an empty environment instead of inheriting ours
    pub clear_env: bool,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }
}

/// How a process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, absent when the process was killed by a signal
    pub code: Option<i32>,
    /// Terminating signal (unix only)
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Run `command` to completion, handing every output chunk to `sink`.
///
/// Stdout and stderr are read concurrently. The returned future resolves
/// only after both pipes are drained and the child has exited.
pub async fn run_process<F>(
    command: &str,
    args: &[String],
    options: &SpawnOptions,
    mut sink: F,
) -> Result<ProcessExit>
where
    F: FnMut(OutputStream, &[u8]) + Send,
{
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if options.clear_env {
        cmd.env_clear();
    }
    cmd.envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::process_spawn(command, args.to_vec(), e))?;

    tracing::debug!(command, args = ?args, pid = ?child.id(), "Spawned process");

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        forward(stdout, OutputStream::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward(stderr, OutputStream::Stderr, tx.clone());
    }
    drop(tx);

    while let Some((stream, chunk)) = rx.recv().await {
        sink(stream, &chunk);
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to wait for '{command}'"))?;

    let exit = ProcessExit::from(status);
    tracing::debug!(command, code = ?exit.code, signal = ?exit.signal, "Process exited");
    Ok(exit)
}

fn forward<R>(mut pipe: R, stream: OutputStream, tx: mpsc::UnboundedSender<(OutputStream, Vec<u8>)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(?stream, error = %e, "Failed to read process output");
                    break;
                }
            }
        }
    });
}

/// Reassembles chunked output into whole lines
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub(crate) fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(String)) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            emit(decode_line(&line));
        }
    }

    pub(crate) fn finish(&mut self, mut emit: impl FnMut(String)) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            emit(decode_line(&rest));
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
