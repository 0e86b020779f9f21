//! Streaming process execution.
//!
//! [`run_streamed`] spawns an external tool and multiplexes its stdout and
//! stderr into per-line handler calls while the process runs. Each stream is
//! drained by its own task through a [`LineReader`]; lines are forwarded over
//! a channel and delivered to the handler on the caller's task, so the
//! handler needs no synchronization. Within one stream line order is
//! preserved; across the two streams no ordering is guaranteed.
//!
//! There is deliberately no timeout or kill path: rips and transcodes are
//! long-running, and a spawned process runs to completion or failure.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::console::StatusLine;
use crate::line_reader::LineReader;

/// Which output stream a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    /// True for lines read from standard error.
    pub fn is_stderr(self) -> bool {
        matches!(self, StreamSource::Stderr)
    }
}

/// Read one stream to EOF, forwarding complete lines over the channel.
async fn drain_stream<R>(mut stream: R, source: StreamSource, tx: mpsc::Sender<(String, StreamSource)>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = LineReader::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in reader.push(&chunk[..n]) {
                    if tx.send((line, source)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("stream read error on {source:?}: {e}");
                break;
            }
        }
    }

    if let Some(residual) = reader.finish() {
        let _ = tx.send((residual, source)).await;
    }
}

/// Spawn `program` with `args` and stream its output through `handler`.
///
/// The handler is invoked once per decoded line with the line text, the
/// stream it came from, and a [`StatusLine`] for ephemeral progress output.
/// Partial output already delivered is not retracted on failure.
///
/// Returns the child's exit status once the process has terminated and both
/// streams have reached end-of-stream.
///
/// # Errors
///
/// Returns [`rf_core::Error::Launch`] if the program cannot be spawned; the
/// handler is never invoked in that case.
pub async fn run_streamed<F>(
    program: &Path,
    args: &[String],
    mut handler: F,
) -> rf_core::Result<ExitStatus>
where
    F: FnMut(&str, StreamSource, &StatusLine),
{
    let tool_name = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string_lossy().into_owned());

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| rf_core::Error::launch(&tool_name, e))?;

    tracing::debug!("Executing: {} {:?}", program.display(), args);

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let (tx, mut rx) = mpsc::channel::<(String, StreamSource)>(64);
    let tx_err = tx.clone();

    let stdout_task = tokio::spawn(drain_stream(stdout, StreamSource::Stdout, tx));
    let stderr_task = tokio::spawn(drain_stream(stderr, StreamSource::Stderr, tx_err));

    let status_line = StatusLine::new();
    // The channel closes once both drain tasks have dropped their senders,
    // i.e. both streams hit EOF.
    while let Some((line, source)) = rx.recv().await {
        handler(&line, source, &status_line);
    }

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let status = child.wait().await?;
    tracing::debug!("{tool_name} exited with {status}");
    Ok(status)
}
