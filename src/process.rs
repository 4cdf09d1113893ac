//! Supervision of the external extraction process
//!
//! Spawning and process exit are inherently asynchronous, so nothing in this
//! module fails synchronously: [`spawn_supervised`] returns a handle plus an
//! event receiver immediately, and every outcome (spawn failure included)
//! arrives as a [`ProcessEvent`] on the channel.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle and output events forwarded from a supervised process
#[derive(Debug)]
pub(crate) enum ProcessEvent {
    /// The process launched; sent before any output line
    Spawned {
        /// OS process id, when still available
        pid: Option<u32>,
    },
    /// One complete stdout line, in write order. A partial final line is
    /// flushed at EOF.
    Line(String),
    /// One complete stderr line
    Stderr(String),
    /// The executable could not be launched (missing binary, permissions)
    SpawnFailed(std::io::Error),
    /// The process exited; `code` is None on signal termination.
    /// Sent exactly once, after all `Line` events.
    Exited {
        /// Exit code reported by the OS
        code: Option<i32>,
    },
}

/// Handle for requesting graceful termination of a supervised process
#[derive(Debug, Clone)]
pub(crate) struct ProcessHandle {
    term: CancellationToken,
}

impl ProcessHandle {
    /// Ask the process to stop.
    ///
    /// This is a request (SIGTERM on unix), not a forced kill; yt-dlp traps
    /// it to clean up partial files. Idempotent, and a no-op once the
    /// process has already exited.
    pub(crate) fn terminate(&self) {
        self.term.cancel();
    }
}

/// Launch `program` with `args` and supervise it on a background task.
///
/// Returns immediately. The receiver yields `Spawned`, then stdout `Line`s
/// interleaved with `Stderr` lines, then exactly one `Exited`, or a single
/// `SpawnFailed` if the executable could not be launched.
pub(crate) fn spawn_supervised(
    program: PathBuf,
    args: Vec<String>,
) -> (ProcessHandle, mpsc::UnboundedReceiver<ProcessEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let term = CancellationToken::new();
    let handle = ProcessHandle { term: term.clone() };

    tokio::spawn(supervise(program, args, term, tx));

    (handle, rx)
}

async fn supervise(
    program: PathBuf,
    args: Vec<String>,
    term: CancellationToken,
    tx: mpsc::UnboundedSender<ProcessEvent>,
) {
    let mut child = match Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tx.send(ProcessEvent::SpawnFailed(e)).ok();
            return;
        }
    };

    tx.send(ProcessEvent::Spawned { pid: child.id() }).ok();

    // stderr is drained on its own task so a chatty stderr cannot stall the
    // stdout reader
    let stderr_task = child.stderr.take().map(|stderr| {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tx.send(ProcessEvent::Stderr(line)).ok();
            }
        })
    });

    // A termination request may already be pending if the caller cancelled
    // between spawn_supervised() and this task getting scheduled.
    let mut termination_requested = term.is_cancelled();
    if termination_requested {
        request_termination(&mut child);
    }

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        tx.send(ProcessEvent::Line(line)).ok();
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed reading process stdout");
                        break;
                    }
                },
                _ = term.cancelled(), if !termination_requested => {
                    request_termination(&mut child);
                    termination_requested = true;
                }
            }
        }
    }

    if let Some(task) = stderr_task {
        task.await.ok();
    }

    // stdout hit EOF; wait for the exit status while still honoring a late
    // termination request
    loop {
        tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) => {
                        tx.send(ProcessEvent::Exited {
                            code: status.code(),
                        })
                        .ok();
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed waiting on child process");
                        tx.send(ProcessEvent::Exited { code: None }).ok();
                    }
                }
                return;
            }
            _ = term.cancelled(), if !termination_requested => {
                request_termination(&mut child);
                termination_requested = true;
            }
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    // child.id() is None once the process has been reaped, which makes
    // repeated termination requests a no-op
    if let Some(pid) = child.id() {
        let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if ret != 0 {
            tracing::debug!(pid, "SIGTERM delivery failed, process likely gone");
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    // No SIGTERM equivalent; start_kill is the closest termination request
    child.start_kill().ok();
}
