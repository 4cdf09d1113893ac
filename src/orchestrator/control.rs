//! Job lifecycle control: start, cancel, shutdown, and the event pump.

use super::{ActiveJob, MediaDownloader, lock_slot};
use crate::error::Error;
use crate::process::{self, ProcessEvent};
use crate::progress::parse_progress_line;
use crate::types::{DownloadOptions, Event, JobState, ProgressSample, Status};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Number of trailing stderr lines folded into failure messages
const STDERR_TAIL_LINES: usize = 4;

impl MediaDownloader {
    /// Start a download.
    ///
    /// Fire-and-forget: the call returns immediately and every outcome
    /// (progress, completion, failure) arrives through the event channel.
    /// A start request while a job is active is rejected with an
    /// `ALREADY_RUNNING` failure event, never queued; an empty URL is
    /// rejected with `INVALID_URL`. Neither rejection touches the running
    /// job.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, url: &str, options: DownloadOptions) {
        let url = url.trim().to_string();

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancelled = CancellationToken::new();
        let binary = self.config.tools.resolve_ytdlp();

        // The check-and-set on the slot must be atomic: real OS threads may
        // race concurrent start() calls. The preconditions are evaluated in
        // contract order (active job first, then URL).
        let events = {
            let mut slot = lock_slot(&self.slot);
            if slot.is_some() {
                drop(slot);
                tracing::warn!(url = %url, "start rejected, a download is already active");
                self.emit_failure(Error::AlreadyRunning);
                return;
            }
            if url.is_empty() {
                drop(slot);
                self.emit_failure(Error::InvalidUrl);
                return;
            }

            let args = super::args::build_args(&url, &options, &self.config);
            let (handle, events) = process::spawn_supervised(binary.clone(), args);
            *slot = Some(ActiveJob {
                generation,
                url: url.clone(),
                options,
                state: JobState::Starting,
                last_progress: None,
                started_at: chrono::Utc::now(),
                cancelled: cancelled.clone(),
                handle,
            });
            events
        };

        tracing::info!(url = %url, binary = %binary.display(), "starting download");

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.pump(generation, cancelled, binary, events).await;
        });
    }

    /// Cancel the active download.
    ///
    /// No-op if nothing is active. Otherwise the job's cancellation flag is
    /// set, the process is asked to terminate, the slot is freed
    /// immediately, and a terminal `Cancelled` status is emitted. Because
    /// termination is asynchronous, a new [`start`] may begin before the old
    /// process has actually exited; the flag suppresses that process's late
    /// exit event.
    ///
    /// [`start`]: MediaDownloader::start
    pub fn cancel(&self) {
        let job = lock_slot(&self.slot).take();
        let Some(job) = job else {
            tracing::debug!("cancel requested with no active download");
            return;
        };

        // Flag first so the pump suppresses the eventual exit event, then
        // request termination. The slot is already free at this point.
        job.cancelled.cancel();
        job.handle.terminate();

        tracing::info!(url = %job.url, "download cancelled");
        self.emit_event(Event::Status {
            status: Status::Cancelled,
            error_kind: Some(crate::error::ErrorKind::UserCancelled),
            message: Some("Download cancelled.".to_string()),
        });
    }

    /// Cancel any in-flight download so the embedding application can exit
    /// cleanly.
    pub fn shutdown(&self) {
        tracing::info!("shutting down");
        self.cancel();
    }

    /// Consume supervisor events for one job and drive the state machine.
    ///
    /// Runs on its own task, one per job; processes events strictly in the
    /// order the supervisor produced them.
    async fn pump(
        &self,
        generation: u64,
        cancelled: CancellationToken,
        binary: PathBuf,
        mut events: mpsc::UnboundedReceiver<ProcessEvent>,
    ) {
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while let Some(event) = events.recv().await {
            match event {
                ProcessEvent::Spawned { pid } => {
                    tracing::debug!(?pid, "process spawned");
                    self.mark_running(generation);
                }
                ProcessEvent::Line(line) => {
                    if let Some(sample) = parse_progress_line(line.trim()) {
                        // Lines drained after cancellation (or after the slot
                        // moved on to a successor) must not surface behind
                        // the terminal status
                        if self.record_progress(generation, &sample) {
                            self.emit_event(Event::Progress {
                                percentage: sample.percentage,
                                speed: sample.speed,
                                eta: sample.eta,
                            });
                        }
                    } else {
                        tracing::trace!(line = %line, "unmatched output line");
                    }
                }
                ProcessEvent::Stderr(line) => {
                    tracing::debug!(line = %line, "process stderr");
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line);
                }
                ProcessEvent::SpawnFailed(source) => {
                    let released = self.release_slot(generation);
                    if released {
                        self.emit_failure(Error::Spawn {
                            binary: binary.display().to_string(),
                            source,
                        });
                    } else {
                        // Cancelled (or superseded) before the launch failure
                        // surfaced; the terminal status is already out
                        tracing::debug!(error = %source, "spawn failure after job release suppressed");
                    }
                    return;
                }
                ProcessEvent::Exited { code } => {
                    if cancelled.is_cancelled() {
                        // cancel() already emitted the terminal Cancelled
                        // status and freed the slot; this exit must not
                        // produce a second terminal event
                        tracing::debug!(?code, "exit after cancellation suppressed");
                        return;
                    }
                    if !self.release_slot(generation) {
                        tracing::debug!(?code, "exit for a released job suppressed");
                        return;
                    }

                    if code == Some(0) {
                        tracing::info!("download completed");
                        self.emit_event(Event::Status {
                            status: Status::Completed,
                            error_kind: None,
                            message: Some("Download finished successfully.".to_string()),
                        });
                    } else {
                        let detail = (!stderr_tail.is_empty())
                            .then(|| stderr_tail.iter().cloned().collect::<Vec<_>>().join(" | "));
                        self.emit_failure(Error::ProcessFailed { code, detail });
                    }
                    return;
                }
            }
        }
    }

    /// Emit the single Failed status event for a classified error
    pub(crate) fn emit_failure(&self, error: Error) {
        let kind = error.kind();
        tracing::warn!(kind = ?kind, error = %error, "download failed");
        self.emit_event(Event::Status {
            status: Status::Failed,
            error_kind: Some(kind),
            message: Some(error.to_string()),
        });
    }

    fn mark_running(&self, generation: u64) {
        let mut slot = lock_slot(&self.slot);
        if let Some(job) = slot.as_mut()
            && job.generation == generation
        {
            job.state = JobState::Running;
        }
    }

    /// Record the latest sample on the active job.
    ///
    /// Returns false when this job no longer owns the slot, in which case
    /// the sample must not be emitted either.
    fn record_progress(&self, generation: u64, sample: &ProgressSample) -> bool {
        let mut slot = lock_slot(&self.slot);
        if let Some(job) = slot.as_mut()
            && job.generation == generation
        {
            job.last_progress = Some(sample.clone());
            return true;
        }
        false
    }

    /// Free the slot if this job still owns it.
    ///
    /// Returns false when the slot was already released (cancellation) or is
    /// occupied by a successor job, in which case no terminal event may be
    /// emitted for this generation.
    fn release_slot(&self, generation: u64) -> bool {
        let mut slot = lock_slot(&self.slot);
        match slot.as_ref() {
            Some(job) if job.generation == generation => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}
