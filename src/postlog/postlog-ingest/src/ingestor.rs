/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 */
use crate::{
    progress::{FinishStatus, Level, ProgressEvent, ProgressSink, ProgressStream, Trigger},
    CheckpointStore, FileCheckpointStore, IngestError, LogSource, RunState,
};
use postlog_common::{correlate, Checkpoint, LogEntry, ServiceMap};
use postlog_store::{LogStore, PersistSummary};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counts of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    ///
    pub run_id: u64,
    /// Complete lines after the checkpoint.
    pub lines_read: usize,
    /// Lines which are not log entries, skipped.
    pub parse_errors: u64,
    ///
    pub entries: PersistSummary,
    ///
    pub deliveries: PersistSummary,
    /// Entries without a transaction id, stored as raw entries only.
    pub uncorrelated: usize,
    /// The log source has been emptied.
    pub truncated: bool,
    /// The cursor saved at the end of the run.
    pub line_index: usize,
    ///
    #[serde(with = "humantime_serde")]
    pub duration: std::time::Duration,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} line(s) read, {} parse error(s), {} entrie(s) inserted ({} duplicate(s), {} rejected), \
             {} delivery record(s) upserted ({} rejected, {} skipped), {} in {}",
            self.lines_read,
            self.parse_errors,
            self.entries.written,
            self.entries.duplicates,
            self.entries.rejected,
            self.deliveries.written,
            self.deliveries.rejected,
            self.deliveries.skipped,
            if self.truncated {
                "log source truncated".to_string()
            } else {
                format!("checkpoint at line {}", self.line_index)
            },
            humantime::format_duration(self.duration),
        )
    }
}

/// What a trigger resulted in.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run went through the finalization.
    Completed(RunReport),
    /// The log source does not exist, nothing has been modified.
    MissingSource,
    /// The log source is empty, the checkpoint has been rewound.
    EmptySource,
    /// Another run is in progress, the trigger has been dropped.
    AlreadyRunning,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed(report) => write!(f, "{report}"),
            Self::MissingSource => f.write_str("log source not found, nothing to do"),
            Self::EmptySource => f.write_str("log source empty, checkpoint rewound"),
            Self::AlreadyRunning => f.write_str("a run is already in progress"),
        }
    }
}

/// The run orchestrator: reads the new lines of the log source, persists
/// them and moves the checkpoint, one run at a time.
#[derive(Debug)]
pub struct Ingestor {
    source: LogSource,
    checkpoint: std::sync::Arc<dyn CheckpointStore>,
    store: std::sync::Arc<dyn LogStore>,
    services: ServiceMap,
    truncate: bool,
    deadline: Option<std::time::Duration>,
    progress: ProgressSink,
    state: tokio::sync::watch::Sender<RunState>,
    running: AtomicBool,
    last_run_id: AtomicU64,
}

/// Held during a run, releases the single-run flag when dropped.
struct RunGuard<'a> {
    ingestor: &'a Ingestor,
}

impl<'a> RunGuard<'a> {
    fn acquire(ingestor: &'a Ingestor) -> Option<Self> {
        ingestor
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { ingestor })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        // released under the lock of the state, a receiver observing `Idle`
        // can start the next run
        self.ingestor.state.send_modify(|state| {
            self.ingestor.running.store(false, Ordering::Release);
            *state = RunState::Idle;
        });
    }
}

impl Ingestor {
    /// An orchestrator with truncation enabled, no deadline and the default progress buffer.
    #[must_use]
    pub fn new(
        source: LogSource,
        checkpoint: std::sync::Arc<dyn CheckpointStore>,
        store: std::sync::Arc<dyn LogStore>,
        services: ServiceMap,
    ) -> Self {
        Self {
            source,
            checkpoint,
            store,
            services,
            truncate: true,
            deadline: None,
            progress: ProgressSink::new(256),
            state: tokio::sync::watch::channel(RunState::Idle).0,
            running: AtomicBool::new(false),
            last_run_id: AtomicU64::new(0),
        }
    }

    /// Build the orchestrator described by the configuration, on top of `store`.
    #[must_use]
    pub fn from_config(
        config: &postlog_config::Config,
        store: std::sync::Arc<dyn LogStore>,
    ) -> Self {
        Self::new(
            LogSource::new(&config.source.filepath),
            std::sync::Arc::new(FileCheckpointStore::new(&config.checkpoint.filepath)),
            store,
            config.service_map(),
        )
        .with_truncate(config.source.truncate)
        .with_deadline(config.schedule.deadline)
        .with_progress(ProgressSink::new(config.progress.channel_size))
    }

    /// Empty the log source after a run which inserted new entries.
    #[must_use]
    pub const fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Abort the runs lasting longer than `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<std::time::Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    ///
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Follow the progress of the next run.
    #[must_use]
    pub fn subscribe(&self) -> ProgressStream {
        self.progress.subscribe()
    }

    /// Observe the step of the current run.
    #[must_use]
    pub fn state(&self) -> tokio::sync::watch::Receiver<RunState> {
        self.state.subscribe()
    }

    ///
    #[must_use]
    pub const fn store(&self) -> &std::sync::Arc<dyn LogStore> {
        &self.store
    }

    /// Start a run and wait for its outcome.
    ///
    /// If a run is already in progress the trigger is dropped and
    /// [`RunOutcome::AlreadyRunning`] is returned immediately.
    ///
    /// # Errors
    ///
    /// * the run ended in the [`RunState::Failed`] state, the checkpoint has
    ///   not been advanced
    pub async fn trigger(&self, trigger: Trigger) -> Result<RunOutcome, IngestError> {
        let Some(_guard) = RunGuard::acquire(self) else {
            tracing::info!(%trigger, "A run is already in progress, trigger dropped.");
            return Ok(RunOutcome::AlreadyRunning);
        };

        let run_id = self.last_run_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.execute(run_id, trigger).await
    }

    #[tracing::instrument(name = "run", skip(self))]
    async fn execute(&self, run_id: u64, trigger: Trigger) -> Result<RunOutcome, IngestError> {
        self.progress.emit(ProgressEvent::Started { run_id, trigger });
        let started = std::time::Instant::now();

        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run(run_id, started))
                .await
                .unwrap_or(Err(IngestError::DeadlineExceeded(deadline))),
            None => self.run(run_id, started).await,
        };

        let (status, summary) = match &result {
            Ok(outcome) => {
                tracing::info!(%outcome, "Run succeeded.");
                (FinishStatus::Succeeded, outcome.to_string())
            }
            Err(error) => {
                self.enter(RunState::Failed);
                self.line(run_id, Level::Error, format!("run failed: {error}"));
                (FinishStatus::Failed, error.to_string())
            }
        };

        self.progress.emit(ProgressEvent::Finished {
            run_id,
            status,
            summary,
        });
        result
    }

    async fn run(
        &self,
        run_id: u64,
        started: std::time::Instant,
    ) -> Result<RunOutcome, IngestError> {
        self.enter(RunState::Reading);

        let mut checkpoint = self.checkpoint.load().await;
        let Some(snapshot) = self.source.read().await.map_err(IngestError::Read)? else {
            self.line(
                run_id,
                Level::Warn,
                format!("log source '{}' not found, nothing to do", self.source.filepath().display()),
            );
            return Ok(RunOutcome::MissingSource);
        };

        if snapshot.is_empty() {
            checkpoint.rewind();
            self.save(&checkpoint).await?;
            self.line(run_id, Level::Info, "log source is empty, checkpoint rewound".to_string());
            return Ok(RunOutcome::EmptySource);
        }

        if checkpoint.line_index > snapshot.lines.len() {
            self.line(
                run_id,
                Level::Warn,
                format!(
                    "checkpoint at line {} but the log source has {} line(s), it has been replaced: reading from the first line",
                    checkpoint.line_index,
                    snapshot.lines.len()
                ),
            );
            checkpoint.rewind();
        }

        let first_line = checkpoint.line_index;
        let pending = &snapshot.lines[first_line..];
        self.line(
            run_id,
            Level::Info,
            format!(
                "{} new line(s) from line {} of '{}'{}",
                pending.len(),
                first_line,
                self.source.filepath().display(),
                if snapshot.partial_tail { ", unterminated last line left for the next run" } else { "" }
            ),
        );

        self.enter(RunState::Parsing);
        let mut entries = Vec::with_capacity(pending.len());
        let mut parse_errors = 0_u64;
        for (offset, line) in pending.iter().enumerate() {
            match line.parse::<LogEntry>() {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::debug!(line = first_line + offset + 1, %error, "Line skipped.");
                    parse_errors += 1;
                }
            }
        }
        if parse_errors != 0 {
            self.line(run_id, Level::Warn, format!("{parse_errors} line(s) are not log entries, skipped"));
        }

        self.enter(RunState::Correlating);
        let correlation = correlate(&entries, &self.services);
        self.line(
            run_id,
            Level::Info,
            format!(
                "{} entrie(s) parsed, {} transaction(s), {} without transaction id",
                entries.len(),
                correlation.records.len(),
                correlation.uncorrelated
            ),
        );

        self.enter(RunState::Persisting);
        self.store.ping().await?;
        let entries_summary = self.store.persist_entries(&entries).await?;
        self.line(
            run_id,
            if entries_summary.rejected == 0 { Level::Info } else { Level::Warn },
            format!(
                "{} entrie(s) inserted, {} already stored, {} rejected",
                entries_summary.written, entries_summary.duplicates, entries_summary.rejected
            ),
        );
        let deliveries_summary = self.store.persist_deliveries(&correlation).await?;
        self.line(
            run_id,
            if deliveries_summary.rejected == 0 { Level::Info } else { Level::Warn },
            format!(
                "{} delivery record(s) upserted, {} rejected, {} without sender nor recipient",
                deliveries_summary.written, deliveries_summary.rejected, deliveries_summary.skipped
            ),
        );

        self.enter(RunState::Finalizing);
        let counters = |checkpoint: &mut Checkpoint| {
            checkpoint.record_run(
                time::OffsetDateTime::now_utc(),
                entries_summary.written,
                deliveries_summary.written,
                parse_errors,
            );
        };

        let truncated = if entries_summary.written != 0 && self.truncate && !snapshot.partial_tail {
            self.finalize_truncating(
                run_id,
                &mut checkpoint,
                snapshot.lines.len(),
                snapshot.byte_len,
                counters,
            )
            .await?
        } else {
            checkpoint.line_index = snapshot.lines.len();
            counters(&mut checkpoint);
            self.save(&checkpoint).await?;
            false
        };

        Ok(RunOutcome::Completed(RunReport {
            run_id,
            lines_read: pending.len(),
            parse_errors,
            entries: entries_summary,
            deliveries: deliveries_summary,
            uncorrelated: correlation.uncorrelated,
            truncated,
            line_index: checkpoint.line_index,
            duration: started.elapsed(),
        }))
    }

    /// The rewound checkpoint is saved before the truncation, a crash or a
    /// failed truncation in between only causes a re-read.
    ///
    /// `counters` is applied once the log source is settled.
    async fn finalize_truncating(
        &self,
        run_id: u64,
        checkpoint: &mut Checkpoint,
        line_count: usize,
        byte_len: u64,
        counters: impl FnOnce(&mut Checkpoint) + Send,
    ) -> Result<bool, IngestError> {
        checkpoint.rewind();
        self.save(checkpoint).await?;

        let truncated = self
            .source
            .truncate_if_unchanged(byte_len)
            .await
            .map_err(IngestError::Truncate)?;

        if truncated {
            self.line(run_id, Level::Info, "log source truncated".to_string());
        } else {
            checkpoint.line_index = line_count;
            self.line(
                run_id,
                Level::Info,
                format!("log source modified during the run, not truncated, checkpoint at line {line_count}"),
            );
        }

        counters(checkpoint);
        self.save(checkpoint).await?;
        Ok(truncated)
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), IngestError> {
        self.checkpoint
            .save(checkpoint)
            .await
            .map_err(|error| IngestError::Checkpoint(format!("{error:#}")))
    }

    fn enter(&self, state: RunState) {
        tracing::trace!(%state, "Entering state.");
        self.state.send_replace(state);
    }

    fn line(&self, run_id: u64, level: Level, message: String) {
        match level {
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
        self.progress.emit(ProgressEvent::Line {
            run_id,
            level,
            message,
        });
    }
}
