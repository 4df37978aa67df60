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

/// What started a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, serde::Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// The interval of the scheduler elapsed.
    Periodic,
    /// An explicit request: command line, signal or API.
    Manual,
}

/// Severity of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    ///
    Info,
    ///
    Warn,
    ///
    Error,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FinishStatus {
    /// The run reached the end of the finalization, or had nothing to do.
    Succeeded,
    /// The run ended in the `Failed` state.
    Failed,
}

/// One event of the progress stream.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A run started.
    Started {
        ///
        run_id: u64,
        ///
        trigger: Trigger,
    },
    /// A human readable line produced by the run.
    Line {
        ///
        run_id: u64,
        ///
        level: Level,
        ///
        message: String,
    },
    /// The terminal marker of a run, always emitted once per started run.
    Finished {
        ///
        run_id: u64,
        ///
        status: FinishStatus,
        ///
        summary: String,
    },
}

impl ProgressEvent {
    ///
    #[must_use]
    pub const fn run_id(&self) -> u64 {
        match self {
            Self::Started { run_id, .. }
            | Self::Line { run_id, .. }
            | Self::Finished { run_id, .. } => *run_id,
        }
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started { run_id, trigger } => write!(f, "[run {run_id}] started ({trigger})"),
            Self::Line {
                run_id,
                level,
                message,
            } => write!(f, "[run {run_id}] {level:<5} {message}"),
            Self::Finished {
                run_id,
                status,
                summary,
            } => write!(f, "[run {run_id}] {status}: {summary}"),
        }
    }
}

/// Fan out of the progress events to any number of subscribers.
///
/// Events emitted without subscriber are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: tokio::sync::broadcast::Sender<ProgressEvent>,
}

impl ProgressSink {
    /// `channel_size` events are kept for a slow subscriber.
    #[must_use]
    pub fn new(channel_size: usize) -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(channel_size.max(1)).0,
        }
    }

    ///
    pub fn emit(&self, event: ProgressEvent) {
        // an error means there is no subscriber
        let _ = self.sender.send(event);
    }

    /// Receive the events emitted from now on, until the end of the next run.
    #[must_use]
    pub fn subscribe(&self) -> ProgressStream {
        ProgressStream {
            receiver: self.sender.subscribe(),
            run_id: None,
            done: false,
        }
    }
}

/// The events of one run, ending after its [`ProgressEvent::Finished`].
#[derive(Debug)]
pub struct ProgressStream {
    receiver: tokio::sync::broadcast::Receiver<ProgressEvent>,
    run_id: Option<u64>,
    done: bool,
}

impl ProgressStream {
    /// The next event of the followed run, `None` once it is finished.
    ///
    /// The followed run is the first one observed.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        use tokio::sync::broadcast::error::RecvError;

        while !self.done {
            match self.receiver.recv().await {
                Ok(event) => {
                    let run_id = *self.run_id.get_or_insert(event.run_id());
                    if event.run_id() != run_id {
                        continue;
                    }
                    if matches!(event, ProgressEvent::Finished { .. }) {
                        self.done = true;
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress subscriber lagging, events lost.");
                }
                Err(RecvError::Closed) => self.done = true,
            }
        }

        None
    }
}
