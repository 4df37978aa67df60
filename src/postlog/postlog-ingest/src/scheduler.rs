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
use crate::{progress::Trigger, IngestError, Ingestor, RunOutcome};

type Reply = tokio::sync::oneshot::Sender<Result<RunOutcome, IngestError>>;

/// Send on-demand triggers to a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    sender: tokio::sync::mpsc::Sender<Reply>,
}

impl SchedulerHandle {
    /// Start a run and wait for its outcome.
    ///
    /// # Errors
    ///
    /// * the run failed, see [`Ingestor::trigger`]
    /// * [`IngestError::SchedulerStopped`]
    pub async fn trigger(&self) -> Result<RunOutcome, IngestError> {
        let (reply, outcome) = tokio::sync::oneshot::channel();
        self.sender
            .send(reply)
            .await
            .map_err(|_| IngestError::SchedulerStopped)?;
        outcome.await.map_err(|_| IngestError::SchedulerStopped)?
    }

    /// Start a run without waiting for it, usable outside of the runtime.
    ///
    /// Returns `false` if the scheduler is stopped or overloaded.
    #[must_use]
    pub fn notify(&self) -> bool {
        // the outcome is traced by the run itself
        let (reply, _) = tokio::sync::oneshot::channel();
        self.sender.try_send(reply).is_ok()
    }
}

/// Trigger the runs of an [`Ingestor`] periodically and on demand.
#[derive(Debug)]
pub struct Scheduler {
    ingestor: std::sync::Arc<Ingestor>,
    period: std::time::Duration,
    receiver: tokio::sync::mpsc::Receiver<Reply>,
}

impl Scheduler {
    /// The first periodic run starts as soon as [`Scheduler::run`] is called.
    #[must_use]
    pub fn new(
        ingestor: std::sync::Arc<Ingestor>,
        period: std::time::Duration,
    ) -> (Self, SchedulerHandle) {
        let (sender, receiver) = tokio::sync::mpsc::channel(16);
        (
            Self {
                ingestor,
                period,
                receiver,
            },
            SchedulerHandle { sender },
        )
    }

    /// Serve the triggers until `shutdown` completes, then wait for the
    /// runs already started.
    pub async fn run(mut self, shutdown: impl std::future::Future<Output = ()> + Send) {
        let mut runs = tokio::task::JoinSet::new();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            period = %humantime::format_duration(self.period),
            "Scheduler started."
        );

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = interval.tick() => {
                    let ingestor = self.ingestor.clone();
                    runs.spawn(async move {
                        if let Err(error) = ingestor.trigger(Trigger::Periodic).await {
                            tracing::error!(%error, "Periodic run failed, retrying at the next tick.");
                        }
                    });
                }
                Some(reply) = self.receiver.recv() => {
                    let ingestor = self.ingestor.clone();
                    runs.spawn(async move {
                        // the requester may have gone away
                        let _ = reply.send(ingestor.trigger(Trigger::Manual).await);
                    });
                }
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(error) = joined {
                        tracing::error!(%error, "Run task aborted.");
                    }
                }
            }
        }

        self.receiver.close();
        if !runs.is_empty() {
            tracing::info!(tasks = runs.len(), "Waiting for the runs in progress.");
        }
        while let Some(joined) = runs.join_next().await {
            if let Err(error) = joined {
                tracing::error!(%error, "Run task aborted.");
            }
        }
        tracing::info!("Scheduler stopped.");
    }
}
