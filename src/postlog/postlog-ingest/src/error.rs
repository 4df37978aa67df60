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

/// A run ended in the `Failed` state, surfaced to the caller of the trigger.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The log source exists but cannot be read.
    #[error("cannot read the log source: {0}")]
    Read(#[source] std::io::Error),
    /// The store became unavailable.
    #[error(transparent)]
    Store(#[from] postlog_store::StoreError),
    /// The log source cannot be emptied after the persistence.
    #[error("cannot truncate the log source: {0}")]
    Truncate(#[source] std::io::Error),
    /// The checkpoint cannot be written.
    #[error("cannot save the checkpoint: {0}")]
    Checkpoint(String),
    /// The run lasted longer than the configured deadline.
    #[error("the run exceeded its deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),
    /// The scheduler is not accepting triggers anymore.
    #[error("the scheduler is stopped")]
    SchedulerStopped,
}
