//! postlog ingest
//!
//! Moves the new lines of the Postfix log file into the store, one run at
//! a time:
//!
//! ```text
//! Idle -> Reading -> Parsing -> Correlating -> Persisting -> Finalizing -> Idle
//!            \__________\____________\_____________\___________\-> Failed -> Idle
//! ```
//!
//! The [`Checkpoint`](postlog_common::Checkpoint) is the retry cursor: it is
//! only moved forward by a run going through the finalization, a failed run
//! is retried from the same line by the next trigger.

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod checkpoint;
mod error;
mod ingestor;
mod scheduler;
mod source;
mod state;

/// Events streamed to the observers of a run.
pub mod progress;

pub use checkpoint::{CheckpointStore, FileCheckpointStore};
pub use error::IngestError;
pub use ingestor::{Ingestor, RunOutcome, RunReport};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use source::{LogSource, Snapshot};
pub use state::RunState;
