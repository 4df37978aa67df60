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

//! postlog common definitions
//!
//! Everything needed to turn the lines of a Postfix log file into
//! per-message delivery records, without any I/O:
//!
//! * [`LogEntry`]: one parsed line `timestamp host service[pid]: message`.
//! * [`TransactionId`]: the Postfix queue id heading a correlatable message.
//! * [`FieldSet`] and [`extract`]: the service specific `key=value` fields.
//! * [`Correlation`]: entries of one run grouped by transaction id.
//! * [`Checkpoint`]: the cursor persisted between two runs.

#![doc(html_no_source)]
#![warn(missing_docs)]
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
mod correlator;
mod delivery;
mod entry;
mod fields;
mod service;
mod transaction;

/// Conversion helpers between instants and their storage representation.
pub mod utils;

pub use checkpoint::Checkpoint;
pub use correlator::{correlate, Correlation};
pub use delivery::DeliveryRecord;
pub use entry::{LogEntry, ParseError};
pub use fields::{extract, FieldSet};
pub use service::{ServiceKind, ServiceMap};
pub use transaction::TransactionId;

/// Re-exported dependencies
pub mod re {
    pub use strum;
    pub use time;
}
