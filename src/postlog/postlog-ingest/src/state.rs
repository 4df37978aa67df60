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

/// Step of the orchestrator, published on a [`tokio::sync::watch`] channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run in progress.
    #[default]
    Idle,
    /// Loading the checkpoint and reading the log source.
    Reading,
    /// Parsing the lines after the checkpoint.
    Parsing,
    /// Grouping the entries by transaction id.
    Correlating,
    /// Writing the entries, then the delivery records.
    Persisting,
    /// Truncating the log source and saving the checkpoint.
    Finalizing,
    /// The run has been aborted, back to [`RunState::Idle`] right after.
    Failed,
}

impl RunState {
    /// A run holds the single-run guard in this state.
    #[must_use]
    pub const fn is_running(self) -> bool {
        !matches!(self, Self::Idle)
    }
}
