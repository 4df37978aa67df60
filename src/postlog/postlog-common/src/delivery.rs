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
use crate::{FieldSet, TransactionId};

/// The consolidated view of one email, keyed by its transaction id.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeliveryRecord {
    ///
    pub transaction_id: TransactionId,
    /// The earliest parsed timestamp of the entries of this transaction.
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_seen_at: Option<time::OffsetDateTime>,
    /// Fields merged from all the entries of this transaction.
    #[serde(flatten)]
    pub fields: FieldSet,
}

impl DeliveryRecord {
    ///
    #[must_use]
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            first_seen_at: None,
            fields: FieldSet::default(),
        }
    }

    /// Merge the fields of a later entry into the record.
    pub fn absorb(&mut self, occurred_at: Option<time::OffsetDateTime>, fields: FieldSet) {
        self.first_seen_at = match (self.first_seen_at, occurred_at) {
            (Some(current), Some(other)) => Some(std::cmp::min(current, other)),
            (current, other) => current.or(other),
        };
        self.fields.overlay(fields);
    }

    /// The record carries a sender or a recipient, and is worth persisting.
    #[must_use]
    pub const fn is_identifying(&self) -> bool {
        self.fields.is_identifying()
    }
}
