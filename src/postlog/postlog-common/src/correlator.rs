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
use crate::{extract, DeliveryRecord, LogEntry, ServiceMap, TransactionId};

/// The delivery records built from the entries of one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Correlation {
    /// One record per transaction id, sorted by id.
    pub records: std::collections::BTreeMap<TransactionId, DeliveryRecord>,
    /// Number of entries without a leading transaction id.
    pub uncorrelated: usize,
}

impl Correlation {
    /// Records carrying a sender or a recipient, the others are not persisted.
    pub fn identifying(&self) -> impl Iterator<Item = &DeliveryRecord> {
        self.records.values().filter(|r| r.is_identifying())
    }
}

/// Group `entries` by transaction id and merge their fields, in file order.
///
/// A field observed by a later entry replaces the value of an earlier one.
#[must_use]
pub fn correlate<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    services: &ServiceMap,
) -> Correlation {
    let mut correlation = Correlation::default();

    for entry in entries {
        let Some(transaction_id) = entry.transaction_id() else {
            correlation.uncorrelated += 1;
            continue;
        };

        let kind = services.classify(&entry.service);
        tracing::trace!(%transaction_id, %kind, service = %entry.service, "Entry correlated.");
        let fields = extract(kind, &entry.content);

        correlation
            .records
            .entry(transaction_id.clone())
            .or_insert_with(|| DeliveryRecord::new(transaction_id))
            .absorb(entry.occurred_at, fields);
    }

    correlation
}
