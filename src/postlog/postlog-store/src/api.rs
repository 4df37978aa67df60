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
use crate::{DeliveryFilter, EntryFilter, Page, Paginated};
use postlog_common::{Correlation, DeliveryRecord, LogEntry, TransactionId};

/// Failure of a storage operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be reached, nothing more can be written during this run.
    #[error("the store is unavailable: {0}")]
    Unavailable(String),
    /// One record has been refused, the other records can still be written.
    #[error("the record `{key}` has been rejected: {reason}")]
    Rejected {
        /// Identifies the record, a fingerprint or a transaction id.
        key: String,
        ///
        reason: String,
    },
}

impl StoreError {
    /// The error aborts the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

///
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the persistence of a batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PersistSummary {
    /// Rows inserted, or upserted for the deliveries.
    pub written: u64,
    /// Raw entries already present in the store.
    pub duplicates: u64,
    /// Records refused by the store, logged and skipped.
    pub rejected: u64,
    /// Delivery records without sender nor recipient, not persisted.
    pub skipped: u64,
}

/// A raw entry as stored, with its row id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredEntry {
    /// Auto assigned, increasing with the insertion order.
    pub id: i64,
    ///
    pub transaction_id: Option<TransactionId>,
    ///
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Aggregated counts of the store.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    /// Number of raw entries.
    pub entries: u64,
    /// Number of delivery records.
    pub deliveries: u64,
    /// Number of delivery records per status, `unknown` if no status was observed.
    pub by_status: std::collections::BTreeMap<String, u64>,
}

/// Persistence of the raw entries and of the delivery records, and the
/// read-only projection used by the inspection tools.
#[async_trait::async_trait]
pub trait LogStore
where
    Self: std::fmt::Debug + Sync + Send,
{
    /// Check the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Insert the entry unless an entry with the same fingerprint exists.
    ///
    /// Returns `false` if the entry was already stored.
    async fn insert_entry(&self, entry: &LogEntry) -> StoreResult<bool>;

    /// Insert the record, or merge it into the stored record of the same transaction id.
    ///
    /// Each incoming field replaces the stored one, unless it is `None`.
    /// The stored `first_seen_at` is the earliest of both.
    async fn upsert_delivery(&self, record: &DeliveryRecord) -> StoreResult<()>;

    /// Raw entries matching `filter`, newest first.
    async fn entries(&self, filter: &EntryFilter, page: Page)
        -> StoreResult<Paginated<StoredEntry>>;

    /// Delivery records matching `filter`, newest first.
    async fn deliveries(
        &self,
        filter: &DeliveryFilter,
        page: Page,
    ) -> StoreResult<Paginated<DeliveryRecord>>;

    ///
    async fn delivery(&self, transaction_id: &TransactionId)
        -> StoreResult<Option<DeliveryRecord>>;

    ///
    async fn stats(&self) -> StoreResult<Stats>;

    /// Insert the entries in order, rejected entries are skipped.
    ///
    /// # Errors
    ///
    /// * the store became unavailable, the entries before the failure are kept
    async fn persist_entries(&self, entries: &[LogEntry]) -> StoreResult<PersistSummary> {
        let mut summary = PersistSummary::default();

        for entry in entries {
            match self.insert_entry(entry).await {
                Ok(true) => summary.written += 1,
                Ok(false) => summary.duplicates += 1,
                Err(error) if !error.is_fatal() => {
                    tracing::warn!(
                        %error,
                        timestamp = %entry.timestamp,
                        service = %entry.service,
                        pid = entry.pid,
                        "Raw entry rejected, skipped."
                    );
                    summary.rejected += 1;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(summary)
    }

    /// Upsert the identifying records of the correlation, rejected records are skipped.
    ///
    /// # Errors
    ///
    /// * the store became unavailable
    async fn persist_deliveries(&self, correlation: &Correlation) -> StoreResult<PersistSummary> {
        let mut summary = PersistSummary::default();

        for record in correlation.records.values() {
            if !record.is_identifying() {
                tracing::trace!(transaction_id = %record.transaction_id, "No sender nor recipient, skipped.");
                summary.skipped += 1;
                continue;
            }

            match self.upsert_delivery(record).await {
                Ok(()) => summary.written += 1,
                Err(error) if !error.is_fatal() => {
                    tracing::warn!(
                        %error,
                        transaction_id = %record.transaction_id,
                        "Delivery record rejected, skipped."
                    );
                    summary.rejected += 1;
                }
                Err(error) => return Err(error),
            }
        }

        Ok(summary)
    }
}
