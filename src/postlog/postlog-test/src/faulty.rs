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
use postlog_common::{Checkpoint, DeliveryRecord, LogEntry, TransactionId};
use postlog_ingest::CheckpointStore;
use postlog_store::{
    DeliveryFilter, EntryFilter, LogStore, Page, Paginated, Stats, StoreError, StoreResult,
    StoredEntry,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// The failure injected by a [`FaultyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every write after the first `after` ones fails with [`StoreError::Unavailable`].
    Unavailable {
        ///
        after: u64,
    },
    /// The write number `nth` (counted from 0) fails with [`StoreError::Rejected`].
    Rejected {
        ///
        nth: u64,
    },
}

/// Wrap a store and fail its writes (inserted entries and upserted records)
/// according to a [`Fault`]. The reads are forwarded untouched.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    fault: std::sync::Mutex<Option<Fault>>,
    writes: AtomicU64,
}

impl<S: LogStore> FaultyStore<S> {
    ///
    #[must_use]
    pub fn new(inner: S, fault: Fault) -> Self {
        Self {
            inner,
            fault: std::sync::Mutex::new(Some(fault)),
            writes: AtomicU64::new(0),
        }
    }

    /// Replace the injected fault, `None` heals the store. The count of writes restarts.
    ///
    /// # Panics
    ///
    /// * the lock is poisoned
    pub fn set_fault(&self, fault: Option<Fault>) {
        *self.fault.lock().unwrap() = fault;
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Number of writes attempted since the last [`FaultyStore::set_fault`].
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, key: &str) -> StoreResult<()> {
        let nth = self.writes.fetch_add(1, Ordering::SeqCst);
        let result = match *self.fault.lock().unwrap() {
            Some(Fault::Unavailable { after }) if nth >= after => Err(StoreError::Unavailable(
                "connection refused (injected)".to_string(),
            )),
            Some(Fault::Rejected { nth: rejected }) if nth == rejected => {
                Err(StoreError::Rejected {
                    key: key.to_string(),
                    reason: "constraint violation (injected)".to_string(),
                })
            }
            _ => Ok(()),
        };

        if let Err(error) = &result {
            tracing::debug!(nth, %error, "Injected store failure.");
        }
        result
    }
}

#[async_trait::async_trait]
impl<S: LogStore> LogStore for FaultyStore<S> {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_entry(&self, entry: &LogEntry) -> StoreResult<bool> {
        self.check(&entry.fingerprint())?;
        self.inner.insert_entry(entry).await
    }

    async fn upsert_delivery(&self, record: &DeliveryRecord) -> StoreResult<()> {
        self.check(record.transaction_id.as_str())?;
        self.inner.upsert_delivery(record).await
    }

    async fn entries(
        &self,
        filter: &EntryFilter,
        page: Page,
    ) -> StoreResult<Paginated<StoredEntry>> {
        self.inner.entries(filter, page).await
    }

    async fn deliveries(
        &self,
        filter: &DeliveryFilter,
        page: Page,
    ) -> StoreResult<Paginated<DeliveryRecord>> {
        self.inner.deliveries(filter, page).await
    }

    async fn delivery(
        &self,
        transaction_id: &TransactionId,
    ) -> StoreResult<Option<DeliveryRecord>> {
        self.inner.delivery(transaction_id).await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        self.inner.stats().await
    }
}

/// A checkpoint store whose `load` waits until [`GatedCheckpoint::open`] is called,
/// keeping the run in the `Reading` state.
#[derive(Debug)]
pub struct GatedCheckpoint<C> {
    inner: C,
    gate: tokio::sync::Semaphore,
}

impl<C: CheckpointStore> GatedCheckpoint<C> {
    ///
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            gate: tokio::sync::Semaphore::new(0),
        }
    }

    /// Let one pending or future `load` go through.
    pub fn open(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait::async_trait]
impl<C: CheckpointStore> CheckpointStore for GatedCheckpoint<C> {
    async fn load(&self) -> Checkpoint {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.inner.load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.inner.save(checkpoint).await
    }
}

/// A checkpoint store which replaces the log source with a directory on its
/// first `save`, so that the truncation following it fails.
#[derive(Debug)]
pub struct SourceReplacingCheckpoint<C> {
    inner: C,
    source: std::path::PathBuf,
    saves: std::sync::atomic::AtomicUsize,
}

impl<C: CheckpointStore> SourceReplacingCheckpoint<C> {
    ///
    #[must_use]
    pub fn new(inner: C, source: impl Into<std::path::PathBuf>) -> Self {
        Self {
            inner,
            source: source.into(),
            saves: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<C: CheckpointStore> CheckpointStore for SourceReplacingCheckpoint<C> {
    async fn load(&self) -> Checkpoint {
        self.inner.load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.inner.save(checkpoint).await?;

        if self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            tokio::fs::remove_file(&self.source).await?;
            tokio::fs::create_dir(&self.source).await?;
            tracing::debug!(source = %self.source.display(), "Log source replaced by a directory.");
        }
        Ok(())
    }
}
