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
use crate::{
    query::{SqlParam, DELIVERY_COLUMNS, ENTRY_COLUMNS, STATS_BY_STATUS},
    DeliveryFilter, EntryFilter, LogStore, Page, Paginated, Stats, StoreError, StoreResult,
    StoredEntry,
};
use anyhow::Context;
use postlog_common::{
    utils::{from_unix_micros, parse_rfc3339, to_unix_micros},
    DeliveryRecord, FieldSet, LogEntry, TransactionId,
};
use rusqlite::OptionalExtension;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log_entries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint     TEXT    NOT NULL UNIQUE,
    timestamp       TEXT    NOT NULL,
    occurred_at     INTEGER,
    hostname        TEXT    NOT NULL,
    service         TEXT    NOT NULL,
    pid             INTEGER NOT NULL,
    content         TEXT    NOT NULL,
    transaction_id  TEXT
);
CREATE INDEX IF NOT EXISTS log_entries_occurred_at ON log_entries (occurred_at);
CREATE INDEX IF NOT EXISTS log_entries_transaction_id ON log_entries (transaction_id);

CREATE TABLE IF NOT EXISTS deliveries (
    transaction_id  TEXT    NOT NULL PRIMARY KEY,
    first_seen_at   INTEGER,
    sender          TEXT,
    size            INTEGER,
    recipient       TEXT,
    relay           TEXT,
    delay           REAL,
    dsn             TEXT,
    status          TEXT,
    response        TEXT,
    updated_at      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS deliveries_first_seen_at ON deliveries (first_seen_at);
";

const INSERT_ENTRY: &str = "
INSERT INTO log_entries
    (fingerprint, timestamp, occurred_at, hostname, service, pid, content, transaction_id)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT (fingerprint) DO NOTHING
";

const UPSERT_DELIVERY: &str = "
INSERT INTO deliveries
    (transaction_id, first_seen_at, sender, size, recipient, relay, delay, dsn, status, response, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT (transaction_id) DO UPDATE SET
    first_seen_at = MIN(
        COALESCE(excluded.first_seen_at, deliveries.first_seen_at),
        COALESCE(deliveries.first_seen_at, excluded.first_seen_at)
    ),
    sender      = COALESCE(excluded.sender, deliveries.sender),
    size        = COALESCE(excluded.size, deliveries.size),
    recipient   = COALESCE(excluded.recipient, deliveries.recipient),
    relay       = COALESCE(excluded.relay, deliveries.relay),
    delay       = COALESCE(excluded.delay, deliveries.delay),
    dsn         = COALESCE(excluded.dsn, deliveries.dsn),
    status      = COALESCE(excluded.status, deliveries.status),
    response    = COALESCE(excluded.response, deliveries.response),
    updated_at  = excluded.updated_at
";

/// A [`LogStore`] in an `SQLite` database file.
///
/// The connection is shared behind a mutex, each operation runs on the
/// blocking thread pool of tokio.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    filepath: std::path::PathBuf,
    connection: std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>,
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            Self::Int(value) => value.to_sql(),
            Self::Text(value) => value.to_sql(),
        }
    }
}

fn classify(key: &str, error: rusqlite::Error) -> StoreError {
    use rusqlite::ErrorCode;

    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
                    | ErrorCode::ReadOnly
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::PermissionDenied
                    | ErrorCode::OutOfMemory
            ) =>
        {
            StoreError::Unavailable(error.to_string())
        }
        _ => StoreError::Rejected {
            key: key.to_string(),
            reason: error.to_string(),
        },
    }
}

fn delivery_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryRecord> {
    let transaction_id = row.get::<_, String>(0)?;

    Ok(DeliveryRecord {
        transaction_id: transaction_id.parse::<TransactionId>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        first_seen_at: row
            .get::<_, Option<i64>>(1)?
            .and_then(from_unix_micros),
        fields: FieldSet {
            sender: row.get(2)?,
            size: row
                .get::<_, Option<i64>>(3)?
                .and_then(|size| u64::try_from(size).ok()),
            recipient: row.get(4)?,
            relay: row.get(5)?,
            delay: row.get(6)?,
            dsn: row.get(7)?,
            status: row.get(8)?,
            response: row.get(9)?,
        },
    })
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredEntry> {
    let timestamp = row.get::<_, String>(1)?;

    Ok(StoredEntry {
        id: row.get(0)?,
        transaction_id: row
            .get::<_, Option<String>>(6)?
            .and_then(|id| id.parse().ok()),
        entry: LogEntry {
            occurred_at: parse_rfc3339(&timestamp),
            timestamp,
            hostname: row.get(2)?,
            service: row.get(3)?,
            pid: row.get(4)?,
            content: row.get(5)?,
        },
    })
}

fn count(connection: &rusqlite::Connection, sql: &str, params: &[SqlParam]) -> rusqlite::Result<u64> {
    connection
        .query_row(sql, rusqlite::params_from_iter(params), |row| row.get::<_, i64>(0))
        .map(|count| u64::try_from(count).unwrap_or_default())
}

impl SqliteStore {
    /// Open (or create) the database at `filepath` and its tables.
    ///
    /// # Errors
    ///
    /// * the parent directory cannot be created
    /// * the database cannot be opened
    /// * the tables cannot be created
    pub fn open(filepath: impl Into<std::path::PathBuf>) -> anyhow::Result<Self> {
        let filepath = filepath.into();

        if let Some(parent) = filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let connection = rusqlite::Connection::open(&filepath)
            .with_context(|| format!("Cannot open database '{}'", filepath.display()))?;
        connection.busy_timeout(std::time::Duration::from_secs(5))?;
        connection
            .execute_batch(SCHEMA)
            .context("Cannot create the tables")?;

        tracing::debug!(filepath = %filepath.display(), "SQLite store opened.");

        Ok(Self {
            filepath,
            connection: std::sync::Arc::new(std::sync::Mutex::new(connection)),
        })
    }

    /// Open an existing database without creating anything, every write fails.
    ///
    /// # Errors
    ///
    /// * the database does not exist or cannot be opened
    pub fn open_read_only(filepath: impl Into<std::path::PathBuf>) -> anyhow::Result<Self> {
        let filepath = filepath.into();

        let connection = rusqlite::Connection::open_with_flags(
            &filepath,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Cannot open database '{}' for reading", filepath.display()))?;
        connection.busy_timeout(std::time::Duration::from_secs(5))?;

        tracing::debug!(filepath = %filepath.display(), "SQLite store opened read-only.");

        Ok(Self {
            filepath,
            connection: std::sync::Arc::new(std::sync::Mutex::new(connection)),
        })
    }

    ///
    #[must_use]
    pub fn filepath(&self) -> &std::path::Path {
        &self.filepath
    }

    async fn with<T, F>(&self, key: String, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let connection = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let connection = connection
                .lock()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            f(&*connection).map_err(|e| classify(&key, e))
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait::async_trait]
impl LogStore for SqliteStore {
    async fn ping(&self) -> StoreResult<()> {
        self.with(String::new(), |connection| {
            connection.query_row("SELECT 1", [], |_| Ok(()))
        })
        .await
    }

    #[tracing::instrument(skip_all, fields(fingerprint), err)]
    async fn insert_entry(&self, entry: &LogEntry) -> StoreResult<bool> {
        let fingerprint = entry.fingerprint();
        tracing::Span::current().record("fingerprint", fingerprint.as_str());

        let entry = entry.clone();
        self.with(fingerprint.clone(), move |connection| {
            connection
                .execute(
                    INSERT_ENTRY,
                    rusqlite::params![
                        fingerprint,
                        entry.timestamp,
                        entry.occurred_at.map(to_unix_micros),
                        entry.hostname,
                        entry.service,
                        entry.pid,
                        entry.content,
                        entry.transaction_id().map(String::from),
                    ],
                )
                .map(|inserted| inserted == 1)
        })
        .await
    }

    #[tracing::instrument(skip_all, fields(transaction_id = %record.transaction_id), err)]
    async fn upsert_delivery(&self, record: &DeliveryRecord) -> StoreResult<()> {
        let record = record.clone();
        let size = record
            .fields
            .size
            .map(i64::try_from)
            .transpose()
            .map_err(|e| StoreError::Rejected {
                key: record.transaction_id.to_string(),
                reason: e.to_string(),
            })?;

        self.with(record.transaction_id.to_string(), move |connection| {
            connection
                .execute(
                    UPSERT_DELIVERY,
                    rusqlite::params![
                        record.transaction_id.as_str(),
                        record.first_seen_at.map(to_unix_micros),
                        record.fields.sender,
                        size,
                        record.fields.recipient,
                        record.fields.relay,
                        record.fields.delay,
                        record.fields.dsn,
                        record.fields.status,
                        record.fields.response,
                        to_unix_micros(time::OffsetDateTime::now_utc()),
                    ],
                )
                .map(|_| ())
        })
        .await
    }

    async fn entries(
        &self,
        filter: &EntryFilter,
        page: Page,
    ) -> StoreResult<Paginated<StoredEntry>> {
        let clause = filter.to_where();

        self.with(String::from("entries"), move |connection| {
            let total = count(
                connection,
                &format!("SELECT COUNT(*) FROM log_entries{}", clause.sql()),
                &clause.params,
            )?;

            let mut statement = connection.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM log_entries{} ORDER BY occurred_at DESC, id DESC LIMIT ? OFFSET ?",
                clause.sql()
            ))?;
            let items = statement
                .query_map(
                    rusqlite::params_from_iter(clause.paged_params(page)),
                    entry_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Paginated { items, total, page })
        })
        .await
    }

    async fn deliveries(
        &self,
        filter: &DeliveryFilter,
        page: Page,
    ) -> StoreResult<Paginated<DeliveryRecord>> {
        let clause = filter.to_where();

        self.with(String::from("deliveries"), move |connection| {
            let total = count(
                connection,
                &format!("SELECT COUNT(*) FROM deliveries{}", clause.sql()),
                &clause.params,
            )?;

            let mut statement = connection.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries{} ORDER BY first_seen_at DESC, transaction_id LIMIT ? OFFSET ?",
                clause.sql()
            ))?;
            let items = statement
                .query_map(
                    rusqlite::params_from_iter(clause.paged_params(page)),
                    delivery_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Paginated { items, total, page })
        })
        .await
    }

    async fn delivery(
        &self,
        transaction_id: &TransactionId,
    ) -> StoreResult<Option<DeliveryRecord>> {
        let transaction_id = transaction_id.to_string();

        self.with(transaction_id.clone(), move |connection| {
            connection
                .query_row(
                    &format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE transaction_id = ?1"),
                    [transaction_id],
                    delivery_from_row,
                )
                .optional()
        })
        .await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        self.with(String::from("stats"), |connection| {
            let mut statement = connection.prepare(STATS_BY_STATUS)?;
            let by_status: std::collections::BTreeMap<String, u64> = statement
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        u64::try_from(row.get::<_, i64>(1)?).unwrap_or_default(),
                    ))
                })?
                .collect::<rusqlite::Result<_>>()?;

            Ok(Stats {
                entries: count(connection, "SELECT COUNT(*) FROM log_entries", &[])?,
                deliveries: count(connection, "SELECT COUNT(*) FROM deliveries", &[])?,
                by_status,
            })
        })
        .await
    }
}
