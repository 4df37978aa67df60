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
use mysql::prelude::Queryable;
use postlog_common::{
    utils::{from_unix_micros, parse_rfc3339, to_unix_micros},
    DeliveryRecord, FieldSet, LogEntry, TransactionId,
};

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS log_entries (
        id              BIGINT       NOT NULL AUTO_INCREMENT PRIMARY KEY,
        fingerprint     CHAR(64)     NOT NULL UNIQUE,
        timestamp       VARCHAR(64)  NOT NULL,
        occurred_at     BIGINT       NULL,
        hostname        VARCHAR(255) NOT NULL,
        service         VARCHAR(255) NOT NULL,
        pid             INT UNSIGNED NOT NULL,
        content         TEXT         NOT NULL,
        transaction_id  VARCHAR(32)  NULL,
        INDEX log_entries_occurred_at (occurred_at),
        INDEX log_entries_transaction_id (transaction_id)
    )",
    "CREATE TABLE IF NOT EXISTS deliveries (
        transaction_id  VARCHAR(32)     NOT NULL PRIMARY KEY,
        first_seen_at   BIGINT          NULL,
        sender          VARCHAR(512)    NULL,
        size            BIGINT UNSIGNED NULL,
        recipient       VARCHAR(512)    NULL,
        relay           VARCHAR(512)    NULL,
        delay           DOUBLE          NULL,
        dsn             VARCHAR(16)     NULL,
        status          VARCHAR(64)     NULL,
        response        TEXT            NULL,
        updated_at      BIGINT          NOT NULL,
        INDEX deliveries_first_seen_at (first_seen_at)
    )",
];

const INSERT_ENTRY: &str = "
INSERT INTO log_entries
    (fingerprint, timestamp, occurred_at, hostname, service, pid, content, transaction_id)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE id = id
";

const UPSERT_DELIVERY: &str = "
INSERT INTO deliveries
    (transaction_id, first_seen_at, sender, size, recipient, relay, delay, dsn, status, response, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    first_seen_at = LEAST(
        COALESCE(VALUES(first_seen_at), first_seen_at),
        COALESCE(first_seen_at, VALUES(first_seen_at))
    ),
    sender      = COALESCE(VALUES(sender), sender),
    size        = COALESCE(VALUES(size), size),
    recipient   = COALESCE(VALUES(recipient), recipient),
    relay       = COALESCE(VALUES(relay), relay),
    delay       = COALESCE(VALUES(delay), delay),
    dsn         = COALESCE(VALUES(dsn), dsn),
    status      = COALESCE(VALUES(status), status),
    response    = COALESCE(VALUES(response), response),
    updated_at  = VALUES(updated_at)
";

/// A r2d2 connection manager for mysql.
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    params: mysql::Opts,
}

impl ConnectionManager {
    ///
    #[must_use]
    pub fn new(params: mysql::OptsBuilder) -> Self {
        Self {
            params: mysql::Opts::from(params),
        }
    }
}

impl r2d2::ManageConnection for ConnectionManager {
    type Connection = mysql::Conn;
    type Error = mysql::Error;

    fn connect(&self) -> Result<mysql::Conn, mysql::Error> {
        mysql::Conn::new(self.params.clone())
    }

    fn is_valid(&self, conn: &mut mysql::Conn) -> Result<(), mysql::Error> {
        conn.query_drop("SELECT 1")
    }

    fn has_broken(&self, conn: &mut mysql::Conn) -> bool {
        self.is_valid(conn).is_err()
    }
}

/// A [`LogStore`] on a `MySQL` server, through a pool of connections.
#[derive(Debug, Clone)]
pub struct MysqlStore {
    url: String,
    pool: r2d2::Pool<ConnectionManager>,
}

impl From<SqlParam> for mysql::Value {
    fn from(value: SqlParam) -> Self {
        match value {
            SqlParam::Int(value) => Self::Int(value),
            SqlParam::Text(value) => Self::Bytes(value.into_bytes()),
        }
    }
}

fn positional(params: Vec<SqlParam>) -> mysql::Params {
    if params.is_empty() {
        mysql::Params::Empty
    } else {
        mysql::Params::Positional(params.into_iter().map(mysql::Value::from).collect())
    }
}

/// Errors reported by the server for a statement are specific to the record,
/// the SQLSTATE class `08` (connection exception) and the driver errors are not.
fn classify(key: &str, error: mysql::Error) -> StoreError {
    match &error {
        mysql::Error::MySqlError(server) if !server.state.starts_with("08") => {
            StoreError::Rejected {
                key: key.to_string(),
                reason: error.to_string(),
            }
        }
        mysql::Error::FromValueError(_) | mysql::Error::FromRowError(_) => StoreError::Rejected {
            key: key.to_string(),
            reason: error.to_string(),
        },
        _ => StoreError::Unavailable(error.to_string()),
    }
}

fn column<T: mysql::prelude::FromValue>(row: &mut mysql::Row, name: &str) -> mysql::Result<T> {
    row.take_opt::<T, _>(name)
        .ok_or_else(|| mysql::Error::FromRowError(row.clone()))?
        .map_err(|e| mysql::Error::FromValueError(e.0))
}

fn delivery_from_row(mut row: mysql::Row) -> mysql::Result<DeliveryRecord> {
    let transaction_id = column::<String>(&mut row, "transaction_id")?;

    Ok(DeliveryRecord {
        transaction_id: transaction_id
            .parse::<TransactionId>()
            .map_err(|_| mysql::Error::FromRowError(row.clone()))?,
        first_seen_at: column::<Option<i64>>(&mut row, "first_seen_at")?
            .and_then(from_unix_micros),
        fields: FieldSet {
            sender: column(&mut row, "sender")?,
            size: column(&mut row, "size")?,
            recipient: column(&mut row, "recipient")?,
            relay: column(&mut row, "relay")?,
            delay: column(&mut row, "delay")?,
            dsn: column(&mut row, "dsn")?,
            status: column(&mut row, "status")?,
            response: column(&mut row, "response")?,
        },
    })
}

fn entry_from_row(mut row: mysql::Row) -> mysql::Result<StoredEntry> {
    let timestamp = column::<String>(&mut row, "timestamp")?;

    Ok(StoredEntry {
        id: column(&mut row, "id")?,
        transaction_id: column::<Option<String>>(&mut row, "transaction_id")?
            .and_then(|id| id.parse().ok()),
        entry: LogEntry {
            occurred_at: parse_rfc3339(&timestamp),
            timestamp,
            hostname: column(&mut row, "hostname")?,
            service: column(&mut row, "service")?,
            pid: column(&mut row, "pid")?,
            content: column(&mut row, "content")?,
        },
    })
}

fn count(conn: &mut mysql::Conn, sql: String, params: Vec<SqlParam>) -> mysql::Result<u64> {
    conn.exec_first::<u64, _, _>(sql, positional(params))
        .map(Option::unwrap_or_default)
}

impl MysqlStore {
    /// Open a pool of connections to `url` and create the tables.
    ///
    /// # Errors
    ///
    /// * the url is invalid
    /// * the server cannot be reached within `timeout`
    /// * the tables cannot be created
    pub fn connect(url: &str, timeout: std::time::Duration, connections: u32) -> anyhow::Result<Self> {
        let store = Self::connect_read_only(url, timeout, connections)?;

        let mut conn = store.pool.get()?;
        for table in SCHEMA {
            conn.query_drop(table).context("Cannot create the tables")?;
        }

        Ok(store)
    }

    /// Open a pool of connections to `url`, the tables are expected to exist.
    ///
    /// # Errors
    ///
    /// * the url is invalid
    /// * the server cannot be reached within `timeout`
    pub fn connect_read_only(
        url: &str,
        timeout: std::time::Duration,
        connections: u32,
    ) -> anyhow::Result<Self> {
        let opts = mysql::Opts::from_url(url).context("Invalid mysql url")?;
        let manager = ConnectionManager::new(mysql::OptsBuilder::from_opts(opts));

        let pool = r2d2::Pool::builder()
            .max_size(connections)
            .connection_timeout(timeout)
            .build(manager)
            .context("Cannot connect to the mysql server")?;

        tracing::debug!(connections, "MySQL store connected.");

        Ok(Self {
            url: url.to_string(),
            pool,
        })
    }

    async fn with<T, F>(&self, key: String, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut mysql::Conn) -> mysql::Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            f(&mut *conn).map_err(|e| classify(&key, e))
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

#[async_trait::async_trait]
impl LogStore for MysqlStore {
    async fn ping(&self) -> StoreResult<()> {
        self.with(String::new(), |conn| conn.query_drop("SELECT 1"))
            .await
    }

    #[tracing::instrument(skip_all, fields(fingerprint), err)]
    async fn insert_entry(&self, entry: &LogEntry) -> StoreResult<bool> {
        let fingerprint = entry.fingerprint();
        tracing::Span::current().record("fingerprint", fingerprint.as_str());

        let params = (
            fingerprint.clone(),
            entry.timestamp.clone(),
            entry.occurred_at.map(to_unix_micros),
            entry.hostname.clone(),
            entry.service.clone(),
            entry.pid,
            entry.content.clone(),
            entry.transaction_id().map(String::from),
        );

        self.with(fingerprint, move |conn| {
            conn.exec_drop(INSERT_ENTRY, params)?;
            Ok(conn.affected_rows() == 1)
        })
        .await
    }

    #[tracing::instrument(skip_all, fields(transaction_id = %record.transaction_id), err)]
    async fn upsert_delivery(&self, record: &DeliveryRecord) -> StoreResult<()> {
        let fields = &record.fields;
        let params: Vec<mysql::Value> = vec![
            record.transaction_id.as_str().into(),
            record.first_seen_at.map(to_unix_micros).into(),
            fields.sender.clone().into(),
            fields.size.into(),
            fields.recipient.clone().into(),
            fields.relay.clone().into(),
            fields.delay.into(),
            fields.dsn.clone().into(),
            fields.status.clone().into(),
            fields.response.clone().into(),
            to_unix_micros(time::OffsetDateTime::now_utc()).into(),
        ];

        self.with(record.transaction_id.to_string(), move |conn| {
            conn.exec_drop(UPSERT_DELIVERY, mysql::Params::Positional(params))
        })
        .await
    }

    async fn entries(
        &self,
        filter: &EntryFilter,
        page: Page,
    ) -> StoreResult<Paginated<StoredEntry>> {
        let clause = filter.to_where();

        self.with(String::from("entries"), move |conn| {
            let total = count(
                conn,
                format!("SELECT COUNT(*) FROM log_entries{}", clause.sql()),
                clause.params.clone(),
            )?;

            let items = conn
                .exec::<mysql::Row, _, _>(
                    format!(
                        "SELECT {ENTRY_COLUMNS} FROM log_entries{} ORDER BY occurred_at DESC, id DESC LIMIT ? OFFSET ?",
                        clause.sql()
                    ),
                    positional(clause.paged_params(page)),
                )?
                .into_iter()
                .map(entry_from_row)
                .collect::<mysql::Result<Vec<_>>>()?;

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

        self.with(String::from("deliveries"), move |conn| {
            let total = count(
                conn,
                format!("SELECT COUNT(*) FROM deliveries{}", clause.sql()),
                clause.params.clone(),
            )?;

            let items = conn
                .exec::<mysql::Row, _, _>(
                    format!(
                        "SELECT {DELIVERY_COLUMNS} FROM deliveries{} ORDER BY first_seen_at DESC, transaction_id LIMIT ? OFFSET ?",
                        clause.sql()
                    ),
                    positional(clause.paged_params(page)),
                )?
                .into_iter()
                .map(delivery_from_row)
                .collect::<mysql::Result<Vec<_>>>()?;

            Ok(Paginated { items, total, page })
        })
        .await
    }

    async fn delivery(
        &self,
        transaction_id: &TransactionId,
    ) -> StoreResult<Option<DeliveryRecord>> {
        let transaction_id = transaction_id.to_string();

        self.with(transaction_id.clone(), move |conn| {
            conn.exec_first::<mysql::Row, _, _>(
                format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE transaction_id = ?"),
                (transaction_id,),
            )?
            .map(delivery_from_row)
            .transpose()
        })
        .await
    }

    async fn stats(&self) -> StoreResult<Stats> {
        self.with(String::from("stats"), |conn| {
            let by_status: std::collections::BTreeMap<String, u64> = conn
                .query::<(String, u64), _>(STATS_BY_STATUS)?
                .into_iter()
                .collect();

            Ok(Stats {
                entries: count(conn, "SELECT COUNT(*) FROM log_entries".to_string(), vec![])?,
                deliveries: count(conn, "SELECT COUNT(*) FROM deliveries".to_string(), vec![])?,
                by_status,
            })
        })
        .await
    }
}

impl MysqlStore {
    /// The url of the server, as configured.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_server_errors() {
        let duplicate = mysql::Error::MySqlError(mysql::MySqlError {
            state: "23000".to_string(),
            message: "Duplicate entry".to_string(),
            code: 1062,
        });
        assert!(matches!(
            classify("ABC123", duplicate),
            StoreError::Rejected { key, .. } if key == "ABC123"
        ));

        let gone = mysql::Error::MySqlError(mysql::MySqlError {
            state: "08S01".to_string(),
            message: "Communication link failure".to_string(),
            code: 1158,
        });
        assert!(classify("ABC123", gone).is_fatal());
    }

    #[test]
    fn params() {
        assert!(matches!(positional(vec![]), mysql::Params::Empty));

        let mysql::Params::Positional(values) =
            positional(vec![SqlParam::Int(1), SqlParam::Text("a".to_string())])
        else {
            panic!("positional parameters expected");
        };
        assert_eq!(
            values,
            vec![mysql::Value::Int(1), mysql::Value::Bytes(b"a".to_vec())]
        );
    }

    #[test]
    fn driver_errors_are_fatal() {
        let error = mysql::Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(classify("ABC123", error).is_fatal());
    }
}
