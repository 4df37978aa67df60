//! postlog store: persistence of the raw entries and of the delivery records

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

mod api;
mod query;

pub use api::{LogStore, PersistSummary, Stats, StoreError, StoreResult, StoredEntry};
pub use query::{DeliveryFilter, EntryFilter, Page, Paginated, TimeRange};

mod implementation {
    /// The `SQLite` implementation of the store, a single database file.
    ///
    /// ```sql
    /// log_entries (id, fingerprint UNIQUE, timestamp, occurred_at, hostname,
    ///              service, pid, content, transaction_id)
    /// deliveries  (transaction_id PRIMARY KEY, first_seen_at, sender, size,
    ///              recipient, relay, delay, dsn, status, response, updated_at)
    /// ```
    ///
    /// Instants are stored as microseconds since the unix epoch.
    pub mod sqlite;

    /// The `MySQL` implementation of the store, same tables as [`super::sqlite`].
    pub mod mysql;
}

pub use implementation::{mysql, sqlite};

/// Open the store described by the configuration.
///
/// # Errors
///
/// * the store cannot be opened, see [`sqlite::SqliteStore::open`] and
///   [`mysql::MysqlStore::connect`]
pub fn connect(
    config: &postlog_config::field::FieldStorage,
) -> anyhow::Result<std::sync::Arc<dyn LogStore>> {
    use postlog_config::field::FieldStorage;

    Ok(match config {
        FieldStorage::Sqlite { filepath } => std::sync::Arc::new(sqlite::SqliteStore::open(filepath)?),
        FieldStorage::Mysql {
            url,
            timeout,
            connections,
        } => std::sync::Arc::new(mysql::MysqlStore::connect(url, *timeout, *connections)?),
    })
}

/// Open the store described by the configuration for inspection only:
/// nothing is created and the writes fail.
///
/// # Errors
///
/// * the store does not exist or cannot be opened, see
///   [`sqlite::SqliteStore::open_read_only`] and [`mysql::MysqlStore::connect_read_only`]
pub fn connect_read_only(
    config: &postlog_config::field::FieldStorage,
) -> anyhow::Result<std::sync::Arc<dyn LogStore>> {
    use postlog_config::field::FieldStorage;

    Ok(match config {
        FieldStorage::Sqlite { filepath } => {
            std::sync::Arc::new(sqlite::SqliteStore::open_read_only(filepath)?)
        }
        FieldStorage::Mysql {
            url,
            timeout,
            connections,
        } => std::sync::Arc::new(mysql::MysqlStore::connect_read_only(url, *timeout, *connections)?),
    })
}
