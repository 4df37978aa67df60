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
use postlog_common::{utils::parse_rfc3339, TransactionId};

///
#[non_exhaustive]
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, author)]
pub struct Args {
    /// Print the version and exit.
    #[clap(short, long, action)]
    pub version: bool,

    /// Path of the postlog configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Bounds and pagination shared by the listings.
#[derive(Clone, clap::Args)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub struct Listing {
    /// Lower bound (inclusive) of the timestamp, RFC 3339
    #[clap(long, value_parser = parse_instant)]
    pub from: Option<time::OffsetDateTime>,
    /// Upper bound (exclusive) of the timestamp, RFC 3339
    #[clap(long, value_parser = parse_instant)]
    pub to: Option<time::OffsetDateTime>,
    /// Substring to look for
    #[clap(short, long, action)]
    pub search: Option<String>,
    /// Page to print, starting at 1
    #[clap(short, long, default_value = "1")]
    pub page: u32,
    /// Number of items per page
    #[clap(long, default_value = "50")]
    pub per_page: u32,
}

///
#[non_exhaustive]
#[derive(clap::Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum Commands {
    /// List the raw log entries, newest first
    Entries {
        ///
        #[clap(flatten)]
        listing: Listing,
    },
    /// List the delivery records, newest first
    Deliveries {
        ///
        #[clap(flatten)]
        listing: Listing,
        /// Substring of the envelope sender
        #[clap(long, action)]
        sender: Option<String>,
        /// Substring of the recipient
        #[clap(long, action)]
        recipient: Option<String>,
        /// Exact delivery status (sent, deferred, bounced...)
        #[clap(long, action)]
        status: Option<String>,
    },
    /// Print the delivery record of a transaction
    Show {
        /// Postfix queue id of the transaction
        #[clap(value_parser = parse_transaction_id)]
        transaction_id: TransactionId,
        /// Format of the output
        #[clap(short, long, value_enum, default_value = "text")]
        format: ShowFormat,
    },
    /// Print the number of entries and of delivery records per status
    Stats,
    /// Print the progress of the ingestion
    Checkpoint,
}

///
#[non_exhaustive]
#[derive(Clone, clap::ValueEnum)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum ShowFormat {
    /// One field per line
    Text,
    /// The record as a json object
    Json,
}

fn parse_instant(value: &str) -> Result<time::OffsetDateTime, clap::Error> {
    parse_rfc3339(value).ok_or_else(|| clap::Error::new(clap::error::ErrorKind::ValueValidation))
}

fn parse_transaction_id(value: &str) -> Result<TransactionId, clap::Error> {
    value
        .parse()
        .map_err(|_err| clap::Error::new(clap::error::ErrorKind::ValueValidation))
}
