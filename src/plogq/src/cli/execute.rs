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
use super::args::{Commands, Listing};
use postlog_config::Config;
use postlog_store::{DeliveryFilter, EntryFilter, Page, TimeRange};

impl Listing {
    fn range(&self) -> TimeRange {
        TimeRange {
            from: self.from,
            to: self.to,
        }
    }

    fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

impl Commands {
    /// Execute the plogq command, writing its output to `output`.
    ///
    /// # Errors
    ///
    /// * the store cannot be opened or queried
    /// * the transaction of `show` is not stored
    /// * the output cannot be written
    pub async fn execute<OUT: std::io::Write + Send>(
        self,
        config: &Config,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        let connect = || postlog_store::connect_read_only(&config.storage);

        match self {
            Self::Entries { listing } => {
                let filter = EntryFilter {
                    range: listing.range(),
                    search: listing.search.clone(),
                };
                Self::entries(connect()?.as_ref(), &filter, listing.page(), output).await
            }
            Self::Deliveries {
                listing,
                sender,
                recipient,
                status,
            } => {
                let filter = DeliveryFilter {
                    range: listing.range(),
                    sender,
                    recipient,
                    status,
                    search: listing.search.clone(),
                };
                Self::deliveries(connect()?.as_ref(), &filter, listing.page(), output).await
            }
            Self::Show {
                transaction_id,
                format,
            } => Self::show(connect()?.as_ref(), &transaction_id, &format, output).await,
            Self::Stats => Self::stats(connect()?.as_ref(), output).await,
            Self::Checkpoint => {
                let checkpoint =
                    postlog_ingest::FileCheckpointStore::new(&config.checkpoint.filepath);
                Self::checkpoint(&checkpoint, output).await
            }
        }
    }
}
