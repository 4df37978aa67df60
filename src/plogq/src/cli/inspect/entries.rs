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
use crate::cli::args::Commands;
use postlog_store::{EntryFilter, LogStore, Page};

impl Commands {
    pub(crate) async fn entries<OUT: std::io::Write + Send>(
        store: &dyn LogStore,
        filter: &EntryFilter,
        page: Page,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        let listing = store.entries(filter, page).await?;

        output.write_fmt(format_args!(
            "{} entrie(s), page {}/{}\n",
            listing.total,
            listing.page.number(),
            listing.pages().max(1)
        ))?;

        for stored in &listing.items {
            output.write_fmt(format_args!(
                "{:>6} {:<12} {} {} {}[{}]: {}\n",
                stored.id,
                stored
                    .transaction_id
                    .as_ref()
                    .map_or("-", postlog_common::TransactionId::as_str),
                stored.entry.timestamp,
                stored.entry.hostname,
                stored.entry.service,
                stored.entry.pid,
                stored.entry.content
            ))?;
        }

        Ok(())
    }
}
