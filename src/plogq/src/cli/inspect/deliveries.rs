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
use crate::cli::{
    args::Commands,
    format::{address, instant, or_dash},
};
use postlog_store::{DeliveryFilter, LogStore, Page};

macro_rules! row {
    ($output:expr, $($arg:expr),* $(,)?) => {
        $output.write_fmt(format_args!(
            "{:<12} {:<20} {:<24} {:<24} {:<10} {:<6} {}\n",
            $($arg),*
        ))
    };
}

impl Commands {
    pub(crate) async fn deliveries<OUT: std::io::Write + Send>(
        store: &dyn LogStore,
        filter: &DeliveryFilter,
        page: Page,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        let listing = store.deliveries(filter, page).await?;

        output.write_fmt(format_args!(
            "{} delivery record(s), page {}/{}\n",
            listing.total,
            listing.page.number(),
            listing.pages().max(1)
        ))?;

        if listing.items.is_empty() {
            return Ok(());
        }

        row!(
            output,
            "TRANSACTION",
            "FIRST SEEN",
            "SENDER",
            "RECIPIENT",
            "STATUS",
            "DSN",
            "DELAY"
        )?;

        for record in &listing.items {
            let fields = &record.fields;
            row!(
                output,
                record.transaction_id.as_str(),
                instant(record.first_seen_at),
                address(fields.sender.as_deref()),
                address(fields.recipient.as_deref()),
                fields.status.as_deref().unwrap_or("-"),
                fields.dsn.as_deref().unwrap_or("-"),
                or_dash(fields.delay)
            )?;
        }

        Ok(())
    }
}
