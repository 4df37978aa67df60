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
    args::{Commands, ShowFormat},
    format::{address, instant, or_dash},
};
use postlog_common::TransactionId;
use postlog_store::LogStore;

impl Commands {
    pub(crate) async fn show<OUT: std::io::Write + Send>(
        store: &dyn LogStore,
        transaction_id: &TransactionId,
        format: &ShowFormat,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        let Some(record) = store.delivery(transaction_id).await? else {
            anyhow::bail!("No delivery record for the transaction '{transaction_id}'")
        };

        match format {
            ShowFormat::Json => output.write_fmt(format_args!(
                "{}\n",
                serde_json::to_string_pretty(&record)?
            ))?,
            ShowFormat::Text => {
                let fields = &record.fields;
                for (name, value) in [
                    ("transaction", record.transaction_id.to_string()),
                    ("first seen", instant(record.first_seen_at)),
                    ("sender", address(fields.sender.as_deref()).to_string()),
                    ("size", or_dash(fields.size)),
                    ("recipient", address(fields.recipient.as_deref()).to_string()),
                    ("relay", or_dash(fields.relay.as_ref())),
                    ("delay", or_dash(fields.delay)),
                    ("dsn", or_dash(fields.dsn.as_ref())),
                    ("status", or_dash(fields.status.as_ref())),
                    ("response", or_dash(fields.response.as_ref())),
                ] {
                    output.write_fmt(format_args!("{name:<12} {value}\n"))?;
                }
            }
        }

        Ok(())
    }
}
