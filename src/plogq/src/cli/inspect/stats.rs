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
use postlog_store::LogStore;

impl Commands {
    pub(crate) async fn stats<OUT: std::io::Write + Send>(
        store: &dyn LogStore,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        let stats = store.stats().await?;

        output.write_fmt(format_args!(
            "entries      {}\ndeliveries   {}\n",
            stats.entries, stats.deliveries
        ))?;
        for (status, count) in &stats.by_status {
            output.write_fmt(format_args!("  {status:<10} {count}\n"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postlog_test::fixtures::{
        populate, QMGR_ABC123, QMGR_DEF456_NULL_SENDER, SMTPD_CONNECT, SMTP_ABC123_BOUNCED,
    };

    #[tokio::test]
    async fn per_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = postlog_store::sqlite::SqliteStore::open(dir.path().join("postlog.db")).unwrap();
        populate(
            &store,
            &[
                SMTPD_CONNECT,
                QMGR_ABC123,
                SMTP_ABC123_BOUNCED,
                QMGR_DEF456_NULL_SENDER,
            ],
        )
        .await;

        let mut output = vec![];
        Commands::stats(&store, &mut output).await.unwrap();

        pretty_assertions::assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            "entries      4\ndeliveries   2\n  bounced    1\n  unknown    1\n"
        );
    }
}
