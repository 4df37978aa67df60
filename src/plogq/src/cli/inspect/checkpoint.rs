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
use postlog_ingest::CheckpointStore;

impl Commands {
    pub(crate) async fn checkpoint<OUT: std::io::Write + Send>(
        checkpoint: &dyn CheckpointStore,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        output.write_fmt(format_args!(
            "{}\n",
            serde_json::to_string_pretty(&checkpoint.load().await)?
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postlog_common::Checkpoint;
    use postlog_ingest::FileCheckpointStore;

    #[tokio::test]
    async fn missing_is_zero() {
        let dir = tempfile::tempdir().unwrap();

        let mut output = vec![];
        Commands::checkpoint(
            &FileCheckpointStore::new(dir.path().join("checkpoint.json")),
            &mut output,
        )
        .await
        .unwrap();

        pretty_assertions::assert_eq!(
            std::str::from_utf8(&output).unwrap(),
            r#"{
  "line_index": 0,
  "last_processed_at": null,
  "entries_inserted": 0,
  "records_upserted": 0,
  "parse_errors": 0,
  "runs": 0
}
"#
        );
    }

    #[tokio::test]
    async fn saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoint.json"));
        store
            .save(&Checkpoint {
                line_index: 4,
                last_processed_at: Some(time::macros::datetime!(2026-02-11 10:00:00 UTC)),
                entries_inserted: 4,
                records_upserted: 1,
                parse_errors: 1,
                runs: 1,
            })
            .await
            .unwrap();

        let mut output = vec![];
        Commands::checkpoint(&store, &mut output).await.unwrap();

        let json = serde_json::from_slice::<serde_json::Value>(&output).unwrap();
        assert_eq!(json["line_index"], 4);
        assert_eq!(json["last_processed_at"], "2026-02-11T10:00:00Z");
        assert_eq!(json["runs"], 1);
    }
}
