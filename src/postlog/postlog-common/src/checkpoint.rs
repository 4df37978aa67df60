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

/// Progress of the ingestion, persisted between two runs.
///
/// A missing document is equivalent to [`Checkpoint::default`]: the whole
/// log source is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    /// Number of complete lines of the log source already consumed.
    pub line_index: usize,
    /// End of the last successful run.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_processed_at: Option<time::OffsetDateTime>,
    /// Raw entries inserted by all the runs.
    pub entries_inserted: u64,
    /// Delivery records upserted by all the runs.
    pub records_upserted: u64,
    /// Unparseable lines skipped by all the runs.
    pub parse_errors: u64,
    /// Number of successful runs.
    pub runs: u64,
}

impl Checkpoint {
    /// Account for a successful run, the cursor is updated separately.
    pub fn record_run(
        &mut self,
        finished_at: time::OffsetDateTime,
        entries_inserted: u64,
        records_upserted: u64,
        parse_errors: u64,
    ) {
        self.last_processed_at = Some(finished_at);
        self.entries_inserted += entries_inserted;
        self.records_upserted += records_upserted;
        self.parse_errors += parse_errors;
        self.runs += 1;
    }

    /// The log source has been emptied, the counters are kept.
    pub fn rewind(&mut self) {
        self.line_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_cumulative() {
        let mut checkpoint = Checkpoint::default();

        checkpoint.record_run(time::macros::datetime!(2026-02-11 10:00 UTC), 10, 2, 1);
        checkpoint.line_index = 11;
        checkpoint.record_run(time::macros::datetime!(2026-02-11 11:00 UTC), 5, 1, 0);
        checkpoint.rewind();

        pretty_assertions::assert_eq!(
            checkpoint,
            Checkpoint {
                line_index: 0,
                last_processed_at: Some(time::macros::datetime!(2026-02-11 11:00 UTC)),
                entries_inserted: 15,
                records_upserted: 3,
                parse_errors: 1,
                runs: 2,
            }
        );
    }

    #[test]
    fn document() {
        let checkpoint = serde_json::from_str::<Checkpoint>(
            r#"{
                "line_index": 42,
                "last_processed_at": "2026-02-11T09:26:24Z",
                "entries_inserted": 40
            }"#,
        )
        .unwrap();

        assert_eq!(checkpoint.line_index, 42);
        assert_eq!(checkpoint.entries_inserted, 40);
        assert_eq!(checkpoint.runs, 0);
        assert_eq!(
            checkpoint.last_processed_at,
            Some(time::macros::datetime!(2026-02-11 09:26:24 UTC))
        );

        assert_eq!(
            serde_json::from_str::<Checkpoint>("{}").unwrap(),
            Checkpoint::default()
        );
    }
}
