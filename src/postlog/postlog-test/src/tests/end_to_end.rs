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
use super::{completed, ingestor};
use crate::{config::local_test, fixtures::*};
use postlog_common::{Checkpoint, DeliveryRecord, FieldSet};
use postlog_ingest::{progress::Trigger, CheckpointStore, FileCheckpointStore};
use postlog_store::{EntryFilter, Page, Stats};

fn abc123() -> postlog_common::TransactionId {
    "ABC123".parse().unwrap()
}

#[tokio::test]
async fn qmgr_then_smtp() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[QMGR_ABC123, SMTP_ABC123_SENT]);

    let (ingestor, store) = ingestor(&config);
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(report.lines_read, 2);
    assert_eq!(report.parse_errors, 0);
    assert_eq!(report.entries.written, 2);
    assert_eq!(report.deliveries.written, 1);
    assert!(report.truncated);

    let entries = store
        .entries(&EntryFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(entries.total, 2);
    // newest first
    assert_eq!(entries.items[0].entry.service, "postfix/smtp");
    assert_eq!(entries.items[1].entry.service, "postfix/qmgr");
    assert_eq!(entries.items[1].transaction_id, Some(abc123()));

    pretty_assertions::assert_eq!(
        store.delivery(&abc123()).await.unwrap(),
        Some(DeliveryRecord {
            transaction_id: abc123(),
            first_seen_at: Some(time::macros::datetime!(2026-02-11 09:26:24.771360 +01:00)),
            fields: FieldSet {
                sender: Some("a@x.com".to_string()),
                size: Some(512),
                recipient: Some("b@y.com".to_string()),
                relay: Some("mx.y.com".to_string()),
                delay: Some(0.42),
                dsn: Some("2.0.0".to_string()),
                status: Some("sent".to_string()),
                response: Some("250 OK".to_string()),
            },
        })
    );

    assert_eq!(std::fs::read_to_string(&config.source.filepath).unwrap(), "");

    let checkpoint = FileCheckpointStore::new(&config.checkpoint.filepath)
        .load()
        .await;
    assert_eq!(checkpoint.line_index, 0);
    assert_eq!(checkpoint.entries_inserted, 2);
    assert_eq!(checkpoint.records_upserted, 1);
    assert_eq!(checkpoint.runs, 1);
    assert!(checkpoint.last_processed_at.is_some());
}

#[tokio::test]
async fn idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = local_test(dir.path());
    config.source.truncate = false;
    write_log(
        &config.source.filepath,
        &[SMTPD_CONNECT, QMGR_ABC123, SMTP_ABC123_SENT],
    );

    let (ingestor, store) = ingestor(&config);
    let first = completed(ingestor.trigger(Trigger::Manual).await.unwrap());
    let stats = store.stats().await.unwrap();

    // the cursor is lost, the same content is read again
    FileCheckpointStore::new(&config.checkpoint.filepath)
        .save(&Checkpoint::default())
        .await
        .unwrap();

    let second = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(first.entries.written, 3);
    assert_eq!(second.entries.written, 0);
    assert_eq!(second.entries.duplicates, 3);
    assert!(!second.truncated);
    assert_eq!(second.line_index, 3);

    pretty_assertions::assert_eq!(store.stats().await.unwrap(), stats);
    assert_eq!(
        stats,
        Stats {
            entries: 3,
            deliveries: 1,
            by_status: [("sent".to_string(), 1)].into_iter().collect(),
        }
    );
}

#[tokio::test]
async fn last_write_wins_within_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(
        &config.source.filepath,
        &[QMGR_ABC123, SMTP_ABC123_SENT, SMTP_ABC123_BOUNCED],
    );

    let (ingestor, store) = ingestor(&config);
    completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    let record = store.delivery(&abc123()).await.unwrap().unwrap();
    assert_eq!(record.fields.sender.as_deref(), Some("a@x.com"));
    assert_eq!(record.fields.status.as_deref(), Some("bounced"));
    assert_eq!(record.fields.dsn.as_deref(), Some("5.1.1"));
    assert_eq!(
        record.fields.response.as_deref(),
        Some("550 5.1.1 user unknown")
    );
    assert_eq!(record.fields.delay, Some(36.0));
}

#[tokio::test]
async fn null_is_never_written_over_a_stored_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    let (ingestor, store) = ingestor(&config);

    write_log(&config.source.filepath, &[QMGR_ABC123]);
    let first = completed(ingestor.trigger(Trigger::Periodic).await.unwrap());
    assert!(first.truncated);

    let record = store.delivery(&abc123()).await.unwrap().unwrap();
    assert_eq!(record.fields.sender.as_deref(), Some("a@x.com"));
    assert_eq!(record.fields.recipient, None);

    append_log(&config.source.filepath, &[SMTP_ABC123_SENT]);
    let second = completed(ingestor.trigger(Trigger::Periodic).await.unwrap());
    assert_eq!(second.lines_read, 1);

    let record = store.delivery(&abc123()).await.unwrap().unwrap();
    assert_eq!(record.fields.sender.as_deref(), Some("a@x.com"));
    assert_eq!(record.fields.size, Some(512));
    assert_eq!(record.fields.recipient.as_deref(), Some("b@y.com"));
    assert_eq!(record.fields.status.as_deref(), Some("sent"));
    assert_eq!(
        record.first_seen_at,
        Some(time::macros::datetime!(2026-02-11 09:26:24.771360 +01:00))
    );

    // a later observation replaces a stored value
    append_log(&config.source.filepath, &[SMTP_ABC123_BOUNCED]);
    completed(ingestor.trigger(Trigger::Periodic).await.unwrap());

    let record = store.delivery(&abc123()).await.unwrap().unwrap();
    assert_eq!(record.fields.sender.as_deref(), Some("a@x.com"));
    assert_eq!(record.fields.status.as_deref(), Some("bounced"));
}

#[tokio::test]
async fn null_sender_and_uncorrelated_entries() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(
        &config.source.filepath,
        &[SMTPD_CONNECT, CLEANUP_DEF456, QMGR_DEF456_NULL_SENDER],
    );

    let (ingestor, store) = ingestor(&config);
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(report.entries.written, 3);
    assert_eq!(report.uncorrelated, 1);
    assert_eq!(report.deliveries.written, 1);

    let record = store
        .delivery(&"DEF456".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.fields.sender.as_deref(), Some(""));
    assert_eq!(record.fields.size, Some(2048));
    assert_eq!(
        record.first_seen_at,
        Some(time::macros::datetime!(2026-02-11 09:27:59 +01:00))
    );

    let connections = store
        .entries(
            &EntryFilter {
                search: Some("connect from".to_string()),
                ..EntryFilter::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(connections.total, 1);
    assert_eq!(connections.items[0].transaction_id, None);
}

#[tokio::test]
async fn record_without_sender_nor_recipient_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[CLEANUP_DEF456]);

    let (ingestor, store) = ingestor(&config);
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(report.entries.written, 1);
    assert_eq!(report.deliveries.written, 0);
    assert_eq!(report.deliveries.skipped, 1);
    assert_eq!(store.stats().await.unwrap().deliveries, 0);
}
