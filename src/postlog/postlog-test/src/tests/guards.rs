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
use super::{completed, idle, ingestor};
use crate::{config::local_test, faulty::GatedCheckpoint, fixtures::*};
use postlog_common::Checkpoint;
use postlog_ingest::{
    progress::{FinishStatus, ProgressEvent, Trigger},
    CheckpointStore, FileCheckpointStore, IngestError, Ingestor, LogSource, RunOutcome, RunState,
};

#[tokio::test]
async fn missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());

    let (ingestor, _) = ingestor(&config);
    let mut progress = ingestor.subscribe();

    assert_eq!(
        ingestor.trigger(Trigger::Manual).await.unwrap(),
        RunOutcome::MissingSource
    );
    assert!(!config.checkpoint.filepath.exists());

    let mut last = None;
    while let Some(event) = progress.next().await {
        last = Some(event);
    }
    assert!(matches!(
        last,
        Some(ProgressEvent::Finished {
            status: FinishStatus::Succeeded,
            ..
        })
    ));
}

#[tokio::test]
async fn empty_source_rewinds() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    let checkpoint = FileCheckpointStore::new(&config.checkpoint.filepath);
    checkpoint
        .save(&Checkpoint {
            line_index: 5,
            runs: 3,
            ..Checkpoint::default()
        })
        .await
        .unwrap();
    write_log(&config.source.filepath, &[]);

    let (ingestor, _) = ingestor(&config);
    assert_eq!(
        ingestor.trigger(Trigger::Periodic).await.unwrap(),
        RunOutcome::EmptySource
    );

    pretty_assertions::assert_eq!(
        checkpoint.load().await,
        Checkpoint {
            line_index: 0,
            runs: 3,
            ..Checkpoint::default()
        }
    );
}

#[tokio::test]
async fn unparseable_lines_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(
        &config.source.filepath,
        &[CONTINUATION, "", QMGR_ABC123, "mail postfix/qmgr[x]: oops"],
    );

    let (ingestor, _) = ingestor(&config);
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(report.lines_read, 4);
    assert_eq!(report.parse_errors, 3);
    assert_eq!(report.entries.written, 1);
    assert_eq!(
        FileCheckpointStore::new(&config.checkpoint.filepath)
            .load()
            .await
            .parse_errors,
        3
    );
}

#[tokio::test]
async fn partial_tail_is_left_for_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    std::fs::write(
        &config.source.filepath,
        format!("{QMGR_ABC123}\n{SMTP_ABC123_SENT}"),
    )
    .unwrap();

    let (ingestor, store) = ingestor(&config);
    let first = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(first.lines_read, 1);
    assert_eq!(first.entries.written, 1);
    assert!(!first.truncated);
    assert_eq!(first.line_index, 1);

    // the writer terminates the line
    append_log(&config.source.filepath, &[""]);
    let second = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(second.lines_read, 1);
    assert_eq!(second.entries.written, 1);
    assert!(second.truncated);
    assert_eq!(
        store
            .delivery(&"ABC123".parse().unwrap())
            .await
            .unwrap()
            .unwrap()
            .fields
            .status
            .as_deref(),
        Some("sent")
    );
}

#[tokio::test]
async fn replaced_source_is_read_from_the_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    FileCheckpointStore::new(&config.checkpoint.filepath)
        .save(&Checkpoint {
            line_index: 10,
            ..Checkpoint::default()
        })
        .await
        .unwrap();
    write_log(&config.source.filepath, &[QMGR_ABC123, SMTP_ABC123_SENT]);

    let (ingestor, _) = ingestor(&config);
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());

    assert_eq!(report.lines_read, 2);
    assert_eq!(report.entries.written, 2);
}

#[tokio::test]
async fn truncation_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = local_test(dir.path());
    config.source.truncate = false;
    write_log(&config.source.filepath, &[QMGR_ABC123, SMTP_ABC123_SENT]);

    let (ingestor, _) = ingestor(&config);
    let first = completed(ingestor.trigger(Trigger::Manual).await.unwrap());
    assert!(!first.truncated);
    assert_eq!(first.line_index, 2);

    append_log(&config.source.filepath, &[SMTP_ABC123_BOUNCED]);
    let second = completed(ingestor.trigger(Trigger::Manual).await.unwrap());
    assert_eq!(second.lines_read, 1);
    assert_eq!(second.entries.written, 1);
    assert_eq!(second.line_index, 3);
}

/// Appends a line to the log source on the first save, as syslog would
/// during the finalization.
#[derive(Debug)]
struct AppendOnSave {
    inner: FileCheckpointStore,
    source: std::path::PathBuf,
    done: std::sync::atomic::AtomicBool,
}

#[async_trait::async_trait]
impl CheckpointStore for AppendOnSave {
    async fn load(&self) -> Checkpoint {
        self.inner.load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.inner.save(checkpoint).await?;
        if !self.done.swap(true, std::sync::atomic::Ordering::SeqCst) {
            append_log(&self.source, &[SMTPD_CONNECT]);
        }
        Ok(())
    }
}

#[tokio::test]
async fn grown_source_is_not_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[QMGR_ABC123, SMTP_ABC123_SENT]);

    let (_, store) = ingestor(&config);
    let ingestor = Ingestor::new(
        LogSource::new(&config.source.filepath),
        std::sync::Arc::new(AppendOnSave {
            inner: FileCheckpointStore::new(&config.checkpoint.filepath),
            source: config.source.filepath.clone(),
            done: std::sync::atomic::AtomicBool::new(false),
        }),
        store.clone(),
        config.service_map(),
    );

    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());
    assert!(!report.truncated);
    assert_eq!(report.line_index, 2);
    assert_eq!(
        std::fs::read_to_string(&config.source.filepath)
            .unwrap()
            .lines()
            .count(),
        3
    );

    // the appended line is read by the next run
    let report = completed(ingestor.trigger(Trigger::Manual).await.unwrap());
    assert_eq!(report.lines_read, 1);
    assert_eq!(report.entries.written, 1);
    assert!(report.truncated);
    assert_eq!(store.stats().await.unwrap().entries, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_run_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[QMGR_ABC123]);

    let checkpoint = std::sync::Arc::new(GatedCheckpoint::new(FileCheckpointStore::new(
        &config.checkpoint.filepath,
    )));
    let ingestor = std::sync::Arc::new(Ingestor::new(
        LogSource::new(&config.source.filepath),
        checkpoint.clone(),
        postlog_store::connect(&config.storage).unwrap(),
        config.service_map(),
    ));

    let mut state = ingestor.state();
    let first = tokio::spawn({
        let ingestor = ingestor.clone();
        async move { ingestor.trigger(Trigger::Periodic).await }
    });
    loop {
        let current = *state.borrow();
        if current == RunState::Reading {
            break;
        }
        state.changed().await.unwrap();
    }

    assert_eq!(
        ingestor.trigger(Trigger::Manual).await.unwrap(),
        RunOutcome::AlreadyRunning
    );

    checkpoint.open();
    let report = completed(first.await.unwrap().unwrap());
    assert_eq!(report.run_id, 1);
    assert_eq!(report.entries.written, 1);

    idle(&ingestor).await;
    checkpoint.open();
    assert_eq!(
        ingestor.trigger(Trigger::Manual).await.unwrap(),
        RunOutcome::EmptySource
    );
}

#[tokio::test]
async fn deadline_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[QMGR_ABC123]);

    // never opened
    let ingestor = Ingestor::new(
        LogSource::new(&config.source.filepath),
        std::sync::Arc::new(GatedCheckpoint::new(FileCheckpointStore::new(
            &config.checkpoint.filepath,
        ))),
        postlog_store::connect(&config.storage).unwrap(),
        config.service_map(),
    )
    .with_deadline(Some(std::time::Duration::from_millis(50)));
    let mut progress = ingestor.subscribe();

    assert!(matches!(
        ingestor.trigger(Trigger::Manual).await,
        Err(IngestError::DeadlineExceeded(deadline)) if deadline == std::time::Duration::from_millis(50)
    ));
    assert_eq!(*ingestor.state().borrow(), RunState::Idle);
    assert!(!config.checkpoint.filepath.exists());

    let mut last = None;
    while let Some(event) = progress.next().await {
        last = Some(event);
    }
    assert!(matches!(
        last,
        Some(ProgressEvent::Finished {
            status: FinishStatus::Failed,
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn trigger_as_soon_as_idle() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    let (ingestor, _) = ingestor(&config);
    let mut state = ingestor.state();

    for _ in 0..200 {
        state.borrow_and_update();
        let run = tokio::spawn({
            let ingestor = ingestor.clone();
            async move { ingestor.trigger(Trigger::Periodic).await }
        });

        // the run releases the guard when `Idle` is published
        loop {
            state.changed().await.unwrap();
            let running = state.borrow_and_update().is_running();
            if !running {
                break;
            }
        }
        assert_eq!(
            ingestor.trigger(Trigger::Manual).await.unwrap(),
            RunOutcome::MissingSource
        );

        assert_eq!(run.await.unwrap().unwrap(), RunOutcome::MissingSource);
    }
}
