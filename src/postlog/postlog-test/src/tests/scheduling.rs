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
use crate::{config::local_test, fixtures::*};
use postlog_ingest::{
    progress::{FinishStatus, ProgressEvent, Trigger},
    IngestError, Scheduler,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_tick_is_immediate() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());
    write_log(&config.source.filepath, &[QMGR_ABC123, SMTP_ABC123_SENT]);

    let (ingestor, store) = ingestor(&config);
    let mut progress = ingestor.subscribe();
    let (scheduler, _handle) = Scheduler::new(ingestor.clone(), config.schedule.period);
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let scheduler = tokio::spawn(scheduler.run(async move {
        let _ = stopped.await;
    }));

    let mut events = vec![];
    while let Some(event) = progress.next().await {
        events.push(event);
    }

    assert_eq!(
        events.first(),
        Some(&ProgressEvent::Started {
            run_id: 1,
            trigger: Trigger::Periodic
        })
    );
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Finished {
            status: FinishStatus::Succeeded,
            ..
        })
    ));

    stop.send(()).unwrap();
    scheduler.await.unwrap();

    assert_eq!(store.stats().await.unwrap().entries, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_trigger_replies_with_the_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_test(dir.path());

    let (ingestor, _) = ingestor(&config);
    let mut progress = ingestor.subscribe();
    let (scheduler, handle) = Scheduler::new(ingestor.clone(), config.schedule.period);
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let scheduler = tokio::spawn(scheduler.run(async move {
        let _ = stopped.await;
    }));

    // the periodic run finds nothing
    while progress.next().await.is_some() {}
    idle(&ingestor).await;

    write_log(&config.source.filepath, &[QMGR_ABC123]);
    let report = completed(handle.trigger().await.unwrap());
    assert_eq!(report.run_id, 2);
    assert_eq!(report.entries.written, 1);

    idle(&ingestor).await;
    assert!(handle.notify());

    stop.send(()).unwrap();
    scheduler.await.unwrap();

    assert!(matches!(
        handle.trigger().await,
        Err(IngestError::SchedulerStopped)
    ));
}
