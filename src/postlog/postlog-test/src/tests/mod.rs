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
use postlog_ingest::{Ingestor, RunOutcome, RunReport};

mod end_to_end;
mod guards;
mod scheduling;

/// Open the store of `config` and build the orchestrator on top of it.
fn ingestor(
    config: &postlog_config::Config,
) -> (
    std::sync::Arc<Ingestor>,
    std::sync::Arc<dyn postlog_store::LogStore>,
) {
    let store = postlog_store::connect(&config.storage).unwrap();
    (
        std::sync::Arc::new(Ingestor::from_config(config, store.clone())),
        store,
    )
}

fn completed(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        otherwise => panic!("run not completed: {otherwise}"),
    }
}

/// Wait until no run holds the single-run guard.
async fn idle(ingestor: &Ingestor) {
    let mut state = ingestor.state();
    loop {
        let running = state.borrow().is_running();
        if !running {
            break;
        }
        state.changed().await.unwrap();
    }
}
