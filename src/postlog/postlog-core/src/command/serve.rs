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
use crate::Commands;
use anyhow::Context;
use postlog_config::Config;
use postlog_ingest::{Ingestor, Scheduler};

impl Commands {
    /// Run the scheduler until SIGTERM, SIGINT or the end of `timeout`.
    pub(crate) async fn serve(
        config: &Config,
        timeout: Option<std::time::Duration>,
    ) -> anyhow::Result<()> {
        let store = postlog_store::connect(&config.storage).context("Cannot open the store")?;
        let ingestor = std::sync::Arc::new(Ingestor::from_config(config, store));
        let (scheduler, handle) = Scheduler::new(ingestor, config.schedule.period);

        let (stop_sender, mut stop_receiver) = tokio::sync::mpsc::channel::<()>(1);
        let mut signals = signal_hook::iterator::Signals::new([
            // Send by `systemctl stop` (and then sending `SIGKILL`)
            signal_hook::consts::SIGTERM,
            // Ctrl+C on a terminal
            signal_hook::consts::SIGINT,
            // on-demand run, `kill -USR1 $(pidof postlog)`
            signal_hook::consts::SIGUSR1,
        ])?;
        let signals_handle = signals.handle();

        let _signal_handler = std::thread::spawn(move || {
            for sig in signals.forever() {
                if sig == signal_hook::consts::SIGUSR1 {
                    if !handle.notify() {
                        tracing::warn!(signal = sig, "On-demand run refused.");
                    }
                    continue;
                }

                tracing::warn!(signal = sig, "Stopping postlog.");
                if stop_sender.blocking_send(()).is_err() {
                    break;
                }
            }
        });

        scheduler
            .run(async move {
                match timeout {
                    Some(duration) => {
                        let _ = tokio::time::timeout(duration, stop_receiver.recv()).await;
                    }
                    None => {
                        stop_receiver.recv().await;
                    }
                }
            })
            .await;

        signals_handle.close();
        Ok(())
    }
}
