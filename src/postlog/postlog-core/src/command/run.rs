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
use postlog_ingest::{progress::Trigger, Ingestor};

impl Commands {
    /// One synchronous run, the progress is streamed to `output`.
    ///
    /// Returns `false` if the run failed.
    pub(crate) async fn run<OUT: std::io::Write + Send>(
        config: &Config,
        output: &mut OUT,
    ) -> anyhow::Result<bool> {
        let store = postlog_store::connect(&config.storage).context("Cannot open the store")?;
        let ingestor = Ingestor::from_config(config, store);
        let mut progress = ingestor.subscribe();

        let printer = async move {
            while let Some(event) = progress.next().await {
                writeln!(output, "{event}")?;
            }
            std::io::Result::Ok(())
        };

        // dropping the ingestor closes the progress stream
        let run = async move { ingestor.trigger(Trigger::Manual).await };

        let (outcome, printed) = tokio::join!(run, printer);
        printed.context("Cannot write the progress")?;

        match outcome {
            Ok(outcome) => {
                tracing::debug!(%outcome, "One-shot run succeeded.");
                Ok(true)
            }
            Err(error) => {
                tracing::error!(%error, "One-shot run failed.");
                Ok(false)
            }
        }
    }
}
