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
use postlog_config::Config;

impl Commands {
    /// Execute the command, writing its output to `output`.
    ///
    /// # Errors
    ///
    /// * the store cannot be opened
    /// * the output cannot be written
    pub async fn execute<OUT: std::io::Write + Send>(
        self,
        config: Config,
        output: &mut OUT,
    ) -> anyhow::Result<std::process::ExitCode> {
        match self {
            Self::Run => Ok(if Self::run(&config, output).await? {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::FAILURE
            }),
            Self::Serve { timeout } => Self::serve(&config, timeout)
                .await
                .map(|()| std::process::ExitCode::SUCCESS),
            Self::ConfigShow => {
                Self::config_show(&config, output).map(|()| std::process::ExitCode::SUCCESS)
            }
        }
    }
}
