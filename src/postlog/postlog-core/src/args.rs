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

///
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, author)]
pub struct Args {
    /// Print the version and exit.
    #[clap(short, long, action)]
    pub version: bool,

    /// Path of the postlog configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    /// Also write the logs to the standard output.
    #[clap(long, action)]
    pub stdout: bool,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
#[derive(Clone, clap::Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum Commands {
    /// Ingest the new lines of the log file once, printing the progress
    Run,
    /// Ingest periodically, until SIGTERM or SIGINT. SIGUSR1 triggers a run.
    Serve {
        /// Stop after this duration (e.g. `10s`, `1h`)
        #[clap(short, long, value_parser = humantime::parse_duration)]
        timeout: Option<std::time::Duration>,
    },
    /// Print the effective configuration as JSON
    ConfigShow,
}
