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
use anyhow::Context;
use postlog::{Args, Commands};
use postlog_config::Config;

fn try_main() -> anyhow::Result<std::process::ExitCode> {
    let args = <Args as clap::Parser>::parse();

    if args.version {
        println!(
            "{} v{}\ncommit: {}",
            clap::crate_name!(),
            clap::crate_version!(),
            env!("GIT_HASH")
        );
        return Ok(std::process::ExitCode::SUCCESS);
    }

    let Some(command) = args.command.clone() else {
        anyhow::bail!("no commands where specified")
    };

    let config = args.config.as_ref().map_or_else(
        || Ok(Config::default()),
        |path| Config::from_path(path).context("Cannot parse the configuration"),
    )?;

    if !matches!(command, Commands::ConfigShow) {
        postlog::tracing_subscriber::initialize(&args, &config)?;
        tracing::info!(
            version = clap::crate_version!(),
            commit = env!("GIT_HASH"),
            "postlog starting."
        );
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("postlog")
        .build()?
        .block_on(command.execute(config, &mut std::io::stdout()))
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            for cause in error.chain().skip(1) {
                eprintln!("because: {cause}");
            }
            std::process::ExitCode::FAILURE
        }
    }
}
