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
    pub(crate) fn config_show<OUT: std::io::Write>(
        config: &Config,
        output: &mut OUT,
    ) -> anyhow::Result<()> {
        output.write_fmt(format_args!(
            "{}\n",
            serde_json::to_string_pretty(config)?
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let mut output = vec![];
        Commands::config_show(&Config::default(), &mut output).unwrap();

        let json = serde_json::from_slice::<serde_json::Value>(&output).unwrap();
        assert_eq!(json["source"]["filepath"], "/var/log/mail.log");
        assert_eq!(json["storage"]["type"], "sqlite");
        assert_eq!(json["schedule"]["period"], "1h");
        assert_eq!(json["correlation"]["queue_services"][0], "postfix/qmgr");
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = postlog_test::config::local_test(dir.path());

        let mut output = vec![];
        Commands::config_show(&config, &mut output).unwrap();

        pretty_assertions::assert_eq!(
            serde_json::from_slice::<Config>(&output).unwrap(),
            config
        );
    }
}
