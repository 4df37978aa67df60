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

use crate::{
    config::field::{
        FieldCheckpoint, FieldCorrelation, FieldLogs, FieldProgress, FieldSchedule, FieldSource,
        FieldStorage,
    },
    Config,
};
use postlog_common::ServiceMap;

impl Default for Config {
    fn default() -> Self {
        Self {
            version_requirement: semver::VersionReq::parse(concat!(
                ">=",
                env!("CARGO_PKG_VERSION")
            ))
            .expect("hardcoded value is valid"),
            source: FieldSource::default(),
            checkpoint: FieldCheckpoint::default(),
            storage: FieldStorage::default(),
            schedule: FieldSchedule::default(),
            correlation: FieldCorrelation::default(),
            progress: FieldProgress::default(),
            logs: FieldLogs::default(),
        }
    }
}

impl Default for FieldSource {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            truncate: Self::default_truncate(),
        }
    }
}

impl FieldSource {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/mail.log".into()
    }

    pub(crate) const fn default_truncate() -> bool {
        true
    }
}

impl Default for FieldCheckpoint {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
        }
    }
}

impl FieldCheckpoint {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/lib/postlog/checkpoint.json".into()
    }
}

impl Default for FieldStorage {
    fn default() -> Self {
        Self::Sqlite {
            filepath: "/var/lib/postlog/postlog.db".into(),
        }
    }
}

impl FieldStorage {
    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    pub(crate) const fn default_connections() -> u32 {
        4
    }
}

impl Default for FieldSchedule {
    fn default() -> Self {
        Self {
            period: Self::default_period(),
            deadline: None,
        }
    }
}

impl FieldSchedule {
    pub(crate) const fn default_period() -> std::time::Duration {
        std::time::Duration::from_secs(60 * 60)
    }
}

impl Default for FieldCorrelation {
    fn default() -> Self {
        Self {
            queue_services: Self::default_queue_services(),
            delivery_services: Self::default_delivery_services(),
        }
    }
}

impl FieldCorrelation {
    pub(crate) fn default_queue_services() -> Vec<String> {
        vec![ServiceMap::QMGR.to_string()]
    }

    pub(crate) fn default_delivery_services() -> Vec<String> {
        vec![ServiceMap::SMTP.to_string()]
    }
}

impl Default for FieldProgress {
    fn default() -> Self {
        Self {
            channel_size: Self::default_channel_size(),
        }
    }
}

impl FieldProgress {
    pub(crate) const fn default_channel_size() -> usize {
        256
    }
}

impl Default for FieldLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            level: Self::default_level(),
        }
    }
}

impl FieldLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/postlog/".into()
    }

    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec!["info".parse().expect("hardcoded value is valid")]
    }
}
