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
use postlog_config::{field, Config};

/// Get a config for local test, every file lives in `dir`.
#[must_use]
pub fn local_test(dir: &std::path::Path) -> Config {
    Config {
        source: field::FieldSource {
            filepath: dir.join("mail.log"),
            truncate: true,
        },
        checkpoint: field::FieldCheckpoint {
            filepath: dir.join("state").join("checkpoint.json"),
        },
        storage: field::FieldStorage::Sqlite {
            filepath: dir.join("postlog.db"),
        },
        logs: field::FieldLogs {
            filepath: dir.join("logs"),
            ..field::FieldLogs::default()
        },
        ..Config::default()
    }
}
