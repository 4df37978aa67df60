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

/// The content of the log source at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Lines terminated by `\n`, without their terminator.
    pub lines: Vec<String>,
    /// The file ends with an unterminated line, still being written.
    pub partial_tail: bool,
    /// Length of the file in bytes when it was read.
    pub byte_len: u64,
}

impl Snapshot {
    /// Split the raw content of the file, invalid UTF-8 is replaced.
    ///
    /// The fingerprint of an entry is computed on the replaced text: two
    /// lines differing only by their invalid bytes are stored once.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let content = String::from_utf8_lossy(bytes);
        let mut pieces = content.split('\n').collect::<Vec<_>>();

        // the piece after the last `\n`, empty if the file ends with a newline
        let tail = pieces.pop().unwrap_or_default();

        Self {
            lines: pieces
                .into_iter()
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
                .collect(),
            partial_tail: !tail.is_empty(),
            byte_len: bytes.len() as u64,
        }
    }

    /// The file has no content at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.byte_len == 0
    }
}

/// The log file appended by syslog and emptied by the ingestion.
#[derive(Debug, Clone)]
pub struct LogSource {
    filepath: std::path::PathBuf,
}

impl LogSource {
    ///
    #[must_use]
    pub fn new(filepath: impl Into<std::path::PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    ///
    #[must_use]
    pub fn filepath(&self) -> &std::path::Path {
        &self.filepath
    }

    /// Read the whole file, `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// * the file exists but cannot be read
    pub async fn read(&self) -> std::io::Result<Option<Snapshot>> {
        match tokio::fs::read(&self.filepath).await {
            Ok(bytes) => Ok(Some(Snapshot::from_bytes(&bytes))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Empty the file if its length is still `expected_len`.
    ///
    /// Returns `false` if lines have been appended since the read (or the
    /// file has been removed), the file is left untouched.
    ///
    /// # Errors
    ///
    /// * the file cannot be opened for writing or resized
    pub async fn truncate_if_unchanged(&self, expected_len: u64) -> std::io::Result<bool> {
        let file = match tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.filepath)
            .await
        {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(error) => return Err(error),
        };

        let current_len = file.metadata().await?.len();
        if current_len != expected_len {
            tracing::debug!(
                expected_len,
                current_len,
                "Log source has grown since the read, not truncated."
            );
            return Ok(false);
        }

        file.set_len(0).await?;
        Ok(true)
    }
}
