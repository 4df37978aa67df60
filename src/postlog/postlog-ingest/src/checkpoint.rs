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
use postlog_common::Checkpoint;

/// Persistence of the [`Checkpoint`], read and written as a whole document.
#[async_trait::async_trait]
pub trait CheckpointStore
where
    Self: std::fmt::Debug + Sync + Send,
{
    /// The persisted checkpoint, or the zero checkpoint if it is missing or unreadable.
    async fn load(&self) -> Checkpoint;

    /// Replace the persisted checkpoint.
    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()>;
}

/// A JSON document on the filesystem.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    filepath: std::path::PathBuf,
}

impl FileCheckpointStore {
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
}

#[async_trait::async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Checkpoint {
        let content = match tokio::fs::read(&self.filepath).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(filepath = %self.filepath.display(), "No checkpoint, starting from the first line.");
                return Checkpoint::default();
            }
            Err(error) => {
                tracing::warn!(%error, filepath = %self.filepath.display(), "Checkpoint unreadable, starting from the first line.");
                return Checkpoint::default();
            }
        };

        serde_json::from_slice(&content).unwrap_or_else(|error| {
            tracing::warn!(%error, filepath = %self.filepath.display(), "Checkpoint corrupted, starting from the first line.");
            Checkpoint::default()
        })
    }

    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        if let Some(parent) = self.filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let mut tmp = self.filepath.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(checkpoint)?)
            .await
            .with_context(|| format!("Cannot write file '{}'", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.filepath)
            .await
            .with_context(|| format!("Cannot replace file '{}'", self.filepath.display()))?;

        tracing::trace!(line_index = checkpoint.line_index, "Checkpoint saved.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_then_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("state").join("checkpoint.json"));

        assert_eq!(store.load().await, Checkpoint::default());

        let checkpoint = Checkpoint {
            line_index: 12,
            entries_inserted: 10,
            runs: 1,
            ..Checkpoint::default()
        };
        store.save(&checkpoint).await.unwrap();

        assert_eq!(store.load().await, checkpoint);
        assert!(!dir.path().join("state").join("checkpoint.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupted_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("checkpoint.json");
        std::fs::write(&filepath, "{ line_index: ").unwrap();

        assert_eq!(
            FileCheckpointStore::new(filepath).load().await,
            Checkpoint::default()
        );
    }

    #[tokio::test]
    async fn unwritable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "").unwrap();

        // the parent is a regular file
        FileCheckpointStore::new(dir.path().join("file").join("checkpoint.json"))
            .save(&Checkpoint::default())
            .await
            .unwrap_err();
    }
}
