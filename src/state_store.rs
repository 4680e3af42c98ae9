//! Persistence of per-target check state between invocations.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::models::StateDocument;
use crate::utils::error::{AppError, Result};

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state. A store that does not exist yet is empty.
    async fn load(&self) -> Result<StateDocument>;

    /// Persist the whole document atomically.
    async fn save(&self, document: &StateDocument) -> Result<()>;
}

/// State kept in a single pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh sibling path for one save, so concurrent saves never share a file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    fn corrupt(&self, message: impl ToString) -> AppError {
        AppError::StateCorrupt {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Write the serialized document next to the state file and flush it to
    /// disk. The live file is untouched until [`Self::commit`].
    pub(crate) async fn stage(&self, document: &StateDocument) -> Result<PathBuf> {
        fs::create_dir_all(self.parent_dir()).await?;

        let mut payload = serde_json::to_vec_pretty(document)?;
        payload.push(b'\n');

        let staged = self.staging_path();
        if let Err(e) = write_synced(&staged, &payload).await {
            let _ = fs::remove_file(&staged).await;
            return Err(e.into());
        }

        Ok(staged)
    }

    /// Replace the live file with a staged one and make the rename durable.
    pub(crate) async fn commit(&self, staged: &Path) -> Result<()> {
        if let Err(e) = fs::rename(staged, &self.path).await {
            let _ = fs::remove_file(staged).await;
            return Err(e.into());
        }

        #[cfg(unix)]
        fs::File::open(self.parent_dir()).await?.sync_all().await?;

        Ok(())
    }
}

async fn write_synced(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<StateDocument> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}, starting fresh", self.path.display());
                return Ok(StateDocument::default());
            }
            Err(e) => return Err(self.corrupt(e)),
        };

        if raw.trim().is_empty() {
            return Ok(StateDocument::default());
        }

        serde_json::from_str(&raw).map_err(|e| self.corrupt(e))
    }

    async fn save(&self, document: &StateDocument) -> Result<()> {
        let staged = self.stage(document).await?;
        self.commit(&staged).await
    }
}
