use super::{DedupMode, DedupSnapshot, DedupStore};
use crate::types::{RelayError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Newline-delimited id list on disk (a single line in cursor mode).
pub struct FileDedupStore {
    path: PathBuf,
    snapshot: DedupSnapshot,
}

impl FileDedupStore {
    /// Load the store. A missing file is an empty store; a file that exists
    /// but cannot be read is an error, because running without the history
    /// would repost everything.
    pub async fn open(path: impl Into<PathBuf>, mode: DedupMode) -> Result<Self> {
        let path = path.into();

        let persisted = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No dedup cache at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(RelayError::Store(format!("cannot read {}: {}", path.display(), e)));
            }
        };

        let snapshot = DedupSnapshot::new(mode, persisted);
        info!("Loaded {} delivered ids from {}", snapshot.len(), path.display());

        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dedup".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    async fn write_atomically(&self, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl DedupStore for FileDedupStore {
    fn backend_name(&self) -> String {
        format!("file({})", self.path.display())
    }

    fn snapshot(&self) -> &DedupSnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut DedupSnapshot {
        &mut self.snapshot
    }

    async fn persist(&mut self, ids: &[String]) -> Result<()> {
        let content = match self.snapshot.mode() {
            DedupMode::Cursor => ids.last().cloned().unwrap_or_default(),
            DedupMode::Bounded { .. } => {
                let mut content = ids.join("\n");
                content.push('\n');
                content
            }
        };

        self.write_atomically(&content)
            .await
            .map_err(|e| RelayError::Store(format!("cannot write {}: {}", self.path.display(), e)))
    }
}
