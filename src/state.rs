//! # Queue State Module
//!
//! Questo modulo persiste la lista ordinata tra un'invocazione e l'altra.
//!
//! ## Responsabilità:
//! - Salva i `MediaItem` (già probati) in un file JSON
//! - Un file di coda per working directory (basato su hash del path)
//! - Salvataggio in `~/.clip-joiner/queue_<hash>.json`
//! - Cleanup automatico di entry per file che non esistono più
//!
//! ## Esempio struttura state file:
//! ```json
//! {
//!   "items": [
//!     {
//!       "path": "/videos/a.mp4",
//!       "display_name": "a.mp4",
//!       "duration": { "secs": 5, "nanos": 0 },
//!       "video_stream_count": 1
//!     }
//!   ],
//!   "updated_at": 1642680000
//! }
//! ```

use crate::config::Config;
use crate::error::JoinError;
use crate::item_list::{ItemList, MediaItem};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info};

/// On-disk form of the list
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct QueueFile {
    pub items: Vec<MediaItem>,
    pub updated_at: u64,
}

/// Loads and saves the ordered list
pub struct QueueStore {
    state_file_path: PathBuf,
}

impl QueueStore {
    /// Queue file for a working directory
    pub async fn for_directory(work_dir: &Path) -> Result<Self> {
        let state_dir = Config::app_dir()?;
        fs::create_dir_all(&state_dir).await?;

        let mut hasher = Sha256::new();
        hasher.update(work_dir.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize())[..16].to_string();

        Ok(Self::at(state_dir.join(format!("queue_{}.json", hash))))
    }

    /// Queue file at an explicit location
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            state_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    /// Load the list; a missing file is an empty list
    pub async fn load(&self) -> Result<ItemList> {
        if !self.state_file_path.exists() {
            return Ok(ItemList::new());
        }

        let content = fs::read_to_string(&self.state_file_path).await?;
        let queue: QueueFile = serde_json::from_str(&content).map_err(|e| {
            JoinError::State(format!("{} is not a valid queue file: {}", self.state_file_path.display(), e))
        })?;

        debug!("Loaded {} item(s) from {}", queue.items.len(), self.state_file_path.display());
        Ok(ItemList::from_items(queue.items))
    }

    /// Save current list to file
    pub async fn save(&self, list: &ItemList) -> Result<()> {
        if let Some(parent) = self.state_file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let queue = QueueFile {
            items: list.items().to_vec(),
            updated_at: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };

        let content = serde_json::to_string_pretty(&queue)?;
        fs::write(&self.state_file_path, content).await?;
        Ok(())
    }

    /// Drop items whose file no longer exists; returns the dropped paths
    pub fn cleanup(list: &mut ItemList) -> Vec<PathBuf> {
        let missing: Vec<PathBuf> = list
            .items()
            .iter()
            .filter(|item| !item.path.exists())
            .map(|item| item.path.clone())
            .collect();

        if !missing.is_empty() {
            // Selection is non-empty here, so this cannot be NoSelection
            let _ = list.remove(&missing);
            info!("Removed {} missing file(s) from the list", missing.len());
        }

        missing
    }
}
