//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery di video.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file video in directory
//! - Determinazione formato file tramite estensione
//! - Rilevamento e cancellazione dei file di output già esistenti
//! - Formattazione human-readable delle durate
//!
//! ## Formati riconosciuti durante la discovery:
//! - **Video**: MP4, MOV, AVI, MKV, WebM, M4V, WMV, FLV, MPG, MPEG, TS
//!
//! I file passati esplicitamente non vengono filtrati per estensione:
//! decide ffprobe se sono leggibili.
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::expand_inputs(&[PathBuf::from("/path/to/clips")])?;
//! let existing = FileManager::existing_files(&planned_outputs);
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "webm", "m4v", "wmv", "flv", "mpg", "mpeg", "ts",
];

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Check if a file is a video, judging by its extension
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Find all video files in a directory, sorted by path
    pub fn find_video_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| Self::is_video(path))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Expand user-supplied paths: directories become the videos they
    /// contain, files are kept as given and in the given order
    pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_dir() {
                let found = Self::find_video_files(path)?;
                debug!("Found {} videos in {}", found.len(), path.display());
                files.extend(found);
            } else {
                files.push(path.clone());
            }
        }

        Ok(files)
    }

    /// Planned output paths that already exist on disk, in the given order
    pub fn existing_files(paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().filter(|path| path.exists()).cloned().collect()
    }

    /// Delete a file if present; returns whether something was removed
    pub async fn remove_if_exists(path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted existing file: {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Failed to delete {}: {}", path.display(), e)),
        }
    }

    /// Format a duration as `HH:MM:SS`
    pub fn format_duration(duration: Duration) -> String {
        let total = duration.as_secs();
        format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}
