//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di export persistiti
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `target_height`: Altezza di output in pixel (default: None = nessuno scaling)
//! - `quality_preset`: Preset x264 (default: medium)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//! - `ffmpeg_dir`: Directory con ffmpeg/ffprobe (default: None = PATH)
//!
//! La configurazione viene iniettata nel coordinatore di export come valore,
//! mai letta come stato globale.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     target_height: Some(720),
//!     quality_preset: QualityPreset::Slow,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::JoinError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the per-user directory holding settings and queue state
pub const APP_DIR_NAME: &str = ".clip-joiner";

/// x264 speed/compression presets accepted by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 9] = [
        Self::Ultrafast,
        Self::Superfast,
        Self::Veryfast,
        Self::Faster,
        Self::Fast,
        Self::Medium,
        Self::Slow,
        Self::Slower,
        Self::Veryslow,
    ];

    /// Value passed to `-preset`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for clip export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output height in pixels, aspect ratio preserved (None = keep source size)
    pub target_height: Option<u32>,
    /// x264 preset
    pub quality_preset: QualityPreset,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
    /// Directory containing ffmpeg and ffprobe (None = resolve from PATH)
    pub ffmpeg_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_height: None,
            quality_preset: QualityPreset::default(),
            json_output: false,
            ffmpeg_dir: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if let Some(height) = self.target_height {
            if height == 0 {
                return Err(JoinError::Validation("Target height must be greater than 0".to_string()).into());
            }
            // yuv420p output needs even dimensions
            if height % 2 != 0 {
                return Err(JoinError::Validation(format!("Target height must be an even number, got {}", height)).into());
            }
        }

        if let Some(ref dir) = self.ffmpeg_dir {
            if !dir.is_dir() {
                return Err(JoinError::Validation(format!("FFmpeg directory does not exist: {}", dir.display())).into());
            }
        }

        Ok(())
    }

    /// Per-user application directory (`~/.clip-joiner`)
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(APP_DIR_NAME))
    }

    /// Default settings file location
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.json"))
    }

    /// Load configuration from file. Values are not validated here: a stale
    /// `ffmpeg_dir` must not lock out commands that never use it.
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
