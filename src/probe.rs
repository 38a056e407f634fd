//! # Media Probe Module
//!
//! Questo modulo ispeziona i file video con ffprobe senza decodificarli.
//!
//! ## Responsabilità:
//! - Definisce il trait `MediaProbe`, il collaboratore esterno usato
//!   dall'item list per ottenere durata e numero di stream video
//! - Implementa `FfprobeProbe` che invoca `ffprobe -print_format json`
//! - Converte l'output JSON di ffprobe in `ProbeInfo`
//!
//! ## Esempio:
//! ```rust,ignore
//! let probe = FfprobeProbe::new(PlatformCommands::new(config.ffmpeg_dir.clone()));
//! let info = probe.probe(&video_path).await?;
//! ```

use crate::error::JoinError;
use crate::platform::PlatformCommands;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// What the item list needs to know about a file
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub duration: Duration,
    pub video_stream_count: usize,
}

/// Inspects a media file for duration and stream layout
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Fails with `JoinError::Probe` for unreadable or unrecognised files
    async fn probe(&self, path: &Path) -> Result<ProbeInfo>;
}

/// `MediaProbe` backed by the ffprobe binary
pub struct FfprobeProbe {
    platform: PlatformCommands,
}

impl FfprobeProbe {
    pub fn new(platform: PlatformCommands) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let ffprobe_cmd = self.platform.get_command("ffprobe");

        let output = Command::new(&ffprobe_cmd)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| JoinError::probe(path, format!("Failed to execute {}: {}", ffprobe_cmd.display(), e)))?;

        if !output.status.success() {
            return Err(JoinError::probe(path, String::from_utf8_lossy(&output.stderr).trim()).into());
        }

        let info = parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| JoinError::probe(path, e))?;
        debug!(
            "Probed {}: {:.2}s, {} video stream(s)",
            path.display(),
            info.duration.as_secs_f64(),
            info.video_stream_count
        );
        Ok(info)
    }
}

/// Extract duration and video stream count from `ffprobe -print_format json`
pub fn parse_ffprobe_json(json: &str) -> Result<ProbeInfo, String> {
    let info: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let empty_vec = vec![];
    let streams = info["streams"].as_array().unwrap_or(&empty_vec);
    // Cover art is reported as a video stream with the attached_pic disposition
    let video_stream_count = streams
        .iter()
        .filter(|s| s["codec_type"] == "video")
        .filter(|s| s["disposition"]["attached_pic"].as_i64().unwrap_or(0) == 0)
        .count();

    let format_duration = info["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok());
    let stream_duration = streams
        .iter()
        .filter_map(|s| s["duration"].as_str().and_then(|d| d.parse::<f64>().ok()))
        .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));

    let seconds = format_duration.or(stream_duration).unwrap_or(0.0);
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("Invalid duration reported: {}", seconds))?;

    Ok(ProbeInfo {
        duration,
        video_stream_count,
    })
}
