//! # Encoder Module
//!
//! Questo modulo esegue ffmpeg come processo esterno opaco.
//!
//! ## Responsabilità:
//! - Definisce il trait `Encoder` usato dal coordinatore di export
//! - Implementa `FfmpegEncoder` con `tokio::process`
//! - Espone due canali di eventi: progress (durata cumulativa processata)
//!   e righe di log grezze di ffmpeg
//! - Converte l'exit code non-zero in `JoinError::Encode` con la coda di stderr
//!
//! ## Protocollo di progress:
//! ffmpeg viene lanciato con `-progress pipe:1 -nostats`, quindi su stdout
//! arrivano blocchi `key=value`:
//! ```text
//! frame=120
//! out_time_us=4004000
//! speed=2.1x
//! progress=continue
//! ```
//! Solo `out_time_us` / `out_time_ms` (entrambi in microsecondi) interessano.
//!
//! ## Esempio:
//! ```rust,ignore
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! encoder.encode(&invocation, tx).await?;
//! ```

use crate::error::JoinError;
use crate::platform::PlatformCommands;
use crate::utils::shell_join;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Number of stderr lines kept for the failure diagnostic
const STDERR_TAIL_LINES: usize = 20;

/// Messages emitted while an encode is in flight
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderEvent {
    /// Cumulative duration of output written so far
    Progress(Duration),
    /// Raw diagnostic line from the encoder
    Log(String),
}

/// Arguments for one encoder run; the output path is appended last
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderInvocation {
    pub args: Vec<String>,
    pub output: PathBuf,
}

impl fmt::Display for EncoderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self.output.to_string_lossy();
        let all = self.args.iter().map(String::as_str).chain(std::iter::once(output.as_ref()));
        write!(f, "ffmpeg {}", shell_join(all))
    }
}

/// Runs one encode to completion
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Resolves when the process exits; fails with `JoinError::Encode`
    async fn encode(&self, invocation: &EncoderInvocation, events: UnboundedSender<EncoderEvent>) -> Result<()>;
}

/// `Encoder` backed by the ffmpeg binary
pub struct FfmpegEncoder {
    platform: PlatformCommands,
}

impl FfmpegEncoder {
    pub fn new(platform: PlatformCommands) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, invocation: &EncoderInvocation, events: UnboundedSender<EncoderEvent>) -> Result<()> {
        let ffmpeg_cmd = self.platform.get_command("ffmpeg");

        let mut cmd = Command::new(&ffmpeg_cmd);
        cmd.args(["-hide_banner", "-nostdin", "-y", "-progress", "pipe:1", "-nostats"])
            .args(&invocation.args)
            .arg(&invocation.output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Keep terminal Ctrl-C away from ffmpeg; cancellation happens between jobs
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| JoinError::Encode(format!("Failed to execute {}: {}", ffmpeg_cmd.display(), e)))?;

        // Drain stderr concurrently so a full pipe never stalls ffmpeg
        let stderr_task = child.stderr.take().map(|stderr| {
            let events = events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                    let _ = events.send(EncoderEvent::Log(line));
                }
                Vec::from(tail).join("\n")
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(processed) = parse_progress_line(&line) {
                    let _ = events.send(EncoderEvent::Progress(processed));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| JoinError::Encode(format!("Failed to wait for ffmpeg: {}", e)))?;

        let stderr_tail = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let message = if stderr_tail.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                stderr_tail
            };
            return Err(JoinError::Encode(message).into());
        }

        debug!("ffmpeg finished: {}", invocation.output.display());
        Ok(())
    }
}

/// Parse one line of ffmpeg `-progress` output into processed duration
pub fn parse_progress_line(line: &str) -> Option<Duration> {
    let line = line.trim();
    let value = line
        .strip_prefix("out_time_us=")
        // out_time_ms is in microseconds despite the name
        .or_else(|| line.strip_prefix("out_time_ms="))?;

    // Negative or N/A before the first frame is written
    let micros: i64 = value.trim().parse().ok()?;
    u64::try_from(micros).ok().map(Duration::from_micros)
}
