//! Fakes for the external probe and encoder, shared by the unit tests.

use crate::encoder::{Encoder, EncoderEvent, EncoderInvocation};
use crate::error::JoinError;
use crate::item_list::MediaItem;
use crate::probe::{MediaProbe, ProbeInfo};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// `/videos/<name>.mp4` lasting `secs` seconds with one video stream
pub fn item(name: &str, secs: u64) -> MediaItem {
    item_at(Path::new("/videos"), name, secs)
}

pub fn item_at(dir: &Path, name: &str, secs: u64) -> MediaItem {
    MediaItem::new(
        dir.join(format!("{}.mp4", name)),
        ProbeInfo {
            duration: Duration::from_secs(secs),
            video_stream_count: 1,
        },
    )
}

#[derive(Default)]
pub struct FakeProbe {
    results: HashMap<PathBuf, Result<ProbeInfo, String>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, secs: u64, video_streams: usize) -> Self {
        self.results.insert(
            PathBuf::from(path),
            Ok(ProbeInfo {
                duration: Duration::from_secs(secs),
                video_stream_count: video_streams,
            }),
        );
        self
    }

    pub fn with_error(mut self, path: &str, message: &str) -> Self {
        self.results.insert(PathBuf::from(path), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        match self.results.get(path) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(JoinError::probe(path, message).into()),
            None => Err(JoinError::probe(path, "No such file or directory").into()),
        }
    }
}

/// Reports progress in whole seconds up to each job's length, then writes
/// the output file. Jobs whose output file name is in `failing` write a
/// partial file and exit with an error instead.
#[derive(Default)]
pub struct FakeEncoder {
    job_lengths: HashMap<String, u64>,
    failing: Vec<String>,
    pub invocations: Mutex<Vec<EncoderInvocation>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, output_name: &str, secs: u64) -> Self {
        self.job_lengths.insert(output_name.to_string(), secs);
        self
    }

    pub fn failing_on(mut self, output_name: &str) -> Self {
        self.failing.push(output_name.to_string());
        self
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|invocation| invocation.output.clone())
            .collect()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        invocation: &EncoderInvocation,
        events: UnboundedSender<EncoderEvent>,
    ) -> Result<()> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let name = invocation
            .output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let _ = events.send(EncoderEvent::Log(format!("Output #0, mp4, to '{}':", name)));
        if self.failing.contains(&name) {
            let _ = events.send(EncoderEvent::Progress(Duration::from_secs(1)));
            // ffmpeg has usually written part of the file by then
            tokio::fs::write(&invocation.output, b"partial").await?;
            return Err(JoinError::Encode("Conversion failed!".to_string()).into());
        }

        let length = self.job_lengths.get(&name).copied().unwrap_or(0);
        for second in 1..=length {
            let _ = events.send(EncoderEvent::Progress(Duration::from_secs(second)));
            tokio::task::yield_now().await;
        }

        tokio::fs::write(&invocation.output, b"encoded").await?;
        Ok(())
    }
}
