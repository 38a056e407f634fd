//! # Progress Tracking Module
//!
//! Aggregazione del progresso su tutto l'export e suo rendering.
//!
//! - `ProgressAggregator`: funzione pura dei messaggi ricevuti, percentuale
//!   `100 * (completato + corrente) / totale` sull'intero batch
//! - `ExportEvent`: messaggi emessi dal coordinatore verso chi mostra il progresso
//! - `ProgressTracker`: consumer che gestisce sia output JSON che progress bar

use crate::{json_output::JsonMessage, progress::ProgressManager};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Duration-weighted progress across every job of one export
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    total: Duration,
    completed: Duration,
    current: Duration,
    current_job: Duration,
}

impl ProgressAggregator {
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// A job of length `job_duration` starts
    pub fn start_job(&mut self, job_duration: Duration) {
        self.current = Duration::ZERO;
        self.current_job = job_duration;
    }

    /// The running job reports `processed` output so far
    pub fn update(&mut self, processed: Duration) -> f64 {
        // ffmpeg may overshoot the probed length or repeat an older timestamp
        self.current = processed.min(self.current_job).max(self.current);
        self.percent()
    }

    /// The running job exited cleanly; its full length counts as done
    pub fn finish_job(&mut self) -> f64 {
        self.completed += self.current_job;
        self.current = Duration::ZERO;
        self.current_job = Duration::ZERO;
        self.percent()
    }

    pub fn processed(&self) -> Duration {
        self.completed + self.current
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Overall percentage, 0 when there is nothing to measure against
    pub fn percent(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        (self.processed().as_secs_f64() / self.total.as_secs_f64() * 100.0).min(100.0)
    }
}

/// Snapshot of the aggregate progress
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    pub job_index: usize,
    pub total_jobs: usize,
    pub percent: f64,
    pub processed: Duration,
    pub total: Duration,
}

/// Messages from the coordinator to whoever displays the export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    JobStarted {
        index: usize,
        total_jobs: usize,
        output: PathBuf,
        duration: Duration,
    },
    Progress(ExportProgress),
    JobFinished {
        index: usize,
        output: PathBuf,
    },
    JobFailed {
        index: usize,
        output: PathBuf,
        message: String,
    },
}

/// Renders export events as a progress bar or as JSON lines
pub struct ProgressTracker {
    json_output: bool,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new()
        };

        Self {
            json_output,
            progress_manager,
        }
    }

    /// Consume events until the coordinator drops its sender
    pub async fn run(self, mut events: UnboundedReceiver<ExportEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.handle(&event);
        }
        self
    }

    pub fn handle(&self, event: &ExportEvent) {
        if self.json_output {
            JsonMessage::from_event(event).emit();
            return;
        }

        match event {
            ExportEvent::JobStarted {
                index,
                total_jobs,
                output,
                ..
            } => {
                self.progress_manager.set_message(&format!(
                    "[{}/{}] {}",
                    index + 1,
                    total_jobs,
                    file_name(output)
                ));
            }
            ExportEvent::Progress(progress) => {
                self.progress_manager.set_percent(progress.percent);
            }
            ExportEvent::JobFinished { output, .. } => {
                self.progress_manager.println(&format!("[OK] {}", file_name(output)));
            }
            ExportEvent::JobFailed { output, .. } => {
                self.progress_manager.println(&format!("[ERROR] {}", file_name(output)));
            }
        }
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_is_zero_percent() {
        let mut aggregator = ProgressAggregator::new(Duration::ZERO);
        aggregator.start_job(Duration::ZERO);
        assert_eq!(aggregator.update(Duration::from_secs(3)), 0.0);
        assert_eq!(aggregator.finish_job(), 0.0);
    }

    #[test]
    fn test_batch_progress_across_jobs() {
        let mut aggregator = ProgressAggregator::new(Duration::from_secs(8));

        aggregator.start_job(Duration::from_secs(5));
        assert_eq!(aggregator.update(Duration::from_secs(2)), 25.0);
        assert_eq!(aggregator.finish_job(), 62.5);

        aggregator.start_job(Duration::from_secs(3));
        assert_eq!(aggregator.update(Duration::from_secs(1)), 75.0);
        assert_eq!(aggregator.finish_job(), 100.0);
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut aggregator = ProgressAggregator::new(Duration::from_secs(10));
        aggregator.start_job(Duration::from_secs(4));

        let mut last = 0.0;
        for secs in [1, 3, 2, 9, 0] {
            let percent = aggregator.update(Duration::from_secs(secs));
            assert!(percent >= last);
            last = percent;
        }
        // Overshoot is clamped to the job length
        assert_eq!(last, 40.0);
        assert_eq!(aggregator.finish_job(), 40.0);
        assert_eq!(aggregator.processed(), Duration::from_secs(4));
    }

    #[test]
    fn test_tracker_handles_events_without_panicking() {
        let tracker = ProgressTracker::new(false);
        tracker.handle(&ExportEvent::JobStarted {
            index: 0,
            total_jobs: 1,
            output: PathBuf::from("/out/a.mp4"),
            duration: Duration::from_secs(1),
        });
        tracker.handle(&ExportEvent::Progress(ExportProgress {
            job_index: 0,
            total_jobs: 1,
            percent: 50.0,
            processed: Duration::from_millis(500),
            total: Duration::from_secs(1),
        }));
        tracker.handle(&ExportEvent::JobFinished {
            index: 0,
            output: PathBuf::from("/out/a.mp4"),
        });
        tracker.finish("done");
    }

    #[tokio::test]
    async fn test_run_returns_when_sender_dropped() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(ProgressTracker::new(false).run(rx));

        tx.send(ExportEvent::JobFailed {
            index: 0,
            output: PathBuf::from("/out/a.mp4"),
            message: "Conversion failed!".to_string(),
        })
        .unwrap();
        drop(tx);

        let tracker = task.await.unwrap();
        tracker.finish("failed");
    }
}
