//! # Export Coordinator Module
//!
//! Esegue i job di export in sequenza, uno alla volta.
//!
//! ## Flusso:
//! 1. Calcola la durata totale di tutti i job prima di partire
//! 2. Per ogni job: cancella l'output esistente, lancia l'encoder, attende
//! 3. Gli eventi dell'encoder arrivano su un canale e vengono applicati
//!    all'aggregatore sul task del coordinatore (unico punto di sincronizzazione)
//! 4. Al primo errore di encoding l'output parziale viene cancellato e i job
//!    restanti non vengono tentati
//! 5. La cancellazione viene controllata solo tra un job e l'altro

use crate::{
    encoder::{Encoder, EncoderEvent},
    error::JoinError,
    export::{
        command::build_invocation,
        job::ExportJob,
        progress_tracker::{ExportEvent, ExportProgress, ProgressAggregator},
    },
    file_manager::FileManager,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Job that stopped the export
#[derive(Debug)]
pub struct JobFailure {
    pub output: PathBuf,
    pub error: JoinError,
}

/// What happened to each job of one export
#[derive(Debug, Default)]
pub struct ExportReport {
    pub completed: Vec<PathBuf>,
    pub failed: Option<JobFailure>,
    pub not_attempted: Vec<PathBuf>,
    pub cancelled: bool,
    pub final_percent: f64,
    pub elapsed_secs: f64,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none() && !self.cancelled
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Completed: {} | Failed: {} | Not attempted: {} | {:.1}s",
            self.completed.len(),
            usize::from(self.failed.is_some()),
            self.not_attempted.len(),
            self.elapsed_secs
        );
        if self.cancelled {
            summary.push_str(" | cancelled");
        }
        summary
    }

    /// Turn a failed or cancelled export into its error
    pub fn into_result(self) -> Result<Self, JoinError> {
        if self.cancelled {
            return Err(JoinError::Cancelled);
        }
        match self.failed {
            Some(failure) => Err(failure.error),
            None => Ok(self),
        }
    }
}

/// Runs export jobs through an `Encoder`, strictly one after another
pub struct ExportCoordinator<E: Encoder> {
    encoder: E,
    events: Option<UnboundedSender<ExportEvent>>,
    cancel: CancellationToken,
}

impl<E: Encoder> ExportCoordinator<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Send progress and job events to `events`
    pub fn with_events(mut self, events: UnboundedSender<ExportEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop before the next job once `cancel` is triggered
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(ref events) = self.events {
            let _ = events.send(event);
        }
    }

    /// Run every job in order; stops at the first encode error
    pub async fn run_export(&self, jobs: &[ExportJob]) -> ExportReport {
        let start_time = Instant::now();
        let total = jobs.iter().map(ExportJob::duration).sum();
        let mut aggregator = ProgressAggregator::new(total);
        let mut report = ExportReport::default();

        info!("Starting export of {} job(s), {:.1}s of video", jobs.len(), total.as_secs_f64());

        for (index, job) in jobs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Export cancelled before job {}/{}", index + 1, jobs.len());
                report.cancelled = true;
                report.not_attempted = jobs[index..].iter().map(|job| job.output.clone()).collect();
                break;
            }

            self.emit(ExportEvent::JobStarted {
                index,
                total_jobs: jobs.len(),
                output: job.output.clone(),
                duration: job.duration(),
            });

            match self.run_job(job, index, jobs.len(), &mut aggregator).await {
                Ok(()) => {
                    self.emit(ExportEvent::JobFinished {
                        index,
                        output: job.output.clone(),
                    });
                    report.completed.push(job.output.clone());
                }
                Err(e) => {
                    error!("Export of {} failed: {}", job.output.display(), e);
                    self.emit(ExportEvent::JobFailed {
                        index,
                        output: job.output.clone(),
                        message: e.to_string(),
                    });
                    report.failed = Some(JobFailure {
                        output: job.output.clone(),
                        error: e,
                    });
                    report.not_attempted = jobs[index + 1..].iter().map(|job| job.output.clone()).collect();
                    break;
                }
            }
        }

        report.final_percent = aggregator.percent();
        report.elapsed_secs = start_time.elapsed().as_secs_f64();
        report
    }

    /// Run a single job to completion, feeding `aggregator` as progress arrives
    pub async fn run_job(
        &self,
        job: &ExportJob,
        index: usize,
        total_jobs: usize,
        aggregator: &mut ProgressAggregator,
    ) -> Result<(), JoinError> {
        FileManager::remove_if_exists(&job.output)
            .await
            .map_err(|e| JoinError::Encode(e.to_string()))?;

        let invocation = build_invocation(job);
        info!("🎬 {}", invocation);

        aggregator.start_job(job.duration());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = {
            let encode = self.encoder.encode(&invocation, tx);
            tokio::pin!(encode);

            loop {
                tokio::select! {
                    biased;
                    Some(event) = rx.recv() => self.apply(event, index, total_jobs, aggregator),
                    result = &mut encode => break result,
                }
            }
        };

        // Events sent just before the process exited
        while let Ok(event) = rx.try_recv() {
            self.apply(event, index, total_jobs, aggregator);
        }

        if let Err(e) = result {
            // A failed encode may leave a truncated file behind
            if let Err(cleanup) = FileManager::remove_if_exists(&job.output).await {
                warn!("Could not remove partial output {}: {}", job.output.display(), cleanup);
            }
            return Err(match e.downcast::<JoinError>() {
                Ok(JoinError::Encode(message)) => JoinError::Encode(message),
                Ok(other) => JoinError::Encode(other.to_string()),
                Err(other) => JoinError::Encode(other.to_string()),
            });
        }

        if !job.output.exists() {
            warn!("Encoder reported success but {} is missing", job.output.display());
        }

        let percent = aggregator.finish_job();
        self.emit_progress(index, total_jobs, percent, aggregator);
        info!("✅ Saved {}", job.output.display());
        Ok(())
    }

    fn apply(&self, event: EncoderEvent, index: usize, total_jobs: usize, aggregator: &mut ProgressAggregator) {
        match event {
            EncoderEvent::Progress(processed) => {
                let percent = aggregator.update(processed);
                self.emit_progress(index, total_jobs, percent, aggregator);
            }
            EncoderEvent::Log(line) => debug!(target: "ffmpeg", "{}", line),
        }
    }

    fn emit_progress(&self, job_index: usize, total_jobs: usize, percent: f64, aggregator: &ProgressAggregator) {
        self.emit(ExportEvent::Progress(ExportProgress {
            job_index,
            total_jobs,
            percent,
            processed: aggregator.processed(),
            total: aggregator.total(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityPreset;
    use crate::export::job::{ExportOptions, ExportPlan};
    use crate::item_list::ItemList;
    use crate::test_support::{item, FakeEncoder};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_test::{assert_err, assert_ok};

    fn options(batch_mode: bool) -> ExportOptions {
        ExportOptions {
            target_height: Some(720),
            quality_preset: QualityPreset::Fast,
            batch_mode,
        }
    }

    fn percents(rx: &mut UnboundedReceiver<ExportEvent>) -> Vec<f64> {
        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ExportEvent::Progress(progress) = event {
                percents.push(progress.percent);
            }
        }
        percents
    }

    #[tokio::test]
    async fn test_batch_export_progress() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        let list = ItemList::from_items(vec![item("A", 5), item("B", 3)]);

        let jobs = assert_ok!(ExportPlan::prepare(&list, &options(true), out).unwrap().approve(false).await);

        let encoder = FakeEncoder::new()
            .with_length("A_compressed.mp4", 5)
            .with_length("B_compressed.mp4", 3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = ExportCoordinator::new(encoder).with_events(tx);

        let report = coordinator.run_export(&jobs).await;

        assert!(report.is_success());
        assert_eq!(
            report.completed,
            vec![out.join("A_compressed.mp4"), out.join("B_compressed.mp4")]
        );
        assert_eq!(report.final_percent, 100.0);
        assert!(out.join("A_compressed.mp4").exists());

        let percents = percents(&mut rx);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
        assert!(percents.contains(&62.5));
        assert_eq!(percents.last(), Some(&100.0));

        // Strict list order, one job at a time
        assert_eq!(
            coordinator.encoder().outputs(),
            vec![out.join("A_compressed.mp4"), out.join("B_compressed.mp4")]
        );
    }

    #[tokio::test]
    async fn test_combine_export_single_invocation() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("A_combined.mp4");
        std::fs::write(&output, b"old").unwrap();

        let list = ItemList::from_items(vec![item("A", 2), item("B", 2)]);
        let jobs = ExportPlan::prepare(&list, &options(false), &output)
            .unwrap()
            .approve(true)
            .await
            .unwrap();

        let coordinator = ExportCoordinator::new(FakeEncoder::new().with_length("A_combined.mp4", 4));
        let report = coordinator.run_export(&jobs).await;

        assert!(report.is_success());
        assert_eq!(std::fs::read(&output).unwrap(), b"encoded");

        let invocations = coordinator.encoder().invocations.lock().unwrap().clone();
        assert_eq!(invocations.len(), 1);
        let inputs: Vec<&String> = invocations[0]
            .args
            .iter()
            .zip(invocations[0].args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-i")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(inputs, vec!["/videos/A.mp4", "/videos/B.mp4"]);
        assert!(invocations[0].args.contains(&"-map_metadata".to_string()));
    }

    #[tokio::test]
    async fn test_encode_error_aborts_remaining_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        let list = ItemList::from_items(vec![item("A", 1), item("B", 1), item("C", 1)]);
        let jobs = build_batch(&list, out).await;

        let encoder = FakeEncoder::new()
            .with_length("A_compressed.mp4", 1)
            .failing_on("B_compressed.mp4");
        let coordinator = ExportCoordinator::new(encoder);

        let report = coordinator.run_export(&jobs).await;

        assert!(!report.is_success());
        assert_eq!(report.completed, vec![out.join("A_compressed.mp4")]);
        assert_eq!(report.not_attempted, vec![out.join("C_compressed.mp4")]);
        let failure = report.failed.as_ref().unwrap();
        assert_eq!(failure.output, out.join("B_compressed.mp4"));
        assert!(matches!(&failure.error, JoinError::Encode(message) if message.contains("Conversion failed")));

        // Completed outputs are kept, nothing after the failure was run
        assert!(out.join("A_compressed.mp4").exists());
        assert_eq!(coordinator.encoder().outputs().len(), 2);

        let err = assert_err!(report.into_result());
        assert!(matches!(err, JoinError::Encode(_)));
    }

    #[tokio::test]
    async fn test_failed_job_leaves_no_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        let list = ItemList::from_items(vec![item("A", 1), item("B", 2)]);
        let jobs = build_batch(&list, out).await;

        let encoder = FakeEncoder::new()
            .with_length("A_compressed.mp4", 1)
            .failing_on("B_compressed.mp4");
        let report = ExportCoordinator::new(encoder).run_export(&jobs).await;

        assert!(report.failed.is_some());
        assert!(out.join("A_compressed.mp4").exists());
        assert!(!out.join("B_compressed.mp4").exists());
    }

    #[tokio::test]
    async fn test_cancel_between_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        let list = ItemList::from_items(vec![item("A", 1), item("B", 1)]);
        let jobs = build_batch(&list, out).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = ExportCoordinator::new(FakeEncoder::new()).with_cancellation(cancel);

        let report = coordinator.run_export(&jobs).await;

        assert!(report.cancelled);
        assert!(report.completed.is_empty());
        assert_eq!(report.not_attempted.len(), 2);
        assert!(coordinator.encoder().outputs().is_empty());
        assert!(matches!(report.into_result(), Err(JoinError::Cancelled)));
    }

    #[tokio::test]
    async fn test_zero_length_inputs_report_zero_percent() {
        let temp_dir = TempDir::new().unwrap();
        let list = ItemList::from_items(vec![item("A", 0)]);
        let jobs = build_batch(&list, temp_dir.path()).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = ExportCoordinator::new(FakeEncoder::new()).with_events(tx);
        let report = coordinator.run_export(&jobs).await;

        assert!(report.is_success());
        assert_eq!(report.final_percent, 0.0);
        assert!(percents(&mut rx).iter().all(|p| *p == 0.0));
    }

    #[tokio::test]
    async fn test_run_job_deletes_stale_output() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();
        let list = ItemList::from_items(vec![item("A", 1)]);
        let jobs = build_batch(&list, out).await;

        // Appears after planning, e.g. written by another program
        std::fs::write(out.join("A_compressed.mp4"), b"stale").unwrap();

        let coordinator = ExportCoordinator::new(FakeEncoder::new().failing_on("A_compressed.mp4"));
        let mut aggregator = ProgressAggregator::new(jobs[0].duration());
        let result = coordinator.run_job(&jobs[0], 0, 1, &mut aggregator).await;

        assert!(matches!(result, Err(JoinError::Encode(_))));
        assert!(!out.join("A_compressed.mp4").exists());
    }

    async fn build_batch(list: &ItemList, out: &std::path::Path) -> Vec<ExportJob> {
        ExportPlan::prepare(list, &options(true), out)
            .unwrap()
            .approve(false)
            .await
            .unwrap()
    }
}
