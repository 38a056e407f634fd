//! # Export Job Module
//!
//! Costruisce i job di export a partire dalla lista ordinata.
//!
//! - Modalità combine: un solo job con tutta la lista
//! - Modalità batch: un job per clip, `<stem>_compressed.mp4` nella directory scelta
//! - Calcolo dei file di output già esistenti e loro cancellazione previa conferma
//! - Ogni job scrive un file distinto, mai sopra uno degli input

use crate::{
    config::{Config, QualityPreset},
    error::JoinError,
    file_manager::FileManager,
    item_list::{ItemList, MediaItem},
};
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Container extension of every output
pub const OUTPUT_EXTENSION: &str = "mp4";

/// User-chosen output options for one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub target_height: Option<u32>,
    pub quality_preset: QualityPreset,
    pub batch_mode: bool,
}

impl ExportOptions {
    pub fn from_config(config: &Config, batch_mode: bool) -> Self {
        Self {
            target_height: config.target_height.filter(|height| *height > 0),
            quality_preset: config.quality_preset,
            batch_mode,
        }
    }
}

/// One encoder run: its inputs in order and where the result goes
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub items: Vec<MediaItem>,
    pub options: ExportOptions,
    pub output: PathBuf,
}

impl ExportJob {
    /// Sum of the input durations
    pub fn duration(&self) -> Duration {
        self.items.iter().map(|item| item.duration).sum()
    }

    /// Source metadata is carried over only when merging the whole list
    pub fn preserves_metadata(&self) -> bool {
        !self.options.batch_mode
    }
}

/// Default output file name for an item stem.
///
/// Batch exports and single-item lists produce `<stem>_compressed.mp4`,
/// combining two or more items produces `<stem>_combined.mp4`.
pub fn save_name(stem: &str, batch_mode: bool, list_len: usize) -> String {
    if stem.is_empty() {
        return format!("compressed.{}", OUTPUT_EXTENSION);
    }

    if batch_mode || list_len == 1 {
        format!("{}_compressed.{}", stem, OUTPUT_EXTENSION)
    } else {
        format!("{}_combined.{}", stem, OUTPUT_EXTENSION)
    }
}

/// Where a batch export writes `item`
pub fn batch_output_path(output_dir: &Path, item: &MediaItem) -> PathBuf {
    output_dir.join(save_name(&item.stem(), true, 1))
}

/// Resolve the user's `--output` into the destination `build_jobs` expects:
/// a file for combine mode, a directory for batch mode.
///
/// In combine mode a missing value or an existing directory gets the default
/// name derived from the first item.
pub fn resolve_destination(list: &ItemList, options: &ExportOptions, output: Option<&Path>) -> Result<PathBuf> {
    let first = list.get(0).ok_or(JoinError::NothingToExport)?;
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    if options.batch_mode {
        if output.exists() && !output.is_dir() {
            return Err(JoinError::Validation(format!(
                "Batch output must be a directory: {}",
                output.display()
            ))
            .into());
        }
        return Ok(output);
    }

    if output.is_dir() {
        Ok(output.join(save_name(&first.stem(), false, list.len())))
    } else {
        Ok(output)
    }
}

/// Build the jobs for `list`; `destination` is the output file in combine
/// mode and the output directory in batch mode
pub fn build_jobs(list: &ItemList, options: &ExportOptions, destination: &Path) -> Result<Vec<ExportJob>, JoinError> {
    if list.is_empty() {
        return Err(JoinError::NothingToExport);
    }

    if options.batch_mode {
        Ok(list
            .items()
            .iter()
            .map(|item| ExportJob {
                items: vec![item.clone()],
                options: options.clone(),
                output: batch_output_path(destination, item),
            })
            .collect())
    } else {
        Ok(vec![ExportJob {
            items: list.items().to_vec(),
            options: options.clone(),
            output: destination.to_path_buf(),
        }])
    }
}

/// Jobs ready to run, plus the planned outputs that already exist on disk
#[derive(Debug)]
pub struct ExportPlan {
    pub jobs: Vec<ExportJob>,
    pub collisions: Vec<PathBuf>,
}

impl ExportPlan {
    /// Validate, build the jobs and look for outputs that would be overwritten
    pub fn prepare(list: &ItemList, options: &ExportOptions, destination: &Path) -> Result<Self, JoinError> {
        let jobs = build_jobs(list, options, destination)?;
        check_outputs(list, &jobs)?;

        let planned: Vec<PathBuf> = jobs.iter().map(|job| job.output.clone()).collect();
        let collisions = FileManager::existing_files(&planned);

        Ok(Self { jobs, collisions })
    }

    pub fn needs_confirmation(&self) -> bool {
        !self.collisions.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.jobs.iter().map(ExportJob::duration).sum()
    }

    /// Apply the user's answer to the overwrite question. On approval every
    /// colliding file is deleted before any job runs; a refusal leaves the
    /// file system untouched.
    pub async fn approve(self, overwrite: bool) -> Result<Vec<ExportJob>> {
        if self.collisions.is_empty() {
            return Ok(self.jobs);
        }

        if !overwrite {
            return Err(JoinError::OverwriteDeclined(self.collisions).into());
        }

        for existing in &self.collisions {
            FileManager::remove_if_exists(existing).await?;
        }
        info!("Deleted {} existing output file(s)", self.collisions.len());

        Ok(self.jobs)
    }
}

/// Every job must write its own file, and no job may write over an input
fn check_outputs(list: &ItemList, jobs: &[ExportJob]) -> Result<(), JoinError> {
    let inputs: HashSet<PathBuf> = list.items().iter().map(|item| comparable_path(&item.path)).collect();
    let mut outputs = HashSet::with_capacity(jobs.len());

    for job in jobs {
        let output = comparable_path(&job.output);
        if inputs.contains(&output) {
            return Err(JoinError::Validation(format!(
                "Output would overwrite an input file: {}",
                job.output.display()
            )));
        }
        if !outputs.insert(output) {
            return Err(JoinError::Validation(format!(
                "Two inputs would be exported to the same file: {}",
                job.output.display()
            )));
        }
    }

    Ok(())
}

/// Canonical form of `path`; outputs usually do not exist yet, so their
/// parent directory is resolved instead
fn comparable_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}
