//! # Export Module
//!
//! Modulo che separa le responsabilità dell'export in sottomoduli:
//! - `job`: Costruzione dei job, naming degli output, conferma sovrascrittura
//! - `command`: Argomenti ffmpeg per un job
//! - `coordinator`: Esecuzione sequenziale dei job
//! - `progress_tracker`: Aggregazione e rendering del progresso

pub mod command;
pub mod coordinator;
pub mod job;
pub mod progress_tracker;

pub use coordinator::{ExportCoordinator, ExportReport, JobFailure};
pub use job::{build_jobs, resolve_destination, save_name, ExportJob, ExportOptions, ExportPlan};
pub use progress_tracker::{ExportEvent, ExportProgress, ProgressAggregator, ProgressTracker};
