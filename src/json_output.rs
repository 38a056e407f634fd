//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con
//! altri processi (GUI front-end, script).
//!
//! ## Responsabilità:
//! - Emette messaggi JSON strutturati, uno per riga, su stdout
//! - Traduce gli `ExportEvent` del coordinatore
//! - Fornisce interfaccia standardizzata per comunicazione inter-processo
//!
//! ## Tipi di messaggi:
//! - `queue`: Contenuto corrente della lista
//! - `start`: Inizio export
//! - `job_start`: Inizio di un job
//! - `progress`: Progresso aggregato
//! - `job_complete`: Fine di un job
//! - `job_failed`: Job fallito
//! - `complete`: Fine export con riepilogo
//! - `error`: Errore generale

use crate::export::progress_tracker::ExportEvent;
use crate::item_list::ItemList;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Queue {
        items: Vec<JsonItem>,
        total_duration_secs: f64,
    },

    Start {
        total_jobs: usize,
        total_duration_secs: f64,
        batch_mode: bool,
        outputs: Vec<PathBuf>,
    },

    JobStart {
        index: usize,
        total: usize,
        output: PathBuf,
        duration_secs: f64,
    },

    Progress {
        job_index: usize,
        total_jobs: usize,
        percentage: f64,
        processed_secs: f64,
        total_secs: f64,
    },

    JobComplete {
        index: usize,
        output: PathBuf,
    },

    JobFailed {
        index: usize,
        output: PathBuf,
        message: String,
    },

    Complete {
        completed: Vec<PathBuf>,
        not_attempted: Vec<PathBuf>,
        failed: Option<PathBuf>,
        cancelled: bool,
        duration_seconds: f64,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

/// List entry as exposed to other processes
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonItem {
    pub position: usize,
    pub path: PathBuf,
    pub name: String,
    pub duration_secs: f64,
    pub video_streams: usize,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn queue(list: &ItemList) -> Self {
        Self::Queue {
            items: list
                .items()
                .iter()
                .enumerate()
                .map(|(index, item)| JsonItem {
                    position: index + 1,
                    path: item.path.clone(),
                    name: item.display_name.clone(),
                    duration_secs: item.duration.as_secs_f64(),
                    video_streams: item.video_stream_count,
                })
                .collect(),
            total_duration_secs: list.total_duration().as_secs_f64(),
        }
    }

    pub fn from_event(event: &ExportEvent) -> Self {
        match event {
            ExportEvent::JobStarted {
                index,
                total_jobs,
                output,
                duration,
            } => Self::JobStart {
                index: *index,
                total: *total_jobs,
                output: output.clone(),
                duration_secs: duration.as_secs_f64(),
            },
            ExportEvent::Progress(progress) => Self::Progress {
                job_index: progress.job_index,
                total_jobs: progress.total_jobs,
                percentage: progress.percent,
                processed_secs: progress.processed.as_secs_f64(),
                total_secs: progress.total.as_secs_f64(),
            },
            ExportEvent::JobFinished { index, output } => Self::JobComplete {
                index: *index,
                output: output.clone(),
            },
            ExportEvent::JobFailed { index, output, message } => Self::JobFailed {
                index: *index,
                output: output.clone(),
                message: message.clone(),
            },
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
