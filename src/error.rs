//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `JoinError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Probe`: File di input illeggibile o non riconosciuto da ffprobe
//! - `NoSelection`: Azione utente senza un target valido
//! - `NothingToExport`: Export richiesto su una lista vuota
//! - `OverwriteDeclined`: L'utente ha rifiutato la sovrascrittura dei file esistenti
//! - `Encode`: Fallimento del processo ffmpeg
//! - `MissingDependency`: Tool esterno mancante (ffmpeg, ffprobe)
//! - `Validation`: Errori di validazione input
//! - `State`: Errori di gestione file di stato della coda
//! - `Cancelled`: Export interrotto tra un job e l'altro
//!
//! I warning (stream video assente, stream multipli, duplicati) non sono
//! errori: vedi `item_list::EnqueueOutcome`.
//!
//! ## Esempio:
//! ```rust,ignore
//! if list.is_empty() {
//!     return Err(JoinError::NothingToExport.into());
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for clip joining
#[derive(thiserror::Error, Debug)]
pub enum JoinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not load file {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("Select items first")]
    NoSelection,

    #[error("No videos selected")]
    NothingToExport,

    #[error("Overwrite of {} existing file(s) declined", .0.len())]
    OverwriteDeclined(Vec<PathBuf>),

    #[error("FFmpeg error: {0}")]
    Encode(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Queue state error: {0}")]
    State(String),

    #[error("Export cancelled")]
    Cancelled,
}

impl JoinError {
    pub fn probe(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
