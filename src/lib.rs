//! # Clip Joiner Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per le diverse operazioni
//! - `item_list`: Lista ordinata dei video (enqueue, remove, move, clear)
//! - `probe`: Lettura di durata e stream video con ffprobe
//! - `encoder`: Esecuzione di ffmpeg e parsing del progresso
//! - `export`: Costruzione ed esecuzione sequenziale dei job di export
//! - `state`: Persistenza della lista tra un'invocazione e l'altra
//! - `file_manager`: Operazioni sui file e discovery dei video
//! - `platform` / `tool_resolver`: Ricerca di ffmpeg e ffprobe
//! - `progress` / `json_output`: Feedback visuale e output strutturato
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use clip_joiner::{ExportCoordinator, ExportOptions, ExportPlan, FfmpegEncoder, ItemList};
//!
//! let jobs = ExportPlan::prepare(&list, &options, &destination)?.approve(false).await?;
//! let report = ExportCoordinator::new(FfmpegEncoder::new(platform)).run_export(&jobs).await;
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod export;
pub mod file_manager;
pub mod item_list;
pub mod json_output;
pub mod platform;
pub mod probe;
pub mod progress;
pub mod state;
pub mod tool_resolver;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::{Config, QualityPreset};
pub use encoder::{Encoder, EncoderEvent, EncoderInvocation, FfmpegEncoder};
pub use error::JoinError;
pub use export::{ExportCoordinator, ExportJob, ExportOptions, ExportPlan, ExportReport};
pub use item_list::{EnqueueOutcome, ItemList, MediaItem};
pub use probe::{FfprobeProbe, MediaProbe, ProbeInfo};
pub use state::QueueStore;
