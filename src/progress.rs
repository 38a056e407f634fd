//! # Progress Bar Module
//!
//! Questo modulo gestisce il feedback visuale durante probe ed export.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif` in percentuale sull'intero export
//! - Tempo elapsed e ETA
//! - Messaggi di stato per il job corrente
//! - Spinner per operazioni indeterminate (probe dei file)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [██████████████████████>-----------------] 62% (eta 00:01:20) [2/3] B_compressed.mp4
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Resolution of the bar: hundredths of a percent
const BAR_UNITS: u64 = 10_000;

/// Manages progress reporting for an export
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new percentage bar
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_UNITS);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% (eta {eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A bar that draws nothing, for JSON mode
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Move the bar to `percent` (0-100)
    pub fn set_percent(&self, percent: f64) {
        let position = (percent.clamp(0.0, 100.0) / 100.0 * BAR_UNITS as f64).round() as u64;
        self.bar.set_position(position);
    }

    /// Set a custom message without moving the bar
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Print a line above the bar
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
