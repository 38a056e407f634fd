//! # Clip Joiner - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione persistita e override da CLI
//! - Caricamento/salvataggio della lista tra un comando e l'altro
//! - Avvio dell'export con progress bar e conferma di sovrascrittura
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (sottocomando, --verbose, --json, --queue)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica `~/.clip-joiner/config.json` e la lista della directory corrente
//! 4. Esegue il sottocomando e salva la lista se è cambiata
//!
//! ## Esempio di utilizzo:
//! ```bash
//! clip-joiner add intro.mp4 ./clips
//! clip-joiner move 3 1
//! clip-joiner export --height 720 --preset slow --output final.mp4
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{console::Term, Confirm};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clip_joiner::{
    export::{resolve_destination, ProgressTracker},
    file_manager::FileManager,
    json_output::JsonMessage,
    platform::PlatformCommands,
    progress::ProgressManager,
    Config, EnqueueOutcome, ExportCoordinator, ExportOptions, ExportPlan, FfmpegEncoder, FfprobeProbe, ItemList,
    JoinError, QualityPreset, QueueStore,
};

#[derive(Parser)]
#[command(name = "clip-joiner")]
#[command(about = "Join, reorder and re-encode video clips with ffmpeg")]
struct Args {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit one JSON object per line instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Queue file to use instead of the one for the current directory
    #[arg(long, global = true)]
    queue: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add video files or directories to the end of the list
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Remove items by position (1-based)
    Remove {
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Move the item at FROM to position TO (1-based)
    Move { from: usize, to: usize },

    /// Show the list and its total duration
    List,

    /// Empty the list
    Clear,

    /// Encode the list into one file, or each item on its own with --batch
    Export(ExportArgs),

    /// Show or persist the default export settings
    Settings(SettingsArgs),

    /// Report where ffmpeg and ffprobe were found
    Tools,
}

#[derive(clap::Args)]
struct OutputSettings {
    /// Output height in pixels, aspect ratio preserved
    #[arg(long, conflicts_with = "keep_size")]
    height: Option<u32>,

    /// Keep the source frame size
    #[arg(long)]
    keep_size: bool,

    /// x264 preset
    #[arg(long, value_enum)]
    preset: Option<QualityPreset>,
}

impl OutputSettings {
    fn apply(&self, config: &mut Config) {
        if self.keep_size {
            config.target_height = None;
        } else if let Some(height) = self.height {
            config.target_height = Some(height);
        }
        if let Some(preset) = self.preset {
            config.quality_preset = preset;
        }
    }
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Encode every item to its own `<name>_compressed.mp4`
    #[arg(long)]
    batch: bool,

    #[command(flatten)]
    settings: OutputSettings,

    /// Output file (or directory for the default name); a directory with --batch
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing output files without asking
    #[arg(short, long)]
    yes: bool,
}

#[derive(clap::Args)]
struct SettingsArgs {
    /// Start from the built-in defaults instead of the saved settings
    #[arg(long)]
    reset: bool,

    #[command(flatten)]
    settings: OutputSettings,

    /// Write the settings to the config file
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for --json
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = Config::default_path()?;
    let config = Config::from_file(&config_path).await?;
    let json_output = args.json || config.json_output;

    let result = run(args, config, &config_path, json_output).await;

    if let Err(ref e) = result {
        if json_output {
            let details = e.chain().nth(1).map(|cause| cause.to_string());
            JsonMessage::error(e.to_string(), details).emit();
        }
    }

    result
}

async fn run(args: Args, config: Config, config_path: &Path, json_output: bool) -> Result<()> {
    let store = match args.queue {
        Some(path) => QueueStore::at(path),
        None => QueueStore::for_directory(&std::env::current_dir()?).await?,
    };

    match args.command {
        Command::Add { paths } => add(&store, &config, &paths, json_output).await,
        Command::Remove { positions } => remove(&store, &positions, json_output).await,
        Command::Move { from, to } => move_item(&store, from, to, json_output).await,
        Command::List => list(&store, json_output).await,
        Command::Clear => {
            let mut list = store.load().await?;
            list.clear();
            store.save(&list).await?;
            print_list(&list, json_output);
            Ok(())
        }
        Command::Export(export_args) => export(&store, config, export_args, json_output).await,
        Command::Settings(settings_args) => settings(config, settings_args, config_path, json_output).await,
        Command::Tools => {
            let platform = PlatformCommands::new(config.ffmpeg_dir.clone());
            println!("{}", PlatformCommands::system_info());
            println!("{}", platform.get_tools_report());
            Ok(())
        }
    }
}

async fn add(store: &QueueStore, config: &Config, paths: &[PathBuf], json_output: bool) -> Result<()> {
    let platform = PlatformCommands::new(config.ffmpeg_dir.clone());
    platform.check_dependencies().await?;

    let paths: Vec<PathBuf> = paths
        .iter()
        .map(|path| path.canonicalize().unwrap_or_else(|_| path.clone()))
        .collect();
    let files = FileManager::expand_inputs(&paths)?;

    let probe = FfprobeProbe::new(platform);
    let mut list = store.load().await?;
    let mut notes = Vec::new();
    let mut added = 0;

    let spinner = (!json_output).then(|| ProgressManager::spinner("Probing files..."));

    for file in &files {
        if let Some(ref spinner) = spinner {
            spinner.set_message(format!("Probing {}", file.display()));
        }

        match list.enqueue(&probe, file).await {
            Ok(outcome) => {
                if outcome.is_added() {
                    added += 1;
                }
                match outcome {
                    EnqueueOutcome::Added => {}
                    EnqueueOutcome::AddedMultipleStreams { count } => notes.push(format!(
                        "⚠️  {} has {} video streams, only the first will be used",
                        file.display(),
                        count
                    )),
                    EnqueueOutcome::SkippedNoVideoStream => {
                        notes.push(format!("⚠️  No video stream in {}, skipped", file.display()))
                    }
                    EnqueueOutcome::SkippedDuplicate => {
                        notes.push(format!("ℹ️  Already in the list: {}", file.display()))
                    }
                }
            }
            // One unreadable file does not stop the rest
            Err(e) => {
                warn!("{}", e);
                notes.push(format!("❌ {}", e));
            }
        }
    }

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    store.save(&list).await?;
    info!("Added {} of {} file(s)", added, files.len());

    if !json_output {
        for note in &notes {
            eprintln!("{}", note);
        }
    }
    print_list(&list, json_output);
    Ok(())
}

/// Convert a 1-based position into an index of `list`
fn position_to_index(list: &ItemList, position: usize) -> Result<usize, JoinError> {
    if position == 0 || position > list.len() {
        return Err(JoinError::Validation(format!(
            "Position {} is out of range (list has {} item(s))",
            position,
            list.len()
        )));
    }
    Ok(position - 1)
}

async fn remove(store: &QueueStore, positions: &[usize], json_output: bool) -> Result<()> {
    let mut list = store.load().await?;

    let mut selection = Vec::with_capacity(positions.len());
    for &position in positions {
        let index = position_to_index(&list, position)?;
        if let Some(item) = list.get(index) {
            selection.push(item.path.clone());
        }
    }

    let removed = list.remove(&selection)?;
    store.save(&list).await?;
    info!("Removed {} item(s)", removed);

    print_list(&list, json_output);
    Ok(())
}

async fn move_item(store: &QueueStore, from: usize, to: usize, json_output: bool) -> Result<()> {
    let mut list = store.load().await?;
    let source = position_to_index(&list, from)?;
    let target = position_to_index(&list, to)?;

    if list.move_by_index(source, target) {
        store.save(&list).await?;
    }

    print_list(&list, json_output);
    Ok(())
}

async fn list(store: &QueueStore, json_output: bool) -> Result<()> {
    let mut list = store.load().await?;

    let missing = QueueStore::cleanup(&mut list);
    if !missing.is_empty() {
        for path in &missing {
            warn!("File no longer exists, removed from the list: {}", path.display());
        }
        store.save(&list).await?;
    }

    print_list(&list, json_output);
    Ok(())
}

fn print_list(list: &ItemList, json_output: bool) {
    if json_output {
        JsonMessage::queue(list).emit();
        return;
    }

    if list.is_empty() {
        println!("The list is empty");
        return;
    }

    for (index, item) in list.items().iter().enumerate() {
        println!(
            "{:>3}. {}  {}",
            index + 1,
            FileManager::format_duration(item.duration),
            item.display_name
        );
    }
    println!(
        "     {}  total ({} item(s))",
        FileManager::format_duration(list.total_duration()),
        list.len()
    );
}

async fn export(store: &QueueStore, mut config: Config, args: ExportArgs, json_output: bool) -> Result<()> {
    args.settings.apply(&mut config);
    config.validate()?;

    let mut list = store.load().await?;
    let missing = QueueStore::cleanup(&mut list);
    if !missing.is_empty() {
        for path in &missing {
            warn!("File no longer exists, removed from the list: {}", path.display());
        }
        store.save(&list).await?;
    }

    let options = ExportOptions::from_config(&config, args.batch);
    let destination = resolve_destination(&list, &options, args.output.as_deref())?;
    let plan = ExportPlan::prepare(&list, &options, &destination)?;

    let platform = PlatformCommands::new(config.ffmpeg_dir.clone());
    platform.check_dependencies().await?;

    let overwrite = if plan.needs_confirmation() {
        args.yes || confirm_overwrite(&plan.collisions, json_output)?
    } else {
        false
    };

    let total_duration = plan.total_duration();
    let jobs = plan.approve(overwrite).await?;

    if json_output {
        JsonMessage::Start {
            total_jobs: jobs.len(),
            total_duration_secs: total_duration.as_secs_f64(),
            batch_mode: options.batch_mode,
            outputs: jobs.iter().map(|job| job.output.clone()).collect(),
        }
        .emit();
    } else {
        eprintln!(
            "🎬 Exporting {} job(s), {} of video",
            jobs.len(),
            FileManager::format_duration(total_duration)
        );
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let tracker = ProgressTracker::new(json_output);
    let tracker_task = tokio::spawn(tracker.run(rx));

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current job");
                cancel.cancel();
            }
        })
    };

    let coordinator = ExportCoordinator::new(FfmpegEncoder::new(platform))
        .with_events(tx)
        .with_cancellation(cancel);
    let report = coordinator.run_export(&jobs).await;

    // Dropping the coordinator closes the event channel
    drop(coordinator);
    ctrl_c.abort();
    let tracker = tracker_task.await?;

    if json_output {
        JsonMessage::Complete {
            completed: report.completed.clone(),
            not_attempted: report.not_attempted.clone(),
            failed: report.failed.as_ref().map(|failure| failure.output.clone()),
            cancelled: report.cancelled,
            duration_seconds: report.elapsed_secs,
        }
        .emit();
    } else {
        tracker.finish(&report.format_summary());
    }

    report.into_result()?;
    Ok(())
}

/// Ask before replacing existing outputs; anything but an interactive "yes" declines
fn confirm_overwrite(collisions: &[PathBuf], json_output: bool) -> Result<bool> {
    let term = Term::stderr();
    if json_output || !term.is_term() {
        return Ok(false);
    }

    eprintln!("The following file(s) already exist:");
    for path in collisions {
        eprintln!("  {}", path.display());
    }

    let confirmed = Confirm::new()
        .with_prompt("Do you want to overwrite them?")
        .default(false)
        .interact_on(&term)?;
    Ok(confirmed)
}

async fn settings(mut config: Config, args: SettingsArgs, config_path: &Path, json_output: bool) -> Result<()> {
    if args.reset {
        config = Config::default();
    }
    args.settings.apply(&mut config);
    config.validate()?;

    if args.save {
        config.save_to_file(config_path).await?;
        info!("Settings saved to {}", config_path.display());
    }

    if json_output {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        let height = config
            .target_height
            .map(|height| format!("{}p", height))
            .unwrap_or_else(|| "source".to_string());
        println!("Target height:  {}", height);
        println!("Quality preset: {}", config.quality_preset);
    }
    Ok(())
}
