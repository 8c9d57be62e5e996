//! indd2idml command line front-end.
//!
//! Thin wrapper around the indd2idml library: parses flags, merges them
//! over an optional JSON config file, drives a batch run and maps the
//! outcome to an exit code.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a single document
//! indd2idml file Report.indd
//!
//! # Convert a whole folder tree, with PDF previews
//! indd2idml --preview scan ./documents
//!
//! # Narrow the match pattern and raise log verbosity
//! indd2idml --pattern "2024-*.indd" --log-level debug scan ./archive
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use indd2idml::{
    default_config_path, default_log_path, load_file_config, Backend, BatchRunner, CommandService,
    ConfigError, ConversionService, FileConfig, Indd2IdmlError, LogLevel, RunConfig, RunMode,
    RunSummary, SimulatedService,
};

/// Batch conversion of page-layout documents to the IDML interchange format
#[derive(Parser)]
#[command(name = "indd2idml")]
#[command(version)]
#[command(about = "Batch conversion of page-layout documents to IDML, with optional PDF previews")]
struct Cli {
    /// Also export a PDF preview next to each interchange artifact
    #[arg(long, global = true)]
    preview: bool,

    /// Skip refreshing stale linked assets before export
    #[arg(long, global = true)]
    no_update_links: bool,

    /// Glob matched against file names in scan mode (default: *.indd)
    #[arg(long, global = true)]
    pattern: Option<String>,

    /// Run log location (default: platform data directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Minimum severity recorded in the run log (debug, info, warning, error, critical)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Conversion backend (sim, command)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress the console summary; the run log is still written
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert exactly one document
    File {
        /// Source document path
        path: PathBuf,
    },

    /// Walk a folder recursively and convert every matching document
    Scan {
        /// Root folder to scan
        root: PathBuf,
    },
}

/// Console diagnostics go to stderr through `tracing-subscriber`; records
/// emitted via the `log` facade are forwarded by the `tracing-log` bridge.
/// `RUST_LOG` overrides the quiet-dependent default filter.
fn init_console_logging(quiet: bool) {
    let default_filter = if quiet { "error" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_log::LogTracer::init();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Loads the config file: an explicit `--config` path must exist, the
/// default platform location is optional.
fn load_layered_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_file_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_file_config(path),
        _ => Ok(FileConfig::default()),
    }
}

/// Flags win over the config file, which wins over built-in defaults.
/// The boolean flags are one-directional: `--preview` can only enable
/// previews and `--no-update-links` can only disable link refresh, so a
/// config file setting is never silently overridden by a flag the
/// operator did not pass.
fn merge_run_config(cli: &Cli, file: &FileConfig) -> RunConfig {
    let mode = match &cli.command {
        Command::File { path } => RunMode::Single { file: path.clone() },
        Command::Scan { root } => RunMode::Recursive { root: root.clone() },
    };

    RunConfig {
        mode,
        export_preview: cli.preview || file.export_preview,
        update_links: !cli.no_update_links && file.update_links,
        source_pattern: cli
            .pattern
            .clone()
            .unwrap_or_else(|| file.source_pattern.clone()),
        log_file: cli
            .log_file
            .clone()
            .or_else(|| file.log_file.clone())
            .unwrap_or_else(default_log_path),
        log_level: cli.log_level.unwrap_or(file.log_level),
    }
}

fn build_service(
    backend: Backend,
    file: &FileConfig,
) -> Result<Arc<dyn ConversionService>, ConfigError> {
    match backend {
        Backend::Sim => Ok(Arc::new(SimulatedService::new())),
        Backend::Command => {
            if file.command.interchange.is_empty() {
                return Err(ConfigError::Validation {
                    message: "backend 'command' requires a command.interchange argv template"
                        .to_string(),
                });
            }
            Ok(Arc::new(CommandService::new(file.command.clone())))
        }
    }
}

fn print_summary(summary: &RunSummary, log_file: &Path) {
    println!(
        "{} converted ({} with warnings), {} failed",
        summary.converted(),
        summary.with_warnings(),
        summary.failed()
    );
    for report in &summary.results {
        if let Some(reason) = report.result.failure_reason() {
            println!("  failed: {} ({})", report.source.display(), reason);
        }
    }
    println!("Run log: {}", log_file.display());
}

fn run(cli: &Cli) -> Result<RunSummary, Indd2IdmlError> {
    let file_config = load_layered_config(cli.config.as_deref())?;
    let backend = cli.backend.unwrap_or(file_config.backend);
    let service = build_service(backend, &file_config)?;
    let config = merge_run_config(cli, &file_config);
    let log_file = config.log_file.clone();

    info!("Starting indd2idml v{}", env!("CARGO_PKG_VERSION"));

    let summary = BatchRunner::new(config, service).run()?;

    if summary.dropped_log_entries > 0 {
        eprintln!(
            "indd2idml: {} log line(s) could not be written to {}",
            summary.dropped_log_entries,
            log_file.display()
        );
    }

    if !cli.quiet {
        print_summary(&summary, &log_file);
    }

    Ok(summary)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_console_logging(cli.quiet);

    match run(&cli) {
        Ok(summary) if summary.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            // Setup failures would leave no trace in the run log, so the
            // alert goes straight to the operator.
            eprintln!("indd2idml: {}", e);
            ExitCode::from(2)
        }
    }
}
