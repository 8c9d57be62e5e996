mod loader;

pub use loader::{default_config_path, default_log_path, load_file_config, validate_file_config};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::runlog::LogLevel;
use crate::service::CommandTemplates;

/// How sources are selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Convert exactly one file.
    Single { file: PathBuf },
    /// Walk a root folder recursively and convert every match.
    Recursive { root: PathBuf },
}

impl RunMode {
    pub fn describe(&self) -> String {
        match self {
            RunMode::Single { file } => format!("single ({})", file.display()),
            RunMode::Recursive { root } => format!("recursive ({})", root.display()),
        }
    }
}

/// Which conversion service backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sim,
    Command,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sim => f.write_str("sim"),
            Backend::Command => f.write_str("command"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sim" => Ok(Backend::Sim),
            "command" => Ok(Backend::Command),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Options for one batch run.
///
/// Built once from operator input (CLI flags merged over the config file),
/// immutable afterwards, and passed by reference to every component.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub export_preview: bool,
    pub update_links: bool,
    pub source_pattern: String,
    pub log_file: PathBuf,
    pub log_level: LogLevel,
}

/// On-disk configuration, merged beneath CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub export_preview: bool,

    #[serde(default = "default_true")]
    pub update_links: bool,

    #[serde(default = "default_source_pattern")]
    pub source_pattern: String,

    /// Run log path; None falls back to the platform data directory.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Converter argv templates, used when `backend` is `command`.
    #[serde(default)]
    pub command: CommandTemplates,
}

fn default_true() -> bool {
    true
}

fn default_source_pattern() -> String {
    "*.indd".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_backend() -> Backend {
    Backend::Sim
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            export_preview: false,
            update_links: true,
            source_pattern: default_source_pattern(),
            log_file: None,
            log_level: default_log_level(),
            backend: default_backend(),
            command: CommandTemplates::default(),
        }
    }
}
