use std::path::PathBuf;
use thiserror::Error;

use crate::service::ExportFormat;

#[derive(Error, Debug)]
pub enum Indd2IdmlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run log error: {0}")]
    Log(#[from] LogError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Conversion service error: {0}")]
    Service(#[from] ServiceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Setup failures around the run log. Everything else in a run is logged;
/// these are the one class of error that cannot be, so they surface to the
/// operator directly.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to create log directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file '{path}': {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to flush log file '{path}': {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan root '{0}' is not a directory")]
    RootNotADirectory(PathBuf),

    #[error("Invalid source pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Errors reported by a document conversion service backend. Reasons are
/// opaque strings because the real converter is an external application
/// whose diagnostics arrive as text.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to open document '{path}': {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Failed to refresh link '{path}': {reason}")]
    Refresh { path: PathBuf, reason: String },

    #[error("Failed to export {format} artifact to '{path}': {reason}")]
    Export {
        format: ExportFormat,
        path: PathBuf,
        reason: String,
    },

    #[error("Converter command '{program}' failed to run: {reason}")]
    Subprocess { program: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Indd2IdmlError>;
