mod command;
mod sim;

pub use command::{CommandService, CommandTemplates};
pub use sim::SimulatedService;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ServiceError;

/// Target formats a document handle can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The primary `.idml` interchange artifact.
    Interchange,
    /// The secondary `_preview.pdf` artifact.
    Preview,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Interchange => f.write_str("interchange"),
            ExportFormat::Preview => f.write_str("preview"),
        }
    }
}

/// Resolution state of one external reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Current,
    /// The asset exists but is newer than the placed copy.
    Stale,
    /// The asset cannot be found at its recorded path.
    Missing,
}

/// An external asset (image, font, ...) the document depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub path: PathBuf,
    pub state: LinkState,
}

/// An open document inside the conversion service.
///
/// Handles are single-use: the pipeline opens one per source file, drives
/// it through link resolution and exports, and closes it exactly once.
pub trait DocumentHandle {
    /// Snapshot of the document's external references.
    fn links(&self) -> Vec<Link>;

    /// Re-resolves the reference at `path` against its asset.
    fn refresh_link(&mut self, path: &Path) -> Result<(), ServiceError>;

    /// Renders the document to `output` in the given format, replacing any
    /// existing file at that path.
    fn export(&mut self, format: ExportFormat, output: &Path) -> Result<(), ServiceError>;

    /// Releases the document. With `discard_changes` the source stays
    /// untouched even when references were refreshed.
    fn close(self: Box<Self>, discard_changes: bool);
}

/// Seam to the external application that owns the document model.
///
/// The batch machinery never inspects sources itself; everything
/// document-shaped goes through this trait, so tests and embedders can
/// substitute their own client.
pub trait ConversionService: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, ServiceError>;

    /// Short backend name used in banners and diagnostics.
    fn name(&self) -> &str;
}
