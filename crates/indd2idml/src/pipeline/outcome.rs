use std::fmt;
use std::path::{Path, PathBuf};

/// Non-fatal finding attached to an otherwise successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionWarning {
    /// A reference whose asset could not be found; the document converts
    /// with the placed copy it already has.
    MissingLink { path: PathBuf },

    /// A stale reference that could not be refreshed.
    LinkRefreshFailed { path: PathBuf, reason: String },

    /// The preview artifact was not produced; the primary artifact is
    /// unaffected.
    PreviewExportFailed { reason: String },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::MissingLink { path } => {
                write!(f, "missing link '{}'", path.display())
            }
            ConversionWarning::LinkRefreshFailed { path, reason } => {
                write!(f, "could not refresh link '{}': {}", path.display(), reason)
            }
            ConversionWarning::PreviewExportFailed { reason } => {
                write!(f, "preview not exported: {}", reason)
            }
        }
    }
}

/// Per-file outcome of one pipeline run. Every attempted source yields
/// exactly one of these; nothing is silently dropped.
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Converted {
        artifact: PathBuf,
    },
    ConvertedWithWarnings {
        artifact: PathBuf,
        warnings: Vec<ConversionWarning>,
    },
    Failed {
        reason: String,
    },
}

impl ConversionResult {
    pub(crate) fn success(artifact: PathBuf, warnings: Vec<ConversionWarning>) -> Self {
        if warnings.is_empty() {
            ConversionResult::Converted { artifact }
        } else {
            ConversionResult::ConvertedWithWarnings { artifact, warnings }
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ConversionResult::Failed { .. })
    }

    pub fn artifact(&self) -> Option<&Path> {
        match self {
            ConversionResult::Converted { artifact }
            | ConversionResult::ConvertedWithWarnings { artifact, .. } => Some(artifact),
            ConversionResult::Failed { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[ConversionWarning] {
        match self {
            ConversionResult::ConvertedWithWarnings { warnings, .. } => warnings,
            _ => &[],
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ConversionResult::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}
