use std::path::{Path, PathBuf};

/// A matched source document queued for conversion.
///
/// Artifacts derive their paths from the source: they land in the same
/// directory, and a re-run overwrites them in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Primary artifact path: the source extension replaced with `.idml`.
    pub fn idml_path(&self) -> PathBuf {
        self.path.with_extension("idml")
    }

    /// Preview artifact path: `<stem>_preview.pdf` beside the source.
    pub fn preview_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}_preview.pdf", stem))
    }
}
