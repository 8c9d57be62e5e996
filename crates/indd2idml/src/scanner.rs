use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::runlog::RunLog;
use crate::source::SourceFile;

/// Recursive enumerator for source documents under a root folder.
///
/// Traversal is depth-first pre-order with files at each level yielded
/// before any subfolder is entered. Matching is by file name against a
/// case-insensitive glob, `*.indd` unless configured otherwise.
pub struct SourceScanner {
    root: PathBuf,
    pattern: Pattern,
}

impl SourceScanner {
    pub fn new<P: AsRef<Path>>(root: P, pattern: &str) -> Result<Self, ScanError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ScanError::RootNotADirectory(root));
        }

        let pattern = Pattern::new(pattern).map_err(|e| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;

        Ok(Self { root, pattern })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily enumerates matching files. Each call performs one fresh
    /// traversal; the returned iterator is single-pass.
    ///
    /// A subfolder that cannot be read is logged as a WARNING and skipped;
    /// its siblings are still traversed.
    pub fn files<'a>(&'a self, log: &'a RunLog) -> impl Iterator<Item = SourceFile> + 'a {
        let match_opts = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by(|a, b| {
                // Files before directories, then by name, so every level is
                // fully listed before the walk descends.
                let a_dir = a.file_type().is_dir();
                let b_dir = b.file_type().is_dir();
                a_dir.cmp(&b_dir).then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        return None;
                    }

                    let name = entry.file_name().to_string_lossy();
                    if self.pattern.matches_with(&name, match_opts) {
                        debug!("Found source document: {}", entry.path().display());
                        Some(SourceFile::new(entry.path().to_path_buf()))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    log.warning(format!("scan:: cannot read '{}': {}", location, e));
                    warn!("Traversal error under {}: {}", self.root.display(), e);
                    None
                }
            })
    }
}
