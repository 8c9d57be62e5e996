//! Test harness for isolated batch-run execution.
//!
//! `TestHarness` provides a temp workspace with a source document tree and
//! a run log location, plus helpers to run the batch machinery against the
//! simulated backend and inspect the log and the produced artifacts.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use indd2idml::{BatchRunner, LogLevel, RunConfig, RunMode, RunSummary, SimulatedService};

pub struct TestHarness {
    /// Temporary directory containing the docs tree and the log.
    temp_dir: TempDir,
    /// Root of the source document tree.
    pub docs_dir: PathBuf,
    /// Run log location (inside the temp directory, parent not yet created
    /// so log-directory creation is exercised too).
    pub log_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(&docs_dir).expect("Failed to create docs dir");
        let log_path = temp_dir.path().join("logs").join("run.log");

        Self {
            temp_dir,
            docs_dir,
            log_path,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a source document under the docs tree, creating intermediate
    /// folders. The content is a sim-backend manifest (or any text).
    pub fn write_source(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.docs_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create source dir");
        }
        std::fs::write(&path, content).expect("Failed to write source file");
        path
    }

    /// Creates an empty subfolder under the docs tree.
    pub fn create_folder(&self, relative: &str) -> PathBuf {
        let path = self.docs_dir.join(relative);
        std::fs::create_dir_all(&path).expect("Failed to create folder");
        path
    }

    /// Run configuration scanning the whole docs tree.
    pub fn recursive_config(&self) -> RunConfig {
        RunConfig {
            mode: RunMode::Recursive {
                root: self.docs_dir.clone(),
            },
            export_preview: false,
            update_links: true,
            source_pattern: "*.indd".to_string(),
            log_file: self.log_path.clone(),
            log_level: LogLevel::Debug,
        }
    }

    /// Run configuration converting exactly one file.
    pub fn single_config(&self, file: &Path) -> RunConfig {
        RunConfig {
            mode: RunMode::Single {
                file: file.to_path_buf(),
            },
            export_preview: false,
            update_links: true,
            source_pattern: "*.indd".to_string(),
            log_file: self.log_path.clone(),
            log_level: LogLevel::Debug,
        }
    }

    /// Runs a batch against the simulated backend, expecting run-level
    /// success (per-file failures are still fine and show up in the
    /// summary).
    pub fn run(&self, config: RunConfig) -> RunSummary {
        BatchRunner::new(config, Arc::new(SimulatedService::new()))
            .run()
            .expect("batch run failed")
    }

    pub fn read_log(&self) -> String {
        std::fs::read_to_string(&self.log_path).expect("Failed to read run log")
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.read_log().lines().map(|l| l.to_string()).collect()
    }

    pub fn assert_artifact_exists(&self, relative: &str) {
        let path = self.docs_dir.join(relative);
        assert!(path.exists(), "Expected artifact does not exist: {:?}", path);
    }

    /// Lists produced artifacts (`.idml` / `.pdf`) relative to the docs
    /// tree, in no particular order.
    pub fn list_artifacts(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(&self.docs_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|x| x == "idml" || x == "pdf")
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.docs_dir)
                    .ok()
                    .map(|p| p.to_path_buf())
            })
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
