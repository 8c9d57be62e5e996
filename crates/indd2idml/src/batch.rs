use std::path::PathBuf;
use std::sync::Arc;

use log::info;
use tracing::info_span;

use crate::config::{RunConfig, RunMode};
use crate::error::Indd2IdmlError;
use crate::pipeline::{ConversionPipeline, ConversionResult};
use crate::runlog::RunLog;
use crate::scanner::SourceScanner;
use crate::service::ConversionService;
use crate::source::SourceFile;

/// Outcome of one file inside a batch run.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub result: ConversionResult,
}

/// Aggregated outcome of a whole run: one report per attempted file.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub results: Vec<FileReport>,
    /// Log lines that could not be persisted during the run.
    pub dropped_log_entries: u64,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn converted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.result.is_success())
            .count()
    }

    pub fn with_warnings(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.result, ConversionResult::ConvertedWithWarnings { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.converted()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

/// Top-level batch control.
///
/// Opens the run log before anything else so even setup problems leave a
/// trace, feeds sources into the pipeline according to the run mode, and
/// finalizes the log on every exit path: the run body's error is captured,
/// the closing banner written, the log closed, and only then does the
/// error propagate.
pub struct BatchRunner {
    config: RunConfig,
    service: Arc<dyn ConversionService>,
}

impl BatchRunner {
    pub fn new(config: RunConfig, service: Arc<dyn ConversionService>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary, Indd2IdmlError> {
        let _span = info_span!("run", mode = %self.config.mode.describe()).entered();

        // A failure to open the log is the one error with no log to land
        // in; it propagates immediately for the caller to alert on.
        let log = RunLog::open(&self.config.log_file, self.config.log_level)?;

        log.info(format!(
            "run:: {} v{} starting on {} (backend: {}, mode: {}, preview: {}, update-links: {}, pattern: '{}')",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            self.service.name(),
            self.config.mode.describe(),
            self.config.export_preview,
            self.config.update_links,
            self.config.source_pattern,
        ));
        info!("Run started ({})", self.config.mode.describe());

        let outcome = self.run_files(&log);

        match &outcome {
            Ok(summary) => log.info(format!(
                "run:: finished: {} converted ({} with warnings), {} failed",
                summary.converted(),
                summary.with_warnings(),
                summary.failed()
            )),
            Err(e) => log.critical(format!("run:: aborted: {}", e)),
        }

        let close_result = log.close();
        let mut summary = outcome?;
        close_result?;

        summary.dropped_log_entries = log.dropped_entries();
        Ok(summary)
    }

    fn run_files(&self, log: &RunLog) -> Result<RunSummary, Indd2IdmlError> {
        let pipeline = ConversionPipeline::new(Arc::clone(&self.service), &self.config);
        let mut summary = RunSummary::default();

        match &self.config.mode {
            RunMode::Single { file } => {
                let source = SourceFile::new(file.clone());
                let result = pipeline.convert(&source, log);
                summary.results.push(FileReport {
                    source: file.clone(),
                    result,
                });
            }
            RunMode::Recursive { root } => {
                log.info(format!(
                    "run:: scanning '{}' for '{}'",
                    root.display(),
                    self.config.source_pattern
                ));
                let scanner = SourceScanner::new(root, &self.config.source_pattern)?;
                for source in scanner.files(log) {
                    let result = pipeline.convert(&source, log);
                    summary.results.push(FileReport {
                        source: source.path().to_path_buf(),
                        result,
                    });
                }
                log.info(format!(
                    "run:: {} file(s) matched under '{}'",
                    summary.total(),
                    root.display()
                ));
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runlog::LogLevel;
    use crate::service::SimulatedService;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config(mode: RunMode, log_file: PathBuf) -> RunConfig {
        RunConfig {
            mode,
            export_preview: false,
            update_links: true,
            source_pattern: "*.indd".to_string(),
            log_file,
            log_level: LogLevel::Debug,
        }
    }

    fn sim_runner(config: RunConfig) -> BatchRunner {
        BatchRunner::new(config, Arc::new(SimulatedService::new()))
    }

    fn touch(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_recursive_run_converts_every_match() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        std::fs::create_dir_all(root.join("issue-2")).unwrap();
        touch(&root.join("a.indd"), "plain\n");
        touch(&root.join("b.indd"), "plain\n");
        touch(&root.join("issue-2").join("c.indd"), "plain\n");
        touch(&root.join("notes.txt"), "not a source\n");

        let log_file = temp_dir.path().join("run.log");
        let config = test_config(RunMode::Recursive { root: root.clone() }, log_file.clone());
        let summary = sim_runner(config).run().unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.converted(), 3);
        assert!(summary.is_clean());
        assert!(root.join("a.idml").exists());
        assert!(root.join("b.idml").exists());
        assert!(root.join("issue-2").join("c.idml").exists());

        let text = std::fs::read_to_string(&log_file).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("run:: indd2idml v"));
        assert!(lines.last().unwrap().contains("run:: finished: 3 converted"));
        assert_eq!(
            text.matches("run:: finished").count(),
            1,
            "closing banner must appear exactly once"
        );
    }

    #[test]
    fn test_failures_are_counted_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        std::fs::create_dir(&root).unwrap();
        touch(&root.join("bad.indd"), "fail: open\n");
        touch(&root.join("good.indd"), "plain\n");

        let log_file = temp_dir.path().join("run.log");
        let config = test_config(RunMode::Recursive { root: root.clone() }, log_file.clone());
        let summary = sim_runner(config).run().unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.converted(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(root.join("good.idml").exists());

        let text = std::fs::read_to_string(&log_file).unwrap();
        assert!(text.contains("ERROR: convert:: Failed to open document"));
        assert!(text.lines().last().unwrap().contains("run:: finished"));
    }

    #[test]
    fn test_single_mode_with_preview_produces_both_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("Report.indd");
        touch(&source, "plain\n");

        let log_file = temp_dir.path().join("run.log");
        let mut config = test_config(RunMode::Single { file: source.clone() }, log_file.clone());
        config.export_preview = true;

        let summary = sim_runner(config).run().unwrap();

        assert_eq!(summary.total(), 1);
        assert!(summary.is_clean());
        assert!(temp_dir.path().join("Report.idml").exists());
        assert!(temp_dir.path().join("Report_preview.pdf").exists());

        let text = std::fs::read_to_string(&log_file).unwrap();
        assert!(text.contains("DEBUG: convert:: closed"));
    }

    #[test]
    fn test_single_mode_missing_file_is_one_failed_result() {
        let temp_dir = TempDir::new().unwrap();
        let ghost = temp_dir.path().join("ghost.indd");

        let log_file = temp_dir.path().join("run.log");
        let config = test_config(RunMode::Single { file: ghost }, log_file.clone());
        let summary = sim_runner(config).run().unwrap();

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.failed(), 1);

        let text = std::fs::read_to_string(&log_file).unwrap();
        assert!(text.contains("ERROR: convert::"));
    }

    #[test]
    fn test_scan_failure_still_finalizes_the_log() {
        let temp_dir = TempDir::new().unwrap();
        let log_file = temp_dir.path().join("run.log");
        let config = test_config(
            RunMode::Recursive {
                root: temp_dir.path().join("does-not-exist"),
            },
            log_file.clone(),
        );

        let result = sim_runner(config).run();
        assert!(matches!(result, Err(Indd2IdmlError::Scan(_))));

        let text = std::fs::read_to_string(&log_file).unwrap();
        assert!(text.lines().next().unwrap().contains("run:: indd2idml v"));
        assert!(text.contains("CRITICAL: run:: aborted:"));
    }

    #[test]
    fn test_unopenable_log_is_a_setup_failure() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened as the log file.
        let config = test_config(
            RunMode::Single {
                file: temp_dir.path().join("a.indd"),
            },
            temp_dir.path().to_path_buf(),
        );

        let result = sim_runner(config).run();
        assert!(matches!(result, Err(Indd2IdmlError::Log(_))));
    }

    #[test]
    fn test_summary_warning_counts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        std::fs::create_dir(&root).unwrap();
        touch(&root.join("warned.indd"), "link: gone.png\n");
        touch(&root.join("clean.indd"), "plain\n");

        let log_file = temp_dir.path().join("run.log");
        let config = test_config(RunMode::Recursive { root }, log_file);
        let summary = sim_runner(config).run().unwrap();

        assert_eq!(summary.converted(), 2);
        assert_eq!(summary.with_warnings(), 1);
        assert!(summary.is_clean());
    }
}
