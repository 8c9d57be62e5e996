use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::service::{ConversionService, DocumentHandle, ExportFormat, Link};

/// Argv templates for the command backend, one per export format.
/// `{input}` and `{output}` placeholders are substituted before spawning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandTemplates {
    #[serde(default)]
    pub interchange: Vec<String>,
    /// Absent means the converter offers no preview rendering; preview
    /// exports then fail per file without affecting the primary export.
    #[serde(default)]
    pub preview: Option<Vec<String>>,
}

/// Backend that delegates each export to an external converter command.
///
/// The command runs synchronously and inherits no timeout: a hung converter
/// blocks the run, matching the behavior of driving the host application
/// directly. Reference introspection is not available through a command
/// line, so documents report no links.
pub struct CommandService {
    templates: CommandTemplates,
}

impl CommandService {
    pub fn new(templates: CommandTemplates) -> Self {
        Self { templates }
    }
}

impl ConversionService for CommandService {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, ServiceError> {
        // Readability probe only; the converter command opens it for real.
        std::fs::File::open(path).map_err(|e| ServiceError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Box::new(CommandHandle {
            path: path.to_path_buf(),
            templates: self.templates.clone(),
        }))
    }

    fn name(&self) -> &str {
        "command"
    }
}

struct CommandHandle {
    path: PathBuf,
    templates: CommandTemplates,
}

impl DocumentHandle for CommandHandle {
    fn links(&self) -> Vec<Link> {
        Vec::new()
    }

    fn refresh_link(&mut self, path: &Path) -> Result<(), ServiceError> {
        Err(ServiceError::Refresh {
            path: path.to_path_buf(),
            reason: "command backend has no reference introspection".to_string(),
        })
    }

    fn export(&mut self, format: ExportFormat, output: &Path) -> Result<(), ServiceError> {
        let template = match format {
            ExportFormat::Interchange => &self.templates.interchange,
            ExportFormat::Preview => match &self.templates.preview {
                Some(template) => template,
                None => {
                    return Err(export_error(
                        format,
                        output,
                        "no preview command configured",
                    ))
                }
            },
        };
        if template.is_empty() {
            return Err(export_error(format, output, "no command configured"));
        }

        let input_str = self.path.display().to_string();
        let output_str = output.display().to_string();
        let argv: Vec<String> = template
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input_str)
                    .replace("{output}", &output_str)
            })
            .collect();

        debug!("Running converter command: {:?}", argv);
        let result = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|e| ServiceError::Subprocess {
                program: argv[0].clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let mut reason = format!("'{}' exited with {}", argv[0], result.status);
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                reason.push_str(": ");
                reason.push_str(truncate(trimmed, 200));
            }
            return Err(export_error(format, output, reason));
        }

        if !output.exists() {
            return Err(export_error(
                format,
                output,
                format!("'{}' succeeded but produced no output file", argv[0]),
            ));
        }

        Ok(())
    }

    fn close(self: Box<Self>, _discard_changes: bool) {
        debug!("Released command document {}", self.path.display());
    }
}

fn export_error(
    format: ExportFormat,
    path: &Path,
    reason: impl Into<String>,
) -> ServiceError {
    ServiceError::Export {
        format,
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
