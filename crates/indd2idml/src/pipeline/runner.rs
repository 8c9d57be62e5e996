use std::sync::Arc;

use log::{error, info, warn};
use tracing::info_span;

use crate::config::RunConfig;
use crate::error::ServiceError;
use crate::pipeline::{ConversionResult, ConversionWarning};
use crate::runlog::RunLog;
use crate::service::{ConversionService, DocumentHandle, ExportFormat, LinkState};
use crate::source::SourceFile;

/// Drives one source document through the conversion service.
///
/// Steps run in a fixed order (open, link resolution, preview export,
/// primary export, close) and each is fault-isolated: a failing step is
/// logged and the remaining cleanup still runs. An opened handle is closed
/// exactly once no matter which steps failed.
pub struct ConversionPipeline {
    service: Arc<dyn ConversionService>,
    export_preview: bool,
    update_links: bool,
}

impl ConversionPipeline {
    pub fn new(service: Arc<dyn ConversionService>, config: &RunConfig) -> Self {
        Self {
            service,
            export_preview: config.export_preview,
            update_links: config.update_links,
        }
    }

    #[cfg(test)]
    fn with_flags(
        service: Arc<dyn ConversionService>,
        export_preview: bool,
        update_links: bool,
    ) -> Self {
        Self {
            service,
            export_preview,
            update_links,
        }
    }

    /// Converts one source document, logging every step to the run log.
    ///
    /// A successful file leaves this sequence in the log: an opening INFO
    /// entry, per-link DEBUG/WARNING entries, the export INFO entries, a
    /// `converted` INFO entry, and finally a DEBUG `closed` entry.
    pub fn convert(&self, source: &SourceFile, log: &RunLog) -> ConversionResult {
        let _span = info_span!("convert", file = %source.file_name()).entered();

        log.info(format!("convert:: opening '{}'", source.path().display()));
        let mut handle = {
            let _step = info_span!("open").entered();
            match self.service.open(source.path()) {
                Ok(handle) => handle,
                Err(e) => {
                    let reason = e.to_string();
                    log.error(format!("convert:: {}", reason));
                    error!("Open failed: {}", reason);
                    return ConversionResult::Failed { reason };
                }
            }
        };

        let mut warnings = Vec::new();

        if self.update_links {
            let _step = info_span!("links").entered();
            self.resolve_links(handle.as_mut(), log, &mut warnings);
        }

        if self.export_preview {
            let _step = info_span!("preview").entered();
            self.export_preview_artifact(handle.as_mut(), source, log, &mut warnings);
        }

        let primary = {
            let _step = info_span!("export").entered();
            self.export_primary(handle.as_mut(), source, log)
        };

        handle.close(true);
        log.debug(format!("convert:: closed '{}'", source.path().display()));

        match primary {
            Ok(artifact) => {
                info!(
                    "Converted {} -> {}",
                    source.file_name(),
                    artifact.display()
                );
                ConversionResult::success(artifact, warnings)
            }
            Err(reason) => ConversionResult::Failed { reason },
        }
    }

    fn resolve_links(
        &self,
        handle: &mut dyn DocumentHandle,
        log: &RunLog,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        for link in handle.links() {
            match link.state {
                LinkState::Current => {}
                LinkState::Stale => match handle.refresh_link(&link.path) {
                    Ok(()) => {
                        log.debug(format!("link:: refreshed '{}'", link.path.display()));
                    }
                    Err(e) => {
                        let reason = match e {
                            ServiceError::Refresh { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        log.warning(format!(
                            "link:: cannot refresh '{}': {}",
                            link.path.display(),
                            reason
                        ));
                        warn!("Link refresh failed for {}: {}", link.path.display(), reason);
                        warnings.push(ConversionWarning::LinkRefreshFailed {
                            path: link.path.clone(),
                            reason,
                        });
                    }
                },
                LinkState::Missing => {
                    log.warning(format!("link:: missing '{}'", link.path.display()));
                    warn!("Missing link: {}", link.path.display());
                    warnings.push(ConversionWarning::MissingLink {
                        path: link.path.clone(),
                    });
                }
            }
        }
    }

    fn export_preview_artifact(
        &self,
        handle: &mut dyn DocumentHandle,
        source: &SourceFile,
        log: &RunLog,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        let output = source.preview_path();
        log.info(format!("preview:: exporting '{}'", output.display()));

        if let Err(e) = handle.export(ExportFormat::Preview, &output) {
            let reason = e.to_string();
            log.error(format!("preview:: {}", reason));
            warn!("Preview export failed: {}", reason);
            warnings.push(ConversionWarning::PreviewExportFailed { reason });
        }
    }

    fn export_primary(
        &self,
        handle: &mut dyn DocumentHandle,
        source: &SourceFile,
        log: &RunLog,
    ) -> Result<std::path::PathBuf, String> {
        let output = source.idml_path();
        log.info(format!("export:: writing '{}'", output.display()));

        match handle.export(ExportFormat::Interchange, &output) {
            Ok(()) => {
                log.info(format!(
                    "convert:: converted '{}' -> '{}'",
                    source.path().display(),
                    output.display()
                ));
                Ok(output)
            }
            Err(e) => {
                let reason = e.to_string();
                log.error(format!("export:: {}", reason));
                error!("Primary export failed: {}", reason);
                Err(reason)
            }
        }
    }
}
