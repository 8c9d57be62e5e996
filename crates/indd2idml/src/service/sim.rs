use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::debug;

use crate::error::ServiceError;
use crate::service::{ConversionService, DocumentHandle, ExportFormat, Link, LinkState};

const IDML_MIMETYPE: &str = "application/vnd.adobe.indesign-idml-package";

/// Stand-in for the real page-layout application.
///
/// Any readable file opens as a document. When the file content is plain
/// text, directive lines script the document's behavior, one per line:
///
/// ```text
/// link: assets/logo.png      # reference; Missing when the asset is absent
/// link-stale: assets/bg.png  # reference that needs a refresh
/// link-broken: assets/x.png  # stale reference whose refresh fails
/// fail: open                 # opening this document fails
/// fail: export-idml          # the interchange export fails
/// fail: export-pdf           # the preview export fails
/// ```
///
/// Relative link paths resolve against the document's directory. Exports
/// produce real artifacts: a minimal IDML package (ZIP with a stored
/// `mimetype` entry and a `designmap.xml`) and a one-page PDF preview.
pub struct SimulatedService;

impl SimulatedService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimulatedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionService for SimulatedService {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, ServiceError> {
        let bytes = std::fs::read(path).map_err(|e| ServiceError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let manifest = parse_manifest(path, &String::from_utf8_lossy(&bytes));
        if manifest.fail_open {
            return Err(ServiceError::Open {
                path: path.to_path_buf(),
                reason: "scripted failure: document is damaged".to_string(),
            });
        }

        debug!("Opened simulated document {}", path.display());
        Ok(Box::new(SimHandle {
            path: path.to_path_buf(),
            links: manifest.links,
            fail_idml: manifest.fail_idml,
            fail_pdf: manifest.fail_pdf,
        }))
    }

    fn name(&self) -> &str {
        "sim"
    }
}

struct SimLink {
    link: Link,
    refresh_fails: bool,
}

struct SimHandle {
    path: PathBuf,
    links: Vec<SimLink>,
    fail_idml: bool,
    fail_pdf: bool,
}

impl DocumentHandle for SimHandle {
    fn links(&self) -> Vec<Link> {
        self.links.iter().map(|l| l.link.clone()).collect()
    }

    fn refresh_link(&mut self, path: &Path) -> Result<(), ServiceError> {
        let entry = self
            .links
            .iter_mut()
            .find(|l| l.link.path == path)
            .ok_or_else(|| ServiceError::Refresh {
                path: path.to_path_buf(),
                reason: "no such link in this document".to_string(),
            })?;

        if entry.refresh_fails {
            return Err(ServiceError::Refresh {
                path: path.to_path_buf(),
                reason: "scripted failure: asset cannot be relinked".to_string(),
            });
        }
        if entry.link.state == LinkState::Missing {
            return Err(ServiceError::Refresh {
                path: path.to_path_buf(),
                reason: "asset file not found".to_string(),
            });
        }

        entry.link.state = LinkState::Current;
        Ok(())
    }

    fn export(&mut self, format: ExportFormat, output: &Path) -> Result<(), ServiceError> {
        match format {
            ExportFormat::Interchange => {
                if self.fail_idml {
                    return Err(export_error(
                        format,
                        output,
                        "scripted failure: interchange writer rejected the document",
                    ));
                }
                write_idml_package(&self.path, output)
            }
            ExportFormat::Preview => {
                if self.fail_pdf {
                    return Err(export_error(
                        format,
                        output,
                        "scripted failure: renderer could not rasterize the document",
                    ));
                }
                write_preview_pdf(&self.path, &self.links, output)
            }
        }
    }

    fn close(self: Box<Self>, _discard_changes: bool) {
        debug!("Released simulated document {}", self.path.display());
    }
}

struct Manifest {
    links: Vec<SimLink>,
    fail_open: bool,
    fail_idml: bool,
    fail_pdf: bool,
}

fn parse_manifest(source: &Path, content: &str) -> Manifest {
    let base = source.parent().unwrap_or_else(|| Path::new(""));
    let mut manifest = Manifest {
        links: Vec::new(),
        fail_open: false,
        fail_idml: false,
        fail_pdf: false,
    };

    for line in content.lines() {
        let line = line.trim();
        if let Some(target) = line.strip_prefix("link:") {
            let path = resolve_link(base, target.trim());
            let state = if path.exists() {
                LinkState::Current
            } else {
                LinkState::Missing
            };
            manifest.links.push(SimLink {
                link: Link { path, state },
                refresh_fails: false,
            });
        } else if let Some(target) = line.strip_prefix("link-stale:") {
            manifest.links.push(SimLink {
                link: Link {
                    path: resolve_link(base, target.trim()),
                    state: LinkState::Stale,
                },
                refresh_fails: false,
            });
        } else if let Some(target) = line.strip_prefix("link-broken:") {
            manifest.links.push(SimLink {
                link: Link {
                    path: resolve_link(base, target.trim()),
                    state: LinkState::Stale,
                },
                refresh_fails: true,
            });
        } else if let Some(what) = line.strip_prefix("fail:") {
            match what.trim() {
                "open" => manifest.fail_open = true,
                "export-idml" => manifest.fail_idml = true,
                "export-pdf" => manifest.fail_pdf = true,
                other => debug!("Ignoring unknown sim directive 'fail: {}'", other),
            }
        }
    }

    manifest
}

fn resolve_link(base: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    }
}

fn export_error(format: ExportFormat, path: &Path, reason: impl fmt::Display) -> ServiceError {
    ServiceError::Export {
        format,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Writes a minimal IDML package: a ZIP whose first entry is the stored
/// (uncompressed) `mimetype`, followed by a skeletal `designmap.xml`.
fn write_idml_package(source: &Path, output: &Path) -> Result<(), ServiceError> {
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    let format = ExportFormat::Interchange;
    let file =
        std::fs::File::create(output).map_err(|e| export_error(format, output, e))?;
    let mut package = ZipWriter::new(file);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    package
        .start_file("mimetype", stored)
        .map_err(|e| export_error(format, output, e))?;
    package
        .write_all(IDML_MIMETYPE.as_bytes())
        .map_err(|e| export_error(format, output, e))?;

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let designmap = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Document xmlns:idPkg=\"http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging\" \
         Self=\"d\" DOMVersion=\"8.0\" Name=\"{}\"/>\n",
        escape_xml(&name)
    );
    package
        .start_file("designmap.xml", SimpleFileOptions::default())
        .map_err(|e| export_error(format, output, e))?;
    package
        .write_all(designmap.as_bytes())
        .map_err(|e| export_error(format, output, e))?;

    package.finish().map_err(|e| export_error(format, output, e))?;
    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Writes a one-page PDF placeholder preview describing the document.
fn write_preview_pdf(source: &Path, links: &[SimLink], output: &Path) -> Result<(), ServiceError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lines = vec![
        format!("Preview of {}", name),
        format!("Source: {}", source.display()),
        format!("Links: {}", links.len()),
        format!(
            "Generated: {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
    ];

    let bytes = build_pdf(&lines).map_err(|e| export_error(ExportFormat::Preview, output, e))?;
    std::fs::write(output, bytes).map_err(|e| export_error(ExportFormat::Preview, output, e))?;
    Ok(())
}

fn build_pdf(lines: &[String]) -> Result<Vec<u8>, lopdf::Error> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        }),
    );

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    let content_stream = Stream::new(dictionary! {}, page_content(lines).into_bytes());
    doc.objects
        .insert(content_id, Object::Stream(content_stream));

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn page_content(lines: &[String]) -> String {
    let mut content = String::new();
    content.push_str("BT\n");
    content.push_str("/F1 12 Tf\n");
    content.push_str("50 742 Td\n");
    content.push_str("16 TL\n");

    for line in lines {
        content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
    }

    content.push_str("ET\n");
    content
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}
