pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runlog;
pub mod scanner;
pub mod service;
pub mod source;

pub use batch::{BatchRunner, FileReport, RunSummary};
pub use config::{
    default_config_path, default_log_path, load_file_config, Backend, FileConfig, RunConfig,
    RunMode,
};
pub use error::{ConfigError, Indd2IdmlError, LogError, Result, ScanError, ServiceError};
pub use pipeline::{ConversionPipeline, ConversionResult, ConversionWarning};
pub use runlog::{LogEntry, LogLevel, RunLog};
pub use scanner::SourceScanner;
pub use service::{
    CommandService, CommandTemplates, ConversionService, DocumentHandle, ExportFormat, Link,
    LinkState, SimulatedService,
};
pub use source::SourceFile;
