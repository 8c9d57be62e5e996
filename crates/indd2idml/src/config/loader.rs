use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{Backend, FileConfig};
use crate::error::ConfigError;

/// Loads and validates a config file.
pub fn load_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: FileConfig = serde_json::from_str(&content)?;
    validate_file_config(&config)?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Checks the constraints serde cannot express.
pub fn validate_file_config(config: &FileConfig) -> Result<(), ConfigError> {
    if config.source_pattern.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "source_pattern must not be empty".to_string(),
        });
    }

    if let Err(e) = glob::Pattern::new(&config.source_pattern) {
        return Err(ConfigError::Validation {
            message: format!("invalid source_pattern '{}': {}", config.source_pattern, e),
        });
    }

    if config.backend == Backend::Command && config.command.interchange.is_empty() {
        return Err(ConfigError::Validation {
            message: "backend 'command' requires a command.interchange argv template".to_string(),
        });
    }

    Ok(())
}

/// Default config file location in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("indd2idml").join("config.json"))
}

/// Default run log location in the platform data directory.
pub fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("indd2idml").join("indd2idml.log"))
        .unwrap_or_else(|| PathBuf::from("indd2idml.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runlog::LogLevel;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), "{}");

        let config = load_file_config(&path).unwrap();
        assert!(!config.export_preview);
        assert!(config.update_links);
        assert_eq!(config.source_pattern, "*.indd");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.backend, Backend::Sim);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_explicit_fields_override_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            temp_dir.path(),
            r#"{
                "export_preview": true,
                "update_links": false,
                "source_pattern": "*.qxp",
                "log_file": "/var/log/conversions.log",
                "log_level": "debug"
            }"#,
        );

        let config = load_file_config(&path).unwrap();
        assert!(config.export_preview);
        assert!(!config.update_links);
        assert_eq!(config.source_pattern, "*.qxp");
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/conversions.log")));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_file_config(temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), "{ not json");
        let result = load_file_config(&path);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), r#"{ "log_level": "chatty" }"#);
        let result = load_file_config(&path);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_bad_pattern_fails_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), r#"{ "source_pattern": "[" }"#);
        let result = load_file_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_command_backend_requires_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), r#"{ "backend": "command" }"#);
        let result = load_file_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));

        let path = write_config(
            temp_dir.path(),
            r#"{
                "backend": "command",
                "command": { "interchange": ["convert", "{input}", "{output}"] }
            }"#,
        );
        assert!(load_file_config(&path).is_ok());
    }

    #[test]
    fn test_default_log_path_is_stable() {
        let a = default_log_path();
        let b = default_log_path();
        assert_eq!(a, b);
        assert!(a.to_string_lossy().contains("indd2idml"));
    }
}
