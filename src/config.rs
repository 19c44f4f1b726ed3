//! Engine configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default. Invalid values are rejected at load time, never clamped.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// File could not be read
    Unreadable,
    /// File is not valid JSON for the config shape
    Malformed,
    /// A field holds an illegal value
    InvalidValue,
}

impl ConfigErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::Unreadable => "HG_CONFIG_UNREADABLE",
            ConfigErrorCode::Malformed => "HG_CONFIG_MALFORMED",
            ConfigErrorCode::InvalidValue => "HG_CONFIG_INVALID_VALUE",
        }
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Invalid field value
    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ConfigErrorCode::InvalidValue,
            format!("{}: {}", field, reason.into()),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Execution engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Inner cursors a pipelined nested-loop map or lookup may run ahead
    #[serde(default = "default_lookahead_quantum")]
    pub lookahead_quantum: usize,

    /// Sequential advances a skip-scan intersect tries before jumping
    #[serde(default = "default_skip_scan_sequential_steps")]
    pub skip_scan_sequential_steps: usize,

    /// Query deadline in milliseconds; no deadline when absent
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,

    /// Lowest logged severity: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_lookahead_quantum() -> usize {
    4
}

fn default_skip_scan_sequential_steps() -> usize {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead_quantum: default_lookahead_quantum(),
            skip_scan_sequential_steps: default_skip_scan_sequential_steps(),
            query_timeout_ms: None,
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                ConfigErrorCode::Unreadable,
                format!("Failed to read config {}: {}", path.display(), e),
            )
        })?;
        let config = Self::from_json(&content)?;
        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content).map_err(|e| {
            ConfigError::new(ConfigErrorCode::Malformed, format!("Invalid config JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.lookahead_quantum == 0 {
            return Err(ConfigError::invalid_value("lookahead_quantum", "must be > 0"));
        }
        if self.query_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value("query_timeout_ms", "must be > 0 when set"));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(|e| ConfigError::invalid_value("log_level", e))
    }

    /// Query deadline as a duration
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Applies `log_level` to the process-wide logger
    pub fn apply_logging(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.lookahead_quantum, 4);
        assert_eq!(config.skip_scan_sequential_steps, 1);
        assert_eq!(config.query_timeout(), None);
        assert_eq!(config.severity().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_zero_quantum_rejected() {
        let err = EngineConfig::from_json(r#"{"lookahead_quantum": 0}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
        assert!(err.message().contains("lookahead_quantum"));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = EngineConfig::from_json(r#"{"log_level": "chatty"}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::InvalidValue);
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json("{").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::Malformed);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"lookahead_quantum": 2, "query_timeout_ms": 500}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.lookahead_quantum, 2);
        assert_eq!(config.query_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/hgroup.json")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::Unreadable);
    }
}
