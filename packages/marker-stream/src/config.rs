// Marker console configuration
//
// Capacities and timeouts for discovery, polling and the log store. Every
// field has a default so partial JSON files are accepted.

use crate::types::{StreamError, StreamResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Maximum number of entries kept in the full history
    pub log_capacity: usize,

    /// Maximum samples decoded per connection per tick; older backlog is discarded
    pub max_batch: usize,

    /// Buffer capacity requested when opening a connection
    pub inlet_buffer_capacity: usize,

    /// Timeout for the per-tick metadata refresh (seconds)
    pub liveness_timeout_secs: f64,

    /// Timeout for a discovery scan (seconds)
    pub discovery_timeout_secs: f64,

    /// Interval between scheduling ticks (milliseconds)
    pub tick_interval_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            max_batch: 100,
            inlet_buffer_capacity: 100,
            liveness_timeout_secs: 0.1,
            discovery_timeout_secs: 5.0,
            tick_interval_ms: 16,
        }
    }
}

impl ConsoleConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: ConsoleConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded console config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> StreamResult<()> {
        if self.log_capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "log_capacity must be positive".into(),
            ));
        }
        if self.max_batch == 0 {
            return Err(StreamError::InvalidConfig("max_batch must be positive".into()));
        }
        if self.inlet_buffer_capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "inlet_buffer_capacity must be positive".into(),
            ));
        }
        check_timeout("liveness_timeout_secs", self.liveness_timeout_secs)?;
        check_timeout("discovery_timeout_secs", self.discovery_timeout_secs)?;
        if self.tick_interval_ms == 0 {
            return Err(StreamError::InvalidConfig(
                "tick_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn check_timeout(field: &str, value: f64) -> StreamResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(StreamError::InvalidConfig(format!(
            "{} must be a finite, non-negative number of seconds (got {})",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.log_capacity, 1000);
        assert_eq!(config.max_batch, 100);
        assert_eq!(config.tick_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "log_capacity": 50, "liveness_timeout_secs": 0.25 }}"#).unwrap();

        let config = ConsoleConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.log_capacity, 50);
        assert_eq!(config.liveness_timeout_secs, 0.25);
        assert_eq!(config.max_batch, 100);
        assert_eq!(config.discovery_timeout_secs, 5.0);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = ConsoleConfig {
            log_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_negative_timeout() {
        let config = ConsoleConfig {
            discovery_timeout_secs: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConsoleConfig {
            liveness_timeout_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ConsoleConfig::from_json_file(file.path()),
            Err(StreamError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ConsoleConfig::from_json_file("/nonexistent/markerlog.json"),
            Err(StreamError::Io(_))
        ));
    }
}
