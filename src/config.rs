use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rir::dialect::{self, Dialect, ALL_DIALECTS};
use crate::rir::package::ErrorPolicy;

/// Top-level configuration structure that mirrors the YAML answers file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// (Optional) Country code list in `Name, Code` format; bundled list otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_codes: Option<PathBuf>,
    /// Directory holding the downloaded delegation files
    pub cache_dir: PathBuf,
    /// Registries to load, in load order
    pub registries: Vec<String>,
    /// Log malformed lines and keep going instead of aborting
    pub ignore_package_errors: bool,
    /// Records per bulk insert
    pub batch_size: usize,
    pub output: OutputConfig,
}

/// Where and how loaded records are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub path: PathBuf,
    /// Target table name for SQL output
    pub table: String,
    /// Emit `DROP TABLE IF EXISTS` before the inserts
    pub drop_existing: bool,
    /// Emit `CREATE TABLE IF NOT EXISTS` before the inserts
    pub create_table: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Sql,
    JsonLines,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid registry configuration: {0}")]
    InvalidRegistry(String),
    #[error("Invalid loader configuration: {0}")]
    InvalidLoader(String),
    #[error("Invalid output configuration: {0}")]
    InvalidOutput(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.dialects()?;

        if self.batch_size == 0 {
            return Err(ValidationError::InvalidLoader(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidOutput("path cannot be empty".to_string()));
        }

        if self.output.format == OutputFormat::Sql {
            let table = &self.output.table;
            let valid = !table.is_empty()
                && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !table.starts_with(|c: char| c.is_ascii_digit());
            if !valid {
                return Err(ValidationError::InvalidOutput(format!(
                    "table name '{}' must be a plain SQL identifier",
                    table
                )));
            }
        }

        Ok(())
    }

    /// Resolve the configured registry names, rejecting unknown names and duplicates
    pub fn dialects(&self) -> Result<Vec<&'static Dialect>, ValidationError> {
        if self.registries.is_empty() {
            return Err(ValidationError::InvalidRegistry(
                "at least one registry must be listed".to_string(),
            ));
        }

        let mut dialects: Vec<&'static Dialect> = Vec::with_capacity(self.registries.len());
        for name in &self.registries {
            let dialect = dialect::lookup(name)
                .ok_or_else(|| ValidationError::InvalidRegistry(format!("unknown registry '{}'", name)))?;
            if dialects.iter().any(|seen| seen.identifier == dialect.identifier) {
                return Err(ValidationError::InvalidRegistry(format!(
                    "registry '{}' is listed more than once",
                    name
                )));
            }
            dialects.push(dialect);
        }
        Ok(dialects)
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::from_errors_as_warnings(self.ignore_package_errors)
    }
}

/// Default implementations
impl Default for Config {
    fn default() -> Self {
        Self {
            country_codes: None,
            cache_dir: PathBuf::from("cache"),
            registries: ALL_DIALECTS.iter().map(|d| d.identifier.to_string()).collect(),
            ignore_package_errors: false,
            batch_size: 400,
            output: OutputConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Sql,
            path: PathBuf::from("iptable.sql"),
            table: "iptable".to_string(),
            drop_existing: false,
            create_table: true,
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rir::dialect::{ARIN, RIPENCC};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.registries, vec!["afrinic", "apnic", "arin", "ripencc", "lacnic"]);
        assert_eq!(config.batch_size, 400);
        assert_eq!(config.output.table, "iptable");
        assert_eq!(config.error_policy(), ErrorPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("batch_size: 50\noutput:\n  format: json_lines\n").unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.output.format, OutputFormat::JsonLines);
        assert_eq!(config.output.table, "iptable");
        assert_eq!(config.registries.len(), 5);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_yaml::from_str::<Config>("batch_sz: 50\n").is_err());
    }

    #[test]
    fn test_dialects_resolve_in_order() {
        let config = Config {
            registries: vec!["ARIN".to_string(), "ripe".to_string()],
            ..Default::default()
        };
        let dialects = config.dialects().unwrap();
        assert_eq!(*dialects[0], ARIN);
        assert_eq!(*dialects[1], RIPENCC);
    }

    #[test]
    fn test_unknown_and_duplicate_registries() {
        let unknown = Config {
            registries: vec!["iana".to_string()],
            ..Default::default()
        };
        assert!(matches!(unknown.validate(), Err(ValidationError::InvalidRegistry(_))));

        let duplicate = Config {
            registries: vec!["ripencc".to_string(), "RIPE".to_string()],
            ..Default::default()
        };
        assert!(matches!(duplicate.validate(), Err(ValidationError::InvalidRegistry(_))));

        let empty = Config {
            registries: Vec::new(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_invalid_loader_and_output() {
        let config = Config {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidLoader(_))));

        let mut config = Config::default();
        config.output.table = "ip table; DROP".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidOutput(_))));

        // Table names do not matter for JSON output
        config.output.format = OutputFormat::JsonLines;
        assert!(config.validate().is_ok());
    }
}
