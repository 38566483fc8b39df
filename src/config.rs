//! Optional YAML settings file.
//!
//! Any key may be omitted; command-line flags take precedence over the file.
//!
//! ```yaml
//! endpoint: http://localhost:5000/api/upload
//! timeout_secs: 30
//! mode: lenient
//! report_column: age
//! sql_layout: users
//! ```

use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    sql::SqlLayout,
    storage::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT},
    transform::TransformMode,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaverConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub mode: TransformMode,
    pub report_column: Option<String>,
    pub sql_layout: SqlLayout,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            mode: TransformMode::default(),
            report_column: None,
            sql_layout: SqlLayout::default(),
        }
    }
}

impl WeaverConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: WeaverConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: WeaverConfig = serde_yaml::from_str(raw).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.endpoint.trim().is_empty(),
            "Config 'endpoint' must not be empty"
        );
        ensure!(
            self.timeout_secs > 0,
            "Config 'timeout_secs' must be greater than zero"
        );
        if let Some(column) = &self.report_column {
            ensure!(
                !column.trim().is_empty(),
                "Config 'report_column' must not be blank"
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = WeaverConfig::from_yaml_str("mode: strict\nsql_layout: flexible\n")
            .expect("config");
        assert_eq!(config.mode, TransformMode::Strict);
        assert_eq!(config.sql_layout, SqlLayout::Flexible);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(WeaverConfig::from_yaml_str("endpiont: http://x\n").is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = WeaverConfig::from_yaml_str("timeout_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }
}
