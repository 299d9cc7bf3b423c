//! ## sluss-config
//! **Scenario file model**
//!
//! Loads and validates declarative YAML scenario fixtures: global
//! settings, token and topology configuration, and the recursive
//! serial/parallel task tree. Loading follows a layered hierarchy:
//!
//! 1. The scenario file itself.
//! 2. `SLUSS_*` environment variable overrides (`__`-separated paths).
//!
//! The parsed [`ScenarioFile`] is immutable after load; structural
//! validation ([`validate_structure`]) rejects task references to nodes
//! outside the topology before anything is provisioned.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;
use validator::Validate;

mod error;
mod settings;
mod task;
mod validation;

pub use error::ConfigError;
pub use settings::{
    GasPrice, NodeMode, NodesConfig, PfsServiceConfig, ServicesConfig, Settings, TokenConfig,
    UdcConfig, UdcTokenConfig,
};
pub use task::{
    AssertTask, ChannelTask, LeaveTask, PfsHistoryTask, PfsIouTask, TaskKind, TaskNode,
    TransferTask,
};
pub use validation::validate_structure;

/// A complete scenario definition. Immutable after load.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScenarioFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    #[validate(nested)]
    pub settings: Settings,
    #[serde(default)]
    pub token: TokenConfig,
    #[validate(nested)]
    pub nodes: NodesConfig,
    pub scenario: TaskNode,
}

fn default_version() -> u32 {
    2
}

impl ScenarioFile {
    /// Load a scenario from `path`, merging `SLUSS_*` environment
    /// overrides, then validate settings.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SLUSS_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|scenario: Self| {
                scenario.validate()?;
                Ok(scenario)
            })
    }

    /// Parse a scenario from an in-memory YAML string (used by tests and
    /// embedded fixtures).
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|scenario: Self| {
                scenario.validate()?;
                Ok(scenario)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
version: 2
settings:
  chain: any
  services:
    pfs:
      url: https://pfs.example.test
token:
  balance_fund: 10_000_000_000_000_000_000
nodes:
  count: 5
scenario:
  serial:
    tasks:
      - open_channel: {from: 0, to: 1, total_deposit: 1_000_000_000_000_000_000}
      - transfer: {from: 0, to: 1, amount: 1_000_000_000_000_000}
      - assert: {from: 0, to: 1, balance: 999_000_000_000_000_000, state: opened}
"#;

    #[test]
    fn loads_minimal_scenario() {
        let scenario = ScenarioFile::from_yaml(MINIMAL).expect("scenario loads");
        assert_eq!(scenario.version, 2);
        assert_eq!(scenario.nodes.count, 5);
        assert_eq!(scenario.token.balance_fund, Some(10 * 10u128.pow(18)));
        assert_eq!(scenario.scenario.leaf_count(), 3);
        assert_eq!(
            scenario.settings.services.pfs.unwrap().url,
            "https://pfs.example.test"
        );
    }

    #[test]
    fn version_defaults_when_absent() {
        let scenario =
            ScenarioFile::from_yaml("nodes:\n  count: 1\nscenario:\n  wait: 1\n").unwrap();
        assert_eq!(scenario.version, 2);
    }

    #[test]
    fn missing_file_reports_file_not_found() {
        let err = ScenarioFile::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn invalid_settings_fail_validation() {
        let yaml = "settings:\n  poll_interval_ms: 0\nnodes:\n  count: 1\nscenario:\n  wait: 1\n";
        let err = ScenarioFile::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
