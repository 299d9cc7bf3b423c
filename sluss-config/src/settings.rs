//! Scenario-global settings: chain selector, gas policy, external service
//! endpoints, and the timing knobs used by the poller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sluss_core::{amount, Amount};
use validator::Validate;

/// `settings:` block of a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Chain selector, e.g. `goerli`.
    pub chain: Option<String>,
    pub gas_price: Option<GasPrice>,
    #[validate(nested)]
    pub services: ServicesConfig,

    /// Interval between poll attempts for `assert*` and `wait_blocks`.
    #[validate(range(min = 1, message = "poll interval must be at least 1ms"))]
    pub poll_interval_ms: u64,
    /// Deadline for every poll-based task.
    #[validate(range(min = 1, message = "task timeout must be at least 1ms"))]
    pub task_timeout_ms: u64,
    /// Length of one `wait:` time-unit.
    #[validate(range(min = 1, message = "wait unit must be at least 1ms"))]
    pub wait_unit_ms: u64,
    /// Expected block interval, used to budget `wait_blocks` deadlines.
    #[validate(range(min = 1, message = "block time must be at least 1ms"))]
    pub block_time_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chain: None,
            gas_price: None,
            services: ServicesConfig::default(),
            poll_interval_ms: 500,
            task_timeout_ms: 200_000,
            wait_unit_ms: 1_000,
            block_time_ms: 15_000,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn wait_unit(&self) -> Duration {
        Duration::from_millis(self.wait_unit_ms)
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

/// Gas price policy: a named strategy (`fast`, `medium`) or a fixed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GasPrice {
    Fixed(u64),
    Named(String),
}

/// `settings.services` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServicesConfig {
    #[validate(nested)]
    pub pfs: Option<PfsServiceConfig>,
    #[validate(nested)]
    pub udc: Option<UdcConfig>,
}

/// Path-finding service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PfsServiceConfig {
    #[validate(url(message = "pfs url must be a well-formed URL"))]
    pub url: String,
}

/// User-deposit contract: pre-funding of service fees during provisioning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UdcConfig {
    pub enable: bool,
    pub address: Option<String>,
    pub token: Option<UdcTokenConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UdcTokenConfig {
    /// Deposit service-fee collateral for every node during provisioning.
    pub deposit: bool,
    #[serde(deserialize_with = "amount::deserialize_opt")]
    pub balance_per_node: Option<Amount>,
}

/// `token:` block: the transferred token's on-chain identity and initial
/// funding per node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub address: Option<String>,
    #[serde(deserialize_with = "amount::deserialize_opt")]
    pub balance_fund: Option<Amount>,
}

/// `nodes:` block: topology size and per-node option overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodesConfig {
    #[serde(default)]
    pub mode: NodeMode,
    #[validate(range(min = 1, message = "topology needs at least one node"))]
    pub count: usize,
    #[serde(default)]
    pub default_options: serde_yaml::Mapping,
    #[serde(default)]
    pub node_options: std::collections::BTreeMap<usize, serde_yaml::Mapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    /// Node processes are provisioned and controlled by the runner.
    #[default]
    Managed,
    /// Nodes are already running; lifecycle tasks are rejected.
    External,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        Settings::default().validate().expect("defaults validate");
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn gas_price_accepts_named_and_fixed() {
        let named: GasPrice = serde_yaml::from_str("fast").unwrap();
        assert_eq!(named, GasPrice::Named("fast".into()));
        let fixed: GasPrice = serde_yaml::from_str("20000000000").unwrap();
        assert_eq!(fixed, GasPrice::Fixed(20_000_000_000));
    }

    #[test]
    fn services_block_parses_pfs_url() {
        let services: ServicesConfig = serde_yaml::from_str(
            "pfs:\n  url: https://pfs.example.test\nudc:\n  enable: true\n  token:\n    deposit: true\n",
        )
        .unwrap();
        assert_eq!(services.pfs.unwrap().url, "https://pfs.example.test");
        let udc = services.udc.unwrap();
        assert!(udc.enable);
        assert!(udc.token.unwrap().deposit);
    }
}
