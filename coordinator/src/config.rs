//! Coordinator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::CoordinatorError;

/// Experiment parameters and coordinator settings.
///
/// Node/committee counts and adversary divisors drive committee assignment.
/// Block size, users, coins, throughput and round delta are passed through
/// to genesis and to the transaction generator unmodified.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Total number of nodes (N). Bootstrap waits for exactly this many.
    #[serde(default = "default_nodes")]
    pub nodes: usize,

    /// Number of committees (M).
    #[serde(default = "default_committees")]
    pub committees: usize,

    /// Aggregate adversary tolerance as a divisor (1/x of all nodes).
    #[serde(default = "default_total_adversary_divisor")]
    pub total_adversary_divisor: usize,

    /// Per-committee adversary tolerance as a divisor (1/x of a committee).
    #[serde(default = "default_committee_adversary_divisor")]
    pub committee_adversary_divisor: usize,

    /// Block size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Synthetic users credited at genesis.
    #[serde(default = "default_users")]
    pub users: usize,

    /// Coins split across the genesis users.
    #[serde(default = "default_total_coins")]
    pub total_coins: u64,

    /// Target transactions per second for the generator.
    #[serde(default = "default_tps")]
    pub tps: u64,

    /// Round delta in milliseconds. Telemetry flushes wait three deltas.
    #[serde(default = "default_delta_ms")]
    pub delta_ms: u64,

    /// First port used by node instances.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Coordination port for bootstrap and telemetry.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Directory for the result streams.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Seed for shuffling, committee ids and genesis randomness.
    /// Derived from the wall clock when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Abort bootstrap if registration or broadcast takes longer than this.
    /// Absent means wait indefinitely.
    #[serde(default)]
    pub bootstrap_timeout_secs: Option<u64>,

    /// Capacity of the finalized-block channel (defaults to 2·M).
    #[serde(default)]
    pub final_block_capacity: Option<usize>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_nodes() -> usize {
    16
}

fn default_committees() -> usize {
    2
}

fn default_total_adversary_divisor() -> usize {
    3
}

fn default_committee_adversary_divisor() -> usize {
    2
}

fn default_block_size() -> usize {
    1 << 20
}

fn default_users() -> usize {
    1000
}

fn default_total_coins() -> u64 {
    1_000_000
}

fn default_tps() -> u64 {
    100
}

fn default_delta_ms() -> u64 {
    500
}

fn default_base_port() -> u16 {
    9000
}

fn default_listen_port() -> u16 {
    8080
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoordinatorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CoordinatorError> {
        toml::from_str(s).map_err(|e| CoordinatorError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("CoordinatorConfig is always serializable to TOML")
    }

    /// Reject parameter sets committee assignment cannot work with.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.committees == 0 {
            return Err(CoordinatorError::InvalidParameters(
                "committee count must be positive".into(),
            ));
        }
        if self.nodes < self.committees {
            return Err(CoordinatorError::InvalidParameters(format!(
                "{} nodes cannot fill {} committees",
                self.nodes, self.committees
            )));
        }
        if self.total_adversary_divisor == 0 || self.committee_adversary_divisor == 0 {
            return Err(CoordinatorError::InvalidParameters(
                "adversary divisors must be positive".into(),
            ));
        }
        if self
            .committee_adversary_divisor
            .checked_mul(self.total_adversary_divisor)
            .is_none()
        {
            return Err(CoordinatorError::InvalidParameters(format!(
                "adversary divisors {} x {} overflow",
                self.committee_adversary_divisor, self.total_adversary_divisor
            )));
        }
        Ok(())
    }

    /// Delay before flushing a telemetry record (three round deltas).
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.delta_ms.saturating_mul(3))
    }

    pub fn bootstrap_timeout(&self) -> Option<Duration> {
        self.bootstrap_timeout_secs.map(Duration::from_secs)
    }

    pub fn final_block_capacity(&self) -> usize {
        self.final_block_capacity
            .unwrap_or(self.committees.saturating_mul(2))
            .max(1)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            committees: default_committees(),
            total_adversary_divisor: default_total_adversary_divisor(),
            committee_adversary_divisor: default_committee_adversary_divisor(),
            block_size: default_block_size(),
            users: default_users(),
            total_coins: default_total_coins(),
            tps: default_tps(),
            delta_ms: default_delta_ms(),
            base_port: default_base_port(),
            listen_port: default_listen_port(),
            results_dir: default_results_dir(),
            seed: None,
            bootstrap_timeout_secs: None,
            final_block_capacity: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
