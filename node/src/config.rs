//! Launcher configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use crate::NodeError;

/// Where the coordinator runs relative to the nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyMode {
    /// Coordinator on this host.
    #[default]
    Local,
    /// Coordinator elsewhere; its address must be given explicitly.
    Remote,
}

impl TopologyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }

    /// Default coordinator address for this mode, if it has one.
    pub fn default_coordinator(&self, port: u16) -> Option<SocketAddr> {
        match self {
            Self::Local => Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)),
            Self::Remote => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeLauncherConfig {
    /// Node instances started by this process.
    #[serde(default = "default_instances")]
    pub instances: usize,

    /// Port of the first instance; instance `i` advertises `base_port + i`.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Coordination endpoint for bootstrap and telemetry.
    #[serde(default = "default_coordinator")]
    pub coordinator: SocketAddr,

    #[serde(default)]
    pub mode: TopologyMode,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_instances() -> usize {
    4
}

fn default_base_port() -> u16 {
    9000
}

fn default_coordinator() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080)
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeLauncherConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeLauncherConfig is always serializable to TOML")
    }

    /// Advertised port of instance `index`.
    pub fn port_for(&self, index: usize) -> Result<u16, NodeError> {
        u16::try_from(index)
            .ok()
            .and_then(|i| self.base_port.checked_add(i))
            .ok_or_else(|| {
                NodeError::Config(format!(
                    "instance {index} overflows the port range from {}",
                    self.base_port
                ))
            })
    }
}

impl Default for NodeLauncherConfig {
    fn default() -> Self {
        Self {
            instances: default_instances(),
            base_port: default_base_port(),
            coordinator: default_coordinator(),
            mode: TopologyMode::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip_keeps_coordinator() {
        let config = NodeLauncherConfig {
            coordinator: "10.1.2.3:8080".parse().unwrap(),
            mode: TopologyMode::Remote,
            ..Default::default()
        };
        let parsed = NodeLauncherConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(parsed.coordinator, config.coordinator);
        assert_eq!(parsed.mode, TopologyMode::Remote);
    }

    #[test]
    fn toml_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.toml");
        std::fs::write(&path, "instances = 8\nbase_port = 7000\nmode = \"local\"\n").unwrap();
        let config = NodeLauncherConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.instances, 8);
        assert_eq!(config.port_for(3).unwrap(), 7003);
        assert_eq!(config.coordinator, default_coordinator());
    }

    #[test]
    fn port_overflow_is_a_config_error() {
        let config = NodeLauncherConfig {
            base_port: u16::MAX,
            ..Default::default()
        };
        assert!(config.port_for(0).is_ok());
        assert!(matches!(config.port_for(1), Err(NodeError::Config(_))));
    }

    #[test]
    fn only_local_mode_has_a_default_coordinator() {
        assert_eq!(
            TopologyMode::Local.default_coordinator(8080),
            Some(default_coordinator())
        );
        assert_eq!(TopologyMode::Remote.default_coordinator(8080), None);
        assert_eq!(TopologyMode::parse("REMOTE"), Some(TopologyMode::Remote));
        assert_eq!(TopologyMode::parse("aws"), None);
    }
}
