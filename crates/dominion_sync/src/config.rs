//! Runtime settings for a cluster node.
//!
//! Settings are plain serde structs with sensible defaults so a partial
//! TOML file works; embedding code may also build them directly.

use serde::{Deserialize, Serialize};

/// Which message broker transport a node connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrokerType {
    /// In-process channel hub; for tests and single-process clusters.
    #[default]
    Channel,
    /// Redis pub/sub; for real multi-process clusters.
    Redis,
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for cross-server synchronization. When off, the node
    /// never connects a broker and all sends quietly do nothing.
    pub cross_server: bool,
    pub server: ServerSettings,
    pub cluster: ClusterSettings,
    pub broker: BrokerSettings,
    pub levels: LevelSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cross_server: true,
            server: ServerSettings::default(),
            cluster: ClusterSettings::default(),
            broker: BrokerSettings::default(),
            levels: LevelSettings::default(),
        }
    }
}

/// Identity of this server within the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Unique name of this server; receivers drop messages stamped with
    /// their own name, so two servers must never share one.
    pub name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "server".to_string(),
        }
    }
}

/// Cluster membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Cluster id, part of the broker subchannel name. Nodes in different
    /// clusters share infrastructure without mixing traffic.
    pub id: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            id: "main".to_string(),
        }
    }
}

/// Broker transport selection and connection details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BrokerSettings {
    pub kind: BrokerType,
    pub redis: RedisSettings,
}

/// Connection details for the Redis transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Town level progression costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    /// Cost of reaching level 2; each further level doubles it.
    pub base_cost: i64,
    pub max_level: u32,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            base_cost: 1000,
            max_level: 20,
        }
    }
}

impl LevelSettings {
    /// The balance a town must spend to reach `level`.
    pub fn cost(&self, level: u32) -> i64 {
        self.base_cost << level.saturating_sub(2).min(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let settings = Settings::default();
        let serialized = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            [server]
            name = "alpha"

            [broker]
            kind = "redis"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.name, "alpha");
        assert_eq!(parsed.broker.kind, BrokerType::Redis);
        assert_eq!(parsed.cluster.id, "main");
        assert!(parsed.cross_server);
    }

    #[test]
    fn level_costs_double_per_level() {
        let levels = LevelSettings::default();
        assert_eq!(levels.cost(2), 1000);
        assert_eq!(levels.cost(3), 2000);
        assert_eq!(levels.cost(5), 8000);
    }
}
