//! Node configuration: the proxy sections plus `[simulator]` and `[logs]`,
//! loaded from one TOML file and overridable from the command line.

use csim_proxy::domain::ConfigError;
use csim_proxy::ProxyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum NodeConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid simulator configuration: {0}")]
    Simulator(String),

    #[error(transparent)]
    Proxy(#[from] ConfigError),
}

/// Whole node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeAppConfig {
    #[serde(flatten)]
    pub proxy: ProxyConfig,
    pub simulator: SimulatorConfig,
    pub logs: LogsConfig,
}

/// In-memory chain simulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Regular shards, metachain excluded
    pub num_of_shards: u32,
    pub rounds_per_epoch: u64,
    pub round_duration_in_milliseconds: u64,
    pub initial_round: i64,
    pub initial_nonce: u64,
    pub initial_epoch: u32,
    /// Produce a block every `block_time_in_milliseconds`
    pub auto_generate_blocks: bool,
    pub block_time_in_milliseconds: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_of_shards: 3,
            rounds_per_epoch: 20,
            round_duration_in_milliseconds: 6000,
            initial_round: 0,
            initial_nonce: 0,
            initial_epoch: 0,
            auto_generate_blocks: false,
            block_time_in_milliseconds: 6000,
        }
    }
}

impl SimulatorConfig {
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_in_milliseconds)
    }

    fn validate(&self) -> Result<(), NodeConfigError> {
        if self.num_of_shards == 0 {
            return Err(NodeConfigError::Simulator(
                "num_of_shards must be at least 1".into(),
            ));
        }
        if self.rounds_per_epoch == 0 {
            return Err(NodeConfigError::Simulator(
                "rounds_per_epoch cannot be 0".into(),
            ));
        }
        if self.auto_generate_blocks && self.block_time_in_milliseconds == 0 {
            return Err(NodeConfigError::Simulator(
                "block_time_in_milliseconds cannot be 0 with auto_generate_blocks".into(),
            ));
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// `EnvFilter` directive, `RUST_LOG` wins when set
    pub level: String,
    /// JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Command line values taking precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server_port: Option<u16>,
    pub num_of_shards: Option<u32>,
    pub log_level: Option<String>,
}

impl NodeAppConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, NodeConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| NodeConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| NodeConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(port) = overrides.server_port {
            self.proxy.general_settings.server_port = port;
        }
        if let Some(shards) = overrides.num_of_shards {
            self.simulator.num_of_shards = shards;
        }
        if let Some(level) = &overrides.log_level {
            self.logs.level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.simulator.validate()?;
        self.proxy.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csim_sharding::METACHAIN_SHARD_ID;
    use std::io::Write;

    const SAMPLE: &str = r#"
[general_settings]
server_port = 8085
request_timeout_sec = 5
rate_limit_requests_per_window = 0

[features]
faucet_enabled = true
faucet_value = "1000000000000000000"

[[observers]]
shard_id = 0
address = "http://127.0.0.1:55801"

[[observers]]
shard_id = 4294967295
address = "http://127.0.0.1:55802"
is_snapshotless = true

[api_versions]
default_version = "v1_0"

[[api_versions.versions]]
name = "v1_0"

[[api_versions.versions]]
name = "v_next"
disabled_groups = ["proof"]

[simulator]
num_of_shards = 1
rounds_per_epoch = 10
auto_generate_blocks = true
block_time_in_milliseconds = 500

[logs]
level = "debug"
json = true
"#;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(SAMPLE);
        let config = NodeAppConfig::load(file.path()).unwrap();

        assert_eq!(config.proxy.general_settings.server_port, 8085);
        assert_eq!(config.proxy.general_settings.request_timeout_sec, 5);
        assert!(config.proxy.features.faucet_enabled);
        assert_eq!(config.proxy.observers.len(), 2);
        assert_eq!(config.proxy.observers[1].shard_id, METACHAIN_SHARD_ID);
        assert!(config.proxy.observers[1].is_snapshotless);
        assert_eq!(config.proxy.api_versions.versions[1].disabled_groups, vec!["proof"]);
        assert_eq!(config.simulator.num_of_shards, 1);
        assert_eq!(config.simulator.block_time(), Duration::from_millis(500));
        assert_eq!(config.logs.level, "debug");
        assert!(config.logs.json);

        config.validate().unwrap();
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/config.toml");
        let config = NodeAppConfig::load(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.simulator.num_of_shards, 3);
        assert_eq!(config.proxy.observers.len(), 4);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = NodeAppConfig::from_toml("").unwrap();
        assert_eq!(config.simulator.num_of_shards, 3);
        assert_eq!(config.logs.level, "info");
        assert_eq!(config.proxy.api_versions.default_version, "v1_0");

        // no observers configured
        assert!(matches!(
            config.validate(),
            Err(NodeConfigError::Proxy(ConfigError::NoObservers))
        ));
    }

    #[test]
    fn test_cli_overrides_win() {
        let file = write_config(SAMPLE);
        let mut config = NodeAppConfig::load(file.path()).unwrap();
        config.apply_overrides(&CliOverrides {
            server_port: Some(9000),
            num_of_shards: None,
            log_level: Some("warn".into()),
        });

        assert_eq!(config.proxy.general_settings.server_port, 9000);
        assert_eq!(config.simulator.num_of_shards, 1);
        assert_eq!(config.logs.level, "warn");
    }

    #[test]
    fn test_invalid_simulator_settings() {
        let mut config = NodeAppConfig::from_toml(SAMPLE).unwrap();
        config.simulator.rounds_per_epoch = 0;
        assert!(matches!(config.validate(), Err(NodeConfigError::Simulator(_))));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodeAppConfig::load(&dir.path().join("absent.toml")),
            Err(NodeConfigError::Read { .. })
        ));

        let file = write_config("[simulator\nnum_of_shards = ");
        assert!(matches!(
            NodeAppConfig::load(file.path()),
            Err(NodeConfigError::Parse { .. })
        ));
    }
}
