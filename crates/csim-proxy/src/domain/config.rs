//! Proxy configuration with validation.
//!
//! Values are opaque inputs to construction. The executable loads them from
//! TOML; tests build them in code.

use csim_sharding::ShardId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Server, timeout and cache settings
    pub general_settings: GeneralSettingsConfig,
    /// Optional processors and background loops
    pub features: FeaturesConfig,
    /// Observer nodes, in dispatch preference order per shard
    pub observers: Vec<NodeConfig>,
    /// Full-history nodes (may be empty)
    pub full_history_nodes: Vec<NodeConfig>,
    /// Registered API versions
    pub api_versions: ApiVersionsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl ProxyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let general = &self.general_settings;

        if general.request_timeout_sec == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout_sec cannot be 0".into(),
            ));
        }

        for (name, value) in [
            (
                "heartbeat_cache_validity_duration_sec",
                general.heartbeat_cache_validity_duration_sec,
            ),
            (
                "val_stats_cache_validity_duration_sec",
                general.val_stats_cache_validity_duration_sec,
            ),
            (
                "economics_metrics_cache_validity_duration_sec",
                general.economics_metrics_cache_validity_duration_sec,
            ),
            ("node_sync_check_interval_sec", general.node_sync_check_interval_sec),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidCacheValidity(format!(
                    "{} cannot be 0",
                    name
                )));
            }
        }

        if general.rate_limit_requests_per_window > 0
            && general.rate_limit_window_duration_seconds == 0
        {
            return Err(ConfigError::InvalidRateLimit(
                "rate_limit_window_duration_seconds cannot be 0 when a budget is set".into(),
            ));
        }

        if self.observers.is_empty() {
            return Err(ConfigError::NoObservers);
        }

        for node in self.observers.iter().chain(self.full_history_nodes.iter()) {
            if node.address.trim().is_empty() {
                return Err(ConfigError::InvalidNode(format!(
                    "empty address for shard {}",
                    node.shard_id
                )));
            }
        }

        if self.features.faucet_enabled && self.features.faucet_value.parse::<u128>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "faucet_value `{}` is not a decimal amount",
                self.features.faucet_value
            )));
        }

        self.api_versions.validate()
    }

    /// Get HTTP server bind address
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.general_settings.server_host, self.general_settings.server_port)
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettingsConfig {
    /// Bind address
    pub server_host: IpAddr,
    /// Port (default: 8085, 0 picks an ephemeral port)
    pub server_port: u16,
    /// Timeout for a single observer call
    pub request_timeout_sec: u64,
    /// Validity of the heartbeat cache
    pub heartbeat_cache_validity_duration_sec: u64,
    /// Validity of the validator statistics cache
    pub val_stats_cache_validity_duration_sec: u64,
    /// Validity of the economics metrics cache
    pub economics_metrics_cache_validity_duration_sec: u64,
    /// Rate limiter window
    pub rate_limit_window_duration_seconds: u64,
    /// Requests allowed per client IP per window (0 disables rate limiting)
    pub rate_limit_requests_per_window: u32,
    /// Interval between observer sync probes
    pub node_sync_check_interval_sec: u64,
    /// Allow fetching the whole transaction pool
    pub allow_entire_tx_pool_fetch: bool,
}

impl Default for GeneralSettingsConfig {
    fn default() -> Self {
        Self {
            server_host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            server_port: 8085,
            request_timeout_sec: 10,
            heartbeat_cache_validity_duration_sec: 25,
            val_stats_cache_validity_duration_sec: 60,
            economics_metrics_cache_validity_duration_sec: 600,
            rate_limit_window_duration_seconds: 60,
            rate_limit_requests_per_window: 0,
            node_sync_check_interval_sec: 5,
            allow_entire_tx_pool_fetch: false,
        }
    }
}

impl GeneralSettingsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn heartbeat_cache_validity(&self) -> Duration {
        Duration::from_secs(self.heartbeat_cache_validity_duration_sec)
    }

    pub fn val_stats_cache_validity(&self) -> Duration {
        Duration::from_secs(self.val_stats_cache_validity_duration_sec)
    }

    pub fn economics_metrics_cache_validity(&self) -> Duration {
        Duration::from_secs(self.economics_metrics_cache_validity_duration_sec)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_duration_seconds)
    }

    pub fn node_sync_check_interval(&self) -> Duration {
        Duration::from_secs(self.node_sync_check_interval_sec)
    }
}

/// Feature switches for processors and loops whose production status is
/// undecided upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Enable the faucet endpoint
    pub faucet_enabled: bool,
    /// Amount credited per faucet call (decimal, smallest denomination)
    pub faucet_value: String,
    /// Refresh the heartbeat cache in the background instead of on demand
    pub heartbeat_cache_refresh: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            faucet_enabled: false,
            faucet_value: "0".to_string(),
            heartbeat_cache_refresh: false,
        }
    }
}

/// One observer or full-history node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Shard served by the node (4294967295 for the metachain)
    pub shard_id: ShardId,
    /// Base URL, e.g. `http://127.0.0.1:55801`
    pub address: String,
    /// Node keeps no state snapshots
    #[serde(default)]
    pub is_snapshotless: bool,
}

/// Registered API versions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiVersionsConfig {
    /// Version used for unversioned and unknown-version requests
    pub default_version: String,
    /// All registered versions
    pub versions: Vec<ApiVersionConfig>,
}

impl Default for ApiVersionsConfig {
    fn default() -> Self {
        Self {
            default_version: "v1_0".to_string(),
            versions: vec![
                ApiVersionConfig {
                    name: "v1_0".to_string(),
                    disabled_groups: Vec::new(),
                },
                ApiVersionConfig {
                    name: "v_next".to_string(),
                    disabled_groups: Vec::new(),
                },
            ],
        }
    }
}

impl ApiVersionsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.versions.is_empty() {
            return Err(ConfigError::InvalidVersions("no API version registered".into()));
        }

        let mut names = HashSet::new();
        for version in &self.versions {
            if version.name.is_empty() || version.name.contains('/') {
                return Err(ConfigError::InvalidVersions(format!(
                    "invalid version name `{}`",
                    version.name
                )));
            }
            if !names.insert(version.name.as_str()) {
                return Err(ConfigError::InvalidVersions(format!(
                    "duplicate version `{}`",
                    version.name
                )));
            }
        }

        if !names.contains(self.default_version.as_str()) {
            return Err(ConfigError::InvalidVersions(format!(
                "default version `{}` is not registered",
                self.default_version
            )));
        }

        Ok(())
    }
}

/// One API version and the endpoint groups it leaves out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersionConfig {
    pub name: String,
    #[serde(default)]
    pub disabled_groups: Vec<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            max_age: 86400, // 24 hours
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// No observer configured at all
    #[error("no observers configured")]
    NoObservers,
    /// Invalid observer or full-history node entry
    #[error("invalid node: {0}")]
    InvalidNode(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid cache validity
    #[error("invalid cache validity: {0}")]
    InvalidCacheValidity(String),
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid API versions section
    #[error("invalid API versions: {0}")]
    InvalidVersions(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use csim_sharding::METACHAIN_SHARD_ID;

    fn test_config() -> ProxyConfig {
        ProxyConfig {
            observers: vec![
                NodeConfig {
                    shard_id: 0,
                    address: "http://127.0.0.1:55801".into(),
                    is_snapshotless: false,
                },
                NodeConfig {
                    shard_id: METACHAIN_SHARD_ID,
                    address: "http://127.0.0.1:55802".into(),
                    is_snapshotless: false,
                },
            ],
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let config = test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_addr().port(), 8085);
        assert_eq!(
            config.general_settings.request_timeout(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_no_observers() {
        let config = ProxyConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoObservers)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = test_config();
        config.general_settings.request_timeout_sec = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_zero_cache_validity_rejected() {
        let mut config = test_config();
        config.general_settings.val_stats_cache_validity_duration_sec = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCacheValidity(_))
        ));
    }

    #[test]
    fn test_unregistered_default_version() {
        let mut config = test_config();
        config.api_versions.default_version = "v9_9".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVersions(_))
        ));
    }

    #[test]
    fn test_duplicate_version() {
        let mut config = test_config();
        config.api_versions.versions.push(ApiVersionConfig {
            name: "v1_0".into(),
            disabled_groups: vec![],
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVersions(_))
        ));
    }

    #[test]
    fn test_faucet_value_must_parse() {
        let mut config = test_config();
        config.features.faucet_enabled = true;
        config.features.faucet_value = "ten".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rate_limit_window_required() {
        let mut config = test_config();
        config.general_settings.rate_limit_requests_per_window = 10;
        config.general_settings.rate_limit_window_duration_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRateLimit(_))
        ));
    }
}
