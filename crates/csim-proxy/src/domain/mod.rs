//! Domain layer: configuration, errors and wire types.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ApiVersionConfig, ApiVersionsConfig, ConfigError, CorsConfig, FeaturesConfig,
    GeneralSettingsConfig, NodeConfig, ProxyConfig,
};
pub use error::{
    ApiError, CloseError, FacadeError, LifecycleError, ObserverError, ProxyError, ProxyResult,
    SimulatorError, TransportError,
};
pub use types::*;
