//! Configuration for the trust layer.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file ->
//! environment. Environment variables are prefixed `AEGIS_` with `__` as
//! the section separator, e.g. `AEGIS_EXPLAINER__TOP_K_FEATURES=3`.

use crate::explain::ExplainerConfig;
use crate::evidence::PackFormat;
use crate::signer::REPLAY_WINDOW_MINUTES;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the trust layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AegisConfig {
    pub explainer: ExplainerConfig,
    pub signer: SignerConfig,
    pub evidence: EvidenceConfig,
}

/// Signing and verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Replay window in seconds; operations older than this fail
    /// verification regardless of signature validity.
    pub replay_window_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            replay_window_secs: (REPLAY_WINDOW_MINUTES * 60) as u64,
        }
    }
}

impl SignerConfig {
    /// The replay window as a `chrono` duration.
    pub fn replay_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.replay_window_secs as i64)
    }
}

/// Evidence pack settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceConfig {
    /// Format used when a pack request does not specify one.
    pub default_format: PackFormat,
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Load configuration: defaults, merged with an optional TOML file,
/// merged with `AEGIS_`-prefixed environment variables.
pub fn load_config(config_file: Option<&Path>) -> Result<AegisConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AegisConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("AEGIS_").split("__"));
    figment.extract().map_err(|e| ConfigError::Figment(Box::new(e)))
}
