//! Engine configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! mainnet configuration:
//!
//! ```toml
//! chain_id = 1
//! verifying_contract = "0xdef1c0ded9bec7f1a1670819833240f027b25eff"
//! protocol_fee_multiplier = 70000
//! max_batch_size = 256
//! ```

use std::path::Path;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::types::{Eip712Domain, NATIVE_TOKEN};

const DEFAULT_VERIFYING_CONTRACT: Address = address!("def1c0ded9bec7f1a1670819833240f027b25eff");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain id bound into every order hash
    pub chain_id: u64,

    /// Exchange address: the signing-domain contract and the account holding
    /// attached native value and quote escrow during a call
    pub verifying_contract: Address,

    /// Protocol fee per limit-order fill, as a multiple of the gas price
    pub protocol_fee_multiplier: u32,

    /// Sentinel standing for the native asset
    pub native_token: Address,

    /// Maximum number of items in one batch or quote call
    pub max_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            verifying_contract: DEFAULT_VERIFYING_CONTRACT,
            protocol_fee_multiplier: 70_000,
            native_token: NATIVE_TOKEN,
            max_batch_size: 256,
        }
    }
}

impl EngineConfig {
    /// Load from file, then apply `FILL_ENGINE_*` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw) = std::env::var("FILL_ENGINE_CHAIN_ID") {
            debug!("Overriding chain id from environment");
            self.chain_id = raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("FILL_ENGINE_CHAIN_ID={raw}")))?;
        }
        if let Ok(raw) = std::env::var("FILL_ENGINE_VERIFYING_CONTRACT") {
            debug!("Overriding verifying contract from environment");
            self.verifying_contract = raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("FILL_ENGINE_VERIFYING_CONTRACT={raw}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must be non-zero".into()));
        }
        if self.verifying_contract == Address::ZERO {
            return Err(ConfigError::Invalid("verifying_contract must be set".into()));
        }
        if self.native_token == Address::ZERO {
            return Err(ConfigError::Invalid("native_token must be set".into()));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("max_batch_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Signing domain derived from this configuration
    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::exchange(self.chain_id, self.verifying_contract)
    }
}
