use std::collections::BTreeMap;
use std::path::Path;

use common_constants::MAX_STORY_ATTEMPTS;
use common_math::NumericContext;
use common_structs::{MarketParams, ReserveParams};
use multiversx_sc_scenario::api::StaticApi;
use serde::Deserialize;

use crate::errors::ConfigError;

/// Everything a run needs besides the scenarios themselves.
///
/// Read once before any scenario file runs and never changed afterwards.
///
/// ```toml
/// skip_integrity_check = false
/// max_attempts = 4
///
/// [numeric]
/// precision = 27
/// rounding = "down"
///
/// [reserves.USDC]
/// decimals = 6
/// price = "0.0005"
/// # ...
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct RunConfiguration {
    /// Only enforce revert expectations, skipping state comparison.
    #[serde(default)]
    pub skip_integrity_check: bool,
    /// Context the oracle computes with, also installed as the process
    /// default while a scenario file runs. Only the protocol's own context
    /// (27 decimals, truncating) is accepted.
    #[serde(default = "protocol_context")]
    pub numeric: NumericContext,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub reserves: BTreeMap<String, ReserveParams>,
}

fn protocol_context() -> NumericContext {
    NumericContext::PROTOCOL
}

fn default_max_attempts() -> u32 {
    MAX_STORY_ATTEMPTS
}

impl RunConfiguration {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfiguration = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Unreadable {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.numeric != NumericContext::PROTOCOL {
            return Err(ConfigError::NumericContextMismatch {
                expected: NumericContext::PROTOCOL,
                found: self.numeric,
            });
        }
        for (asset, reserve) in &self.reserves {
            reserve
                .initial_state::<StaticApi>(0)
                .map_err(|error| ConfigError::InvalidReserve {
                    asset: asset.clone(),
                    error,
                })?;
        }
        self.market_params().map(|_| ())
    }

    /// Rate strategy of every reserve, parsed at the protocol's scales.
    pub fn market_params(&self) -> Result<BTreeMap<String, MarketParams<StaticApi>>, ConfigError> {
        self.reserves
            .iter()
            .map(|(asset, reserve)| {
                reserve
                    .market_params::<StaticApi>()
                    .map(|params| (asset.clone(), params))
                    .map_err(|error| ConfigError::InvalidReserve {
                        asset: asset.clone(),
                        error,
                    })
            })
            .collect()
    }

    pub fn decimals(&self, asset: &str) -> Option<usize> {
        self.reserves.get(asset).map(|reserve| reserve.decimals)
    }
}
