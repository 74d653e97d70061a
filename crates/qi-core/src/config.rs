use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_QI, DEFAULT_MAX_TALISMANS, DEFAULT_PARTIAL_RATIO, TALISMAN_SLOTS,
};
use crate::error::ConfigError;

/// Tunable engine parameters. Every field has a default, so a partial TOML
/// table is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Qi every node starts with.
    pub base_qi: f64,
    /// Share of a combination's score granted when it does not transform.
    pub partial_ratio: f64,
    /// Use the natal month branch for seasonal lookups when the input names
    /// no reference month.
    pub season_from_natal_month: bool,
    pub max_talismans: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_qi: DEFAULT_BASE_QI,
            partial_ratio: DEFAULT_PARTIAL_RATIO,
            season_from_natal_month: false,
            max_talismans: DEFAULT_MAX_TALISMANS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_qi.is_finite() || self.base_qi <= 0.0 {
            return Err(ConfigError::BaseQi(self.base_qi));
        }
        if !(0.0..=1.0).contains(&self.partial_ratio) {
            return Err(ConfigError::PartialRatio(self.partial_ratio));
        }
        if self.max_talismans > TALISMAN_SLOTS {
            return Err(ConfigError::MaxTalismans(self.max_talismans));
        }
        Ok(())
    }
}
