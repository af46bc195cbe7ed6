//! Engine tuning knobs
//!
//! Defaults mirror the deployed stableswap contract. Historical contract
//! versions differ in both the Newton-Raphson iteration bound and the `Ann`
//! coefficient, so both are configurable and must be matched to the contract
//! being previewed.

use crate::error::ValidationError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the amplifier is scaled into the invariant's `Ann` term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplifierForm {
    /// `Ann = A * n` (classic two-coin Curve)
    #[default]
    PerCoin,
    /// `Ann = A * n^n`
    PowN,
}

impl AmplifierForm {
    pub fn multiplier(&self) -> u64 {
        match self {
            AmplifierForm::PerCoin => 2,
            AmplifierForm::PowN => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StableswapConfig {
    /// Newton-Raphson bound for the invariant solver
    pub max_iterations: usize,
    pub amplifier_form: AmplifierForm,
}

impl Default for StableswapConfig {
    fn default() -> Self {
        Self {
            max_iterations: 255,
            amplifier_form: AmplifierForm::PerCoin,
        }
    }
}

/// Probe swap used to estimate stableswap prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceProbeConfig {
    /// Extra attempts after a non-converging probe
    pub retries: u32,
    /// First probe is the smaller reserve divided by this
    pub initial_divisor: u128,
    /// Each retry divides the probe by this
    pub retry_divisor: u128,
    /// Reserves are scaled up by powers of ten until the first probe is at
    /// least this many units, so rounding cannot swamp the price
    pub min_probe: u128,
}

impl Default for PriceProbeConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            initial_divisor: 1_000_000,
            retry_divisor: 10,
            min_probe: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stableswap: StableswapConfig,
    pub price_probe: PriceProbeConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine configuration {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid engine configuration in {}", path.display()))
    }

    /// Also run by every calculator built from this config
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let reason = if self.stableswap.max_iterations == 0 {
            "stableswap.max_iterations must be at least 1"
        } else if self.price_probe.initial_divisor < 2 || self.price_probe.retry_divisor < 2 {
            "price_probe divisors must be at least 2"
        } else if self.price_probe.min_probe == 0 {
            "price_probe.min_probe must be at least 1"
        } else {
            return Ok(());
        };
        Err(ValidationError::InvalidConfig { reason })
    }
}
