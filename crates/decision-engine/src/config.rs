use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::scoring::short_term::{BIAS_ELEVATED, SHRINK_RATIO, SURGE_RATIO};

/// Thresholds for variable extraction and the override layer.
///
/// Score weights and rule thresholds are not configured here; they live in
/// the versioned weight table in [`crate::scoring`]. Defaults that mirror a
/// rule threshold are taken from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // Trend / position
    pub adx_range_threshold: f64,          // 20.0
    pub bias_high: f64,                    // +8%
    pub bias_low: f64,                     // -5%
    pub bias_deep_low: f64,                // -10%

    // Risk/reward proxies when levels are missing (percent of price)
    pub take_profit_proxy_pct: f64,        // 10%
    pub stop_loss_proxy_pct: f64,          // 5%

    // Volume
    pub volume_shrink_ratio: f64,          // 0.7
    pub volume_surge_ratio: f64,           // 2.0
    pub distribution_max_change_pct: f64,  // 1.0%

    // Gates
    pub min_risk_reward: f64,              // 1.5
    pub reversal_cooldown_points: i32,     // 30
    pub bearish_rebound_cap: i32,          // 60
    pub high_severity_level: u8,           // 4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adx_range_threshold: 20.0,
            bias_high: BIAS_ELEVATED,
            bias_low: -5.0,
            bias_deep_low: -10.0,
            take_profit_proxy_pct: 10.0,
            stop_loss_proxy_pct: 5.0,
            volume_shrink_ratio: SHRINK_RATIO,
            volume_surge_ratio: SURGE_RATIO,
            distribution_max_change_pct: 1.0,
            min_risk_reward: 1.5,
            reversal_cooldown_points: 30,
            bearish_rebound_cap: 60,
            high_severity_level: 4,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `DECISION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let config = Self {
            adx_range_threshold: env_or("DECISION_ADX_RANGE_THRESHOLD", d.adx_range_threshold)?,
            bias_high: env_or("DECISION_BIAS_HIGH", d.bias_high)?,
            bias_low: env_or("DECISION_BIAS_LOW", d.bias_low)?,
            bias_deep_low: env_or("DECISION_BIAS_DEEP_LOW", d.bias_deep_low)?,
            take_profit_proxy_pct: env_or("DECISION_TAKE_PROFIT_PROXY_PCT", d.take_profit_proxy_pct)?,
            stop_loss_proxy_pct: env_or("DECISION_STOP_LOSS_PROXY_PCT", d.stop_loss_proxy_pct)?,
            volume_shrink_ratio: env_or("DECISION_VOLUME_SHRINK_RATIO", d.volume_shrink_ratio)?,
            volume_surge_ratio: env_or("DECISION_VOLUME_SURGE_RATIO", d.volume_surge_ratio)?,
            distribution_max_change_pct: env_or(
                "DECISION_DISTRIBUTION_MAX_CHANGE_PCT",
                d.distribution_max_change_pct,
            )?,
            min_risk_reward: env_or("DECISION_MIN_RISK_REWARD", d.min_risk_reward)?,
            reversal_cooldown_points: env_or(
                "DECISION_REVERSAL_COOLDOWN_POINTS",
                d.reversal_cooldown_points,
            )?,
            bearish_rebound_cap: env_or("DECISION_BEARISH_REBOUND_CAP", d.bearish_rebound_cap)?,
            high_severity_level: env_or("DECISION_HIGH_SEVERITY_LEVEL", d.high_severity_level)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bias_deep_low < self.bias_low && self.bias_low < self.bias_high) {
            bail!(
                "bias thresholds must satisfy deep_low < low < high (got {} / {} / {})",
                self.bias_deep_low,
                self.bias_low,
                self.bias_high
            );
        }
        if self.take_profit_proxy_pct <= 0.0 || self.stop_loss_proxy_pct <= 0.0 {
            bail!("take-profit and stop-loss proxies must be positive percentages");
        }
        if self.stop_loss_proxy_pct >= 100.0 {
            bail!("stop_loss_proxy_pct must be below 100");
        }
        if self.volume_shrink_ratio <= 0.0 || self.volume_shrink_ratio >= self.volume_surge_ratio {
            bail!("volume ratios must satisfy 0 < shrink < surge");
        }
        if self.min_risk_reward < 0.0 {
            bail!("min_risk_reward must be >= 0");
        }
        if self.reversal_cooldown_points < 0 {
            bail!("reversal_cooldown_points must be >= 0");
        }
        if !(0..=100).contains(&self.bearish_rebound_cap) {
            bail!("bearish_rebound_cap must be within 0..=100");
        }
        if self.high_severity_level > 5 {
            bail!("high_severity_level must be within 0..=5");
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
