use analysis_core::{AnalysisSnapshot, Direction, VolumePriceCode};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

pub const DEFAULT_RSI: f64 = 50.0;
pub const DEFAULT_ADX: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    Bull,
    Bear,
    Range,
}

/// Where price sits relative to MA20
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionBias {
    High,
    Neutral,
    Low,
    DeepLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Breakout printed without volume confirmation
    FalseBreakoutRisk,
    /// Heavy volume without price progress at an elevated level
    DistributionRisk,
    /// Volume drying up below the shrink threshold
    WaningMomentum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAnomaly {
    pub kind: AnomalyKind,
    pub description: String,
}

/// Normalized state derived from a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionVariables {
    pub trend_status: TrendStatus,
    pub trend_reason: String,
    pub position_bias: PositionBias,
    pub bias_20: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// 0.0 when undefined
    pub risk_reward_ratio: f64,
    pub volume_anomaly: bool,
    pub anomalies: Vec<VolumeAnomaly>,
    pub left_buy_triggered: bool,
    pub left_sell_triggered: bool,
    pub rsi: f64,
    pub adx: f64,
}

impl DecisionVariables {
    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }
}

/// Derive decision variables. Missing fields fall back to neutral values
/// (Range trend, Neutral bias, RR 0, RSI 50, ADX 25).
pub fn extract(snapshot: &AnalysisSnapshot, config: &EngineConfig) -> DecisionVariables {
    let (trend_status, trend_reason) = classify_trend(snapshot, config);

    let bias_20 = snapshot.bias_20().unwrap_or(0.0);
    let position_bias = classify_bias(bias_20, config);

    let price = snapshot.price();
    let take_profit = snapshot
        .support_resistance
        .take_profit
        .unwrap_or(price * (1.0 + config.take_profit_proxy_pct / 100.0));
    let stop_loss = snapshot
        .support_resistance
        .stop_loss
        .unwrap_or(price * (1.0 - config.stop_loss_proxy_pct / 100.0));
    let risk_reward_ratio = risk_reward_ratio(price, take_profit, stop_loss);

    let anomalies = detect_volume_anomalies(snapshot, bias_20, config);

    DecisionVariables {
        trend_status,
        trend_reason,
        position_bias,
        bias_20,
        take_profit,
        stop_loss,
        risk_reward_ratio,
        volume_anomaly: !anomalies.is_empty(),
        anomalies,
        left_buy_triggered: snapshot.mean_reversion.left_buy_triggered,
        left_sell_triggered: snapshot.mean_reversion.left_sell_triggered,
        rsi: snapshot.technical.rsi.unwrap_or(DEFAULT_RSI),
        adx: snapshot.technical.adx.unwrap_or(DEFAULT_ADX),
    }
}

/// (take_profit - price) / (price - stop_loss), 0.0 when the risk leg is
/// non-positive. A target below price yields a negative ratio.
pub fn risk_reward_ratio(price: f64, take_profit: f64, stop_loss: f64) -> f64 {
    let risk = price - stop_loss;
    if risk <= 0.0 || price <= 0.0 {
        return 0.0;
    }
    (take_profit - price) / risk
}

/// Wave events outrank the ADX range check, which outranks moving averages
/// and the trend label.
fn classify_trend(snapshot: &AnalysisSnapshot, config: &EngineConfig) -> (TrendStatus, String) {
    let wave = &snapshot.wave;
    if wave.confirmed_breakdown() {
        return (TrendStatus::Bear, "wave breakdown confirmed by volume".to_string());
    }
    if wave.confirmed_breakout() {
        return (TrendStatus::Bull, "wave breakout confirmed by volume".to_string());
    }

    let tech = &snapshot.technical;
    if let Some(adx) = tech.adx {
        if adx < config.adx_range_threshold {
            return (
                TrendStatus::Range,
                format!("ADX {:.1} below {:.1}", adx, config.adx_range_threshold),
            );
        }
    }

    let price = snapshot.price();
    if let (Some(ma20), Some(ma60)) = (tech.ma20, tech.ma60) {
        if price > 0.0 && ma20 > 0.0 && ma60 > 0.0 {
            let slope = tech.ma20_slope.unwrap_or(0.0);
            if price > ma20 && ma20 > ma60 && slope >= 0.0 {
                return (TrendStatus::Bull, "price > MA20 > MA60, MA20 rising".to_string());
            }
            if price < ma20 && ma20 < ma60 && slope <= 0.0 {
                return (TrendStatus::Bear, "price < MA20 < MA60, MA20 falling".to_string());
            }
        }
    }

    match tech.trend_label_direction() {
        Some(Direction::Bullish) => (TrendStatus::Bull, "trend label bullish".to_string()),
        Some(Direction::Bearish) => (TrendStatus::Bear, "trend label bearish".to_string()),
        None => (TrendStatus::Range, "no directional evidence".to_string()),
    }
}

fn classify_bias(bias_20: f64, config: &EngineConfig) -> PositionBias {
    if bias_20 >= config.bias_high {
        PositionBias::High
    } else if bias_20 <= config.bias_deep_low {
        PositionBias::DeepLow
    } else if bias_20 <= config.bias_low {
        PositionBias::Low
    } else {
        PositionBias::Neutral
    }
}

fn detect_volume_anomalies(
    snapshot: &AnalysisSnapshot,
    bias_20: f64,
    config: &EngineConfig,
) -> Vec<VolumeAnomaly> {
    let mut anomalies = Vec::new();
    let wave = &snapshot.wave;

    if wave.breakout_detected && !wave.breakout_volume_confirmed {
        anomalies.push(VolumeAnomaly {
            kind: AnomalyKind::FalseBreakoutRisk,
            description: "breakout without volume confirmation".to_string(),
        });
    }

    let elevated = bias_20 >= config.bias_high;
    let ratio = snapshot.volume_ratio();
    let change = snapshot.price_change_pct.unwrap_or(0.0);
    let heavy_without_rise = ratio
        .map(|r| r >= config.volume_surge_ratio && change <= config.distribution_max_change_pct)
        .unwrap_or(false);
    if elevated && (heavy_without_rise || snapshot.has_code(VolumePriceCode::HighVolumeNoRise)) {
        anomalies.push(VolumeAnomaly {
            kind: AnomalyKind::DistributionRisk,
            description: format!(
                "heavy volume without a rise at bias {:+.1}% (distribution risk)",
                bias_20
            ),
        });
    }

    if let Some(r) = ratio {
        if r < config.volume_shrink_ratio {
            anomalies.push(VolumeAnomaly {
                kind: AnomalyKind::WaningMomentum,
                description: format!(
                    "volume ratio {:.2} below {:.2} (waning momentum)",
                    r, config.volume_shrink_ratio
                ),
            });
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn snap(value: serde_json::Value) -> AnalysisSnapshot {
        AnalysisSnapshot::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_snapshot_is_neutral() {
        let vars = extract(&snap(json!({})), &EngineConfig::default());
        assert_eq!(vars.trend_status, TrendStatus::Range);
        assert_eq!(vars.position_bias, PositionBias::Neutral);
        assert_eq!(vars.risk_reward_ratio, 0.0);
        assert_eq!(vars.rsi, 50.0);
        assert_eq!(vars.adx, 25.0);
        assert!(!vars.volume_anomaly);
    }

    #[test]
    fn test_wave_breakdown_outranks_adx() {
        let vars = extract(
            &snap(json!({
                "current_price": 100.0,
                "technical": {"adx": 12.0},
                "wave": {"breakdown_detected": true, "breakdown_volume_confirmed": true}
            })),
            &EngineConfig::default(),
        );
        assert_eq!(vars.trend_status, TrendStatus::Bear);
    }

    #[test]
    fn test_low_adx_forces_range_over_moving_averages() {
        let vars = extract(
            &snap(json!({
                "current_price": 110.0,
                "technical": {"adx": 15.0, "ma20": 105.0, "ma60": 100.0, "trend": "bullish"}
            })),
            &EngineConfig::default(),
        );
        assert_eq!(vars.trend_status, TrendStatus::Range);
    }

    #[test]
    fn test_moving_average_trend() {
        let vars = extract(
            &snap(json!({
                "current_price": 110.0,
                "technical": {"adx": 30.0, "ma20": 105.0, "ma60": 100.0, "ma20_slope": 0.4}
            })),
            &EngineConfig::default(),
        );
        assert_eq!(vars.trend_status, TrendStatus::Bull);

        let vars = extract(
            &snap(json!({
                "current_price": 90.0,
                "technical": {"ma20": 95.0, "ma60": 100.0}
            })),
            &EngineConfig::default(),
        );
        assert_eq!(vars.trend_status, TrendStatus::Bear);
    }

    #[test]
    fn test_bias_buckets() {
        let config = EngineConfig::default();
        assert_eq!(classify_bias(9.0, &config), PositionBias::High);
        assert_eq!(classify_bias(0.0, &config), PositionBias::Neutral);
        assert_eq!(classify_bias(-6.0, &config), PositionBias::Low);
        assert_eq!(classify_bias(-12.0, &config), PositionBias::DeepLow);
    }

    #[test]
    fn test_risk_reward_with_levels_and_proxies() {
        let vars = extract(
            &snap(json!({
                "current_price": 100.0,
                "support_resistance": {"take_profit": 115.0, "stop_loss": 95.0}
            })),
            &EngineConfig::default(),
        );
        assert_relative_eq!(vars.risk_reward_ratio, 3.0, epsilon = 1e-9);

        // Non-numeric levels fall back to +10% / -5% proxies
        let vars = extract(
            &snap(json!({
                "current_price": 100.0,
                "support_resistance": {"take_profit": "n/a", "stop_loss": "--"}
            })),
            &EngineConfig::default(),
        );
        assert_relative_eq!(vars.take_profit, 110.0, epsilon = 1e-9);
        assert_relative_eq!(vars.stop_loss, 95.0, epsilon = 1e-9);
        assert_relative_eq!(vars.risk_reward_ratio, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_risk_reward_degenerate_denominator() {
        assert_eq!(risk_reward_ratio(100.0, 120.0, 100.0), 0.0);
        assert_eq!(risk_reward_ratio(100.0, 120.0, 105.0), 0.0);
        assert_eq!(risk_reward_ratio(0.0, 10.0, -5.0), 0.0);
    }

    #[test]
    fn test_target_below_price_keeps_its_sign() {
        assert_relative_eq!(risk_reward_ratio(100.0, 90.0, 95.0), -2.0, epsilon = 1e-9);

        let vars = extract(
            &snap(json!({
                "current_price": 100.0,
                "support_resistance": {"take_profit": 96.0, "stop_loss": 90.0}
            })),
            &EngineConfig::default(),
        );
        assert_relative_eq!(vars.risk_reward_ratio, -0.4, epsilon = 1e-9);
        assert!(vars.risk_reward_ratio < 0.0);
    }

    #[test]
    fn test_volume_anomalies() {
        let vars = extract(
            &snap(json!({
                "current_price": 112.0,
                "price_change_pct": 0.2,
                "technical": {"ma20": 100.0},
                "wave": {"breakout_detected": true, "breakout_volume_confirmed": false},
                "volume": {"ratio": 2.6}
            })),
            &EngineConfig::default(),
        );
        assert!(vars.volume_anomaly);
        assert!(vars.has_anomaly(AnomalyKind::FalseBreakoutRisk));
        assert!(vars.has_anomaly(AnomalyKind::DistributionRisk));
        assert!(!vars.has_anomaly(AnomalyKind::WaningMomentum));

        let vars = extract(
            &snap(json!({"current_price": 100.0, "volume": {"ratio": 0.5}})),
            &EngineConfig::default(),
        );
        assert!(vars.has_anomaly(AnomalyKind::WaningMomentum));
        assert_eq!(vars.anomalies.len(), 1);
    }
}
