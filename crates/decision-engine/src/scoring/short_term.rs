use analysis_core::{
    AnalysisSnapshot, CrossDirection, PatternStatus, PatternType, VolumePriceCode,
};

use super::{Rule, ScoreCategory};
use crate::variables::risk_reward_ratio;

// Rule thresholds are frozen with the weight table. `EngineConfig` defaults
// start from the shared ones, but config overrides only move the filters.
pub const SURGE_RATIO: f64 = 2.0;
pub const SHRINK_RATIO: f64 = 0.7;
const STOCH_LOW: f64 = 30.0;
const STOCH_HIGH: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_ELEVATED: f64 = 70.0;
const RSI_OVERBOUGHT: f64 = 80.0;
pub const BIAS_ELEVATED: f64 = 8.0;
const BIAS_OVERHEATED: f64 = 15.0;
const RR_SHORTFALL: f64 = 1.0;

#[derive(Clone, Copy, PartialEq)]
enum StochZone {
    Low,
    Mid,
    High,
}

/// Position of %K when the cross printed. A cross without %K counts as mid.
fn stoch_zone(s: &AnalysisSnapshot) -> StochZone {
    match s.technical.stoch_k {
        Some(k) if k < STOCH_LOW => StochZone::Low,
        Some(k) if k > STOCH_HIGH => StochZone::High,
        _ => StochZone::Mid,
    }
}

fn cross_in(s: &AnalysisSnapshot, cross: CrossDirection, zone: StochZone) -> bool {
    s.technical.stoch_cross == Some(cross) && stoch_zone(s) == zone
}

fn cross_reason(s: &AnalysisSnapshot, label: &str) -> String {
    match s.technical.stoch_k {
        Some(k) => format!("Stochastic {} at K={:.1}", label, k),
        None => format!("Stochastic {}", label),
    }
}

fn volume_ratio_at_least(s: &AnalysisSnapshot, ratio: f64) -> bool {
    s.volume_ratio().map(|r| r >= ratio).unwrap_or(false)
}

fn rsi_in(s: &AnalysisSnapshot, pred: fn(f64) -> bool) -> bool {
    s.technical.rsi.map(pred).unwrap_or(false)
}

fn rsi_reason(s: &AnalysisSnapshot, label: &str) -> String {
    format!("RSI {:.1} {}", s.technical.rsi.unwrap_or_default(), label)
}

fn bias_in(s: &AnalysisSnapshot, pred: fn(f64) -> bool) -> bool {
    s.bias_20().map(pred).unwrap_or(false)
}

/// RR from explicit take-profit/stop-loss levels only; proxies never fire
/// the shortfall penalty. A zero or negative ratio is a shortfall.
fn explicit_risk_reward(s: &AnalysisSnapshot) -> Option<f64> {
    let sr = &s.support_resistance;
    match (sr.take_profit, sr.stop_loss) {
        (Some(tp), Some(sl)) if s.has_price() => Some(risk_reward_ratio(s.price(), tp, sl)),
        _ => None,
    }
}

fn code_reason(s: &AnalysisSnapshot, code: VolumePriceCode) -> String {
    let detail = s
        .volume_price_signals
        .iter()
        .find(|sig| sig.code() == code)
        .and_then(|sig| sig.description.clone());
    match detail {
        Some(d) => format!("Volume-price signal: {} ({})", code.label(), d),
        None => format!("Volume-price signal: {}", code.label()),
    }
}

fn pattern_reason(s: &AnalysisSnapshot, state: &str) -> String {
    let p = &s.pattern;
    match p.confidence {
        Some(c) => format!("{} {} (confidence {:.0}%)", p.display_name(), state, c),
        None => format!("{} {}", p.display_name(), state),
    }
}

static RULES: &[Rule] = &[
    // Pattern
    Rule {
        name: "bottom_pattern_confirmed",
        category: ScoreCategory::Pattern,
        weight: 25,
        applies: |s| s.pattern.is(PatternType::Bottom, PatternStatus::Confirmed),
        explain: |s| pattern_reason(s, "confirmed"),
    },
    Rule {
        name: "bottom_pattern_forming",
        category: ScoreCategory::Pattern,
        weight: 10,
        applies: |s| s.pattern.is(PatternType::Bottom, PatternStatus::Forming),
        explain: |s| pattern_reason(s, "forming"),
    },
    Rule {
        name: "top_pattern_confirmed",
        category: ScoreCategory::Pattern,
        weight: -30,
        applies: |s| s.pattern.is(PatternType::Top, PatternStatus::Confirmed),
        explain: |s| pattern_reason(s, "confirmed"),
    },
    Rule {
        name: "top_pattern_forming",
        category: ScoreCategory::Pattern,
        weight: -10,
        applies: |s| s.pattern.is(PatternType::Top, PatternStatus::Forming),
        explain: |s| pattern_reason(s, "forming"),
    },
    // Wave
    Rule {
        name: "wave_breakout",
        category: ScoreCategory::Wave,
        weight: 20,
        applies: |s| s.wave.confirmed_breakout(),
        explain: |_| "Wave breakout confirmed by volume".to_string(),
    },
    Rule {
        name: "wave_breakdown",
        category: ScoreCategory::Wave,
        weight: -20,
        applies: |s| s.wave.confirmed_breakdown(),
        explain: |_| "Wave breakdown confirmed by volume".to_string(),
    },
    Rule {
        name: "wave_bullish_environment",
        category: ScoreCategory::Wave,
        weight: 8,
        applies: |s| s.wave.bullish_environment,
        explain: |_| "Wave structure in a bullish environment".to_string(),
    },
    Rule {
        name: "wave_bearish_environment",
        category: ScoreCategory::Wave,
        weight: -8,
        applies: |s| s.wave.bearish_environment,
        explain: |_| "Wave structure in a bearish environment".to_string(),
    },
    // Volume
    Rule {
        name: "volume_surge_up",
        category: ScoreCategory::Volume,
        weight: 10,
        applies: |s| {
            volume_ratio_at_least(s, SURGE_RATIO) && s.price_change_pct.unwrap_or(0.0) > 0.0
        },
        explain: |s| {
            format!(
                "Volume {:.1}x average on a {:+.2}% day",
                s.volume_ratio().unwrap_or_default(),
                s.price_change_pct.unwrap_or_default()
            )
        },
    },
    Rule {
        name: "volume_surge_down",
        category: ScoreCategory::Volume,
        weight: -10,
        applies: |s| {
            volume_ratio_at_least(s, SURGE_RATIO) && s.price_change_pct.unwrap_or(0.0) < 0.0
        },
        explain: |s| {
            format!(
                "Volume {:.1}x average on a {:+.2}% day",
                s.volume_ratio().unwrap_or_default(),
                s.price_change_pct.unwrap_or_default()
            )
        },
    },
    Rule {
        name: "volume_shrink",
        category: ScoreCategory::Volume,
        weight: -5,
        applies: |s| s.volume_ratio().map(|r| r < SHRINK_RATIO).unwrap_or(false),
        explain: |s| {
            format!(
                "Volume shrinking to {:.2}x average",
                s.volume_ratio().unwrap_or_default()
            )
        },
    },
    Rule {
        name: "code_valid_breakout",
        category: ScoreCategory::Volume,
        weight: 10,
        applies: |s| s.has_code(VolumePriceCode::ValidBreakout),
        explain: |s| code_reason(s, VolumePriceCode::ValidBreakout),
    },
    Rule {
        name: "code_bottom_accumulation",
        category: ScoreCategory::Volume,
        weight: 8,
        applies: |s| s.has_code(VolumePriceCode::BottomAccumulation),
        explain: |s| code_reason(s, VolumePriceCode::BottomAccumulation),
    },
    Rule {
        name: "code_breakdown_with_volume",
        category: ScoreCategory::Volume,
        weight: -20,
        applies: |s| s.has_code(VolumePriceCode::BreakdownWithVolume),
        explain: |s| code_reason(s, VolumePriceCode::BreakdownWithVolume),
    },
    Rule {
        name: "code_gap_down_with_volume",
        category: ScoreCategory::Volume,
        weight: -15,
        applies: |s| s.has_code(VolumePriceCode::GapDownWithVolume),
        explain: |s| code_reason(s, VolumePriceCode::GapDownWithVolume),
    },
    Rule {
        name: "code_supply_overhang",
        category: ScoreCategory::Volume,
        weight: -10,
        applies: |s| s.has_code(VolumePriceCode::SupplyOverhang),
        explain: |s| code_reason(s, VolumePriceCode::SupplyOverhang),
    },
    Rule {
        name: "code_high_volume_no_rise",
        category: ScoreCategory::Volume,
        weight: -8,
        applies: |s| s.has_code(VolumePriceCode::HighVolumeNoRise),
        explain: |s| code_reason(s, VolumePriceCode::HighVolumeNoRise),
    },
    Rule {
        name: "code_volume_climax_top",
        category: ScoreCategory::Volume,
        weight: -8,
        applies: |s| s.has_code(VolumePriceCode::VolumeClimaxTop),
        explain: |s| code_reason(s, VolumePriceCode::VolumeClimaxTop),
    },
    // Oscillators
    Rule {
        name: "stoch_golden_cross_low",
        category: ScoreCategory::Oscillator,
        weight: 10,
        applies: |s| cross_in(s, CrossDirection::Golden, StochZone::Low),
        explain: |s| cross_reason(s, "golden cross in oversold zone"),
    },
    Rule {
        name: "stoch_golden_cross_mid",
        category: ScoreCategory::Oscillator,
        weight: 5,
        applies: |s| cross_in(s, CrossDirection::Golden, StochZone::Mid),
        explain: |s| cross_reason(s, "golden cross"),
    },
    Rule {
        name: "stoch_golden_cross_high",
        category: ScoreCategory::Oscillator,
        weight: 2,
        applies: |s| cross_in(s, CrossDirection::Golden, StochZone::High),
        explain: |s| cross_reason(s, "golden cross at a high level"),
    },
    Rule {
        name: "stoch_death_cross_high",
        category: ScoreCategory::Oscillator,
        weight: -10,
        applies: |s| cross_in(s, CrossDirection::Death, StochZone::High),
        explain: |s| cross_reason(s, "death cross in overbought zone"),
    },
    Rule {
        name: "stoch_death_cross_mid",
        category: ScoreCategory::Oscillator,
        weight: -5,
        applies: |s| cross_in(s, CrossDirection::Death, StochZone::Mid),
        explain: |s| cross_reason(s, "death cross"),
    },
    Rule {
        name: "stoch_death_cross_low",
        category: ScoreCategory::Oscillator,
        weight: -2,
        applies: |s| cross_in(s, CrossDirection::Death, StochZone::Low),
        explain: |s| cross_reason(s, "death cross at a low level"),
    },
    Rule {
        name: "rsi_oversold",
        category: ScoreCategory::Oscillator,
        weight: 8,
        applies: |s| rsi_in(s, |r| r < RSI_OVERSOLD),
        explain: |s| rsi_reason(s, "oversold"),
    },
    Rule {
        name: "rsi_overbought",
        category: ScoreCategory::Oscillator,
        weight: -10,
        applies: |s| rsi_in(s, |r| r > RSI_OVERBOUGHT),
        explain: |s| rsi_reason(s, "overbought"),
    },
    Rule {
        name: "rsi_elevated",
        category: ScoreCategory::Oscillator,
        weight: -5,
        applies: |s| rsi_in(s, |r| r > RSI_ELEVATED && r <= RSI_OVERBOUGHT),
        explain: |s| rsi_reason(s, "elevated"),
    },
    Rule {
        name: "macd_positive",
        category: ScoreCategory::Oscillator,
        weight: 5,
        applies: |s| s.technical.macd_hist.map(|h| h > 0.0).unwrap_or(false),
        explain: |s| format!("MACD histogram positive ({:.3})", s.technical.macd_hist.unwrap_or_default()),
    },
    Rule {
        name: "macd_negative",
        category: ScoreCategory::Oscillator,
        weight: -5,
        applies: |s| s.technical.macd_hist.map(|h| h < 0.0).unwrap_or(false),
        explain: |s| format!("MACD histogram negative ({:.3})", s.technical.macd_hist.unwrap_or_default()),
    },
    Rule {
        name: "macd_bullish_divergence",
        category: ScoreCategory::Oscillator,
        weight: 10,
        applies: |s| s.technical.macd_bullish_divergence,
        explain: |_| "MACD bullish divergence".to_string(),
    },
    Rule {
        name: "macd_bearish_divergence",
        category: ScoreCategory::Oscillator,
        weight: -10,
        applies: |s| s.technical.macd_bearish_divergence,
        explain: |_| "MACD bearish divergence".to_string(),
    },
    // Mean reversion
    Rule {
        name: "left_side_buy",
        category: ScoreCategory::MeanReversion,
        weight: 8,
        applies: |s| s.mean_reversion.left_buy_triggered,
        explain: |_| "Left-side buy trigger (stretched below mean)".to_string(),
    },
    Rule {
        name: "left_side_sell",
        category: ScoreCategory::MeanReversion,
        weight: -8,
        applies: |s| s.mean_reversion.left_sell_triggered,
        explain: |_| "Left-side sell trigger (stretched above mean)".to_string(),
    },
    // Risk
    Rule {
        name: "bias_overheated",
        category: ScoreCategory::Risk,
        weight: -15,
        applies: |s| bias_in(s, |b| b >= BIAS_OVERHEATED),
        explain: |s| format!("Overheated: {:+.1}% above MA20", s.bias_20().unwrap_or_default()),
    },
    Rule {
        name: "bias_elevated",
        category: ScoreCategory::Risk,
        weight: -8,
        applies: |s| bias_in(s, |b| b >= BIAS_ELEVATED && b < BIAS_OVERHEATED),
        explain: |s| format!("Extended: {:+.1}% above MA20", s.bias_20().unwrap_or_default()),
    },
    Rule {
        name: "risk_reward_shortfall",
        category: ScoreCategory::Risk,
        weight: -10,
        applies: |s| {
            explicit_risk_reward(s)
                .map(|rr| rr < RR_SHORTFALL)
                .unwrap_or(false)
        },
        explain: |s| {
            format!(
                "Risk/reward only {:.2}",
                explicit_risk_reward(s).unwrap_or_default()
            )
        },
    },
];

/// Short-track weight table, in evaluation order.
pub fn rules() -> &'static [Rule] {
    RULES
}
