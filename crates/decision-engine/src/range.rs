use analysis_core::AnalysisSnapshot;
use serde::{Deserialize, Serialize};

/// Share of the band counted as the buy (bottom) or sell (top) zone.
const EDGE_ZONE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSuggestion {
    BuyNearSupport,
    SellNearResistance,
    WaitMidRange,
}

impl RangeSuggestion {
    pub fn to_label(&self) -> &'static str {
        match self {
            RangeSuggestion::BuyNearSupport => "Near range support: consider buying with a stop under the band",
            RangeSuggestion::SellNearResistance => "Near range resistance: consider taking profit",
            RangeSuggestion::WaitMidRange => "Mid-range: wait for price to reach a band edge",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeTradingPlan {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub buy_zone: (f64, f64),
    pub sell_zone: (f64, f64),
    /// 0 at the lower bound, 100 at the upper
    pub position_pct: f64,
    pub suggestion: RangeSuggestion,
    pub note: String,
}

/// Band-trading plan for a range-bound market. `None` without a usable band.
pub fn range_plan(snapshot: &AnalysisSnapshot) -> Option<RangeTradingPlan> {
    if !snapshot.has_price() {
        return None;
    }
    let price = snapshot.price();
    let tech = &snapshot.technical;
    let sr = &snapshot.support_resistance;

    let lower = sr
        .support1
        .filter(|s| *s > 0.0 && *s < price)
        .or(tech.ma60.filter(|v| *v > 0.0))
        .unwrap_or(price * 0.95);
    let upper = sr
        .resistance1
        .filter(|r| *r > price)
        .or(tech.ma20.filter(|v| *v > 0.0).map(|ma20| ma20 * 1.05))
        .unwrap_or(price * 1.05);

    if upper <= lower {
        tracing::debug!(
            "{}: degenerate range {:.2}..{:.2}, no plan",
            snapshot.symbol,
            lower,
            upper
        );
        return None;
    }

    let width = upper - lower;
    let position_pct = ((price - lower) / width * 100.0).clamp(0.0, 100.0);
    let suggestion = if position_pct <= EDGE_ZONE * 100.0 {
        RangeSuggestion::BuyNearSupport
    } else if position_pct >= (1.0 - EDGE_ZONE) * 100.0 {
        RangeSuggestion::SellNearResistance
    } else {
        RangeSuggestion::WaitMidRange
    };

    Some(RangeTradingPlan {
        lower_bound: lower,
        upper_bound: upper,
        buy_zone: (lower, lower + width * EDGE_ZONE),
        sell_zone: (upper - width * EDGE_ZONE, upper),
        position_pct,
        suggestion,
        note: suggestion.to_label().to_string(),
    })
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
    fn test_band_from_support_resistance() {
        let plan = range_plan(&snap(json!({
            "current_price": 92.0,
            "support_resistance": {"support1": 90.0, "resistance1": 110.0}
        })))
        .unwrap();
        assert_relative_eq!(plan.lower_bound, 90.0);
        assert_relative_eq!(plan.upper_bound, 110.0);
        assert_relative_eq!(plan.buy_zone.1, 95.0);
        assert_relative_eq!(plan.sell_zone.0, 105.0);
        assert_relative_eq!(plan.position_pct, 10.0, epsilon = 1e-9);
        assert_eq!(plan.suggestion, RangeSuggestion::BuyNearSupport);
    }

    #[test]
    fn test_band_from_moving_averages() {
        let plan = range_plan(&snap(json!({
            "current_price": 100.0,
            "technical": {"ma20": 100.0, "ma60": 95.0}
        })))
        .unwrap();
        assert_relative_eq!(plan.lower_bound, 95.0);
        assert_relative_eq!(plan.upper_bound, 105.0, epsilon = 1e-9);
        assert_eq!(plan.suggestion, RangeSuggestion::WaitMidRange);
    }

    #[test]
    fn test_price_above_band_clamps() {
        let plan = range_plan(&snap(json!({
            "current_price": 120.0,
            "technical": {"ma20": 100.0, "ma60": 95.0}
        })))
        .unwrap();
        assert_relative_eq!(plan.position_pct, 100.0);
        assert_eq!(plan.suggestion, RangeSuggestion::SellNearResistance);
    }

    #[test]
    fn test_degenerate_band_is_omitted() {
        // MA60 above MA20 x 1.05 inverts the band
        assert!(range_plan(&snap(json!({
            "current_price": 100.0,
            "technical": {"ma20": 90.0, "ma60": 120.0}
        })))
        .is_none());
        assert!(range_plan(&snap(json!({"current_price": "n/a"}))).is_none());
    }
}
