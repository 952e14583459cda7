use analysis_core::{Action, AnalysisSnapshot, PatternType};
use serde::{Deserialize, Serialize};

pub const ALREADY_REACHED_NOTE: &str = "already reached, now trailing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDirection {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    Pattern,
    Resistance,
    Support,
    MovingAverage,
    PriceProxy,
    Trailing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTargetResult {
    pub available: bool,
    pub direction: TargetDirection,
    pub target_price: f64,
    pub stop_loss: f64,
    pub source: TargetSource,
    pub stop_source: TargetSource,
    pub note: Option<String>,
    /// Percent move to target in the trade's favour
    pub potential_gain_pct: f64,
    /// Percent move to stop against the trade
    pub potential_loss_pct: f64,
    pub reward_risk_ratio: f64,
}

impl PriceTargetResult {
    fn unavailable() -> Self {
        Self {
            available: false,
            direction: TargetDirection::Long,
            target_price: 0.0,
            stop_loss: 0.0,
            source: TargetSource::PriceProxy,
            stop_source: TargetSource::PriceProxy,
            note: Some("no valid current price".to_string()),
            potential_gain_pct: 0.0,
            potential_loss_pct: 0.0,
            reward_risk_ratio: 0.0,
        }
    }
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0)
}

/// Target and stop for the final action.
///
/// A detected pattern with a positive target wins; otherwise levels come from
/// support/resistance and moving averages. Long targets that price has already
/// reached roll forward to a trailing level (top patterns excepted).
pub fn compute_targets(snapshot: &AnalysisSnapshot, action: Action) -> PriceTargetResult {
    if !snapshot.has_price() {
        tracing::warn!("{}: no valid price, targets unavailable", snapshot.symbol);
        return PriceTargetResult::unavailable();
    }
    let price = snapshot.price();
    let tech = &snapshot.technical;

    let (direction, mut target, target_source, stop, stop_source) =
        match pattern_levels(snapshot) {
            Some(levels) => levels,
            None if action.is_sell() => {
                let sr = &snapshot.support_resistance;
                let (target, source) = match positive(sr.support1).filter(|s| *s < price) {
                    Some(s) => (s, TargetSource::Support),
                    None => match positive(tech.ma20) {
                        Some(ma20) => (ma20 * 0.95, TargetSource::MovingAverage),
                        None => (price * 0.95, TargetSource::PriceProxy),
                    },
                };
                (TargetDirection::Short, target, source, price * 1.05, TargetSource::PriceProxy)
            }
            None => {
                let sr = &snapshot.support_resistance;
                let (target, source) = match positive(sr.resistance1).filter(|r| *r > price) {
                    Some(r) => (r, TargetSource::Resistance),
                    None => match positive(tech.ma60) {
                        Some(ma60) => (ma60 * 1.10, TargetSource::MovingAverage),
                        None => (price * 1.08, TargetSource::PriceProxy),
                    },
                };
                let (stop, stop_source) = long_stop(snapshot);
                (TargetDirection::Long, target, source, stop, stop_source)
            }
        };

    let mut source = target_source;
    let mut note = None;
    if direction == TargetDirection::Long && !snapshot.pattern.is_top() && price >= target {
        let trailing = positive(tech.ma60)
            .map(|ma60| ma60 * 1.10)
            .unwrap_or(0.0)
            .max(price * 1.10);
        tracing::debug!(
            "{}: target {:.2} already reached at {:.2}, trailing to {:.2}",
            snapshot.symbol,
            target,
            price,
            trailing
        );
        target = trailing;
        source = TargetSource::Trailing;
        note = Some(ALREADY_REACHED_NOTE.to_string());
    }

    let (gain, loss) = match direction {
        TargetDirection::Long => (
            (target - price) / price * 100.0,
            (price - stop) / price * 100.0,
        ),
        TargetDirection::Short => (
            (price - target) / price * 100.0,
            (stop - price) / price * 100.0,
        ),
    };
    let reward_risk_ratio = if loss > 0.0 { gain / loss } else { 0.0 };

    PriceTargetResult {
        available: true,
        direction,
        target_price: target,
        stop_loss: stop,
        source,
        stop_source,
        note,
        potential_gain_pct: gain,
        potential_loss_pct: loss,
        reward_risk_ratio,
    }
}

/// Nearest support below price, else MA20 x 0.97, else price x 0.92.
fn long_stop(snapshot: &AnalysisSnapshot) -> (f64, TargetSource) {
    let price = snapshot.price();
    match positive(snapshot.support_resistance.support1).filter(|s| *s < price) {
        Some(s) => (s, TargetSource::Support),
        None => match positive(snapshot.technical.ma20) {
            Some(ma20) => (ma20 * 0.97, TargetSource::MovingAverage),
            None => (price * 0.92, TargetSource::PriceProxy),
        },
    }
}

type Levels = (TargetDirection, f64, TargetSource, f64, TargetSource);

fn pattern_levels(snapshot: &AnalysisSnapshot) -> Option<Levels> {
    let p = &snapshot.pattern;
    if !p.detected {
        return None;
    }
    let kind = p.pattern_type?;
    let neckline = positive(p.neckline);

    let measured = match (neckline, positive(p.measured_move)) {
        (Some(n), Some(m)) => match kind {
            PatternType::Bottom => Some(n + m),
            PatternType::Top => Some(n - m),
        },
        _ => None,
    };
    let target = positive(measured.or(p.target_price))?;

    match kind {
        PatternType::Bottom => {
            let (stop, source) = match (positive(p.stop_price), neckline) {
                (Some(s), _) => (s, TargetSource::Pattern),
                (None, Some(n)) => (n * 0.97, TargetSource::Pattern),
                (None, None) => long_stop(snapshot),
            };
            Some((TargetDirection::Long, target, TargetSource::Pattern, stop, source))
        }
        PatternType::Top => {
            let (stop, source) = match (positive(p.stop_price), neckline) {
                (Some(s), _) => (s, TargetSource::Pattern),
                (None, Some(n)) => (n * 1.03, TargetSource::Pattern),
                (None, None) => (snapshot.price() * 1.05, TargetSource::PriceProxy),
            };
            Some((TargetDirection::Short, target, TargetSource::Pattern, stop, source))
        }
    }
}
