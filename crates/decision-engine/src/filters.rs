//! Override / filter layer.
//!
//! Steps run in a fixed order and can only make an action more cautious. The
//! forced exits (high-risk volume-price codes, structural breakdown) lock the
//! action so nothing after them, including the reversal cooldown, changes it.
//! Every change is recorded as a [`FilterRecord`].

use analysis_core::{
    Action, AnalysisSnapshot, ConfidenceLevel, SignalRecord, SignalStore, VolumePriceCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::scenario::{InvestmentAdvice, ScenarioCode};
use crate::variables::{AnomalyKind, DecisionVariables, TrendStatus};

pub const TREND_CAP: &str = "trend cap";
pub const VOLUME_CONFIRMATION: &str = "volume confirmation";
pub const RISK_REWARD_GATE: &str = "risk/reward gate";
pub const VOLUME_ANOMALY: &str = "volume anomaly";
pub const HIGH_RISK_VOLUME_PRICE: &str = "high-risk volume-price";
pub const STRUCTURAL_BREAKDOWN: &str = "structural breakdown";
pub const LIQUIDITY: &str = "liquidity";
pub const REVERSAL_COOLDOWN: &str = "reversal cooldown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRecord {
    pub filter_name: String,
    pub reason: String,
    pub action_taken: String,
    /// True only when this step replaced the action
    #[serde(default)]
    pub action_changed: bool,
}

/// State after the filter chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub action: Action,
    pub confidence: ConfidenceLevel,
    pub final_score: i32,
    /// Set by a forced exit; later steps leave the action alone
    pub locked: bool,
    pub overrides: Vec<FilterRecord>,
    pub warnings: Vec<String>,
}

impl FilterOutcome {
    /// The last record that replaced the action, if any.
    pub fn last_action_change(&self) -> Option<&FilterRecord> {
        last_action_change(&self.overrides)
    }
}

pub fn last_action_change(records: &[FilterRecord]) -> Option<&FilterRecord> {
    records.iter().rev().find(|r| r.action_changed)
}

struct FilterChain<'a> {
    advice: &'a InvestmentAdvice,
    vars: &'a DecisionVariables,
    snapshot: &'a AnalysisSnapshot,
    config: &'a EngineConfig,
    out: FilterOutcome,
}

/// Run steps 1-7 and, when a store is given, the reversal cooldown.
///
/// Only the cooldown touches external state: it swaps the symbol's record in
/// `memory` whether or not it fires.
pub fn apply_filters(
    advice: &InvestmentAdvice,
    vars: &DecisionVariables,
    snapshot: &AnalysisSnapshot,
    config: &EngineConfig,
    confidence: ConfidenceLevel,
    memory: Option<&dyn SignalStore>,
    now: DateTime<Utc>,
) -> FilterOutcome {
    let mut chain = FilterChain {
        advice,
        vars,
        snapshot,
        config,
        out: FilterOutcome {
            action: advice.action,
            confidence,
            final_score: advice.weighted_score,
            locked: false,
            overrides: Vec::new(),
            warnings: Vec::new(),
        },
    };

    chain.trend_cap();
    chain.volume_confirmation();
    chain.risk_reward_gate();
    chain.volume_anomaly_gate();
    chain.high_risk_codes();
    chain.structural_breakdown();
    chain.liquidity_gate();
    if let Some(store) = memory {
        chain.reversal_cooldown(store, now);
    }

    chain.out
}

impl<'a> FilterChain<'a> {
    fn record(&mut self, filter: &str, reason: String, action_taken: String) {
        self.push(filter, reason, action_taken, false);
    }

    fn record_change(&mut self, filter: &str, reason: String, action_taken: String) {
        self.push(filter, reason, action_taken, true);
    }

    fn push(&mut self, filter: &str, reason: String, action_taken: String, action_changed: bool) {
        tracing::info!(
            "[{}] {}: {} -> {}",
            self.snapshot.symbol,
            filter,
            reason,
            action_taken
        );
        self.out.overrides.push(FilterRecord {
            filter_name: filter.to_string(),
            reason,
            action_taken,
            action_changed,
        });
    }

    /// Replace the action unless a forced exit already locked it.
    fn set_action(&mut self, filter: &str, action: Action, reason: String) -> bool {
        if self.out.locked || action == self.out.action {
            return false;
        }
        let taken = format!(
            "{} -> {}",
            self.out.action.to_label(),
            action.to_label()
        );
        self.out.action = action;
        self.record_change(filter, reason, taken);
        true
    }

    /// Force an exit and lock the action.
    fn force_exit(&mut self, filter: &str, reason: String) {
        if self.out.locked {
            return;
        }
        if self.out.action.is_sell() {
            self.out.locked = true;
            self.record(filter, reason, format!("kept {} (locked)", self.out.action.to_label()));
            return;
        }
        let taken = format!("{} -> {} (forced)", self.out.action.to_label(), Action::Sell.to_label());
        self.out.action = Action::Sell;
        self.out.locked = true;
        self.record_change(filter, reason, taken);
    }

    fn trend_cap(&mut self) {
        let rebound = self.advice.scenario == ScenarioCode::C;
        let bear_buy = self.vars.trend_status == TrendStatus::Bear && self.out.action.is_buy();
        if !(rebound || bear_buy) {
            return;
        }
        let cap = self.config.bearish_rebound_cap;
        if self.out.final_score <= cap {
            return;
        }
        let reason = if rebound {
            "bearish-rebound scenario carries a score ceiling".to_string()
        } else {
            "buy signal against a bear trend carries a score ceiling".to_string()
        };
        let taken = format!("score {} capped at {}", self.out.final_score, cap);
        self.out.final_score = cap;
        self.record(TREND_CAP, reason, taken);
    }

    fn volume_confirmation(&mut self) {
        if !self.out.action.is_buy() {
            return;
        }
        let Some(ratio) = self.snapshot.volume_ratio() else {
            return;
        };
        if ratio >= self.config.volume_shrink_ratio {
            return;
        }
        let reason = format!(
            "volume ratio {:.2} below {:.2}; buying lacks volume confirmation",
            ratio, self.config.volume_shrink_ratio
        );
        let downgraded = self.out.action.downgraded();
        if self.set_action(VOLUME_CONFIRMATION, downgraded, reason) {
            self.out.confidence = self.out.confidence.lowered();
        }
    }

    fn risk_reward_gate(&mut self) {
        if !self.out.action.is_buy() || !self.snapshot.has_price() {
            return;
        }
        let rr = self.vars.risk_reward_ratio;
        if rr >= self.config.min_risk_reward {
            return;
        }
        let reason = format!(
            "risk/reward {:.2} below minimum {:.2}",
            rr, self.config.min_risk_reward
        );
        self.set_action(RISK_REWARD_GATE, Action::Hold, reason);
    }

    fn volume_anomaly_gate(&mut self) {
        if self.out.action.is_buy() && self.vars.has_anomaly(AnomalyKind::FalseBreakoutRisk) {
            self.set_action(
                VOLUME_ANOMALY,
                Action::Hold,
                "false breakout risk: breakout without volume confirmation".to_string(),
            );
        }

        let vars = self.vars;
        if let Some(anomaly) = vars
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::DistributionRisk)
        {
            let warning = anomaly.description.clone();
            self.out.warnings.push(warning.clone());
            self.record(VOLUME_ANOMALY, warning, "warning only".to_string());
        }
    }

    fn high_risk_codes(&mut self) {
        let snapshot = self.snapshot;
        let signals = &snapshot.volume_price_signals;

        if let Some(sig) = signals.iter().find(|s| {
            matches!(
                s.code(),
                VolumePriceCode::BreakdownWithVolume | VolumePriceCode::GapDownWithVolume
            )
        }) {
            let reason = format!("{} detected", sig.code().label());
            self.force_exit(HIGH_RISK_VOLUME_PRICE, reason);
        }

        if self.out.action.is_buy() && snapshot.has_code(VolumePriceCode::SupplyOverhang) {
            self.set_action(
                HIGH_RISK_VOLUME_PRICE,
                Action::Hold,
                "supply overhang above price".to_string(),
            );
        }

        if snapshot.has_code(VolumePriceCode::ValidBreakout) {
            let raised = self.out.confidence.raised();
            if raised != self.out.confidence {
                let taken = format!(
                    "confidence {} -> {}",
                    self.out.confidence.to_label(),
                    raised.to_label()
                );
                self.out.confidence = raised;
                self.record(
                    HIGH_RISK_VOLUME_PRICE,
                    "valid breakout confirmed by volume".to_string(),
                    taken,
                );
            }
        }

        let threshold = self.config.high_severity_level;
        let severe = signals.iter().filter(|s| s.severity >= threshold).count();
        if severe >= 2 && self.out.confidence != ConfidenceLevel::Low {
            let taken = format!("confidence {} -> Low", self.out.confidence.to_label());
            self.out.confidence = ConfidenceLevel::Low;
            self.record(
                HIGH_RISK_VOLUME_PRICE,
                format!("{} high-severity volume-price signals", severe),
                taken,
            );
        }
    }

    fn structural_breakdown(&mut self) {
        if !self.snapshot.technical.three_bar_breakdown || self.out.action.is_sell() {
            return;
        }
        self.force_exit(
            STRUCTURAL_BREAKDOWN,
            "confirmed three-bar breakdown; exit".to_string(),
        );
    }

    fn liquidity_gate(&mut self) {
        if self.out.action.is_buy() && self.snapshot.volume.insufficient_liquidity {
            self.set_action(LIQUIDITY, Action::Hold, "insufficient liquidity".to_string());
        }
    }

    fn reversal_cooldown(&mut self, store: &dyn SignalStore, now: DateTime<Utc>) {
        let snapshot = self.snapshot;
        let symbol = snapshot.symbol.as_str();
        if symbol.is_empty() {
            tracing::warn!("snapshot has no symbol; skipping reversal cooldown");
            return;
        }

        let candidate = self.out.action;
        let score = self.out.final_score;
        let previous = store.swap(
            symbol,
            SignalRecord {
                action: candidate,
                score,
                updated_at: now,
            },
        );

        let Some(previous) = previous else {
            return;
        };
        if self.out.locked || !candidate.is_opposite(&previous.action) {
            return;
        }
        let diff = (score - previous.score).abs();
        if diff >= self.config.reversal_cooldown_points {
            return;
        }

        let calm = if candidate.is_buy() {
            Action::Hold
        } else {
            Action::Neutral
        };
        let reason = format!(
            "reversal from {} ({}) to {} ({}) on a {}-point move, below the {}-point cooldown",
            previous.action.to_label(),
            previous.score,
            candidate.to_label(),
            score,
            diff,
            self.config.reversal_cooldown_points
        );
        self.set_action(REVERSAL_COOLDOWN, calm, reason);
    }
}
