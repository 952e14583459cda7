use analysis_core::{Action, ConfidenceLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filters::{last_action_change, FilterRecord};
use crate::range::RangeTradingPlan;
use crate::scenario::InvestmentAdvice;
use crate::scoring::ScoreResult;
use crate::targets::PriceTargetResult;
use crate::variables::DecisionVariables;

/// Everything one evaluation produced, ready for a renderer or a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub symbol: String,
    pub evaluated_at: DateTime<Utc>,
    pub variables: DecisionVariables,
    pub short_term: ScoreResult,
    pub long_term: ScoreResult,
    pub advice: InvestmentAdvice,
    pub overrides: Vec<FilterRecord>,
    pub action: Action,
    pub recommendation: String,
    pub confidence: ConfidenceLevel,
    pub final_score: i32,
    pub price_target: PriceTargetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_plan: Option<RangeTradingPlan>,
    pub weight_table_version: String,
    pub warnings: Vec<String>,
}

impl DecisionResult {
    pub fn was_overridden(&self) -> bool {
        self.action != self.advice.action
    }

    /// One-line recommendation as stored on a watchlist row.
    pub fn watchlist_summary(&self) -> String {
        let mut line = format!(
            "{} [{}] score {} ({} confidence)",
            self.action.to_label(),
            scenario_tag(&self.advice),
            self.final_score,
            self.confidence.to_label()
        );
        if self.price_target.available {
            line.push_str(&format!(
                " | target {:.2} stop {:.2}",
                self.price_target.target_price, self.price_target.stop_loss
            ));
        }
        if let Some(last) = last_action_change(&self.overrides) {
            line.push_str(&format!(" | {}", last.filter_name));
        }
        line
    }
}

fn scenario_tag(advice: &InvestmentAdvice) -> String {
    format!("{:?}", advice.scenario)
}
