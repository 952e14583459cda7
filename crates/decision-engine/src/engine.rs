use analysis_core::{AnalysisSnapshot, ConfidenceLevel, SignalStore};
use chrono::Utc;

use crate::config::EngineConfig;
use crate::filters::{apply_filters, FilterOutcome};
use crate::range::range_plan;
use crate::result::DecisionResult;
use crate::scenario::{classify, InvestmentAdvice, ScenarioCode};
use crate::scoring::{score_long, score_short, WEIGHT_TABLE_VERSION};
use crate::targets::compute_targets;
use crate::variables::{extract, TrendStatus};

/// Runs the full decision pipeline for one snapshot.
///
/// Holds nothing but configuration, so one engine can be shared across
/// threads. Signal memory is owned by the caller and only touched by
/// [`DecisionEngine::evaluate_with_memory`].
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate without reversal hysteresis.
    pub fn evaluate(&self, snapshot: &AnalysisSnapshot) -> DecisionResult {
        self.run(snapshot, None)
    }

    /// Evaluate and apply the reversal cooldown against `memory`, recording
    /// this evaluation's action for the symbol.
    pub fn evaluate_with_memory(
        &self,
        snapshot: &AnalysisSnapshot,
        memory: &dyn SignalStore,
    ) -> DecisionResult {
        self.run(snapshot, Some(memory))
    }

    fn run(&self, snapshot: &AnalysisSnapshot, memory: Option<&dyn SignalStore>) -> DecisionResult {
        let evaluated_at = snapshot.as_of.unwrap_or_else(Utc::now);
        tracing::debug!("Evaluating {} as of {}", snapshot.symbol, evaluated_at);

        let variables = extract(snapshot, &self.config);
        let short_term = score_short(snapshot);
        let long_term = score_long(snapshot);
        let advice = classify(short_term.final_score, long_term.final_score);
        let confidence = ConfidenceLevel::combine(short_term.confidence, long_term.confidence);

        let outcome = apply_filters(
            &advice,
            &variables,
            snapshot,
            &self.config,
            confidence,
            memory,
            evaluated_at,
        );

        let price_target = compute_targets(snapshot, outcome.action);
        let range_plan = if variables.trend_status == TrendStatus::Range
            || advice.scenario == ScenarioCode::E
        {
            range_plan(snapshot)
        } else {
            None
        };

        let recommendation = recommendation_text(&advice, &outcome);
        tracing::info!(
            "{}: short={} long={} scenario={:?} -> {} (score {}, {} confidence, {} overrides)",
            snapshot.symbol,
            short_term.final_score,
            long_term.final_score,
            advice.scenario,
            outcome.action.to_label(),
            outcome.final_score,
            outcome.confidence.to_label(),
            outcome.overrides.len()
        );

        DecisionResult {
            symbol: snapshot.symbol.clone(),
            evaluated_at,
            variables,
            short_term,
            long_term,
            action: outcome.action,
            recommendation,
            confidence: outcome.confidence,
            final_score: outcome.final_score,
            overrides: outcome.overrides,
            warnings: outcome.warnings,
            advice,
            price_target,
            range_plan,
            weight_table_version: WEIGHT_TABLE_VERSION.to_string(),
        }
    }
}

fn recommendation_text(advice: &InvestmentAdvice, outcome: &FilterOutcome) -> String {
    if outcome.action == advice.action {
        return format!("{}: {}", advice.title, advice.description);
    }
    let reason = outcome
        .last_action_change()
        .map(|o| o.reason.as_str())
        .unwrap_or("filtered");
    format!(
        "{} -> {}: {}",
        advice.action.to_label(),
        outcome.action.to_label(),
        reason
    )
}
