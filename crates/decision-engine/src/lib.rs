//! Multi-factor decision engine.
//!
//! Turns one [`AnalysisSnapshot`](analysis_core::AnalysisSnapshot) into a
//! [`DecisionResult`]: dual-track scores, a nine-way scenario, risk filters
//! and price targets.

pub mod config;
pub mod engine;
pub mod filters;
pub mod memory;
pub mod range;
pub mod result;
pub mod scenario;
pub mod scoring;
pub mod targets;
pub mod variables;

pub use config::EngineConfig;
pub use engine::DecisionEngine;
pub use filters::{FilterOutcome, FilterRecord};
pub use memory::InMemorySignalStore;
pub use range::{RangeSuggestion, RangeTradingPlan};
pub use result::DecisionResult;
pub use scenario::{classify, InvestmentAdvice, ScenarioCode, Zone};
pub use scoring::{score_long, score_short, ScoreComponent, ScoreResult};
pub use targets::{compute_targets, PriceTargetResult};
pub use variables::{extract, DecisionVariables};

#[cfg(test)]
mod tests;
