//! Dual-track additive scoring.
//!
//! Each track starts at [`BASE_SCORE`] and walks a declarative rule table. A
//! firing rule contributes its fixed signed weight as a [`ScoreComponent`].
//! The sum is clamped to 0..=100 exactly once, after every component has been
//! added; clamping per component would flatten strongly one-sided signals.

pub mod long_term;
pub mod short_term;

use analysis_core::{AnalysisSnapshot, ConfidenceLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BASE_SCORE: i32 = 50;
pub const WEIGHT_TABLE_VERSION: &str = "dual-track/3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Pattern,
    Wave,
    Volume,
    Oscillator,
    MeanReversion,
    Risk,
    MovingAverage,
    Alignment,
    Valuation,
    InstitutionalFlow,
}

/// One row of a weight table.
pub struct Rule {
    pub name: &'static str,
    pub category: ScoreCategory,
    pub weight: i32,
    pub applies: fn(&AnalysisSnapshot) -> bool,
    pub explain: fn(&AnalysisSnapshot) -> String,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("weight", &self.weight)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub score: i32,
    pub reason: String,
    pub category: ScoreCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub track: Track,
    pub base_score: i32,
    pub components: Vec<ScoreComponent>,
    /// Base plus all deltas, unclamped
    pub raw_score: i32,
    pub final_score: i32,
    pub confidence: ConfidenceLevel,
    pub category_scores: BTreeMap<ScoreCategory, i32>,
}

impl ScoreResult {
    pub fn from_components(track: Track, components: Vec<ScoreComponent>) -> Self {
        let raw_score = BASE_SCORE + components.iter().map(|c| c.score).sum::<i32>();
        let final_score = raw_score.clamp(0, 100);
        let confidence = derive_confidence(&components, final_score);

        let mut category_scores = BTreeMap::new();
        for c in &components {
            *category_scores.entry(c.category).or_insert(0) += c.score;
        }

        Self {
            track,
            base_score: BASE_SCORE,
            components,
            raw_score,
            final_score,
            confidence,
            category_scores,
        }
    }

    pub fn positive_count(&self) -> usize {
        self.components.iter().filter(|c| c.score > 0).count()
    }

    pub fn negative_count(&self) -> usize {
        self.components.iter().filter(|c| c.score < 0).count()
    }
}

/// Evaluate a weight table against a snapshot, in table order.
pub fn evaluate(track: Track, rules: &[Rule], snapshot: &AnalysisSnapshot) -> ScoreResult {
    let components = rules
        .iter()
        .filter(|rule| (rule.applies)(snapshot))
        .map(|rule| ScoreComponent {
            name: rule.name.to_string(),
            score: rule.weight,
            reason: (rule.explain)(snapshot),
            category: rule.category,
        })
        .collect();

    let result = ScoreResult::from_components(track, components);
    tracing::debug!(
        "{:?} track for {}: raw={} final={} ({} components, confidence {:?})",
        track,
        snapshot.symbol,
        result.raw_score,
        result.final_score,
        result.components.len(),
        result.confidence
    );
    result
}

/// Short-track weight table as scored under [`WEIGHT_TABLE_VERSION`].
pub fn short_term_rules() -> &'static [Rule] {
    short_term::rules()
}

/// Long-track weight table as scored under [`WEIGHT_TABLE_VERSION`].
pub fn long_term_rules() -> &'static [Rule] {
    long_term::rules()
}

/// Tactical track: patterns, waves, volume, oscillators, short-term risk.
pub fn score_short(snapshot: &AnalysisSnapshot) -> ScoreResult {
    evaluate(Track::Short, short_term_rules(), snapshot)
}

/// Strategic track: long moving averages, alignment, valuation, flows.
pub fn score_long(snapshot: &AnalysisSnapshot) -> ScoreResult {
    evaluate(Track::Long, long_term_rules(), snapshot)
}

/// Agreement between components and distance of the score from neutral.
///
/// consistency = |p - n| / t, deviation = |score - 50| / 50.
pub fn derive_confidence(components: &[ScoreComponent], final_score: i32) -> ConfidenceLevel {
    let total = components.len();
    if total == 0 {
        return ConfidenceLevel::Low;
    }
    let positive = components.iter().filter(|c| c.score > 0).count() as f64;
    let negative = components.iter().filter(|c| c.score < 0).count() as f64;

    let consistency = (positive - negative).abs() / total as f64;
    let deviation = (final_score - BASE_SCORE).abs() as f64 / 50.0;

    if consistency > 0.7 && deviation > 0.4 {
        ConfidenceLevel::High
    } else if consistency > 0.4 || deviation > 0.2 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, score: i32) -> ScoreComponent {
        ScoreComponent {
            name: name.to_string(),
            score,
            reason: String::new(),
            category: ScoreCategory::Pattern,
        }
    }

    #[test]
    fn test_rule_tables_are_published() {
        let short = short_term_rules();
        let long = long_term_rules();
        assert!(short.iter().any(|r| r.name == "bottom_pattern_confirmed"));
        assert!(long.iter().all(|r| !short.iter().any(|s| s.name == r.name)));
        assert!(short.iter().chain(long).all(|r| r.weight != 0));
    }

    #[test]
    fn test_clamp_applies_once_after_summation() {
        // +40 +30 -20: sequential clamping would stop at 100 then drop to 80
        let result = ScoreResult::from_components(
            Track::Short,
            vec![component("a", 40), component("b", 30), component("c", -20)],
        );
        assert_eq!(result.raw_score, 100);
        assert_eq!(result.final_score, 100);

        let result = ScoreResult::from_components(
            Track::Short,
            vec![component("a", 40), component("b", 30)],
        );
        assert_eq!(result.raw_score, 120);
        assert_eq!(result.final_score, 100);

        let result = ScoreResult::from_components(
            Track::Long,
            vec![component("a", -45), component("b", -30), component("c", 20)],
        );
        assert_eq!(result.raw_score, -5);
        assert_eq!(result.final_score, 0);
    }

    #[test]
    fn test_category_subtotals() {
        let mut comps = vec![component("a", 10), component("b", -4)];
        comps.push(ScoreComponent {
            name: "c".to_string(),
            score: 7,
            reason: String::new(),
            category: ScoreCategory::Valuation,
        });
        let result = ScoreResult::from_components(Track::Long, comps);
        assert_eq!(result.category_scores[&ScoreCategory::Pattern], 6);
        assert_eq!(result.category_scores[&ScoreCategory::Valuation], 7);
        assert_eq!(result.positive_count(), 2);
        assert_eq!(result.negative_count(), 1);
    }

    #[test]
    fn test_confidence_derivation() {
        assert_eq!(derive_confidence(&[], 50), ConfidenceLevel::Low);

        // all positive, score 80: consistency 1.0, deviation 0.6
        let comps = vec![component("a", 20), component("b", 10)];
        assert_eq!(derive_confidence(&comps, 80), ConfidenceLevel::High);

        // consistency 1.0 but deviation 0.2 -> Medium
        let comps = vec![component("a", 10)];
        assert_eq!(derive_confidence(&comps, 60), ConfidenceLevel::Medium);

        // mixed signals near neutral -> Low
        let comps = vec![component("a", 5), component("b", -5)];
        assert_eq!(derive_confidence(&comps, 50), ConfidenceLevel::Low);

        // mixed but far from neutral -> Medium
        let comps = vec![component("a", 30), component("b", -2)];
        assert_eq!(derive_confidence(&comps, 78), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_rule_names_are_unique() {
        let mut names: Vec<&str> = short_term::rules()
            .iter()
            .chain(long_term::rules().iter())
            .map(|r| r.name)
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_empty_snapshot_scores_base() {
        let snap = AnalysisSnapshot::default();
        let short = score_short(&snap);
        let long = score_long(&snap);
        assert_eq!(short.final_score, BASE_SCORE);
        assert_eq!(long.final_score, BASE_SCORE);
        assert!(short.components.is_empty());
        assert_eq!(short.confidence, ConfidenceLevel::Low);
    }
}
