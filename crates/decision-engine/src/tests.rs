#[cfg(test)]
mod decision_engine_tests {
    use crate::filters::{
        apply_filters, HIGH_RISK_VOLUME_PRICE, REVERSAL_COOLDOWN, VOLUME_CONFIRMATION,
    };
    use crate::scenario::{classify, ScenarioCode};
    use crate::scoring::{score_short, BASE_SCORE};
    use crate::targets::ALREADY_REACHED_NOTE;
    use crate::variables::extract;
    use crate::{DecisionEngine, EngineConfig, InMemorySignalStore};
    use analysis_core::{Action, AnalysisSnapshot, ConfidenceLevel, SignalRecord, SignalStore};
    use approx::assert_relative_eq;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn strong_uptrend() -> Value {
        json!({
            "symbol": "2330",
            "current_price": 130.0,
            "technical": {
                "ma5": 128.0, "ma20": 124.0, "ma60": 118.0, "ma120": 110.0, "ma240": 100.0,
                "ma20_slope": 0.5, "ma60_slope": 0.3, "ma120_slope": 0.3, "ma240_slope": 0.1,
                "macd_hist": 1.2, "macd_bullish_divergence": true, "rsi": 62, "adx": 30
            },
            "pattern": {
                "detected": true, "type": "bottom", "status": "confirmed", "name": "W bottom",
                "neckline": 120.0, "measured_move": 20.0, "stop_price": 116.0
            }
        })
    }

    fn snapshot(value: Value) -> AnalysisSnapshot {
        AnalysisSnapshot::from_value(value).unwrap()
    }

    fn seeded(action: Action, score: i32) -> InMemorySignalStore {
        let store = InMemorySignalStore::new();
        store.put(
            "2330",
            SignalRecord {
                action,
                score,
                updated_at: Utc::now(),
            },
        );
        store
    }

    #[test]
    fn test_strong_uptrend_end_to_end() {
        let result = DecisionEngine::default().evaluate(&snapshot(strong_uptrend()));

        assert_eq!(result.short_term.final_score, 90);
        assert_eq!(result.long_term.final_score, 100);
        assert_eq!(result.advice.scenario, ScenarioCode::A);
        assert_eq!(result.advice.weighted_score, 96);
        assert_eq!(result.action, Action::StrongBuy);
        assert_eq!(result.confidence, ConfidenceLevel::High);
        assert!(result.overrides.is_empty());
        assert!(result.range_plan.is_none());

        let target = &result.price_target;
        assert!(target.available);
        assert_relative_eq!(target.target_price, 140.0);
        assert_relative_eq!(target.stop_loss, 116.0);
        assert!(target.note.is_none());
    }

    #[test]
    fn test_clamping_happens_once() {
        let result = score_short(&snapshot(json!({
            "current_price": 100.0,
            "pattern": {"detected": true, "type": "bottom", "status": "confirmed"},
            "wave": {"breakout_detected": true, "breakout_volume_confirmed": true, "bullish_environment": true},
            "technical": {"macd_hist": 0.4, "macd_bullish_divergence": true},
            "mean_reversion": {"left_buy_triggered": true}
        })));
        let sum: i32 = result.components.iter().map(|c| c.score).sum();
        assert_eq!(result.raw_score, BASE_SCORE + sum);
        assert_eq!(result.raw_score, 126);
        assert_eq!(result.final_score, 100);

        let mixed = score_short(&snapshot(json!({
            "current_price": 100.0,
            "pattern": {"detected": true, "type": "bottom", "status": "confirmed"},
            "wave": {
                "breakout_detected": true, "breakout_volume_confirmed": true,
                "bullish_environment": true, "bearish_environment": true
            },
            "technical": {"macd_bullish_divergence": true, "macd_bearish_divergence": true}
        })));
        let sum: i32 = mixed.components.iter().map(|c| c.score).sum();
        assert_eq!(mixed.final_score, (BASE_SCORE + sum).clamp(0, 100));
    }

    #[test]
    fn test_strong_buy_and_dip_examples() {
        let a = classify(85, 78);
        assert_eq!((a.scenario, a.weighted_score, a.action), (ScenarioCode::A, 81, Action::StrongBuy));
        let b = classify(30, 72);
        assert_eq!((b.scenario, b.weighted_score), (ScenarioCode::B, 55));
    }

    #[test]
    fn test_volume_confirmation_end_to_end() {
        let mut value = strong_uptrend();
        value["volume"] = json!({"ratio": 0.5});
        let result = DecisionEngine::default().evaluate(&snapshot(value));

        assert_eq!(result.advice.action, Action::StrongBuy);
        assert_eq!(result.action, Action::Buy);
        let entry = result
            .overrides
            .iter()
            .find(|o| o.filter_name == VOLUME_CONFIRMATION)
            .unwrap();
        assert_eq!(entry.action_taken, "Strong Buy -> Buy");
        assert!(result.confidence < ConfidenceLevel::High);
        assert!(result.recommendation.starts_with("Strong Buy -> Buy"));
    }

    #[test]
    fn test_confidence_records_do_not_explain_action_change() {
        let mut value = strong_uptrend();
        value["volume"] = json!({"ratio": 0.5});
        value["volume_price_signals"] = json!([{"code": "valid_breakout", "severity": 2}]);
        let result = DecisionEngine::default().evaluate(&snapshot(value));

        assert_eq!(result.action, Action::Buy);
        let names: Vec<&str> = result.overrides.iter().map(|o| o.filter_name.as_str()).collect();
        assert_eq!(names, vec![VOLUME_CONFIRMATION, HIGH_RISK_VOLUME_PRICE]);
        assert!(result.overrides[0].action_changed);
        assert!(!result.overrides[1].action_changed);
        assert!(result.overrides[1].action_taken.starts_with("confidence"));

        assert!(result.recommendation.starts_with("Strong Buy -> Buy: volume ratio 0.50"));
        assert!(result.watchlist_summary().ends_with("| volume confirmation"));
    }

    #[test]
    fn test_config_override_moves_filters_not_weights() {
        let mut value = strong_uptrend();
        value["volume"] = json!({"ratio": 0.6});
        let snap = snapshot(value);

        let stock = DecisionEngine::default().evaluate(&snap);
        let config = EngineConfig {
            volume_shrink_ratio: 0.5,
            ..EngineConfig::default()
        };
        let loose = DecisionEngine::new(config).evaluate(&snap);

        // Same weight table either way
        assert_eq!(stock.short_term.components, loose.short_term.components);
        assert_eq!(stock.short_term.final_score, loose.short_term.final_score);
        assert!(loose.short_term.components.iter().any(|c| c.name == "volume_shrink"));
        // Only the confirmation filter follows the override
        assert_eq!(stock.action, Action::Buy);
        assert_eq!(loose.action, Action::StrongBuy);
        assert!(loose.overrides.is_empty());
    }

    #[test]
    fn test_reversal_cooldown_fires_on_small_move() {
        let engine = DecisionEngine::default();
        let store = seeded(Action::Sell, 80);
        let result = engine.evaluate_with_memory(&snapshot(strong_uptrend()), &store);

        assert_eq!(result.advice.action, Action::StrongBuy);
        assert_eq!(result.action, Action::Hold);
        assert_eq!(result.overrides.last().unwrap().filter_name, REVERSAL_COOLDOWN);
        // Memory keeps the candidate so a sustained move can flip next time
        let stored = store.get("2330").unwrap();
        assert_eq!(stored.action, Action::StrongBuy);
        assert_eq!(stored.score, 96);
    }

    #[test]
    fn test_reversal_cooldown_skips_large_move() {
        let engine = DecisionEngine::default();
        let store = seeded(Action::Sell, 40);
        let result = engine.evaluate_with_memory(&snapshot(strong_uptrend()), &store);
        assert_eq!(result.action, Action::StrongBuy);
        assert!(result.overrides.is_empty());
    }

    #[test]
    fn test_cooldown_example_scores() {
        let config = EngineConfig::default();
        let snap = snapshot(json!({"symbol": "2330", "current_price": 100.0}));
        let vars = extract(&snap, &config);

        // Last sell at 80, buy at 95: 15 points is below the 30-point cooldown
        let store = seeded(Action::Sell, 80);
        let advice = classify(95, 95);
        let out = apply_filters(&advice, &vars, &snap, &config, ConfidenceLevel::Medium, Some(&store), Utc::now());
        assert_eq!(out.action, Action::Hold);
        assert_eq!(out.overrides[0].filter_name, REVERSAL_COOLDOWN);

        // Same history, buy-class at 40: a 40-point move is allowed through
        let store = seeded(Action::Sell, 80);
        let advice = classify(67, 22);
        assert_eq!(advice.weighted_score, 40);
        assert!(advice.action.is_buy());
        let out = apply_filters(&advice, &vars, &snap, &config, ConfidenceLevel::Medium, Some(&store), Utc::now());
        assert_eq!(out.action, advice.action);
        assert!(out.overrides.iter().all(|o| o.filter_name != REVERSAL_COOLDOWN));
    }

    #[test]
    fn test_repeat_evaluation_is_idempotent() {
        let engine = DecisionEngine::default();
        let store = InMemorySignalStore::new();
        let snap = snapshot(strong_uptrend());

        let first = engine.evaluate_with_memory(&snap, &store);
        let second = engine.evaluate_with_memory(&snap, &store);
        assert_eq!(first.action, second.action);
        assert_eq!(first.final_score, second.final_score);
        assert!(second.overrides.is_empty());
    }

    #[test]
    fn test_plain_evaluate_leaves_memory_alone() {
        let engine = DecisionEngine::default();
        let store = seeded(Action::Sell, 80);
        let result = engine.evaluate(&snapshot(strong_uptrend()));
        assert_eq!(result.action, Action::StrongBuy);
        assert_eq!(store.get("2330").unwrap().action, Action::Sell);
    }

    #[test]
    fn test_roll_forward_end_to_end() {
        let mut value = strong_uptrend();
        value["current_price"] = json!(150.0);
        let result = DecisionEngine::default().evaluate(&snapshot(value));

        assert!(result.action.is_buy());
        let target = &result.price_target;
        assert!(target.target_price > 140.0);
        assert_relative_eq!(target.target_price, 165.0, epsilon = 1e-9);
        assert_eq!(target.note.as_deref(), Some(ALREADY_REACHED_NOTE));
    }

    #[test]
    fn test_range_market_gets_band_plan() {
        let result = DecisionEngine::default().evaluate(&snapshot(json!({
            "symbol": "RANGE",
            "current_price": 100.0,
            "technical": {"adx": 14, "ma20": 101.0, "ma60": 98.0},
            "support_resistance": {"support1": 96.0, "resistance1": 106.0}
        })));
        let plan = result.range_plan.unwrap();
        assert_relative_eq!(plan.lower_bound, 96.0);
        assert_relative_eq!(plan.upper_bound, 106.0);
        assert_relative_eq!(plan.position_pct, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_garbage_input_still_yields_a_result() {
        let result = DecisionEngine::default().evaluate(&snapshot(json!({
            "symbol": "JUNK",
            "current_price": "abc",
            "technical": "not a section",
            "pattern": {"detected": "maybe", "type": 7},
            "volume_price_signals": {"code": "breakdown_with_volume"},
            "fundamental": {"pe": "N/A", "dividend_yield": "3,5%"}
        })));
        assert_eq!(result.symbol, "JUNK");
        assert!(!result.price_target.available);
        assert_eq!(result.short_term.final_score, 50);
    }

    #[test]
    fn test_concurrent_evaluations_share_one_store() {
        let engine = Arc::new(DecisionEngine::default());
        let store = Arc::new(InMemorySignalStore::new());

        let handles: Vec<_> = ["AAA", "BBB", "CCC", "AAA"]
            .into_iter()
            .map(|symbol| {
                let engine = Arc::clone(&engine);
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut value = strong_uptrend();
                    value["symbol"] = json!(symbol);
                    engine.evaluate_with_memory(&snapshot(value), &*store).action
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Action::StrongBuy);
        }
        assert_eq!(store.len(), 3);
    }
}
