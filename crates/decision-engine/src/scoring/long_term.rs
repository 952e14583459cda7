use analysis_core::AnalysisSnapshot;

use super::{Rule, ScoreCategory};

fn price_vs(s: &AnalysisSnapshot, ma: Option<f64>) -> Option<std::cmp::Ordering> {
    match ma {
        Some(level) if level > 0.0 && s.has_price() => s.price().partial_cmp(&level),
        _ => None,
    }
}

fn above(s: &AnalysisSnapshot, ma: Option<f64>) -> bool {
    price_vs(s, ma) == Some(std::cmp::Ordering::Greater)
}

fn below(s: &AnalysisSnapshot, ma: Option<f64>) -> bool {
    price_vs(s, ma) == Some(std::cmp::Ordering::Less)
}

fn position_reason(s: &AnalysisSnapshot, ma: Option<f64>, label: &str) -> String {
    format!("Price {:+.1}% vs {}", s.pct_from(ma).unwrap_or_default(), label)
}

/// MA5, MA20, MA60, MA120 when all four are present.
fn ladder(s: &AnalysisSnapshot) -> Option<[f64; 4]> {
    let t = &s.technical;
    Some([t.ma5?, t.ma20?, t.ma60?, t.ma120?])
}

fn pe_in(s: &AnalysisSnapshot, pred: fn(f64) -> bool) -> bool {
    s.fundamental.pe.map(pred).unwrap_or(false)
}

fn pb_in(s: &AnalysisSnapshot, pred: fn(f64) -> bool) -> bool {
    s.fundamental.pb.map(pred).unwrap_or(false)
}

fn yield_in(s: &AnalysisSnapshot, pred: fn(f64) -> bool) -> bool {
    s.fundamental.dividend_yield.map(pred).unwrap_or(false)
}

fn buy_days(s: &AnalysisSnapshot) -> u32 {
    s.chip.consecutive_buy_days.unwrap_or(0)
}

fn sell_days(s: &AnalysisSnapshot) -> u32 {
    s.chip.consecutive_sell_days.unwrap_or(0)
}

static RULES: &[Rule] = &[
    // Yearly / semi-annual moving averages
    Rule {
        name: "above_yearly_ma",
        category: ScoreCategory::MovingAverage,
        weight: 15,
        applies: |s| above(s, s.technical.ma240),
        explain: |s| position_reason(s, s.technical.ma240, "MA240 (yearly)"),
    },
    Rule {
        name: "below_yearly_ma",
        category: ScoreCategory::MovingAverage,
        weight: -15,
        applies: |s| below(s, s.technical.ma240),
        explain: |s| position_reason(s, s.technical.ma240, "MA240 (yearly)"),
    },
    Rule {
        name: "yearly_ma_rising",
        category: ScoreCategory::MovingAverage,
        weight: 5,
        applies: |s| s.technical.ma240_slope.map(|v| v > 0.0).unwrap_or(false),
        explain: |_| "MA240 rising".to_string(),
    },
    Rule {
        name: "yearly_ma_falling",
        category: ScoreCategory::MovingAverage,
        weight: -5,
        applies: |s| s.technical.ma240_slope.map(|v| v < 0.0).unwrap_or(false),
        explain: |_| "MA240 falling".to_string(),
    },
    Rule {
        name: "above_semiannual_ma",
        category: ScoreCategory::MovingAverage,
        weight: 10,
        applies: |s| above(s, s.technical.ma120),
        explain: |s| position_reason(s, s.technical.ma120, "MA120 (semi-annual)"),
    },
    Rule {
        name: "below_semiannual_ma",
        category: ScoreCategory::MovingAverage,
        weight: -10,
        applies: |s| below(s, s.technical.ma120),
        explain: |s| position_reason(s, s.technical.ma120, "MA120 (semi-annual)"),
    },
    Rule {
        name: "semiannual_ma_rising",
        category: ScoreCategory::MovingAverage,
        weight: 5,
        applies: |s| s.technical.ma120_slope.map(|v| v > 0.0).unwrap_or(false),
        explain: |_| "MA120 rising".to_string(),
    },
    Rule {
        name: "semiannual_ma_falling",
        category: ScoreCategory::MovingAverage,
        weight: -5,
        applies: |s| s.technical.ma120_slope.map(|v| v < 0.0).unwrap_or(false),
        explain: |_| "MA120 falling".to_string(),
    },
    // Alignment
    Rule {
        name: "bullish_alignment",
        category: ScoreCategory::Alignment,
        weight: 15,
        applies: |s| ladder(s).map(|m| m[0] > m[1] && m[1] > m[2] && m[2] > m[3]).unwrap_or(false),
        explain: |_| "Bullish alignment MA5 > MA20 > MA60 > MA120".to_string(),
    },
    Rule {
        name: "bearish_alignment",
        category: ScoreCategory::Alignment,
        weight: -15,
        applies: |s| ladder(s).map(|m| m[0] < m[1] && m[1] < m[2] && m[2] < m[3]).unwrap_or(false),
        explain: |_| "Bearish alignment MA5 < MA20 < MA60 < MA120".to_string(),
    },
    // Valuation
    Rule {
        name: "pe_deep_value",
        category: ScoreCategory::Valuation,
        weight: 10,
        applies: |s| pe_in(s, |pe| pe > 0.0 && pe <= 12.0),
        explain: |s| format!("P/E {:.1} deep value", s.fundamental.pe.unwrap_or_default()),
    },
    Rule {
        name: "pe_fair",
        category: ScoreCategory::Valuation,
        weight: 5,
        applies: |s| pe_in(s, |pe| pe > 12.0 && pe <= 20.0),
        explain: |s| format!("P/E {:.1} reasonable", s.fundamental.pe.unwrap_or_default()),
    },
    Rule {
        name: "pe_expensive",
        category: ScoreCategory::Valuation,
        weight: -10,
        applies: |s| pe_in(s, |pe| pe > 40.0),
        explain: |s| format!("P/E {:.1} expensive", s.fundamental.pe.unwrap_or_default()),
    },
    Rule {
        name: "pe_loss_making",
        category: ScoreCategory::Valuation,
        weight: -10,
        applies: |s| pe_in(s, |pe| pe <= 0.0),
        explain: |s| format!("P/E {:.1}: loss-making", s.fundamental.pe.unwrap_or_default()),
    },
    Rule {
        name: "pb_below_book",
        category: ScoreCategory::Valuation,
        weight: 8,
        applies: |s| pb_in(s, |pb| pb > 0.0 && pb <= 1.0),
        explain: |s| format!("P/B {:.2} at or below book", s.fundamental.pb.unwrap_or_default()),
    },
    Rule {
        name: "pb_rich",
        category: ScoreCategory::Valuation,
        weight: -5,
        applies: |s| pb_in(s, |pb| pb > 5.0),
        explain: |s| format!("P/B {:.2} rich", s.fundamental.pb.unwrap_or_default()),
    },
    Rule {
        name: "dividend_high",
        category: ScoreCategory::Valuation,
        weight: 10,
        applies: |s| yield_in(s, |y| y >= 5.0),
        explain: |s| format!("Dividend yield {:.2}%", s.fundamental.dividend_yield.unwrap_or_default()),
    },
    Rule {
        name: "dividend_solid",
        category: ScoreCategory::Valuation,
        weight: 5,
        applies: |s| yield_in(s, |y| (3.0..5.0).contains(&y)),
        explain: |s| format!("Dividend yield {:.2}%", s.fundamental.dividend_yield.unwrap_or_default()),
    },
    // Institutional flow
    Rule {
        name: "institutional_buy_streak",
        category: ScoreCategory::InstitutionalFlow,
        weight: 10,
        applies: |s| buy_days(s) >= 5,
        explain: |s| format!("Institutions net buyers {} days running", buy_days(s)),
    },
    Rule {
        name: "institutional_buy_run",
        category: ScoreCategory::InstitutionalFlow,
        weight: 5,
        applies: |s| (3..5).contains(&buy_days(s)),
        explain: |s| format!("Institutions net buyers {} days running", buy_days(s)),
    },
    Rule {
        name: "institutional_sell_streak",
        category: ScoreCategory::InstitutionalFlow,
        weight: -10,
        applies: |s| sell_days(s) >= 5,
        explain: |s| format!("Institutions net sellers {} days running", sell_days(s)),
    },
    Rule {
        name: "institutional_sell_run",
        category: ScoreCategory::InstitutionalFlow,
        weight: -5,
        applies: |s| (3..5).contains(&sell_days(s)),
        explain: |s| format!("Institutions net sellers {} days running", sell_days(s)),
    },
    Rule {
        name: "foreign_net_inflow",
        category: ScoreCategory::InstitutionalFlow,
        weight: 3,
        applies: |s| s.chip.net_foreign_flow.map(|f| f > 0.0).unwrap_or(false),
        explain: |s| format!("Foreign net inflow {:.0}", s.chip.net_foreign_flow.unwrap_or_default()),
    },
    Rule {
        name: "foreign_net_outflow",
        category: ScoreCategory::InstitutionalFlow,
        weight: -3,
        applies: |s| s.chip.net_foreign_flow.map(|f| f < 0.0).unwrap_or(false),
        explain: |s| format!("Foreign net outflow {:.0}", s.chip.net_foreign_flow.unwrap_or_default()),
    },
];

/// Long-track weight table, in evaluation order.
pub fn rules() -> &'static [Rule] {
    RULES
}
