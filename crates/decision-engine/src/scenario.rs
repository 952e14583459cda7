use analysis_core::Action;
use serde::{Deserialize, Serialize};

pub const HIGH_ZONE_MIN: i32 = 65;
pub const LOW_ZONE_MAX: i32 = 45;
pub const SHORT_WEIGHT: f64 = 0.4;
pub const LONG_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    High,
    Mid,
    Low,
}

impl Zone {
    /// High at 65 and above, Low at 45 and below.
    pub fn of(score: i32) -> Zone {
        if score >= HIGH_ZONE_MIN {
            Zone::High
        } else if score <= LOW_ZONE_MAX {
            Zone::Low
        } else {
            Zone::Mid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl ScenarioCode {
    /// Scenario for a (short, long) zone pair. Every pair is mapped.
    pub fn lookup(short: Zone, long: Zone) -> ScenarioCode {
        match (short, long) {
            (Zone::High, Zone::High) => ScenarioCode::A,
            (Zone::Low, Zone::High) => ScenarioCode::B,
            (Zone::High, Zone::Low) => ScenarioCode::C,
            (Zone::Mid, Zone::High) => ScenarioCode::D,
            (Zone::Mid, Zone::Mid) => ScenarioCode::E,
            (Zone::Mid, Zone::Low) => ScenarioCode::F,
            (Zone::Low, Zone::Mid) => ScenarioCode::G,
            (Zone::Low, Zone::Low) => ScenarioCode::H,
            (Zone::High, Zone::Mid) => ScenarioCode::I,
        }
    }

    pub fn definition(&self) -> &'static ScenarioDefinition {
        let idx = SCENARIOS
            .iter()
            .position(|s| s.code == *self)
            .unwrap_or(NEUTRAL_INDEX);
        &SCENARIOS[idx]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Static guidance attached to a scenario
#[derive(Debug)]
pub struct ScenarioDefinition {
    pub code: ScenarioCode,
    pub action: Action,
    pub title: &'static str,
    pub description: &'static str,
    pub risk_level: RiskTier,
    pub position_guidance: &'static str,
    pub stop_loss_guidance: &'static str,
}

const NEUTRAL_INDEX: usize = 4;

static SCENARIOS: [ScenarioDefinition; 9] = [
    ScenarioDefinition {
        code: ScenarioCode::A,
        action: Action::StrongBuy,
        title: "Strong Buy",
        description: "Short- and long-term signals are both strong; momentum and trend agree.",
        risk_level: RiskTier::Medium,
        position_guidance: "Full planned position; add on pullbacks toward MA20.",
        stop_loss_guidance: "Exit on a close below MA20 or 8% below entry.",
    },
    ScenarioDefinition {
        code: ScenarioCode::B,
        action: Action::Accumulate,
        title: "Buy the Dip",
        description: "Long-term trend intact while short-term weakness offers a pullback entry.",
        risk_level: RiskTier::Medium,
        position_guidance: "Scale in 30-50% near support, add once the pullback stabilizes.",
        stop_loss_guidance: "Exit on a close below MA60 or the long-term support.",
    },
    ScenarioDefinition {
        code: ScenarioCode::C,
        action: Action::SpeculativeBuy,
        title: "Speculative Bounce",
        description: "Short-term rebound inside a weak long-term trend; trade it, do not marry it.",
        risk_level: RiskTier::High,
        position_guidance: "Small position only, at most 10-20% of a normal allocation.",
        stop_loss_guidance: "Tight stop 5% below entry or under the rebound low.",
    },
    ScenarioDefinition {
        code: ScenarioCode::D,
        action: Action::Hold,
        title: "Hold",
        description: "Long-term trend is strong but short-term momentum is undecided.",
        risk_level: RiskTier::Low,
        position_guidance: "Keep existing holdings; wait for short-term confirmation before adding.",
        stop_loss_guidance: "Trail the stop along MA20.",
    },
    ScenarioDefinition {
        code: ScenarioCode::E,
        action: Action::Neutral,
        title: "Neutral / Wait",
        description: "Neither horizon shows a directional edge.",
        risk_level: RiskTier::Medium,
        position_guidance: "Stay flat or trade the range with reduced size.",
        stop_loss_guidance: "Exit range trades on a break of the range boundary.",
    },
    ScenarioDefinition {
        code: ScenarioCode::F,
        action: Action::Reduce,
        title: "Reduce",
        description: "Long-term trend is weak and short-term momentum is fading.",
        risk_level: RiskTier::High,
        position_guidance: "Cut exposure to 30% or less; no new buying.",
        stop_loss_guidance: "Exit the remainder if a rally fails at MA20.",
    },
    ScenarioDefinition {
        code: ScenarioCode::G,
        action: Action::Sell,
        title: "Take Profit / Sell",
        description: "Short-term breakdown while the long-term picture is only neutral.",
        risk_level: RiskTier::High,
        position_guidance: "Take profits; hold 0-30% at most.",
        stop_loss_guidance: "Exit on a close below the nearest support.",
    },
    ScenarioDefinition {
        code: ScenarioCode::H,
        action: Action::StrongSell,
        title: "Strong Sell",
        description: "Both horizons are weak; the downtrend is confirmed.",
        risk_level: RiskTier::VeryHigh,
        position_guidance: "Exit all positions; no new longs.",
        stop_loss_guidance: "Exit immediately.",
    },
    ScenarioDefinition {
        code: ScenarioCode::I,
        action: Action::Buy,
        title: "Momentum Buy",
        description: "Short-term momentum is strong against a neutral long-term backdrop.",
        risk_level: RiskTier::Medium,
        position_guidance: "Moderate position of 30-50%; add on follow-through.",
        stop_loss_guidance: "Exit on a close below MA20 or 6% below entry.",
    },
];

/// Classifier output: the scenario plus its guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentAdvice {
    pub scenario: ScenarioCode,
    pub short_score: i32,
    pub long_score: i32,
    pub short_zone: Zone,
    pub long_zone: Zone,
    pub weighted_score: i32,
    pub action: Action,
    pub title: String,
    pub description: String,
    pub risk_level: RiskTier,
    pub position_guidance: String,
    pub stop_loss_guidance: String,
}

/// round(0.4 * short + 0.6 * long)
pub fn weighted_score(short_score: i32, long_score: i32) -> i32 {
    (SHORT_WEIGHT * short_score as f64 + LONG_WEIGHT * long_score as f64).round() as i32
}

pub fn classify(short_score: i32, long_score: i32) -> InvestmentAdvice {
    let short_zone = Zone::of(short_score);
    let long_zone = Zone::of(long_score);
    let code = ScenarioCode::lookup(short_zone, long_zone);
    let def = code.definition();

    tracing::debug!(
        "classified short={} ({:?}) long={} ({:?}) -> scenario {:?}",
        short_score,
        short_zone,
        long_score,
        long_zone,
        code
    );

    InvestmentAdvice {
        scenario: code,
        short_score,
        long_score,
        short_zone,
        long_zone,
        weighted_score: weighted_score(short_score, long_score),
        action: def.action,
        title: def.title.to_string(),
        description: def.description.to_string(),
        risk_level: def.risk_level,
        position_guidance: def.position_guidance.to_string(),
        stop_loss_guidance: def.stop_loss_guidance.to_string(),
    }
}
