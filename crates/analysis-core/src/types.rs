use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommended action, the code consumed by order execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StrongBuy,
    Buy,
    /// Buy the dip while the long-term picture holds
    Accumulate,
    /// Small speculative position against the long-term trend
    SpeculativeBuy,
    Hold,
    Neutral,
    Reduce,
    Sell,
    StrongSell,
}

/// Polarity of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    Buy,
    Neutral,
    Sell,
}

impl Action {
    pub fn class(&self) -> ActionClass {
        match self {
            Action::StrongBuy | Action::Buy | Action::Accumulate | Action::SpeculativeBuy => {
                ActionClass::Buy
            }
            Action::Hold | Action::Neutral => ActionClass::Neutral,
            Action::Reduce | Action::Sell | Action::StrongSell => ActionClass::Sell,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.class() == ActionClass::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.class() == ActionClass::Sell
    }

    /// Buy-class versus sell-class (neutral actions have no opposite).
    pub fn is_opposite(&self, other: &Action) -> bool {
        matches!(
            (self.class(), other.class()),
            (ActionClass::Buy, ActionClass::Sell) | (ActionClass::Sell, ActionClass::Buy)
        )
    }

    /// One tier more cautious for buy-class actions; others are unchanged.
    pub fn downgraded(&self) -> Action {
        match self {
            Action::StrongBuy => Action::Buy,
            Action::Buy | Action::Accumulate | Action::SpeculativeBuy => Action::Hold,
            other => *other,
        }
    }

    /// Human-readable label for the action
    pub fn to_label(&self) -> &'static str {
        match self {
            Action::StrongBuy => "Strong Buy",
            Action::Buy => "Buy",
            Action::Accumulate => "Buy the Dip",
            Action::SpeculativeBuy => "Speculative Buy",
            Action::Hold => "Hold",
            Action::Neutral => "Neutral",
            Action::Reduce => "Reduce",
            Action::Sell => "Sell",
            Action::StrongSell => "Strong Sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn rank(&self) -> u8 {
        match self {
            ConfidenceLevel::Low => 0,
            ConfidenceLevel::Medium => 1,
            ConfidenceLevel::High => 2,
        }
    }

    pub fn from_rank(rank: u8) -> Self {
        match rank {
            0 => ConfidenceLevel::Low,
            1 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::High,
        }
    }

    pub fn raised(&self) -> Self {
        Self::from_rank(self.rank() + 1)
    }

    pub fn lowered(&self) -> Self {
        Self::from_rank(self.rank().saturating_sub(1))
    }

    /// Average of two levels, rounded down.
    pub fn combine(a: ConfidenceLevel, b: ConfidenceLevel) -> Self {
        Self::from_rank((a.rank() + b.rank()) / 2)
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

/// Last signal recorded for a symbol, used by the reversal cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub action: Action,
    pub score: i32,
    pub updated_at: DateTime<Utc>,
}
