use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::*;
use crate::AnalysisError;

/// All precomputed analytics for one symbol at one point in time.
///
/// Every field is optional on the wire. Missing or mistyped fields degrade to
/// neutral defaults during deserialization (see [`crate::coerce`]), so the
/// decision engine never has to re-validate anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    #[serde(default, deserialize_with = "lenient_string_or_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_change_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub technical: TechnicalSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub pattern: PatternSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub wave: WaveSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub volume: VolumeSection,
    #[serde(default, deserialize_with = "lenient_list")]
    pub volume_price_signals: Vec<VolumePriceSignal>,
    #[serde(default, deserialize_with = "lenient_section")]
    pub mean_reversion: MeanReversionSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub fundamental: FundamentalSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub chip: ChipSection,
    #[serde(default, deserialize_with = "lenient_section")]
    pub support_resistance: SupportResistanceSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalSection {
    #[serde(default, deserialize_with = "lenient_string")]
    pub trend: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma5: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma20: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma60: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma120: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma240: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma20_slope: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma60_slope: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma120_slope: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ma240_slope: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rsi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stoch_k: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stoch_d: Option<f64>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub stoch_cross: Option<CrossDirection>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub macd_hist: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub macd_bullish_divergence: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub macd_bearish_divergence: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub adx: Option<f64>,
    /// Confirmed three-bar structural breakdown
    #[serde(default, deserialize_with = "lenient_bool")]
    pub three_bar_breakdown: bool,
}

impl TechnicalSection {
    /// Direction implied by the free-text trend label, if recognizable.
    pub fn trend_label_direction(&self) -> Option<Direction> {
        let label = self.trend.as_deref()?.trim().to_ascii_lowercase();
        match label.as_str() {
            "bull" | "bullish" | "up" | "uptrend" => Some(Direction::Bullish),
            "bear" | "bearish" | "down" | "downtrend" => Some(Direction::Bearish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    #[serde(alias = "golden_cross")]
    Golden,
    #[serde(alias = "death_cross")]
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    Forming,
    Confirmed,
    TargetReached,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSection {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub detected: bool,
    #[serde(rename = "type", default, deserialize_with = "lenient_label")]
    pub pattern_type: Option<PatternType>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub status: Option<PatternStatus>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub target_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stop_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub neckline: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub measured_move: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance_from_neckline_pct: Option<f64>,
}

impl PatternSection {
    /// True when a pattern of `kind` is detected with the given status.
    pub fn is(&self, kind: PatternType, status: PatternStatus) -> bool {
        self.detected && self.pattern_type == Some(kind) && self.status == Some(status)
    }

    pub fn is_top(&self) -> bool {
        self.detected && self.pattern_type == Some(PatternType::Top)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(match self.pattern_type {
            Some(PatternType::Top) => "top pattern",
            Some(PatternType::Bottom) => "bottom pattern",
            None => "pattern",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveSection {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub bullish_environment: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub bearish_environment: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub breakout_detected: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub breakout_volume_confirmed: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub breakdown_detected: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub breakdown_volume_confirmed: bool,
}

impl WaveSection {
    pub fn confirmed_breakout(&self) -> bool {
        self.breakout_detected && self.breakout_volume_confirmed
    }

    pub fn confirmed_breakdown(&self) -> bool {
        self.breakdown_detected && self.breakdown_volume_confirmed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeSection {
    /// Today's volume divided by its moving average
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trend: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub insufficient_liquidity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[serde(alias = "bull", alias = "buy", alias = "up")]
    Bullish,
    #[serde(alias = "bear", alias = "sell", alias = "down")]
    Bearish,
}

/// Coded volume-price events emitted by the volume analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumePriceCode {
    BreakdownWithVolume,
    GapDownWithVolume,
    SupplyOverhang,
    ValidBreakout,
    HighVolumeNoRise,
    BottomAccumulation,
    VolumeClimaxTop,
    #[serde(other)]
    Unknown,
}

impl VolumePriceCode {
    pub fn label(&self) -> &'static str {
        match self {
            VolumePriceCode::BreakdownWithVolume => "breakdown with volume",
            VolumePriceCode::GapDownWithVolume => "gap down with volume",
            VolumePriceCode::SupplyOverhang => "supply overhang",
            VolumePriceCode::ValidBreakout => "valid breakout",
            VolumePriceCode::HighVolumeNoRise => "high volume, no rise",
            VolumePriceCode::BottomAccumulation => "bottom accumulation",
            VolumePriceCode::VolumeClimaxTop => "volume climax top",
            VolumePriceCode::Unknown => "unclassified signal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumePriceSignal {
    #[serde(default, deserialize_with = "lenient_label")]
    pub code: Option<VolumePriceCode>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: u8,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

impl VolumePriceSignal {
    pub fn code(&self) -> VolumePriceCode {
        self.code.unwrap_or(VolumePriceCode::Unknown)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanReversionSection {
    /// Percent distance of price from MA20
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bias_ma20: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bias_ma60: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub left_buy_triggered: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub left_sell_triggered: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalSection {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pe: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pb: Option<f64>,
    /// Percent, e.g. `4.2` for 4.2%
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dividend_yield: Option<f64>,
}

/// Institutional / foreign flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChipSection {
    #[serde(default, deserialize_with = "lenient_count")]
    pub consecutive_buy_days: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub consecutive_sell_days: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_foreign_flow: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportResistanceSection {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub support1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub resistance1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub take_profit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stop_loss: Option<f64>,
}

impl AnalysisSnapshot {
    /// Parse a snapshot document. Only a non-object document is an error.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| AnalysisError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, AnalysisError> {
        if !value.is_object() {
            return Err(AnalysisError::InvalidData(format!(
                "snapshot must be a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| AnalysisError::ParseError(e.to_string()))
    }

    /// Current price, 0.0 when absent.
    pub fn price(&self) -> f64 {
        self.current_price.unwrap_or(0.0)
    }

    pub fn has_price(&self) -> bool {
        self.price() > 0.0
    }

    pub fn volume_ratio(&self) -> Option<f64> {
        self.volume.ratio
    }

    pub fn has_code(&self, code: VolumePriceCode) -> bool {
        self.volume_price_signals.iter().any(|s| s.code() == code)
    }

    /// Percent bias of price against MA20: the mean-reversion analyzer's
    /// value when present, else computed from MA20.
    pub fn bias_20(&self) -> Option<f64> {
        if let Some(bias) = self.mean_reversion.bias_ma20 {
            return Some(bias);
        }
        match self.technical.ma20 {
            Some(ma20) if ma20 > 0.0 && self.has_price() => {
                Some((self.price() - ma20) / ma20 * 100.0)
            }
            _ => None,
        }
    }

    /// Percent gap of price above (positive) or below a level.
    pub fn pct_from(&self, level: Option<f64>) -> Option<f64> {
        match level {
            Some(l) if l > 0.0 && self.has_price() => Some((self.price() - l) / l * 100.0),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}
