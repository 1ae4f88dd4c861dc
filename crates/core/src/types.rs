//! Core data types for the ADL visualizer export.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Sentinel asset used when no asset column resolves.
pub const UNKNOWN_ASSET: &str = "UNKNOWN";

/// Convert a timestamp to its one-second bucket boundary.
#[inline]
pub fn ts_to_second(ts_ms: TimestampMs) -> TimestampMs {
    ts_ms.div_euclid(1000) * 1000
}

/// Second-level batch key used by the front end for coarse grouping.
#[inline]
pub fn batch_id(ts_ms: TimestampMs) -> String {
    ts_ms.div_euclid(1000).to_string()
}

/// RFC 3339 UTC string with millisecond precision, e.g. `2023-10-10T00:00:00.500Z`.
pub fn iso_millis(ts_ms: TimestampMs) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// RFC 3339 UTC string with whole seconds, e.g. `2023-10-10T00:00:00Z`.
pub fn iso_seconds(ts_ms: TimestampMs) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Cell tokens treated as missing values.
const NA_TOKENS: &[&str] = &["", "NaN", "nan", "NA", "N/A", "n/a", "null", "NULL", "None", "<NA>"];

/// A single non-missing cell of the input table.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Parse a raw cell. Returns `None` for empty or NA-like cells.
    ///
    /// A cell becomes `Int`/`Float` only when it is the canonical rendering of that
    /// number, so `as_text` always reproduces the cell. `007`, `+42` or `1.50` stay text.
    pub fn parse(cell: &str) -> Option<Scalar> {
        if NA_TOKENS.contains(&cell.trim()) {
            return None;
        }
        if let Ok(v) = cell.parse::<i64>() {
            if v.to_string() == cell {
                return Some(Scalar::Int(v));
            }
        }
        if let Ok(v) = cell.parse::<f64>() {
            if v.to_string() == cell {
                return Some(Scalar::Float(v));
            }
        }
        Some(Scalar::Text(cell.to_string()))
    }

    /// Numeric view of the cell; text is parsed when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view of the cell. Floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(|v| v.trunc() as i64)
                })
            }
        }
    }

    /// Text view of the cell, exactly as loaded.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

/// Known columns of the ADL table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Time,
    Coin,
    Asset,
    Ticker,
    Symbol,
    User,
    LiquidatedUser,
    AdlNotional,
    Notional,
    Usd,
    Value,
    Side,
    Direction,
    PositionSize,
    AccountValueRealtime,
    TotalEquity,
    LeverageRealtime,
    ClosedPnl,
    PositionUnrealizedPnl,
}

impl Column {
    /// Every known column.
    pub const ALL: [Column; 19] = [
        Column::Time,
        Column::Coin,
        Column::Asset,
        Column::Ticker,
        Column::Symbol,
        Column::User,
        Column::LiquidatedUser,
        Column::AdlNotional,
        Column::Notional,
        Column::Usd,
        Column::Value,
        Column::Side,
        Column::Direction,
        Column::PositionSize,
        Column::AccountValueRealtime,
        Column::TotalEquity,
        Column::LeverageRealtime,
        Column::ClosedPnl,
        Column::PositionUnrealizedPnl,
    ];

    /// Header name in the CSV.
    pub fn name(self) -> &'static str {
        match self {
            Column::Time => "time",
            Column::Coin => "coin",
            Column::Asset => "asset",
            Column::Ticker => "ticker",
            Column::Symbol => "symbol",
            Column::User => "user",
            Column::LiquidatedUser => "liquidated_user",
            Column::AdlNotional => "adl_notional",
            Column::Notional => "notional",
            Column::Usd => "usd",
            Column::Value => "value",
            Column::Side => "side",
            Column::Direction => "direction",
            Column::PositionSize => "position_size",
            Column::AccountValueRealtime => "account_value_realtime",
            Column::TotalEquity => "total_equity",
            Column::LeverageRealtime => "leverage_realtime",
            Column::ClosedPnl => "closed_pnl",
            Column::PositionUnrealizedPnl => "position_unrealized_pnl",
        }
    }

    /// Look up a column by header name (exact match).
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One row of the ADL table. Every field is optional; presence varies by source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub time: Option<Scalar>,
    pub coin: Option<Scalar>,
    pub asset: Option<Scalar>,
    pub ticker: Option<Scalar>,
    pub symbol: Option<Scalar>,
    pub user: Option<Scalar>,
    pub liquidated_user: Option<Scalar>,
    pub adl_notional: Option<Scalar>,
    pub notional: Option<Scalar>,
    pub usd: Option<Scalar>,
    pub value: Option<Scalar>,
    pub side: Option<Scalar>,
    pub direction: Option<Scalar>,
    pub position_size: Option<Scalar>,
    pub account_value_realtime: Option<Scalar>,
    pub total_equity: Option<Scalar>,
    pub leverage_realtime: Option<Scalar>,
    pub closed_pnl: Option<Scalar>,
    pub position_unrealized_pnl: Option<Scalar>,
}

impl RawRecord {
    fn slot(&mut self, column: Column) -> &mut Option<Scalar> {
        match column {
            Column::Time => &mut self.time,
            Column::Coin => &mut self.coin,
            Column::Asset => &mut self.asset,
            Column::Ticker => &mut self.ticker,
            Column::Symbol => &mut self.symbol,
            Column::User => &mut self.user,
            Column::LiquidatedUser => &mut self.liquidated_user,
            Column::AdlNotional => &mut self.adl_notional,
            Column::Notional => &mut self.notional,
            Column::Usd => &mut self.usd,
            Column::Value => &mut self.value,
            Column::Side => &mut self.side,
            Column::Direction => &mut self.direction,
            Column::PositionSize => &mut self.position_size,
            Column::AccountValueRealtime => &mut self.account_value_realtime,
            Column::TotalEquity => &mut self.total_equity,
            Column::LeverageRealtime => &mut self.leverage_realtime,
            Column::ClosedPnl => &mut self.closed_pnl,
            Column::PositionUnrealizedPnl => &mut self.position_unrealized_pnl,
        }
    }

    /// Value of a column, if present.
    pub fn get(&self, column: Column) -> Option<&Scalar> {
        let value = match column {
            Column::Time => &self.time,
            Column::Coin => &self.coin,
            Column::Asset => &self.asset,
            Column::Ticker => &self.ticker,
            Column::Symbol => &self.symbol,
            Column::User => &self.user,
            Column::LiquidatedUser => &self.liquidated_user,
            Column::AdlNotional => &self.adl_notional,
            Column::Notional => &self.notional,
            Column::Usd => &self.usd,
            Column::Value => &self.value,
            Column::Side => &self.side,
            Column::Direction => &self.direction,
            Column::PositionSize => &self.position_size,
            Column::AccountValueRealtime => &self.account_value_realtime,
            Column::TotalEquity => &self.total_equity,
            Column::LeverageRealtime => &self.leverage_realtime,
            Column::ClosedPnl => &self.closed_pnl,
            Column::PositionUnrealizedPnl => &self.position_unrealized_pnl,
        };
        value.as_ref()
    }

    /// Set a column value.
    pub fn set(&mut self, column: Column, value: Option<Scalar>) {
        *self.slot(column) = value;
    }

    /// Builder-style setter.
    pub fn with(mut self, column: Column, value: impl Into<Scalar>) -> Self {
        self.set(column, Some(value.into()));
        self
    }
}

/// Position side of the liquidated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// A liquidation/ADL event in the shape consumed by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Event time in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: TimestampMs,
    /// Event time as an RFC 3339 UTC string.
    #[serde(rename = "timestampISO")]
    pub timestamp_iso: String,
    pub asset: String,
    pub notional_usd: f64,
    pub side: Side,
    pub liquidated_user_id: String,
    pub target_user_id: String,
    /// Second-level batch key.
    pub batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_after: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<f64>,
}

/// Inclusive time range of a set of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: TimestampMs,
    pub end: TimestampMs,
}

impl TimeRange {
    /// Duration of the range in minutes.
    pub fn duration_minutes(&self) -> f64 {
        (self.end as f64 - self.start as f64) / 60_000.0
    }
}
