//! Record normalization into front-end events.
//!
//! Resolves timestamps and position sides from loosely-typed rows and coalesces the
//! remaining fields. Records without a usable timestamp or notional are dropped and
//! counted, never reported as errors.

use crate::coalesce::{optional_number, resolve_account, resolve_asset, resolve_notional};
use adl_core::{
    batch_id, iso_millis, Column, NormalizedEvent, RawRecord, Scalar, Side, TimestampMs,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Values below this magnitude are epoch seconds; at or above, epoch milliseconds.
pub const SECONDS_THRESHOLD: f64 = 1e12;

const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Statistics about a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Records examined.
    pub total_records: u64,
    /// Records turned into events.
    pub accepted: u64,
    /// Records dropped for an unresolvable timestamp.
    pub dropped_timestamp: u64,
    /// Records dropped for a missing or non-positive notional.
    pub dropped_notional: u64,
}

impl NormalizeStats {
    /// Total dropped records.
    pub fn dropped(&self) -> u64 {
        self.dropped_timestamp + self.dropped_notional
    }
}

/// Result of normalizing a record set.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    /// Events sorted ascending by timestamp.
    pub events: Vec<NormalizedEvent>,
    pub stats: NormalizeStats,
}

/// Why a record produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Timestamp,
    Notional,
}

/// Convert an epoch number to milliseconds using the seconds/milliseconds heuristic.
fn epoch_f64_to_ms(value: f64) -> Option<TimestampMs> {
    if !value.is_finite() {
        return None;
    }
    if value.abs() < SECONDS_THRESHOLD {
        Some((value * 1000.0).trunc() as TimestampMs)
    } else {
        Some(value.trunc() as TimestampMs)
    }
}

fn epoch_i64_to_ms(value: i64) -> Option<TimestampMs> {
    if (value.unsigned_abs() as f64) < SECONDS_THRESHOLD {
        value.checked_mul(1000)
    } else {
        Some(value)
    }
}

fn parse_iso(text: &str) -> Option<TimestampMs> {
    let text = text.trim();
    let offset_text = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => text.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&offset_text) {
        return Some(dt.timestamp_millis());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&offset_text, format) {
            return Some(dt.timestamp_millis());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Resolve a timestamp cell to epoch milliseconds.
///
/// Numbers below 1e12 in magnitude are seconds, others milliseconds. Strings are tried
/// as ISO-8601 first (naive values are UTC), then as numbers.
pub fn resolve_timestamp(value: &Scalar) -> Option<TimestampMs> {
    match value {
        Scalar::Int(v) => epoch_i64_to_ms(*v),
        Scalar::Float(v) => epoch_f64_to_ms(*v),
        Scalar::Text(s) => parse_iso(s).or_else(|| {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(v) => epoch_i64_to_ms(v),
                Err(_) => trimmed.parse::<f64>().ok().and_then(epoch_f64_to_ms),
            }
        }),
    }
}

fn side_from_side_field(value: &Scalar) -> Option<Side> {
    let lower = value.as_text().to_lowercase();
    if ["b", "buy", "long"].iter().any(|t| lower.contains(t)) {
        Some(Side::Long)
    } else if ["a", "sell", "short"].iter().any(|t| lower.contains(t)) {
        Some(Side::Short)
    } else {
        None
    }
}

fn side_from_direction(value: &Scalar) -> Option<Side> {
    let lower = value.as_text().to_lowercase();
    if lower.contains("long") {
        Some(Side::Long)
    } else if lower.contains("short") {
        Some(Side::Short)
    } else {
        None
    }
}

fn side_from_position_size(value: &Scalar) -> Option<Side> {
    let size = value.as_f64()?;
    if size > 0.0 {
        Some(Side::Long)
    } else if size < 0.0 {
        Some(Side::Short)
    } else {
        None
    }
}

/// Resolve the position side: `side`, then `direction`, then the sign of
/// `position_size`, then long.
pub fn resolve_side(record: &RawRecord) -> Side {
    record
        .side
        .as_ref()
        .and_then(side_from_side_field)
        .or_else(|| record.direction.as_ref().and_then(side_from_direction))
        .or_else(|| record.position_size.as_ref().and_then(side_from_position_size))
        .unwrap_or(Side::Long)
}

/// Normalize a single record.
pub fn normalize_record(record: &RawRecord) -> Result<NormalizedEvent, DropReason> {
    let timestamp_ms = record
        .time
        .as_ref()
        .and_then(resolve_timestamp)
        .ok_or(DropReason::Timestamp)?;
    let notional_usd = resolve_notional(record).ok_or(DropReason::Notional)?;

    Ok(NormalizedEvent {
        timestamp_ms,
        timestamp_iso: iso_millis(timestamp_ms),
        asset: resolve_asset(record),
        notional_usd,
        side: resolve_side(record),
        liquidated_user_id: resolve_account(record, Column::LiquidatedUser),
        target_user_id: resolve_account(record, Column::User),
        batch_id: batch_id(timestamp_ms),
        equity_before: optional_number(record, Column::AccountValueRealtime),
        equity_after: optional_number(record, Column::TotalEquity),
        leverage: optional_number(record, Column::LeverageRealtime),
        realized_pnl: optional_number(record, Column::ClosedPnl),
        unrealized_pnl: optional_number(record, Column::PositionUnrealizedPnl),
    })
}

/// Normalize a record set into events sorted ascending by timestamp.
///
/// The sort is stable, so events sharing a timestamp keep their input order.
pub fn normalize(records: &[RawRecord]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    outcome.events.reserve(records.len());

    for record in records {
        outcome.stats.total_records += 1;
        match normalize_record(record) {
            Ok(event) => {
                outcome.stats.accepted += 1;
                outcome.events.push(event);
            }
            Err(DropReason::Timestamp) => outcome.stats.dropped_timestamp += 1,
            Err(DropReason::Notional) => outcome.stats.dropped_notional += 1,
        }
    }

    outcome.events.sort_by_key(|e| e.timestamp_ms);
    debug!(
        accepted = outcome.stats.accepted,
        dropped = outcome.stats.dropped(),
        "normalized records"
    );
    outcome
}
