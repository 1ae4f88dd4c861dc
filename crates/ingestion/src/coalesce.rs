//! Per-field coalescing over candidate columns.

use adl_core::{Column, RawRecord, Scalar, UNKNOWN_ASSET};

/// Asset columns in priority order.
pub const ASSET_COLUMNS: [Column; 4] = [Column::Coin, Column::Asset, Column::Ticker, Column::Symbol];

/// Notional columns in priority order.
pub const NOTIONAL_COLUMNS: [Column; 4] =
    [Column::AdlNotional, Column::Notional, Column::Usd, Column::Value];

/// First present value among the candidate columns.
pub fn resolve_field<'a>(record: &'a RawRecord, candidates: &[Column]) -> Option<&'a Scalar> {
    candidates.iter().find_map(|&column| record.get(column))
}

/// Asset identifier, or the `UNKNOWN` sentinel.
pub fn resolve_asset(record: &RawRecord) -> String {
    resolve_field(record, &ASSET_COLUMNS)
        .map(Scalar::as_text)
        .unwrap_or_else(|| UNKNOWN_ASSET.to_string())
}

/// Positive finite notional. The first present candidate decides; a non-numeric or
/// non-positive value yields `None` without consulting later candidates.
pub fn resolve_notional(record: &RawRecord) -> Option<f64> {
    let value = resolve_field(record, &NOTIONAL_COLUMNS)?.as_f64()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Account identifier from a single column, empty when absent.
pub fn resolve_account(record: &RawRecord, column: Column) -> String {
    record.get(column).map(Scalar::as_text).unwrap_or_default()
}

/// Optional numeric column; present only when the cell is a finite number.
pub fn optional_number(record: &RawRecord, column: Column) -> Option<f64> {
    record
        .get(column)
        .and_then(Scalar::as_f64)
        .filter(|v| v.is_finite())
}
