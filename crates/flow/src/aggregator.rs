//! Single-pass flow aggregation.
//!
//! Folds raw ADL rows into asset totals, directed account-pair totals and one-second
//! time buckets. Every aggregate is a plain sum, so two partial states can be merged
//! by adding matching keys.

use adl_core::{ts_to_second, Error, RawRecord, Result, TimeRange, TimestampMs};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::hash::Hash;
use tracing::debug;

/// Directed (liquidated user, target user) key.
pub type AccountPair = (String, String);

fn add_to<K: Hash + Eq>(map: &mut IndexMap<K, f64>, key: K, amount: f64) {
    *map.entry(key).or_insert(0.0) += amount;
}

fn count_into<K: Hash + Eq>(map: &mut IndexMap<K, u64>, key: K, count: u64) {
    *map.entry(key).or_insert(0) += count;
}

fn merge_sums<K: Hash + Eq>(into: &mut IndexMap<K, f64>, from: IndexMap<K, f64>) {
    for (key, amount) in from {
        add_to(into, key, amount);
    }
}

fn merge_counts<K: Hash + Eq>(into: &mut IndexMap<K, u64>, from: IndexMap<K, u64>) {
    for (key, count) in from {
        count_into(into, key, count);
    }
}

/// The fixed columns of one row as read by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRow {
    pub timestamp_ms: TimestampMs,
    pub asset: String,
    pub liquidated_user: String,
    pub target_user: String,
    /// `|adl_notional|` when positive and finite.
    pub notional: Option<f64>,
}

impl FlowRow {
    /// Read the mandatory columns of `record`. `row` is used in error messages.
    pub fn from_record(row: usize, record: &RawRecord) -> Result<FlowRow> {
        let time = record.time.as_ref().ok_or(Error::missing_field(row, "time"))?;
        let timestamp_ms = time.as_i64().ok_or_else(|| {
            Error::data(format!("row {row}: time `{time}` is not an integer epoch"))
        })?;
        let asset = record.coin.as_ref().ok_or(Error::missing_field(row, "coin"))?;
        let target_user = record.user.as_ref().ok_or(Error::missing_field(row, "user"))?;
        let liquidated_user = record
            .liquidated_user
            .as_ref()
            .ok_or(Error::missing_field(row, "liquidated_user"))?;

        let notional = record
            .adl_notional
            .as_ref()
            .and_then(|v| v.as_f64())
            .map(f64::abs)
            .filter(|n| n.is_finite() && *n > 0.0);

        Ok(FlowRow {
            timestamp_ms,
            asset: asset.as_text(),
            liquidated_user: liquidated_user.as_text(),
            target_user: target_user.as_text(),
            notional,
        })
    }
}

/// Aggregates for one one-second bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketAccumulator {
    /// Asset self-flow totals (source asset == target asset).
    pub asset_flows: IndexMap<String, f64>,
    /// Directed account-pair totals within the bucket.
    pub account_flows: IndexMap<AccountPair, f64>,
    pub liquidated_by_asset: IndexMap<String, f64>,
    pub adld_by_asset: IndexMap<String, f64>,
    /// Sum of notional in this bucket.
    pub notional: f64,
    pub event_count: u64,
}

impl BucketAccumulator {
    fn add(&mut self, row: &FlowRow, notional: f64) {
        add_to(&mut self.asset_flows, row.asset.clone(), notional);
        add_to(
            &mut self.account_flows,
            (row.liquidated_user.clone(), row.target_user.clone()),
            notional,
        );
        add_to(&mut self.liquidated_by_asset, row.asset.clone(), notional);
        add_to(&mut self.adld_by_asset, row.asset.clone(), notional);
        self.notional += notional;
        self.event_count += 1;
    }

    fn merge(&mut self, other: BucketAccumulator) {
        merge_sums(&mut self.asset_flows, other.asset_flows);
        merge_sums(&mut self.account_flows, other.account_flows);
        merge_sums(&mut self.liquidated_by_asset, other.liquidated_by_asset);
        merge_sums(&mut self.adld_by_asset, other.adld_by_asset);
        self.notional += other.notional;
        self.event_count += other.event_count;
    }

    /// Sum of the per-asset liquidated totals.
    pub fn liquidated_total(&self) -> f64 {
        self.liquidated_by_asset.values().sum()
    }

    /// Sum of the per-asset ADL'd totals.
    pub fn adld_total(&self) -> f64 {
        self.adld_by_asset.values().sum()
    }
}

/// Accumulator for the flow document. Maps keep first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct FlowAggregationState {
    pub asset_totals: IndexMap<String, f64>,
    /// Contributing (positive-notional) rows per asset.
    pub asset_event_counts: IndexMap<String, u64>,
    /// All rows per asset, including rows skipped for their notional.
    pub asset_row_counts: IndexMap<String, u64>,
    pub liquidated_by_asset: IndexMap<String, f64>,
    pub adld_by_asset: IndexMap<String, f64>,
    pub account_flows: IndexMap<AccountPair, f64>,
    /// Totals per liquidated (sending) account.
    pub account_totals_out: IndexMap<String, f64>,
    /// Totals per ADL counterparty (receiving) account.
    pub account_totals_in: IndexMap<String, f64>,
    /// Buckets keyed by bucket start (ms).
    pub time_buckets: BTreeMap<TimestampMs, BucketAccumulator>,
    /// Min/max timestamp over every row, skipped rows included.
    pub time_range: Option<TimeRange>,
    /// Rows processed.
    pub row_count: u64,
    /// Rows skipped for a missing or non-positive notional.
    pub skipped_count: u64,
}

impl FlowAggregationState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    fn observe_time(&mut self, ts_ms: TimestampMs) {
        self.time_range = Some(match self.time_range {
            Some(range) => TimeRange {
                start: range.start.min(ts_ms),
                end: range.end.max(ts_ms),
            },
            None => TimeRange { start: ts_ms, end: ts_ms },
        });
    }

    /// Fold one parsed row into the state. Returns whether the row contributed.
    pub fn add_row(&mut self, row: &FlowRow) -> bool {
        self.row_count += 1;
        self.observe_time(row.timestamp_ms);
        count_into(&mut self.asset_row_counts, row.asset.clone(), 1);

        let Some(notional) = row.notional else {
            self.skipped_count += 1;
            return false;
        };

        add_to(&mut self.asset_totals, row.asset.clone(), notional);
        count_into(&mut self.asset_event_counts, row.asset.clone(), 1);

        // One event realizes both the liquidation loss and the ADL closure.
        add_to(&mut self.liquidated_by_asset, row.asset.clone(), notional);
        add_to(&mut self.adld_by_asset, row.asset.clone(), notional);

        add_to(
            &mut self.account_flows,
            (row.liquidated_user.clone(), row.target_user.clone()),
            notional,
        );
        add_to(&mut self.account_totals_out, row.liquidated_user.clone(), notional);
        add_to(&mut self.account_totals_in, row.target_user.clone(), notional);

        self.time_buckets
            .entry(ts_to_second(row.timestamp_ms))
            .or_default()
            .add(row, notional);

        true
    }

    /// Parse and fold one raw record.
    pub fn add_record(&mut self, row: usize, record: &RawRecord) -> Result<bool> {
        let parsed = FlowRow::from_record(row, record)?;
        Ok(self.add_row(&parsed))
    }

    /// Combine another partial state into this one.
    pub fn merge(&mut self, other: FlowAggregationState) {
        merge_sums(&mut self.asset_totals, other.asset_totals);
        merge_counts(&mut self.asset_event_counts, other.asset_event_counts);
        merge_counts(&mut self.asset_row_counts, other.asset_row_counts);
        merge_sums(&mut self.liquidated_by_asset, other.liquidated_by_asset);
        merge_sums(&mut self.adld_by_asset, other.adld_by_asset);
        merge_sums(&mut self.account_flows, other.account_flows);
        merge_sums(&mut self.account_totals_out, other.account_totals_out);
        merge_sums(&mut self.account_totals_in, other.account_totals_in);
        for (key, bucket) in other.time_buckets {
            self.time_buckets.entry(key).or_default().merge(bucket);
        }
        if let Some(range) = other.time_range {
            self.observe_time(range.start);
            self.observe_time(range.end);
        }
        self.row_count += other.row_count;
        self.skipped_count += other.skipped_count;
    }

    /// Sum of all asset totals.
    pub fn total_notional(&self) -> f64 {
        self.asset_totals.values().sum()
    }

    /// Sum of liquidated notional over all assets.
    pub fn total_liquidated(&self) -> f64 {
        self.liquidated_by_asset.values().sum()
    }

    /// Sum of ADL'd notional over all assets.
    pub fn total_adld(&self) -> f64 {
        self.adld_by_asset.values().sum()
    }

    /// Accounts seen on either side of a flow.
    pub fn unique_accounts(&self) -> usize {
        self.account_totals_out.len()
            + self
                .account_totals_in
                .keys()
                .filter(|account| !self.account_totals_out.contains_key(*account))
                .count()
    }
}

/// Aggregate a record set in one forward pass.
///
/// Fails if a row lacks `time`, `coin`, `user` or `liquidated_user`, or if `time` is
/// not an integer epoch.
pub fn accumulate(records: &[RawRecord]) -> Result<FlowAggregationState> {
    let mut state = FlowAggregationState::new();
    for (row, record) in records.iter().enumerate() {
        state.add_record(row, record)?;
    }
    debug!(
        rows = state.row_count,
        skipped = state.skipped_count,
        buckets = state.time_buckets.len(),
        "aggregated flow rows"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adl_core::Column;
    use approx::assert_relative_eq;

    fn row(ts: i64, coin: &str, user: &str, liquidated: &str, notional: f64) -> RawRecord {
        RawRecord::default()
            .with(Column::Time, ts)
            .with(Column::Coin, coin)
            .with(Column::User, user)
            .with(Column::LiquidatedUser, liquidated)
            .with(Column::AdlNotional, notional)
    }

    fn scenario() -> Vec<RawRecord> {
        vec![
            row(1_000_000_000_000, "BTC", "U1", "U2", 100.0),
            row(1_000_000_000_500, "BTC", "U1", "U2", 50.0),
            row(1_000_000_001_200, "ETH", "U3", "U2", 200.0),
        ]
    }

    #[test]
    fn test_three_row_scenario() {
        let state = accumulate(&scenario()).unwrap();

        assert_eq!(state.asset_totals.len(), 2);
        assert_relative_eq!(state.asset_totals["BTC"], 150.0);
        assert_relative_eq!(state.asset_totals["ETH"], 200.0);

        assert_eq!(state.time_buckets.len(), 2);
        let first = &state.time_buckets[&1_000_000_000_000];
        assert_eq!(first.event_count, 2);
        assert_relative_eq!(first.notional, 150.0);
        let second = &state.time_buckets[&1_000_000_001_000];
        assert_eq!(second.event_count, 1);
        assert_relative_eq!(second.notional, 200.0);

        let pair = |a: &str, b: &str| (a.to_string(), b.to_string());
        assert_relative_eq!(state.account_flows[&pair("U2", "U1")], 150.0);
        assert_relative_eq!(state.account_flows[&pair("U2", "U3")], 200.0);
        assert_relative_eq!(state.account_totals_out["U2"], 350.0);
        assert_relative_eq!(state.account_totals_in["U1"], 150.0);
        assert_eq!(state.unique_accounts(), 3);

        assert_eq!(
            state.time_range,
            Some(TimeRange { start: 1_000_000_000_000, end: 1_000_000_001_200 })
        );
    }

    #[test]
    fn test_liquidated_and_adld_mirror_totals() {
        let state = accumulate(&scenario()).unwrap();
        assert_eq!(state.liquidated_by_asset, state.asset_totals);
        assert_eq!(state.adld_by_asset, state.asset_totals);
        assert_relative_eq!(state.total_liquidated(), 350.0);
        assert_relative_eq!(state.total_adld(), 350.0);
    }

    #[test]
    fn test_conservation_of_notional() {
        let records = vec![
            row(1_000, "BTC", "a", "b", 1.25),
            row(2_500, "ETH", "c", "d", -3.5),
            row(2_600, "SOL", "e", "f", 0.0),
            row(9_999, "BTC", "a", "d", 10.0),
        ];
        let state = accumulate(&records).unwrap();

        // negative notional contributes its absolute value, zero is skipped
        assert_relative_eq!(state.total_notional(), 1.25 + 3.5 + 10.0);
        let bucket_sum: f64 = state.time_buckets.values().map(|b| b.notional).sum();
        assert_relative_eq!(bucket_sum, state.total_notional());
        assert_eq!(state.skipped_count, 1);
        assert_eq!(state.row_count, 4);
    }

    #[test]
    fn test_zero_notional_creates_no_bucket() {
        let records = vec![
            row(1_000_000_000_000, "BTC", "U1", "U2", 100.0),
            row(1_000_000_005_000, "BTC", "U1", "U2", 0.0),
        ];
        let state = accumulate(&records).unwrap();

        assert_eq!(state.time_buckets.len(), 1);
        assert!(!state.time_buckets.contains_key(&1_000_000_005_000));
        // skipped rows still widen the time range and count toward the asset rows
        assert_eq!(state.time_range.unwrap().end, 1_000_000_005_000);
        assert_eq!(state.asset_row_counts["BTC"], 2);
        assert_eq!(state.asset_event_counts["BTC"], 1);
    }

    #[test]
    fn test_missing_notional_is_skipped() {
        let mut record = row(1_000, "BTC", "U1", "U2", 1.0);
        record.adl_notional = None;
        let state = accumulate(&[record]).unwrap();
        assert_eq!(state.skipped_count, 1);
        assert!(state.asset_totals.is_empty());
    }

    #[test]
    fn test_missing_fixed_column_is_fatal() {
        let mut record = row(1_000, "BTC", "U1", "U2", 1.0);
        record.liquidated_user = None;
        let err = accumulate(&[row(0, "BTC", "U1", "U2", 1.0), record]).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField { row: 1, column: "liquidated_user" }
        ));
    }

    #[test]
    fn test_non_integer_time_is_fatal() {
        let record = row(0, "BTC", "U1", "U2", 1.0).with(Column::Time, "2023-10-10T00:00:00Z");
        assert!(matches!(accumulate(&[record]), Err(Error::Data(_))));
    }

    #[test]
    fn test_bucket_scoped_flows() {
        let state = accumulate(&scenario()).unwrap();
        let first = &state.time_buckets[&1_000_000_000_000];
        assert_relative_eq!(first.asset_flows["BTC"], 150.0);
        assert_relative_eq!(first.account_flows[&("U2".to_string(), "U1".to_string())], 150.0);
        assert_relative_eq!(first.liquidated_total(), 150.0);
        assert_relative_eq!(first.adld_total(), 150.0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let records = scenario();
        let whole = accumulate(&records).unwrap();

        let mut left = accumulate(&records[..1]).unwrap();
        let right = accumulate(&records[1..]).unwrap();
        left.merge(right);

        assert_eq!(left.asset_totals, whole.asset_totals);
        assert_eq!(left.account_flows, whole.account_flows);
        assert_eq!(left.time_range, whole.time_range);
        assert_eq!(left.row_count, whole.row_count);
        assert_eq!(left.time_buckets.len(), whole.time_buckets.len());
        assert_eq!(left.time_buckets[&1_000_000_000_000].event_count, 2);
    }
}
