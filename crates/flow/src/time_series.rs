//! Cumulative per-second time series.

use crate::aggregator::FlowAggregationState;
use crate::ranking::FlowEdge;
use adl_core::{iso_seconds, TimestampMs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One bucket of the time series with running totals up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    /// Bucket start (ms).
    pub time: TimestampMs,
    #[serde(rename = "timeISO")]
    pub time_iso: String,
    pub cumulative_notional: f64,
    pub cumulative_liquidated: f64,
    pub cumulative_adld: f64,
    pub notional_in_bucket: f64,
    pub event_count: u64,
    pub liquidated_by_asset: IndexMap<String, f64>,
    pub adld_by_asset: IndexMap<String, f64>,
    /// Asset self-flows active in this bucket.
    pub asset_flows: Vec<FlowEdge>,
}

/// Walk buckets in ascending time order, accumulating running totals.
pub fn build_time_series(state: &FlowAggregationState) -> Vec<BucketSummary> {
    let mut cumulative = 0.0;
    let mut cumulative_liquidated = 0.0;
    let mut cumulative_adld = 0.0;

    state
        .time_buckets
        .iter()
        .map(|(&time, bucket)| {
            cumulative += bucket.notional;
            cumulative_liquidated += bucket.liquidated_total();
            cumulative_adld += bucket.adld_total();

            let asset_flows = bucket
                .asset_flows
                .iter()
                .filter(|(_, notional)| **notional > 0.0)
                .map(|(asset, notional)| FlowEdge {
                    source: asset.clone(),
                    target: asset.clone(),
                    notional: *notional,
                    count: None,
                })
                .collect();

            BucketSummary {
                time,
                time_iso: iso_seconds(time),
                cumulative_notional: cumulative,
                cumulative_liquidated,
                cumulative_adld,
                notional_in_bucket: bucket.notional,
                event_count: bucket.event_count,
                liquidated_by_asset: bucket.liquidated_by_asset.clone(),
                adld_by_asset: bucket.adld_by_asset.clone(),
                asset_flows,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::accumulate;
    use adl_core::{Column, RawRecord};
    use approx::assert_relative_eq;

    fn row(ts: i64, coin: &str, notional: f64) -> RawRecord {
        RawRecord::default()
            .with(Column::Time, ts)
            .with(Column::Coin, coin)
            .with(Column::User, "T")
            .with(Column::LiquidatedUser, "L")
            .with(Column::AdlNotional, notional)
    }

    #[test]
    fn test_three_row_series() {
        let records = vec![
            row(1_000_000_000_000, "BTC", 100.0),
            row(1_000_000_000_500, "BTC", 50.0),
            row(1_000_000_001_200, "ETH", 200.0),
        ];
        let series = build_time_series(&accumulate(&records).unwrap());

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time, 1_000_000_000_000);
        assert_eq!(series[0].time_iso, "2001-09-09T01:46:40Z");
        assert_eq!(series[0].event_count, 2);
        assert_relative_eq!(series[0].notional_in_bucket, 150.0);
        assert_relative_eq!(series[0].cumulative_notional, 150.0);

        assert_eq!(series[1].time, 1_000_000_001_000);
        assert_eq!(series[1].event_count, 1);
        assert_relative_eq!(series[1].cumulative_notional, 350.0);
        assert_relative_eq!(series[1].cumulative_liquidated, 350.0);
        assert_relative_eq!(series[1].cumulative_adld, 350.0);
        assert_relative_eq!(series[1].liquidated_by_asset["ETH"], 200.0);
        assert!(!series[1].liquidated_by_asset.contains_key("BTC"));
        assert_eq!(series[1].asset_flows.len(), 1);
        assert_eq!(series[1].asset_flows[0].source, "ETH");
        assert_eq!(series[1].asset_flows[0].target, "ETH");
    }

    #[test]
    fn test_prefix_sum_and_monotonic() {
        // out of order input, several assets, one skipped row
        let records = vec![
            row(5_000_000_000_000, "SOL", 3.0),
            row(4_000_000_000_100, "BTC", 1.5),
            row(4_000_000_000_900, "ETH", 2.25),
            row(4_500_000_000_000, "BTC", 0.0),
            row(4_000_000_002_000, "BTC", 7.0),
        ];
        let series = build_time_series(&accumulate(&records).unwrap());

        assert_eq!(series.len(), 3);
        let mut running = 0.0;
        let mut previous = f64::NEG_INFINITY;
        let mut last_time = i64::MIN;
        for summary in &series {
            running += summary.notional_in_bucket;
            assert_relative_eq!(summary.cumulative_notional, running);
            assert!(summary.cumulative_notional >= previous);
            assert!(summary.time > last_time);
            previous = summary.cumulative_notional;
            last_time = summary.time;
        }
        assert_relative_eq!(running, 13.75);
    }

    #[test]
    fn test_empty_state_yields_empty_series() {
        let series = build_time_series(&FlowAggregationState::new());
        assert!(series.is_empty());
    }

    #[test]
    fn test_summary_serialization_keys() {
        let series = build_time_series(&accumulate(&[row(1_696_896_000_000, "BTC", 1.0)]).unwrap());
        let json = serde_json::to_value(&series[0]).unwrap();
        for key in [
            "time",
            "timeISO",
            "cumulativeNotional",
            "cumulativeLiquidated",
            "cumulativeAdld",
            "notionalInBucket",
            "eventCount",
            "liquidatedByAsset",
            "adldByAsset",
            "assetFlows",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["timeISO"], "2023-10-10T00:00:00Z");
        assert_eq!(json["liquidatedByAsset"]["BTC"], 1.0);
    }
}
