//! Rankings, flow edges and per-asset statistics derived from an aggregation state.

use crate::aggregator::FlowAggregationState;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// A directed flow between two assets or two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub notional: f64,
    /// Contributing events; only reported for whole-run asset flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// An account with its aggregated notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotal {
    pub account: String,
    pub total_notional: f64,
}

/// Largest liquidated accounts and largest ADL counterparties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopAccounts {
    pub liquidated: Vec<AccountTotal>,
    pub counterparties: Vec<AccountTotal>,
}

impl TopAccounts {
    /// Accounts in either ranking.
    pub fn account_set(&self) -> HashSet<&str> {
        self.liquidated
            .iter()
            .chain(&self.counterparties)
            .map(|a| a.account.as_str())
            .collect()
    }
}

/// Per-asset totals for the asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetStat {
    pub asset: String,
    pub total_notional: f64,
    /// Rows carrying this asset, including rows skipped for their notional.
    pub event_count: u64,
}

/// Per-asset liquidated vs ADL'd split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLiquidationStat {
    pub asset: String,
    pub liquidated_notional: f64,
    pub adld_notional: f64,
    pub total_notional: f64,
}

/// Stable descending sort by value, first `k` entries. Ties keep insertion order.
fn top_k(totals: &IndexMap<String, f64>, k: usize) -> Vec<AccountTotal> {
    let mut ranked: Vec<(&String, f64)> = totals.iter().map(|(a, t)| (a, *t)).collect();
    ranked.sort_by_key(|(_, total)| Reverse(OrderedFloat(*total)));
    ranked
        .into_iter()
        .take(k)
        .map(|(account, total_notional)| AccountTotal {
            account: account.clone(),
            total_notional,
        })
        .collect()
}

/// Top `k` accounts by outgoing (liquidated) and incoming (counterparty) notional.
pub fn derive_top_accounts(state: &FlowAggregationState, k: usize) -> TopAccounts {
    TopAccounts {
        liquidated: top_k(&state.account_totals_out, k),
        counterparties: top_k(&state.account_totals_in, k),
    }
}

/// Account flow edges whose source and target both appear in a top ranking.
///
/// Edges are grouped by source in order of the source's first appearance, then by
/// target in order of first appearance for that source.
pub fn build_account_flow_edges(state: &FlowAggregationState, top: &TopAccounts) -> Vec<FlowEdge> {
    let keep = top.account_set();
    let mut by_source: IndexMap<&str, Vec<(&str, f64)>> = IndexMap::new();
    for ((source, target), notional) in &state.account_flows {
        by_source
            .entry(source.as_str())
            .or_default()
            .push((target.as_str(), *notional));
    }

    by_source
        .into_iter()
        .filter(|(source, _)| keep.contains(source))
        .flat_map(|(source, targets)| {
            targets
                .into_iter()
                .map(move |(target, notional)| (source, target, notional))
        })
        .filter(|(_, target, notional)| *notional > 0.0 && keep.contains(target))
        .map(|(source, target, notional)| FlowEdge {
            source: source.to_string(),
            target: target.to_string(),
            notional,
            count: None,
        })
        .collect()
}

/// Whole-run asset flows. Each edge is a self-loop carrying its event count.
pub fn build_asset_flow_edges(state: &FlowAggregationState) -> Vec<FlowEdge> {
    state
        .asset_totals
        .iter()
        .filter(|(_, notional)| **notional > 0.0)
        .map(|(asset, notional)| FlowEdge {
            source: asset.clone(),
            target: asset.clone(),
            notional: *notional,
            count: Some(state.asset_event_counts.get(asset).copied().unwrap_or(0)),
        })
        .collect()
}

/// Asset totals sorted descending by notional.
pub fn build_asset_stats(state: &FlowAggregationState) -> Vec<AssetStat> {
    let mut stats: Vec<AssetStat> = state
        .asset_totals
        .iter()
        .map(|(asset, total)| AssetStat {
            asset: asset.clone(),
            total_notional: *total,
            event_count: state.asset_row_counts.get(asset).copied().unwrap_or(0),
        })
        .collect();
    stats.sort_by_key(|s| Reverse(OrderedFloat(s.total_notional)));
    stats
}

/// Liquidated vs ADL'd notional per asset, sorted descending by their sum.
pub fn build_asset_liquidation_stats(state: &FlowAggregationState) -> Vec<AssetLiquidationStat> {
    let assets = state
        .liquidated_by_asset
        .keys()
        .chain(
            state
                .adld_by_asset
                .keys()
                .filter(|a| !state.liquidated_by_asset.contains_key(*a)),
        );

    let mut stats: Vec<AssetLiquidationStat> = assets
        .map(|asset| {
            let liquidated = state.liquidated_by_asset.get(asset).copied().unwrap_or(0.0);
            let adld = state.adld_by_asset.get(asset).copied().unwrap_or(0.0);
            AssetLiquidationStat {
                asset: asset.clone(),
                liquidated_notional: liquidated,
                adld_notional: adld,
                total_notional: liquidated + adld,
            }
        })
        .collect();
    stats.sort_by_key(|s| Reverse(OrderedFloat(s.total_notional)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::accumulate;
    use adl_core::{Column, RawRecord};
    use approx::assert_relative_eq;

    fn row(ts: i64, coin: &str, user: &str, liquidated: &str, notional: f64) -> RawRecord {
        RawRecord::default()
            .with(Column::Time, ts)
            .with(Column::Coin, coin)
            .with(Column::User, user)
            .with(Column::LiquidatedUser, liquidated)
            .with(Column::AdlNotional, notional)
    }

    #[test]
    fn test_top_accounts_sorted_with_stable_ties() {
        let records = vec![
            row(1, "BTC", "T1", "L1", 10.0),
            row(2, "BTC", "T2", "L2", 30.0),
            row(3, "BTC", "T3", "L3", 10.0),
            row(4, "BTC", "T4", "L4", 20.0),
        ];
        let state = accumulate(&records).unwrap();
        let top = derive_top_accounts(&state, 3);

        let names: Vec<_> = top.liquidated.iter().map(|a| a.account.as_str()).collect();
        assert_eq!(names, vec!["L2", "L4", "L1"]);
        let names: Vec<_> = top.counterparties.iter().map(|a| a.account.as_str()).collect();
        assert_eq!(names, vec!["T2", "T4", "T1"]);
        assert_relative_eq!(top.liquidated[0].total_notional, 30.0);
    }

    #[test]
    fn test_account_edges_gated_by_top_sets() {
        // L9 -> T9 is the smallest flow on both sides and falls outside k = 2.
        let records = vec![
            row(1, "BTC", "T1", "L1", 100.0),
            row(2, "BTC", "T2", "L2", 90.0),
            row(3, "BTC", "T9", "L9", 1.0),
            row(4, "BTC", "T2", "L1", 5.0),
        ];
        let state = accumulate(&records).unwrap();
        let top = derive_top_accounts(&state, 2);
        let edges = build_account_flow_edges(&state, &top);

        let pairs: Vec<_> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("L1", "T1"), ("L1", "T2"), ("L2", "T2")]);

        let keep = top.account_set();
        for edge in &edges {
            assert!(keep.contains(edge.source.as_str()));
            assert!(keep.contains(edge.target.as_str()));
            assert!(edge.count.is_none());
        }
    }

    #[test]
    fn test_account_edges_grouped_by_source() {
        let records = vec![
            row(1, "BTC", "X", "A", 10.0),
            row(2, "BTC", "Y", "B", 20.0),
            row(3, "BTC", "Z", "A", 30.0),
            row(4, "BTC", "X", "B", 5.0),
        ];
        let state = accumulate(&records).unwrap();
        let top = derive_top_accounts(&state, 50);
        let edges = build_account_flow_edges(&state, &top);

        let pairs: Vec<_> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "X"), ("A", "Z"), ("B", "Y"), ("B", "X")]);
    }

    #[test]
    fn test_account_in_both_rankings_can_be_source_and_target() {
        let records = vec![
            row(1, "BTC", "B", "A", 10.0),
            row(2, "BTC", "A", "B", 20.0),
        ];
        let state = accumulate(&records).unwrap();
        let top = derive_top_accounts(&state, 50);
        let edges = build_account_flow_edges(&state, &top);

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.source == "A" && e.target == "B"));
        assert!(edges.iter().any(|e| e.source == "B" && e.target == "A"));
    }

    #[test]
    fn test_asset_flow_edges_are_self_loops_with_counts() {
        let records = vec![
            row(1, "BTC", "T1", "L1", 100.0),
            row(2, "ETH", "T1", "L1", 40.0),
            row(3, "BTC", "T2", "L1", 50.0),
            row(4, "BTC", "T2", "L1", 0.0),
        ];
        let state = accumulate(&records).unwrap();
        let edges = build_asset_flow_edges(&state);

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].source, "BTC");
        assert_eq!(edges[0].target, "BTC");
        assert_relative_eq!(edges[0].notional, 150.0);
        assert_eq!(edges[0].count, Some(2));
        assert_eq!(edges[1].source, "ETH");
        assert_eq!(edges[1].count, Some(1));
    }

    #[test]
    fn test_asset_stats_count_all_rows() {
        let records = vec![
            row(1, "ETH", "T1", "L1", 40.0),
            row(2, "BTC", "T1", "L1", 100.0),
            row(3, "BTC", "T1", "L1", 0.0),
        ];
        let state = accumulate(&records).unwrap();
        let stats = build_asset_stats(&state);

        assert_eq!(stats[0].asset, "BTC");
        assert_relative_eq!(stats[0].total_notional, 100.0);
        assert_eq!(stats[0].event_count, 2);
        assert_eq!(stats[1].asset, "ETH");
        assert_eq!(stats[1].event_count, 1);
    }

    #[test]
    fn test_asset_liquidation_stats_sorted_by_sum() {
        let records = vec![
            row(1, "ETH", "T1", "L1", 40.0),
            row(2, "BTC", "T1", "L1", 100.0),
        ];
        let state = accumulate(&records).unwrap();
        let stats = build_asset_liquidation_stats(&state);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].asset, "BTC");
        assert_relative_eq!(stats[0].liquidated_notional, 100.0);
        assert_relative_eq!(stats[0].adld_notional, 100.0);
        assert_relative_eq!(stats[0].total_notional, 200.0);
        assert_eq!(stats[1].asset, "ETH");
    }

    #[test]
    fn test_edge_serialization() {
        let edge = FlowEdge {
            source: "BTC".to_string(),
            target: "BTC".to_string(),
            notional: 1.5,
            count: None,
        };
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json, serde_json::json!({"source": "BTC", "target": "BTC", "notional": 1.5}));
    }
}
