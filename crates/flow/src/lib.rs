//! Flow aggregation for the ADL visualizer export.
//!
//! This crate handles:
//! - Single-pass aggregation of asset, account-pair and per-second totals
//! - Top account rankings and flow edge gating
//! - Per-asset statistics
//! - Cumulative time series over one-second buckets

pub mod aggregator;
pub mod ranking;
pub mod time_series;

pub use aggregator::{accumulate, AccountPair, BucketAccumulator, FlowAggregationState, FlowRow};
pub use ranking::{
    build_account_flow_edges, build_asset_flow_edges, build_asset_liquidation_stats,
    build_asset_stats, derive_top_accounts, AccountTotal, AssetLiquidationStat, AssetStat,
    FlowEdge, TopAccounts,
};
pub use time_series::{build_time_series, BucketSummary};
