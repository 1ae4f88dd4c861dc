//! Document assembly for the two front-end artifacts.

use crate::stats::{events_metadata, flow_metadata, EventsMetadata, FlowMetadata};
use adl_core::NormalizedEvent;
use adl_flow::{
    build_account_flow_edges, build_asset_flow_edges, build_asset_liquidation_stats,
    build_asset_stats, build_time_series, derive_top_accounts, AssetLiquidationStat, AssetStat,
    BucketSummary, FlowAggregationState, FlowEdge, TopAccounts,
};
use serde::{Deserialize, Serialize};

/// Flat, time-ordered event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsDocument {
    pub metadata: EventsMetadata,
    pub events: Vec<NormalizedEvent>,
}

/// Aggregated asset/account flows and the per-second time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDocument {
    pub metadata: FlowMetadata,
    pub asset_flows: Vec<FlowEdge>,
    pub asset_stats: Vec<AssetStat>,
    pub asset_liquidation_stats: Vec<AssetLiquidationStat>,
    pub account_flows: Vec<FlowEdge>,
    pub top_accounts: TopAccounts,
    pub time_buckets: Vec<BucketSummary>,
}

/// Build the events document from time-sorted events.
pub fn assemble_events_document(events: Vec<NormalizedEvent>) -> EventsDocument {
    EventsDocument {
        metadata: events_metadata(&events),
        events,
    }
}

/// Build the flow document, keeping `top_accounts` accounts per direction.
pub fn assemble_flow_document(state: &FlowAggregationState, top_accounts: usize) -> FlowDocument {
    let top = derive_top_accounts(state, top_accounts);
    FlowDocument {
        metadata: flow_metadata(state),
        asset_flows: build_asset_flow_edges(state),
        asset_stats: build_asset_stats(state),
        asset_liquidation_stats: build_asset_liquidation_stats(state),
        account_flows: build_account_flow_edges(state, &top),
        top_accounts: top,
        time_buckets: build_time_series(state),
    }
}
