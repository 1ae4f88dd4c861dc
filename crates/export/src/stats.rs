//! Summary statistics for the document metadata sections.

use adl_core::{NormalizedEvent, TimeRange, TimestampMs};
use adl_flow::FlowAggregationState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Time range of the events document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimeRange {
    pub start: TimestampMs,
    pub end: TimestampMs,
}

/// Time range of the flow document, with its span in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTimeRange {
    pub start: TimestampMs,
    pub end: TimestampMs,
    pub duration_minutes: f64,
}

impl From<TimeRange> for FlowTimeRange {
    fn from(range: TimeRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
            duration_minutes: range.duration_minutes(),
        }
    }
}

/// Metadata of the events document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsMetadata {
    pub event_count: usize,
    pub time_range: EventTimeRange,
    pub total_notional_usd: f64,
    pub unique_assets: usize,
    /// Distinct non-empty ADL counterparties.
    pub unique_accounts: usize,
}

impl EventsMetadata {
    /// Span of the events in minutes.
    pub fn duration_minutes(&self) -> f64 {
        TimeRange {
            start: self.time_range.start,
            end: self.time_range.end,
        }
        .duration_minutes()
    }
}

/// Metadata of the flow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadata {
    /// Rows loaded, including rows skipped for their notional.
    pub event_count: u64,
    pub time_range: FlowTimeRange,
    pub total_notional_usd: f64,
    pub total_liquidated_notional: f64,
    pub total_adld_notional: f64,
    pub unique_assets: usize,
    pub unique_accounts: usize,
}

/// Compute the events metadata. `events` must already be sorted by timestamp.
pub fn events_metadata(events: &[NormalizedEvent]) -> EventsMetadata {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return EventsMetadata::default();
    };

    let unique_assets: HashSet<&str> = events.iter().map(|e| e.asset.as_str()).collect();
    let unique_accounts: HashSet<&str> = events
        .iter()
        .map(|e| e.target_user_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();

    EventsMetadata {
        event_count: events.len(),
        time_range: EventTimeRange {
            start: first.timestamp_ms,
            end: last.timestamp_ms,
        },
        total_notional_usd: events.iter().map(|e| e.notional_usd).sum(),
        unique_assets: unique_assets.len(),
        unique_accounts: unique_accounts.len(),
    }
}

/// Compute the flow metadata from an aggregation state.
pub fn flow_metadata(state: &FlowAggregationState) -> FlowMetadata {
    FlowMetadata {
        event_count: state.row_count,
        time_range: state.time_range.map(FlowTimeRange::from).unwrap_or_default(),
        total_notional_usd: state.total_notional(),
        total_liquidated_notional: state.total_liquidated(),
        total_adld_notional: state.total_adld(),
        unique_assets: state.asset_totals.len(),
        unique_accounts: state.unique_accounts(),
    }
}
