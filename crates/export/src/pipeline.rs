//! End-to-end pipeline runners.
//!
//! Each runner takes an already loaded record set, builds its document, writes it and
//! logs the operator summary.

use crate::document::{assemble_events_document, assemble_flow_document, EventsDocument, FlowDocument};
use crate::writer::write_document;
use adl_core::config::{FlowConfig, OutputConfig};
use adl_core::{RawRecord, Result};
use adl_flow::accumulate;
use adl_ingestion::{normalize, NormalizeStats};
use std::path::PathBuf;
use tracing::info;

/// Outcome of the events pipeline.
#[derive(Debug, Clone)]
pub struct EventsRun {
    pub document: EventsDocument,
    pub stats: NormalizeStats,
}

/// Outcome of the flow pipeline.
#[derive(Debug, Clone)]
pub struct FlowRun {
    pub document: FlowDocument,
    /// Rows skipped for a missing or non-positive notional.
    pub skipped: u64,
}

/// Normalize records and assemble the events document.
pub fn run_events(records: &[RawRecord]) -> EventsRun {
    let outcome = normalize(records);
    EventsRun {
        document: assemble_events_document(outcome.events),
        stats: outcome.stats,
    }
}

/// Aggregate records and assemble the flow document.
pub fn run_flow(records: &[RawRecord], config: &FlowConfig) -> Result<FlowRun> {
    let state = accumulate(records)?;
    let skipped = state.skipped_count;
    Ok(FlowRun {
        document: assemble_flow_document(&state, config.top_accounts),
        skipped,
    })
}

/// Run the events pipeline and write its document. Returns the written path.
pub fn export_events(records: &[RawRecord], output: &OutputConfig) -> Result<PathBuf> {
    let run = run_events(records);
    let metadata = &run.document.metadata;

    info!(
        processed = run.stats.accepted,
        dropped_timestamp = run.stats.dropped_timestamp,
        dropped_notional = run.stats.dropped_notional,
        "Processed valid events"
    );
    info!(
        minutes = %format!("{:.2}", metadata.duration_minutes()),
        total_notional = %format!("{:.0}", metadata.total_notional_usd),
        unique_assets = metadata.unique_assets,
        unique_accounts = metadata.unique_accounts,
        "Event statistics"
    );

    let path = output.events_path();
    write_document(&path, &run.document, output.pretty)?;
    info!(events = metadata.event_count, path = %path.display(), "Saved events");
    Ok(path)
}

/// Run the flow pipeline and write its document. Returns the written path.
pub fn export_flow(records: &[RawRecord], flow: &FlowConfig, output: &OutputConfig) -> Result<PathBuf> {
    let run = run_flow(records, flow)?;
    let document = &run.document;

    let path = output.flow_path();
    write_document(&path, document, output.pretty)?;

    info!(
        asset_flows = document.asset_flows.len(),
        account_flows = document.account_flows.len(),
        top_accounts = flow.top_accounts,
        time_buckets = document.time_buckets.len(),
        skipped = run.skipped,
        "Flow statistics"
    );
    info!(
        total_notional = %format!("{:.0}", document.metadata.total_notional_usd),
        unique_assets = document.metadata.unique_assets,
        unique_accounts = document.metadata.unique_accounts,
        "Flow totals"
    );
    Ok(path)
}
