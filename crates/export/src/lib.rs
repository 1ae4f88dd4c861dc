//! Document assembly and emission for the ADL visualizer export.
//!
//! This crate provides:
//! - Summary statistics for document metadata
//! - Events and flow document assembly
//! - JSON emission
//! - Pipeline runners used by the command line

pub mod document;
pub mod pipeline;
pub mod stats;
pub mod writer;

pub use document::{assemble_events_document, assemble_flow_document, EventsDocument, FlowDocument};
pub use pipeline::{export_events, export_flow, run_events, run_flow, EventsRun, FlowRun};
pub use stats::{events_metadata, flow_metadata, EventsMetadata, FlowMetadata};
pub use writer::write_document;
