//! Data ingestion and normalization for the ADL visualizer export.
//!
//! This crate handles:
//! - Input source resolution (local file, then remote fetch)
//! - CSV loading into typed records
//! - Per-field coalescing over candidate columns
//! - Timestamp normalization and side inference

pub mod coalesce;
pub mod loader;
pub mod normalizer;
pub mod source;

pub use loader::{load_from_config, load_records, load_records_from_bytes};
pub use normalizer::{normalize, resolve_side, resolve_timestamp, NormalizeOutcome, NormalizeStats};
pub use source::InputSource;
