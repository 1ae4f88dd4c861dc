//! Core types and configuration for the ADL visualizer export.
//!
//! This crate provides shared types used across all other crates:
//! - Raw input records and their scalar cells
//! - Normalized liquidation/ADL events
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
