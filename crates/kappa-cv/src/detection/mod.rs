//! High-level detection module

pub mod config;
pub mod scanner;

pub use config::DetectionConfig;
pub use scanner::{lock_state, ChecklistState, ItemResult, ScanOutcome, ScanPhase, ScanReport, Scanner};
