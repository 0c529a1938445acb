//! Kappa core
//!
//! Item identifiers, the persisted progress record and the debounced
//! detection tracker. Nothing in here touches pixels.

pub mod error;
pub mod items;
pub mod progress;
pub mod tracker;

pub use error::ProgressError;
pub use items::{Catalog, ItemId};
pub use progress::{ProgressRecord, ProgressStore};
pub use tracker::{DetectionTracker, StatusChange};
