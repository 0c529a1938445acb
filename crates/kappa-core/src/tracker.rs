//! Debounced detection state

use chrono::{DateTime, Local};
use std::collections::HashMap;

use crate::items::ItemId;

/// A change in an item's detected state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub item: ItemId,
    pub detected: bool,
    pub at: DateTime<Local>,
}

impl StatusChange {
    pub fn label(&self) -> &'static str {
        if self.detected { "Detected" } else { "Not Detected" }
    }
}

/// Remembers the last reported state per item so repeats stay quiet.
///
/// Memory only; a fresh process reports every item once again.
#[derive(Debug, Default)]
pub struct DetectionTracker {
    previous: HashMap<ItemId, bool>,
}

impl DetectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation, returning an event if it is the first one for
    /// `item` or differs from the last.
    pub fn report(&mut self, item: &ItemId, detected: bool) -> Option<StatusChange> {
        if self.previous.get(item) == Some(&detected) {
            return None;
        }

        self.previous.insert(item.clone(), detected);
        Some(StatusChange {
            item: item.clone(),
            detected,
            at: Local::now(),
        })
    }

    pub fn last(&self, item: &str) -> Option<bool> {
        self.previous.get(item).copied()
    }
}
