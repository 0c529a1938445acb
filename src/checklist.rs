//! Read/toggle view of the checklist for whatever front end draws it

use anyhow::{anyhow, Result};
use kappa_core::ItemId;
use kappa_cv::detection::{lock_state, ChecklistState};
use kappa_cv::TemplateStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::error;

/// One row as a front end sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistEntry {
    pub item: ItemId,
    pub has_template: bool,
    pub owned: bool,
}

/// Shares the scanner's state; all writes go through the progress store.
pub struct Checklist {
    state: Arc<Mutex<ChecklistState>>,
    with_template: HashSet<ItemId>,
}

impl Checklist {
    pub fn new(state: Arc<Mutex<ChecklistState>>, templates: &TemplateStore) -> Self {
        let with_template = lock_state(&state)
            .progress
            .items()
            .filter(|item| templates.contains(item.as_str()))
            .cloned()
            .collect();

        Self { state, with_template }
    }

    pub fn entries(&self) -> Vec<ChecklistEntry> {
        lock_state(&self.state)
            .progress
            .record()
            .iter()
            .map(|(item, owned)| ChecklistEntry {
                item: item.clone(),
                has_template: self.with_template.contains(item),
                owned,
            })
            .collect()
    }

    /// (owned, total)
    pub fn summary(&self) -> (usize, usize) {
        let state = lock_state(&self.state);
        let record = state.progress.record();
        (record.owned_count(), record.len())
    }

    /// Flip an item by hand and persist. Names match ignoring ASCII case.
    /// A failed save is logged; the new value still stands in memory.
    pub fn toggle(&self, name: &str) -> Result<(ItemId, bool)> {
        let mut state = lock_state(&self.state);

        let item = state
            .progress
            .items()
            .find(|item| item.as_str() == name)
            .or_else(|| state.progress.items().find(|item| item.as_str().eq_ignore_ascii_case(name)))
            .cloned()
            .ok_or_else(|| anyhow!("no tracked item named {name:?}"))?;

        let owned = !state.progress.get(item.as_str()).unwrap_or(false);
        if let Err(e) = state.progress.set_manual(&item, owned) {
            error!("Error saving progress: {:#}", anyhow::Error::from(e));
        }

        Ok((item, owned))
    }

    /// Human readable listing, one line per item.
    pub fn render(&self) -> String {
        let (owned, total) = self.summary();
        let mut out = format!("{owned}/{total} collected\n");

        for entry in self.entries() {
            let mark = if entry.owned { "x" } else { " " };
            let icon = if entry.has_template { "" } else { "  (no icon)" };
            out.push_str(&format!("  [{mark}] {}{icon}\n", entry.item));
        }

        out
    }
}
