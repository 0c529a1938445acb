//! Tracked item identity

pub mod catalog;
pub mod slug;

pub use catalog::Catalog;
pub use slug::slugify;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable display name of a tracked item, used as the key everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe stem used to look up the item's template image.
    pub fn slug(&self) -> String {
        slugify(&self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ItemId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
