//! Durable item completion record

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::ProgressError;
use crate::items::{Catalog, ItemId};

/// Item → owned flag, keeping the order items were first inserted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    order: Vec<ItemId>,
    flags: HashMap<ItemId, bool>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every catalog item, none owned.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut record = Self::new();
        for item in &catalog.items {
            record.set(item, false);
        }
        record
    }

    pub fn get(&self, item: &str) -> Option<bool> {
        self.flags.get(item).copied()
    }

    /// Set a flag, appending unknown items. Returns the previous value.
    pub fn set(&mut self, item: &ItemId, owned: bool) -> Option<bool> {
        let previous = self.flags.insert(item.clone(), owned);
        if previous.is_none() {
            self.order.push(item.clone());
        }
        previous
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemId> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, bool)> {
        self.order.iter().map(|item| (item, self.flags[item]))
    }

    pub fn owned_count(&self) -> usize {
        self.flags.values().filter(|&&owned| owned).count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Serialize for ProgressRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (item, owned) in self.iter() {
            map.serialize_entry(item, &owned)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProgressRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = ProgressRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of item names to booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = ProgressRecord::new();
                while let Some((item, owned)) = access.next_entry::<ItemId, bool>()? {
                    record.set(&item, owned);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// The progress record together with the file it lives in.
///
/// Every save writes the whole record, so the scan path and the manual
/// toggle path can both persist without clobbering each other's updates.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    record: ProgressRecord,
}

impl ProgressStore {
    /// Wrap an existing record without touching disk.
    pub fn with_record<P: AsRef<Path>>(path: P, record: ProgressRecord) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            record,
        }
    }

    /// Load the record at `path`.
    ///
    /// A missing file is seeded from `defaults`. An unreadable or corrupt file
    /// is set aside as `<name>.corrupt` (numbered if taken) and also replaced by `defaults`. In both
    /// cases the fresh record is written out before returning.
    pub fn load<P: AsRef<Path>>(path: P, defaults: &Catalog) -> Self {
        let path = path.as_ref();

        let record = match Self::read(path) {
            Ok(Some(record)) => {
                info!("Progress loaded from {:?} ({} items)", path, record.len());
                return Self::with_record(path, record);
            }
            Ok(None) => {
                info!("Progress file {:?} not found, creating new progress data", path);
                ProgressRecord::from_catalog(defaults)
            }
            Err(e) => {
                error!("Error loading progress: {e}, starting fresh");
                Self::set_aside(path);
                ProgressRecord::from_catalog(defaults)
            }
        };

        let store = Self::with_record(path, record);
        if let Err(e) = store.save() {
            error!("Error saving default progress: {e}");
        }
        store
    }

    /// Read and parse `path`; `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<ProgressRecord>, ProgressError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProgressError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| ProgressError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Move an unreadable file out of the way without clobbering earlier
    /// backups: `<name>.corrupt`, then `<name>.corrupt.1`, `.corrupt.2`, ...
    fn set_aside(path: &Path) {
        let backup = (0u32..)
            .map(|n| {
                let mut name = path.as_os_str().to_owned();
                name.push(".corrupt");
                if n > 0 {
                    name.push(format!(".{n}"));
                }
                PathBuf::from(name)
            })
            .find(|candidate| !candidate.exists());

        match backup.map(|backup| fs::rename(path, &backup).map(|()| backup)) {
            Some(Ok(backup)) => warn!("Moved unreadable progress file to {:?}", backup),
            Some(Err(e)) => warn!("Could not move unreadable progress file aside: {e}"),
            None => warn!("No free backup name for unreadable progress file {:?}", path),
        }
    }

    /// Overwrite `item` with a detection result. Unknown items are appended.
    /// Returns whether the stored value changed.
    pub fn merge(&mut self, item: &ItemId, detected: bool) -> bool {
        let previous = self.record.set(item, detected);
        if previous != Some(detected) {
            debug!(%item, detected, "progress updated");
        }
        previous != Some(detected)
    }

    /// Manual override: set the flag and persist immediately.
    pub fn set_manual(&mut self, item: &ItemId, owned: bool) -> Result<(), ProgressError> {
        self.record.set(item, owned);
        info!(%item, owned, "manual override");
        self.save()
    }

    /// Write the full record as pretty JSON via a sibling temp file and rename.
    pub fn save(&self) -> Result<(), ProgressError> {
        let json = serde_json::to_string_pretty(&self.record).map_err(ProgressError::Serialize)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(source) = written {
            fs::remove_file(&tmp).ok();
            return Err(ProgressError::Write {
                path: self.path.clone(),
                source,
            });
        }

        info!("Progress saved to {:?}", self.path);
        Ok(())
    }

    pub fn get(&self, item: &str) -> Option<bool> {
        self.record.get(item)
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemId> {
        self.record.items()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
