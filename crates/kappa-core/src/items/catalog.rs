use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{error, info, warn};

use crate::items::ItemId;

/// Collector items tracked when no catalog file or progress file says otherwise.
const BUILTIN_ITEMS: &[&str] = &[
    "Old firesteel",
    "Antique axe",
    "Battered antique book",
    "FireKlean gun lube",
    "Golden rooster figurine",
    "Silver Badge",
    "Deadlyslob's beard oil",
    "Golden 1GPhone smartphone",
    "Jar of DevilDog mayo",
    "Can of sprats",
    "Fake mustache",
    "Kotton beanie",
    "Raven figurine",
    "Pestily plague mask",
    "Shroud half-mask",
    "Can of Dr Lupos coffee beans",
    "42 Signature Blend English Tea",
    "Veritas guitar pick",
    "Armband (Evasion)",
    "Can of RatCola soda",
    "Loot Lord plushie",
    "WZ Wallet",
    "LVNDMARK's rat poison",
    "Smoke balaclava",
    "Missam forklift key",
    "Video cassette with the Cyborg Killer movie",
    "BakeEzy cook book",
    "JohnB Liquid DNB glasses",
    "Glorious E lightweight armored mask",
    "Baddie's red beard",
    "DRD body armor",
    "Gingy keychain",
    "Golden egg",
    "Press pass (issued for NoiceGuy)",
    "Axel parrot figurine",
    "BEAR Buddy plush toy",
    "Inseq gas pipe wrench",
    "Viibiin sneaker",
    "Tamatthi kunai knife replica",
];

/// Ordered list of item names seeding a fresh progress record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub items: Vec<ItemId>,
}

impl Catalog {
    pub fn new(items: impl IntoIterator<Item = impl Into<ItemId>>) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// The compiled-in collector list.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_ITEMS.iter().copied())
    }

    /// Load a catalog file, falling back to the builtin list on any failure.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        match Self::try_load(path) {
            Ok(catalog) if !catalog.items.is_empty() => catalog,
            Ok(_) => {
                warn!(?path, "catalog file lists no items, using builtin list");
                Self::builtin()
            }
            Err(e) => {
                error!(?path, "failed to load catalog: {e:#}");
                Self::builtin()
            }
        }
    }

    /// One item name per line. Blank lines and `#` comments are skipped,
    /// repeated names are kept once.
    pub fn try_load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let reader = BufReader::new(file);

        let mut items: Vec<ItemId> = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line
                .with_context(|| format!("Failed to read line {} from {:?}", line_num + 1, path))?;
            let name = line.trim();

            if name.is_empty() || name.starts_with('#') {
                continue;
            }

            let item = ItemId::new(name);
            if items.contains(&item) {
                warn!(line = line_num + 1, %item, "duplicate catalog entry ignored");
                continue;
            }
            items.push(item);
        }

        info!("Loaded {} items from {:?}", items.len(), path);
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
