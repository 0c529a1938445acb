//! Template loading utilities

use super::{Template, TemplateConfig};
use crate::utils::image::ImageUtils;
use crate::Result;
use anyhow::Context;
use kappa_core::ItemId;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolves item names to `<slug>.<ext>` files under one assets directory
pub struct TemplateLoader {
    template_dir: PathBuf,
    supported_extensions: Vec<String>,
}

impl TemplateLoader {
    /// Create new template loader
    pub fn new<P: AsRef<Path>>(template_dir: P) -> Self {
        Self {
            template_dir: template_dir.as_ref().to_path_buf(),
            supported_extensions: TemplateConfig::default().extensions,
        }
    }

    /// Replace the extension search order
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.supported_extensions = extensions;
        self
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Load the template for `item`; `Ok(None)` when no asset exists
    pub fn load_template(&self, item: &ItemId) -> Result<Option<Template>> {
        let Some(path) = self.find_template_file(&item.slug()) else {
            return Ok(None);
        };

        let image = ImageUtils::load_grayscale(&path)
            .with_context(|| format!("Failed to load template: {:?}", path))?;

        Ok(Some(Template::new(item.clone(), image, path)))
    }

    /// Find `<stem>.<ext>`, trying extensions in order and falling back to a
    /// case-insensitive directory scan
    fn find_template_file(&self, stem: &str) -> Option<PathBuf> {
        for ext in &self.supported_extensions {
            let path = self.template_dir.join(format!("{}.{}", stem, ext));
            if path.is_file() {
                return Some(path);
            }
        }

        let entries = fs::read_dir(&self.template_dir).ok()?;
        let mut names: Vec<(String, PathBuf)> = entries
            .flatten()
            .map(|entry| (entry.file_name().to_string_lossy().to_lowercase(), entry.path()))
            .collect();
        names.sort();

        for ext in &self.supported_extensions {
            let wanted = format!("{}.{}", stem, ext).to_lowercase();
            if let Some((_, path)) = names.iter().find(|(name, _)| *name == wanted) {
                return Some(path.clone());
            }
        }

        None
    }
}

/// Templates indexed by item, built once at startup
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<ItemId, Template>,
}

impl TemplateStore {
    /// Index every item that has a decodable asset. Missing or broken assets
    /// only exclude that item from detection.
    pub fn load<'a>(loader: &TemplateLoader, items: impl IntoIterator<Item = &'a ItemId>) -> Self {
        let mut templates = HashMap::new();
        let mut missing = 0;

        for item in items {
            match loader.load_template(item) {
                Ok(Some(template)) => {
                    debug!(%item, path = ?template.path, "template loaded");
                    templates.insert(item.clone(), template);
                }
                Ok(None) => {
                    debug!(%item, "no template, item excluded from detection");
                    missing += 1;
                }
                Err(e) => {
                    warn!(%item, "skipping template: {e:#}");
                    missing += 1;
                }
            }
        }

        if !loader.template_dir().is_dir() {
            warn!("Template directory {:?} does not exist", loader.template_dir());
        }
        info!(
            "Loaded {} templates from {:?} ({} items without one)",
            templates.len(),
            loader.template_dir(),
            missing
        );

        Self { templates }
    }

    pub fn get(&self, item: &str) -> Option<&Template> {
        self.templates.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.templates.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
