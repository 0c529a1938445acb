//! Detection configuration

use crate::template::TemplateConfig;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Application name or window title of the game.
    pub window_name: String,
    pub template_dir: PathBuf,
    pub progress_file: PathBuf,
    /// Item list used to seed a fresh progress file.
    pub catalog_file: Option<PathBuf>,
    pub template_config: TemplateConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_name: "EscapeFromTarkov".into(),
            template_dir: "images".into(),
            progress_file: "collector_progress.json".into(),
            catalog_file: None,
            template_config: TemplateConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Parse a JSON config file. Absent keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;

        serde_json::from_str(&json).with_context(|| format!("Invalid config: {:?}", path))
    }

    /// Load `path` when it exists, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                info!("Using config {:?}", path);
                Self::load(path)
            }
            Some(path) => {
                info!("Config {:?} not found, using defaults", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}
