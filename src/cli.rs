//! Command line arguments

use anyhow::{ensure, Result};
use clap::Parser;
use kappa_cv::DetectionConfig;
use std::path::PathBuf;

/// Scans the game window for collector item icons and keeps the checklist.
#[derive(Debug, Parser)]
#[command(name = "kappa", version)]
pub struct Args {
    /// JSON config file; ignored when missing
    #[arg(short, long, default_value = "kappa.json")]
    pub config: PathBuf,

    /// Application name or window title to capture
    #[arg(long)]
    pub window: Option<String>,

    /// Directory holding one icon per item
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Progress file
    #[arg(long)]
    pub progress: Option<PathBuf>,

    /// Item list used when no progress file exists yet
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Detection threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Run a single scan and exit
    #[arg(long)]
    pub once: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Config file contents with command line overrides applied.
    pub fn resolve_config(&self) -> Result<DetectionConfig> {
        let mut config = DetectionConfig::load_or_default(Some(&self.config))?;

        if let Some(window) = &self.window {
            config.window_name = window.clone();
        }
        if let Some(images) = &self.images {
            config.template_dir = images.clone();
        }
        if let Some(progress) = &self.progress {
            config.progress_file = progress.clone();
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_file = Some(catalog.clone());
        }
        if let Some(threshold) = self.threshold {
            config.template_config.threshold = threshold;
        }

        let threshold = config.template_config.threshold;
        ensure!(
            (-1.0..=1.0).contains(&threshold),
            "threshold {threshold} is outside -1.0..=1.0"
        );

        Ok(config)
    }
}
