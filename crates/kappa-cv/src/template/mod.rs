//! Template matching module

pub mod loader;
pub mod matcher;

pub use loader::{TemplateLoader, TemplateStore};
pub use matcher::{MatchResult, TemplateMatcher};

use kappa_core::ItemId;
use opencv::core::Mat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference icon of one tracked item.
#[derive(Debug, Clone)]
pub struct Template {
    pub item: ItemId,
    /// Single channel, not yet normalized.
    pub image: Mat,
    pub path: PathBuf,
}

impl Template {
    pub fn new(item: ItemId, image: Mat, path: PathBuf) -> Self {
        Self { item, image, path }
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchingMethod {
    /// Correlation coefficient (robust to linear lighting changes)
    CCoeffNormed,
    /// Normalized cross-correlation
    CCorrNormed,
    /// Squared difference (inverted: lower is better)
    SqDiffNormed,
}

impl MatchingMethod {
    pub fn to_opencv(&self) -> i32 {
        use opencv::imgproc::*;
        match self {
            MatchingMethod::CCoeffNormed => TM_CCOEFF_NORMED,
            MatchingMethod::CCorrNormed => TM_CCORR_NORMED,
            MatchingMethod::SqDiffNormed => TM_SQDIFF_NORMED,
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, MatchingMethod::SqDiffNormed)
    }
}

/// Template matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Scores at or above this count as a detection.
    pub threshold: f64,
    pub matching_method: MatchingMethod,
    /// Stretch each image to 0..255 before correlating.
    pub normalize: bool,
    /// Asset extensions, tried in order.
    pub extensions: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            matching_method: MatchingMethod::CCoeffNormed,
            normalize: true,
            extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
            ],
        }
    }
}
