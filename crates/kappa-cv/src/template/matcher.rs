//! Correlation matching with min-max normalization

use super::{Template, TemplateConfig};
use crate::error::CvError;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use image::RgbaImage;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};
use tracing::{debug, warn};

/// Score of one template against one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Correlation peak, `-inf` when the inputs could not be compared.
    pub score: f64,
    pub detected: bool,
}

impl MatchResult {
    /// Result for an item that could not be matched at all.
    pub fn missed() -> Self {
        Self {
            score: f64::NEG_INFINITY,
            detected: false,
        }
    }
}

/// OpenCV-based template matcher
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    config: TemplateConfig,
}

impl TemplateMatcher {
    /// Create new template matcher
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    /// Grayscale and, if configured, stretch to the full 0..255 range.
    pub fn prepare(&self, image: &Mat) -> Result<Mat> {
        let gray = match image.channels() {
            1 => image.clone(),
            3 => Self::convert(image, imgproc::COLOR_BGR2GRAY)?,
            4 => Self::convert(image, imgproc::COLOR_BGRA2GRAY)?,
            n => return Err(CvError::UnsupportedChannels(n).into()),
        };

        if !self.config.normalize {
            return Ok(gray);
        }

        let mut normalized = Mat::default();
        core::normalize(
            &gray,
            &mut normalized,
            0.0,
            255.0,
            core::NORM_MINMAX,
            -1,
            &core::no_array(),
        )
        .context("Min-max normalization failed")?;

        Ok(normalized)
    }

    /// Prepare a captured window frame
    pub fn prepare_rgba(&self, frame: &RgbaImage) -> Result<Mat> {
        let gray = ImageUtils::rgba_to_grayscale(frame)?;
        self.prepare(&gray)
    }

    fn convert(image: &Mat, code: i32) -> Result<Mat> {
        let mut gray = Mat::default();
        imgproc::cvt_color(image, &mut gray, code, 0).context("Grayscale conversion failed")?;
        Ok(gray)
    }

    /// Peak correlation of two already prepared images.
    ///
    /// Errors when either image is empty or the template does not fit.
    pub fn correlate(&self, frame: &Mat, template: &Mat) -> Result<f64> {
        if frame.empty() {
            return Err(CvError::EmptyImage("frame").into());
        }
        if template.empty() {
            return Err(CvError::EmptyImage("template").into());
        }

        let frame_size = ImageUtils::dimensions(frame);
        let template_size = ImageUtils::dimensions(template);
        if template_size.0 > frame_size.0 || template_size.1 > frame_size.1 {
            return Err(CvError::TemplateTooLarge {
                template: template_size,
                frame: frame_size,
            }
            .into());
        }

        // OpenCV reports a perfect score for a zero-variance template
        let (mut lo, mut hi) = (0.0, 0.0);
        core::min_max_loc(template, Some(&mut lo), Some(&mut hi), None, None, &core::no_array())?;
        if lo == hi {
            return Err(CvError::FlatTemplate.into());
        }

        let mut result = Mat::default();
        imgproc::match_template(
            frame,
            template,
            &mut result,
            self.config.matching_method.to_opencv(),
            &core::no_array(),
        )
        .context("Template matching failed")?;

        let mut min_val = 0.0;
        let mut max_val = 0.0;
        core::min_max_loc(
            &result,
            Some(&mut min_val),
            Some(&mut max_val),
            None,
            None,
            &core::no_array(),
        )?;

        let peak = if self.config.matching_method.is_inverted() {
            1.0 - min_val
        } else {
            max_val
        };

        Ok(if peak.is_finite() { peak } else { f64::NEG_INFINITY })
    }

    /// Score a template against a frame prepared with [`Self::prepare`].
    /// Never fails: unusable inputs score `-inf`.
    pub fn evaluate_prepared(&self, frame: &Mat, template: &Template) -> MatchResult {
        let score = self
            .prepare(&template.image)
            .and_then(|prepared| self.correlate(frame, &prepared));

        match score {
            Ok(score) => {
                let detected = score >= self.config.threshold;
                if detected {
                    debug!(item = %template.item, score, "match");
                } else {
                    debug!(item = %template.item, score, "no match");
                }
                MatchResult { score, detected }
            }
            Err(e) => {
                warn!(item = %template.item, path = ?template.path, "matching skipped: {e:#}");
                MatchResult::missed()
            }
        }
    }

    /// Full pipeline on raw images: prepare both, correlate, take the peak.
    pub fn score(&self, frame: &Mat, template: &Mat) -> f64 {
        let score = self.prepare(frame).and_then(|frame| {
            let template = self.prepare(template)?;
            self.correlate(&frame, &template)
        });

        score.unwrap_or_else(|e| {
            warn!("matching skipped: {e:#}");
            f64::NEG_INFINITY
        })
    }

    /// [`Self::score`] plus the threshold decision.
    pub fn evaluate(&self, frame: &Mat, template: &Mat) -> MatchResult {
        let score = self.score(frame, template);
        MatchResult {
            score,
            detected: score >= self.config.threshold,
        }
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(TemplateConfig::default())
    }
}
