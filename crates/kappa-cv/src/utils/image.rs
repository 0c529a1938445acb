//! Image conversions between the `image` crate and OpenCV

use crate::Result;
use anyhow::Context;
use image::{GrayImage, RgbaImage};
use opencv::{
    core::{Mat, Scalar, CV_8UC1},
    prelude::*,
};
use opencv_match::prelude::*;
use std::path::Path;

/// Image utility functions leveraging opencv-match conversions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image as grayscale Mat using opencv-match
    pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgba8();

        Self::rgba_to_grayscale(&img)
    }

    /// Convert a captured RGBA buffer to a single channel Mat
    pub fn rgba_to_grayscale(rgba_image: &RgbaImage) -> Result<Mat> {
        let mat: Mat = rgba_image
            .try_into_cv()
            .context("Failed to convert RGBA image to OpenCV Mat")?;

        opencv_match::convert::mat_to_grayscale(&mat, true)
            .context("Failed to convert image to grayscale")
    }

    /// Copy an 8-bit luma buffer into a Mat
    pub fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
        let (width, height) = gray.dimensions();
        let mut mat = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            CV_8UC1,
            Scalar::all(0.0),
        )?;

        for (x, y, pixel) in gray.enumerate_pixels() {
            *mat.at_2d_mut::<u8>(y as i32, x as i32)? = pixel.0[0];
        }

        Ok(mat)
    }

    /// (width, height) of a Mat
    pub fn dimensions(mat: &Mat) -> (i32, i32) {
        (mat.cols(), mat.rows())
    }
}
