use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{StrokemapError, StrokemapResult};

/// Which raw mask value marks the inside of a zone.
///
/// The two mask families in use were authored with opposite foreground conventions, so the
/// polarity travels with each loaded mask instead of being inferred from its file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskPolarity {
    /// `255` is inside (weight 1), `0` is excluded. Whole-body mask family.
    InclusionHigh,
    /// `0` is inside (weight 1), `255` is excluded. Every other mask family.
    InclusionLow,
}

/// Handling of raw mask values other than exactly `0` or `255`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskValuePolicy {
    /// Snap to the nearest extreme: `>= 128` counts as 255, anything lower as 0.
    #[default]
    Threshold,
    /// Fail on the first value that is not `0` or `255`.
    Reject,
}

/// Per-pixel zone weights: `1.0` inside the zone, `NaN` where excluded.
#[derive(Clone, Debug)]
pub struct WeightMatrix {
    width: u32,
    height: u32,
    weights: Vec<f64>,
}

impl WeightMatrix {
    /// Normalize a greyscale mask into weights according to `polarity`.
    pub fn from_grey(
        grey: &GrayImage,
        polarity: MaskPolarity,
        policy: MaskValuePolicy,
    ) -> StrokemapResult<Self> {
        let (width, height) = grey.dimensions();
        let mut weights = Vec::with_capacity(width as usize * height as usize);
        for (x, y, px) in grey.enumerate_pixels() {
            let raw = match (px.0[0], policy) {
                (v @ (0 | 255), _) => v,
                (v, MaskValuePolicy::Threshold) => {
                    if v >= 128 {
                        255
                    } else {
                        0
                    }
                }
                (v, MaskValuePolicy::Reject) => {
                    return Err(StrokemapError::validation(format!(
                        "mask value {v} at ({x}, {y}) is neither 0 nor 255"
                    )));
                }
            };
            let inside = match polarity {
                MaskPolarity::InclusionHigh => raw == 255,
                MaskPolarity::InclusionLow => raw == 0,
            };
            weights.push(if inside { 1.0 } else { f64::NAN });
        }
        Ok(Self {
            width,
            height,
            weights,
        })
    }

    /// Build directly from row-major weights; `NaN` marks exclusion.
    pub fn from_weights(width: u32, height: u32, weights: Vec<f64>) -> StrokemapResult<Self> {
        if weights.len() != width as usize * height as usize {
            return Err(StrokemapError::validation(format!(
                "weight matrix {width}x{height} needs {} values, got {}",
                width as usize * height as usize,
                weights.len()
            )));
        }
        Ok(Self {
            width,
            height,
            weights,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.weights[y as usize * self.width as usize + x as usize]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.weights.chunks_exact(self.width.max(1) as usize)
    }

    /// Number of positions carrying a numeric weight.
    pub fn included_count(&self) -> usize {
        self.weights.iter().filter(|w| !w.is_nan()).count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/masks/weights.rs"]
mod tests;
