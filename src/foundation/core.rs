use crate::foundation::error::{StrokemapError, StrokemapResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Logical drawing surface reported by the sketching plugin.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> StrokemapResult<Self> {
        if !(width.is_finite() && width > 0.0) || !(height.is_finite() && height > 0.0) {
            return Err(StrokemapError::validation(format!(
                "canvas size must be finite and > 0, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Map logical canvas coordinates onto `output` the way an SVG viewBox with the default
    /// `xMidYMid meet` aspect handling does: uniform scale, centered on both axes.
    pub fn fit_affine(self, output: OutputSize) -> Affine {
        let ow = f64::from(output.width);
        let oh = f64::from(output.height);
        let scale = (ow / self.width).min(oh / self.height);
        let dx = (ow - self.width * scale) * 0.5;
        let dy = (oh - self.height * scale) * 0.5;
        Affine::translate(Vec2::new(dx, dy)) * Affine::scale(scale)
    }
}

/// Raster resolution of rendered and composited artifacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    // vello_cpu surfaces are addressed with u16 dimensions.
    const MAX_DIM: u32 = u16::MAX as u32;

    pub fn new(width: u32, height: u32) -> StrokemapResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrokemapError::validation("output size must be > 0"));
        }
        if width > Self::MAX_DIM || height > Self::MAX_DIM {
            return Err(StrokemapError::validation(format!(
                "output size too large: {width}x{height} (max {0}x{0})",
                Self::MAX_DIM
            )));
        }
        Ok(Self { width, height })
    }

    /// Column where the back half of a double-wide canvas begins.
    pub fn half_width(self) -> u32 {
        self.width / 2
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
