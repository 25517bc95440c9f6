use serde::{Deserialize, Serialize};

use crate::{
    foundation::core::{CanvasSize, Point},
    foundation::error::{StrokemapError, StrokemapResult},
    strokes::color::StrokeColor,
};

/// One pen movement (mouse down to mouse up) as recorded by the sketching plugin.
///
/// Field names on the wire follow the plugin: `size` is the nib width, `width`/`height` the
/// logical canvas and `stroke` the list of `[x, y]` positions. Only the first stroke of a trial
/// has to carry the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: StrokeColor,
    #[serde(rename = "size")]
    pub nib_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(rename = "stroke", with = "point_pairs")]
    pub points: Vec<Point>,
}

impl Stroke {
    /// Logical canvas recorded with this stroke.
    pub fn canvas(&self) -> StrokemapResult<CanvasSize> {
        let (Some(width), Some(height)) = (self.width, self.height) else {
            return Err(StrokemapError::malformed(
                "stroke carries no canvas 'width'/'height'",
            ));
        };
        CanvasSize::new(width, height).map_err(|_| {
            StrokemapError::malformed(format!(
                "canvas size must be finite and > 0, got {width}x{height}"
            ))
        })
    }

    fn validate(&self, index: usize) -> StrokemapResult<()> {
        if !(self.nib_width.is_finite() && self.nib_width > 0.0) {
            return Err(StrokemapError::malformed(format!(
                "stroke {index}: nib size must be finite and > 0, got {}",
                self.nib_width
            )));
        }
        if let Some(p) = self
            .points
            .iter()
            .find(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(StrokemapError::malformed(format!(
                "stroke {index}: non-finite point ({}, {})",
                p.x, p.y
            )));
        }
        Ok(())
    }
}

/// Decode a JSON-encoded stroke array as stored in a paint trial.
pub fn parse_strokes(json: &str) -> StrokemapResult<Vec<Stroke>> {
    let strokes: Vec<Stroke> =
        serde_json::from_str(json).map_err(|e| StrokemapError::malformed(e.to_string()))?;
    validate_strokes(&strokes)?;
    Ok(strokes)
}

/// Same as [`parse_strokes`] for payloads that are already decoded JSON values.
pub fn strokes_from_value(value: serde_json::Value) -> StrokemapResult<Vec<Stroke>> {
    let strokes: Vec<Stroke> =
        serde_json::from_value(value).map_err(|e| StrokemapError::malformed(e.to_string()))?;
    validate_strokes(&strokes)?;
    Ok(strokes)
}

fn validate_strokes(strokes: &[Stroke]) -> StrokemapResult<()> {
    strokes
        .iter()
        .enumerate()
        .try_for_each(|(i, s)| s.validate(i))
}

/// Canvas shared by every stroke of a trial, taken from the first stroke.
///
/// Returns `None` for an empty trial. Canvas fields on later strokes are neither required nor
/// checked.
pub fn trial_canvas(strokes: &[Stroke]) -> StrokemapResult<Option<CanvasSize>> {
    strokes.first().map(Stroke::canvas).transpose()
}

mod point_pairs {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    use crate::foundation::core::Point;

    pub(super) fn serialize<S>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(points.len()))?;
        for p in points {
            seq.serialize_element(&[p.x, p.y])?;
        }
        seq.end()
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(|[x, y]| Point::new(x, y)).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/strokes/model.rs"]
mod tests;
