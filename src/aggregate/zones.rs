use std::collections::BTreeMap;

use image::RgbImage;
use serde::{Serialize, Serializer};

use crate::{
    foundation::error::{StrokemapError, StrokemapResult},
    masks::set::MaskSet,
    masks::weights::WeightMatrix,
};

/// Channel maximum used to normalize means into `[0, 1]`.
const CHANNEL_MAX: f64 = 255.0;

/// Score for one zone (and side).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoneScore {
    /// Mean channel intensity inside the zone, normalized to `[0, 1]` and rounded to 2 decimals.
    Score(f64),
    /// No data: the trial had no strokes, or the mask left no eligible pixel.
    NotAvailable,
}

impl ZoneScore {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Score(v) => Some(v),
            Self::NotAvailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Score(_))
    }
}

impl Serialize for ZoneScore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Score(v) => serializer.serialize_f64(*v),
            Self::NotAvailable => serializer.serialize_str("NA"),
        }
    }
}

/// Zone key -> score for one trial. Serializes as a flat JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ZoneScoreRecord {
    scores: BTreeMap<String, ZoneScore>,
}

impl ZoneScoreRecord {
    pub fn get(&self, key: &str) -> Option<ZoneScore> {
        self.scores.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ZoneScore)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn insert(&mut self, key: String, score: ZoneScore) {
        self.scores.insert(key, score);
    }
}

/// Half of a double-wide canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left half.
    Front,
    /// Right half.
    Back,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Front, Side::Back];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }

    pub fn zone_key(self, zone: &str) -> String {
        format!("{zone}_{}", self.suffix())
    }
}

/// Single-channel working matrix extracted from a composited image.
#[derive(Clone, Debug)]
pub struct IntensityMatrix {
    width: u32,
    height: u32,
    values: Vec<u8>,
}

impl IntensityMatrix {
    /// Blue channel: it separates stroke colours from the grey background best in the
    /// reference rendering, and earlier score tables were produced from it.
    pub fn from_blue(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let values = image.pixels().map(|p| p.0[2]).collect();
        Self {
            width,
            height,
            values,
        }
    }

    pub fn from_raw(width: u32, height: u32, values: Vec<u8>) -> StrokemapResult<Self> {
        if values.len() != width as usize * height as usize {
            return Err(StrokemapError::validation(format!(
                "intensity matrix {width}x{height} needs {} values, got {}",
                width as usize * height as usize,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn view(&self) -> ChannelView<'_> {
        self.columns(0, self.width)
    }

    /// Split at `width / 2`: front is `[0, half)`, back is `[half, width)`.
    pub fn split_halves(&self) -> (ChannelView<'_>, ChannelView<'_>) {
        let half = self.width / 2;
        (self.columns(0, half), self.columns(half, self.width - half))
    }

    pub fn side(&self, side: Side) -> ChannelView<'_> {
        let (front, back) = self.split_halves();
        match side {
            Side::Front => front,
            Side::Back => back,
        }
    }

    fn columns(&self, x0: u32, width: u32) -> ChannelView<'_> {
        ChannelView {
            matrix: self,
            x0,
            width,
        }
    }
}

/// Column window into an [`IntensityMatrix`].
#[derive(Clone, Copy, Debug)]
pub struct ChannelView<'a> {
    matrix: &'a IntensityMatrix,
    x0: u32,
    width: u32,
}

impl ChannelView<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.matrix.height)
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        let stride = self.matrix.width as usize;
        self.matrix.values[y as usize * stride + (self.x0 + x) as usize]
    }

    fn row(&self, y: u32) -> &[u8] {
        let stride = self.matrix.width as usize;
        let start = y as usize * stride + self.x0 as usize;
        &self.matrix.values[start..start + self.width as usize]
    }
}

/// Weighted mean of `region` under `mask`, ignoring excluded (`NaN`) positions.
///
/// The mean is divided by 255 and rounded half-to-even at two decimals. A mask with no numeric
/// weight in the region yields [`ZoneScore::NotAvailable`].
pub fn stamp_mask(
    zone: &str,
    region: ChannelView<'_>,
    mask: &WeightMatrix,
) -> StrokemapResult<ZoneScore> {
    if region.dimensions() != mask.dimensions() {
        return Err(StrokemapError::dimension_mismatch(
            zone,
            region.dimensions(),
            mask.dimensions(),
        ));
    }

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (y, weights) in mask.rows().enumerate() {
        for (&v, &w) in region.row(y as u32).iter().zip(weights) {
            let stamped = f64::from(v) * w;
            if stamped.is_nan() {
                continue;
            }
            sum += stamped;
            count += 1;
        }
    }

    if count == 0 {
        return Ok(ZoneScore::NotAvailable);
    }
    let mean = sum / count as f64 / CHANNEL_MAX;
    Ok(ZoneScore::Score(round_2dp(mean)))
}

/// Score every zone of `zones` against the composited image.
///
/// With `double_zones` the image is split into front/back halves and each zone is reported
/// twice as `<zone>_front` and `<zone>_back`.
#[tracing::instrument(skip(image, zones), fields(zones = zones.len()))]
pub fn aggregate_zones(
    image: &RgbImage,
    zones: &MaskSet,
    double_zones: bool,
) -> StrokemapResult<ZoneScoreRecord> {
    let intensity = IntensityMatrix::from_blue(image);
    let mut record = ZoneScoreRecord::default();

    if double_zones {
        for side in Side::BOTH {
            let region = intensity.side(side);
            for (zone, mask) in zones.iter() {
                let score = stamp_mask(zone, region, &mask.weights)?;
                record.insert(side.zone_key(zone), score);
            }
        }
    } else {
        let region = intensity.view();
        for (zone, mask) in zones.iter() {
            let score = stamp_mask(zone, region, &mask.weights)?;
            record.insert(zone.to_owned(), score);
        }
    }
    Ok(record)
}

/// Record with the key set [`aggregate_zones`] would produce and every value unavailable.
pub fn blank_record(zones: &MaskSet, double_zones: bool) -> ZoneScoreRecord {
    let mut record = ZoneScoreRecord::default();
    for key in zone_keys(zones, double_zones) {
        record.insert(key, ZoneScore::NotAvailable);
    }
    record
}

/// Keys emitted for `zones`, doubled with side suffixes when `double_zones` is set.
pub fn zone_keys(zones: &MaskSet, double_zones: bool) -> Vec<String> {
    if double_zones {
        Side::BOTH
            .iter()
            .flat_map(|side| zones.names().map(move |z| side.zone_key(z)))
            .collect()
    } else {
        zones.names().map(str::to_owned).collect()
    }
}

fn round_2dp(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
#[path = "../../tests/unit/aggregate/zones.rs"]
mod tests;
