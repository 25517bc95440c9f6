use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{DynamicImage, GrayImage, RgbaImage, imageops::FilterType};

use crate::{
    foundation::error::{StrokemapError, StrokemapResult},
    masks::weights::{MaskPolarity, MaskValuePolicy, WeightMatrix},
    render::composite::StencilMask,
};

const ZONE_PREFIX: &str = "body_";
const ZONE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg"];

/// Read a mask asset and decode it, rasterizing SVG sources directly at `size`.
pub fn decode_mask_image(path: &Path, size: (u32, u32)) -> StrokemapResult<DynamicImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read mask '{}'", path.display()))?;
    if is_svg(path) {
        let rgba = rasterize_svg(&bytes, size.0, size.1)
            .map_err(|e| StrokemapError::validation(format!("{}: {e}", path.display())))?;
        return Ok(DynamicImage::ImageRgba8(rgba));
    }
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("decode mask '{}'", path.display()))?;
    Ok(img)
}

/// Resize to `size` and reduce to greyscale. Alpha is discarded before the luma reduction.
///
/// Nearest-neighbour keeps binary masks binary; intermediate values would otherwise have to
/// go through [`MaskValuePolicy`].
pub fn zone_mask_grey(img: &DynamicImage, size: (u32, u32)) -> GrayImage {
    let resized = img.resize_exact(size.0, size.1, FilterType::Nearest);
    DynamicImage::ImageRgb8(resized.to_rgb8()).to_luma8()
}

pub fn load_zone_weights(
    path: &Path,
    size: (u32, u32),
    polarity: MaskPolarity,
    policy: MaskValuePolicy,
) -> StrokemapResult<WeightMatrix> {
    let img = decode_mask_image(path, size)?;
    WeightMatrix::from_grey(&zone_mask_grey(&img, size), polarity, policy)
        .map_err(|e| StrokemapError::validation(format!("{}: {e}", path.display())))
}

/// Load the silhouette stencil resized to `size`.
pub fn load_stencil(path: &Path, size: (u32, u32)) -> StrokemapResult<StencilMask> {
    let img = decode_mask_image(path, size)?;
    let resized = if img.width() == size.0 && img.height() == size.1 {
        img
    } else {
        img.resize_exact(size.0, size.1, FilterType::CatmullRom)
    };
    Ok(StencilMask::from_dynamic(resized))
}

/// Zone name encoded in a mask file name, e.g. `body_hands.png` -> `hands`.
///
/// Names must be purely alphabetic. Files mentioning `mask` or `map` are stencils or reference
/// sheets, not zones.
pub fn zone_name_from_file(file_name: &str) -> Option<String> {
    let lower = file_name.to_ascii_lowercase();
    if lower.contains("mask") || lower.contains("map") {
        return None;
    }
    let (stem, ext) = file_name.rsplit_once('.')?;
    if !ZONE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return None;
    }
    let zone = stem.strip_prefix(ZONE_PREFIX)?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(zone.to_owned())
}

/// List `(zone, path)` pairs for every zone mask in `dir`, sorted by zone name.
pub fn discover_zone_masks(dir: &Path) -> StrokemapResult<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("list zone masks in '{}'", dir.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list zone masks in '{}'", dir.display()))?;
        let file_name = entry.file_name();
        let Some(zone) = file_name.to_str().and_then(zone_name_from_file) else {
            continue;
        };
        if found.iter().any(|(z, _): &(String, PathBuf)| *z == zone) {
            return Err(StrokemapError::validation(format!(
                "zone '{zone}' has more than one mask file in '{}'",
                dir.display()
            )));
        }
        found.push((zone, entry.path()));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(dir = %dir.display(), zones = found.len(), "zone masks discovered");
    Ok(found)
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

fn rasterize_svg(bytes: &[u8], width: u32, height: u32) -> StrokemapResult<RgbaImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| StrokemapError::render("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    let straight: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| StrokemapError::render("svg raster byte length mismatch"))
}

#[cfg(test)]
#[path = "../../tests/unit/masks/load.rs"]
mod tests;
