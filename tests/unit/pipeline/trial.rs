use super::*;
use crate::{
    aggregate::zones::ZoneScore,
    masks::{
        set::ZoneMask,
        weights::{MaskPolarity, WeightMatrix},
    },
};
use image::{Rgba, RgbaImage};
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "strokemap_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn clear_stencil(w: u32, h: u32) -> StencilMask {
    StencilMask::from_rgba(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 0])))
}

/// Weight 1 in the top `rows` rows, excluded below.
fn top_rows_zone(w: u32, h: u32, rows: u32) -> ZoneMask {
    let weights = (0..h)
        .flat_map(|y| (0..w).map(move |_| if y < rows { 1.0 } else { f64::NAN }))
        .collect();
    ZoneMask {
        polarity: MaskPolarity::InclusionHigh,
        weights: WeightMatrix::from_weights(w, h, weights).unwrap(),
    }
}

fn ctx_100(zones: MaskSet) -> ScoringContext {
    ScoringContext::new(
        OutputSize::new(100, 100).unwrap(),
        clear_stencil(100, 100),
        zones,
        false,
        false,
    )
    .unwrap()
}

fn line_json(color: &str, y: f64) -> String {
    json!([{
        "color": color, "size": 5, "width": 100, "height": 100,
        "stroke": [[0, y], [100, y]]
    }])
    .to_string()
}

fn top_zone_set() -> MaskSet {
    let mut zones = MaskSet::new();
    zones.insert("top", top_rows_zone(100, 100, 10));
    zones
}

#[test]
fn layout_flag_combinations() {
    assert_eq!(
        CanvasLayout::from_flags(false, false).unwrap(),
        CanvasLayout::Single
    );
    assert_eq!(
        CanvasLayout::from_flags(false, true).unwrap(),
        CanvasLayout::PreDoubled
    );
    assert_eq!(
        CanvasLayout::from_flags(true, true).unwrap(),
        CanvasLayout::Mirrored
    );
    assert!(matches!(
        CanvasLayout::from_flags(true, false).unwrap_err(),
        StrokemapError::Validation(_)
    ));
}

#[test]
fn layout_mask_sizes() {
    let out = OutputSize::new(480, 400).unwrap();
    assert_eq!(CanvasLayout::Single.stencil_size(out), (480, 400));
    assert_eq!(CanvasLayout::Single.zone_mask_size(out), (480, 400));
    assert_eq!(CanvasLayout::PreDoubled.stencil_size(out), (480, 400));
    assert_eq!(CanvasLayout::PreDoubled.zone_mask_size(out), (240, 400));
    assert_eq!(CanvasLayout::Mirrored.stencil_size(out), (240, 400));
    assert_eq!(CanvasLayout::Mirrored.zone_mask_size(out), (240, 400));
}

#[test]
fn split_layouts_need_even_width() {
    let err = ScoringContext::new(
        OutputSize::new(101, 10).unwrap(),
        clear_stencil(101, 10),
        MaskSet::new(),
        false,
        true,
    )
    .unwrap_err();
    assert!(err.to_string().contains("even output width"));
}

#[test]
fn empty_trial_yields_blank_record() {
    let ctx = ctx_100(top_zone_set());
    let rec = process_trial(&ctx, "[]", "empty").unwrap();
    assert_eq!(rec.keys().collect::<Vec<_>>(), vec!["top"]);
    assert_eq!(rec.get("top"), Some(ZoneScore::NotAvailable));
}

#[test]
fn red_stroke_in_zone_moves_score_off_background() {
    let ctx = ctx_100(top_zone_set());

    let red = process_trial(&ctx, &line_json("#ff0000", 0.0), "red").unwrap();
    let red = red.get("top").and_then(ZoneScore::value).unwrap();

    // A stroke that exists but misses the zone still scores: it is the background level.
    let off = process_trial(&ctx, &line_json("#ff0000", 90.0), "off").unwrap();
    assert_eq!(off.get("top"), Some(ZoneScore::Score(0.5)));

    // Red carries no blue, so it darkens the working channel.
    assert!(red > 0.0 && red < 0.5, "red score {red}");

    let white = process_trial(&ctx, &line_json("#ffffff", 0.0), "white").unwrap();
    let white = white.get("top").and_then(ZoneScore::value).unwrap();
    assert!(white > 0.5, "white score {white}");
}

#[test]
fn every_value_is_in_unit_range_or_missing() {
    let mut zones = MaskSet::new();
    zones.insert("nothing", top_rows_zone(50, 100, 0));
    zones.insert("left", top_rows_zone(50, 100, 100));
    let ctx = ScoringContext::new(
        OutputSize::new(100, 100).unwrap(),
        clear_stencil(50, 100),
        zones,
        true,
        true,
    )
    .unwrap();

    let rec = process_trial(&ctx, &line_json("#00ff00", 50.0), "mixed").unwrap();
    assert_eq!(
        rec.keys().collect::<Vec<_>>(),
        vec!["left_back", "left_front", "nothing_back", "nothing_front"]
    );
    for (_, score) in rec.iter() {
        if let ZoneScore::Score(v) = score {
            assert!((0.0..=1.0).contains(&v));
        }
    }
    assert_eq!(rec.get("nothing_front"), Some(ZoneScore::NotAvailable));
    assert!(rec.get("left_front").unwrap().is_available());
}

#[test]
fn malformed_trial_fails_only_that_call() {
    let ctx = ctx_100(top_zone_set());
    let err = process_trial(&ctx, r##"[{"color": "#000"}]"##, "bad").unwrap_err();
    assert!(matches!(err, StrokemapError::MalformedStrokes(_)));
    assert!(process_trial(&ctx, "[]", "next").is_ok());
}

#[test]
fn wrong_size_zone_mask_is_dimension_mismatch() {
    let mut zones = MaskSet::new();
    zones.insert("top", top_rows_zone(50, 100, 10));
    let ctx = ctx_100(zones);
    let err = process_trial(&ctx, &line_json("#ff0000", 0.0), "t").unwrap_err();
    assert!(matches!(err, StrokemapError::DimensionMismatch { .. }));
}

#[test]
fn no_zone_masks_gives_empty_record() {
    let ctx = ctx_100(MaskSet::new());
    let rec = process_trial(&ctx, &line_json("#ff0000", 0.0), "t").unwrap();
    assert!(rec.is_empty());
}

#[test]
fn only_the_first_stroke_carries_the_canvas() {
    let ctx = ctx_100(top_zone_set());
    let strokes = json!([
        {"color": "#ffffff", "size": 5, "width": 100, "height": 100,
         "stroke": [[0, 0], [100, 0]]},
        {"color": "#ffffff", "size": 5, "stroke": [[0, 5], [100, 5]]}
    ])
    .to_string();
    let rec = process_trial(&ctx, &strokes, "two").unwrap();
    assert!(rec.get("top").and_then(ZoneScore::value).unwrap() > 0.5);
}

#[test]
fn cached_composite_skips_the_raster() {
    let root = temp_dir("trial_cached_composite");
    let ctx = ctx_100(top_zone_set()).with_artifacts(ArtifactStore::new(root.clone()));
    let strokes = line_json("#ffffff", 0.0);

    let first = process_trial(&ctx, &strokes, "p1").unwrap();
    let raster = ctx.artifacts.as_ref().unwrap().raster_path("p1").unwrap();
    assert!(raster.is_file());
    std::fs::remove_file(&raster).unwrap();

    let second = process_trial(&ctx, &strokes, "p1").unwrap();
    assert_eq!(first, second);
    assert!(!raster.exists());
    let stats = ctx.artifacts.as_ref().unwrap().stats();
    assert_eq!(stats.rasters_rendered, 1);
    assert_eq!(stats.rasters_reused, 0);
    assert_eq!(stats.composites_built, 1);
    assert_eq!(stats.composites_reused, 1);

    std::fs::remove_dir_all(&root).ok();
}
