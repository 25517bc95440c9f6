//! Strokemap turns freehand body-map sketches into per-zone coverage scores.
//!
//! A paint trial is a list of polyline strokes drawn on a participant's canvas. Scoring runs in
//! four steps:
//!
//! 1. **Rasterize**: strokes are drawn onto a grey background at the experiment's sketch size
//!    (CPU, `vello_cpu`).
//! 2. **Composite**: a silhouette stencil is pasted over the raster with its own alpha, once or
//!    twice side by side for front/back canvases.
//! 3. **Aggregate**: the blue channel of the composite is averaged under every anatomical zone
//!    mask, yielding a score in `[0, 1]` rounded to two decimals (or `"NA"`).
//! 4. **Batch** (optional): trials read from experiment data are scored, optionally in parallel
//!    and against an on-disk artifact cache.
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Explicit context**: sizes, stencils and masks travel in a [`ScoringContext`]; there is
//!   no global state.
//! - **Deterministic**: the same strokes and masks always produce the same record.
#![forbid(unsafe_code)]

mod aggregate;
mod foundation;
mod masks;
mod pipeline;
mod render;
mod strokes;

pub use aggregate::zones::{
    ChannelView, IntensityMatrix, Side, ZoneScore, ZoneScoreRecord, aggregate_zones, blank_record,
    stamp_mask, zone_keys,
};
pub use foundation::core::{Affine, BezPath, CanvasSize, OutputSize, Point, Rect, Vec2};
pub use foundation::error::{StrokemapError, StrokemapResult};
pub use masks::load::{
    decode_mask_image, discover_zone_masks, load_stencil, load_zone_weights, zone_mask_grey,
    zone_name_from_file,
};
pub use masks::set::{MaskSet, ZoneMask};
pub use masks::weights::{MaskPolarity, MaskValuePolicy, WeightMatrix};
pub use pipeline::artifacts::{ArtifactStats, ArtifactStore, CompositeFormat, validate_trial_id};
pub use pipeline::batch::{
    BatchOpts, PaintTrial, StrokePayload, TrialIdFields, TrialOutcome, TrialResult, parse_trials,
    read_trials, score_trials,
};
pub use pipeline::profile::{ScoringProfile, SketchSize, ZoneMaskSource};
pub use pipeline::trial::{CanvasLayout, ScoringContext, process_strokes, process_trial};
pub use render::composite::{StencilMask, composite_stencil, paste_with_alpha};
pub use render::raster::{BACKGROUND_GREY, rasterize_strokes, stroke_path};
pub use strokes::color::StrokeColor;
pub use strokes::model::{Stroke, parse_strokes, strokes_from_value, trial_canvas};
