use crate::{
    aggregate::zones::{ZoneScoreRecord, aggregate_zones, blank_record},
    foundation::core::OutputSize,
    foundation::error::{StrokemapError, StrokemapResult},
    masks::set::MaskSet,
    pipeline::artifacts::ArtifactStore,
    render::composite::{StencilMask, composite_stencil},
    render::raster::rasterize_strokes,
    strokes::model::{Stroke, parse_strokes, trial_canvas},
};

/// How the stencil and the zone masks relate to the output canvas.
///
/// Built from the two independent doubling flags. Only three of the four combinations describe
/// a real canvas; pasting the stencil twice while scoring the canvas as a single surface is
/// rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasLayout {
    /// One surface: stencil pasted once, zones scored over the full width.
    Single,
    /// Front and back side by side, stencil already covering both halves: pasted once,
    /// zones scored per half.
    PreDoubled,
    /// Front and back side by side, half-width stencil pasted at `0` and at `width / 2`,
    /// zones scored per half.
    Mirrored,
}

impl CanvasLayout {
    pub fn from_flags(double_stencil: bool, double_zones: bool) -> StrokemapResult<Self> {
        match (double_stencil, double_zones) {
            (false, false) => Ok(Self::Single),
            (false, true) => Ok(Self::PreDoubled),
            (true, true) => Ok(Self::Mirrored),
            (true, false) => Err(StrokemapError::validation(
                "stencil doubling requires zone doubling: a mirrored stencil implies a \
                 front/back canvas",
            )),
        }
    }

    pub fn paste_stencil_twice(self) -> bool {
        matches!(self, Self::Mirrored)
    }

    pub fn split_zones(self) -> bool {
        !matches!(self, Self::Single)
    }

    /// Size the stencil must be resized to for `output`.
    pub fn stencil_size(self, output: OutputSize) -> (u32, u32) {
        if self.paste_stencil_twice() {
            (output.half_width(), output.height)
        } else {
            (output.width, output.height)
        }
    }

    /// Size every zone mask must be resized to for `output`.
    pub fn zone_mask_size(self, output: OutputSize) -> (u32, u32) {
        if self.split_zones() {
            (output.half_width(), output.height)
        } else {
            (output.width, output.height)
        }
    }
}

/// Everything a trial needs besides its strokes, built once per run and passed explicitly.
#[derive(Debug)]
pub struct ScoringContext {
    pub output: OutputSize,
    pub flip_y: bool,
    pub layout: CanvasLayout,
    pub stencil: StencilMask,
    pub zones: MaskSet,
    pub artifacts: Option<ArtifactStore>,
}

impl ScoringContext {
    pub fn new(
        output: OutputSize,
        stencil: StencilMask,
        zones: MaskSet,
        double_stencil: bool,
        double_zones: bool,
    ) -> StrokemapResult<Self> {
        let layout = CanvasLayout::from_flags(double_stencil, double_zones)?;
        if layout.split_zones() && output.width % 2 != 0 {
            return Err(StrokemapError::validation(format!(
                "front/back canvases need an even output width, got {}",
                output.width
            )));
        }
        Ok(Self {
            output,
            flip_y: false,
            layout,
            stencil,
            zones,
            artifacts: None,
        })
    }

    pub fn with_flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = flip_y;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }
}

/// Score one paint trial from its JSON-encoded stroke list.
#[tracing::instrument(skip(ctx, strokes_json))]
pub fn process_trial(
    ctx: &ScoringContext,
    strokes_json: &str,
    trial_id: &str,
) -> StrokemapResult<ZoneScoreRecord> {
    let strokes = parse_strokes(strokes_json)?;
    process_strokes(ctx, &strokes, trial_id)
}

/// Rasterize, composite and score already decoded strokes.
///
/// An empty stroke list produces the blank record (same keys, every value unavailable)
/// without rendering anything.
#[tracing::instrument(skip(ctx, strokes), fields(strokes = strokes.len()))]
pub fn process_strokes(
    ctx: &ScoringContext,
    strokes: &[Stroke],
    trial_id: &str,
) -> StrokemapResult<ZoneScoreRecord> {
    let split = ctx.layout.split_zones();
    let Some(canvas) = trial_canvas(strokes)? else {
        tracing::debug!("no strokes, emitting blank record");
        return Ok(blank_record(&ctx.zones, split));
    };

    let render = || rasterize_strokes(strokes, canvas, ctx.output, ctx.flip_y);
    let twice = ctx.layout.paste_stencil_twice();

    let composite = match &ctx.artifacts {
        // The raster is only looked up when the composite has to be built.
        Some(store) => store.composite_or_build(trial_id, || {
            let raster = store.raster_or_render(trial_id, render)?;
            Ok(composite_stencil(&raster, &ctx.stencil, twice))
        })?,
        None => composite_stencil(&render()?, &ctx.stencil, twice),
    };

    aggregate_zones(&composite, &ctx.zones, split)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/trial.rs"]
mod tests;
