use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::core::OutputSize,
    foundation::error::{StrokemapError, StrokemapResult},
    masks::load::load_stencil,
    masks::set::MaskSet,
    masks::weights::{MaskPolarity, MaskValuePolicy},
    pipeline::artifacts::{ArtifactStore, CompositeFormat},
    pipeline::trial::{CanvasLayout, ScoringContext},
};

/// Sketch size used in the experiment; rasters are produced at this resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchSize {
    pub width: u32,
    pub height: u32,
}

/// Directory of `body_<zone>.<ext>` masks and the convention they were drawn with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneMaskSource {
    pub dir: PathBuf,
    pub polarity: MaskPolarity,
    #[serde(default)]
    pub value_policy: MaskValuePolicy,
}

/// JSON description of one scoring setup (sketch size, stencil, zone masks, canvas layout).
///
/// Relative paths are resolved against the directory containing the profile file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringProfile {
    pub sketch: SketchSize,
    pub stencil: PathBuf,
    #[serde(default)]
    pub zones: Option<ZoneMaskSource>,
    #[serde(default)]
    pub double_stencil: bool,
    #[serde(default)]
    pub double_zones: bool,
    #[serde(default)]
    pub flip_y: bool,
    #[serde(default)]
    pub composite_format: CompositeFormat,
}

impl ScoringProfile {
    pub fn from_path(path: &Path) -> StrokemapResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("open profile '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&text, base)
    }

    pub fn from_json_str(text: &str, base_dir: &Path) -> StrokemapResult<Self> {
        let mut profile: Self = serde_json::from_str(text)
            .map_err(|e| StrokemapError::serde(format!("parse profile JSON: {e}")))?;
        profile.stencil = base_dir.join(&profile.stencil);
        if let Some(zones) = profile.zones.as_mut() {
            zones.dir = base_dir.join(&zones.dir);
        }
        Ok(profile)
    }

    pub fn output_size(&self) -> StrokemapResult<OutputSize> {
        OutputSize::new(self.sketch.width, self.sketch.height)
    }

    /// Load the stencil and zone masks at the sizes the layout calls for.
    #[tracing::instrument(skip(self), fields(stencil = %self.stencil.display()))]
    pub fn into_context(self, artifact_root: Option<PathBuf>) -> StrokemapResult<ScoringContext> {
        let output = self.output_size()?;
        let layout = CanvasLayout::from_flags(self.double_stencil, self.double_zones)?;

        let stencil = load_stencil(&self.stencil, layout.stencil_size(output))?;
        let zones = match &self.zones {
            Some(src) => MaskSet::load_dir(
                &src.dir,
                layout.zone_mask_size(output),
                src.polarity,
                src.value_policy,
            )?,
            None => MaskSet::new(),
        };
        tracing::info!(zones = zones.len(), ?layout, "scoring context ready");

        let mut ctx = ScoringContext::new(
            output,
            stencil,
            zones,
            self.double_stencil,
            self.double_zones,
        )?
        .with_flip_y(self.flip_y);
        if let Some(root) = artifact_root {
            ctx = ctx
                .with_artifacts(ArtifactStore::new(root).with_composite_format(self.composite_format));
        }
        Ok(ctx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/profile.rs"]
mod tests;
