use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use image::{ImageFormat, RgbImage, RgbaImage, codecs::jpeg::JpegEncoder};
use serde::{Deserialize, Serialize};

use crate::foundation::error::{StrokemapError, StrokemapResult};

/// Encoding of the composited artifact.
///
/// PNG is lossless, so a composite read back from the cache scores exactly like a fresh one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
}

impl CompositeFormat {
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    fn dir_and_ext(self) -> (&'static str, &'static str) {
        match self {
            Self::Png => ("composite", "png"),
            Self::Jpeg { .. } => ("jpg", "jpg"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Cache counters accumulated over the lifetime of an [`ArtifactStore`].
pub struct ArtifactStats {
    pub rasters_rendered: u64,
    pub rasters_reused: u64,
    pub composites_built: u64,
    pub composites_reused: u64,
}

#[derive(Debug, Default)]
struct Counters {
    rasters_rendered: AtomicU64,
    rasters_reused: AtomicU64,
    composites_built: AtomicU64,
    composites_reused: AtomicU64,
}

/// On-disk cache of per-trial rasters and composites, keyed by trial id.
///
/// An artifact that already exists is loaded instead of rebuilt. Fresh artifacts are written to
/// a temporary sibling first and renamed into place, so distinct trials can be processed from
/// several threads against the same store.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    composite_format: CompositeFormat,
    counters: Counters,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            composite_format: CompositeFormat::default(),
            counters: Counters::default(),
        }
    }

    pub fn with_composite_format(mut self, format: CompositeFormat) -> Self {
        self.composite_format = format;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn composite_format(&self) -> CompositeFormat {
        self.composite_format
    }

    pub fn raster_path(&self, trial_id: &str) -> StrokemapResult<PathBuf> {
        validate_trial_id(trial_id)?;
        Ok(self.root.join("png").join(format!("{trial_id}.png")))
    }

    pub fn composite_path(&self, trial_id: &str) -> StrokemapResult<PathBuf> {
        validate_trial_id(trial_id)?;
        let (dir, ext) = self.composite_format.dir_and_ext();
        Ok(self.root.join(dir).join(format!("{trial_id}.{ext}")))
    }

    /// Load the cached raster for `trial_id`, or call `render` and persist its output.
    pub fn raster_or_render(
        &self,
        trial_id: &str,
        render: impl FnOnce() -> StrokemapResult<RgbaImage>,
    ) -> StrokemapResult<RgbaImage> {
        let path = self.raster_path(trial_id)?;
        if path.is_file() {
            tracing::debug!(trial_id, path = %path.display(), "raster cache hit");
            self.counters.rasters_reused.fetch_add(1, Ordering::Relaxed);
            let img = image::open(&path)
                .with_context(|| format!("load cached raster '{}'", path.display()))?;
            return Ok(img.to_rgba8());
        }

        let img = render()?;
        write_atomically(&path, |tmp| {
            img.save_with_format(tmp, ImageFormat::Png)
                .with_context(|| format!("write raster '{}'", path.display()))
        })?;
        self.counters.rasters_rendered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(trial_id, path = %path.display(), "raster written");
        Ok(img)
    }

    /// Load the cached composite for `trial_id`, or call `build` and persist its output.
    pub fn composite_or_build(
        &self,
        trial_id: &str,
        build: impl FnOnce() -> StrokemapResult<RgbImage>,
    ) -> StrokemapResult<RgbImage> {
        let path = self.composite_path(trial_id)?;
        if path.is_file() {
            tracing::debug!(trial_id, path = %path.display(), "composite cache hit");
            self.counters.composites_reused.fetch_add(1, Ordering::Relaxed);
            let img = image::open(&path)
                .with_context(|| format!("load cached composite '{}'", path.display()))?;
            return Ok(img.to_rgb8());
        }

        let img = build()?;
        let format = self.composite_format;
        write_atomically(&path, |tmp| match format {
            CompositeFormat::Png => img
                .save_with_format(tmp, ImageFormat::Png)
                .with_context(|| format!("write composite '{}'", path.display())),
            CompositeFormat::Jpeg { quality } => {
                let f = File::create(tmp)
                    .with_context(|| format!("create '{}'", tmp.display()))?;
                let mut w = BufWriter::new(f);
                JpegEncoder::new_with_quality(&mut w, quality)
                    .encode_image(&img)
                    .with_context(|| format!("write composite '{}'", path.display()))?;
                w.flush()
                    .with_context(|| format!("write composite '{}'", path.display()))
            }
        })?;
        self.counters.composites_built.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(trial_id, path = %path.display(), "composite written");
        Ok(img)
    }

    pub fn stats(&self) -> ArtifactStats {
        ArtifactStats {
            rasters_rendered: self.counters.rasters_rendered.load(Ordering::Relaxed),
            rasters_reused: self.counters.rasters_reused.load(Ordering::Relaxed),
            composites_built: self.counters.composites_built.load(Ordering::Relaxed),
            composites_reused: self.counters.composites_reused.load(Ordering::Relaxed),
        }
    }
}

/// Trial ids become file names, so they must stay inside the artifact directories.
pub fn validate_trial_id(trial_id: &str) -> StrokemapResult<()> {
    let bad = trial_id.is_empty()
        || trial_id == "."
        || trial_id == ".."
        || trial_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(StrokemapError::validation(format!(
            "trial id {trial_id:?} cannot be used as an artifact name"
        )));
    }
    Ok(())
}

fn write_atomically(
    path: &Path,
    write: impl FnOnce(&Path) -> anyhow::Result<()>,
) -> StrokemapResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StrokemapError::validation("artifact path has no parent directory"))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create artifact dir '{}'", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StrokemapError::validation("artifact path has no file name"))?;
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = parent.join(format!(".{file_name}.{}.{seq}.tmp", std::process::id()));

    let mut guard = TempFileGuard(Some(tmp.clone()));
    write(&tmp)?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("move artifact into place '{}'", path.display()))?;
    guard.0 = None;
    Ok(())
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/artifacts.rs"]
mod tests;
