/// Convenience result type used across strokemap.
pub type StrokemapResult<T> = Result<T, StrokemapError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Every variant is scoped to a single trial: callers that process batches record the error
/// and continue with the next trial.
#[derive(thiserror::Error, Debug)]
pub enum StrokemapError {
    /// Stroke payload is not valid JSON or lacks required fields.
    #[error("malformed stroke data: {0}")]
    MalformedStrokes(String),

    /// A zone mask does not match the image region it is multiplied against.
    #[error(
        "dimension mismatch for zone '{zone}': image region is {}x{}, mask is {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        /// Zone name of the offending mask.
        zone: String,
        /// Region size `(width, height)` the mask was applied to.
        expected: (u32, u32),
        /// Mask size `(width, height)`.
        actual: (u32, u32),
    },

    /// Invalid caller-provided configuration or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while rasterizing strokes or compositing the stencil.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrokemapError {
    /// Build a [`StrokemapError::MalformedStrokes`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedStrokes(msg.into())
    }

    /// Build a [`StrokemapError::DimensionMismatch`] value.
    pub fn dimension_mismatch(
        zone: impl Into<String>,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            zone: zone.into(),
            expected,
            actual,
        }
    }

    /// Build a [`StrokemapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StrokemapError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`StrokemapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
