/// Convenience result type used across nanovolume.
pub type NanoVolumeResult<T> = Result<T, NanoVolumeError>;

/// Top-level error taxonomy used by loader, pipeline and capture APIs.
///
/// Per-frame entry points (`RenderPipeline::advance`, `ExperimentCapture::tick`) never return these;
/// they log them and degrade the frame instead.
#[derive(thiserror::Error, Debug)]
pub enum NanoVolumeError {
    /// The volume container could not be read or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Two images that must share dimensions do not.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// Width of the first image.
        a_width: u32,
        /// Height of the first image.
        a_height: u32,
        /// Width of the second image.
        b_width: u32,
        /// Height of the second image.
        b_height: u32,
    },

    /// An index addressed outside of `[0, len)`.
    #[error("index {index} out of range [0, {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: i64,
        /// Number of addressable items.
        len: usize,
    },

    /// Rendering was requested before the resources it needs exist.
    #[error("resource not ready: {0}")]
    ResourceNotReady(String),

    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures reported by a render device.
    #[error("device error: {0}")]
    Device(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NanoVolumeError {
    /// Build a [`NanoVolumeError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`NanoVolumeError::ResourceNotReady`] value.
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::ResourceNotReady(msg.into())
    }

    /// Build a [`NanoVolumeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`NanoVolumeError::Device`] value.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Build a [`NanoVolumeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`NanoVolumeError::IndexOutOfRange`] value.
    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
