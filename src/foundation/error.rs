/// Convenience result type used across fogmap.
pub type FogmapResult<T> = Result<T, FogmapError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Most variants describe failures that callers recover from locally (placeholder rendering,
/// empty item lists, skipped stream frames). Only explicit save/export actions surface them to the
/// user.
#[derive(thiserror::Error, Debug)]
pub enum FogmapError {
    /// A base image or token image could not be found or decoded.
    #[error("asset missing: {0}")]
    AssetMissing(String),

    /// A stored item list or map record could not be parsed.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The persistence worker was busy; the request was coalesced into a later write.
    #[error("save conflict: {0}")]
    SaveConflict(String),

    /// A stored fog mask does not match the base image dimensions.
    #[error("raster size mismatch: expected {expected:?}, got {actual:?}")]
    RasterSizeMismatch {
        /// Dimensions of the base image.
        expected: (u32, u32),
        /// Dimensions found in the stored raster.
        actual: (u32, u32),
    },

    /// A stream frame failed to encode.
    #[error("stream encode failure: {0}")]
    StreamEncodeFailure(String),

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FogmapError {
    /// Build a [`FogmapError::AssetMissing`] value.
    pub fn asset_missing(msg: impl Into<String>) -> Self {
        Self::AssetMissing(msg.into())
    }

    /// Build a [`FogmapError::MalformedRecord`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Build a [`FogmapError::SaveConflict`] value.
    pub fn save_conflict(msg: impl Into<String>) -> Self {
        Self::SaveConflict(msg.into())
    }

    /// Build a [`FogmapError::StreamEncodeFailure`] value.
    pub fn stream_encode(msg: impl Into<String>) -> Self {
        Self::StreamEncodeFailure(msg.into())
    }

    /// Build a [`FogmapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FogmapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures that are recovered locally and only logged.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AssetMissing(_)
                | Self::MalformedRecord(_)
                | Self::SaveConflict(_)
                | Self::RasterSizeMismatch { .. }
                | Self::StreamEncodeFailure(_)
        )
    }
}

impl From<serde_json::Error> for FogmapError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
