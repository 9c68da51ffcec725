//! Error types of the viewer core.

use thiserror::Error;

use crate::model::ViewId;

/// Failure reported by the annotation backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend raised an error while running an operation.
    ///
    /// `message` is the raw payload, usually `"<Kind>: <text>"`.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Name of the backend operation
        operation: String,
        /// Raw error payload
        message: String,
    },

    /// The operation was aborted through its cancel token.
    #[error("operation cancelled")]
    Cancelled,
}

impl BackendError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }

    /// Message suitable for an alert: the payload with its error-kind
    /// prefix removed, e.g. `"ValueError: segment has spines"` becomes
    /// `"segment has spines"`.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Failed { message, .. } => match message.split_once(": ") {
                Some((kind, rest))
                    if !kind.is_empty() && !kind.contains(char::is_whitespace) =>
                {
                    rest.to_string()
                }
                _ => message.clone(),
            },
            BackendError::Cancelled => "operation cancelled".to_string(),
        }
    }
}

/// Errors raised by the viewport manager itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// A render surface already exists on this thread
    #[error("a shared render surface is already active")]
    SurfaceActive,

    /// Zero, negative or non-finite view size
    #[error("view {id} has no drawable size ({width}x{height})")]
    InvalidSize { id: ViewId, width: f32, height: f32 },

    /// NaN or infinite camera input
    #[error("non-finite camera input for view {id}")]
    NonFiniteCamera { id: ViewId },

    /// Operation on a view that is not registered
    #[error("unknown view {id}")]
    UnknownView { id: ViewId },
}

/// Errors of the raster slice cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    /// The fetch was aborted; never shown to the user
    #[error("slice fetch cancelled")]
    Cancelled,

    /// The backend could not produce the slice
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The backend returned a buffer that does not match its dimensions
    #[error("slice buffer has {actual} samples, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl RasterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RasterError::Cancelled | RasterError::Backend(BackendError::Cancelled)
        )
    }
}

/// Errors decoding backend feature buffers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Byte length is not a multiple of the element size
    #[error("{buffer} buffer length {len} is not a multiple of {element}")]
    Misaligned {
        buffer: &'static str,
        len: usize,
        element: usize,
    },

    /// Positions and feature indices disagree on the vertex count
    #[error("{positions} positions but {indices} feature indices")]
    VertexCountMismatch { positions: usize, indices: usize },

    /// A vertex references a feature that has no id
    #[error("feature index {index} out of range ({count} features)")]
    FeatureOutOfRange { index: u32, count: usize },

    /// Path start indices are not increasing or point past the end
    #[error("invalid start index {index} for {vertices} vertices")]
    InvalidStartIndex { index: u32, vertices: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_strips_error_kind() {
        let err = BackendError::failed("delete_segment", "ValueError: segment 3 has spines");
        assert_eq!(err.user_message(), "segment 3 has spines");
    }

    #[test]
    fn test_user_message_keeps_plain_text() {
        let err = BackendError::failed("add_spine", "no segment selected");
        assert_eq!(err.user_message(), "no segment selected");
        let err = BackendError::failed("add_spine", "bad thing: happened");
        assert_eq!(err.user_message(), "bad thing: happened");
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(RasterError::Cancelled.is_cancelled());
        assert!(RasterError::from(BackendError::Cancelled).is_cancelled());
        assert!(!RasterError::SizeMismatch { expected: 4, actual: 2 }.is_cancelled());
    }
}
