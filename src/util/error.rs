//! Error types for viewfuse.

use crate::view::ViewId;
use thiserror::Error;

/// Result alias for viewfuse operations.
pub type ViewFuseResult<T> = std::result::Result<T, ViewFuseError>;

/// Errors that can occur when building or evaluating a fusion.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ViewFuseError {
    /// A bounding box has `max < min` on some axis.
    #[error("invalid bounding box on axis {axis}: min {min} > max {max}")]
    InvalidBoundingBox {
        /// Offending axis.
        axis: usize,
        /// Requested minimum.
        min: i64,
        /// Requested maximum.
        max: i64,
    },
    /// Volume dimensions are zero or overflow.
    #[error("invalid dimensions {dims:?}")]
    InvalidDimensions {
        /// Requested `[width, height, depth]`.
        dims: [usize; 3],
    },
    /// Row or slice strides cannot hold the requested dimensions.
    #[error("invalid strides for {dims:?}: row {row_stride}, slice {slice_stride}")]
    InvalidStrides {
        /// Requested `[width, height, depth]`.
        dims: [usize; 3],
        /// Elements between row starts.
        row_stride: usize,
        /// Elements between slice starts.
        slice_stride: usize,
    },
    /// Backing buffer is shorter than the layout requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall {
        /// Required element count.
        needed: usize,
        /// Provided element count.
        got: usize,
    },
    /// Output buffer length does not match the image size.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch {
        /// Number of pixels in the image.
        expected: usize,
        /// Length of the provided buffer.
        got: usize,
    },
    /// No views were available to estimate a bounding box.
    #[error("no views to estimate a bounding box from")]
    EmptyViewSet,
    /// The transformed view extents have no common region.
    #[error("view extents do not intersect")]
    EmptyIntersection,
    /// An affine transform cannot be inverted.
    #[error("transform is not invertible (determinant {det})")]
    SingularTransform {
        /// Determinant of the linear part.
        det: f64,
    },
    /// The registration provider has no transform for a view.
    #[error("no registration for view {view}")]
    MissingRegistration {
        /// View without a registration.
        view: ViewId,
    },
    /// Configuration values are out of range.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Description of the rejected value.
        reason: &'static str,
    },
    /// A worker failed while evaluating a chunk.
    #[error("fusion worker failed on chunk {chunk}: {reason}")]
    WorkerFailed {
        /// Index of the failed chunk.
        chunk: usize,
        /// Panic message or failure description.
        reason: String,
    },
    /// The worker pool could not be created.
    #[error("thread pool error: {reason}")]
    ThreadPool {
        /// Error reported by the pool builder.
        reason: String,
    },
    /// Image decoding or encoding failed.
    #[error("image io error: {reason}")]
    ImageIo {
        /// Error reported by the image backend.
        reason: String,
    },
}
