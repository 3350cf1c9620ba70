//! Low-level building blocks for custom fusion pipelines.
//!
//! These items expose the samplers, weight models, overlap filter and box
//! arithmetic that `Fusion` is assembled from. Most users should prefer the
//! top-level `Fusion`, `FusedImage` and `materialize` API.

pub use crate::bbox::{intersection_bounding_box, union_bounding_box, RealBounds};
pub use crate::overlap::{filter_overlapping, Placement, DEFAULT_OVERLAP_MARGIN};
pub use crate::raster::gauss::{gaussian_blur, gaussian_kernel_1d};
pub use crate::raster::{effective_rank, singleton_axes};
pub use crate::sampler::{OutputSampler, SamplerConfig, TransformedSampler, ViewBounds, EDGE_EPSILON};
pub use crate::schedule::{plan_chunks, PIXELS_PER_CHUNK};
pub use crate::transform::{
    anisotropy_transform, average_anisotropy, sanitize_factor, scale_bounding_box,
    scale_transform, scale_transform_per_axis, ScaledBox,
};
pub use crate::weight::{BlendingWeight, ContentWeight, TransformedWeight, WeightModel};
