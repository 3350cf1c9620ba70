//! ViewFuse is a virtual multi-view fusion engine for registered 2D/3D
//! image volumes.
//!
//! Each view is a raster with an affine registration into a shared global
//! space. `Fusion` combines the views over an output bounding box into a
//! lazily evaluated `FusedImage`; pixels are computed on demand as a
//! weighted average, maximum or first-wins combination of the views that
//! contain them. `materialize` evaluates a whole image in parallel with the
//! `rayon` feature.
//!
//! ```
//! use viewfuse::{materialize, BoundingBox, Fusion, OwnedVolume, ScheduleConfig, View, ViewId};
//! use viewfuse::Affine3;
//!
//! let volume = OwnedVolume::new(vec![7u16; 4 * 4], [4, 4, 1])?;
//! let views = [(View::new(ViewId::new(0, 0), &volume), Affine3::identity())];
//! let bbox = BoundingBox::from_dims([4, 4, 1])?;
//! let image = Fusion::new().fuse_snapshot(&views, &bbox)?;
//! let out = materialize(&image, &ScheduleConfig::default())?;
//! assert_eq!(out.data()[5], 7.0);
//! # Ok::<(), viewfuse::ViewFuseError>(())
//! ```

pub mod bbox;
pub mod fusion;
pub mod lowlevel;
mod overlap;
pub mod raster;
mod sampler;
pub mod schedule;
mod trace;
pub mod transform;
pub mod util;
pub mod view;
pub mod weight;

pub use bbox::BoundingBox;
pub use fusion::{CachedImage, FusedImage, Fusion, FusionConfig, FusionPolicy};
pub use raster::{OwnedVolume, Raster, Sample, VolumeView};
pub use sampler::Interpolation;
pub use schedule::{materialize, materialize_into, ScheduleConfig};
pub use transform::Affine3;
pub use util::{ViewFuseError, ViewFuseResult};
pub use view::{Registration, RegistrationProvider, RegistrationStore, View, ViewId};
pub use weight::{BlendingParams, ContentParams, WeightSpec};
