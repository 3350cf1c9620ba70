//! Integer bounding boxes and real-valued intervals.
//!
//! `BoundingBox` bounds are inclusive on both ends, so a box with
//! `min == max` holds exactly one pixel along that axis.

use crate::transform::Affine3;
use crate::util::{ViewFuseError, ViewFuseResult};

mod estimate;

pub use estimate::{intersection_bounding_box, union_bounding_box};

/// Axis-aligned integer box with inclusive `min`/`max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    min: [i64; 3],
    max: [i64; 3],
}

impl BoundingBox {
    /// Creates a box, failing when `max < min` on any axis.
    pub fn new(min: [i64; 3], max: [i64; 3]) -> ViewFuseResult<Self> {
        for axis in 0..3 {
            if max[axis] < min[axis] {
                return Err(ViewFuseError::InvalidBoundingBox {
                    axis,
                    min: min[axis],
                    max: max[axis],
                });
            }
        }
        Ok(Self { min, max })
    }

    /// Creates a zero-min box covering `dims` pixels.
    pub fn from_dims(dims: [usize; 3]) -> ViewFuseResult<Self> {
        if dims.contains(&0) {
            return Err(ViewFuseError::InvalidDimensions { dims });
        }
        Ok(Self {
            min: [0; 3],
            max: dims.map(|n| n as i64 - 1),
        })
    }

    pub(crate) fn from_ordered(min: [i64; 3], max: [i64; 3]) -> Self {
        debug_assert!((0..3).all(|d| min[d] <= max[d]));
        Self { min, max }
    }

    /// Inclusive minimum corner.
    pub fn min(&self) -> [i64; 3] {
        self.min
    }

    /// Inclusive maximum corner.
    pub fn max(&self) -> [i64; 3] {
        self.max
    }

    /// Number of pixels along each axis.
    pub fn dims(&self) -> [usize; 3] {
        [0, 1, 2].map(|d| (self.max[d] - self.min[d] + 1) as usize)
    }

    /// Total number of pixels.
    pub fn num_pixels(&self) -> usize {
        self.dims().iter().product()
    }

    /// Number of axes spanning more than one pixel.
    pub fn rank(&self) -> usize {
        crate::raster::effective_rank(self.dims())
    }

    /// Returns `true` if `p` lies inside the box.
    pub fn contains(&self, p: [i64; 3]) -> bool {
        (0..3).all(|d| p[d] >= self.min[d] && p[d] <= self.max[d])
    }

    /// Returns the same box moved to the origin.
    pub fn zero_min(&self) -> BoundingBox {
        Self {
            min: [0; 3],
            max: [0, 1, 2].map(|d| self.max[d] - self.min[d]),
        }
    }

    /// Returns the box as real bounds.
    pub fn to_real(&self) -> RealBounds {
        RealBounds {
            min: self.min.map(|v| v as f64),
            max: self.max.map(|v| v as f64),
        }
    }
}

/// Axis-aligned real-valued interval with inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealBounds {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl RealBounds {
    /// Bounds of the pixel centers `[0, dims - 1]` mapped through `transform`.
    ///
    /// All eight corners are transformed and enclosed in an axis-aligned box.
    pub fn from_transformed_extent(dims: [usize; 3], transform: &Affine3) -> Self {
        let hi = dims.map(|n| n.saturating_sub(1) as f64);
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for corner in 0..8 {
            let p = [0, 1, 2].map(|d| if corner & (1 << d) == 0 { 0.0 } else { hi[d] });
            let q = transform.apply(p);
            for d in 0..3 {
                min[d] = min[d].min(q[d]);
                max[d] = max[d].max(q[d]);
            }
        }
        Self { min, max }
    }

    /// Grows the bounds by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: self.min.map(|v| v - margin),
            max: self.max.map(|v| v + margin),
        }
    }

    /// Returns `true` if the two closed intervals share at least one point.
    pub fn intersects(&self, other: &RealBounds) -> bool {
        (0..3).all(|d| self.min[d] <= other.max[d] && other.min[d] <= self.max[d])
    }

    /// Smallest integer box containing these bounds.
    pub fn enclosing_box(&self) -> ViewFuseResult<BoundingBox> {
        BoundingBox::new(
            self.min.map(|v| v.floor() as i64),
            self.max.map(|v| v.ceil() as i64),
        )
    }
}
