use crate::raster::singleton_axes;
use crate::util::math::cosine_ramp;
use crate::weight::BlendingParams;

/// Cosine fall-off of a view towards its raster borders.
///
/// Along each non-singleton axis the distance to the nearest edge is zero
/// weight up to `border`, then rises over `range` with a cosine ramp. The
/// weight is the product over axes.
#[derive(Clone, Debug, PartialEq)]
pub struct BlendingWeight {
    dims: [usize; 3],
    singleton: [bool; 3],
    border: [f64; 3],
    range: [f64; 3],
}

impl BlendingWeight {
    /// Creates the weight for a raster of size `dims`.
    ///
    /// `scale` is the per-axis scale of the view model; distances in
    /// `params` are divided by it to express them in raster pixels.
    pub fn new(dims: [usize; 3], params: &BlendingParams, scale: [f64; 3]) -> Self {
        Self {
            dims,
            singleton: singleton_axes(dims),
            border: [0, 1, 2].map(|d| params.border[d] / scale[d]),
            range: [0, 1, 2].map(|d| params.range[d] / scale[d]),
        }
    }

    /// Border per axis in raster pixels.
    pub fn border(&self) -> [f64; 3] {
        self.border
    }

    /// Ramp length per axis in raster pixels.
    pub fn range(&self) -> [f64; 3] {
        self.range
    }

    /// Weight at local position `t`.
    #[inline]
    pub fn weight(&self, t: [f64; 3]) -> f32 {
        let mut w = 1.0f64;
        for d in 0..3 {
            if self.singleton[d] {
                continue;
            }
            let hi = (self.dims[d] - 1) as f64;
            let dist = t[d].min(hi - t[d]).max(0.0);
            if dist < self.border[d] {
                return 0.0;
            }
            let into = dist - self.border[d];
            if into < self.range[d] {
                w *= cosine_ramp(into / self.range[d]);
            }
        }
        w as f32
    }
}
