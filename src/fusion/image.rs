use crate::bbox::BoundingBox;
use crate::fusion::FusionPolicy;
use crate::sampler::{OutputSampler, TransformedSampler};
use crate::transform::Affine3;
use crate::util::{ViewFuseError, ViewFuseResult};
use crate::view::ViewId;
use crate::weight::TransformedWeight;

/// One contributing view: its sampler and weight in output coordinates.
///
/// Both adapters share one placement, so the local position found by the
/// sampler is valid for the weight as well.
#[derive(Clone, Debug)]
pub(crate) struct ViewStack<'a> {
    pub(crate) id: ViewId,
    pub(crate) sampler: TransformedSampler<'a>,
    pub(crate) weight: TransformedWeight,
}

/// Lazily evaluated fusion result.
///
/// Pixels are addressed zero-min over the output box. Reads are independent
/// and side-effect free; clones can be evaluated concurrently.
#[derive(Clone, Debug)]
pub struct FusedImage<'a> {
    bbox: BoundingBox,
    dims: [usize; 3],
    stacks: Vec<ViewStack<'a>>,
    policy: FusionPolicy,
    to_global: Affine3,
}

impl<'a> FusedImage<'a> {
    pub(crate) fn new(
        bbox: BoundingBox,
        stacks: Vec<ViewStack<'a>>,
        policy: FusionPolicy,
        to_global: Affine3,
    ) -> Self {
        Self {
            dims: bbox.dims(),
            bbox,
            stacks,
            policy,
            to_global,
        }
    }

    /// Output extent `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of output pixels.
    pub fn num_pixels(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Output box in the (possibly downsampled) output grid.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Maps zero-min output pixels to global coordinates.
    pub fn to_global(&self) -> &Affine3 {
        &self.to_global
    }

    /// Views that may contribute, in evaluation order.
    pub fn contributing_views(&self) -> Vec<ViewId> {
        self.stacks.iter().map(|s| s.id).collect()
    }

    /// Combination policy.
    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    /// Returns the fused value at a zero-min output pixel.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        let [w, h, d] = self.dims;
        if x >= w || y >= h || z >= d {
            return None;
        }
        Some(self.value_at([x as f64, y as f64, z as f64]))
    }

    /// Evaluates consecutive pixels in x-fastest order starting at linear
    /// index `start`.
    pub fn evaluate_into(&self, start: usize, out: &mut [f32]) -> ViewFuseResult<()> {
        let total = self.num_pixels();
        if start > total || out.len() > total - start {
            return Err(ViewFuseError::BufferLengthMismatch {
                expected: total.saturating_sub(start),
                got: out.len(),
            });
        }
        let [w, h, _] = self.dims;
        let plane = w * h;
        let mut x = start % w;
        let mut y = (start % plane) / w;
        let mut z = start / plane;
        for slot in out.iter_mut() {
            *slot = self.value_at([x as f64, y as f64, z as f64]);
            x += 1;
            if x == w {
                x = 0;
                y += 1;
                if y == h {
                    y = 0;
                    z += 1;
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn value_at(&self, p: [f64; 3]) -> f32 {
        match self.policy {
            FusionPolicy::Avg => self.average(p),
            FusionPolicy::Max => self.maximum(p),
            FusionPolicy::FirstWins => self.first(p),
        }
    }

    fn average(&self, p: [f64; 3]) -> f32 {
        let mut sum = 0.0f64;
        let mut weights = 0.0f64;
        for stack in &self.stacks {
            let Some(t) = stack.sampler.locate(p) else {
                continue;
            };
            let w = f64::from(stack.weight.sample_local(t));
            if w > 0.0 {
                sum += w * f64::from(stack.sampler.sample_local(t));
                weights += w;
            }
        }
        if weights > 0.0 {
            (sum / weights) as f32
        } else {
            0.0
        }
    }

    fn maximum(&self, p: [f64; 3]) -> f32 {
        self.stacks
            .iter()
            .filter_map(|stack| stack.sampler.locate(p).map(|t| stack.sampler.sample_local(t)))
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    fn first(&self, p: [f64; 3]) -> f32 {
        for stack in &self.stacks {
            if let Some(t) = stack.sampler.locate(p) {
                if stack.weight.sample_local(t) > 0.0 {
                    return stack.sampler.sample_local(t);
                }
            }
        }
        0.0
    }
}
