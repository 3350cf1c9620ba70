//! Coarse view selection by bounding-box overlap.
//!
//! A view can only contribute to the output if its transformed extent meets
//! the output region. The test is conservative: extents are axis-aligned
//! boxes around the transformed corners, grown by a margin that covers the
//! interpolation footprint at the region border.
//!
//! Singleton axes of a view are broadcast by the sampler, so a depth-1 view
//! covers the whole line through its plane along the mapped z direction. The
//! extent used here is unbounded along every output axis that direction
//! touches; otherwise splitting a box into slabs would lose 2D views.

use crate::bbox::RealBounds;
use crate::raster::singleton_axes;
use crate::transform::Affine3;
use crate::view::ViewId;

/// Default margin, in output pixels, added around every transformed extent.
pub const DEFAULT_OVERLAP_MARGIN: f64 = 2.0;

/// Placement of one view in the output space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// View identifier, used for ordering.
    pub id: ViewId,
    /// Raster extent `[width, height, depth]`.
    pub dims: [usize; 3],
    /// Model mapping view pixels into the output space.
    pub model: Affine3,
}

impl Placement {
    /// Output-space region the view can answer in.
    pub fn extent(&self) -> RealBounds {
        let mut bounds = RealBounds::from_transformed_extent(self.dims, &self.model);
        for (axis, single) in singleton_axes(self.dims).into_iter().enumerate() {
            if !single {
                continue;
            }
            for d in 0..3 {
                if self.model.get(d, axis) != 0.0 {
                    bounds.min[d] = f64::NEG_INFINITY;
                    bounds.max[d] = f64::INFINITY;
                }
            }
        }
        bounds
    }
}

/// Returns the indices of `placements` that can touch `output`.
///
/// The result is sorted by `ViewId`; placements with equal ids keep their
/// input order, so the selection is reproducible across runs.
pub fn filter_overlapping(output: &RealBounds, placements: &[Placement], margin: f64) -> Vec<usize> {
    let margin = if margin.is_finite() { margin.max(0.0) } else { 0.0 };
    let mut kept: Vec<usize> = placements
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.extent().expand(margin).intersects(output)
        })
        .map(|(idx, _)| idx)
        .collect();
    kept.sort_by_key(|&idx| placements[idx].id);
    kept
}

#[cfg(test)]
mod tests {
    use super::{filter_overlapping, Placement};
    use crate::bbox::RealBounds;
    use crate::transform::Affine3;
    use crate::view::ViewId;

    fn placement(tp: u32, setup: u32, shift: f64) -> Placement {
        Placement {
            id: ViewId::new(tp, setup),
            dims: [10, 10, 1],
            model: Affine3::translation([shift, 0.0, 0.0]),
        }
    }

    #[test]
    fn drops_distant_views_and_sorts_by_id() {
        let output = RealBounds {
            min: [0.0, 0.0, 0.0],
            max: [19.0, 9.0, 0.0],
        };
        let placements = [
            placement(0, 3, 5.0),
            placement(0, 1, 100.0),
            placement(0, 0, 15.0),
            placement(1, 0, -30.0),
        ];
        assert_eq!(filter_overlapping(&output, &placements, 0.0), vec![2, 0]);
    }

    #[test]
    fn margin_admits_views_just_outside() {
        let output = RealBounds {
            min: [0.0, 0.0, 0.0],
            max: [9.0, 9.0, 0.0],
        };
        let placements = [placement(0, 0, 10.5)];
        assert!(filter_overlapping(&output, &placements, 0.0).is_empty());
        assert_eq!(filter_overlapping(&output, &placements, 2.0), vec![0]);
    }

    #[test]
    fn flat_views_reach_every_slab() {
        let output = RealBounds {
            min: [0.0, 0.0, 7.0],
            max: [3.0, 3.0, 9.0],
        };
        let flat = Placement {
            id: ViewId::new(0, 0),
            dims: [4, 4, 1],
            model: Affine3::identity(),
        };
        let thick = Placement {
            id: ViewId::new(0, 1),
            dims: [4, 4, 2],
            model: Affine3::identity(),
        };
        assert_eq!(filter_overlapping(&output, &[flat, thick], 0.0), vec![0]);

        let extent = flat.extent();
        assert_eq!(extent.min[2], f64::NEG_INFINITY);
        assert_eq!(extent.max[2], f64::INFINITY);
        assert_eq!((extent.min[0], extent.max[0]), (0.0, 3.0));
    }

    #[test]
    fn flat_views_stay_bounded_in_their_plane() {
        let output = RealBounds {
            min: [0.0, 20.0, 5.0],
            max: [3.0, 23.0, 9.0],
        };
        let flat = Placement {
            id: ViewId::new(0, 0),
            dims: [4, 4, 1],
            model: Affine3::identity(),
        };
        assert!(filter_overlapping(&output, &[flat], 2.0).is_empty());
    }

    #[test]
    fn equal_ids_keep_input_order() {
        let output = RealBounds {
            min: [0.0; 3],
            max: [9.0, 9.0, 0.0],
        };
        let placements = [placement(0, 1, 0.0), placement(0, 0, 0.0), placement(0, 1, 1.0)];
        assert_eq!(filter_overlapping(&output, &placements, 0.0), vec![1, 0, 2]);
    }
}
