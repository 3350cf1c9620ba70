//! Bounding box estimation from transformed view extents.

use crate::bbox::{BoundingBox, RealBounds};
use crate::transform::Affine3;
use crate::util::{ViewFuseError, ViewFuseResult};

/// Smallest integer box containing every transformed view extent.
///
/// Each extent is `(dims, model)`; the corners of `[0, dims - 1]` are mapped
/// through `model` and the union of the per-view boxes is enclosed.
pub fn union_bounding_box(extents: &[([usize; 3], Affine3)]) -> ViewFuseResult<BoundingBox> {
    let mut iter = extents.iter();
    let (dims, model) = iter.next().ok_or(ViewFuseError::EmptyViewSet)?;
    let mut acc = RealBounds::from_transformed_extent(*dims, model);
    for (dims, model) in iter {
        let b = RealBounds::from_transformed_extent(*dims, model);
        for d in 0..3 {
            acc.min[d] = acc.min[d].min(b.min[d]);
            acc.max[d] = acc.max[d].max(b.max[d]);
        }
    }
    acc.enclosing_box()
}

/// Integer box covered by every transformed view extent.
///
/// The shared region is shrunk inwards to integer coordinates; an empty
/// overlap is reported as `EmptyIntersection`.
pub fn intersection_bounding_box(
    extents: &[([usize; 3], Affine3)],
) -> ViewFuseResult<BoundingBox> {
    let mut iter = extents.iter();
    let (dims, model) = iter.next().ok_or(ViewFuseError::EmptyViewSet)?;
    let mut acc = RealBounds::from_transformed_extent(*dims, model);
    for (dims, model) in iter {
        let b = RealBounds::from_transformed_extent(*dims, model);
        for d in 0..3 {
            acc.min[d] = acc.min[d].max(b.min[d]);
            acc.max[d] = acc.max[d].min(b.max[d]);
        }
    }
    let min = acc.min.map(|v| v.ceil() as i64);
    let max = acc.max.map(|v| v.floor() as i64);
    BoundingBox::new(min, max).map_err(|_| ViewFuseError::EmptyIntersection)
}

#[cfg(test)]
mod tests {
    use super::{intersection_bounding_box, union_bounding_box};
    use crate::transform::Affine3;
    use crate::util::ViewFuseError;

    #[test]
    fn union_covers_all_views() {
        let extents = [
            ([10, 10, 5], Affine3::identity()),
            ([10, 10, 5], Affine3::translation([6.5, -3.0, 2.0])),
        ];
        let bbox = union_bounding_box(&extents).unwrap();
        assert_eq!(bbox.min(), [0, -3, 0]);
        assert_eq!(bbox.max(), [16, 9, 6]);
    }

    #[test]
    fn intersection_shrinks_to_shared_region() {
        let extents = [
            ([10, 10, 5], Affine3::identity()),
            ([10, 10, 5], Affine3::translation([6.5, -3.0, 2.0])),
        ];
        let bbox = intersection_bounding_box(&extents).unwrap();
        assert_eq!(bbox.min(), [7, 0, 2]);
        assert_eq!(bbox.max(), [9, 6, 4]);

        let apart = [
            ([4, 4, 1], Affine3::identity()),
            ([4, 4, 1], Affine3::translation([100.0, 0.0, 0.0])),
        ];
        assert_eq!(
            intersection_bounding_box(&apart).err().unwrap(),
            ViewFuseError::EmptyIntersection
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            union_bounding_box(&[]).err().unwrap(),
            ViewFuseError::EmptyViewSet
        );
    }
}
