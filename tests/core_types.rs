use viewfuse::{Affine3, BoundingBox, OwnedVolume, Raster, ViewFuseError, ViewId, VolumeView};

#[test]
fn volume_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = VolumeView::from_slice(&data, 0, 1, 1).err().unwrap();
    assert_eq!(err, ViewFuseError::InvalidDimensions { dims: [0, 1, 1] });

    let err = VolumeView::from_slice(&data, 2, 2, 0).err().unwrap();
    assert_eq!(err, ViewFuseError::InvalidDimensions { dims: [2, 2, 0] });
}

#[test]
fn volume_view_rejects_invalid_stride() {
    let data = [0u8; 8];

    let err = VolumeView::new(&data, [4, 1, 1], 3, 4).err().unwrap();
    assert_eq!(
        err,
        ViewFuseError::InvalidStrides {
            dims: [4, 1, 1],
            row_stride: 3,
            slice_stride: 4,
        }
    );
}

#[test]
fn volume_view_rejects_short_buffer() {
    let data = [0u16; 11];
    let err = VolumeView::from_slice(&data, 3, 2, 2).err().unwrap();
    assert_eq!(err, ViewFuseError::BufferTooSmall { needed: 12, got: 11 });
}

#[test]
fn owned_volume_checks_length() {
    let err = OwnedVolume::new(vec![0u8; 5], [2, 2, 1]).err().unwrap();
    assert_eq!(
        err,
        ViewFuseError::BufferLengthMismatch {
            expected: 4,
            got: 5,
        }
    );
    let err = OwnedVolume::new(vec![0u8; 3], [2, 2, 1]).err().unwrap();
    assert_eq!(err, ViewFuseError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn owned_volume_roundtrips_through_view() {
    let data: Vec<i16> = (-6..6).collect();
    let owned = OwnedVolume::new(data.clone(), [3, 2, 2]).unwrap();
    let view = owned.view();
    assert_eq!(view.dims(), [3, 2, 2]);
    assert_eq!(view.value([2, 1, 1]), 5.0);
    assert_eq!(view.row(0, 1).unwrap(), &[0, 1, 2]);

    let copy = OwnedVolume::from_view(view).unwrap();
    assert_eq!(copy, owned);
    assert_eq!(copy.into_vec(), data);
}

#[test]
fn bounding_box_fails_fast_on_inverted_axis() {
    let err = BoundingBox::new([0, 0, 5], [10, 10, 4]).err().unwrap();
    assert_eq!(
        err,
        ViewFuseError::InvalidBoundingBox {
            axis: 2,
            min: 5,
            max: 4,
        }
    );
}

#[test]
fn bounding_box_reports_inclusive_extent() {
    let bbox = BoundingBox::new([-3, 5, 2], [10, 20, 2]).unwrap();
    assert_eq!(bbox.dims(), [14, 16, 1]);
    assert_eq!(bbox.num_pixels(), 14 * 16);
    assert_eq!(bbox.rank(), 2);
    assert!(bbox.contains([-3, 20, 2]));
    assert!(!bbox.contains([11, 5, 2]));
}

#[test]
fn singular_transform_is_rejected() {
    let flat = Affine3::scaling([1.0, 0.0, 1.0]);
    assert!(matches!(
        flat.inverse(),
        Err(ViewFuseError::SingularTransform { .. })
    ));
    let broken = Affine3::from_row_major([
        f64::NAN, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
    ]);
    assert!(broken.inverse().is_err());
}

#[test]
fn view_ids_order_by_timepoint_then_setup() {
    let mut ids = vec![ViewId::new(1, 0), ViewId::new(0, 7), ViewId::new(0, 2)];
    ids.sort();
    assert_eq!(ids, vec![ViewId::new(0, 2), ViewId::new(0, 7), ViewId::new(1, 0)]);
    assert_eq!(ViewId::new(3, 4).to_string(), "tp 3 setup 4");
}
