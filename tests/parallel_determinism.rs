#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use viewfuse::{
    materialize, materialize_into, Affine3, BlendingParams, BoundingBox, Fusion, FusionConfig,
    FusionPolicy, OwnedVolume, Raster, ScheduleConfig, View, ViewFuseError, ViewId, WeightSpec,
};

fn random_volume(dims: [usize; 3], seed: u64) -> OwnedVolume<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..dims[0] * dims[1] * dims[2])
        .map(|_| rng.random_range(0.0f32..1000.0))
        .collect();
    OwnedVolume::new(data, dims).unwrap()
}

fn rotation_z(angle_deg: f64, shift: [f64; 3]) -> Affine3 {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Affine3::from_row_major([
        c, -s, 0.0, shift[0], s, c, 0.0, shift[1], 0.0, 0.0, 1.0, shift[2],
    ])
}

#[test]
fn first_wins_is_identical_for_one_and_four_threads() {
    let volumes: Vec<_> = (0..3).map(|i| random_volume([40, 32, 6], 100 + i)).collect();
    let models = [
        Affine3::identity(),
        rotation_z(12.5, [15.3, -4.7, 0.5]),
        rotation_z(-7.0, [-6.2, 10.1, 1.25]),
    ];
    let views: Vec<_> = volumes
        .iter()
        .zip(models)
        .enumerate()
        .map(|(i, (vol, model))| (View::new(ViewId::new(0, 2 - i as u32), vol), model))
        .collect();
    let extents: Vec<_> = views.iter().map(|(v, m)| (v.dims(), *m)).collect();
    let bbox = viewfuse::lowlevel::union_bounding_box(&extents).unwrap();

    for policy in [FusionPolicy::FirstWins, FusionPolicy::Avg, FusionPolicy::Max] {
        let image = Fusion::new()
            .with_config(FusionConfig {
                policy,
                weights: vec![WeightSpec::Blending(BlendingParams {
                    border: [1.0; 3],
                    range: [6.0; 3],
                })],
                ..FusionConfig::default()
            })
            .fuse_snapshot(&views, &bbox)
            .unwrap();
        let single = materialize(&image, &ScheduleConfig::with_threads(1)).unwrap();
        let multi = materialize(&image, &ScheduleConfig::with_threads(4)).unwrap();
        assert_eq!(single, multi, "{policy:?}");

        let mut buffer = vec![f32::NAN; image.num_pixels()];
        materialize_into(&image, &mut buffer, &ScheduleConfig::with_threads(3)).unwrap();
        assert_eq!(buffer.as_slice(), single.data(), "{policy:?}");
    }
}

#[test]
fn buffer_length_is_checked() {
    let vol = random_volume([4, 4, 1], 1);
    let views = [(View::new(ViewId::new(0, 0), &vol), Affine3::identity())];
    let bbox = BoundingBox::from_dims([4, 4, 1]).unwrap();
    let image = Fusion::new().fuse_snapshot(&views, &bbox).unwrap();
    let mut buffer = vec![0.0f32; 15];
    let err = materialize_into(&image, &mut buffer, &ScheduleConfig::default())
        .err()
        .unwrap();
    assert_eq!(
        err,
        ViewFuseError::BufferLengthMismatch {
            expected: 16,
            got: 15,
        }
    );
}

struct PoisonedRaster {
    dims: [usize; 3],
    poison_x: usize,
}

impl Raster for PoisonedRaster {
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn value(&self, pos: [usize; 3]) -> f32 {
        if pos[0] == self.poison_x {
            panic!("unreadable voxel at {pos:?}");
        }
        1.0
    }
}

#[test]
fn worker_panic_surfaces_as_error() {
    let raster = PoisonedRaster {
        dims: [64, 64, 4],
        poison_x: 63,
    };
    let views = [(View::new(ViewId::new(0, 0), &raster), Affine3::identity())];
    let bbox = BoundingBox::from_dims(raster.dims()).unwrap();
    let image = Fusion::new().fuse_snapshot(&views, &bbox).unwrap();

    let err = materialize(&image, &ScheduleConfig::with_threads(4))
        .err()
        .unwrap();
    match err {
        ViewFuseError::WorkerFailed { reason, .. } => {
            assert!(reason.contains("unreadable voxel"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Reads that avoid the poisoned column still work.
    assert_eq!(image.get(10, 10, 1), Some(1.0));
}
