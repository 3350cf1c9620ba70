//! Python bindings for the viewfuse multi-view fusion library.
//!
//! Volumes are float32 numpy arrays shaped `(depth, height, width)`;
//! transforms are row-major 3x4 affines mapping view pixels `(x, y, z)` into
//! global coordinates.

use numpy::{PyArray1, PyArray3, PyArrayMethods, PyReadonlyArray3, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use viewfuse::{
    materialize, Affine3, BlendingParams, BoundingBox, Fusion, FusionConfig, FusionPolicy,
    Interpolation, ScheduleConfig, View, ViewFuseError, ViewId, VolumeView, WeightSpec,
};

/// Convert a ViewFuseError to a Python exception.
fn to_py_err(err: ViewFuseError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn parse_policy(policy: &str) -> PyResult<FusionPolicy> {
    match policy.to_lowercase().as_str() {
        "avg" => Ok(FusionPolicy::Avg),
        "max" => Ok(FusionPolicy::Max),
        "first_wins" => Ok(FusionPolicy::FirstWins),
        _ => Err(PyValueError::new_err(
            "policy must be 'avg', 'max' or 'first_wins'",
        )),
    }
}

fn parse_interpolation(interpolation: &str) -> PyResult<Interpolation> {
    match interpolation.to_lowercase().as_str() {
        "linear" => Ok(Interpolation::Linear),
        "nearest" | "nearest_neighbor" => Ok(Interpolation::NearestNeighbor),
        _ => Err(PyValueError::new_err(
            "interpolation must be 'linear' or 'nearest'",
        )),
    }
}

/// Borrow numpy volumes as rasters, checking the transform count.
fn volume_views<'a>(
    volumes: &'a [PyReadonlyArray3<'_, f32>],
    transforms: &[[f64; 12]],
) -> PyResult<Vec<VolumeView<'a, f32>>> {
    if volumes.len() != transforms.len() {
        return Err(PyValueError::new_err(
            "volumes and transforms must have the same length",
        ));
    }
    volumes
        .iter()
        .map(|array| {
            let shape = array.shape();
            let (depth, height, width) = (shape[0], shape[1], shape[2]);
            let data = array.as_slice()?;
            VolumeView::from_slice(data, width, height, depth).map_err(to_py_err)
        })
        .collect()
}

fn snapshot<'a>(
    rasters: &'a [VolumeView<'a, f32>],
    transforms: &[[f64; 12]],
) -> Vec<(View<'a>, Affine3)> {
    rasters
        .iter()
        .zip(transforms)
        .enumerate()
        .map(|(setup, (raster, t))| {
            (
                View::new(ViewId::new(0, setup as u32), raster),
                Affine3::from_row_major(*t),
            )
        })
        .collect()
}

/// Fuse registered volumes into one float32 volume.
///
/// Args:
///     volumes: list of 3D float32 arrays (depth x height x width)
///     transforms: list of 12-element row-major affines, one per volume
///     bbox_min: inclusive (x, y, z) minimum; estimated when omitted
///     bbox_max: inclusive (x, y, z) maximum; estimated when omitted
///     policy: "avg", "max" or "first_wins" (default: "avg")
///     interpolation: "linear" or "nearest" (default: "linear")
///     blending_range: per-axis blending ramp length; no blending when omitted
///     blending_border: per-axis blending border (default: 0)
///     downsampling: output downsampling factor (default: none)
///     threads: worker threads, 0 for all cores (default: 0)
///
/// Returns:
///     float32 array shaped (depth, height, width) of the output box
#[pyfunction]
#[pyo3(signature = (
    volumes,
    transforms,
    bbox_min = None,
    bbox_max = None,
    policy = "avg",
    interpolation = "linear",
    blending_range = None,
    blending_border = None,
    downsampling = None,
    threads = 0
))]
#[allow(clippy::too_many_arguments)]
fn fuse<'py>(
    py: Python<'py>,
    volumes: Vec<PyReadonlyArray3<'py, f32>>,
    transforms: Vec<[f64; 12]>,
    bbox_min: Option<[i64; 3]>,
    bbox_max: Option<[i64; 3]>,
    policy: &str,
    interpolation: &str,
    blending_range: Option<[f64; 3]>,
    blending_border: Option<[f64; 3]>,
    downsampling: Option<f64>,
    threads: usize,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let mut weights = Vec::new();
    if let Some(range) = blending_range {
        weights.push(WeightSpec::Blending(BlendingParams {
            border: blending_border.unwrap_or([0.0; 3]),
            range,
        }));
    }
    let cfg = FusionConfig {
        policy: parse_policy(policy)?,
        interpolation: parse_interpolation(interpolation)?,
        weights,
        downsampling: downsampling.unwrap_or(f64::NAN),
        ..FusionConfig::default()
    };
    cfg.validate().map_err(to_py_err)?;
    let fusion = Fusion::new().with_config(cfg);

    let rasters = volume_views(&volumes, &transforms)?;
    let views = snapshot(&rasters, &transforms);

    let bbox = match (bbox_min, bbox_max) {
        (Some(min), Some(max)) => BoundingBox::new(min, max).map_err(to_py_err)?,
        (None, None) => {
            let extents: Vec<_> = views.iter().map(|(v, m)| (v.dims(), *m)).collect();
            viewfuse::lowlevel::union_bounding_box(&extents).map_err(to_py_err)?
        }
        _ => {
            return Err(PyValueError::new_err(
                "bbox_min and bbox_max must be given together",
            ))
        }
    };

    let image = fusion.fuse_snapshot(&views, &bbox).map_err(to_py_err)?;
    let fused = materialize(&image, &ScheduleConfig::with_threads(threads)).map_err(to_py_err)?;
    let [width, height, depth] = fused.dims();
    PyArray1::from_vec(py, fused.into_vec()).reshape([depth, height, width])
}

/// Estimate the global bounding box covering all volumes.
///
/// Args:
///     volumes: list of 3D float32 arrays (depth x height x width)
///     transforms: list of 12-element row-major affines, one per volume
///
/// Returns:
///     tuple (min, max) of inclusive (x, y, z) integer corners
#[pyfunction]
fn estimate_bounding_box(
    volumes: Vec<PyReadonlyArray3<'_, f32>>,
    transforms: Vec<[f64; 12]>,
) -> PyResult<([i64; 3], [i64; 3])> {
    let rasters = volume_views(&volumes, &transforms)?;
    let extents: Vec<_> = snapshot(&rasters, &transforms)
        .iter()
        .map(|(v, m)| (v.dims(), *m))
        .collect();
    let bbox = viewfuse::lowlevel::union_bounding_box(&extents).map_err(to_py_err)?;
    Ok((bbox.min(), bbox.max()))
}

/// Python module for viewfuse.
#[pymodule]
fn _viewfuse(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(fuse, m)?)?;
    m.add_function(wrap_pyfunction!(estimate_bounding_box, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
