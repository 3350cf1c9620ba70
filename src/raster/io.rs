//! Convenience helpers for loading and saving slices via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Images are converted to
//! 16-bit grayscale; a single image becomes a volume with `depth == 1`.

use crate::raster::OwnedVolume;
use crate::util::{ViewFuseError, ViewFuseResult};
use std::path::Path;

fn io_err(err: image::ImageError) -> ViewFuseError {
    ViewFuseError::ImageIo {
        reason: err.to_string(),
    }
}

/// Loads one image as a single-slice 16-bit volume.
pub fn load_gray_volume<P: AsRef<Path>>(path: P) -> ViewFuseResult<OwnedVolume<u16>> {
    let img = image::open(path).map_err(io_err)?.to_luma16();
    let dims = [img.width() as usize, img.height() as usize, 1];
    OwnedVolume::new(img.into_raw(), dims)
}

/// Loads equally sized images as consecutive z slices of one volume.
pub fn load_slice_stack<P: AsRef<Path>>(paths: &[P]) -> ViewFuseResult<OwnedVolume<u16>> {
    if paths.is_empty() {
        return Err(ViewFuseError::InvalidDimensions { dims: [0, 0, 0] });
    }
    let mut data = Vec::new();
    let mut plane: Option<[usize; 2]> = None;
    for path in paths {
        let img = image::open(path).map_err(io_err)?.to_luma16();
        let size = [img.width() as usize, img.height() as usize];
        match plane {
            None => plane = Some(size),
            Some(expected) if expected != size => {
                return Err(ViewFuseError::InvalidDimensions {
                    dims: [size[0], size[1], paths.len()],
                });
            }
            Some(_) => {}
        }
        data.extend_from_slice(img.as_raw());
    }
    let [width, height] = plane.unwrap_or([0, 0]);
    OwnedVolume::new(data, [width, height, paths.len()])
}

/// Writes slice `z` of a 16-bit volume as a grayscale image.
pub fn save_slice_u16<P: AsRef<Path>>(
    volume: &OwnedVolume<u16>,
    z: usize,
    path: P,
) -> ViewFuseResult<()> {
    let [width, height, depth] = volume.dims();
    if z >= depth {
        return Err(ViewFuseError::InvalidDimensions {
            dims: volume.dims(),
        });
    }
    let plane = width * height;
    let pixels = volume.data()[z * plane..(z + 1) * plane].to_vec();
    let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
        width as u32,
        height as u32,
        pixels,
    )
    .ok_or(ViewFuseError::BufferTooSmall {
        needed: plane,
        got: 0,
    })?;
    img.save(path).map_err(io_err)
}
