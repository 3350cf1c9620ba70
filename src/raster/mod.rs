//! Raster accessors and volume buffers.
//!
//! `Raster` is the read-only contract the fusion engine needs from an input
//! view: a fixed zero-min extent and a sample at any integer coordinate inside
//! it. `VolumeView` is a borrowed 3D view into a 1D buffer with explicit row
//! and slice strides; `OwnedVolume` is its contiguous owned counterpart.
//! Two-dimensional images are volumes with `depth == 1`.

use crate::util::{ViewFuseError, ViewFuseResult};

pub mod gauss;
#[cfg(feature = "image-io")]
pub mod io;
mod owned;

pub use owned::OwnedVolume;

/// Numeric sample types that can be read as `f32`.
pub trait Sample: Copy + Send + Sync + 'static {
    /// Converts the sample to `f32`.
    fn to_f32(self) -> f32;
}

macro_rules! impl_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }
            }
        )*
    };
}

impl_sample!(u8, u16, i16, u32, f32, f64);

/// Random-access, read-only voxel source with a fixed zero-min extent.
///
/// Implementations must allow concurrent reads from many threads.
pub trait Raster: Send + Sync {
    /// Returns `[width, height, depth]`.
    fn dims(&self) -> [usize; 3];

    /// Returns the sample at `pos`; `pos` is inside `dims()`.
    fn value(&self, pos: [usize; 3]) -> f32;
}

/// Returns which axes have a single sample.
pub fn singleton_axes(dims: [usize; 3]) -> [bool; 3] {
    [dims[0] == 1, dims[1] == 1, dims[2] == 1]
}

/// Number of axes with more than one sample.
pub fn effective_rank(dims: [usize; 3]) -> usize {
    dims.iter().filter(|&&n| n > 1).count()
}

/// Borrowed 3D volume view with explicit strides.
#[derive(Copy, Clone, Debug)]
pub struct VolumeView<'a, T> {
    data: &'a [T],
    dims: [usize; 3],
    row_stride: usize,
    slice_stride: usize,
}

impl<'a, T> VolumeView<'a, T> {
    /// Creates a contiguous view (`x` fastest, then `y`, then `z`).
    pub fn from_slice(
        data: &'a [T],
        width: usize,
        height: usize,
        depth: usize,
    ) -> ViewFuseResult<Self> {
        let row_stride = width;
        let slice_stride = width
            .checked_mul(height)
            .ok_or(ViewFuseError::InvalidDimensions {
                dims: [width, height, depth],
            })?;
        Self::new(data, [width, height, depth], row_stride, slice_stride)
    }

    /// Creates a view with explicit row and slice strides.
    pub fn new(
        data: &'a [T],
        dims: [usize; 3],
        row_stride: usize,
        slice_stride: usize,
    ) -> ViewFuseResult<Self> {
        let needed = required_len(dims, row_stride, slice_stride)?;
        if data.len() < needed {
            return Err(ViewFuseError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            dims,
            row_stride,
            slice_stride,
        })
    }

    /// Returns the width in voxels.
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    /// Returns the height in voxels.
    pub fn height(&self) -> usize {
        self.dims[1]
    }

    /// Returns the depth in voxels.
    pub fn depth(&self) -> usize {
        self.dims[2]
    }

    /// Returns `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Returns the stride in elements between row starts.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Returns the stride in elements between slice starts.
    pub fn slice_stride(&self) -> usize {
        self.slice_stride
    }

    /// Returns the backing slice including any padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y, z)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&'a T> {
        if x >= self.dims[0] || y >= self.dims[1] || z >= self.dims[2] {
            return None;
        }
        self.data.get(self.index(x, y, z))
    }

    /// Returns a contiguous slice for row `(y, z)` with length `width`.
    pub fn row(&self, y: usize, z: usize) -> Option<&'a [T]> {
        if y >= self.dims[1] || z >= self.dims[2] {
            return None;
        }
        let start = self.index(0, y, z);
        let end = start.checked_add(self.dims[0])?;
        self.data.get(start..end)
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.slice_stride + y * self.row_stride + x
    }
}

impl<T: Sample> Raster for VolumeView<'_, T> {
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    fn value(&self, pos: [usize; 3]) -> f32 {
        self.data[self.index(pos[0], pos[1], pos[2])].to_f32()
    }
}

fn required_len(dims: [usize; 3], row_stride: usize, slice_stride: usize) -> ViewFuseResult<usize> {
    let [width, height, depth] = dims;
    if width == 0 || height == 0 || depth == 0 {
        return Err(ViewFuseError::InvalidDimensions { dims });
    }
    let slice_needed = (height - 1)
        .checked_mul(row_stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ViewFuseError::InvalidDimensions { dims })?;
    if row_stride < width || (depth > 1 && slice_stride < slice_needed) {
        return Err(ViewFuseError::InvalidStrides {
            dims,
            row_stride,
            slice_stride,
        });
    }
    (depth - 1)
        .checked_mul(slice_stride)
        .and_then(|v| v.checked_add(slice_needed))
        .ok_or(ViewFuseError::InvalidDimensions { dims })
}

#[cfg(test)]
mod tests {
    use super::{effective_rank, singleton_axes, Raster, VolumeView};
    use crate::util::ViewFuseError;

    #[test]
    fn strided_view_reads_expected_voxels() {
        // 2x2x2 volume with one padding element per row and two per slice.
        let data: Vec<u16> = vec![1, 2, 0, 3, 4, 0, 9, 9, 5, 6, 0, 7, 8, 0];
        let view = VolumeView::new(&data, [2, 2, 2], 3, 8).unwrap();
        assert_eq!(view.value([0, 0, 0]), 1.0);
        assert_eq!(view.value([1, 1, 0]), 4.0);
        assert_eq!(view.value([0, 0, 1]), 5.0);
        assert_eq!(view.value([1, 1, 1]), 8.0);
        assert_eq!(view.row(1, 1).unwrap(), &[7, 8]);
        assert!(view.get(2, 0, 0).is_none());
    }

    #[test]
    fn rejects_slice_stride_smaller_than_slice() {
        let data = [0u8; 32];
        let err = VolumeView::new(&data, [4, 2, 2], 4, 7).err().unwrap();
        assert_eq!(
            err,
            ViewFuseError::InvalidStrides {
                dims: [4, 2, 2],
                row_stride: 4,
                slice_stride: 7,
            }
        );
    }

    #[test]
    fn rank_ignores_singleton_axes() {
        assert_eq!(effective_rank([10, 12, 1]), 2);
        assert_eq!(effective_rank([10, 12, 3]), 3);
        assert_eq!(singleton_axes([10, 1, 1]), [false, true, true]);
    }
}
