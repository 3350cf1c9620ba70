use crate::raster::{Raster, Sample, VolumeView};
use crate::util::{ViewFuseError, ViewFuseResult};

/// Owned contiguous volume buffer (`x` fastest, then `y`, then `z`).
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedVolume<T = f32> {
    data: Vec<T>,
    dims: [usize; 3],
}

impl<T> OwnedVolume<T> {
    /// Wraps a contiguous buffer whose length equals the voxel count.
    pub fn new(data: Vec<T>, dims: [usize; 3]) -> ViewFuseResult<Self> {
        let needed = voxel_count(dims)?;
        if data.len() < needed {
            return Err(ViewFuseError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(ViewFuseError::BufferLengthMismatch {
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self { data, dims })
    }

    /// Returns `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Returns the number of voxels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the volume holds no voxels (never for a valid volume).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the contiguous voxel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the contiguous voxel buffer mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the volume and returns its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns the voxel at `(x, y, z)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        let [w, h, d] = self.dims;
        if x >= w || y >= h || z >= d {
            return None;
        }
        self.data.get((z * h + y) * w + x)
    }

    /// Returns a borrowed view of the volume.
    pub fn view(&self) -> VolumeView<'_, T> {
        let [w, h, _] = self.dims;
        VolumeView {
            data: &self.data,
            dims: self.dims,
            row_stride: w,
            slice_stride: w * h,
        }
    }
}

impl<T: Copy + Default> OwnedVolume<T> {
    /// Allocates a volume filled with `T::default()`.
    pub fn zeros(dims: [usize; 3]) -> ViewFuseResult<Self> {
        let needed = voxel_count(dims)?;
        Ok(Self {
            data: vec![T::default(); needed],
            dims,
        })
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: VolumeView<'_, T>) -> ViewFuseResult<Self> {
        let dims = view.dims();
        let mut data = Vec::with_capacity(voxel_count(dims)?);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                let row = view.row(y, z).ok_or(ViewFuseError::BufferTooSmall {
                    needed: view.slice_stride() * z + view.row_stride() * y + dims[0],
                    got: view.as_slice().len(),
                })?;
                data.extend_from_slice(row);
            }
        }
        Self::new(data, dims)
    }
}

impl OwnedVolume<f32> {
    /// Copies any raster into an `f32` volume.
    pub fn from_raster(raster: &dyn Raster) -> ViewFuseResult<Self> {
        let dims = raster.dims();
        let mut data = Vec::with_capacity(voxel_count(dims)?);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    data.push(raster.value([x, y, z]));
                }
            }
        }
        Self::new(data, dims)
    }
}

impl<T: Sample> Raster for OwnedVolume<T> {
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    fn value(&self, pos: [usize; 3]) -> f32 {
        let [w, h, _] = self.dims;
        self.data[(pos[2] * h + pos[1]) * w + pos[0]].to_f32()
    }
}

pub(crate) fn voxel_count(dims: [usize; 3]) -> ViewFuseResult<usize> {
    if dims.contains(&0) {
        return Err(ViewFuseError::InvalidDimensions { dims });
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]))
        .ok_or(ViewFuseError::InvalidDimensions { dims })
}
