use crate::fusion::FusedImage;
use crate::util::{ViewFuseError, ViewFuseResult};
use std::sync::OnceLock;

/// Cell cache over a [`FusedImage`].
///
/// The output is split into a grid of cells; a cell is evaluated the first
/// time any of its pixels is read and kept afterwards. Concurrent readers of
/// the same cell wait for a single evaluation.
#[derive(Debug)]
pub struct CachedImage<'i, 'a> {
    image: &'i FusedImage<'a>,
    cell: [usize; 3],
    grid: [usize; 3],
    cells: Vec<OnceLock<Vec<f32>>>,
}

impl<'i, 'a> CachedImage<'i, 'a> {
    /// Wraps `image` with cells of size `cell` (clipped at the border).
    pub fn new(image: &'i FusedImage<'a>, cell: [usize; 3]) -> ViewFuseResult<Self> {
        if cell.contains(&0) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "cell dimensions must be > 0",
            });
        }
        let dims = image.dims();
        let grid = [0, 1, 2].map(|d| dims[d].div_ceil(cell[d]));
        let count = grid[0] * grid[1] * grid[2];
        let cells = (0..count).map(|_| OnceLock::new()).collect();
        Ok(Self {
            image,
            cell,
            grid,
            cells,
        })
    }

    /// The wrapped image.
    pub fn image(&self) -> &FusedImage<'a> {
        self.image
    }

    /// Cell size.
    pub fn cell_dims(&self) -> [usize; 3] {
        self.cell
    }

    /// Number of cells evaluated so far.
    pub fn materialized_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.get().is_some()).count()
    }

    /// Returns the fused value at a zero-min output pixel.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        let dims = self.image.dims();
        if x >= dims[0] || y >= dims[1] || z >= dims[2] {
            return None;
        }
        let pos = [x, y, z];
        let c = [0, 1, 2].map(|d| pos[d] / self.cell[d]);
        let idx = (c[2] * self.grid[1] + c[1]) * self.grid[0] + c[0];
        let (origin, extent) = self.cell_box(c);
        let values = self.cells[idx].get_or_init(|| self.fill(origin, extent));
        let local = [0, 1, 2].map(|d| pos[d] - origin[d]);
        values
            .get((local[2] * extent[1] + local[1]) * extent[0] + local[0])
            .copied()
    }

    fn cell_box(&self, c: [usize; 3]) -> ([usize; 3], [usize; 3]) {
        let dims = self.image.dims();
        let origin = [0, 1, 2].map(|d| c[d] * self.cell[d]);
        let extent = [0, 1, 2].map(|d| self.cell[d].min(dims[d] - origin[d]));
        (origin, extent)
    }

    fn fill(&self, origin: [usize; 3], extent: [usize; 3]) -> Vec<f32> {
        let mut values = Vec::with_capacity(extent[0] * extent[1] * extent[2]);
        for z in origin[2]..origin[2] + extent[2] {
            for y in origin[1]..origin[1] + extent[1] {
                for x in origin[0]..origin[0] + extent[0] {
                    values.push(self.image.value_at([x as f64, y as f64, z as f64]));
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::CachedImage;
    use crate::bbox::BoundingBox;
    use crate::fusion::Fusion;
    use crate::raster::OwnedVolume;
    use crate::transform::Affine3;
    use crate::view::{View, ViewId};

    #[test]
    fn cells_fill_on_first_read() {
        let data: Vec<f32> = (0..10 * 7 * 3).map(|v| v as f32).collect();
        let vol = OwnedVolume::new(data, [10, 7, 3]).unwrap();
        let views = [(View::new(ViewId::new(0, 0), &vol), Affine3::identity())];
        let bbox = BoundingBox::from_dims([10, 7, 3]).unwrap();
        let image = Fusion::new().fuse_snapshot(&views, &bbox).unwrap();
        let cached = CachedImage::new(&image, [4, 4, 2]).unwrap();
        assert_eq!(cached.materialized_cells(), 0);

        assert_eq!(cached.get(9, 6, 2), image.get(9, 6, 2));
        assert_eq!(cached.materialized_cells(), 1);
        assert_eq!(cached.get(8, 5, 2), Some(vol.get(8, 5, 2).copied().unwrap()));
        assert_eq!(cached.materialized_cells(), 1);

        for z in 0..3 {
            for y in 0..7 {
                for x in 0..10 {
                    assert_eq!(cached.get(x, y, z), image.get(x, y, z));
                }
            }
        }
        assert_eq!(cached.materialized_cells(), 3 * 2 * 2);
        assert_eq!(cached.get(10, 0, 0), None);
    }

    #[test]
    fn zero_cell_is_rejected() {
        let vol = OwnedVolume::new(vec![0u8; 4], [2, 2, 1]).unwrap();
        let views = [(View::new(ViewId::new(0, 0), &vol), Affine3::identity())];
        let bbox = BoundingBox::from_dims([2, 2, 1]).unwrap();
        let image = Fusion::new().fuse_snapshot(&views, &bbox).unwrap();
        assert!(CachedImage::new(&image, [0, 1, 1]).is_err());
    }
}
