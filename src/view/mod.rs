//! View identity and per-view inputs.

use crate::raster::Raster;
use std::fmt;

mod registration;

pub use registration::{Registration, RegistrationProvider, RegistrationStore};

/// Identifier of one acquired view.
///
/// Views are ordered lexicographically by `(timepoint, setup)`; this order
/// decides precedence for order-sensitive fusion policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ViewId {
    /// Acquisition time point.
    pub timepoint: u32,
    /// Setup (angle/channel/tile combination) index.
    pub setup: u32,
}

impl ViewId {
    /// Creates a view id.
    pub const fn new(timepoint: u32, setup: u32) -> Self {
        Self { timepoint, setup }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tp {} setup {}", self.timepoint, self.setup)
    }
}

/// One input view: an id, a borrowed raster and its metadata.
#[derive(Clone, Copy)]
pub struct View<'a> {
    /// View identifier.
    pub id: ViewId,
    /// Raster accessor, borrowed for the lifetime of the fusion.
    pub raster: &'a dyn Raster,
    /// Physical voxel size along x, y and z.
    pub voxel_size: [f64; 3],
    /// Views declared missing are skipped before fusion.
    pub missing: bool,
}

impl<'a> View<'a> {
    /// Creates a present view with unit voxel size.
    pub fn new(id: ViewId, raster: &'a dyn Raster) -> Self {
        Self {
            id,
            raster,
            voxel_size: [1.0; 3],
            missing: false,
        }
    }

    /// Sets the physical voxel size.
    pub fn with_voxel_size(mut self, voxel_size: [f64; 3]) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    /// Marks the view as missing.
    pub fn with_missing(mut self, missing: bool) -> Self {
        self.missing = missing;
        self
    }

    /// Returns the raster extent `[width, height, depth]`.
    pub fn dims(&self) -> [usize; 3] {
        self.raster.dims()
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("dims", &self.raster.dims())
            .field("voxel_size", &self.voxel_size)
            .field("missing", &self.missing)
            .finish()
    }
}
