//! View registrations and the provider interface the engine reads them from.
//!
//! A `Registration` is an ordered list of transforms, outermost first, whose
//! composition (the model) is only recomputed by `update_model`. Refinements
//! made by an alignment step therefore stay invisible to readers until the
//! owner calls `update`, and a fusion call snapshots the models once after
//! that call.

use crate::transform::Affine3;
use crate::view::ViewId;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Source of per-view registration models.
pub trait RegistrationProvider {
    /// Brings every model up to date with its transform list.
    fn update(&self);

    /// Returns a copy of the current model for `view`.
    fn registration(&self, view: ViewId) -> Option<Affine3>;
}

impl RegistrationProvider for BTreeMap<ViewId, Affine3> {
    fn update(&self) {}

    fn registration(&self, view: ViewId) -> Option<Affine3> {
        self.get(&view).copied()
    }
}

/// Ordered transform list and its cached composition.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    transforms: Vec<Affine3>,
    model: Affine3,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            transforms: Vec::new(),
            model: Affine3::identity(),
        }
    }
}

impl Registration {
    /// Creates a registration from transforms listed outermost first.
    pub fn new(transforms: Vec<Affine3>) -> Self {
        let mut reg = Self {
            transforms,
            model: Affine3::identity(),
        };
        reg.update_model();
        reg
    }

    /// Adds a transform applied after all existing ones.
    pub fn preconcatenate(&mut self, transform: Affine3) {
        self.transforms.insert(0, transform);
    }

    /// Adds a transform applied before all existing ones.
    pub fn concatenate(&mut self, transform: Affine3) {
        self.transforms.push(transform);
    }

    /// Recomputes the model from the transform list.
    pub fn update_model(&mut self) {
        self.model = self
            .transforms
            .iter()
            .fold(Affine3::identity(), |acc, t| acc.concatenate(t));
    }

    /// Returns the last computed model.
    pub fn model(&self) -> Affine3 {
        self.model
    }

    /// Returns the transform list, outermost first.
    pub fn transforms(&self) -> &[Affine3] {
        &self.transforms
    }
}

/// Thread-safe registration table that can be refined while fusions run.
#[derive(Debug, Default)]
pub struct RegistrationStore {
    entries: RwLock<BTreeMap<ViewId, Registration>>,
}

impl RegistrationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the registration of `view`.
    pub fn insert(&self, view: ViewId, registration: Registration) {
        self.write().insert(view, registration);
    }

    /// Appends an outermost transform to `view` (visible after `update`).
    ///
    /// Returns `false` when the view is unknown.
    pub fn preconcatenate(&self, view: ViewId, transform: Affine3) -> bool {
        match self.write().get_mut(&view) {
            Some(reg) => {
                reg.preconcatenate(transform);
                true
            }
            None => false,
        }
    }

    /// Returns the number of registered views.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when no view is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ViewId, Registration>> {
        // A panic while holding the lock leaves plain data behind; keep reading it.
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ViewId, Registration>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RegistrationProvider for RegistrationStore {
    fn update(&self) {
        for reg in self.write().values_mut() {
            reg.update_model();
        }
    }

    fn registration(&self, view: ViewId) -> Option<Affine3> {
        self.read().get(&view).map(Registration::model)
    }
}
