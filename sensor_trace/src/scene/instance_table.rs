/// InstanceTable - per-instance model, transform and enabled flag
///
/// Parallel arrays indexed by instance position. The four arrays always have
/// the same length. Every successful mutation bumps the generation, which
/// is how the acceleration manager detects a stale index. Between index
/// builds the table also records which instances moved and whether the set
/// of traceable instances may have changed, so a transform-only update can
/// be refitted instead of rebuilt.

use bitflags::bitflags;
use glam::Affine3A;
use rustc_hash::FxHashSet;
use crate::error::{Error, Result};
use crate::geometry::ModelKey;

bitflags! {
    /// Per-instance state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstanceFlags: u32 {
        /// Instance takes part in every query
        const ENABLED = 1 << 0;
    }
}

impl InstanceFlags {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::ENABLED } else { Self::empty() }
    }
}

/// The scene's instances, in host order
#[derive(Debug, Default)]
pub struct InstanceTable {
    models: Vec<ModelKey>,
    transforms: Vec<Affine3A>,
    flags: Vec<InstanceFlags>,
    generation: u64,
    /// Instances whose transform changed since the last index build
    dirty: FxHashSet<usize>,
    /// Instances were replaced or enabled flags rewritten since the last
    /// index build
    topology_changed: bool,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every instance
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the three arrays differ in length (table unchanged)
    pub fn replace(
        &mut self,
        models: Vec<ModelKey>,
        transforms: Vec<Affine3A>,
        enabled: &[bool],
    ) -> Result<()> {
        if transforms.len() != models.len() || enabled.len() != models.len() {
            crate::engine_bail!("sensortrace::InstanceTable", SizeMismatch,
                "{} models, {} transforms, {} enabled flags",
                models.len(), transforms.len(), enabled.len());
        }

        self.models = models;
        self.transforms = transforms;
        self.flags = enabled.iter().copied().map(InstanceFlags::from_enabled).collect();
        self.dirty.clear();
        self.topology_changed = true;
        self.generation += 1;
        Ok(())
    }

    /// Overwrite the transforms of the listed instances
    ///
    /// A repeated index takes the last value.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the arrays differ in length, `IndexOutOfRange` if
    /// any index is past the end. Nothing is written on error.
    pub fn update_transforms(&mut self, indices: &[usize], transforms: &[Affine3A]) -> Result<()> {
        self.check_update("transform", indices, transforms.len())?;
        for (&index, transform) in indices.iter().zip(transforms) {
            self.transforms[index] = *transform;
            self.dirty.insert(index);
        }
        self.generation += 1;
        Ok(())
    }

    /// Overwrite the enabled flag of the listed instances
    ///
    /// Same contract as `update_transforms`.
    pub fn update_enabled(&mut self, indices: &[usize], enabled: &[bool]) -> Result<()> {
        self.check_update("enabled", indices, enabled.len())?;
        for (&index, &on) in indices.iter().zip(enabled) {
            self.flags[index].set(InstanceFlags::ENABLED, on);
        }
        self.topology_changed = true;
        self.generation += 1;
        Ok(())
    }

    fn check_update(&self, what: &str, indices: &[usize], values: usize) -> Result<()> {
        if indices.len() != values {
            crate::engine_bail!("sensortrace::InstanceTable", SizeMismatch,
                "{} indices but {} {} values", indices.len(), values, what);
        }
        if let Some(&index) = indices.iter().find(|&&index| index >= self.len()) {
            crate::engine_error!("sensortrace::InstanceTable",
                "{} update index {} out of range (count {})", what, index, self.len());
            return Err(Error::IndexOutOfRange { index: index as i64, count: self.len() });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model(&self, index: usize) -> Option<ModelKey> {
        self.models.get(index).copied()
    }

    pub fn transform(&self, index: usize) -> Option<&Affine3A> {
        self.transforms.get(index)
    }

    pub fn flags(&self, index: usize) -> Option<InstanceFlags> {
        self.flags.get(index).copied()
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.flags(index).is_some_and(|flags| flags.contains(InstanceFlags::ENABLED))
    }

    pub fn transforms(&self) -> &[Affine3A] {
        &self.transforms
    }

    pub fn enabled_count(&self) -> usize {
        self.flags.iter().filter(|f| f.contains(InstanceFlags::ENABLED)).count()
    }

    /// Enabled instances in table order: `(index, model, transform)`
    pub fn iter_enabled(&self) -> impl Iterator<Item = (usize, ModelKey, &Affine3A)> + '_ {
        self.models
            .iter()
            .zip(&self.transforms)
            .zip(&self.flags)
            .enumerate()
            .filter(|(_, (_, flags))| flags.contains(InstanceFlags::ENABLED))
            .map(|(index, ((model, transform), _))| (index, *model, transform))
    }

    /// Incremented by every successful mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Instances moved since the last index build
    pub fn dirty(&self) -> &FxHashSet<usize> {
        &self.dirty
    }

    /// Whether the next index must be rebuilt rather than refitted
    pub fn topology_changed(&self) -> bool {
        self.topology_changed
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
        self.topology_changed = false;
    }
}

#[cfg(test)]
#[path = "instance_table_tests.rs"]
mod tests;
