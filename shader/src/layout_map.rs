use std::collections::{btree_map::Entry, BTreeMap};

use prism_core::{ShaderStage, StageMap};
use smallvec::SmallVec;

use crate::reflect::{ReflectError, SpvGroup, SpvResource, StageReflection};

/// Descriptor resources of all stages keyed by `(set, binding)`.
///
/// Iteration is ascending by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorLayoutMap {
    map: BTreeMap<(u32, u32), SpvResource>,
}

impl DescriptorLayoutMap {
    /// Create empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge descriptors of every stage, visiting stages in pipeline order.
    pub fn merge(stages: &StageMap<StageReflection>) -> Result<Self, ReflectError> {
        let mut map = Self::new();
        for (stage, reflection) in stages.iter() {
            for resource in reflection.descriptors() {
                map.insert(resource.clone(), stage)?;
            }
        }

        log::debug!(
            "Merged {} descriptors in {} sets from {} stages",
            map.len(),
            map.set_indices().len(),
            stages.len()
        );
        Ok(map)
    }

    /// Insert descriptor resource declared by `stage`.
    ///
    /// A key declared before must hold a structurally equal resource,
    /// which then gets the stage added to its flags.
    pub fn insert(
        &mut self,
        resource: SpvResource,
        stage: ShaderStage,
    ) -> Result<(), ReflectError> {
        let (set, binding) = match resource.descriptor_key() {
            Some(key) => key,
            None => {
                return Err(ReflectError::General(format!(
                    "'{}' is not a descriptor resource",
                    resource.name
                )))
            }
        };

        match self.map.entry((set, binding)) {
            Entry::Vacant(entry) => {
                entry.insert(resource);
            }
            Entry::Occupied(mut entry) => {
                if !entry.get().structurally_eq(&resource) {
                    return Err(ReflectError::IncompatibleBinding {
                        set,
                        binding,
                        stage,
                    });
                }
                if let SpvGroup::Descriptor { stage_flags, .. } = &mut entry.get_mut().group {
                    *stage_flags |= stage.flag();
                }
                log::trace!(
                    "Set {} binding {} shared with {} shader",
                    set,
                    binding,
                    stage
                );
            }
        }
        Ok(())
    }

    /// Look up resource.
    pub fn get(&self, set: u32, binding: u32) -> Option<&SpvResource> {
        self.map.get(&(set, binding))
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no descriptors.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over descriptors ascending by `(set, binding)`.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &SpvResource)> {
        self.map.iter().map(|(&key, resource)| (key, resource))
    }

    /// Set indices in ascending order.
    pub fn set_indices(&self) -> SmallVec<[u32; 8]> {
        let mut indices = SmallVec::<[u32; 8]>::new();
        for &(set, _) in self.map.keys() {
            if indices.last() != Some(&set) {
                indices.push(set);
            }
        }
        indices
    }

    /// Descriptors grouped by set, ascending by set and binding.
    pub fn sets(&self) -> Vec<(u32, Vec<(u32, &SpvResource)>)> {
        let mut sets: Vec<(u32, Vec<(u32, &SpvResource)>)> = Vec::new();
        for (&(set, binding), resource) in &self.map {
            if sets.last().map_or(true, |(last, _)| *last != set) {
                sets.push((set, Vec::new()));
            }
            if let Some((_, bindings)) = sets.last_mut() {
                bindings.push((binding, resource));
            }
        }
        sets
    }
}
