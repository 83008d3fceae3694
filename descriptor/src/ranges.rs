use std::ops::{Add, AddAssign};

use prism_shader::{reflect::ResourceCategory, DescriptorLayoutMap};

use crate::layout::{DescriptorPoolSize, DescriptorSetLayoutBinding, DescriptorType};

const POOL_TYPES_COUNT: usize = 6;

const POOL_TYPES: [DescriptorType; POOL_TYPES_COUNT] = [
    DescriptorType::UniformBuffer,
    DescriptorType::UniformBufferDynamic,
    DescriptorType::StorageBuffer,
    DescriptorType::StorageBufferDynamic,
    DescriptorType::CombinedImageSampler,
    DescriptorType::StorageImage,
];

/// Pool-size counters for the descriptors of a shader model.
///
/// Every counter starts at 1 so that no pool size is ever zero.
/// Buffers are counted for both the plain and the dynamic type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolSizes {
    counts: [u32; POOL_TYPES_COUNT],
}

impl Default for PoolSizes {
    fn default() -> Self {
        PoolSizes::baseline()
    }
}

impl PoolSizes {
    /// Counters before anything is counted.
    pub fn baseline() -> Self {
        PoolSizes {
            counts: [1; POOL_TYPES_COUNT],
        }
    }

    /// Count the descriptors of every resource in the map.
    pub fn from_layout_map(map: &DescriptorLayoutMap) -> Self {
        let mut sizes = Self::baseline();
        for (_, resource) in map.iter() {
            if let Some(category) = resource.category() {
                sizes.count(category, 1);
            }
        }
        sizes
    }

    fn index(ty: DescriptorType) -> Option<usize> {
        POOL_TYPES.iter().position(|&t| t == ty)
    }

    /// Count `count` descriptors of the category.
    pub fn count(&mut self, category: ResourceCategory, count: u32) {
        let types: &[DescriptorType] = match category {
            ResourceCategory::UniformBuffer => &[
                DescriptorType::UniformBuffer,
                DescriptorType::UniformBufferDynamic,
            ],
            ResourceCategory::StorageBuffer => &[
                DescriptorType::StorageBuffer,
                DescriptorType::StorageBufferDynamic,
            ],
            ResourceCategory::SampledImage => &[DescriptorType::CombinedImageSampler],
            ResourceCategory::StorageImage => &[DescriptorType::StorageImage],
        };
        for &ty in types {
            if let Some(index) = Self::index(ty) {
                self.counts[index] += count;
            }
        }
    }

    /// Counter of the descriptor type. Zero for types that aren't counted.
    pub fn get(&self, ty: DescriptorType) -> u32 {
        Self::index(ty).map_or(0, |index| self.counts[index])
    }

    /// Sum of all counters.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Counters as pool sizes.
    pub fn iter(&self) -> impl Iterator<Item = DescriptorPoolSize> + '_ {
        POOL_TYPES
            .iter()
            .zip(self.counts.iter())
            .map(|(&ty, &count)| DescriptorPoolSize { ty, count })
    }

    /// Pool sizes with the descriptors of extra layouts added.
    /// Types outside the counters get entries of their own.
    pub fn with_bindings<'a>(
        &self,
        bindings: impl IntoIterator<Item = &'a DescriptorSetLayoutBinding>,
    ) -> Vec<DescriptorPoolSize> {
        let mut sizes: Vec<DescriptorPoolSize> = self.iter().collect();
        for binding in bindings {
            match sizes.iter_mut().find(|size| size.ty == binding.ty) {
                Some(size) => size.count += binding.count,
                None => sizes.push(DescriptorPoolSize {
                    ty: binding.ty,
                    count: binding.count,
                }),
            }
        }
        sizes
    }
}

impl Add for PoolSizes {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for PoolSizes {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..POOL_TYPES_COUNT {
            self.counts[i] += rhs.counts[i];
        }
    }
}
