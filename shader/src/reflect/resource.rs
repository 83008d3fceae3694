use prism_core::{ShaderStage, ShaderStageFlags};

use super::types::SpvType;

/// Kind of descriptor a resource is bound through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKind {
    /// Uniform buffer.
    UniformBuffer,
    /// Storage buffer.
    StorageBuffer,
    /// Sampled or storage image. The image type tells which.
    Image,
}

/// Category a descriptor resource is counted in for pool sizing and limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceCategory {
    /// Uniform buffer.
    UniformBuffer,
    /// Storage buffer.
    StorageBuffer,
    /// Sampled image, including combined image-samplers.
    SampledImage,
    /// Storage image.
    StorageImage,
}

/// How a resource is bound to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum SpvGroup {
    /// Vertex input attribute.
    InputAttribute {
        /// Attribute location.
        location: u32,
    },

    /// Push constant block of one stage.
    PushConstant {
        /// Declaring stage.
        stage: ShaderStage,
    },

    /// Descriptor in a descriptor set.
    Descriptor {
        /// Set index.
        set: u32,
        /// Binding index inside the set.
        binding: u32,
        /// Stages that access the descriptor.
        stage_flags: ShaderStageFlags,
        /// Descriptor kind.
        kind: DescriptorKind,
    },
}

/// Shader resource reflected from one or more stages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct SpvResource {
    /// Variable name.
    pub name: String,
    /// Binding group.
    pub group: SpvGroup,
    /// Type tree.
    pub ty: SpvType,
}

impl SpvResource {
    /// Compare with `other` ignoring the stage flags of descriptor groups.
    pub fn structurally_eq(&self, other: &SpvResource) -> bool {
        if self.name != other.name || self.ty != other.ty {
            return false;
        }

        match (&self.group, &other.group) {
            (
                SpvGroup::Descriptor {
                    set: lset,
                    binding: lbinding,
                    kind: lkind,
                    ..
                },
                SpvGroup::Descriptor {
                    set: rset,
                    binding: rbinding,
                    kind: rkind,
                    ..
                },
            ) => lset == rset && lbinding == rbinding && lkind == rkind,
            (lhs, rhs) => lhs == rhs,
        }
    }

    /// `(set, binding)` key of a descriptor resource.
    pub fn descriptor_key(&self) -> Option<(u32, u32)> {
        match self.group {
            SpvGroup::Descriptor { set, binding, .. } => Some((set, binding)),
            _ => None,
        }
    }

    /// Stage flags of a descriptor resource.
    pub fn stage_flags(&self) -> ShaderStageFlags {
        match self.group {
            SpvGroup::Descriptor { stage_flags, .. } => stage_flags,
            SpvGroup::PushConstant { stage } => stage.into(),
            SpvGroup::InputAttribute { .. } => ShaderStageFlags::VERTEX,
        }
    }

    /// Pool category of a descriptor resource.
    pub fn category(&self) -> Option<ResourceCategory> {
        match self.group {
            SpvGroup::Descriptor {
                kind: DescriptorKind::UniformBuffer,
                ..
            } => Some(ResourceCategory::UniformBuffer),
            SpvGroup::Descriptor {
                kind: DescriptorKind::StorageBuffer,
                ..
            } => Some(ResourceCategory::StorageBuffer),
            SpvGroup::Descriptor {
                kind: DescriptorKind::Image,
                ..
            } => match self.ty.as_image() {
                Some(image) if !image.sampled => Some(ResourceCategory::StorageImage),
                _ => Some(ResourceCategory::SampledImage),
            },
            _ => None,
        }
    }
}

/// Non-builtin stage input or output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceVariable {
    /// Variable name.
    pub name: String,
    /// Interface location.
    pub location: u32,
    /// Type tree.
    pub ty: SpvType,
}
