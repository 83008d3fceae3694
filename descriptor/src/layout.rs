use prism_core::ShaderStageFlags;
use prism_shader::{reflect::ResourceCategory, SpvResource};

use crate::{device::Device, error::DeviceError};

/// Type of the descriptor.
/// Values match `VkDescriptorType`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorType {
    /// Sampler descriptor.
    Sampler = 0,

    /// Image view combined with sampler.
    CombinedImageSampler = 1,

    /// Image view to use with sampler.
    SampledImage = 2,

    /// Image view for per-pixel access.
    StorageImage = 3,

    /// Buffer range with read-only uniform structure.
    UniformBuffer = 6,

    /// Buffer range with read-write structure.
    StorageBuffer = 7,

    /// Uniform buffer with offset given at bind time.
    UniformBufferDynamic = 8,

    /// Storage buffer with offset given at bind time.
    StorageBufferDynamic = 9,

    /// Render pass input attachment.
    InputAttachment = 10,
}

impl DescriptorType {
    /// Descriptor type a reflected resource is bound through.
    /// Sampled images get a sampler of their own.
    pub fn for_resource(resource: &SpvResource) -> Option<Self> {
        resource.category().map(|category| match category {
            ResourceCategory::UniformBuffer => DescriptorType::UniformBuffer,
            ResourceCategory::StorageBuffer => DescriptorType::StorageBuffer,
            ResourceCategory::SampledImage => DescriptorType::CombinedImageSampler,
            ResourceCategory::StorageImage => DescriptorType::StorageImage,
        })
    }
}

/// Binding of a descriptor set layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorSetLayoutBinding {
    /// Binding index.
    pub binding: u32,
    /// Descriptor type.
    pub ty: DescriptorType,
    /// Number of descriptors.
    pub count: u32,
    /// Stages that access the binding.
    pub stage_flags: ShaderStageFlags,
}

/// Number of descriptors of one type a pool must hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    /// Descriptor type.
    pub ty: DescriptorType,
    /// Number of descriptors.
    pub count: u32,
}

/// Descriptor set layout with the bindings it was created from.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DescriptorSetLayout<D: Device + ?Sized> {
    raw: D::DescriptorSetLayout,
    bindings: Vec<DescriptorSetLayoutBinding>,
    relevant: relevant::Relevant,
}

impl<D> DescriptorSetLayout<D>
where
    D: Device + ?Sized,
{
    /// Create layout.
    pub unsafe fn create(
        device: &D,
        bindings: Vec<DescriptorSetLayoutBinding>,
    ) -> Result<Self, DeviceError> {
        log::trace!("Creating new layout with bindings: {:?}", bindings);
        let raw = device.create_descriptor_set_layout(&bindings)?;
        Ok(DescriptorSetLayout {
            raw,
            bindings,
            relevant: relevant::Relevant,
        })
    }

    /// Destroy layout.
    pub unsafe fn dispose(self, device: &D) {
        self.relevant.dispose();
        device.destroy_descriptor_set_layout(self.raw);
    }

    /// Raw layout.
    pub fn raw(&self) -> &D::DescriptorSetLayout {
        &self.raw
    }

    /// Bindings of the layout.
    pub fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }
}
