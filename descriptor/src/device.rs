use std::{fmt::Debug, ops::Range};

use prism_memory::ImageInfo;

use crate::{
    error::DeviceError,
    layout::{DescriptorPoolSize, DescriptorSetLayoutBinding, DescriptorType},
};

/// Native device that creates the objects a pipeline binds resources through.
///
/// Buffers and images come from the external allocator,
/// so their handle types must match the allocator's.
pub trait Device {
    /// Buffer handle.
    type Buffer: Debug;

    /// Image handle.
    type Image: Debug;

    /// Image view.
    type ImageView: Debug;

    /// Sampler.
    type Sampler: Debug;

    /// Descriptor set layout.
    type DescriptorSetLayout: Debug;

    /// Descriptor pool.
    type DescriptorPool: Debug;

    /// Descriptor set.
    type DescriptorSet: Debug;

    /// Shader module.
    type ShaderModule: Debug;

    /// Create descriptor set layout.
    unsafe fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<Self::DescriptorSetLayout, DeviceError>;

    /// Destroy descriptor set layout.
    unsafe fn destroy_descriptor_set_layout(&self, layout: Self::DescriptorSetLayout);

    /// Create descriptor pool.
    unsafe fn create_descriptor_pool(
        &self,
        max_sets: u32,
        sizes: &[DescriptorPoolSize],
    ) -> Result<Self::DescriptorPool, DeviceError>;

    /// Destroy descriptor pool.
    /// Sets allocated from it are freed with it.
    unsafe fn destroy_descriptor_pool(&self, pool: Self::DescriptorPool);

    /// Allocate one set per layout.
    unsafe fn allocate_descriptor_sets(
        &self,
        pool: &mut Self::DescriptorPool,
        layouts: &[&Self::DescriptorSetLayout],
    ) -> Result<Vec<Self::DescriptorSet>, DeviceError>;

    /// Write descriptors in one batched call.
    unsafe fn update_descriptor_sets(&self, writes: &[DescriptorWrite<'_, Self>]);

    /// Create view of the whole image.
    unsafe fn create_image_view(
        &self,
        image: &Self::Image,
        info: &ImageInfo,
    ) -> Result<Self::ImageView, DeviceError>;

    /// Destroy image view.
    unsafe fn destroy_image_view(&self, view: Self::ImageView);

    /// Create linear repeating sampler.
    unsafe fn create_sampler(&self) -> Result<Self::Sampler, DeviceError>;

    /// Destroy sampler.
    unsafe fn destroy_sampler(&self, sampler: Self::Sampler);

    /// Create shader module from SPIR-V words.
    unsafe fn create_shader_module(&self, spirv: &[u32]) -> Result<Self::ShaderModule, DeviceError>;

    /// Destroy shader module.
    unsafe fn destroy_shader_module(&self, module: Self::ShaderModule);

    /// Wait until the device finishes all submitted work.
    fn wait_idle(&self) -> Result<(), DeviceError>;
}

/// Resource written into a descriptor.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub enum Descriptor<'a, D: Device + ?Sized> {
    /// Buffer range with read-only uniform structure.
    UniformBuffer(&'a D::Buffer, Range<u64>),

    /// Buffer range with read-write structure.
    StorageBuffer(&'a D::Buffer, Range<u64>),

    /// Image view combined with sampler.
    CombinedImageSampler(&'a D::Sampler, &'a D::ImageView),

    /// Image view for per-pixel access.
    StorageImage(&'a D::ImageView),
}

impl<'a, D> Descriptor<'a, D>
where
    D: Device + ?Sized,
{
    /// Type of the descriptor.
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            Descriptor::UniformBuffer(..) => DescriptorType::UniformBuffer,
            Descriptor::StorageBuffer(..) => DescriptorType::StorageBuffer,
            Descriptor::CombinedImageSampler(..) => DescriptorType::CombinedImageSampler,
            Descriptor::StorageImage(_) => DescriptorType::StorageImage,
        }
    }
}

/// Write of a single descriptor.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub struct DescriptorWrite<'a, D: Device + ?Sized> {
    /// Target set.
    pub set: &'a D::DescriptorSet,

    /// Target binding.
    pub binding: u32,

    /// Written resource.
    pub descriptor: Descriptor<'a, D>,
}
