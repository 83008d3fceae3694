//! [`Device`] implementation over `ash`.

use ash::vk;
use prism_core::{DeviceLimits, ShaderStageFlags};
use prism_memory::{ImageFormat, ImageInfo, OutOfMemoryError};

use crate::{
    device::{Descriptor, DescriptorWrite, Device},
    error::DeviceError,
    layout::{DescriptorPoolSize, DescriptorSetLayoutBinding, DescriptorType},
    push::{PushConstantRange, PushConstantSink},
};

fn device_error(call: &'static str, result: vk::Result) -> DeviceError {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => OutOfMemoryError::OutOfHostMemory.into(),
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => OutOfMemoryError::OutOfDeviceMemory.into(),
        vk::Result::ERROR_DEVICE_LOST => DeviceError::DeviceLost,
        other => DeviceError::Failed(call, format!("{:?}", other)),
    }
}

/// Vulkan format of the image format.
pub fn format(format: ImageFormat) -> vk::Format {
    match format {
        ImageFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        ImageFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        ImageFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        ImageFormat::R32Sfloat => vk::Format::R32_SFLOAT,
        ImageFormat::Rgba16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        ImageFormat::Rgba32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
    }
}

fn stage_flags(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    vk::ShaderStageFlags::from_raw(flags.bits())
}

fn descriptor_type(ty: DescriptorType) -> vk::DescriptorType {
    vk::DescriptorType::from_raw(ty as i32)
}

/// Limits the binding layout is checked against.
pub fn device_limits(limits: &vk::PhysicalDeviceLimits) -> DeviceLimits {
    DeviceLimits {
        max_bound_descriptor_sets: limits.max_bound_descriptor_sets,
        max_per_stage_descriptor_samplers: limits.max_per_stage_descriptor_samplers,
        max_descriptor_set_uniform_buffers: limits.max_descriptor_set_uniform_buffers,
        max_descriptor_set_storage_buffers: limits.max_descriptor_set_storage_buffers,
        max_descriptor_set_sampled_images: limits.max_descriptor_set_sampled_images,
        max_descriptor_set_storage_images: limits.max_descriptor_set_storage_images,
        max_vertex_input_attributes: limits.max_vertex_input_attributes,
        max_fragment_output_attachments: limits.max_fragment_output_attachments,
        max_push_constants_size: limits.max_push_constants_size,
    }
}

/// Push constant range for pipeline layout creation.
pub fn push_constant_range(range: &PushConstantRange) -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: stage_flags(range.stage_flags),
        offset: range.offset,
        size: range.size,
    }
}

/// Logical device driven through `ash`.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct AshDevice {
    #[derivative(Debug = "ignore")]
    raw: ash::Device,
}

impl AshDevice {
    /// Wrap loaded device.
    pub fn new(raw: ash::Device) -> Self {
        AshDevice { raw }
    }

    /// Loaded device.
    pub fn raw(&self) -> &ash::Device {
        &self.raw
    }
}

impl Device for AshDevice {
    type Buffer = vk::Buffer;
    type Image = vk::Image;
    type ImageView = vk::ImageView;
    type Sampler = vk::Sampler;
    type DescriptorSetLayout = vk::DescriptorSetLayout;
    type DescriptorPool = vk::DescriptorPool;
    type DescriptorSet = vk::DescriptorSet;
    type ShaderModule = vk::ShaderModule;

    unsafe fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<vk::DescriptorSetLayout, DeviceError> {
        let bindings: Vec<_> = bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type(binding.ty))
                    .descriptor_count(binding.count)
                    .stage_flags(stage_flags(binding.stage_flags))
                    .build()
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        self.raw
            .create_descriptor_set_layout(&info, None)
            .map_err(|e| device_error("vkCreateDescriptorSetLayout", e))
    }

    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.raw.destroy_descriptor_set_layout(layout, None);
    }

    unsafe fn create_descriptor_pool(
        &self,
        max_sets: u32,
        sizes: &[DescriptorPoolSize],
    ) -> Result<vk::DescriptorPool, DeviceError> {
        let sizes: Vec<_> = sizes
            .iter()
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_type(size.ty),
                descriptor_count: size.count,
            })
            .collect();
        let info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&sizes);
        self.raw
            .create_descriptor_pool(&info, None)
            .map_err(|e| device_error("vkCreateDescriptorPool", e))
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.raw.destroy_descriptor_pool(pool, None);
    }

    unsafe fn allocate_descriptor_sets(
        &self,
        pool: &mut vk::DescriptorPool,
        layouts: &[&vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>, DeviceError> {
        if layouts.is_empty() {
            return Ok(Vec::new());
        }
        let layouts: Vec<_> = layouts.iter().map(|&&layout| layout).collect();
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(*pool)
            .set_layouts(&layouts);
        self.raw
            .allocate_descriptor_sets(&info)
            .map_err(|e| device_error("vkAllocateDescriptorSets", e))
    }

    unsafe fn update_descriptor_sets(&self, writes: &[DescriptorWrite<'_, Self>]) {
        let mut buffers = Vec::with_capacity(writes.len());
        let mut images = Vec::with_capacity(writes.len());
        for write in writes {
            match &write.descriptor {
                Descriptor::UniformBuffer(buffer, range)
                | Descriptor::StorageBuffer(buffer, range) => {
                    buffers.push([vk::DescriptorBufferInfo {
                        buffer: **buffer,
                        offset: range.start,
                        range: range.end - range.start,
                    }])
                }
                Descriptor::CombinedImageSampler(sampler, view) => {
                    images.push([vk::DescriptorImageInfo {
                        sampler: **sampler,
                        image_view: **view,
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    }])
                }
                Descriptor::StorageImage(view) => images.push([vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: **view,
                    image_layout: vk::ImageLayout::GENERAL,
                }]),
            }
        }

        let (mut buffer_index, mut image_index) = (0, 0);
        let raw: Vec<_> = writes
            .iter()
            .map(|write| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(*write.set)
                    .dst_binding(write.binding)
                    .descriptor_type(descriptor_type(write.descriptor.descriptor_type()));
                match &write.descriptor {
                    Descriptor::UniformBuffer(..) | Descriptor::StorageBuffer(..) => {
                        buffer_index += 1;
                        builder.buffer_info(&buffers[buffer_index - 1]).build()
                    }
                    Descriptor::CombinedImageSampler(..) | Descriptor::StorageImage(_) => {
                        image_index += 1;
                        builder.image_info(&images[image_index - 1]).build()
                    }
                }
            })
            .collect();

        self.raw.update_descriptor_sets(&raw, &[]);
    }

    unsafe fn create_image_view(
        &self,
        image: &vk::Image,
        info: &ImageInfo,
    ) -> Result<vk::ImageView, DeviceError> {
        let info = vk::ImageViewCreateInfo::builder()
            .image(*image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format(info.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        self.raw
            .create_image_view(&info, None)
            .map_err(|e| device_error("vkCreateImageView", e))
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        self.raw.destroy_image_view(view, None);
    }

    unsafe fn create_sampler(&self) -> Result<vk::Sampler, DeviceError> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(vk::LOD_CLAMP_NONE);
        self.raw
            .create_sampler(&info, None)
            .map_err(|e| device_error("vkCreateSampler", e))
    }

    unsafe fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.raw.destroy_sampler(sampler, None);
    }

    unsafe fn create_shader_module(&self, spirv: &[u32]) -> Result<vk::ShaderModule, DeviceError> {
        let info = vk::ShaderModuleCreateInfo::builder().code(spirv);
        self.raw
            .create_shader_module(&info, None)
            .map_err(|e| device_error("vkCreateShaderModule", e))
    }

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.raw.destroy_shader_module(module, None);
    }

    fn wait_idle(&self) -> Result<(), DeviceError> {
        unsafe { self.raw.device_wait_idle() }.map_err(|e| device_error("vkDeviceWaitIdle", e))
    }
}

/// Command buffer in recording state that push constants are recorded into.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AshCommands<'a> {
    #[derivative(Debug = "ignore")]
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    layout: vk::PipelineLayout,
}

impl<'a> AshCommands<'a> {
    /// Wrap command buffer.
    ///
    /// # Safety
    ///
    /// `command_buffer` must be recording and `layout` must be created
    /// with the ranges that will be pushed.
    pub unsafe fn new(
        device: &'a ash::Device,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
    ) -> Self {
        AshCommands {
            device,
            command_buffer,
            layout,
        }
    }
}

impl PushConstantSink for AshCommands<'_> {
    fn push_constants(&mut self, flags: ShaderStageFlags, offset: u32, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                self.layout,
                stage_flags(flags),
                offset,
                data,
            );
        }
    }
}
