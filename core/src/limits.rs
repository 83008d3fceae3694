/// Capability limits of the physical device that the binding layout must respect.
///
/// Defaults are the minimums every Vulkan 1.0 implementation guarantees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derivative::Derivative)]
#[derivative(Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceLimits {
    /// Maximum number of descriptor sets bound at once by a pipeline.
    #[derivative(Default(value = "4"))]
    pub max_bound_descriptor_sets: u32,

    /// Maximum number of samplers accessible from a single stage.
    #[derivative(Default(value = "16"))]
    pub max_per_stage_descriptor_samplers: u32,

    /// Maximum number of uniform buffers in a pipeline layout.
    #[derivative(Default(value = "72"))]
    pub max_descriptor_set_uniform_buffers: u32,

    /// Maximum number of storage buffers in a pipeline layout.
    #[derivative(Default(value = "24"))]
    pub max_descriptor_set_storage_buffers: u32,

    /// Maximum number of sampled images in a pipeline layout.
    #[derivative(Default(value = "96"))]
    pub max_descriptor_set_sampled_images: u32,

    /// Maximum number of storage images in a pipeline layout.
    #[derivative(Default(value = "24"))]
    pub max_descriptor_set_storage_images: u32,

    /// Maximum number of vertex input attributes.
    #[derivative(Default(value = "16"))]
    pub max_vertex_input_attributes: u32,

    /// Maximum number of fragment shader output attachments.
    #[derivative(Default(value = "4"))]
    pub max_fragment_output_attachments: u32,

    /// Maximum size in bytes of the push constant pool.
    #[derivative(Default(value = "128"))]
    pub max_push_constants_size: u32,
}
