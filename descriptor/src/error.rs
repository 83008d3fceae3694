use prism_core::{Leveled, Severity};
use prism_memory::{AllocationError, MappingError, OutOfMemoryError, TransferError};

use crate::push::PushConstantError;

/// Native API failure.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum DeviceError {
    /// Out of either host or device memory.
    #[fail(display = "{}", _0)]
    OutOfMemory(OutOfMemoryError),

    /// Device was lost.
    #[fail(display = "Device lost")]
    DeviceLost,

    /// Call failed with another error code.
    #[fail(display = "{} failed: {}", _0, _1)]
    Failed(&'static str, String),
}

impl From<OutOfMemoryError> for DeviceError {
    fn from(error: OutOfMemoryError) -> Self {
        DeviceError::OutOfMemory(error)
    }
}

/// Device limit checked before descriptors are created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// `max_bound_descriptor_sets`.
    BoundDescriptorSets,
    /// `max_per_stage_descriptor_samplers`.
    Samplers,
    /// `max_descriptor_set_uniform_buffers`.
    UniformBuffers,
    /// `max_descriptor_set_storage_buffers`.
    StorageBuffers,
    /// `max_descriptor_set_sampled_images`.
    SampledImages,
    /// `max_descriptor_set_storage_images`.
    StorageImages,
}

impl LimitKind {
    fn name(&self) -> &'static str {
        match self {
            LimitKind::BoundDescriptorSets => "bound descriptor sets",
            LimitKind::Samplers => "samplers",
            LimitKind::UniformBuffers => "uniform buffers",
            LimitKind::StorageBuffers => "storage buffers",
            LimitKind::SampledImages => "sampled images",
            LimitKind::StorageImages => "storage images",
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error building or updating descriptor bindings.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum BindError {
    /// Native call failed.
    #[fail(display = "{}", _0)]
    Device(DeviceError),

    /// Allocator failed to create a buffer or image.
    #[fail(display = "Failed to allocate '{}': {}", _0, _1)]
    Allocation(String, AllocationError),

    /// Allocator failed to map memory.
    #[fail(display = "{}", _0)]
    Mapping(MappingError),

    /// Allocator failed to upload image data.
    #[fail(display = "Failed to upload '{}': {}", _0, _1)]
    Transfer(String, TransferError),

    /// Model needs more descriptors than the device supports.
    #[fail(display = "{} {} exceed device limit of {}", count, kind, limit)]
    LimitExceeded {
        /// Exceeded limit.
        kind: LimitKind,
        /// Required count.
        count: u32,
        /// Device limit.
        limit: u32,
    },

    /// No resource is bound at the location.
    #[fail(display = "Nothing is bound at set {} binding {}", set, binding)]
    UnknownBinding {
        /// Set index.
        set: u32,
        /// Binding index.
        binding: u32,
    },

    /// Resource at the location is not of the kind the operation needs.
    #[fail(display = "Set {} binding {} is not {}", set, binding, expected)]
    WrongKind {
        /// Set index.
        set: u32,
        /// Binding index.
        binding: u32,
        /// What the operation needs.
        expected: &'static str,
    },

    /// Push constant access failed.
    #[fail(display = "{}", _0)]
    PushConstant(PushConstantError),
}

impl From<DeviceError> for BindError {
    fn from(error: DeviceError) -> Self {
        BindError::Device(error)
    }
}

impl From<MappingError> for BindError {
    fn from(error: MappingError) -> Self {
        BindError::Mapping(error)
    }
}

impl From<PushConstantError> for BindError {
    fn from(error: PushConstantError) -> Self {
        BindError::PushConstant(error)
    }
}

impl Leveled for BindError {
    fn severity(&self) -> Severity {
        match self {
            BindError::UnknownBinding { .. }
            | BindError::WrongKind { .. }
            | BindError::PushConstant(_) => Severity::Warning,
            BindError::Device(_)
            | BindError::Allocation(..)
            | BindError::Mapping(_)
            | BindError::Transfer(..)
            | BindError::LimitExceeded { .. } => Severity::Critical,
        }
    }
}
