//! Descriptor set layouts, pool sizing, resource binding and push constants
//! for a reflected shader model.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]
#![allow(clippy::missing_safety_doc)]

#[macro_use]
extern crate derivative;

#[macro_use]
extern crate failure;

mod binder;
mod device;
mod error;
mod layout;
mod push;
mod ranges;

#[cfg(feature = "ash")]
pub mod vulkan;

#[cfg(any(test, feature = "test-util"))]
pub mod test;

pub use crate::{
    binder::{Backing, BoundResource, DescriptorBinder},
    device::{Descriptor, DescriptorWrite, Device},
    error::{BindError, DeviceError, LimitKind},
    layout::{
        DescriptorPoolSize, DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorType,
    },
    push::{
        PushConstantBuilder, PushConstantError, PushConstantRange, PushConstantSink, PushConstants,
    },
    ranges::PoolSizes,
};
