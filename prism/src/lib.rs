//! Prism's top level crate.
//!
//! Reflects the resources of a shader set, validates them against the device
//! and binds descriptors and push constants for pipeline construction.
//! Reexports all other prism crates.

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

mod config;
pub mod defaults;
mod engine;
mod error;

pub use crate::{
    config::{Config, ViewContext},
    engine::{PipelineInputs, ResourceEngine, StageModule, ERROR_COLOR},
    error::Error,
};

pub use prism_core::{
    DeviceLimits, Leveled, ReloadFlags, Severity, ShaderStage, ShaderStageFlags, StageMap,
};

#[doc(inline)]
pub use prism_descriptor as descriptor;

#[doc(inline)]
pub use prism_memory as memory;

#[doc(inline)]
pub use prism_shader as shader;
