//! Interface to the external GPU memory allocator.
//!
//! Prism never allocates device memory itself. Every buffer and image that
//! backs a descriptor is requested from an [`Allocator`] supplied by the
//! application, which also performs mapping and synchronous image uploads.

#![deny(unused_must_use)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate failure;

mod allocator;
mod error;
mod usage;


pub use crate::{
    allocator::{write_bytes, Allocation, Allocator},
    error::{AllocationError, MappingError, OutOfMemoryError, TransferError},
    usage::{BufferUsage, ImageFormat, ImageInfo, ImageUsage},
};
