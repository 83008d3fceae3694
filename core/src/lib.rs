//! Crate that contains the types shared by every prism crate:
//! shader stages, device limits, reload flags and error severity.

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

#[macro_use]
extern crate bitflags;

pub use crate::{limits::*, reload::*, severity::*, stage::*};

mod limits;
mod reload;
mod severity;
#[macro_use]
mod slow;
mod stage;
