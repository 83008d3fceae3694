use prism_core::{Leveled, Severity};
use prism_descriptor::{BindError, DeviceError, PushConstantError};
use prism_shader::{LinkErrors, ReflectError, ShaderError};

/// Error of a reload pass or of an edit of bound data.
#[derive(Debug, Fail)]
pub enum Error {
    /// Shader binaries could not be loaded.
    #[fail(display = "{}", _0)]
    Shader(#[cause] ShaderError),

    /// Shader resources could not be reflected or merged.
    #[fail(display = "{}", _0)]
    Reflect(#[cause] ReflectError),

    /// Stage interfaces or device limits don't match.
    #[fail(display = "{}", _0)]
    Link(#[cause] LinkErrors),

    /// Descriptors could not be bound or written.
    #[fail(display = "{}", _0)]
    Bind(#[cause] BindError),

    /// Native call failed outside of binding.
    #[fail(display = "{}", _0)]
    Device(#[cause] DeviceError),

    /// Operation needs a valid model.
    #[fail(display = "resource model is not valid")]
    Invalid,
}

impl Leveled for Error {
    fn severity(&self) -> Severity {
        match self {
            Error::Shader(e) => e.severity(),
            Error::Reflect(e) => e.severity(),
            Error::Link(e) => e.severity(),
            Error::Bind(e) => e.severity(),
            Error::Device(_) => Severity::Critical,
            Error::Invalid => Severity::Warning,
        }
    }
}

impl From<ShaderError> for Error {
    fn from(error: ShaderError) -> Self {
        Error::Shader(error)
    }
}

impl From<ReflectError> for Error {
    fn from(error: ReflectError) -> Self {
        Error::Reflect(error)
    }
}

impl From<LinkErrors> for Error {
    fn from(error: LinkErrors) -> Self {
        Error::Link(error)
    }
}

impl From<BindError> for Error {
    fn from(error: BindError) -> Self {
        Error::Bind(error)
    }
}

impl From<DeviceError> for Error {
    fn from(error: DeviceError) -> Self {
        Error::Device(error)
    }
}

impl From<PushConstantError> for Error {
    fn from(error: PushConstantError) -> Self {
        Error::Bind(error.into())
    }
}
