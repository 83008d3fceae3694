//! Shader loading, resource reflection and stage linking.

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
extern crate failure;

mod layout_map;
mod link;
mod model;
pub mod reflect;

pub use self::{
    layout_map::DescriptorLayoutMap,
    link::{interface_types_match, link, LinkError, LinkErrors},
    model::ShaderModel,
    reflect::{
        classify, reflect_type, ReflectError, ReflectTypeError, RetrievalKind, ShaderInterface,
        SpvGroup, SpvResource, SpvType, StageReflection,
    },
};

use std::path::{Path, PathBuf};

use prism_core::{Leveled, Severity, ShaderStage, StageMap};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Error type returned by this module.
#[derive(Debug, Fail)]
pub enum ShaderError {
    /// Shader binary could not be read.
    #[fail(display = "failed to read shader {}: {}", path, error)]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[cause]
        error: std::io::Error,
    },

    /// Binary length is not a multiple of the word size.
    #[fail(display = "SPIR-V length {} is not a multiple of 4", _0)]
    InvalidLength(usize),

    /// Binary doesn't start with the SPIR-V magic number.
    #[fail(display = "invalid SPIR-V magic number {:#010x}", _0)]
    InvalidMagic(u32),
}

impl Leveled for ShaderError {
    fn severity(&self) -> Severity {
        Severity::Warning
    }
}

/// Read SPIR-V words from bytes of either endianness.
pub fn read_spirv(bytes: &[u8]) -> Result<Vec<u32>, ShaderError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(ShaderError::InvalidLength(bytes.len()));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] == SPIRV_MAGIC.swap_bytes() {
        for word in &mut words {
            *word = word.swap_bytes();
        }
    }

    if words[0] != SPIRV_MAGIC {
        return Err(ShaderError::InvalidMagic(words[0]));
    }
    Ok(words)
}

/// Interface to get SPIR-V code of a shader stage.
pub trait Shader {
    /// Get spirv bytecode.
    fn spirv(&self) -> &[u32];

    /// Get the entry point of the shader.
    fn entry(&self) -> &str;

    /// Get the stage of this shader.
    fn stage(&self) -> ShaderStage;
}

/// Spir-V shader.
#[derive(Clone, PartialEq, Eq, Hash, derivative::Derivative)]
#[derivative(Debug)]
pub struct SpirvShader {
    #[derivative(Debug = "ignore")]
    spirv: Vec<u32>,
    stage: ShaderStage,
    entry: String,
}

impl SpirvShader {
    /// Create Spir-V shader from words.
    pub fn new(spirv: Vec<u32>, stage: ShaderStage, entrypoint: &str) -> Self {
        Self {
            spirv,
            stage,
            entry: entrypoint.to_string(),
        }
    }

    /// Create Spir-V shader from bytecode stored as bytes.
    pub fn from_bytes(
        spirv: &[u8],
        stage: ShaderStage,
        entrypoint: &str,
    ) -> Result<Self, ShaderError> {
        Ok(Self::new(read_spirv(spirv)?, stage, entrypoint))
    }

    /// Reflect and classify the resources of this shader.
    #[cfg(feature = "spirv-reflection")]
    pub fn reflect(&self) -> Result<StageReflection, ReflectError> {
        let mut interface = reflect::reflect_spirv(&self.spirv)?;
        if interface.stage != self.stage {
            return Err(ReflectError::StageMismatch {
                expected: self.stage,
                found: interface.stage,
            });
        }
        interface.entry_point = self.entry.clone();
        classify(&interface)
    }
}

impl Shader for SpirvShader {
    fn spirv(&self) -> &[u32] {
        &self.spirv
    }

    fn entry(&self) -> &str {
        &self.entry
    }

    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

/// Where the binaries of a shader set are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    /// Directory with the binaries.
    pub dir: PathBuf,
    /// File name per stage.
    pub names: StageMap<String>,
    /// Entry point shared by all stages.
    pub entry: String,
}

impl ShaderSource {
    /// Source reading `<dir>/<name>` for each stage.
    pub fn new(dir: impl AsRef<Path>, names: StageMap<String>, entry: impl Into<String>) -> Self {
        ShaderSource {
            dir: dir.as_ref().to_owned(),
            names,
            entry: entry.into(),
        }
    }

    /// Read the binaries of every configured stage.
    /// Stages whose file doesn't exist are left out of the set.
    pub fn load(&self) -> Result<ShaderSet, ShaderError> {
        let mut set = ShaderSet::default();
        for (stage, name) in self.names.iter() {
            let path = self.dir.join(name);
            if !path.is_file() {
                log::debug!("No {} shader at {}", stage, path.display());
                continue;
            }

            let bytes = std::fs::read(&path).map_err(|error| ShaderError::Io {
                path: path.display().to_string(),
                error,
            })?;
            log::trace!("Loaded {} shader from {}", stage, path.display());
            set.insert(SpirvShader::from_bytes(&bytes, stage, &self.entry)?);
        }
        Ok(set)
    }
}

/// Spir-V shaders of one pipeline, at most one per stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderSet {
    shaders: StageMap<SpirvShader>,
}

impl ShaderSet {
    /// Add shader, replacing the one of the same stage.
    pub fn insert(&mut self, shader: SpirvShader) -> Option<SpirvShader> {
        self.shaders.insert(shader.stage, shader)
    }

    /// Add shader.
    pub fn with_shader(mut self, shader: SpirvShader) -> Self {
        self.insert(shader);
        self
    }

    /// Shader of the stage.
    pub fn get(&self, stage: ShaderStage) -> Option<&SpirvShader> {
        self.shaders.get(stage)
    }

    /// Iterate over shaders in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = &SpirvShader> {
        self.shaders.iter().map(|(_, shader)| shader)
    }

    /// Check if there are no shaders.
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Reflect every shader and merge them into one model.
    #[cfg(feature = "spirv-reflection")]
    pub fn reflect(&self) -> Result<ShaderModel, ReflectError> {
        let stages = self
            .shaders
            .iter()
            .map(|(stage, shader)| Ok((stage, shader.reflect()?)))
            .collect::<Result<StageMap<_>, ReflectError>>()?;
        ShaderModel::new(stages)
    }
}
