//! Per-stage resource reflection.
//!
//! A compiler front end fills a [`ShaderInterface`] for one stage.
//! [`classify`] reflects every declaration into typed [`SpvResource`]s and
//! buckets them by how they are bound.

use prism_core::{Leveled, Severity, ShaderStage};

mod resource;
#[cfg(feature = "spirv-reflection")]
mod spirv;
mod types;

pub use self::{
    resource::{DescriptorKind, InterfaceVariable, ResourceCategory, SpvGroup, SpvResource},
    types::{
        reflect_type, ArrayDim, ArrayType, BaseKind, Dimensionality, ImageTraits, ImageType,
        MatrixType, ReflectTypeError, SpvType, StructMember, StructType, TypeDescription,
        VectorType,
    },
};

#[cfg(feature = "spirv-reflection")]
pub use self::spirv::reflect_spirv;

/// The item kind that couldn't be retrieved from the compiler front end.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RetrievalKind {
    /// Module itself.
    Module,
    /// Input variables.
    InputVariables,
    /// Output variables.
    OutputVariables,
    /// Descriptor bindings.
    DescriptorBindings,
    /// Push constant blocks.
    PushConstants,
}

impl RetrievalKind {
    fn as_str(&self) -> &'static str {
        match *self {
            RetrievalKind::Module => "shader module",
            RetrievalKind::InputVariables => "input variables",
            RetrievalKind::OutputVariables => "output variables",
            RetrievalKind::DescriptorBindings => "descriptor bindings",
            RetrievalKind::PushConstants => "push constants",
        }
    }
}

/// A reflection error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReflectError {
    /// An item could not be retrieved from the front end.
    Retrieval(RetrievalKind, String),
    /// A front end error occured.
    General(String),
    /// An error occured while reflecting a type.
    Type(ReflectTypeError),
    /// Binding kind that can't be bound by prism.
    UnsupportedResource {
        /// Declaring stage.
        stage: ShaderStage,
        /// Variable name.
        name: String,
        /// Binding kind.
        kind: BindingKind,
    },
    /// Stage declares more than one push constant block.
    MultiplePushConstantBlocks(ShaderStage),
    /// Binary reflected as a different stage than it was loaded for.
    StageMismatch {
        /// Stage the binary was loaded for.
        expected: ShaderStage,
        /// Stage the binary declares.
        found: ShaderStage,
    },
    /// Two stages declare different resources under one `(set, binding)`.
    IncompatibleBinding {
        /// Set index.
        set: u32,
        /// Binding index.
        binding: u32,
        /// Stage whose declaration conflicts with earlier stages.
        stage: ShaderStage,
    },
}

impl std::error::Error for ReflectError {}
impl std::fmt::Display for ReflectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReflectError::Retrieval(kind, msg) => {
                write!(f, "failed to get {} from shader: {}", kind.as_str(), msg)
            }
            ReflectError::General(msg) => write!(f, "{}", msg),
            ReflectError::Type(e) => write!(f, "{}", e),
            ReflectError::UnsupportedResource { stage, name, kind } => write!(
                f,
                "{} shader: resource '{}' of kind {:?} is not supported",
                stage, name, kind
            ),
            ReflectError::MultiplePushConstantBlocks(stage) => {
                write!(f, "{} shader: more than one push constant block", stage)
            }
            ReflectError::StageMismatch { expected, found } => write!(
                f,
                "expected a {} shader, binary declares {}",
                expected, found
            ),
            ReflectError::IncompatibleBinding {
                set,
                binding,
                stage,
            } => write!(
                f,
                "{} shader: incompatible resource at set {} binding {}",
                stage, set, binding
            ),
        }
    }
}

impl From<ReflectTypeError> for ReflectError {
    fn from(e: ReflectTypeError) -> Self {
        ReflectError::Type(e)
    }
}

impl Leveled for ReflectError {
    fn severity(&self) -> Severity {
        match self {
            ReflectError::UnsupportedResource { .. }
            | ReflectError::MultiplePushConstantBlocks(_)
            | ReflectError::StageMismatch { .. } => Severity::Warning,
            ReflectError::Retrieval(..)
            | ReflectError::General(_)
            | ReflectError::Type(_)
            | ReflectError::IncompatibleBinding { .. } => Severity::Critical,
        }
    }
}

/// Descriptor type of a binding as the compiler reports it.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    CombinedImageSampler,
    StorageImage,
    Sampler,
    UniformTexelBuffer,
    StorageTexelBuffer,
    InputAttachment,
    AccelerationStructure,
}

/// Stage input or output variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDeclaration {
    /// Variable name.
    pub name: String,
    /// Interface location.
    pub location: u32,
    /// Built-in variables like `gl_Position` are not part of the user interface.
    pub builtin: bool,
    /// Type description.
    pub ty: TypeDescription,
}

/// Descriptor binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingDeclaration {
    /// Variable name.
    pub name: String,
    /// Set index.
    pub set: u32,
    /// Binding index.
    pub binding: u32,
    /// Descriptor type.
    pub kind: BindingKind,
    /// Type description. Array dimensions describe descriptor arrays.
    pub ty: TypeDescription,
}

/// Push constant block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDeclaration {
    /// Block name.
    pub name: String,
    /// Type description of the block struct.
    pub ty: TypeDescription,
}

/// Everything one shader stage declares, as reported by a compiler front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInterface {
    /// Stage.
    pub stage: ShaderStage,
    /// Entry point name.
    pub entry_point: String,
    /// Input variables.
    pub inputs: Vec<InterfaceDeclaration>,
    /// Output variables.
    pub outputs: Vec<InterfaceDeclaration>,
    /// Descriptor bindings.
    pub bindings: Vec<BindingDeclaration>,
    /// Push constant blocks.
    pub push_constants: Vec<BlockDeclaration>,
}

impl ShaderInterface {
    /// Empty interface for `stage` with entry point `main`.
    pub fn new(stage: ShaderStage) -> Self {
        ShaderInterface {
            stage,
            entry_point: "main".into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            bindings: Vec::new(),
            push_constants: Vec::new(),
        }
    }
}

/// Classified resources of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageReflection {
    /// Stage.
    pub stage: ShaderStage,
    /// Entry point name.
    pub entry_point: String,
    /// Non-builtin inputs.
    pub inputs: Vec<InterfaceVariable>,
    /// Non-builtin outputs.
    pub outputs: Vec<InterfaceVariable>,
    /// Vertex input attributes. Empty for every stage but vertex.
    pub input_attributes: Vec<SpvResource>,
    /// Uniform buffers.
    pub uniform_buffers: Vec<SpvResource>,
    /// Storage buffers.
    pub storage_buffers: Vec<SpvResource>,
    /// Sampled images, including combined image-samplers.
    pub sampled_images: Vec<SpvResource>,
    /// Storage images.
    pub storage_images: Vec<SpvResource>,
    /// Push constant block.
    pub push_constant: Option<SpvResource>,
}

impl StageReflection {
    /// All descriptor resources of the stage.
    pub fn descriptors(&self) -> impl Iterator<Item = &SpvResource> {
        self.uniform_buffers
            .iter()
            .chain(&self.storage_buffers)
            .chain(&self.sampled_images)
            .chain(&self.storage_images)
    }
}

fn interface_variables(
    declarations: &[InterfaceDeclaration],
) -> Result<Vec<InterfaceVariable>, ReflectError> {
    let mut variables = declarations
        .iter()
        .filter(|decl| !decl.builtin)
        .map(|decl| {
            Ok(InterfaceVariable {
                name: decl.name.clone(),
                location: decl.location,
                ty: reflect_type(&decl.ty)?,
            })
        })
        .collect::<Result<Vec<_>, ReflectError>>()?;
    variables.sort_by_key(|var| var.location);
    Ok(variables)
}

/// Reflect and bucket every resource declared by one stage.
pub fn classify(interface: &ShaderInterface) -> Result<StageReflection, ReflectError> {
    let stage = interface.stage;
    let inputs = interface_variables(&interface.inputs)?;
    let outputs = interface_variables(&interface.outputs)?;

    let input_attributes = if stage == ShaderStage::Vertex {
        inputs
            .iter()
            .map(|input| SpvResource {
                name: input.name.clone(),
                group: SpvGroup::InputAttribute {
                    location: input.location,
                },
                ty: input.ty.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut reflection = StageReflection {
        stage,
        entry_point: interface.entry_point.clone(),
        inputs,
        outputs,
        input_attributes,
        uniform_buffers: Vec::new(),
        storage_buffers: Vec::new(),
        sampled_images: Vec::new(),
        storage_images: Vec::new(),
        push_constant: None,
    };

    for decl in &interface.bindings {
        let (kind, sampled) = match decl.kind {
            BindingKind::UniformBuffer => (DescriptorKind::UniformBuffer, None),
            BindingKind::StorageBuffer => (DescriptorKind::StorageBuffer, None),
            BindingKind::SampledImage | BindingKind::CombinedImageSampler => {
                (DescriptorKind::Image, Some(true))
            }
            BindingKind::StorageImage => (DescriptorKind::Image, Some(false)),
            kind => {
                return Err(ReflectError::UnsupportedResource {
                    stage,
                    name: decl.name.clone(),
                    kind,
                })
            }
        };

        let mut desc = decl.ty.clone();
        if !desc.array_dims.is_empty() {
            log::warn!(
                "{} shader: descriptor array '{}' {:?} is bound as a single descriptor",
                stage,
                decl.name,
                desc.array_dims
            );
            desc.array_dims.clear();
            desc.array_stride = 0;
        }

        let mut ty = reflect_type(&desc)?;
        if let (SpvType::Image(image), Some(sampled)) = (&mut ty, sampled) {
            image.sampled = sampled;
        }

        let resource = SpvResource {
            name: decl.name.clone(),
            group: SpvGroup::Descriptor {
                set: decl.set,
                binding: decl.binding,
                stage_flags: stage.flag(),
                kind,
            },
            ty,
        };

        log::trace!(
            "{} shader: {} '{}' at set {} binding {}",
            stage,
            resource.ty,
            resource.name,
            decl.set,
            decl.binding
        );

        match resource.category() {
            Some(ResourceCategory::UniformBuffer) => reflection.uniform_buffers.push(resource),
            Some(ResourceCategory::StorageBuffer) => reflection.storage_buffers.push(resource),
            Some(ResourceCategory::SampledImage) => reflection.sampled_images.push(resource),
            Some(ResourceCategory::StorageImage) | None => {
                reflection.storage_images.push(resource)
            }
        }
    }

    match interface.push_constants.as_slice() {
        [] => {}
        [block] => {
            reflection.push_constant = Some(SpvResource {
                name: block.name.clone(),
                group: SpvGroup::PushConstant { stage },
                ty: reflect_type(&block.ty)?,
            });
        }
        _ => return Err(ReflectError::MultiplePushConstantBlocks(stage)),
    }

    Ok(reflection)
}
