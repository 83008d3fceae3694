//! `spirv-reflect` front end.

use prism_core::ShaderStage;
use spirv_reflect::{types::*, ShaderModule};

use super::{
    BaseKind, BindingDeclaration, BindingKind, BlockDeclaration, Dimensionality, ImageTraits,
    InterfaceDeclaration, ReflectError, RetrievalKind, ShaderInterface, TypeDescription,
};

/// Reflect SPIR-V words into the interface of the stage they declare.
pub fn reflect_spirv(spirv: &[u32]) -> Result<ShaderInterface, ReflectError> {
    let module = ShaderModule::load_u32_data(spirv)
        .map_err(|e| ReflectError::Retrieval(RetrievalKind::Module, e.to_string()))?;

    let stage = convert_stage(module.get_shader_stage())?;

    let inputs = module
        .enumerate_input_variables(None)
        .map_err(|e| ReflectError::Retrieval(RetrievalKind::InputVariables, e.to_string()))?
        .iter()
        .map(interface_declaration)
        .collect();

    let outputs = module
        .enumerate_output_variables(None)
        .map_err(|e| ReflectError::Retrieval(RetrievalKind::OutputVariables, e.to_string()))?
        .iter()
        .map(interface_declaration)
        .collect();

    let bindings = module
        .enumerate_descriptor_bindings(None)
        .map_err(|e| ReflectError::Retrieval(RetrievalKind::DescriptorBindings, e.to_string()))?
        .iter()
        .map(binding_declaration)
        .collect::<Result<Vec<_>, _>>()?;

    let push_constants = module
        .enumerate_push_constant_blocks(None)
        .map_err(|e| ReflectError::Retrieval(RetrievalKind::PushConstants, e.to_string()))?
        .iter()
        .map(|block| BlockDeclaration {
            name: block_name(block),
            ty: block_description(block),
        })
        .collect();

    Ok(ShaderInterface {
        stage,
        entry_point: module.get_entry_point_name(),
        inputs,
        outputs,
        bindings,
        push_constants,
    })
}

fn convert_stage(stage: ReflectShaderStageFlags) -> Result<ShaderStage, ReflectError> {
    if stage.contains(ReflectShaderStageFlags::VERTEX) {
        Ok(ShaderStage::Vertex)
    } else if stage.contains(ReflectShaderStageFlags::TESSELLATION_CONTROL) {
        Ok(ShaderStage::TessControl)
    } else if stage.contains(ReflectShaderStageFlags::TESSELLATION_EVALUATION) {
        Ok(ShaderStage::TessEval)
    } else if stage.contains(ReflectShaderStageFlags::GEOMETRY) {
        Ok(ShaderStage::Geometry)
    } else if stage.contains(ReflectShaderStageFlags::FRAGMENT) {
        Ok(ShaderStage::Fragment)
    } else {
        Err(ReflectError::General(format!(
            "unsupported shader stage {:?}",
            stage
        )))
    }
}

fn base_kind(flags: ReflectTypeFlags, traits: &ReflectTypeDescriptionTraits) -> BaseKind {
    let scalar = &traits.numeric.scalar;
    if flags.contains(ReflectTypeFlags::EXTERNAL_SAMPLED_IMAGE) {
        BaseKind::SampledImage
    } else if flags.contains(ReflectTypeFlags::EXTERNAL_IMAGE) {
        BaseKind::Image
    } else if flags.contains(ReflectTypeFlags::EXTERNAL_SAMPLER) {
        BaseKind::Sampler
    } else if flags.contains(ReflectTypeFlags::STRUCT) {
        BaseKind::Struct
    } else if flags.contains(ReflectTypeFlags::FLOAT) {
        match scalar.width {
            16 => BaseKind::Half,
            64 => BaseKind::Double,
            _ => BaseKind::Float,
        }
    } else if flags.contains(ReflectTypeFlags::INT) {
        match (scalar.width, scalar.signedness) {
            (8, 0) => BaseKind::UInt8,
            (8, _) => BaseKind::Int8,
            (16, 0) => BaseKind::UInt16,
            (16, _) => BaseKind::Int16,
            (64, 0) => BaseKind::UInt64,
            (64, _) => BaseKind::Int64,
            (_, 0) => BaseKind::UInt,
            (_, _) => BaseKind::Int,
        }
    } else if flags.contains(ReflectTypeFlags::BOOL) {
        BaseKind::Bool
    } else {
        BaseKind::Unknown
    }
}

fn image_traits(image: &ReflectImageTraits) -> ImageTraits {
    let dim = match image.dim {
        ReflectDimension::Type1d => Dimensionality::D1,
        ReflectDimension::Type3d => Dimensionality::D3,
        ReflectDimension::Cube => Dimensionality::Cube,
        ReflectDimension::Rect => Dimensionality::Rect,
        ReflectDimension::Buffer => Dimensionality::Buffer,
        ReflectDimension::SubPassData => Dimensionality::SubpassData,
        _ => Dimensionality::D2,
    };

    ImageTraits {
        dim,
        sampled: image.sampled,
        multisampled: image.ms == 1,
        depth: image.depth == 1,
        arrayed: image.arrayed == 1,
        format: format!("{:?}", image.image_format),
    }
}

/// spirv-reflect lists array dimensions outermost first.
fn innermost_first(dims: &[u32]) -> Vec<u32> {
    dims.iter().rev().cloned().collect()
}

/// Numeric and opaque part of a description. Struct members are filled by the caller.
fn type_description(desc: &ReflectTypeDescription) -> TypeDescription {
    let base = base_kind(desc.type_flags, &desc.traits);
    let numeric = &desc.traits.numeric;

    let mut out = if desc.type_flags.contains(ReflectTypeFlags::MATRIX) {
        TypeDescription::matrix(base, numeric.matrix.row_count, numeric.matrix.column_count)
            .with_matrix_stride(numeric.matrix.stride)
    } else {
        TypeDescription::vector(base, numeric.vector.component_count.max(1))
    };

    if out.is_image() {
        out.image = Some(image_traits(&desc.traits.image));
    }

    out.array_dims = innermost_first(&desc.traits.array.dims);
    out.array_stride = desc.traits.array.stride;
    out.name = desc.struct_member_name.clone();
    out
}

fn interface_declaration(variable: &ReflectInterfaceVariable) -> InterfaceDeclaration {
    let mut ty = match &variable.type_description {
        Some(desc) => {
            let mut ty = type_description(desc);
            ty.members = desc.members.iter().map(type_description).collect();
            ty
        }
        None => TypeDescription::scalar(BaseKind::Unknown),
    };
    ty.name = variable.name.clone();
    if ty.array_dims.is_empty() {
        ty.array_dims = innermost_first(&variable.array.dims);
    }

    InterfaceDeclaration {
        name: variable.name.clone(),
        location: variable.location,
        builtin: variable
            .decoration_flags
            .contains(ReflectDecorationFlags::BUILT_IN),
        ty,
    }
}

fn block_name(block: &ReflectBlockVariable) -> String {
    match (&block.type_description, block.name.is_empty()) {
        (Some(desc), true) => desc.type_name.clone(),
        _ => block.name.clone(),
    }
}

/// Description of a block variable with the layout the compiler computed.
fn block_description(block: &ReflectBlockVariable) -> TypeDescription {
    let mut ty = match &block.type_description {
        Some(desc) => type_description(desc),
        None => TypeDescription::scalar(BaseKind::Unknown),
    };

    ty.name = block.name.clone();
    ty.offset = block.offset;
    ty.array_dims = innermost_first(&block.array.dims);
    ty.array_stride = block.array.stride;
    if block.numeric.matrix.stride > 0 {
        ty.matrix_stride = block.numeric.matrix.stride;
    }

    if !block.members.is_empty() {
        ty.base = BaseKind::Struct;
        ty.members = block.members.iter().map(block_description).collect();
        // Arrays report the size of all elements. Struct size is per element.
        ty.size = if !ty.array_dims.is_empty() && block.array.stride > 0 {
            block.array.stride
        } else {
            block.size
        };
    }

    ty
}

fn binding_declaration(
    binding: &ReflectDescriptorBinding,
) -> Result<BindingDeclaration, ReflectError> {
    let kind = match binding.descriptor_type {
        ReflectDescriptorType::UniformBuffer | ReflectDescriptorType::UniformBufferDynamic => {
            BindingKind::UniformBuffer
        }
        ReflectDescriptorType::StorageBuffer | ReflectDescriptorType::StorageBufferDynamic => {
            BindingKind::StorageBuffer
        }
        ReflectDescriptorType::SampledImage => BindingKind::SampledImage,
        ReflectDescriptorType::CombinedImageSampler => BindingKind::CombinedImageSampler,
        ReflectDescriptorType::StorageImage => BindingKind::StorageImage,
        ReflectDescriptorType::Sampler => BindingKind::Sampler,
        ReflectDescriptorType::UniformTexelBuffer => BindingKind::UniformTexelBuffer,
        ReflectDescriptorType::StorageTexelBuffer => BindingKind::StorageTexelBuffer,
        ReflectDescriptorType::InputAttachment => BindingKind::InputAttachment,
        ReflectDescriptorType::AccelerationStructureNV => BindingKind::AccelerationStructure,
        ReflectDescriptorType::Undefined => {
            return Err(ReflectError::General(format!(
                "binding '{}' at set {} binding {} has undefined descriptor type",
                binding.name, binding.set, binding.binding
            )))
        }
    };

    let mut ty = match kind {
        BindingKind::UniformBuffer | BindingKind::StorageBuffer => {
            block_description(&binding.block)
        }
        _ => {
            let base = match kind {
                BindingKind::CombinedImageSampler => BaseKind::SampledImage,
                BindingKind::Sampler => BaseKind::Sampler,
                _ => BaseKind::Image,
            };
            TypeDescription::image(base, image_traits(&binding.image))
        }
    };

    let name = if binding.name.is_empty() {
        block_name(&binding.block)
    } else {
        binding.name.clone()
    };
    ty.name = name.clone();
    ty.array_dims = innermost_first(&binding.array.dims);

    Ok(BindingDeclaration {
        name,
        set: binding.set,
        binding: binding.binding,
        kind,
        ty,
    })
}
