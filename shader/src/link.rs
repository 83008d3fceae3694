//! Validation of the interfaces between consecutive stages and of device limits.

use std::{collections::HashMap, fmt};

use prism_core::{DeviceLimits, Leveled, Severity, ShaderStage, StageMap};

use crate::reflect::{InterfaceVariable, SpvType, StageReflection};

/// A single linking problem.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum LinkError {
    /// Every pipeline needs a vertex shader.
    #[fail(display = "vertex shader is required")]
    MissingVertexStage,

    /// Only one of the tessellation stages is present.
    #[fail(display = "tessellation control and evaluation shaders must be used together")]
    UnpairedTessellation,

    /// Vertex shader declares more inputs than the device supports.
    #[fail(
        display = "vertex shader declares {} input attributes, device limit is {}",
        count, limit
    )]
    TooManyVertexAttributes {
        /// Declared attributes.
        count: u32,
        /// Device limit.
        limit: u32,
    },

    /// Fragment shader declares more outputs than the device supports.
    #[fail(
        display = "fragment shader declares {} outputs, device limit is {}",
        count, limit
    )]
    TooManyFragmentOutputs {
        /// Declared outputs.
        count: u32,
        /// Device limit.
        limit: u32,
    },

    /// Push constant blocks of all stages don't fit.
    #[fail(
        display = "push constants take {} bytes, device limit is {}",
        size, limit
    )]
    PushConstantsTooLarge {
        /// Total size in bytes.
        size: u32,
        /// Device limit.
        limit: u32,
    },

    /// Output block of one stage and input block of the next differ in size.
    #[fail(
        display = "{} shader has {} outputs but {} shader has {} inputs",
        from, outputs, to, inputs
    )]
    CountMismatch {
        /// Earlier stage.
        from: ShaderStage,
        /// Later stage.
        to: ShaderStage,
        /// Outputs of the earlier stage.
        outputs: usize,
        /// Inputs of the later stage.
        inputs: usize,
    },

    /// Output is not consumed by the next stage.
    #[fail(
        display = "{} shader output '{}' at location {} has no matching {} shader input",
        from, name, location, to
    )]
    NoMatchingInput {
        /// Earlier stage.
        from: ShaderStage,
        /// Later stage.
        to: ShaderStage,
        /// Output location.
        location: u32,
        /// Output name.
        name: String,
    },

    /// Output and input at one location have different types.
    #[fail(display = "{} -> {} shader: type mismatch at location {}", from, to, location)]
    TypeMismatch {
        /// Earlier stage.
        from: ShaderStage,
        /// Later stage.
        to: ShaderStage,
        /// Location.
        location: u32,
    },
}

impl Leveled for LinkError {
    fn severity(&self) -> Severity {
        match self {
            LinkError::MissingVertexStage => Severity::Warning,
            _ => Severity::Critical,
        }
    }
}

/// All problems found by one linking pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkErrors(pub Vec<LinkError>);

impl LinkErrors {
    /// Individual errors.
    pub fn errors(&self) -> &[LinkError] {
        &self.0
    }
}

impl std::error::Error for LinkErrors {}
impl fmt::Display for LinkErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} link error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl Leveled for LinkErrors {
    fn severity(&self) -> Severity {
        self.0
            .iter()
            .map(Leveled::severity)
            .max()
            .unwrap_or(Severity::Warning)
    }
}

/// Check whether an output type can feed an input type.
/// Names and offsets don't take part.
pub fn interface_types_match(output: &SpvType, input: &SpvType) -> bool {
    match (output, input) {
        (SpvType::Vector(o), SpvType::Vector(i)) => o.base == i.base && o.length == i.length,
        (SpvType::Matrix(o), SpvType::Matrix(i)) => {
            o.base == i.base && o.rows == i.rows && o.columns == i.columns
        }
        (SpvType::Array(o), SpvType::Array(i)) => {
            o.dims == i.dims && interface_types_match(&o.subtype, &i.subtype)
        }
        (SpvType::Struct(o), SpvType::Struct(i)) => {
            o.members.len() == i.members.len()
                && o
                    .members
                    .iter()
                    .zip(&i.members)
                    .all(|(o, i)| interface_types_match(&o.ty, &i.ty))
        }
        (SpvType::Image(o), SpvType::Image(i)) => o == i,
        _ => false,
    }
}

fn link_pair(
    from: &StageReflection,
    to: &StageReflection,
    errors: &mut Vec<LinkError>,
) {
    if from.outputs.len() != to.inputs.len() {
        errors.push(LinkError::CountMismatch {
            from: from.stage,
            to: to.stage,
            outputs: from.outputs.len(),
            inputs: to.inputs.len(),
        });
        return;
    }

    let inputs: HashMap<u32, &InterfaceVariable> =
        to.inputs.iter().map(|input| (input.location, input)).collect();

    for output in &from.outputs {
        match inputs.get(&output.location) {
            None => errors.push(LinkError::NoMatchingInput {
                from: from.stage,
                to: to.stage,
                location: output.location,
                name: output.name.clone(),
            }),
            Some(input) if !interface_types_match(&output.ty, &input.ty) => {
                errors.push(LinkError::TypeMismatch {
                    from: from.stage,
                    to: to.stage,
                    location: output.location,
                })
            }
            Some(_) => {}
        }
    }
}

/// Validate the stage sequence against itself and the device limits.
///
/// Collects every problem instead of stopping at the first one,
/// except for a missing vertex stage which is reported alone.
pub fn link(stages: &StageMap<StageReflection>, limits: &DeviceLimits) -> Result<(), LinkErrors> {
    let vertex = match stages.get(ShaderStage::Vertex) {
        Some(vertex) => vertex,
        None => return Err(LinkErrors(vec![LinkError::MissingVertexStage])),
    };

    let mut errors = Vec::new();

    if stages.contains(ShaderStage::TessControl) != stages.contains(ShaderStage::TessEval) {
        errors.push(LinkError::UnpairedTessellation);
    }

    let attributes = vertex.input_attributes.len() as u32;
    if attributes > limits.max_vertex_input_attributes {
        errors.push(LinkError::TooManyVertexAttributes {
            count: attributes,
            limit: limits.max_vertex_input_attributes,
        });
    }

    if let Some(fragment) = stages.get(ShaderStage::Fragment) {
        let outputs = fragment.outputs.len() as u32;
        if outputs > limits.max_fragment_output_attachments {
            errors.push(LinkError::TooManyFragmentOutputs {
                count: outputs,
                limit: limits.max_fragment_output_attachments,
            });
        }
    }

    let push_constants: u32 = stages
        .iter()
        .filter_map(|(_, reflection)| reflection.push_constant.as_ref())
        .map(|block| block.ty.size())
        .sum();
    if push_constants > limits.max_push_constants_size {
        errors.push(LinkError::PushConstantsTooLarge {
            size: push_constants,
            limit: limits.max_push_constants_size,
        });
    }

    let present: Vec<&StageReflection> = stages.iter().map(|(_, reflection)| reflection).collect();
    for pair in present.windows(2) {
        link_pair(pair[0], pair[1], &mut errors);
    }

    if errors.is_empty() {
        log::debug!("Linked {} stages", present.len());
        Ok(())
    } else {
        Err(LinkErrors(errors))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reflect::{
        classify, BaseKind, BlockDeclaration, InterfaceDeclaration, ShaderInterface,
        TypeDescription,
    };

    fn var(name: &str, location: u32, ty: TypeDescription) -> InterfaceDeclaration {
        InterfaceDeclaration {
            name: name.into(),
            location,
            builtin: false,
            ty,
        }
    }

    fn vec_n(n: u32) -> TypeDescription {
        TypeDescription::vector(BaseKind::Float, n)
    }

    fn stage(
        stage: ShaderStage,
        inputs: Vec<InterfaceDeclaration>,
        outputs: Vec<InterfaceDeclaration>,
    ) -> StageReflection {
        let mut interface = ShaderInterface::new(stage);
        interface.inputs = inputs;
        interface.outputs = outputs;
        classify(&interface).unwrap()
    }

    fn pipeline(stages: Vec<StageReflection>) -> StageMap<StageReflection> {
        stages.into_iter().map(|s| (s.stage, s)).collect()
    }

    #[test]
    fn reordered_locations_link() {
        let stages = pipeline(vec![
            stage(
                ShaderStage::Vertex,
                vec![var("position", 0, vec_n(3))],
                vec![var("normal", 0, vec_n(3)), var("uv", 1, vec_n(2))],
            ),
            stage(
                ShaderStage::Fragment,
                vec![var("uv", 1, vec_n(2)), var("normal", 0, vec_n(3))],
                vec![var("color", 0, vec_n(4))],
            ),
        ]);
        assert_eq!(link(&stages, &DeviceLimits::default()), Ok(()));
    }

    #[test]
    fn count_mismatch_is_reported_once() {
        let stages = pipeline(vec![
            stage(
                ShaderStage::Vertex,
                vec![],
                vec![var("normal", 0, vec_n(3)), var("uv", 1, vec_n(2))],
            ),
            stage(
                ShaderStage::Fragment,
                vec![var("uv", 5, vec_n(4))],
                vec![var("color", 0, vec_n(4))],
            ),
        ]);
        let errors = link(&stages, &DeviceLimits::default()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[LinkError::CountMismatch {
                from: ShaderStage::Vertex,
                to: ShaderStage::Fragment,
                outputs: 2,
                inputs: 1,
            }]
        );
        assert_eq!(errors.severity(), Severity::Critical);
    }

    #[test]
    fn location_and_type_mismatches_are_all_reported() {
        let stages = pipeline(vec![
            stage(
                ShaderStage::Vertex,
                vec![],
                vec![var("normal", 0, vec_n(3)), var("uv", 1, vec_n(2))],
            ),
            stage(
                ShaderStage::Fragment,
                vec![var("normal", 0, vec_n(4)), var("uv", 2, vec_n(2))],
                vec![],
            ),
        ]);
        let errors = link(&stages, &DeviceLimits::default()).unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        assert!(errors.errors().contains(&LinkError::TypeMismatch {
            from: ShaderStage::Vertex,
            to: ShaderStage::Fragment,
            location: 0,
        }));
        assert!(errors.errors().contains(&LinkError::NoMatchingInput {
            from: ShaderStage::Vertex,
            to: ShaderStage::Fragment,
            location: 1,
            name: "uv".into(),
        }));
    }

    #[test]
    fn absent_stages_are_skipped() {
        let stages = pipeline(vec![
            stage(ShaderStage::Vertex, vec![], vec![var("uv", 0, vec_n(2))]),
            stage(
                ShaderStage::Geometry,
                vec![var("uv", 0, vec_n(2))],
                vec![var("uv", 0, vec_n(2))],
            ),
            stage(ShaderStage::Fragment, vec![var("uv", 0, vec_n(2))], vec![]),
        ]);
        assert_eq!(link(&stages, &DeviceLimits::default()), Ok(()));
    }

    #[test]
    fn vertex_attribute_limit() {
        let inputs = (0..5).map(|i| var("attr", i, vec_n(4))).collect();
        let stages = pipeline(vec![stage(ShaderStage::Vertex, inputs, vec![])]);
        let limits = DeviceLimits {
            max_vertex_input_attributes: 4,
            ..DeviceLimits::default()
        };
        let errors = link(&stages, &limits).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[LinkError::TooManyVertexAttributes { count: 5, limit: 4 }]
        );
    }

    #[test]
    fn missing_vertex_stage_is_reported_alone() {
        let stages = pipeline(vec![
            stage(ShaderStage::TessControl, vec![], vec![]),
            stage(ShaderStage::Fragment, vec![var("uv", 0, vec_n(2))], vec![]),
        ]);
        let errors = link(&stages, &DeviceLimits::default()).unwrap_err();
        assert_eq!(errors.errors(), &[LinkError::MissingVertexStage]);
        assert_eq!(errors.severity(), Severity::Warning);
    }

    #[test]
    fn tessellation_stages_come_in_pairs() {
        let stages = pipeline(vec![
            stage(ShaderStage::Vertex, vec![], vec![]),
            stage(ShaderStage::TessEval, vec![], vec![]),
        ]);
        let errors = link(&stages, &DeviceLimits::default()).unwrap_err();
        assert_eq!(errors.errors(), &[LinkError::UnpairedTessellation]);
    }

    #[test]
    fn push_constant_limit() {
        let block = |size| BlockDeclaration {
            name: "Push".into(),
            ty: TypeDescription::structure(
                vec![TypeDescription::matrix(BaseKind::Float, 4, 4).with_name("model")],
                size,
            ),
        };
        let mut vertex = ShaderInterface::new(ShaderStage::Vertex);
        vertex.push_constants.push(block(64));
        let mut fragment = ShaderInterface::new(ShaderStage::Fragment);
        fragment.push_constants.push(block(80));

        let stages = pipeline(vec![classify(&vertex).unwrap(), classify(&fragment).unwrap()]);
        let errors = link(&stages, &DeviceLimits::default()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[LinkError::PushConstantsTooLarge {
                size: 144,
                limit: 128
            }]
        );
    }
}
