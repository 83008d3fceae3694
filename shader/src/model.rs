use prism_core::{DeviceLimits, ShaderStage, ShaderStageFlags, StageMap};

use crate::{
    layout_map::DescriptorLayoutMap,
    link::{link, LinkErrors},
    reflect::{classify, ReflectError, ShaderInterface, SpvResource, StageReflection},
};

/// Resource model of a whole shader set.
///
/// Built in one go from the stage reflections. A failing merge yields no model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderModel {
    stages: StageMap<StageReflection>,
    layout: DescriptorLayoutMap,
}

impl ShaderModel {
    /// Merge classified stages.
    pub fn new(stages: StageMap<StageReflection>) -> Result<Self, ReflectError> {
        let layout = DescriptorLayoutMap::merge(&stages)?;
        Ok(ShaderModel { stages, layout })
    }

    /// Classify and merge stage interfaces.
    pub fn from_interfaces(
        interfaces: impl IntoIterator<Item = ShaderInterface>,
    ) -> Result<Self, ReflectError> {
        let mut stages = StageMap::new();
        for interface in interfaces {
            let stage = interface.stage;
            if stages.insert(stage, classify(&interface)?).is_some() {
                return Err(ReflectError::General(format!(
                    "{} shader declared twice",
                    stage
                )));
            }
        }
        Self::new(stages)
    }

    /// Validate stage interfaces and device limits.
    pub fn link(&self, limits: &DeviceLimits) -> Result<(), LinkErrors> {
        link(&self.stages, limits)
    }

    /// Per-stage reflections.
    pub fn stages(&self) -> &StageMap<StageReflection> {
        &self.stages
    }

    /// Merged descriptor resources.
    pub fn layout(&self) -> &DescriptorLayoutMap {
        &self.layout
    }

    /// Stages present in the set.
    pub fn stage_flags(&self) -> ShaderStageFlags {
        self.stages.flags()
    }

    /// Push constant blocks in pipeline stage order.
    pub fn push_constants(&self) -> impl Iterator<Item = (ShaderStage, &SpvResource)> {
        self.stages
            .iter()
            .filter_map(|(stage, reflection)| {
                reflection.push_constant.as_ref().map(|pc| (stage, pc))
            })
    }

    /// Vertex input attributes sorted by location.
    pub fn input_attributes(&self) -> &[SpvResource] {
        self.stages
            .get(ShaderStage::Vertex)
            .map_or(&[], |vertex| &vertex.input_attributes[..])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reflect::{
        BaseKind, BindingDeclaration, BindingKind, BlockDeclaration, TypeDescription,
    };

    fn push(stage: ShaderStage) -> ShaderInterface {
        let mut interface = ShaderInterface::new(stage);
        interface.push_constants.push(BlockDeclaration {
            name: "Push".into(),
            ty: TypeDescription::structure(
                vec![TypeDescription::vector(BaseKind::Float, 4).with_name("color")],
                16,
            ),
        });
        interface
    }

    #[test]
    fn push_constants_in_stage_order() {
        let model = ShaderModel::from_interfaces(vec![
            push(ShaderStage::Fragment),
            push(ShaderStage::Vertex),
        ])
        .unwrap();
        let stages: Vec<_> = model.push_constants().map(|(stage, _)| stage).collect();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
        assert_eq!(
            model.stage_flags(),
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn duplicate_stage_is_rejected() {
        assert!(ShaderModel::from_interfaces(vec![
            push(ShaderStage::Vertex),
            push(ShaderStage::Vertex),
        ])
        .is_err());
    }

    #[test]
    fn conflicting_stages_publish_nothing() {
        let buffer = |kind| BindingDeclaration {
            name: "Data".into(),
            set: 0,
            binding: 0,
            kind,
            ty: TypeDescription::structure(
                vec![TypeDescription::scalar(BaseKind::UInt).with_name("count")],
                4,
            ),
        };
        let mut vertex = ShaderInterface::new(ShaderStage::Vertex);
        vertex.bindings.push(buffer(BindingKind::UniformBuffer));
        let mut fragment = ShaderInterface::new(ShaderStage::Fragment);
        fragment.bindings.push(buffer(BindingKind::StorageBuffer));

        match ShaderModel::from_interfaces(vec![vertex, fragment]) {
            Err(ReflectError::IncompatibleBinding { set: 0, binding: 0, .. }) => {}
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
