use prism_core::{ShaderStage, ShaderStageFlags, StageMap};
use prism_shader::SpvResource;

/// Byte range of the push constant pool used by some stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Stages that read the range.
    pub stage_flags: ShaderStageFlags,
    /// Offset in bytes.
    pub offset: u32,
    /// Size in bytes.
    pub size: u32,
}

/// Push constant access error.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum PushConstantError {
    /// Stage has no push constant block.
    #[fail(display = "{} shader has no push constant block", _0)]
    NoBlock(ShaderStage),

    /// Write exceeds the stage's block.
    #[fail(
        display = "write of {} bytes at offset {} exceeds {} shader push constants of {} bytes",
        len, offset, stage, size
    )]
    OutOfBounds {
        /// Stage.
        stage: ShaderStage,
        /// Write offset.
        offset: u32,
        /// Write length.
        len: usize,
        /// Block size.
        size: u32,
    },
}

/// Command stream push constants are recorded into.
pub trait PushConstantSink {
    /// Push `data` into the range at `offset`.
    fn push_constants(&mut self, stage_flags: ShaderStageFlags, offset: u32, data: &[u8]);
}

/// Collects push constant blocks and lays them out.
#[derive(Clone, Debug, Default)]
pub struct PushConstantBuilder {
    blocks: StageMap<u32>,
}

impl PushConstantBuilder {
    /// Create empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the block of a stage, replacing an earlier one.
    pub fn add(&mut self, stage: ShaderStage, block: &SpvResource) -> &mut Self {
        self.blocks.insert(stage, block.ty.size());
        self
    }

    /// Add the block of a stage.
    pub fn with_block(mut self, stage: ShaderStage, block: &SpvResource) -> Self {
        self.add(stage, block);
        self
    }

    /// Assign ranges in pipeline stage order.
    /// Offsets are the sizes of all ranges before it, whatever order blocks were added in.
    pub fn build(&self) -> PushConstants {
        let mut offset = 0;
        let mut ranges = Vec::with_capacity(self.blocks.len());
        let mut data = StageMap::new();

        for (stage, &size) in self.blocks.iter() {
            ranges.push((
                stage,
                PushConstantRange {
                    stage_flags: stage.flag(),
                    offset,
                    size,
                },
            ));
            data.insert(stage, vec![0; size as usize]);
            log::trace!(
                "{} shader push constants at {}..{}",
                stage,
                offset,
                offset + size
            );
            offset += size;
        }

        PushConstants { ranges, data }
    }
}

/// Push constant ranges and their per-stage data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PushConstants {
    ranges: Vec<(ShaderStage, PushConstantRange)>,
    data: StageMap<Vec<u8>>,
}

impl PushConstants {
    /// Lay out blocks given with their stages.
    pub fn from_blocks<'a>(
        blocks: impl IntoIterator<Item = (ShaderStage, &'a SpvResource)>,
    ) -> Self {
        let mut builder = PushConstantBuilder::new();
        for (stage, block) in blocks {
            builder.add(stage, block);
        }
        builder.build()
    }

    /// Ranges for the pipeline layout, in pipeline stage order.
    pub fn ranges(&self) -> impl Iterator<Item = &PushConstantRange> {
        self.ranges.iter().map(|(_, range)| range)
    }

    /// Range of the stage.
    pub fn range(&self, stage: ShaderStage) -> Option<&PushConstantRange> {
        self.ranges
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, range)| range)
    }

    /// Total size of all ranges.
    pub fn total_size(&self) -> u32 {
        self.ranges().map(|range| range.size).sum()
    }

    /// Check if no stage has push constants.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Data of the stage.
    pub fn data(&self, stage: ShaderStage) -> Option<&[u8]> {
        self.data.get(stage).map(Vec::as_slice)
    }

    /// Data of every stage.
    pub fn all_data(&self) -> &StageMap<Vec<u8>> {
        &self.data
    }

    /// Overwrite data of the stage at `offset`.
    pub fn write(
        &mut self,
        stage: ShaderStage,
        offset: u32,
        bytes: &[u8],
    ) -> Result<(), PushConstantError> {
        let data = self
            .data
            .get_mut(stage)
            .ok_or(PushConstantError::NoBlock(stage))?;
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(PushConstantError::OutOfBounds {
                stage,
                offset,
                len: bytes.len(),
                size: data.len() as u32,
            });
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Push data of every stage with the ranges built for the layout.
    pub fn record(&self, sink: &mut impl PushConstantSink) {
        for (stage, range) in &self.ranges {
            if let Some(data) = self.data.get(*stage) {
                sink.push_constants(range.stage_flags, range.offset, data);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prism_shader::{
        reflect::{StructType, VectorType, BaseKind, StructMember},
        SpvGroup, SpvType,
    };

    fn block(stage: ShaderStage, size: u32) -> SpvResource {
        SpvResource {
            name: "Push".into(),
            group: SpvGroup::PushConstant { stage },
            ty: SpvType::Struct(StructType {
                members: vec![StructMember {
                    ty: SpvType::Vector(VectorType {
                        base: BaseKind::Float,
                        length: size / 4,
                        size,
                    }),
                    name: "data".into(),
                    offset: 0,
                }],
                size,
            }),
        }
    }

    #[derive(Default)]
    struct RecordingSink(Vec<(ShaderStageFlags, u32, Vec<u8>)>);

    impl PushConstantSink for RecordingSink {
        fn push_constants(&mut self, stage_flags: ShaderStageFlags, offset: u32, data: &[u8]) {
            self.0.push((stage_flags, offset, data.to_vec()));
        }
    }

    #[test]
    fn offsets_follow_stage_order() {
        let fragment = block(ShaderStage::Fragment, 16);
        let vertex = block(ShaderStage::Vertex, 64);
        let geometry = block(ShaderStage::Geometry, 8);

        let push = PushConstants::from_blocks(vec![
            (ShaderStage::Fragment, &fragment),
            (ShaderStage::Geometry, &geometry),
            (ShaderStage::Vertex, &vertex),
        ]);

        assert_eq!(
            push.ranges().cloned().collect::<Vec<_>>(),
            vec![
                PushConstantRange {
                    stage_flags: ShaderStageFlags::VERTEX,
                    offset: 0,
                    size: 64
                },
                PushConstantRange {
                    stage_flags: ShaderStageFlags::GEOMETRY,
                    offset: 64,
                    size: 8
                },
                PushConstantRange {
                    stage_flags: ShaderStageFlags::FRAGMENT,
                    offset: 72,
                    size: 16
                },
            ]
        );
        assert_eq!(push.total_size(), 88);
        assert_eq!(push.data(ShaderStage::Fragment).unwrap().len(), 16);
    }

    #[test]
    fn record_uses_built_ranges() {
        let mut push = PushConstantBuilder::new()
            .with_block(ShaderStage::Fragment, &block(ShaderStage::Fragment, 8))
            .with_block(ShaderStage::Vertex, &block(ShaderStage::Vertex, 4))
            .build();
        push.write(ShaderStage::Fragment, 4, &[1, 2, 3, 4]).unwrap();

        let mut sink = RecordingSink::default();
        push.record(&mut sink);

        let built: Vec<_> = push
            .ranges()
            .map(|range| (range.stage_flags, range.offset))
            .collect();
        let recorded: Vec<_> = sink.0.iter().map(|(flags, offset, _)| (*flags, *offset)).collect();
        assert_eq!(built, recorded);
        assert_eq!(sink.0[0].0, ShaderStageFlags::VERTEX);
        assert_eq!(sink.0[1], (ShaderStageFlags::FRAGMENT, 4, vec![0, 0, 0, 0, 1, 2, 3, 4]));
    }

    #[test]
    fn writes_are_bounds_checked() {
        let mut push = PushConstantBuilder::new()
            .with_block(ShaderStage::Vertex, &block(ShaderStage::Vertex, 4))
            .build();
        assert_eq!(
            push.write(ShaderStage::Vertex, 2, &[0; 4]),
            Err(PushConstantError::OutOfBounds {
                stage: ShaderStage::Vertex,
                offset: 2,
                len: 4,
                size: 4,
            })
        );
        assert_eq!(
            push.write(ShaderStage::Fragment, 0, &[0]),
            Err(PushConstantError::NoBlock(ShaderStage::Fragment))
        );
    }
}
