use std::fmt;

const NUM_STAGE_SLOTS: usize = 5;

bitflags! {
    /// Shader stages flags.
    /// Bit values match `VkShaderStageFlagBits`.
    #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader.
        const VERTEX = 0x00000001;

        /// Hull stage.
        const TESSELLATION_CONTROL = 0x00000002;

        /// Domain stage.
        const TESSELLATION_EVALUATION = 0x00000004;

        /// Geometry shader.
        const GEOMETRY = 0x00000008;

        /// Fragment shader.
        const FRAGMENT = 0x00000010;

        /// All graphics shaders.
        const ALL_GRAPHICS = 0x0000001F;
    }
}

/// A single shader stage of the graphics pipeline.
///
/// Variants are declared in pipeline order and every ordered walk over stages
/// (interface linking, push constant offsets) relies on this order.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum ShaderStage {
    Vertex = 0,
    TessControl = 1,
    TessEval = 2,
    Geometry = 3,
    Fragment = 4,
}

impl ShaderStage {
    /// All stages in pipeline order.
    pub const ALL: [ShaderStage; NUM_STAGE_SLOTS] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
    ];

    /// Stage at `index` in pipeline order.
    ///
    /// # Panics
    ///
    /// If `index` is not less than the number of stages.
    pub fn from_index(index: u32) -> Self {
        Self::ALL[index as usize]
    }

    /// Stage of a single-bit flag. `None` for empty or combined flags.
    pub fn from_flag(flag: ShaderStageFlags) -> Option<Self> {
        match flag {
            ShaderStageFlags::VERTEX => Some(Self::Vertex),
            ShaderStageFlags::TESSELLATION_CONTROL => Some(Self::TessControl),
            ShaderStageFlags::TESSELLATION_EVALUATION => Some(Self::TessEval),
            ShaderStageFlags::GEOMETRY => Some(Self::Geometry),
            ShaderStageFlags::FRAGMENT => Some(Self::Fragment),
            _ => None,
        }
    }

    /// Single-bit flag for this stage.
    pub fn flag(self) -> ShaderStageFlags {
        match self {
            Self::Vertex => ShaderStageFlags::VERTEX,
            Self::TessControl => ShaderStageFlags::TESSELLATION_CONTROL,
            Self::TessEval => ShaderStageFlags::TESSELLATION_EVALUATION,
            Self::Geometry => ShaderStageFlags::GEOMETRY,
            Self::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }

    /// Conventional file extension of a compiled binary for this stage,
    /// as produced by `glslangValidator -V shader.<ext> -o shader.<ext>.spv`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessControl => "tesc",
            Self::TessEval => "tese",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::TessControl => "tessellation control",
            Self::TessEval => "tessellation evaluation",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        stage.flag()
    }
}

impl ShaderStageFlags {
    /// Iterate over single stages contained in the flags, in pipeline order.
    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL
            .iter()
            .copied()
            .filter(move |stage| self.contains(stage.flag()))
    }
}

/// A map of ShaderStage to an optional inner type.
///
/// Iteration always follows pipeline order.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct StageMap<T> {
    slots: [Option<T>; NUM_STAGE_SLOTS],
}

impl<T> Default for StageMap<T> {
    fn default() -> Self {
        StageMap::new()
    }
}

impl<T> StageMap<T> {
    /// Empty map.
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None, None],
        }
    }

    /// Put `value` into the stage's slot and return the previous one.
    #[inline(always)]
    pub fn insert(&mut self, stage: ShaderStage, value: T) -> Option<T> {
        self.slots[stage as usize].replace(value)
    }

    /// Take the stage's value out of the map.
    #[inline(always)]
    pub fn remove(&mut self, stage: ShaderStage) -> Option<T> {
        self.slots[stage as usize].take()
    }

    /// Value of the stage.
    #[inline(always)]
    pub fn get(&self, stage: ShaderStage) -> Option<&T> {
        self.slots[stage as usize].as_ref()
    }

    /// Returns a mutable entry from the map if it exists
    #[inline(always)]
    pub fn get_mut(&mut self, stage: ShaderStage) -> Option<&mut T> {
        self.slots[stage as usize].as_mut()
    }

    /// Checks if the map has an entry for the stage.
    #[inline(always)]
    pub fn contains(&self, stage: ShaderStage) -> bool {
        self.slots[stage as usize].is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Checks if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Flags of all stages present in the map.
    pub fn flags(&self) -> ShaderStageFlags {
        self.iter()
            .fold(ShaderStageFlags::empty(), |flags, (stage, _)| flags | stage.flag())
    }

    /// Present values in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (ShaderStage, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.as_ref().map(|v| (ShaderStage::from_index(idx as u32), v)))
    }

    /// Present values in pipeline order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ShaderStage, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, v)| v.as_mut().map(|v| (ShaderStage::from_index(idx as u32), v)))
    }

    /// Iterates over all the slots in the map
    pub fn iter_all(&self) -> impl Iterator<Item = (ShaderStage, Option<&T>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, v)| (ShaderStage::from_index(idx as u32), v.as_ref()))
    }

    /// Transform every present value, keeping the slots.
    pub fn map<U>(self, mut f: impl FnMut(ShaderStage, T) -> U) -> StageMap<U> {
        let mut out = StageMap::new();
        for (idx, slot) in IntoIterator::into_iter(self.slots).enumerate() {
            if let Some(value) = slot {
                let stage = ShaderStage::from_index(idx as u32);
                out.insert(stage, f(stage, value));
            }
        }
        out
    }
}

impl<T> std::iter::FromIterator<(ShaderStage, T)> for StageMap<T> {
    fn from_iter<I: IntoIterator<Item = (ShaderStage, T)>>(iter: I) -> Self {
        let mut map = StageMap::new();
        for (stage, value) in iter {
            map.insert(stage, value);
        }
        map
    }
}
