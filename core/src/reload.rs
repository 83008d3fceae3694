bitflags! {
    /// Parts of the pipeline that must be rebuilt during a reload pass.
    ///
    /// The single-part flags can be combined freely, but callers normally
    /// want one of the presets, which include everything a part depends on.
    #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
    pub struct ReloadFlags: u32 {
        /// Shader binaries and the resource model reflected from them.
        const SHADERS = 0x1;

        /// Render pass object.
        const RENDER_PASS = 0x2;

        /// Graphics pipeline object.
        const PIPELINE = 0x4;

        /// Stage interface and device limit validation.
        const VALIDATION = 0x8;

        /// Reloading shaders invalidates the pipeline and requires revalidation.
        const RELOAD_SHADERS = Self::SHADERS.bits | Self::PIPELINE.bits | Self::VALIDATION.bits;

        /// Reloading the render pass invalidates the pipeline.
        const RELOAD_RENDER_PASS = Self::RENDER_PASS.bits | Self::PIPELINE.bits;
    }
}

impl ReloadFlags {
    /// Expand single-part flags with the parts they invalidate.
    pub fn with_implied(self) -> Self {
        let mut flags = self;
        if self.contains(Self::SHADERS) {
            flags |= Self::RELOAD_SHADERS;
        }
        if self.contains(Self::RENDER_PASS) {
            flags |= Self::RELOAD_RENDER_PASS;
        }
        flags
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets_include_dependent_parts() {
        assert!(ReloadFlags::RELOAD_SHADERS.contains(ReloadFlags::PIPELINE));
        assert!(ReloadFlags::RELOAD_SHADERS.contains(ReloadFlags::VALIDATION));
        assert!(!ReloadFlags::RELOAD_SHADERS.contains(ReloadFlags::RENDER_PASS));
        assert!(ReloadFlags::RELOAD_RENDER_PASS.contains(ReloadFlags::PIPELINE));
    }

    #[test]
    fn implied_flags() {
        assert_eq!(ReloadFlags::SHADERS.with_implied(), ReloadFlags::RELOAD_SHADERS);
        assert_eq!(
            (ReloadFlags::RENDER_PASS | ReloadFlags::VALIDATION).with_implied(),
            ReloadFlags::RENDER_PASS | ReloadFlags::PIPELINE | ReloadFlags::VALIDATION
        );
        assert_eq!(ReloadFlags::PIPELINE.with_implied(), ReloadFlags::PIPELINE);
    }
}
