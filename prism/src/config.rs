use std::path::{Path, PathBuf};

use prism_core::{ShaderStage, StageMap};
use prism_descriptor::DescriptorSetLayoutBinding;
use prism_memory::ImageInfo;
use prism_shader::ShaderSource;

/// Camera parameters default uniform contents are computed from.
#[derive(Clone, Copy, Debug, PartialEq, derivative::Derivative)]
#[derivative(Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewContext {
    /// Width divided by height of the render target.
    #[derivative(Default(value = "1.0"))]
    pub aspect_ratio: f32,

    /// Vertical field of view in radians.
    #[derivative(Default(value = "std::f32::consts::FRAC_PI_4"))]
    pub fov_y: f32,

    /// Near plane distance.
    #[derivative(Default(value = "1.0"))]
    pub near: f32,

    /// Far plane distance.
    #[derivative(Default(value = "100.0"))]
    pub far: f32,

    /// Distance of the camera from the origin along +Z.
    #[derivative(Default(value = "10.0"))]
    pub distance: f32,
}

impl ViewContext {
    /// Context with the aspect ratio of a `width` x `height` target.
    pub fn for_extent(width: u32, height: u32) -> Self {
        ViewContext {
            aspect_ratio: width as f32 / height.max(1) as f32,
            ..ViewContext::default()
        }
    }
}

fn default_names() -> StageMap<String> {
    ShaderStage::ALL
        .iter()
        .map(|&stage| (stage, format!("shader.{}.spv", stage.extension())))
        .collect()
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, derivative::Derivative)]
#[derivative(Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Directory shader binaries are read from.
    #[derivative(Default(value = "PathBuf::from(\"shaders\")"))]
    pub shader_dir: PathBuf,

    /// Binary file name per stage. Missing files leave the stage out.
    #[derivative(Default(value = "default_names()"))]
    pub names: StageMap<String>,

    /// Entry point of every stage.
    #[derivative(Default(value = "\"main\".to_owned()"))]
    pub entry: String,

    /// Info of the images created for image descriptors.
    pub placeholder: ImageInfo,

    /// Color placeholder images are filled with.
    #[derivative(Default(value = "[255, 255, 255, 255]"))]
    pub fill: [u8; 4],

    /// Layouts of sets reserved by the application, bound after the shader sets.
    pub builtin_layouts: Vec<Vec<DescriptorSetLayoutBinding>>,

    /// Camera used for default uniform contents.
    pub view: ViewContext,

    /// Clear color while the engine is valid.
    #[derivative(Default(value = "[0.0, 0.0, 0.0, 1.0]"))]
    pub clear_color: [f32; 4],
}

impl Config {
    /// Read shaders from `dir`.
    pub fn with_shader_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.shader_dir = dir.as_ref().to_owned();
        self
    }

    /// Read the stage's binary from `name`.
    pub fn with_shader(mut self, stage: ShaderStage, name: impl Into<String>) -> Self {
        self.names.insert(stage, name.into());
        self
    }

    /// Don't load the stage.
    pub fn without_shader(mut self, stage: ShaderStage) -> Self {
        self.names.remove(stage);
        self
    }

    /// Use `entry` as entry point.
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Create placeholder images with `info` filled with `fill`.
    pub fn with_placeholder(mut self, info: ImageInfo, fill: [u8; 4]) -> Self {
        self.placeholder = info;
        self.fill = fill;
        self
    }

    /// Reserve a set with the layout.
    pub fn with_builtin_layout(mut self, bindings: Vec<DescriptorSetLayoutBinding>) -> Self {
        self.builtin_layouts.push(bindings);
        self
    }

    /// Compute default uniform contents with `view`.
    pub fn with_view(mut self, view: ViewContext) -> Self {
        self.view = view;
        self
    }

    /// Clear with `color` while valid.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Where to read shader binaries from.
    pub fn source(&self) -> ShaderSource {
        ShaderSource::new(&self.shader_dir, self.names.clone(), self.entry.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_names_use_stage_extensions() {
        let config = Config::default();
        assert_eq!(config.names.len(), 5);
        assert_eq!(
            config.names.get(ShaderStage::Fragment).map(String::as_str),
            Some("shader.frag.spv")
        );
        assert_eq!(config.entry, "main");
    }

    #[test]
    fn builders() {
        let config = Config::default()
            .with_shader_dir("/tmp/shaders")
            .without_shader(ShaderStage::Geometry)
            .with_shader(ShaderStage::Vertex, "quad.vert.spv")
            .with_view(ViewContext::for_extent(1600, 900));
        let source = config.source();
        assert_eq!(source.dir, PathBuf::from("/tmp/shaders"));
        assert!(!source.names.contains(ShaderStage::Geometry));
        assert_eq!(
            source.names.get(ShaderStage::Vertex).map(String::as_str),
            Some("quad.vert.spv")
        );
        assert!((config.view.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
    }
}
