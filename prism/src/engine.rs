use prism_core::{DeviceLimits, Leveled, ReloadFlags, ShaderStage};
use prism_descriptor::{
    Backing, BoundResource, DescriptorBinder, Device, DeviceError, PushConstantRange,
    PushConstantSink, PushConstants,
};
use prism_memory::{Allocator, ImageInfo};
use prism_shader::{Shader, ShaderModel, ShaderSet, SpvResource};

use crate::{
    config::{Config, ViewContext},
    defaults::{default_data, Camera},
    error::Error,
};

/// Clear color while the resource model is not valid.
pub const ERROR_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

/// Shader module of one stage.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct StageModule<D: Device> {
    stage: ShaderStage,
    entry: String,
    module: D::ShaderModule,
}

impl<D> StageModule<D>
where
    D: Device,
{
    /// Stage.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Entry point.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Native module.
    pub fn module(&self) -> &D::ShaderModule {
        &self.module
    }
}

/// Everything pipeline construction needs from the engine.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct PipelineInputs<'a, D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    /// Set layouts indexed by set: shader sets from 0 up to the highest
    /// declared one, then built-in sets.
    pub set_layouts: Vec<&'a D::DescriptorSetLayout>,
    /// Sets in the same order as the layouts.
    pub sets: &'a [D::DescriptorSet],
    /// Push constant ranges in pipeline stage order.
    pub push_constant_ranges: Vec<PushConstantRange>,
    /// Bound resources ascending by `(set, binding)`.
    pub resources: &'a [BoundResource<D, A>],
    /// Push constant data per stage.
    pub push_constants: &'a PushConstants,
    /// Vertex input attributes sorted by location.
    pub input_attributes: &'a [SpvResource],
    /// Shader stages in pipeline order.
    pub stages: &'a [StageModule<D>],
}

#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
struct Bound<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    binder: DescriptorBinder<D, A>,
    push_constants: PushConstants,
    modules: Vec<StageModule<D>>,
}

impl<D, A> Bound<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    fn create(
        config: &Config,
        shaders: &ShaderSet,
        model: &ShaderModel,
        device: &D,
        allocator: &mut A,
        limits: &DeviceLimits,
    ) -> Result<Self, Error> {
        let binder = DescriptorBinder::bind(
            device,
            allocator,
            model.layout(),
            &config.builtin_layouts,
            &config.placeholder,
            config.fill,
            limits,
        )?;
        let mut push_constants = PushConstants::from_blocks(model.push_constants());

        if let Err(e) = seed(&binder, &mut push_constants, model, allocator, &config.view) {
            unsafe { binder.dispose(device, allocator) };
            return Err(e);
        }

        match unsafe { create_modules(device, shaders) } {
            Ok(modules) => Ok(Bound {
                binder,
                push_constants,
                modules,
            }),
            Err(e) => {
                unsafe { binder.dispose(device, allocator) };
                Err(e.into())
            }
        }
    }

    unsafe fn dispose(self, device: &D, allocator: &mut A) {
        for stage in self.modules.into_iter().rev() {
            device.destroy_shader_module(stage.module);
        }
        self.binder.dispose(device, allocator);
    }
}

/// Write camera matrices into uniform data and push constants.
fn seed<D, A>(
    binder: &DescriptorBinder<D, A>,
    push_constants: &mut PushConstants,
    model: &ShaderModel,
    allocator: &mut A,
    view: &ViewContext,
) -> Result<(), Error>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    let camera = Camera::new(view);
    for bound in binder.resources() {
        if let Backing::Buffer(_) = bound.backing() {
            if let Some(data) = default_data(&bound.resource().ty, &camera) {
                binder.write_buffer(allocator, bound.set(), bound.binding(), 0, &data)?;
            }
        }
    }
    for (stage, block) in model.push_constants() {
        if let Some(data) = default_data(&block.ty, &camera) {
            push_constants.write(stage, 0, &data)?;
        }
    }
    Ok(())
}

unsafe fn create_modules<D: Device>(
    device: &D,
    shaders: &ShaderSet,
) -> Result<Vec<StageModule<D>>, DeviceError> {
    let mut modules: Vec<StageModule<D>> = Vec::new();
    for shader in shaders.iter() {
        match device.create_shader_module(shader.spirv()) {
            Ok(module) => {
                log::trace!("Created {} shader module", shader.stage());
                modules.push(StageModule {
                    stage: shader.stage(),
                    entry: shader.entry().to_owned(),
                    module,
                })
            }
            Err(e) => {
                for stage in modules.into_iter().rev() {
                    device.destroy_shader_module(stage.module);
                }
                return Err(e);
            }
        }
    }
    Ok(modules)
}

/// Owner of the resource model and of everything bound for it.
///
/// Every reload discards the previous model before building the new one.
/// Shaders are reflected and linked first, so a broken shader set leaves
/// the previous objects alive. The engine is invalid after any failed pass
/// and reports [`ERROR_COLOR`] until a pass succeeds.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ResourceEngine<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    config: Config,
    shaders: ShaderSet,
    model: Option<ShaderModel>,
    bound: Option<Bound<D, A>>,
    valid: bool,
    pending: ReloadFlags,
}

impl<D, A> ResourceEngine<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    /// Create engine with nothing loaded.
    pub fn new(config: Config) -> Self {
        ResourceEngine {
            config,
            shaders: ShaderSet::default(),
            model: None,
            bound: None,
            valid: false,
            pending: ReloadFlags::empty(),
        }
    }

    /// Run a reload pass for the parts in `flags` and the parts they invalidate.
    ///
    /// Render pass and pipeline are built outside of the engine. They are
    /// collected in [`ResourceEngine::take_pending`] after a successful pass.
    pub fn reload(
        &mut self,
        flags: ReloadFlags,
        device: &D,
        allocator: &mut A,
        limits: &DeviceLimits,
    ) -> Result<(), Error> {
        let flags = flags.with_implied();
        log::debug!("Reload {:?}", flags);
        let result = self.reload_parts(flags, device, allocator, limits);
        self.finish(flags, result)
    }

    /// Replace the model with one reflected elsewhere.
    pub fn install(
        &mut self,
        shaders: ShaderSet,
        model: ShaderModel,
        device: &D,
        allocator: &mut A,
        limits: &DeviceLimits,
    ) -> Result<(), Error> {
        let result = self.replace_model(shaders, model, true, device, allocator, limits);
        self.finish(ReloadFlags::RELOAD_SHADERS, result)
    }

    fn finish(&mut self, flags: ReloadFlags, result: Result<(), Error>) -> Result<(), Error> {
        match &result {
            Ok(()) => {
                self.valid = self.bound.is_some();
                self.pending |= flags & (ReloadFlags::RENDER_PASS | ReloadFlags::PIPELINE);
            }
            Err(e) => {
                e.log();
                self.valid = false;
            }
        }
        result
    }

    fn reload_parts(
        &mut self,
        flags: ReloadFlags,
        device: &D,
        allocator: &mut A,
        limits: &DeviceLimits,
    ) -> Result<(), Error> {
        if flags.contains(ReloadFlags::SHADERS) {
            let shaders = self.config.source().load()?;
            let model = shaders.reflect()?;
            let validate = flags.contains(ReloadFlags::VALIDATION);
            self.replace_model(shaders, model, validate, device, allocator, limits)
        } else if flags.contains(ReloadFlags::VALIDATION) {
            match &self.model {
                Some(model) => Ok(model.link(limits)?),
                None => Err(Error::Invalid),
            }
        } else {
            Ok(())
        }
    }

    fn replace_model(
        &mut self,
        shaders: ShaderSet,
        model: ShaderModel,
        validate: bool,
        device: &D,
        allocator: &mut A,
        limits: &DeviceLimits,
    ) -> Result<(), Error> {
        if validate {
            model.link(limits)?;
        }

        device.wait_idle()?;
        unsafe { self.teardown(device, allocator) };

        let bound = Bound::create(&self.config, &shaders, &model, device, allocator, limits)?;
        log::debug!(
            "Bound {} resources and {} push constant ranges for {} stages",
            bound.binder.resources().len(),
            bound.push_constants.ranges().count(),
            bound.modules.len()
        );
        self.bound = Some(bound);
        self.model = Some(model);
        self.shaders = shaders;
        Ok(())
    }

    unsafe fn teardown(&mut self, device: &D, allocator: &mut A) {
        if let Some(bound) = self.bound.take() {
            bound.dispose(device, allocator);
        }
        self.model = None;
        self.shaders = ShaderSet::default();
    }

    /// Check if the last pass succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Color to clear the render target with.
    pub fn clear_color(&self) -> [f32; 4] {
        if self.valid {
            self.config.clear_color
        } else {
            ERROR_COLOR
        }
    }

    /// Render pass and pipeline parts invalidated since the last call.
    pub fn take_pending(&mut self) -> ReloadFlags {
        std::mem::replace(&mut self.pending, ReloadFlags::empty())
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration. Takes effect on the next reload.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Use a new camera, e.g. after a resize. Takes effect on the next reload.
    pub fn set_view(&mut self, view: ViewContext) {
        self.config.view = view;
    }

    /// Current model.
    pub fn model(&self) -> Option<&ShaderModel> {
        self.model.as_ref()
    }

    /// Shaders of the current model.
    pub fn shaders(&self) -> &ShaderSet {
        &self.shaders
    }

    /// Inputs for pipeline construction. `None` while invalid.
    pub fn pipeline_inputs(&self) -> Option<PipelineInputs<'_, D, A>> {
        if !self.valid {
            return None;
        }
        let bound = self.bound.as_ref()?;
        let model = self.model.as_ref()?;
        Some(PipelineInputs {
            set_layouts: bound.binder.layouts().collect(),
            sets: bound.binder.sets(),
            push_constant_ranges: bound.push_constants.ranges().cloned().collect(),
            resources: bound.binder.resources(),
            push_constants: &bound.push_constants,
            input_attributes: model.input_attributes(),
            stages: &bound.modules,
        })
    }

    fn bound(&self) -> Result<&Bound<D, A>, Error> {
        self.bound.as_ref().ok_or(Error::Invalid)
    }

    fn bound_mut(&mut self) -> Result<&mut Bound<D, A>, Error> {
        self.bound.as_mut().ok_or(Error::Invalid)
    }

    /// Copy `bytes` into the buffer bound at the location.
    pub fn write_buffer(
        &self,
        allocator: &mut A,
        set: u32,
        binding: u32,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), Error> {
        self.bound()?
            .binder
            .write_buffer(allocator, set, binding, offset, bytes)?;
        Ok(())
    }

    /// Replace the image bound at the location.
    pub fn replace_image(
        &mut self,
        device: &D,
        allocator: &mut A,
        set: u32,
        binding: u32,
        info: &ImageInfo,
        pixels: &[u8],
    ) -> Result<(), Error> {
        self.bound_mut()?
            .binder
            .replace_image(device, allocator, set, binding, info, pixels)?;
        Ok(())
    }

    /// Overwrite push constant data of the stage.
    pub fn write_push_constants(
        &mut self,
        stage: ShaderStage,
        offset: u32,
        bytes: &[u8],
    ) -> Result<(), Error> {
        self.bound_mut()?.push_constants.write(stage, offset, bytes)?;
        Ok(())
    }

    /// Record push constants of every stage.
    pub fn record_push_constants(&self, sink: &mut impl PushConstantSink) -> Result<(), Error> {
        self.bound()?.push_constants.record(sink);
        Ok(())
    }

    /// Release every native object.
    ///
    /// # Safety
    ///
    /// The device must not use any of the objects anymore.
    pub unsafe fn dispose(mut self, device: &D, allocator: &mut A) {
        self.teardown(device, allocator);
    }
}
