use prism_core::{DeviceLimits, ShaderStageFlags};
use prism_memory::{write_bytes, Allocation, Allocator, BufferUsage, ImageInfo, ImageUsage};
use prism_shader::{reflect::ResourceCategory, DescriptorLayoutMap, SpvResource};
use smallvec::SmallVec;

use crate::{
    device::{Descriptor, DescriptorWrite, Device},
    error::{BindError, LimitKind},
    layout::{DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorType},
    ranges::PoolSizes,
};

/// Native objects backing one descriptor.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub enum Backing<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    /// Uniform or storage buffer.
    Buffer(Allocation<D::Buffer, A::Memory>),

    /// Image with its view. Sampled images have a sampler.
    Image {
        /// Image allocation.
        allocation: Allocation<D::Image, A::Memory>,
        /// Creation info.
        info: ImageInfo,
        /// View of the whole image.
        view: D::ImageView,
        /// Sampler for sampled images.
        sampler: Option<D::Sampler>,
    },
}

impl<D, A> Backing<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    unsafe fn dispose(self, device: &D, allocator: &mut A) {
        match self {
            Backing::Buffer(allocation) => allocator.deallocate_buffer(allocation),
            Backing::Image {
                allocation,
                view,
                sampler,
                ..
            } => {
                if let Some(sampler) = sampler {
                    device.destroy_sampler(sampler);
                }
                device.destroy_image_view(view);
                allocator.deallocate_image(allocation);
            }
        }
    }
}

/// Reflected resource with the objects bound for it.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct BoundResource<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    set: u32,
    binding: u32,
    resource: SpvResource,
    ty: DescriptorType,
    backing: Backing<D, A>,
}

impl<D, A> BoundResource<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    /// Set index.
    pub fn set(&self) -> u32 {
        self.set
    }

    /// Binding index.
    pub fn binding(&self) -> u32 {
        self.binding
    }

    /// Reflected resource.
    pub fn resource(&self) -> &SpvResource {
        &self.resource
    }

    /// Descriptor type.
    pub fn descriptor_type(&self) -> DescriptorType {
        self.ty
    }

    /// Backing objects.
    pub fn backing(&self) -> &Backing<D, A> {
        &self.backing
    }

    fn layout_binding(&self) -> DescriptorSetLayoutBinding {
        DescriptorSetLayoutBinding {
            binding: self.binding,
            ty: self.ty,
            count: 1,
            stage_flags: self.resource.stage_flags(),
        }
    }

    fn descriptor(&self) -> Descriptor<'_, D> {
        match &self.backing {
            Backing::Buffer(allocation) => {
                let range = 0..allocation.size();
                match self.ty {
                    DescriptorType::StorageBuffer => {
                        Descriptor::StorageBuffer(allocation.raw(), range)
                    }
                    _ => Descriptor::UniformBuffer(allocation.raw(), range),
                }
            }
            Backing::Image {
                view,
                sampler: Some(sampler),
                ..
            } => Descriptor::CombinedImageSampler(sampler, view),
            Backing::Image { view, .. } => Descriptor::StorageImage(view),
        }
    }
}

/// Counts checked against device limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct DescriptorCounts {
    sets: u32,
    uniform_buffers: u32,
    storage_buffers: u32,
    sampled_images: u32,
    storage_images: u32,
}

impl DescriptorCounts {
    fn validate(&self, limits: &DeviceLimits) -> Result<(), BindError> {
        let checks = [
            (
                LimitKind::BoundDescriptorSets,
                self.sets,
                limits.max_bound_descriptor_sets,
            ),
            (
                LimitKind::Samplers,
                self.sampled_images,
                limits.max_per_stage_descriptor_samplers,
            ),
            (
                LimitKind::UniformBuffers,
                self.uniform_buffers,
                limits.max_descriptor_set_uniform_buffers,
            ),
            (
                LimitKind::StorageBuffers,
                self.storage_buffers,
                limits.max_descriptor_set_storage_buffers,
            ),
            (
                LimitKind::SampledImages,
                self.sampled_images,
                limits.max_descriptor_set_sampled_images,
            ),
            (
                LimitKind::StorageImages,
                self.storage_images,
                limits.max_descriptor_set_storage_images,
            ),
        ];

        for &(kind, count, limit) in &checks {
            if count > limit {
                return Err(BindError::LimitExceeded { kind, count, limit });
            }
        }
        Ok(())
    }
}

/// Every set index from 0 up to the highest declared one.
fn dense_set_indices(layout: &DescriptorLayoutMap) -> SmallVec<[u32; 8]> {
    match layout.set_indices().last() {
        Some(&last) => (0..=last).collect(),
        None => SmallVec::new(),
    }
}

/// Creates an image, uploads its pixels and creates its view and sampler.
/// Releases whatever it created when a step fails.
unsafe fn create_image<D, A>(
    device: &D,
    allocator: &mut A,
    info: &ImageInfo,
    pixels: &[u8],
    name: &str,
    sampled: bool,
) -> Result<Backing<D, A>, BindError>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    let allocation = allocator
        .allocate_image(info, name)
        .map_err(|e| BindError::Allocation(name.to_owned(), e))?;

    if let Err(e) = allocator.transfer_image_memory(&allocation, info, pixels) {
        allocator.deallocate_image(allocation);
        return Err(BindError::Transfer(name.to_owned(), e));
    }

    let view = match device.create_image_view(allocation.raw(), info) {
        Ok(view) => view,
        Err(e) => {
            allocator.deallocate_image(allocation);
            return Err(e.into());
        }
    };

    let sampler = if sampled {
        match device.create_sampler() {
            Ok(sampler) => Some(sampler),
            Err(e) => {
                device.destroy_image_view(view);
                allocator.deallocate_image(allocation);
                return Err(e.into());
            }
        }
    } else {
        None
    };

    log::trace!("Created image '{}' {:?}", name, info);
    Ok(Backing::Image {
        allocation,
        info: *info,
        view,
        sampler,
    })
}

/// Descriptor sets, their layouts and the resources bound to them.
///
/// Layouts and sets are ordered: shader sets from 0 up to the highest
/// declared index, then the built-in sets. Position in that list is the
/// set index. Indices no shader declares get an empty layout.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DescriptorBinder<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    set_indices: SmallVec<[u32; 8]>,
    layouts: Vec<DescriptorSetLayout<D>>,
    pool: Option<D::DescriptorPool>,
    sets: Vec<D::DescriptorSet>,
    resources: Vec<BoundResource<D, A>>,
    pool_sizes: PoolSizes,
    relevant: relevant::Relevant,
}

impl<D, A> DescriptorBinder<D, A>
where
    D: Device,
    A: Allocator<Buffer = D::Buffer, Image = D::Image>,
{
    /// Create backing resources, layouts, pool and sets for the merged descriptors
    /// and write every descriptor.
    ///
    /// `builtins` are layouts of sets reserved by the application. Their sets
    /// are allocated after the shader sets but not written.
    /// Images are created with `placeholder` info and filled with `fill` color.
    ///
    /// On failure everything created so far is released.
    pub fn bind(
        device: &D,
        allocator: &mut A,
        layout: &DescriptorLayoutMap,
        builtins: &[Vec<DescriptorSetLayoutBinding>],
        placeholder: &ImageInfo,
        fill: [u8; 4],
        limits: &DeviceLimits,
    ) -> Result<Self, BindError> {
        let mut binder = DescriptorBinder {
            set_indices: dense_set_indices(layout),
            layouts: Vec::new(),
            pool: None,
            sets: Vec::new(),
            resources: Vec::new(),
            pool_sizes: PoolSizes::from_layout_map(layout),
            relevant: relevant::Relevant,
        };

        let built =
            unsafe { binder.build(device, allocator, layout, builtins, placeholder, fill, limits) };
        match built {
            Ok(()) => {
                log::debug!(
                    "Bound {} descriptors in {} sets ({} built-in)",
                    binder.resources.len(),
                    binder.sets.len(),
                    builtins.len()
                );
                Ok(binder)
            }
            Err(e) => {
                unsafe { binder.dispose(device, allocator) };
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn build(
        &mut self,
        device: &D,
        allocator: &mut A,
        layout: &DescriptorLayoutMap,
        builtins: &[Vec<DescriptorSetLayoutBinding>],
        placeholder: &ImageInfo,
        fill: [u8; 4],
        limits: &DeviceLimits,
    ) -> Result<(), BindError> {
        let mut counts = DescriptorCounts {
            sets: (self.set_indices.len() + builtins.len()) as u32,
            ..DescriptorCounts::default()
        };

        let pixels = placeholder.solid(fill);
        for ((set, binding), resource) in layout.iter() {
            let category = match resource.category() {
                Some(category) => category,
                None => continue,
            };
            let ty = match DescriptorType::for_resource(resource) {
                Some(ty) => ty,
                None => continue,
            };

            let backing = match category {
                ResourceCategory::UniformBuffer | ResourceCategory::StorageBuffer => {
                    let (usage, counter) = if category == ResourceCategory::UniformBuffer {
                        (BufferUsage::UNIFORM, &mut counts.uniform_buffers)
                    } else {
                        (BufferUsage::STORAGE, &mut counts.storage_buffers)
                    };
                    *counter += 1;
                    let size = u64::from(resource.ty.size().max(1));
                    let allocation = allocator
                        .allocate_buffer(size, usage, &resource.name)
                        .map_err(|e| BindError::Allocation(resource.name.clone(), e))?;
                    log::trace!("Created buffer '{}' of {} bytes", resource.name, size);
                    Backing::Buffer(allocation)
                }
                ResourceCategory::SampledImage => {
                    counts.sampled_images += 1;
                    create_image(device, allocator, placeholder, &pixels, &resource.name, true)?
                }
                ResourceCategory::StorageImage => {
                    counts.storage_images += 1;
                    let info = ImageInfo {
                        usage: placeholder.usage | ImageUsage::STORAGE,
                        ..*placeholder
                    };
                    create_image(device, allocator, &info, &pixels, &resource.name, false)?
                }
            };

            self.resources.push(BoundResource {
                set,
                binding,
                resource: resource.clone(),
                ty,
                backing,
            });
        }

        counts.validate(limits)?;

        for &set in &self.set_indices {
            let bindings: Vec<_> = self
                .resources
                .iter()
                .filter(|bound| bound.set == set)
                .map(BoundResource::layout_binding)
                .collect();
            if bindings.is_empty() {
                log::trace!("Set {} is not declared, using an empty layout", set);
            }
            self.layouts.push(DescriptorSetLayout::create(device, bindings)?);
        }
        for bindings in builtins {
            self.layouts
                .push(DescriptorSetLayout::create(device, bindings.clone())?);
        }

        let max_sets =
            self.pool_sizes.total().max(self.set_indices.len() as u32) + builtins.len() as u32;
        let sizes = self.pool_sizes.with_bindings(builtins.iter().flatten());
        log::trace!("Creating descriptor pool for {} sets: {:?}", max_sets, sizes);
        let pool = self
            .pool
            .get_or_insert(device.create_descriptor_pool(max_sets, &sizes)?);

        let layouts: Vec<_> = self.layouts.iter().map(DescriptorSetLayout::raw).collect();
        self.sets = device.allocate_descriptor_sets(pool, &layouts)?;
        prism_core::prism_slow_assert_eq!(self.sets.len(), self.layouts.len());

        let writes = self
            .resources
            .iter()
            .map(|bound| {
                Ok(DescriptorWrite {
                    set: self.shader_set(bound.set)?,
                    binding: bound.binding,
                    descriptor: bound.descriptor(),
                })
            })
            .collect::<Result<Vec<_>, BindError>>()?;
        device.update_descriptor_sets(&writes);

        Ok(())
    }

    fn shader_set(&self, set: u32) -> Result<&D::DescriptorSet, BindError> {
        self.set_indices
            .iter()
            .position(|&index| index == set)
            .and_then(|position| self.sets.get(position))
            .ok_or(BindError::UnknownBinding { set, binding: 0 })
    }

    fn find(&self, set: u32, binding: u32) -> Result<usize, BindError> {
        self.resources
            .iter()
            .position(|bound| bound.set == set && bound.binding == binding)
            .ok_or(BindError::UnknownBinding { set, binding })
    }

    /// Set layouts in binding order.
    pub fn layouts(&self) -> impl Iterator<Item = &D::DescriptorSetLayout> {
        self.layouts.iter().map(DescriptorSetLayout::raw)
    }

    /// Layout bindings of every layout in binding order.
    pub fn layout_bindings(&self) -> impl Iterator<Item = &[DescriptorSetLayoutBinding]> {
        self.layouts.iter().map(DescriptorSetLayout::bindings)
    }

    /// Descriptor sets in binding order.
    pub fn sets(&self) -> &[D::DescriptorSet] {
        &self.sets
    }

    /// Shader set indices, `0` up to the highest declared set.
    pub fn set_indices(&self) -> &[u32] {
        &self.set_indices
    }

    /// Sets reserved for the application, in the order their layouts were given.
    pub fn builtin_sets(&self) -> &[D::DescriptorSet] {
        let start = self.set_indices.len().min(self.sets.len());
        &self.sets[start..]
    }

    /// Pool counters the pool was sized with.
    pub fn pool_sizes(&self) -> &PoolSizes {
        &self.pool_sizes
    }

    /// Bound resources ascending by `(set, binding)`.
    pub fn resources(&self) -> &[BoundResource<D, A>] {
        &self.resources
    }

    /// Resource bound at the location.
    pub fn get(&self, set: u32, binding: u32) -> Option<&BoundResource<D, A>> {
        self.find(set, binding).ok().map(|index| &self.resources[index])
    }

    /// Stages that access any descriptor.
    pub fn stage_flags(&self) -> ShaderStageFlags {
        self.resources
            .iter()
            .fold(ShaderStageFlags::empty(), |flags, bound| {
                flags | bound.resource.stage_flags()
            })
    }

    /// Copy `bytes` into the buffer bound at the location.
    pub fn write_buffer(
        &self,
        allocator: &mut A,
        set: u32,
        binding: u32,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), BindError> {
        match &self.resources[self.find(set, binding)?].backing {
            Backing::Buffer(allocation) => {
                write_bytes(allocator, allocation, offset, bytes)?;
                Ok(())
            }
            Backing::Image { .. } => Err(BindError::WrongKind {
                set,
                binding,
                expected: "a buffer",
            }),
        }
    }

    /// Replace the image bound at the location and rewrite its descriptor.
    /// Layouts and sets stay as they are.
    pub fn replace_image(
        &mut self,
        device: &D,
        allocator: &mut A,
        set: u32,
        binding: u32,
        info: &ImageInfo,
        pixels: &[u8],
    ) -> Result<(), BindError> {
        let index = self.find(set, binding)?;
        let (usage, sampled) = match &self.resources[index].backing {
            Backing::Image {
                info: old, sampler, ..
            } => (old.usage, sampler.is_some()),
            Backing::Buffer(_) => {
                return Err(BindError::WrongKind {
                    set,
                    binding,
                    expected: "an image",
                })
            }
        };

        device.wait_idle()?;

        let info = ImageInfo {
            usage: info.usage | usage,
            ..*info
        };
        let name = self.resources[index].resource.name.clone();
        let backing = unsafe { create_image(device, allocator, &info, pixels, &name, sampled)? };
        let old = std::mem::replace(&mut self.resources[index].backing, backing);

        let bound = &self.resources[index];
        let write = DescriptorWrite {
            set: self.shader_set(set)?,
            binding,
            descriptor: bound.descriptor(),
        };
        unsafe {
            device.update_descriptor_sets(&[write]);
            old.dispose(device, allocator);
        }
        log::debug!("Replaced image at set {} binding {}", set, binding);
        Ok(())
    }

    /// Release every object in reverse creation order.
    ///
    /// # Safety
    ///
    /// The device must not use any of the objects anymore.
    pub unsafe fn dispose(self, device: &D, allocator: &mut A) {
        self.relevant.dispose();

        if let Some(pool) = self.pool {
            device.destroy_descriptor_pool(pool);
        }

        for layout in self.layouts.into_iter().rev() {
            layout.dispose(device);
        }

        for bound in self.resources.into_iter().rev() {
            bound.backing.dispose(device, allocator);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::MockDevice;
    use prism_core::{Leveled, Severity, ShaderStage, StageMap};
    use prism_memory::test::MockAllocator;
    use prism_shader::{
        classify,
        reflect::{BaseKind, BindingDeclaration, BindingKind, ImageTraits, TypeDescription},
        ShaderInterface,
    };

    fn uniform(set: u32, binding: u32, size: u32) -> BindingDeclaration {
        BindingDeclaration {
            name: format!("ubo{}_{}", set, binding),
            set,
            binding,
            kind: BindingKind::UniformBuffer,
            ty: TypeDescription::structure(
                vec![TypeDescription::vector(BaseKind::Float, 4).with_name("v")],
                size,
            ),
        }
    }

    fn image(set: u32, binding: u32, kind: BindingKind) -> BindingDeclaration {
        BindingDeclaration {
            name: format!("img{}_{}", set, binding),
            set,
            binding,
            kind,
            ty: TypeDescription::image(BaseKind::Image, ImageTraits::default()),
        }
    }

    fn layout(
        vertex: Vec<BindingDeclaration>,
        fragment: Vec<BindingDeclaration>,
    ) -> DescriptorLayoutMap {
        let mut stages = StageMap::new();
        let mut vs = ShaderInterface::new(ShaderStage::Vertex);
        vs.bindings = vertex;
        stages.insert(ShaderStage::Vertex, classify(&vs).unwrap());
        let mut fs = ShaderInterface::new(ShaderStage::Fragment);
        fs.bindings = fragment;
        stages.insert(ShaderStage::Fragment, classify(&fs).unwrap());
        DescriptorLayoutMap::merge(&stages).unwrap()
    }

    fn placeholder() -> ImageInfo {
        ImageInfo {
            width: 4,
            height: 4,
            ..ImageInfo::default()
        }
    }

    fn bind(
        device: &MockDevice,
        allocator: &mut MockAllocator,
        layout: &DescriptorLayoutMap,
        builtins: &[Vec<DescriptorSetLayoutBinding>],
        limits: &DeviceLimits,
    ) -> Result<DescriptorBinder<MockDevice, MockAllocator>, BindError> {
        DescriptorBinder::bind(
            device,
            allocator,
            layout,
            builtins,
            &placeholder(),
            [255, 0, 255, 255],
            limits,
        )
    }

    #[test]
    fn binds_every_resource() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(
            vec![uniform(0, 0, 64)],
            vec![
                uniform(0, 0, 64),
                image(1, 0, BindingKind::CombinedImageSampler),
                image(1, 2, BindingKind::StorageImage),
                uniform(0, 1, 16),
            ],
        );
        let builtin = vec![DescriptorSetLayoutBinding {
            binding: 0,
            ty: DescriptorType::UniformBuffer,
            count: 1,
            stage_flags: ShaderStageFlags::ALL_GRAPHICS,
        }];

        let binder = bind(
            &device,
            &mut allocator,
            &map,
            &[builtin],
            &DeviceLimits::default(),
        )
        .unwrap();

        assert_eq!(binder.set_indices(), &[0, 1]);
        assert_eq!(binder.sets().len(), 3);
        assert_eq!(binder.builtin_sets().len(), 1);
        assert_eq!(device.live_layouts(), 3);
        assert_eq!(allocator.live_buffers(), 2);
        assert_eq!(allocator.live_images(), 2);
        assert_eq!(allocator.transfers().len(), 2);
        assert_eq!(device.live_samplers(), 1);
        assert_eq!(device.live_views(), 2);

        let set0 = device.layout_bindings(binder.layouts().next().unwrap());
        assert_eq!(set0.len(), 2);
        assert_eq!(
            set0[0].stage_flags,
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
        );
        let set1 = device.layout_bindings(binder.layouts().nth(1).unwrap());
        assert_eq!(
            set1.iter().map(|b| (b.binding, b.ty)).collect::<Vec<_>>(),
            vec![
                (0, DescriptorType::CombinedImageSampler),
                (2, DescriptorType::StorageImage)
            ]
        );

        assert_eq!(device.update_calls(), 1);
        let writes = device.writes();
        assert_eq!(writes.len(), 4);
        assert!(writes
            .iter()
            .all(|w| w.set.layout != *binder.layouts().nth(2).unwrap()));

        let (max_sets, sizes) = device.pools().remove(0);
        assert_eq!(max_sets, binder.pool_sizes().total() + 1);
        assert_eq!(sizes[0].ty, DescriptorType::UniformBuffer);
        assert_eq!(sizes[0].count, 1 + 2 + 1);

        unsafe { binder.dispose(&device, &mut allocator) };
        assert_eq!(device.live(), 0);
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn buffers_have_at_least_one_byte() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(vec![uniform(0, 0, 0)], vec![]);
        let binder = bind(&device, &mut allocator, &map, &[], &DeviceLimits::default()).unwrap();
        match binder.get(0, 0).unwrap().backing() {
            Backing::Buffer(allocation) => assert_eq!(allocation.size(), 1),
            other => panic!("Unexpected backing {:?}", other),
        }
        unsafe { binder.dispose(&device, &mut allocator) };
    }

    #[test]
    fn limit_violation_releases_everything() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(
            vec![uniform(0, 0, 16), uniform(0, 1, 16), uniform(0, 2, 16)],
            vec![image(0, 3, BindingKind::CombinedImageSampler)],
        );
        let limits = DeviceLimits {
            max_descriptor_set_uniform_buffers: 2,
            ..DeviceLimits::default()
        };

        let err = bind(&device, &mut allocator, &map, &[], &limits).unwrap_err();
        assert_eq!(
            err,
            BindError::LimitExceeded {
                kind: LimitKind::UniformBuffers,
                count: 3,
                limit: 2,
            }
        );
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(allocator.live(), 0);
        assert_eq!(device.live(), 0);
    }

    #[test]
    fn too_many_sets() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(vec![uniform(0, 0, 16), uniform(1, 0, 16)], vec![]);
        let limits = DeviceLimits {
            max_bound_descriptor_sets: 2,
            ..DeviceLimits::default()
        };
        let builtins = vec![Vec::new()];
        match bind(&device, &mut allocator, &map, &builtins, &limits) {
            Err(BindError::LimitExceeded {
                kind: LimitKind::BoundDescriptorSets,
                count: 3,
                limit: 2,
            }) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn sparse_sets_keep_their_positions() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(vec![uniform(0, 0, 16)], vec![uniform(2, 1, 16)]);
        let builtin = vec![DescriptorSetLayoutBinding {
            binding: 0,
            ty: DescriptorType::UniformBuffer,
            count: 1,
            stage_flags: ShaderStageFlags::ALL_GRAPHICS,
        }];

        let binder = bind(
            &device,
            &mut allocator,
            &map,
            &[builtin],
            &DeviceLimits::default(),
        )
        .unwrap();

        assert_eq!(binder.set_indices(), &[0, 1, 2]);
        assert_eq!(binder.sets().len(), 4);
        assert_eq!(binder.builtin_sets().len(), 1);
        let bindings: Vec<_> = binder.layout_bindings().map(<[_]>::len).collect();
        assert_eq!(bindings, vec![1, 0, 1, 1]);

        let set2 = binder.layouts().nth(2).unwrap();
        let writes = device.writes();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().any(|w| w.set.layout == *set2 && w.binding == 1));

        unsafe { binder.dispose(&device, &mut allocator) };
        assert_eq!(device.live(), 0);
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn sparse_sets_count_up_to_highest_index() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(vec![uniform(0, 0, 16), uniform(2, 0, 16)], vec![]);
        let limits = DeviceLimits {
            max_bound_descriptor_sets: 2,
            ..DeviceLimits::default()
        };
        match bind(&device, &mut allocator, &map, &[], &limits) {
            Err(BindError::LimitExceeded {
                kind: LimitKind::BoundDescriptorSets,
                count: 3,
                limit: 2,
            }) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn layout_failure_destroys_earlier_layouts() {
        let device = MockDevice::new().fail_layout_after(1);
        let mut allocator = MockAllocator::new();
        let map = layout(vec![uniform(0, 0, 16), uniform(1, 0, 16)], vec![]);

        let err = bind(&device, &mut allocator, &map, &[], &DeviceLimits::default()).unwrap_err();
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(device.live_layouts(), 0);
        assert_eq!(device.live(), 0);
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn pool_failure_releases_everything() {
        let device = MockDevice::new().fail_pool();
        let mut allocator = MockAllocator::new();
        let map = layout(vec![], vec![image(0, 0, BindingKind::SampledImage)]);

        assert!(bind(&device, &mut allocator, &map, &[], &DeviceLimits::default()).is_err());
        assert_eq!(device.live(), 0);
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn allocation_failure_releases_earlier_allocations() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new().fail_after(2);
        let map = layout(
            vec![uniform(0, 0, 16), uniform(0, 1, 16)],
            vec![image(0, 2, BindingKind::CombinedImageSampler)],
        );

        match bind(&device, &mut allocator, &map, &[], &DeviceLimits::default()) {
            Err(BindError::Allocation(name, _)) => assert_eq!(name, "img0_2"),
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(allocator.live(), 0);
        assert_eq!(device.live(), 0);
    }

    #[test]
    fn write_buffer_and_replace_image() {
        let device = MockDevice::new();
        let mut allocator = MockAllocator::new();
        let map = layout(
            vec![uniform(0, 0, 16)],
            vec![image(0, 1, BindingKind::CombinedImageSampler)],
        );
        let mut binder =
            bind(&device, &mut allocator, &map, &[], &DeviceLimits::default()).unwrap();

        binder
            .write_buffer(&mut allocator, 0, 0, 4, &[1, 2, 3, 4])
            .unwrap();
        match binder.get(0, 0).unwrap().backing() {
            Backing::Buffer(allocation) => {
                assert_eq!(&allocator.contents(allocation.memory())[..8], &[0, 0, 0, 0, 1, 2, 3, 4])
            }
            other => panic!("Unexpected backing {:?}", other),
        }
        assert_eq!(allocator.mapped(), 0);

        assert_eq!(
            binder.write_buffer(&mut allocator, 0, 1, 0, &[0]),
            Err(BindError::WrongKind {
                set: 0,
                binding: 1,
                expected: "a buffer"
            })
        );
        assert_eq!(
            binder
                .write_buffer(&mut allocator, 3, 0, 0, &[0])
                .unwrap_err()
                .severity(),
            Severity::Warning
        );

        let info = ImageInfo {
            width: 2,
            height: 2,
            ..ImageInfo::default()
        };
        binder
            .replace_image(&device, &mut allocator, 0, 1, &info, &info.solid([0; 4]))
            .unwrap();
        assert_eq!(device.idle_waits(), 1);
        assert_eq!(device.update_calls(), 2);
        assert_eq!(allocator.live_images(), 1);
        assert_eq!(device.live_samplers(), 1);
        assert_eq!(device.live_layouts(), 1);

        unsafe { binder.dispose(&device, &mut allocator) };
        assert_eq!(device.live(), 0);
        assert_eq!(allocator.live(), 0);
    }
}
