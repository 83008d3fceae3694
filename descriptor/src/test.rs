//! Host-only device for tests.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use prism_memory::{
    test::{MockBuffer, MockImage},
    ImageInfo, OutOfMemoryError,
};

use crate::{
    device::{DescriptorWrite, Device},
    error::DeviceError,
    layout::{DescriptorPoolSize, DescriptorSetLayoutBinding, DescriptorType},
};

/// Layout handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockLayout(pub u64);

/// Pool handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockPool(pub u64);

/// Set handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockSet {
    /// Set id.
    pub id: u64,
    /// Layout the set was allocated with.
    pub layout: MockLayout,
}

/// Image view handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockView(pub u64);

/// Sampler handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockSampler(pub u64);

/// Shader module handle of [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockModule(pub u64);

/// Descriptor write recorded by [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MockWrite {
    /// Target set.
    pub set: MockSet,
    /// Target binding.
    pub binding: u32,
    /// Written descriptor type.
    pub ty: DescriptorType,
}

#[derive(Debug, Default)]
struct State {
    next: u64,
    layouts: HashMap<u64, Vec<DescriptorSetLayoutBinding>>,
    layouts_created: usize,
    pools: HashMap<u64, (u32, Vec<DescriptorPoolSize>)>,
    sets: HashMap<u64, u64>,
    views: HashSet<u64>,
    samplers: HashSet<u64>,
    modules: HashSet<u64>,
    writes: Vec<MockWrite>,
    update_calls: usize,
    idle_waits: usize,
    fail_layout_after: Option<usize>,
    fail_pool: bool,
}

impl State {
    fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Device that records every call and counts live objects.
#[derive(Debug, Default)]
pub struct MockDevice {
    state: RefCell<State>,
}

impl MockDevice {
    /// Create device that never fails.
    pub fn new() -> Self {
        MockDevice::default()
    }

    /// Make layout creation fail after `count` successful ones.
    pub fn fail_layout_after(self, count: usize) -> Self {
        self.state.borrow_mut().fail_layout_after = Some(count);
        self
    }

    /// Make pool creation fail.
    pub fn fail_pool(self) -> Self {
        self.state.borrow_mut().fail_pool = true;
        self
    }

    /// Number of live layouts.
    pub fn live_layouts(&self) -> usize {
        self.state.borrow().layouts.len()
    }

    /// Number of live pools.
    pub fn live_pools(&self) -> usize {
        self.state.borrow().pools.len()
    }

    /// Number of live sets.
    pub fn live_sets(&self) -> usize {
        self.state.borrow().sets.len()
    }

    /// Number of live image views.
    pub fn live_views(&self) -> usize {
        self.state.borrow().views.len()
    }

    /// Number of live samplers.
    pub fn live_samplers(&self) -> usize {
        self.state.borrow().samplers.len()
    }

    /// Number of live shader modules.
    pub fn live_modules(&self) -> usize {
        self.state.borrow().modules.len()
    }

    /// Number of live objects of any kind.
    pub fn live(&self) -> usize {
        let state = self.state.borrow();
        state.layouts.len()
            + state.pools.len()
            + state.sets.len()
            + state.views.len()
            + state.samplers.len()
            + state.modules.len()
    }

    /// Bindings a live layout was created with.
    pub fn layout_bindings(&self, layout: &MockLayout) -> Vec<DescriptorSetLayoutBinding> {
        self.state.borrow().layouts[&layout.0].clone()
    }

    /// `max_sets` and sizes of a live pool.
    pub fn pool_info(&self, pool: &MockPool) -> (u32, Vec<DescriptorPoolSize>) {
        self.state.borrow().pools[&pool.0].clone()
    }

    /// Info of every live pool.
    pub fn pools(&self) -> Vec<(u32, Vec<DescriptorPoolSize>)> {
        self.state.borrow().pools.values().cloned().collect()
    }

    /// Descriptor writes recorded so far.
    pub fn writes(&self) -> Vec<MockWrite> {
        self.state.borrow().writes.clone()
    }

    /// Number of batched update calls.
    pub fn update_calls(&self) -> usize {
        self.state.borrow().update_calls
    }

    /// Number of idle waits.
    pub fn idle_waits(&self) -> usize {
        self.state.borrow().idle_waits
    }
}

impl Device for MockDevice {
    type Buffer = MockBuffer;
    type Image = MockImage;
    type ImageView = MockView;
    type Sampler = MockSampler;
    type DescriptorSetLayout = MockLayout;
    type DescriptorPool = MockPool;
    type DescriptorSet = MockSet;
    type ShaderModule = MockModule;

    unsafe fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<MockLayout, DeviceError> {
        let mut state = self.state.borrow_mut();
        if let Some(limit) = state.fail_layout_after {
            if state.layouts_created >= limit {
                return Err(OutOfMemoryError::OutOfHostMemory.into());
            }
        }
        state.layouts_created += 1;
        let id = state.next_id();
        state.layouts.insert(id, bindings.to_vec());
        Ok(MockLayout(id))
    }

    unsafe fn destroy_descriptor_set_layout(&self, layout: MockLayout) {
        assert!(
            self.state.borrow_mut().layouts.remove(&layout.0).is_some(),
            "Double-free"
        );
    }

    unsafe fn create_descriptor_pool(
        &self,
        max_sets: u32,
        sizes: &[DescriptorPoolSize],
    ) -> Result<MockPool, DeviceError> {
        let mut state = self.state.borrow_mut();
        if state.fail_pool {
            return Err(DeviceError::Failed(
                "vkCreateDescriptorPool",
                "injected failure".into(),
            ));
        }
        let id = state.next_id();
        state.pools.insert(id, (max_sets, sizes.to_vec()));
        Ok(MockPool(id))
    }

    unsafe fn destroy_descriptor_pool(&self, pool: MockPool) {
        let mut state = self.state.borrow_mut();
        assert!(state.pools.remove(&pool.0).is_some(), "Double-free");
        state.sets.retain(|_, owner| *owner != pool.0);
    }

    unsafe fn allocate_descriptor_sets(
        &self,
        pool: &mut MockPool,
        layouts: &[&MockLayout],
    ) -> Result<Vec<MockSet>, DeviceError> {
        let mut state = self.state.borrow_mut();
        let max_sets = state.pools[&pool.0].0;
        let allocated = state.sets.values().filter(|&&owner| owner == pool.0).count();
        if allocated + layouts.len() > max_sets as usize {
            return Err(DeviceError::Failed(
                "vkAllocateDescriptorSets",
                "pool exhausted".into(),
            ));
        }

        Ok(layouts
            .iter()
            .map(|&&layout| {
                assert!(state.layouts.contains_key(&layout.0), "Use after free");
                let id = state.next_id();
                state.sets.insert(id, pool.0);
                MockSet { id, layout }
            })
            .collect())
    }

    unsafe fn update_descriptor_sets(&self, writes: &[DescriptorWrite<'_, Self>]) {
        let mut state = self.state.borrow_mut();
        state.update_calls += 1;
        for write in writes {
            assert!(state.sets.contains_key(&write.set.id), "Use after free");
            state.writes.push(MockWrite {
                set: *write.set,
                binding: write.binding,
                ty: write.descriptor.descriptor_type(),
            });
        }
    }

    unsafe fn create_image_view(
        &self,
        _image: &MockImage,
        _info: &ImageInfo,
    ) -> Result<MockView, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.views.insert(id);
        Ok(MockView(id))
    }

    unsafe fn destroy_image_view(&self, view: MockView) {
        assert!(self.state.borrow_mut().views.remove(&view.0), "Double-free");
    }

    unsafe fn create_sampler(&self) -> Result<MockSampler, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.samplers.insert(id);
        Ok(MockSampler(id))
    }

    unsafe fn destroy_sampler(&self, sampler: MockSampler) {
        assert!(
            self.state.borrow_mut().samplers.remove(&sampler.0),
            "Double-free"
        );
    }

    unsafe fn create_shader_module(&self, spirv: &[u32]) -> Result<MockModule, DeviceError> {
        if spirv.is_empty() {
            return Err(DeviceError::Failed(
                "vkCreateShaderModule",
                "empty code".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        state.modules.insert(id);
        Ok(MockModule(id))
    }

    unsafe fn destroy_shader_module(&self, module: MockModule) {
        assert!(
            self.state.borrow_mut().modules.remove(&module.0),
            "Double-free"
        );
    }

    fn wait_idle(&self) -> Result<(), DeviceError> {
        self.state.borrow_mut().idle_waits += 1;
        Ok(())
    }
}
