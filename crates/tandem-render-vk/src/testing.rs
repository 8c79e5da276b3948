// SPDX-License-Identifier: CEPL-1.0
//! Recording [`DeviceApi`] used by the unit tests.
//!
//! Hands out sequential handles, backs mapped memory with host allocations and
//! models fence completion: submitted work "finishes" only when the host waits
//! on its fence or idles the device. Host writes to command buffers whose last
//! submission is still pending are collected as violations.
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::c_void;
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::api::{DeviceApi, PresentRequest, RenderPassBegin, SubmitRequest};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    DeviceWaitIdle,
    CreateSemaphore(vk::Semaphore),
    DestroySemaphore(vk::Semaphore),
    CreateFence(vk::Fence),
    DestroyFence(vk::Fence),
    WaitForFence(vk::Fence),
    ResetFence(vk::Fence),
    AcquireNextImage(vk::Semaphore, u32),
    DestroySwapchain(vk::SwapchainKHR),
    QueueSubmit(SubmitRequest),
    QueuePresent(PresentRequest),
    CreateBuffer(vk::Buffer),
    DestroyBuffer(vk::Buffer),
    BindBufferMemory(vk::Buffer, vk::DeviceMemory),
    AllocateMemory(vk::DeviceMemory),
    FreeMemory(vk::DeviceMemory),
    MapMemory(vk::DeviceMemory),
    UnmapMemory(vk::DeviceMemory),
    CreateImage(vk::Image),
    DestroyImage(vk::Image),
    BindImageMemory(vk::Image, vk::DeviceMemory),
    CreateImageView(vk::ImageView),
    DestroyImageView(vk::ImageView),
    CreateFramebuffer(vk::Framebuffer),
    DestroyFramebuffer(vk::Framebuffer),
    CreateShaderModule(vk::ShaderModule),
    DestroyShaderModule(vk::ShaderModule),
    CreateDescriptorSetLayout(vk::DescriptorSetLayout),
    DestroyDescriptorSetLayout(vk::DescriptorSetLayout),
    CreateRenderPass(vk::RenderPass),
    DestroyRenderPass(vk::RenderPass),
    CreatePipelineLayout(vk::PipelineLayout),
    DestroyPipelineLayout(vk::PipelineLayout),
    CreatePipelineCache(vk::PipelineCache),
    DestroyPipelineCache(vk::PipelineCache),
    CreateGraphicsPipeline(vk::Pipeline),
    DestroyPipeline(vk::Pipeline),
    CreateDescriptorPool(vk::DescriptorPool),
    DestroyDescriptorPool(vk::DescriptorPool),
    AllocateDescriptorSets(Vec<vk::DescriptorSet>),
    WriteUniformDescriptor {
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
    },
    FreeDescriptorSets(vk::DescriptorPool, Vec<vk::DescriptorSet>),
    CreateCommandPool(vk::CommandPool),
    DestroyCommandPool(vk::CommandPool),
    AllocateCommandBuffers(Vec<vk::CommandBuffer>),
    FreeCommandBuffers(vk::CommandPool, Vec<vk::CommandBuffer>),
    ResetCommandBuffer(vk::CommandBuffer),
    BeginCommandBuffer(vk::CommandBuffer),
    EndCommandBuffer(vk::CommandBuffer),
    BeginRenderPass {
        cmd: vk::CommandBuffer,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        color: [f32; 4],
        depth: f32,
        stencil: u32,
    },
    EndRenderPass(vk::CommandBuffer),
    BindPipeline(vk::CommandBuffer, vk::Pipeline),
    BindVertexBuffer(vk::CommandBuffer, u32, vk::Buffer),
    BindIndexBuffer(vk::CommandBuffer, vk::Buffer),
    BindDescriptorSets(vk::CommandBuffer, Vec<vk::DescriptorSet>),
    DrawIndexed(vk::CommandBuffer, u32),
    /// Pushed by test uniform stand-ins in place of real uploads.
    UniformWrite(usize),
}

/// Fixed-function state captured from the last pipeline creation.
#[derive(Clone, Debug, Default)]
pub struct PipelineSnapshot {
    pub stage_count: u32,
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub blend_enable: bool,
    pub viewport: Option<vk::Viewport>,
    pub samples: vk::SampleCountFlags,
}

#[derive(Clone, Debug, Default)]
pub struct RenderPassSnapshot {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

#[derive(Clone, Copy, Debug, Default)]
struct FenceState {
    signaled: bool,
    pending: bool,
}

pub struct FakeDevice {
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u64>,
    failing: RefCell<HashSet<&'static str>>,
    memory: RefCell<HashMap<u64, Box<[u8]>>>,
    buffer_sizes: RefCell<HashMap<u64, vk::DeviceSize>>,
    fences: RefCell<HashMap<u64, FenceState>>,
    cmd_last_fence: RefCell<HashMap<u64, vk::Fence>>,
    violations: RefCell<Vec<String>>,
    image_count: Cell<u32>,
    acquire_script: RefCell<VecDeque<u32>>,
    acquire_counter: Cell<u32>,
    pipeline: RefCell<Option<PipelineSnapshot>>,
    render_pass: RefCell<Option<RenderPassSnapshot>>,
}

impl FakeDevice {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            calls: RefCell::default(),
            next_handle: Cell::new(0x100),
            failing: RefCell::default(),
            memory: RefCell::default(),
            buffer_sizes: RefCell::default(),
            fences: RefCell::default(),
            cmd_last_fence: RefCell::default(),
            violations: RefCell::default(),
            image_count: Cell::new(2),
            acquire_script: RefCell::default(),
            acquire_counter: Cell::new(0),
            pipeline: RefCell::default(),
            render_pass: RefCell::default(),
        })
    }

    pub fn api(self: &Rc<Self>) -> Rc<dyn DeviceApi> {
        self.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    /// Makes the named trait method fail with `ERROR_OUT_OF_DEVICE_MEMORY`.
    pub fn fail_on(&self, method: &'static str) {
        self.failing.borrow_mut().insert(method);
    }

    pub fn clear_failures(&self) {
        self.failing.borrow_mut().clear();
    }

    pub fn set_image_count(&self, count: u32) {
        self.image_count.set(count);
    }

    /// Image indices returned by the following acquires, in order.
    pub fn script_acquires(&self, indices: &[u32]) {
        self.acquire_script.borrow_mut().extend(indices);
    }

    pub fn violations(&self) -> Vec<String> {
        self.violations.borrow().clone()
    }

    /// True when no submitted work is outstanding on `fence`.
    pub fn fence_idle(&self, fence: vk::Fence) -> bool {
        self.fences
            .borrow()
            .get(&fence.as_raw())
            .is_some_and(|f| !f.pending)
    }

    pub fn pipeline_snapshot(&self) -> Option<PipelineSnapshot> {
        self.pipeline.borrow().clone()
    }

    pub fn render_pass_snapshot(&self) -> Option<RenderPassSnapshot> {
        self.render_pass.borrow().clone()
    }

    fn handle<H: Handle>(&self) -> H {
        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        H::from_raw(raw)
    }

    fn check(&self, method: &'static str) -> VkResult<()> {
        if self.failing.borrow().contains(method) {
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)
        } else {
            Ok(())
        }
    }

    fn violation(&self, msg: String) {
        self.violations.borrow_mut().push(msg);
    }

    fn guard_host_write(&self, cmd: vk::CommandBuffer, what: &str) {
        if let Some(fence) = self.cmd_last_fence.borrow().get(&cmd.as_raw()) {
            if !self.fence_idle(*fence) {
                self.violation(format!("{what} {cmd:?} while {fence:?} is pending"));
            }
        }
    }
}

/// Clear value pair as written by the clear command.
fn decode_clear(values: &[vk::ClearValue; 2]) -> ([f32; 4], f32, u32) {
    // SAFETY: attachment 0 is colour (float32) and attachment 1 is depth/stencil.
    unsafe {
        (
            values[0].color.float32,
            values[1].depth_stencil.depth,
            values[1].depth_stencil.stencil,
        )
    }
}

/// # Safety
/// `ptr` must point to `len` valid elements unless `len` is zero.
unsafe fn copy_slice<T: Clone>(ptr: *const T, len: u32) -> Vec<T> {
    if len == 0 || ptr.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }.to_vec()
}

impl DeviceApi for FakeDevice {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 2,
            ..Default::default()
        };
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        self.check("device_wait_idle")?;
        for state in self.fences.borrow_mut().values_mut() {
            if state.pending {
                state.pending = false;
                state.signaled = true;
            }
        }
        self.push(Call::DeviceWaitIdle);
        Ok(())
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        self.check("create_semaphore")?;
        let s = self.handle();
        self.push(Call::CreateSemaphore(s));
        Ok(s)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.push(Call::DestroySemaphore(semaphore));
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        self.check("create_fence")?;
        let f: vk::Fence = self.handle();
        self.fences.borrow_mut().insert(
            f.as_raw(),
            FenceState {
                signaled,
                pending: false,
            },
        );
        self.push(Call::CreateFence(f));
        Ok(f)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.push(Call::DestroyFence(fence));
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> VkResult<()> {
        self.check("wait_for_fence")?;
        {
            let mut fences = self.fences.borrow_mut();
            let state = fences.entry(fence.as_raw()).or_default();
            if state.pending {
                state.pending = false;
                state.signaled = true;
            }
            if !state.signaled {
                drop(fences);
                self.violation(format!("wait on {fence:?} that can never signal"));
            }
        }
        self.push(Call::WaitForFence(fence));
        Ok(())
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        self.check("reset_fence")?;
        let was_pending = {
            let mut fences = self.fences.borrow_mut();
            let state = fences.entry(fence.as_raw()).or_default();
            let was = state.pending;
            state.signaled = false;
            was
        };
        if was_pending {
            self.violation(format!("reset of in-flight {fence:?}"));
        }
        self.push(Call::ResetFence(fence));
        Ok(())
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.check("swapchain_images")?;
        Ok((0..self.image_count.get()).map(|_| self.handle()).collect())
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        _timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<u32> {
        self.check("acquire_next_image")?;
        let index = match self.acquire_script.borrow_mut().pop_front() {
            Some(i) => i,
            None => {
                let n = self.acquire_counter.get();
                self.acquire_counter.set(n + 1);
                n % self.image_count.get().max(1)
            }
        };
        self.push(Call::AcquireNextImage(semaphore, index));
        Ok(index)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.push(Call::DestroySwapchain(swapchain));
    }

    fn queue_submit(&self, submit: &SubmitRequest) -> VkResult<()> {
        self.check("queue_submit")?;
        let busy = {
            let mut fences = self.fences.borrow_mut();
            let state = fences.entry(submit.fence.as_raw()).or_default();
            let busy = state.signaled || state.pending;
            state.pending = true;
            busy
        };
        if busy {
            self.violation(format!("submit with unreset {:?}", submit.fence));
        }
        self.cmd_last_fence
            .borrow_mut()
            .insert(submit.command_buffer.as_raw(), submit.fence);
        self.push(Call::QueueSubmit(*submit));
        Ok(())
    }

    fn queue_present(&self, present: &PresentRequest) -> VkResult<()> {
        self.check("queue_present")?;
        self.push(Call::QueuePresent(*present));
        Ok(())
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        self.check("create_buffer")?;
        let b: vk::Buffer = self.handle();
        self.buffer_sizes.borrow_mut().insert(b.as_raw(), info.size);
        self.push(Call::CreateBuffer(b));
        Ok(b)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.push(Call::DestroyBuffer(buffer));
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let size = self
            .buffer_sizes
            .borrow()
            .get(&buffer.as_raw())
            .copied()
            .unwrap_or(256);
        vk::MemoryRequirements {
            size,
            alignment: 16,
            memory_type_bits: 0b11,
        }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        self.check("bind_buffer_memory")?;
        self.push(Call::BindBufferMemory(buffer, memory));
        Ok(())
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        _type_index: u32,
    ) -> VkResult<vk::DeviceMemory> {
        self.check("allocate_memory")?;
        let m: vk::DeviceMemory = self.handle();
        self.memory
            .borrow_mut()
            .insert(m.as_raw(), vec![0u8; size as usize].into_boxed_slice());
        self.push(Call::AllocateMemory(m));
        Ok(m)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        self.memory.borrow_mut().remove(&memory.as_raw());
        self.push(Call::FreeMemory(memory));
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void> {
        self.check("map_memory")?;
        let ptr = self
            .memory
            .borrow_mut()
            .get_mut(&memory.as_raw())
            .map(|m| m.as_mut_ptr().cast::<c_void>())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        self.push(Call::MapMemory(memory));
        Ok(ptr)
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.push(Call::UnmapMemory(memory));
    }

    fn create_image(&self, _info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image> {
        self.check("create_image")?;
        let i = self.handle();
        self.push(Call::CreateImage(i));
        Ok(i)
    }

    fn destroy_image(&self, image: vk::Image) {
        self.push(Call::DestroyImage(image));
    }

    fn image_memory_requirements(&self, _image: vk::Image) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size: 1024,
            alignment: 256,
            memory_type_bits: 0b11,
        }
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        self.check("bind_image_memory")?;
        self.push(Call::BindImageMemory(image, memory));
        Ok(())
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        self.check("create_image_view")?;
        let v = self.handle();
        self.push(Call::CreateImageView(v));
        Ok(v)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.push(Call::DestroyImageView(view));
    }

    fn create_framebuffer(
        &self,
        _info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        self.check("create_framebuffer")?;
        let f = self.handle();
        self.push(Call::CreateFramebuffer(f));
        Ok(f)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.push(Call::DestroyFramebuffer(framebuffer));
    }

    fn create_shader_module(&self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.check("create_shader_module")?;
        let m = self.handle();
        self.push(Call::CreateShaderModule(m));
        Ok(m)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.push(Call::DestroyShaderModule(module));
    }

    fn create_descriptor_set_layout(
        &self,
        _info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        self.check("create_descriptor_set_layout")?;
        let l = self.handle();
        self.push(Call::CreateDescriptorSetLayout(l));
        Ok(l)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.push(Call::DestroyDescriptorSetLayout(layout));
    }

    fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.check("create_render_pass")?;
        // SAFETY: the create info and its arrays are valid for this call.
        let snapshot = unsafe {
            RenderPassSnapshot {
                attachments: copy_slice(info.p_attachments, info.attachment_count),
                dependencies: copy_slice(info.p_dependencies, info.dependency_count),
            }
        };
        *self.render_pass.borrow_mut() = Some(snapshot);
        let r = self.handle();
        self.push(Call::CreateRenderPass(r));
        Ok(r)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.push(Call::DestroyRenderPass(render_pass));
    }

    fn create_pipeline_layout(
        &self,
        _info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        self.check("create_pipeline_layout")?;
        let l = self.handle();
        self.push(Call::CreatePipelineLayout(l));
        Ok(l)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.push(Call::DestroyPipelineLayout(layout));
    }

    fn create_pipeline_cache(&self) -> VkResult<vk::PipelineCache> {
        self.check("create_pipeline_cache")?;
        let c = self.handle();
        self.push(Call::CreatePipelineCache(c));
        Ok(c)
    }

    fn destroy_pipeline_cache(&self, cache: vk::PipelineCache) {
        self.push(Call::DestroyPipelineCache(cache));
    }

    fn create_graphics_pipeline(
        &self,
        _cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        self.check("create_graphics_pipeline")?;
        // SAFETY: every state pointer in the create info is valid for this call.
        let snapshot = unsafe {
            let vi = &*info.p_vertex_input_state;
            let ia = &*info.p_input_assembly_state;
            let vp = &*info.p_viewport_state;
            let rs = &*info.p_rasterization_state;
            let ms = &*info.p_multisample_state;
            let ds = &*info.p_depth_stencil_state;
            let cb = &*info.p_color_blend_state;
            let blend = copy_slice(cb.p_attachments, cb.attachment_count);
            PipelineSnapshot {
                stage_count: info.stage_count,
                bindings: copy_slice(
                    vi.p_vertex_binding_descriptions,
                    vi.vertex_binding_description_count,
                ),
                attributes: copy_slice(
                    vi.p_vertex_attribute_descriptions,
                    vi.vertex_attribute_description_count,
                ),
                topology: ia.topology,
                cull_mode: rs.cull_mode,
                front_face: rs.front_face,
                depth_test: ds.depth_test_enable == vk::TRUE,
                depth_write: ds.depth_write_enable == vk::TRUE,
                depth_compare: ds.depth_compare_op,
                blend_enable: blend.iter().any(|b| b.blend_enable == vk::TRUE),
                viewport: copy_slice(vp.p_viewports, vp.viewport_count).first().copied(),
                samples: ms.rasterization_samples,
            }
        };
        *self.pipeline.borrow_mut() = Some(snapshot);
        let p = self.handle();
        self.push(Call::CreateGraphicsPipeline(p));
        Ok(p)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.push(Call::DestroyPipeline(pipeline));
    }

    fn create_descriptor_pool(
        &self,
        _info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        self.check("create_descriptor_pool")?;
        let p = self.handle();
        self.push(Call::CreateDescriptorPool(p));
        Ok(p)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.push(Call::DestroyDescriptorPool(pool));
    }

    fn allocate_descriptor_sets(
        &self,
        _pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        self.check("allocate_descriptor_sets")?;
        let sets: Vec<vk::DescriptorSet> = layouts.iter().map(|_| self.handle()).collect();
        self.push(Call::AllocateDescriptorSets(sets.clone()));
        Ok(sets)
    }

    fn write_uniform_descriptor(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        _range: vk::DeviceSize,
    ) {
        self.push(Call::WriteUniformDescriptor {
            set,
            binding,
            buffer,
        });
    }

    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> VkResult<()> {
        self.push(Call::FreeDescriptorSets(pool, sets.to_vec()));
        Ok(())
    }

    fn create_command_pool(&self, _queue_family: u32) -> VkResult<vk::CommandPool> {
        self.check("create_command_pool")?;
        let p = self.handle();
        self.push(Call::CreateCommandPool(p));
        Ok(p)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.push(Call::DestroyCommandPool(pool));
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.check("allocate_command_buffers")?;
        let cmds: Vec<vk::CommandBuffer> = (0..count).map(|_| self.handle()).collect();
        self.push(Call::AllocateCommandBuffers(cmds.clone()));
        Ok(cmds)
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        self.push(Call::FreeCommandBuffers(pool, buffers.to_vec()));
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.check("reset_command_buffer")?;
        self.guard_host_write(cmd, "reset of");
        self.push(Call::ResetCommandBuffer(cmd));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.check("begin_command_buffer")?;
        self.guard_host_write(cmd, "recording into");
        self.push(Call::BeginCommandBuffer(cmd));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.check("end_command_buffer")?;
        self.push(Call::EndCommandBuffer(cmd));
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin) {
        let (color, depth, stencil) = decode_clear(&begin.clear_values);
        self.push(Call::BeginRenderPass {
            cmd,
            framebuffer: begin.framebuffer,
            extent: begin.extent,
            color,
            depth,
            stencil,
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.push(Call::EndRenderPass(cmd));
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.push(Call::BindPipeline(cmd, pipeline));
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, binding: u32, buffer: vk::Buffer) {
        self.push(Call::BindVertexBuffer(cmd, binding, buffer));
    }

    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.push(Call::BindIndexBuffer(cmd, buffer));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        sets: &[vk::DescriptorSet],
    ) {
        self.push(Call::BindDescriptorSets(cmd, sets.to_vec()));
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        self.push(Call::DrawIndexed(cmd, index_count));
    }
}
