// SPDX-License-Identifier: CEPL-1.0
//! Frame orchestration: per-image framebuffers and command buffers, per-frame
//! synchronization and descriptor sets, and the acquire/record/submit/present
//! cycle.
//!
//! Two indices are in play. The swapchain image index returned by acquire
//! selects the framebuffer and command buffer. The in-flight frame index cycles
//! `0..frame_count` and selects semaphores, the fence, the uniform copy and
//! the descriptor sets.
use std::rc::Rc;

use ash::vk;
use tandem_core::{RenderError, RenderResult};
use tandem_render::VulkanSettings;
use tracing::{debug, trace, warn};

use crate::api::{DeviceApi, PresentRequest, SubmitRequest};
use crate::command::{Command, FrameContext};
use crate::device::Queue;
use crate::pipeline::Pipeline;
use crate::swapchain::{create_color_view, create_framebuffer, DepthImage, Swapchain};
use crate::sync::{create_frame_syncs, destroy_frame_syncs, FrameSync};
use crate::uniform::FrameUniforms;

fn native(call: &'static str) -> impl FnOnce(vk::Result) -> RenderError {
    move |code| RenderError::native(call, code).report()
}

/// Owns every per-image and per-frame object. Must be dropped before the
/// swapchain, depth image and pipeline whose handles it records against.
pub struct CommandQueue {
    api: Rc<dyn DeviceApi>,
    graphics: vk::Queue,
    present: vk::Queue,
    swapchain: vk::SwapchainKHR,
    extent: vk::Extent2D,
    render_pass: vk::RenderPass,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,

    descriptor_pool: vk::DescriptorPool,
    descriptor_sets: Vec<Vec<vk::DescriptorSet>>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    syncs: Vec<FrameSync>,
    /// Fence of the submission that last used each swapchain image.
    images_in_flight: Vec<vk::Fence>,

    commands: Vec<Box<dyn Command>>,
    frame: usize,
    frame_count: usize,
    wait_idle_after_present: bool,
}

impl CommandQueue {
    pub fn new(
        api: Rc<dyn DeviceApi>,
        graphics: Queue,
        present: Queue,
        swapchain: &Swapchain,
        depth: &DepthImage,
        pipeline: &Pipeline,
        settings: &VulkanSettings,
    ) -> RenderResult<Self> {
        let frame_count = settings.frame_count as usize;
        if frame_count == 0 {
            return Err(RenderError::state("frame count must be at least 1").report());
        }
        let image_count = swapchain.image_count();

        let mut this = Self {
            api,
            graphics: graphics.queue,
            present: present.queue,
            swapchain: swapchain.handle(),
            extent: swapchain.extent(),
            render_pass: pipeline.render_pass(),
            pipeline: pipeline.handle(),
            pipeline_layout: pipeline.layout(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_sets: Vec::with_capacity(frame_count),
            image_views: Vec::with_capacity(image_count),
            framebuffers: Vec::with_capacity(image_count),
            command_pool: vk::CommandPool::null(),
            command_buffers: Vec::new(),
            syncs: Vec::with_capacity(frame_count),
            images_in_flight: vec![vk::Fence::null(); image_count],
            commands: Vec::new(),
            frame: 0,
            frame_count,
            wait_idle_after_present: settings.wait_idle_after_present,
        };
        let api = this.api.clone();

        // --- Descriptors: one set per uniform block per in-flight frame ---
        let uniforms = pipeline.uniforms();
        if let Some(short) = uniforms.iter().find(|u| u.buffers.len() < frame_count) {
            return Err(RenderError::state(format!(
                "uniform binding {} has {} buffers for {frame_count} frames",
                short.binding,
                short.buffers.len()
            ))
            .report());
        }
        if !uniforms.is_empty() {
            let total = (frame_count * uniforms.len()) as u32;
            let sizes = [vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: total,
            }];
            let info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                .max_sets(total)
                .pool_sizes(&sizes);
            this.descriptor_pool = api
                .create_descriptor_pool(&info)
                .map_err(native("vkCreateDescriptorPool"))?;

            let layouts: Vec<vk::DescriptorSetLayout> = uniforms.iter().map(|u| u.layout).collect();
            for frame in 0..frame_count {
                let sets = api
                    .allocate_descriptor_sets(this.descriptor_pool, &layouts)
                    .map_err(native("vkAllocateDescriptorSets"))?;
                for (set, uniform) in sets.iter().zip(uniforms) {
                    api.write_uniform_descriptor(
                        *set,
                        uniform.binding,
                        uniform.buffers[frame],
                        uniform.size,
                    );
                }
                this.descriptor_sets.push(sets);
            }
        }

        // --- Per-image views and framebuffers ---
        for &image in swapchain.images() {
            let view = create_color_view(api.as_ref(), image, swapchain.format())?;
            this.image_views.push(view);
            let framebuffer = create_framebuffer(
                api.as_ref(),
                this.render_pass,
                view,
                depth.view(),
                this.extent,
            )?;
            this.framebuffers.push(framebuffer);
        }

        // --- Command pool and one resettable command buffer per image ---
        this.command_pool = api
            .create_command_pool(graphics.family)
            .map_err(native("vkCreateCommandPool"))?;
        this.command_buffers = api
            .allocate_command_buffers(this.command_pool, image_count as u32)
            .map_err(native("vkAllocateCommandBuffers"))?;

        create_frame_syncs(api.as_ref(), frame_count, &mut this.syncs)?;

        debug!(
            "vk: command queue ready, {image_count} images, {frame_count} frames in flight, {} descriptor sets",
            frame_count * uniforms.len()
        );
        Ok(this)
    }

    /// Appends a command; commands are replayed in insertion order every frame.
    pub fn add_command(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    /// In-flight frame index the next `draw_frame` will use.
    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn command_buffers(&self) -> &[vk::CommandBuffer] {
        &self.command_buffers
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    pub fn frame_syncs(&self) -> &[FrameSync] {
        &self.syncs
    }

    pub fn descriptor_sets(&self, frame: usize) -> &[vk::DescriptorSet] {
        self.descriptor_sets.get(frame).map_or(&[], Vec::as_slice)
    }

    /// Renders and presents one frame. `uniforms` is flushed for the current
    /// in-flight frame once its previous submission has completed.
    pub fn draw_frame(&mut self, uniforms: &mut dyn FrameUniforms) -> RenderResult<()> {
        let api = self.api.clone();
        let sync = self.syncs[self.frame];

        // 1) the slot's last submission is done with its command buffer and uniforms
        api.wait_for_fence(sync.in_flight, u64::MAX)
            .map_err(native("vkWaitForFences"))?;

        // 2) acquire
        let image = api
            .acquire_next_image(self.swapchain, u64::MAX, sync.image_available)
            .map_err(native("vkAcquireNextImageKHR"))? as usize;
        if image >= self.command_buffers.len() {
            return Err(RenderError::state(format!(
                "acquired image {image} of {}",
                self.command_buffers.len()
            ))
            .report());
        }

        // the image may still be in use by another slot's submission
        let previous = self.images_in_flight[image];
        if previous != vk::Fence::null() && previous != sync.in_flight {
            api.wait_for_fence(previous, u64::MAX)
                .map_err(native("vkWaitForFences"))?;
        }
        self.images_in_flight[image] = sync.in_flight;

        uniforms.flush(self.frame)?;

        // 3) reset fence, record, 4) submit
        if let Err(err) = self.record_and_submit(api.as_ref(), sync, image) {
            self.replace_unsubmitted_fence(self.frame);
            return Err(err);
        }

        // 5) present
        api.queue_present(&PresentRequest {
            queue: self.present,
            wait_semaphore: sync.render_finished,
            swapchain: self.swapchain,
            image_index: image as u32,
        })
        .map_err(native("vkQueuePresentKHR"))?;

        // 6) synchronize, advance
        if self.wait_idle_after_present {
            api.device_wait_idle()
                .map_err(native("vkDeviceWaitIdle"))?;
        }
        self.frame = (self.frame + 1) % self.frame_count;
        Ok(())
    }

    fn record_and_submit(
        &self,
        api: &dyn DeviceApi,
        sync: FrameSync,
        image: usize,
    ) -> RenderResult<()> {
        api.reset_fence(sync.in_flight)
            .map_err(native("vkResetFences"))?;
        let cmd = self.command_buffers[image];
        trace!(frame = self.frame, image, "vk: recording");
        api.reset_command_buffer(cmd)
            .map_err(native("vkResetCommandBuffer"))?;
        api.begin_command_buffer(cmd)
            .map_err(native("vkBeginCommandBuffer"))?;
        let ctx = FrameContext {
            api,
            command_buffer: cmd,
            framebuffer: self.framebuffers[image],
            render_pass: self.render_pass,
            extent: self.extent,
            pipeline: self.pipeline,
            pipeline_layout: self.pipeline_layout,
            descriptor_sets: self.descriptor_sets(self.frame),
        };
        for command in &self.commands {
            command.record(&ctx);
        }
        api.end_command_buffer(cmd)
            .map_err(native("vkEndCommandBuffer"))?;

        api.queue_submit(&SubmitRequest {
            queue: self.graphics,
            wait_semaphore: sync.image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            command_buffer: cmd,
            signal_semaphore: sync.render_finished,
            fence: sync.in_flight,
        })
        .map_err(native("vkQueueSubmit"))
    }

    /// The slot's fence was reset but nothing was submitted against it, so no
    /// wait on it could ever return. Swap in a signaled fence so the next
    /// `draw_frame` on this slot does not block forever.
    fn replace_unsubmitted_fence(&mut self, frame: usize) {
        let stale = self.syncs[frame].in_flight;
        match self.api.create_fence(true) {
            Ok(fresh) => {
                self.api.destroy_fence(stale);
                for slot in &mut self.images_in_flight {
                    if *slot == stale {
                        *slot = vk::Fence::null();
                    }
                }
                self.syncs[frame].in_flight = fresh;
            }
            Err(e) => warn!("vk: could not replace fence of frame {frame}: {e:?}"),
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        let api = self.api.clone();
        let _ = api.device_wait_idle();

        destroy_frame_syncs(api.as_ref(), &mut self.syncs);
        if !self.command_buffers.is_empty() {
            api.free_command_buffers(self.command_pool, &self.command_buffers);
        }
        if self.command_pool != vk::CommandPool::null() {
            api.destroy_command_pool(self.command_pool);
        }
        for &framebuffer in &self.framebuffers {
            api.destroy_framebuffer(framebuffer);
        }
        for &view in &self.image_views {
            api.destroy_image_view(view);
        }
        let sets: Vec<vk::DescriptorSet> = self.descriptor_sets.drain(..).flatten().collect();
        if !sets.is_empty() {
            let _ = api.free_descriptor_sets(self.descriptor_pool, &sets);
        }
        if self.descriptor_pool != vk::DescriptorPool::null() {
            api.destroy_descriptor_pool(self.descriptor_pool);
        }
    }
}
