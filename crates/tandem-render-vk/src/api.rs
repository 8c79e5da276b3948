// SPDX-License-Identifier: CEPL-1.0
//! Logical-device surface used by every resource in this crate.
//!
//! Resources hold an `Rc<dyn DeviceApi>` and issue all creation, recording,
//! submission and destruction calls through it. [`crate::Device`] forwards to
//! ash; tests substitute a recording fake. Handles passed in must have been
//! created by the same implementation.
use std::ffi::c_void;

use ash::prelude::VkResult;
use ash::vk;

/// One graphics-queue submission: a single command buffer that waits on one
/// semaphore, signals another and a fence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitRequest {
    pub queue: vk::Queue,
    pub wait_semaphore: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    pub command_buffer: vk::CommandBuffer,
    pub signal_semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentRequest {
    pub queue: vk::Queue,
    pub wait_semaphore: vk::Semaphore,
    pub swapchain: vk::SwapchainKHR,
    pub image_index: u32,
}

/// Colour clear value first, depth/stencil second, matching the attachments.
#[derive(Clone, Copy)]
pub struct RenderPassBegin {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_values: [vk::ClearValue; 2],
}

pub trait DeviceApi {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;
    fn device_wait_idle(&self) -> VkResult<()>;

    // synchronization
    fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()>;
    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;

    // swapchain
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<u32>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    fn queue_submit(&self, submit: &SubmitRequest) -> VkResult<()>;
    fn queue_present(&self, present: &PresentRequest) -> VkResult<()>;

    // memory and buffers
    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer>;
    fn destroy_buffer(&self, buffer: vk::Buffer);
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()>;
    fn allocate_memory(&self, size: vk::DeviceSize, type_index: u32)
        -> VkResult<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);
    /// Maps the whole allocation.
    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void>;
    fn unmap_memory(&self, memory: vk::DeviceMemory);

    // images
    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image>;
    fn destroy_image(&self, image: vk::Image);
    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;
    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()>;
    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);
    fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // shaders and pipelines
    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);
    fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout>;
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);
    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>)
        -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    fn create_pipeline_cache(&self) -> VkResult<vk::PipelineCache>;
    fn destroy_pipeline_cache(&self, cache: vk::PipelineCache);
    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // descriptors
    fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool>;
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);
    fn allocate_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> VkResult<Vec<vk::DescriptorSet>>;
    fn write_uniform_descriptor(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    );
    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> VkResult<()>;

    // command buffers
    fn create_command_pool(&self, queue_family: u32) -> VkResult<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>>;
    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);
    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    // recording
    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin);
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, binding: u32, buffer: vk::Buffer);
    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer);
    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        sets: &[vk::DescriptorSet],
    );
    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32);
}
