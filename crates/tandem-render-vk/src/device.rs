// SPDX-License-Identifier: CEPL-1.0
//! Instance, surface, physical/logical device bootstrap and the [`Device`]
//! context every other object is created from.
use std::ffi::{c_char, c_void, CStr, CString};
use std::rc::Rc;

use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tandem_core::{RenderError, RenderResult};
use tandem_render::VulkanSettings;
use tracing::{debug, info};

use crate::api::{DeviceApi, PresentRequest, RenderPassBegin, SubmitRequest};
use crate::debug::{self, DebugMessenger};

const APP_NAME: &CStr = c"tandem";
const DEBUG_UTILS: &str = "VK_EXT_debug_utils";

/// Every requested name must be present in `available`.
pub fn check_available(
    kind: &'static str,
    available: &[String],
    requested: &[String],
) -> RenderResult<()> {
    match requested.iter().find(|r| !available.contains(r)) {
        Some(missing) => Err(RenderError::unavailable(kind, missing.as_str()).report()),
        None => Ok(()),
    }
}

/// Every name the windowing system needs must be part of `requested`.
pub fn check_requested(
    kind: &'static str,
    required: &[String],
    requested: &[String],
) -> RenderResult<()> {
    match required.iter().find(|r| !requested.contains(r)) {
        Some(missing) => Err(RenderError::NotRequested {
            kind,
            name: missing.clone(),
        }
        .report()),
        None => Ok(()),
    }
}

pub fn check_layers(available: &[String], requested: &[String]) -> RenderResult<()> {
    check_available("instance layer", available, requested)
}

/// Two-way check: requested ⊆ available and required ⊆ requested.
pub fn check_extensions(
    available: &[String],
    requested: &[String],
    required: &[String],
) -> RenderResult<()> {
    check_available("instance extension", available, requested)?;
    check_requested("instance extension", required, requested)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// First graphics-capable family and, independently, the first family that
/// can present. The two may coincide.
pub fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> RenderResult<bool>,
) -> RenderResult<QueueFamilies> {
    let graphics = families
        .iter()
        .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .ok_or_else(|| RenderError::unavailable("queue family", "graphics").report())?;

    let mut present = None;
    for index in 0..families.len() as u32 {
        if supports_present(index)? {
            present = Some(index);
            break;
        }
    }
    let present =
        present.ok_or_else(|| RenderError::unavailable("queue family", "present").report())?;

    Ok(QueueFamilies {
        graphics: graphics as u32,
        present,
    })
}

fn extension_names(props: &[vk::ExtensionProperties]) -> Vec<String> {
    props
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

fn layer_names(props: &[vk::LayerProperties]) -> Vec<String> {
    props
        .iter()
        .filter_map(|p| p.layer_name_as_c_str().ok())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

fn to_cstrings(names: &[String]) -> RenderResult<Vec<CString>> {
    names
        .iter()
        .map(|n| {
            CString::new(n.as_str())
                .map_err(|_| RenderError::Config(format!("name `{n}` contains NUL")).report())
        })
        .collect()
}

fn native(call: &'static str) -> impl FnOnce(vk::Result) -> RenderError {
    move |code| RenderError::native(call, code).report()
}

struct InstanceContext {
    entry: Entry,
    instance: ash::Instance,
    debug: Option<DebugMessenger>,
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        self.debug = None;
        unsafe { self.instance.destroy_instance(None) };
    }
}

impl InstanceContext {
    fn new(display: &dyn HasDisplayHandle, settings: &VulkanSettings) -> RenderResult<Self> {
        let display_raw = display
            .display_handle()
            .map_err(|e| RenderError::state(format!("display handle: {e}")).report())?
            .as_raw();

        // SAFETY: the loaded library is kept alive by `entry` for the context lifetime.
        let entry = unsafe { Entry::load() }
            .map_err(|e| RenderError::unavailable("vulkan loader", e.to_string()).report())?;

        let available_layers = layer_names(
            &unsafe { entry.enumerate_instance_layer_properties() }
                .map_err(native("vkEnumerateInstanceLayerProperties"))?,
        );
        check_layers(&available_layers, &settings.instance_layers)?;

        let available_exts = extension_names(
            &unsafe { entry.enumerate_instance_extension_properties(None) }
                .map_err(native("vkEnumerateInstanceExtensionProperties"))?,
        );
        let required: Vec<String> = ash_window::enumerate_required_extensions(display_raw)
            .map_err(native("enumerate_required_extensions"))?
            .iter()
            // SAFETY: ash-window returns pointers to static extension-name constants.
            .map(|&p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
            .collect();
        check_extensions(&available_exts, &settings.instance_extensions, &required)?;

        let layers = to_cstrings(&settings.instance_layers)?;
        let exts = to_cstrings(&settings.instance_extensions)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();
        let ext_ptrs: Vec<*const c_char> = exts.iter().map(|e| e.as_ptr()).collect();

        let app_info = vk::ApplicationInfo {
            p_application_name: APP_NAME.as_ptr(),
            application_version: vk::make_api_version(0, 1, 0, 0),
            p_engine_name: APP_NAME.as_ptr(),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_1,
            ..Default::default()
        };

        let with_debug = settings.instance_extensions.iter().any(|e| e == DEBUG_UTILS);
        let mut debug_info = debug::messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&ext_ptrs);
        if with_debug {
            create_info = create_info.push_next(&mut debug_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(native("vkCreateInstance"))?;
        let mut ctx = Self {
            entry,
            instance,
            debug: None,
        };
        if with_debug {
            ctx.debug = Some(
                unsafe { DebugMessenger::new(&ctx.entry, &ctx.instance) }
                    .map_err(native("vkCreateDebugUtilsMessengerEXT"))?,
            );
        }
        info!(
            "vk: instance up ({} layers, {} extensions)",
            layers.len(),
            exts.len()
        );
        Ok(ctx)
    }
}

struct SurfaceContext {
    loader: surface::Instance,
    surface: vk::SurfaceKHR,
}

impl Drop for SurfaceContext {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.surface, None) };
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Queue {
    pub family: u32,
    pub queue: vk::Queue,
}

/// Logical device plus everything it was created from. Dropped after every
/// resource holding an `Rc` to it.
pub struct Device {
    device: ash::Device,
    swapchain_loader: swapchain::Device,
    physical: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    graphics: Queue,
    present: Queue,
    surface: SurfaceContext,
    instance: InstanceContext,
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        // surface, then instance, via field order
    }
}

impl Device {
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        settings: &VulkanSettings,
    ) -> RenderResult<Rc<Self>> {
        let instance = InstanceContext::new(display, settings)?;

        let display_raw = display
            .display_handle()
            .map_err(|e| RenderError::state(format!("display handle: {e}")).report())?
            .as_raw();
        let window_raw = window
            .window_handle()
            .map_err(|e| RenderError::state(format!("window handle: {e}")).report())?
            .as_raw();
        let loader = surface::Instance::new(&instance.entry, &instance.instance);
        let handle = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                display_raw,
                window_raw,
                None,
            )
        }
        .map_err(native("vkCreateSurfaceKHR"))?;
        let surface = SurfaceContext {
            loader,
            surface: handle,
        };

        let vk_instance = &instance.instance;
        let physical = unsafe { vk_instance.enumerate_physical_devices() }
            .map_err(native("vkEnumeratePhysicalDevices"))?
            .first()
            .copied()
            .ok_or_else(|| RenderError::unavailable("physical device", "any").report())?;
        let props = unsafe { vk_instance.get_physical_device_properties(physical) };
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("vk: using physical device {name}");

        let families =
            unsafe { vk_instance.get_physical_device_queue_family_properties(physical) };
        let selected = select_queue_families(&families, |index| {
            unsafe {
                surface.loader.get_physical_device_surface_support(
                    physical,
                    index,
                    surface.surface,
                )
            }
            .map_err(native("vkGetPhysicalDeviceSurfaceSupportKHR"))
        })?;
        info!(
            "vk: graphics family {}, present family {}",
            selected.graphics, selected.present
        );

        let available = extension_names(
            &unsafe { vk_instance.enumerate_device_extension_properties(physical) }
                .map_err(native("vkEnumerateDeviceExtensionProperties"))?,
        );
        check_available("device extension", &available, &settings.device_extensions)?;
        let exts = to_cstrings(&settings.device_extensions)?;
        let ext_ptrs: Vec<*const c_char> = exts.iter().map(|e| e.as_ptr()).collect();

        let priorities = [1.0f32];
        let mut unique = vec![selected.graphics];
        if selected.present != selected.graphics {
            unique.push(selected.present);
        }
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let mut coherent = vk::PhysicalDeviceCoherentMemoryFeaturesAMD {
            device_coherent_memory: vk::TRUE,
            ..Default::default()
        };
        let mut create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&ext_ptrs);
        if settings.request_coherent_memory {
            create_info = create_info.push_next(&mut coherent);
        }

        let device = unsafe { vk_instance.create_device(physical, &create_info, None) }
            .map_err(native("vkCreateDevice"))?;
        let swapchain_loader = swapchain::Device::new(vk_instance, &device);
        let memory_properties =
            unsafe { vk_instance.get_physical_device_memory_properties(physical) };
        let graphics = Queue {
            family: selected.graphics,
            queue: unsafe { device.get_device_queue(selected.graphics, 0) },
        };
        let present = Queue {
            family: selected.present,
            queue: unsafe { device.get_device_queue(selected.present, 0) },
        };
        debug!("vk: logical device created");

        Ok(Rc::new(Self {
            device,
            swapchain_loader,
            physical,
            memory_properties,
            graphics,
            present,
            surface,
            instance,
        }))
    }

    pub fn graphics_queue(&self) -> Queue {
        self.graphics
    }

    pub fn present_queue(&self) -> Queue {
        self.present
    }

    pub fn surface_capabilities(&self) -> RenderResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface
                .loader
                .get_physical_device_surface_capabilities(self.physical, self.surface.surface)
        }
        .map_err(native("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))
    }

    pub fn surface_formats(&self) -> RenderResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface
                .loader
                .get_physical_device_surface_formats(self.physical, self.surface.surface)
        }
        .map_err(native("vkGetPhysicalDeviceSurfaceFormatsKHR"))
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.surface
    }

    pub fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> RenderResult<vk::SwapchainKHR> {
        unsafe { self.swapchain_loader.create_swapchain(info, None) }
            .map_err(native("vkCreateSwapchainKHR"))
    }
}

// SAFETY (whole impl): every handle passed in was created from `self.device`
// and is destroyed at most once by its owning wrapper.
impl DeviceApi for Device {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.memory_properties
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        unsafe {
            self.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
        }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        unsafe {
            self.device
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
        }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        unsafe { self.device.wait_for_fences(&[fence], true, timeout) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.device.reset_fences(&[fence]) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<u32> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
        }
        .map(|(index, _suboptimal)| index)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn queue_submit(&self, submit: &SubmitRequest) -> VkResult<()> {
        let waits = [submit.wait_semaphore];
        let stages = [submit.wait_stage];
        let cmds = [submit.command_buffer];
        let signals = [submit.signal_semaphore];
        let info = vk::SubmitInfo::default()
            .wait_semaphores(&waits)
            .wait_dst_stage_mask(&stages)
            .command_buffers(&cmds)
            .signal_semaphores(&signals);
        unsafe {
            self.device
                .queue_submit(submit.queue, std::slice::from_ref(&info), submit.fence)
        }
    }

    fn queue_present(&self, present: &PresentRequest) -> VkResult<()> {
        let waits = [present.wait_semaphore];
        let swapchains = [present.swapchain];
        let indices = [present.image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe { self.swapchain_loader.queue_present(present.queue, &info) }.map(|_| ())
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        unsafe { self.device.create_buffer(info, None) }
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) }
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        unsafe { self.device.bind_buffer_memory(buffer, memory, 0) }
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        type_index: u32,
    ) -> VkResult<vk::DeviceMemory> {
        let info = vk::MemoryAllocateInfo {
            allocation_size: size,
            memory_type_index: type_index,
            ..Default::default()
        };
        unsafe { self.device.allocate_memory(&info, None) }
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void> {
        unsafe {
            self.device
                .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
        }
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> VkResult<vk::Image> {
        unsafe { self.device.create_image(info, None) }
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) }
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        unsafe { self.device.get_image_memory_requirements(image) }
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VkResult<()> {
        unsafe { self.device.bind_image_memory(image, memory, 0) }
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        unsafe { self.device.create_image_view(info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> VkResult<vk::Framebuffer> {
        unsafe { self.device.create_framebuffer(info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        unsafe { self.device.create_shader_module(&info, None) }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) }
    }

    fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        unsafe { self.device.create_descriptor_set_layout(info, None) }
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        unsafe { self.device.create_render_pass(info, None) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_pipeline_cache(&self) -> VkResult<vk::PipelineCache> {
        unsafe {
            self.device
                .create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None)
        }
    }

    fn destroy_pipeline_cache(&self, cache: vk::PipelineCache) {
        unsafe { self.device.destroy_pipeline_cache(cache, None) }
    }

    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        match unsafe {
            self.device
                .create_graphics_pipelines(cache, std::slice::from_ref(info), None)
        } {
            Ok(pipelines) => pipelines
                .first()
                .copied()
                .ok_or(vk::Result::ERROR_UNKNOWN),
            Err((_, err)) => Err(err),
        }
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) }
    }

    fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        unsafe { self.device.create_descriptor_pool(info, None) }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(layouts);
        unsafe { self.device.allocate_descriptor_sets(&info) }
    }

    fn write_uniform_descriptor(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) {
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info);
        unsafe {
            self.device
                .update_descriptor_sets(std::slice::from_ref(&write), &[])
        }
    }

    fn free_descriptor_sets(
        &self,
        pool: vk::DescriptorPool,
        sets: &[vk::DescriptorSet],
    ) -> VkResult<()> {
        unsafe { self.device.free_descriptor_sets(pool, sets) }
    }

    fn create_command_pool(&self, queue_family: u32) -> VkResult<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo {
            queue_family_index: queue_family,
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            ..Default::default()
        };
        unsafe { self.device.create_command_pool(&info, None) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo {
            command_pool: pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count,
            ..Default::default()
        };
        unsafe { self.device.allocate_command_buffers(&info) }
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(pool, buffers) }
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe {
            self.device
                .begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default())
        }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin) {
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(begin.render_pass)
            .framebuffer(begin.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: begin.extent,
            })
            .clear_values(&begin.clear_values);
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, binding: u32, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(cmd, binding, &[buffer], &[0])
        }
    }

    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(cmd, buffer, 0, vk::IndexType::UINT32)
        }
    }

    fn cmd_bind_descriptor_sets(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                sets,
                &[],
            )
        }
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        unsafe { self.device.cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unavailable_requested_extension_fails() {
        let err = check_extensions(&names(&["A", "B"]), &names(&["A", "C"]), &[]).unwrap_err();
        assert!(
            matches!(err, RenderError::Unavailable { ref name, .. } if name == "C"),
            "{err}"
        );
    }

    #[test]
    fn omitted_required_extension_fails() {
        let err =
            check_extensions(&names(&["A", "B"]), &names(&["B"]), &names(&["A"])).unwrap_err();
        assert!(
            matches!(err, RenderError::NotRequested { ref name, .. } if name == "A"),
            "{err}"
        );
    }

    #[test]
    fn consistent_extension_sets_pass() {
        check_extensions(&names(&["A", "B"]), &names(&["A", "B"]), &names(&["A"])).unwrap();
    }

    #[test]
    fn missing_layer_is_unavailable() {
        let err = check_layers(&names(&["VK_LAYER_A"]), &names(&["VK_LAYER_KHRONOS_validation"]))
            .unwrap_err();
        assert!(matches!(err, RenderError::Unavailable { kind: "instance layer", .. }));
        check_layers(&names(&["VK_LAYER_A"]), &[]).unwrap();
    }

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn graphics_and_present_may_share_a_family() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let picked = select_queue_families(&families, |_| Ok(true)).unwrap();
        assert_eq!(picked, QueueFamilies { graphics: 0, present: 0 });
    }

    #[test]
    fn present_family_is_chosen_independently() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let picked = select_queue_families(&families, |i| Ok(i == 0 || i == 2)).unwrap();
        assert_eq!(picked, QueueFamilies { graphics: 1, present: 0 });
    }

    #[test]
    fn no_present_support_is_unavailable() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let err = select_queue_families(&families, |_| Ok(false)).unwrap_err();
        assert!(matches!(err, RenderError::Unavailable { kind: "queue family", .. }));
    }

    #[test]
    fn no_graphics_family_is_unavailable() {
        let families = [family(vk::QueueFlags::COMPUTE)];
        assert!(select_queue_families(&families, |_| Ok(true)).is_err());
    }
}
