// SPDX-License-Identifier: CEPL-1.0
//! Explicit (Vulkan) backend.
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tandem_math::{ClipSpace, UniformBufferObject};
use tandem_render::mesh::Mesh;
use tandem_render::{
    BufferUsage, RenderSettings, Renderer, ShaderStage, Vertex, UNIFORM_BLOCK_BINDING,
};
use tracing::info;

pub mod api;
pub mod buffer;
pub mod command;
mod debug;
pub mod device;
pub mod memory;
pub mod pipeline;
pub mod queue;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod uniform;

#[cfg(test)]
mod testing;

pub use api::DeviceApi;
pub use buffer::Buffer;
pub use command::{ClearCommand, Command, DrawCommand, FrameContext};
pub use device::Device;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use queue::CommandQueue;
pub use shader::Shader;
pub use swapchain::{DepthImage, Swapchain};
pub use uniform::{FrameUniforms, UniformBlock};

/// Fields drop in declaration order: the queue first, the device last.
pub struct VkRenderer {
    queue: CommandQueue,
    uniforms: UniformBlock<UniformBufferObject>,
    _pipeline: Pipeline,
    _shaders: [Shader; 2],
    _depth: DepthImage,
    _swapchain: Swapchain,
    _device: Rc<Device>,
}

impl Renderer for VkRenderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        settings: &RenderSettings,
        mesh: &Mesh,
    ) -> Result<Self> {
        let started = Instant::now();
        let vulkan = &settings.vulkan;

        let device = Device::new(window, display, vulkan).context("vk: device bootstrap")?;
        let api: Rc<dyn DeviceApi> = device.clone();

        let swapchain =
            Swapchain::new(&device, vulkan, settings.size).context("vk: swapchain")?;
        let depth = DepthImage::new(api.clone(), swapchain.extent()).context("vk: depth image")?;

        let shaders_started = Instant::now();
        let mut vert = Shader::from_file(api.clone(), ShaderStage::Vertex, &settings.vertex_shader)
            .context("vk: vertex shader")?;
        let frag =
            Shader::from_file(api.clone(), ShaderStage::Fragment, &settings.fragment_shader)
                .context("vk: fragment shader")?;
        info!(
            "vk: shaders ready in {} ms",
            shaders_started.elapsed().as_millis()
        );

        let uniforms = UniformBlock::new(
            api.clone(),
            &mut vert,
            UNIFORM_BLOCK_BINDING,
            vulkan.frame_count as usize,
            UniformBufferObject::default(),
        )
        .context("vk: uniform block")?;

        let vertex = Buffer::with_data(api.clone(), BufferUsage::Vertex, &mesh.vertices)
            .context("vk: vertex buffer")?;
        let index = Buffer::with_data(api.clone(), BufferUsage::Index, &mesh.indices)
            .context("vk: index buffer")?;

        let layout = Vertex::layout();
        let viewport = vk::Extent2D {
            width: settings.size.width,
            height: settings.size.height,
        };
        let pipeline = PipelineBuilder::new(api.clone())
            .add_shader(&vert)
            .add_shader(&frag)
            .use_vertex_layout(&layout)
            .build(swapchain.format(), viewport)
            .context("vk: pipeline")?;

        let mut queue = CommandQueue::new(
            api,
            device.graphics_queue(),
            device.present_queue(),
            &swapchain,
            &depth,
            &pipeline,
            vulkan,
        )
        .context("vk: command queue")?;
        queue.add_command(Box::new(ClearCommand::new(settings.clear_color)));
        queue.add_command(Box::new(
            DrawCommand::new(Rc::new(vertex), Rc::new(index)).context("vk: draw command")?,
        ));

        info!("vk: initialised in {} ms", started.elapsed().as_millis());
        Ok(Self {
            queue,
            uniforms,
            _pipeline: pipeline,
            _shaders: [vert, frag],
            _depth: depth,
            _swapchain: swapchain,
            _device: device,
        })
    }

    fn clip_space(&self) -> ClipSpace {
        ClipSpace::Vulkan
    }

    fn uniforms_mut(&mut self) -> &mut UniformBufferObject {
        self.uniforms.get_mut()
    }

    fn render(&mut self) -> Result<()> {
        self.queue
            .draw_frame(&mut self.uniforms)
            .context("vk: frame")
    }
}
