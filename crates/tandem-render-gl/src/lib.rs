// SPDX-License-Identifier: CEPL-1.0
//! Immediate-mode (OpenGL) backend.
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tandem_math::{ClipSpace, UniformBufferObject};
use tandem_render::mesh::Mesh;
use tandem_render::{
    BufferUsage, RenderSettings, Renderer, ShaderStage, Vertex, UNIFORM_BLOCK_BINDING,
    UNIFORM_BLOCK_NAME,
};
use tracing::info;

mod buffer;
mod command;
mod context;
mod pipeline;
mod shader;
mod uniform;

pub use buffer::GlBuffer;
pub use command::{GlClearCommand, GlCommand, GlCommandQueue, GlDrawCommand};
pub use context::GlContext;
pub use pipeline::{attribute_pointers, AttributePointer, GlPipeline};
pub use shader::GlShader;
pub use uniform::GlUniformBlock;

/// Fields drop in declaration order; the context goes last.
pub struct GlRenderer {
    queue: GlCommandQueue,
    uniforms: GlUniformBlock<UniformBufferObject>,
    _pipeline: GlPipeline,
    ctx: GlContext,
}

impl Renderer for GlRenderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        settings: &RenderSettings,
        mesh: &Mesh,
    ) -> Result<Self> {
        let started = Instant::now();
        let ctx = GlContext::new(window, display, settings.size).context("gl: context")?;
        let gl = ctx.gl.clone();

        let shaders_started = Instant::now();
        let vert = GlShader::from_file(gl.clone(), ShaderStage::Vertex, &settings.vertex_shader)
            .context("gl: vertex shader")?;
        let frag =
            GlShader::from_file(gl.clone(), ShaderStage::Fragment, &settings.fragment_shader)
                .context("gl: fragment shader")?;
        info!(
            "gl: shaders ready in {} ms",
            shaders_started.elapsed().as_millis()
        );

        let vertex = Rc::new(
            GlBuffer::with_data(gl.clone(), BufferUsage::Vertex, &mesh.vertices)
                .context("gl: vertex buffer")?,
        );
        let index = Rc::new(
            GlBuffer::with_data(gl.clone(), BufferUsage::Index, &mesh.indices)
                .context("gl: index buffer")?,
        );
        let pipeline = GlPipeline::new(gl.clone(), vec![vert, frag], &Vertex::layout(), &vertex)
            .context("gl: pipeline")?;
        let uniforms = GlUniformBlock::new(
            gl,
            &pipeline,
            UNIFORM_BLOCK_NAME,
            UNIFORM_BLOCK_BINDING,
            UniformBufferObject::default(),
        )
        .context("gl: uniform block")?;

        let mut queue = GlCommandQueue::new();
        queue.add_command(Box::new(GlClearCommand::new(settings.clear_color)));
        queue.add_command(Box::new(
            GlDrawCommand::new(&pipeline, vertex, index).context("gl: draw command")?,
        ));

        info!("gl: initialised in {} ms", started.elapsed().as_millis());
        Ok(Self {
            queue,
            uniforms,
            _pipeline: pipeline,
            ctx,
        })
    }

    fn clip_space(&self) -> ClipSpace {
        ClipSpace::OpenGl
    }

    fn uniforms_mut(&mut self) -> &mut UniformBufferObject {
        self.uniforms.get_mut()
    }

    fn render(&mut self) -> Result<()> {
        self.uniforms.update();
        self.queue.submit(&self.ctx).context("gl: frame")
    }
}
