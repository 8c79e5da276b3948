// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use anyhow::Result;
use glow::HasContext as _;
use tandem_core::RenderResult;
use tandem_render::{ensure_index_usage, ClearColor};

use crate::buffer::GlBuffer;
use crate::context::GlContext;
use crate::pipeline::GlPipeline;

pub const CLEAR_MASK: u32 = glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT;

pub trait GlCommand {
    fn record(&self, gl: &glow::Context);
}

pub struct GlClearCommand {
    color: [f32; 4],
}

impl GlClearCommand {
    pub fn new(color: ClearColor) -> Self {
        Self {
            color: color.normalized(),
        }
    }
}

impl GlCommand for GlClearCommand {
    fn record(&self, gl: &glow::Context) {
        let [r, g, b, a] = self.color;
        unsafe {
            gl.clear_color(r, g, b, a);
            gl.clear(CLEAR_MASK);
        }
    }
}

/// Indexed draw through the pipeline's program and vertex array.
pub struct GlDrawCommand {
    program: glow::Program,
    vao: Option<glow::VertexArray>,
    _vertex: Rc<GlBuffer>,
    index: Rc<GlBuffer>,
}

impl GlDrawCommand {
    /// `pipeline` must outlive the command.
    pub fn new(pipeline: &GlPipeline, vertex: Rc<GlBuffer>, index: Rc<GlBuffer>) -> RenderResult<Self> {
        ensure_index_usage(index.usage())?;
        Ok(Self {
            program: pipeline.program(),
            vao: pipeline.vertex_array(),
            _vertex: vertex,
            index,
        })
    }
}

impl GlCommand for GlDrawCommand {
    fn record(&self, gl: &glow::Context) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.bind_vertex_array(self.vao);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.index.handle()));
            gl.draw_elements(
                glow::TRIANGLES,
                self.index.element_count() as i32,
                glow::UNSIGNED_INT,
                0,
            );
            gl.bind_vertex_array(None);
        }
    }
}

/// Replays commands in insertion order, waits for the GPU, then swaps.
#[derive(Default)]
pub struct GlCommandQueue {
    commands: Vec<Box<dyn GlCommand>>,
}

impl GlCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: Box<dyn GlCommand>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn submit(&self, ctx: &GlContext) -> Result<()> {
        for command in &self.commands {
            command.record(&ctx.gl);
        }
        unsafe { ctx.gl.finish() };
        ctx.swap_buffers()
    }
}
