// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use bytemuck::Pod;
use glow::HasContext as _;
use tandem_core::{RenderError, RenderResult};

use crate::pipeline::GlPipeline;

/// Uniform buffer bound to `binding` and to the program's named block.
pub struct GlUniformBlock<T: Pod> {
    gl: Rc<glow::Context>,
    buffer: glow::Buffer,
    value: T,
}

impl<T: Pod> GlUniformBlock<T> {
    pub fn new(
        gl: Rc<glow::Context>,
        pipeline: &GlPipeline,
        name: &str,
        binding: u32,
        value: T,
    ) -> RenderResult<Self> {
        let program = pipeline.program();
        let index = unsafe { gl.get_uniform_block_index(program, name) }
            .ok_or_else(|| RenderError::unavailable("uniform block", name).report())?;
        let buffer = unsafe { gl.create_buffer() }
            .map_err(|e| RenderError::native("glCreateBuffer", e).report())?;
        let this = Self { gl, buffer, value };
        unsafe {
            this.gl.uniform_block_binding(program, index, binding);
            this.gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer));
        }
        this.update();
        Ok(this)
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Re-uploads the host copy.
    pub fn update(&self) {
        unsafe {
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(self.buffer));
            self.gl.buffer_data_u8_slice(
                glow::UNIFORM_BUFFER,
                bytemuck::bytes_of(&self.value),
                glow::DYNAMIC_DRAW,
            );
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }
}

impl<T: Pod> Drop for GlUniformBlock<T> {
    fn drop(&mut self) {
        unsafe { self.gl.delete_buffer(self.buffer) };
    }
}
