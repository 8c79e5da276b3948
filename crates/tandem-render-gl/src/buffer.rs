// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use bytemuck::Pod;
use glow::HasContext as _;
use tandem_core::{RenderError, RenderResult};
use tandem_render::BufferUsage;

pub(crate) fn target(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Vertex => glow::ARRAY_BUFFER,
        BufferUsage::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferUsage::Uniform => glow::UNIFORM_BUFFER,
    }
}

/// Immutable buffer object uploaded once with STATIC_DRAW.
pub struct GlBuffer {
    gl: Rc<glow::Context>,
    buffer: glow::Buffer,
    usage: BufferUsage,
    element_count: u32,
}

impl GlBuffer {
    pub fn with_data<T: Pod>(
        gl: Rc<glow::Context>,
        usage: BufferUsage,
        data: &[T],
    ) -> RenderResult<Self> {
        let buffer = unsafe { gl.create_buffer() }
            .map_err(|e| RenderError::native("glCreateBuffer", e).report())?;
        unsafe {
            gl.bind_buffer(target(usage), Some(buffer));
            gl.buffer_data_u8_slice(target(usage), bytemuck::cast_slice(data), glow::STATIC_DRAW);
            gl.bind_buffer(target(usage), None);
        }
        Ok(Self {
            gl,
            buffer,
            usage,
            element_count: data.len() as u32,
        })
    }

    pub fn handle(&self) -> glow::Buffer {
        self.buffer
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        unsafe { self.gl.delete_buffer(self.buffer) };
    }
}
