// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use glow::HasContext as _;
use tandem_core::{RenderError, RenderResult};
use tandem_render::{BufferUsage, VertexLayout};
use tracing::debug;

use crate::buffer::GlBuffer;
use crate::shader::GlShader;

/// Arguments to one `glVertexAttribPointer` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributePointer {
    pub location: u32,
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

pub fn attribute_pointers(layout: &VertexLayout) -> RenderResult<Vec<AttributePointer>> {
    if layout.is_empty() {
        return Err(RenderError::state("pipeline has no vertex bindings registered").report());
    }
    Ok(layout
        .attributes()
        .iter()
        .map(|a| AttributePointer {
            location: a.location,
            components: a.format.components() as i32,
            stride: layout.stride() as i32,
            offset: a.offset as i32,
        })
        .collect())
}

/// Linked program plus the vertex array describing the vertex buffer.
pub struct GlPipeline {
    gl: Rc<glow::Context>,
    program: glow::Program,
    vao: Option<glow::VertexArray>,
}

impl GlPipeline {
    pub fn new(
        gl: Rc<glow::Context>,
        mut shaders: Vec<GlShader>,
        layout: &VertexLayout,
        vertex: &GlBuffer,
    ) -> RenderResult<Self> {
        let pointers = attribute_pointers(layout)?;
        if vertex.usage() != BufferUsage::Vertex {
            return Err(RenderError::state(format!(
                "pipeline expects a vertex buffer, got a {:?} buffer",
                vertex.usage()
            ))
            .report());
        }

        let program = unsafe { gl.create_program() }
            .map_err(|e| RenderError::native("glCreateProgram", e).report())?;
        let mut this = Self {
            gl,
            program,
            vao: None,
        };
        let gl = this.gl.clone();

        unsafe {
            for shader in shaders.iter().filter_map(GlShader::handle) {
                gl.attach_shader(program, shader);
            }
            gl.link_program(program);
            for shader in shaders.iter_mut().filter_map(GlShader::take) {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !gl.get_program_link_status(program) {
                return Err(RenderError::Linkage(gl.get_program_info_log(program)).report());
            }

            let vao = gl
                .create_vertex_array()
                .map_err(|e| RenderError::native("glCreateVertexArray", e).report())?;
            this.vao = Some(vao);
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex.handle()));
            for p in &pointers {
                gl.enable_vertex_attrib_array(p.location);
                gl.vertex_attrib_pointer_f32(
                    p.location,
                    p.components,
                    glow::FLOAT,
                    false,
                    p.stride,
                    p.offset,
                );
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
        }
        debug!("gl: program linked, {} attributes", pointers.len());
        Ok(this)
    }

    pub fn program(&self) -> glow::Program {
        self.program
    }

    pub fn vertex_array(&self) -> Option<glow::VertexArray> {
        self.vao
    }
}

impl Drop for GlPipeline {
    fn drop(&mut self) {
        unsafe {
            if let Some(vao) = self.vao.take() {
                self.gl.delete_vertex_array(vao);
            }
            self.gl.delete_program(self.program);
        }
    }
}
