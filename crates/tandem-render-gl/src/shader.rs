// SPDX-License-Identifier: CEPL-1.0
use std::path::Path;
use std::rc::Rc;

use glow::HasContext as _;
use tandem_core::{RenderError, RenderResult};
use tandem_render::ShaderStage;

pub(crate) fn shader_kind(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// A compiled shader object; the pipeline deletes it once linked.
pub struct GlShader {
    gl: Rc<glow::Context>,
    shader: Option<glow::Shader>,
    stage: ShaderStage,
}

impl GlShader {
    pub fn from_file(gl: Rc<glow::Context>, stage: ShaderStage, path: &Path) -> RenderResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            RenderError::Io {
                path: path.to_path_buf(),
                source,
            }
            .report()
        })?;
        let shader = unsafe { gl.create_shader(shader_kind(stage)) }
            .map_err(|e| RenderError::native("glCreateShader", e).report())?;
        let this = Self {
            gl,
            shader: Some(shader),
            stage,
        };
        unsafe {
            this.gl.shader_source(shader, &source);
            this.gl.compile_shader(shader);
            if !this.gl.get_shader_compile_status(shader) {
                return Err(RenderError::Compilation {
                    path: path.to_path_buf(),
                    log: this.gl.get_shader_info_log(shader),
                }
                .report());
            }
        }
        Ok(this)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub(crate) fn handle(&self) -> Option<glow::Shader> {
        self.shader
    }

    /// Hands the object to a program that deletes it after linking.
    pub(crate) fn take(&mut self) -> Option<glow::Shader> {
        self.shader.take()
    }
}

impl Drop for GlShader {
    fn drop(&mut self) {
        if let Some(shader) = self.shader.take() {
            unsafe { self.gl.delete_shader(shader) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_maps_to_gl_kind() {
        assert_eq!(shader_kind(ShaderStage::Vertex), glow::VERTEX_SHADER);
        assert_eq!(shader_kind(ShaderStage::Fragment), glow::FRAGMENT_SHADER);
    }
}
