// SPDX-License-Identifier: CEPL-1.0
use std::path::Path;
use std::rc::Rc;

use ash::vk;
use tandem_core::{RenderError, RenderResult};
use tandem_render::ShaderStage;
use tracing::debug;

use crate::api::DeviceApi;

pub(crate) fn stage_flags(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

fn shader_kind(stage: ShaderStage) -> shaderc::ShaderKind {
    match stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
    }
}

/// Compiles GLSL source at `path` to SPIR-V for a Vulkan 1.0 target.
pub fn compile_glsl(stage: ShaderStage, path: &Path) -> RenderResult<Vec<u32>> {
    let source = std::fs::read_to_string(path).map_err(|source| {
        RenderError::Io {
            path: path.to_path_buf(),
            source,
        }
        .report()
    })?;
    compile_source(stage, &source, path)
}

fn compile_source(stage: ShaderStage, source: &str, path: &Path) -> RenderResult<Vec<u32>> {
    let compiler = shaderc::Compiler::new()
        .map_err(|e| RenderError::unavailable("shader compiler", e.to_string()).report())?;
    let mut options = shaderc::CompileOptions::new()
        .map_err(|e| RenderError::unavailable("shader compile options", e.to_string()).report())?;
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );

    let name = path.to_string_lossy();
    let artifact = compiler
        .compile_into_spirv(source, shader_kind(stage), &name, "main", Some(&options))
        .map_err(|e| {
            RenderError::Compilation {
                path: path.to_path_buf(),
                log: e.to_string(),
            }
            .report()
        })?;
    if artifact.get_num_warnings() > 0 {
        debug!("vk: {name}: {}", artifact.get_warning_messages());
    }
    Ok(artifact.as_binary().to_vec())
}

/// A uniform block as a pipeline and queue need to see it: its set layout,
/// binding slot and one buffer per in-flight frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBinding {
    pub layout: vk::DescriptorSetLayout,
    pub binding: u32,
    pub buffers: Vec<vk::Buffer>,
    pub size: vk::DeviceSize,
}

pub struct Shader {
    api: Rc<dyn DeviceApi>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    uniforms: Vec<UniformBinding>,
}

impl Shader {
    pub fn from_file(api: Rc<dyn DeviceApi>, stage: ShaderStage, path: &Path) -> RenderResult<Self> {
        let code = compile_glsl(stage, path)?;
        debug!("vk: compiled {} ({} words)", path.display(), code.len());
        Self::from_spirv(api, stage, &code)
    }

    pub fn from_spirv(api: Rc<dyn DeviceApi>, stage: ShaderStage, code: &[u32]) -> RenderResult<Self> {
        let module = api
            .create_shader_module(code)
            .map_err(|e| RenderError::native("vkCreateShaderModule", e).report())?;
        Ok(Self {
            api,
            module,
            stage,
            uniforms: Vec::new(),
        })
    }

    pub fn attach_uniform(&mut self, binding: UniformBinding) {
        self.uniforms.push(binding);
    }

    pub fn module(&self) -> vk::ShaderModule {
        self.module
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.api.destroy_shader_module(self.module);
    }
}
