// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tandem_core::{RenderError, RenderResult};
use tandem_math::{ClipSpace, UniformBufferObject};

pub mod mesh;
mod settings;
mod vertex;

pub use mesh::Mesh;
pub use settings::{split_list, ClearColor, RenderSettings, VulkanSettings};
pub use vertex::{AttributeFormat, Vertex, VertexAttribute, VertexLayout};

pub const UNIFORM_BLOCK_NAME: &str = "UniformBufferObject";
pub const UNIFORM_BLOCK_BINDING: u32 = 0;
pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Draw commands take their index buffer by reference; a buffer created for
/// any other usage must never reach the indexed draw.
pub fn ensure_index_usage(usage: BufferUsage) -> RenderResult<()> {
    if usage != BufferUsage::Index {
        return Err(RenderError::state(format!(
            "draw command expects an index buffer, got a {usage:?} buffer"
        ))
        .report());
    }
    Ok(())
}

/// One backend, selected once at startup. The frame loop only talks to this.
pub trait Renderer {
    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        settings: &RenderSettings,
        mesh: &Mesh,
    ) -> Result<Self>
    where
        Self: Sized;

    fn clip_space(&self) -> ClipSpace;

    /// Host copy of the uniform block; picked up by the next `render`.
    fn uniforms_mut(&mut self) -> &mut UniformBufferObject;

    /// Uploads the uniforms, replays the recorded commands and presents.
    fn render(&mut self) -> Result<()>;
}
