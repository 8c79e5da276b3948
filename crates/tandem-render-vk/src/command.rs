// SPDX-License-Identifier: CEPL-1.0
//! Units of recorded work the queue replays into every frame.
use std::rc::Rc;

use ash::vk;
use tandem_core::RenderResult;
use tandem_render::{ensure_index_usage, ClearColor};

use crate::api::{DeviceApi, RenderPassBegin};
use crate::buffer::Buffer;

/// Everything a command may record against for one frame. `framebuffer` and
/// `command_buffer` belong to the acquired image, `descriptor_sets` to the
/// in-flight frame.
pub struct FrameContext<'a> {
    pub api: &'a dyn DeviceApi,
    pub command_buffer: vk::CommandBuffer,
    pub framebuffer: vk::Framebuffer,
    pub render_pass: vk::RenderPass,
    pub extent: vk::Extent2D,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_sets: &'a [vk::DescriptorSet],
}

pub trait Command {
    fn record(&self, ctx: &FrameContext<'_>);
}

/// Begins the render pass, clearing colour and depth.
pub struct ClearCommand {
    clear_values: [vk::ClearValue; 2],
}

impl ClearCommand {
    pub fn new(color: ClearColor) -> Self {
        Self {
            clear_values: [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: color.normalized(),
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                },
            ],
        }
    }
}

impl Command for ClearCommand {
    fn record(&self, ctx: &FrameContext<'_>) {
        ctx.api.cmd_begin_render_pass(
            ctx.command_buffer,
            &RenderPassBegin {
                render_pass: ctx.render_pass,
                framebuffer: ctx.framebuffer,
                extent: ctx.extent,
                clear_values: self.clear_values,
            },
        );
    }
}

/// Indexed draw of the whole index buffer; ends the render pass.
pub struct DrawCommand {
    vertex: Rc<Buffer>,
    index: Rc<Buffer>,
}

impl DrawCommand {
    pub fn new(vertex: Rc<Buffer>, index: Rc<Buffer>) -> RenderResult<Self> {
        ensure_index_usage(index.usage())?;
        Ok(Self { vertex, index })
    }
}

impl Command for DrawCommand {
    fn record(&self, ctx: &FrameContext<'_>) {
        let cmd = ctx.command_buffer;
        ctx.api.cmd_bind_pipeline(cmd, ctx.pipeline);
        ctx.api.cmd_bind_vertex_buffer(cmd, 0, self.vertex.handle());
        ctx.api.cmd_bind_index_buffer(cmd, self.index.handle());
        if !ctx.descriptor_sets.is_empty() {
            ctx.api
                .cmd_bind_descriptor_sets(cmd, ctx.pipeline_layout, ctx.descriptor_sets);
        }
        ctx.api.cmd_draw_indexed(cmd, self.index.element_count());
        ctx.api.cmd_end_render_pass(cmd);
    }
}
