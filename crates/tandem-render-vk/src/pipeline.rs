// SPDX-License-Identifier: CEPL-1.0
//! Render pass and graphics pipeline construction.
use std::rc::Rc;

use ash::vk;
use tandem_core::{RenderError, RenderResult};
use tandem_render::{AttributeFormat, VertexLayout};
use tracing::debug;

use crate::api::DeviceApi;
use crate::shader::{stage_flags, Shader, UniformBinding};
use crate::swapchain::DEPTH_FORMAT;

const ENTRY_POINT: &std::ffi::CStr = c"main";

fn attribute_format(format: AttributeFormat) -> vk::Format {
    match format {
        AttributeFormat::Float3 => vk::Format::R32G32B32_SFLOAT,
        AttributeFormat::Float4 => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Binding 0 and its attributes; a layout with no attributes has no binding.
pub fn vertex_input(
    layout: &VertexLayout,
) -> RenderResult<(vk::VertexInputBindingDescription, Vec<vk::VertexInputAttributeDescription>)>
{
    if layout.is_empty() {
        return Err(RenderError::state("pipeline has no vertex bindings registered").report());
    }
    let binding = vk::VertexInputBindingDescription {
        binding: 0,
        stride: layout.stride(),
        input_rate: vk::VertexInputRate::VERTEX,
    };
    let attributes = layout
        .attributes()
        .iter()
        .map(|a| vk::VertexInputAttributeDescription {
            location: a.location,
            binding: 0,
            format: attribute_format(a.format),
            offset: a.offset,
        })
        .collect();
    Ok((binding, attributes))
}

fn create_render_pass(api: &dyn DeviceApi, color_format: vk::Format) -> RenderResult<vk::RenderPass> {
    let attachments = [
        // colour: cleared, kept, handed to the presentation engine
        vk::AttachmentDescription {
            format: color_format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        },
        // depth: cleared, discarded
        vk::AttachmentDescription {
            format: DEPTH_FORMAT,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ..Default::default()
        },
    ];
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_ref))
        .depth_stencil_attachment(&depth_ref);
    // colour and depth writes wait for the previous frame's use of the attachments
    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    let dependency = vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: stages,
        dst_stage_mask: stages,
        src_access_mask: vk::AccessFlags::empty(),
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ..Default::default()
    };
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));
    api.create_render_pass(&info)
        .map_err(|e| RenderError::native("vkCreateRenderPass", e).report())
}

/// Collects shader stages and a vertex layout, then builds the render pass,
/// layout, cache and pipeline in one go.
pub struct PipelineBuilder<'a> {
    api: Rc<dyn DeviceApi>,
    shaders: Vec<&'a Shader>,
    vertex_layout: Option<&'a VertexLayout>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(api: Rc<dyn DeviceApi>) -> Self {
        Self {
            api,
            shaders: Vec::new(),
            vertex_layout: None,
        }
    }

    pub fn add_shader(mut self, shader: &'a Shader) -> Self {
        self.shaders.push(shader);
        self
    }

    pub fn use_vertex_layout(mut self, layout: &'a VertexLayout) -> Self {
        self.vertex_layout = Some(layout);
        self
    }

    /// Viewport and scissor are static and cover `viewport` from the origin.
    pub fn build(self, color_format: vk::Format, viewport: vk::Extent2D) -> RenderResult<Pipeline> {
        let vertex_layout = self
            .vertex_layout
            .ok_or_else(|| RenderError::state("pipeline has no vertex bindings registered").report())?;
        let (binding, attributes) = vertex_input(vertex_layout)?;
        if self.shaders.is_empty() {
            return Err(RenderError::state("pipeline has no shader stages").report());
        }
        let uniforms: Vec<UniformBinding> = self
            .shaders
            .iter()
            .flat_map(|s| s.uniforms().iter().cloned())
            .collect();

        let mut pipeline = Pipeline {
            api: self.api,
            render_pass: vk::RenderPass::null(),
            layout: vk::PipelineLayout::null(),
            cache: vk::PipelineCache::null(),
            pipeline: vk::Pipeline::null(),
            uniforms,
            binding,
            attributes,
        };
        let api = pipeline.api.clone();

        pipeline.render_pass = create_render_pass(api.as_ref(), color_format)?;

        // set order follows the order uniforms were attached
        let set_layouts: Vec<vk::DescriptorSetLayout> =
            pipeline.uniforms.iter().map(|u| u.layout).collect();
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        pipeline.layout = api
            .create_pipeline_layout(&layout_info)
            .map_err(|e| RenderError::native("vkCreatePipelineLayout", e).report())?;
        pipeline.cache = api
            .create_pipeline_cache()
            .map_err(|e| RenderError::native("vkCreatePipelineCache", e).report())?;

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = self
            .shaders
            .iter()
            .map(|s| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage_flags(s.stage()))
                    .module(s.module())
                    .name(ENTRY_POINT)
            })
            .collect();

        // --- Fixed-function state ---
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(std::slice::from_ref(&pipeline.binding))
            .vertex_attribute_descriptions(&pipeline.attributes);
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            ..Default::default()
        };
        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: viewport.width as f32,
            height: viewport.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: viewport,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);
        let raster = vk::PipelineRasterizationStateCreateInfo {
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            line_width: 1.0,
            ..Default::default()
        };
        let multisample = vk::PipelineMultisampleStateCreateInfo {
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            ..Default::default()
        };
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo {
            depth_test_enable: vk::TRUE,
            depth_write_enable: vk::TRUE,
            depth_compare_op: vk::CompareOp::LESS,
            ..Default::default()
        };
        let blend_attachment = vk::PipelineColorBlendAttachmentState {
            color_write_mask: vk::ColorComponentFlags::RGBA,
            blend_enable: vk::FALSE,
            ..Default::default()
        };
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(std::slice::from_ref(&blend_attachment));

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&raster)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .layout(pipeline.layout)
            .render_pass(pipeline.render_pass)
            .subpass(0);
        pipeline.pipeline = api
            .create_graphics_pipeline(pipeline.cache, &info)
            .map_err(|e| RenderError::native("vkCreateGraphicsPipelines", e).report())?;

        debug!(
            "vk: pipeline built with {} stages, {} attributes, {} uniform sets",
            stages.len(),
            pipeline.attributes.len(),
            pipeline.uniforms.len()
        );
        Ok(pipeline)
    }
}

pub struct Pipeline {
    api: Rc<dyn DeviceApi>,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    cache: vk::PipelineCache,
    pipeline: vk::Pipeline,
    uniforms: Vec<UniformBinding>,
    binding: vk::VertexInputBindingDescription,
    attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl Pipeline {
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Uniform blocks in descriptor-set order.
    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    pub fn vertex_binding(&self) -> vk::VertexInputBindingDescription {
        self.binding
    }

    pub fn vertex_attributes(&self) -> &[vk::VertexInputAttributeDescription] {
        &self.attributes
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.pipeline != vk::Pipeline::null() {
            self.api.destroy_pipeline(self.pipeline);
        }
        if self.cache != vk::PipelineCache::null() {
            self.api.destroy_pipeline_cache(self.cache);
        }
        if self.layout != vk::PipelineLayout::null() {
            self.api.destroy_pipeline_layout(self.layout);
        }
        if self.render_pass != vk::RenderPass::null() {
            self.api.destroy_render_pass(self.render_pass);
        }
    }
}
