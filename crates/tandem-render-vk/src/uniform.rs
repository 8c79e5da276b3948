// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use bytemuck::Pod;
use tandem_core::{RenderError, RenderResult};
use tandem_render::BufferUsage;

use crate::api::DeviceApi;
use crate::buffer::Buffer;
use crate::shader::{stage_flags, Shader, UniformBinding};

/// Per-frame host data the queue uploads right before recording.
pub trait FrameUniforms {
    fn flush(&mut self, frame: usize) -> RenderResult<()>;
}

/// A uniform block with one host-visible copy per in-flight frame so the host
/// never writes a copy the GPU may still read.
pub struct UniformBlock<T: Pod> {
    api: Rc<dyn DeviceApi>,
    layout: vk::DescriptorSetLayout,
    binding: u32,
    buffers: Vec<Buffer>,
    value: T,
}

impl<T: Pod> UniformBlock<T> {
    /// Creates the block and attaches it to `shader`, whose stage the
    /// descriptor layout is declared for.
    pub fn new(
        api: Rc<dyn DeviceApi>,
        shader: &mut Shader,
        binding: u32,
        frame_count: usize,
        value: T,
    ) -> RenderResult<Self> {
        let bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(stage_flags(shader.stage()))];
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = api
            .create_descriptor_set_layout(&info)
            .map_err(|e| RenderError::native("vkCreateDescriptorSetLayout", e).report())?;
        let mut this = Self {
            api,
            layout,
            binding,
            buffers: Vec::with_capacity(frame_count),
            value,
        };

        let size = std::mem::size_of::<T>() as vk::DeviceSize;
        for _ in 0..frame_count {
            let buffer = Buffer::new(this.api.clone(), BufferUsage::Uniform, size)?;
            this.buffers.push(buffer);
        }
        for frame in 0..frame_count {
            this.flush(frame)?;
        }
        shader.attach_uniform(this.binding_info());
        Ok(this)
    }

    pub fn binding_info(&self) -> UniformBinding {
        UniformBinding {
            layout: self.layout,
            binding: self.binding,
            buffers: self.buffers.iter().map(Buffer::handle).collect(),
            size: std::mem::size_of::<T>() as vk::DeviceSize,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn buffer(&self, frame: usize) -> Option<&Buffer> {
        self.buffers.get(frame)
    }
}

impl<T: Pod> FrameUniforms for UniformBlock<T> {
    fn flush(&mut self, frame: usize) -> RenderResult<()> {
        let count = self.buffers.len();
        let buffer = self.buffers.get_mut(frame).ok_or_else(|| {
            RenderError::state(format!("uniform frame {frame} out of {count}")).report()
        })?;
        buffer.upload(bytemuck::bytes_of(&self.value))
    }
}

impl<T: Pod> Drop for UniformBlock<T> {
    fn drop(&mut self) {
        self.buffers.clear();
        self.api.destroy_descriptor_set_layout(self.layout);
    }
}
