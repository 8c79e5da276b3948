// SPDX-License-Identifier: CEPL-1.0
use std::ptr::NonNull;
use std::rc::Rc;

use ash::vk;
use bytemuck::Pod;
use tandem_core::{RenderError, RenderResult};
use tandem_render::BufferUsage;

use crate::api::DeviceApi;
use crate::memory::find_memory_type;

fn usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
    }
}

/// Host-visible, host-coherent buffer that stays mapped for its whole life.
pub struct Buffer {
    api: Rc<dyn DeviceApi>,
    usage: BufferUsage,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    mapped: Option<NonNull<u8>>,
    size: vk::DeviceSize,
    element_count: u32,
}

impl Buffer {
    pub fn new(
        api: Rc<dyn DeviceApi>,
        usage: BufferUsage,
        size: vk::DeviceSize,
    ) -> RenderResult<Self> {
        if size == 0 {
            return Err(RenderError::state(format!("{usage:?} buffer of zero bytes")).report());
        }
        let info = vk::BufferCreateInfo {
            size,
            usage: usage_flags(usage),
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let buffer = api
            .create_buffer(&info)
            .map_err(|e| RenderError::native("vkCreateBuffer", e).report())?;

        // From here on Drop releases whatever has been created.
        let mut this = Self {
            api,
            usage,
            buffer,
            memory: vk::DeviceMemory::null(),
            mapped: None,
            size,
            element_count: 0,
        };

        let req = this.api.buffer_memory_requirements(buffer);
        let type_index = find_memory_type(
            &this.api.memory_properties(),
            req.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        this.memory = this
            .api
            .allocate_memory(req.size, type_index)
            .map_err(|e| RenderError::native("vkAllocateMemory", e).report())?;
        this.api
            .bind_buffer_memory(buffer, this.memory)
            .map_err(|e| RenderError::native("vkBindBufferMemory", e).report())?;
        let ptr = this
            .api
            .map_memory(this.memory)
            .map_err(|e| RenderError::native("vkMapMemory", e).report())?;
        this.mapped = Some(
            NonNull::new(ptr.cast::<u8>())
                .ok_or_else(|| RenderError::state("vkMapMemory returned null").report())?,
        );
        Ok(this)
    }

    /// Creates a buffer sized for `data` and uploads it once.
    pub fn with_data<T: Pod>(
        api: Rc<dyn DeviceApi>,
        usage: BufferUsage,
        data: &[T],
    ) -> RenderResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut buffer = Self::new(api, usage, bytes.len() as vk::DeviceSize)?;
        buffer.upload(bytes)?;
        buffer.element_count = data.len() as u32;
        Ok(buffer)
    }

    /// Copies `bytes` to the start of the mapped range.
    pub fn upload(&mut self, bytes: &[u8]) -> RenderResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(RenderError::state(format!(
                "upload of {} bytes into a {}-byte buffer",
                bytes.len(),
                self.size
            ))
            .report());
        }
        let dst = self
            .mapped
            .ok_or_else(|| RenderError::state("buffer is not mapped").report())?;
        // SAFETY: `dst` maps at least `self.size` bytes and nothing else aliases it.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), bytes.len()) };
        Ok(())
    }

    /// The mapped range as the host sees it.
    pub fn mapped_bytes(&self) -> &[u8] {
        match self.mapped {
            // SAFETY: the mapping covers `self.size` bytes for as long as `self` lives.
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.size as usize) },
            None => &[],
        }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // unmap → free → destroy
        if self.mapped.take().is_some() {
            self.api.unmap_memory(self.memory);
        }
        if self.memory != vk::DeviceMemory::null() {
            self.api.free_memory(self.memory);
        }
        if self.buffer != vk::Buffer::null() {
            self.api.destroy_buffer(self.buffer);
        }
    }
}
