// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tandem_core::{RenderError, RenderResult};

/// First memory type allowed by `type_bits` that carries every flag in `flags`.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> RenderResult<u32> {
    let count = props.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count)
        .find(|&i| {
            type_bits & (1 << i) != 0
                && props.memory_types[i as usize].property_flags.contains(flags)
        })
        .ok_or_else(|| RenderError::unavailable("memory type", format!("{flags:?}")).report())
}
