// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tandem_core::{RenderError, RenderResult};

use crate::api::DeviceApi;

/// Synchronization objects for one in-flight frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    /// Created signaled so the first wait on each slot returns immediately.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    pub fn null() -> Self {
        Self {
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
        }
    }
}

/// Creates `count` sets, one at a time, pushing each object into `out` as soon
/// as it exists so a failure part way leaves nothing unreachable.
pub fn create_frame_syncs(
    api: &dyn DeviceApi,
    count: usize,
    out: &mut Vec<FrameSync>,
) -> RenderResult<()> {
    for _ in 0..count {
        out.push(FrameSync::null());
        let slot = out.len() - 1;
        out[slot].image_available = api
            .create_semaphore()
            .map_err(|e| RenderError::native("vkCreateSemaphore", e).report())?;
        out[slot].render_finished = api
            .create_semaphore()
            .map_err(|e| RenderError::native("vkCreateSemaphore", e).report())?;
        out[slot].in_flight = api
            .create_fence(true)
            .map_err(|e| RenderError::native("vkCreateFence", e).report())?;
    }
    Ok(())
}

/// Destroys sets in reverse creation order, skipping objects never created.
pub fn destroy_frame_syncs(api: &dyn DeviceApi, syncs: &mut Vec<FrameSync>) {
    while let Some(sync) = syncs.pop() {
        if sync.in_flight != vk::Fence::null() {
            api.destroy_fence(sync.in_flight);
        }
        if sync.render_finished != vk::Semaphore::null() {
            api.destroy_semaphore(sync.render_finished);
        }
        if sync.image_available != vk::Semaphore::null() {
            api.destroy_semaphore(sync.image_available);
        }
    }
}
