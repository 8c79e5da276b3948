// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_void, CStr};

use ash::ext::debug_utils;
use ash::prelude::VkResult;
use ash::vk;
use tracing::{debug, error, trace, warn};

pub(crate) fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

fn type_name(types: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if types.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: the loader passes a valid callback payload for the duration of the call.
    let data = unsafe { &*data };
    if data.p_message.is_null() {
        return vk::FALSE;
    }
    // SAFETY: p_message is a NUL-terminated string owned by the loader.
    let msg = unsafe { CStr::from_ptr(data.p_message) }.to_string_lossy();
    let kind = type_name(types);
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[vulkan {kind}] {msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[vulkan {kind}] {msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!("[vulkan {kind}] {msg}");
    } else {
        trace!("[vulkan {kind}] {msg}");
    }
    vk::FALSE
}

/// Owns a debug-utils messenger; destroyed before the instance.
pub(crate) struct DebugMessenger {
    loader: debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub(crate) unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> VkResult<Self> {
        let loader = debug_utils::Instance::new(entry, instance);
        let info = messenger_create_info();
        let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }?;
        Ok(Self { loader, messenger })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None)
        };
    }
}
