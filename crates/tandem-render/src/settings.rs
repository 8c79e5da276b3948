// SPDX-License-Identifier: CEPL-1.0
use std::path::PathBuf;
use std::str::FromStr;

use tandem_core::RenderError;

use crate::RenderSize;

/// Clear colour as four 8-bit channel values (`"51,51,51,255"`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor(pub [f32; 4]);

impl ClearColor {
    /// Channels divided by 256: `51` maps to `0.199`, `255` to `0.996`.
    pub fn normalized(&self) -> [f32; 4] {
        self.0.map(|c| c / 256.0)
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self([0.0, 0.0, 0.0, 255.0])
    }
}

impl FromStr for ClearColor {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let items = split_list(s);
        if items.len() != 4 {
            return Err(RenderError::Config(format!(
                "clear colour needs 4 channels, got {} in `{s}`",
                items.len()
            )));
        }
        let mut rgba = [0.0f32; 4];
        for (slot, item) in rgba.iter_mut().zip(&items) {
            *slot = item
                .parse::<f32>()
                .map_err(|e| RenderError::Config(format!("clear colour channel `{item}`: {e}")))?;
        }
        Ok(Self(rgba))
    }
}

/// Comma-separated list with all spaces stripped and empty items dropped.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|item| item.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|item| !item.is_empty())
        .collect()
}

#[derive(Clone, Debug)]
pub struct VulkanSettings {
    pub instance_layers: Vec<String>,
    pub instance_extensions: Vec<String>,
    pub device_extensions: Vec<String>,
    /// Swapchain image count and number of in-flight frames.
    pub frame_count: u32,
    /// Raw `VkFormat` value of the presentation format.
    pub surface_format: i32,
    pub wait_idle_after_present: bool,
    pub request_coherent_memory: bool,
}

impl Default for VulkanSettings {
    fn default() -> Self {
        Self {
            instance_layers: Vec::new(),
            instance_extensions: Vec::new(),
            device_extensions: vec!["VK_KHR_swapchain".to_owned()],
            frame_count: 2,
            surface_format: 44,
            wait_idle_after_present: true,
            request_coherent_memory: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub size: RenderSize,
    pub clear_color: ClearColor,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub vulkan: VulkanSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_clear_colour_normalises_to_about_point_two() {
        let c: ClearColor = "51,51,51,255".parse().unwrap();
        let [r, g, b, a] = c.normalized();
        for ch in [r, g, b] {
            assert!((ch - 0.199).abs() < 1e-3, "{ch}");
        }
        assert!((a - 1.0).abs() < 5e-3, "{a}");
    }

    #[test]
    fn clear_colour_tolerates_spaces() {
        let c: ClearColor = " 0, 128 ,255 , 255".parse().unwrap();
        assert_eq!(c.0, [0.0, 128.0, 255.0, 255.0]);
    }

    #[test]
    fn clear_colour_rejects_wrong_arity_and_junk() {
        assert!(matches!("1,2,3".parse::<ClearColor>(), Err(RenderError::Config(_))));
        assert!(matches!("1,2,x,4".parse::<ClearColor>(), Err(RenderError::Config(_))));
    }

    #[test]
    fn split_list_strips_spaces_and_empties() {
        assert_eq!(
            split_list("VK_KHR_surface, VK_KHR_xcb_surface,,"),
            vec!["VK_KHR_surface", "VK_KHR_xcb_surface"]
        );
        assert!(split_list("").is_empty());
    }
}
