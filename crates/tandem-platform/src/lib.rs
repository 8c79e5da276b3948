// SPDX-License-Identifier: CEPL-1.0
pub use winit;

use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowAttributes;

/// Fixed-size window; the renderers never rebuild their swapchain/surface.
pub fn window_attributes(title: &str, width: u32, height: u32) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(title)
        .with_inner_size(PhysicalSize::new(width, height))
        .with_resizable(false)
}

/// Escape closes the window once the key is released.
pub fn is_close_key(event: &KeyEvent) -> bool {
    event.state == ElementState::Released && event.logical_key == Key::Named(NamedKey::Escape)
}
