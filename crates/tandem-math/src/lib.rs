// SPDX-License-Identifier: CEPL-1.0
pub use glam::{Mat4, Vec3};

use bytemuck::{Pod, Zeroable};

/// Layout matches the `UniformBufferObject` block in the shaders (std140:
/// three column-major mat4, no padding).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl Default for UniformBufferObject {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        }
    }
}

/// Vulkan's clip space has Y pointing down relative to GL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipSpace {
    OpenGl,
    Vulkan,
}

pub const EYE: Vec3 = Vec3::new(20.0, 20.0, 20.0);
pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 100.0;

pub fn view_matrix() -> Mat4 {
    Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y)
}

/// GL-style depth range for the OpenGL backend, zero-to-one for Vulkan.
pub fn projection(width: u32, height: u32, clip: ClipSpace) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    let fov = FOV_Y_DEGREES.to_radians();
    match clip {
        ClipSpace::OpenGl => Mat4::perspective_rh_gl(fov, aspect, Z_NEAR, Z_FAR),
        ClipSpace::Vulkan => {
            let mut proj = Mat4::perspective_rh(fov, aspect, Z_NEAR, Z_FAR);
            proj.y_axis.y *= -1.0;
            proj
        }
    }
}

impl UniformBufferObject {
    /// One animation step: fixed camera, model spun by `degrees` about +Z.
    pub fn advance(&mut self, width: u32, height: u32, clip: ClipSpace, degrees: f32) {
        self.view = view_matrix();
        self.proj = projection(width, height, clip);
        self.model *= Mat4::from_rotation_z(degrees.to_radians());
    }
}
