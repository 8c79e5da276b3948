// SPDX-License-Identifier: CEPL-1.0
use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::{COLOR_LOCATION, POSITION_LOCATION};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
}

pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeFormat {
    Float3,
    Float4,
}

impl AttributeFormat {
    pub fn components(self) -> u32 {
        match self {
            AttributeFormat::Float3 => 3,
            AttributeFormat::Float4 => 4,
        }
    }

    pub fn byte_size(self) -> u32 {
        self.components() * size_of::<f32>() as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: AttributeFormat,
    pub offset: u32,
}

/// Attributes of the single interleaved vertex binding (binding 0).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    stride: u32,
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: VertexAttribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// True while no attribute has been registered, i.e. no binding exists yet.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Vertex {
    pub fn white(pos: [f32; 3]) -> Self {
        Self { pos, color: WHITE }
    }

    pub fn layout() -> VertexLayout {
        let mut layout = VertexLayout::new(size_of::<Vertex>() as u32);
        layout
            .add_attribute(VertexAttribute {
                location: POSITION_LOCATION,
                format: AttributeFormat::Float3,
                offset: offset_of!(Vertex, pos) as u32,
            })
            .add_attribute(VertexAttribute {
                location: COLOR_LOCATION,
                format: AttributeFormat::Float4,
                offset: offset_of!(Vertex, color) as u32,
            });
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct_fields() {
        let layout = Vertex::layout();
        assert_eq!(layout.stride(), 28);
        assert_eq!(
            layout.attributes(),
            &[
                VertexAttribute {
                    location: 0,
                    format: AttributeFormat::Float3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    format: AttributeFormat::Float4,
                    offset: 12,
                },
            ]
        );
    }

    #[test]
    fn new_layout_has_no_binding() {
        assert!(VertexLayout::new(28).is_empty());
    }

    #[test]
    fn float_formats_report_sizes() {
        assert_eq!(AttributeFormat::Float3.byte_size(), 12);
        assert_eq!(AttributeFormat::Float4.byte_size(), 16);
    }
}
