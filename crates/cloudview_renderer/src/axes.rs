use bytemuck::{Pod, Zeroable};
use cloudview_assets::Bounds;
use glam::Vec3;

use crate::device::VertexAttribute;

pub const AXIS_VERTICES: i32 = 6;

const X_COLOR: [f32; 3] = [1.0, 1.0, 0.0];
const Y_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
const Z_COLOR: [f32; 3] = [0.0, 0.0, 1.0];

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AxisVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl AxisVertex {
    pub fn layout() -> [VertexAttribute; 2] {
        [
            // position
            VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            },
            // color
            VertexAttribute {
                location: 1,
                components: 3,
                offset: 12,
            },
        ]
    }
}

/// One line per axis through `centroid`, spanning the cloud bounds.
pub fn axis_lines(bounds: &Bounds, centroid: Vec3) -> [AxisVertex; 6] {
    let Vec3 { x, y, z } = centroid;
    let (min, max) = (bounds.min, bounds.max);
    let vertex = |position: [f32; 3], color| AxisVertex { position, color };
    [
        vertex([min.x, y, z], X_COLOR),
        vertex([max.x, y, z], X_COLOR),
        vertex([x, min.y, z], Y_COLOR),
        vertex([x, max.y, z], Y_COLOR),
        vertex([x, y, min.z], Z_COLOR),
        vertex([x, y, max.z], Z_COLOR),
    ]
}
