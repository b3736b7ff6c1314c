//! Frame, shader and memory counters.

use std::time::Duration;

use serde::Serialize;

use crate::constants::PrimitiveType;

/// Bytes of GPU memory held by device resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VramStats {
    pub texture: usize,
    pub vertex_buffer: usize,
    pub index_buffer: usize,
    pub uniform_buffer: usize,
}

impl VramStats {
    pub fn total(&self) -> usize {
        self.texture + self.vertex_buffer + self.index_buffer + self.uniform_buffer
    }
}

/// Counters reset by [`frame_start`](crate::GraphicsDevice::frame_start).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub shader_switches: u32,
    /// Primitive counts indexed by [`PrimitiveType::index`].
    pub primitives: [u32; PrimitiveType::COUNT],
}

impl FrameStats {
    pub fn primitives_of(&self, type_: PrimitiveType) -> u32 {
        self.primitives[type_.index()]
    }
}

/// Shader compilation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShaderStats {
    pub vs_compiled: u32,
    pub fs_compiled: u32,
    pub linked: u32,
    pub material_shaders: u32,
    pub compile_time: Duration,
}
