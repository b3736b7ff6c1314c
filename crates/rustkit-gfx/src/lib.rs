//! # RustKit Gfx
//!
//! Graphics device abstraction for RustKit, with a WebGL backend that
//! caches GPU state.
//!
//! ## Features
//!
//! - **Resources**: shaders, textures, vertex/index buffers and render
//!   targets live in registries owned by the device and are addressed by
//!   handles
//! - **State cache**: blend, depth, stencil, cull, raster, clear,
//!   viewport/scissor and pixel store state are only sent to the context
//!   when they change
//! - **Uniform scope**: named values with versioned dirty tracking; a draw
//!   only re-uploads uniforms whose value moved
//! - **Vertex arrays**: one per single buffer, plus a cache for buffer
//!   combinations
//! - **Context loss**: resources survive a lost context and come back on
//!   restore
//!
//! ## Architecture
//!
//! [`GraphicsDevice`] holds what every backend shares: canvas size,
//! registries, statistics and events. [`WebglGraphicsDevice`] wraps it
//! (through `Deref`) and adds the context plus the shadow state used to
//! filter redundant calls.

pub mod buffer;
pub mod config;
pub mod constants;
pub mod device;
pub mod events;
pub mod handles;
pub mod primitive;
pub mod render_pass;
pub mod render_target;
pub mod scope;
pub mod shader;
pub mod shader_input;
pub mod stats;
pub mod texture;
pub mod version;
pub mod vertex_format;
pub mod webgl;

pub use buffer::{IndexBuffer, VertexBuffer};
pub use config::{CapabilityOverride, DeviceOptions};
pub use constants::*;
pub use device::GraphicsDevice;
pub use events::{DeviceEvent, EventEmitter, EventKind, ListenerId};
pub use handles::{
    IndexBufferHandle, RenderTargetHandle, ScopeHandle, ShaderHandle, TextureHandle,
    VertexBufferHandle,
};
pub use primitive::Primitive;
pub use render_pass::{ClearOptions, ColorAttachmentOps, DepthStencilAttachmentOps, RenderPass};
pub use render_target::{RenderTarget, RenderTargetDescriptor};
pub use scope::{ScopeId, ScopeSpace, ScopeValue};
pub use shader::{Shader, ShaderDefinition, ShaderTag};
pub use shader_input::ShaderInput;
pub use stats::{FrameStats, ShaderStats, VramStats};
pub use texture::{Texture, TextureDescriptor};
pub use version::{Version, VersionedObject};
pub use vertex_format::{VertexAttribute, VertexElement, VertexFormat};
pub use webgl::{ContextState, DeviceCapabilities, Extensions, RenderState, WebglGraphicsDevice};

pub use rustkit_common::{Result, RustKitError};

#[cfg(test)]
pub(crate) mod test_support {
    use rustkit_webgl::{GpuProfile, HtmlCanvas};

    use crate::config::DeviceOptions;
    use crate::constants::{DataType, Semantic};
    use crate::vertex_format::{VertexAttribute, VertexFormat};
    use crate::webgl::WebglGraphicsDevice;

    pub const TRIANGLE_VS: &str = "attribute vec3 aPosition;
void main() {
    gl_Position = vec4(aPosition, 1.0);
}
";

    pub const TRIANGLE_FS: &str = "precision mediump float;
uniform vec4 color;
void main() {
    gl_FragColor = color;
}
";

    pub fn webgl2_device() -> WebglGraphicsDevice {
        WebglGraphicsDevice::new(HtmlCanvas::new(64, 64), DeviceOptions::default()).unwrap()
    }

    pub fn webgl1_device() -> WebglGraphicsDevice {
        let canvas = HtmlCanvas::with_profile(64, 64, GpuProfile::desktop().webgl1_only());
        WebglGraphicsDevice::new(canvas, DeviceOptions::default()).unwrap()
    }

    /// Three floats per vertex, 12 bytes.
    pub fn position_format() -> VertexFormat {
        VertexFormat::new(&[VertexAttribute::new(Semantic::Position, 3, DataType::Float32)])
    }
}
