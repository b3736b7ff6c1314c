//! Offscreen render targets.

use crate::handles::TextureHandle;
use crate::webgl::render_target::WebglRenderTarget;

/// Creation parameters of a [`RenderTarget`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub name: String,
    pub color_buffer: Option<TextureHandle>,
    /// Depth texture to render into instead of a renderbuffer.
    pub depth_buffer: Option<TextureHandle>,
    pub depth: bool,
    pub stencil: bool,
    pub samples: u32,
    /// Resolve the multisampled buffers at the end of a pass.
    pub auto_resolve: bool,
    /// Cube map face rendered into when the color buffer is a cube map.
    pub face: u32,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            color_buffer: None,
            depth_buffer: None,
            depth: true,
            stencil: false,
            samples: 1,
            auto_resolve: true,
            face: 0,
        }
    }
}

/// A framebuffer with its attachments.
#[derive(Debug)]
pub struct RenderTarget {
    desc: RenderTargetDescriptor,
    width: u32,
    height: u32,
    pub(crate) imp: WebglRenderTarget,
}

impl RenderTarget {
    pub(crate) fn new(desc: RenderTargetDescriptor, width: u32, height: u32) -> Self {
        Self {
            desc,
            width,
            height,
            imp: WebglRenderTarget::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn color_buffer(&self) -> Option<TextureHandle> {
        self.desc.color_buffer
    }

    pub fn depth_buffer(&self) -> Option<TextureHandle> {
        self.desc.depth_buffer
    }

    /// Has a depth attachment, either a texture or a renderbuffer.
    pub fn depth(&self) -> bool {
        self.desc.depth || self.desc.depth_buffer.is_some()
    }

    pub fn stencil(&self) -> bool {
        self.desc.stencil
    }

    pub fn samples(&self) -> u32 {
        self.desc.samples
    }

    pub fn auto_resolve(&self) -> bool {
        self.desc.auto_resolve
    }

    pub fn face(&self) -> u32 {
        self.desc.face
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn initialized(&self) -> bool {
        self.imp.initialized
    }

    pub(crate) fn lose_context(&mut self) {
        self.imp.lose_context();
    }
}
