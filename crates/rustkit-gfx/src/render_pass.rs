//! Render passes and clears.

use crate::constants::ClearFlags;
use crate::handles::RenderTargetHandle;

/// What happens to the color attachment around a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentOps {
    pub clear: bool,
    pub clear_value: [f32; 4],
    /// Keep the rendered color after the pass.
    pub store: bool,
    /// Resolve multisampled color into the color buffer.
    pub resolve: bool,
    /// Generate mipmaps for the color buffer after the pass.
    pub mipmaps: bool,
}

impl Default for ColorAttachmentOps {
    fn default() -> Self {
        Self {
            clear: false,
            clear_value: [0.0, 0.0, 0.0, 1.0],
            store: false,
            resolve: true,
            mipmaps: false,
        }
    }
}

/// What happens to depth and stencil around a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachmentOps {
    pub clear_depth: bool,
    pub clear_depth_value: f32,
    pub clear_stencil: bool,
    pub clear_stencil_value: i32,
    pub store_depth: bool,
    pub store_stencil: bool,
}

impl Default for DepthStencilAttachmentOps {
    fn default() -> Self {
        Self {
            clear_depth: false,
            clear_depth_value: 1.0,
            clear_stencil: false,
            clear_stencil_value: 0,
            store_depth: false,
            store_stencil: false,
        }
    }
}

/// A unit of rendering into one target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    pub name: String,
    /// `None` renders to the canvas.
    pub render_target: Option<RenderTargetHandle>,
    pub color_ops: Option<ColorAttachmentOps>,
    pub depth_stencil_ops: DepthStencilAttachmentOps,
    /// The pass covers the whole target, so unstored attachments may be
    /// invalidated at the end.
    pub full_size_clear_rect: bool,
}

impl Default for RenderPass {
    fn default() -> Self {
        Self {
            name: String::new(),
            render_target: None,
            color_ops: Some(ColorAttachmentOps::default()),
            depth_stencil_ops: DepthStencilAttachmentOps::default(),
            full_size_clear_rect: true,
        }
    }
}

/// Arguments of [`clear`](crate::WebglGraphicsDevice::clear). Unset fields
/// fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearOptions {
    pub flags: ClearFlags,
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<i32>,
}

impl ClearOptions {
    pub const DEFAULT_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    pub const DEFAULT_DEPTH: f32 = 1.0;
    pub const DEFAULT_STENCIL: i32 = 0;

    pub fn color(color: [f32; 4]) -> Self {
        Self {
            flags: ClearFlags::COLOR,
            color: Some(color),
            ..Self::default()
        }
    }
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: None,
            depth: None,
            stencil: None,
        }
    }
}
