//! Backend-independent device state: resource registries, the uniform
//! scope, statistics and events.

use std::time::Duration;

use rustkit_webgl::HtmlCanvas;
use slotmap::SlotMap;
use tracing::debug;

use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::config::DeviceOptions;
use crate::events::{DeviceEvent, EventEmitter, EventKind, ListenerId};
use crate::handles::{
    IndexBufferHandle, RenderTargetHandle, ShaderHandle, TextureHandle, VertexBufferHandle,
};
use crate::render_target::RenderTarget;
use crate::scope::ScopeSpace;
use crate::shader::Shader;
use crate::stats::{FrameStats, ShaderStats, VramStats};
use crate::texture::Texture;

/// State shared by every backend. [`WebglGraphicsDevice`] dereferences to
/// it.
///
/// [`WebglGraphicsDevice`]: crate::WebglGraphicsDevice
#[derive(Debug)]
pub struct GraphicsDevice {
    canvas: HtmlCanvas,
    options: DeviceOptions,
    pub(crate) scope: ScopeSpace,
    pub(crate) shaders: SlotMap<ShaderHandle, Shader>,
    pub(crate) textures: SlotMap<TextureHandle, Texture>,
    pub(crate) vertex_buffers: SlotMap<VertexBufferHandle, VertexBuffer>,
    pub(crate) index_buffers: SlotMap<IndexBufferHandle, IndexBuffer>,
    pub(crate) render_targets: SlotMap<RenderTargetHandle, RenderTarget>,
    render_target: Option<RenderTargetHandle>,
    pub(crate) vram: VramStats,
    pub(crate) frame: FrameStats,
    pub(crate) shader_stats: ShaderStats,
    pub(crate) render_target_creation_time: Duration,
    events: EventEmitter,
}

impl GraphicsDevice {
    pub(crate) fn new(canvas: HtmlCanvas, options: DeviceOptions) -> Self {
        Self {
            canvas,
            options,
            scope: ScopeSpace::new("device"),
            shaders: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            vertex_buffers: SlotMap::with_key(),
            index_buffers: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            render_target: None,
            vram: VramStats::default(),
            frame: FrameStats::default(),
            shader_stats: ShaderStats::default(),
            render_target_creation_time: Duration::ZERO,
            events: EventEmitter::default(),
        }
    }

    pub fn canvas(&self) -> &HtmlCanvas {
        &self.canvas
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    /// Backing store width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    /// Backing store height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    /// Named uniform values shared by every shader of this device.
    pub fn scope(&self) -> &ScopeSpace {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut ScopeSpace {
        &mut self.scope
    }

    // ==================== Render target ====================

    /// Set the target of subsequent passes. `None` is the canvas.
    pub fn set_render_target(&mut self, target: Option<RenderTargetHandle>) {
        self.render_target = target;
    }

    pub fn get_render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target
    }

    /// Total time spent creating framebuffer objects.
    pub fn render_target_creation_time(&self) -> Duration {
        self.render_target_creation_time
    }

    // ==================== Resources ====================

    pub fn shader(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    /// Mutable access for changing sampling parameters or pixel data; the
    /// changes are applied when the texture is next bound.
    pub fn texture_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.textures.get_mut(handle)
    }

    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(handle)
    }

    pub fn index_buffer(&self, handle: IndexBufferHandle) -> Option<&IndexBuffer> {
        self.index_buffers.get(handle)
    }

    pub fn render_target(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.render_targets.get(handle)
    }

    pub fn shader_handles(&self) -> impl Iterator<Item = ShaderHandle> + '_ {
        self.shaders.keys()
    }

    // ==================== Canvas size ====================

    /// Resize the canvas for a CSS size, applying the device pixel ratio
    /// capped at `max_pixel_ratio`. Returns whether the backing store size
    /// changed; `ResizeCanvas` fires only then.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        let device_ratio = self.canvas.device_pixel_ratio.unwrap_or(1.0);
        let ratio = self.options.max_pixel_ratio.min(device_ratio);
        let width = (width as f32 * ratio).floor() as u32;
        let height = (height as f32 * ratio).floor() as u32;
        if width == self.canvas.width && height == self.canvas.height {
            return false;
        }
        self.set_resolution(width, height);
        true
    }

    /// Set the backing store size directly.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        debug!(width, height, "Canvas resized");
        self.canvas.width = width;
        self.canvas.height = height;
        self.fire(DeviceEvent::ResizeCanvas { width, height });
    }

    pub fn max_pixel_ratio(&self) -> f32 {
        self.options.max_pixel_ratio
    }

    pub fn set_max_pixel_ratio(&mut self, ratio: f32) {
        self.options.max_pixel_ratio = ratio;
    }

    // ==================== Statistics ====================

    pub fn vram(&self) -> &VramStats {
        &self.vram
    }

    pub fn frame_stats(&self) -> &FrameStats {
        &self.frame
    }

    pub fn shader_stats(&self) -> &ShaderStats {
        &self.shader_stats
    }

    /// Reset the per-frame counters.
    pub fn frame_start(&mut self) {
        self.frame = FrameStats::default();
    }

    // ==================== Events ====================

    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&DeviceEvent) + 'static,
    ) -> ListenerId {
        self.events.on(kind, callback)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn fire(&mut self, event: DeviceEvent) {
        self.events.fire(event);
    }

    /// Drop registries and listeners. Native objects must already be
    /// released by the backend.
    pub(crate) fn clear(&mut self) {
        self.shaders.clear();
        self.textures.clear();
        self.vertex_buffers.clear();
        self.index_buffers.clear();
        self.render_targets.clear();
        self.render_target = None;
        self.vram = VramStats::default();
        self.events.clear();
    }
}
