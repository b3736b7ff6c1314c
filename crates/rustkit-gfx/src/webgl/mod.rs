//! WebGL implementation of the graphics device.
//!
//! [`WebglGraphicsDevice`] owns the rendering context and keeps a shadow
//! copy of everything it has set on it: fixed-function state, texture unit
//! bindings, the bound program, vertex arrays and framebuffer. Redundant
//! calls are filtered against that copy, so the cache must only ever be
//! changed together with the context.

pub mod buffer;
pub mod capabilities;
mod context;
mod draw;
mod pass;
pub mod render_target;
mod resources;
pub mod shader;
mod state;
pub mod texture;
mod texture_units;
pub(crate) mod uniforms;
mod vertex;

use std::ops::{Deref, DerefMut};

use rustc_hash::{FxHashMap, FxHashSet};
use rustkit_common::{Result, RustKitError};
use rustkit_webgl::{
    ContextVersion, HtmlCanvas, WebGLFramebuffer, WebGLRenderingContext, WebGLTexture,
    WebGLTransformFeedback, WebGLVertexArrayObject,
};
use tracing::info;

use crate::config::DeviceOptions;
use crate::device::GraphicsDevice;
use crate::handles::{IndexBufferHandle, ShaderHandle, TextureHandle, VertexBufferHandle};

pub use capabilities::{DeviceCapabilities, Extensions, InstancingOps, Precision, VertexArrayOps};
pub use context::ContextState;
pub use state::{BlendState, DepthState, RenderState, StencilFace, StencilState};

use shader::ShaderCache;

/// Texture targets cached per unit: 2D, cube, 3D, 2D array.
pub(crate) const TEXTURE_SLOTS: usize = 4;

type UnitBindings = [Option<WebGLTexture>; TEXTURE_SLOTS];

/// Graphics device backed by a WebGL 1 or WebGL 2 context.
#[derive(Debug)]
pub struct WebglGraphicsDevice {
    base: GraphicsDevice,
    pub(crate) gl: WebGLRenderingContext,
    context_id: &'static str,
    extensions: Extensions,
    caps: DeviceCapabilities,
    instancing: Option<InstancingOps>,
    vertex_arrays: Option<VertexArrayOps>,
    state: RenderState,

    texture_unit: u32,
    texture_units: Vec<UnitBindings>,
    /// Bound for samplers whose scope value is unset.
    placeholder_texture: Option<TextureHandle>,
    warned_samplers: FxHashSet<String>,

    shader: Option<ShaderHandle>,
    shader_cache: ShaderCache,
    copy_shader: Option<ShaderHandle>,
    quad: Option<VertexBufferHandle>,

    vertex_buffers: Vec<VertexBufferHandle>,
    index_buffer: Option<IndexBufferHandle>,
    bound_vao: Option<WebGLVertexArrayObject>,
    vao_cache: FxHashMap<u64, WebGLVertexArrayObject>,
    /// Attribute arrays enabled on the default vertex array, one bit per
    /// location. Only used without vertex array objects.
    enabled_attributes: u32,
    /// Locations with a per-instance divisor on the default vertex array.
    instanced_attributes: u32,

    feedback: Option<WebGLTransformFeedback>,
    transform_feedback_buffer: Option<VertexBufferHandle>,

    active_framebuffer: Option<WebGLFramebuffer>,
    inside_pass: bool,

    context_state: ContextState,
    /// Bumped on every context loss; native handles from older generations
    /// are stale.
    generation: u64,
}

impl WebglGraphicsDevice {
    /// Create a device on `canvas`, trying each context id of `options` in
    /// turn.
    pub fn new(canvas: HtmlCanvas, options: DeviceOptions) -> Result<Self> {
        let attributes = options.context_attributes();
        let (gl, context_id) = options
            .context_ids()
            .iter()
            .find_map(|&id| canvas.get_context(id, &attributes).map(|gl| (gl, id)))
            .ok_or_else(|| RustKitError::context("WebGL is not supported by this canvas"))?;

        let width = gl.drawing_buffer_width();
        let height = gl.drawing_buffer_height();
        let mut device = Self {
            base: GraphicsDevice::new(canvas, options),
            gl,
            context_id,
            extensions: Extensions::default(),
            caps: DeviceCapabilities::default(),
            instancing: None,
            vertex_arrays: None,
            state: RenderState::new(width, height),
            texture_unit: 0,
            texture_units: Vec::new(),
            placeholder_texture: None,
            warned_samplers: FxHashSet::default(),
            shader: None,
            shader_cache: ShaderCache::default(),
            copy_shader: None,
            quad: None,
            vertex_buffers: Vec::new(),
            index_buffer: None,
            bound_vao: None,
            vao_cache: FxHashMap::default(),
            enabled_attributes: 0,
            instanced_attributes: 0,
            feedback: None,
            transform_feedback_buffer: None,
            active_framebuffer: None,
            inside_pass: false,
            context_state: ContextState::Active,
            generation: 0,
        };
        device.initialize_context();

        info!(
            context = context_id,
            renderer = device.caps.unmasked_renderer.as_deref().unwrap_or("unknown"),
            max_textures = device.caps.max_textures,
            "Graphics device created"
        );
        Ok(device)
    }

    /// Negotiate extensions, probe capabilities and seed every cache with
    /// state issued to the context.
    fn initialize_context(&mut self) {
        let webgl2 = self.gl.is_webgl2();
        self.extensions = Extensions::negotiate(&mut self.gl);
        self.instancing = self.extensions.instancing_ops(webgl2);
        self.vertex_arrays = self.extensions.vertex_array_ops(webgl2);
        self.caps =
            DeviceCapabilities::probe(&mut self.gl, &self.extensions, self.base.options().overrides());
        self.initialize_render_state();
        self.initialize_context_caches();
    }

    fn initialize_context_caches(&mut self) {
        let units = self.caps.max_combined_textures.max(1) as usize;
        self.texture_unit = 0;
        self.texture_units = vec![[None; TEXTURE_SLOTS]; units];
        self.shader = None;
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.bound_vao = None;
        self.vao_cache.clear();
        self.enabled_attributes = 0;
        self.instanced_attributes = 0;
        self.feedback = None;
        self.transform_feedback_buffer = None;
        self.active_framebuffer = None;
        self.inside_pass = false;
    }

    // ==================== Accessors ====================

    pub fn gl(&self) -> &WebGLRenderingContext {
        &self.gl
    }

    /// Direct access to the context. Calls made through it bypass the
    /// state cache.
    pub fn gl_mut(&mut self) -> &mut WebGLRenderingContext {
        &mut self.gl
    }

    pub fn is_webgl2(&self) -> bool {
        self.gl.version() == ContextVersion::WebGL2
    }

    /// Context id that was granted (`webgl2`, `webgl` or
    /// `experimental-webgl`).
    pub fn context_id(&self) -> &'static str {
        self.context_id
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.caps
    }

    pub fn instancing(&self) -> Option<&InstancingOps> {
        self.instancing.as_ref()
    }

    pub fn vertex_array_ops(&self) -> Option<&VertexArrayOps> {
        self.vertex_arrays.as_ref()
    }

    pub fn current_shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    /// Number of cached multi-buffer vertex arrays.
    pub fn vao_cache_len(&self) -> usize {
        self.vao_cache.len()
    }

    /// Texture cached for a unit and target slot.
    pub fn unit_texture(&self, unit: u32, slot: usize) -> Option<WebGLTexture> {
        self.texture_units
            .get(unit as usize)
            .and_then(|slots| slots.get(slot).copied().flatten())
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.texture_unit
    }

    // ==================== Canvas size ====================

    /// See [`GraphicsDevice::resize_canvas`]. Also reallocates the drawing
    /// buffer when the size changed.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        let changed = self.base.resize_canvas(width, height);
        if changed {
            self.gl.resize(self.base.width(), self.base.height());
        }
        changed
    }

    /// See [`GraphicsDevice::set_resolution`].
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.base.set_resolution(width, height);
        self.gl.resize(width, height);
    }

    // ==================== Framebuffer ====================

    /// Bind a framebuffer unless it is already bound.
    pub(crate) fn set_framebuffer(&mut self, framebuffer: Option<WebGLFramebuffer>) {
        if self.active_framebuffer != framebuffer {
            self.gl
                .bind_framebuffer(rustkit_webgl::constants::FRAMEBUFFER, framebuffer);
            self.active_framebuffer = framebuffer;
        }
    }

    pub fn active_framebuffer(&self) -> Option<WebGLFramebuffer> {
        self.active_framebuffer
    }

    /// Release every native object and clear all registries.
    pub fn destroy(&mut self) {
        if self.context_state == ContextState::Active {
            self.release_native_objects();
        }
        self.shader_cache.clear();
        self.vao_cache.clear();
        self.copy_shader = None;
        self.quad = None;
        self.placeholder_texture = None;
        self.warned_samplers.clear();
        self.base.clear();
        self.initialize_context_caches();
        info!("Graphics device destroyed");
    }
}

impl Deref for WebglGraphicsDevice {
    type Target = GraphicsDevice;

    fn deref(&self) -> &GraphicsDevice {
        &self.base
    }
}

impl DerefMut for WebglGraphicsDevice {
    fn deref_mut(&mut self) -> &mut GraphicsDevice {
        &mut self.base
    }
}
