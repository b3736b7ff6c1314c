//! # RustKit WebGL
//!
//! Headless WebGL 1.0 / 2.0 rendering context for the RustKit graphics
//! device.
//!
//! ## Features
//!
//! - **HtmlCanvas**: context negotiation (`webgl2`, `webgl`, `experimental-webgl`)
//!   driven by a [`GpuProfile`]
//! - **Shaders**: GLSL declaration scanning for compile diagnostics and
//!   attribute/uniform reflection
//! - **Buffers, vertex arrays, textures, framebuffers**: full object model,
//!   including the OES/ANGLE extension entry points of WebGL1
//! - **Context loss**: `WEBGL_lose_context` style loss and restore
//! - **Introspection**: per entry point call counters, recorded draw calls,
//!   uniform values and RGBA8 color surfaces for readback
//!
//! ## Architecture
//!
//! Nothing is rasterized. Clears, blits and readbacks operate on RGBA8 color
//! surfaces; draws are recorded with a snapshot of the pipeline state so the
//! layer above can be verified against what a driver would have seen.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::debug;

pub mod canvas;
pub mod constants;
mod framebuffer;
pub mod glsl;
mod program;

pub use canvas::{ContextAttributes, ContextVersion, GpuProfile, HtmlCanvas, PowerPreference};
pub use framebuffer::{Attachment, FramebufferData, RenderbufferData};
pub use program::{AttributeInfo, ProgramData, ShaderData, UniformInfo, WebGLActiveInfo};

// ==================== Errors ====================

/// Errors that can occur in WebGL operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebGLError {
    #[error("Invalid operation")]
    InvalidOperation,

    #[error("Invalid value")]
    InvalidValue,

    #[error("Invalid enum")]
    InvalidEnum,

    #[error("Invalid framebuffer operation")]
    InvalidFramebufferOperation,

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Context lost")]
    ContextLost,

    #[error("Shader compile error: {0}")]
    ShaderCompileError(String),

    #[error("Program link error: {0}")]
    ProgramLinkError(String),
}

impl WebGLError {
    /// Map a `getError` code to an error, `None` for `NO_ERROR`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            constants::NO_ERROR => None,
            constants::INVALID_ENUM => Some(Self::InvalidEnum),
            constants::INVALID_VALUE => Some(Self::InvalidValue),
            constants::INVALID_OPERATION => Some(Self::InvalidOperation),
            constants::INVALID_FRAMEBUFFER_OPERATION => Some(Self::InvalidFramebufferOperation),
            constants::OUT_OF_MEMORY => Some(Self::OutOfMemory),
            constants::CONTEXT_LOST_WEBGL => Some(Self::ContextLost),
            _ => Some(Self::InvalidOperation),
        }
    }
}

// ==================== Object IDs ====================

/// WebGL object handle.
///
/// Ids are unique for the lifetime of the process, so a handle from before a
/// context loss never aliases an object created after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WebGLObject(u32);

impl WebGLObject {
    fn new() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

pub type WebGLBuffer = WebGLObject;
pub type WebGLShader = WebGLObject;
pub type WebGLProgram = WebGLObject;
pub type WebGLTexture = WebGLObject;
pub type WebGLFramebuffer = WebGLObject;
pub type WebGLRenderbuffer = WebGLObject;
pub type WebGLUniformLocation = WebGLObject;
pub type WebGLVertexArrayObject = WebGLObject;
pub type WebGLTransformFeedback = WebGLObject;

// ==================== Context Events ====================

/// Notifications a canvas delivers for its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    /// `webglcontextlost`
    Lost,
    /// `webglcontextrestored`
    Restored,
}

// ==================== Buffer ====================

/// Buffer data.
#[derive(Debug, Clone)]
pub struct BufferData {
    pub target: u32,
    pub usage: u32,
    pub data: Vec<u8>,
    pub deleted: bool,
}

impl BufferData {
    pub fn new() -> Self {
        Self {
            target: 0,
            usage: constants::STATIC_DRAW,
            data: Vec::new(),
            deleted: false,
        }
    }
}

impl Default for BufferData {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Texture ====================

/// Texture data.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Bind target, fixed by the first `bindTexture`. Zero until then.
    pub target: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: u32,
    pub internal_format: u32,
    pub type_: u32,
    /// Level 0 as an RGBA8 surface, used for clears and readback when the
    /// texture is a color attachment.
    pub pixels: Vec<u8>,
    /// Highest uploaded or generated mip level plus one.
    pub levels: u32,
    pub has_mipmaps: bool,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub wrap_r: u32,
    pub compare_mode: u32,
    pub compare_func: u32,
    pub max_anisotropy: f32,
    pub uploads: u32,
    pub deleted: bool,
}

impl TextureData {
    pub fn new() -> Self {
        Self {
            target: 0,
            width: 0,
            height: 0,
            depth: 1,
            format: constants::RGBA,
            internal_format: constants::RGBA,
            type_: constants::UNSIGNED_BYTE,
            pixels: Vec::new(),
            levels: 0,
            has_mipmaps: false,
            mag_filter: constants::LINEAR,
            min_filter: constants::NEAREST_MIPMAP_LINEAR,
            wrap_s: constants::REPEAT,
            wrap_t: constants::REPEAT,
            wrap_r: constants::REPEAT,
            compare_mode: constants::NONE,
            compare_func: constants::LEQUAL,
            max_anisotropy: 1.0,
            uploads: 0,
            deleted: false,
        }
    }
}

impl Default for TextureData {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture unit slot for a bind target.
pub fn texture_slot(target: u32) -> Option<usize> {
    match target {
        constants::TEXTURE_2D => Some(0),
        constants::TEXTURE_CUBE_MAP => Some(1),
        constants::TEXTURE_3D => Some(2),
        constants::TEXTURE_2D_ARRAY => Some(3),
        _ => None,
    }
}

const TEXTURE_SLOTS: usize = 4;

// ==================== Vertex Attribute ====================

/// Vertex attribute pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexAttribPointer {
    pub enabled: bool,
    pub size: i32,
    pub type_: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
    pub divisor: u32,
    pub buffer: Option<WebGLBuffer>,
}

/// Vertex array object state. The default vertex array lives in
/// [`WebGLState`].
#[derive(Debug, Clone, Default)]
pub struct VertexArrayData {
    pub attribs: Vec<VertexAttribPointer>,
    pub element_buffer: Option<WebGLBuffer>,
    pub deleted: bool,
}

impl VertexArrayData {
    pub fn new(max_attribs: usize) -> Self {
        Self {
            attribs: vec![VertexAttribPointer::default(); max_attribs],
            element_buffer: None,
            deleted: false,
        }
    }
}

/// Transform feedback object state.
#[derive(Debug, Clone, Default)]
pub struct TransformFeedbackData {
    pub active: bool,
    pub primitive_mode: u32,
    pub deleted: bool,
}

// ==================== Context State ====================

/// Per-face stencil state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilState {
    pub func: u32,
    pub ref_: i32,
    pub value_mask: u32,
    pub write_mask: u32,
    pub fail: u32,
    pub zfail: u32,
    pub zpass: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: constants::ALWAYS,
            ref_: 0,
            value_mask: 0xFFFF_FFFF,
            write_mask: 0xFFFF_FFFF,
            fail: constants::KEEP,
            zfail: constants::KEEP,
            zpass: constants::KEEP,
        }
    }
}

/// WebGL context state.
#[derive(Debug, Clone)]
pub struct WebGLState {
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: i32,
    pub viewport: [i32; 4],
    pub scissor: [i32; 4],
    pub blend_enabled: bool,
    pub blend_src_rgb: u32,
    pub blend_dst_rgb: u32,
    pub blend_src_alpha: u32,
    pub blend_dst_alpha: u32,
    pub blend_equation_rgb: u32,
    pub blend_equation_alpha: u32,
    pub blend_color: [f32; 4],
    pub color_mask: [bool; 4],
    pub cull_face_enabled: bool,
    pub cull_face_mode: u32,
    pub depth_test_enabled: bool,
    pub depth_func: u32,
    pub depth_mask: bool,
    pub depth_range: [f32; 2],
    pub stencil_test_enabled: bool,
    pub stencil_front: StencilState,
    pub stencil_back: StencilState,
    pub scissor_test_enabled: bool,
    pub rasterizer_discard: bool,
    pub sample_alpha_to_coverage: bool,
    pub dither: bool,
    pub front_face: u32,
    pub line_width: f32,
    pub polygon_offset_fill: bool,
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,
    pub current_program: Option<WebGLProgram>,
    pub current_array_buffer: Option<WebGLBuffer>,
    pub current_uniform_buffer: Option<WebGLBuffer>,
    pub current_transform_feedback_buffer: Option<WebGLBuffer>,
    pub uniform_buffer_bindings: Vec<Option<WebGLBuffer>>,
    pub transform_feedback_buffer_bindings: Vec<Option<WebGLBuffer>>,
    pub current_vertex_array: Option<WebGLVertexArrayObject>,
    pub default_vertex_array: VertexArrayData,
    pub draw_framebuffer: Option<WebGLFramebuffer>,
    pub read_framebuffer: Option<WebGLFramebuffer>,
    pub current_renderbuffer: Option<WebGLRenderbuffer>,
    pub current_transform_feedback: Option<WebGLTransformFeedback>,
    pub active_texture: u32,
    pub texture_units: Vec<[Option<WebGLTexture>; TEXTURE_SLOTS]>,
    pub pixel_store: HashMap<u32, i32>,
    pub hints: HashMap<u32, u32>,
}

impl WebGLState {
    fn new(profile: &GpuProfile) -> Self {
        let units = profile.max_combined_texture_image_units.max(1) as usize;
        let attribs = profile.max_vertex_attribs.max(1) as usize;
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            viewport: [0, 0, 0, 0],
            scissor: [0, 0, 0, 0],
            blend_enabled: false,
            blend_src_rgb: constants::ONE,
            blend_dst_rgb: constants::ZERO,
            blend_src_alpha: constants::ONE,
            blend_dst_alpha: constants::ZERO,
            blend_equation_rgb: constants::FUNC_ADD,
            blend_equation_alpha: constants::FUNC_ADD,
            blend_color: [0.0; 4],
            color_mask: [true; 4],
            cull_face_enabled: false,
            cull_face_mode: constants::BACK,
            depth_test_enabled: false,
            depth_func: constants::LESS,
            depth_mask: true,
            depth_range: [0.0, 1.0],
            stencil_test_enabled: false,
            stencil_front: StencilState::default(),
            stencil_back: StencilState::default(),
            scissor_test_enabled: false,
            rasterizer_discard: false,
            sample_alpha_to_coverage: false,
            dither: true,
            front_face: constants::CCW,
            line_width: 1.0,
            polygon_offset_fill: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            current_program: None,
            current_array_buffer: None,
            current_uniform_buffer: None,
            current_transform_feedback_buffer: None,
            uniform_buffer_bindings: vec![None; 24],
            transform_feedback_buffer_bindings: vec![None; 4],
            current_vertex_array: None,
            default_vertex_array: VertexArrayData::new(attribs),
            draw_framebuffer: None,
            read_framebuffer: None,
            current_renderbuffer: None,
            current_transform_feedback: None,
            active_texture: 0,
            texture_units: vec![[None; TEXTURE_SLOTS]; units],
            pixel_store: HashMap::new(),
            hints: HashMap::new(),
        }
    }
}

// ==================== Draw Call ====================

/// A recorded draw call.
#[derive(Debug, Clone)]
pub enum DrawCall {
    Clear {
        mask: u32,
        color: [f32; 4],
        depth: f32,
        stencil: i32,
        framebuffer: Option<WebGLFramebuffer>,
    },
    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
        /// Zero for non-instanced draws.
        instances: i32,
        program: WebGLProgram,
        state: Box<DrawState>,
    },
    DrawElements {
        mode: u32,
        count: i32,
        type_: u32,
        offset: i32,
        instances: i32,
        program: WebGLProgram,
        state: Box<DrawState>,
    },
}

impl DrawCall {
    /// Primitive mode, `None` for clears.
    pub fn mode(&self) -> Option<u32> {
        match self {
            DrawCall::Clear { .. } => None,
            DrawCall::DrawArrays { mode, .. } | DrawCall::DrawElements { mode, .. } => Some(*mode),
        }
    }

    /// Pipeline snapshot, `None` for clears.
    pub fn state(&self) -> Option<&DrawState> {
        match self {
            DrawCall::Clear { .. } => None,
            DrawCall::DrawArrays { state, .. } | DrawCall::DrawElements { state, .. } => {
                Some(state.as_ref())
            }
        }
    }
}

/// State needed for a draw call.
#[derive(Debug, Clone)]
pub struct DrawState {
    pub viewport: [i32; 4],
    pub blend_enabled: bool,
    pub blend_func: (u32, u32, u32, u32),
    pub depth_test_enabled: bool,
    pub depth_func: u32,
    pub cull_face_enabled: bool,
    pub cull_face_mode: u32,
    pub vertex_array: Option<WebGLVertexArrayObject>,
    pub vertex_attribs: Vec<VertexAttribPointer>,
    pub element_buffer: Option<WebGLBuffer>,
    pub framebuffer: Option<WebGLFramebuffer>,
    pub transform_feedback_active: bool,
    pub rasterizer_discard: bool,
    pub textures: Vec<[Option<WebGLTexture>; TEXTURE_SLOTS]>,
    pub uniforms: HashMap<WebGLUniformLocation, UniformValue>,
}

/// Uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    UVec2([u32; 2]),
    UVec3([u32; 3]),
    UVec4([u32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
}

/// Range and precision of a shader float type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderPrecisionFormat {
    pub range_min: i32,
    pub range_max: i32,
    pub precision: i32,
}

// ==================== WebGL Context ====================

/// The WebGL rendering context.
#[derive(Debug)]
pub struct WebGLRenderingContext {
    pub width: u32,
    pub height: u32,
    version: ContextVersion,
    attributes: ContextAttributes,
    profile: GpuProfile,
    state: WebGLState,
    shaders: HashMap<WebGLShader, ShaderData>,
    programs: HashMap<WebGLProgram, ProgramData>,
    buffers: HashMap<WebGLBuffer, BufferData>,
    textures: HashMap<WebGLTexture, TextureData>,
    framebuffers: HashMap<WebGLFramebuffer, FramebufferData>,
    renderbuffers: HashMap<WebGLRenderbuffer, RenderbufferData>,
    vertex_arrays: HashMap<WebGLVertexArrayObject, VertexArrayData>,
    transform_feedbacks: HashMap<WebGLTransformFeedback, TransformFeedbackData>,
    uniform_values: HashMap<WebGLUniformLocation, UniformValue>,
    uniform_owners: HashMap<WebGLUniformLocation, WebGLProgram>,
    /// RGBA8 color surface of the default framebuffer.
    drawing_buffer: Vec<u8>,
    enabled_extensions: HashSet<String>,
    draw_calls: Vec<DrawCall>,
    invalidated: Vec<u32>,
    calls: HashMap<&'static str, usize>,
    events: Vec<ContextEvent>,
    lost: bool,
    lost_error_pending: bool,
    last_error: u32,
}

impl WebGLRenderingContext {
    /// Create a new WebGL 1 context backed by the desktop profile.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_profile(
            ContextVersion::WebGL1,
            width,
            height,
            ContextAttributes::default(),
            GpuProfile::desktop(),
        )
    }

    /// Create a context for an API level, attributes and profile.
    pub fn with_profile(
        version: ContextVersion,
        width: u32,
        height: u32,
        attributes: ContextAttributes,
        profile: GpuProfile,
    ) -> Self {
        let mut state = WebGLState::new(&profile);
        state.viewport = [0, 0, width as i32, height as i32];
        state.scissor = [0, 0, width as i32, height as i32];

        Self {
            width,
            height,
            version,
            attributes,
            profile,
            state,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            transform_feedbacks: HashMap::new(),
            uniform_values: HashMap::new(),
            uniform_owners: HashMap::new(),
            drawing_buffer: vec![0; (width * height * 4) as usize],
            enabled_extensions: HashSet::new(),
            draw_calls: Vec::new(),
            invalidated: Vec::new(),
            calls: HashMap::new(),
            events: Vec::new(),
            lost: false,
            lost_error_pending: false,
            last_error: constants::NO_ERROR,
        }
    }

    /// API level of the context.
    pub fn version(&self) -> ContextVersion {
        self.version
    }

    /// Whether this is a WebGL 2 context.
    pub fn is_webgl2(&self) -> bool {
        self.version == ContextVersion::WebGL2
    }

    /// Profile the context was created from.
    pub fn profile(&self) -> &GpuProfile {
        &self.profile
    }

    /// Width of the default framebuffer.
    pub fn drawing_buffer_width(&self) -> u32 {
        self.width
    }

    /// Height of the default framebuffer.
    pub fn drawing_buffer_height(&self) -> u32 {
        self.height
    }

    /// Reallocate the default framebuffer after the canvas changed size.
    /// Like a browser, the viewport is left alone.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.drawing_buffer = vec![0; (width * height * 4) as usize];
    }

    /// Get and clear the error.
    pub fn get_error(&mut self) -> u32 {
        self.record("getError");
        if self.lost_error_pending {
            self.lost_error_pending = false;
            return constants::CONTEXT_LOST_WEBGL;
        }
        let err = self.last_error;
        self.last_error = constants::NO_ERROR;
        err
    }

    /// `get_error` as a `Result`.
    pub fn check_error(&mut self) -> Result<(), WebGLError> {
        match WebGLError::from_code(self.get_error()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_error(&mut self, code: u32) {
        if self.last_error == constants::NO_ERROR {
            self.last_error = code;
        }
    }

    fn record(&mut self, name: &'static str) {
        *self.calls.entry(name).or_insert(0) += 1;
    }

    /// Count the call and report whether the context can service it.
    fn begin(&mut self, name: &'static str) -> bool {
        self.record(name);
        !self.lost
    }

    /// Require WebGL2 for an entry point only WebGL2 exposes.
    fn begin_webgl2(&mut self, name: &'static str) -> bool {
        if !self.begin(name) {
            return false;
        }
        if !self.is_webgl2() {
            self.set_error(constants::INVALID_OPERATION);
            return false;
        }
        true
    }

    /// Require a WebGL1 extension for one of its entry points.
    fn begin_extension(&mut self, name: &'static str, extension: &str) -> bool {
        if !self.begin(name) {
            return false;
        }
        if !self.enabled_extensions.contains(extension) {
            self.set_error(constants::INVALID_OPERATION);
            return false;
        }
        true
    }

    // ==================== Introspection ====================

    /// Number of times an entry point (WebGL name, e.g. `uniform4fv`) was
    /// called.
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    /// Number of calls across all entry points.
    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }

    /// Reset every call counter.
    pub fn reset_call_counts(&mut self) {
        self.calls.clear();
    }

    /// Current pipeline state.
    pub fn state(&self) -> &WebGLState {
        &self.state
    }

    /// Last value uploaded to a uniform location.
    pub fn uniform_value(&self, location: WebGLUniformLocation) -> Option<&UniformValue> {
        self.uniform_values.get(&location)
    }

    /// Texture bound to a unit for a bind target.
    pub fn bound_texture(&self, unit: u32, target: u32) -> Option<WebGLTexture> {
        let slot = texture_slot(target)?;
        self.state
            .texture_units
            .get(unit as usize)
            .and_then(|slots| slots[slot])
    }

    /// Attachments named by the last `invalidateFramebuffer`.
    pub fn last_invalidated_attachments(&self) -> &[u32] {
        &self.invalidated
    }

    // ==================== Context Loss ====================

    /// Lose the context, as a GPU reset or `WEBGL_lose_context.loseContext`
    /// would. Every object becomes invalid.
    pub fn lose_context(&mut self) {
        self.record("loseContext");
        if self.lost {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        debug!(objects = self.buffers.len() + self.textures.len(), "WebGL context lost");
        self.lost = true;
        self.lost_error_pending = true;
        self.shaders.clear();
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.framebuffers.clear();
        self.renderbuffers.clear();
        self.vertex_arrays.clear();
        self.transform_feedbacks.clear();
        self.uniform_values.clear();
        self.uniform_owners.clear();
        self.enabled_extensions.clear();
        self.state = WebGLState::new(&self.profile);
        self.events.push(ContextEvent::Lost);
    }

    /// Restore a lost context. All state is back at its defaults.
    pub fn restore_context(&mut self) {
        self.record("restoreContext");
        if !self.lost {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        debug!("WebGL context restored");
        self.lost = false;
        self.state = WebGLState::new(&self.profile);
        self.state.viewport = [0, 0, self.width as i32, self.height as i32];
        self.state.scissor = self.state.viewport;
        self.drawing_buffer = vec![0; (self.width * self.height * 4) as usize];
        self.events.push(ContextEvent::Restored);
    }

    /// Whether the context is currently lost.
    pub fn is_context_lost(&self) -> bool {
        self.lost
    }

    /// Drain pending context notifications.
    pub fn take_context_events(&mut self) -> Vec<ContextEvent> {
        std::mem::take(&mut self.events)
    }

    /// Attributes the context was created with.
    pub fn get_context_attributes(&self) -> Option<ContextAttributes> {
        if self.lost {
            return None;
        }
        Some(self.attributes.clone())
    }

    // ==================== Extensions ====================

    /// Extensions the context can enable.
    pub fn get_supported_extensions(&self) -> Vec<String> {
        if self.lost {
            return Vec::new();
        }
        self.profile.extensions(self.version).to_vec()
    }

    /// Enable an extension. Returns `false` when unsupported.
    pub fn get_extension(&mut self, name: &str) -> bool {
        if !self.begin("getExtension") {
            return false;
        }
        let supported = self
            .profile
            .extensions(self.version)
            .iter()
            .any(|e| e == name);
        if supported {
            self.enabled_extensions.insert(name.to_string());
        }
        supported
    }

    /// Whether an extension has been enabled with `get_extension`.
    pub fn is_extension_enabled(&self, name: &str) -> bool {
        self.enabled_extensions.contains(name)
    }

    // ==================== Parameters ====================

    /// Integer parameter query.
    pub fn get_parameter_i32(&mut self, pname: u32) -> Option<i32> {
        if !self.begin("getParameter") {
            return None;
        }
        let webgl2 = self.is_webgl2();
        let p = &self.profile;
        let value = match pname {
            constants::MAX_TEXTURE_SIZE => p.max_texture_size,
            constants::MAX_CUBE_MAP_TEXTURE_SIZE => p.max_cube_map_texture_size,
            constants::MAX_RENDERBUFFER_SIZE => p.max_renderbuffer_size,
            constants::MAX_TEXTURE_IMAGE_UNITS => p.max_texture_image_units,
            constants::MAX_COMBINED_TEXTURE_IMAGE_UNITS => p.max_combined_texture_image_units,
            constants::MAX_VERTEX_TEXTURE_IMAGE_UNITS => p.max_vertex_texture_image_units,
            constants::MAX_VERTEX_UNIFORM_VECTORS => p.max_vertex_uniform_vectors,
            constants::MAX_FRAGMENT_UNIFORM_VECTORS => p.max_fragment_uniform_vectors,
            constants::MAX_VERTEX_ATTRIBS => p.max_vertex_attribs,
            constants::MAX_DRAW_BUFFERS
                if webgl2 || self.enabled_extensions.contains("WEBGL_draw_buffers") =>
            {
                p.max_draw_buffers
            }
            constants::MAX_COLOR_ATTACHMENTS
                if webgl2 || self.enabled_extensions.contains("WEBGL_draw_buffers") =>
            {
                p.max_color_attachments
            }
            constants::MAX_3D_TEXTURE_SIZE if webgl2 => p.max_3d_texture_size,
            constants::MAX_SAMPLES if webgl2 => p.max_samples,
            constants::SAMPLES => {
                if self.attributes.antialias && self.state.draw_framebuffer.is_none() {
                    4
                } else {
                    0
                }
            }
            _ => {
                self.set_error(constants::INVALID_ENUM);
                return None;
            }
        };
        Some(value)
    }

    /// Float parameter query.
    pub fn get_parameter_f32(&mut self, pname: u32) -> Option<f32> {
        if !self.begin("getParameter") {
            return None;
        }
        match pname {
            constants::MAX_TEXTURE_MAX_ANISOTROPY_EXT
                if self
                    .enabled_extensions
                    .contains("EXT_texture_filter_anisotropic") =>
            {
                Some(self.profile.max_anisotropy)
            }
            _ => {
                self.set_error(constants::INVALID_ENUM);
                None
            }
        }
    }

    /// String parameter query.
    pub fn get_parameter_string(&mut self, pname: u32) -> Option<String> {
        if !self.begin("getParameter") {
            return None;
        }
        let webgl2 = self.is_webgl2();
        let debug_info = self.enabled_extensions.contains("WEBGL_debug_renderer_info");
        match pname {
            constants::VENDOR => Some("WebKit".to_string()),
            constants::RENDERER => Some("WebKit WebGL".to_string()),
            constants::VERSION if webgl2 => Some("WebGL 2.0".to_string()),
            constants::VERSION => Some("WebGL 1.0".to_string()),
            constants::SHADING_LANGUAGE_VERSION if webgl2 => {
                Some("WebGL GLSL ES 3.00".to_string())
            }
            constants::SHADING_LANGUAGE_VERSION => Some("WebGL GLSL ES 1.0".to_string()),
            constants::UNMASKED_VENDOR_WEBGL if debug_info => Some(self.profile.vendor.clone()),
            constants::UNMASKED_RENDERER_WEBGL if debug_info => {
                Some(self.profile.renderer.clone())
            }
            _ => {
                self.set_error(constants::INVALID_ENUM);
                None
            }
        }
    }

    /// Range and precision of a float precision qualifier in a stage.
    pub fn get_shader_precision_format(
        &mut self,
        shader_type: u32,
        precision_type: u32,
    ) -> Option<ShaderPrecisionFormat> {
        if !self.begin("getShaderPrecisionFormat") {
            return None;
        }
        let highp = ShaderPrecisionFormat {
            range_min: 127,
            range_max: 127,
            precision: 23,
        };
        let mediump = ShaderPrecisionFormat {
            range_min: 15,
            range_max: 15,
            precision: 10,
        };
        let unsupported = ShaderPrecisionFormat {
            range_min: 0,
            range_max: 0,
            precision: 0,
        };
        let fragment_highp = self.profile.fragment_highp;
        match (shader_type, precision_type) {
            (constants::VERTEX_SHADER, constants::HIGH_FLOAT) => Some(highp),
            (constants::FRAGMENT_SHADER, constants::HIGH_FLOAT) if fragment_highp => Some(highp),
            (constants::FRAGMENT_SHADER, constants::HIGH_FLOAT) => Some(unsupported),
            (
                constants::VERTEX_SHADER | constants::FRAGMENT_SHADER,
                constants::MEDIUM_FLOAT | constants::LOW_FLOAT,
            ) => Some(mediump),
            _ => {
                self.set_error(constants::INVALID_ENUM);
                None
            }
        }
    }

    // ==================== State ====================

    /// Set clear color.
    pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        if self.begin("clearColor") {
            self.state.clear_color = [r, g, b, a];
        }
    }

    /// Set clear depth.
    pub fn clear_depth(&mut self, depth: f32) {
        if self.begin("clearDepth") {
            self.state.clear_depth = depth;
        }
    }

    /// Set clear stencil.
    pub fn clear_stencil(&mut self, stencil: i32) {
        if self.begin("clearStencil") {
            self.state.clear_stencil = stencil;
        }
    }

    /// Set viewport.
    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if !self.begin("viewport") {
            return;
        }
        if width < 0 || height < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        self.state.viewport = [x, y, width, height];
    }

    /// Set scissor.
    pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if !self.begin("scissor") {
            return;
        }
        if width < 0 || height < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        self.state.scissor = [x, y, width, height];
    }

    fn capability_mut(&mut self, cap: u32) -> Option<&mut bool> {
        let webgl2 = self.is_webgl2();
        let s = &mut self.state;
        match cap {
            constants::BLEND => Some(&mut s.blend_enabled),
            constants::CULL_FACE => Some(&mut s.cull_face_enabled),
            constants::DEPTH_TEST => Some(&mut s.depth_test_enabled),
            constants::SCISSOR_TEST => Some(&mut s.scissor_test_enabled),
            constants::STENCIL_TEST => Some(&mut s.stencil_test_enabled),
            constants::POLYGON_OFFSET_FILL => Some(&mut s.polygon_offset_fill),
            constants::SAMPLE_ALPHA_TO_COVERAGE => Some(&mut s.sample_alpha_to_coverage),
            constants::DITHER => Some(&mut s.dither),
            constants::RASTERIZER_DISCARD if webgl2 => Some(&mut s.rasterizer_discard),
            _ => None,
        }
    }

    /// Enable a capability.
    pub fn enable(&mut self, cap: u32) {
        if !self.begin("enable") {
            return;
        }
        match self.capability_mut(cap) {
            Some(flag) => *flag = true,
            None => self.set_error(constants::INVALID_ENUM),
        }
    }

    /// Disable a capability.
    pub fn disable(&mut self, cap: u32) {
        if !self.begin("disable") {
            return;
        }
        match self.capability_mut(cap) {
            Some(flag) => *flag = false,
            None => self.set_error(constants::INVALID_ENUM),
        }
    }

    /// Check if capability is enabled.
    pub fn is_enabled(&self, cap: u32) -> bool {
        let s = &self.state;
        match cap {
            constants::BLEND => s.blend_enabled,
            constants::CULL_FACE => s.cull_face_enabled,
            constants::DEPTH_TEST => s.depth_test_enabled,
            constants::SCISSOR_TEST => s.scissor_test_enabled,
            constants::STENCIL_TEST => s.stencil_test_enabled,
            constants::POLYGON_OFFSET_FILL => s.polygon_offset_fill,
            constants::SAMPLE_ALPHA_TO_COVERAGE => s.sample_alpha_to_coverage,
            constants::DITHER => s.dither,
            constants::RASTERIZER_DISCARD => s.rasterizer_discard,
            _ => false,
        }
    }

    /// Set blend function.
    pub fn blend_func(&mut self, src: u32, dst: u32) {
        if !self.begin("blendFunc") {
            return;
        }
        self.state.blend_src_rgb = src;
        self.state.blend_dst_rgb = dst;
        self.state.blend_src_alpha = src;
        self.state.blend_dst_alpha = dst;
    }

    /// Set separate blend function.
    pub fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        if !self.begin("blendFuncSeparate") {
            return;
        }
        self.state.blend_src_rgb = src_rgb;
        self.state.blend_dst_rgb = dst_rgb;
        self.state.blend_src_alpha = src_alpha;
        self.state.blend_dst_alpha = dst_alpha;
    }

    fn valid_blend_equation(&self, mode: u32) -> bool {
        match mode {
            constants::FUNC_ADD | constants::FUNC_SUBTRACT | constants::FUNC_REVERSE_SUBTRACT => {
                true
            }
            constants::MIN | constants::MAX => {
                self.is_webgl2() || self.enabled_extensions.contains("EXT_blend_minmax")
            }
            _ => false,
        }
    }

    /// Set blend equation.
    pub fn blend_equation(&mut self, mode: u32) {
        if !self.begin("blendEquation") {
            return;
        }
        if !self.valid_blend_equation(mode) {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        self.state.blend_equation_rgb = mode;
        self.state.blend_equation_alpha = mode;
    }

    /// Set separate blend equations.
    pub fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        if !self.begin("blendEquationSeparate") {
            return;
        }
        if !self.valid_blend_equation(mode_rgb) || !self.valid_blend_equation(mode_alpha) {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        self.state.blend_equation_rgb = mode_rgb;
        self.state.blend_equation_alpha = mode_alpha;
    }

    /// Set blend constant color.
    pub fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        if self.begin("blendColor") {
            self.state.blend_color = [r, g, b, a];
        }
    }

    /// Set color write mask.
    pub fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        if self.begin("colorMask") {
            self.state.color_mask = [r, g, b, a];
        }
    }

    /// Set depth function.
    pub fn depth_func(&mut self, func: u32) {
        if self.begin("depthFunc") {
            self.state.depth_func = func;
        }
    }

    /// Set depth mask.
    pub fn depth_mask(&mut self, flag: bool) {
        if self.begin("depthMask") {
            self.state.depth_mask = flag;
        }
    }

    /// Set depth range.
    pub fn depth_range(&mut self, near: f32, far: f32) {
        if self.begin("depthRange") {
            self.state.depth_range = [near.clamp(0.0, 1.0), far.clamp(0.0, 1.0)];
        }
    }

    /// Set polygon offset.
    pub fn polygon_offset(&mut self, factor: f32, units: f32) {
        if !self.begin("polygonOffset") {
            return;
        }
        self.state.polygon_offset_factor = factor;
        self.state.polygon_offset_units = units;
    }

    /// Apply `update` to the stencil state of the named faces.
    fn update_stencil(&mut self, face: u32, update: impl Fn(&mut StencilState)) {
        let (front, back) = match face {
            constants::FRONT => (true, false),
            constants::BACK => (false, true),
            constants::FRONT_AND_BACK => (true, true),
            _ => {
                self.set_error(constants::INVALID_ENUM);
                return;
            }
        };
        if front {
            update(&mut self.state.stencil_front);
        }
        if back {
            update(&mut self.state.stencil_back);
        }
    }

    /// Set stencil function for both faces.
    pub fn stencil_func(&mut self, func: u32, ref_: i32, mask: u32) {
        if self.begin("stencilFunc") {
            self.apply_stencil_func(constants::FRONT_AND_BACK, func, ref_, mask);
        }
    }

    /// Set stencil function for one or both faces.
    pub fn stencil_func_separate(&mut self, face: u32, func: u32, ref_: i32, mask: u32) {
        if self.begin("stencilFuncSeparate") {
            self.apply_stencil_func(face, func, ref_, mask);
        }
    }

    fn apply_stencil_func(&mut self, face: u32, func: u32, ref_: i32, mask: u32) {
        self.update_stencil(face, |state| {
            state.func = func;
            state.ref_ = ref_;
            state.value_mask = mask;
        });
    }

    /// Set stencil operations for both faces.
    pub fn stencil_op(&mut self, fail: u32, zfail: u32, zpass: u32) {
        if self.begin("stencilOp") {
            self.apply_stencil_op(constants::FRONT_AND_BACK, fail, zfail, zpass);
        }
    }

    /// Set stencil operations for one or both faces.
    pub fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        if self.begin("stencilOpSeparate") {
            self.apply_stencil_op(face, fail, zfail, zpass);
        }
    }

    fn apply_stencil_op(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        self.update_stencil(face, |state| {
            state.fail = fail;
            state.zfail = zfail;
            state.zpass = zpass;
        });
    }

    /// Set stencil write mask for both faces.
    pub fn stencil_mask(&mut self, mask: u32) {
        if self.begin("stencilMask") {
            self.apply_stencil_mask(constants::FRONT_AND_BACK, mask);
        }
    }

    /// Set stencil write mask for one or both faces.
    pub fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        if self.begin("stencilMaskSeparate") {
            self.apply_stencil_mask(face, mask);
        }
    }

    fn apply_stencil_mask(&mut self, face: u32, mask: u32) {
        self.update_stencil(face, |state| state.write_mask = mask);
    }

    /// Set cull face.
    pub fn cull_face(&mut self, mode: u32) {
        if self.begin("cullFace") {
            self.state.cull_face_mode = mode;
        }
    }

    /// Set front face.
    pub fn front_face(&mut self, mode: u32) {
        if self.begin("frontFace") {
            self.state.front_face = mode;
        }
    }

    /// Set line width.
    pub fn line_width(&mut self, width: f32) {
        if self.begin("lineWidth") {
            self.state.line_width = width;
        }
    }

    /// Set a pixel storage mode.
    pub fn pixel_storei(&mut self, pname: u32, param: i32) {
        if self.begin("pixelStorei") {
            self.state.pixel_store.insert(pname, param);
        }
    }

    /// Current value of a pixel storage mode.
    pub fn pixel_store(&self, pname: u32) -> i32 {
        self.state.pixel_store.get(&pname).copied().unwrap_or(match pname {
            constants::UNPACK_ALIGNMENT | constants::PACK_ALIGNMENT => 4,
            _ => 0,
        })
    }

    /// Set an implementation hint.
    pub fn hint(&mut self, target: u32, mode: u32) {
        if self.begin("hint") {
            self.state.hints.insert(target, mode);
        }
    }

    // ==================== Buffers ====================

    /// Create a buffer.
    pub fn create_buffer(&mut self) -> Option<WebGLBuffer> {
        if !self.begin("createBuffer") {
            return None;
        }
        let buffer = WebGLObject::new();
        self.buffers.insert(buffer, BufferData::new());
        Some(buffer)
    }

    /// Whether a handle names a live buffer.
    pub fn is_buffer(&self, buffer: WebGLBuffer) -> bool {
        self.buffers.get(&buffer).is_some_and(|b| !b.deleted)
    }

    fn bound_buffer(&self, target: u32) -> Option<WebGLBuffer> {
        match target {
            constants::ARRAY_BUFFER => self.state.current_array_buffer,
            constants::ELEMENT_ARRAY_BUFFER => self.vertex_array().element_buffer,
            constants::UNIFORM_BUFFER => self.state.current_uniform_buffer,
            constants::TRANSFORM_FEEDBACK_BUFFER => self.state.current_transform_feedback_buffer,
            _ => None,
        }
    }

    /// Bind a buffer.
    pub fn bind_buffer(&mut self, target: u32, buffer: Option<WebGLBuffer>) {
        if !self.begin("bindBuffer") {
            return;
        }
        if let Some(b) = buffer {
            if !self.is_buffer(b) {
                self.set_error(constants::INVALID_OPERATION);
                return;
            }
        }
        let webgl2 = self.is_webgl2();
        match target {
            constants::ARRAY_BUFFER => self.state.current_array_buffer = buffer,
            constants::ELEMENT_ARRAY_BUFFER => self.vertex_array_mut().element_buffer = buffer,
            constants::UNIFORM_BUFFER if webgl2 => self.state.current_uniform_buffer = buffer,
            constants::TRANSFORM_FEEDBACK_BUFFER if webgl2 => {
                self.state.current_transform_feedback_buffer = buffer
            }
            _ => self.set_error(constants::INVALID_ENUM),
        }
    }

    /// Bind a buffer to an indexed binding point (WebGL2).
    pub fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<WebGLBuffer>) {
        if !self.begin_webgl2("bindBufferBase") {
            return;
        }
        let bindings = match target {
            constants::UNIFORM_BUFFER => {
                self.state.current_uniform_buffer = buffer;
                &mut self.state.uniform_buffer_bindings
            }
            constants::TRANSFORM_FEEDBACK_BUFFER => {
                self.state.current_transform_feedback_buffer = buffer;
                &mut self.state.transform_feedback_buffer_bindings
            }
            _ => {
                self.set_error(constants::INVALID_ENUM);
                return;
            }
        };
        match bindings.get_mut(index as usize) {
            Some(slot) => *slot = buffer,
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Upload buffer data.
    pub fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        if !self.begin("bufferData") {
            return;
        }
        self.store_buffer(target, data.to_vec(), usage);
    }

    /// Allocate zero-filled buffer storage.
    pub fn buffer_data_size(&mut self, target: u32, size: usize, usage: u32) {
        if !self.begin("bufferData") {
            return;
        }
        self.store_buffer(target, vec![0; size], usage);
    }

    fn store_buffer(&mut self, target: u32, data: Vec<u8>, usage: u32) {
        let Some(buf) = self.bound_buffer(target) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        if let Some(buf_data) = self.buffers.get_mut(&buf) {
            buf_data.target = target;
            buf_data.usage = usage;
            buf_data.data = data;
        }
    }

    /// Update part of a buffer.
    pub fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        if !self.begin("bufferSubData") {
            return;
        }
        let Some(buf) = self.bound_buffer(target) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let in_range = match self.buffers.get_mut(&buf) {
            Some(buf_data) if offset + data.len() <= buf_data.data.len() => {
                buf_data.data[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            _ => false,
        };
        if !in_range {
            self.set_error(constants::INVALID_VALUE);
        }
    }

    /// Delete a buffer.
    pub fn delete_buffer(&mut self, buffer: WebGLBuffer) {
        if !self.begin("deleteBuffer") {
            return;
        }
        if let Some(data) = self.buffers.get_mut(&buffer) {
            data.deleted = true;
        }
        if self.state.current_array_buffer == Some(buffer) {
            self.state.current_array_buffer = None;
        }
        if self.vertex_array().element_buffer == Some(buffer) {
            self.vertex_array_mut().element_buffer = None;
        }
    }

    // ==================== Vertex Arrays ====================

    fn vertex_array(&self) -> &VertexArrayData {
        let bound = self.state.current_vertex_array;
        match bound.and_then(|vao| self.vertex_arrays.get(&vao)) {
            Some(data) => data,
            None => &self.state.default_vertex_array,
        }
    }

    fn vertex_array_mut(&mut self) -> &mut VertexArrayData {
        let bound = self.state.current_vertex_array;
        match bound.and_then(|vao| self.vertex_arrays.get_mut(&vao)) {
            Some(data) => data,
            None => &mut self.state.default_vertex_array,
        }
    }

    fn new_vertex_array(&mut self) -> WebGLVertexArrayObject {
        let vao = WebGLObject::new();
        let attribs = self.profile.max_vertex_attribs.max(1) as usize;
        self.vertex_arrays.insert(vao, VertexArrayData::new(attribs));
        vao
    }

    fn bind_vertex_array_inner(&mut self, vao: Option<WebGLVertexArrayObject>) {
        if let Some(v) = vao {
            if !self.is_vertex_array(v) {
                self.set_error(constants::INVALID_OPERATION);
                return;
            }
        }
        self.state.current_vertex_array = vao;
    }

    fn delete_vertex_array_inner(&mut self, vao: WebGLVertexArrayObject) {
        if let Some(data) = self.vertex_arrays.get_mut(&vao) {
            data.deleted = true;
        }
        if self.state.current_vertex_array == Some(vao) {
            self.state.current_vertex_array = None;
        }
    }

    /// Create a vertex array object (WebGL2).
    pub fn create_vertex_array(&mut self) -> Option<WebGLVertexArrayObject> {
        if !self.begin_webgl2("createVertexArray") {
            return None;
        }
        Some(self.new_vertex_array())
    }

    /// Bind a vertex array object (WebGL2). `None` binds the default one.
    pub fn bind_vertex_array(&mut self, vao: Option<WebGLVertexArrayObject>) {
        if self.begin_webgl2("bindVertexArray") {
            self.bind_vertex_array_inner(vao);
        }
    }

    /// Delete a vertex array object (WebGL2).
    pub fn delete_vertex_array(&mut self, vao: WebGLVertexArrayObject) {
        if self.begin_webgl2("deleteVertexArray") {
            self.delete_vertex_array_inner(vao);
        }
    }

    /// `OES_vertex_array_object.createVertexArrayOES`.
    pub fn create_vertex_array_oes(&mut self) -> Option<WebGLVertexArrayObject> {
        if !self.begin_extension("createVertexArrayOES", "OES_vertex_array_object") {
            return None;
        }
        Some(self.new_vertex_array())
    }

    /// `OES_vertex_array_object.bindVertexArrayOES`.
    pub fn bind_vertex_array_oes(&mut self, vao: Option<WebGLVertexArrayObject>) {
        if self.begin_extension("bindVertexArrayOES", "OES_vertex_array_object") {
            self.bind_vertex_array_inner(vao);
        }
    }

    /// `OES_vertex_array_object.deleteVertexArrayOES`.
    pub fn delete_vertex_array_oes(&mut self, vao: WebGLVertexArrayObject) {
        if self.begin_extension("deleteVertexArrayOES", "OES_vertex_array_object") {
            self.delete_vertex_array_inner(vao);
        }
    }

    /// Whether a handle names a live vertex array object.
    pub fn is_vertex_array(&self, vao: WebGLVertexArrayObject) -> bool {
        self.vertex_arrays.get(&vao).is_some_and(|v| !v.deleted)
    }

    /// Currently bound vertex array object, `None` for the default one.
    pub fn bound_vertex_array(&self) -> Option<WebGLVertexArrayObject> {
        self.state.current_vertex_array
    }

    /// Attribute state of the bound vertex array.
    pub fn vertex_attrib(&self, index: u32) -> Option<&VertexAttribPointer> {
        self.vertex_array().attribs.get(index as usize)
    }

    /// Element array buffer of the bound vertex array.
    pub fn element_array_buffer(&self) -> Option<WebGLBuffer> {
        self.vertex_array().element_buffer
    }

    // ==================== Vertex Attributes ====================

    /// Set vertex attribute pointer.
    pub fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        type_: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        if !self.begin("vertexAttribPointer") {
            return;
        }
        let buffer = self.state.current_array_buffer;
        if buffer.is_none() && offset != 0 {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        match self.vertex_array_mut().attribs.get_mut(index as usize) {
            Some(attrib) => {
                *attrib = VertexAttribPointer {
                    enabled: attrib.enabled,
                    size,
                    type_,
                    normalized,
                    stride,
                    offset,
                    divisor: attrib.divisor,
                    buffer,
                };
            }
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Enable vertex attribute array.
    pub fn enable_vertex_attrib_array(&mut self, index: u32) {
        if self.begin("enableVertexAttribArray") {
            self.set_attrib_enabled(index, true);
        }
    }

    /// Disable vertex attribute array.
    pub fn disable_vertex_attrib_array(&mut self, index: u32) {
        if self.begin("disableVertexAttribArray") {
            self.set_attrib_enabled(index, false);
        }
    }

    fn set_attrib_enabled(&mut self, index: u32, enabled: bool) {
        match self.vertex_array_mut().attribs.get_mut(index as usize) {
            Some(attrib) => attrib.enabled = enabled,
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    fn set_attrib_divisor(&mut self, index: u32, divisor: u32) {
        match self.vertex_array_mut().attribs.get_mut(index as usize) {
            Some(attrib) => attrib.divisor = divisor,
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Set an instancing divisor (WebGL2).
    pub fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        if self.begin_webgl2("vertexAttribDivisor") {
            self.set_attrib_divisor(index, divisor);
        }
    }

    /// `ANGLE_instanced_arrays.vertexAttribDivisorANGLE`.
    pub fn vertex_attrib_divisor_angle(&mut self, index: u32, divisor: u32) {
        if self.begin_extension("vertexAttribDivisorANGLE", "ANGLE_instanced_arrays") {
            self.set_attrib_divisor(index, divisor);
        }
    }

    // ==================== Textures ====================

    /// Create a texture.
    pub fn create_texture(&mut self) -> Option<WebGLTexture> {
        if !self.begin("createTexture") {
            return None;
        }
        let texture = WebGLObject::new();
        self.textures.insert(texture, TextureData::new());
        Some(texture)
    }

    /// Whether a handle names a live texture.
    pub fn is_texture(&self, texture: WebGLTexture) -> bool {
        self.textures.get(&texture).is_some_and(|t| !t.deleted)
    }

    fn texture_target_supported(&self, target: u32) -> bool {
        match target {
            constants::TEXTURE_2D | constants::TEXTURE_CUBE_MAP => true,
            constants::TEXTURE_3D | constants::TEXTURE_2D_ARRAY => self.is_webgl2(),
            _ => false,
        }
    }

    /// Bind a texture.
    pub fn bind_texture(&mut self, target: u32, texture: Option<WebGLTexture>) {
        if !self.begin("bindTexture") {
            return;
        }
        let slot = match texture_slot(target) {
            Some(slot) if self.texture_target_supported(target) => slot,
            _ => {
                self.set_error(constants::INVALID_ENUM);
                return;
            }
        };
        if let Some(tex) = texture {
            match self.textures.get_mut(&tex) {
                Some(data) if !data.deleted && (data.target == 0 || data.target == target) => {
                    data.target = target;
                }
                _ => {
                    self.set_error(constants::INVALID_OPERATION);
                    return;
                }
            }
        }
        let unit = self.state.active_texture as usize;
        if let Some(slots) = self.state.texture_units.get_mut(unit) {
            slots[slot] = texture;
        }
    }

    /// Set active texture unit.
    pub fn active_texture(&mut self, texture: u32) {
        if !self.begin("activeTexture") {
            return;
        }
        let unit = texture.wrapping_sub(constants::TEXTURE0);
        if (unit as usize) < self.state.texture_units.len() {
            self.state.active_texture = unit;
        } else {
            self.set_error(constants::INVALID_ENUM);
        }
    }

    fn bound_texture_for(&self, target: u32) -> Option<WebGLTexture> {
        let bind_target = if (constants::TEXTURE_CUBE_MAP_POSITIVE_X
            ..constants::TEXTURE_CUBE_MAP_POSITIVE_X + 6)
            .contains(&target)
        {
            constants::TEXTURE_CUBE_MAP
        } else {
            target
        };
        self.bound_texture(self.state.active_texture, bind_target)
    }

    /// Set an integer texture parameter.
    pub fn tex_parameteri(&mut self, target: u32, pname: u32, param: i32) {
        if !self.begin("texParameteri") {
            return;
        }
        self.apply_tex_parameter(target, pname, param as f32);
    }

    /// Set a float texture parameter.
    pub fn tex_parameterf(&mut self, target: u32, pname: u32, param: f32) {
        if !self.begin("texParameterf") {
            return;
        }
        self.apply_tex_parameter(target, pname, param);
    }

    fn apply_tex_parameter(&mut self, target: u32, pname: u32, param: f32) {
        let webgl2 = self.is_webgl2();
        let anisotropic = self
            .enabled_extensions
            .contains("EXT_texture_filter_anisotropic");
        let Some(tex) = self.bound_texture_for(target) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let Some(tex_data) = self.textures.get_mut(&tex) else {
            return;
        };
        let value = param as u32;
        match pname {
            constants::TEXTURE_MAG_FILTER => tex_data.mag_filter = value,
            constants::TEXTURE_MIN_FILTER => tex_data.min_filter = value,
            constants::TEXTURE_WRAP_S => tex_data.wrap_s = value,
            constants::TEXTURE_WRAP_T => tex_data.wrap_t = value,
            constants::TEXTURE_WRAP_R if webgl2 => tex_data.wrap_r = value,
            constants::TEXTURE_COMPARE_MODE if webgl2 => tex_data.compare_mode = value,
            constants::TEXTURE_COMPARE_FUNC if webgl2 => tex_data.compare_func = value,
            constants::TEXTURE_MAX_ANISOTROPY_EXT if anisotropic => {
                tex_data.max_anisotropy = param.clamp(1.0, self.profile.max_anisotropy)
            }
            _ => self.set_error(constants::INVALID_ENUM),
        }
    }

    /// Upload texture image.
    #[allow(clippy::too_many_arguments)]
    pub fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        _border: i32,
        format: u32,
        type_: u32,
        data: Option<&[u8]>,
    ) {
        if !self.begin("texImage2D") {
            return;
        }
        self.store_image(target, level, internal_format, width, height, 1, format, type_, data);
    }

    /// Upload a 3D or 2D array texture image (WebGL2).
    #[allow(clippy::too_many_arguments)]
    pub fn tex_image_3d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        _border: i32,
        format: u32,
        type_: u32,
        data: Option<&[u8]>,
    ) {
        if !self.begin_webgl2("texImage3D") {
            return;
        }
        if target != constants::TEXTURE_3D && target != constants::TEXTURE_2D_ARRAY {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        self.store_image(target, level, internal_format, width, height, depth, format, type_, data);
    }

    #[allow(clippy::too_many_arguments)]
    fn store_image(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        type_: u32,
        data: Option<&[u8]>,
    ) {
        if level < 0 || width < 0 || height < 0 || depth < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        if width > self.profile.max_texture_size || height > self.profile.max_texture_size {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let float_ok = match type_ {
            constants::FLOAT => {
                self.is_webgl2() || self.enabled_extensions.contains("OES_texture_float")
            }
            constants::HALF_FLOAT_OES => self.enabled_extensions.contains("OES_texture_half_float"),
            constants::HALF_FLOAT => self.is_webgl2(),
            _ => true,
        };
        if !float_ok {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        let Some(tex) = self.bound_texture_for(target) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let Some(tex_data) = self.textures.get_mut(&tex) else {
            return;
        };

        tex_data.uploads += 1;
        tex_data.levels = tex_data.levels.max(level as u32 + 1);
        if level == 0 {
            tex_data.width = width as u32;
            tex_data.height = height as u32;
            tex_data.depth = depth as u32;
            tex_data.internal_format = internal_format as u32;
            tex_data.format = format;
            tex_data.type_ = type_;
            let surface_len = (width * height * 4) as usize;
            tex_data.pixels = match data {
                Some(d)
                    if format == constants::RGBA
                        && type_ == constants::UNSIGNED_BYTE
                        && d.len() >= surface_len =>
                {
                    d[..surface_len].to_vec()
                }
                _ => vec![0; surface_len],
            };
        }
    }

    /// Generate mipmaps for the bound texture.
    pub fn generate_mipmap(&mut self, target: u32) {
        if !self.begin("generateMipmap") {
            return;
        }
        let webgl2 = self.is_webgl2();
        let Some(tex) = self.bound_texture_for(target) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let Some(tex_data) = self.textures.get_mut(&tex) else {
            return;
        };
        let pot = tex_data.width.is_power_of_two() && tex_data.height.is_power_of_two();
        if !webgl2 && !pot {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        let largest = tex_data.width.max(tex_data.height).max(1);
        tex_data.levels = 32 - largest.leading_zeros();
        tex_data.has_mipmaps = true;
    }

    /// Delete a texture.
    pub fn delete_texture(&mut self, texture: WebGLTexture) {
        if !self.begin("deleteTexture") {
            return;
        }
        if let Some(data) = self.textures.get_mut(&texture) {
            data.deleted = true;
        }
        for slots in &mut self.state.texture_units {
            for slot in slots.iter_mut() {
                if *slot == Some(texture) {
                    *slot = None;
                }
            }
        }
    }

    // ==================== Drawing ====================

    fn snapshot(&self) -> DrawState {
        let vao = self.vertex_array();
        DrawState {
            viewport: self.state.viewport,
            blend_enabled: self.state.blend_enabled,
            blend_func: (
                self.state.blend_src_rgb,
                self.state.blend_dst_rgb,
                self.state.blend_src_alpha,
                self.state.blend_dst_alpha,
            ),
            depth_test_enabled: self.state.depth_test_enabled,
            depth_func: self.state.depth_func,
            cull_face_enabled: self.state.cull_face_enabled,
            cull_face_mode: self.state.cull_face_mode,
            vertex_array: self.state.current_vertex_array,
            vertex_attribs: vao.attribs.clone(),
            element_buffer: vao.element_buffer,
            framebuffer: self.state.draw_framebuffer,
            transform_feedback_active: self.transform_feedback_active(),
            rasterizer_discard: self.state.rasterizer_discard,
            textures: self.state.texture_units.clone(),
            uniforms: self.uniform_values.clone(),
        }
    }

    fn draw_program(&mut self) -> Option<WebGLProgram> {
        let program = self.state.current_program?;
        if self.programs.get(&program).is_some_and(|p| p.linked) {
            Some(program)
        } else {
            None
        }
    }

    fn record_arrays(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        if first < 0 || count < 0 || instances < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let Some(program) = self.draw_program() else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let state = self.snapshot();
        self.draw_calls.push(DrawCall::DrawArrays {
            mode,
            first,
            count,
            instances,
            program,
            state: Box::new(state),
        });
    }

    fn record_elements(&mut self, mode: u32, count: i32, type_: u32, offset: i32, instances: i32) {
        if count < 0 || offset < 0 || instances < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let uint_ok =
            self.is_webgl2() || self.enabled_extensions.contains("OES_element_index_uint");
        match type_ {
            constants::UNSIGNED_BYTE | constants::UNSIGNED_SHORT => {}
            constants::UNSIGNED_INT if uint_ok => {}
            _ => {
                self.set_error(constants::INVALID_ENUM);
                return;
            }
        }
        if self.vertex_array().element_buffer.is_none() {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        let Some(program) = self.draw_program() else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        let state = self.snapshot();
        self.draw_calls.push(DrawCall::DrawElements {
            mode,
            count,
            type_,
            offset,
            instances,
            program,
            state: Box::new(state),
        });
    }

    /// Draw arrays.
    pub fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        if self.begin("drawArrays") {
            self.record_arrays(mode, first, count, 0);
        }
    }

    /// Draw elements.
    pub fn draw_elements(&mut self, mode: u32, count: i32, type_: u32, offset: i32) {
        if self.begin("drawElements") {
            self.record_elements(mode, count, type_, offset, 0);
        }
    }

    /// Instanced draw arrays (WebGL2).
    pub fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        if self.begin_webgl2("drawArraysInstanced") {
            self.record_arrays(mode, first, count, instances);
        }
    }

    /// Instanced draw elements (WebGL2).
    pub fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        type_: u32,
        offset: i32,
        instances: i32,
    ) {
        if self.begin_webgl2("drawElementsInstanced") {
            self.record_elements(mode, count, type_, offset, instances);
        }
    }

    /// `ANGLE_instanced_arrays.drawArraysInstancedANGLE`.
    pub fn draw_arrays_instanced_angle(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        if self.begin_extension("drawArraysInstancedANGLE", "ANGLE_instanced_arrays") {
            self.record_arrays(mode, first, count, instances);
        }
    }

    /// `ANGLE_instanced_arrays.drawElementsInstancedANGLE`.
    pub fn draw_elements_instanced_angle(
        &mut self,
        mode: u32,
        count: i32,
        type_: u32,
        offset: i32,
        instances: i32,
    ) {
        if self.begin_extension("drawElementsInstancedANGLE", "ANGLE_instanced_arrays") {
            self.record_elements(mode, count, type_, offset, instances);
        }
    }

    // ==================== Transform Feedback ====================

    /// Create a transform feedback object (WebGL2).
    pub fn create_transform_feedback(&mut self) -> Option<WebGLTransformFeedback> {
        if !self.begin_webgl2("createTransformFeedback") {
            return None;
        }
        let tf = WebGLObject::new();
        self.transform_feedbacks
            .insert(tf, TransformFeedbackData::default());
        Some(tf)
    }

    /// Bind a transform feedback object (WebGL2).
    pub fn bind_transform_feedback(&mut self, target: u32, tf: Option<WebGLTransformFeedback>) {
        if !self.begin_webgl2("bindTransformFeedback") {
            return;
        }
        if target != constants::TRANSFORM_FEEDBACK {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        if self.transform_feedback_active() {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        self.state.current_transform_feedback = tf;
    }

    /// Begin capturing vertex output (WebGL2).
    pub fn begin_transform_feedback(&mut self, primitive_mode: u32) {
        if !self.begin_webgl2("beginTransformFeedback") {
            return;
        }
        let has_output = self.state.transform_feedback_buffer_bindings[0].is_some()
            || self.state.current_transform_feedback_buffer.is_some();
        let Some(tf) = self.state.current_transform_feedback else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        match self.transform_feedbacks.get_mut(&tf) {
            Some(data) if !data.active && has_output => {
                data.active = true;
                data.primitive_mode = primitive_mode;
            }
            _ => self.set_error(constants::INVALID_OPERATION),
        }
    }

    /// End capturing vertex output (WebGL2).
    pub fn end_transform_feedback(&mut self) {
        if !self.begin_webgl2("endTransformFeedback") {
            return;
        }
        let active = self
            .state
            .current_transform_feedback
            .and_then(|tf| self.transform_feedbacks.get_mut(&tf))
            .filter(|data| data.active);
        match active {
            Some(data) => data.active = false,
            None => self.set_error(constants::INVALID_OPERATION),
        }
    }

    /// Delete a transform feedback object (WebGL2).
    pub fn delete_transform_feedback(&mut self, tf: WebGLTransformFeedback) {
        if !self.begin_webgl2("deleteTransformFeedback") {
            return;
        }
        if let Some(data) = self.transform_feedbacks.get_mut(&tf) {
            data.deleted = true;
        }
        if self.state.current_transform_feedback == Some(tf) {
            self.state.current_transform_feedback = None;
        }
    }

    /// Whether a transform feedback capture is in progress.
    pub fn transform_feedback_active(&self) -> bool {
        self.state
            .current_transform_feedback
            .and_then(|tf| self.transform_feedbacks.get(&tf))
            .is_some_and(|data| data.active)
    }

    // ==================== Output ====================

    /// Get draw calls and clear them.
    pub fn take_draw_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draw_calls)
    }

    /// Get buffer data.
    pub fn get_buffer_data(&self, buffer: WebGLBuffer) -> Option<&BufferData> {
        self.buffers.get(&buffer)
    }

    /// Get texture data.
    pub fn get_texture_data(&self, texture: WebGLTexture) -> Option<&TextureData> {
        self.textures.get(&texture)
    }

    /// Get shader data.
    pub fn get_shader_data(&self, shader: WebGLShader) -> Option<&ShaderData> {
        self.shaders.get(&shader)
    }

    /// Get program data.
    pub fn get_program_data(&self, program: WebGLProgram) -> Option<&ProgramData> {
        self.programs.get(&program)
    }

    /// Get framebuffer data.
    pub fn get_framebuffer_data(&self, framebuffer: WebGLFramebuffer) -> Option<&FramebufferData> {
        self.framebuffers.get(&framebuffer)
    }

    /// Get renderbuffer data.
    pub fn get_renderbuffer_data(
        &self,
        renderbuffer: WebGLRenderbuffer,
    ) -> Option<&RenderbufferData> {
        self.renderbuffers.get(&renderbuffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webgl2() -> WebGLRenderingContext {
        HtmlCanvas::new(100, 100)
            .get_context("webgl2", &ContextAttributes::default())
            .unwrap()
    }

    #[test]
    fn test_context_creation() {
        let ctx = WebGLRenderingContext::new(800, 600);
        assert_eq!(ctx.width, 800);
        assert_eq!(ctx.height, 600);
        assert_eq!(ctx.state.viewport, [0, 0, 800, 600]);
        assert_eq!(ctx.version(), ContextVersion::WebGL1);
    }

    #[test]
    fn test_clear_color() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        ctx.clear_color(1.0, 0.5, 0.25, 1.0);
        assert_eq!(ctx.state.clear_color, [1.0, 0.5, 0.25, 1.0]);
        assert_eq!(ctx.call_count("clearColor"), 1);
    }

    #[test]
    fn test_create_buffer() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_buffer(constants::ARRAY_BUFFER, Some(buffer));

        let data = [1.0_f32, 2.0, 3.0, 4.0];
        let bytes: Vec<u8> = data.iter().flat_map(|f| f.to_le_bytes()).collect();
        ctx.buffer_data(constants::ARRAY_BUFFER, &bytes, constants::STATIC_DRAW);

        let buf_data = ctx.get_buffer_data(buffer).unwrap();
        assert_eq!(buf_data.data.len(), 16);
    }

    #[test]
    fn test_enable_disable() {
        let mut ctx = WebGLRenderingContext::new(100, 100);

        assert!(!ctx.is_enabled(constants::BLEND));
        ctx.enable(constants::BLEND);
        assert!(ctx.is_enabled(constants::BLEND));
        ctx.disable(constants::BLEND);
        assert!(!ctx.is_enabled(constants::BLEND));

        ctx.enable(constants::RASTERIZER_DISCARD);
        assert_eq!(ctx.get_error(), constants::INVALID_ENUM);
    }

    #[test]
    fn test_vertex_attribs() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_buffer(constants::ARRAY_BUFFER, Some(buffer));

        ctx.vertex_attrib_pointer(0, 3, constants::FLOAT, false, 12, 0);
        ctx.enable_vertex_attrib_array(0);

        let attrib = ctx.vertex_attrib(0).unwrap();
        assert!(attrib.enabled);
        assert_eq!(attrib.size, 3);
        assert_eq!(attrib.buffer, Some(buffer));
    }

    #[test]
    fn test_vertex_array_captures_state() {
        let mut ctx = webgl2();
        let vbo = ctx.create_buffer().unwrap();
        let ibo = ctx.create_buffer().unwrap();

        let vao = ctx.create_vertex_array().unwrap();
        ctx.bind_vertex_array(Some(vao));
        ctx.bind_buffer(constants::ARRAY_BUFFER, Some(vbo));
        ctx.bind_buffer(constants::ELEMENT_ARRAY_BUFFER, Some(ibo));
        ctx.vertex_attrib_pointer(1, 2, constants::FLOAT, false, 8, 0);
        ctx.enable_vertex_attrib_array(1);

        ctx.bind_vertex_array(None);
        assert!(ctx.element_array_buffer().is_none());
        assert!(!ctx.vertex_attrib(1).unwrap().enabled);

        ctx.bind_vertex_array(Some(vao));
        assert_eq!(ctx.element_array_buffer(), Some(ibo));
        assert!(ctx.vertex_attrib(1).unwrap().enabled);
    }

    #[test]
    fn test_oes_vertex_array_requires_extension() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        assert!(ctx.create_vertex_array_oes().is_none());
        assert_eq!(ctx.get_error(), constants::INVALID_OPERATION);

        assert!(ctx.get_extension("OES_vertex_array_object"));
        assert!(ctx.create_vertex_array_oes().is_some());
        assert!(ctx.create_vertex_array().is_none());
    }

    #[test]
    fn test_texture() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let texture = ctx.create_texture().unwrap();

        ctx.bind_texture(constants::TEXTURE_2D, Some(texture));
        ctx.tex_parameteri(
            constants::TEXTURE_2D,
            constants::TEXTURE_MIN_FILTER,
            constants::LINEAR as i32,
        );

        let tex_data = ctx.get_texture_data(texture).unwrap();
        assert_eq!(tex_data.min_filter, constants::LINEAR);
        assert_eq!(ctx.bound_texture(0, constants::TEXTURE_2D), Some(texture));
    }

    #[test]
    fn test_texture_target_is_fixed() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let texture = ctx.create_texture().unwrap();
        ctx.bind_texture(constants::TEXTURE_2D, Some(texture));
        ctx.bind_texture(constants::TEXTURE_CUBE_MAP, Some(texture));
        assert_eq!(ctx.get_error(), constants::INVALID_OPERATION);
    }

    #[test]
    fn test_npot_mipmaps_webgl1() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let texture = ctx.create_texture().unwrap();
        ctx.bind_texture(constants::TEXTURE_2D, Some(texture));
        ctx.tex_image_2d(
            constants::TEXTURE_2D,
            0,
            constants::RGBA as i32,
            3,
            5,
            0,
            constants::RGBA,
            constants::UNSIGNED_BYTE,
            None,
        );
        ctx.generate_mipmap(constants::TEXTURE_2D);
        assert_eq!(ctx.get_error(), constants::INVALID_OPERATION);
        assert!(!ctx.get_texture_data(texture).unwrap().has_mipmaps);
    }

    #[test]
    fn test_parameters() {
        let mut ctx = HtmlCanvas::with_profile(4, 4, GpuProfile::mali_450())
            .get_context("webgl", &ContextAttributes::default())
            .unwrap();
        assert_eq!(ctx.get_parameter_i32(constants::MAX_TEXTURE_IMAGE_UNITS), Some(8));
        assert_eq!(ctx.get_parameter_string(constants::UNMASKED_RENDERER_WEBGL), None);
        assert_eq!(ctx.get_error(), constants::INVALID_ENUM);

        assert!(ctx.get_extension("WEBGL_debug_renderer_info"));
        assert_eq!(
            ctx.get_parameter_string(constants::UNMASKED_RENDERER_WEBGL),
            Some("Mali-450 MP".to_string())
        );

        let high = ctx
            .get_shader_precision_format(constants::FRAGMENT_SHADER, constants::HIGH_FLOAT)
            .unwrap();
        assert_eq!(high.precision, 0);
    }

    #[test]
    fn test_context_loss() {
        let mut ctx = webgl2();
        let buffer = ctx.create_buffer().unwrap();
        assert!(ctx.get_extension("WEBGL_lose_context"));

        ctx.lose_context();
        assert!(ctx.is_context_lost());
        assert!(!ctx.is_buffer(buffer));
        assert!(ctx.create_buffer().is_none());
        assert_eq!(ctx.get_error(), constants::CONTEXT_LOST_WEBGL);
        assert_eq!(ctx.take_context_events(), vec![ContextEvent::Lost]);

        ctx.restore_context();
        assert!(!ctx.is_context_lost());
        assert!(!ctx.is_extension_enabled("WEBGL_lose_context"));
        let fresh = ctx.create_buffer().unwrap();
        assert_ne!(fresh, buffer);
        assert_eq!(ctx.take_context_events(), vec![ContextEvent::Restored]);
    }

    #[test]
    fn test_error_from_code() {
        assert_eq!(WebGLError::from_code(constants::NO_ERROR), None);
        assert_eq!(
            WebGLError::from_code(constants::INVALID_VALUE),
            Some(WebGLError::InvalidValue)
        );
        assert_eq!(
            WebGLError::from_code(constants::CONTEXT_LOST_WEBGL),
            Some(WebGLError::ContextLost)
        );
    }

    #[test]
    fn test_stencil_separate() {
        let mut ctx = WebGLRenderingContext::new(4, 4);
        ctx.stencil_func_separate(constants::BACK, constants::EQUAL, 3, 0xFF);
        assert_eq!(ctx.state().stencil_back.func, constants::EQUAL);
        assert_eq!(ctx.state().stencil_front.func, constants::ALWAYS);
        ctx.stencil_op(constants::KEEP, constants::INCR, constants::REPLACE);
        assert_eq!(ctx.state().stencil_front.zpass, constants::REPLACE);
        assert_eq!(ctx.state().stencil_back.zfail, constants::INCR);
    }
}
