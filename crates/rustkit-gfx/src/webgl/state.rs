//! Shadow copy of the fixed-function pipeline state.
//!
//! Every setter compares against the cached value and only talks to the
//! context when something changed. The cache is seeded by
//! [`initialize_render_state`](WebglGraphicsDevice::initialize_render_state),
//! which issues every value explicitly so cache and context agree.

use rustkit_webgl::constants as gl_const;

use crate::constants::{BlendEquation, BlendMode, CompareFunc, CullMode, FrontFace, StencilOp};

use super::WebglGraphicsDevice;

/// Blending and color write mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    pub enabled: bool,
    pub color_src: BlendMode,
    pub color_dst: BlendMode,
    pub alpha_src: BlendMode,
    pub alpha_dst: BlendMode,
    /// Factors were last set with `blendFuncSeparate`.
    pub separate_alpha: bool,
    pub color_op: BlendEquation,
    pub alpha_op: BlendEquation,
    /// Equations were last set with `blendEquationSeparate`.
    pub separate_equation: bool,
    pub constant: [f32; 4],
    pub color_write: [bool; 4],
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            color_src: BlendMode::One,
            color_dst: BlendMode::Zero,
            alpha_src: BlendMode::One,
            alpha_dst: BlendMode::Zero,
            separate_alpha: false,
            color_op: BlendEquation::Add,
            alpha_op: BlendEquation::Add,
            separate_equation: false,
            constant: [0.0; 4],
            color_write: [true; 4],
        }
    }
}

/// Depth test, depth writes and polygon offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub test: bool,
    pub func: CompareFunc,
    pub write: bool,
    pub bias: bool,
    pub bias_constant: f32,
    pub bias_slope: f32,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            func: CompareFunc::LessEqual,
            write: true,
            bias: false,
            bias_constant: 0.0,
            bias_slope: 0.0,
        }
    }
}

/// Stencil test of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFace {
    pub func: CompareFunc,
    pub reference: i32,
    pub read_mask: u32,
    pub fail: StencilOp,
    pub zfail: StencilOp,
    pub zpass: StencilOp,
    pub write_mask: u32,
}

impl StencilFace {
    fn same_func(&self, func: CompareFunc, reference: i32, mask: u32) -> bool {
        self.func == func && self.reference == reference && self.read_mask == mask
    }

    fn same_ops(&self, fail: StencilOp, zfail: StencilOp, zpass: StencilOp) -> bool {
        self.fail == fail && self.zfail == zfail && self.zpass == zpass
    }
}

impl Default for StencilFace {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xFF,
            fail: StencilOp::Keep,
            zfail: StencilOp::Keep,
            zpass: StencilOp::Keep,
            write_mask: 0xFF,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StencilState {
    pub enabled: bool,
    pub front: StencilFace,
    pub back: StencilFace,
}

/// Everything the device believes the context currently has set.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub blend: BlendState,
    pub depth: DepthState,
    pub stencil: StencilState,
    pub cull_mode: CullMode,
    /// Last face passed to `cullFace`, kept while culling is disabled.
    pub cull_face: CullMode,
    pub front_face: FrontFace,
    pub alpha_to_coverage: bool,
    pub raster: bool,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: i32,
    pub viewport: [i32; 4],
    pub scissor: [i32; 4],
    pub unpack_flip_y: bool,
    pub unpack_premultiply_alpha: bool,
}

impl RenderState {
    pub fn new(width: u32, height: u32) -> Self {
        let full = [0, 0, width as i32, height as i32];
        Self {
            blend: BlendState::default(),
            depth: DepthState::default(),
            stencil: StencilState::default(),
            cull_mode: CullMode::Back,
            cull_face: CullMode::Back,
            front_face: FrontFace::Ccw,
            alpha_to_coverage: false,
            raster: true,
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            viewport: full,
            scissor: full,
            unpack_flip_y: false,
            unpack_premultiply_alpha: false,
        }
    }
}

fn toggle(gl: &mut rustkit_webgl::WebGLRenderingContext, cap: u32, on: bool) {
    if on {
        gl.enable(cap);
    } else {
        gl.disable(cap);
    }
}

impl WebglGraphicsDevice {
    /// Reset the cache to defaults and push every value to the context.
    pub(crate) fn initialize_render_state(&mut self) {
        let state = RenderState::new(self.gl.drawing_buffer_width(), self.gl.drawing_buffer_height());
        let gl = &mut self.gl;

        let blend = &state.blend;
        gl.disable(gl_const::BLEND);
        gl.blend_func(blend.color_src.to_gl(), blend.color_dst.to_gl());
        gl.blend_equation(blend.color_op.to_gl());
        gl.blend_color(0.0, 0.0, 0.0, 0.0);
        gl.color_mask(true, true, true, true);

        gl.enable(gl_const::CULL_FACE);
        gl.cull_face(gl_const::BACK);
        gl.front_face(gl_const::CCW);

        gl.enable(gl_const::DEPTH_TEST);
        gl.depth_func(state.depth.func.to_gl());
        gl.depth_mask(true);

        let stencil = &state.stencil.front;
        gl.disable(gl_const::STENCIL_TEST);
        gl.stencil_func(stencil.func.to_gl(), stencil.reference, stencil.read_mask);
        gl.stencil_op(stencil.fail.to_gl(), stencil.zfail.to_gl(), stencil.zpass.to_gl());
        gl.stencil_mask(stencil.write_mask);

        gl.disable(gl_const::SAMPLE_ALPHA_TO_COVERAGE);
        if gl.is_webgl2() {
            gl.disable(gl_const::RASTERIZER_DISCARD);
        }
        gl.disable(gl_const::POLYGON_OFFSET_FILL);
        gl.polygon_offset(0.0, 0.0);

        gl.clear_depth(state.clear_depth);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear_stencil(0);

        gl.enable(gl_const::SCISSOR_TEST);
        let [x, y, w, h] = state.viewport;
        gl.viewport(x, y, w, h);
        gl.scissor(x, y, w, h);

        if gl.is_webgl2() || self.extensions.standard_derivatives.is_some() {
            gl.hint(gl_const::FRAGMENT_SHADER_DERIVATIVE_HINT, gl_const::NICEST);
        }

        gl.pixel_storei(gl_const::UNPACK_FLIP_Y_WEBGL, 0);
        gl.pixel_storei(gl_const::UNPACK_PREMULTIPLY_ALPHA_WEBGL, 0);
        gl.pixel_storei(gl_const::UNPACK_COLORSPACE_CONVERSION_WEBGL, gl_const::NONE as i32);
        gl.pixel_storei(gl_const::UNPACK_ALIGNMENT, 1);

        self.state = state;
    }

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    // ==================== Blending ====================

    pub fn set_blending(&mut self, enabled: bool) {
        if self.state.blend.enabled != enabled {
            toggle(&mut self.gl, gl_const::BLEND, enabled);
            self.state.blend.enabled = enabled;
        }
    }

    /// Same factors for color and alpha.
    pub fn set_blend_function(&mut self, src: BlendMode, dst: BlendMode) {
        let blend = &mut self.state.blend;
        if blend.color_src != src || blend.color_dst != dst || blend.separate_alpha {
            self.gl.blend_func(src.to_gl(), dst.to_gl());
            blend.color_src = src;
            blend.color_dst = dst;
            blend.alpha_src = src;
            blend.alpha_dst = dst;
            blend.separate_alpha = false;
        }
    }

    pub fn set_blend_function_separate(
        &mut self,
        src: BlendMode,
        dst: BlendMode,
        src_alpha: BlendMode,
        dst_alpha: BlendMode,
    ) {
        let blend = &mut self.state.blend;
        if blend.color_src != src
            || blend.color_dst != dst
            || blend.alpha_src != src_alpha
            || blend.alpha_dst != dst_alpha
            || !blend.separate_alpha
        {
            self.gl.blend_func_separate(
                src.to_gl(),
                dst.to_gl(),
                src_alpha.to_gl(),
                dst_alpha.to_gl(),
            );
            blend.color_src = src;
            blend.color_dst = dst;
            blend.alpha_src = src_alpha;
            blend.alpha_dst = dst_alpha;
            blend.separate_alpha = true;
        }
    }

    pub fn set_blend_equation(&mut self, op: BlendEquation) {
        let blend = &mut self.state.blend;
        if blend.color_op != op || blend.alpha_op != op || blend.separate_equation {
            self.gl.blend_equation(op.to_gl());
            blend.color_op = op;
            blend.alpha_op = op;
            blend.separate_equation = false;
        }
    }

    pub fn set_blend_equation_separate(&mut self, op: BlendEquation, alpha_op: BlendEquation) {
        let blend = &mut self.state.blend;
        if blend.color_op != op || blend.alpha_op != alpha_op || !blend.separate_equation {
            self.gl.blend_equation_separate(op.to_gl(), alpha_op.to_gl());
            blend.color_op = op;
            blend.alpha_op = alpha_op;
            blend.separate_equation = true;
        }
    }

    pub fn set_blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        let color = [r, g, b, a];
        if self.state.blend.constant != color {
            self.gl.blend_color(r, g, b, a);
            self.state.blend.constant = color;
        }
    }

    pub fn set_color_write(&mut self, r: bool, g: bool, b: bool, a: bool) {
        let mask = [r, g, b, a];
        if self.state.blend.color_write != mask {
            self.gl.color_mask(r, g, b, a);
            self.state.blend.color_write = mask;
        }
    }

    // ==================== Depth ====================

    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.state.depth.test != enabled {
            toggle(&mut self.gl, gl_const::DEPTH_TEST, enabled);
            self.state.depth.test = enabled;
        }
    }

    pub fn set_depth_func(&mut self, func: CompareFunc) {
        if self.state.depth.func != func {
            self.gl.depth_func(func.to_gl());
            self.state.depth.func = func;
        }
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        if self.state.depth.write != enabled {
            self.gl.depth_mask(enabled);
            self.state.depth.write = enabled;
        }
    }

    /// Toggle polygon offset.
    pub fn set_depth_bias(&mut self, enabled: bool) {
        if self.state.depth.bias != enabled {
            toggle(&mut self.gl, gl_const::POLYGON_OFFSET_FILL, enabled);
            self.state.depth.bias = enabled;
        }
    }

    pub fn set_depth_bias_values(&mut self, constant: f32, slope: f32) {
        let depth = &mut self.state.depth;
        if depth.bias_constant != constant || depth.bias_slope != slope {
            self.gl.polygon_offset(slope, constant);
            depth.bias_constant = constant;
            depth.bias_slope = slope;
        }
    }

    // ==================== Stencil ====================

    pub fn set_stencil_test(&mut self, enabled: bool) {
        if self.state.stencil.enabled != enabled {
            toggle(&mut self.gl, gl_const::STENCIL_TEST, enabled);
            self.state.stencil.enabled = enabled;
        }
    }

    /// Same test for both faces.
    pub fn set_stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let stencil = &mut self.state.stencil;
        if !stencil.front.same_func(func, reference, mask)
            || !stencil.back.same_func(func, reference, mask)
        {
            self.gl.stencil_func(func.to_gl(), reference, mask);
            for face in [&mut stencil.front, &mut stencil.back] {
                face.func = func;
                face.reference = reference;
                face.read_mask = mask;
            }
        }
    }

    pub fn set_stencil_func_front(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let front = &mut self.state.stencil.front;
        if !front.same_func(func, reference, mask) {
            self.gl
                .stencil_func_separate(gl_const::FRONT, func.to_gl(), reference, mask);
            front.func = func;
            front.reference = reference;
            front.read_mask = mask;
        }
    }

    pub fn set_stencil_func_back(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let back = &mut self.state.stencil.back;
        if !back.same_func(func, reference, mask) {
            self.gl
                .stencil_func_separate(gl_const::BACK, func.to_gl(), reference, mask);
            back.func = func;
            back.reference = reference;
            back.read_mask = mask;
        }
    }

    /// Same operations and write mask for both faces.
    pub fn set_stencil_operation(
        &mut self,
        fail: StencilOp,
        zfail: StencilOp,
        zpass: StencilOp,
        write_mask: u32,
    ) {
        let stencil = &mut self.state.stencil;
        if !stencil.front.same_ops(fail, zfail, zpass) || !stencil.back.same_ops(fail, zfail, zpass)
        {
            self.gl.stencil_op(fail.to_gl(), zfail.to_gl(), zpass.to_gl());
            for face in [&mut stencil.front, &mut stencil.back] {
                face.fail = fail;
                face.zfail = zfail;
                face.zpass = zpass;
            }
        }
        if stencil.front.write_mask != write_mask || stencil.back.write_mask != write_mask {
            self.gl.stencil_mask(write_mask);
            stencil.front.write_mask = write_mask;
            stencil.back.write_mask = write_mask;
        }
    }

    pub fn set_stencil_operation_front(
        &mut self,
        fail: StencilOp,
        zfail: StencilOp,
        zpass: StencilOp,
        write_mask: u32,
    ) {
        self.set_stencil_operation_face(gl_const::FRONT, fail, zfail, zpass, write_mask);
    }

    pub fn set_stencil_operation_back(
        &mut self,
        fail: StencilOp,
        zfail: StencilOp,
        zpass: StencilOp,
        write_mask: u32,
    ) {
        self.set_stencil_operation_face(gl_const::BACK, fail, zfail, zpass, write_mask);
    }

    fn set_stencil_operation_face(
        &mut self,
        side: u32,
        fail: StencilOp,
        zfail: StencilOp,
        zpass: StencilOp,
        write_mask: u32,
    ) {
        let face = if side == gl_const::FRONT {
            &mut self.state.stencil.front
        } else {
            &mut self.state.stencil.back
        };
        if !face.same_ops(fail, zfail, zpass) {
            self.gl
                .stencil_op_separate(side, fail.to_gl(), zfail.to_gl(), zpass.to_gl());
            face.fail = fail;
            face.zfail = zfail;
            face.zpass = zpass;
        }
        if face.write_mask != write_mask {
            self.gl.stencil_mask_separate(side, write_mask);
            face.write_mask = write_mask;
        }
    }

    // ==================== Rasterizer ====================

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        if self.state.cull_mode == mode {
            return;
        }
        match mode.to_gl() {
            None => self.gl.disable(gl_const::CULL_FACE),
            Some(face) => {
                if self.state.cull_mode == CullMode::None {
                    self.gl.enable(gl_const::CULL_FACE);
                }
                if self.state.cull_face != mode {
                    self.gl.cull_face(face);
                    self.state.cull_face = mode;
                }
            }
        }
        self.state.cull_mode = mode;
    }

    pub fn set_front_face(&mut self, front_face: FrontFace) {
        if self.state.front_face != front_face {
            self.gl.front_face(front_face.to_gl());
            self.state.front_face = front_face;
        }
    }

    pub fn set_alpha_to_coverage(&mut self, enabled: bool) {
        if self.state.alpha_to_coverage != enabled {
            toggle(&mut self.gl, gl_const::SAMPLE_ALPHA_TO_COVERAGE, enabled);
            self.state.alpha_to_coverage = enabled;
        }
    }

    /// Toggle rasterization. Only WebGL2 can discard; WebGL1 just records
    /// the request.
    pub fn set_raster(&mut self, enabled: bool) {
        if self.state.raster != enabled {
            if self.gl.is_webgl2() {
                toggle(&mut self.gl, gl_const::RASTERIZER_DISCARD, !enabled);
            }
            self.state.raster = enabled;
        }
    }

    // ==================== Clear values ====================

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        let color = [r, g, b, a];
        if self.state.clear_color != color {
            self.gl.clear_color(r, g, b, a);
            self.state.clear_color = color;
        }
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        if self.state.clear_depth != depth {
            self.gl.clear_depth(depth);
            self.state.clear_depth = depth;
        }
    }

    pub fn set_clear_stencil(&mut self, stencil: i32) {
        if self.state.clear_stencil != stencil {
            self.gl.clear_stencil(stencil);
            self.state.clear_stencil = stencil;
        }
    }

    // ==================== Viewport ====================

    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let rect = [x, y, width, height];
        if self.state.viewport != rect {
            self.gl.viewport(x, y, width, height);
            self.state.viewport = rect;
        }
    }

    pub fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let rect = [x, y, width, height];
        if self.state.scissor != rect {
            self.gl.scissor(x, y, width, height);
            self.state.scissor = rect;
        }
    }

    // ==================== Pixel store ====================

    pub fn set_unpack_flip_y(&mut self, flip: bool) {
        if self.state.unpack_flip_y != flip {
            self.gl.pixel_storei(gl_const::UNPACK_FLIP_Y_WEBGL, flip as i32);
            self.state.unpack_flip_y = flip;
        }
    }

    pub fn set_unpack_premultiply_alpha(&mut self, premultiply: bool) {
        if self.state.unpack_premultiply_alpha != premultiply {
            self.gl
                .pixel_storei(gl_const::UNPACK_PREMULTIPLY_ALPHA_WEBGL, premultiply as i32);
            self.state.unpack_premultiply_alpha = premultiply;
        }
    }
}
