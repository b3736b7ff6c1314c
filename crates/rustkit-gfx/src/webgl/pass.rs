//! Render passes, clears, readback and render target copies.

use std::time::Instant;

use rustkit_webgl::constants as gl_const;
use tracing::{debug, trace, warn};

use crate::constants::{
    BufferUsage, ClearFlags, CullMode, DataType, PrimitiveType, Semantic, TextureDimension,
};
use crate::events::DeviceEvent;
use crate::handles::{RenderTargetHandle, ShaderHandle, TextureHandle, VertexBufferHandle};
use crate::primitive::Primitive;
use crate::render_pass::{ClearOptions, RenderPass};
use crate::shader::ShaderDefinition;
use crate::vertex_format::{VertexAttribute, VertexFormat};

use super::render_target::{self, AttachmentImage};
use super::{ContextState, WebglGraphicsDevice};

const COPY_VS: &str = "attribute vec2 vertex_position;
varying vec2 vUv0;
void main(void) {
    gl_Position = vec4(vertex_position, 0.5, 1.0);
    vUv0 = vertex_position.xy * 0.5 + 0.5;
}
";

const COPY_FS: &str = "varying vec2 vUv0;
uniform sampler2D copySource;
void main(void) {
    gl_FragColor = texture2D(copySource, vUv0);
}
";

impl WebglGraphicsDevice {
    // ==================== Render targets ====================

    /// Create the framebuffers of a render target unless that already
    /// happened in this context. The attachment textures are created and
    /// allocated first.
    pub fn init_render_target(&mut self, handle: RenderTargetHandle) {
        if self.context_state != ContextState::Active {
            return;
        }
        let Some(target) = self.base.render_targets.get(handle) else {
            return;
        };
        if target.initialized() {
            return;
        }
        let start = Instant::now();
        let (color, depth, face) = (target.color_buffer(), target.depth_buffer(), target.face());

        let color = color.and_then(|texture| self.attachment_image(texture, face));
        let depth = depth.and_then(|texture| self.attachment_image(texture, 0));
        let max_samples = self.caps.max_samples;
        let previous = self.active_framebuffer;
        let Some(target) = self.base.render_targets.get_mut(handle) else {
            return;
        };
        render_target::initialize(&mut self.gl, target, color, depth, max_samples);
        // initialize leaves the draw framebuffer of the target bound.
        self.active_framebuffer = target.imp.draw_framebuffer();
        self.set_framebuffer(previous);

        let duration = start.elapsed();
        self.base.render_target_creation_time += duration;
        self.base.fire(DeviceEvent::FboCreate {
            target: handle,
            duration,
        });
    }

    fn attachment_image(&mut self, texture: TextureHandle, face: u32) -> Option<AttachmentImage> {
        self.set_texture(texture, 0);
        let tex = self.base.textures.get(texture)?;
        let target = match tex.dimension() {
            TextureDimension::Cube => gl_const::TEXTURE_CUBE_MAP_POSITIVE_X + face,
            _ => tex.imp.target,
        };
        Some(AttachmentImage {
            texture: tex.imp.handle()?,
            target,
        })
    }

    /// Size of a render target, or of the canvas for `None`.
    fn target_size(&self, target: Option<RenderTargetHandle>) -> (i32, i32) {
        match target.and_then(|handle| self.base.render_targets.get(handle)) {
            Some(target) => (target.width() as i32, target.height() as i32),
            None => (self.base.width() as i32, self.base.height() as i32),
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        let webgl2 = self.is_webgl2();
        let Some(tex) = self.base.textures.get(texture) else {
            return;
        };
        if tex.imp.handle().is_none() || !tex.mipmaps() || !(tex.is_pot() || webgl2) {
            return;
        }
        let target = tex.imp.target;
        self.active_texture(self.caps.max_combined_textures.saturating_sub(1));
        self.bind_texture(texture);
        self.gl.generate_mipmap(target);
    }

    // ==================== Frame updates ====================

    /// Bind the current render target, creating its framebuffers on first
    /// use.
    pub fn update_begin(&mut self) {
        if self.context_state != ContextState::Active {
            return;
        }
        if self.caps.supports_image_bitmap.is_none() {
            let supported = self.gl.profile().image_bitmap;
            self.caps.supports_image_bitmap = Some(supported);
            debug!(supported, "ImageBitmap support resolved");
        }

        let framebuffer = match self.base.get_render_target() {
            Some(handle) => {
                self.init_render_target(handle);
                self.base
                    .render_targets
                    .get(handle)
                    .and_then(|target| target.imp.draw_framebuffer())
            }
            None => None,
        };
        self.set_framebuffer(framebuffer);
    }

    /// Finish rendering into the current target: resolve multisampled
    /// buffers when auto-resolve is on and regenerate color mipmaps.
    pub fn update_end(&mut self) {
        if self.context_state != ContextState::Active {
            return;
        }
        self.unbind_vertex_array();
        let Some(handle) = self.base.get_render_target() else {
            return;
        };
        let Some(target) = self.base.render_targets.get(handle) else {
            return;
        };
        if self.is_webgl2() && target.samples() > 1 && target.auto_resolve() {
            if render_target::resolve(&mut self.gl, target, true, true) {
                self.active_framebuffer = target.imp.msaa_framebuffer;
            }
        }
        if let Some(color) = target.color_buffer() {
            self.generate_mipmaps(color);
        }
    }

    // ==================== Passes ====================

    /// Begin a render pass: bind its target, cover the whole target with
    /// viewport and scissor and apply the pass clears.
    pub fn start_pass(&mut self, pass: &RenderPass) {
        trace!(pass = %pass.name, "Render pass start");
        self.base.set_render_target(pass.render_target);
        self.update_begin();

        let (width, height) = self.target_size(pass.render_target);
        self.set_viewport(0, 0, width, height);
        self.set_scissor(0, 0, width, height);

        let mut options = ClearOptions {
            flags: ClearFlags::empty(),
            ..ClearOptions::default()
        };
        if let Some(ops) = pass.color_ops.filter(|ops| ops.clear) {
            options.flags |= ClearFlags::COLOR;
            options.color = Some(ops.clear_value);
        }
        let depth_stencil = &pass.depth_stencil_ops;
        if depth_stencil.clear_depth {
            options.flags |= ClearFlags::DEPTH;
            options.depth = Some(depth_stencil.clear_depth_value);
        }
        if depth_stencil.clear_stencil {
            options.flags |= ClearFlags::STENCIL;
            options.stencil = Some(depth_stencil.clear_stencil_value);
        }
        self.clear(&options);

        self.inside_pass = true;
    }

    /// End a render pass: drop attachments the pass does not keep, resolve
    /// and generate mipmaps as its color ops ask.
    pub fn end_pass(&mut self, pass: &RenderPass) {
        self.unbind_vertex_array();
        let target = pass
            .render_target
            .and_then(|handle| self.base.render_targets.get(handle));

        if let (Some(target), true) = (target, self.context_state == ContextState::Active) {
            if self.is_webgl2() && pass.full_size_clear_rect {
                let mut invalidate = Vec::new();
                if pass.color_ops.is_some_and(|ops| !(ops.store || ops.resolve)) {
                    invalidate.push(gl_const::COLOR_ATTACHMENT0);
                }
                if !pass.depth_stencil_ops.store_depth {
                    invalidate.push(gl_const::DEPTH_ATTACHMENT);
                }
                if !pass.depth_stencil_ops.store_stencil {
                    invalidate.push(gl_const::STENCIL_ATTACHMENT);
                }
                if !invalidate.is_empty() {
                    self.gl
                        .invalidate_framebuffer(gl_const::DRAW_FRAMEBUFFER, &invalidate);
                }
            }

            let color_ops = pass.color_ops.unwrap_or_default();
            if color_ops.resolve && target.samples() > 1 && target.auto_resolve() {
                if render_target::resolve(&mut self.gl, target, true, false) {
                    self.active_framebuffer = target.imp.msaa_framebuffer;
                }
            }
            if let (true, Some(color)) = (color_ops.mipmaps, target.color_buffer()) {
                self.generate_mipmaps(color);
            }
        }

        self.inside_pass = false;
        trace!(pass = %pass.name, "Render pass end");
    }

    pub fn inside_pass(&self) -> bool {
        self.inside_pass
    }

    // ==================== Clear / readback ====================

    /// Clear the bound framebuffer. Color and depth writes are enabled for
    /// the buffers being cleared and stay enabled afterwards.
    pub fn clear(&mut self, options: &ClearOptions) {
        if self.context_state != ContextState::Active || options.flags.is_empty() {
            return;
        }
        if options.flags.contains(ClearFlags::COLOR) {
            let [r, g, b, a] = options.color.unwrap_or(ClearOptions::DEFAULT_COLOR);
            self.set_clear_color(r, g, b, a);
            self.set_color_write(true, true, true, true);
        }
        if options.flags.contains(ClearFlags::DEPTH) {
            self.set_clear_depth(options.depth.unwrap_or(ClearOptions::DEFAULT_DEPTH));
            self.set_depth_write(true);
        }
        if options.flags.contains(ClearFlags::STENCIL) {
            self.set_clear_stencil(options.stencil.unwrap_or(ClearOptions::DEFAULT_STENCIL));
        }
        self.gl.clear(options.flags.to_gl());
    }

    /// Read RGBA8 pixels of the bound framebuffer into `pixels`, bottom row
    /// first.
    pub fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32, pixels: &mut [u8]) {
        if self.context_state != ContextState::Active {
            return;
        }
        self.gl.read_pixels(
            x,
            y,
            width,
            height,
            gl_const::RGBA,
            gl_const::UNSIGNED_BYTE,
            pixels,
        );
    }

    // ==================== Copies ====================

    /// Copy color and/or depth from `source` to `dest`; `None` is the
    /// canvas on either side. WebGL2 blits between render targets; other
    /// copies draw a quad sampling the source color buffer. Returns
    /// `false` without touching the context when the copy is not possible.
    pub fn copy_render_target(
        &mut self,
        source: Option<RenderTargetHandle>,
        dest: Option<RenderTargetHandle>,
        color: bool,
        depth: bool,
    ) -> bool {
        if self.context_state != ContextState::Active {
            return false;
        }
        let webgl2 = self.is_webgl2();
        if depth && !webgl2 {
            warn!("Depth is not copyable on WebGL 1.0");
            return false;
        }

        let targets = &self.base.render_targets;
        let src = source.and_then(|handle| targets.get(handle));
        let dst = dest.and_then(|handle| targets.get(handle));
        if (source.is_some() && src.is_none()) || (dest.is_some() && dst.is_none()) {
            warn!("Cannot copy a destroyed render target");
            return false;
        }
        let textures = &self.base.textures;
        let format = |texture: Option<TextureHandle>| {
            texture.and_then(|handle| textures.get(handle)).map(|t| t.format())
        };

        if color {
            let src_color = src.and_then(|target| target.color_buffer());
            match dst {
                None if src_color.is_none() => {
                    warn!("Can't copy empty color buffer to the canvas");
                    return false;
                }
                Some(dst) if src.is_some() => {
                    if src_color.is_none() || dst.color_buffer().is_none() {
                        warn!("Can't copy color buffer, because one of the render targets doesn't have it");
                        return false;
                    }
                    if format(src_color) != format(dst.color_buffer()) {
                        warn!("Can't copy render targets of different color formats");
                        return false;
                    }
                }
                _ => {}
            }
        }
        if depth {
            if let Some(src) = src {
                if !src.depth() || dst.is_some_and(|dst| !dst.depth()) {
                    warn!("Can't copy depth buffer, because one of the render targets doesn't have it");
                    return false;
                }
                if let (Some(a), Some(b)) = (src.depth_buffer(), dst.and_then(|dst| dst.depth_buffer())) {
                    if format(Some(a)) != format(Some(b)) {
                        warn!("Can't copy render targets of different depth formats");
                        return false;
                    }
                }
            }
        }

        match dest {
            Some(dest) if webgl2 => self.blit_render_target(source, dest, color, depth),
            _ => self.copy_with_quad(source, dest, color),
        }
    }

    fn blit_render_target(
        &mut self,
        source: Option<RenderTargetHandle>,
        dest: RenderTargetHandle,
        color: bool,
        depth: bool,
    ) -> bool {
        let previous = self.base.get_render_target();
        if let Some(source) = source {
            self.init_render_target(source);
        }
        self.base.set_render_target(Some(dest));
        self.update_begin();

        let targets = &self.base.render_targets;
        let read = source
            .and_then(|handle| targets.get(handle))
            .and_then(|target| target.imp.framebuffer);
        let draw = targets.get(dest).and_then(|target| target.imp.framebuffer);
        let (width, height) = self.target_size(source.or(Some(dest)));

        let mut mask = 0;
        if color {
            mask |= gl_const::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= gl_const::DEPTH_BUFFER_BIT;
        }
        self.gl.bind_framebuffer(gl_const::READ_FRAMEBUFFER, read);
        self.gl.bind_framebuffer(gl_const::DRAW_FRAMEBUFFER, draw);
        self.gl
            .blit_framebuffer(0, 0, width, height, 0, 0, width, height, mask, gl_const::NEAREST);

        self.base.set_render_target(previous);
        let restore = previous
            .and_then(|handle| self.base.render_targets.get(handle))
            .and_then(|target| target.imp.draw_framebuffer());
        self.gl.bind_framebuffer(gl_const::FRAMEBUFFER, restore);
        self.active_framebuffer = restore;
        trace!(width, height, color, depth, "Render target blitted");
        true
    }

    fn copy_with_quad(
        &mut self,
        source: Option<RenderTargetHandle>,
        dest: Option<RenderTargetHandle>,
        color: bool,
    ) -> bool {
        let texture = source
            .and_then(|handle| self.base.render_targets.get(handle))
            .and_then(|target| target.color_buffer());
        let (true, Some(texture)) = (color, texture) else {
            warn!("Render target copy needs a source color buffer");
            return false;
        };
        if let Some(source) = source {
            self.init_render_target(source);
        }
        let shader = self.copy_shader();
        self.base.scope.set("copySource", texture);
        self.draw_quad(dest, shader)
    }

    /// Draw a full-target quad with `shader` into `dest`.
    fn draw_quad(&mut self, dest: Option<RenderTargetHandle>, shader: ShaderHandle) -> bool {
        let previous = self.base.get_render_target();
        self.base.set_render_target(dest);
        self.update_begin();

        let (width, height) = self.target_size(dest);
        self.set_cull_mode(CullMode::None);
        self.set_blending(false);
        self.set_depth_test(false);
        self.set_depth_write(false);
        self.set_color_write(true, true, true, true);
        self.set_viewport(0, 0, width, height);
        self.set_scissor(0, 0, width, height);

        let mut drawn = false;
        if self.set_shader(shader) {
            let quad = self.quad_buffer();
            self.set_vertex_buffer(quad);
            let primitive = Primitive {
                type_: PrimitiveType::TriStrip,
                base: 0,
                count: 4,
                indexed: false,
            };
            drawn = match self.draw(&primitive, 0, false) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Quad draw failed");
                    false
                }
            };
        }

        self.update_end();
        self.base.set_render_target(previous);
        self.update_begin();
        drawn
    }

    fn copy_shader(&mut self) -> ShaderHandle {
        if let Some(handle) = self
            .copy_shader
            .filter(|&handle| self.base.shaders.contains_key(handle))
        {
            return handle;
        }
        let fragment = format!("precision {} float;\n{COPY_FS}", self.caps.precision.as_str());
        let handle = self.create_shader(
            ShaderDefinition::new("copy", COPY_VS, fragment)
                .with_attribute("vertex_position", Semantic::Position),
        );
        self.copy_shader = Some(handle);
        handle
    }

    fn quad_buffer(&mut self) -> VertexBufferHandle {
        if let Some(handle) = self
            .quad
            .filter(|&handle| self.base.vertex_buffers.contains_key(handle))
        {
            return handle;
        }
        let format = VertexFormat::new(&[VertexAttribute::new(Semantic::Position, 2, DataType::Float32)]);
        let vertices: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        let handle = self.create_vertex_buffer(
            format,
            4,
            BufferUsage::Static,
            Some(bytemuck::cast_slice(&vertices)),
        );
        self.quad = Some(handle);
        handle
    }
}
