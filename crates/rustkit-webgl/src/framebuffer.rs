//! Framebuffers, renderbuffers and color surface operations.

use std::collections::BTreeMap;

use crate::{
    constants, DrawCall, WebGLFramebuffer, WebGLObject, WebGLRenderbuffer, WebGLRenderingContext,
    WebGLTexture,
};

// ==================== Framebuffer ====================

/// An image attached to a framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Texture {
        texture: WebGLTexture,
        /// `TEXTURE_2D` or a cube map face.
        target: u32,
        level: i32,
    },
    Renderbuffer(WebGLRenderbuffer),
}

/// Framebuffer data.
#[derive(Debug, Clone, Default)]
pub struct FramebufferData {
    /// Keyed by attachment point (`COLOR_ATTACHMENTn`, `DEPTH_ATTACHMENT`, ...).
    pub attachments: BTreeMap<u32, Attachment>,
    pub deleted: bool,
}

impl FramebufferData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color attachment `index`.
    pub fn color(&self, index: u32) -> Option<Attachment> {
        self.attachments
            .get(&(constants::COLOR_ATTACHMENT0 + index))
            .copied()
    }

    /// Depth, stencil or packed depth-stencil attachment.
    pub fn depth_stencil(&self) -> Option<Attachment> {
        [
            constants::DEPTH_STENCIL_ATTACHMENT,
            constants::DEPTH_ATTACHMENT,
            constants::STENCIL_ATTACHMENT,
        ]
        .iter()
        .find_map(|point| self.attachments.get(point).copied())
    }
}

// ==================== Renderbuffer ====================

/// Renderbuffer data.
#[derive(Debug, Clone, Default)]
pub struct RenderbufferData {
    pub internal_format: u32,
    pub width: u32,
    pub height: u32,
    pub samples: i32,
    /// RGBA8 surface, empty for depth and stencil formats.
    pub pixels: Vec<u8>,
    pub deleted: bool,
}

impl RenderbufferData {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_depth_or_stencil_format(format: u32) -> bool {
    matches!(
        format,
        constants::DEPTH_COMPONENT16
            | constants::DEPTH_COMPONENT24
            | constants::DEPTH_COMPONENT32F
            | constants::DEPTH_STENCIL
            | constants::DEPTH24_STENCIL8
            | constants::DEPTH32F_STENCIL8
            | constants::STENCIL_INDEX8
    )
}

/// Float precision of a color image, from its sized format or upload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatKind {
    Half,
    Full,
}

fn float_kind(internal_format: u32, type_: u32) -> Option<FloatKind> {
    match (internal_format, type_) {
        (constants::RGBA32F | constants::RGB32F | constants::RG32F | constants::R32F, _) => {
            Some(FloatKind::Full)
        }
        (
            constants::RGBA16F
            | constants::RGB16F
            | constants::RG16F
            | constants::R16F
            | constants::R11F_G11F_B10F,
            _,
        ) => Some(FloatKind::Half),
        (_, constants::FLOAT) => Some(FloatKind::Full),
        (_, constants::HALF_FLOAT | constants::HALF_FLOAT_OES) => Some(FloatKind::Half),
        _ => None,
    }
}

/// A color surface the context can clear, blit or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Default,
    Texture(WebGLTexture),
    Renderbuffer(WebGLRenderbuffer),
}

/// Intersect a rectangle with `[0, width) x [0, height)`.
fn clip(rect: [i32; 4], width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = rect[0].clamp(0, width as i32) as u32;
    let y0 = rect[1].clamp(0, height as i32) as u32;
    let x1 = (rect[0] + rect[2]).clamp(0, width as i32) as u32;
    let y1 = (rect[1] + rect[3]).clamp(0, height as i32) as u32;
    (x0, y0, x1.max(x0), y1.max(y0))
}

fn to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl WebGLRenderingContext {
    // ==================== Framebuffers ====================

    /// Create a framebuffer.
    pub fn create_framebuffer(&mut self) -> Option<WebGLFramebuffer> {
        if !self.begin("createFramebuffer") {
            return None;
        }
        let framebuffer = WebGLObject::new();
        self.framebuffers.insert(framebuffer, FramebufferData::new());
        Some(framebuffer)
    }

    /// Whether a handle names a live framebuffer.
    pub fn is_framebuffer(&self, framebuffer: WebGLFramebuffer) -> bool {
        self.framebuffers
            .get(&framebuffer)
            .is_some_and(|f| !f.deleted)
    }

    /// Bind a framebuffer. `FRAMEBUFFER` binds both the draw and read
    /// targets; the separate targets need WebGL2.
    pub fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<WebGLFramebuffer>) {
        if !self.begin("bindFramebuffer") {
            return;
        }
        if let Some(fb) = framebuffer {
            if !self.is_framebuffer(fb) {
                self.set_error(constants::INVALID_OPERATION);
                return;
            }
        }
        let webgl2 = self.is_webgl2();
        match target {
            constants::FRAMEBUFFER => {
                self.state.draw_framebuffer = framebuffer;
                self.state.read_framebuffer = framebuffer;
            }
            constants::DRAW_FRAMEBUFFER if webgl2 => self.state.draw_framebuffer = framebuffer,
            constants::READ_FRAMEBUFFER if webgl2 => self.state.read_framebuffer = framebuffer,
            _ => self.set_error(constants::INVALID_ENUM),
        }
    }

    /// Framebuffer bound to a target.
    pub fn bound_framebuffer(&self, target: u32) -> Option<WebGLFramebuffer> {
        match target {
            constants::READ_FRAMEBUFFER => self.state.read_framebuffer,
            _ => self.state.draw_framebuffer,
        }
    }

    /// Delete a framebuffer.
    pub fn delete_framebuffer(&mut self, framebuffer: WebGLFramebuffer) {
        if !self.begin("deleteFramebuffer") {
            return;
        }
        if let Some(data) = self.framebuffers.get_mut(&framebuffer) {
            data.deleted = true;
        }
        if self.state.draw_framebuffer == Some(framebuffer) {
            self.state.draw_framebuffer = None;
        }
        if self.state.read_framebuffer == Some(framebuffer) {
            self.state.read_framebuffer = None;
        }
    }

    fn valid_attachment_point(&self, attachment: u32) -> bool {
        let color_attachments = if self.is_webgl2()
            || self.enabled_extensions.contains("WEBGL_draw_buffers")
        {
            self.profile.max_color_attachments.max(1) as u32
        } else {
            1
        };
        match attachment {
            constants::DEPTH_ATTACHMENT
            | constants::STENCIL_ATTACHMENT
            | constants::DEPTH_STENCIL_ATTACHMENT => true,
            a => (constants::COLOR_ATTACHMENT0..constants::COLOR_ATTACHMENT0 + color_attachments)
                .contains(&a),
        }
    }

    fn attach(&mut self, target: u32, attachment: u32, image: Option<Attachment>) {
        if !self.valid_attachment_point(attachment) {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        let bound = self.bound_framebuffer(target);
        let Some(data) = bound.and_then(|fb| self.framebuffers.get_mut(&fb)) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        match image {
            Some(image) => {
                data.attachments.insert(attachment, image);
            }
            None => {
                data.attachments.remove(&attachment);
            }
        }
    }

    /// Attach a texture image to the bound framebuffer.
    pub fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<WebGLTexture>,
        level: i32,
    ) {
        if !self.begin("framebufferTexture2D") {
            return;
        }
        if let Some(tex) = texture {
            if !self.is_texture(tex) {
                self.set_error(constants::INVALID_OPERATION);
                return;
            }
        }
        let image = texture.map(|texture| Attachment::Texture {
            texture,
            target: textarget,
            level,
        });
        self.attach(target, attachment, image);
    }

    /// Attach a renderbuffer to the bound framebuffer.
    pub fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<WebGLRenderbuffer>,
    ) {
        if !self.begin("framebufferRenderbuffer") {
            return;
        }
        if renderbuffer_target != constants::RENDERBUFFER {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        self.attach(target, attachment, renderbuffer.map(Attachment::Renderbuffer));
    }

    /// Size, internal format and type of an attached image.
    fn attachment_image(&self, attachment: Attachment) -> Option<(u32, u32, u32, u32)> {
        match attachment {
            Attachment::Texture { texture, .. } => self
                .textures
                .get(&texture)
                .filter(|t| !t.deleted)
                .map(|t| (t.width, t.height, t.internal_format, t.type_)),
            Attachment::Renderbuffer(rb) => self
                .renderbuffers
                .get(&rb)
                .filter(|r| !r.deleted)
                .map(|r| (r.width, r.height, r.internal_format, constants::UNSIGNED_BYTE)),
        }
    }

    fn float_color_renderable(&self, kind: FloatKind) -> bool {
        if !self.profile.float_render_targets {
            return false;
        }
        let ext = |name: &str| self.enabled_extensions.contains(name);
        match (self.is_webgl2(), kind) {
            (true, FloatKind::Full) => ext("EXT_color_buffer_float"),
            (true, FloatKind::Half) => {
                ext("EXT_color_buffer_float") || ext("EXT_color_buffer_half_float")
            }
            (false, FloatKind::Full) => {
                ext("OES_texture_float") || ext("WEBGL_color_buffer_float")
            }
            (false, FloatKind::Half) => {
                ext("OES_texture_half_float") || ext("EXT_color_buffer_half_float")
            }
        }
    }

    fn framebuffer_status(&self, framebuffer: Option<WebGLFramebuffer>) -> u32 {
        let Some(fb) = framebuffer else {
            return constants::FRAMEBUFFER_COMPLETE;
        };
        let Some(data) = self.framebuffers.get(&fb) else {
            return constants::FRAMEBUFFER_UNSUPPORTED;
        };
        if data.attachments.is_empty() {
            return constants::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }

        let mut size = None;
        for (&point, &attachment) in &data.attachments {
            let Some((width, height, internal_format, type_)) = self.attachment_image(attachment)
            else {
                return constants::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            };
            if width == 0 || height == 0 {
                return constants::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            }
            match size {
                None => size = Some((width, height)),
                Some(s) if s != (width, height) && !self.is_webgl2() => {
                    return constants::FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
                }
                Some(_) => {}
            }
            let is_color = point >= constants::COLOR_ATTACHMENT0
                && point < constants::COLOR_ATTACHMENT0 + 16;
            if is_color {
                if let Some(kind) = float_kind(internal_format, type_) {
                    if !self.float_color_renderable(kind) {
                        return constants::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
                    }
                }
            }
        }
        constants::FRAMEBUFFER_COMPLETE
    }

    /// Completeness of the framebuffer bound to `target`.
    pub fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        if !self.begin("checkFramebufferStatus") {
            return constants::FRAMEBUFFER_UNSUPPORTED;
        }
        self.framebuffer_status(self.bound_framebuffer(target))
    }

    // ==================== Renderbuffers ====================

    /// Create a renderbuffer.
    pub fn create_renderbuffer(&mut self) -> Option<WebGLRenderbuffer> {
        if !self.begin("createRenderbuffer") {
            return None;
        }
        let renderbuffer = WebGLObject::new();
        self.renderbuffers
            .insert(renderbuffer, RenderbufferData::new());
        Some(renderbuffer)
    }

    /// Whether a handle names a live renderbuffer.
    pub fn is_renderbuffer(&self, renderbuffer: WebGLRenderbuffer) -> bool {
        self.renderbuffers
            .get(&renderbuffer)
            .is_some_and(|r| !r.deleted)
    }

    /// Bind renderbuffer.
    pub fn bind_renderbuffer(&mut self, target: u32, renderbuffer: Option<WebGLRenderbuffer>) {
        if !self.begin("bindRenderbuffer") {
            return;
        }
        if target != constants::RENDERBUFFER {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        self.state.current_renderbuffer = renderbuffer;
    }

    /// Allocate storage for the bound renderbuffer.
    pub fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        if self.begin("renderbufferStorage") {
            self.store_renderbuffer(target, 0, internal_format, width, height);
        }
    }

    /// Allocate multisampled storage for the bound renderbuffer (WebGL2).
    pub fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        if !self.begin_webgl2("renderbufferStorageMultisample") {
            return;
        }
        if samples < 0 || samples > self.profile.max_samples {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        self.store_renderbuffer(target, samples, internal_format, width, height);
    }

    fn store_renderbuffer(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        if target != constants::RENDERBUFFER {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        let max = self.profile.max_renderbuffer_size;
        if width < 0 || height < 0 || width > max || height > max {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let bound = self.state.current_renderbuffer;
        let Some(data) = bound.and_then(|rb| self.renderbuffers.get_mut(&rb)) else {
            self.set_error(constants::INVALID_OPERATION);
            return;
        };
        data.internal_format = internal_format;
        data.width = width as u32;
        data.height = height as u32;
        data.samples = samples;
        data.pixels = if is_depth_or_stencil_format(internal_format) {
            Vec::new()
        } else {
            vec![0; (width * height * 4) as usize]
        };
    }

    /// Delete a renderbuffer.
    pub fn delete_renderbuffer(&mut self, renderbuffer: WebGLRenderbuffer) {
        if !self.begin("deleteRenderbuffer") {
            return;
        }
        if let Some(data) = self.renderbuffers.get_mut(&renderbuffer) {
            data.deleted = true;
        }
        if self.state.current_renderbuffer == Some(renderbuffer) {
            self.state.current_renderbuffer = None;
        }
    }

    // ==================== Surfaces ====================

    fn color_surface(&self, framebuffer: Option<WebGLFramebuffer>) -> Option<Surface> {
        let Some(fb) = framebuffer else {
            return Some(Surface::Default);
        };
        match self.framebuffers.get(&fb)?.color(0)? {
            Attachment::Texture { texture, .. } => Some(Surface::Texture(texture)),
            Attachment::Renderbuffer(rb) => Some(Surface::Renderbuffer(rb)),
        }
    }

    fn surface(&self, surface: Surface) -> Option<(&[u8], u32, u32)> {
        match surface {
            Surface::Default => Some((&self.drawing_buffer, self.width, self.height)),
            Surface::Texture(tex) => self
                .textures
                .get(&tex)
                .map(|t| (t.pixels.as_slice(), t.width, t.height)),
            Surface::Renderbuffer(rb) => self
                .renderbuffers
                .get(&rb)
                .map(|r| (r.pixels.as_slice(), r.width, r.height)),
        }
    }

    fn surface_mut(&mut self, surface: Surface) -> Option<(&mut Vec<u8>, u32, u32)> {
        match surface {
            Surface::Default => Some((&mut self.drawing_buffer, self.width, self.height)),
            Surface::Texture(tex) => self
                .textures
                .get_mut(&tex)
                .map(|t| (&mut t.pixels, t.width, t.height)),
            Surface::Renderbuffer(rb) => self
                .renderbuffers
                .get_mut(&rb)
                .map(|r| (&mut r.pixels, r.width, r.height)),
        }
    }

    // ==================== Clear / Readback ====================

    /// Clear buffers.
    pub fn clear(&mut self, mask: u32) {
        if !self.begin("clear") {
            return;
        }
        let framebuffer = self.state.draw_framebuffer;
        if self.framebuffer_status(framebuffer) != constants::FRAMEBUFFER_COMPLETE {
            self.set_error(constants::INVALID_FRAMEBUFFER_OPERATION);
            return;
        }
        if self.state.rasterizer_discard {
            return;
        }
        self.draw_calls.push(DrawCall::Clear {
            mask,
            color: self.state.clear_color,
            depth: self.state.clear_depth,
            stencil: self.state.clear_stencil,
            framebuffer,
        });

        if mask & constants::COLOR_BUFFER_BIT == 0 {
            return;
        }
        let color = self.state.clear_color.map(to_unorm8);
        let color_mask = self.state.color_mask;
        let scissor = self
            .state
            .scissor_test_enabled
            .then_some(self.state.scissor);
        let Some(surface) = self.color_surface(framebuffer) else {
            return;
        };
        let Some((pixels, width, height)) = self.surface_mut(surface) else {
            return;
        };
        let rect = scissor.unwrap_or([0, 0, width as i32, height as i32]);
        let (x0, y0, x1, y1) = clip(rect, width, height);
        for y in y0..y1 {
            for x in x0..x1 {
                let offset = ((y * width + x) * 4) as usize;
                let Some(texel) = pixels.get_mut(offset..offset + 4) else {
                    continue;
                };
                for (channel, value) in texel.iter_mut().enumerate() {
                    if color_mask[channel] {
                        *value = color[channel];
                    }
                }
            }
        }
    }

    /// Read RGBA8 pixels from the read framebuffer. Rows are bottom-up;
    /// texels outside the surface are left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        type_: u32,
        out: &mut [u8],
    ) {
        if !self.begin("readPixels") {
            return;
        }
        if width < 0 || height < 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        if format != constants::RGBA || type_ != constants::UNSIGNED_BYTE {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        if out.len() < (width * height * 4) as usize {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        let framebuffer = self.state.read_framebuffer;
        if self.framebuffer_status(framebuffer) != constants::FRAMEBUFFER_COMPLETE {
            self.set_error(constants::INVALID_FRAMEBUFFER_OPERATION);
            return;
        }
        let Some((pixels, src_width, src_height)) = self
            .color_surface(framebuffer)
            .and_then(|surface| self.surface(surface))
        else {
            return;
        };
        let (x0, y0, x1, y1) = clip([x, y, width, height], src_width, src_height);
        for sy in y0..y1 {
            for sx in x0..x1 {
                let src = ((sy * src_width + sx) * 4) as usize;
                let dst = (((sy as i32 - y) * width + (sx as i32 - x)) * 4) as usize;
                if let (Some(texel), Some(target)) =
                    (pixels.get(src..src + 4), out.get_mut(dst..dst + 4))
                {
                    target.copy_from_slice(texel);
                }
            }
        }
    }

    /// Copy a rectangle of color from the read to the draw framebuffer with
    /// nearest sampling (WebGL2).
    #[allow(clippy::too_many_arguments)]
    pub fn blit_framebuffer(
        &mut self,
        src_x0: i32,
        src_y0: i32,
        src_x1: i32,
        src_y1: i32,
        dst_x0: i32,
        dst_y0: i32,
        dst_x1: i32,
        dst_y1: i32,
        mask: u32,
        filter: u32,
    ) {
        if !self.begin_webgl2("blitFramebuffer") {
            return;
        }
        if filter != constants::NEAREST && filter != constants::LINEAR {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        let read = self.state.read_framebuffer;
        let draw = self.state.draw_framebuffer;
        if read.is_some() && read == draw {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        if self.framebuffer_status(read) != constants::FRAMEBUFFER_COMPLETE
            || self.framebuffer_status(draw) != constants::FRAMEBUFFER_COMPLETE
        {
            self.set_error(constants::INVALID_FRAMEBUFFER_OPERATION);
            return;
        }
        if mask & constants::COLOR_BUFFER_BIT == 0 {
            return;
        }

        let Some((source, src_width, src_height)) = self
            .color_surface(read)
            .and_then(|surface| self.surface(surface))
            .map(|(pixels, w, h)| (pixels.to_vec(), w, h))
        else {
            return;
        };
        let Some(dst_surface) = self.color_surface(draw) else {
            return;
        };
        let Some((pixels, dst_width, dst_height)) = self.surface_mut(dst_surface) else {
            return;
        };

        let dst_w = (dst_x1 - dst_x0).max(1) as f32;
        let dst_h = (dst_y1 - dst_y0).max(1) as f32;
        let (x0, y0, x1, y1) = clip(
            [dst_x0, dst_y0, dst_x1 - dst_x0, dst_y1 - dst_y0],
            dst_width,
            dst_height,
        );
        for dy in y0..y1 {
            for dx in x0..x1 {
                let u = (dx as f32 + 0.5 - dst_x0 as f32) / dst_w;
                let v = (dy as f32 + 0.5 - dst_y0 as f32) / dst_h;
                let sx = (src_x0 as f32 + u * (src_x1 - src_x0) as f32).floor() as i32;
                let sy = (src_y0 as f32 + v * (src_y1 - src_y0) as f32).floor() as i32;
                if sx < 0 || sy < 0 || sx >= src_width as i32 || sy >= src_height as i32 {
                    continue;
                }
                let src = ((sy as u32 * src_width + sx as u32) * 4) as usize;
                let dst = ((dy * dst_width + dx) * 4) as usize;
                if let (Some(texel), Some(target)) =
                    (source.get(src..src + 4), pixels.get_mut(dst..dst + 4))
                {
                    target.copy_from_slice(texel);
                }
            }
        }
    }

    /// Hint that attachment contents are no longer needed (WebGL2).
    pub fn invalidate_framebuffer(&mut self, target: u32, attachments: &[u32]) {
        if !self.begin_webgl2("invalidateFramebuffer") {
            return;
        }
        match target {
            constants::FRAMEBUFFER | constants::DRAW_FRAMEBUFFER | constants::READ_FRAMEBUFFER => {
                self.invalidated = attachments.to_vec();
            }
            _ => self.set_error(constants::INVALID_ENUM),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{constants, ContextAttributes, GpuProfile, HtmlCanvas, WebGLRenderingContext};

    fn context(id: &str, profile: GpuProfile) -> WebGLRenderingContext {
        HtmlCanvas::with_profile(4, 4, profile)
            .get_context(id, &ContextAttributes::default())
            .unwrap()
    }

    fn float_target(ctx: &mut WebGLRenderingContext, type_: u32) -> u32 {
        let texture = ctx.create_texture().unwrap();
        ctx.bind_texture(constants::TEXTURE_2D, Some(texture));
        ctx.tex_image_2d(
            constants::TEXTURE_2D,
            0,
            constants::RGBA as i32,
            4,
            4,
            0,
            constants::RGBA,
            type_,
            None,
        );
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(constants::FRAMEBUFFER, Some(fb));
        ctx.framebuffer_texture_2d(
            constants::FRAMEBUFFER,
            constants::COLOR_ATTACHMENT0,
            constants::TEXTURE_2D,
            Some(texture),
            0,
        );
        ctx.check_framebuffer_status(constants::FRAMEBUFFER)
    }

    #[test]
    fn test_missing_attachment() {
        let mut ctx = WebGLRenderingContext::new(4, 4);
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(constants::FRAMEBUFFER, Some(fb));
        assert_eq!(
            ctx.check_framebuffer_status(constants::FRAMEBUFFER),
            constants::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );
        ctx.bind_framebuffer(constants::FRAMEBUFFER, None);
        assert_eq!(
            ctx.check_framebuffer_status(constants::FRAMEBUFFER),
            constants::FRAMEBUFFER_COMPLETE
        );
    }

    #[test]
    fn test_float_target_webgl1() {
        let mut ctx = context("webgl", GpuProfile::desktop());
        assert!(ctx.get_extension("OES_texture_float"));
        assert_eq!(
            float_target(&mut ctx, constants::FLOAT),
            constants::FRAMEBUFFER_COMPLETE
        );
    }

    #[test]
    fn test_float_target_webgl2_needs_extension() {
        let mut ctx = context("webgl2", GpuProfile::desktop());
        assert_eq!(
            float_target(&mut ctx, constants::FLOAT),
            constants::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        );
        assert!(ctx.get_extension("EXT_color_buffer_float"));
        assert_eq!(
            ctx.check_framebuffer_status(constants::FRAMEBUFFER),
            constants::FRAMEBUFFER_COMPLETE
        );
    }

    #[test]
    fn test_broken_float_targets() {
        let mut ctx = context("webgl", GpuProfile::broken_float_targets());
        assert!(ctx.get_extension("OES_texture_float"));
        assert!(ctx.get_extension("WEBGL_color_buffer_float"));
        assert_eq!(
            float_target(&mut ctx, constants::FLOAT),
            constants::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        );
    }

    #[test]
    fn test_clear_and_read_pixels() {
        let mut ctx = WebGLRenderingContext::new(4, 4);
        ctx.clear_color(1.0, 0.0, 0.0, 1.0);
        ctx.clear(constants::COLOR_BUFFER_BIT);

        let mut out = [0u8; 4];
        ctx.read_pixels(2, 3, 1, 1, constants::RGBA, constants::UNSIGNED_BYTE, &mut out);
        assert_eq!(out, [255, 0, 0, 255]);
        assert_eq!(ctx.take_draw_calls().len(), 1);
    }

    #[test]
    fn test_clear_respects_scissor_and_mask() {
        let mut ctx = WebGLRenderingContext::new(4, 4);
        ctx.enable(constants::SCISSOR_TEST);
        ctx.scissor(0, 0, 2, 2);
        ctx.color_mask(true, true, false, true);
        ctx.clear_color(1.0, 1.0, 1.0, 1.0);
        ctx.clear(constants::COLOR_BUFFER_BIT);

        let mut out = [0u8; 4 * 4 * 4];
        ctx.read_pixels(0, 0, 4, 4, constants::RGBA, constants::UNSIGNED_BYTE, &mut out);
        assert_eq!(&out[0..4], &[255, 255, 0, 255]);
        let outside = ((3 * 4 + 3) * 4) as usize;
        assert_eq!(&out[outside..outside + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_clear_into_renderbuffer() {
        let mut ctx = WebGLRenderingContext::new(4, 4);
        let rb = ctx.create_renderbuffer().unwrap();
        ctx.bind_renderbuffer(constants::RENDERBUFFER, Some(rb));
        ctx.renderbuffer_storage(constants::RENDERBUFFER, constants::RGBA4, 2, 2);
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(constants::FRAMEBUFFER, Some(fb));
        ctx.framebuffer_renderbuffer(
            constants::FRAMEBUFFER,
            constants::COLOR_ATTACHMENT0,
            constants::RENDERBUFFER,
            Some(rb),
        );
        ctx.clear_color(0.0, 1.0, 0.0, 1.0);
        ctx.clear(constants::COLOR_BUFFER_BIT);

        assert_eq!(&ctx.get_renderbuffer_data(rb).unwrap().pixels[0..4], &[0, 255, 0, 255]);

        ctx.bind_framebuffer(constants::FRAMEBUFFER, None);
        let mut out = [9u8; 4];
        ctx.read_pixels(0, 0, 1, 1, constants::RGBA, constants::UNSIGNED_BYTE, &mut out);
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn test_blit_to_default_framebuffer() {
        let mut ctx = context("webgl2", GpuProfile::desktop());
        let rb = ctx.create_renderbuffer().unwrap();
        ctx.bind_renderbuffer(constants::RENDERBUFFER, Some(rb));
        ctx.renderbuffer_storage_multisample(constants::RENDERBUFFER, 4, constants::RGBA8, 4, 4);
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(constants::FRAMEBUFFER, Some(fb));
        ctx.framebuffer_renderbuffer(
            constants::FRAMEBUFFER,
            constants::COLOR_ATTACHMENT0,
            constants::RENDERBUFFER,
            Some(rb),
        );
        ctx.clear_color(0.0, 0.0, 1.0, 1.0);
        ctx.clear(constants::COLOR_BUFFER_BIT);

        ctx.bind_framebuffer(constants::DRAW_FRAMEBUFFER, None);
        ctx.blit_framebuffer(0, 0, 4, 4, 0, 0, 4, 4, constants::COLOR_BUFFER_BIT, constants::NEAREST);
        assert_eq!(ctx.get_error(), constants::NO_ERROR);

        ctx.bind_framebuffer(constants::READ_FRAMEBUFFER, None);
        let mut out = [0u8; 4];
        ctx.read_pixels(3, 3, 1, 1, constants::RGBA, constants::UNSIGNED_BYTE, &mut out);
        assert_eq!(out, [0, 0, 255, 255]);
    }

    #[test]
    fn test_invalidate_framebuffer() {
        let mut ctx = context("webgl2", GpuProfile::desktop());
        ctx.invalidate_framebuffer(constants::FRAMEBUFFER, &[constants::DEPTH, constants::STENCIL]);
        assert_eq!(
            ctx.last_invalidated_attachments(),
            &[constants::DEPTH, constants::STENCIL]
        );
    }
}
