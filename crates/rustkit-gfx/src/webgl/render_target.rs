//! Framebuffer objects backing a [`RenderTarget`].
//!
//! [`RenderTarget`]: crate::RenderTarget

use rustkit_webgl::{
    constants as gl_const, WebGLFramebuffer, WebGLRenderbuffer, WebGLRenderingContext,
    WebGLTexture,
};
use tracing::{debug, warn};

use crate::render_target::RenderTarget;

/// A color or depth texture to attach, with the face/target to attach it as.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttachmentImage {
    pub texture: WebGLTexture,
    pub target: u32,
}

/// Native objects of a render target.
#[derive(Debug, Default)]
pub struct WebglRenderTarget {
    pub(crate) framebuffer: Option<WebGLFramebuffer>,
    pub(crate) depth_renderbuffer: Option<WebGLRenderbuffer>,
    /// Multisampled framebuffer resolved into `framebuffer`.
    pub(crate) msaa_framebuffer: Option<WebGLFramebuffer>,
    pub(crate) msaa_color: Option<WebGLRenderbuffer>,
    pub(crate) msaa_depth: Option<WebGLRenderbuffer>,
    pub(crate) initialized: bool,
}

impl WebglRenderTarget {
    pub fn framebuffer(&self) -> Option<WebGLFramebuffer> {
        self.framebuffer
    }

    /// Framebuffer draws go to: the multisampled one when present.
    pub(crate) fn draw_framebuffer(&self) -> Option<WebGLFramebuffer> {
        self.msaa_framebuffer.or(self.framebuffer)
    }

    pub(crate) fn destroy(&mut self, gl: &mut WebGLRenderingContext) {
        for fb in [self.framebuffer.take(), self.msaa_framebuffer.take()].into_iter().flatten() {
            gl.delete_framebuffer(fb);
        }
        for rb in [self.depth_renderbuffer.take(), self.msaa_color.take(), self.msaa_depth.take()]
            .into_iter()
            .flatten()
        {
            gl.delete_renderbuffer(rb);
        }
        self.initialized = false;
    }

    pub(crate) fn lose_context(&mut self) {
        *self = Self::default();
    }
}

/// Renderbuffer format and attachment point of the depth buffer.
fn depth_format(webgl2: bool, target: &RenderTarget) -> (u32, u32) {
    match (target.stencil(), webgl2) {
        (true, true) => (gl_const::DEPTH24_STENCIL8, gl_const::DEPTH_STENCIL_ATTACHMENT),
        (true, false) => (gl_const::DEPTH_STENCIL, gl_const::DEPTH_STENCIL_ATTACHMENT),
        (false, true) => (gl_const::DEPTH_COMPONENT24, gl_const::DEPTH_ATTACHMENT),
        (false, false) => (gl_const::DEPTH_COMPONENT16, gl_const::DEPTH_ATTACHMENT),
    }
}

/// Create the framebuffer objects of `target`. Leaves the new framebuffer
/// bound; the caller restores its own binding.
pub(crate) fn initialize(
    gl: &mut WebGLRenderingContext,
    target: &mut RenderTarget,
    color: Option<AttachmentImage>,
    depth: Option<AttachmentImage>,
    max_samples: u32,
) {
    let width = target.width() as i32;
    let height = target.height() as i32;
    let framebuffer = gl.create_framebuffer();
    gl.bind_framebuffer(gl_const::FRAMEBUFFER, framebuffer);

    if let Some(image) = color {
        gl.framebuffer_texture_2d(
            gl_const::FRAMEBUFFER,
            gl_const::COLOR_ATTACHMENT0,
            image.target,
            Some(image.texture),
            0,
        );
    }

    let (depth_internal, depth_attachment) = depth_format(gl.is_webgl2(), target);
    let mut depth_renderbuffer = None;
    if let Some(image) = depth {
        gl.framebuffer_texture_2d(
            gl_const::FRAMEBUFFER,
            depth_attachment,
            image.target,
            Some(image.texture),
            0,
        );
    } else if target.depth() {
        depth_renderbuffer = gl.create_renderbuffer();
        gl.bind_renderbuffer(gl_const::RENDERBUFFER, depth_renderbuffer);
        gl.renderbuffer_storage(gl_const::RENDERBUFFER, depth_internal, width, height);
        gl.framebuffer_renderbuffer(
            gl_const::FRAMEBUFFER,
            depth_attachment,
            gl_const::RENDERBUFFER,
            depth_renderbuffer,
        );
        gl.bind_renderbuffer(gl_const::RENDERBUFFER, None);
    }

    let status = gl.check_framebuffer_status(gl_const::FRAMEBUFFER);
    if status != gl_const::FRAMEBUFFER_COMPLETE {
        warn!(
            target = target.name(),
            status = format_args!("0x{status:04X}"),
            "Render target framebuffer is incomplete"
        );
    }

    target.imp = WebglRenderTarget {
        framebuffer,
        depth_renderbuffer,
        initialized: true,
        ..WebglRenderTarget::default()
    };

    let samples = target.samples().min(max_samples);
    if gl.is_webgl2() && samples > 1 {
        let msaa = gl.create_framebuffer();
        gl.bind_framebuffer(gl_const::FRAMEBUFFER, msaa);
        let mut msaa_color = None;
        if color.is_some() {
            msaa_color = gl.create_renderbuffer();
            gl.bind_renderbuffer(gl_const::RENDERBUFFER, msaa_color);
            gl.renderbuffer_storage_multisample(
                gl_const::RENDERBUFFER,
                samples as i32,
                gl_const::RGBA8,
                width,
                height,
            );
            gl.framebuffer_renderbuffer(
                gl_const::FRAMEBUFFER,
                gl_const::COLOR_ATTACHMENT0,
                gl_const::RENDERBUFFER,
                msaa_color,
            );
        }
        let mut msaa_depth = None;
        if target.depth() {
            msaa_depth = gl.create_renderbuffer();
            gl.bind_renderbuffer(gl_const::RENDERBUFFER, msaa_depth);
            gl.renderbuffer_storage_multisample(
                gl_const::RENDERBUFFER,
                samples as i32,
                depth_internal,
                width,
                height,
            );
            gl.framebuffer_renderbuffer(
                gl_const::FRAMEBUFFER,
                depth_attachment,
                gl_const::RENDERBUFFER,
                msaa_depth,
            );
        }
        gl.bind_renderbuffer(gl_const::RENDERBUFFER, None);
        target.imp.msaa_framebuffer = msaa;
        target.imp.msaa_color = msaa_color;
        target.imp.msaa_depth = msaa_depth;
    }

    debug!(
        target = target.name(),
        width,
        height,
        samples,
        "Render target initialized"
    );
}

/// Blit the multisampled buffers into the resolve framebuffer. Returns
/// whether a blit happened; the multisampled framebuffer is left bound.
pub(crate) fn resolve(
    gl: &mut WebGLRenderingContext,
    target: &RenderTarget,
    color: bool,
    depth: bool,
) -> bool {
    let (Some(msaa), Some(resolved)) = (target.imp.msaa_framebuffer, target.imp.framebuffer) else {
        return false;
    };
    let mut mask = 0;
    if color {
        mask |= gl_const::COLOR_BUFFER_BIT;
    }
    if depth && target.depth() {
        mask |= gl_const::DEPTH_BUFFER_BIT;
    }
    if mask == 0 {
        return false;
    }
    let (w, h) = (target.width() as i32, target.height() as i32);
    gl.bind_framebuffer(gl_const::READ_FRAMEBUFFER, Some(msaa));
    gl.bind_framebuffer(gl_const::DRAW_FRAMEBUFFER, Some(resolved));
    gl.blit_framebuffer(0, 0, w, h, 0, 0, w, h, mask, gl_const::NEAREST);
    gl.bind_framebuffer(gl_const::FRAMEBUFFER, Some(msaa));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_target::RenderTargetDescriptor;
    use rustkit_webgl::{ContextAttributes, HtmlCanvas};

    fn color_texture(gl: &mut WebGLRenderingContext, size: i32) -> AttachmentImage {
        let texture = gl.create_texture().unwrap();
        gl.bind_texture(gl_const::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            gl_const::TEXTURE_2D,
            0,
            gl_const::RGBA as i32,
            size,
            size,
            0,
            gl_const::RGBA,
            gl_const::UNSIGNED_BYTE,
            None,
        );
        AttachmentImage {
            texture,
            target: gl_const::TEXTURE_2D,
        }
    }

    #[test]
    fn test_initialize_with_depth_renderbuffer() {
        let mut gl = WebGLRenderingContext::new(8, 8);
        let image = color_texture(&mut gl, 8);
        let mut target = RenderTarget::new(RenderTargetDescriptor::default(), 8, 8);
        initialize(&mut gl, &mut target, Some(image), None, 4);

        assert!(target.initialized());
        let fb = target.imp.framebuffer.unwrap();
        let data = gl.get_framebuffer_data(fb).unwrap();
        assert!(data.color(0).is_some());
        assert!(data.depth_stencil().is_some());
        assert!(target.imp.msaa_framebuffer.is_none());
        assert_eq!(
            gl.check_framebuffer_status(gl_const::FRAMEBUFFER),
            gl_const::FRAMEBUFFER_COMPLETE
        );
    }

    #[test]
    fn test_msaa_on_webgl2() {
        let canvas = HtmlCanvas::new(8, 8);
        let mut gl = canvas.get_context("webgl2", &ContextAttributes::default()).unwrap();
        let image = color_texture(&mut gl, 8);
        let mut target = RenderTarget::new(
            RenderTargetDescriptor {
                samples: 4,
                ..RenderTargetDescriptor::default()
            },
            8,
            8,
        );
        initialize(&mut gl, &mut target, Some(image), None, 4);
        assert!(target.imp.msaa_framebuffer.is_some());
        assert_eq!(target.imp.draw_framebuffer(), target.imp.msaa_framebuffer);

        assert!(resolve(&mut gl, &target, true, false));
        assert_eq!(gl.call_count("blitFramebuffer"), 1);
    }

    #[test]
    fn test_lose_context_forgets_objects() {
        let mut gl = WebGLRenderingContext::new(8, 8);
        let mut target = RenderTarget::new(RenderTargetDescriptor::default(), 8, 8);
        initialize(&mut gl, &mut target, None, None, 1);
        gl.reset_call_counts();
        target.lose_context();
        assert!(!target.initialized());
        assert!(target.imp.framebuffer.is_none());
        assert_eq!(gl.total_calls(), 0);
    }
}
