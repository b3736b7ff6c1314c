//! Context loss and restoration.
//!
//! When the browser drops the context every native handle becomes invalid.
//! The device forgets them without issuing calls, bumps its generation and
//! reports [`DeviceEvent::DeviceLost`]. On restore the context is probed
//! again, shaders are recompiled and buffers re-uploaded; textures and
//! render targets come back lazily on their next use.

use tracing::{info, warn};

use rustkit_common::{Result, RustKitError};
use rustkit_webgl::{ContextEvent, WebGLError};

use crate::events::DeviceEvent;
use crate::handles::{IndexBufferHandle, ShaderHandle, VertexBufferHandle};

use super::WebglGraphicsDevice;

/// Lifecycle of the rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Active,
    Lost,
    /// Between the restore notification and the end of re-initialization.
    Restoring,
}

impl WebglGraphicsDevice {
    pub fn context_state(&self) -> ContextState {
        self.context_state
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_state == ContextState::Lost
    }

    /// Drain the context error flag, naming `operation` in the error.
    pub fn check_gl_error(&mut self, operation: &str) -> Result<()> {
        let err = match self.gl.check_error() {
            Ok(()) => return Ok(()),
            Err(WebGLError::ContextLost) => RustKitError::context_lost(operation),
            Err(err) => RustKitError::gl(operation, err),
        };
        warn!(operation, error = %err, "Context reported an error");
        Err(err)
    }

    /// Number of context losses so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop the context through `WEBGL_lose_context` and process the
    /// resulting notification.
    pub fn lose_context(&mut self) {
        if !self.gl.is_context_lost() {
            self.gl.lose_context();
        }
        self.handle_context_events();
    }

    /// Restore a lost context and process the resulting notification.
    pub fn restore_context(&mut self) {
        if self.gl.is_context_lost() {
            self.gl.restore_context();
        }
        self.handle_context_events();
    }

    /// Process pending lost and restored notifications of the context.
    pub fn handle_context_events(&mut self) {
        for event in self.gl.take_context_events() {
            match event {
                ContextEvent::Lost => self.on_context_lost(),
                ContextEvent::Restored => self.on_context_restored(),
            }
        }
    }

    fn on_context_lost(&mut self) {
        if self.context_state == ContextState::Lost {
            return;
        }
        warn!(generation = self.generation, "WebGL context lost");
        self.context_state = ContextState::Lost;
        self.generation += 1;

        let base = &mut self.base;
        for shader in base.shaders.values_mut() {
            shader.lose_context();
        }
        for texture in base.textures.values_mut() {
            texture.lose_context();
        }
        base.vram.texture = 0;
        for buffer in base.vertex_buffers.values_mut() {
            buffer.imp.lose_context();
        }
        for buffer in base.index_buffers.values_mut() {
            buffer.imp.buffer.lose_context();
        }
        for target in base.render_targets.values_mut() {
            target.lose_context();
        }
        self.shader_cache.clear();
        self.initialize_context_caches();

        self.base.fire(DeviceEvent::DeviceLost);
    }

    fn on_context_restored(&mut self) {
        if self.context_state != ContextState::Lost {
            return;
        }
        info!(generation = self.generation, "WebGL context restored");
        self.context_state = ContextState::Restoring;
        self.initialize_context();

        let shaders: Vec<ShaderHandle> = self.base.shaders.keys().collect();
        for handle in shaders {
            self.compile_and_link(handle);
        }
        let vertex_buffers: Vec<VertexBufferHandle> = self.base.vertex_buffers.keys().collect();
        for handle in vertex_buffers {
            self.unlock_vertex_buffer(handle);
        }
        let index_buffers: Vec<IndexBufferHandle> = self.base.index_buffers.keys().collect();
        for handle in index_buffers {
            self.unlock_index_buffer(handle);
        }

        self.context_state = ContextState::Active;
        self.base.fire(DeviceEvent::DeviceRestored);
    }

    /// Delete every native object owned by the device.
    pub(crate) fn release_native_objects(&mut self) {
        self.unbind_vertex_array();
        let gl = &mut self.gl;
        let base = &mut self.base;
        for shader in base.shaders.values_mut() {
            shader.imp.destroy(gl);
        }
        self.shader_cache.destroy(gl);
        for texture in base.textures.values_mut() {
            texture.imp.destroy(gl);
        }
        for buffer in base.vertex_buffers.values_mut() {
            if let (Some(vao), Some(ops)) = (buffer.imp.vao.take(), self.vertex_arrays) {
                (ops.delete)(gl, vao);
            }
            buffer.imp.buffer.destroy(gl);
        }
        for buffer in base.index_buffers.values_mut() {
            buffer.imp.buffer.destroy(gl);
        }
        if let Some(ops) = self.vertex_arrays {
            for (_, vao) in self.vao_cache.drain() {
                (ops.delete)(gl, vao);
            }
        }
        for target in base.render_targets.values_mut() {
            target.imp.destroy(gl);
        }
        if let Some(feedback) = self.feedback.take() {
            gl.delete_transform_feedback(feedback);
        }
        self.active_framebuffer = None;
        gl.bind_framebuffer(rustkit_webgl::constants::FRAMEBUFFER, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BufferUsage, Semantic};
    use crate::events::EventKind;
    use crate::shader::ShaderDefinition;
    use crate::test_support::{position_format, webgl2_device, TRIANGLE_FS, TRIANGLE_VS};
    use crate::texture::TextureDescriptor;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_lose_and_restore_round_trip() {
        let mut device = webgl2_device();
        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::DeviceLost, EventKind::DeviceRestored] {
            let sink = events.clone();
            device.on(kind, move |event| sink.borrow_mut().push(event.kind()));
        }
        let shader = device.create_shader(
            ShaderDefinition::new("triangle", TRIANGLE_VS, TRIANGLE_FS)
                .with_attribute("aPosition", Semantic::Position),
        );
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        let texture = device.create_texture(TextureDescriptor::default());
        device.set_texture(texture, 0);
        assert!(device.set_shader(shader));

        device.lose_context();
        assert!(device.is_context_lost());
        assert_eq!(device.generation(), 1);
        assert!(device.shader(shader).unwrap().backend().program().is_none());
        assert!(!device.vertex_buffer(vb).unwrap().imp.buffer.initialized());
        assert!(device.texture(texture).unwrap().backend().handle().is_none());
        assert_eq!(device.vram().texture, 0);
        assert!(!device.set_shader(shader));

        device.restore_context();
        assert_eq!(device.context_state(), ContextState::Active);
        assert!(device.shader(shader).unwrap().backend().program().is_some());
        assert!(device.vertex_buffer(vb).unwrap().imp.buffer.initialized());
        assert!(device.set_shader(shader));
        assert!(device.shader(shader).unwrap().ready());
        assert_eq!(
            *events.borrow(),
            vec![EventKind::DeviceLost, EventKind::DeviceRestored]
        );
    }

    #[test]
    fn test_lost_context_skips_gl_calls() {
        let mut device = webgl2_device();
        device.lose_context();
        device.gl_mut().reset_call_counts();

        device.set_blending(true);
        let texture = device.create_texture(TextureDescriptor::default());
        device.set_texture(texture, 0);
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        device.set_vertex_buffer(vb);
        device
            .draw(&crate::primitive::Primitive::triangles(3), 0, false)
            .unwrap();
        assert_eq!(device.gl().call_count("createTexture"), 0);
        assert_eq!(device.gl().call_count("createBuffer"), 0);
        assert_eq!(device.gl().call_count("drawArrays"), 0);
    }

    #[test]
    fn test_restore_reprobes_render_state() {
        let mut device = webgl2_device();
        device.set_blending(true);
        device.lose_context();
        device.restore_context();
        assert!(!device.render_state().blend.enabled);
        assert!(!device.gl().state().blend_enabled);
    }

    #[test]
    fn test_destroy_releases_native_objects() {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        device.set_vertex_buffer(vb);
        device.set_buffers();
        device.destroy();
        assert_eq!(device.gl().call_count("deleteBuffer"), 1);
        assert_eq!(device.gl().call_count("deleteVertexArray"), 1);
        assert!(device.vertex_buffer(vb).is_none());
    }

    #[test]
    fn test_check_gl_error_reports_loss_once() {
        let mut device = webgl2_device();
        assert!(device.check_gl_error("init").is_ok());

        device.lose_context();
        let err = device.check_gl_error("lose").unwrap_err();
        assert!(matches!(err, RustKitError::ContextLost { .. }));
        assert!(err.is_recoverable());
        assert!(device.check_gl_error("lose").is_ok());
    }
}
