//! Creation and destruction of device resources.

use std::time::Instant;

use rustkit_common::{OptionExt, Result, RustKitError};
use rustkit_webgl::constants as gl_const;
use tracing::debug;

use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::constants::{BufferUsage, IndexFormat};
use crate::events::DeviceEvent;
use crate::handles::{
    IndexBufferHandle, RenderTargetHandle, ShaderHandle, TextureHandle, VertexBufferHandle,
};
use crate::render_target::{RenderTarget, RenderTargetDescriptor};
use crate::shader::{Shader, ShaderDefinition};
use crate::texture::{Texture, TextureDescriptor};
use crate::vertex_format::VertexFormat;

use super::{ContextState, WebglGraphicsDevice};

impl WebglGraphicsDevice {
    // ==================== Shaders ====================

    /// Register a shader and compile and link it right away. Problems are
    /// reported by the first [`set_shader`](Self::set_shader).
    pub fn create_shader(&mut self, definition: ShaderDefinition) -> ShaderHandle {
        let handle = self.base.shaders.insert(Shader::new(definition));
        self.compile_and_link(handle);
        handle
    }

    pub(crate) fn compile_and_link(&mut self, handle: ShaderHandle) {
        if self.context_state == ContextState::Lost {
            return;
        }

        self.base.fire(DeviceEvent::ShaderCompileStart { shader: handle });
        let start = Instant::now();
        let base = &mut self.base;
        let Some(shader) = base.shaders.get_mut(handle) else {
            return;
        };
        shader.imp.compile(
            &mut self.gl,
            &mut self.shader_cache,
            &shader.definition,
            &mut base.shader_stats,
        );
        let duration = start.elapsed();
        base.shader_stats.compile_time += duration;
        self.base.fire(DeviceEvent::ShaderCompileEnd {
            shader: handle,
            duration,
        });

        self.base.fire(DeviceEvent::ShaderLinkStart { shader: handle });
        let start = Instant::now();
        let base = &mut self.base;
        if let Some(shader) = base.shaders.get_mut(handle) {
            shader
                .imp
                .link(&mut self.gl, &shader.definition, &mut base.shader_stats);
        }
        let duration = start.elapsed();
        self.base.fire(DeviceEvent::ShaderLinkEnd {
            shader: handle,
            duration,
        });
    }

    /// Make `handle` the current program. The first call verifies the
    /// compile and link results and reflects the program; a shader that
    /// fails there is never used and this returns `false`.
    pub fn set_shader(&mut self, handle: ShaderHandle) -> bool {
        if self.context_state != ContextState::Active {
            return false;
        }
        let base = &mut self.base;
        let Some(shader) = base.shaders.get_mut(handle) else {
            return false;
        };
        if shader.failed {
            return false;
        }
        if !shader.ready {
            if shader
                .imp
                .post_link(&mut self.gl, &shader.definition, &mut base.scope)
            {
                shader.ready = true;
            } else {
                shader.failed = true;
                return false;
            }
        }

        let program = shader.imp.program;
        if self.shader != Some(handle) {
            self.gl.use_program(program);
            self.shader = Some(handle);
            self.base.frame.shader_switches += 1;
        }
        true
    }

    pub fn destroy_shader(&mut self, handle: ShaderHandle) {
        let Some(mut shader) = self.base.shaders.remove(handle) else {
            return;
        };
        if self.shader == Some(handle) {
            self.shader = None;
        }
        if self.copy_shader == Some(handle) {
            self.copy_shader = None;
        }
        if self.context_state == ContextState::Active {
            shader.imp.destroy(&mut self.gl);
        }
    }

    // ==================== Textures ====================

    /// Register a texture. The native object is created and uploaded the
    /// first time it is bound.
    pub fn create_texture(&mut self, desc: TextureDescriptor) -> TextureHandle {
        self.base.textures.insert(Texture::new(desc))
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        let Some(mut texture) = self.base.textures.remove(handle) else {
            return;
        };
        if let Some(native) = texture.imp.handle() {
            for slots in &mut self.texture_units {
                for slot in slots.iter_mut().filter(|slot| **slot == Some(native)) {
                    *slot = None;
                }
            }
        }
        if self.context_state == ContextState::Active {
            texture.imp.destroy(&mut self.gl);
        }
        self.base.vram.texture = self.base.vram.texture.saturating_sub(texture.gpu_size);
        self.base.scope.remove_texture(handle);
    }

    // ==================== Buffers ====================

    /// Register a vertex buffer. With `data` the buffer is uploaded at once.
    pub fn create_vertex_buffer(
        &mut self,
        format: VertexFormat,
        num_vertices: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> VertexBufferHandle {
        let upload = data.is_some();
        let buffer = VertexBuffer::new(format, num_vertices, usage, data);
        self.base.vram.vertex_buffer += buffer.byte_size();
        let handle = self.base.vertex_buffers.insert(buffer);
        if upload {
            self.unlock_vertex_buffer(handle);
        }
        handle
    }

    /// Register an index buffer. With `data` the buffer is uploaded at once.
    pub fn create_index_buffer(
        &mut self,
        format: IndexFormat,
        num_indices: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> IndexBufferHandle {
        let upload = data.is_some();
        let buffer = IndexBuffer::new(format, num_indices, usage, data);
        self.base.vram.index_buffer += buffer.byte_size();
        let handle = self.base.index_buffers.insert(buffer);
        if upload {
            self.unlock_index_buffer(handle);
        }
        handle
    }

    /// Replace the start of a vertex buffer's contents and upload it.
    pub fn write_vertex_buffer(&mut self, handle: VertexBufferHandle, data: &[u8]) {
        if let Some(buffer) = self.base.vertex_buffers.get_mut(handle) {
            buffer.write(data);
            self.unlock_vertex_buffer(handle);
        }
    }

    /// Replace the start of an index buffer's contents and upload it.
    pub fn write_index_buffer(&mut self, handle: IndexBufferHandle, data: &[u8]) {
        if let Some(buffer) = self.base.index_buffers.get_mut(handle) {
            buffer.write(data);
            self.unlock_index_buffer(handle);
        }
    }

    pub(crate) fn unlock_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        if self.context_state == ContextState::Lost {
            return;
        }
        // A bound vertex array would capture the binding.
        self.unbind_vertex_array();
        let webgl2 = self.is_webgl2();
        let Some(buffer) = self.base.vertex_buffers.get_mut(handle) else {
            return;
        };
        buffer.imp.buffer.unlock(
            &mut self.gl,
            self.generation,
            gl_const::ARRAY_BUFFER,
            buffer.usage().to_gl(webgl2),
            &buffer.storage,
        );
    }

    pub(crate) fn unlock_index_buffer(&mut self, handle: IndexBufferHandle) {
        if self.context_state == ContextState::Lost {
            return;
        }
        self.unbind_vertex_array();
        let webgl2 = self.is_webgl2();
        let Some(buffer) = self.base.index_buffers.get_mut(handle) else {
            return;
        };
        buffer.imp.buffer.unlock(
            &mut self.gl,
            self.generation,
            gl_const::ELEMENT_ARRAY_BUFFER,
            buffer.usage().to_gl(webgl2),
            &buffer.storage,
        );
    }

    pub fn destroy_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        let Some(mut buffer) = self.base.vertex_buffers.remove(handle) else {
            return;
        };
        self.vertex_buffers.retain(|&pending| pending != handle);
        if self.transform_feedback_buffer == Some(handle) {
            self.set_transform_feedback_buffer(None);
        }
        if self.quad == Some(handle) {
            self.quad = None;
        }
        if self.context_state == ContextState::Active {
            self.unbind_vertex_array();
            if let (Some(vao), Some(ops)) = (buffer.imp.vao.take(), self.vertex_arrays) {
                (ops.delete)(&mut self.gl, vao);
            }
            buffer.imp.buffer.destroy(&mut self.gl);
        }
        self.base.vram.vertex_buffer = self
            .base
            .vram
            .vertex_buffer
            .saturating_sub(buffer.byte_size());
    }

    pub fn destroy_index_buffer(&mut self, handle: IndexBufferHandle) {
        let Some(mut buffer) = self.base.index_buffers.remove(handle) else {
            return;
        };
        if self.index_buffer == Some(handle) {
            self.index_buffer = None;
        }
        if self.context_state == ContextState::Active {
            self.unbind_vertex_array();
            buffer.imp.buffer.destroy(&mut self.gl);
        }
        self.base.vram.index_buffer = self
            .base
            .vram
            .index_buffer
            .saturating_sub(buffer.byte_size());
    }

    /// Queue a vertex buffer for the next draw. Buffers are bound in the
    /// order they were queued.
    pub fn set_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        if self.base.vertex_buffers.contains_key(handle) {
            self.vertex_buffers.push(handle);
        }
    }

    pub fn set_index_buffer(&mut self, handle: Option<IndexBufferHandle>) {
        self.index_buffer = handle;
    }

    /// Drop the queued vertex buffers.
    pub fn clear_vertex_buffers(&mut self) {
        self.vertex_buffers.clear();
    }

    // ==================== Render targets ====================

    /// Register a render target. Its size comes from the color buffer, or
    /// the depth buffer when there is no color buffer. Framebuffers are
    /// created when the target is first rendered to.
    pub fn create_render_target(&mut self, desc: RenderTargetDescriptor) -> Result<RenderTargetHandle> {
        let source = desc
            .color_buffer
            .or(desc.depth_buffer)
            .ok_or_else(|| {
                RustKitError::invalid_argument(format!(
                    "render target '{}' needs a color or depth buffer",
                    desc.name
                ))
            })?;
        let texture = self
            .base
            .textures
            .get(source)
            .ok_or_not_found(format!("texture of render target '{}'", desc.name))?;
        let (width, height) = (texture.width(), texture.height());
        debug!(target = %desc.name, width, height, "Render target created");
        Ok(self
            .base
            .render_targets
            .insert(RenderTarget::new(desc, width, height)))
    }

    pub fn destroy_render_target(&mut self, handle: RenderTargetHandle) {
        let Some(mut target) = self.base.render_targets.remove(handle) else {
            return;
        };
        if self.base.get_render_target() == Some(handle) {
            self.base.set_render_target(None);
        }
        if self.context_state == ContextState::Active && target.initialized() {
            let owned = [target.imp.framebuffer, target.imp.msaa_framebuffer];
            if owned.contains(&self.active_framebuffer) {
                self.set_framebuffer(None);
            }
            target.imp.destroy(&mut self.gl);
        }
    }
}
