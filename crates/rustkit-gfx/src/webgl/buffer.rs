//! Native buffer objects.

use rustkit_webgl::{WebGLBuffer, WebGLRenderingContext, WebGLVertexArrayObject};
use tracing::trace;

/// A GL buffer created lazily on first unlock.
#[derive(Debug, Default)]
pub struct WebglBuffer {
    handle: Option<WebGLBuffer>,
    generation: u64,
}

impl WebglBuffer {
    pub fn handle(&self) -> Option<WebGLBuffer> {
        self.handle
    }

    pub fn initialized(&self) -> bool {
        self.handle.is_some()
    }

    /// Push `storage` to the GPU. The first unlock (or the first after a
    /// context loss) allocates with `bufferData`; later ones overwrite the
    /// contents with `bufferSubData`.
    pub(crate) fn unlock(
        &mut self,
        gl: &mut WebGLRenderingContext,
        generation: u64,
        target: u32,
        usage: u32,
        storage: &[u8],
    ) {
        if self.generation != generation {
            self.handle = None;
        }
        match self.handle {
            Some(handle) => {
                gl.bind_buffer(target, Some(handle));
                gl.buffer_sub_data(target, 0, storage);
            }
            None => {
                let Some(handle) = gl.create_buffer() else {
                    return;
                };
                trace!(buffer = handle.id(), bytes = storage.len(), "Buffer allocated");
                gl.bind_buffer(target, Some(handle));
                gl.buffer_data(target, storage, usage);
                self.handle = Some(handle);
                self.generation = generation;
            }
        }
    }

    pub(crate) fn destroy(&mut self, gl: &mut WebGLRenderingContext) {
        if let Some(handle) = self.handle.take() {
            gl.delete_buffer(handle);
        }
    }

    pub(crate) fn lose_context(&mut self) {
        self.handle = None;
    }
}

/// Vertex buffer backend: the buffer plus the VAO used when it is drawn on
/// its own.
#[derive(Debug, Default)]
pub struct WebglVertexBuffer {
    pub(crate) buffer: WebglBuffer,
    pub(crate) vao: Option<WebGLVertexArrayObject>,
}

impl WebglVertexBuffer {
    pub fn buffer(&self) -> &WebglBuffer {
        &self.buffer
    }

    /// Vertex array used when the buffer is drawn alone.
    pub fn vertex_array(&self) -> Option<WebGLVertexArrayObject> {
        self.vao
    }

    pub(crate) fn lose_context(&mut self) {
        self.buffer.lose_context();
        self.vao = None;
    }
}

/// Index buffer backend.
#[derive(Debug)]
pub struct WebglIndexBuffer {
    pub(crate) buffer: WebglBuffer,
    pub(crate) gl_format: u32,
}

impl WebglIndexBuffer {
    pub(crate) fn new(gl_format: u32) -> Self {
        Self {
            buffer: WebglBuffer::default(),
            gl_format,
        }
    }

    pub fn buffer(&self) -> &WebglBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_webgl::constants;

    #[test]
    fn test_first_unlock_allocates() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut buffer = WebglBuffer::default();
        assert!(!buffer.initialized());

        buffer.unlock(&mut gl, 0, constants::ARRAY_BUFFER, constants::STATIC_DRAW, &[1, 2, 3, 4]);
        assert!(buffer.initialized());
        assert_eq!(gl.call_count("bufferData"), 1);

        buffer.unlock(&mut gl, 0, constants::ARRAY_BUFFER, constants::STATIC_DRAW, &[5, 6, 7, 8]);
        assert_eq!(gl.call_count("bufferData"), 1);
        assert_eq!(gl.call_count("bufferSubData"), 1);
        let data = gl.get_buffer_data(buffer.handle().unwrap()).unwrap();
        assert_eq!(data.data, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_stale_generation_reallocates() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut buffer = WebglBuffer::default();
        buffer.unlock(&mut gl, 0, constants::ARRAY_BUFFER, constants::STATIC_DRAW, &[0; 4]);
        let first = buffer.handle();

        buffer.unlock(&mut gl, 1, constants::ARRAY_BUFFER, constants::STATIC_DRAW, &[0; 4]);
        assert_ne!(buffer.handle(), first);
        assert_eq!(gl.call_count("bufferData"), 2);
    }

    #[test]
    fn test_lose_context_drops_handle_without_gl_calls() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut vb = WebglVertexBuffer::default();
        vb.buffer
            .unlock(&mut gl, 0, constants::ARRAY_BUFFER, constants::STATIC_DRAW, &[0; 4]);
        gl.reset_call_counts();

        vb.lose_context();
        assert!(!vb.buffer.initialized());
        assert!(vb.vao.is_none());
        assert_eq!(gl.total_calls(), 0);
    }
}
