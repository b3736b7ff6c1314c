//! Vertex array objects and attribute setup.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use rustkit_webgl::{constants as gl_const, WebGLVertexArrayObject};
use tracing::{trace, warn};

use super::{ContextState, VertexArrayOps, WebglGraphicsDevice};

impl WebglGraphicsDevice {
    pub(crate) fn unbind_vertex_array(&mut self) {
        if self.bound_vao.is_some() {
            if let Some(ops) = self.vertex_arrays {
                (ops.bind)(&mut self.gl, None);
            }
            self.bound_vao = None;
        }
    }

    /// Cache key of the queued vertex buffers: their ids and layouts.
    fn vertex_array_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for &handle in &self.vertex_buffers {
            if let Some(buffer) = self.base.vertex_buffers.get(handle) {
                hasher.write_u32(buffer.id());
                hasher.write_u64(buffer.format().rendering_hash());
            }
        }
        hasher.finish()
    }

    /// Upload queued buffers that have no native object in this context.
    fn upload_pending_buffers(&mut self) {
        for index in 0..self.vertex_buffers.len() {
            let handle = self.vertex_buffers[index];
            let uploaded = self
                .base
                .vertex_buffers
                .get(handle)
                .is_some_and(|buffer| buffer.imp.buffer.initialized());
            if !uploaded {
                self.unlock_vertex_buffer(handle);
            }
        }
        if let Some(handle) = self.index_buffer {
            let uploaded = self
                .base
                .index_buffers
                .get(handle)
                .is_some_and(|buffer| buffer.imp.buffer.initialized());
            if !uploaded {
                self.unlock_index_buffer(handle);
            }
        }
    }

    /// Point every element of the queued buffers at its semantic location.
    /// Returns the masks of used and per-instance locations.
    fn attribute_pointers(&mut self) -> (u32, u32) {
        let mut used = 0u32;
        let mut instanced = 0u32;
        for &handle in &self.vertex_buffers {
            let Some(buffer) = self.base.vertex_buffers.get(handle) else {
                continue;
            };
            self.gl
                .bind_buffer(gl_const::ARRAY_BUFFER, buffer.imp.buffer.handle());
            let format = buffer.format();
            for element in format.elements() {
                let location = element.semantic.location();
                // vertexAttribIPointer is not exposed; integer attributes
                // go through the float path.
                self.gl.vertex_attrib_pointer(
                    location,
                    element.components as i32,
                    element.data_type.to_gl(),
                    element.normalize,
                    element.stride as i32,
                    element.offset as i32,
                );
                used |= 1 << location;
                if format.instancing() {
                    instanced |= 1 << location;
                }
            }
        }
        (used, instanced)
    }

    fn create_vertex_array(&mut self, ops: VertexArrayOps) -> Option<WebGLVertexArrayObject> {
        let key = (self.vertex_buffers.len() > 1).then(|| self.vertex_array_key());
        if let Some(&vao) = key.and_then(|key| self.vao_cache.get(&key)) {
            return Some(vao);
        }

        let vao = (ops.create)(&mut self.gl)?;
        (ops.bind)(&mut self.gl, Some(vao));
        self.gl.bind_buffer(gl_const::ELEMENT_ARRAY_BUFFER, None);

        let (used, instanced) = self.attribute_pointers();
        for location in (0..32).filter(|location| used & (1 << location) != 0) {
            self.gl.enable_vertex_attrib_array(location);
            if instanced & (1 << location) != 0 {
                if let Some(instancing) = self.instancing {
                    (instancing.vertex_attrib_divisor)(&mut self.gl, location, 1);
                }
            }
        }

        (ops.bind)(&mut self.gl, None);
        self.bound_vao = None;
        self.gl.bind_buffer(gl_const::ARRAY_BUFFER, None);

        if used & 1 == 0 {
            warn!("No vertex attribute is mapped to location 0; some drivers draw nothing");
        }
        trace!(
            buffers = self.vertex_buffers.len(),
            cached = key.is_some(),
            "Vertex array created"
        );
        if let Some(key) = key {
            self.vao_cache.insert(key, vao);
        }
        Some(vao)
    }

    /// Attribute setup on the default vertex array, for contexts without
    /// vertex array objects.
    fn bind_attributes(&mut self) {
        let (used, instanced) = self.attribute_pointers();
        for location in 0..32 {
            let bit = 1u32 << location;
            let wanted = used & bit != 0;
            if wanted != (self.enabled_attributes & bit != 0) {
                if wanted {
                    self.gl.enable_vertex_attrib_array(location);
                } else {
                    self.gl.disable_vertex_attrib_array(location);
                }
            }
            let per_instance = instanced & bit != 0;
            if per_instance != (self.instanced_attributes & bit != 0) {
                if let Some(instancing) = self.instancing {
                    (instancing.vertex_attrib_divisor)(&mut self.gl, location, per_instance as u32);
                }
            }
        }
        self.enabled_attributes = used;
        self.instanced_attributes = instanced;
        self.gl.bind_buffer(gl_const::ARRAY_BUFFER, None);
    }

    /// Bind the queued vertex buffers and the index buffer for a draw, then
    /// clear the queue. A single buffer keeps its vertex array on the
    /// buffer; combinations are shared through the vertex array cache.
    pub(crate) fn set_buffers(&mut self) {
        if self.context_state != ContextState::Active {
            return;
        }
        self.upload_pending_buffers();

        if !self.vertex_buffers.is_empty() {
            match self.vertex_arrays {
                Some(ops) => {
                    let vao = if self.vertex_buffers.len() == 1 {
                        let handle = self.vertex_buffers[0];
                        match self.base.vertex_buffers.get(handle).and_then(|vb| vb.imp.vao) {
                            Some(vao) => Some(vao),
                            None => {
                                let vao = self.create_vertex_array(ops);
                                if let Some(buffer) = self.base.vertex_buffers.get_mut(handle) {
                                    buffer.imp.vao = vao;
                                }
                                vao
                            }
                        }
                    } else {
                        self.create_vertex_array(ops)
                    };
                    if self.bound_vao != vao {
                        (ops.bind)(&mut self.gl, vao);
                        self.bound_vao = vao;
                    }
                }
                None => self.bind_attributes(),
            }
        }
        self.vertex_buffers.clear();

        let elements = self
            .index_buffer
            .and_then(|handle| self.base.index_buffers.get(handle))
            .and_then(|buffer| buffer.imp.buffer.handle());
        self.gl.bind_buffer(gl_const::ELEMENT_ARRAY_BUFFER, elements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BufferUsage, DataType, Semantic};
    use crate::test_support::{position_format, webgl2_device};
    use crate::vertex_format::{VertexAttribute, VertexFormat};

    #[test]
    fn test_single_buffer_vertex_array_lives_on_buffer() {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        device.gl_mut().reset_call_counts();

        device.set_vertex_buffer(vb);
        device.set_buffers();
        let vao = device.vertex_buffer(vb).unwrap().imp.vao;
        assert!(vao.is_some());
        assert_eq!(device.gl().bound_vertex_array(), vao);
        assert_eq!(device.vao_cache_len(), 0);

        device.set_vertex_buffer(vb);
        device.set_buffers();
        assert_eq!(device.gl().call_count("createVertexArray"), 1);
        assert_eq!(device.gl().call_count("bindVertexArray"), 3);
    }

    #[test]
    fn test_multi_buffer_vertex_arrays_are_cached() {
        let mut device = webgl2_device();
        let colors = VertexFormat::new(&[VertexAttribute::new(Semantic::Color, 4, DataType::Uint8)]);
        let a = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        let b = device.create_vertex_buffer(colors, 3, BufferUsage::Static, Some(&[0; 12]));

        for _ in 0..3 {
            device.set_vertex_buffer(a);
            device.set_vertex_buffer(b);
            device.set_buffers();
        }
        assert_eq!(device.vao_cache_len(), 1);
        assert_eq!(device.gl().call_count("createVertexArray"), 1);

        device.set_vertex_buffer(b);
        device.set_vertex_buffer(a);
        device.set_buffers();
        assert_eq!(device.vao_cache_len(), 2);
    }

    #[test]
    fn test_buffers_without_data_upload_before_binding() {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Dynamic, None);
        assert!(!device.vertex_buffer(vb).unwrap().imp.buffer.initialized());

        device.set_vertex_buffer(vb);
        device.set_buffers();
        assert!(device.vertex_buffer(vb).unwrap().imp.buffer.initialized());
        assert_eq!(device.gl_mut().get_error(), gl_const::NO_ERROR);
    }

    #[test]
    fn test_unbind_vertex_array_is_elided() {
        let mut device = webgl2_device();
        device.unbind_vertex_array();
        assert_eq!(device.gl().call_count("bindVertexArray"), 0);
    }

    #[test]
    fn test_instanced_format_sets_divisor() {
        let mut device = webgl2_device();
        let format = VertexFormat::new(&[VertexAttribute::new(Semantic::Attr(12), 4, DataType::Float32)])
            .with_instancing(true);
        let vb = device.create_vertex_buffer(format, 1, BufferUsage::Static, Some(&[0; 16]));
        device.gl_mut().reset_call_counts();
        device.set_vertex_buffer(vb);
        device.set_buffers();
        assert_eq!(device.gl().call_count("vertexAttribDivisor"), 1);
    }
}
