//! Vertex and index buffers.
//!
//! Buffers keep their CPU-side storage so the device can re-upload them
//! after a context loss.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::constants::{BufferUsage, IndexFormat};
use crate::vertex_format::VertexFormat;
use crate::webgl::buffer::{WebglIndexBuffer, WebglVertexBuffer};

static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

fn sized_storage(len: usize, data: Option<&[u8]>) -> Vec<u8> {
    let mut storage = vec![0; len];
    if let Some(data) = data {
        let n = data.len().min(len);
        storage[..n].copy_from_slice(&data[..n]);
    }
    storage
}

/// Vertex data in a [`VertexFormat`].
#[derive(Debug)]
pub struct VertexBuffer {
    id: u32,
    format: VertexFormat,
    num_vertices: u32,
    usage: BufferUsage,
    pub(crate) storage: Vec<u8>,
    pub(crate) imp: WebglVertexBuffer,
}

impl VertexBuffer {
    pub(crate) fn new(
        format: VertexFormat,
        num_vertices: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Self {
        let len = format.size() as usize * num_vertices as usize;
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            format,
            num_vertices,
            usage,
            storage: sized_storage(len, data),
            imp: WebglVertexBuffer::default(),
        }
    }

    /// Process-unique id, stable across context loss.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    pub fn byte_size(&self) -> usize {
        self.storage.len()
    }

    pub fn backend(&self) -> &WebglVertexBuffer {
        &self.imp
    }

    /// Overwrite the start of the storage. Excess bytes are ignored.
    pub(crate) fn write(&mut self, data: &[u8]) {
        let n = data.len().min(self.storage.len());
        self.storage[..n].copy_from_slice(&data[..n]);
    }
}

/// Index data.
#[derive(Debug)]
pub struct IndexBuffer {
    id: u32,
    format: IndexFormat,
    num_indices: u32,
    usage: BufferUsage,
    pub(crate) storage: Vec<u8>,
    pub(crate) imp: WebglIndexBuffer,
}

impl IndexBuffer {
    pub(crate) fn new(
        format: IndexFormat,
        num_indices: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Self {
        let len = format.bytes_per_index() as usize * num_indices as usize;
        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            format,
            num_indices,
            usage,
            storage: sized_storage(len, data),
            imp: WebglIndexBuffer::new(format.to_gl()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }

    pub fn bytes_per_index(&self) -> u32 {
        self.format.bytes_per_index()
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    pub fn byte_size(&self) -> usize {
        self.storage.len()
    }

    pub fn backend(&self) -> &WebglIndexBuffer {
        &self.imp
    }

    pub(crate) fn write(&mut self, data: &[u8]) {
        let n = data.len().min(self.storage.len());
        self.storage[..n].copy_from_slice(&data[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DataType, Semantic};
    use crate::vertex_format::VertexAttribute;

    #[test]
    fn test_vertex_buffer_storage() {
        let format = VertexFormat::new(&[VertexAttribute::new(
            Semantic::Position,
            2,
            DataType::Float32,
        )]);
        let verts: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let vb = VertexBuffer::new(
            format,
            3,
            BufferUsage::Static,
            Some(bytemuck::cast_slice(&verts)),
        );
        assert_eq!(vb.byte_size(), 24);
        assert_eq!(vb.storage(), bytemuck::cast_slice::<f32, u8>(&verts));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = IndexBuffer::new(IndexFormat::Uint16, 3, BufferUsage::Static, None);
        let b = IndexBuffer::new(IndexFormat::Uint16, 3, BufferUsage::Static, None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.byte_size(), 6);
    }

    #[test]
    fn test_write_truncates() {
        let mut ib = IndexBuffer::new(IndexFormat::Uint8, 2, BufferUsage::Dynamic, None);
        ib.write(&[1, 2, 3]);
        assert_eq!(ib.storage(), &[1, 2]);
    }
}
