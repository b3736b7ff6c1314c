//! Layout of interleaved vertex data.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::constants::{DataType, Semantic};

/// Description of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub components: u32,
    pub data_type: DataType,
    #[serde(default)]
    pub normalize: bool,
    /// Read as integers in the shader (`vertexAttribIPointer`).
    #[serde(default)]
    pub as_int: bool,
}

impl VertexAttribute {
    pub fn new(semantic: Semantic, components: u32, data_type: DataType) -> Self {
        Self {
            semantic,
            components,
            data_type,
            normalize: false,
            as_int: false,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

/// A laid-out vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    pub semantic: Semantic,
    pub components: u32,
    pub data_type: DataType,
    pub normalize: bool,
    pub as_int: bool,
    pub offset: u32,
    pub stride: u32,
    pub size: u32,
}

/// Interleaved vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    size: u32,
    instancing: bool,
    rendering_hash: u64,
}

impl VertexFormat {
    /// Lay out attributes interleaved, each aligned to four bytes.
    pub fn new(attributes: &[VertexAttribute]) -> Self {
        let mut offset = 0;
        let mut elements = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let size = attr.components * attr.data_type.size();
            elements.push(VertexElement {
                semantic: attr.semantic,
                components: attr.components,
                data_type: attr.data_type,
                normalize: attr.normalize,
                as_int: attr.as_int,
                offset,
                stride: 0,
                size,
            });
            offset += size.next_multiple_of(4);
        }
        for element in &mut elements {
            element.stride = offset;
        }

        let mut format = Self {
            elements,
            size: offset,
            instancing: false,
            rendering_hash: 0,
        };
        format.update_hash();
        format
    }

    /// Mark the format as per-instance data.
    pub fn with_instancing(mut self, instancing: bool) -> Self {
        self.instancing = instancing;
        self.update_hash();
        self
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Bytes per vertex.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn instancing(&self) -> bool {
        self.instancing
    }

    /// Hash of everything that affects attribute setup.
    pub fn rendering_hash(&self) -> u64 {
        self.rendering_hash
    }

    fn update_hash(&mut self) {
        let mut hasher = FxHasher::default();
        self.elements.hash(&mut hasher);
        self.instancing.hash(&mut hasher);
        self.rendering_hash = hasher.finish();
    }
}
