use crate::constants::PrimitiveType;

/// A draw range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub type_: PrimitiveType,
    /// First vertex, or first index when `indexed`.
    pub base: u32,
    pub count: u32,
    pub indexed: bool,
}

impl Primitive {
    pub fn triangles(count: u32) -> Self {
        Self {
            type_: PrimitiveType::Triangles,
            base: 0,
            count,
            indexed: false,
        }
    }

    pub fn indexed_triangles(count: u32) -> Self {
        Self {
            indexed: true,
            ..Self::triangles(count)
        }
    }
}
