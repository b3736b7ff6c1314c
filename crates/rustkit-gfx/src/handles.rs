//! Stable handles into the device's resource registries.

use slotmap::new_key_type;

new_key_type! {
    /// A compiled shader program.
    pub struct ShaderHandle;
    /// A texture.
    pub struct TextureHandle;
    /// A vertex buffer.
    pub struct VertexBufferHandle;
    /// An index buffer.
    pub struct IndexBufferHandle;
    /// An offscreen render target.
    pub struct RenderTargetHandle;
    /// A named uniform slot in a [`ScopeSpace`](crate::ScopeSpace).
    pub struct ScopeHandle;
}
