//! Engine-level enums and their WebGL translations.

use bitflags::bitflags;
use rustkit_webgl::constants as gl;
use serde::{Deserialize, Serialize};

// ==================== Blending ====================

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    SrcAlphaSaturate,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
}

impl BlendMode {
    pub fn to_gl(self) -> u32 {
        match self {
            BlendMode::Zero => gl::ZERO,
            BlendMode::One => gl::ONE,
            BlendMode::SrcColor => gl::SRC_COLOR,
            BlendMode::OneMinusSrcColor => gl::ONE_MINUS_SRC_COLOR,
            BlendMode::DstColor => gl::DST_COLOR,
            BlendMode::OneMinusDstColor => gl::ONE_MINUS_DST_COLOR,
            BlendMode::SrcAlpha => gl::SRC_ALPHA,
            BlendMode::SrcAlphaSaturate => gl::SRC_ALPHA_SATURATE,
            BlendMode::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
            BlendMode::DstAlpha => gl::DST_ALPHA,
            BlendMode::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
            BlendMode::ConstantColor => gl::CONSTANT_COLOR,
            BlendMode::OneMinusConstantColor => gl::ONE_MINUS_CONSTANT_COLOR,
        }
    }
}

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    pub fn to_gl(self) -> u32 {
        match self {
            BlendEquation::Add => gl::FUNC_ADD,
            BlendEquation::Subtract => gl::FUNC_SUBTRACT,
            BlendEquation::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
            BlendEquation::Min => gl::MIN,
            BlendEquation::Max => gl::MAX,
        }
    }
}

// ==================== Depth / Stencil ====================

/// Comparison used by depth, stencil and shadow-sampler tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunc {
    pub fn to_gl(self) -> u32 {
        match self {
            CompareFunc::Never => gl::NEVER,
            CompareFunc::Less => gl::LESS,
            CompareFunc::Equal => gl::EQUAL,
            CompareFunc::LessEqual => gl::LEQUAL,
            CompareFunc::Greater => gl::GREATER,
            CompareFunc::NotEqual => gl::NOTEQUAL,
            CompareFunc::GreaterEqual => gl::GEQUAL,
            CompareFunc::Always => gl::ALWAYS,
        }
    }
}

/// Stencil buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

impl StencilOp {
    pub fn to_gl(self) -> u32 {
        match self {
            StencilOp::Keep => gl::KEEP,
            StencilOp::Zero => gl::ZERO,
            StencilOp::Replace => gl::REPLACE,
            StencilOp::Increment => gl::INCR,
            StencilOp::IncrementWrap => gl::INCR_WRAP,
            StencilOp::Decrement => gl::DECR,
            StencilOp::DecrementWrap => gl::DECR_WRAP,
            StencilOp::Invert => gl::INVERT,
        }
    }
}

// ==================== Rasterizer ====================

/// Faces culled by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Back,
    Front,
    FrontAndBack,
}

impl CullMode {
    /// `cullFace` argument; `None` for a disabled cull test.
    pub fn to_gl(self) -> Option<u32> {
        match self {
            CullMode::None => None,
            CullMode::Back => Some(gl::BACK),
            CullMode::Front => Some(gl::FRONT),
            CullMode::FrontAndBack => Some(gl::FRONT_AND_BACK),
        }
    }
}

/// Winding of front-facing triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontFace {
    Ccw,
    Cw,
}

impl FrontFace {
    pub fn to_gl(self) -> u32 {
        match self {
            FrontFace::Ccw => gl::CCW,
            FrontFace::Cw => gl::CW,
        }
    }
}

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriStrip,
    TriFan,
}

impl PrimitiveType {
    pub const COUNT: usize = 7;

    pub fn to_gl(self) -> u32 {
        match self {
            PrimitiveType::Points => gl::POINTS,
            PrimitiveType::Lines => gl::LINES,
            PrimitiveType::LineLoop => gl::LINE_LOOP,
            PrimitiveType::LineStrip => gl::LINE_STRIP,
            PrimitiveType::Triangles => gl::TRIANGLES,
            PrimitiveType::TriStrip => gl::TRIANGLE_STRIP,
            PrimitiveType::TriFan => gl::TRIANGLE_FAN,
        }
    }

    /// Index into per-primitive counters.
    pub fn index(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Buffers affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl ClearFlags {
    /// `clear` bit mask.
    pub fn to_gl(self) -> u32 {
        let mut mask = 0;
        if self.contains(ClearFlags::COLOR) {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if self.contains(ClearFlags::DEPTH) {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        if self.contains(ClearFlags::STENCIL) {
            mask |= gl::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

// ==================== Vertex data ====================

/// Meaning of a vertex element. Each semantic maps to a fixed attribute
/// location so VAOs can be shared between shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantic {
    Position,
    Normal,
    BlendWeight,
    BlendIndices,
    Color,
    /// `TEXCOORD0` to `TEXCOORD7`.
    TexCoord(u8),
    Tangent,
    /// `ATTR0` to `ATTR15`, aliasing the locations above.
    Attr(u8),
}

impl Semantic {
    /// Fixed attribute location.
    pub fn location(self) -> u32 {
        match self {
            Semantic::Position => 0,
            Semantic::Normal => 1,
            Semantic::BlendWeight => 2,
            Semantic::BlendIndices => 3,
            Semantic::Color => 4,
            Semantic::TexCoord(i) => 5 + u32::from(i.min(7)),
            Semantic::Tangent => 13,
            Semantic::Attr(i) => u32::from(i.min(15)),
        }
    }

    /// Parse names such as `POSITION`, `TEXCOORD3` or `ATTR12`.
    pub fn from_name(name: &str) -> Option<Semantic> {
        let indexed = |prefix: &str, max: u8| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.parse::<u8>().ok())
                .filter(|&i| i <= max)
        };
        match name {
            "POSITION" => Some(Semantic::Position),
            "NORMAL" => Some(Semantic::Normal),
            "BLENDWEIGHT" => Some(Semantic::BlendWeight),
            "BLENDINDICES" => Some(Semantic::BlendIndices),
            "COLOR" => Some(Semantic::Color),
            "TANGENT" => Some(Semantic::Tangent),
            _ => indexed("TEXCOORD", 7)
                .map(Semantic::TexCoord)
                .or_else(|| indexed("ATTR", 15).map(Semantic::Attr)),
        }
    }
}

/// Component type of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
}

impl DataType {
    pub fn to_gl(self) -> u32 {
        match self {
            DataType::Int8 => gl::BYTE,
            DataType::Uint8 => gl::UNSIGNED_BYTE,
            DataType::Int16 => gl::SHORT,
            DataType::Uint16 => gl::UNSIGNED_SHORT,
            DataType::Int32 => gl::INT,
            DataType::Uint32 => gl::UNSIGNED_INT,
            DataType::Float32 => gl::FLOAT,
        }
    }

    /// Size of one component in bytes.
    pub fn size(self) -> u32 {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
        }
    }
}

/// Index element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    Uint8,
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub fn to_gl(self) -> u32 {
        match self {
            IndexFormat::Uint8 => gl::UNSIGNED_BYTE,
            IndexFormat::Uint16 => gl::UNSIGNED_SHORT,
            IndexFormat::Uint32 => gl::UNSIGNED_INT,
        }
    }

    pub fn bytes_per_index(self) -> u32 {
        match self {
            IndexFormat::Uint8 => 1,
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Expected update pattern of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
    /// Written by the GPU (transform feedback).
    GpuDynamic,
}

impl BufferUsage {
    pub fn to_gl(self, webgl2: bool) -> u32 {
        match self {
            BufferUsage::Static => gl::STATIC_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
            BufferUsage::Stream => gl::STREAM_DRAW,
            BufferUsage::GpuDynamic if webgl2 => gl::DYNAMIC_COPY,
            BufferUsage::GpuDynamic => gl::STATIC_DRAW,
        }
    }
}

// ==================== Textures ====================

/// Shape of a texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureDimension {
    #[default]
    D2,
    Cube,
    D3,
    D2Array,
}

impl TextureDimension {
    pub fn to_gl(self) -> u32 {
        match self {
            TextureDimension::D2 => gl::TEXTURE_2D,
            TextureDimension::Cube => gl::TEXTURE_CUBE_MAP,
            TextureDimension::D3 => gl::TEXTURE_3D,
            TextureDimension::D2Array => gl::TEXTURE_2D_ARRAY,
        }
    }

    /// Slot in a texture unit's binding table.
    pub fn slot(self) -> usize {
        match self {
            TextureDimension::D2 => 0,
            TextureDimension::Cube => 1,
            TextureDimension::D3 => 2,
            TextureDimension::D2Array => 3,
        }
    }

    /// Number of image faces per mip level.
    pub fn faces(self) -> usize {
        match self {
            TextureDimension::Cube => 6,
            _ => 1,
        }
    }
}

/// Texel format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Rgb8,
    Srgba8,
    Rgba16F,
    Rgba32F,
    R32F,
    Depth,
    DepthStencil,
}

/// Native `(internal_format, format, type)` triple for `texImage*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlFormat {
    pub internal_format: u32,
    pub format: u32,
    pub type_: u32,
}

impl PixelFormat {
    /// Bytes per texel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Srgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgba32F => 16,
            PixelFormat::R32F | PixelFormat::Depth | PixelFormat::DepthStencil => 4,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba16F | PixelFormat::Rgba32F | PixelFormat::R32F
        )
    }

    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth | PixelFormat::DepthStencil)
    }

    /// Native format for the given API level. WebGL1 uses unsized
    /// internal formats and extension types.
    pub fn to_gl(self, webgl2: bool) -> GlFormat {
        let f = |internal_format, format, type_| GlFormat {
            internal_format,
            format,
            type_,
        };
        match (self, webgl2) {
            (PixelFormat::Rgba8, true) => f(gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
            (PixelFormat::Rgba8, false) => f(gl::RGBA, gl::RGBA, gl::UNSIGNED_BYTE),
            (PixelFormat::Rgb8, true) => f(gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
            (PixelFormat::Rgb8, false) => f(gl::RGB, gl::RGB, gl::UNSIGNED_BYTE),
            (PixelFormat::Srgba8, true) => f(gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE),
            (PixelFormat::Srgba8, false) => {
                f(gl::SRGB_ALPHA_EXT, gl::SRGB_ALPHA_EXT, gl::UNSIGNED_BYTE)
            }
            (PixelFormat::Rgba16F, true) => f(gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
            (PixelFormat::Rgba16F, false) => f(gl::RGBA, gl::RGBA, gl::HALF_FLOAT_OES),
            (PixelFormat::Rgba32F, true) => f(gl::RGBA32F, gl::RGBA, gl::FLOAT),
            (PixelFormat::Rgba32F, false) => f(gl::RGBA, gl::RGBA, gl::FLOAT),
            (PixelFormat::R32F, true) => f(gl::R32F, gl::RED, gl::FLOAT),
            (PixelFormat::R32F, false) => f(gl::LUMINANCE, gl::LUMINANCE, gl::FLOAT),
            (PixelFormat::Depth, true) => {
                f(gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT)
            }
            (PixelFormat::Depth, false) => {
                f(gl::DEPTH_COMPONENT, gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT)
            }
            (PixelFormat::DepthStencil, true) => {
                f(gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8)
            }
            (PixelFormat::DepthStencil, false) => {
                f(gl::DEPTH_STENCIL, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8)
            }
        }
    }
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl FilterMode {
    pub fn to_gl(self) -> u32 {
        match self {
            FilterMode::Nearest => gl::NEAREST,
            FilterMode::Linear => gl::LINEAR,
            FilterMode::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            FilterMode::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            FilterMode::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            FilterMode::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }

    /// The same filter with mipmapping removed.
    pub fn without_mipmaps(self) -> FilterMode {
        match self {
            FilterMode::NearestMipmapNearest | FilterMode::NearestMipmapLinear => {
                FilterMode::Nearest
            }
            FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear => FilterMode::Linear,
            other => other,
        }
    }
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl AddressMode {
    pub fn to_gl(self) -> u32 {
        match self {
            AddressMode::Repeat => gl::REPEAT,
            AddressMode::ClampToEdge => gl::CLAMP_TO_EDGE,
            AddressMode::MirroredRepeat => gl::MIRRORED_REPEAT,
        }
    }
}

// ==================== Uniforms ====================

/// Engine-side type of a reflected uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    BVec2,
    BVec3,
    BVec4,
    Mat2,
    Mat3,
    Mat4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Texture2D,
    TextureCube,
    Texture2DShadow,
    TextureCubeShadow,
    Texture3D,
    Texture2DArray,
    Texture2DArrayShadow,
    ITexture2D,
    UTexture2D,
    FloatArray,
    Vec2Array,
    Vec3Array,
    Vec4Array,
    IntArray,
    Mat4Array,
}

impl UniformType {
    /// Map a reflected GL type.
    pub fn from_gl(type_: u32) -> Option<UniformType> {
        let t = match type_ {
            gl::BOOL => UniformType::Bool,
            gl::INT => UniformType::Int,
            gl::FLOAT => UniformType::Float,
            gl::FLOAT_VEC2 => UniformType::Vec2,
            gl::FLOAT_VEC3 => UniformType::Vec3,
            gl::FLOAT_VEC4 => UniformType::Vec4,
            gl::INT_VEC2 => UniformType::IVec2,
            gl::INT_VEC3 => UniformType::IVec3,
            gl::INT_VEC4 => UniformType::IVec4,
            gl::BOOL_VEC2 => UniformType::BVec2,
            gl::BOOL_VEC3 => UniformType::BVec3,
            gl::BOOL_VEC4 => UniformType::BVec4,
            gl::FLOAT_MAT2 => UniformType::Mat2,
            gl::FLOAT_MAT3 => UniformType::Mat3,
            gl::FLOAT_MAT4 => UniformType::Mat4,
            gl::UNSIGNED_INT => UniformType::UInt,
            gl::UNSIGNED_INT_VEC2 => UniformType::UVec2,
            gl::UNSIGNED_INT_VEC3 => UniformType::UVec3,
            gl::UNSIGNED_INT_VEC4 => UniformType::UVec4,
            gl::SAMPLER_2D => UniformType::Texture2D,
            gl::SAMPLER_CUBE => UniformType::TextureCube,
            gl::SAMPLER_2D_SHADOW => UniformType::Texture2DShadow,
            gl::SAMPLER_CUBE_SHADOW => UniformType::TextureCubeShadow,
            gl::SAMPLER_3D => UniformType::Texture3D,
            gl::SAMPLER_2D_ARRAY => UniformType::Texture2DArray,
            gl::SAMPLER_2D_ARRAY_SHADOW => UniformType::Texture2DArrayShadow,
            gl::INT_SAMPLER_2D => UniformType::ITexture2D,
            gl::UNSIGNED_INT_SAMPLER_2D => UniformType::UTexture2D,
            _ => return None,
        };
        Some(t)
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            UniformType::Texture2D
                | UniformType::TextureCube
                | UniformType::Texture2DShadow
                | UniformType::TextureCubeShadow
                | UniformType::Texture3D
                | UniformType::Texture2DArray
                | UniformType::Texture2DArrayShadow
                | UniformType::ITexture2D
                | UniformType::UTexture2D
        )
    }

    /// Array kind for uniforms reflected as `name[0]`.
    pub fn to_array(self) -> UniformType {
        match self {
            UniformType::Float => UniformType::FloatArray,
            UniformType::Vec2 => UniformType::Vec2Array,
            UniformType::Vec3 => UniformType::Vec3Array,
            UniformType::Vec4 => UniformType::Vec4Array,
            UniformType::Int => UniformType::IntArray,
            UniformType::Mat4 => UniformType::Mat4Array,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_locations() {
        assert_eq!(Semantic::Position.location(), 0);
        assert_eq!(Semantic::Color.location(), 4);
        assert_eq!(Semantic::TexCoord(0).location(), 5);
        assert_eq!(Semantic::TexCoord(7).location(), 12);
        assert_eq!(Semantic::Tangent.location(), 13);
        assert_eq!(Semantic::Attr(15).location(), 15);
    }

    #[test]
    fn test_semantic_names() {
        assert_eq!(Semantic::from_name("POSITION"), Some(Semantic::Position));
        assert_eq!(Semantic::from_name("TEXCOORD3"), Some(Semantic::TexCoord(3)));
        assert_eq!(Semantic::from_name("ATTR12"), Some(Semantic::Attr(12)));
        assert_eq!(Semantic::from_name("TEXCOORD8"), None);
        assert_eq!(Semantic::from_name("UV"), None);
    }

    #[test]
    fn test_clear_flags_mask() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert_eq!(flags.to_gl(), gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
        assert_eq!(ClearFlags::empty().to_gl(), 0);
    }

    #[test]
    fn test_uniform_type_promotion() {
        assert_eq!(UniformType::from_gl(gl::FLOAT_VEC4), Some(UniformType::Vec4));
        assert_eq!(UniformType::Vec4.to_array(), UniformType::Vec4Array);
        assert_eq!(UniformType::Mat3.to_array(), UniformType::Mat3);
        assert!(UniformType::from_gl(gl::SAMPLER_CUBE).is_some_and(UniformType::is_sampler));
        assert_eq!(UniformType::from_gl(0x1234), None);
    }

    #[test]
    fn test_filter_downgrade() {
        assert_eq!(
            FilterMode::LinearMipmapLinear.without_mipmaps(),
            FilterMode::Linear
        );
        assert_eq!(
            FilterMode::NearestMipmapLinear.without_mipmaps(),
            FilterMode::Nearest
        );
        assert_eq!(FilterMode::Linear.without_mipmaps(), FilterMode::Linear);
    }

    #[test]
    fn test_pixel_format_per_api_level() {
        assert_eq!(PixelFormat::Rgba8.to_gl(true).internal_format, gl::RGBA8);
        assert_eq!(PixelFormat::Rgba8.to_gl(false).internal_format, gl::RGBA);
        assert_eq!(PixelFormat::Rgba16F.to_gl(false).type_, gl::HALF_FLOAT_OES);
    }
}
