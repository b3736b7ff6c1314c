//! Binding between a reflected shader uniform and a [`ScopeId`].
//!
//! [`ScopeId`]: crate::ScopeId

use rustkit_common::{Result, RustKitError};
use rustkit_webgl::WebGLUniformLocation;

use crate::constants::UniformType;
use crate::handles::ScopeHandle;
use crate::scope::ScopeSpace;
use crate::version::Version;

/// Last value uploaded through a location, used to skip redundant
/// vector and scalar uploads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Committed {
    Nothing,
    Floats([f32; 4]),
    Ints([i32; 4]),
}

/// A reflected uniform or sampler of a linked program.
#[derive(Debug, Clone)]
pub struct ShaderInput {
    pub name: String,
    pub scope: ScopeHandle,
    pub data_type: UniformType,
    pub location: WebGLUniformLocation,
    /// Snapshot of the scope version last committed through this input.
    pub version: Version,
    /// Texture unit last assigned to a single sampler.
    pub slot: Option<i32>,
    /// Texture units last assigned to a sampler array.
    pub array: Vec<i32>,
    pub(crate) committed: Committed,
}

impl ShaderInput {
    /// Create an input for a reflected uniform. The scope is resolved by
    /// the reflected name, so array uniforms are fed through `name[0]`.
    pub fn new(
        scope: &mut ScopeSpace,
        name: &str,
        gl_type: u32,
        location: WebGLUniformLocation,
    ) -> Result<Self> {
        let mut data_type = UniformType::from_gl(gl_type).ok_or_else(|| {
            RustKitError::shader(format!(
                "uniform '{name}' has unsupported type 0x{gl_type:04X}"
            ))
        })?;
        if name.ends_with("[0]") {
            data_type = data_type.to_array();
        }

        Ok(Self {
            name: name.to_string(),
            scope: scope.resolve(name),
            data_type,
            location,
            version: Version::default(),
            slot: None,
            array: Vec::new(),
            committed: Committed::Nothing,
        })
    }

    pub fn is_sampler(&self) -> bool {
        self.data_type.is_sampler()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_webgl::{constants, WebGLRenderingContext};

    // Any live object id serves as an opaque location here.
    fn location() -> WebGLUniformLocation {
        WebGLRenderingContext::new(1, 1).create_buffer().unwrap()
    }

    #[test]
    fn test_input_resolves_scope() {
        let mut space = ScopeSpace::new("device");
        let input = ShaderInput::new(&mut space, "light_color", constants::FLOAT_VEC3, location())
            .unwrap();
        assert_eq!(input.data_type, UniformType::Vec3);
        assert_eq!(space.find("light_color"), Some(input.scope));
        assert_eq!(input.version, Version::default());
    }

    #[test]
    fn test_array_promotion() {
        let mut space = ScopeSpace::new("device");
        let cases = [
            (constants::FLOAT, UniformType::FloatArray),
            (constants::FLOAT_VEC2, UniformType::Vec2Array),
            (constants::FLOAT_VEC3, UniformType::Vec3Array),
            (constants::FLOAT_VEC4, UniformType::Vec4Array),
            (constants::INT, UniformType::IntArray),
            (constants::FLOAT_MAT4, UniformType::Mat4Array),
            (constants::FLOAT_MAT3, UniformType::Mat3),
        ];
        for (gl_type, expected) in cases {
            let input = ShaderInput::new(&mut space, "values[0]", gl_type, location()).unwrap();
            assert_eq!(input.data_type, expected);
        }
        assert!(space.find("values[0]").is_some());
    }

    #[test]
    fn test_sampler_input() {
        let mut space = ScopeSpace::new("device");
        let input =
            ShaderInput::new(&mut space, "texture_diffuse", constants::SAMPLER_2D, location())
                .unwrap();
        assert!(input.is_sampler());
        assert_eq!(input.slot, None);
    }

    #[test]
    fn test_unsupported_type_is_an_error() {
        let mut space = ScopeSpace::new("device");
        let err = ShaderInput::new(&mut space, "weird", 0xDEAD, location()).unwrap_err();
        assert_eq!(err.category(), "shader");
    }
}
