//! Uniform upload with redundant-commit elision.
//!
//! Scalars and vectors remember the last value sent through their location
//! and skip the GL call when it repeats. Matrices and arrays are always
//! uploaded.

use rustkit_common::{Result, RustKitError};
use rustkit_webgl::WebGLRenderingContext;

use crate::constants::UniformType;
use crate::scope::ScopeValue;
use crate::shader_input::{Committed, ShaderInput};

fn mismatch(input: &ShaderInput, value: &ScopeValue) -> RustKitError {
    RustKitError::invalid_argument(format!(
        "value {value:?} does not fit uniform '{}' of type {:?}",
        input.name, input.data_type
    ))
}

fn floats<'a>(input: &ShaderInput, value: &'a ScopeValue, len: usize) -> Result<&'a [f32]> {
    match value {
        ScopeValue::FloatArray(v) if v.len() >= len => Ok(&v[..len]),
        _ => Err(mismatch(input, value)),
    }
}

fn ints<'a>(input: &ShaderInput, value: &'a ScopeValue, len: usize) -> Result<&'a [i32]> {
    match value {
        ScopeValue::IntArray(v) if v.len() >= len => Ok(&v[..len]),
        _ => Err(mismatch(input, value)),
    }
}

/// Whole array payload, at least one element of `stride` components.
fn float_array<'a>(input: &ShaderInput, value: &'a ScopeValue, stride: usize) -> Result<&'a [f32]> {
    match value {
        ScopeValue::FloatArray(v) if v.len() >= stride => Ok(&v[..v.len() - v.len() % stride]),
        _ => Err(mismatch(input, value)),
    }
}

fn scalar_int(value: &ScopeValue) -> Option<i32> {
    match value {
        ScopeValue::Int(v) => Some(*v),
        ScopeValue::Bool(b) => Some(*b as i32),
        ScopeValue::Float(f) => Some(*f as i32),
        _ => None,
    }
}

/// Pack a float vector into a comparison key.
fn pack_floats(v: &[f32]) -> Committed {
    let mut key = [0.0; 4];
    key[..v.len()].copy_from_slice(v);
    Committed::Floats(key)
}

fn pack_ints(v: &[i32]) -> Committed {
    let mut key = [0; 4];
    key[..v.len()].copy_from_slice(v);
    Committed::Ints(key)
}

/// Upload `value` through `input` unless it repeats the last commit.
/// Returns whether a GL call was made.
pub fn commit(
    gl: &mut WebGLRenderingContext,
    input: &mut ShaderInput,
    value: &ScopeValue,
) -> Result<bool> {
    let location = input.location;

    let key = match input.data_type {
        UniformType::Float => {
            let v = match value {
                ScopeValue::Float(f) => *f,
                ScopeValue::Int(i) => *i as f32,
                ScopeValue::FloatArray(v) if !v.is_empty() => v[0],
                _ => return Err(mismatch(input, value)),
            };
            pack_floats(&[v])
        }
        UniformType::Vec2 => pack_floats(floats(input, value, 2)?),
        UniformType::Vec3 => pack_floats(floats(input, value, 3)?),
        UniformType::Vec4 => pack_floats(floats(input, value, 4)?),
        UniformType::Int | UniformType::Bool | UniformType::UInt => {
            let v = scalar_int(value).ok_or_else(|| mismatch(input, value))?;
            pack_ints(&[v])
        }
        UniformType::IVec2 | UniformType::BVec2 | UniformType::UVec2 => {
            pack_ints(ints(input, value, 2)?)
        }
        UniformType::IVec3 | UniformType::BVec3 | UniformType::UVec3 => {
            pack_ints(ints(input, value, 3)?)
        }
        UniformType::IVec4 | UniformType::BVec4 | UniformType::UVec4 => {
            pack_ints(ints(input, value, 4)?)
        }
        _ => Committed::Nothing,
    };

    if key != Committed::Nothing {
        if key == input.committed {
            return Ok(false);
        }
        input.committed = key;
        match (input.data_type, key) {
            (UniformType::Float, Committed::Floats(v)) => gl.uniform1f(location, v[0]),
            (UniformType::Vec2, Committed::Floats(v)) => gl.uniform2fv(location, &v[..2]),
            (UniformType::Vec3, Committed::Floats(v)) => gl.uniform3fv(location, &v[..3]),
            (UniformType::Vec4, Committed::Floats(v)) => gl.uniform4fv(location, &v),
            (UniformType::UInt, Committed::Ints(v)) => gl.uniform1ui(location, v[0] as u32),
            (UniformType::UVec2, Committed::Ints(v)) => gl.uniform2uiv(location, &as_uints(&v[..2])),
            (UniformType::UVec3, Committed::Ints(v)) => gl.uniform3uiv(location, &as_uints(&v[..3])),
            (UniformType::UVec4, Committed::Ints(v)) => gl.uniform4uiv(location, &as_uints(&v)),
            (UniformType::IVec2 | UniformType::BVec2, Committed::Ints(v)) => {
                gl.uniform2iv(location, &v[..2])
            }
            (UniformType::IVec3 | UniformType::BVec3, Committed::Ints(v)) => {
                gl.uniform3iv(location, &v[..3])
            }
            (UniformType::IVec4 | UniformType::BVec4, Committed::Ints(v)) => {
                gl.uniform4iv(location, &v)
            }
            (_, Committed::Ints(v)) => gl.uniform1i(location, v[0]),
            _ => return Err(mismatch(input, value)),
        }
        return Ok(true);
    }

    match input.data_type {
        UniformType::Mat2 => gl.uniform_matrix2fv(location, false, floats(input, value, 4)?),
        UniformType::Mat3 => gl.uniform_matrix3fv(location, false, floats(input, value, 9)?),
        UniformType::Mat4 => gl.uniform_matrix4fv(location, false, floats(input, value, 16)?),
        UniformType::Mat4Array => {
            gl.uniform_matrix4fv(location, false, float_array(input, value, 16)?)
        }
        UniformType::FloatArray => gl.uniform1fv(location, float_array(input, value, 1)?),
        UniformType::Vec2Array => gl.uniform2fv(location, float_array(input, value, 2)?),
        UniformType::Vec3Array => gl.uniform3fv(location, float_array(input, value, 3)?),
        UniformType::Vec4Array => gl.uniform4fv(location, float_array(input, value, 4)?),
        UniformType::IntArray => match value {
            ScopeValue::IntArray(v) if !v.is_empty() => gl.uniform1iv(location, v),
            _ => return Err(mismatch(input, value)),
        },
        _ => return Err(mismatch(input, value)),
    }
    Ok(true)
}

fn as_uints(v: &[i32]) -> Vec<u32> {
    v.iter().map(|&i| i as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeSpace;
    use rustkit_webgl::constants as gl_const;

    fn input(gl: &mut WebGLRenderingContext, scope: &mut ScopeSpace, type_: u32) -> ShaderInput {
        let location = gl.create_buffer().unwrap();
        ShaderInput::new(scope, "u_test", type_, location).unwrap()
    }

    #[test]
    fn test_vector_commit_is_elided() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let mut input = input(&mut gl, &mut scope, gl_const::FLOAT_VEC4);
        let value = ScopeValue::from([1.0, 0.5, 0.25, 1.0]);

        assert!(commit(&mut gl, &mut input, &value).unwrap());
        assert!(!commit(&mut gl, &mut input, &value).unwrap());
        assert_eq!(gl.call_count("uniform4fv"), 1);

        let changed = ScopeValue::from([1.0, 0.5, 0.25, 0.0]);
        assert!(commit(&mut gl, &mut input, &changed).unwrap());
        assert_eq!(gl.call_count("uniform4fv"), 2);
    }

    #[test]
    fn test_scalar_float_commit() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let mut input = input(&mut gl, &mut scope, gl_const::FLOAT);

        assert!(commit(&mut gl, &mut input, &ScopeValue::Float(2.0)).unwrap());
        assert!(!commit(&mut gl, &mut input, &ScopeValue::Float(2.0)).unwrap());
        assert_eq!(gl.call_count("uniform1f"), 1);
    }

    #[test]
    fn test_matrix_always_uploads() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let mut input = input(&mut gl, &mut scope, gl_const::FLOAT_MAT4);
        let identity = ScopeValue::from([
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);

        assert!(commit(&mut gl, &mut input, &identity).unwrap());
        assert!(commit(&mut gl, &mut input, &identity).unwrap());
        assert_eq!(gl.call_count("uniformMatrix4fv"), 2);
    }

    #[test]
    fn test_array_uploads_whole_payload() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let location = gl.create_buffer().unwrap();
        let mut input = ShaderInput::new(&mut scope, "u_weights[0]", gl_const::FLOAT, location).unwrap();
        assert_eq!(input.data_type, UniformType::FloatArray);
        let weights = ScopeValue::from(vec![0.25, 0.5, 0.25]);
        assert!(commit(&mut gl, &mut input, &weights).unwrap());
        assert!(commit(&mut gl, &mut input, &weights).unwrap());
        assert_eq!(gl.call_count("uniform1fv"), 2);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let mut input = input(&mut gl, &mut scope, gl_const::FLOAT_VEC3);
        let err = commit(&mut gl, &mut input, &ScopeValue::from([1.0, 2.0])).unwrap_err();
        assert!(matches!(err, RustKitError::InvalidArgument(_)));
        assert_eq!(gl.total_calls(), 1);
    }

    #[test]
    fn test_bool_commits_as_int() {
        let mut gl = WebGLRenderingContext::new(1, 1);
        let mut scope = ScopeSpace::new("test");
        let mut input = input(&mut gl, &mut scope, gl_const::BOOL);
        assert!(commit(&mut gl, &mut input, &ScopeValue::Bool(true)).unwrap());
        assert!(!commit(&mut gl, &mut input, &ScopeValue::Int(1)).unwrap());
        assert_eq!(gl.call_count("uniform1i"), 1);
    }
}
