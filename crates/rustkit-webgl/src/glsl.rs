//! GLSL declaration scanning.
//!
//! The software context never executes shaders. It reads just enough of the
//! source to produce the compile diagnostics a driver would and to answer the
//! reflection queries (`getActiveAttrib`, `getActiveUniform`) after linking.
//! A declared name counts as active when the source references it beyond its
//! declaration.

use std::collections::{HashMap, HashSet};

use crate::canvas::ContextVersion;
use crate::constants;

/// Storage qualifier of a global declaration, normalised per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageQualifier {
    Uniform,
    /// `attribute`, or `in` / `varying` in a fragment shader.
    Input,
    /// `out`, or `varying` in a vertex shader.
    Output,
}

/// A global declaration found in a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub qualifier: StorageQualifier,
    pub name: String,
    pub type_: u32,
    /// Array length, 1 for non-arrays.
    pub size: i32,
    pub is_array: bool,
    pub line: u32,
}

/// Result of a successful compile.
#[derive(Debug, Clone, Default)]
pub struct ShaderInterface {
    pub declarations: Vec<Declaration>,
    /// `#version 300 es` shader.
    pub es3: bool,
    identifier_counts: HashMap<String, usize>,
}

impl ShaderInterface {
    /// Number of times `name` occurs as an identifier.
    pub fn references(&self, name: &str) -> usize {
        self.identifier_counts.get(name).copied().unwrap_or(0)
    }

    /// Whether `name` is used beyond its declaration.
    pub fn is_active(&self, name: &str) -> bool {
        let declared = self
            .declarations
            .iter()
            .filter(|d| d.name == name)
            .count();
        self.references(name) > declared
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &Declaration> {
        self.by_qualifier(StorageQualifier::Uniform)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Declaration> {
        self.by_qualifier(StorageQualifier::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Declaration> {
        self.by_qualifier(StorageQualifier::Output)
    }

    fn by_qualifier(&self, qualifier: StorageQualifier) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(move |d| d.qualifier == qualifier)
    }
}

/// Built-in vertex inputs some drivers report through `getActiveAttrib`.
pub const BUILTIN_VERTEX_INPUTS: &[&str] = &["gl_VertexID", "gl_InstanceID"];

const PRECISION_QUALIFIERS: &[&str] = &[
    "highp", "mediump", "lowp", "flat", "smooth", "centroid", "invariant", "const",
];

/// GL type enum for a GLSL type name.
pub fn type_from_name(name: &str) -> Option<u32> {
    let t = match name {
        "float" => constants::FLOAT,
        "vec2" => constants::FLOAT_VEC2,
        "vec3" => constants::FLOAT_VEC3,
        "vec4" => constants::FLOAT_VEC4,
        "int" => constants::INT,
        "ivec2" => constants::INT_VEC2,
        "ivec3" => constants::INT_VEC3,
        "ivec4" => constants::INT_VEC4,
        "uint" => constants::UNSIGNED_INT,
        "uvec2" => constants::UNSIGNED_INT_VEC2,
        "uvec3" => constants::UNSIGNED_INT_VEC3,
        "uvec4" => constants::UNSIGNED_INT_VEC4,
        "bool" => constants::BOOL,
        "bvec2" => constants::BOOL_VEC2,
        "bvec3" => constants::BOOL_VEC3,
        "bvec4" => constants::BOOL_VEC4,
        "mat2" => constants::FLOAT_MAT2,
        "mat3" => constants::FLOAT_MAT3,
        "mat4" => constants::FLOAT_MAT4,
        "sampler2D" => constants::SAMPLER_2D,
        "sampler3D" => constants::SAMPLER_3D,
        "samplerCube" => constants::SAMPLER_CUBE,
        "sampler2DShadow" => constants::SAMPLER_2D_SHADOW,
        "sampler2DArray" => constants::SAMPLER_2D_ARRAY,
        "sampler2DArrayShadow" => constants::SAMPLER_2D_ARRAY_SHADOW,
        "samplerCubeShadow" => constants::SAMPLER_CUBE_SHADOW,
        "isampler2D" => constants::INT_SAMPLER_2D,
        "usampler2D" => constants::UNSIGNED_INT_SAMPLER_2D,
        _ => return None,
    };
    Some(t)
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    line: u32,
}

fn diagnostic(line: u32, token: &str, message: &str) -> String {
    format!("ERROR: 0:{}: '{}' : {}\n", line, token, message)
}

/// Replace comments with whitespace, keeping line breaks.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'/') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                }
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_no = index as u32 + 1;
        if line.trim_start().starts_with('#') {
            continue;
        }
        let mut chars = line.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        end = i + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    text: line[start..end].to_string(),
                    line: line_no,
                });
            } else {
                tokens.push(Token {
                    text: c.to_string(),
                    line: line_no,
                });
            }
        }
    }
    tokens
}

fn is_identifier(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Compile a shader source, returning its interface or a driver-style info
/// log (`ERROR: 0:<line>: ...`).
pub fn compile(
    source: &str,
    shader_type: u32,
    version: ContextVersion,
) -> Result<ShaderInterface, String> {
    let stripped = strip_comments(source);
    let mut log = String::new();
    let mut es3 = false;

    for (index, line) in stripped.lines().enumerate() {
        let line_no = index as u32 + 1;
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("#version") {
            let number = rest.split_whitespace().next().unwrap_or("");
            if number == "300" {
                if version == ContextVersion::WebGL1 {
                    log.push_str(&diagnostic(
                        line_no,
                        "",
                        "Version number not supported by ESSL",
                    ));
                }
                es3 = true;
            }
        } else if let Some(rest) = trimmed.strip_prefix("#error") {
            log.push_str(&diagnostic(line_no, "#error", rest.trim()));
        }
    }

    let tokens = tokenize(&stripped);

    let mut identifier_counts: HashMap<String, usize> = HashMap::new();
    for token in tokens.iter().filter(|t| is_identifier(&t.text)) {
        *identifier_counts.entry(token.text.clone()).or_insert(0) += 1;
    }

    let has_main = tokens
        .windows(3)
        .any(|w| w[0].text == "void" && w[1].text == "main" && w[2].text == "(");
    if !has_main {
        let last_line = stripped.lines().count().max(1) as u32;
        log.push_str(&diagnostic(last_line, "", "Missing main()"));
    }

    let mut declarations = Vec::new();
    let mut structs: HashSet<String> = HashSet::new();
    let mut depth = 0usize;
    let mut statement: Vec<&Token> = Vec::new();

    for token in &tokens {
        match token.text.as_str() {
            "{" => {
                if depth == 0 && statement.first().is_some_and(|t| t.text == "struct") {
                    if let Some(name) = statement.get(1) {
                        structs.insert(name.text.clone());
                    }
                }
                depth += 1;
                statement.clear();
            }
            "}" => {
                depth = depth.saturating_sub(1);
                statement.clear();
            }
            ";" if depth == 0 => {
                if let Err(message) = parse_statement(
                    &statement,
                    shader_type,
                    &structs,
                    &mut declarations,
                ) {
                    log.push_str(&message);
                }
                statement.clear();
            }
            _ if depth == 0 => statement.push(token),
            _ => {}
        }
    }

    if !log.is_empty() {
        return Err(log);
    }

    Ok(ShaderInterface {
        declarations,
        es3,
        identifier_counts,
    })
}

fn parse_statement(
    statement: &[&Token],
    shader_type: u32,
    structs: &HashSet<String>,
    out: &mut Vec<Declaration>,
) -> Result<(), String> {
    let mut rest = statement;

    // layout(...) qualifiers
    while rest.first().is_some_and(|t| t.text == "layout") {
        let close = rest.iter().position(|t| t.text == ")").unwrap_or(rest.len() - 1);
        rest = &rest[close + 1..];
    }

    let Some(first) = rest.first() else {
        return Ok(());
    };

    let vertex = shader_type == constants::VERTEX_SHADER;
    let qualifier = match first.text.as_str() {
        "uniform" => StorageQualifier::Uniform,
        "attribute" if vertex => StorageQualifier::Input,
        "attribute" => {
            return Err(diagnostic(
                first.line,
                "attribute",
                "supported in vertex shaders only",
            ))
        }
        "in" => StorageQualifier::Input,
        "out" => StorageQualifier::Output,
        "varying" if vertex => StorageQualifier::Output,
        "varying" => StorageQualifier::Input,
        _ => return Ok(()),
    };
    rest = &rest[1..];

    while rest
        .first()
        .is_some_and(|t| PRECISION_QUALIFIERS.contains(&t.text.as_str()))
    {
        rest = &rest[1..];
    }

    let Some(type_token) = rest.first() else {
        return Err(diagnostic(first.line, &first.text, "syntax error"));
    };
    let type_ = match type_from_name(&type_token.text) {
        Some(t) => t,
        None if structs.contains(&type_token.text) => return Ok(()),
        None => {
            return Err(diagnostic(
                type_token.line,
                &type_token.text,
                "no matching type",
            ))
        }
    };
    rest = &rest[1..];

    let mut i = 0;
    while i < rest.len() {
        let name = rest[i];
        if !is_identifier(&name.text) {
            return Err(diagnostic(name.line, &name.text, "syntax error"));
        }
        i += 1;

        let mut size = 1;
        let mut is_array = false;
        if rest.get(i).is_some_and(|t| t.text == "[") {
            is_array = true;
            size = rest
                .get(i + 1)
                .and_then(|t| t.text.parse::<i32>().ok())
                .unwrap_or(1);
            while i < rest.len() && rest[i].text != "]" {
                i += 1;
            }
            i += 1;
        }

        out.push(Declaration {
            qualifier,
            name: name.text.clone(),
            type_,
            size,
            is_array,
            line: name.line,
        });

        match rest.get(i) {
            Some(t) if t.text == "," => i += 1,
            _ => break,
        }
    }

    Ok(())
}

/// Whether a uniform type is sampled through a texture unit.
pub fn is_sampler_type(type_: u32) -> bool {
    matches!(
        type_,
        constants::SAMPLER_2D
            | constants::SAMPLER_3D
            | constants::SAMPLER_CUBE
            | constants::SAMPLER_2D_SHADOW
            | constants::SAMPLER_2D_ARRAY
            | constants::SAMPLER_2D_ARRAY_SHADOW
            | constants::SAMPLER_CUBE_SHADOW
            | constants::INT_SAMPLER_2D
            | constants::UNSIGNED_INT_SAMPLER_2D
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "attribute vec3 aPosition;
uniform mat4 matrix_model; // model
uniform vec4 unused;
varying vec2 vUv0;
void main() {
    vUv0 = aPosition.xy;
    gl_Position = matrix_model * vec4(aPosition, 1.0);
}";

    #[test]
    fn test_declarations() {
        let iface = compile(VS, constants::VERTEX_SHADER, ContextVersion::WebGL1).unwrap();
        let uniforms: Vec<_> = iface.uniforms().map(|d| d.name.as_str()).collect();
        assert_eq!(uniforms, vec!["matrix_model", "unused"]);
        assert_eq!(iface.inputs().count(), 1);
        assert_eq!(iface.outputs().next().unwrap().name, "vUv0");
        assert!(iface.is_active("matrix_model"));
        assert!(!iface.is_active("unused"));
    }

    #[test]
    fn test_arrays_and_layout() {
        let src = "#version 300 es
layout(location = 0) in highp vec4 vertex_position;
uniform float weights[4], bias;
void main() { gl_Position = vertex_position * weights[0] * bias; }";
        let iface = compile(src, constants::VERTEX_SHADER, ContextVersion::WebGL2).unwrap();
        assert!(iface.es3);
        let weights = iface.uniforms().find(|d| d.name == "weights").unwrap();
        assert!(weights.is_array);
        assert_eq!(weights.size, 4);
        let bias = iface.uniforms().find(|d| d.name == "bias").unwrap();
        assert!(!bias.is_array);
        assert_eq!(bias.type_, constants::FLOAT);
    }

    #[test]
    fn test_error_directive() {
        let src = "void main() {\n#error broken chunk\n}";
        let log = compile(src, constants::FRAGMENT_SHADER, ContextVersion::WebGL1).unwrap_err();
        assert_eq!(log, "ERROR: 0:2: '#error' : broken chunk\n");
    }

    #[test]
    fn test_unknown_type() {
        let src = "uniform vex4 color;\nvoid main() {}";
        let log = compile(src, constants::FRAGMENT_SHADER, ContextVersion::WebGL1).unwrap_err();
        assert!(log.starts_with("ERROR: 0:1: 'vex4'"));
    }

    #[test]
    fn test_version_300_on_webgl1() {
        let src = "#version 300 es\nvoid main() {}";
        assert!(compile(src, constants::VERTEX_SHADER, ContextVersion::WebGL1).is_err());
        assert!(compile(src, constants::VERTEX_SHADER, ContextVersion::WebGL2).is_ok());
    }

    #[test]
    fn test_missing_main() {
        let log = compile("uniform float a;", constants::VERTEX_SHADER, ContextVersion::WebGL1)
            .unwrap_err();
        assert!(log.contains("Missing main()"));
    }

    #[test]
    fn test_struct_uniforms_skipped() {
        let src = "struct Light { vec3 color; };\nuniform Light light;\nvoid main() {}";
        let iface = compile(src, constants::FRAGMENT_SHADER, ContextVersion::WebGL1).unwrap();
        assert_eq!(iface.uniforms().count(), 0);
    }
}
