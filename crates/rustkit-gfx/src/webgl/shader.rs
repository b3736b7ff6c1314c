//! Program compilation, linking and reflection.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use rustkit_webgl::{constants as gl_const, WebGLProgram, WebGLRenderingContext, WebGLShader};
use tracing::{debug, error, warn};

use crate::constants::Semantic;
use crate::scope::ScopeSpace;
use crate::shader::{ShaderDefinition, ShaderTag};
use crate::shader_input::ShaderInput;
use crate::stats::ShaderStats;

/// Vertex inputs supplied by the pipeline rather than a vertex buffer.
const BUILTIN_ATTRIBUTES: &[&str] = &[
    "gl_VertexID",
    "gl_InstanceID",
    "gl_DrawID",
    "gl_BaseVertex",
    "gl_BaseInstance",
];

/// Lines of source shown on each side of a reported error line.
const CONTEXT_LINES: usize = 5;

fn source_hash(source: &str) -> u64 {
    let mut hasher = FxHasher::default();
    source.hash(&mut hasher);
    hasher.finish()
}

/// Compiled shader stages keyed by a hash of their exact source.
#[derive(Debug, Default)]
pub(crate) struct ShaderCache {
    vertex: FxHashMap<u64, WebGLShader>,
    fragment: FxHashMap<u64, WebGLShader>,
}

impl ShaderCache {
    /// Return the cached stage for `source`, compiling it on a miss.
    pub(crate) fn compile(
        &mut self,
        gl: &mut WebGLRenderingContext,
        source: &str,
        stage: u32,
        stats: &mut ShaderStats,
    ) -> Option<WebGLShader> {
        let vertex = stage == gl_const::VERTEX_SHADER;
        let map = if vertex {
            &mut self.vertex
        } else {
            &mut self.fragment
        };
        let key = source_hash(source);
        if let Some(&shader) = map.get(&key) {
            debug!(stage = if vertex { "vertex" } else { "fragment" }, "Shader cache hit");
            return Some(shader);
        }

        let shader = gl.create_shader(stage)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        map.insert(key, shader);
        if vertex {
            stats.vs_compiled += 1;
        } else {
            stats.fs_compiled += 1;
        }
        Some(shader)
    }

    pub(crate) fn len(&self) -> usize {
        self.vertex.len() + self.fragment.len()
    }

    /// Forget every stage without touching the context.
    pub(crate) fn clear(&mut self) {
        self.vertex.clear();
        self.fragment.clear();
    }

    pub(crate) fn destroy(&mut self, gl: &mut WebGLRenderingContext) {
        for (_, shader) in self.vertex.drain().chain(self.fragment.drain()) {
            gl.delete_shader(shader);
        }
    }
}

/// A reflected vertex input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub name: String,
    pub semantic: Semantic,
    pub location: i32,
}

/// Native program state of a shader.
#[derive(Debug, Default)]
pub struct WebglShader {
    pub(crate) vertex_shader: Option<WebGLShader>,
    pub(crate) fragment_shader: Option<WebGLShader>,
    pub(crate) program: Option<WebGLProgram>,
    pub(crate) uniforms: Vec<ShaderInput>,
    pub(crate) samplers: Vec<ShaderInput>,
    pub(crate) attributes: Vec<ShaderAttribute>,
}

impl WebglShader {
    pub fn program(&self) -> Option<WebGLProgram> {
        self.program
    }

    pub fn uniforms(&self) -> &[ShaderInput] {
        &self.uniforms
    }

    pub fn samplers(&self) -> &[ShaderInput] {
        &self.samplers
    }

    pub fn attributes(&self) -> &[ShaderAttribute] {
        &self.attributes
    }

    /// Compile both stages through the cache.
    pub(crate) fn compile(
        &mut self,
        gl: &mut WebGLRenderingContext,
        cache: &mut ShaderCache,
        definition: &ShaderDefinition,
        stats: &mut ShaderStats,
    ) {
        self.vertex_shader =
            cache.compile(gl, &definition.vshader, gl_const::VERTEX_SHADER, stats);
        self.fragment_shader =
            cache.compile(gl, &definition.fshader, gl_const::FRAGMENT_SHADER, stats);
    }

    /// Create the program, bind attribute locations and issue the link.
    /// The result is checked later by [`post_link`](Self::post_link).
    pub(crate) fn link(
        &mut self,
        gl: &mut WebGLRenderingContext,
        definition: &ShaderDefinition,
        stats: &mut ShaderStats,
    ) {
        if self.program.is_some() {
            return;
        }
        let Some(program) = gl.create_program() else {
            return;
        };
        if let Some(vs) = self.vertex_shader {
            gl.attach_shader(program, vs);
        }
        if let Some(fs) = self.fragment_shader {
            gl.attach_shader(program, fs);
        }

        if gl.is_webgl2() && definition.use_transform_feedback {
            let outputs: Vec<String> = definition
                .attributes
                .keys()
                .map(|name| format!("out_{name}"))
                .collect();
            let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
            gl.transform_feedback_varyings(program, &outputs, gl_const::INTERLEAVED_ATTRIBS);
        }

        let mut locations: FxHashMap<u32, &str> = FxHashMap::default();
        for (name, semantic) in &definition.attributes {
            let location = semantic.location();
            if let Some(previous) = locations.insert(location, name) {
                warn!(
                    shader = %definition.name,
                    location,
                    first = previous,
                    second = %name,
                    "Two attributes are mapped to the same location"
                );
            }
            gl.bind_attrib_location(program, location, name);
        }

        gl.link_program(program);
        self.program = Some(program);
        stats.linked += 1;
        if definition.tag == ShaderTag::Material {
            stats.material_shaders += 1;
        }
    }

    /// Verify compile and link status and reflect the program's inputs.
    /// Returns `false` when the shader is unusable; the reason is logged.
    pub(crate) fn post_link(
        &mut self,
        gl: &mut WebGLRenderingContext,
        definition: &ShaderDefinition,
        scope: &mut ScopeSpace,
    ) -> bool {
        let Some(program) = self.program else {
            return false;
        };
        let name = definition.name.as_str();

        // Both stages are checked so each one reports its own diagnostics.
        let vertex_ok = check_compiled(gl, self.vertex_shader, &definition.vshader, "vertex", name);
        let fragment_ok =
            check_compiled(gl, self.fragment_shader, &definition.fshader, "fragment", name);
        if !(vertex_ok && fragment_ok) {
            return false;
        }

        if gl.get_program_parameter(program, gl_const::LINK_STATUS) != Some(1) {
            let log = gl.get_program_info_log(program);
            error!(shader = name, "Failed to link shader program. Error: {log}");
            return false;
        }

        let mut ok = true;

        let attribute_count = gl
            .get_program_parameter(program, gl_const::ACTIVE_ATTRIBUTES)
            .unwrap_or(0);
        for index in 0..attribute_count.max(0) as u32 {
            let Some(info) = gl.get_active_attrib(program, index) else {
                continue;
            };
            if BUILTIN_ATTRIBUTES.contains(&info.name.as_str()) {
                continue;
            }
            let location = gl.get_attrib_location(program, &info.name);
            match definition.attributes.get(&info.name) {
                Some(&semantic) => self.attributes.push(ShaderAttribute {
                    name: info.name,
                    semantic,
                    location,
                }),
                None => {
                    error!(
                        shader = name,
                        attribute = %info.name,
                        "Vertex shader attribute is not mapped to a semantic in the shader definition"
                    );
                    ok = false;
                }
            }
        }

        let uniform_count = gl
            .get_program_parameter(program, gl_const::ACTIVE_UNIFORMS)
            .unwrap_or(0);
        for index in 0..uniform_count.max(0) as u32 {
            let Some(info) = gl.get_active_uniform(program, index) else {
                continue;
            };
            let Some(location) = gl.get_uniform_location(program, &info.name) else {
                continue;
            };
            match ShaderInput::new(scope, &info.name, info.type_, location) {
                Ok(input) if input.is_sampler() => self.samplers.push(input),
                Ok(input) => self.uniforms.push(input),
                Err(e) => {
                    error!(shader = name, error = %e, "Cannot bind shader uniform");
                    ok = false;
                }
            }
        }

        ok
    }

    /// Drop native handles and reflection results without GL calls.
    pub(crate) fn lose_context(&mut self) {
        *self = Self::default();
    }

    /// Delete the program. Stages belong to the device's cache.
    pub(crate) fn destroy(&mut self, gl: &mut WebGLRenderingContext) {
        if let Some(program) = self.program.take() {
            gl.delete_program(program);
        }
        self.lose_context();
    }
}

fn check_compiled(
    gl: &mut WebGLRenderingContext,
    shader: Option<WebGLShader>,
    source: &str,
    stage: &str,
    name: &str,
) -> bool {
    let Some(shader) = shader else {
        error!(shader = name, stage, "Shader stage was never created");
        return false;
    };
    let compiled = gl.get_shader_parameter(shader, gl_const::COMPILE_STATUS) == Some(1);
    let log = gl.get_shader_info_log(shader);
    if compiled {
        if !log.trim().is_empty() {
            warn!(shader = name, stage, "Compiled {stage} shader with warnings:\n{log}");
        }
        return true;
    }
    let code = numbered_source(source, &log);
    error!(shader = name, stage, "Failed to compile {stage} shader:\n\n{log}\n{code}");
    false
}

/// Line reported by a driver log of the form `ERROR: 0:<line>: ...`.
fn error_line(info_log: &str) -> Option<usize> {
    let rest = info_log.strip_prefix("ERROR:")?.trim_start();
    let mut parts = rest.splitn(3, ':');
    parts.next()?.trim().parse::<u32>().ok()?;
    parts.next()?.trim().parse().ok()
}

/// Source lines prefixed with 1-based numbers, narrowed to the lines around
/// the reported error when the log names one.
pub(crate) fn numbered_source(source: &str, info_log: &str) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let (from, to) = match error_line(info_log) {
        Some(line) => (
            line.saturating_sub(CONTEXT_LINES + 1),
            (line + CONTEXT_LINES).min(lines.len()),
        ),
        None => (0, lines.len()),
    };
    lines[from.min(to)..to]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}:\t{}\n", from + i + 1, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "attribute vec3 aPosition;\nuniform mat4 matrix_model;\nvoid main() { gl_Position = matrix_model * vec4(aPosition, 1.0); }\n";
    const FS: &str = "precision mediump float;\nuniform vec4 uColor;\nuniform sampler2D texture_diffuse;\nvoid main() { gl_FragColor = uColor * texture2D(texture_diffuse, vec2(0.0)); }\n";

    fn definition() -> ShaderDefinition {
        ShaderDefinition::new("test", VS, FS).with_attribute("aPosition", Semantic::Position)
    }

    #[test]
    fn test_stage_cache_hits() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();

        let a = cache.compile(&mut gl, VS, gl_const::VERTEX_SHADER, &mut stats);
        let b = cache.compile(&mut gl, VS, gl_const::VERTEX_SHADER, &mut stats);
        assert_eq!(a, b);
        assert_eq!(stats.vs_compiled, 1);
        assert_eq!(gl.call_count("compileShader"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compile_link_reflect() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();
        let mut scope = ScopeSpace::new("device");
        let def = definition();

        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        assert!(shader.post_link(&mut gl, &def, &mut scope));

        assert_eq!(stats.linked, 1);
        assert_eq!(shader.attributes().len(), 1);
        assert_eq!(shader.attributes()[0].location, 0);
        assert_eq!(shader.uniforms().len(), 2);
        assert_eq!(shader.samplers().len(), 1);
        assert!(scope.find("uColor").is_some());
    }

    #[test]
    fn test_unmapped_attribute_fails() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();
        let mut scope = ScopeSpace::new("device");
        let def = ShaderDefinition::new("unmapped", VS, FS);

        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        assert!(!shader.post_link(&mut gl, &def, &mut scope));
    }

    #[test]
    fn test_compile_error_fails() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();
        let mut scope = ScopeSpace::new("device");
        let def = ShaderDefinition::new("broken", VS, "#error broken\nvoid main() {}\n")
            .with_attribute("aPosition", Semantic::Position);

        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        assert!(!shader.post_link(&mut gl, &def, &mut scope));
        assert!(shader.uniforms().is_empty());
    }

    #[test]
    fn test_both_stages_are_verified() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();
        let mut scope = ScopeSpace::new("device");

        let def = definition();
        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        gl.reset_call_counts();
        assert!(shader.post_link(&mut gl, &def, &mut scope));
        assert_eq!(gl.call_count("getShaderParameter"), 2);

        let broken = "#error broken\nvoid main() {}\n";
        let def = ShaderDefinition::new("broken", broken, broken)
            .with_attribute("aPosition", Semantic::Position);
        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        gl.reset_call_counts();
        assert!(!shader.post_link(&mut gl, &def, &mut scope));
        assert_eq!(gl.call_count("getShaderInfoLog"), 2);
        assert_eq!(gl.call_count("getProgramParameter"), 0);
    }

    #[test]
    fn test_numbered_source_window() {
        let source: String = (1..=20).map(|i| format!("line{i}\n")).collect();
        let code = numbered_source(&source, "ERROR: 0:10: 'x' : undeclared identifier\n");
        let lines: Vec<&str> = code.lines().collect();
        assert_eq!(lines.first(), Some(&"5:\tline5"));
        assert_eq!(lines.last(), Some(&"15:\tline15"));

        let whole = numbered_source("a\nb", "link failed");
        assert_eq!(whole, "1:\ta\n2:\tb\n");
    }

    #[test]
    fn test_lose_context_makes_no_calls() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut cache = ShaderCache::default();
        let mut stats = ShaderStats::default();
        let def = definition();
        let mut shader = WebglShader::default();
        shader.compile(&mut gl, &mut cache, &def, &mut stats);
        shader.link(&mut gl, &def, &mut stats);
        gl.reset_call_counts();

        shader.lose_context();
        assert!(shader.program().is_none());
        assert_eq!(gl.total_calls(), 0);
    }
}
