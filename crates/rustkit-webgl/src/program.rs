//! Shader objects, program linking and uniform uploads.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::glsl::{self, Declaration, ShaderInterface};
use crate::{
    constants, UniformValue, WebGLObject, WebGLProgram, WebGLRenderingContext, WebGLShader,
    WebGLUniformLocation,
};

// ==================== Shader ====================

/// Shader data.
#[derive(Debug, Clone)]
pub struct ShaderData {
    pub shader_type: u32,
    pub source: String,
    pub compiled: bool,
    pub info_log: String,
    pub deleted: bool,
    /// Declarations found by the last successful compile.
    pub interface: Option<ShaderInterface>,
}

impl ShaderData {
    pub fn new(shader_type: u32) -> Self {
        Self {
            shader_type,
            source: String::new(),
            compiled: false,
            info_log: String::new(),
            deleted: false,
            interface: None,
        }
    }
}

// ==================== Program ====================

/// Attribute info.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    /// -1 for built-ins such as `gl_VertexID`.
    pub location: i32,
    pub size: i32,
    pub type_: u32,
}

/// Uniform info.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformInfo {
    /// Array uniforms are reported as `name[0]`.
    pub name: String,
    pub location: WebGLUniformLocation,
    pub size: i32,
    pub type_: u32,
}

/// Result of `getActiveAttrib` / `getActiveUniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebGLActiveInfo {
    pub name: String,
    pub size: i32,
    pub type_: u32,
}

/// Program data.
#[derive(Debug, Clone)]
pub struct ProgramData {
    pub vertex_shader: Option<WebGLShader>,
    pub fragment_shader: Option<WebGLShader>,
    pub linked: bool,
    pub info_log: String,
    pub deleted: bool,
    /// Active attributes in declaration order.
    pub attributes: Vec<AttributeInfo>,
    /// Active uniforms, vertex stage first.
    pub uniforms: Vec<UniformInfo>,
    pub attrib_bindings: HashMap<String, u32>,
    pub transform_feedback_varyings: Vec<String>,
    pub transform_feedback_buffer_mode: u32,
    pub link_count: u32,
}

impl ProgramData {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            linked: false,
            info_log: String::new(),
            deleted: false,
            attributes: Vec::new(),
            uniforms: Vec::new(),
            attrib_bindings: HashMap::new(),
            transform_feedback_varyings: Vec::new(),
            transform_feedback_buffer_mode: constants::INTERLEAVED_ATTRIBS,
            link_count: 0,
        }
    }
}

impl Default for ProgramData {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of matching two compiled stages.
struct LinkOutput {
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<(String, i32, u32)>,
}

fn array_name(decl: &Declaration) -> String {
    if decl.is_array {
        format!("{}[0]", decl.name)
    } else {
        decl.name.clone()
    }
}

fn link_stages(
    vs: &ShaderInterface,
    fs: &ShaderInterface,
    bindings: &HashMap<String, u32>,
    tf_varyings: &[String],
    max_attribs: u32,
) -> Result<LinkOutput, String> {
    let mut log = String::new();

    // Varyings consumed by the fragment stage must be produced by the vertex
    // stage with the same type.
    for input in fs.inputs() {
        match vs.outputs().find(|o| o.name == input.name) {
            Some(output) if output.type_ == input.type_ => {}
            Some(_) => log.push_str(&format!(
                "ERROR: Varying '{}' has different types in the vertex and fragment shaders\n",
                input.name
            )),
            None if fs.is_active(&input.name) => log.push_str(&format!(
                "ERROR: Varying '{}' is not written by the vertex shader\n",
                input.name
            )),
            None => {}
        }
    }

    for varying in tf_varyings {
        let captured = varying == "gl_Position" || vs.outputs().any(|o| &o.name == varying);
        if !captured {
            log.push_str(&format!(
                "ERROR: Transform feedback varying '{}' is not a vertex shader output\n",
                varying
            ));
        }
    }

    let mut uniforms: Vec<(String, i32, u32)> = Vec::new();
    let mut seen: HashMap<&str, u32> = HashMap::new();
    for (stage, other) in [(vs, fs), (fs, vs)] {
        for decl in stage.uniforms() {
            if let Some(&type_) = seen.get(decl.name.as_str()) {
                if type_ != decl.type_ {
                    log.push_str(&format!(
                        "ERROR: Uniform '{}' differs between shader stages\n",
                        decl.name
                    ));
                }
                continue;
            }
            seen.insert(decl.name.as_str(), decl.type_);
            if stage.is_active(&decl.name) || other.is_active(&decl.name) {
                uniforms.push((array_name(decl), decl.size, decl.type_));
            }
        }
    }

    let mut attributes = Vec::new();
    let mut used: HashSet<u32> = HashSet::new();
    let active: Vec<&Declaration> = vs.inputs().filter(|d| vs.is_active(&d.name)).collect();
    for decl in &active {
        if let Some(&location) = bindings.get(&decl.name) {
            used.insert(location);
        }
    }
    let mut next = 0;
    for decl in active {
        let location = match bindings.get(&decl.name) {
            Some(&location) => location,
            None => {
                while used.contains(&next) {
                    next += 1;
                }
                used.insert(next);
                next
            }
        };
        if location >= max_attribs {
            log.push_str(&format!(
                "ERROR: Too many vertex attributes (attribute '{}')\n",
                decl.name
            ));
            continue;
        }
        attributes.push(AttributeInfo {
            name: decl.name.clone(),
            location: location as i32,
            size: decl.size,
            type_: decl.type_,
        });
    }
    if vs.es3 {
        for builtin in glsl::BUILTIN_VERTEX_INPUTS {
            if vs.references(builtin) > 0 {
                attributes.push(AttributeInfo {
                    name: builtin.to_string(),
                    location: -1,
                    size: 1,
                    type_: constants::INT,
                });
            }
        }
    }

    if log.is_empty() {
        Ok(LinkOutput {
            attributes,
            uniforms,
        })
    } else {
        Err(log)
    }
}

impl WebGLRenderingContext {
    // ==================== Shaders ====================

    /// Create a shader.
    pub fn create_shader(&mut self, shader_type: u32) -> Option<WebGLShader> {
        if !self.begin("createShader") {
            return None;
        }
        if shader_type != constants::VERTEX_SHADER && shader_type != constants::FRAGMENT_SHADER {
            self.set_error(constants::INVALID_ENUM);
            return None;
        }
        let shader = WebGLObject::new();
        self.shaders.insert(shader, ShaderData::new(shader_type));
        Some(shader)
    }

    /// Whether a handle names a live shader.
    pub fn is_shader(&self, shader: WebGLShader) -> bool {
        self.shaders.get(&shader).is_some_and(|s| !s.deleted)
    }

    /// Set shader source.
    pub fn shader_source(&mut self, shader: WebGLShader, source: &str) {
        if !self.begin("shaderSource") {
            return;
        }
        match self.shaders.get_mut(&shader) {
            Some(data) => data.source = source.to_string(),
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Compile shader.
    pub fn compile_shader(&mut self, shader: WebGLShader) {
        if !self.begin("compileShader") {
            return;
        }
        let version = self.version;
        let Some(data) = self.shaders.get_mut(&shader) else {
            self.set_error(constants::INVALID_VALUE);
            return;
        };
        match glsl::compile(&data.source, data.shader_type, version) {
            Ok(interface) => {
                data.compiled = true;
                data.info_log.clear();
                data.interface = Some(interface);
            }
            Err(log) => {
                data.compiled = false;
                data.info_log = log;
                data.interface = None;
            }
        }
    }

    /// Get shader parameter.
    pub fn get_shader_parameter(&mut self, shader: WebGLShader, pname: u32) -> Option<i32> {
        if !self.begin("getShaderParameter") {
            return None;
        }
        let Some(data) = self.shaders.get(&shader) else {
            self.set_error(constants::INVALID_VALUE);
            return None;
        };
        match pname {
            constants::COMPILE_STATUS => Some(data.compiled as i32),
            constants::DELETE_STATUS => Some(data.deleted as i32),
            constants::SHADER_TYPE => Some(data.shader_type as i32),
            constants::COMPLETION_STATUS_KHR => Some(1),
            _ => {
                self.set_error(constants::INVALID_ENUM);
                None
            }
        }
    }

    /// Get shader info log.
    pub fn get_shader_info_log(&mut self, shader: WebGLShader) -> String {
        self.record("getShaderInfoLog");
        self.shaders
            .get(&shader)
            .map(|d| d.info_log.clone())
            .unwrap_or_default()
    }

    /// Delete shader.
    pub fn delete_shader(&mut self, shader: WebGLShader) {
        if !self.begin("deleteShader") {
            return;
        }
        if let Some(data) = self.shaders.get_mut(&shader) {
            data.deleted = true;
        }
    }

    // ==================== Programs ====================

    /// Create a program.
    pub fn create_program(&mut self) -> Option<WebGLProgram> {
        if !self.begin("createProgram") {
            return None;
        }
        let program = WebGLObject::new();
        self.programs.insert(program, ProgramData::new());
        Some(program)
    }

    /// Whether a handle names a live program.
    pub fn is_program(&self, program: WebGLProgram) -> bool {
        self.programs.get(&program).is_some_and(|p| !p.deleted)
    }

    /// Attach shader to program.
    pub fn attach_shader(&mut self, program: WebGLProgram, shader: WebGLShader) {
        if !self.begin("attachShader") {
            return;
        }
        let Some(shader_type) = self.shaders.get(&shader).map(|s| s.shader_type) else {
            self.set_error(constants::INVALID_VALUE);
            return;
        };
        let Some(data) = self.programs.get_mut(&program) else {
            self.set_error(constants::INVALID_VALUE);
            return;
        };
        let slot = if shader_type == constants::VERTEX_SHADER {
            &mut data.vertex_shader
        } else {
            &mut data.fragment_shader
        };
        if slot.is_some() {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        *slot = Some(shader);
    }

    /// Bind an attribute name to a location, effective at the next link.
    pub fn bind_attrib_location(&mut self, program: WebGLProgram, index: u32, name: &str) {
        if !self.begin("bindAttribLocation") {
            return;
        }
        if name.starts_with("gl_") {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        if index >= self.profile.max_vertex_attribs as u32 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        match self.programs.get_mut(&program) {
            Some(data) => {
                data.attrib_bindings.insert(name.to_string(), index);
            }
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Name the vertex outputs captured by transform feedback (WebGL2).
    pub fn transform_feedback_varyings(
        &mut self,
        program: WebGLProgram,
        varyings: &[&str],
        buffer_mode: u32,
    ) {
        if !self.begin_webgl2("transformFeedbackVaryings") {
            return;
        }
        if buffer_mode != constants::INTERLEAVED_ATTRIBS
            && buffer_mode != constants::SEPARATE_ATTRIBS
        {
            self.set_error(constants::INVALID_ENUM);
            return;
        }
        match self.programs.get_mut(&program) {
            Some(data) => {
                data.transform_feedback_varyings =
                    varyings.iter().map(|v| v.to_string()).collect();
                data.transform_feedback_buffer_mode = buffer_mode;
            }
            None => self.set_error(constants::INVALID_VALUE),
        }
    }

    /// Link program.
    pub fn link_program(&mut self, program: WebGLProgram) {
        if !self.begin("linkProgram") {
            return;
        }
        let Some(data) = self.programs.get(&program) else {
            self.set_error(constants::INVALID_VALUE);
            return;
        };
        let interface = |shader: Option<WebGLShader>| {
            shader
                .and_then(|s| self.shaders.get(&s))
                .filter(|d| d.compiled)
                .and_then(|d| d.interface.as_ref())
        };
        let result = match (interface(data.vertex_shader), interface(data.fragment_shader)) {
            (Some(vs), Some(fs)) => link_stages(
                vs,
                fs,
                &data.attrib_bindings,
                &data.transform_feedback_varyings,
                self.profile.max_vertex_attribs as u32,
            ),
            _ => Err("Failed to link: missing or uncompiled shaders".to_string()),
        };

        // Locations from a previous link become invalid.
        let stale: Vec<WebGLUniformLocation> = data.uniforms.iter().map(|u| u.location).collect();
        for location in stale {
            self.uniform_values.remove(&location);
            self.uniform_owners.remove(&location);
        }

        let mut uniforms = Vec::new();
        let outcome = result.map(|linked| {
            for (name, size, type_) in linked.uniforms {
                let location = WebGLObject::new();
                self.uniform_owners.insert(location, program);
                uniforms.push(UniformInfo {
                    name,
                    location,
                    size,
                    type_,
                });
            }
            linked.attributes
        });

        let Some(data) = self.programs.get_mut(&program) else {
            return;
        };
        data.link_count += 1;
        match outcome {
            Ok(attributes) => {
                data.linked = true;
                data.info_log.clear();
                data.attributes = attributes;
                data.uniforms = uniforms;
            }
            Err(log) => {
                trace!(program = program.id(), %log, "link failed");
                data.linked = false;
                data.info_log = log;
                data.attributes.clear();
                data.uniforms.clear();
            }
        }
    }

    /// Get program parameter.
    pub fn get_program_parameter(&mut self, program: WebGLProgram, pname: u32) -> Option<i32> {
        if !self.begin("getProgramParameter") {
            return None;
        }
        let Some(data) = self.programs.get(&program) else {
            self.set_error(constants::INVALID_VALUE);
            return None;
        };
        let attached =
            data.vertex_shader.is_some() as i32 + data.fragment_shader.is_some() as i32;
        match pname {
            constants::LINK_STATUS => Some(data.linked as i32),
            constants::DELETE_STATUS => Some(data.deleted as i32),
            constants::ATTACHED_SHADERS => Some(attached),
            constants::ACTIVE_ATTRIBUTES => Some(data.attributes.len() as i32),
            constants::ACTIVE_UNIFORMS => Some(data.uniforms.len() as i32),
            constants::COMPLETION_STATUS_KHR => Some(1),
            _ => {
                self.set_error(constants::INVALID_ENUM);
                None
            }
        }
    }

    /// Get program info log.
    pub fn get_program_info_log(&mut self, program: WebGLProgram) -> String {
        self.record("getProgramInfoLog");
        self.programs
            .get(&program)
            .map(|d| d.info_log.clone())
            .unwrap_or_default()
    }

    /// Use program.
    pub fn use_program(&mut self, program: Option<WebGLProgram>) {
        if !self.begin("useProgram") {
            return;
        }
        if let Some(p) = program {
            match self.programs.get(&p) {
                Some(data) if data.linked && !data.deleted => {}
                _ => {
                    self.set_error(constants::INVALID_OPERATION);
                    return;
                }
            }
        }
        self.state.current_program = program;
    }

    /// Delete program.
    pub fn delete_program(&mut self, program: WebGLProgram) {
        if !self.begin("deleteProgram") {
            return;
        }
        if let Some(data) = self.programs.get_mut(&program) {
            data.deleted = true;
            for uniform in &data.uniforms {
                self.uniform_values.remove(&uniform.location);
                self.uniform_owners.remove(&uniform.location);
            }
        }
        if self.state.current_program == Some(program) {
            self.state.current_program = None;
        }
    }

    // ==================== Reflection ====================

    /// Active attribute by index.
    pub fn get_active_attrib(&mut self, program: WebGLProgram, index: u32) -> Option<WebGLActiveInfo> {
        if !self.begin("getActiveAttrib") {
            return None;
        }
        let info = self
            .programs
            .get(&program)
            .and_then(|p| p.attributes.get(index as usize))
            .map(|a| WebGLActiveInfo {
                name: a.name.clone(),
                size: a.size,
                type_: a.type_,
            });
        if info.is_none() {
            self.set_error(constants::INVALID_VALUE);
        }
        info
    }

    /// Active uniform by index.
    pub fn get_active_uniform(&mut self, program: WebGLProgram, index: u32) -> Option<WebGLActiveInfo> {
        if !self.begin("getActiveUniform") {
            return None;
        }
        let info = self
            .programs
            .get(&program)
            .and_then(|p| p.uniforms.get(index as usize))
            .map(|u| WebGLActiveInfo {
                name: u.name.clone(),
                size: u.size,
                type_: u.type_,
            });
        if info.is_none() {
            self.set_error(constants::INVALID_VALUE);
        }
        info
    }

    /// Get uniform location. Array uniforms answer to both `name` and
    /// `name[0]`.
    pub fn get_uniform_location(
        &mut self,
        program: WebGLProgram,
        name: &str,
    ) -> Option<WebGLUniformLocation> {
        if !self.begin("getUniformLocation") {
            return None;
        }
        let Some(data) = self.programs.get(&program) else {
            self.set_error(constants::INVALID_VALUE);
            return None;
        };
        if !data.linked {
            self.set_error(constants::INVALID_OPERATION);
            return None;
        }
        data.uniforms
            .iter()
            .find(|u| {
                u.name == name
                    || u
                        .name
                        .strip_suffix("[0]")
                        .is_some_and(|base| base == name)
            })
            .map(|u| u.location)
    }

    /// Get attribute location, -1 when the attribute is not active.
    pub fn get_attrib_location(&mut self, program: WebGLProgram, name: &str) -> i32 {
        if !self.begin("getAttribLocation") {
            return -1;
        }
        self.programs
            .get(&program)
            .and_then(|p| p.attributes.iter().find(|a| a.name == name))
            .map(|a| a.location)
            .unwrap_or(-1)
    }

    // ==================== Uniforms ====================

    fn set_uniform(&mut self, name: &'static str, location: WebGLUniformLocation, value: UniformValue) {
        if !self.begin(name) {
            return;
        }
        self.store_uniform(location, value);
    }

    fn store_uniform(&mut self, location: WebGLUniformLocation, value: UniformValue) {
        let owner = self.uniform_owners.get(&location).copied();
        if owner.is_none() || owner != self.state.current_program {
            self.set_error(constants::INVALID_OPERATION);
            return;
        }
        self.uniform_values.insert(location, value);
    }

    fn set_float_vector(
        &mut self,
        name: &'static str,
        location: WebGLUniformLocation,
        components: usize,
        value: &[f32],
    ) {
        if !self.begin(name) {
            return;
        }
        if value.is_empty() || value.len() % components != 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let uniform = match (components, value) {
            (1, [x]) => UniformValue::Float(*x),
            (2, [x, y]) => UniformValue::Vec2([*x, *y]),
            (3, [x, y, z]) => UniformValue::Vec3([*x, *y, *z]),
            (4, [x, y, z, w]) => UniformValue::Vec4([*x, *y, *z, *w]),
            (_, v) => UniformValue::FloatArray(v.to_vec()),
        };
        self.store_uniform(location, uniform);
    }

    fn set_int_vector(
        &mut self,
        name: &'static str,
        location: WebGLUniformLocation,
        components: usize,
        value: &[i32],
    ) {
        if !self.begin(name) {
            return;
        }
        if value.is_empty() || value.len() % components != 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let uniform = match (components, value) {
            (1, [x]) => UniformValue::Int(*x),
            (2, [x, y]) => UniformValue::IVec2([*x, *y]),
            (3, [x, y, z]) => UniformValue::IVec3([*x, *y, *z]),
            (4, [x, y, z, w]) => UniformValue::IVec4([*x, *y, *z, *w]),
            (_, v) => UniformValue::IntArray(v.to_vec()),
        };
        self.store_uniform(location, uniform);
    }

    fn set_uint_vector(
        &mut self,
        name: &'static str,
        location: WebGLUniformLocation,
        components: usize,
        value: &[u32],
    ) {
        if !self.begin_webgl2(name) {
            return;
        }
        if value.is_empty() || value.len() % components != 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let uniform = match (components, value) {
            (1, [x]) => UniformValue::UInt(*x),
            (2, [x, y]) => UniformValue::UVec2([*x, *y]),
            (3, [x, y, z]) => UniformValue::UVec3([*x, *y, *z]),
            (4, [x, y, z, w]) => UniformValue::UVec4([*x, *y, *z, *w]),
            (_, v) => UniformValue::UIntArray(v.to_vec()),
        };
        self.store_uniform(location, uniform);
    }

    fn set_matrix(
        &mut self,
        name: &'static str,
        location: WebGLUniformLocation,
        transpose: bool,
        components: usize,
        value: &[f32],
    ) {
        if !self.begin(name) {
            return;
        }
        if (transpose && !self.is_webgl2()) || value.is_empty() || value.len() % components != 0 {
            self.set_error(constants::INVALID_VALUE);
            return;
        }
        let uniform = match components {
            4 => <[f32; 4]>::try_from(value).map(UniformValue::Mat2).ok(),
            9 => <[f32; 9]>::try_from(value).map(UniformValue::Mat3).ok(),
            16 => <[f32; 16]>::try_from(value).map(UniformValue::Mat4).ok(),
            _ => None,
        };
        let uniform = uniform.unwrap_or_else(|| UniformValue::FloatArray(value.to_vec()));
        self.store_uniform(location, uniform);
    }

    /// Set uniform float.
    pub fn uniform1f(&mut self, location: WebGLUniformLocation, x: f32) {
        self.set_uniform("uniform1f", location, UniformValue::Float(x));
    }

    /// Set uniform vec2.
    pub fn uniform2f(&mut self, location: WebGLUniformLocation, x: f32, y: f32) {
        self.set_uniform("uniform2f", location, UniformValue::Vec2([x, y]));
    }

    /// Set uniform vec3.
    pub fn uniform3f(&mut self, location: WebGLUniformLocation, x: f32, y: f32, z: f32) {
        self.set_uniform("uniform3f", location, UniformValue::Vec3([x, y, z]));
    }

    /// Set uniform vec4.
    pub fn uniform4f(&mut self, location: WebGLUniformLocation, x: f32, y: f32, z: f32, w: f32) {
        self.set_uniform("uniform4f", location, UniformValue::Vec4([x, y, z, w]));
    }

    /// Set uniform int.
    pub fn uniform1i(&mut self, location: WebGLUniformLocation, x: i32) {
        self.set_uniform("uniform1i", location, UniformValue::Int(x));
    }

    /// Set uniform uint (WebGL2).
    pub fn uniform1ui(&mut self, location: WebGLUniformLocation, x: u32) {
        if self.begin_webgl2("uniform1ui") {
            self.store_uniform(location, UniformValue::UInt(x));
        }
    }

    pub fn uniform1fv(&mut self, location: WebGLUniformLocation, value: &[f32]) {
        self.set_float_vector("uniform1fv", location, 1, value);
    }

    pub fn uniform2fv(&mut self, location: WebGLUniformLocation, value: &[f32]) {
        self.set_float_vector("uniform2fv", location, 2, value);
    }

    pub fn uniform3fv(&mut self, location: WebGLUniformLocation, value: &[f32]) {
        self.set_float_vector("uniform3fv", location, 3, value);
    }

    pub fn uniform4fv(&mut self, location: WebGLUniformLocation, value: &[f32]) {
        self.set_float_vector("uniform4fv", location, 4, value);
    }

    pub fn uniform1iv(&mut self, location: WebGLUniformLocation, value: &[i32]) {
        self.set_int_vector("uniform1iv", location, 1, value);
    }

    pub fn uniform2iv(&mut self, location: WebGLUniformLocation, value: &[i32]) {
        self.set_int_vector("uniform2iv", location, 2, value);
    }

    pub fn uniform3iv(&mut self, location: WebGLUniformLocation, value: &[i32]) {
        self.set_int_vector("uniform3iv", location, 3, value);
    }

    pub fn uniform4iv(&mut self, location: WebGLUniformLocation, value: &[i32]) {
        self.set_int_vector("uniform4iv", location, 4, value);
    }

    pub fn uniform1uiv(&mut self, location: WebGLUniformLocation, value: &[u32]) {
        self.set_uint_vector("uniform1uiv", location, 1, value);
    }

    pub fn uniform2uiv(&mut self, location: WebGLUniformLocation, value: &[u32]) {
        self.set_uint_vector("uniform2uiv", location, 2, value);
    }

    pub fn uniform3uiv(&mut self, location: WebGLUniformLocation, value: &[u32]) {
        self.set_uint_vector("uniform3uiv", location, 3, value);
    }

    pub fn uniform4uiv(&mut self, location: WebGLUniformLocation, value: &[u32]) {
        self.set_uint_vector("uniform4uiv", location, 4, value);
    }

    /// Set uniform mat2.
    pub fn uniform_matrix2fv(&mut self, location: WebGLUniformLocation, transpose: bool, value: &[f32]) {
        self.set_matrix("uniformMatrix2fv", location, transpose, 4, value);
    }

    /// Set uniform mat3.
    pub fn uniform_matrix3fv(&mut self, location: WebGLUniformLocation, transpose: bool, value: &[f32]) {
        self.set_matrix("uniformMatrix3fv", location, transpose, 9, value);
    }

    /// Set uniform mat4.
    pub fn uniform_matrix4fv(&mut self, location: WebGLUniformLocation, transpose: bool, value: &[f32]) {
        self.set_matrix("uniformMatrix4fv", location, transpose, 16, value);
    }
}

#[cfg(test)]
mod tests {
    use crate::{constants, ContextAttributes, HtmlCanvas, UniformValue, WebGLRenderingContext};

    const VS: &str = "attribute vec3 aPosition;
attribute vec2 aUv0;
uniform mat4 matrix_model;
uniform float weights[3];
varying vec2 vUv0;
void main() {
    vUv0 = aUv0;
    gl_Position = matrix_model * vec4(aPosition * weights[0], 1.0);
}";

    const FS: &str = "precision mediump float;
uniform sampler2D texture_diffuse;
uniform vec4 tint;
varying vec2 vUv0;
void main() {
    gl_FragColor = texture2D(texture_diffuse, vUv0) * tint;
}";

    fn build(ctx: &mut WebGLRenderingContext, vs: &str, fs: &str) -> crate::WebGLProgram {
        let v = ctx.create_shader(constants::VERTEX_SHADER).unwrap();
        ctx.shader_source(v, vs);
        ctx.compile_shader(v);
        let f = ctx.create_shader(constants::FRAGMENT_SHADER).unwrap();
        ctx.shader_source(f, fs);
        ctx.compile_shader(f);
        let program = ctx.create_program().unwrap();
        ctx.attach_shader(program, v);
        ctx.attach_shader(program, f);
        ctx.link_program(program);
        program
    }

    #[test]
    fn test_create_shader() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let shader = ctx.create_shader(constants::VERTEX_SHADER).unwrap();
        ctx.shader_source(shader, VS);
        ctx.compile_shader(shader);

        let status = ctx.get_shader_parameter(shader, constants::COMPILE_STATUS);
        assert_eq!(status, Some(1));
        assert_eq!(ctx.call_count("compileShader"), 1);
    }

    #[test]
    fn test_compile_error_log() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let shader = ctx.create_shader(constants::FRAGMENT_SHADER).unwrap();
        ctx.shader_source(shader, "uniform vex4 c;\nvoid main() {}");
        ctx.compile_shader(shader);
        assert_eq!(ctx.get_shader_parameter(shader, constants::COMPILE_STATUS), Some(0));
        assert!(ctx.get_shader_info_log(shader).starts_with("ERROR: 0:1:"));
    }

    #[test]
    fn test_create_program() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let program = build(&mut ctx, VS, FS);

        assert_eq!(ctx.get_program_parameter(program, constants::LINK_STATUS), Some(1));
        assert_eq!(ctx.get_program_parameter(program, constants::ACTIVE_ATTRIBUTES), Some(2));
        assert_eq!(ctx.get_program_parameter(program, constants::ACTIVE_UNIFORMS), Some(4));

        let weights = ctx.get_active_uniform(program, 1).unwrap();
        assert_eq!(weights.name, "weights[0]");
        assert_eq!(weights.size, 3);
        assert_eq!(ctx.get_attrib_location(program, "aUv0"), 1);
    }

    #[test]
    fn test_bind_attrib_location() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let v = ctx.create_shader(constants::VERTEX_SHADER).unwrap();
        ctx.shader_source(v, VS);
        ctx.compile_shader(v);
        let f = ctx.create_shader(constants::FRAGMENT_SHADER).unwrap();
        ctx.shader_source(f, FS);
        ctx.compile_shader(f);
        let program = ctx.create_program().unwrap();
        ctx.attach_shader(program, v);
        ctx.attach_shader(program, f);
        ctx.bind_attrib_location(program, 0, "aUv0");
        ctx.link_program(program);

        assert_eq!(ctx.get_attrib_location(program, "aUv0"), 0);
        assert_eq!(ctx.get_attrib_location(program, "aPosition"), 1);
    }

    #[test]
    fn test_varying_mismatch_fails_link() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let fs = "precision mediump float;
varying vec3 vNormal;
void main() { gl_FragColor = vec4(vNormal, 1.0); }";
        let program = build(&mut ctx, VS, fs);
        assert_eq!(ctx.get_program_parameter(program, constants::LINK_STATUS), Some(0));
        assert!(ctx.get_program_info_log(program).contains("vNormal"));
    }

    #[test]
    fn test_uniforms() {
        let mut ctx = WebGLRenderingContext::new(100, 100);
        let program = build(&mut ctx, VS, FS);
        ctx.use_program(Some(program));

        let tint = ctx.get_uniform_location(program, "tint").unwrap();
        ctx.uniform4fv(tint, &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(
            ctx.uniform_value(tint),
            Some(&UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
        );

        let weights = ctx.get_uniform_location(program, "weights").unwrap();
        ctx.uniform1fv(weights, &[1.0, 2.0, 3.0]);
        assert_eq!(
            ctx.uniform_value(weights),
            Some(&UniformValue::FloatArray(vec![1.0, 2.0, 3.0]))
        );

        ctx.uniform4fv(tint, &[1.0, 2.0, 3.0]);
        assert_eq!(ctx.get_error(), constants::INVALID_VALUE);
    }

    #[test]
    fn test_uniform_requires_current_program() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let a = build(&mut ctx, VS, FS);
        let b = build(&mut ctx, VS, FS);
        let tint_a = ctx.get_uniform_location(a, "tint").unwrap();

        ctx.use_program(Some(b));
        ctx.uniform4f(tint_a, 1.0, 1.0, 1.0, 1.0);
        assert_eq!(ctx.get_error(), constants::INVALID_OPERATION);
        assert!(ctx.uniform_value(tint_a).is_none());
    }

    #[test]
    fn test_relink_invalidates_locations() {
        let mut ctx = WebGLRenderingContext::new(10, 10);
        let program = build(&mut ctx, VS, FS);
        let before = ctx.get_uniform_location(program, "tint").unwrap();
        ctx.link_program(program);
        let after = ctx.get_uniform_location(program, "tint").unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_builtin_vertex_inputs() {
        let mut ctx = HtmlCanvas::new(10, 10)
            .get_context("webgl2", &ContextAttributes::default())
            .unwrap();
        let vs = "#version 300 es
in vec4 vertex_position;
void main() { gl_Position = vertex_position + float(gl_VertexID); }";
        let fs = "#version 300 es
precision highp float;
out vec4 color;
void main() { color = vec4(1.0); }";
        let program = build(&mut ctx, vs, fs);
        assert_eq!(ctx.get_program_parameter(program, constants::ACTIVE_ATTRIBUTES), Some(2));
        let builtin = ctx.get_active_attrib(program, 1).unwrap();
        assert_eq!(builtin.name, "gl_VertexID");
        assert_eq!(ctx.get_attrib_location(program, "gl_VertexID"), -1);
    }
}
