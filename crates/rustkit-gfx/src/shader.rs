//! Shader programs as seen by the application.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::Semantic;
use crate::webgl::shader::WebglShader;

/// Origin of a shader, for statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderTag {
    #[default]
    Default,
    Material,
}

/// Sources and vertex inputs of a shader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderDefinition {
    pub name: String,
    pub vshader: String,
    pub fshader: String,
    /// Vertex input name to semantic.
    pub attributes: BTreeMap<String, Semantic>,
    /// Capture `out_<attribute>` varyings with transform feedback.
    pub use_transform_feedback: bool,
    pub tag: ShaderTag,
}

impl ShaderDefinition {
    pub fn new(name: impl Into<String>, vshader: impl Into<String>, fshader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vshader: vshader.into(),
            fshader: fshader.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, semantic: Semantic) -> Self {
        self.attributes.insert(name.into(), semantic);
        self
    }
}

/// A shader registered with the device.
#[derive(Debug)]
pub struct Shader {
    pub(crate) definition: ShaderDefinition,
    /// Linked and reflected.
    pub(crate) ready: bool,
    /// Compilation, linking or reflection failed.
    pub(crate) failed: bool,
    pub(crate) imp: WebglShader,
}

impl Shader {
    pub(crate) fn new(definition: ShaderDefinition) -> Self {
        Self {
            definition,
            ready: false,
            failed: false,
            imp: WebglShader::default(),
        }
    }

    pub fn definition(&self) -> &ShaderDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn backend(&self) -> &WebglShader {
        &self.imp
    }

    pub(crate) fn lose_context(&mut self) {
        self.ready = false;
        self.failed = false;
        self.imp.lose_context();
    }
}
