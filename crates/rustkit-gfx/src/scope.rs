//! Named uniform values shared between the application and shaders.
//!
//! A [`ScopeSpace`] maps names to [`ScopeId`]s. Shaders resolve their
//! reflected uniforms against it once, after linking; the application writes
//! values through [`ScopeId::set_value`], which advances the id's version so
//! the draw loop knows which uniforms to re-upload.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::handles::{ScopeHandle, TextureHandle};
use crate::version::{Version, VersionedObject};

/// Value held by a [`ScopeId`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    Float(f32),
    /// Vectors, matrices and float arrays.
    FloatArray(Vec<f32>),
    Int(i32),
    /// Integer vectors and arrays.
    IntArray(Vec<i32>),
    Bool(bool),
    Texture(TextureHandle),
    TextureArray(Vec<TextureHandle>),
}

impl ScopeValue {
    /// Whether the value refers to the given texture.
    pub fn references_texture(&self, texture: TextureHandle) -> bool {
        match self {
            ScopeValue::Texture(t) => *t == texture,
            ScopeValue::TextureArray(list) => list.contains(&texture),
            _ => false,
        }
    }
}

impl From<f32> for ScopeValue {
    fn from(value: f32) -> Self {
        ScopeValue::Float(value)
    }
}

impl From<i32> for ScopeValue {
    fn from(value: i32) -> Self {
        ScopeValue::Int(value)
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        ScopeValue::Bool(value)
    }
}

impl From<Vec<f32>> for ScopeValue {
    fn from(value: Vec<f32>) -> Self {
        ScopeValue::FloatArray(value)
    }
}

impl From<&[f32]> for ScopeValue {
    fn from(value: &[f32]) -> Self {
        ScopeValue::FloatArray(value.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for ScopeValue {
    fn from(value: [f32; N]) -> Self {
        ScopeValue::FloatArray(value.to_vec())
    }
}

impl From<Vec<i32>> for ScopeValue {
    fn from(value: Vec<i32>) -> Self {
        ScopeValue::IntArray(value)
    }
}

impl<const N: usize> From<[i32; N]> for ScopeValue {
    fn from(value: [i32; N]) -> Self {
        ScopeValue::IntArray(value.to_vec())
    }
}

impl From<TextureHandle> for ScopeValue {
    fn from(value: TextureHandle) -> Self {
        ScopeValue::Texture(value)
    }
}

impl From<Vec<TextureHandle>> for ScopeValue {
    fn from(value: Vec<TextureHandle>) -> Self {
        ScopeValue::TextureArray(value)
    }
}

/// A named, versioned uniform value.
#[derive(Debug, Clone)]
pub struct ScopeId {
    name: String,
    value: Option<ScopeValue>,
    versioned: VersionedObject,
}

impl ScopeId {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            versioned: VersionedObject::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a value and advance the version.
    pub fn set_value(&mut self, value: impl Into<ScopeValue>) {
        self.value = Some(value.into());
        self.versioned.increment();
    }

    /// Drop the value and advance the version.
    pub fn unset(&mut self) {
        self.value = None;
        self.versioned.increment();
    }

    pub fn value(&self) -> Option<&ScopeValue> {
        self.value.as_ref()
    }

    pub fn version(&self) -> Version {
        self.versioned.version()
    }
}

/// Namespace of [`ScopeId`]s.
#[derive(Debug, Default)]
pub struct ScopeSpace {
    name: String,
    ids: SlotMap<ScopeHandle, ScopeId>,
    by_name: FxHashMap<String, ScopeHandle>,
}

impl ScopeSpace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a name, creating an empty id on first use. Repeated calls with
    /// the same name return the same handle.
    pub fn resolve(&mut self, name: &str) -> ScopeHandle {
        if let Some(&handle) = self.by_name.get(name) {
            return handle;
        }
        let handle = self.ids.insert(ScopeId::new(name));
        self.by_name.insert(name.to_string(), handle);
        handle
    }

    /// Look up a name without creating it.
    pub fn find(&self, name: &str) -> Option<ScopeHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: ScopeHandle) -> Option<&ScopeId> {
        self.ids.get(handle)
    }

    pub fn get_mut(&mut self, handle: ScopeHandle) -> Option<&mut ScopeId> {
        self.ids.get_mut(handle)
    }

    /// Resolve `name` and store `value` in it.
    pub fn set(&mut self, name: &str, value: impl Into<ScopeValue>) -> ScopeHandle {
        let handle = self.resolve(name);
        if let Some(id) = self.ids.get_mut(handle) {
            id.set_value(value);
        }
        handle
    }

    /// Current value of a name, if it exists and is set.
    pub fn value(&self, name: &str) -> Option<&ScopeValue> {
        self.find(name)
            .and_then(|handle| self.ids.get(handle))
            .and_then(ScopeId::value)
    }

    /// Clear every value that refers to `texture`.
    pub fn remove_texture(&mut self, texture: TextureHandle) {
        for id in self.ids.values_mut() {
            if id.value.as_ref().is_some_and(|v| v.references_texture(texture)) {
                id.unset();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
