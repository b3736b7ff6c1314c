//! Device creation options.

use std::path::Path;

use rustkit_common::{Result, RustKitError};
use rustkit_webgl::{ContextAttributes, PowerPreference};
use serde::{Deserialize, Serialize};

/// Capability corrections for a renderer whose reported limits are not
/// usable in practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOverride {
    /// Exact unmasked renderer string.
    pub renderer: String,
    #[serde(default)]
    pub bone_limit: Option<u32>,
    #[serde(default)]
    pub supports_area_lights: Option<bool>,
}

impl CapabilityOverride {
    /// Rows applied to every device before the configured ones.
    pub fn builtin() -> Vec<CapabilityOverride> {
        vec![CapabilityOverride {
            renderer: "Mali-450 MP".to_string(),
            bone_limit: Some(34),
            supports_area_lights: None,
        }]
    }
}

/// Options for creating a [`WebglGraphicsDevice`](crate::WebglGraphicsDevice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceOptions {
    /// Ask for `webgl2` before falling back to WebGL1.
    pub prefer_webgl2: bool,
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub premultiplied_alpha: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
    pub fail_if_major_performance_caveat: bool,
    /// Upper bound on the device pixel ratio applied by `resize_canvas`.
    pub max_pixel_ratio: f32,
    pub capability_overrides: Vec<CapabilityOverride>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            prefer_webgl2: true,
            alpha: true,
            depth: true,
            stencil: true,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::Default,
            fail_if_major_performance_caveat: false,
            max_pixel_ratio: 1.0,
            capability_overrides: Vec::new(),
        }
    }
}

impl DeviceOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RustKitError::config_with_source("invalid device options", e))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Context ids to try, in order.
    pub fn context_ids(&self) -> &'static [&'static str] {
        if self.prefer_webgl2 {
            &["webgl2", "webgl", "experimental-webgl"]
        } else {
            &["webgl", "experimental-webgl"]
        }
    }

    pub fn context_attributes(&self) -> ContextAttributes {
        ContextAttributes {
            alpha: self.alpha,
            depth: self.depth,
            stencil: self.stencil,
            antialias: self.antialias,
            premultiplied_alpha: self.premultiplied_alpha,
            preserve_drawing_buffer: self.preserve_drawing_buffer,
            power_preference: self.power_preference,
            fail_if_major_performance_caveat: self.fail_if_major_performance_caveat,
        }
    }

    /// Built-in override rows followed by the configured ones.
    pub fn overrides(&self) -> impl Iterator<Item = CapabilityOverride> + '_ {
        CapabilityOverride::builtin()
            .into_iter()
            .chain(self.capability_overrides.iter().cloned())
    }
}
