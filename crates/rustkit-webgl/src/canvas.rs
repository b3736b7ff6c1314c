//! Canvas element and context negotiation.
//!
//! A [`HtmlCanvas`] hands out rendering contexts by context id the way
//! `HTMLCanvasElement.getContext` does. What the "browser" grants is driven
//! by a [`GpuProfile`], which also decides the limits, extensions and quirks
//! the resulting context reports.

use serde::{Deserialize, Serialize};

use crate::WebGLRenderingContext;

/// WebGL API level of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextVersion {
    WebGL1,
    WebGL2,
}

/// GPU selection hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    Default,
    HighPerformance,
    LowPower,
}

/// Attributes requested when creating a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAttributes {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub premultiplied_alpha: bool,
    pub preserve_drawing_buffer: bool,
    pub power_preference: PowerPreference,
    pub fail_if_major_performance_caveat: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: true,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::Default,
            fail_if_major_performance_caveat: false,
        }
    }
}

/// Limits, extensions and quirks of the simulated GPU/browser pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuProfile {
    pub vendor: String,
    pub renderer: String,
    pub webgl1: bool,
    pub webgl2: bool,
    pub max_texture_size: i32,
    pub max_cube_map_texture_size: i32,
    pub max_renderbuffer_size: i32,
    pub max_texture_image_units: i32,
    pub max_combined_texture_image_units: i32,
    pub max_vertex_texture_image_units: i32,
    pub max_vertex_uniform_vectors: i32,
    pub max_fragment_uniform_vectors: i32,
    pub max_vertex_attribs: i32,
    pub max_draw_buffers: i32,
    pub max_color_attachments: i32,
    pub max_3d_texture_size: i32,
    pub max_samples: i32,
    pub max_anisotropy: f32,
    /// Whether fragment shaders get a real highp float.
    pub fragment_highp: bool,
    /// Whether float / half-float color attachments are actually complete,
    /// independent of what the extensions advertise.
    pub float_render_targets: bool,
    /// Whether the platform decodes `ImageBitmap`s.
    pub image_bitmap: bool,
    pub extensions_webgl1: Vec<String>,
    pub extensions_webgl2: Vec<String>,
    /// Context ids this canvas refuses to create even when the API level is
    /// supported (e.g. a blocklisted `webgl2`).
    #[serde(default)]
    pub blocked_context_ids: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl GpuProfile {
    /// A typical desktop GPU exposing WebGL2 and the common extensions.
    pub fn desktop() -> Self {
        Self {
            vendor: "RustKit".to_string(),
            renderer: "RustKit Software Rasterizer".to_string(),
            webgl1: true,
            webgl2: true,
            max_texture_size: 16384,
            max_cube_map_texture_size: 16384,
            max_renderbuffer_size: 16384,
            max_texture_image_units: 16,
            max_combined_texture_image_units: 32,
            max_vertex_texture_image_units: 16,
            max_vertex_uniform_vectors: 4096,
            max_fragment_uniform_vectors: 1024,
            max_vertex_attribs: 16,
            max_draw_buffers: 8,
            max_color_attachments: 8,
            max_3d_texture_size: 2048,
            max_samples: 4,
            max_anisotropy: 16.0,
            fragment_highp: true,
            float_render_targets: true,
            image_bitmap: true,
            extensions_webgl1: names(&[
                "ANGLE_instanced_arrays",
                "OES_vertex_array_object",
                "OES_element_index_uint",
                "OES_standard_derivatives",
                "OES_texture_float",
                "OES_texture_half_float",
                "OES_texture_float_linear",
                "OES_texture_half_float_linear",
                "WEBGL_color_buffer_float",
                "EXT_color_buffer_half_float",
                "EXT_blend_minmax",
                "EXT_frag_depth",
                "EXT_shader_texture_lod",
                "EXT_sRGB",
                "WEBGL_depth_texture",
                "WEBGL_draw_buffers",
                "EXT_texture_filter_anisotropic",
                "WEBGL_debug_renderer_info",
                "WEBGL_lose_context",
                "WEBGL_compressed_texture_s3tc",
            ]),
            extensions_webgl2: names(&[
                "EXT_color_buffer_float",
                "EXT_color_buffer_half_float",
                "OES_texture_float_linear",
                "EXT_texture_filter_anisotropic",
                "WEBGL_debug_renderer_info",
                "WEBGL_lose_context",
                "WEBGL_compressed_texture_s3tc",
                "EXT_disjoint_timer_query_webgl2",
                "KHR_parallel_shader_compile",
            ]),
            blocked_context_ids: Vec::new(),
        }
    }

    /// A low-end mobile GPU that only exposes WebGL1, 8 texture units, no
    /// highp in fragment shaders and no float render targets.
    pub fn mali_450() -> Self {
        Self {
            vendor: "ARM".to_string(),
            renderer: "Mali-450 MP".to_string(),
            webgl1: true,
            webgl2: false,
            max_texture_size: 4096,
            max_cube_map_texture_size: 4096,
            max_renderbuffer_size: 4096,
            max_texture_image_units: 8,
            max_combined_texture_image_units: 8,
            max_vertex_texture_image_units: 0,
            max_vertex_uniform_vectors: 256,
            max_fragment_uniform_vectors: 224,
            max_vertex_attribs: 16,
            max_draw_buffers: 1,
            max_color_attachments: 1,
            max_3d_texture_size: 0,
            max_samples: 0,
            max_anisotropy: 1.0,
            fragment_highp: false,
            float_render_targets: false,
            image_bitmap: false,
            extensions_webgl1: names(&[
                "ANGLE_instanced_arrays",
                "OES_vertex_array_object",
                "OES_element_index_uint",
                "OES_standard_derivatives",
                "OES_texture_half_float",
                "WEBGL_debug_renderer_info",
                "WEBGL_lose_context",
            ]),
            extensions_webgl2: Vec::new(),
            blocked_context_ids: Vec::new(),
        }
    }

    /// A desktop profile whose driver advertises float color buffers but
    /// reports such framebuffers as incomplete.
    pub fn broken_float_targets() -> Self {
        Self {
            renderer: "RustKit Quirky Rasterizer".to_string(),
            float_render_targets: false,
            ..Self::desktop()
        }
    }

    /// Restrict the profile to WebGL1.
    pub fn webgl1_only(mut self) -> Self {
        self.webgl2 = false;
        self
    }

    /// Extensions reported for the given API level.
    pub fn extensions(&self, version: ContextVersion) -> &[String] {
        match version {
            ContextVersion::WebGL1 => &self.extensions_webgl1,
            ContextVersion::WebGL2 => &self.extensions_webgl2,
        }
    }

    /// Remove an extension from both API levels.
    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions_webgl1.retain(|e| e != name);
        self.extensions_webgl2.retain(|e| e != name);
        self
    }
}

impl Default for GpuProfile {
    fn default() -> Self {
        Self::desktop()
    }
}

/// A canvas element the device renders into.
#[derive(Debug, Clone)]
pub struct HtmlCanvas {
    /// Backing store width in device pixels.
    pub width: u32,
    /// Backing store height in device pixels.
    pub height: u32,
    /// `window.devicePixelRatio`; `None` outside a browser.
    pub device_pixel_ratio: Option<f32>,
    profile: GpuProfile,
}

impl HtmlCanvas {
    /// Create a canvas backed by the default desktop profile.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_profile(width, height, GpuProfile::desktop())
    }

    /// Create a canvas backed by a specific GPU profile.
    pub fn with_profile(width: u32, height: u32, profile: GpuProfile) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: Some(1.0),
            profile,
        }
    }

    /// Set the device pixel ratio.
    pub fn with_device_pixel_ratio(mut self, ratio: Option<f32>) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// GPU profile backing this canvas.
    pub fn profile(&self) -> &GpuProfile {
        &self.profile
    }

    /// Request a rendering context by id (`webgl2`, `webgl`,
    /// `experimental-webgl`). Returns `None` when the browser refuses.
    pub fn get_context(
        &self,
        context_id: &str,
        attributes: &ContextAttributes,
    ) -> Option<WebGLRenderingContext> {
        if self.profile.blocked_context_ids.iter().any(|id| id == context_id) {
            return None;
        }

        let version = match context_id {
            "webgl2" if self.profile.webgl2 => ContextVersion::WebGL2,
            "webgl" | "experimental-webgl" if self.profile.webgl1 => ContextVersion::WebGL1,
            _ => return None,
        };

        Some(WebGLRenderingContext::with_profile(
            version,
            self.width,
            self.height,
            attributes.clone(),
            self.profile.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_context_versions() {
        let canvas = HtmlCanvas::new(64, 32);
        let attrs = ContextAttributes::default();

        let gl2 = canvas.get_context("webgl2", &attrs).unwrap();
        assert_eq!(gl2.version(), ContextVersion::WebGL2);
        assert_eq!(gl2.drawing_buffer_width(), 64);

        let gl1 = canvas.get_context("experimental-webgl", &attrs).unwrap();
        assert_eq!(gl1.version(), ContextVersion::WebGL1);

        assert!(canvas.get_context("2d", &attrs).is_none());
    }

    #[test]
    fn test_webgl1_only_profile() {
        let canvas = HtmlCanvas::with_profile(8, 8, GpuProfile::mali_450());
        let attrs = ContextAttributes::default();
        assert!(canvas.get_context("webgl2", &attrs).is_none());
        assert!(canvas.get_context("webgl", &attrs).is_some());
    }

    #[test]
    fn test_blocked_context_id() {
        let mut profile = GpuProfile::desktop();
        profile.blocked_context_ids.push("webgl".to_string());
        let canvas = HtmlCanvas::with_profile(8, 8, profile);
        let attrs = ContextAttributes::default();
        assert!(canvas.get_context("webgl", &attrs).is_none());
        assert!(canvas.get_context("experimental-webgl", &attrs).is_some());
    }
}
