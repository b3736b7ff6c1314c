//! Extension negotiation and capability detection.
//!
//! WebGL1 reaches instancing and vertex array objects through extensions.
//! [`InstancingOps`] and [`VertexArrayOps`] select the entry points once at
//! device creation so the draw path never branches on the API level.

use rustkit_webgl::{
    constants as gl_const, WebGLRenderingContext, WebGLVertexArrayObject,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CapabilityOverride;

/// Instanced drawing entry points.
#[derive(Clone, Copy)]
pub struct InstancingOps {
    pub draw_arrays_instanced: fn(&mut WebGLRenderingContext, u32, i32, i32, i32),
    pub draw_elements_instanced: fn(&mut WebGLRenderingContext, u32, i32, u32, i32, i32),
    pub vertex_attrib_divisor: fn(&mut WebGLRenderingContext, u32, u32),
}

impl InstancingOps {
    pub const WEBGL2: InstancingOps = InstancingOps {
        draw_arrays_instanced: WebGLRenderingContext::draw_arrays_instanced,
        draw_elements_instanced: WebGLRenderingContext::draw_elements_instanced,
        vertex_attrib_divisor: WebGLRenderingContext::vertex_attrib_divisor,
    };

    /// `ANGLE_instanced_arrays`.
    pub const ANGLE: InstancingOps = InstancingOps {
        draw_arrays_instanced: WebGLRenderingContext::draw_arrays_instanced_angle,
        draw_elements_instanced: WebGLRenderingContext::draw_elements_instanced_angle,
        vertex_attrib_divisor: WebGLRenderingContext::vertex_attrib_divisor_angle,
    };
}

impl std::fmt::Debug for InstancingOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancingOps").finish_non_exhaustive()
    }
}

/// Vertex array object entry points.
#[derive(Clone, Copy)]
pub struct VertexArrayOps {
    pub create: fn(&mut WebGLRenderingContext) -> Option<WebGLVertexArrayObject>,
    pub bind: fn(&mut WebGLRenderingContext, Option<WebGLVertexArrayObject>),
    pub delete: fn(&mut WebGLRenderingContext, WebGLVertexArrayObject),
}

impl VertexArrayOps {
    pub const WEBGL2: VertexArrayOps = VertexArrayOps {
        create: WebGLRenderingContext::create_vertex_array,
        bind: WebGLRenderingContext::bind_vertex_array,
        delete: WebGLRenderingContext::delete_vertex_array,
    };

    /// `OES_vertex_array_object`.
    pub const OES: VertexArrayOps = VertexArrayOps {
        create: WebGLRenderingContext::create_vertex_array_oes,
        bind: WebGLRenderingContext::bind_vertex_array_oes,
        delete: WebGLRenderingContext::delete_vertex_array_oes,
    };
}

impl std::fmt::Debug for VertexArrayOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexArrayOps").finish_non_exhaustive()
    }
}

/// Enable the first supported name of an extension.
fn get_extension(gl: &mut WebGLRenderingContext, names: &[&'static str]) -> Option<&'static str> {
    names.iter().copied().find(|name| gl.get_extension(name))
}

/// Extensions enabled on the context. Each field holds the name that
/// answered, `None` when unsupported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extensions {
    pub instancing: Option<&'static str>,
    pub vertex_array_object: Option<&'static str>,
    pub uint_element: Option<&'static str>,
    pub standard_derivatives: Option<&'static str>,
    pub texture_float: Option<&'static str>,
    pub texture_half_float: Option<&'static str>,
    pub texture_float_linear: Option<&'static str>,
    pub texture_half_float_linear: Option<&'static str>,
    pub color_buffer_float: Option<&'static str>,
    pub color_buffer_half_float: Option<&'static str>,
    pub blend_minmax: Option<&'static str>,
    pub frag_depth: Option<&'static str>,
    pub shader_texture_lod: Option<&'static str>,
    pub srgb: Option<&'static str>,
    pub depth_texture: Option<&'static str>,
    pub draw_buffers: Option<&'static str>,
    pub texture_filter_anisotropic: Option<&'static str>,
    pub debug_renderer_info: Option<&'static str>,
    pub lose_context: Option<&'static str>,
    pub compressed_texture_s3tc: Option<&'static str>,
    pub disjoint_timer_query: Option<&'static str>,
    pub parallel_shader_compile: Option<&'static str>,
}

impl Extensions {
    /// Enable every extension the device uses.
    pub fn negotiate(gl: &mut WebGLRenderingContext) -> Self {
        let webgl2 = gl.is_webgl2();
        let mut ext = Extensions {
            texture_filter_anisotropic: get_extension(
                gl,
                &["EXT_texture_filter_anisotropic", "WEBKIT_EXT_texture_filter_anisotropic"],
            ),
            debug_renderer_info: get_extension(gl, &["WEBGL_debug_renderer_info"]),
            lose_context: get_extension(gl, &["WEBGL_lose_context"]),
            compressed_texture_s3tc: get_extension(
                gl,
                &["WEBGL_compressed_texture_s3tc", "WEBKIT_WEBGL_compressed_texture_s3tc"],
            ),
            texture_float_linear: get_extension(gl, &["OES_texture_float_linear"]),
            color_buffer_half_float: get_extension(gl, &["EXT_color_buffer_half_float"]),
            ..Extensions::default()
        };

        if webgl2 {
            ext.color_buffer_float = get_extension(gl, &["EXT_color_buffer_float"]);
            ext.disjoint_timer_query = get_extension(gl, &["EXT_disjoint_timer_query_webgl2"]);
            ext.parallel_shader_compile = get_extension(gl, &["KHR_parallel_shader_compile"]);
        } else {
            ext.instancing = get_extension(gl, &["ANGLE_instanced_arrays"]);
            ext.vertex_array_object = get_extension(gl, &["OES_vertex_array_object"]);
            ext.uint_element = get_extension(gl, &["OES_element_index_uint"]);
            ext.standard_derivatives = get_extension(gl, &["OES_standard_derivatives"]);
            ext.texture_float = get_extension(gl, &["OES_texture_float"]);
            ext.texture_half_float = get_extension(gl, &["OES_texture_half_float"]);
            ext.texture_half_float_linear = get_extension(gl, &["OES_texture_half_float_linear"]);
            ext.color_buffer_float = get_extension(gl, &["WEBGL_color_buffer_float"]);
            ext.blend_minmax = get_extension(gl, &["EXT_blend_minmax"]);
            ext.frag_depth = get_extension(gl, &["EXT_frag_depth"]);
            ext.shader_texture_lod = get_extension(gl, &["EXT_shader_texture_lod"]);
            ext.srgb = get_extension(gl, &["EXT_sRGB"]);
            ext.depth_texture = get_extension(
                gl,
                &["WEBGL_depth_texture", "WEBKIT_WEBGL_depth_texture"],
            );
            ext.draw_buffers = get_extension(gl, &["WEBGL_draw_buffers"]);
        }

        debug!(
            webgl2,
            instancing = ext.instancing.is_some() || webgl2,
            vertex_arrays = ext.vertex_array_object.is_some() || webgl2,
            anisotropic = ext.texture_filter_anisotropic.is_some(),
            "Extensions negotiated"
        );
        ext
    }

    /// Instancing entry points, `None` when instancing is unavailable.
    pub fn instancing_ops(&self, webgl2: bool) -> Option<InstancingOps> {
        if webgl2 {
            Some(InstancingOps::WEBGL2)
        } else {
            self.instancing.map(|_| InstancingOps::ANGLE)
        }
    }

    /// Vertex array entry points, `None` when VAOs are unavailable.
    pub fn vertex_array_ops(&self, webgl2: bool) -> Option<VertexArrayOps> {
        if webgl2 {
            Some(VertexArrayOps::WEBGL2)
        } else {
            self.vertex_array_object.map(|_| VertexArrayOps::OES)
        }
    }
}

/// Float precision qualifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Lowp,
    Mediump,
    #[default]
    Highp,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Lowp => "lowp",
            Precision::Mediump => "mediump",
            Precision::Highp => "highp",
        }
    }
}

/// Highest float precision both stages support.
fn query_precision(gl: &mut WebGLRenderingContext) -> Precision {
    let supports = |gl: &mut WebGLRenderingContext, precision: u32| {
        [gl_const::VERTEX_SHADER, gl_const::FRAGMENT_SHADER]
            .into_iter()
            .all(|stage| {
                gl.get_shader_precision_format(stage, precision)
                    .is_some_and(|format| format.precision > 0)
            })
    };
    if supports(gl, gl_const::HIGH_FLOAT) {
        Precision::Highp
    } else if supports(gl, gl_const::MEDIUM_FLOAT) {
        Precision::Mediump
    } else {
        Precision::Lowp
    }
}

/// Whether a 1x1 texture of the given format can be rendered to. Leaves
/// texture unit 0 and the framebuffer binding cleared.
fn test_renderable(gl: &mut WebGLRenderingContext, internal_format: u32, type_: u32) -> bool {
    let Some(texture) = gl.create_texture() else {
        return false;
    };
    gl.bind_texture(gl_const::TEXTURE_2D, Some(texture));
    gl.tex_parameteri(gl_const::TEXTURE_2D, gl_const::TEXTURE_MIN_FILTER, gl_const::NEAREST as i32);
    gl.tex_parameteri(gl_const::TEXTURE_2D, gl_const::TEXTURE_MAG_FILTER, gl_const::NEAREST as i32);
    gl.tex_image_2d(
        gl_const::TEXTURE_2D,
        0,
        internal_format as i32,
        1,
        1,
        0,
        gl_const::RGBA,
        type_,
        None,
    );
    let framebuffer = gl.create_framebuffer();
    gl.bind_framebuffer(gl_const::FRAMEBUFFER, framebuffer);
    gl.framebuffer_texture_2d(
        gl_const::FRAMEBUFFER,
        gl_const::COLOR_ATTACHMENT0,
        gl_const::TEXTURE_2D,
        Some(texture),
        0,
    );
    let complete = gl.check_framebuffer_status(gl_const::FRAMEBUFFER) == gl_const::FRAMEBUFFER_COMPLETE;

    gl.bind_texture(gl_const::TEXTURE_2D, None);
    gl.delete_texture(texture);
    gl.bind_framebuffer(gl_const::FRAMEBUFFER, None);
    if let Some(fb) = framebuffer {
        gl.delete_framebuffer(fb);
    }
    // Discard errors raised by unsupported formats.
    let _ = gl.get_error();
    complete
}

/// Limits and feature flags of the device.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceCapabilities {
    pub webgl2: bool,
    pub unmasked_vendor: Option<String>,
    pub unmasked_renderer: Option<String>,
    pub max_texture_size: u32,
    pub max_cube_map_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_volume_size: u32,
    /// Fragment texture units.
    pub max_textures: u32,
    pub max_combined_textures: u32,
    pub max_vertex_textures: u32,
    pub vertex_uniforms_count: u32,
    pub fragment_uniforms_count: u32,
    pub max_draw_buffers: u32,
    pub max_color_attachments: u32,
    pub max_samples: u32,
    pub max_anisotropy: f32,
    pub precision: Precision,
    pub supports_instancing: bool,
    pub supports_vertex_arrays: bool,
    pub supports_uint_indices: bool,
    pub supports_bone_textures: bool,
    pub supports_area_lights: bool,
    pub supports_depth_shadow: bool,
    pub texture_float_renderable: bool,
    pub texture_half_float_renderable: bool,
    pub texture_float_filterable: bool,
    pub texture_half_float_filterable: bool,
    pub bone_limit: u32,
    /// `ImageBitmap` decode support; unknown until the first frame.
    pub supports_image_bitmap: Option<bool>,
}

/// Vertex uniform vectors reserved for the view, model and skinning
/// matrices before bones are counted.
const RESERVED_VERTEX_UNIFORMS: u32 = 16 + 8 + 1 + 16;
const MAX_BONES: u32 = 128;

impl DeviceCapabilities {
    /// Query limits and run the renderability probes. `ext` must already be
    /// negotiated on `gl`.
    pub fn probe(
        gl: &mut WebGLRenderingContext,
        ext: &Extensions,
        overrides: impl IntoIterator<Item = CapabilityOverride>,
    ) -> Self {
        let webgl2 = gl.is_webgl2();
        let int = |gl: &mut WebGLRenderingContext, pname: u32| {
            gl.get_parameter_i32(pname).unwrap_or(0).max(0) as u32
        };

        let max_textures = int(gl, gl_const::MAX_TEXTURE_IMAGE_UNITS);
        let vertex_uniforms_count = int(gl, gl_const::MAX_VERTEX_UNIFORM_VECTORS);
        let (max_draw_buffers, max_color_attachments) = if webgl2 || ext.draw_buffers.is_some() {
            (
                int(gl, gl_const::MAX_DRAW_BUFFERS),
                int(gl, gl_const::MAX_COLOR_ATTACHMENTS),
            )
        } else {
            (1, 1)
        };
        let (max_volume_size, max_samples) = if webgl2 {
            (int(gl, gl_const::MAX_3D_TEXTURE_SIZE), int(gl, gl_const::MAX_SAMPLES))
        } else {
            (1, 1)
        };
        let max_anisotropy = match ext.texture_filter_anisotropic {
            Some(_) => gl
                .get_parameter_f32(gl_const::MAX_TEXTURE_MAX_ANISOTROPY_EXT)
                .unwrap_or(1.0),
            None => 1.0,
        };
        let (unmasked_vendor, unmasked_renderer) = match ext.debug_renderer_info {
            Some(_) => (
                gl.get_parameter_string(gl_const::UNMASKED_VENDOR_WEBGL),
                gl.get_parameter_string(gl_const::UNMASKED_RENDERER_WEBGL),
            ),
            None => (None, None),
        };

        let precision = query_precision(gl);
        if precision != Precision::Highp {
            warn!(
                precision = precision.as_str(),
                "highp is not supported, using a lower precision"
            );
        }

        let float_candidate = if webgl2 {
            ext.color_buffer_float.is_some()
        } else {
            ext.texture_float.is_some()
        };
        let half_candidate = if webgl2 {
            ext.color_buffer_float.is_some() || ext.color_buffer_half_float.is_some()
        } else {
            ext.texture_half_float.is_some()
        };
        let texture_float_renderable = float_candidate
            && if webgl2 {
                test_renderable(gl, gl_const::RGBA32F, gl_const::FLOAT)
            } else {
                test_renderable(gl, gl_const::RGBA, gl_const::FLOAT)
            };
        let texture_half_float_renderable = half_candidate
            && if webgl2 {
                test_renderable(gl, gl_const::RGBA16F, gl_const::HALF_FLOAT)
            } else {
                test_renderable(gl, gl_const::RGBA, gl_const::HALF_FLOAT_OES)
            };
        if float_candidate && !texture_float_renderable {
            warn!("Float render targets advertised but incomplete");
        }

        let mut caps = Self {
            webgl2,
            unmasked_vendor,
            unmasked_renderer,
            max_texture_size: int(gl, gl_const::MAX_TEXTURE_SIZE),
            max_cube_map_size: int(gl, gl_const::MAX_CUBE_MAP_TEXTURE_SIZE),
            max_renderbuffer_size: int(gl, gl_const::MAX_RENDERBUFFER_SIZE),
            max_volume_size,
            max_textures,
            max_combined_textures: int(gl, gl_const::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
            max_vertex_textures: int(gl, gl_const::MAX_VERTEX_TEXTURE_IMAGE_UNITS),
            vertex_uniforms_count,
            fragment_uniforms_count: int(gl, gl_const::MAX_FRAGMENT_UNIFORM_VECTORS),
            max_draw_buffers,
            max_color_attachments,
            max_samples,
            max_anisotropy,
            precision,
            supports_instancing: webgl2 || ext.instancing.is_some(),
            supports_vertex_arrays: webgl2 || ext.vertex_array_object.is_some(),
            supports_uint_indices: webgl2 || ext.uint_element.is_some(),
            supports_bone_textures: false,
            supports_area_lights: max_textures > 8,
            supports_depth_shadow: webgl2 || ext.depth_texture.is_some(),
            texture_float_renderable,
            texture_half_float_renderable,
            texture_float_filterable: ext.texture_float_linear.is_some(),
            texture_half_float_filterable: webgl2 || ext.texture_half_float_linear.is_some(),
            bone_limit: (vertex_uniforms_count.saturating_sub(RESERVED_VERTEX_UNIFORMS) / 3)
                .min(MAX_BONES),
            supports_image_bitmap: None,
        };
        caps.supports_bone_textures = caps.max_vertex_textures > 0
            && (caps.texture_float_renderable || webgl2 || ext.texture_float.is_some());
        caps.apply_overrides(overrides);
        caps
    }

    /// Apply the rows matching this renderer.
    pub fn apply_overrides(&mut self, overrides: impl IntoIterator<Item = CapabilityOverride>) {
        let Some(renderer) = self.unmasked_renderer.as_deref() else {
            return;
        };
        for row in overrides.into_iter().filter(|row| row.renderer == renderer) {
            debug!(renderer, ?row, "Applying capability override");
            if let Some(limit) = row.bone_limit {
                self.bone_limit = limit;
            }
            if let Some(area_lights) = row.supports_area_lights {
                self.supports_area_lights = area_lights;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_webgl::{ContextAttributes, GpuProfile, HtmlCanvas};

    fn context(id: &str, profile: GpuProfile) -> WebGLRenderingContext {
        HtmlCanvas::with_profile(4, 4, profile)
            .get_context(id, &ContextAttributes::default())
            .unwrap()
    }

    fn probe(id: &str, profile: GpuProfile) -> (Extensions, DeviceCapabilities) {
        let mut gl = context(id, profile);
        let ext = Extensions::negotiate(&mut gl);
        let caps = DeviceCapabilities::probe(&mut gl, &ext, CapabilityOverride::builtin());
        (ext, caps)
    }

    #[test]
    fn test_webgl2_capabilities() {
        let (ext, caps) = probe("webgl2", GpuProfile::desktop());
        assert!(caps.webgl2);
        assert!(caps.supports_instancing);
        assert!(caps.texture_float_renderable);
        assert!(caps.texture_half_float_renderable);
        assert_eq!(caps.precision, Precision::Highp);
        assert_eq!(caps.max_anisotropy, 16.0);
        assert_eq!(caps.bone_limit, 128);
        assert!(caps.supports_area_lights);
        assert!(ext.instancing_ops(true).is_some());
        assert_eq!(caps.supports_image_bitmap, None);
    }

    #[test]
    fn test_webgl1_entry_points_from_extensions() {
        let (ext, caps) = probe("webgl", GpuProfile::desktop());
        assert!(!caps.webgl2);
        assert_eq!(ext.instancing, Some("ANGLE_instanced_arrays"));
        assert!(ext.vertex_array_ops(false).is_some());

        let profile = GpuProfile::desktop()
            .without_extension("ANGLE_instanced_arrays")
            .without_extension("OES_vertex_array_object");
        let (ext, caps) = probe("webgl", profile);
        assert!(!caps.supports_instancing);
        assert!(ext.instancing_ops(false).is_none());
        assert!(ext.vertex_array_ops(false).is_none());
    }

    #[test]
    fn test_float_probe_catches_broken_driver() {
        let (ext, caps) = probe("webgl2", GpuProfile::broken_float_targets());
        assert!(ext.color_buffer_float.is_some());
        assert!(!caps.texture_float_renderable);
        assert!(!caps.texture_half_float_renderable);
    }

    #[test]
    fn test_mali_overrides() {
        let (_, caps) = probe("webgl", GpuProfile::mali_450());
        assert_eq!(caps.unmasked_renderer.as_deref(), Some("Mali-450 MP"));
        // (256 - 41) / 3 = 71 before the override.
        assert_eq!(caps.bone_limit, 34);
        assert!(!caps.supports_area_lights);
        assert_eq!(caps.precision, Precision::Mediump);
        assert!(!caps.texture_float_renderable);
        assert!(!caps.supports_bone_textures);
    }

    #[test]
    fn test_configured_override_row() {
        let mut gl = context("webgl2", GpuProfile::desktop());
        let ext = Extensions::negotiate(&mut gl);
        let row = CapabilityOverride {
            renderer: "RustKit Software Rasterizer".to_string(),
            bone_limit: None,
            supports_area_lights: Some(false),
        };
        let caps = DeviceCapabilities::probe(&mut gl, &ext, vec![row]);
        assert!(!caps.supports_area_lights);
        assert_eq!(caps.bone_limit, 128);
    }

    #[test]
    fn test_probe_leaves_bindings_clear() {
        let mut gl = context("webgl2", GpuProfile::desktop());
        let ext = Extensions::negotiate(&mut gl);
        DeviceCapabilities::probe(&mut gl, &ext, Vec::new());
        assert_eq!(gl.bound_texture(0, gl_const::TEXTURE_2D), None);
        assert_eq!(gl.bound_framebuffer(gl_const::FRAMEBUFFER), None);
    }
}
