//! Texture creation, upload and sampling parameters.

use rustkit_webgl::{constants as gl_const, WebGLRenderingContext, WebGLTexture};
use tracing::trace;

use crate::constants::{AddressMode, GlFormat, TextureDimension};
use crate::texture::{Texture, TextureParams};

/// Native state of a texture.
#[derive(Debug, Default)]
pub struct WebglTexture {
    pub(crate) handle: Option<WebGLTexture>,
    pub(crate) target: u32,
    pub(crate) gl_format: Option<GlFormat>,
    generation: u64,
}

impl WebglTexture {
    pub fn handle(&self) -> Option<WebGLTexture> {
        self.handle
    }

    /// Whether the handle was created in the given context generation.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    pub(crate) fn destroy(&mut self, gl: &mut WebGLRenderingContext) {
        if let Some(handle) = self.handle.take() {
            gl.delete_texture(handle);
        }
    }

    pub(crate) fn lose_context(&mut self) {
        self.handle = None;
    }
}

/// Create the native texture object. The caller binds it.
pub(crate) fn initialize(
    gl: &mut WebGLRenderingContext,
    texture: &mut Texture,
    generation: u64,
) -> Option<WebGLTexture> {
    let handle = gl.create_texture()?;
    let webgl2 = gl.is_webgl2();
    texture.imp = WebglTexture {
        handle: Some(handle),
        target: texture.dimension().to_gl(),
        gl_format: Some(texture.format().to_gl(webgl2)),
        generation,
    };
    texture.dirty_all();
    Some(handle)
}

/// Apply every dirty sampling parameter to the bound texture.
pub(crate) fn apply_parameters(
    gl: &mut WebGLRenderingContext,
    texture: &mut Texture,
    max_anisotropy: Option<f32>,
) {
    let flags = texture.dirty;
    if flags.is_empty() {
        return;
    }
    let target = texture.imp.target;
    let webgl2 = gl.is_webgl2();
    let npot_limited = !webgl2 && !texture.is_pot();

    if flags.contains(TextureParams::MIN_FILTER) {
        let mut filter = texture.min_filter();
        if !texture.mipmaps() || npot_limited {
            filter = filter.without_mipmaps();
        }
        gl.tex_parameteri(target, gl_const::TEXTURE_MIN_FILTER, filter.to_gl() as i32);
    }
    if flags.contains(TextureParams::MAG_FILTER) {
        gl.tex_parameteri(
            target,
            gl_const::TEXTURE_MAG_FILTER,
            texture.mag_filter().to_gl() as i32,
        );
    }
    let wrap = |mode: AddressMode| {
        if npot_limited {
            AddressMode::ClampToEdge.to_gl() as i32
        } else {
            mode.to_gl() as i32
        }
    };
    if flags.contains(TextureParams::ADDRESS_U) {
        gl.tex_parameteri(target, gl_const::TEXTURE_WRAP_S, wrap(texture.address_u()));
    }
    if flags.contains(TextureParams::ADDRESS_V) {
        gl.tex_parameteri(target, gl_const::TEXTURE_WRAP_T, wrap(texture.address_v()));
    }
    if webgl2 {
        if flags.contains(TextureParams::ADDRESS_W) {
            gl.tex_parameteri(
                target,
                gl_const::TEXTURE_WRAP_R,
                texture.address_w().to_gl() as i32,
            );
        }
        if flags.contains(TextureParams::COMPARE_ON_READ) {
            let mode = if texture.compare_on_read() {
                gl_const::COMPARE_REF_TO_TEXTURE
            } else {
                gl_const::NONE
            };
            gl.tex_parameteri(target, gl_const::TEXTURE_COMPARE_MODE, mode as i32);
        }
        if flags.contains(TextureParams::COMPARE_FUNC) {
            gl.tex_parameteri(
                target,
                gl_const::TEXTURE_COMPARE_FUNC,
                texture.compare_func().to_gl() as i32,
            );
        }
    }
    if flags.contains(TextureParams::ANISOTROPY) {
        if let Some(max) = max_anisotropy {
            let value = texture.anisotropy().round().clamp(1.0, max.max(1.0));
            gl.tex_parameterf(target, gl_const::TEXTURE_MAX_ANISOTROPY_EXT, value);
        }
    }

    texture.dirty = TextureParams::empty();
}

/// Upload every level of the bound texture and generate the remaining mip
/// chain when allowed. Returns the bytes now resident on the GPU.
pub(crate) fn upload(gl: &mut WebGLRenderingContext, texture: &mut Texture) -> usize {
    let Some(format) = texture.imp.gl_format else {
        return texture.gpu_size;
    };
    let dimension = texture.dimension();
    let target = texture.imp.target;

    for (level, faces) in texture.levels().iter().enumerate() {
        let (width, height, depth) = texture.level_size(level);
        let (width, height, depth) = (width as i32, height as i32, depth as i32);
        for (face, data) in faces.iter().enumerate() {
            let data = data.as_deref();
            match dimension {
                TextureDimension::D2 | TextureDimension::Cube => {
                    let face_target = if dimension == TextureDimension::Cube {
                        gl_const::TEXTURE_CUBE_MAP_POSITIVE_X + face as u32
                    } else {
                        target
                    };
                    gl.tex_image_2d(
                        face_target,
                        level as i32,
                        format.internal_format as i32,
                        width,
                        height,
                        0,
                        format.format,
                        format.type_,
                        data,
                    );
                }
                TextureDimension::D3 | TextureDimension::D2Array => {
                    gl.tex_image_3d(
                        target,
                        level as i32,
                        format.internal_format as i32,
                        width,
                        height,
                        depth,
                        0,
                        format.format,
                        format.type_,
                        data,
                    );
                }
            }
        }
    }

    let can_generate = texture.is_pot() || gl.is_webgl2();
    if texture.mipmaps()
        && texture.needs_mipmaps_upload
        && texture.levels().len() == 1
        && can_generate
        && !texture.format().is_depth()
    {
        gl.generate_mipmap(target);
    }

    trace!(
        texture = texture.name(),
        width = texture.width(),
        height = texture.height(),
        levels = texture.levels().len(),
        "Texture uploaded"
    );

    texture.needs_upload = false;
    texture.needs_mipmaps_upload = false;
    texture.expected_gpu_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FilterMode;
    use crate::texture::TextureDescriptor;

    fn bound(gl: &mut WebGLRenderingContext, desc: TextureDescriptor) -> Texture {
        let mut texture = Texture::new(desc);
        let handle = initialize(gl, &mut texture, 0).unwrap();
        gl.bind_texture(texture.imp.target, Some(handle));
        texture
    }

    #[test]
    fn test_min_filter_downgrade_without_mipmaps() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut texture = bound(
            &mut gl,
            TextureDescriptor {
                mipmaps: false,
                ..TextureDescriptor::default()
            },
        );
        apply_parameters(&mut gl, &mut texture, None);
        let data = gl.get_texture_data(texture.imp.handle.unwrap()).unwrap();
        assert_eq!(data.min_filter, gl_const::LINEAR);
        assert!(texture.dirty.is_empty());
    }

    #[test]
    fn test_npot_clamps_on_webgl1() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut texture = bound(
            &mut gl,
            TextureDescriptor {
                width: 3,
                height: 5,
                ..TextureDescriptor::default()
            },
        );
        texture.set_min_filter(FilterMode::NearestMipmapNearest);
        apply_parameters(&mut gl, &mut texture, None);
        let data = gl.get_texture_data(texture.imp.handle.unwrap()).unwrap();
        assert_eq!(data.wrap_s, gl_const::CLAMP_TO_EDGE);
        assert_eq!(data.wrap_t, gl_const::CLAMP_TO_EDGE);
        assert_eq!(data.min_filter, gl_const::NEAREST);
    }

    #[test]
    fn test_upload_generates_mipmaps_for_pot() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut texture = bound(&mut gl, TextureDescriptor::default());
        let size = upload(&mut gl, &mut texture);
        assert_eq!(gl.call_count("texImage2D"), 1);
        assert_eq!(gl.call_count("generateMipmap"), 1);
        assert!(!texture.needs_upload);
        assert_eq!(size, texture.expected_gpu_size());
    }

    #[test]
    fn test_cube_uploads_six_faces() {
        let mut gl = WebGLRenderingContext::new(4, 4);
        let mut texture = bound(
            &mut gl,
            TextureDescriptor {
                dimension: TextureDimension::Cube,
                mipmaps: false,
                ..TextureDescriptor::default()
            },
        );
        upload(&mut gl, &mut texture);
        assert_eq!(gl.call_count("texImage2D"), 6);
        assert_eq!(gl.call_count("generateMipmap"), 0);
    }
}
