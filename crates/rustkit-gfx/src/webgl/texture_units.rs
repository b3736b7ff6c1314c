//! Texture unit bindings.

use rustkit_webgl::constants as gl_const;
use tracing::trace;

use crate::constants::FilterMode;
use crate::handles::TextureHandle;
use crate::texture::TextureDescriptor;

use super::{texture, ContextState, WebglGraphicsDevice};

impl WebglGraphicsDevice {
    pub(crate) fn active_texture(&mut self, unit: u32) {
        if self.texture_unit != unit {
            self.gl.active_texture(gl_const::TEXTURE0 + unit);
            self.texture_unit = unit;
        }
    }

    /// Native target, unit slot and object of an initialized texture.
    fn native_texture(&self, handle: TextureHandle) -> Option<(u32, usize, rustkit_webgl::WebGLTexture)> {
        let texture = self.base.textures.get(handle)?;
        let native = texture.imp.handle()?;
        Some((texture.imp.target, texture.dimension().slot(), native))
    }

    /// Bind an initialized texture to the active unit.
    pub fn bind_texture(&mut self, handle: TextureHandle) {
        let Some((target, slot, native)) = self.native_texture(handle) else {
            return;
        };
        let unit = self.texture_unit as usize;
        if let Some(slots) = self.texture_units.get_mut(unit) {
            if slots[slot] != Some(native) {
                self.gl.bind_texture(target, Some(native));
                slots[slot] = Some(native);
            }
        }
    }

    /// Bind an initialized texture to `unit`, switching the active unit
    /// only when the binding changes.
    pub fn bind_texture_on_unit(&mut self, handle: TextureHandle, unit: u32) {
        let Some((target, slot, native)) = self.native_texture(handle) else {
            return;
        };
        let bound = self
            .texture_units
            .get(unit as usize)
            .map(|slots| slots[slot]);
        if matches!(bound, Some(current) if current != Some(native)) {
            self.active_texture(unit);
            self.gl.bind_texture(target, Some(native));
            self.texture_units[unit as usize][slot] = Some(native);
        }
    }

    /// Make `handle` available on `unit`. Creates the native texture on
    /// first use and applies pending parameter changes and uploads.
    pub fn set_texture(&mut self, handle: TextureHandle, unit: u32) {
        if self.context_state != ContextState::Active {
            return;
        }
        let generation = self.generation;
        let Some(tex) = self.base.textures.get_mut(handle) else {
            return;
        };
        if !tex.imp.is_current(generation) && texture::initialize(&mut self.gl, tex, generation).is_none() {
            return;
        }

        let needs_upload = tex.needs_upload || tex.needs_mipmaps_upload;
        if tex.dirty.is_empty() && !needs_upload {
            self.bind_texture_on_unit(handle, unit);
            return;
        }

        let (flip_y, premultiply) = (tex.flip_y(), tex.premultiply_alpha());
        self.active_texture(unit);
        self.bind_texture(handle);
        if needs_upload {
            self.set_unpack_flip_y(flip_y);
            self.set_unpack_premultiply_alpha(premultiply);
        }

        let max_anisotropy = self
            .extensions
            .texture_filter_anisotropic
            .map(|_| self.caps.max_anisotropy);
        let Some(tex) = self.base.textures.get_mut(handle) else {
            return;
        };
        texture::apply_parameters(&mut self.gl, tex, max_anisotropy);
        if needs_upload {
            let size = texture::upload(&mut self.gl, tex);
            let previous = std::mem::replace(&mut tex.gpu_size, size);
            let vram = &mut self.base.vram;
            vram.texture = vram.texture.saturating_sub(previous) + size;
        }
    }

    /// 1x1 magenta texture bound in place of unset samplers.
    pub(crate) fn placeholder_texture(&mut self) -> TextureHandle {
        if let Some(handle) = self
            .placeholder_texture
            .filter(|&handle| self.base.textures.contains_key(handle))
        {
            return handle;
        }
        let handle = self.create_texture(TextureDescriptor {
            name: "placeholder".to_string(),
            width: 1,
            height: 1,
            mipmaps: false,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            ..TextureDescriptor::default()
        });
        if let Some(texture) = self.base.textures.get_mut(handle) {
            texture.set_level_data(0, 0, vec![255, 0, 255, 255]);
        }
        trace!("Placeholder texture created");
        self.placeholder_texture = Some(handle);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AddressMode, TextureDimension};
    use crate::test_support::webgl2_device;

    #[test]
    fn test_set_texture_uploads_once() {
        let mut device = webgl2_device();
        let handle = device.create_texture(TextureDescriptor::default());
        device.gl_mut().reset_call_counts();

        device.set_texture(handle, 0);
        assert_eq!(device.gl().call_count("createTexture"), 1);
        assert_eq!(device.gl().call_count("texImage2D"), 1);
        let expected = device.texture(handle).unwrap().expected_gpu_size();
        assert_eq!(device.vram().texture, expected);

        device.set_texture(handle, 0);
        assert_eq!(device.gl().call_count("texImage2D"), 1);
        assert_eq!(device.gl().call_count("bindTexture"), 1);
    }

    #[test]
    fn test_texture_unit_cache() {
        let mut device = webgl2_device();
        let a = device.create_texture(TextureDescriptor::default());
        let b = device.create_texture(TextureDescriptor::default());
        device.set_texture(a, 0);
        device.set_texture(b, 1);
        device.gl_mut().reset_call_counts();

        device.set_texture(a, 0);
        device.set_texture(b, 1);
        assert_eq!(device.gl().call_count("bindTexture"), 0);
        assert_eq!(device.gl().call_count("activeTexture"), 0);

        device.set_texture(b, 0);
        assert_eq!(device.gl().call_count("activeTexture"), 1);
        assert_eq!(device.gl().call_count("bindTexture"), 1);
        let native = device.texture(b).unwrap().backend().handle();
        assert_eq!(device.gl().bound_texture(0, gl_const::TEXTURE_2D), native);
        assert_eq!(device.unit_texture(0, 0), native);
    }

    #[test]
    fn test_dirty_parameters_reapplied_on_bind() {
        let mut device = webgl2_device();
        let handle = device.create_texture(TextureDescriptor::default());
        device.set_texture(handle, 0);
        device.texture_mut(handle).unwrap().set_address_u(AddressMode::ClampToEdge);
        device.gl_mut().reset_call_counts();

        device.set_texture(handle, 0);
        assert_eq!(device.gl().call_count("texParameteri"), 1);
        assert_eq!(device.gl().call_count("texImage2D"), 0);
        let native = device.texture(handle).unwrap().backend().handle().unwrap();
        assert_eq!(
            device.gl().get_texture_data(native).unwrap().wrap_s,
            gl_const::CLAMP_TO_EDGE
        );
    }

    #[test]
    fn test_cube_and_2d_share_a_unit() {
        let mut device = webgl2_device();
        let flat = device.create_texture(TextureDescriptor::default());
        let cube = device.create_texture(TextureDescriptor {
            dimension: TextureDimension::Cube,
            ..TextureDescriptor::default()
        });
        device.set_texture(flat, 3);
        device.set_texture(cube, 3);
        assert!(device.unit_texture(3, 0).is_some());
        assert!(device.unit_texture(3, 1).is_some());
    }

    #[test]
    fn test_flip_y_applied_before_upload() {
        let mut device = webgl2_device();
        let handle = device.create_texture(TextureDescriptor {
            flip_y: true,
            ..TextureDescriptor::default()
        });
        device.set_texture(handle, 0);
        assert!(device.render_state().unpack_flip_y);
        assert_eq!(device.gl().pixel_store(gl_const::UNPACK_FLIP_Y_WEBGL), 1);
    }
}
