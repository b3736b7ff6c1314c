//! Textures and their sampling parameters.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constants::{AddressMode, CompareFunc, FilterMode, PixelFormat, TextureDimension};
use crate::webgl::texture::WebglTexture;

bitflags! {
    /// Sampling parameters that changed since the texture was last bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureParams: u32 {
        const MIN_FILTER = 1 << 0;
        const MAG_FILTER = 1 << 1;
        const ADDRESS_U = 1 << 2;
        const ADDRESS_V = 1 << 3;
        const ADDRESS_W = 1 << 4;
        const COMPARE_ON_READ = 1 << 5;
        const COMPARE_FUNC = 1 << 6;
        const ANISOTROPY = 1 << 7;
    }
}

/// Creation parameters of a [`Texture`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Slices of a 3D texture or layers of a 2D array.
    pub depth: u32,
    pub dimension: TextureDimension,
    pub format: PixelFormat,
    pub mipmaps: bool,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub compare_on_read: bool,
    pub compare_func: CompareFunc,
    pub anisotropy: f32,
    pub flip_y: bool,
    pub premultiply_alpha: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 4,
            height: 4,
            depth: 1,
            dimension: TextureDimension::D2,
            format: PixelFormat::Rgba8,
            mipmaps: true,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            compare_on_read: false,
            compare_func: CompareFunc::Less,
            anisotropy: 1.0,
            flip_y: false,
            premultiply_alpha: false,
        }
    }
}

/// Image data of one mip level, one entry per face (six for cube maps).
pub type LevelData = Vec<Option<Vec<u8>>>;

/// A texture owned by the device.
#[derive(Debug)]
pub struct Texture {
    desc: TextureDescriptor,
    levels: Vec<LevelData>,
    pub(crate) dirty: TextureParams,
    pub(crate) needs_upload: bool,
    pub(crate) needs_mipmaps_upload: bool,
    /// Bytes currently accounted to VRAM for this texture.
    pub(crate) gpu_size: usize,
    pub(crate) imp: WebglTexture,
}

macro_rules! texture_param {
    ($get:ident, $set:ident, $field:ident, $ty:ty, $flag:expr) => {
        pub fn $get(&self) -> $ty {
            self.desc.$field
        }

        pub fn $set(&mut self, value: $ty) {
            if self.desc.$field != value {
                self.desc.$field = value;
                self.dirty |= $flag;
            }
        }
    };
}

impl Texture {
    pub(crate) fn new(desc: TextureDescriptor) -> Self {
        let faces = desc.dimension.faces();
        let mut texture = Self {
            levels: vec![vec![None; faces]],
            desc,
            dirty: TextureParams::empty(),
            needs_upload: false,
            needs_mipmaps_upload: false,
            gpu_size: 0,
            imp: WebglTexture::default(),
        };
        texture.dirty_all();
        texture
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn depth(&self) -> u32 {
        self.desc.depth
    }

    pub fn dimension(&self) -> TextureDimension {
        self.desc.dimension
    }

    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    pub fn mipmaps(&self) -> bool {
        self.desc.mipmaps
    }

    pub fn flip_y(&self) -> bool {
        self.desc.flip_y
    }

    pub fn premultiply_alpha(&self) -> bool {
        self.desc.premultiply_alpha
    }

    /// Power-of-two in both dimensions.
    pub fn is_pot(&self) -> bool {
        self.desc.width.is_power_of_two() && self.desc.height.is_power_of_two()
    }

    texture_param!(min_filter, set_min_filter, min_filter, FilterMode, TextureParams::MIN_FILTER);
    texture_param!(mag_filter, set_mag_filter, mag_filter, FilterMode, TextureParams::MAG_FILTER);
    texture_param!(address_u, set_address_u, address_u, AddressMode, TextureParams::ADDRESS_U);
    texture_param!(address_v, set_address_v, address_v, AddressMode, TextureParams::ADDRESS_V);
    texture_param!(address_w, set_address_w, address_w, AddressMode, TextureParams::ADDRESS_W);
    texture_param!(
        compare_on_read,
        set_compare_on_read,
        compare_on_read,
        bool,
        TextureParams::COMPARE_ON_READ
    );
    texture_param!(
        compare_func,
        set_compare_func,
        compare_func,
        CompareFunc,
        TextureParams::COMPARE_FUNC
    );
    texture_param!(anisotropy, set_anisotropy, anisotropy, f32, TextureParams::ANISOTROPY);

    /// Toggle mipmapping. The min filter is re-applied on next bind.
    pub fn set_mipmaps(&mut self, mipmaps: bool) {
        if self.desc.mipmaps != mipmaps {
            self.desc.mipmaps = mipmaps;
            self.dirty |= TextureParams::MIN_FILTER;
            if mipmaps {
                self.needs_mipmaps_upload = true;
            }
        }
    }

    pub fn backend(&self) -> &WebglTexture {
        &self.imp
    }

    pub fn levels(&self) -> &[LevelData] {
        &self.levels
    }

    /// Replace the pixels of one face of one mip level and schedule an
    /// upload.
    pub fn set_level_data(&mut self, level: usize, face: usize, data: Vec<u8>) {
        let faces = self.desc.dimension.faces();
        if face >= faces {
            return;
        }
        if self.levels.len() <= level {
            self.levels.resize(level + 1, vec![None; faces]);
        }
        self.levels[level][face] = Some(data);
        self.upload();
    }

    /// Schedule the level data for upload on next bind.
    pub fn upload(&mut self) {
        self.needs_upload = true;
        self.needs_mipmaps_upload = self.desc.mipmaps;
    }

    /// Dimensions of a mip level.
    pub fn level_size(&self, level: usize) -> (u32, u32, u32) {
        let shift = |v: u32| (v >> level).max(1);
        let depth = match self.desc.dimension {
            TextureDimension::D3 => shift(self.desc.depth),
            _ => self.desc.depth.max(1),
        };
        (shift(self.desc.width), shift(self.desc.height), depth)
    }

    /// Bytes the texture occupies on the GPU, including a full mip chain
    /// when mipmapped.
    pub fn expected_gpu_size(&self) -> usize {
        let faces = self.desc.dimension.faces();
        let bpp = self.desc.format.bytes_per_pixel() as usize;
        let mut total = 0;
        let mut level = 0;
        loop {
            let (w, h, d) = self.level_size(level);
            total += w as usize * h as usize * d as usize * bpp * faces;
            let last = w == 1 && h == 1 && (d == 1 || self.desc.dimension != TextureDimension::D3);
            if !self.desc.mipmaps || last {
                break;
            }
            level += 1;
        }
        total
    }

    /// Mark everything for re-upload and re-application.
    pub(crate) fn dirty_all(&mut self) {
        self.needs_upload = true;
        self.needs_mipmaps_upload = self.desc.mipmaps;
        self.dirty = TextureParams::all();
    }

    pub(crate) fn lose_context(&mut self) {
        self.imp.lose_context();
        self.dirty_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_texture_is_dirty() {
        let texture = Texture::new(TextureDescriptor::default());
        assert!(texture.needs_upload);
        assert!(texture.needs_mipmaps_upload);
        assert_eq!(texture.dirty, TextureParams::all());
    }

    #[test]
    fn test_setters_flag_only_changes() {
        let mut texture = Texture::new(TextureDescriptor::default());
        texture.dirty = TextureParams::empty();

        texture.set_mag_filter(FilterMode::Linear);
        assert!(texture.dirty.is_empty());

        texture.set_address_u(AddressMode::ClampToEdge);
        texture.set_anisotropy(8.0);
        assert_eq!(
            texture.dirty,
            TextureParams::ADDRESS_U | TextureParams::ANISOTROPY
        );
    }

    #[test]
    fn test_set_level_data() {
        let mut texture = Texture::new(TextureDescriptor {
            dimension: TextureDimension::Cube,
            ..TextureDescriptor::default()
        });
        texture.needs_upload = false;
        texture.set_level_data(0, 5, vec![255; 64]);
        assert!(texture.needs_upload);
        assert_eq!(texture.levels()[0].len(), 6);
        assert!(texture.levels()[0][5].is_some());

        texture.set_level_data(0, 6, vec![0; 64]);
        assert_eq!(texture.levels()[0].len(), 6);
    }

    #[test]
    fn test_gpu_size() {
        let plain = Texture::new(TextureDescriptor {
            width: 4,
            height: 4,
            mipmaps: false,
            ..TextureDescriptor::default()
        });
        assert_eq!(plain.expected_gpu_size(), 64);

        let mipped = Texture::new(TextureDescriptor {
            width: 4,
            height: 4,
            ..TextureDescriptor::default()
        });
        // 4x4 + 2x2 + 1x1
        assert_eq!(mipped.expected_gpu_size(), (16 + 4 + 1) * 4);
    }

    #[test]
    fn test_npot() {
        let texture = Texture::new(TextureDescriptor {
            width: 3,
            height: 4,
            ..TextureDescriptor::default()
        });
        assert!(!texture.is_pot());
    }
}
