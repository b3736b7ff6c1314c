//! Readback images: PNG output and comparison against a golden file.

use std::path::Path;

/// Result of comparing two images.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiffResult {
    pub total_pixels: u64,
    pub diff_pixels: u64,
    pub diff_percent: f64,
    /// Largest per-channel difference.
    pub max_diff: u8,
    pub matches: bool,
    pub threshold: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image dimensions don't match: {0}x{1} vs {2}x{3}")]
    DimensionMismatch(u32, u32, u32, u32),

    #[error("Failed to read image: {0}")]
    Read(String),

    #[error("Failed to write image: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Image {
    /// Wrap `readPixels` output, whose first row is the bottom one.
    pub fn from_readback(width: u32, height: u32, pixels: &[u8]) -> Self {
        let row = width as usize * 4;
        let rgba = pixels
            .chunks_exact(row)
            .rev()
            .flat_map(|line| line.iter().copied())
            .collect();
        Self { width, height, rgba }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(at..at + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn load_png(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let file = std::fs::File::open(path)?;
        let decoder = png::Decoder::new(file);
        let mut reader = decoder
            .read_info()
            .map_err(|e| ImageError::Read(e.to_string()))?;

        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| ImageError::Read(e.to_string()))?;
        let data = &buf[..info.buffer_size()];

        let rgba = match info.color_type {
            png::ColorType::Rgba => data.to_vec(),
            png::ColorType::Rgb => data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            other => return Err(ImageError::Read(format!("unsupported color type {other:?}"))),
        };
        Ok(Self {
            width: info.width,
            height: info.height,
            rgba,
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);

        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut png_writer = encoder
            .write_header()
            .map_err(|e| ImageError::Write(e.to_string()))?;
        png_writer
            .write_image_data(&self.rgba)
            .map_err(|e| ImageError::Write(e.to_string()))
    }

    /// Compare against `expected`. A pixel matches when every channel is
    /// within `threshold`.
    pub fn compare(&self, expected: &Image, threshold: u8) -> Result<DiffResult, ImageError> {
        if self.width != expected.width || self.height != expected.height {
            return Err(ImageError::DimensionMismatch(
                expected.width,
                expected.height,
                self.width,
                self.height,
            ));
        }

        let total_pixels = self.width as u64 * self.height as u64;
        let mut diff_pixels = 0u64;
        let mut max_diff = 0u8;
        for (actual, wanted) in self.rgba.chunks_exact(4).zip(expected.rgba.chunks_exact(4)) {
            let pixel_diff = actual
                .iter()
                .zip(wanted)
                .map(|(a, b)| a.abs_diff(*b))
                .max()
                .unwrap_or(0);
            max_diff = max_diff.max(pixel_diff);
            if pixel_diff > threshold {
                diff_pixels += 1;
            }
        }

        let diff_percent = if total_pixels == 0 {
            0.0
        } else {
            diff_pixels as f64 / total_pixels as f64 * 100.0
        };
        Ok(DiffResult {
            total_pixels,
            diff_pixels,
            diff_percent,
            max_diff,
            matches: diff_pixels == 0,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> Image {
        Image {
            width,
            height,
            rgba: (0..width * height).flat_map(|_| color).collect(),
        }
    }

    #[test]
    fn test_readback_rows_are_flipped() {
        let pixels = [1, 1, 1, 1, 2, 2, 2, 2];
        let image = Image::from_readback(1, 2, &pixels);
        assert_eq!(image.pixel(0, 0), Some([2, 2, 2, 2]));
        assert_eq!(image.pixel(0, 1), Some([1, 1, 1, 1]));
        assert_eq!(image.pixel(1, 0), None);
    }

    #[test]
    fn test_png_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let image = solid(3, 2, [10, 20, 30, 255]);
        image.save_png(file.path()).unwrap();
        assert_eq!(Image::load_png(file.path()).unwrap(), image);
    }

    #[test]
    fn test_threshold() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [105, 100, 100, 255]);
        assert!(!a.compare(&b, 0).unwrap().matches);
        let result = a.compare(&b, 10).unwrap();
        assert!(result.matches);
        assert_eq!(result.max_diff, 5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let b = solid(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            a.compare(&b, 0),
            Err(ImageError::DimensionMismatch(2, 2, 4, 4))
        ));
    }
}
