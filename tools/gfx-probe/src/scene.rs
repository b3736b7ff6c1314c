//! Smoke scene: a clear, an offscreen pass and a batch of identical draws.

use rustkit_gfx::{
    BufferUsage, ClearOptions, ColorAttachmentOps, DataType, FilterMode, FrameStats, Primitive,
    RenderPass, RenderTargetDescriptor, Result, Semantic, ShaderDefinition, TextureDescriptor,
    VertexAttribute, VertexFormat, VramStats, WebglGraphicsDevice,
};
use tracing::{debug, info};

use crate::image::Image;

const VS: &str = "attribute vec3 aPosition;
void main() {
    gl_Position = vec4(aPosition, 1.0);
}
";

const FS: &str = "precision mediump float;
uniform vec4 color;
void main() {
    gl_FragColor = color;
}
";

/// Entry points whose counts are reported after the scene.
const TRACKED_CALLS: &[&str] = &[
    "useProgram",
    "uniform4fv",
    "bindVertexArray",
    "bindVertexArrayOES",
    "enableVertexAttribArray",
    "bindFramebuffer",
    "drawArrays",
    "clear",
];

#[derive(Debug, Clone, Copy)]
pub struct SceneOptions {
    pub background: [f32; 4],
    pub accent: [f32; 4],
    pub draws: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct CallCount {
    pub name: &'static str,
    pub count: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct SmokeReport {
    pub context_id: &'static str,
    pub frame: FrameStats,
    pub vram: VramStats,
    pub total_calls: usize,
    pub calls: Vec<CallCount>,
    /// Center pixel of the offscreen target after its pass.
    pub target_pixel: [u8; 4],
    /// Error the context reported at the end of the scene.
    pub gl_error: Option<String>,
}

/// Render the smoke scene and read the canvas back.
pub fn run(device: &mut WebglGraphicsDevice, options: SceneOptions) -> Result<(Image, SmokeReport)> {
    device.frame_start();
    device.gl_mut().reset_call_counts();
    let (width, height) = (device.width(), device.height());

    device.clear(&ClearOptions::color(options.background));

    let size = (width / 2).max(1);
    let texture = device.create_texture(TextureDescriptor {
        name: "smoke-color".to_string(),
        width: size,
        height: size,
        mipmaps: false,
        min_filter: FilterMode::Linear,
        ..TextureDescriptor::default()
    });
    let target = device.create_render_target(RenderTargetDescriptor {
        name: "smoke".to_string(),
        color_buffer: Some(texture),
        ..RenderTargetDescriptor::default()
    })?;
    let pass = RenderPass {
        name: "smoke".to_string(),
        render_target: Some(target),
        color_ops: Some(ColorAttachmentOps {
            clear: true,
            clear_value: options.accent,
            store: true,
            ..ColorAttachmentOps::default()
        }),
        ..RenderPass::default()
    };
    device.start_pass(&pass);
    device.end_pass(&pass);

    let mut target_pixel = [0u8; 4];
    device.set_render_target(Some(target));
    device.update_begin();
    device.read_pixels((size / 2) as i32, (size / 2) as i32, 1, 1, &mut target_pixel);
    debug!(?target_pixel, "Offscreen pass read back");

    device.set_render_target(None);
    device.update_begin();
    let shader = device.create_shader(
        ShaderDefinition::new("smoke", VS, FS).with_attribute("aPosition", Semantic::Position),
    );
    let format = VertexFormat::new(&[VertexAttribute::new(Semantic::Position, 3, DataType::Float32)]);
    let vertices: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
    let vb = device.create_vertex_buffer(
        format,
        3,
        BufferUsage::Static,
        Some(bytemuck::cast_slice(&vertices)),
    );
    device.scope_mut().set("color", options.accent.to_vec());
    for _ in 0..options.draws {
        if !device.set_shader(shader) {
            break;
        }
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false)?;
    }
    device.update_end();

    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    device.read_pixels(0, 0, width as i32, height as i32, &mut pixels);
    let image = Image::from_readback(width, height, &pixels);

    let gl_error = device.check_gl_error("smoke scene").err().map(|e| e.to_string());
    let gl = device.gl();
    let report = SmokeReport {
        context_id: device.context_id(),
        frame: *device.frame_stats(),
        vram: *device.vram(),
        total_calls: gl.total_calls(),
        calls: TRACKED_CALLS
            .iter()
            .map(|&name| CallCount {
                name,
                count: gl.call_count(name),
            })
            .collect(),
        target_pixel,
        gl_error,
    };
    info!(
        draws = report.frame.draw_calls,
        calls = report.total_calls,
        "Smoke scene rendered"
    );

    device.destroy_shader(shader);
    device.destroy_vertex_buffer(vb);
    device.destroy_render_target(target);
    device.destroy_texture(texture);
    Ok((image, report))
}

/// Convert a normalized color to the bytes `readPixels` returns.
pub fn to_bytes(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_gfx::DeviceOptions;
    use rustkit_webgl::{GpuProfile, HtmlCanvas};

    fn options() -> SceneOptions {
        SceneOptions {
            background: [0.0, 0.0, 1.0, 1.0],
            accent: [1.0, 0.0, 0.0, 1.0],
            draws: 8,
        }
    }

    #[test]
    fn test_smoke_scene_on_desktop() {
        let mut device =
            WebglGraphicsDevice::new(HtmlCanvas::new(16, 16), DeviceOptions::default()).unwrap();
        let (image, report) = run(&mut device, options()).unwrap();

        assert_eq!(image.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(report.target_pixel, [255, 0, 0, 255]);
        assert_eq!(report.frame.draw_calls, 8);
        let uploads = report.calls.iter().find(|c| c.name == "uniform4fv").unwrap();
        assert_eq!(uploads.count, 1);
        assert_eq!(report.gl_error, None);
    }

    #[test]
    fn test_smoke_scene_on_webgl1() {
        let canvas = HtmlCanvas::with_profile(16, 16, GpuProfile::mali_450());
        let mut device = WebglGraphicsDevice::new(canvas, DeviceOptions::default()).unwrap();
        let (_, report) = run(&mut device, options()).unwrap();
        assert_eq!(report.context_id, "webgl");
        assert_eq!(report.target_pixel, [255, 0, 0, 255]);
    }

    #[test]
    fn test_to_bytes_clamps() {
        assert_eq!(to_bytes([1.5, -1.0, 0.5, 1.0]), [255, 0, 128, 255]);
    }
}
