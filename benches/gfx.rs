//! Graphics device benchmarks
//!
//! Run with: cargo bench -p rustkit-gfx

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rustkit_gfx::{
    BufferUsage, DataType, DeviceOptions, Primitive, Semantic, ShaderDefinition, ShaderHandle,
    VertexAttribute, VertexBufferHandle, VertexFormat, WebglGraphicsDevice,
};
use rustkit_webgl::HtmlCanvas;

const VS: &str = "attribute vec3 aPosition;
uniform vec4 offset;
void main() {
    gl_Position = vec4(aPosition, 1.0) + offset;
}
";

const FS: &str = "precision mediump float;
uniform vec4 color;
void main() {
    gl_FragColor = color;
}
";

fn scene() -> (WebglGraphicsDevice, ShaderHandle, VertexBufferHandle) {
    let mut device = WebglGraphicsDevice::new(HtmlCanvas::new(256, 256), DeviceOptions::default())
        .expect("device");
    let shader = device.create_shader(
        ShaderDefinition::new("bench", VS, FS).with_attribute("aPosition", Semantic::Position),
    );
    let format = VertexFormat::new(&[VertexAttribute::new(Semantic::Position, 3, DataType::Float32)]);
    let vertices = [0.0f32; 9];
    let vb = device.create_vertex_buffer(
        format,
        3,
        BufferUsage::Static,
        Some(bytemuck::cast_slice(&vertices)),
    );
    device.scope_mut().set("color", vec![1.0, 1.0, 1.0, 1.0]);
    device.scope_mut().set("offset", vec![0.0, 0.0, 0.0, 0.0]);
    (device, shader, vb)
}

fn draw_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw");

    for draws in [10u64, 100, 1000] {
        group.throughput(Throughput::Elements(draws));

        // Identical state every draw: everything but the draw is filtered
        group.bench_with_input(BenchmarkId::new("redundant", draws), &draws, |b, &draws| {
            let (mut device, shader, vb) = scene();
            b.iter(|| {
                device.frame_start();
                for _ in 0..draws {
                    device.set_shader(shader);
                    device.set_depth_test(true);
                    device.set_blending(false);
                    device.set_vertex_buffer(vb);
                    device.draw(&Primitive::triangles(3), 0, false).unwrap();
                }
                device.gl_mut().take_draw_calls();
            })
        });

        // A uniform moves every draw
        group.bench_with_input(BenchmarkId::new("uniform_change", draws), &draws, |b, &draws| {
            let (mut device, shader, vb) = scene();
            let offset = device.scope_mut().resolve("offset");
            b.iter(|| {
                device.frame_start();
                for i in 0..draws {
                    if let Some(id) = device.scope_mut().get_mut(offset) {
                        id.set_value(vec![i as f32, 0.0, 0.0, 0.0]);
                    }
                    device.set_shader(shader);
                    device.set_vertex_buffer(vb);
                    device.draw(&Primitive::triangles(3), 0, false).unwrap();
                }
                device.gl_mut().take_draw_calls();
            })
        });
    }

    group.finish();
}

fn state_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("state");

    group.bench_function("toggle_blend", |b| {
        let (mut device, _, _) = scene();
        let mut enabled = false;
        b.iter(|| {
            enabled = !enabled;
            device.set_blending(enabled);
        })
    });

    group.bench_function("same_viewport", |b| {
        let (mut device, _, _) = scene();
        b.iter(|| device.set_viewport(0, 0, 256, 256))
    });

    group.finish();
}

criterion_group!(benches, draw_benchmarks, state_benchmarks);
criterion_main!(benches);
