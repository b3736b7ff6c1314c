//! End-to-end device scenarios against the simulated WebGL context.
//!
//! Every test drives the device through its public API and checks what
//! reached the context: recorded draw calls, call counts and pixels.

use std::cell::RefCell;
use std::rc::Rc;

use rustkit_gfx::{
    BufferUsage, ClearOptions, DataType, DeviceOptions, EventKind, Primitive, PrimitiveType,
    Semantic, ShaderDefinition, ShaderHandle, TextureDescriptor, VertexAttribute, VertexBufferHandle,
    VertexFormat, WebglGraphicsDevice,
};
use rustkit_webgl::{constants, DrawCall, GpuProfile, HtmlCanvas, UniformValue};

const TRIANGLE_VS: &str = "attribute vec3 aPosition;
void main() {
    gl_Position = vec4(aPosition, 1.0);
}
";

const TRIANGLE_FS: &str = "precision mediump float;
uniform vec4 color;
void main() {
    gl_FragColor = color;
}
";

const TRIANGLE: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];

/// Route device logs through the test harness; `RUST_LOG` picks the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn device_with(profile: GpuProfile) -> WebglGraphicsDevice {
    init_tracing();
    let canvas = HtmlCanvas::with_profile(64, 64, profile);
    WebglGraphicsDevice::new(canvas, DeviceOptions::default()).unwrap()
}

fn position_format() -> VertexFormat {
    VertexFormat::new(&[VertexAttribute::new(Semantic::Position, 3, DataType::Float32)])
}

/// A device with the flat color shader and one triangle.
fn triangle_scene(profile: GpuProfile) -> (WebglGraphicsDevice, ShaderHandle, VertexBufferHandle) {
    let mut device = device_with(profile);
    let shader = device.create_shader(
        ShaderDefinition::new("flat", TRIANGLE_VS, TRIANGLE_FS)
            .with_attribute("aPosition", Semantic::Position),
    );
    let vb = device.create_vertex_buffer(
        position_format(),
        3,
        BufferUsage::Static,
        Some(bytemuck::cast_slice(&TRIANGLE)),
    );
    (device, shader, vb)
}

fn draw_triangle(device: &mut WebglGraphicsDevice, shader: ShaderHandle, vb: VertexBufferHandle) {
    assert!(device.set_shader(shader));
    device.set_vertex_buffer(vb);
    device.draw(&Primitive::triangles(3), 0, false).unwrap();
}

#[test]
fn test_first_triangle() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::desktop());
    device.scope_mut().set("color", vec![1.0, 0.0, 0.0, 1.0]);
    device.gl_mut().reset_call_counts();

    draw_triangle(&mut device, shader, vb);

    assert_eq!(device.gl().call_count("uniform4fv"), 1);
    let location = device
        .shader(shader)
        .unwrap()
        .backend()
        .uniforms()
        .iter()
        .find(|input| input.name == "color")
        .unwrap()
        .location;
    assert_eq!(
        device.gl().uniform_value(location),
        Some(&UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
    );

    let draws = device.gl_mut().take_draw_calls();
    assert_eq!(draws.len(), 1);
    match &draws[0] {
        DrawCall::DrawArrays {
            mode,
            first,
            count,
            ..
        } => {
            assert_eq!(*mode, constants::TRIANGLES);
            assert_eq!(*first, 0);
            assert_eq!(*count, 3);
        }
        other => panic!("unexpected draw {other:?}"),
    }
    assert_eq!(device.gl_mut().get_error(), constants::NO_ERROR);
}

#[test]
fn test_redundant_uniform_is_not_reuploaded() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::desktop());
    device.scope_mut().set("color", vec![1.0, 0.0, 0.0, 1.0]);
    device.gl_mut().reset_call_counts();

    draw_triangle(&mut device, shader, vb);
    draw_triangle(&mut device, shader, vb);

    assert_eq!(device.gl().call_count("uniform4fv"), 1);
    assert_eq!(device.gl().call_count("drawArrays"), 2);
    assert_eq!(device.gl().call_count("useProgram"), 1);
    assert_eq!(device.frame_stats().draw_calls, 2);
}

#[test]
fn test_context_loss_and_restore() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::desktop());
    device.scope_mut().set("color", vec![0.0, 1.0, 0.0, 1.0]);
    draw_triangle(&mut device, shader, vb);

    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in [EventKind::DeviceLost, EventKind::DeviceRestored] {
        let sink = events.clone();
        device.on(kind, move |event| sink.borrow_mut().push(event.kind()));
    }

    device.lose_context();
    assert!(device.is_context_lost());
    assert!(device.shader(shader).unwrap().backend().program().is_none());
    assert!(device.vertex_buffer(vb).unwrap().backend().buffer().handle().is_none());
    assert!(device.vertex_buffer(vb).unwrap().backend().vertex_array().is_none());
    assert_eq!(device.vao_cache_len(), 0);

    device.restore_context();
    assert!(!device.is_context_lost());
    assert!(device.set_shader(shader));
    assert!(device.shader(shader).unwrap().ready());

    let handle = device
        .vertex_buffer(vb)
        .unwrap()
        .backend()
        .buffer()
        .handle()
        .unwrap();
    let uploaded = device.gl().get_buffer_data(handle).unwrap();
    assert_eq!(uploaded.data, bytemuck::cast_slice::<f32, u8>(&TRIANGLE));

    device.gl_mut().take_draw_calls();
    draw_triangle(&mut device, shader, vb);
    assert_eq!(device.gl_mut().take_draw_calls().len(), 1);
    assert_eq!(
        *events.borrow(),
        vec![EventKind::DeviceLost, EventKind::DeviceRestored]
    );
}

#[test]
fn test_clear_then_read_back() {
    let mut device = device_with(GpuProfile::desktop());
    device.clear(&ClearOptions::color([0.0, 0.0, 1.0, 1.0]));

    let mut pixel = [0u8; 4];
    device.read_pixels(0, 0, 1, 1, &mut pixel);
    assert_eq!(pixel, [0, 0, 255, 255]);
}

#[test]
fn test_resize_is_idempotent() {
    let mut device = device_with(GpuProfile::desktop());
    let resizes = Rc::new(RefCell::new(0));
    let sink = resizes.clone();
    device.on(EventKind::ResizeCanvas, move |_| *sink.borrow_mut() += 1);

    assert!(device.resize_canvas(128, 96));
    assert!(!device.resize_canvas(128, 96));
    assert_eq!(*resizes.borrow(), 1);
    assert_eq!((device.width(), device.height()), (128, 96));
}

#[test]
fn test_redundant_state_changes_are_filtered() {
    let mut device = device_with(GpuProfile::desktop());
    device.gl_mut().reset_call_counts();

    device.set_depth_test(true);
    device.set_depth_test(true);
    assert_eq!(device.gl().call_count("enable"), 0);

    device.set_depth_test(false);
    device.set_depth_test(false);
    assert_eq!(device.gl().call_count("disable"), 1);

    device.set_viewport(0, 0, 32, 32);
    device.set_viewport(0, 0, 32, 32);
    assert_eq!(device.gl().call_count("viewport"), 1);
}

#[test]
fn test_vertex_array_cache_survives_buffer_destruction() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::desktop());
    let colors = VertexFormat::new(&[VertexAttribute::new(Semantic::Color, 4, DataType::Uint8)]);
    let extra = device.create_vertex_buffer(colors, 3, BufferUsage::Static, Some(&[255; 12]));
    assert!(device.set_shader(shader));

    let mut bound = Vec::new();
    for _ in 0..2 {
        device.set_vertex_buffer(vb);
        device.set_vertex_buffer(extra);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        let draws = device.gl_mut().take_draw_calls();
        bound.push(draws[0].state().unwrap().vertex_array);
    }
    assert_eq!(bound[0], bound[1]);
    assert_eq!(device.vao_cache_len(), 1);

    device.set_vertex_buffer(vb);
    device.draw(&Primitive::triangles(3), 0, false).unwrap();
    let single = device.gl_mut().take_draw_calls()[0].state().unwrap().vertex_array;
    assert_ne!(single, bound[0]);

    device.destroy_vertex_buffer(extra);
    device.set_vertex_buffer(vb);
    device.draw(&Primitive::triangles(3), 0, false).unwrap();
    assert_eq!(device.gl_mut().take_draw_calls().len(), 1);
    assert_eq!(device.gl_mut().get_error(), constants::NO_ERROR);
}

#[test]
fn test_texture_unit_bindings_are_cached() {
    let mut device = device_with(GpuProfile::desktop());
    let first = device.create_texture(TextureDescriptor::default());
    let second = device.create_texture(TextureDescriptor::default());
    device.gl_mut().reset_call_counts();

    device.set_texture(first, 0);
    device.set_texture(first, 0);
    assert_eq!(device.gl().call_count("bindTexture"), 1);

    device.set_texture(second, 1);
    let native = |device: &WebglGraphicsDevice, handle| {
        device.texture(handle).unwrap().backend().handle()
    };
    assert_eq!(device.unit_texture(0, 0), native(&device, first));
    assert_eq!(device.unit_texture(1, 0), native(&device, second));
    assert_eq!(device.active_texture_unit(), 1);
}

#[test]
fn test_webgl1_mali_path() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::mali_450());
    assert_eq!(device.context_id(), "webgl");
    assert!(!device.is_webgl2());

    let caps = device.capabilities();
    assert_eq!(caps.bone_limit, 34);
    assert!(!caps.supports_area_lights);
    assert_eq!(caps.precision.as_str(), "mediump");
    assert!(device.instancing().is_some());
    assert!(device.vertex_array_ops().is_some());

    let offsets = VertexFormat::new(&[VertexAttribute::new(Semantic::Attr(12), 4, DataType::Float32)])
        .with_instancing(true);
    let instances = device.create_vertex_buffer(offsets, 2, BufferUsage::Static, Some(&[0; 32]));
    device.scope_mut().set("color", vec![1.0, 1.0, 1.0, 1.0]);
    assert!(device.set_shader(shader));
    device.set_vertex_buffer(vb);
    device.set_vertex_buffer(instances);
    device.draw(&Primitive::triangles(3), 2, false).unwrap();

    assert_eq!(device.gl().call_count("createVertexArrayOES"), 1);
    assert_eq!(device.gl().call_count("vertexAttribDivisorANGLE"), 1);
    assert_eq!(device.gl().call_count("drawArraysInstancedANGLE"), 1);
    assert_eq!(device.frame_stats().primitives_of(PrimitiveType::Triangles), 6);
}

#[test]
fn test_webgl1_without_vertex_array_objects() {
    let profile = GpuProfile::desktop()
        .webgl1_only()
        .without_extension("OES_vertex_array_object");
    let (mut device, shader, vb) = triangle_scene(profile);
    assert!(device.vertex_array_ops().is_none());
    device.scope_mut().set("color", vec![1.0, 1.0, 1.0, 1.0]);
    device.gl_mut().reset_call_counts();

    draw_triangle(&mut device, shader, vb);
    draw_triangle(&mut device, shader, vb);

    assert_eq!(device.gl().call_count("enableVertexAttribArray"), 1);
    assert_eq!(device.gl().call_count("drawArrays"), 2);
    assert_eq!(device.gl_mut().get_error(), constants::NO_ERROR);
}

#[test]
fn test_transform_feedback_wraps_draw() {
    let (mut device, shader, vb) = triangle_scene(GpuProfile::desktop());
    let output = device.create_vertex_buffer(position_format(), 3, BufferUsage::Dynamic, None);
    device.scope_mut().set("color", vec![1.0, 1.0, 1.0, 1.0]);
    device.set_transform_feedback_buffer(Some(output));
    device.gl_mut().reset_call_counts();

    draw_triangle(&mut device, shader, vb);
    assert_eq!(device.gl().call_count("beginTransformFeedback"), 1);
    assert_eq!(device.gl().call_count("endTransformFeedback"), 1);

    // Uploading the output buffer must not leave the draw without inputs.
    let vao = device.vertex_buffer(vb).unwrap().backend().vertex_array();
    assert!(vao.is_some());
    let draws = device.gl_mut().take_draw_calls();
    let state = draws[0].state().unwrap();
    assert_eq!(state.vertex_array, vao);
    assert!(state.vertex_attribs[0].enabled);
    assert!(state.transform_feedback_active);
    assert!(device
        .vertex_buffer(output)
        .unwrap()
        .backend()
        .buffer()
        .initialized());

    device.set_transform_feedback_buffer(None);
    assert_eq!(device.transform_feedback_buffer(), None);
}
