//! Draw submission.

use rustkit_common::{Result, RustKitError};
use rustkit_webgl::constants as gl_const;
use tracing::warn;

use crate::handles::{ShaderHandle, TextureHandle, VertexBufferHandle};
use crate::primitive::Primitive;
use crate::scope::ScopeValue;

use super::{uniforms, ContextState, WebglGraphicsDevice};

impl WebglGraphicsDevice {
    /// Capture vertex output of the following draws into `buffer`
    /// (WebGL2). `None` stops capturing.
    pub fn set_transform_feedback_buffer(&mut self, buffer: Option<VertexBufferHandle>) {
        if self.transform_feedback_buffer == buffer {
            return;
        }
        self.transform_feedback_buffer = buffer;
        if !self.is_webgl2() || self.context_state != ContextState::Active {
            return;
        }
        if buffer.is_some() && self.feedback.is_none() {
            self.feedback = self.gl.create_transform_feedback();
        }
        let feedback = buffer.and(self.feedback);
        self.gl
            .bind_transform_feedback(gl_const::TRANSFORM_FEEDBACK, feedback);
    }

    pub fn transform_feedback_buffer(&self) -> Option<VertexBufferHandle> {
        self.transform_feedback_buffer
    }

    /// Submit a draw with the current shader.
    ///
    /// Samplers take consecutive texture units in reflection order;
    /// uniforms are committed when their scope value changed since the
    /// last draw with this shader. Unless `keep_buffers` is set the queued
    /// vertex buffers and the index buffer are bound first and the queue is
    /// cleared. With `num_instances > 0` the draw is instanced.
    ///
    /// Does nothing while the context is lost or without a shader. Fails
    /// when a scope value does not fit its uniform or an indexed draw has
    /// no index buffer.
    pub fn draw(&mut self, primitive: &Primitive, num_instances: u32, keep_buffers: bool) -> Result<()> {
        if self.context_state != ContextState::Active {
            return Ok(());
        }
        let Some(shader) = self.shader else {
            return Ok(());
        };

        // Uploading unbinds the vertex array, so it has to precede set_buffers.
        let feedback = self
            .transform_feedback_buffer
            .filter(|_| self.is_webgl2() && self.feedback.is_some());
        if let Some(handle) = feedback {
            let uploaded = self
                .base
                .vertex_buffers
                .get(handle)
                .is_some_and(|buffer| buffer.imp.buffer.initialized());
            if !uploaded {
                self.unlock_vertex_buffer(handle);
            }
        }

        if !keep_buffers {
            self.set_buffers();
        }
        self.bind_samplers(shader);
        self.commit_uniforms(shader)?;

        let mode = primitive.type_.to_gl();
        let count = primitive.count as i32;
        let instanced = num_instances > 0;

        if let Some(handle) = feedback {
            let output = self
                .base
                .vertex_buffers
                .get(handle)
                .and_then(|buffer| buffer.imp.buffer.handle());
            self.gl
                .bind_buffer_base(gl_const::TRANSFORM_FEEDBACK_BUFFER, 0, output);
            self.gl.begin_transform_feedback(gl_const::POINTS);
        }

        if primitive.indexed {
            let Some(index_buffer) = self
                .index_buffer
                .and_then(|handle| self.base.index_buffers.get(handle))
            else {
                return Err(RustKitError::invalid_argument(
                    "indexed draw without an index buffer",
                ));
            };
            let format = index_buffer.imp.gl_format;
            let offset = (primitive.base * index_buffer.bytes_per_index()) as i32;
            match self.instancing.filter(|_| instanced) {
                Some(ops) => (ops.draw_elements_instanced)(
                    &mut self.gl,
                    mode,
                    count,
                    format,
                    offset,
                    num_instances as i32,
                ),
                None => self.gl.draw_elements(mode, count, format, offset),
            }
        } else {
            let first = primitive.base as i32;
            match self.instancing.filter(|_| instanced) {
                Some(ops) => {
                    (ops.draw_arrays_instanced)(&mut self.gl, mode, first, count, num_instances as i32)
                }
                None => self.gl.draw_arrays(mode, first, count),
            }
        }

        if feedback.is_some() {
            self.gl.end_transform_feedback();
            self.gl
                .bind_buffer_base(gl_const::TRANSFORM_FEEDBACK_BUFFER, 0, None);
        }

        let frame = &mut self.base.frame;
        frame.draw_calls += 1;
        frame.primitives[primitive.type_.index()] += primitive.count * num_instances.max(1);
        Ok(())
    }

    /// Assign texture units to the samplers of `shader` and bind their
    /// textures.
    fn bind_samplers(&mut self, shader: ShaderHandle) {
        let Some(entry) = self.base.shaders.get_mut(shader) else {
            return;
        };
        let mut samplers = std::mem::take(&mut entry.imp.samplers);

        let mut unit = 0u32;
        for sampler in &mut samplers {
            let value = self
                .base
                .scope
                .get(sampler.scope)
                .and_then(|id| id.value())
                .cloned();
            if let Some(ScopeValue::TextureArray(textures)) = value {
                sampler.array.clear();
                for texture in textures {
                    let texture = self.sampler_texture(&sampler.name, Some(texture));
                    self.set_texture(texture, unit);
                    sampler.array.push(unit as i32);
                    unit += 1;
                }
                self.gl.uniform1iv(sampler.location, &sampler.array);
                continue;
            }

            let texture = match value {
                Some(ScopeValue::Texture(texture)) => Some(texture),
                _ => None,
            };
            let texture = self.sampler_texture(&sampler.name, texture);
            self.set_texture(texture, unit);
            if sampler.slot != Some(unit as i32) {
                self.gl.uniform1i(sampler.location, unit as i32);
                sampler.slot = Some(unit as i32);
            }
            unit += 1;
        }

        if let Some(entry) = self.base.shaders.get_mut(shader) {
            entry.imp.samplers = samplers;
        }
    }

    /// The texture to bind for a sampler, falling back to the placeholder
    /// when the scope holds nothing usable.
    fn sampler_texture(&mut self, sampler: &str, texture: Option<TextureHandle>) -> TextureHandle {
        match texture.filter(|&handle| self.base.textures.contains_key(handle)) {
            Some(handle) => handle,
            None => {
                if self.warned_samplers.insert(sampler.to_string()) {
                    warn!(sampler, "Shader sampler has no texture assigned");
                }
                self.placeholder_texture()
            }
        }
    }

    /// Upload uniforms whose scope version moved since the last commit.
    fn commit_uniforms(&mut self, shader: ShaderHandle) -> Result<()> {
        let base = &mut self.base;
        let Some(entry) = base.shaders.get_mut(shader) else {
            return Ok(());
        };
        for input in &mut entry.imp.uniforms {
            let Some(id) = base.scope.get(input.scope) else {
                continue;
            };
            let version = id.version();
            if input.version == version {
                continue;
            }
            if let Some(value) = id.value() {
                uniforms::commit(&mut self.gl, input, value)?;
            }
            input.version.copy_from(version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BufferUsage, IndexFormat, PrimitiveType, Semantic};
    use crate::shader::ShaderDefinition;
    use crate::test_support::{position_format, webgl2_device, TRIANGLE_FS, TRIANGLE_VS};
    use crate::texture::TextureDescriptor;
    use rustkit_webgl::{DrawCall, UniformValue};

    const TEXTURED_FS: &str = "precision mediump float;
uniform sampler2D diffuse;
uniform sampler2D detail;
void main() {
    gl_FragColor = texture2D(diffuse, vec2(0.5)) * texture2D(detail, vec2(0.5));
}
";

    fn triangle_device() -> (WebglGraphicsDevice, VertexBufferHandle, ShaderHandle) {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        let shader = device.create_shader(
            ShaderDefinition::new("triangle", TRIANGLE_VS, TRIANGLE_FS)
                .with_attribute("aPosition", Semantic::Position),
        );
        (device, vb, shader)
    }

    #[test]
    fn test_draw_without_shader_is_noop() {
        let mut device = webgl2_device();
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        assert!(device.gl_mut().take_draw_calls().is_empty());
        assert_eq!(device.frame_stats().draw_calls, 0);
    }

    #[test]
    fn test_uniform_commit_only_on_change() {
        let (mut device, vb, shader) = triangle_device();
        assert!(device.set_shader(shader));
        device.scope_mut().set("color", vec![1.0, 0.0, 0.0, 1.0]);
        device.gl_mut().reset_call_counts();

        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        assert_eq!(device.gl().call_count("uniform4fv"), 1);
        assert_eq!(device.gl().call_count("drawArrays"), 2);

        device.scope_mut().set("color", vec![0.0, 1.0, 0.0, 1.0]);
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        assert_eq!(device.gl().call_count("uniform4fv"), 2);
        assert_eq!(device.frame_stats().draw_calls, 3);
        assert_eq!(device.frame_stats().primitives_of(PrimitiveType::Triangles), 9);
    }

    #[test]
    fn test_malformed_uniform_fails_every_draw() {
        let (mut device, vb, shader) = triangle_device();
        assert!(device.set_shader(shader));
        device.scope_mut().set("color", vec![1.0, 0.0]);
        device.gl_mut().reset_call_counts();

        for _ in 0..2 {
            device.set_vertex_buffer(vb);
            let err = device.draw(&Primitive::triangles(3), 0, false).unwrap_err();
            assert!(matches!(err, RustKitError::InvalidArgument(_)));
        }
        assert_eq!(device.gl().call_count("drawArrays"), 0);

        device.scope_mut().set("color", vec![0.0, 1.0, 0.0, 1.0]);
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        assert_eq!(device.gl().call_count("uniform4fv"), 1);
        assert_eq!(device.gl().call_count("drawArrays"), 1);
    }

    #[test]
    fn test_samplers_take_consecutive_units() {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        let shader = device.create_shader(
            ShaderDefinition::new("textured", TRIANGLE_VS, TEXTURED_FS)
                .with_attribute("aPosition", Semantic::Position),
        );
        assert!(device.set_shader(shader));
        let diffuse = device.create_texture(TextureDescriptor::default());
        let detail = device.create_texture(TextureDescriptor::default());
        device.scope_mut().set("diffuse", diffuse);
        device.scope_mut().set("detail", detail);

        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        let native = |device: &WebglGraphicsDevice, handle| {
            device.texture(handle).unwrap().backend().handle()
        };
        assert_eq!(device.unit_texture(0, 0), native(&device, diffuse));
        assert_eq!(device.unit_texture(1, 0), native(&device, detail));
        assert_eq!(device.gl().call_count("uniform1i"), 2);

        device.gl_mut().reset_call_counts();
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        assert_eq!(device.gl().call_count("uniform1i"), 0);
        assert_eq!(device.gl().call_count("bindTexture"), 0);
    }

    #[test]
    fn test_unset_sampler_binds_placeholder() {
        let mut device = webgl2_device();
        let vb = device.create_vertex_buffer(position_format(), 3, BufferUsage::Static, Some(&[0; 36]));
        let shader = device.create_shader(
            ShaderDefinition::new("textured", TRIANGLE_VS, TEXTURED_FS)
                .with_attribute("aPosition", Semantic::Position),
        );
        assert!(device.set_shader(shader));
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();

        let placeholder = device.placeholder_texture.unwrap();
        let native = device.texture(placeholder).unwrap().backend().handle();
        assert!(native.is_some());
        assert_eq!(device.unit_texture(0, 0), native);
        assert_eq!(device.unit_texture(1, 0), native);
        assert_eq!(device.warned_samplers.len(), 2);
        assert_eq!(device.gl_mut().get_error(), gl_const::NO_ERROR);
    }

    #[test]
    fn test_indexed_instanced_draw() {
        let (mut device, vb, shader) = triangle_device();
        let indices: [u16; 6] = [0, 1, 2, 2, 1, 0];
        let ib = device.create_index_buffer(
            IndexFormat::Uint16,
            6,
            BufferUsage::Static,
            Some(bytemuck::cast_slice(&indices)),
        );
        assert!(device.set_shader(shader));
        device.set_vertex_buffer(vb);
        device.set_index_buffer(Some(ib));
        let primitive = Primitive {
            base: 3,
            ..Primitive::indexed_triangles(3)
        };
        device.draw(&primitive, 4, false).unwrap();

        let calls = device.gl_mut().take_draw_calls();
        match calls.last() {
            Some(DrawCall::DrawElements {
                count,
                offset,
                instances,
                ..
            }) => {
                assert_eq!(*count, 3);
                assert_eq!(*offset, 6);
                assert_eq!(*instances, 4);
            }
            other => panic!("unexpected draw call {other:?}"),
        }
        assert_eq!(device.frame_stats().primitives_of(PrimitiveType::Triangles), 12);
    }

    #[test]
    fn test_indexed_draw_without_index_buffer_fails() {
        let (mut device, vb, shader) = triangle_device();
        assert!(device.set_shader(shader));
        device.set_vertex_buffer(vb);
        let err = device
            .draw(&Primitive::indexed_triangles(3), 0, false)
            .unwrap_err();
        assert_eq!(err.category(), "invalid_argument");
    }

    #[test]
    fn test_keep_buffers_skips_binding() {
        let (mut device, vb, shader) = triangle_device();
        assert!(device.set_shader(shader));
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();
        device.gl_mut().reset_call_counts();

        device.draw(&Primitive::triangles(3), 0, true).unwrap();
        assert_eq!(device.gl().call_count("bindBuffer"), 0);
        assert_eq!(device.gl().call_count("drawArrays"), 1);
    }

    #[test]
    fn test_color_uniform_reaches_context() {
        let (mut device, vb, shader) = triangle_device();
        assert!(device.set_shader(shader));
        device.scope_mut().set("color", vec![0.25, 0.5, 0.75, 1.0]);
        device.set_vertex_buffer(vb);
        device.draw(&Primitive::triangles(3), 0, false).unwrap();

        let location = device.shader(shader).unwrap().backend().uniforms()[0].location;
        assert_eq!(
            device.gl().uniform_value(location),
            Some(&UniformValue::Vec4([0.25, 0.5, 0.75, 1.0]))
        );
    }
}
