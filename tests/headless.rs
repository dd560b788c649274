//! Rendering tests against a real OpenGL 3.3 core context.
//!
//! The context comes from Mesa's surfaceless EGL platform, so no window or
//! display server is needed. Without `libEGL` or a driver that supports the
//! platform every test prints a notice and passes without rendering.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use glow::HasContext;
use glow_lights2d::{
    shaders, BlendFunc, BlendState, BlendingScope, Error, ExtrusionMode, FrameBuffer,
    FrameBufferTexture, GLight, LightSettings, Rect, RectBatch, ShaderProgram, ShaderStage,
    ShadowSettings, SolidRect, UniformValue, Vertex,
};
use khronos_egl as egl;

/// `EGL_PLATFORM_SURFACELESS_MESA`
const PLATFORM_SURFACELESS: egl::Enum = 0x31DD;

const SIZE: u32 = 64;

/// One context at a time; some drivers dislike parallel context creation.
static GL_LOCK: Mutex<()> = Mutex::new(());

struct Headless {
    egl: egl::DynamicInstance<egl::EGL1_5>,
    display: egl::Display,
    context: egl::Context,
    gl: Arc<glow::Context>,
}

impl Headless {
    fn new() -> Option<Self> {
        let egl = unsafe { egl::DynamicInstance::<egl::EGL1_5>::load_required() }.ok()?;
        let display = unsafe {
            egl.get_platform_display(PLATFORM_SURFACELESS, egl::DEFAULT_DISPLAY, &[egl::ATTRIB_NONE])
        }
        .ok()?;
        egl.initialize(display).ok()?;
        egl.bind_api(egl::OPENGL_API).ok()?;

        let config = egl
            .choose_first_config(
                display,
                &[
                    egl::SURFACE_TYPE,
                    egl::PBUFFER_BIT,
                    egl::RENDERABLE_TYPE,
                    egl::OPENGL_BIT,
                    egl::RED_SIZE,
                    8,
                    egl::GREEN_SIZE,
                    8,
                    egl::BLUE_SIZE,
                    8,
                    egl::ALPHA_SIZE,
                    8,
                    egl::NONE,
                ],
            )
            .ok()??;
        let context = egl
            .create_context(
                display,
                config,
                None,
                &[
                    egl::CONTEXT_MAJOR_VERSION,
                    3,
                    egl::CONTEXT_MINOR_VERSION,
                    3,
                    egl::CONTEXT_OPENGL_PROFILE_MASK,
                    egl::CONTEXT_OPENGL_CORE_PROFILE_BIT,
                    egl::NONE,
                ],
            )
            .ok()?;
        egl.make_current(display, None, None, Some(context)).ok()?;

        let gl = unsafe {
            glow::Context::from_loader_function(|name| {
                egl.get_proc_address(name)
                    .map_or(std::ptr::null(), |f| f as *const std::ffi::c_void)
            })
        };
        Some(Self {
            egl,
            display,
            context,
            gl: Arc::new(gl),
        })
    }
}

impl Drop for Headless {
    fn drop(&mut self) {
        // The display stays initialized; other tests share it.
        let _ = self.egl.make_current(self.display, None, None, None);
        let _ = self.egl.destroy_context(self.display, self.context);
    }
}

/// Run `test` with a current context, or skip when none can be created.
fn with_gl(test: impl FnOnce(&Arc<glow::Context>)) {
    let _lock = GL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(headless) = Headless::new() else {
        eprintln!("no surfaceless EGL context available, skipping");
        return;
    };
    test(&headless.gl);
}

/// An offscreen target and a way to read its pixels back.
struct Canvas {
    gl: Arc<glow::Context>,
    texture: FrameBufferTexture,
    framebuffer: FrameBuffer,
    read: glow::Framebuffer,
}

impl Canvas {
    fn new(gl: &Arc<glow::Context>) -> Self {
        unsafe {
            let texture = FrameBufferTexture::new(Arc::clone(gl), SIZE, SIZE).unwrap();
            let framebuffer = FrameBuffer::new(Arc::clone(gl)).unwrap();
            let read = gl.create_framebuffer().unwrap();
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(read));
            gl.framebuffer_texture_2d(
                glow::READ_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture.texture().handle()),
                0,
            );
            Self {
                gl: Arc::clone(gl),
                texture,
                framebuffer,
                read,
            }
        }
    }

    /// Clear, then run `draw` with the canvas as draw target.
    fn render(&self, draw: impl FnOnce()) {
        let target = unsafe { self.framebuffer.to_texture(&self.texture) };
        target.clear();
        draw();
        drop(target);
        unsafe { self.gl.finish() };
    }

    fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let mut rgba = [0; 4];
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.read));
            self.gl.read_pixels(
                x,
                y,
                1,
                1,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(&mut rgba)),
            );
        }
        rgba
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_framebuffer(self.read);
            self.framebuffer.destroy();
            self.texture.destroy();
        }
    }
}

const EVERY_TYPE_FRAGMENT_SRC: &str = r"#version 330 core

uniform float f;
uniform vec2 v2;
uniform vec3 v3;
uniform vec4 v4;
uniform int i;
uniform ivec2 iv2;
uniform uint u;
uniform uvec3 uv3;
uniform bool b;
uniform mat2x3 m23;
uniform mat4 m4;
uniform float foo[4];
uniform vec2 pts[3];

out vec4 out_color;

void main() {
    float sum = f + v2.x + v3.y + v4.z + float(i) + float(iv2.y) + float(u) + float(uv3.z)
        + (b ? 1.0 : 0.0) + m23[1][2] + m4[3][0];
    for (int k = 0; k < 4; k++) {
        sum += foo[k];
    }
    for (int k = 0; k < 3; k++) {
        sum += pts[k].y;
    }
    out_color = vec4(sum);
}
";

fn every_type_program(gl: &Arc<glow::Context>) -> ShaderProgram {
    unsafe {
        ShaderProgram::new(
            Arc::clone(gl),
            shaders::LIGHT_VERTEX_SRC,
            EVERY_TYPE_FRAGMENT_SRC,
            None,
        )
    }
    .unwrap()
}

#[test]
fn uniforms_read_back_what_was_written() {
    with_gl(|gl| unsafe {
        let program = every_type_program(gl);
        let m23: [[f32; 2]; 3] = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let m4: [[f32; 4]; 4] = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];

        program.set("f", 1.5_f32).unwrap();
        program.set("v2", [1.0_f32, 2.0]).unwrap();
        program.set("v3", [1.0_f32, 2.0, 3.0]).unwrap();
        program.set("v4", [1.0_f32, 2.0, 3.0, 4.0]).unwrap();
        program.set("i", -7_i32).unwrap();
        program.set("iv2", [3_i32, -4]).unwrap();
        program.set("u", 4_000_000_000_u32).unwrap();
        program.set("uv3", [1_u32, 2, 3]).unwrap();
        program.set("b", true).unwrap();
        program.set("m23", m23).unwrap();
        program.set("m4", m4).unwrap();
        program.set("foo", [1.0_f32, 2.0, 3.0, 4.0]).unwrap();
        program.set("pts", vec![[1.0_f32, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();

        assert_eq!(program.get("f").unwrap().as_f32(), Some(1.5));
        assert_eq!(program.get("v2").unwrap().to_array(), Some([1.0, 2.0]));
        assert_eq!(program.get("v3").unwrap().to_array(), Some([1.0, 2.0, 3.0]));
        assert_eq!(program.get("v4").unwrap().to_array(), Some([1.0, 2.0, 3.0, 4.0]));
        assert_eq!(program.get("i").unwrap().as_i32(), Some(-7));
        assert_eq!(program.get("iv2").unwrap().as_ints(), Some(&[3, -4][..]));
        assert_eq!(program.get("u").unwrap().as_u32(), Some(4_000_000_000));
        assert_eq!(
            program.get("uv3").unwrap(),
            UniformValue::UInt(vec![1, 2, 3])
        );
        assert_eq!(program.get("b").unwrap().as_bool(), Some(true));
        assert_eq!(program.get("m23").unwrap().to_matrix::<2, 3>(), Some(m23));
        assert_eq!(program.get("m4").unwrap().to_matrix::<4, 4>(), Some(m4));

        let foo = program.get("foo").unwrap();
        assert_eq!(program.uniforms().info("foo").unwrap().size, 4);
        assert_eq!(foo.as_floats(), Some(&[1.0, 2.0, 3.0, 4.0][..]));

        let pts = program.get("pts").unwrap();
        assert_eq!(program.uniforms().info("pts").unwrap().size, 3);
        assert_eq!(
            pts.to_elements::<2>(),
            Some(vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]])
        );

        program.destroy();
    });
}

#[test]
fn unknown_uniform_names_are_rejected() {
    with_gl(|gl| unsafe {
        let program = every_type_program(gl);
        assert!(matches!(
            program.set("missing", 1.0_f32),
            Err(Error::UnknownUniform(name)) if name == "missing"
        ));
        assert!(matches!(
            program.get("missing"),
            Err(Error::UnknownUniform(name)) if name == "missing"
        ));
        program.destroy();
    });
}

#[test]
fn blending_scope_restores_previous_state() {
    with_gl(|gl| unsafe {
        gl.disable(glow::BLEND);
        let before = BlendState::capture(gl);

        {
            let _scope = BlendingScope::uniform(gl, BlendFunc::MAX);
            assert_eq!(
                BlendState::capture(gl),
                BlendState::with_funcs(BlendFunc::MAX, BlendFunc::MAX)
            );
            {
                let _inner = BlendingScope::uniform(gl, BlendFunc::ALPHA);
            }
            assert_eq!(
                BlendState::capture(gl),
                BlendState::with_funcs(BlendFunc::MAX, BlendFunc::MAX)
            );
        }
        assert_eq!(BlendState::capture(gl), before);

        let unwound = catch_unwind(AssertUnwindSafe(|| {
            let _scope = BlendingScope::uniform(gl, BlendFunc::ALPHA);
            panic!("draw failed inside a blending scope");
        }));
        assert!(unwound.is_err());
        assert_eq!(BlendState::capture(gl), before);
    });
}

#[test]
fn active_program_restores_previous_binding() {
    with_gl(|gl| unsafe {
        let outer = every_type_program(gl);
        let inner = every_type_program(gl);
        let current = || gl.get_parameter_program(glow::CURRENT_PROGRAM);

        outer.bind();
        {
            let _active = inner.activate();
            assert_eq!(current(), Some(inner.handle()));
        }
        assert_eq!(current(), Some(outer.handle()));

        inner.set("f", 2.0_f32).unwrap();
        assert_eq!(current(), Some(outer.handle()));

        outer.unbind();
        assert_eq!(current(), None);

        outer.destroy();
        inner.destroy();
    });
}

#[test]
fn compile_errors_quote_the_offending_line() {
    const BROKEN: &str = "#version 330 core\nout vec4 o;\nvoid main() {\n    o = vec4(1) +;\n}\n";
    with_gl(|gl| unsafe {
        let result = ShaderProgram::new(Arc::clone(gl), shaders::LIGHT_VERTEX_SRC, BROKEN, None);
        match result {
            Err(Error::ShaderCompilation { stage, message }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(
                    message.contains(">>>     o = vec4(1) +;"),
                    "no excerpt in {message:?}"
                );
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("broken shader compiled"),
        }
    });
}

/// Light at the left edge, a small triangle in its way, and a pixel behind
/// the triangle.
const LIGHT: [f32; 2] = [8.0, 32.0];
const OCCLUDER: [Vertex; 3] = [
    Vertex::new(20.0, 28.0),
    Vertex::new(20.0, 36.0),
    Vertex::new(24.0, 32.0),
];
const SHADOWED: (i32, i32) = (40, 32);
const LIT: (i32, i32) = (12, 32);

fn light_settings(mode: ExtrusionMode) -> LightSettings {
    LightSettings {
        shadows: ShadowSettings {
            extrusion: 1.0,
            mode,
        },
        ..LightSettings::default()
    }
}

fn render_light(
    gl: &Arc<glow::Context>,
    occluders: Option<&[Vertex]>,
    mode: ExtrusionMode,
    cut_shadows: bool,
) -> ([u8; 4], [u8; 4]) {
    let canvas = Canvas::new(gl);
    let mut light = unsafe {
        GLight::new(
            Arc::clone(gl),
            [1.0, 1.0, 1.0],
            LIGHT,
            occluders,
            light_settings(mode),
        )
    }
    .unwrap();
    canvas.render(|| unsafe { light.draw(cut_shadows).unwrap() });
    let pixels = (
        canvas.pixel(SHADOWED.0, SHADOWED.1),
        canvas.pixel(LIT.0, LIT.1),
    );
    unsafe { light.destroy() };
    pixels
}

fn assert_shadow_cut(mode: ExtrusionMode) {
    with_gl(|gl| {
        let before = unsafe { BlendState::capture(gl) };

        let (shadowed, lit) = render_light(gl, Some(&OCCLUDER), mode, true);
        assert_eq!(shadowed, [0, 0, 0, 0]);
        assert_eq!(lit, [255, 255, 255, 255]);

        let (shadowed, _) = render_light(gl, Some(&OCCLUDER), mode, false);
        assert_eq!(shadowed, [255, 255, 255, 255]);

        let (open, _) = render_light(gl, None, mode, true);
        assert_eq!(open, [255, 255, 255, 255]);

        assert_eq!(unsafe { BlendState::capture(gl) }, before);
    });
}

#[test]
fn geometry_shader_shadows_cut_light_alpha() {
    assert_shadow_cut(ExtrusionMode::GeometryShader);
}

#[test]
fn cpu_shadows_cut_light_alpha() {
    assert_shadow_cut(ExtrusionMode::Cpu);
}

#[test]
fn light_position_reaches_the_shadow_map() {
    with_gl(|gl| unsafe {
        let mut light = GLight::new(
            Arc::clone(gl),
            [1.0, 1.0, 1.0],
            LIGHT,
            Some(&OCCLUDER),
            light_settings(ExtrusionMode::Cpu),
        )
        .unwrap();
        assert_eq!(light.shadow_map().unwrap().position(), LIGHT);

        light.set_position([5.0, 7.0]).unwrap();
        assert_eq!(light.position().unwrap(), [5.0, 7.0]);
        assert_eq!(light.shadow_map().unwrap().position(), [5.0, 7.0]);

        light.set_occluders(Some(&OCCLUDER)).unwrap();
        assert_eq!(light.shadow_map().unwrap().position(), [5.0, 7.0]);

        light.destroy();
    });
}

#[test]
fn solid_rect_scales_about_its_pivot() {
    with_gl(|gl| unsafe {
        let canvas = Canvas::new(gl);
        let rect = SolidRect::new(Arc::clone(gl), Rect::new(8.0, 8.0, [0.0, 0.0])).unwrap();
        let red = [1.0, 0.0, 0.0, 1.0];

        canvas.render(|| rect.draw(16.0, 16.0, red, 1.0).unwrap());
        assert_eq!(canvas.pixel(20, 20), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(28, 28), [0, 0, 0, 0]);

        canvas.render(|| rect.draw(16.0, 16.0, red, 2.0).unwrap());
        assert_eq!(canvas.pixel(28, 28), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(34, 34), [0, 0, 0, 0]);
        assert_eq!(canvas.pixel(12, 12), [0, 0, 0, 0]);

        rect.destroy();
    });
}

#[test]
fn rect_batch_scales_about_the_viewport_origin() {
    with_gl(|gl| unsafe {
        let canvas = Canvas::new(gl);
        let mut batch = RectBatch::new(Arc::clone(gl)).unwrap();
        batch.push([8.0, 8.0], Rect::new(8.0, 8.0, [0.0, 0.0]));
        let green = [0.0, 1.0, 0.0, 1.0];

        canvas.render(|| batch.draw(green, 1.0).unwrap());
        assert_eq!(canvas.pixel(10, 10), [0, 255, 0, 255]);
        assert_eq!(canvas.pixel(20, 20), [0, 0, 0, 0]);

        canvas.render(|| batch.draw(green, 2.0).unwrap());
        assert_eq!(canvas.pixel(10, 10), [0, 0, 0, 0]);
        assert_eq!(canvas.pixel(20, 20), [0, 255, 0, 255]);

        batch.destroy();
    });
}
