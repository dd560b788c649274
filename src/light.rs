//! Point lights with optional shadow casting.

use std::sync::Arc;

use crate::blending::{BlendFactor, BlendFunc, BlendMode, BlendingScope};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::program::ShaderProgram;
use crate::shaders;
use crate::shadow::{ShadowMap, ShadowSettings};
use crate::types::Vertex;

/// Full-viewport quad in clip space, drawn as a triangle strip.
const QUAD: [Vertex; 4] = [
    Vertex::new(-1.0, -1.0),
    Vertex::new(-1.0, 1.0),
    Vertex::new(1.0, -1.0),
    Vertex::new(1.0, 1.0),
];

/// Color channels of the shadow pass: `0 * src + 0 * dst`, so shadowed
/// pixels lose their color as well.
const SHADOW_CUT_RGB: BlendFunc =
    BlendFunc::new(BlendMode::Add, BlendFactor::Zero, BlendFactor::Zero);

/// Alpha channel of the shadow pass: `0 * src + (1 - src_alpha) * dst`.
///
/// Shadow volumes have alpha 1, so the light's alpha drops to 0 under them.
const SHADOW_CUT_ALPHA: BlendFunc = BlendFunc::new(
    BlendMode::Add,
    BlendFactor::Zero,
    BlendFactor::OneMinusSrcAlpha,
);

/// Tunables of a [`GLight`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSettings {
    /// Brightness scale of the falloff.
    pub radius: f32,
    /// Distance exponent of the falloff.
    pub falloff: f32,
    /// Shadow map settings, used when occluders are given.
    pub shadows: ShadowSettings,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            radius: 100.0,
            falloff: 1.25,
            shadows: ShadowSettings::default(),
        }
    }
}

/// A colored point light drawn over the whole viewport.
///
/// The light writes `radius / distance^falloff * color` with alpha 1 to every
/// pixel, then (when it has a [`ShadowMap`]) zeroes the alpha of every pixel
/// covered by a shadow volume. Consumers treat alpha as light coverage.
///
/// Color, position, radius and falloff live only in the shader's uniforms:
/// setters write them immediately and getters read them back from GL, so the
/// two can never disagree.
///
/// # Example
///
/// ```no_run
/// # use glow_lights2d::{GLight, LightSettings, Vertex};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>, occluders: &[Vertex]) -> glow_lights2d::Result<()> {
/// let mut light = unsafe {
///     GLight::new(gl, [1.0, 0.8, 0.6], [100.0, 100.0], Some(occluders), LightSettings::default())?
/// };
///
/// // On mouse move:
/// unsafe { light.set_position([200.0, 150.0])? };
///
/// // Each frame:
/// unsafe { light.draw(true)? };
/// # Ok(())
/// # }
/// ```
pub struct GLight {
    gl: Arc<glow::Context>,
    program: ShaderProgram,
    shadows: Option<ShadowMap>,
    shadow_settings: ShadowSettings,
    quad: Mesh,
}

impl GLight {
    /// Create a light.
    ///
    /// `position` is in window pixels with the origin at the lower left.
    /// Without occluders the light casts no shadows, which is a valid fill
    /// light rather than an error.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if a program cannot be built or GL objects cannot be created.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        color: [f32; 3],
        position: [f32; 2],
        occluders: Option<&[Vertex]>,
        settings: LightSettings,
    ) -> Result<Self> {
        let program = unsafe {
            ShaderProgram::new(
                Arc::clone(&gl),
                shaders::LIGHT_VERTEX_SRC,
                shaders::LIGHT_FRAGMENT_SRC,
                None,
            )?
        };
        let shadows = match occluders {
            Some(occluders) => unsafe {
                Some(ShadowMap::new(Arc::clone(&gl), occluders, settings.shadows)?)
            },
            None => None,
        };
        let quad = unsafe { Mesh::new(Arc::clone(&gl), &QUAD, glow::STATIC_DRAW)? };

        let mut light = Self {
            gl,
            program,
            shadows,
            shadow_settings: settings.shadows,
            quad,
        };
        unsafe {
            light.set_color(color)?;
            light.set_position(position)?;
            light.set_radius(settings.radius)?;
            light.set_falloff(settings.falloff)?;
        }
        Ok(light)
    }

    /// Light color, read back from the shader.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform read errors.
    pub unsafe fn color(&self) -> Result<[f32; 3]> {
        unsafe { self.read_array("light_color") }
    }

    /// Set the light color.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform write errors.
    pub unsafe fn set_color(&mut self, color: [f32; 3]) -> Result<()> {
        unsafe { self.program.set("light_color", color) }
    }

    /// Light position in window pixels, read back from the shader.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform read errors.
    pub unsafe fn position(&self) -> Result<[f32; 2]> {
        unsafe { self.read_array("light_position") }
    }

    /// Move the light, and its shadow map along with it.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform write errors.
    pub unsafe fn set_position(&mut self, position: [f32; 2]) -> Result<()> {
        unsafe { self.program.set("light_position", position)? };
        if let Some(shadows) = &mut self.shadows {
            shadows.set_position(position);
        }
        Ok(())
    }

    /// Falloff brightness scale, read back from the shader.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform read errors.
    pub unsafe fn radius(&self) -> Result<f32> {
        unsafe { self.read_array("radius") }.map(|[radius]| radius)
    }

    /// Set the falloff brightness scale.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform write errors.
    pub unsafe fn set_radius(&mut self, radius: f32) -> Result<()> {
        unsafe { self.program.set("radius", radius) }
    }

    /// Falloff distance exponent, read back from the shader.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform read errors.
    pub unsafe fn falloff(&self) -> Result<f32> {
        unsafe { self.read_array("falloff") }.map(|[falloff]| falloff)
    }

    /// Set the falloff distance exponent.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform write errors.
    pub unsafe fn set_falloff(&mut self, falloff: f32) -> Result<()> {
        unsafe { self.program.set("falloff", falloff) }
    }

    /// Whether this light casts shadows.
    #[must_use]
    pub fn has_shadows(&self) -> bool {
        self.shadows.is_some()
    }

    /// The shadow map, if any.
    #[must_use]
    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadows.as_ref()
    }

    /// Replace the occluders with a freshly built shadow map, or drop
    /// shadows altogether with `None`.
    ///
    /// The current light position carries over.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Fails if the new shadow map cannot be built; the old one is kept in
    /// that case.
    pub unsafe fn set_occluders(&mut self, occluders: Option<&[Vertex]>) -> Result<()> {
        let shadows = match occluders {
            Some(occluders) => {
                let mut shadows = unsafe {
                    ShadowMap::new(Arc::clone(&self.gl), occluders, self.shadow_settings)?
                };
                shadows.set_position(unsafe { self.position()? });
                Some(shadows)
            }
            None => None,
        };
        if let Some(old) = std::mem::replace(&mut self.shadows, shadows) {
            unsafe { old.destroy() };
        }
        Ok(())
    }

    /// Draw the light into the current target, then cut its shadows out of
    /// the alpha channel if `cut_shadows` is set and occluders exist.
    ///
    /// Blending across several lights (typically `MAX`) is the caller's
    /// business; the shadow pass installs and then restores its own blend
    /// state.
    ///
    /// # Safety
    ///
    /// Requires the context this light was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors from the shadow pass.
    pub unsafe fn draw(&mut self, cut_shadows: bool) -> Result<()> {
        unsafe { self.draw_light() };
        if cut_shadows {
            if let Some(shadows) = &mut self.shadows {
                let _blending =
                    unsafe { BlendingScope::separate(&self.gl, SHADOW_CUT_RGB, SHADOW_CUT_ALPHA) };
                unsafe { shadows.draw()? };
            }
        }
        Ok(())
    }

    unsafe fn draw_light(&self) {
        let _active = unsafe { self.program.activate() };
        let bound = unsafe { self.quad.bind() };
        bound.draw(glow::TRIANGLE_STRIP);
    }

    unsafe fn read_array<const N: usize>(&self, name: &str) -> Result<[f32; N]> {
        let value = unsafe { self.program.get(name)? };
        match value.to_array() {
            Some(array) => Ok(array),
            None => Err(Error::UniformType {
                name: name.to_owned(),
                kind: self.program.uniforms().info(name)?.kind,
                reason: format!("expected {N} float components, found {}", value.len()),
            }),
        }
    }

    /// Delete the GL objects, including the shadow map.
    ///
    /// # Safety
    ///
    /// Must be called with the context this light was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.program.destroy();
            self.quad.destroy();
            if let Some(shadows) = &self.shadows {
                shadows.destroy();
            }
        }
    }
}
