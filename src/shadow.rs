//! Shadow volumes extruded from occluder edges.
//!
//! For every occluder triangle and each of its three edges, a quad is built
//! from the two edge vertices and the same vertices pushed a fixed distance
//! further along the ray from the light. Drawn as an alpha mask after the
//! light itself, the quads cut the light out wherever an occluder blocks it.
//!
//! The extrusion is short on purpose: shadows end `extrusion` clip units
//! behind each occluder vertex, so occluders far from their light cast
//! visibly truncated shadows.

use std::sync::Arc;

use glow::HasContext;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::primitives::project;
use crate::program::ShaderProgram;
use crate::shaders;
use crate::types::{Vertex, Viewport};

/// Where shadow volumes are extruded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrusionMode {
    /// Geometry shader when the context supports one, CPU otherwise.
    #[default]
    Auto,
    /// A geometry shader extrudes on the GPU every draw.
    GeometryShader,
    /// Quads are computed on the CPU and re-uploaded every draw.
    Cpu,
}

/// Tunables of a [`ShadowMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Distance each occluder vertex is pushed away from the light, in clip
    /// space units (2.0 spans the whole viewport).
    pub extrusion: f32,
    /// Extrusion strategy.
    pub mode: ExtrusionMode,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            extrusion: 1.0,
            mode: ExtrusionMode::Auto,
        }
    }
}

/// Push `point` `distance` units further along the ray from `light`.
///
/// A point on the light has no ray and stays put.
#[must_use]
pub fn extrude(point: [f32; 2], light: [f32; 2], distance: f32) -> [f32; 2] {
    let ray = [point[0] - light[0], point[1] - light[1]];
    let len = ray[0].hypot(ray[1]);
    if len > 0.0 {
        [
            point[0] + distance * ray[0] / len,
            point[1] + distance * ray[1] / len,
        ]
    } else {
        point
    }
}

/// Shadow quads for a triangle list, three per triangle.
///
/// Each quad is in strip order: edge start, edge start extruded, edge end,
/// edge end extruded. Trailing vertices that do not form a whole triangle
/// are ignored.
#[must_use]
pub fn shadow_volume(occluders: &[Vertex], light: [f32; 2], extrusion: f32) -> Vec<[Vertex; 4]> {
    let mut quads = Vec::with_capacity(occluders.len());
    for triangle in occluders.chunks_exact(3) {
        for i in 0..3 {
            let start = triangle[i].position;
            let end = triangle[(i + 1) % 3].position;
            quads.push([
                Vertex::from(start),
                Vertex::from(extrude(start, light, extrusion)),
                Vertex::from(end),
                Vertex::from(extrude(end, light, extrusion)),
            ]);
        }
    }
    quads
}

/// Split strip-ordered quads into a plain triangle list.
fn quads_to_triangles(quads: &[[Vertex; 4]]) -> Vec<Vertex> {
    quads
        .iter()
        .flat_map(|&[a, b, c, d]| [a, b, c, c, b, d])
        .collect()
}

/// Shadow-casting geometry for one light.
///
/// Occluders are fixed at construction; build a new map when they change.
/// The light position is plain state, pushed to the GPU at draw time.
pub struct ShadowMap {
    occluders: Arc<[Vertex]>,
    program: ShaderProgram,
    mesh: Mesh,
    mode: ExtrusionMode,
    position: [f32; 2],
    extrusion: f32,
}

impl ShadowMap {
    /// Build the extrusion program and upload the occluders.
    ///
    /// `occluders` is a flat triangle list in window pixels.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the shadow program cannot be built or GL objects cannot be
    /// created.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        occluders: &[Vertex],
        settings: ShadowSettings,
    ) -> Result<Self> {
        let mode = match settings.mode {
            ExtrusionMode::Auto if supports_geometry_shaders(&gl) => ExtrusionMode::GeometryShader,
            ExtrusionMode::Auto => {
                log::warn!("geometry shaders unavailable, extruding shadows on the CPU");
                ExtrusionMode::Cpu
            }
            explicit => explicit,
        };

        let (program, mesh) = unsafe {
            match mode {
                ExtrusionMode::Cpu => (
                    ShaderProgram::new(
                        Arc::clone(&gl),
                        shaders::SHADOW_CPU_VERTEX_SRC,
                        shaders::SHADOW_FRAGMENT_SRC,
                        None,
                    )?,
                    Mesh::new(gl, &[], glow::STREAM_DRAW)?,
                ),
                _ => (
                    ShaderProgram::new(
                        Arc::clone(&gl),
                        shaders::SHADOW_VERTEX_SRC,
                        shaders::SHADOW_FRAGMENT_SRC,
                        Some(shaders::SHADOW_GEOMETRY_SRC),
                    )?,
                    Mesh::new(gl, occluders, glow::STATIC_DRAW)?,
                ),
            }
        };

        log::debug!(
            "shadow map with {} occluder triangles, {mode:?} extrusion",
            occluders.len() / 3
        );

        Ok(Self {
            occluders: occluders.into(),
            program,
            mesh,
            mode,
            position: [0.0, 0.0],
            extrusion: settings.extrusion,
        })
    }

    /// The occluder triangles, in window pixels.
    #[must_use]
    pub fn occluders(&self) -> &[Vertex] {
        &self.occluders
    }

    /// The resolved extrusion strategy (never [`ExtrusionMode::Auto`]).
    #[must_use]
    pub fn mode(&self) -> ExtrusionMode {
        self.mode
    }

    /// Light position in window pixels.
    #[must_use]
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Move the light. Takes effect on the next draw.
    pub fn set_position(&mut self, position: [f32; 2]) {
        self.position = position;
    }

    /// Extrusion distance in clip space units.
    #[must_use]
    pub fn extrusion(&self) -> f32 {
        self.extrusion
    }

    /// Change the extrusion distance. Takes effect on the next draw.
    pub fn set_extrusion(&mut self, extrusion: f32) {
        self.extrusion = extrusion;
    }

    /// Draw the shadow volumes as opaque white into the current target.
    ///
    /// The light position is projected into clip space once, here, with the
    /// projection of the current viewport, matching the occluder vertices.
    /// Vertex-array and buffer bindings are cleared on every exit path, and
    /// the previously bound program is restored.
    ///
    /// # Safety
    ///
    /// Requires the context this map was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors from the shadow program.
    pub unsafe fn draw(&mut self) -> Result<()> {
        let projection = unsafe { Viewport::current(self.program.gl()) }.projection();
        let light = project(&projection, self.position);

        if self.mode == ExtrusionMode::Cpu {
            let occluders: Vec<Vertex> = self
                .occluders
                .iter()
                .map(|v| Vertex::from(project(&projection, v.position)))
                .collect();
            let triangles = quads_to_triangles(&shadow_volume(&occluders, light, self.extrusion));
            unsafe { self.mesh.upload(&triangles) };

            let _active = unsafe { self.program.activate() };
            let bound = unsafe { self.mesh.bind() };
            bound.draw(glow::TRIANGLES);
            return Ok(());
        }

        let active = unsafe { self.program.activate() };
        let bound = unsafe { self.mesh.bind() };
        active.set("model_view_projection", projection)?;
        active.set("light_position", light)?;
        active.set("extrusion", self.extrusion)?;
        bound.draw(glow::TRIANGLES);
        Ok(())
    }

    /// Delete the GL objects.
    ///
    /// # Safety
    ///
    /// Must be called with the context this map was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.program.destroy();
            self.mesh.destroy();
        }
    }
}

/// Geometry shaders are core in desktop GL 3.2 and absent from GLES 3.0 and
/// WebGL 2.
fn supports_geometry_shaders(gl: &glow::Context) -> bool {
    let version = gl.version();
    !version.is_embedded && (version.major, version.minor) >= (3, 2)
}
