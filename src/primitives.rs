//! Occluder geometry: rectangles, rectangle batches and arbitrary polygons,
//! plus the projection helpers shared by every pixel-space drawable.

use std::sync::Arc;

use lyon::math::point;
use lyon::path::Path as LyonPath;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};

use crate::error::Result;
use crate::mesh::Mesh;
use crate::program::ShaderProgram;
use crate::shaders;
use crate::types::{Mat4, Vertex, Viewport};

/// The two triangles covering the axis-aligned rectangle `(x1, y1)`–`(x2, y2)`.
#[must_use]
pub fn rect_triangles(x1: f32, y1: f32, x2: f32, y2: f32) -> [Vertex; 6] {
    [
        Vertex::new(x1, y1),
        Vertex::new(x1, y2),
        Vertex::new(x2, y2),
        Vertex::new(x2, y1),
        Vertex::new(x2, y2),
        Vertex::new(x1, y1),
    ]
}

/// Row-major orthographic projection from pixels to clip space.
///
/// Maps `[0, width] × [0, height]` (origin at the lower left) onto
/// `[-1, 1]²`, after translating by `(x, y)` pixels.
#[must_use]
pub fn ortho(width: f32, height: f32, x: f32, y: f32) -> Mat4 {
    [
        [2.0 / width, 0.0, 0.0, (2.0 * x - width) / width],
        [0.0, 2.0 / height, 0.0, (2.0 * y - height) / height],
        [0.0, 0.0, -2.0, -1.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Apply a row-major projection to a 2D point (`z = 0`, `w = 1`).
#[must_use]
pub fn project(matrix: &Mat4, [x, y]: [f32; 2]) -> [f32; 2] {
    let row = |r: &[f32; 4]| r[0] * x + r[1] * y + r[3];
    [row(&matrix[0]), row(&matrix[1])]
}

/// Tessellate a closed polygon into a flat triangle list.
///
/// Uses the non-zero fill rule, so self-intersecting outlines still produce
/// a sensible occluder. Returns `None` for fewer than three points or when
/// tessellation fails.
#[must_use]
pub fn polygon_triangles(points: &[[f32; 2]]) -> Option<Vec<Vertex>> {
    let (first, rest) = points.split_first()?;
    if rest.len() < 2 {
        return None;
    }

    let mut builder = LyonPath::builder();
    builder.begin(point(first[0], first[1]));
    for p in rest {
        builder.line_to(point(p[0], p[1]));
    }
    builder.close();
    let path = builder.build();

    let mut geometry: VertexBuffers<Vertex, u32> = VertexBuffers::new();
    let result = FillTessellator::new().tessellate_path(
        &path,
        &FillOptions::tolerance(0.01).with_fill_rule(FillRule::NonZero),
        &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| Vertex {
            position: vertex.position().to_array(),
        }),
    );

    match result {
        Ok(()) if !geometry.indices.is_empty() => Some(
            geometry
                .indices
                .iter()
                .map(|&index| geometry.vertices[index as usize])
                .collect(),
        ),
        Ok(()) => None,
        Err(err) => {
            log::warn!("polygon tessellation failed: {err:?}");
            None
        }
    }
}

/// A rectangle with a pivot, as plain geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Point of the rectangle placed at its position.
    pub pivot: [f32; 2],
}

impl Rect {
    /// A rectangle pivoting around `pivot`.
    #[must_use]
    pub fn new(width: f32, height: f32, pivot: [f32; 2]) -> Self {
        Self {
            width,
            height,
            pivot,
        }
    }

    /// Triangles of this rectangle with its pivot at `position`.
    #[must_use]
    pub fn triangles_at(&self, [x, y]: [f32; 2]) -> [Vertex; 6] {
        let x1 = x - self.pivot[0];
        let y1 = y - self.pivot[1];
        rect_triangles(x1, y1, x1 + self.width, y1 + self.height)
    }
}

/// Build the solid-color program shared by [`SolidRect`] and [`RectBatch`].
unsafe fn solid_program(gl: &Arc<glow::Context>) -> Result<ShaderProgram> {
    unsafe {
        ShaderProgram::new(
            Arc::clone(gl),
            shaders::SOLID_VERTEX_SRC,
            shaders::SOLID_FRAGMENT_SRC,
            None,
        )
    }
}

/// Draw `mesh` in one color, its origin moved to `position` pixels and its
/// vertices scaled about that origin.
unsafe fn draw_solid(
    program: &ShaderProgram,
    mesh: &Mesh,
    position: [f32; 2],
    scale: f32,
    color: [f32; 4],
) -> Result<()> {
    let viewport = unsafe { Viewport::current(program.gl()) };
    let active = unsafe { program.activate() };
    active.set("model_view_projection", viewport.projection_at(position))?;
    active.set("scale", scale)?;
    active.set("color", color)?;

    let bound = unsafe { mesh.bind() };
    bound.draw(glow::TRIANGLES);
    Ok(())
}

/// A [`Rect`] with its own GPU mesh, drawn in a solid color.
pub struct SolidRect {
    rect: Rect,
    program: ShaderProgram,
    mesh: Mesh,
}

impl SolidRect {
    /// Upload the triangles of `rect`, pivot at the mesh origin.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the solid-color program cannot be built or GL objects cannot
    /// be created.
    pub unsafe fn new(gl: Arc<glow::Context>, rect: Rect) -> Result<Self> {
        let program = unsafe { solid_program(&gl)? };
        let mesh = unsafe { Mesh::new(gl, &rect.triangles_at([0.0, 0.0]), glow::STATIC_DRAW)? };
        Ok(Self {
            rect,
            program,
            mesh,
        })
    }

    /// The rectangle geometry.
    #[must_use]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    /// Draw with the pivot at `(x, y)` pixels, scaled about the pivot.
    ///
    /// # Safety
    ///
    /// Requires the context this rectangle was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors from the solid-color program.
    pub unsafe fn draw(&self, x: f32, y: f32, color: [f32; 4], scale: f32) -> Result<()> {
        unsafe { draw_solid(&self.program, &self.mesh, [x, y], scale, color) }
    }

    /// Delete the GL objects.
    ///
    /// # Safety
    ///
    /// Must be called with the context this rectangle was created with, and
    /// at most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.program.destroy();
            self.mesh.destroy();
        }
    }
}

/// Many rectangles drawn with one draw call.
///
/// The concatenated triangles are also the occluder list handed to lights.
pub struct RectBatch {
    rects: Vec<([f32; 2], Rect)>,
    program: ShaderProgram,
    mesh: Mesh,
    dirty: bool,
}

impl RectBatch {
    /// Create an empty batch.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the solid-color program cannot be built or GL objects cannot
    /// be created.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self> {
        let program = unsafe { solid_program(&gl)? };
        let mesh = unsafe { Mesh::new(gl, &[], glow::DYNAMIC_DRAW)? };
        Ok(Self {
            rects: Vec::new(),
            program,
            mesh,
            dirty: false,
        })
    }

    /// Add a rectangle with its pivot at `position`.
    pub fn push(&mut self, position: [f32; 2], rect: Rect) {
        self.rects.push((position, rect));
        self.dirty = true;
    }

    /// Remove every rectangle.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.dirty = true;
    }

    /// Number of rectangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Whether the batch holds no rectangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Every rectangle's triangles, in insertion order.
    #[must_use]
    pub fn triangles(&self) -> Vec<Vertex> {
        self.rects
            .iter()
            .flat_map(|(position, rect)| rect.triangles_at(*position))
            .collect()
    }

    /// Draw every rectangle in one solid color, scaled about the viewport
    /// origin.
    ///
    /// Geometry is re-uploaded only after the batch changed.
    ///
    /// # Safety
    ///
    /// Requires the context this batch was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors from the solid-color program.
    pub unsafe fn draw(&mut self, color: [f32; 4], scale: f32) -> Result<()> {
        if self.dirty {
            unsafe { self.mesh.upload(&self.triangles()) };
            self.dirty = false;
        }
        unsafe { draw_solid(&self.program, &self.mesh, [0.0, 0.0], scale, color) }
    }

    /// Delete the GL objects.
    ///
    /// # Safety
    ///
    /// Must be called with the context this batch was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.program.destroy();
            self.mesh.destroy();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_close(actual: [f32; 2], expected: [f32; 2]) {
        assert!(
            (actual[0] - expected[0]).abs() < 1e-6 && (actual[1] - expected[1]).abs() < 1e-6,
            "expected {expected:?}, got {actual:?}",
        );
    }

    #[test]
    fn rect_triangles_cover_both_halves() {
        let tris = rect_triangles(0.0, 0.0, 2.0, 1.0);
        assert_eq!(tris[0], Vertex::new(0.0, 0.0));
        assert_eq!(tris[2], Vertex::new(2.0, 1.0));
        assert_eq!(tris[3], Vertex::new(2.0, 0.0));
        assert_eq!(tris[5], Vertex::new(0.0, 0.0));
    }

    #[test]
    fn ortho_maps_viewport_corners_to_clip_corners() {
        let m = ortho(800.0, 600.0, 0.0, 0.0);
        assert_close(project(&m, [0.0, 0.0]), [-1.0, -1.0]);
        assert_close(project(&m, [800.0, 600.0]), [1.0, 1.0]);
        assert_close(project(&m, [400.0, 300.0]), [0.0, 0.0]);
    }

    #[test]
    fn ortho_translates_by_offset() {
        let m = ortho(100.0, 100.0, 50.0, 0.0);
        assert_close(project(&m, [0.0, 0.0]), [0.0, -1.0]);
    }

    #[test]
    fn pivot_shifts_rect_triangles() {
        let rect = Rect::new(4.0, 2.0, [2.0, 1.0]);
        let tris = rect.triangles_at([10.0, 10.0]);
        assert_eq!(tris[0], Vertex::new(8.0, 9.0));
        assert_eq!(tris[2], Vertex::new(12.0, 11.0));
    }

    #[test]
    fn square_polygon_becomes_two_triangles() {
        let tris = polygon_triangles(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap();
        assert_eq!(tris.len(), 6);
        for v in &tris {
            assert!((0.0..=1.0).contains(&v.position[0]));
            assert!((0.0..=1.0).contains(&v.position[1]));
        }
    }

    #[test]
    fn degenerate_polygons_have_no_triangles() {
        assert!(polygon_triangles(&[]).is_none());
        assert!(polygon_triangles(&[[0.0, 0.0], [1.0, 1.0]]).is_none());
    }
}
