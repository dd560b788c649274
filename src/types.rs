//! Plain value types shared by the drawables.

use bytemuck::{Pod, Zeroable};
use glow::HasContext;

/// Row-major 4×4 matrix, as uploaded with the transpose flag set.
pub type Mat4 = [[f32; 4]; 4];

/// A 2D vertex, ready for the GPU.
///
/// Every buffer in this crate uses this single `vec2` layout at attribute
/// location 0.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in pixels (or clip space for full-screen quads).
    pub position: [f32; 2],
}

impl Vertex {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

impl From<[f32; 2]> for Vertex {
    fn from(position: [f32; 2]) -> Self {
        Self { position }
    }
}

/// The viewport rectangle of the current render target, in pixels.
///
/// Drawables read this from GL at draw time instead of keeping window size
/// in global state, so the same object draws correctly into the window and
/// into differently sized offscreen textures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Viewport {
    /// Query `GL_VIEWPORT`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    #[must_use]
    pub unsafe fn current(gl: &glow::Context) -> Self {
        let mut rect = [0; 4];
        unsafe { gl.get_parameter_i32_slice(glow::VIEWPORT, &mut rect) };
        let [x, y, width, height] = rect;
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Orthographic projection mapping window pixels inside this viewport to
    /// clip space.
    ///
    /// Positions stay in window coordinates (the space of `gl_FragCoord`),
    /// so a viewport with a non-zero origin maps `(x, y)` to `(-1, -1)`.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        self.projection_at([0.0, 0.0])
    }

    /// Like [`projection`](Self::projection), with the model origin moved to
    /// `position` window pixels.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn projection_at(&self, [x, y]: [f32; 2]) -> Mat4 {
        crate::primitives::ortho(
            self.width as f32,
            self.height as f32,
            x - self.x as f32,
            y - self.y as f32,
        )
    }
}
