//! Vertex array + buffer pairs with scoped binding.

use std::sync::Arc;

use glow::HasContext;

use crate::error::Result;
use crate::types::Vertex;

/// Byte stride of [`Vertex`]; 8 bytes, well within `i32` range.
#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const VERTEX_STRIDE: i32 = std::mem::size_of::<Vertex>() as i32;

/// Convert a vertex count to the `i32` GL draw calls expect.
///
/// # Panics
///
/// Panics if `count > i32::MAX`, which no buffer in this crate approaches.
pub(crate) fn gl_count(count: usize) -> i32 {
    i32::try_from(count).expect("vertex count exceeds i32::MAX")
}

/// A VAO with one [`Vertex`] buffer at attribute 0, and optionally a second
/// `vec2` buffer at attribute 1 (texture coordinates).
pub struct Mesh {
    gl: Arc<glow::Context>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    uvb: Option<glow::Buffer>,
    len: usize,
    usage: u32,
}

impl Mesh {
    /// Create a mesh holding `vertices`.
    ///
    /// `usage` is a GL buffer usage hint such as `glow::STATIC_DRAW`, or
    /// `glow::STREAM_DRAW` for meshes re-uploaded every frame.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gl`](crate::Error::Gl) if GL objects cannot be
    /// created.
    pub unsafe fn new(gl: Arc<glow::Context>, vertices: &[Vertex], usage: u32) -> Result<Self> {
        let (vao, vbo) = unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = gl.create_buffer()?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(vertices), usage);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, VERTEX_STRIDE, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            (vao, vbo)
        };

        Ok(Self {
            gl,
            vao,
            vbo,
            uvb: None,
            len: vertices.len(),
            usage,
        })
    }

    /// Create a mesh with per-vertex texture coordinates.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gl`](crate::Error::Gl) if GL objects cannot be
    /// created.
    pub unsafe fn with_uvs(
        gl: Arc<glow::Context>,
        vertices: &[Vertex],
        uvs: &[Vertex],
        usage: u32,
    ) -> Result<Self> {
        debug_assert_eq!(vertices.len(), uvs.len());
        let mut mesh = unsafe { Self::new(gl, vertices, usage)? };
        let gl = &mesh.gl;
        let uvb = unsafe {
            let uvb = gl.create_buffer()?;
            gl.bind_vertex_array(Some(mesh.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(uvb));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(uvs), usage);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, VERTEX_STRIDE, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            uvb
        };
        mesh.uvb = Some(uvb);
        Ok(mesh)
    }

    /// Number of vertices currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mesh holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Replace the position data.
    ///
    /// # Safety
    ///
    /// Requires the context this mesh was created with to be current.
    pub unsafe fn upload(&mut self, vertices: &[Vertex]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                self.usage,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        self.len = vertices.len();
    }

    /// Bind the VAO and buffer until the guard is dropped.
    ///
    /// On drop the vertex-array and array-buffer bindings are cleared, on
    /// every exit path.
    ///
    /// # Safety
    ///
    /// Requires the context this mesh was created with to be current for
    /// the lifetime of the guard.
    pub unsafe fn bind(&self) -> BoundMesh<'_> {
        unsafe {
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
        }
        BoundMesh { mesh: self }
    }

    /// Delete the GL objects.
    ///
    /// # Safety
    ///
    /// Must be called with the context this mesh was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_buffer(self.vbo);
            if let Some(uvb) = self.uvb {
                self.gl.delete_buffer(uvb);
            }
        }
    }
}

/// A [`Mesh`] bound for drawing.
#[must_use = "the mesh is unbound as soon as this is dropped"]
pub struct BoundMesh<'a> {
    mesh: &'a Mesh,
}

impl BoundMesh<'_> {
    /// Draw every vertex with the given primitive mode.
    pub fn draw(&self, mode: u32) {
        let count = gl_count(self.mesh.len);
        unsafe { self.mesh.gl.draw_arrays(mode, 0, count) };
    }
}

impl Drop for BoundMesh<'_> {
    fn drop(&mut self) {
        unsafe {
            self.mesh.gl.bind_vertex_array(None);
            self.mesh.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }
}
