//! Offscreen render targets.

use std::sync::Arc;

use glow::HasContext;

use crate::error::Result;
use crate::sprite::{Sprite, SpriteSource};
use crate::texture::{Filter, Texture};

/// A blank texture meant to be drawn into through a [`FrameBuffer`] and then
/// drawn itself like any other texture.
pub struct FrameBufferTexture {
    texture: Arc<Texture>,
}

impl FrameBufferTexture {
    /// Allocate a `width` by `height` RGBA8 texture with linear filtering.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the texture cannot be created.
    pub unsafe fn new(gl: Arc<glow::Context>, width: u32, height: u32) -> Result<Self> {
        let texture = unsafe { Texture::empty(gl, width, height, Filter::Linear)? };
        Ok(Self {
            texture: Arc::new(texture),
        })
    }

    /// The underlying texture, shareable with sprites.
    #[must_use]
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /// A sprite drawing this texture with its lower-left corner as pivot.
    ///
    /// The sprite does not own the texture.
    ///
    /// # Safety
    ///
    /// Requires the context this texture was created with to be current.
    ///
    /// # Errors
    ///
    /// Fails if the sprite's program or mesh cannot be built.
    pub unsafe fn drawable(&self, gl: Arc<glow::Context>) -> Result<Sprite> {
        unsafe { Sprite::new(gl, SpriteSource::texture(Arc::clone(&self.texture)), [0.0, 0.0]) }
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the context this texture was created with, and at
    /// most once. Sprites made by [`drawable`](Self::drawable) must not be
    /// drawn afterwards.
    pub unsafe fn destroy(&self) {
        unsafe { self.texture.destroy() };
    }
}

/// A framebuffer object that renders into one [`FrameBufferTexture`] at a
/// time.
pub struct FrameBuffer {
    gl: Arc<glow::Context>,
    framebuffer: glow::Framebuffer,
}

impl FrameBuffer {
    /// Create the framebuffer object.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the framebuffer cannot be created.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self> {
        let framebuffer = unsafe { gl.create_framebuffer()? };
        Ok(Self { gl, framebuffer })
    }

    /// Redirect drawing into `target` until the guard is dropped.
    ///
    /// The viewport is set to cover the texture; on drop both the previously
    /// bound draw framebuffer and the previous viewport are restored, so
    /// targets nest.
    ///
    /// # Safety
    ///
    /// Requires the context this framebuffer was created with to be current
    /// for the lifetime of the guard.
    pub unsafe fn to_texture<'a>(&'a self, target: &FrameBufferTexture) -> RenderTarget<'a> {
        let gl = &*self.gl;
        let mut viewport = [0; 4];
        let previous = unsafe {
            gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport);
            gl.get_parameter_framebuffer(glow::DRAW_FRAMEBUFFER_BINDING)
        };

        unsafe {
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.framebuffer));
            gl.framebuffer_texture_2d(
                glow::DRAW_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(target.texture.handle()),
                0,
            );
            gl.viewport(
                0,
                0,
                crate::texture::gl_size(target.width()),
                crate::texture::gl_size(target.height()),
            );
        }
        log::trace!(
            "rendering to {}x{} texture",
            target.width(),
            target.height()
        );

        RenderTarget {
            gl,
            previous,
            viewport,
        }
    }

    /// Delete the framebuffer object.
    ///
    /// # Safety
    ///
    /// Must be called with the context this framebuffer was created with,
    /// and at most once.
    pub unsafe fn destroy(&self) {
        unsafe { self.gl.delete_framebuffer(self.framebuffer) };
    }
}

/// Scope guard returned by [`FrameBuffer::to_texture`].
#[must_use = "drawing goes back to the previous target when this is dropped"]
pub struct RenderTarget<'a> {
    gl: &'a glow::Context,
    previous: Option<glow::Framebuffer>,
    viewport: [i32; 4],
}

impl RenderTarget<'_> {
    /// Clear the target to transparent black.
    pub fn clear(&self) {
        unsafe {
            self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }
}

impl Drop for RenderTarget<'_> {
    fn drop(&mut self) {
        let [x, y, width, height] = self.viewport;
        unsafe {
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, self.previous);
            self.gl.viewport(x, y, width, height);
        }
    }
}
