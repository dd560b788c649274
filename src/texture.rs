//! 2D textures uploaded from image files or left blank for render targets.

use std::path::Path;
use std::sync::Arc;

use glow::{HasContext, PixelUnpackData};
use image::DynamicImage;

use crate::error::Result;

/// GL internal format for RGBA8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

/// Convert a `u32` to `i32` for GL API calls.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice, this is unreachable for
/// viewport dimensions and image sizes.
pub(crate) fn gl_size(value: u32) -> i32 {
    i32::try_from(value).expect("dimension exceeds i32::MAX")
}

/// Texture filtering for both minification and magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Sharp pixels, used for sprite art.
    Nearest,
    /// Bilinear, used for offscreen light layers.
    Linear,
}

impl Filter {
    #[expect(clippy::cast_possible_wrap)]
    fn to_gl(self) -> i32 {
        match self {
            Self::Nearest => glow::NEAREST as i32,
            Self::Linear => glow::LINEAR as i32,
        }
    }
}

/// An RGBA8 `TEXTURE_2D`.
///
/// Row 0 of the GL texture is the bottom row of the picture, so images are
/// flipped vertically on upload.
#[derive(Debug)]
pub struct Texture {
    gl: Arc<glow::Context>,
    texture: glow::Texture,
    width: u32,
    height: u32,
}

impl Texture {
    /// Load and upload an image file.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or decoded, or if the texture cannot
    /// be created.
    pub unsafe fn from_file(gl: Arc<glow::Context>, path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        log::debug!("loading texture from {}", path.as_ref().display());
        unsafe { Self::from_memory(gl, &bytes) }
    }

    /// Decode and upload an encoded image (PNG or JPEG).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the bytes cannot be decoded or the texture cannot be created.
    pub unsafe fn from_memory(gl: Arc<glow::Context>, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        unsafe { Self::from_image(gl, &image) }
    }

    /// Upload an already decoded image.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the texture cannot be created.
    pub unsafe fn from_image(gl: Arc<glow::Context>, image: &DynamicImage) -> Result<Self> {
        let rgba = image.flipv().into_rgba8();
        let (width, height) = rgba.dimensions();
        unsafe { Self::upload(gl, width, height, Some(rgba.as_raw()), Filter::Nearest) }
    }

    /// An uninitialized texture, to be drawn into through a framebuffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the texture cannot be created.
    pub unsafe fn empty(
        gl: Arc<glow::Context>,
        width: u32,
        height: u32,
        filter: Filter,
    ) -> Result<Self> {
        unsafe { Self::upload(gl, width, height, None, filter) }
    }

    unsafe fn upload(
        gl: Arc<glow::Context>,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: Filter,
    ) -> Result<Self> {
        let texture = unsafe { gl.create_texture()? };
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGBA8_INTERNAL_FORMAT,
                gl_size(width),
                gl_size(height),
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(pixels),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter.to_gl());
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter.to_gl());
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
        log::trace!("uploaded {width}x{height} texture ({filter:?})");

        Ok(Self {
            gl,
            texture,
            width,
            height,
        })
    }

    /// Raw GL handle.
    #[must_use]
    pub fn handle(&self) -> glow::Texture {
        self.texture
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bind to texture unit 0.
    ///
    /// # Safety
    ///
    /// Requires the context this texture was created with to be current.
    pub unsafe fn bind(&self) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
        }
    }

    /// Delete the GL texture.
    ///
    /// # Safety
    ///
    /// Must be called with the context this texture was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe { self.gl.delete_texture(self.texture) };
    }
}
