//! Merging several lights into one light layer.

use std::sync::Arc;

use crate::blending::{BlendFunc, BlendingScope};
use crate::error::Result;
use crate::framebuffer::{FrameBuffer, FrameBufferTexture};
use crate::light::GLight;
use crate::sprite::Sprite;

/// One offscreen texture plus the sprite that draws it.
struct Layer {
    texture: FrameBufferTexture,
    sprite: Sprite,
}

impl Layer {
    unsafe fn new(gl: &Arc<glow::Context>, width: u32, height: u32) -> Result<Self> {
        let texture = unsafe { FrameBufferTexture::new(Arc::clone(gl), width, height)? };
        let sprite = unsafe { texture.drawable(Arc::clone(gl))? };
        Ok(Self { texture, sprite })
    }

    unsafe fn destroy(&self) {
        unsafe {
            self.sprite.destroy();
            self.texture.destroy();
        }
    }
}

/// Renders lights one by one and keeps the per-channel maximum.
///
/// Each light is drawn alone into a scratch texture, shadows included, and
/// then merged into an accumulation texture with `MAX` blending. Drawing
/// lights straight on top of each other would let one light's shadow pass
/// erase another light's coverage.
///
/// ```no_run
/// # use glow_lights2d::{GLight, LightCompositor};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>, lights: &mut [GLight]) -> glow_lights2d::Result<()> {
/// let mut compositor = unsafe { LightCompositor::new(gl, 800, 600)? };
/// unsafe {
///     compositor.compose(lights.iter_mut(), true)?;
///     compositor.draw(1.0)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct LightCompositor {
    gl: Arc<glow::Context>,
    framebuffer: FrameBuffer,
    scratch: Layer,
    accumulated: Layer,
}

impl LightCompositor {
    /// Create a compositor producing a `width` by `height` light layer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the framebuffer, textures or sprites cannot be created.
    pub unsafe fn new(gl: Arc<glow::Context>, width: u32, height: u32) -> Result<Self> {
        let framebuffer = unsafe { FrameBuffer::new(Arc::clone(&gl))? };
        let scratch = unsafe { Layer::new(&gl, width, height)? };
        let accumulated = unsafe { Layer::new(&gl, width, height)? };
        Ok(Self {
            gl,
            framebuffer,
            scratch,
            accumulated,
        })
    }

    /// Size of the light layer in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [
            self.accumulated.texture.width(),
            self.accumulated.texture.height(),
        ]
    }

    /// The accumulated light layer, e.g. for custom post-processing.
    #[must_use]
    pub fn output(&self) -> &FrameBufferTexture {
        &self.accumulated.texture
    }

    /// Redraw the light layer from `lights`.
    ///
    /// # Safety
    ///
    /// Requires the context this compositor was created with to be current.
    /// The lights must belong to the same context.
    ///
    /// # Errors
    ///
    /// Propagates errors from drawing the lights.
    pub unsafe fn compose<'l>(
        &mut self,
        lights: impl IntoIterator<Item = &'l mut GLight>,
        cut_shadows: bool,
    ) -> Result<()> {
        let gl = &*self.gl;
        unsafe { self.framebuffer.to_texture(&self.accumulated.texture) }.clear();

        let mut count = 0_usize;
        for light in lights {
            {
                let target = unsafe { self.framebuffer.to_texture(&self.scratch.texture) };
                target.clear();
                let _replace = unsafe { BlendingScope::uniform(gl, BlendFunc::default()) };
                unsafe { light.draw(cut_shadows)? };
            }

            let _target = unsafe { self.framebuffer.to_texture(&self.accumulated.texture) };
            let _max = unsafe { BlendingScope::uniform(gl, BlendFunc::MAX) };
            unsafe { self.scratch.sprite.draw(0.0, 0.0, 1.0, false, false)? };
            count += 1;
        }
        log::trace!("composed {count} lights");
        Ok(())
    }

    /// Draw the light layer onto the current target, lower-left corner at the
    /// origin.
    ///
    /// Blending against the scene is left to the caller.
    ///
    /// # Safety
    ///
    /// Requires the context this compositor was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors.
    pub unsafe fn draw(&self, scale: f32) -> Result<()> {
        unsafe { self.accumulated.sprite.draw(0.0, 0.0, scale, false, false) }
    }

    /// Reallocate both textures at a new size, e.g. after a window resize.
    ///
    /// # Safety
    ///
    /// Requires the context this compositor was created with to be current.
    ///
    /// # Errors
    ///
    /// Fails if the new textures cannot be created; the old ones are kept in
    /// that case.
    pub unsafe fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.size() == [width, height] {
            return Ok(());
        }
        let scratch = unsafe { Layer::new(&self.gl, width, height)? };
        let accumulated = match unsafe { Layer::new(&self.gl, width, height) } {
            Ok(layer) => layer,
            Err(err) => {
                unsafe { scratch.destroy() };
                return Err(err);
            }
        };
        log::debug!("light layer resized to {width}x{height}");

        unsafe {
            std::mem::replace(&mut self.scratch, scratch).destroy();
            std::mem::replace(&mut self.accumulated, accumulated).destroy();
        }
        Ok(())
    }

    /// Delete every GL object.
    ///
    /// # Safety
    ///
    /// Must be called with the context this compositor was created with, and
    /// at most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.scratch.destroy();
            self.accumulated.destroy();
            self.framebuffer.destroy();
        }
    }
}
