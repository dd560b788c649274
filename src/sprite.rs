//! Textured quads, plain and animated from a sprite sheet.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use glow::HasContext;

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::primitives::rect_triangles;
use crate::program::ShaderProgram;
use crate::shaders;
use crate::texture::Texture;
use crate::types::{Vertex, Viewport};

/// Where a sprite gets its texture from: exactly one of a file to load or
/// an existing texture.
#[derive(Debug, Default, Clone)]
pub struct SpriteSource {
    /// Image file to load; the sprite owns the resulting texture.
    pub file: Option<PathBuf>,
    /// Shared texture; the sprite never deletes it.
    pub texture: Option<Arc<Texture>>,
}

impl SpriteSource {
    /// Load the texture from `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            texture: None,
        }
    }

    /// Draw an existing texture.
    #[must_use]
    pub fn texture(texture: Arc<Texture>) -> Self {
        Self {
            file: None,
            texture: Some(texture),
        }
    }
}

/// The one populated field of a [`SpriteSource`].
#[derive(Debug, PartialEq)]
enum Origin<T> {
    File(PathBuf),
    Texture(T),
}

fn pick_origin<T>(file: Option<PathBuf>, texture: Option<T>) -> Result<Origin<T>> {
    match (file, texture) {
        (Some(_), Some(_)) => Err(Error::ConflictingSource),
        (None, None) => Err(Error::MissingSource),
        (Some(file), None) => Ok(Origin::File(file)),
        (None, Some(texture)) => Ok(Origin::Texture(texture)),
    }
}

/// A textured rectangle drawn at a pixel position.
///
/// The quad spans the whole texture (or one frame of it, for
/// [`AnimatedSprite`]) and is offset so that `pivot` lands on the drawing
/// position. Scaling and flipping happen around the pivot.
pub struct Sprite {
    program: ShaderProgram,
    mesh: Mesh,
    texture: Arc<Texture>,
    owns_texture: bool,
    pivot: [f32; 2],
}

impl Sprite {
    /// Create a sprite covering its whole texture.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingSource`] or [`Error::MissingSource`] unless
    /// exactly one source is given, and propagates image loading and GL
    /// errors.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        source: SpriteSource,
        pivot: [f32; 2],
    ) -> Result<Self> {
        let (texture, owns_texture) = unsafe { load(&gl, source)? };
        #[expect(clippy::cast_precision_loss)]
        let size = [texture.width() as f32, texture.height() as f32];
        unsafe { Self::build(gl, texture, owns_texture, pivot, size, [1.0, 1.0]) }
    }

    unsafe fn build(
        gl: Arc<glow::Context>,
        texture: Arc<Texture>,
        owns_texture: bool,
        pivot: [f32; 2],
        [width, height]: [f32; 2],
        [u, v]: [f32; 2],
    ) -> Result<Self> {
        let vertices = rect_triangles(0.0, 0.0, width, height).map(|vertex| {
            Vertex::new(vertex.position[0] - pivot[0], vertex.position[1] - pivot[1])
        });
        let uvs = rect_triangles(0.0, 0.0, u, v);

        let program = unsafe {
            ShaderProgram::new(
                Arc::clone(&gl),
                shaders::SPRITE_VERTEX_SRC,
                shaders::SPRITE_FRAGMENT_SRC,
                None,
            )?
        };
        let mesh = unsafe { Mesh::with_uvs(gl, &vertices, &uvs, glow::STATIC_DRAW)? };
        unsafe {
            let active = program.activate();
            active.set("texture_sampler", 0_i32)?;
            active.set("offset", [0.0_f32; 2])?;
        }

        Ok(Self {
            program,
            mesh,
            texture,
            owns_texture,
            pivot,
        })
    }

    /// The texture drawn.
    #[must_use]
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// Pivot in texture pixels.
    #[must_use]
    pub fn pivot(&self) -> [f32; 2] {
        self.pivot
    }

    /// Draw with the pivot at `(x, y)` pixels of the current viewport.
    ///
    /// # Safety
    ///
    /// Requires the context this sprite was created with to be current.
    ///
    /// # Errors
    ///
    /// Propagates uniform errors.
    pub unsafe fn draw(
        &self,
        x: f32,
        y: f32,
        scale: f32,
        flip_x: bool,
        flip_y: bool,
    ) -> Result<()> {
        unsafe { self.draw_with_offset(x, y, scale, flip_x, flip_y, [0.0, 0.0]) }
    }

    unsafe fn draw_with_offset(
        &self,
        x: f32,
        y: f32,
        scale: f32,
        flip_x: bool,
        flip_y: bool,
        offset: [f32; 2],
    ) -> Result<()> {
        let gl = self.program.gl();
        let viewport = unsafe { Viewport::current(gl) };
        let active = unsafe { self.program.activate() };
        active.set("model_view_projection", viewport.projection_at([x, y]))?;
        active.set("scale", flip_scale(scale, flip_x, flip_y))?;
        active.set("offset", offset)?;

        unsafe {
            self.texture.bind();
            self.mesh.bind().draw(glow::TRIANGLES);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    /// Delete the GL objects, and the texture if this sprite loaded it.
    ///
    /// # Safety
    ///
    /// Must be called with the context this sprite was created with, and at
    /// most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.program.destroy();
            self.mesh.destroy();
            if self.owns_texture {
                self.texture.destroy();
            }
        }
    }
}

unsafe fn load(gl: &Arc<glow::Context>, source: SpriteSource) -> Result<(Arc<Texture>, bool)> {
    match pick_origin(source.file, source.texture)? {
        Origin::File(path) => {
            let texture = unsafe { Texture::from_file(Arc::clone(gl), path)? };
            Ok((Arc::new(texture), true))
        }
        Origin::Texture(texture) => Ok((texture, false)),
    }
}

fn flip_scale(scale: f32, flip_x: bool, flip_y: bool) -> [f32; 2] {
    let sign = |flip: bool| if flip { -1.0 } else { 1.0 };
    [scale * sign(flip_x), scale * sign(flip_y)]
}

/// Frame layout of a sprite sheet.
///
/// Frames are fixed-size cells numbered left to right, top to bottom,
/// starting in the top-left corner of the picture. Named sub-sheets are
/// inclusive frame ranges that loop on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationAtlas {
    sheet: [u32; 2],
    frame: [u32; 2],
    subsheets: HashMap<String, (usize, usize)>,
}

impl AnimationAtlas {
    /// An atlas of `frame`-sized cells in a `sheet`-sized texture.
    #[must_use]
    pub fn new(sheet: [u32; 2], frame: [u32; 2]) -> Self {
        Self {
            sheet,
            frame,
            subsheets: HashMap::new(),
        }
    }

    /// Add a named sub-sheet spanning frames `first..=last`.
    #[must_use]
    pub fn with_subsheet(mut self, name: impl Into<String>, first: usize, last: usize) -> Self {
        self.subsheets.insert(name.into(), (first, last.max(first)));
        self
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn frame_size(&self) -> [u32; 2] {
        self.frame
    }

    /// Number of whole frames in the sheet; at least one.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.columns() * (self.sheet[1] / self.frame[1].max(1)).max(1) as usize
    }

    fn columns(&self) -> usize {
        (self.sheet[0] / self.frame[0].max(1)).max(1) as usize
    }

    /// Resolve `frame` within `subsheet` (or the whole sheet) to a sheet
    /// frame index. Indices past the end wrap, so a running counter can be
    /// passed directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSubsheet`] for an undefined sub-sheet name.
    pub fn frame_index(&self, frame: usize, subsheet: Option<&str>) -> Result<usize> {
        let frame = match subsheet {
            None => frame,
            Some(name) => {
                let &(first, last) = self
                    .subsheets
                    .get(name)
                    .ok_or_else(|| Error::UnknownSubsheet(name.to_owned()))?;
                first + frame % (last - first + 1)
            }
        };
        Ok(frame % self.frame_count())
    }

    /// UV offset of a frame's lower-left corner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSubsheet`] for an undefined sub-sheet name.
    #[expect(clippy::cast_precision_loss)]
    pub fn frame_offset(&self, frame: usize, subsheet: Option<&str>) -> Result<[f32; 2]> {
        let index = self.frame_index(frame, subsheet)?;
        let columns = self.columns();
        let [frame_width, frame_height] = self.frame.map(|side| side as f32);
        let [sheet_width, sheet_height] = self.sheet.map(|side| side as f32);

        let column = (index % columns) as f32;
        let row = (index / columns) as f32;
        Ok([
            column * frame_width / sheet_width,
            (sheet_height - (row + 1.0) * frame_height) / sheet_height,
        ])
    }

    /// UV extent of a single frame.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn frame_uv_size(&self) -> [f32; 2] {
        [
            self.frame[0] as f32 / self.sheet[0] as f32,
            self.frame[1] as f32 / self.sheet[1] as f32,
        ]
    }
}

/// A sprite showing one frame of an [`AnimationAtlas`] at a time.
pub struct AnimatedSprite {
    sprite: Sprite,
    atlas: AnimationAtlas,
}

impl AnimatedSprite {
    /// Create an animated sprite with `frame_size`-pixel frames.
    ///
    /// `subsheets` maps names to inclusive frame ranges.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Same as [`Sprite::new`].
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        frame_size: [u32; 2],
        source: SpriteSource,
        pivot: [f32; 2],
        subsheets: impl IntoIterator<Item = (String, (usize, usize))>,
    ) -> Result<Self> {
        let (texture, owns_texture) = unsafe { load(&gl, source)? };
        let atlas = subsheets.into_iter().fold(
            AnimationAtlas::new([texture.width(), texture.height()], frame_size),
            |atlas, (name, (first, last))| atlas.with_subsheet(name, first, last),
        );
        #[expect(clippy::cast_precision_loss)]
        let size = frame_size.map(|side| side as f32);
        let uv_size = atlas.frame_uv_size();
        let sprite = unsafe { Sprite::build(gl, texture, owns_texture, pivot, size, uv_size)? };
        Ok(Self { sprite, atlas })
    }

    /// The frame layout.
    #[must_use]
    pub fn atlas(&self) -> &AnimationAtlas {
        &self.atlas
    }

    /// Draw `frame` (of `subsheet`, if given) with the pivot at `(x, y)`.
    ///
    /// # Safety
    ///
    /// Requires the context this sprite was created with to be current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSubsheet`] for an undefined sub-sheet name and
    /// propagates uniform errors.
    #[expect(clippy::too_many_arguments)]
    pub unsafe fn draw(
        &self,
        x: f32,
        y: f32,
        scale: f32,
        frame: usize,
        subsheet: Option<&str>,
        flip_x: bool,
        flip_y: bool,
    ) -> Result<()> {
        let offset = self.atlas.frame_offset(frame, subsheet)?;
        unsafe { self.sprite.draw_with_offset(x, y, scale, flip_x, flip_y, offset) }
    }

    /// Delete the GL objects.
    ///
    /// # Safety
    ///
    /// See [`Sprite::destroy`].
    pub unsafe fn destroy(&self) {
        unsafe { self.sprite.destroy() };
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
    fn exactly_one_source_is_required() {
        assert!(matches!(
            pick_origin(Some("a.png".into()), Some(())),
            Err(Error::ConflictingSource)
        ));
        assert!(matches!(
            pick_origin::<()>(None, None),
            Err(Error::MissingSource)
        ));
        assert_eq!(
            pick_origin::<()>(Some("a.png".into()), None).unwrap(),
            Origin::File("a.png".into())
        );
        assert_eq!(pick_origin(None, Some(7)).unwrap(), Origin::Texture(7));
    }

    #[test]
    fn flips_negate_scale() {
        assert_eq!(flip_scale(2.0, false, false), [2.0, 2.0]);
        assert_eq!(flip_scale(2.0, true, false), [-2.0, 2.0]);
        assert_eq!(flip_scale(0.5, true, true), [-0.5, -0.5]);
    }

    #[test]
    fn first_frame_is_top_left() {
        let atlas = AnimationAtlas::new([64, 32], [16, 16]);
        assert_eq!(atlas.frame_count(), 8);
        assert_close(atlas.frame_offset(0, None).unwrap(), [0.0, 0.5]);
    }

    #[test]
    fn frames_run_left_to_right_then_down() {
        let atlas = AnimationAtlas::new([64, 32], [16, 16]);
        assert_close(atlas.frame_offset(3, None).unwrap(), [0.75, 0.5]);
        assert_close(atlas.frame_offset(4, None).unwrap(), [0.0, 0.0]);
        assert_close(atlas.frame_offset(6, None).unwrap(), [0.5, 0.0]);
    }

    #[test]
    fn frame_index_wraps() {
        let atlas = AnimationAtlas::new([64, 32], [16, 16]);
        assert_eq!(atlas.frame_index(8, None).unwrap(), 0);
        assert_eq!(atlas.frame_index(13, None).unwrap(), 5);
    }

    #[test]
    fn subsheets_loop_over_their_range() {
        let atlas = AnimationAtlas::new([64, 32], [16, 16]).with_subsheet("walk", 4, 6);
        assert_eq!(atlas.frame_index(0, Some("walk")).unwrap(), 4);
        assert_eq!(atlas.frame_index(2, Some("walk")).unwrap(), 6);
        assert_eq!(atlas.frame_index(3, Some("walk")).unwrap(), 4);
    }

    #[test]
    fn unknown_subsheet_is_an_error() {
        let atlas = AnimationAtlas::new([64, 32], [16, 16]);
        assert!(matches!(
            atlas.frame_offset(0, Some("jump")),
            Err(Error::UnknownSubsheet(name)) if name == "jump"
        ));
    }

    #[test]
    fn non_square_frames_use_their_own_height() {
        let atlas = AnimationAtlas::new([32, 64], [16, 32]);
        assert_eq!(atlas.frame_count(), 4);
        assert_close(atlas.frame_offset(2, None).unwrap(), [0.0, 0.0]);
        assert_close(atlas.frame_uv_size(), [0.5, 0.5]);
    }

    #[test]
    fn oversized_frame_still_counts_as_one() {
        let atlas = AnimationAtlas::new([8, 8], [16, 16]);
        assert_eq!(atlas.frame_count(), 1);
        assert_eq!(atlas.frame_index(5, None).unwrap(), 0);
    }
}
