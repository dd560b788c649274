//! Dynamic 2D point lights with shadow casting for OpenGL via [glow].
//!
//! A [`GLight`] fills the viewport with a radial falloff around its position
//! and, given a list of occluder triangles, cuts the shadows those triangles
//! cast out of the alpha channel. Shadow volumes are extruded from every
//! occluder edge away from the light, either in a geometry shader or on the
//! CPU where geometry shaders are unavailable (see [`ExtrusionMode`]).
//!
//! Around that core the crate provides what a small 2D scene needs:
//!
//! - [`ShaderProgram`]: compile and link programs with readable compile
//!   errors, and read or write uniforms by name through a [`UniformTable`]
//!   discovered at link time.
//! - [`BlendingScope`]: install a blend equation and factors and restore the
//!   previous ones when the scope ends.
//! - [`RectBatch`] and [`polygon_triangles`]: occluder geometry, tessellated
//!   via [lyon].
//! - [`Sprite`], [`AnimatedSprite`] and [`Texture`]: textured quads loaded
//!   via [image].
//! - [`FrameBuffer`] and [`LightCompositor`]: offscreen targets, and merging
//!   several lights into one light layer.
//!
//! # Coordinates
//!
//! Positions are window pixels with the origin at the lower-left corner.
//! Drawing code reads the current `GL_VIEWPORT` to build its projection, so
//! the same objects draw correctly into the window and into offscreen
//! textures.
//!
//! # Safety
//!
//! Everything that touches GL requires a valid, current OpenGL context and
//! is therefore `unsafe`. GPU objects are freed with an explicit `destroy`
//! call while the context is still alive, never on drop.
//!
//! [glow]: https://docs.rs/glow
//! [lyon]: https://docs.rs/lyon
//! [image]: https://docs.rs/image

mod blending;
mod compositor;
mod error;
mod framebuffer;
mod light;
mod mesh;
mod primitives;
mod program;
pub mod shaders;
mod shadow;
mod sprite;
mod texture;
mod types;
mod uniforms;

pub use blending::{alpha_blend, BlendFactor, BlendFunc, BlendMode, BlendState, BlendingScope};
pub use compositor::LightCompositor;
pub use error::{Error, Result};
pub use framebuffer::{FrameBuffer, FrameBufferTexture, RenderTarget};
pub use light::{GLight, LightSettings};
pub use mesh::{BoundMesh, Mesh};
pub use primitives::{
    ortho, polygon_triangles, project, rect_triangles, Rect, RectBatch, SolidRect,
};
pub use program::{annotate_compile_log, ActiveProgram, ShaderProgram, ShaderStage};
pub use shadow::{extrude, shadow_volume, ExtrusionMode, ShadowMap, ShadowSettings};
pub use sprite::{AnimatedSprite, AnimationAtlas, Sprite, SpriteSource};
pub use texture::{Filter, Texture};
pub use types::{Mat4, Vertex, Viewport};
pub use uniforms::{normalize_name, Scalar, UniformInfo, UniformKind, UniformTable, UniformValue};
