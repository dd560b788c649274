//! Scoped overrides of the fixed-function blend state.
//!
//! A [`BlendingScope`] snapshots the blend enable flag, both blend equations
//! and all four blend factors when it is created, installs new ones, and puts
//! the snapshot back when dropped. Scopes nest: an inner scope restores
//! exactly what the outer one installed.

use glow::HasContext;

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// `src * sf + dst * df`
    #[default]
    Add,
    /// `src * sf - dst * df`
    Subtract,
    /// `dst * df - src * sf`
    ReverseSubtract,
    /// `min(src, dst)`, factors ignored.
    Min,
    /// `max(src, dst)`, factors ignored.
    Max,
}

impl BlendMode {
    /// The GL enum for this equation.
    #[must_use]
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Add => glow::FUNC_ADD,
            Self::Subtract => glow::FUNC_SUBTRACT,
            Self::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            Self::Min => glow::MIN,
            Self::Max => glow::MAX,
        }
    }

    /// Decode a GL blend equation enum.
    #[must_use]
    pub fn from_gl(value: u32) -> Option<Self> {
        Some(match value {
            glow::FUNC_ADD => Self::Add,
            glow::FUNC_SUBTRACT => Self::Subtract,
            glow::FUNC_REVERSE_SUBTRACT => Self::ReverseSubtract,
            glow::MIN => Self::Min,
            glow::MAX => Self::Max,
            _ => return None,
        })
    }
}

/// Blend factor.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

impl BlendFactor {
    const ALL: [Self; 14] = [
        Self::Zero,
        Self::One,
        Self::SrcColor,
        Self::OneMinusSrcColor,
        Self::DstColor,
        Self::OneMinusDstColor,
        Self::SrcAlpha,
        Self::OneMinusSrcAlpha,
        Self::DstAlpha,
        Self::OneMinusDstAlpha,
        Self::ConstantColor,
        Self::OneMinusConstantColor,
        Self::ConstantAlpha,
        Self::OneMinusConstantAlpha,
    ];

    /// The GL enum for this factor.
    #[must_use]
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Zero => glow::ZERO,
            Self::One => glow::ONE,
            Self::SrcColor => glow::SRC_COLOR,
            Self::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            Self::DstColor => glow::DST_COLOR,
            Self::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            Self::SrcAlpha => glow::SRC_ALPHA,
            Self::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            Self::DstAlpha => glow::DST_ALPHA,
            Self::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
            Self::ConstantColor => glow::CONSTANT_COLOR,
            Self::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
            Self::ConstantAlpha => glow::CONSTANT_ALPHA,
            Self::OneMinusConstantAlpha => glow::ONE_MINUS_CONSTANT_ALPHA,
        }
    }

    /// Decode a GL blend factor enum.
    #[must_use]
    pub fn from_gl(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|factor| factor.to_gl() == value)
    }
}

/// One channel group's equation and factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFunc {
    /// Blend equation.
    pub mode: BlendMode,
    /// Factor applied to the incoming fragment.
    pub source: BlendFactor,
    /// Factor applied to the framebuffer contents.
    pub destination: BlendFactor,
}

impl BlendFunc {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(mode: BlendMode, source: BlendFactor, destination: BlendFactor) -> Self {
        Self {
            mode,
            source,
            destination,
        }
    }

    /// Conventional non-premultiplied alpha blending.
    pub const ALPHA: Self = Self::new(
        BlendMode::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
    );

    /// Per-channel maximum of source and destination.
    pub const MAX: Self = Self::new(BlendMode::Max, BlendFactor::One, BlendFactor::One);
}

impl Default for BlendFunc {
    /// GL's initial state: `ADD`, `ONE`, `ZERO` (source replaces destination).
    fn default() -> Self {
        Self::new(BlendMode::Add, BlendFactor::One, BlendFactor::Zero)
    }
}

/// Raw snapshot of the GL blend state.
///
/// Stored as raw enums so values this crate does not model (such as
/// `SRC_ALPHA_SATURATE`) survive a save/restore round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    /// `GL_BLEND` enabled.
    pub enabled: bool,
    /// `GL_BLEND_EQUATION_RGB`
    pub equation_rgb: u32,
    /// `GL_BLEND_EQUATION_ALPHA`
    pub equation_alpha: u32,
    /// `GL_BLEND_SRC_RGB`
    pub source_rgb: u32,
    /// `GL_BLEND_DST_RGB`
    pub destination_rgb: u32,
    /// `GL_BLEND_SRC_ALPHA`
    pub source_alpha: u32,
    /// `GL_BLEND_DST_ALPHA`
    pub destination_alpha: u32,
}

impl BlendState {
    /// A state with blending enabled and the given functions installed.
    #[must_use]
    pub fn with_funcs(rgb: BlendFunc, alpha: BlendFunc) -> Self {
        Self {
            enabled: true,
            equation_rgb: rgb.mode.to_gl(),
            equation_alpha: alpha.mode.to_gl(),
            source_rgb: rgb.source.to_gl(),
            destination_rgb: rgb.destination.to_gl(),
            source_alpha: alpha.source.to_gl(),
            destination_alpha: alpha.destination.to_gl(),
        }
    }

    /// Read the current blend state.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    #[must_use]
    pub unsafe fn capture(gl: &glow::Context) -> Self {
        let query = |parameter| unsafe { gl.get_parameter_i32(parameter) }.cast_unsigned();
        Self {
            enabled: unsafe { gl.is_enabled(glow::BLEND) },
            equation_rgb: query(glow::BLEND_EQUATION_RGB),
            equation_alpha: query(glow::BLEND_EQUATION_ALPHA),
            source_rgb: query(glow::BLEND_SRC_RGB),
            destination_rgb: query(glow::BLEND_DST_RGB),
            source_alpha: query(glow::BLEND_SRC_ALPHA),
            destination_alpha: query(glow::BLEND_DST_ALPHA),
        }
    }

    /// Make this the current blend state.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn apply(&self, gl: &glow::Context) {
        unsafe {
            gl.blend_equation_separate(self.equation_rgb, self.equation_alpha);
            gl.blend_func_separate(
                self.source_rgb,
                self.destination_rgb,
                self.source_alpha,
                self.destination_alpha,
            );
            if self.enabled {
                gl.enable(glow::BLEND);
            } else {
                gl.disable(glow::BLEND);
            }
        }
    }
}

/// Blend state override that lasts until dropped.
///
/// ```no_run
/// # use glow_lights2d::{BlendFunc, BlendingScope};
/// # fn example(gl: &glow::Context, draw: impl Fn()) {
/// let scope = unsafe { BlendingScope::uniform(gl, BlendFunc::MAX) };
/// draw();
/// drop(scope); // previous blend state is back
/// # }
/// ```
#[must_use = "the previous blend state is restored as soon as the scope is dropped"]
pub struct BlendingScope<'a> {
    gl: &'a glow::Context,
    saved: BlendState,
}

impl<'a> BlendingScope<'a> {
    /// Install separate color and alpha functions.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context that stays current for the
    /// lifetime of the scope.
    pub unsafe fn separate(gl: &'a glow::Context, rgb: BlendFunc, alpha: BlendFunc) -> Self {
        let saved = unsafe { BlendState::capture(gl) };
        unsafe { BlendState::with_funcs(rgb, alpha).apply(gl) };
        Self { gl, saved }
    }

    /// Install the same function for color and alpha.
    ///
    /// # Safety
    ///
    /// See [`separate`](Self::separate).
    pub unsafe fn uniform(gl: &'a glow::Context, func: BlendFunc) -> Self {
        unsafe { Self::separate(gl, func, func) }
    }

    /// The state that will be restored on drop.
    #[must_use]
    pub fn saved(&self) -> &BlendState {
        &self.saved
    }
}

impl Drop for BlendingScope<'_> {
    fn drop(&mut self) {
        unsafe { self.saved.apply(self.gl) };
    }
}

/// Conventional alpha blending until the scope is dropped.
///
/// # Safety
///
/// See [`BlendingScope::separate`].
pub unsafe fn alpha_blend(gl: &glow::Context) -> BlendingScope<'_> {
    unsafe { BlendingScope::uniform(gl, BlendFunc::ALPHA) }
}
