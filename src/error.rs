//! Crate-wide error type.

use crate::program::ShaderStage;
use crate::uniforms::UniformKind;

/// Errors raised while building or driving GL objects.
///
/// None of these are retried internally: shader compilation is deterministic,
/// and a uniform write that does not fit is a programming error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A shader stage failed to compile.
    ///
    /// `message` holds the compiler log, followed by an excerpt of the
    /// offending source lines when the log names a line number.
    #[error("{stage} shader compilation failed:\n{message}")]
    ShaderCompilation {
        /// The stage that failed.
        stage: ShaderStage,
        /// Compiler log, possibly annotated with a source excerpt.
        message: String,
    },

    /// All stages compiled but the program failed to link.
    #[error("program link failed: {0}")]
    Link(String),

    /// No active uniform of this name exists in the program.
    ///
    /// Either the name is misspelled or the GLSL compiler optimized the
    /// uniform away.
    #[error("no active uniform of name: {0}")]
    UnknownUniform(String),

    /// A value does not fit the declared type or array size of a uniform.
    #[error("value for uniform `{name}` ({kind}) rejected: {reason}")]
    UniformType {
        /// Uniform name, normalized.
        name: String,
        /// Declared GLSL type.
        kind: UniformKind,
        /// What was wrong with the value.
        reason: String,
    },

    /// The uniform is active but its GLSL type has no registered accessor.
    #[error("uniform `{name}` has unsupported GLSL type 0x{type_tag:04X}")]
    UnsupportedUniform {
        /// Uniform name, normalized.
        name: String,
        /// Raw GL type enum.
        type_tag: u32,
    },

    /// GL object creation failed (glow reports these as strings).
    #[error("GL error: {0}")]
    Gl(String),

    /// A sprite was given both a texture and a file to load one from.
    #[error("sprite can be created from either a texture or a file name, but not both")]
    ConflictingSource,

    /// A sprite was given neither a texture nor a file name.
    #[error("sprite needs either a texture or a file name")]
    MissingSource,

    /// An animation sub-sheet name that the atlas does not define.
    #[error("no animation sub-sheet named `{0}`")]
    UnknownSubsheet(String),

    /// Image decoding failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Reading an image file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Gl(message)
    }
}

/// Shorthand for results carrying [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
