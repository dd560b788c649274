//! Uniform reflection for linked shader programs.
//!
//! A [`UniformTable`] is built once per program, right after linking, by
//! walking the program's active uniforms. Each entry remembers the uniform's
//! array size and GLSL type so that [`set`](UniformTable::set) and
//! [`get`](UniformTable::get) can dispatch to the matching `glUniform*` /
//! `glGetUniform*` call given nothing but a name.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use glow::HasContext;

use crate::error::{Error, Result};

/// The scalar component type behind a GLSL uniform type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// `float` and float vectors/matrices.
    Float,
    /// `int`, int vectors, and sampler units.
    Int,
    /// `uint` and unsigned vectors.
    UInt,
    /// `bool` and bool vectors.
    Bool,
}

/// The declared GLSL type of an active uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `int`
    Int,
    /// `ivec2`
    IVec2,
    /// `ivec3`
    IVec3,
    /// `ivec4`
    IVec4,
    /// `uint`
    UInt,
    /// `uvec2`
    UVec2,
    /// `uvec3`
    UVec3,
    /// `uvec4`
    UVec4,
    /// `bool`
    Bool,
    /// `bvec2`
    BVec2,
    /// `bvec3`
    BVec3,
    /// `bvec4`
    BVec4,
    /// `mat2`
    Mat2,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `mat2x3` (2 columns, 3 rows)
    Mat2x3,
    /// `mat2x4`
    Mat2x4,
    /// `mat3x2`
    Mat3x2,
    /// `mat3x4`
    Mat3x4,
    /// `mat4x2`
    Mat4x2,
    /// `mat4x3`
    Mat4x3,
    /// Any sampler type. Set as the integer index of a texture unit.
    Sampler(u32),
    /// A type with no registered accessor (doubles, images, atomics).
    Unsupported(u32),
}

impl UniformKind {
    /// Decode the type enum reported by `glGetActiveUniform`.
    #[must_use]
    pub fn from_gl(type_tag: u32) -> Self {
        match type_tag {
            glow::FLOAT => Self::Float,
            glow::FLOAT_VEC2 => Self::Vec2,
            glow::FLOAT_VEC3 => Self::Vec3,
            glow::FLOAT_VEC4 => Self::Vec4,
            glow::INT => Self::Int,
            glow::INT_VEC2 => Self::IVec2,
            glow::INT_VEC3 => Self::IVec3,
            glow::INT_VEC4 => Self::IVec4,
            glow::UNSIGNED_INT => Self::UInt,
            glow::UNSIGNED_INT_VEC2 => Self::UVec2,
            glow::UNSIGNED_INT_VEC3 => Self::UVec3,
            glow::UNSIGNED_INT_VEC4 => Self::UVec4,
            glow::BOOL => Self::Bool,
            glow::BOOL_VEC2 => Self::BVec2,
            glow::BOOL_VEC3 => Self::BVec3,
            glow::BOOL_VEC4 => Self::BVec4,
            glow::FLOAT_MAT2 => Self::Mat2,
            glow::FLOAT_MAT3 => Self::Mat3,
            glow::FLOAT_MAT4 => Self::Mat4,
            glow::FLOAT_MAT2x3 => Self::Mat2x3,
            glow::FLOAT_MAT2x4 => Self::Mat2x4,
            glow::FLOAT_MAT3x2 => Self::Mat3x2,
            glow::FLOAT_MAT3x4 => Self::Mat3x4,
            glow::FLOAT_MAT4x2 => Self::Mat4x2,
            glow::FLOAT_MAT4x3 => Self::Mat4x3,
            glow::SAMPLER_1D
            | glow::SAMPLER_2D
            | glow::SAMPLER_3D
            | glow::SAMPLER_CUBE
            | glow::SAMPLER_2D_ARRAY
            | glow::SAMPLER_2D_SHADOW
            | glow::SAMPLER_2D_MULTISAMPLE
            | glow::INT_SAMPLER_2D
            | glow::UNSIGNED_INT_SAMPLER_2D => Self::Sampler(type_tag),
            other => Self::Unsupported(other),
        }
    }

    /// Scalar component type, or `None` for unsupported types.
    #[must_use]
    pub fn scalar(self) -> Option<Scalar> {
        match self {
            Self::Float | Self::Vec2 | Self::Vec3 | Self::Vec4 => Some(Scalar::Float),
            Self::Int | Self::IVec2 | Self::IVec3 | Self::IVec4 | Self::Sampler(_) => {
                Some(Scalar::Int)
            }
            Self::UInt | Self::UVec2 | Self::UVec3 | Self::UVec4 => Some(Scalar::UInt),
            Self::Bool | Self::BVec2 | Self::BVec3 | Self::BVec4 => Some(Scalar::Bool),
            Self::Unsupported(_) => None,
            _ => Some(Scalar::Float),
        }
    }

    /// Matrix shape as `(columns, rows)`, or `None` for non-matrix types.
    #[must_use]
    pub fn matrix_dims(self) -> Option<(usize, usize)> {
        match self {
            Self::Mat2 => Some((2, 2)),
            Self::Mat3 => Some((3, 3)),
            Self::Mat4 => Some((4, 4)),
            Self::Mat2x3 => Some((2, 3)),
            Self::Mat2x4 => Some((2, 4)),
            Self::Mat3x2 => Some((3, 2)),
            Self::Mat3x4 => Some((3, 4)),
            Self::Mat4x2 => Some((4, 2)),
            Self::Mat4x3 => Some((4, 3)),
            _ => None,
        }
    }

    /// Number of scalar components in one element of this type.
    #[must_use]
    pub fn components(self) -> usize {
        if let Some((cols, rows)) = self.matrix_dims() {
            return cols * rows;
        }
        match self {
            Self::Vec2 | Self::IVec2 | Self::UVec2 | Self::BVec2 => 2,
            Self::Vec3 | Self::IVec3 | Self::UVec3 | Self::BVec3 => 3,
            Self::Vec4 | Self::IVec4 | Self::UVec4 | Self::BVec4 => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Int => "int",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::UInt => "uint",
            Self::UVec2 => "uvec2",
            Self::UVec3 => "uvec3",
            Self::UVec4 => "uvec4",
            Self::Bool => "bool",
            Self::BVec2 => "bvec2",
            Self::BVec3 => "bvec3",
            Self::BVec4 => "bvec4",
            Self::Mat2 => "mat2",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Mat2x3 => "mat2x3",
            Self::Mat2x4 => "mat2x4",
            Self::Mat3x2 => "mat3x2",
            Self::Mat3x4 => "mat3x4",
            Self::Mat4x2 => "mat4x2",
            Self::Mat4x3 => "mat4x3",
            Self::Sampler(_) => "sampler",
            Self::Unsupported(tag) => return write!(f, "type 0x{tag:04X}"),
        };
        f.write_str(name)
    }
}

/// A uniform value, flattened to its scalar components.
///
/// Vectors and arrays are stored component after component; matrices are
/// stored row-major (the natural reading order), and are transposed by GL on
/// upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Float components.
    Float(Vec<f32>),
    /// Signed integer components (also texture unit indices).
    Int(Vec<i32>),
    /// Unsigned integer components.
    UInt(Vec<u32>),
    /// Boolean components.
    Bool(Vec<bool>),
}

impl UniformValue {
    /// Number of scalar components.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    /// Whether the value has no components at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Float components, if this is a float value.
    #[must_use]
    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Integer components, if this is an int value.
    #[must_use]
    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The single float of a scalar `float` uniform.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        self.to_array::<1>().map(|[v]| v)
    }

    /// The single int of a scalar `int` or sampler uniform.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// The single uint of a scalar `uint` uniform.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// The single bool of a scalar `bool` uniform.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Float components as a fixed-size array, e.g. a `vec2`.
    #[must_use]
    pub fn to_array<const N: usize>(&self) -> Option<[f32; N]> {
        self.as_floats()?.try_into().ok()
    }

    /// Float components as a row-major matrix with `R` rows of `C` columns.
    #[must_use]
    pub fn to_matrix<const C: usize, const R: usize>(&self) -> Option<[[f32; C]; R]> {
        let values = self.as_floats()?;
        if values.len() != C * R {
            return None;
        }
        let mut matrix = [[0.0; C]; R];
        for (row, chunk) in matrix.iter_mut().zip(values.chunks_exact(C)) {
            row.copy_from_slice(chunk);
        }
        Some(matrix)
    }

    /// Float components split into `N`-component elements, e.g. a `vec2[4]`.
    #[must_use]
    pub fn to_elements<const N: usize>(&self) -> Option<Vec<[f32; N]>> {
        let values = self.as_floats()?;
        if N == 0 || values.len() % N != 0 {
            return None;
        }
        values
            .chunks_exact(N)
            .map(|chunk| chunk.try_into().ok())
            .collect()
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(vec![value])
    }
}

impl<const N: usize> From<[f32; N]> for UniformValue {
    fn from(value: [f32; N]) -> Self {
        Self::Float(value.to_vec())
    }
}

impl<const C: usize, const R: usize> From<[[f32; C]; R]> for UniformValue {
    fn from(value: [[f32; C]; R]) -> Self {
        Self::Float(value.iter().flatten().copied().collect())
    }
}

impl From<&[f32]> for UniformValue {
    fn from(value: &[f32]) -> Self {
        Self::Float(value.to_vec())
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(value: Vec<f32>) -> Self {
        Self::Float(value)
    }
}

impl<const N: usize> From<Vec<[f32; N]>> for UniformValue {
    fn from(value: Vec<[f32; N]>) -> Self {
        Self::Float(value.into_iter().flatten().collect())
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(vec![value])
    }
}

impl<const N: usize> From<[i32; N]> for UniformValue {
    fn from(value: [i32; N]) -> Self {
        Self::Int(value.to_vec())
    }
}

impl From<u32> for UniformValue {
    fn from(value: u32) -> Self {
        Self::UInt(vec![value])
    }
}

impl<const N: usize> From<[u32; N]> for UniformValue {
    fn from(value: [u32; N]) -> Self {
        Self::UInt(value.to_vec())
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(vec![value])
    }
}

impl<const N: usize> From<[bool; N]> for UniformValue {
    fn from(value: [bool; N]) -> Self {
        Self::Bool(value.to_vec())
    }
}

/// Reflection data for one active uniform.
#[derive(Debug, Clone)]
pub struct UniformInfo {
    /// Array length (1 for non-arrays).
    pub size: usize,
    /// Declared GLSL type.
    pub kind: UniformKind,
    location: glow::UniformLocation,
}

/// Components ready for one of the typed `glUniform*v` calls.
#[derive(Debug)]
enum Payload<'a> {
    Float(&'a [f32]),
    Int(Cow<'a, [i32]>),
    UInt(&'a [u32]),
}

/// Name → (size, type) table of a program's active uniforms.
#[derive(Debug, Default)]
pub struct UniformTable {
    uniforms: HashMap<String, UniformInfo>,
}

impl UniformTable {
    /// Introspect the active uniforms of a freshly linked program.
    ///
    /// Uniforms living in uniform blocks have no location and are skipped.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context in which `program` was
    /// linked successfully.
    pub(crate) unsafe fn build(gl: &glow::Context, program: glow::Program) -> Self {
        let mut uniforms = HashMap::new();
        let count = unsafe { gl.get_active_uniforms(program) };

        for index in 0..count {
            let Some(active) = (unsafe { gl.get_active_uniform(program, index) }) else {
                continue;
            };
            let name = normalize_name(&active.name).to_owned();
            let kind = UniformKind::from_gl(active.utype);
            let size = usize::try_from(active.size).unwrap_or(1).max(1);

            let Some(location) = (unsafe { gl.get_uniform_location(program, &name) }) else {
                log::trace!("skipping block uniform `{name}`");
                continue;
            };
            if let UniformKind::Unsupported(tag) = kind {
                log::warn!("uniform `{name}` has unsupported GLSL type 0x{tag:04X}");
            }
            log::trace!("uniform `{name}`: {kind}[{size}]");

            uniforms.insert(name, UniformInfo { size, kind, location });
        }

        log::debug!("reflected {} active uniforms", uniforms.len());
        Self { uniforms }
    }

    /// Reflection data for `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] if the program has no such active uniform.
    pub fn info(&self, name: &str) -> Result<&UniformInfo> {
        self.uniforms
            .get(name)
            .ok_or_else(|| Error::UnknownUniform(name.to_owned()))
    }

    /// Whether an active uniform of this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Number of active uniforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uniforms.len()
    }

    /// Whether the program has no active uniforms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
    }

    /// Iterate over `(name, info)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformInfo)> {
        self.uniforms.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Write a uniform of the currently bound program.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context with the owning program
    /// bound via `glUseProgram`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] for unknown names, [`Error::UniformType`]
    /// when the value does not fit, [`Error::UnsupportedUniform`] for types
    /// with no setter.
    pub(crate) unsafe fn set(
        &self,
        gl: &glow::Context,
        name: &str,
        value: &UniformValue,
    ) -> Result<()> {
        let info = self.info(name)?;
        let payload = coerce(name, info.kind, info.size, value)?;
        let location = Some(&info.location);

        unsafe {
            match payload {
                Payload::Float(v) => match (info.kind.matrix_dims(), info.kind.components()) {
                    (Some(dims), _) => upload_matrix(gl, location, dims, v),
                    (None, 1) => gl.uniform_1_f32_slice(location, v),
                    (None, 2) => gl.uniform_2_f32_slice(location, v),
                    (None, 3) => gl.uniform_3_f32_slice(location, v),
                    (None, _) => gl.uniform_4_f32_slice(location, v),
                },
                Payload::Int(v) => match info.kind.components() {
                    1 => gl.uniform_1_i32_slice(location, &v),
                    2 => gl.uniform_2_i32_slice(location, &v),
                    3 => gl.uniform_3_i32_slice(location, &v),
                    _ => gl.uniform_4_i32_slice(location, &v),
                },
                Payload::UInt(v) => match info.kind.components() {
                    1 => gl.uniform_1_u32_slice(location, v),
                    2 => gl.uniform_2_u32_slice(location, v),
                    3 => gl.uniform_3_u32_slice(location, v),
                    _ => gl.uniform_4_u32_slice(location, v),
                },
            }
        }
        Ok(())
    }

    /// Read a uniform back from the GPU.
    ///
    /// Arrays are read element by element and returned flattened, so a
    /// `vec2 foo[4]` yields eight floats.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context in which `program` owns this
    /// table.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] for unknown names,
    /// [`Error::UnsupportedUniform`] for types with no getter.
    pub(crate) unsafe fn get(
        &self,
        gl: &glow::Context,
        program: glow::Program,
        name: &str,
    ) -> Result<UniformValue> {
        let info = self.info(name)?;
        let scalar = info.kind.scalar().ok_or_else(|| unsupported(name, info.kind))?;
        let components = info.kind.components();

        let mut floats = Vec::new();
        let mut ints = Vec::new();
        let mut uints = Vec::new();
        for element in 0..info.size {
            let element_location;
            let location = if element == 0 {
                &info.location
            } else {
                element_location =
                    unsafe { gl.get_uniform_location(program, &format!("{name}[{element}]")) }
                        .ok_or_else(|| Error::UnknownUniform(format!("{name}[{element}]")))?;
                &element_location
            };

            match scalar {
                Scalar::Float => {
                    let mut buffer = vec![0.0; components];
                    unsafe { gl.get_uniform_f32(program, location, &mut buffer) };
                    match info.kind.matrix_dims() {
                        Some((cols, rows)) => {
                            floats.extend(column_to_row_major(&buffer, cols, rows));
                        }
                        None => floats.extend(buffer),
                    }
                }
                // glGetUniformiv may clamp values above i32::MAX.
                Scalar::UInt => {
                    let mut buffer = vec![0; components];
                    unsafe { gl.get_uniform_u32(program, location, &mut buffer) };
                    uints.extend(buffer);
                }
                Scalar::Int | Scalar::Bool => {
                    let mut buffer = vec![0; components];
                    unsafe { gl.get_uniform_i32(program, location, &mut buffer) };
                    ints.extend(buffer);
                }
            }
        }

        Ok(match scalar {
            Scalar::Float => UniformValue::Float(floats),
            Scalar::Int => UniformValue::Int(ints),
            Scalar::UInt => UniformValue::UInt(uints),
            Scalar::Bool => UniformValue::Bool(ints.into_iter().map(|v| v != 0).collect()),
        })
    }
}

/// Strip the `[0]` GL appends to the reported name of array uniforms, so
/// `foo[4]` is addressed as `foo`.
#[must_use]
pub fn normalize_name(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

/// Convert a column-major GL readback into row-major order.
fn column_to_row_major(values: &[f32], cols: usize, rows: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            out.push(values[col * rows + row]);
        }
    }
    out
}

fn unsupported(name: &str, kind: UniformKind) -> Error {
    let type_tag = match kind {
        UniformKind::Unsupported(tag) | UniformKind::Sampler(tag) => tag,
        _ => 0,
    };
    Error::UnsupportedUniform {
        name: name.to_owned(),
        type_tag,
    }
}

/// Check `value` against the declared type and array size, and convert it
/// to the component type the setter expects.
///
/// Partial arrays (fewer elements than declared) are accepted, as GL allows.
fn coerce<'a>(
    name: &str,
    kind: UniformKind,
    size: usize,
    value: &'a UniformValue,
) -> Result<Payload<'a>> {
    let reject = |reason: String| Error::UniformType {
        name: name.to_owned(),
        kind,
        reason,
    };

    let scalar = kind.scalar().ok_or_else(|| unsupported(name, kind))?;
    let components = kind.components();
    let len = value.len();
    if len == 0 || len % components != 0 {
        return Err(reject(format!(
            "{len} components is not a whole number of {components}-component elements"
        )));
    }
    if len / components > size {
        return Err(reject(format!(
            "{} elements given, uniform holds {size}",
            len / components
        )));
    }

    match (scalar, value) {
        (Scalar::Float, UniformValue::Float(v)) => Ok(Payload::Float(v)),
        (Scalar::Int, UniformValue::Int(v)) => Ok(Payload::Int(Cow::Borrowed(v))),
        (Scalar::UInt, UniformValue::UInt(v)) => Ok(Payload::UInt(v)),
        (Scalar::Bool, UniformValue::Bool(v)) => {
            Ok(Payload::Int(v.iter().map(|&b| i32::from(b)).collect()))
        }
        (Scalar::Bool, UniformValue::Int(v)) => Ok(Payload::Int(Cow::Borrowed(v))),
        (_, other) => Err(reject(format!(
            "expected {scalar:?} components, got {}",
            match other {
                UniformValue::Float(_) => "float",
                UniformValue::Int(_) => "int",
                UniformValue::UInt(_) => "uint",
                UniformValue::Bool(_) => "bool",
            }
        ))),
    }
}

/// Upload a row-major matrix (or matrix array), letting GL transpose it.
unsafe fn upload_matrix(
    gl: &glow::Context,
    location: Option<&glow::UniformLocation>,
    (cols, rows): (usize, usize),
    values: &[f32],
) {
    unsafe {
        match (cols, rows) {
            (2, 2) => gl.uniform_matrix_2_f32_slice(location, true, values),
            (3, 3) => gl.uniform_matrix_3_f32_slice(location, true, values),
            (4, 4) => gl.uniform_matrix_4_f32_slice(location, true, values),
            (2, 3) => gl.uniform_matrix_2x3_f32_slice(location, true, values),
            (2, 4) => gl.uniform_matrix_2x4_f32_slice(location, true, values),
            (3, 2) => gl.uniform_matrix_3x2_f32_slice(location, true, values),
            (3, 4) => gl.uniform_matrix_3x4_f32_slice(location, true, values),
            (4, 2) => gl.uniform_matrix_4x2_f32_slice(location, true, values),
            _ => gl.uniform_matrix_4x3_f32_slice(location, true, values),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn array_names_lose_their_index_suffix() {
        assert_eq!(normalize_name("foo[0]"), "foo");
        assert_eq!(normalize_name("foo"), "foo");
        assert_eq!(normalize_name("lights[0].color"), "lights[0].color");
    }

    #[test]
    fn kinds_decode_from_gl_tags() {
        assert_eq!(UniformKind::from_gl(glow::FLOAT_VEC3), UniformKind::Vec3);
        assert_eq!(UniformKind::from_gl(glow::FLOAT_MAT2x3), UniformKind::Mat2x3);
        assert_eq!(
            UniformKind::from_gl(glow::SAMPLER_2D),
            UniformKind::Sampler(glow::SAMPLER_2D)
        );
        assert_eq!(
            UniformKind::from_gl(glow::DOUBLE),
            UniformKind::Unsupported(glow::DOUBLE)
        );
    }

    #[test]
    fn component_counts() {
        assert_eq!(UniformKind::Float.components(), 1);
        assert_eq!(UniformKind::BVec3.components(), 3);
        assert_eq!(UniformKind::Mat4.components(), 16);
        assert_eq!(UniformKind::Mat3x4.components(), 12);
        assert_eq!(UniformKind::Sampler(glow::SAMPLER_2D).components(), 1);
    }

    #[test]
    fn samplers_take_texture_units_as_ints() {
        let kind = UniformKind::Sampler(glow::SAMPLER_2D);
        assert_eq!(kind.scalar(), Some(Scalar::Int));
        let value = UniformValue::from(0);
        assert!(matches!(coerce("tex", kind, 1, &value), Ok(Payload::Int(_))));
    }

    #[test]
    fn mismatched_component_type_is_rejected() {
        let err = coerce("radius", UniformKind::Float, 1, &UniformValue::from(3)).unwrap_err();
        assert!(matches!(err, Error::UniformType { .. }));
    }

    #[test]
    fn wrong_component_count_is_rejected() {
        let value = UniformValue::from([1.0, 2.0, 3.0]);
        assert!(coerce("position", UniformKind::Vec2, 1, &value).is_err());
    }

    #[test]
    fn arrays_accept_up_to_their_declared_size() {
        let four = UniformValue::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(coerce("foo", UniformKind::Float, 4, &four).is_ok());
        assert!(coerce("foo", UniformKind::Float, 3, &four).is_err());
        let two = UniformValue::from(vec![[1.0, 2.0], [3.0, 4.0]]);
        assert!(coerce("points", UniformKind::Vec2, 2, &two).is_ok());
    }

    #[test]
    fn bools_are_sent_as_ints() {
        let value = UniformValue::from([true, false]);
        match coerce("flags", UniformKind::BVec2, 1, &value).unwrap() {
            Payload::Int(v) => assert_eq!(&*v, &[1, 0]),
            _ => panic!("bools must be uploaded through the int setter"),
        }
    }

    #[test]
    fn unsupported_kinds_have_no_setter() {
        let err = coerce(
            "d",
            UniformKind::Unsupported(glow::DOUBLE),
            1,
            &UniformValue::from(1.0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedUniform { .. }));
    }

    #[test]
    fn matrix_readback_is_transposed_to_row_major() {
        // mat2x3: 2 columns of 3 rows, as GL stores it.
        let stored = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        // Columns (1,2,3) and (4,5,6) read back as rows (1,4), (2,5), (3,6).
        assert_eq!(
            column_to_row_major(&stored, 2, 3),
            vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        );
    }

    #[test]
    fn matrices_flatten_row_major_and_back() {
        let matrix = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let value = UniformValue::from(matrix);
        assert_eq!(value.as_floats().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(value.to_matrix::<3, 2>(), Some(matrix));
        assert_eq!(value.to_matrix::<2, 2>(), None);
    }

    #[test]
    fn scalar_accessors() {
        assert_eq!(UniformValue::from(1.5).as_f32(), Some(1.5));
        assert_eq!(UniformValue::from(7).as_i32(), Some(7));
        assert_eq!(UniformValue::from(7_u32).as_u32(), Some(7));
        assert_eq!(UniformValue::from(true).as_bool(), Some(true));
        assert_eq!(UniformValue::from([5.0, 7.0]).to_array::<2>(), Some([5.0, 7.0]));
        assert_eq!(UniformValue::from([5.0, 7.0]).as_f32(), None);
    }

    #[test]
    fn elements_split_flat_arrays() {
        let value = UniformValue::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(value.to_elements::<2>(), Some(vec![[1.0, 2.0], [3.0, 4.0]]));
        assert_eq!(value.to_elements::<3>(), None);
        assert_eq!(value.to_elements::<1>().map(|v| v.len()), Some(4));
    }

    #[test]
    fn kinds_display_as_glsl_names() {
        assert_eq!(UniformKind::Mat4x2.to_string(), "mat4x2");
        assert_eq!(UniformKind::Unsupported(0x140A).to_string(), "type 0x140A");
    }
}
