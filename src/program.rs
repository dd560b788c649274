//! Shader program compilation and scoped activation.
//!
//! [`ShaderProgram`] compiles a vertex, a fragment and an optional geometry
//! stage, links them, and reflects the active uniforms into a
//! [`UniformTable`]. Uniform writes go through [`ActiveProgram`], a guard that
//! binds the program and restores the previous binding when dropped.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use glow::HasContext;

use crate::error::{Error, Result};
use crate::uniforms::{UniformTable, UniformValue};

/// Marker prepended to the offending line in compile-error excerpts.
const EXCERPT_MARKER: &str = ">>> ";

/// Number of source lines shown before the offending one.
const EXCERPT_CONTEXT: usize = 2;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Geometry stage.
    Geometry,
    /// Fragment stage.
    Fragment,
}

impl ShaderStage {
    fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Geometry => glow::GEOMETRY_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
        })
    }
}

/// A linked GLSL program together with its reflected uniforms.
///
/// The program handle stays valid for the whole lifetime of the value; there
/// is no relinking. Call [`destroy`](Self::destroy) before the context goes
/// away.
pub struct ShaderProgram {
    gl: Arc<glow::Context>,
    program: glow::Program,
    /// Compiled stages, detached after linking and deleted in `destroy`.
    stages: Vec<glow::Shader>,
    uniforms: UniformTable,
}

impl ShaderProgram {
    /// Compile and link a program from GLSL sources.
    ///
    /// Empty or missing geometry source means a two-stage program.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// [`Error::ShaderCompilation`] with an annotated excerpt when a stage
    /// fails to compile, [`Error::Link`] when linking fails, and
    /// [`Error::Gl`] when GL objects cannot be created.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        vertex_src: &str,
        fragment_src: &str,
        geometry_src: Option<&str>,
    ) -> Result<Self> {
        let mut sources = vec![(ShaderStage::Vertex, vertex_src)];
        if let Some(geometry_src) = geometry_src.filter(|src| !src.trim().is_empty()) {
            sources.push((ShaderStage::Geometry, geometry_src));
        }
        sources.push((ShaderStage::Fragment, fragment_src));

        let mut stages = Vec::with_capacity(sources.len());
        for (stage, source) in sources {
            match unsafe { compile_shader(&gl, stage, source) } {
                Ok(shader) => stages.push(shader),
                Err(err) => {
                    for shader in stages {
                        unsafe { gl.delete_shader(shader) };
                    }
                    return Err(err);
                }
            }
        }

        let program = match unsafe { link_program(&gl, &stages) } {
            Ok(program) => program,
            Err(err) => {
                for &shader in &stages {
                    unsafe { gl.delete_shader(shader) };
                }
                return Err(err);
            }
        };

        let uniforms = unsafe { UniformTable::build(&gl, program) };

        Ok(Self {
            gl,
            program,
            stages,
            uniforms,
        })
    }

    /// The raw GL program handle.
    #[must_use]
    pub fn handle(&self) -> glow::Program {
        self.program
    }

    /// The context this program lives in.
    #[must_use]
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// The reflected active uniforms.
    #[must_use]
    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }

    /// Make this program current. Not reference counted.
    ///
    /// # Safety
    ///
    /// Requires the context this program was created with to be current.
    pub unsafe fn bind(&self) {
        unsafe { self.gl.use_program(Some(self.program)) };
    }

    /// Make no program current.
    ///
    /// # Safety
    ///
    /// Requires the context this program was created with to be current.
    pub unsafe fn unbind(&self) {
        unsafe { self.gl.use_program(None) };
    }

    /// Bind this program until the returned guard is dropped.
    ///
    /// Whatever program was bound before is restored on drop, including
    /// during unwinding.
    ///
    /// # Safety
    ///
    /// Requires the context this program was created with to be current,
    /// and to stay current for as long as the guard lives.
    pub unsafe fn activate(&self) -> ActiveProgram<'_> {
        let previous = unsafe { self.gl.get_parameter_program(glow::CURRENT_PROGRAM) };
        unsafe { self.bind() };
        ActiveProgram {
            program: self,
            previous,
        }
    }

    /// Read a uniform back from the GPU.
    ///
    /// Does not require the program to be bound.
    ///
    /// # Safety
    ///
    /// Requires the context this program was created with to be current.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] if there is no active uniform of that name.
    pub unsafe fn get(&self, name: &str) -> Result<UniformValue> {
        unsafe { self.uniforms.get(&self.gl, self.program, name) }
    }

    /// Write a single uniform, binding the program for the duration of the
    /// call.
    ///
    /// # Safety
    ///
    /// Requires the context this program was created with to be current.
    ///
    /// # Errors
    ///
    /// See [`ActiveProgram::set`].
    pub unsafe fn set(&self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let active = unsafe { self.activate() };
        active.set(name, value)
    }

    /// Delete the program and its stage objects.
    ///
    /// # Safety
    ///
    /// Must be called with the context this program was created with, and
    /// at most once.
    pub unsafe fn destroy(&self) {
        unsafe {
            for &shader in &self.stages {
                self.gl.delete_shader(shader);
            }
            self.gl.delete_program(self.program);
        }
    }
}

/// A [`ShaderProgram`] bound for the lifetime of this guard.
///
/// Obtained from [`ShaderProgram::activate`], whose safety contract covers
/// the GL calls made here and in `Drop`.
#[must_use = "the previous program is rebound as soon as this is dropped"]
pub struct ActiveProgram<'a> {
    program: &'a ShaderProgram,
    previous: Option<glow::Program>,
}

impl ActiveProgram<'_> {
    /// Write a uniform of the bound program.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] for unknown names, [`Error::UniformType`]
    /// if the value does not match the declared type or array size.
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let program = self.program;
        unsafe { program.uniforms.set(&program.gl, name, &value.into()) }
    }

    /// Read a uniform of the bound program.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] if there is no active uniform of that name.
    pub fn get(&self, name: &str) -> Result<UniformValue> {
        unsafe { self.program.get(name) }
    }

    /// The program this guard keeps bound.
    #[must_use]
    pub fn program(&self) -> &ShaderProgram {
        self.program
    }
}

impl Drop for ActiveProgram<'_> {
    fn drop(&mut self) {
        unsafe { self.program.gl.use_program(self.previous) };
    }
}

/// Compile a single shader stage.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader> {
    let source = retarget_glsl(source, gl.version().is_embedded);
    let source = source.as_ref();
    unsafe {
        let shader = gl.create_shader(stage.gl_enum())?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(Error::ShaderCompilation {
                stage,
                message: annotate_compile_log(&log, source),
            });
        }

        log::debug!("compiled {stage} shader");
        Ok(shader)
    }
}

/// Rewrite a `#version 330 core` header to GLSL ES 3.00 for GLES and WebGL
/// contexts, which also need a default float precision.
///
/// Other sources pass through untouched.
fn retarget_glsl(source: &str, embedded: bool) -> Cow<'_, str> {
    const DESKTOP: &str = "#version 330 core";
    match source.strip_prefix(DESKTOP) {
        Some(rest) if embedded => {
            Cow::Owned(format!("#version 300 es\nprecision highp float;{rest}"))
        }
        _ => Cow::Borrowed(source),
    }
}

/// Link compiled stages into a program, detaching them afterwards.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn link_program(gl: &glow::Context, stages: &[glow::Shader]) -> Result<glow::Program> {
    unsafe {
        let program = gl.create_program()?;
        for &shader in stages {
            gl.attach_shader(program, shader);
        }
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(Error::Link(log));
        }

        for &shader in stages {
            gl.detach_shader(program, shader);
        }

        log::debug!("linked program with {} stages", stages.len());
        Ok(program)
    }
}

/// Append a source excerpt to a compiler log when the log names a line.
///
/// Recognized diagnostics are `ERROR: <file>:<line>` (AMD/Intel Windows),
/// `<file>(<line>) : error` (NVIDIA) and `<file>:<line>(<col>): error`
/// (Mesa). Anything else is returned unchanged.
#[must_use]
pub fn annotate_compile_log(log: &str, source: &str) -> String {
    let Some(excerpt) = log
        .lines()
        .find_map(diagnostic_line)
        .and_then(|line| code_excerpt(source, line))
    else {
        return log.to_owned();
    };

    let rule = "---------";
    format!("{}\n{rule}\n{excerpt}\n{rule}", log.trim_end())
}

/// The 1-based source line named by one diagnostic line, if any.
fn diagnostic_line(diagnostic: &str) -> Option<usize> {
    let diagnostic = diagnostic.trim_start();

    // ERROR: 0:12: ...
    if let Some(rest) = diagnostic.strip_prefix("ERROR: ") {
        let (_, rest) = split_number(rest)?;
        let (line, _) = split_number(rest.strip_prefix(':')?)?;
        return Some(line);
    }

    let (_, rest) = split_number(diagnostic)?;
    // 0(12) : error C0000: ...
    if let Some(rest) = rest.strip_prefix('(') {
        let (line, rest) = split_number(rest)?;
        return rest.starts_with(") : error").then_some(line);
    }
    // 0:12(5): error: ...
    let (line, rest) = split_number(rest.strip_prefix(':')?)?;
    let (_, rest) = split_number(rest.strip_prefix('(')?)?;
    rest.starts_with("): error").then_some(line)
}

/// Split a leading decimal number off `s`.
fn split_number(s: &str) -> Option<(usize, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let number = s[..end].parse().ok()?;
    Some((number, &s[end..]))
}

/// A few lines of context followed by the marked offending line.
///
/// `line` is 1-based. Returns `None` when it is out of range.
fn code_excerpt(source: &str, line: usize) -> Option<String> {
    let lines: Vec<&str> = source.split('\n').collect();
    let index = line.checked_sub(1)?;
    let offending = lines.get(index)?;

    let padding = " ".repeat(EXCERPT_MARKER.len());
    let mut excerpt: Vec<String> = lines[index.saturating_sub(EXCERPT_CONTEXT)..index]
        .iter()
        .map(|context| format!("{padding}{context}"))
        .collect();
    excerpt.push(format!("{EXCERPT_MARKER}{offending}"));
    Some(excerpt.join("\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SOURCE: &str = "#version 330 core\nout vec4 color;\nvoid main() {\n    color = vec4(1)\n}\n";

    #[test]
    fn amd_style_diagnostics_name_a_line() {
        assert_eq!(diagnostic_line("ERROR: 0:4: syntax error"), Some(4));
    }

    #[test]
    fn nvidia_style_diagnostics_name_a_line() {
        assert_eq!(
            diagnostic_line("0(4) : error C0000: syntax error, unexpected '}'"),
            Some(4)
        );
    }

    #[test]
    fn mesa_style_diagnostics_name_a_line() {
        assert_eq!(
            diagnostic_line("0:4(5): error: syntax error, unexpected '}'"),
            Some(4)
        );
    }

    #[test]
    fn unrecognized_diagnostics_name_nothing() {
        assert_eq!(diagnostic_line("something went wrong"), None);
        assert_eq!(diagnostic_line("0(4) : warning C7011"), None);
    }

    #[test]
    fn excerpt_marks_the_offending_line_with_context() {
        let excerpt = code_excerpt(SOURCE, 4).unwrap();
        assert_eq!(
            excerpt,
            "    out vec4 color;\n    void main() {\n>>>     color = vec4(1)"
        );
    }

    #[test]
    fn excerpt_of_first_line_has_no_context() {
        assert_eq!(
            code_excerpt(SOURCE, 1).unwrap(),
            ">>> #version 330 core"
        );
    }

    #[test]
    fn excerpt_out_of_range_is_none() {
        assert!(code_excerpt(SOURCE, 0).is_none());
        assert!(code_excerpt(SOURCE, 99).is_none());
    }

    #[test]
    fn annotated_log_contains_the_offending_source_line() {
        let log = "0:4(5): error: syntax error, unexpected '}'\n";
        let message = annotate_compile_log(log, SOURCE);
        assert!(message.starts_with("0:4(5): error"));
        assert!(message.contains("color = vec4(1)"));
        assert!(message.contains(">>> "));
    }

    #[test]
    fn unrecognized_log_is_passed_through() {
        let log = "internal compiler failure";
        assert_eq!(annotate_compile_log(log, SOURCE), log);
    }

    #[test]
    fn later_log_lines_are_searched_too() {
        let log = "warning: something\nERROR: 0:2: 'color' : redefinition";
        assert!(annotate_compile_log(log, SOURCE).contains(">>> out vec4 color;"));
    }

    #[test]
    fn desktop_sources_are_kept_for_desktop_contexts() {
        assert!(matches!(retarget_glsl(SOURCE, false), Cow::Borrowed(_)));
    }

    #[test]
    fn embedded_contexts_get_glsl_es() {
        let source = retarget_glsl(SOURCE, true);
        let mut lines = source.lines();
        assert_eq!(lines.next(), Some("#version 300 es"));
        assert_eq!(lines.next(), Some("precision highp float;"));
        assert_eq!(lines.next(), Some("out vec4 color;"));
    }

    #[test]
    fn stage_names() {
        assert_eq!(ShaderStage::Geometry.to_string(), "geometry");
        assert_eq!(ShaderStage::Vertex.gl_enum(), glow::VERTEX_SHADER);
    }
}
