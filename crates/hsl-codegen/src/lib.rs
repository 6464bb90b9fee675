// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Emitter for the HSL cross-compiler.
//!
//! Walks a parse tree and produces text in the selected output dialect,
//! tracking lexical scopes, binding and location counters, and include
//! expansion across files.

mod emitter;
mod error;
mod types;

#[cfg(test)]
mod tests;

pub use emitter::{CompileState, Emitter, Scope};
pub use error::{CompileError, SemanticError, TargetError};

use std::fmt;
use std::path::Path;

use hsl_ast::ParseNode;

/// The output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTarget {
    OpenGlsl,
    VulkanGlsl,
    /// Partial: types and buffer keywords only.
    Hlsl,
    /// Reserved; any attempt to emit fails.
    Metal,
}

impl CompileTarget {
    pub fn is_glsl(self) -> bool {
        matches!(self, CompileTarget::OpenGlsl | CompileTarget::VulkanGlsl)
    }
}

impl fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileTarget::OpenGlsl => "OpenGL GLSL",
            CompileTarget::VulkanGlsl => "Vulkan GLSL",
            CompileTarget::Hlsl => "HLSL",
            CompileTarget::Metal => "Metal",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for CompileTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opengl" => Ok(CompileTarget::OpenGlsl),
            "vulkan" => Ok(CompileTarget::VulkanGlsl),
            "hlsl" => Ok(CompileTarget::Hlsl),
            "metal" => Ok(CompileTarget::Metal),
            other => Err(format!(
                "unknown target `{}` (expected opengl, vulkan, or hlsl)",
                other
            )),
        }
    }
}

/// Emit an already-parsed tree with fresh compiler state.
pub fn compile(
    root: &ParseNode,
    include_base: &Path,
    target: CompileTarget,
) -> Result<String, CompileError> {
    let mut state = CompileState::new(include_base);
    compile_with_state(root, target, &mut state)
}

/// Emit with inherited compiler state. Include expansion re-enters here, so
/// binding slots and globally visible declarations persist across files.
pub fn compile_with_state(
    root: &ParseNode,
    target: CompileTarget,
    state: &mut CompileState,
) -> Result<String, CompileError> {
    if target == CompileTarget::Metal {
        return Err(TargetError::UnsupportedTarget(target).into());
    }
    Emitter::new(target, state).emit(root)
}

/// Compile an HSL source file end to end: read, lex, parse, emit.
pub fn compile_from_file(path: &Path, target: CompileTarget) -> Result<String, CompileError> {
    let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tokens = hsl_lexer::lex(&source);
    let root = hsl_parser::parse(tokens)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    compile(&root, base, target)
}
