// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Compilation error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::CompileTarget;

/// Any error surfaced by the compilation pipeline. The first error aborts
/// the compile; partial output is discarded.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] hsl_parser::ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A structural rule violation found while emitting.
#[derive(Debug, Clone, Error)]
pub enum SemanticError {
    #[error("`{0}` is already defined in this scope")]
    AlreadyDefined(String),

    #[error("`{0}` declarations are only allowed at the outermost scope")]
    NotAtOutermostScope(String),

    #[error("`{ty}` expects template arguments `{expected}`")]
    BadTemplateArguments { ty: String, expected: &'static str },

    #[error("buffer declaration references undeclared struct `{0}`")]
    UndeclaredStruct(String),

    #[error("`in` and `out` cannot be combined on one declaration")]
    ConflictingQualifiers,

    #[error("`{qualifier}` is not valid on `{ty}`")]
    QualifierOnResource {
        qualifier: &'static str,
        ty: String,
    },
}

/// A construct the selected output dialect cannot express.
#[derive(Debug, Clone, Error)]
pub enum TargetError {
    #[error("target {0} is not supported")]
    UnsupportedTarget(CompileTarget),

    #[error("type `{ty}` cannot be emitted for {target}")]
    UnsupportedType { ty: String, target: CompileTarget },

    #[error("`{name}` has no {target} equivalent")]
    UnsupportedBuiltin { name: String, target: CompileTarget },

    #[error("{what} declarations are not implemented for {target}")]
    UnsupportedDeclaration {
        what: &'static str,
        target: CompileTarget,
    },
}
