// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lexer for the HSL shading language.
//!
//! Tokenizes source text into a flat token stream for the parser.

mod lexer;

pub use lexer::Lexer;

use hsl_ast::Token;

/// Tokenize a source string.
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
