// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for the HSL shading language.
//!
//! Transforms a token stream into a tree of typed nodes.

mod parser;

pub use parser::{ParseError, Parser};

use hsl_ast::{ParseNode, Token};

/// Parse a token stream into the root block node.
pub fn parse(tokens: Vec<Token>) -> Result<ParseNode, ParseError> {
    Parser::new(tokens).parse()
}
