// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.

use hsl_ast::token::{Token, TokenKind};
use logos::Logos;

/// Raw token type for logos - tokens are classified in a second pass.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    // === Comments (skip them) ===
    #[regex(r"//[^\n]*", logos::skip, priority = 10)]
    LineComment,

    // Block comments end at the first `*/`; an unterminated one swallows
    // the rest of the input without erroring.
    #[token("/*", block_comment)]
    BlockComment,

    // === Literals ===
    // The fraction is part of the token, so `3.14` never splits at the dot.
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // === Words (literal/type/keyword/identifier, decided later) ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,

    // === Punctuation ===
    // Contiguous runs of these characters merge into a single token, so
    // `+` `=` becomes `+=` and `<` `<` becomes `<<`.
    #[regex(r"[+\-*/<>=|&.%^]+")]
    Operator,

    // Non-merging punctuation always stands alone.
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("#")]
    Hash,
    #[token("~")]
    Tilde,
}

/// Skip to the first `*/`; without one the comment runs to end of input.
fn block_comment(lexer: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let remainder = lexer.remainder();
    match remainder.find("*/") {
        Some(idx) => lexer.bump(idx + 2),
        None => lexer.bump(remainder.len()),
    }
    logos::Skip
}

/// The lexer for HSL source code.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the entire source.
    ///
    /// The lexer never fails: bytes it does not recognize pass through as
    /// identifiers and surface as parse errors downstream.
    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut lexer = RawToken::lexer(self.source);

        while let Some(result) = lexer.next() {
            let slice = lexer.slice();
            let token = match result {
                Ok(raw) => {
                    let kind = match raw {
                        RawToken::Number => TokenKind::Literal,
                        RawToken::Word => classify_word(slice),
                        RawToken::LineComment | RawToken::BlockComment => {
                            unreachable!("comments are skipped")
                        }
                        _ => TokenKind::Punctuation,
                    };
                    Token::new(kind, slice)
                }
                Err(()) => Token::new(TokenKind::Identifier, slice),
            };
            tokens.push(token);

            // A `#` two tokens back means a directive name was just pushed:
            // the rest of the line is its body, captured as one literal so
            // `#include <path>` bodies escape normal tokenization.
            if tokens.len() >= 2 && tokens[tokens.len() - 2].is(TokenKind::Punctuation, "#") {
                let remainder = lexer.remainder();
                let line_len = remainder.find('\n').unwrap_or(remainder.len());
                let body = remainder[..line_len].trim();
                tokens.push(Token::new(TokenKind::Literal, body));
                lexer.bump(line_len);
            }
        }

        tokens
    }
}

/// Classify a word: literal keywords first, then types, then keywords.
fn classify_word(word: &str) -> TokenKind {
    if word == "true" || word == "false" {
        TokenKind::Literal
    } else if is_type(word) {
        TokenKind::Type
    } else if is_keyword(word) {
        TokenKind::Keyword
    } else {
        TokenKind::Identifier
    }
}

const SIZED_TYPE_PREFIXES: &[&str] = &["bvec", "ivec", "uvec", "dvec", "vec", "mat"];

fn is_type(word: &str) -> bool {
    if matches!(
        word,
        "bool"
            | "int"
            | "uint"
            | "float"
            | "double"
            | "void"
            | "tex2d"
            | "texCube"
            | "subpassTex"
            | "buffer"
    ) {
        return true;
    }
    SIZED_TYPE_PREFIXES.iter().any(|prefix| {
        word.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_digit())
    })
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "const"
            | "for"
            | "if"
            | "else"
            | "while"
            | "struct"
            | "uniform"
            | "return"
            | "in"
            | "out"
            | "flat"
    )
}
