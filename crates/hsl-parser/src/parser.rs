// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The recursive-descent parser implementation.

use hsl_ast::node::{
    AssignmentExpr, BinaryExpr, Block, CallExpr, CastExpr, ElseIfStmt, ElseStmt, FnDecl, ForStmt,
    IfStmt, MemberExpr, NodeKind, Param, ParseNode, Qualifiers, ReturnStmt, StructDecl,
    UpdateExpr, VarDecl, WhileStmt,
};
use hsl_ast::token::{Token, TokenKind};

/// The parser for HSL token streams.
///
/// Every parsing routine takes a token offset and returns a node carrying
/// its inclusive `[start, end]` token span; callers resume at `end + 1`.
/// The parser is strict: the first structural violation aborts.
pub struct Parser {
    tokens: Vec<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse the whole stream into an unscoped root block.
    pub fn parse(&self) -> Result<ParseNode, ParseError> {
        self.parse_block(0)
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn get(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(offset)
    }

    fn check(&self, offset: usize, kind: TokenKind, text: &str) -> bool {
        self.get(offset).is_some_and(|t| t.is(kind, text))
    }

    fn check_punct(&self, offset: usize, text: &str) -> bool {
        self.check(offset, TokenKind::Punctuation, text)
    }

    fn expect_punct(&self, offset: usize, text: &str) -> Result<(), ParseError> {
        if self.check_punct(offset, text) {
            Ok(())
        } else {
            Err(ParseError::expected(
                &format!("'{}'", text),
                self.describe(offset),
                offset,
            ))
        }
    }

    fn describe(&self, offset: usize) -> String {
        match self.get(offset) {
            Some(token) => format!("`{}`", token.text),
            None => "end of input".to_string(),
        }
    }

    // =========================================================================
    // Blocks and Statements
    // =========================================================================

    /// Parse a block. A leading `{` marks it scoped and limits it to the
    /// matching `}`; otherwise the block covers the rest of the stream.
    fn parse_block(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let scoped = self.check_punct(offset, "{");
        let start = offset;
        let mut pos = if scoped { offset + 1 } else { offset };
        let mut body = Vec::new();

        let end = loop {
            if scoped && self.check_punct(pos, "}") {
                break pos;
            }
            match self.parse_statement(pos)? {
                Some(statement) => {
                    pos = statement.end + 1;
                    body.push(statement);
                }
                None if scoped => return Err(ParseError::new("missing `}`", pos)),
                None => break pos.saturating_sub(1),
            }
        };

        Ok(ParseNode {
            kind: NodeKind::Block(Block { scoped, body }),
            start,
            end,
        })
    }

    /// Parse one statement, including its terminator where the grammar
    /// requires one. Returns `None` at the end of the stream.
    fn parse_statement(&self, offset: usize) -> Result<Option<ParseNode>, ParseError> {
        let mut quals = Qualifiers::default();
        let mut pos = offset;

        // Leading keywords either accumulate declaration qualifiers or
        // dispatch to a dedicated statement parser.
        while let Some(token) = self.get(pos) {
            if token.kind != TokenKind::Keyword {
                break;
            }
            match token.text.as_str() {
                "const" => quals.is_const = true,
                "uniform" => quals.uniform = true,
                "flat" => quals.flat = true,
                "in" => quals.input = true,
                "out" => quals.output = true,
                "for" => return self.parse_for(pos).map(Some),
                "if" => return self.parse_if(pos).map(Some),
                "else" => return self.parse_else(pos).map(Some),
                "while" => return self.parse_while(pos).map(Some),
                "return" => return self.parse_return(pos).map(Some),
                "struct" => return self.parse_struct(pos).map(Some),
                other => {
                    return Err(ParseError::new(
                        format!("unexpected keyword `{}`", other),
                        pos,
                    ))
                }
            }
            pos += 1;
        }

        let Some(token) = self.get(pos) else {
            if pos == offset {
                return Ok(None);
            }
            return Err(ParseError::new("unexpected end of input", pos));
        };

        if token.kind == TokenKind::Type {
            // Type Identifier `(` opens a function declaration; any other
            // shape is a variable declaration.
            if self.get(pos + 1).is_some_and(|t| t.kind == TokenKind::Identifier)
                && self.check_punct(pos + 2, "(")
            {
                return self.parse_function(pos, offset, quals).map(Some);
            }
            return self.parse_variable(pos, offset, quals).map(Some);
        }

        if quals != Qualifiers::default() {
            return Err(ParseError::expected(
                "a declaration",
                self.describe(pos),
                pos,
            ));
        }

        if token.is(TokenKind::Punctuation, "#") {
            return self.parse_preprocessor(pos).map(Some);
        }

        // Expression statement, possibly promoted to an assignment.
        let left = self.parse_basic(pos)?;
        let after = left.end + 1;
        if self.check_punct(after, ";") {
            return Ok(Some(ParseNode {
                kind: left.kind,
                start: offset,
                end: after,
            }));
        }
        if let Some(op) = self.get(after).filter(|t| is_assignment_operator(&t.text)) {
            let right = self.parse_basic(after + 1)?;
            let semi = right.end + 1;
            self.expect_punct(semi, ";")?;
            return Ok(Some(ParseNode {
                kind: NodeKind::Assignment(Box::new(AssignmentExpr {
                    op: op.text.clone(),
                    left,
                    right,
                })),
                start: offset,
                end: semi,
            }));
        }
        Err(ParseError::expected("';'", self.describe(after), after))
    }

    fn parse_preprocessor(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let directive = match self.get(offset + 1) {
            Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
            _ => {
                return Err(ParseError::expected(
                    "a directive name",
                    self.describe(offset + 1),
                    offset + 1,
                ))
            }
        };
        let body = match self.get(offset + 2) {
            Some(t) if t.kind == TokenKind::Literal => t.text.clone(),
            _ => {
                return Err(ParseError::expected(
                    "a directive body",
                    self.describe(offset + 2),
                    offset + 2,
                ))
            }
        };
        Ok(ParseNode {
            kind: NodeKind::Preprocessor { directive, body },
            start: offset,
            end: offset + 2,
        })
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_function(
        &self,
        offset: usize,
        start: usize,
        quals: Qualifiers,
    ) -> Result<ParseNode, ParseError> {
        let return_type = self.tokens[offset].text.clone();
        let name = self.tokens[offset + 1].text.clone();
        let (params, close) = self.parse_params(offset + 3)?;
        if !self.check_punct(close + 1, "{") {
            return Err(ParseError::expected(
                "'{' after function declaration",
                self.describe(close + 1),
                close + 1,
            ));
        }
        let body = self.parse_block(close + 1)?;
        let end = body.end;
        Ok(ParseNode {
            kind: NodeKind::Function(Box::new(FnDecl {
                is_const: quals.is_const,
                return_type,
                params,
                name,
                body,
            })),
            start,
            end,
        })
    }

    /// Parse `Type name, Type name, ...` up to `)`. Returns the parameters
    /// and the offset of the closing parenthesis.
    fn parse_params(&self, offset: usize) -> Result<(Vec<Param>, usize), ParseError> {
        let mut params = Vec::new();
        let mut pos = offset;
        if self.check_punct(pos, ")") {
            return Ok((params, pos));
        }
        loop {
            let ty = match self.get(pos) {
                Some(t) if t.kind == TokenKind::Type => t.text.clone(),
                _ => {
                    return Err(ParseError::expected(
                        "a parameter type",
                        self.describe(pos),
                        pos,
                    ))
                }
            };
            let name = match self.get(pos + 1) {
                Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
                _ => {
                    return Err(ParseError::expected(
                        "a parameter name",
                        self.describe(pos + 1),
                        pos + 1,
                    ))
                }
            };
            params.push(Param { ty, name });
            pos += 2;
            if self.check_punct(pos, ",") {
                pos += 1;
            } else if self.check_punct(pos, ")") {
                return Ok((params, pos));
            } else {
                return Err(ParseError::expected(
                    "',' or ')'",
                    self.describe(pos),
                    pos,
                ));
            }
        }
    }

    fn parse_variable(
        &self,
        offset: usize,
        start: usize,
        quals: Qualifiers,
    ) -> Result<ParseNode, ParseError> {
        let ty = self.tokens[offset].text.clone();
        let mut pos = offset + 1;

        let mut template_args = Vec::new();
        if self.check_punct(pos, "<") {
            let (args, close) = self.parse_template_args(pos + 1)?;
            template_args = args;
            pos = close + 1;
        }

        let name = match self.get(pos) {
            Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
            _ => {
                return Err(ParseError::expected(
                    "a variable name",
                    self.describe(pos),
                    pos,
                ))
            }
        };
        pos += 1;

        let mut array_count = 0;
        if self.check_punct(pos, "[") {
            array_count = self
                .get(pos + 1)
                .filter(|t| t.kind == TokenKind::Literal)
                .and_then(|t| t.text.parse::<usize>().ok())
                .ok_or_else(|| {
                    ParseError::new("expected a literal array size", pos + 1)
                })?;
            self.expect_punct(pos + 2, "]")?;
            pos += 3;
        }

        let make = |init: Option<ParseNode>, end: usize| ParseNode {
            kind: NodeKind::Var(Box::new(VarDecl {
                quals,
                ty: ty.clone(),
                template_args,
                name: name.clone(),
                array_count,
                init,
            })),
            start,
            end,
        };

        if self.check_punct(pos, ";") {
            return Ok(make(None, pos));
        }
        if self.check_punct(pos, "=") {
            let init = self.parse_basic(pos + 1)?;
            let semi = init.end + 1;
            self.expect_punct(semi, ";")?;
            return Ok(make(Some(init), semi));
        }
        Err(ParseError::expected(
            "'=' or ';'",
            self.describe(pos),
            pos,
        ))
    }

    /// Template arguments are single identifier or literal tokens; their
    /// shape per resource type is validated during emission.
    fn parse_template_args(
        &self,
        offset: usize,
    ) -> Result<(Vec<ParseNode>, usize), ParseError> {
        let mut args = Vec::new();
        let mut pos = offset;
        loop {
            let kind = match self.get(pos) {
                Some(t) if t.kind == TokenKind::Identifier => NodeKind::Identifier {
                    name: t.text.clone(),
                },
                Some(t) if t.kind == TokenKind::Literal => NodeKind::Literal {
                    value: t.text.clone(),
                },
                _ => {
                    return Err(ParseError::expected(
                        "a template argument",
                        self.describe(pos),
                        pos,
                    ))
                }
            };
            args.push(ParseNode {
                kind,
                start: pos,
                end: pos,
            });
            pos += 1;
            if self.check_punct(pos, ",") {
                pos += 1;
            } else if self.check_punct(pos, ">") {
                return Ok((args, pos));
            } else {
                return Err(ParseError::expected("'>'", self.describe(pos), pos));
            }
        }
    }

    fn parse_struct(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let name = match self.get(offset + 1) {
            Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
            _ => {
                return Err(ParseError::expected(
                    "a struct name",
                    self.describe(offset + 1),
                    offset + 1,
                ))
            }
        };
        if !self.check_punct(offset + 2, "{") {
            return Err(ParseError::expected(
                "'{' after struct name",
                self.describe(offset + 2),
                offset + 2,
            ));
        }
        let body = self.parse_block(offset + 2)?;
        let semi = body.end + 1;
        self.expect_punct(semi, ";")?;
        Ok(ParseNode {
            kind: NodeKind::Struct(Box::new(StructDecl { name, body })),
            start: offset,
            end: semi,
        })
    }

    // =========================================================================
    // Control Flow
    // =========================================================================

    fn parse_for(&self, offset: usize) -> Result<ParseNode, ParseError> {
        self.expect_punct(offset + 1, "(")?;
        let init = self
            .parse_statement(offset + 2)?
            .ok_or_else(|| ParseError::new("missing for-loop initializer", offset + 2))?;
        let test = self.parse_basic(init.end + 1)?;
        self.expect_punct(test.end + 1, ";")?;
        let update = self.parse_basic(test.end + 2)?;
        self.expect_punct(update.end + 1, ")")?;
        let body = self.parse_braced_block(update.end + 2, "'{' after for loop")?;
        let end = body.end;
        Ok(ParseNode {
            kind: NodeKind::For(Box::new(ForStmt {
                init,
                test,
                update,
                body,
            })),
            start: offset,
            end,
        })
    }

    fn parse_if(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let condition = self.parse_basic(offset + 1)?;
        let body = self.parse_braced_block(condition.end + 1, "'{' after if condition")?;
        let end = body.end;
        Ok(ParseNode {
            kind: NodeKind::If(Box::new(IfStmt { condition, body })),
            start: offset,
            end,
        })
    }

    fn parse_else(&self, offset: usize) -> Result<ParseNode, ParseError> {
        if self.check(offset + 1, TokenKind::Keyword, "if") {
            let condition = self.parse_basic(offset + 2)?;
            let body =
                self.parse_braced_block(condition.end + 1, "'{' after else-if condition")?;
            let end = body.end;
            return Ok(ParseNode {
                kind: NodeKind::ElseIf(Box::new(ElseIfStmt { condition, body })),
                start: offset,
                end,
            });
        }
        let body = self.parse_braced_block(offset + 1, "'{' after else")?;
        let end = body.end;
        Ok(ParseNode {
            kind: NodeKind::Else(Box::new(ElseStmt { body })),
            start: offset,
            end,
        })
    }

    fn parse_while(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let condition = self.parse_basic(offset + 1)?;
        let body = self.parse_braced_block(condition.end + 1, "'{' after while condition")?;
        let end = body.end;
        Ok(ParseNode {
            kind: NodeKind::While(Box::new(WhileStmt { condition, body })),
            start: offset,
            end,
        })
    }

    fn parse_return(&self, offset: usize) -> Result<ParseNode, ParseError> {
        if self.check_punct(offset + 1, ";") {
            return Ok(ParseNode {
                kind: NodeKind::Return(Box::new(ReturnStmt { value: None })),
                start: offset,
                end: offset + 1,
            });
        }
        let value = self.parse_basic(offset + 1)?;
        let semi = value.end + 1;
        self.expect_punct(semi, ";")?;
        Ok(ParseNode {
            kind: NodeKind::Return(Box::new(ReturnStmt { value: Some(value) })),
            start: offset,
            end: semi,
        })
    }

    fn parse_braced_block(&self, offset: usize, expected: &str) -> Result<ParseNode, ParseError> {
        if !self.check_punct(offset, "{") {
            return Err(ParseError::expected(expected, self.describe(offset), offset));
        }
        self.parse_block(offset)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Parse a primary expression, then absorb postfix constructs in a loop:
    /// member access, calls, indexing, binary operators, and updates.
    ///
    /// Binary chains are right-associative by construction; precedence is
    /// deliberately not honored.
    fn parse_basic(&self, offset: usize) -> Result<ParseNode, ParseError> {
        let token = self
            .get(offset)
            .ok_or_else(|| ParseError::new("missing expression", offset))?;

        let mut node = match (token.kind, token.text.as_str()) {
            (TokenKind::Identifier, _) => ParseNode {
                kind: NodeKind::Identifier {
                    name: token.text.clone(),
                },
                start: offset,
                end: offset,
            },
            (TokenKind::Literal, _) => ParseNode {
                kind: NodeKind::Literal {
                    value: token.text.clone(),
                },
                start: offset,
                end: offset,
            },
            (TokenKind::Type, _) => {
                // A type in expression position must be a constructor cast.
                if !self.check_punct(offset + 1, "(") {
                    return Err(ParseError::new("unexpected type token", offset));
                }
                let (args, close) = self.parse_list(offset + 2, ")")?;
                ParseNode {
                    kind: NodeKind::Cast(CastExpr {
                        ty: token.text.clone(),
                        args,
                    }),
                    start: offset,
                    end: close,
                }
            }
            (TokenKind::Punctuation, op @ ("++" | "--" | "-" | "!")) => {
                let target = self.parse_basic(offset + 1)?;
                let end = target.end;
                ParseNode {
                    kind: NodeKind::Update(Box::new(UpdateExpr {
                        op: op.to_string(),
                        prefix: true,
                        target,
                    })),
                    start: offset,
                    end,
                }
            }
            (TokenKind::Punctuation, "{") => {
                let (elements, close) = self.parse_list(offset + 1, "}")?;
                ParseNode {
                    kind: NodeKind::List { elements },
                    start: offset,
                    end: close,
                }
            }
            (TokenKind::Punctuation, "(") => {
                let inside = self.parse_basic(offset + 1)?;
                let close = inside.end + 1;
                self.expect_punct(close, ")")?;
                ParseNode {
                    kind: NodeKind::Paren(Box::new(inside)),
                    start: offset,
                    end: close,
                }
            }
            _ => {
                return Err(ParseError::new(
                    format!("invalid expression `{}`", token.text),
                    offset,
                ))
            }
        };

        loop {
            let pos = node.end + 1;
            let Some(next) = self.get(pos) else { break };
            if next.kind != TokenKind::Punctuation {
                break;
            }
            let start = node.start;
            match next.text.as_str() {
                "." => {
                    let property = match self.get(pos + 1) {
                        Some(t) if t.kind == TokenKind::Identifier => ParseNode {
                            kind: NodeKind::Identifier {
                                name: t.text.clone(),
                            },
                            start: pos + 1,
                            end: pos + 1,
                        },
                        _ => {
                            return Err(ParseError::expected(
                                "a member name",
                                self.describe(pos + 1),
                                pos + 1,
                            ))
                        }
                    };
                    node = ParseNode {
                        kind: NodeKind::Member(Box::new(MemberExpr {
                            object: node,
                            property,
                        })),
                        start,
                        end: pos + 1,
                    };
                }
                "(" => {
                    let (args, close) = self.parse_list(pos + 1, ")")?;
                    node = ParseNode {
                        kind: NodeKind::Call(Box::new(CallExpr { callee: node, args })),
                        start,
                        end: close,
                    };
                }
                "[" => {
                    let index = self.parse_basic(pos + 1)?;
                    let close = index.end + 1;
                    self.expect_punct(close, "]")?;
                    node = ParseNode {
                        kind: NodeKind::Binary(Box::new(BinaryExpr {
                            op: "[".to_string(),
                            left: node,
                            right: index,
                        })),
                        start,
                        end: close,
                    };
                }
                "++" | "--" => {
                    node = ParseNode {
                        kind: NodeKind::Update(Box::new(UpdateExpr {
                            op: next.text.clone(),
                            prefix: false,
                            target: node,
                        })),
                        start,
                        end: pos,
                    };
                }
                op if is_basic_operator(op) => {
                    let right = self.parse_basic(pos + 1)?;
                    let end = right.end;
                    node = ParseNode {
                        kind: NodeKind::Binary(Box::new(BinaryExpr {
                            op: op.to_string(),
                            left: node,
                            right,
                        })),
                        start,
                        end,
                    };
                }
                _ => break,
            }
        }

        Ok(node)
    }

    /// Parse a comma-separated expression sequence up to the terminator.
    /// Returns the elements and the terminator's offset. Nested terminators
    /// are stepped over naturally because every element carries its span.
    fn parse_list(
        &self,
        offset: usize,
        end_text: &str,
    ) -> Result<(Vec<ParseNode>, usize), ParseError> {
        let mut elements = Vec::new();
        let mut pos = offset;
        if self.check_punct(pos, end_text) {
            return Ok((elements, pos));
        }
        loop {
            let element = self.parse_basic(pos)?;
            pos = element.end + 1;
            elements.push(element);
            if self.check_punct(pos, ",") {
                pos += 1;
            } else if self.check_punct(pos, end_text) {
                return Ok((elements, pos));
            } else {
                return Err(ParseError::expected(
                    &format!("'{}'", end_text),
                    self.describe(pos),
                    pos,
                ));
            }
        }
    }
}

fn is_basic_operator(op: &str) -> bool {
    matches!(
        op,
        "+" | "-"
            | "*"
            | "/"
            | "%"
            | "^"
            | "&"
            | "&&"
            | "=="
            | "<="
            | ">="
            | "|"
            | "||"
            | "<"
            | "<<"
            | ">"
            | ">>"
            | "["
    )
}

fn is_assignment_operator(op: &str) -> bool {
    matches!(
        op,
        "=" | "+=" | "-=" | "/=" | "*=" | "&=" | "|=" | "%=" | "^="
    )
}

/// A parser error with a friendly message and the offending token offset.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub token: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn new(message: impl Into<String>, token: usize) -> Self {
        Self {
            message: message.into(),
            token,
        }
    }

    fn expected(expected: &str, found: String, token: usize) -> Self {
        Self::new(format!("expected {}, found {}", expected, found), token)
    }
}
