// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The tree-walking emitter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hsl_ast::node::{
    AssignmentExpr, BinaryExpr, Block, CallExpr, CastExpr, FnDecl, ForStmt, MemberExpr, NodeKind,
    ParseNode, StructDecl, VarDecl,
};

use crate::error::{CompileError, SemanticError, TargetError};
use crate::types::{
    remap_identifier, resolve_type, GLSL_PREDEFINITIONS, PREDECLARED_FUNCTIONS,
    PREDECLARED_IDENTIFIERS,
};
use crate::CompileTarget;

const TAB: &str = "    ";

/// Names declared inside one lexical block, bucketed by declaration kind.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub variables: HashSet<String>,
    pub functions: HashSet<String>,
    pub structs: HashSet<String>,
    pub buffers: HashSet<String>,
}

#[derive(Debug, Clone, Copy)]
enum DeclKind {
    Variable,
    Function,
    Struct,
    Buffer,
}

/// Session-wide emitter state.
///
/// Shared by mutable reference through include expansion so binding and
/// location counters stay globally monotonic and declarations made inside an
/// include remain visible to the includer.
#[derive(Debug, Clone)]
pub struct CompileState {
    pub tab_depth: usize,
    pub buffer_counter: usize,
    pub in_location: usize,
    pub out_location: usize,
    pub include_base: PathBuf,
    pub scopes: Vec<Scope>,
}

impl CompileState {
    pub fn new(include_base: impl Into<PathBuf>) -> Self {
        Self {
            tab_depth: 0,
            buffer_counter: 0,
            in_location: 0,
            out_location: 0,
            include_base: include_base.into(),
            scopes: Vec::new(),
        }
    }
}

/// Serializes a parse tree into dialect text for one [`CompileTarget`].
pub struct Emitter<'a> {
    target: CompileTarget,
    state: &'a mut CompileState,
}

impl<'a> Emitter<'a> {
    pub fn new(target: CompileTarget, state: &'a mut CompileState) -> Self {
        Self { target, state }
    }

    pub fn emit(&mut self, root: &ParseNode) -> Result<String, CompileError> {
        self.emit_node(root)
    }

    fn emit_node(&mut self, node: &ParseNode) -> Result<String, CompileError> {
        match &node.kind {
            NodeKind::Block(block) => self.emit_block(block),
            NodeKind::Literal { value } => Ok(value.clone()),
            NodeKind::Identifier { name } => {
                Ok(remap_identifier(name, self.target)?.to_string())
            }
            NodeKind::Binary(expr) => self.emit_binary(expr),
            NodeKind::Member(expr) => self.emit_member(expr),
            NodeKind::Paren(inside) => Ok(format!("({})", self.emit_node(inside)?)),
            NodeKind::Assignment(expr) => self.emit_assignment(expr),
            NodeKind::Update(expr) => {
                let target = self.emit_node(&expr.target)?;
                Ok(if expr.prefix {
                    format!("{}{}", expr.op, target)
                } else {
                    format!("{}{}", target, expr.op)
                })
            }
            NodeKind::Call(expr) => self.emit_call(expr),
            NodeKind::Cast(expr) => self.emit_cast(expr),
            NodeKind::List { elements } => {
                let elements = self.emit_all(elements)?;
                Ok(format!("{{{}}}", elements.join(", ")))
            }
            NodeKind::Preprocessor { directive, body } => {
                self.emit_preprocessor(directive, body)
            }
            NodeKind::Var(decl) => self.emit_var_decl(decl),
            NodeKind::Function(decl) => self.emit_fn_decl(decl),
            NodeKind::Struct(decl) => self.emit_struct_decl(decl),
            NodeKind::For(stmt) => self.emit_for(stmt),
            NodeKind::If(stmt) => Ok(format!(
                "if {}\n{}",
                self.emit_condition(&stmt.condition)?,
                self.emit_node(&stmt.body)?
            )),
            NodeKind::ElseIf(stmt) => Ok(format!(
                "else if {}\n{}",
                self.emit_condition(&stmt.condition)?,
                self.emit_node(&stmt.body)?
            )),
            NodeKind::Else(stmt) => Ok(format!("else\n{}", self.emit_node(&stmt.body)?)),
            // TODO: lower while loops once a dialect-neutral form is settled
            NodeKind::While(_) => Ok(String::new()),
            NodeKind::Return(stmt) => match &stmt.value {
                Some(value) => Ok(format!("return {}", self.emit_node(value)?)),
                None => Ok("return".to_string()),
            },
        }
    }

    fn emit_all(&mut self, nodes: &[ParseNode]) -> Result<Vec<String>, CompileError> {
        nodes.iter().map(|node| self.emit_node(node)).collect()
    }

    // =========================================================================
    // Blocks and Scopes
    // =========================================================================

    fn emit_block(&mut self, block: &Block) -> Result<String, CompileError> {
        let indent = TAB.repeat(self.state.tab_depth);
        let mut out = indent.clone();

        // One scope frame per scoped block, plus a global frame created the
        // first time any block is emitted. Include roots are unscoped and the
        // stack is already populated, so they share the includer's globals.
        let pushed = block.scoped || self.state.scopes.is_empty();
        let first = self.state.scopes.is_empty();
        if pushed {
            self.state.scopes.push(Scope::default());
        }

        if block.scoped {
            self.state.tab_depth += 1;
            out.push_str("{\n");
        }

        if first {
            out.push_str(&self.emit_predefinitions());
        }

        let body_indent = TAB.repeat(self.state.tab_depth);
        for node in &block.body {
            out.push_str(&body_indent);
            out.push_str(&self.emit_node(node)?);
            // Preprocessor output must not receive a statement terminator.
            if matches!(node.kind, NodeKind::Preprocessor { .. }) {
                out.push('\n');
            } else {
                out.push_str(";\n");
            }
        }

        if block.scoped {
            self.state.tab_depth -= 1;
            out.push_str(&indent);
            out.push('}');
        }

        if pushed {
            self.state.scopes.pop();
        }

        Ok(out)
    }

    /// Runs once, when the global scope is created: registers the built-in
    /// identifiers and functions and returns the GLSL helper text.
    fn emit_predefinitions(&mut self) -> String {
        let scope = &mut self.state.scopes[0];
        for name in PREDECLARED_IDENTIFIERS {
            scope.variables.insert((*name).to_string());
        }
        for name in PREDECLARED_FUNCTIONS {
            scope.functions.insert((*name).to_string());
        }
        if self.target.is_glsl() {
            GLSL_PREDEFINITIONS.to_string()
        } else {
            String::new()
        }
    }

    /// Register a declaration in the innermost scope, rejecting duplicates
    /// within the same bucket.
    fn declare(&mut self, name: &str, kind: DeclKind) -> Result<(), SemanticError> {
        let Some(scope) = self.state.scopes.last_mut() else {
            return Ok(());
        };
        let bucket = match kind {
            DeclKind::Variable => &mut scope.variables,
            DeclKind::Function => &mut scope.functions,
            DeclKind::Struct => &mut scope.structs,
            DeclKind::Buffer => &mut scope.buffers,
        };
        if !bucket.insert(name.to_string()) {
            return Err(SemanticError::AlreadyDefined(name.to_string()));
        }
        Ok(())
    }

    /// The name of `node` when it is a bare identifier naming a declared
    /// buffer; buffer reads and writes are rewritten around it.
    fn buffer_name(&self, node: &ParseNode) -> Option<String> {
        let NodeKind::Identifier { name } = &node.kind else {
            return None;
        };
        self.state
            .scopes
            .first()
            .filter(|scope| scope.buffers.contains(name))
            .map(|_| name.clone())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn emit_binary(&mut self, expr: &BinaryExpr) -> Result<String, CompileError> {
        if expr.op == "[" {
            let left = self.emit_node(&expr.left)?;
            let right = self.emit_node(&expr.right)?;
            return Ok(format!("{}[{}]", left, right));
        }
        // A bare buffer name outside an index reads element zero.
        let left = match self.buffer_name(&expr.left) {
            Some(name) => format!("{}[0]", name),
            None => self.emit_node(&expr.left)?,
        };
        let right = self.emit_node(&expr.right)?;
        Ok(format!("{} {} {}", left, expr.op, right))
    }

    fn emit_member(&mut self, expr: &MemberExpr) -> Result<String, CompileError> {
        // Member access on a buffer goes through its data array.
        let object = match self.buffer_name(&expr.object) {
            Some(name) => format!("{}.data[0]", name),
            None => self.emit_node(&expr.object)?,
        };
        let property = self.emit_node(&expr.property)?;
        Ok(format!("{}.{}", object, property))
    }

    fn emit_assignment(&mut self, expr: &AssignmentExpr) -> Result<String, CompileError> {
        let left = match self.buffer_name(&expr.left) {
            Some(name) => format!("{}[0]", name),
            None => self.emit_node(&expr.left)?,
        };
        let right = self.emit_node(&expr.right)?;
        Ok(format!("{} {} {}", left, expr.op, right))
    }

    fn emit_call(&mut self, expr: &CallExpr) -> Result<String, CompileError> {
        let args = self.emit_all(&expr.args)?;
        if let NodeKind::Identifier { name } = &expr.callee.kind {
            if name == "subpassRead" {
                return self.emit_subpass_read(&args);
            }
        }
        let callee = self.emit_node(&expr.callee)?;
        Ok(format!("{}({})", callee, args.join(", ")))
    }

    /// `subpassRead(tex, uv)` samples an attachment: plain texturing on
    /// OpenGL, a subpass load (which takes no coordinate) on Vulkan.
    fn emit_subpass_read(&self, args: &[String]) -> Result<String, CompileError> {
        match self.target {
            CompileTarget::OpenGlsl => Ok(format!("texture({})", args.join(", "))),
            CompileTarget::VulkanGlsl => {
                Ok(format!("subpassLoad({})", args.first().cloned().unwrap_or_default()))
            }
            target => Err(TargetError::UnsupportedBuiltin {
                name: "subpassRead".to_string(),
                target,
            }
            .into()),
        }
    }

    fn emit_cast(&mut self, expr: &CastExpr) -> Result<String, CompileError> {
        let ty = resolve_type(&expr.ty, false, self.target)?;
        let args = self.emit_all(&expr.args)?;
        Ok(format!("{}({})", ty, args.join(", ")))
    }

    fn emit_condition(&mut self, condition: &ParseNode) -> Result<String, CompileError> {
        let text = self.emit_node(condition)?;
        // Conditions written with parentheses already carry them.
        if matches!(condition.kind, NodeKind::Paren(_)) {
            Ok(text)
        } else {
            Ok(format!("({})", text))
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn emit_var_decl(&mut self, decl: &VarDecl) -> Result<String, CompileError> {
        match decl.ty.as_str() {
            "buffer" => self.emit_buffer_decl(decl),
            "tex2d" | "texCube" => self.emit_texture_decl(decl),
            "subpassTex" => self.emit_subpass_decl(decl),
            _ => self.emit_plain_var_decl(decl),
        }
    }

    /// Resource declarations only make sense in the pipeline interface:
    /// outermost scope, no interpolation qualifiers.
    fn check_resource_placement(&self, decl: &VarDecl) -> Result<(), CompileError> {
        if self.state.scopes.len() > 1 {
            return Err(SemanticError::NotAtOutermostScope(decl.ty.clone()).into());
        }
        if decl.quals.input || decl.quals.output {
            return Err(SemanticError::QualifierOnResource {
                qualifier: if decl.quals.input { "in" } else { "out" },
                ty: decl.ty.clone(),
            }
            .into());
        }
        if decl.quals.flat {
            return Err(SemanticError::QualifierOnResource {
                qualifier: "flat",
                ty: decl.ty.clone(),
            }
            .into());
        }
        if self.target == CompileTarget::Hlsl {
            return Err(TargetError::UnsupportedDeclaration {
                what: "layout-bound resource",
                target: self.target,
            }
            .into());
        }
        Ok(())
    }

    /// `buffer<S, N> name;` lowers to a GLSL storage block:
    /// `layout(binding=N) buffer BUFFERk { S data[]; } name;`
    fn emit_buffer_decl(&mut self, decl: &VarDecl) -> Result<String, CompileError> {
        self.check_resource_placement(decl)?;

        let bad_args = || SemanticError::BadTemplateArguments {
            ty: decl.ty.clone(),
            expected: "<struct, binding>",
        };
        let [struct_arg, binding_arg] = &decl.template_args[..] else {
            return Err(bad_args().into());
        };
        let NodeKind::Identifier { name: struct_name } = &struct_arg.kind else {
            return Err(bad_args().into());
        };
        let NodeKind::Literal { value: binding } = &binding_arg.kind else {
            return Err(bad_args().into());
        };
        let struct_declared = self
            .state
            .scopes
            .first()
            .is_some_and(|scope| scope.structs.contains(struct_name));
        if !struct_declared {
            return Err(SemanticError::UndeclaredStruct(struct_name.clone()).into());
        }

        let index = self.state.buffer_counter;
        self.state.buffer_counter += 1;
        self.declare(&decl.name, DeclKind::Buffer)?;

        let readonly = if decl.quals.is_const { "readonly " } else { "" };
        let storage = resolve_type(&decl.ty, decl.quals.uniform, self.target)?;
        let set = if self.target == CompileTarget::VulkanGlsl {
            "set=0, "
        } else {
            ""
        };
        Ok(format!(
            "layout({}binding={}) {}{} BUFFER{}{{ {} data[]; }} {}",
            set, binding, readonly, storage, index, struct_name, decl.name
        ))
    }

    /// `tex2d<N> name;` and `texCube<N> name;` bind a sampler slot.
    fn emit_texture_decl(&mut self, decl: &VarDecl) -> Result<String, CompileError> {
        self.check_resource_placement(decl)?;

        let [binding_arg] = &decl.template_args[..] else {
            return Err(SemanticError::BadTemplateArguments {
                ty: decl.ty.clone(),
                expected: "<binding>",
            }
            .into());
        };
        let NodeKind::Literal { value: binding } = &binding_arg.kind else {
            return Err(SemanticError::BadTemplateArguments {
                ty: decl.ty.clone(),
                expected: "<binding>",
            }
            .into());
        };

        self.declare(&decl.name, DeclKind::Variable)?;
        let sampler = resolve_type(&decl.ty, true, self.target)?;
        let set = if self.target == CompileTarget::VulkanGlsl {
            "set=0, "
        } else {
            ""
        };
        Ok(format!(
            "layout({}binding={}) {} {}",
            set, binding, sampler, decl.name
        ))
    }

    /// `subpassTex<B, I> name;` is a Vulkan input attachment; OpenGL reduces
    /// it to an ordinary bound texture.
    fn emit_subpass_decl(&mut self, decl: &VarDecl) -> Result<String, CompileError> {
        self.check_resource_placement(decl)?;

        let bad_args = || SemanticError::BadTemplateArguments {
            ty: decl.ty.clone(),
            expected: "<binding, input_attachment_index>",
        };
        let [binding_arg, input_arg] = &decl.template_args[..] else {
            return Err(bad_args().into());
        };
        let (NodeKind::Literal { value: binding }, NodeKind::Literal { value: input }) =
            (&binding_arg.kind, &input_arg.kind)
        else {
            return Err(bad_args().into());
        };

        self.declare(&decl.name, DeclKind::Variable)?;
        let sampler = resolve_type(&decl.ty, true, self.target)?;
        match self.target {
            CompileTarget::VulkanGlsl => Ok(format!(
                "layout(set=0, input_attachment_index={}, binding={}) {} {}",
                input, binding, sampler, decl.name
            )),
            _ => Ok(format!(
                "layout(binding={}) {} {}",
                binding, sampler, decl.name
            )),
        }
    }

    fn emit_plain_var_decl(&mut self, decl: &VarDecl) -> Result<String, CompileError> {
        let quals = decl.quals;
        if quals.input && quals.output {
            return Err(SemanticError::ConflictingQualifiers.into());
        }
        if !decl.template_args.is_empty() {
            return Err(SemanticError::BadTemplateArguments {
                ty: decl.ty.clone(),
                expected: "none",
            }
            .into());
        }

        let mut out = String::new();
        if quals.input || quals.output {
            if self.state.scopes.len() > 1 {
                return Err(SemanticError::NotAtOutermostScope(
                    if quals.input { "in" } else { "out" }.to_string(),
                )
                .into());
            }
            if !self.target.is_glsl() {
                return Err(TargetError::UnsupportedDeclaration {
                    what: "stage interface",
                    target: self.target,
                }
                .into());
            }
            // Integer inputs are never interpolated.
            let flat =
                quals.flat || (quals.input && matches!(decl.ty.as_str(), "int" | "uint"));
            let location = if quals.input {
                &mut self.state.in_location
            } else {
                &mut self.state.out_location
            };
            let slot = *location;
            *location += 1;
            out.push_str(&format!("layout(location={}) ", slot));
            if flat {
                out.push_str("flat ");
            }
            out.push_str(if quals.input { "in " } else { "out " });
        }
        if quals.is_const {
            out.push_str("const ");
        }

        out.push_str(&resolve_type(&decl.ty, quals.uniform, self.target)?);
        out.push(' ');
        out.push_str(&decl.name);
        if decl.array_count > 0 {
            out.push_str(&format!("[{}]", decl.array_count));
        }
        if let Some(init) = &decl.init {
            let value = self.emit_node(init)?;
            out.push_str(" = ");
            out.push_str(&value);
        }

        self.declare(&decl.name, DeclKind::Variable)?;
        Ok(out)
    }

    fn emit_fn_decl(&mut self, decl: &FnDecl) -> Result<String, CompileError> {
        self.declare(&decl.name, DeclKind::Function)?;

        let mut out = String::new();
        if decl.is_const {
            out.push_str("const ");
        }
        out.push_str(&resolve_type(&decl.return_type, false, self.target)?);
        out.push(' ');
        out.push_str(&decl.name);
        out.push('(');
        for (i, param) in decl.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&resolve_type(&param.ty, false, self.target)?);
            out.push(' ');
            out.push_str(&param.name);
        }
        out.push_str(")\n");
        out.push_str(&self.emit_node(&decl.body)?);
        Ok(out)
    }

    fn emit_struct_decl(&mut self, decl: &StructDecl) -> Result<String, CompileError> {
        self.declare(&decl.name, DeclKind::Struct)?;
        Ok(format!(
            "struct {}\n{}",
            decl.name,
            self.emit_node(&decl.body)?
        ))
    }

    fn emit_for(&mut self, stmt: &ForStmt) -> Result<String, CompileError> {
        let init = self.emit_node(&stmt.init)?;
        let test = self.emit_node(&stmt.test)?;
        let update = self.emit_node(&stmt.update)?;
        let body = self.emit_node(&stmt.body)?;
        Ok(format!("for ({}; {}; {})\n{}", init, test, update, body))
    }

    // =========================================================================
    // Preprocessor
    // =========================================================================

    fn emit_preprocessor(&mut self, directive: &str, body: &str) -> Result<String, CompileError> {
        if directive == "include" {
            return self.emit_include(body);
        }
        // Unknown directives pass through untouched.
        Ok(format!("#{} {}", directive, body))
    }

    /// Compile the included file inline with the current state, so its
    /// declarations and binding slots stay visible to the includer.
    fn emit_include(&mut self, body: &str) -> Result<String, CompileError> {
        let relative = body
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\''))
            .to_string();
        let path = self.state.include_base.join(&relative);
        let source = std::fs::read_to_string(&path).map_err(|source| CompileError::Io {
            path: path.clone(),
            source,
        })?;

        // Nested includes resolve against the included file's directory.
        let saved_base = std::mem::replace(
            &mut self.state.include_base,
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        );
        let result = hsl_parser::parse(hsl_lexer::lex(&source))
            .map_err(CompileError::from)
            .and_then(|root| self.emit_node(&root));
        self.state.include_base = saved_base;
        let text = result?;

        let rule = "#".repeat(50);
        Ok(format!(
            "// BEGIN INCLUDE ({relative})\n// {rule}\n{text}// {rule}\n// END INCLUDE ({relative})"
        ))
    }
}
