// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end emission tests: lex, parse, and emit small programs.

use std::path::Path;

use crate::{compile, compile_from_file, CompileError, CompileTarget};

fn emit(source: &str, target: CompileTarget) -> Result<String, CompileError> {
    let root = hsl_parser::parse(hsl_lexer::lex(source))?;
    compile(&root, Path::new("."), target)
}

fn emit_ok(source: &str, target: CompileTarget) -> String {
    emit(source, target).expect("source should compile")
}

#[test]
fn builtin_rewrite_on_vulkan() {
    let out = emit_ok(
        "void main() { hl_OutPosition = vec4(0.0, 0.0, 0.0, 1.0); }",
        CompileTarget::VulkanGlsl,
    );
    assert!(
        out.contains("gl_Position = vec4(0.0, 0.0, 0.0, 1.0);"),
        "got:\n{}",
        out
    );
    // The predefinitions block leads every GLSL output.
    assert!(out.starts_with("float saturate(float val)"), "got:\n{}", out);
}

#[test]
fn builtin_rewrite_diverges_on_opengl() {
    let source = "void main() { hl_OutPosition = vec4(hl_VertexId, hl_InstanceIndex, 0, 1); }";
    let opengl = emit_ok(source, CompileTarget::OpenGlsl);
    assert!(opengl.contains("gl_VertexID"), "got:\n{}", opengl);
    assert!(
        opengl.contains("(gl_BaseInstance + gl_InstanceID)"),
        "got:\n{}",
        opengl
    );
    let vulkan = emit_ok(source, CompileTarget::VulkanGlsl);
    assert!(vulkan.contains("gl_VertexIndex"), "got:\n{}", vulkan);
    assert!(vulkan.contains("gl_InstanceIndex"), "got:\n{}", vulkan);
}

#[test]
fn buffer_lowering_on_vulkan() {
    let out = emit_ok(
        "struct Camera { mat4 view; };\n\
         buffer<Camera,0> cam;\n\
         void main() { hl_OutPosition = cam.view * vec4(0,0,0,1); }",
        CompileTarget::VulkanGlsl,
    );
    assert!(
        out.contains("layout(set=0, binding=0) buffer BUFFER0{ Camera data[]; } cam;"),
        "got:\n{}",
        out
    );
    assert!(
        out.contains("gl_Position = cam.data[0].view * vec4(0, 0, 0, 1);"),
        "got:\n{}",
        out
    );
}

#[test]
fn buffer_lowering_on_opengl_has_no_set() {
    let out = emit_ok(
        "struct Camera { mat4 view; };\nbuffer<Camera,2> cam;",
        CompileTarget::OpenGlsl,
    );
    assert!(
        out.contains("layout(binding=2) buffer BUFFER0{ Camera data[]; } cam;"),
        "got:\n{}",
        out
    );
}

#[test]
fn buffer_storage_follows_qualifiers() {
    let source = "struct Light { vec4 color; };\nconst uniform buffer<Light,1> lights;";
    let out = emit_ok(source, CompileTarget::VulkanGlsl);
    assert!(
        out.contains("layout(set=0, binding=1) readonly uniform BUFFER0{ Light data[]; } lights;"),
        "got:\n{}",
        out
    );
}

#[test]
fn buffer_counter_is_monotonic() {
    let out = emit_ok(
        "struct A { int x; };\nstruct B { int y; };\n\
         buffer<A,0> a;\nbuffer<B,1> b;",
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("BUFFER0{ A data[]; } a;"), "got:\n{}", out);
    assert!(out.contains("BUFFER1{ B data[]; } b;"), "got:\n{}", out);
}

#[test]
fn buffer_access_desugar() {
    let prelude = "struct State { float t; };\nbuffer<State,0> buf;\n";

    // Plain assignment reads element zero.
    let out = emit_ok(
        &format!("{}void main() {{ buf = 0; }}", prelude),
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("buf[0] = 0;"), "got:\n{}", out);

    // Member access goes through the data array.
    let out = emit_ok(
        &format!("{}void main() {{ buf.t = 1.0; }}", prelude),
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("buf.data[0].t = 1.0;"), "got:\n{}", out);

    // Explicit indexing is left untouched.
    let out = emit_ok(
        &format!("{}void main() {{ float x = buf[2]; }}", prelude),
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("float x = buf[2];"), "got:\n{}", out);

    // Binary uses read element zero.
    let out = emit_ok(
        &format!("{}void main() {{ float x = buf + 1; }}", prelude),
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("float x = buf[0] + 1;"), "got:\n{}", out);
}

#[test]
fn texture_sampling_on_opengl() {
    let out = emit_ok(
        "tex2d<0> tex; in vec2 uv; out vec4 color; void main() { color = subpassRead(tex, uv); }",
        CompileTarget::OpenGlsl,
    );
    assert!(
        out.contains("layout(binding=0) uniform sampler2D tex;"),
        "got:\n{}",
        out
    );
    assert!(out.contains("layout(location=0) in vec2 uv;"), "got:\n{}", out);
    assert!(
        out.contains("layout(location=0) out vec4 color;"),
        "got:\n{}",
        out
    );
    assert!(out.contains("color = texture(tex, uv);"), "got:\n{}", out);
}

#[test]
fn subpass_read_drops_coordinate_on_vulkan() {
    let out = emit_ok(
        "subpassTex<0, 0> attachment; in vec2 uv; out vec4 color;\n\
         void main() { color = subpassRead(attachment, uv); }",
        CompileTarget::VulkanGlsl,
    );
    assert!(
        out.contains(
            "layout(set=0, input_attachment_index=0, binding=0) uniform subpassInput attachment;"
        ),
        "got:\n{}",
        out
    );
    assert!(out.contains("color = subpassLoad(attachment);"), "got:\n{}", out);
}

#[test]
fn subpass_texture_reduces_to_sampler_on_opengl() {
    let out = emit_ok("subpassTex<3, 1> attachment;", CompileTarget::OpenGlsl);
    assert!(
        out.contains("layout(binding=3) uniform sampler2D attachment;"),
        "got:\n{}",
        out
    );
}

#[test]
fn location_counters_increase_in_declaration_order() {
    let out = emit_ok(
        "in vec3 position; in vec2 uv; out vec4 color; out vec3 normal;",
        CompileTarget::VulkanGlsl,
    );
    assert!(
        out.contains("layout(location=0) in vec3 position;"),
        "got:\n{}",
        out
    );
    assert!(out.contains("layout(location=1) in vec2 uv;"), "got:\n{}", out);
    assert!(
        out.contains("layout(location=0) out vec4 color;"),
        "got:\n{}",
        out
    );
    assert!(
        out.contains("layout(location=1) out vec3 normal;"),
        "got:\n{}",
        out
    );
}

#[test]
fn integer_inputs_are_forced_flat() {
    let out = emit_ok("in int index;", CompileTarget::VulkanGlsl);
    assert!(
        out.contains("layout(location=0) flat in int index;"),
        "got:\n{}",
        out
    );
    // Floating-point inputs interpolate normally.
    let out = emit_ok("in float t;", CompileTarget::VulkanGlsl);
    assert!(out.contains("layout(location=0) in float t;"), "got:\n{}", out);
}

#[test]
fn include_expansion_shares_state() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("b.hsl"), "void f() { }\n").expect("write b.hsl");
    std::fs::write(
        dir.path().join("a.hsl"),
        "#include \"b.hsl\"\nvoid main() { f(); }\n",
    )
    .expect("write a.hsl");

    let out = compile_from_file(&dir.path().join("a.hsl"), CompileTarget::OpenGlsl)
        .expect("include should compile");
    assert!(out.contains("// BEGIN INCLUDE (b.hsl)"), "got:\n{}", out);
    assert!(out.contains("// END INCLUDE (b.hsl)"), "got:\n{}", out);
    assert!(out.contains("void f()"), "got:\n{}", out);
    assert!(out.contains("f();"), "got:\n{}", out);

    // The include's declarations landed in the shared global scope, so
    // redefining f afterwards is rejected.
    std::fs::write(
        dir.path().join("c.hsl"),
        "#include \"b.hsl\"\nvoid f() { }\n",
    )
    .expect("write c.hsl");
    let error = compile_from_file(&dir.path().join("c.hsl"), CompileTarget::OpenGlsl)
        .expect_err("redefinition across include should fail");
    assert!(
        error.to_string().contains("already defined"),
        "got: {}",
        error
    );
}

#[test]
fn include_binding_slots_stay_monotonic() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("shared.hsl"),
        "struct A { int x; };\nbuffer<A,0> a;\n",
    )
    .expect("write shared.hsl");
    std::fs::write(
        dir.path().join("main.hsl"),
        "#include \"shared.hsl\"\nstruct B { int y; };\nbuffer<B,1> b;\n",
    )
    .expect("write main.hsl");

    let out = compile_from_file(&dir.path().join("main.hsl"), CompileTarget::VulkanGlsl)
        .expect("should compile");
    assert!(out.contains("BUFFER0{ A data[]; } a;"), "got:\n{}", out);
    assert!(out.contains("BUFFER1{ B data[]; } b;"), "got:\n{}", out);
}

#[test]
fn missing_include_is_an_io_error() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("a.hsl"), "#include \"nope.hsl\"\n").expect("write a.hsl");
    let error = compile_from_file(&dir.path().join("a.hsl"), CompileTarget::OpenGlsl)
        .expect_err("missing include should fail");
    assert!(matches!(error, CompileError::Io { .. }), "got: {}", error);
}

#[test]
fn other_directives_pass_through_without_semicolon() {
    let out = emit_ok("#version 450\nvoid main() { }", CompileTarget::VulkanGlsl);
    assert!(out.contains("#version 450\n"), "got:\n{}", out);
    assert!(!out.contains("#version 450;"), "got:\n{}", out);
}

#[test]
fn duplicate_name_in_scope_is_rejected() {
    let error = emit(
        "void main() { int x; int x; }",
        CompileTarget::VulkanGlsl,
    )
    .expect_err("duplicate should fail");
    assert!(
        error.to_string().contains("already defined"),
        "got: {}",
        error
    );
}

#[test]
fn shadowing_in_inner_scope_is_allowed() {
    let out = emit_ok(
        "int x = 1;\nvoid main() { int x = 2; }",
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("int x = 1;"), "got:\n{}", out);
    assert!(out.contains("    int x = 2;"), "got:\n{}", out);
}

#[test]
fn predeclared_builtins_cannot_be_redefined() {
    let error = emit("int hl_OutPosition;", CompileTarget::VulkanGlsl)
        .expect_err("builtin redefinition should fail");
    assert!(
        error.to_string().contains("already defined"),
        "got: {}",
        error
    );
}

#[test]
fn saturate_is_always_available() {
    let out = emit_ok(
        "in vec4 color; out vec4 final;\nvoid main() { final = saturate(color); }",
        CompileTarget::OpenGlsl,
    );
    for overload in ["float saturate(float", "vec2 saturate(vec2", "vec3 saturate(vec3", "vec4 saturate(vec4"] {
        assert!(out.contains(overload), "missing `{}` in:\n{}", overload, out);
    }
    assert!(out.contains("final = saturate(color);"), "got:\n{}", out);
}

#[test]
fn resource_declarations_rejected_in_inner_scope() {
    let error = emit(
        "struct A { int x; };\nvoid main() { buffer<A,0> b; }",
        CompileTarget::VulkanGlsl,
    )
    .expect_err("inner-scope buffer should fail");
    assert!(
        error.to_string().contains("outermost scope"),
        "got: {}",
        error
    );

    let error = emit("void main() { tex2d<0> t; }", CompileTarget::VulkanGlsl)
        .expect_err("inner-scope texture should fail");
    assert!(
        error.to_string().contains("outermost scope"),
        "got: {}",
        error
    );
}

#[test]
fn buffer_requires_declared_struct() {
    let error = emit("buffer<Missing,0> b;", CompileTarget::VulkanGlsl)
        .expect_err("unknown struct should fail");
    assert!(
        error.to_string().contains("undeclared struct"),
        "got: {}",
        error
    );
}

#[test]
fn bad_template_argument_shapes_are_rejected() {
    let error = emit("struct A { int x; };\nbuffer<A> b;", CompileTarget::VulkanGlsl)
        .expect_err("one-arg buffer should fail");
    assert!(
        error.to_string().contains("template arguments"),
        "got: {}",
        error
    );

    let error = emit("tex2d<0, 1> t;", CompileTarget::VulkanGlsl)
        .expect_err("two-arg texture should fail");
    assert!(
        error.to_string().contains("template arguments"),
        "got: {}",
        error
    );
}

#[test]
fn conflicting_qualifiers_are_rejected() {
    let error = emit("in out vec2 uv;", CompileTarget::VulkanGlsl)
        .expect_err("in+out should fail");
    assert!(
        error.to_string().contains("cannot be combined"),
        "got: {}",
        error
    );
}

#[test]
fn control_flow_and_indentation() {
    let out = emit_ok(
        "void main() { for (int i = 0; i < 4; i++) { if (i > 1) { f(i); } } }",
        CompileTarget::VulkanGlsl,
    );
    assert!(out.contains("    for (int i = 0; i < 4; i++)\n"), "got:\n{}", out);
    // Nested bodies indent four spaces per level.
    assert!(out.contains("        if (i > 1)\n"), "got:\n{}", out);
    assert!(out.contains("            f(i);\n"), "got:\n{}", out);
}

#[test]
fn hlsl_translates_types_in_signatures_and_casts() {
    let out = emit_ok(
        "vec3 scale(vec3 v, float s) { return v * vec3(s, s, s); }",
        CompileTarget::Hlsl,
    );
    assert!(out.contains("float3 scale(float3 v, float s)"), "got:\n{}", out);
    assert!(out.contains("return v * float3(s, s, s);"), "got:\n{}", out);
    // No GLSL predefinitions on HLSL.
    assert!(!out.contains("saturate(float val)"), "got:\n{}", out);
}

#[test]
fn hlsl_rejects_layout_bound_declarations_and_builtins() {
    let error = emit(
        "struct A { int x; };\nbuffer<A,0> a;",
        CompileTarget::Hlsl,
    )
    .expect_err("HLSL buffer declaration should fail");
    assert!(matches!(error, CompileError::Target(_)), "got: {}", error);

    let error = emit("void main() { hl_OutPosition = vec4(0, 0, 0, 1); }", CompileTarget::Hlsl)
        .expect_err("HLSL builtin should fail");
    assert!(matches!(error, CompileError::Target(_)), "got: {}", error);
}

#[test]
fn metal_always_fails() {
    let error = emit("void main() { }", CompileTarget::Metal).expect_err("metal is reserved");
    assert!(
        error.to_string().contains("not supported"),
        "got: {}",
        error
    );
}

#[test]
fn plain_declarations_round_trip_through_the_lexer() {
    let source = "int x = 1;\nfloat y = 2.5;\nvoid main() { y = x + y; }";
    let out = emit_ok(source, CompileTarget::OpenGlsl);
    let relexed = hsl_lexer::lex(&out);
    // The emitted text must itself lex cleanly and contain the original
    // declarations verbatim.
    assert!(!relexed.is_empty());
    assert!(out.contains("int x = 1;"), "got:\n{}", out);
    assert!(out.contains("float y = 2.5;"), "got:\n{}", out);
    assert!(out.contains("y = x + y;"), "got:\n{}", out);
}
