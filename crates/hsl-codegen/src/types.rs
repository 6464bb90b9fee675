// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Target dialect tables: type spellings, built-in renames, predefinitions.

use crate::error::TargetError;
use crate::CompileTarget;

/// Helper overloads emitted once at the top of every GLSL output, so
/// `saturate` works without any user declaration.
pub(crate) const GLSL_PREDEFINITIONS: &str = "\
float saturate(float val) { return clamp(val, 0.0, 1.0); }
vec2 saturate(vec2 val) { return clamp(val, vec2(0.0), vec2(1.0)); }
vec3 saturate(vec3 val) { return clamp(val, vec3(0.0), vec3(1.0)); }
vec4 saturate(vec4 val) { return clamp(val, vec4(0.0), vec4(1.0)); }
";

/// Identifiers every program can use without declaring them.
pub(crate) const PREDECLARED_IDENTIFIERS: &[&str] = &[
    "hl_OutPosition",
    "hl_PixelPosition",
    "hl_VertexId",
    "hl_InstanceIndex",
];

/// Functions every program can call without declaring them.
pub(crate) const PREDECLARED_FUNCTIONS: &[&str] = &["saturate"];

/// Rename a built-in identifier for the target. Unlisted identifiers pass
/// through verbatim.
pub(crate) fn remap_identifier<'a>(
    name: &'a str,
    target: CompileTarget,
) -> Result<&'a str, TargetError> {
    use CompileTarget::{OpenGlsl, VulkanGlsl};

    Ok(match (name, target) {
        ("hl_OutPosition", OpenGlsl | VulkanGlsl) => "gl_Position",
        ("hl_PixelPosition", OpenGlsl | VulkanGlsl) => "gl_FragCoord",
        ("hl_VertexId", OpenGlsl) => "gl_VertexID",
        ("hl_VertexId", VulkanGlsl) => "gl_VertexIndex",
        ("hl_InstanceIndex", OpenGlsl) => "(gl_BaseInstance + gl_InstanceID)",
        ("hl_InstanceIndex", VulkanGlsl) => "gl_InstanceIndex",
        ("hl_OutPosition" | "hl_PixelPosition" | "hl_VertexId" | "hl_InstanceIndex", _) => {
            return Err(TargetError::UnsupportedBuiltin {
                name: name.to_string(),
                target,
            })
        }
        _ => name,
    })
}

/// Translate an HSL type name into its target spelling.
///
/// `is_uniform` switches buffer storage between `uniform` and `buffer`
/// (`ConstantBuffer` and `StructuredBuffer` on HLSL) and prefixes sampler
/// types with `uniform ` on GLSL targets.
pub(crate) fn resolve_type(
    ty: &str,
    is_uniform: bool,
    target: CompileTarget,
) -> Result<String, TargetError> {
    use CompileTarget::{Hlsl, OpenGlsl, VulkanGlsl};

    let unsupported = || TargetError::UnsupportedType {
        ty: ty.to_string(),
        target,
    };

    // Sized vector types keep their component count.
    for (prefix, hlsl_scalar) in [
        ("bvec", "bool"),
        ("ivec", "int"),
        ("uvec", "uint"),
        ("dvec", "double"),
        ("vec", "float"),
    ] {
        if let Some(n) = sized_component(ty, prefix) {
            return match target {
                OpenGlsl | VulkanGlsl => Ok(format!("{}{}", prefix, n)),
                Hlsl => Ok(format!("{}{}", hlsl_scalar, n)),
                _ => Err(unsupported()),
            };
        }
    }
    if let Some(n) = sized_component(ty, "mat") {
        return match target {
            OpenGlsl | VulkanGlsl => Ok(format!("mat{}", n)),
            Hlsl => Ok(format!("float{}x{}", n, n)),
            _ => Err(unsupported()),
        };
    }

    match (ty, target) {
        ("bool" | "int" | "uint" | "float" | "double" | "void", _) => Ok(ty.to_string()),
        ("tex2d", OpenGlsl | VulkanGlsl) => Ok(sampler(is_uniform, "sampler2D")),
        ("tex2d", Hlsl) => Ok("Texture2D".to_string()),
        ("texCube", OpenGlsl | VulkanGlsl) => Ok(sampler(is_uniform, "samplerCube")),
        // Subpass attachments only exist on Vulkan; OpenGL reads them as
        // plain textures.
        ("subpassTex", OpenGlsl) => Ok(sampler(is_uniform, "sampler2D")),
        ("subpassTex", VulkanGlsl) => Ok(sampler(is_uniform, "subpassInput")),
        ("buffer", OpenGlsl | VulkanGlsl) => {
            Ok(if is_uniform { "uniform" } else { "buffer" }.to_string())
        }
        ("buffer", Hlsl) => Ok(if is_uniform {
            "ConstantBuffer"
        } else {
            "StructuredBuffer"
        }
        .to_string()),
        _ => Err(unsupported()),
    }
}

fn sized_component<'a>(ty: &'a str, prefix: &str) -> Option<&'a str> {
    ty.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn sampler(is_uniform: bool, base: &str) -> String {
    if is_uniform {
        format!("uniform {}", base)
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompileTarget::{Hlsl, OpenGlsl, VulkanGlsl};

    #[test]
    fn vector_and_matrix_spellings() {
        assert_eq!(resolve_type("vec3", false, OpenGlsl).unwrap(), "vec3");
        assert_eq!(resolve_type("vec3", false, Hlsl).unwrap(), "float3");
        assert_eq!(resolve_type("ivec2", false, Hlsl).unwrap(), "int2");
        assert_eq!(resolve_type("mat4", false, VulkanGlsl).unwrap(), "mat4");
        assert_eq!(resolve_type("mat4", false, Hlsl).unwrap(), "float4x4");
    }

    #[test]
    fn sampler_spellings() {
        assert_eq!(
            resolve_type("tex2d", true, OpenGlsl).unwrap(),
            "uniform sampler2D"
        );
        assert_eq!(resolve_type("tex2d", false, Hlsl).unwrap(), "Texture2D");
        assert_eq!(
            resolve_type("subpassTex", true, VulkanGlsl).unwrap(),
            "uniform subpassInput"
        );
        assert_eq!(
            resolve_type("subpassTex", true, OpenGlsl).unwrap(),
            "uniform sampler2D"
        );
    }

    #[test]
    fn buffer_storage_keywords() {
        assert_eq!(resolve_type("buffer", false, VulkanGlsl).unwrap(), "buffer");
        assert_eq!(resolve_type("buffer", true, VulkanGlsl).unwrap(), "uniform");
        assert_eq!(
            resolve_type("buffer", true, Hlsl).unwrap(),
            "ConstantBuffer"
        );
        assert_eq!(
            resolve_type("buffer", false, Hlsl).unwrap(),
            "StructuredBuffer"
        );
    }

    #[test]
    fn unknown_type_is_fatal() {
        assert!(resolve_type("texCube", false, Hlsl).is_err());
        assert!(resolve_type("quaternion", false, OpenGlsl).is_err());
    }

    #[test]
    fn builtin_renames_diverge_per_target() {
        assert_eq!(
            remap_identifier("hl_VertexId", OpenGlsl).unwrap(),
            "gl_VertexID"
        );
        assert_eq!(
            remap_identifier("hl_VertexId", VulkanGlsl).unwrap(),
            "gl_VertexIndex"
        );
        assert_eq!(
            remap_identifier("hl_InstanceIndex", OpenGlsl).unwrap(),
            "(gl_BaseInstance + gl_InstanceID)"
        );
        assert_eq!(remap_identifier("color", VulkanGlsl).unwrap(), "color");
        assert!(remap_identifier("hl_OutPosition", Hlsl).is_err());
    }
}
