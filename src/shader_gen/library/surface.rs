//! Surface features: vertex-output structs, albedo and normal perturbation.

use std::sync::Arc;

use super::{FeatureLibrary, float_n, insert, names, sampler_name};
use crate::shader_gen::config::{AlbedoColor, SamplerFilter};
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::Dialect;
use crate::shader_gen::feature::Feature;
use crate::shader_gen::resource::ResourceBinding;
use crate::shader_gen::variable::{BaseType, Variable};
use crate::shader_gen::variant::{STAGE_STRUCTS, VertexDataFlags};

pub(super) fn register(library: &mut FeatureLibrary) {
    let d = library.dialect();

    for (stage, name) in STAGE_STRUCTS.iter().zip([
        names::STAGE_BASIC,
        names::STAGE_EXTENDED,
        names::STAGE_BLEND_SHAPES,
        names::STAGE_ANIMATIONS,
    ]) {
        library.insert(
            Feature::builder(name)
                .types_code(stage.declaration(d))
                .requires(stage.flag)
                .build(),
        );
    }

    library.insert(frame_uniforms(d));

    for &color in AlbedoColor::ALL {
        library.insert(albedo_color(d, color));
    }
    library.insert(albedo_vertex_color(d));

    let perturb = Arc::new(perturb_normal(d));
    let parallax_offset = Arc::new(parallax_offset(d));
    for &filter in SamplerFilter::ALL {
        library.insert(albedo_texture(d, filter));
        library.insert(normal_map(d, filter, &perturb));
        library.insert(parallax(d, filter, &parallax_offset));
    }

    library.insert(
        Feature::builder(names::BLEND_SHAPE_NORMAL)
            .input(vec3("normal", true))
            .input(vec3("blendNormal", false))
            .requires(VertexDataFlags::BLEND_SHAPES)
            .insert_code(insert(
                names::BLEND_SHAPE_NORMAL,
                "    {{normal}} = normalize({{normal}} + {{blendNormal}});\n".to_string(),
                &["normal", "blendNormal"],
            ))
            .build(),
    );
    library.insert(
        Feature::builder(names::SKINNED_NORMAL)
            .input(vec3("normal", true))
            .input(vec3("skinnedNormal", false))
            .requires(VertexDataFlags::ANIMATIONS)
            .insert_code(insert(
                names::SKINNED_NORMAL,
                "    {{normal}} = normalize({{skinnedNormal}});\n".to_string(),
                &["normal", "skinnedNormal"],
            ))
            .build(),
    );
}

pub(super) fn vec3(name: &'static str, is_mutable: bool) -> Variable {
    Variable::vector(name, BaseType::Float, 3, is_mutable).templated()
}

pub(super) fn vec4(name: &'static str, is_mutable: bool) -> Variable {
    Variable::vector(name, BaseType::Float, 4, is_mutable).templated()
}

fn vec2(name: &'static str, is_mutable: bool) -> Variable {
    Variable::vector(name, BaseType::Float, 2, is_mutable).templated()
}

/// Per-frame constants shared by ambient light, parallax and light sources.
fn frame_uniforms(d: Dialect) -> Feature {
    let (f2, f4) = (float_n(d, 2), float_n(d, 4));
    let code = format!(
        "struct FrameUniforms\n{{\n    {f4} cameraPosition;\n    {f4} ambientColor;\n    uint lightCount;\n    float parallaxScale;\n    {f2} padding;\n}};\n"
    );
    Feature::builder(names::FRAME_UNIFORMS)
        .types_code(CodeDeclaration::new("FrameUniforms", code))
        .resource(ResourceBinding::uniform("frame", "FrameUniforms"))
        .build()
}

fn albedo_color(d: Dialect, color: AlbedoColor) -> Feature {
    let name = names::albedo_color(color);
    let f4 = float_n(d, 4);
    let [r, g, b, a] = color.rgba();
    let code = format!("    {f4} {{{{albedo}}}} = {f4}({r}, {g}, {b}, {a});\n");
    Feature::builder(name.clone())
        .output(vec4("albedo", true))
        .insert_code(insert(&name, code, &["albedo"]))
        .build()
}

fn albedo_vertex_color(d: Dialect) -> Feature {
    let f4 = float_n(d, 4);
    Feature::builder(names::ALBEDO_VERTEX_COLOR)
        .input(vec4("vertexColor", false))
        .output(vec4("albedo", true))
        .insert_code(insert(
            names::ALBEDO_VERTEX_COLOR,
            format!("    {f4} {{{{albedo}}}} = {{{{vertexColor}}}};\n"),
            &["albedo", "vertexColor"],
        ))
        .build()
}

fn albedo_texture(d: Dialect, filter: SamplerFilter) -> Feature {
    let name = names::albedo_texture(filter);
    let sampler = sampler_name(filter);
    let f4 = float_n(d, 4);
    let code = format!(
        "    {f4} {{{{albedo}}}} = {};\n",
        d.sample("albedoTexture", &sampler, "{{uv}}")
    );
    Feature::builder(name.clone())
        .input(vec2("uv", false))
        .output(vec4("albedo", true))
        .resource(ResourceBinding::texture("albedoTexture"))
        .resource(ResourceBinding::sampler(sampler))
        .insert_code(insert(&name, code, &["albedo", "uv"]))
        .build()
}

fn perturb_normal(d: Dialect) -> CodeDeclaration {
    let (f3, f4) = (float_n(d, 3), float_n(d, 4));
    let code = format!(
        "{f3} PerturbNormal({f3} n, {f4} t, {f3} m)\n{{\n    {f3} b = cross(n, t.xyz) * t.w;\n    return normalize(t.xyz * m.x + b * m.y + n * m.z);\n}}\n"
    );
    CodeDeclaration::new("PerturbNormal", code)
}

fn normal_map(d: Dialect, filter: SamplerFilter, perturb: &Arc<CodeDeclaration>) -> Feature {
    let name = names::normal_map(filter);
    let sampler = sampler_name(filter);
    let code = format!(
        "    {{{{normal}}}} = PerturbNormal({{{{normal}}}}, {{{{tangent}}}}, {}.xyz * 2.0 - 1.0);\n",
        d.sample("normalTexture", &sampler, "{{uv}}")
    );
    Feature::builder(name.clone())
        .input(vec3("normal", true))
        .input(vec4("tangent", false))
        .input(vec2("uv", false))
        .requires(VertexDataFlags::EXTENDED)
        .resource(ResourceBinding::texture("normalTexture"))
        .resource(ResourceBinding::sampler(sampler))
        .functions_code(perturb.clone())
        .insert_code(insert(&name, code, &["normal", "tangent", "uv"]))
        .build()
}

fn parallax_offset(d: Dialect) -> CodeDeclaration {
    let (f2, f3) = (float_n(d, 2), float_n(d, 3));
    let code = format!(
        "{f2} ParallaxOffset({f2} uv, float height, {f3} viewTS, float scale)\n{{\n    return uv + viewTS.xy / max(viewTS.z, 0.05) * (height * scale);\n}}\n"
    );
    CodeDeclaration::new("ParallaxOffset", code)
}

fn parallax(d: Dialect, filter: SamplerFilter, offset: &Arc<CodeDeclaration>) -> Feature {
    let name = names::parallax(filter);
    let sampler = sampler_name(filter);
    let f3 = float_n(d, 3);
    let height = d.sample("heightTexture", &sampler, "{{uv}}");
    let code = format!(
        "    {f3} parallaxView = normalize(frame.cameraPosition.xyz - {{{{worldPosition}}}}.xyz);\n    \
         {f3} parallaxBitangent = cross({{{{normal}}}}, {{{{tangent}}}}.xyz) * {{{{tangent}}}}.w;\n    \
         {f3} parallaxViewTS = {f3}(dot(parallaxView, {{{{tangent}}}}.xyz), dot(parallaxView, parallaxBitangent), dot(parallaxView, {{{{normal}}}}));\n    \
         {{{{uv}}}} = ParallaxOffset({{{{uv}}}}, {height}.r, parallaxViewTS, frame.parallaxScale);\n"
    );
    Feature::builder(name.clone())
        .input(vec2("uv", true))
        .input(vec4("tangent", false))
        .input(vec3("normal", false))
        .input(vec4("worldPosition", false))
        .internal(Variable::vector("parallaxView", BaseType::Float, 3, false))
        .internal(Variable::vector("parallaxBitangent", BaseType::Float, 3, false))
        .internal(Variable::vector("parallaxViewTS", BaseType::Float, 3, false))
        .requires(VertexDataFlags::EXTENDED)
        .depends_on(names::FRAME_UNIFORMS)
        .resource(ResourceBinding::texture("heightTexture"))
        .resource(ResourceBinding::sampler(sampler))
        .functions_code(offset.clone())
        .insert_code(insert(&name, code, &["worldPosition", "normal", "tangent", "uv"]))
        .build()
}
