//! Lighting features: accumulation, ambient, light maps, light sources,
//! shadow filtering and screen-space indirect light.

use std::fmt::Write as _;
use std::sync::Arc;

use super::surface::{vec3, vec4};
use super::{FeatureLibrary, float_n, insert, mul, names, sampler_name};
use crate::shader_gen::config::{IndirectResolution, LightingModel, SamplerFilter};
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::Dialect;
use crate::shader_gen::feature::Feature;
use crate::shader_gen::resource::ResourceBinding;
use crate::shader_gen::variable::{BaseType, Variable};
use crate::shader_gen::variant::VertexDataFlags;

/// Texel size of the shadow map the PCF kernel steps over.
const SHADOW_MAP_SIZE: u32 = 2048;

pub(super) fn register(library: &mut FeatureLibrary) {
    let d = library.dialect();
    let f3 = float_n(d, 3);

    library.insert(
        Feature::builder(names::LIGHTING_INIT)
            .output(vec3("lighting", true))
            .insert_code(insert(
                names::LIGHTING_INIT,
                format!("    {f3} {{{{lighting}}}} = {f3}(0.0, 0.0, 0.0);\n"),
                &["lighting"],
            ))
            .build(),
    );

    library.insert(
        Feature::builder(names::AMBIENT_LIGHT)
            .input(vec3("lighting", true))
            .depends_on(names::LIGHTING_INIT)
            .depends_on(names::FRAME_UNIFORMS)
            .insert_code(insert(
                names::AMBIENT_LIGHT,
                "    {{lighting}} += frame.ambientColor.rgb;\n".to_string(),
                &["lighting"],
            ))
            .build(),
    );

    let linear = sampler_name(SamplerFilter::Linear);
    library.insert(
        Feature::builder(names::LIGHT_MAP)
            .input(vec3("lighting", true))
            .input(Variable::vector("lightMapUv", BaseType::Float, 2, false).templated())
            .requires(VertexDataFlags::EXTENDED)
            .depends_on(names::LIGHTING_INIT)
            .resource(ResourceBinding::texture("lightMapTexture"))
            .resource(ResourceBinding::sampler(linear.clone()))
            .insert_code(insert(
                names::LIGHT_MAP,
                format!(
                    "    {{{{lighting}}}} += {}.rgb;\n",
                    d.sample("lightMapTexture", &linear, "{{lightMapUv}}")
                ),
                &["lighting", "lightMapUv"],
            ))
            .build(),
    );

    library.insert(light_data(d));

    let light_direction = Arc::new(light_direction(d));
    for &model in LightingModel::ALL {
        let evaluate = Arc::new(evaluate_light(d, model));
        for shadowed in [false, true] {
            library.insert(light_sources(d, model, shadowed, &light_direction, &evaluate));
        }
    }

    for kernel in 1..=4u8 {
        let name = names::shadow_map_pcf(kernel);
        match shadow_map_pcf(d, kernel) {
            Some(feature) => {
                library.insert(feature);
            }
            None => library.mark_unsupported(name, "no depth-compare sampler binding"),
        }
    }

    for &resolution in IndirectResolution::ALL {
        if resolution == IndirectResolution::Off {
            continue;
        }
        let name = names::indirect_light(resolution);
        if d == Dialect::Metal {
            library.mark_unsupported(name, "indirect-light sampling is not implemented");
        } else {
            library.insert(indirect_light(d, resolution));
        }
    }

    library.insert(
        Feature::builder(names::APPLY_LIGHTING)
            .input(vec4("albedo", true))
            .input(vec3("lighting", false))
            .depends_on(names::LIGHTING_INIT)
            .insert_code(insert(
                names::APPLY_LIGHTING,
                "    {{albedo}}.rgb *= {{lighting}};\n".to_string(),
                &["albedo", "lighting"],
            ))
            .build(),
    );
}

/// The `Light` type and the buffer of active lights.
fn light_data(d: Dialect) -> Feature {
    let f4 = float_n(d, 4);
    let mat4 = match d {
        Dialect::Glsl => "mat4",
        Dialect::Hlsl | Dialect::Metal => "float4x4",
    };
    let code = format!(
        "struct Light\n{{\n    {f4} positionRange;\n    {f4} colorIntensity;\n    {mat4} shadowMatrix;\n}};\n"
    );
    Feature::builder(names::LIGHT_DATA)
        .depends_on(names::FRAME_UNIFORMS)
        .types_code(CodeDeclaration::new("Light", code))
        .resource(ResourceBinding::structured_buffer("lights", "Light"))
        .build()
}

fn light_direction(d: Dialect) -> CodeDeclaration {
    let f3 = float_n(d, 3);
    // w == 0 marks a directional light whose xyz already is the direction.
    let code = format!(
        "{f3} LightDirection(Light light, {f3} p)\n{{\n    if (light.positionRange.w == 0.0)\n    {{\n        return normalize(-light.positionRange.xyz);\n    }}\n    return normalize(light.positionRange.xyz - p);\n}}\n"
    );
    CodeDeclaration::new("LightDirection", code)
}

fn evaluate_light(d: Dialect, model: LightingModel) -> CodeDeclaration {
    let f3 = float_n(d, 3);
    let name = format!("EvaluateLight{model}");
    let mut code = format!(
        "{f3} {name}(Light light, {f3} n, {f3} p, {f3} v)\n{{\n    {f3} l = LightDirection(light, p);\n    {f3} radiance = light.colorIntensity.rgb * light.colorIntensity.w;\n    float diffuse = max(dot(n, l), 0.0);\n"
    );
    let _ = match model {
        LightingModel::Lambert => writeln!(code, "    return radiance * diffuse;"),
        LightingModel::Phong => writeln!(
            code,
            "    float specular = pow(max(dot(reflect(-l, n), v), 0.0), 32.0);\n    return radiance * (diffuse + specular);"
        ),
        LightingModel::BlinnPhong => writeln!(
            code,
            "    {f3} h = normalize(l + v);\n    float specular = pow(max(dot(n, h), 0.0), 64.0);\n    return radiance * (diffuse + specular);"
        ),
    };
    code.push_str("}\n");
    CodeDeclaration::new(name, code)
}

fn light_sources(
    d: Dialect,
    model: LightingModel,
    shadowed: bool,
    direction: &Arc<CodeDeclaration>,
    evaluate: &Arc<CodeDeclaration>,
) -> Feature {
    let name = names::light_sources(model, shadowed);
    let f3 = float_n(d, 3);
    let shadow_term = if shadowed { " * (i == 0u ? {{shadow}} : 1.0)" } else { "" };
    let code = format!(
        "    {f3} viewDir = normalize(frame.cameraPosition.xyz - {{{{worldPosition}}}}.xyz);\n    \
         for (uint i = 0u; i < frame.lightCount; ++i)\n    {{\n        \
         {{{{lighting}}}} += {}(lights[i], {{{{normal}}}}, {{{{worldPosition}}}}.xyz, viewDir){shadow_term};\n    }}\n",
        evaluate.name()
    );

    let mut builder = Feature::builder(name.clone())
        .input(vec3("lighting", true))
        .input(vec3("normal", false))
        .input(vec4("worldPosition", false))
        .internal(Variable::vector("viewDir", BaseType::Float, 3, false))
        .depends_on(names::LIGHTING_INIT)
        .depends_on(names::LIGHT_DATA)
        .functions_code(direction.clone())
        .functions_code(evaluate.clone());

    let mut vars = vec!["worldPosition", "lighting", "normal"];
    if shadowed {
        builder = builder
            .input(Variable::scalar("shadow", BaseType::Float, false).templated());
        vars.push("shadow");
    }
    builder.insert_code(insert(&name, code, &vars)).build()
}

/// `None` when the dialect cannot sample a shadow map with depth comparison.
fn shadow_map_pcf(d: Dialect, kernel: u8) -> Option<Feature> {
    let name = names::shadow_map_pcf(kernel);
    let function = format!("SampleShadowPcf{kernel}");
    let (f2, f3, f4) = (float_n(d, 2), float_n(d, 3), float_n(d, 4));
    let sample = d
        .sample_compare("shadowMap", "shadowSampler", "coord.xy + offset", "coord.z")
        .ok()?;
    let center = f32::from(kernel - 1) / 2.0;
    let taps = u32::from(kernel) * u32::from(kernel);

    let code = format!(
        "float {function}({f3} coord)\n{{\n    \
         {f2} texel = {f2}(1.0, 1.0) / {SHADOW_MAP_SIZE}.0;\n    \
         float sum = 0.0;\n    \
         for (int y = 0; y < {kernel}; ++y)\n    {{\n        \
         for (int x = 0; x < {kernel}; ++x)\n        {{\n            \
         {f2} offset = ({f2}(float(x), float(y)) - {center:.1}) * texel;\n            \
         sum += {sample};\n        }}\n    }}\n    \
         return sum / {taps}.0;\n}}\n"
    );

    let project = mul(d, "lights[0].shadowMatrix", "{{worldPosition}}");
    let insert_code = format!(
        "    {f4} shadowCoord = {project};\n    float {{{{shadow}}}} = {function}(shadowCoord.xyz / shadowCoord.w);\n"
    );

    Some(
        Feature::builder(name.clone())
            .input(vec4("worldPosition", false))
            .output(Variable::scalar("shadow", BaseType::Float, false).templated())
            .internal(Variable::vector("shadowCoord", BaseType::Float, 4, false))
            .depends_on(names::LIGHT_DATA)
            .resource(ResourceBinding::depth_texture("shadowMap"))
            .resource(ResourceBinding::comparison_sampler("shadowSampler"))
            .functions_code(CodeDeclaration::new(function, code))
            .insert_code(insert(&name, insert_code, &["worldPosition", "shadow"]))
            .build(),
    )
}

fn indirect_light(d: Dialect, resolution: IndirectResolution) -> Feature {
    let name = names::indirect_light(resolution);
    let divisor = resolution.divisor();
    let point = sampler_name(SamplerFilter::Point);

    let mut builder = Feature::builder(name.clone())
        .input(vec3("lighting", true))
        .input(vec4("fragCoord", false))
        .depends_on(names::LIGHTING_INIT)
        .resource(ResourceBinding::texture("indirectTexture"));

    let load = match d {
        Dialect::Glsl => {
            builder = builder.resource(ResourceBinding::sampler(point.clone()));
            format!("texelFetch(sampler2D(indirectTexture, {point}), ivec2({{{{fragCoord}}}}.xy) / {divisor}, 0)")
        }
        Dialect::Hlsl | Dialect::Metal => {
            format!("indirectTexture.Load(int3(int2({{{{fragCoord}}}}.xy) / {divisor}, 0))")
        }
    };
    builder
        .insert_code(insert(
            &name,
            format!("    {{{{lighting}}}} += {load}.rgb;\n"),
            &["lighting", "fragCoord"],
        ))
        .build()
}
