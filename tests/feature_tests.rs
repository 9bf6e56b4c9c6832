//! Feature Composition Tests
//!
//! Tests for:
//! - Dependency resolution in a caller-built `FeatureLibrary`
//! - Emission order (types, resources, functions, then per-variant inserts)
//! - Global and local conflict detection
//! - Stage-input casting and cast refusal
//! - Binding-slot allocation and exhaustion

use tessera::shader_gen::library::names;
use tessera::shader_gen::variant::STAGE_STRUCTS;
use tessera::shader_gen::{
    BaseType, CastPadding, CodeDeclaration, Context, FeatureGraph, ResourceBinding, SlotClass, Variable,
};
use tessera::{Dialect, Feature, FeatureLibrary, ShaderGenerator, TesseraError, VertexDataFlags};

fn albedo() -> Variable {
    Variable::vector("albedo", BaseType::Float, 4, true).templated()
}

fn stage_basic(dialect: Dialect) -> Feature {
    Feature::builder(names::STAGE_BASIC)
        .types_code(STAGE_STRUCTS[0].declaration(dialect))
        .build()
}

fn palette() -> Feature {
    Feature::builder("Palette")
        .types_code(CodeDeclaration::new("PaletteData", "struct PaletteData\n{\n    float4 tint;\n};\n"))
        .functions_code(CodeDeclaration::new(
            "PaletteTint",
            "float4 PaletteTint()\n{\n    return float4(0.5, 0.5, 0.5, 1.0);\n}\n",
        ))
        .build()
}

fn tinted() -> Feature {
    Feature::builder("Tinted")
        .output(albedo())
        .depends_on("Palette")
        .insert_code(CodeDeclaration::templated(
            "Tinted",
            "    float4 {{albedo}} = PaletteTint();\n",
            ["{{albedo}}"],
        ))
        .build()
}

fn library(features: impl IntoIterator<Item = Feature>) -> FeatureLibrary {
    let mut lib = FeatureLibrary::new(Dialect::Hlsl);
    lib.insert(stage_basic(Dialect::Hlsl));
    for feature in features {
        lib.insert(feature);
    }
    lib
}

const BASIC: [VertexDataFlags; 1] = [VertexDataFlags::BASIC];

// ============================================================================
// Dependency Resolution
// ============================================================================

#[test]
fn dependency_declarations_precede_dependent_insert() {
    let lib = library([palette(), tinted()]);
    let shader = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC, "Tinted"], &BASIC).unwrap();

    let data = shader.source.find("struct PaletteData").unwrap();
    let function = shader.source.find("float4 PaletteTint()").unwrap();
    let entry = shader.source.find("float4 MainPixel(").unwrap();
    let insert = shader.source.find("    float4 albedo = PaletteTint();\n").unwrap();
    assert!(data < function && function < entry && entry < insert);
}

#[test]
fn graph_orders_dependencies_first() {
    let lib = library([palette(), tinted()]);
    let graph = FeatureGraph::resolve(&lib, &["Tinted", names::STAGE_BASIC]).unwrap();
    assert_eq!(graph.names(), ["Palette", "Tinted", names::STAGE_BASIC]);
}

#[test]
fn unknown_dependency_is_reported() {
    let lib = library([tinted()]);
    let result = ShaderGenerator::generate_features(&lib, "custom", &["Tinted"], &BASIC);
    assert!(matches!(result, Err(TesseraError::UnknownFeature(name)) if name == "Palette"));
}

#[test]
fn unsupported_feature_is_reported() {
    let mut lib = library([tinted()]);
    lib.mark_unsupported("Palette", "no palette support");
    let result = ShaderGenerator::generate_features(&lib, "custom", &["Tinted"], &BASIC);
    assert!(matches!(result, Err(TesseraError::Unsupported { .. })));
}

// ============================================================================
// Deduplication and Conflicts
// ============================================================================

#[test]
fn shared_declarations_emitted_once() {
    let reuse = Feature::builder("Reuse")
        .functions_code(CodeDeclaration::new(
            "PaletteTint",
            "float4 PaletteTint()\n{\n    return float4(0.5, 0.5, 0.5, 1.0);\n}\n",
        ))
        .build();
    let mut lib = library([palette(), tinted(), reuse]);
    lib.insert(
        Feature::builder(names::STAGE_EXTENDED)
            .types_code(STAGE_STRUCTS[1].declaration(Dialect::Hlsl))
            .requires(VertexDataFlags::EXTENDED)
            .build(),
    );
    let variants = [VertexDataFlags::BASIC, VertexDataFlags::BASIC | VertexDataFlags::EXTENDED];
    let shader = ShaderGenerator::generate_features(
        &lib,
        "custom",
        &[names::STAGE_BASIC, names::STAGE_EXTENDED, "Reuse", "Tinted"],
        &variants,
    )
    .unwrap();

    assert_eq!(shader.source.matches("float4 PaletteTint()").count(), 1);
    assert_eq!(shader.source.matches("struct VertexOutputBasic").count(), 1);
    assert_eq!(shader.source.matches("struct VertexOutputExtended").count(), 1);
    assert_eq!(shader.source.matches("float4 albedo = PaletteTint();").count(), 2);
    assert_eq!(shader.entry_points, ["MainPixel", "MainPixelExtended"]);
}

#[test]
fn conflicting_global_declaration_fails() {
    let clash = Feature::builder("Clash")
        .types_code(CodeDeclaration::new("PaletteData", "struct PaletteData\n{\n    float3 tint;\n};\n"))
        .build();
    let lib = library([palette(), tinted(), clash]);
    let result = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC, "Tinted", "Clash"], &BASIC);
    assert!(matches!(result, Err(TesseraError::DeclarationConflict(name)) if name == "PaletteData"));
}

#[test]
fn conflicting_local_declaration_fails() {
    let narrow = Feature::builder("Narrow")
        .output(Variable::vector("albedo", BaseType::Float, 3, true).templated())
        .build();
    let lib = library([palette(), tinted(), narrow]);
    let result = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC, "Tinted", "Narrow"], &BASIC);
    assert!(matches!(result, Err(TesseraError::LocalConflict { .. })));
}

#[test]
fn unprovided_input_fails() {
    let reader = Feature::builder("Reader")
        .input(Variable::scalar("roughness", BaseType::Float, false))
        .build();
    let lib = library([palette(), tinted(), reader]);
    let result = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC, "Tinted", "Reader"], &BASIC);
    assert!(matches!(
        result,
        Err(TesseraError::UnresolvedInput { variable, .. }) if variable == "roughness"
    ));
}

#[test]
fn missing_stage_struct_fails() {
    let mut lib = FeatureLibrary::new(Dialect::Hlsl);
    lib.insert(palette());
    lib.insert(tinted());
    let result = ShaderGenerator::generate_features(&lib, "custom", &["Tinted"], &BASIC);
    assert!(matches!(result, Err(TesseraError::MissingVertexOutput { .. })));
}

#[test]
fn entry_point_without_albedo_fails() {
    let lib = library(Vec::new());
    let result = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC], &BASIC);
    assert!(matches!(result, Err(TesseraError::UnresolvedInput { .. })));
}

// ============================================================================
// Stage Inputs and Casts
// ============================================================================

#[test]
fn stage_inputs_cast_before_insert() {
    let shade = Feature::builder("Shade")
        .input(Variable::vector("worldPosition", BaseType::Float, 4, false).templated())
        .output(albedo())
        .insert_code(CodeDeclaration::templated(
            "Shade",
            "    float4 {{albedo}} = frac({{worldPosition}});\n",
            ["{{albedo}}", "{{worldPosition}}"],
        ))
        .build();
    let lib = library([shade]);
    let shader = ShaderGenerator::generate_features(&lib, "custom", &[names::STAGE_BASIC, "Shade"], &BASIC).unwrap();

    let cast = shader
        .source
        .find("    float4 worldPosition = float4(vBasic.worldPosition, 1);\n")
        .unwrap();
    let insert = shader.source.find("    float4 albedo = frac(worldPosition);\n").unwrap();
    assert!(cast < insert);
}

#[test]
fn truncating_cast_is_refused() {
    let wide = Variable::vector("wide", BaseType::Float, 4, false);
    let narrow = Variable::vector("narrow", BaseType::Float, 3, false);
    let mut dst = String::new();
    let result = Variable::create_cast(&wide, &narrow, Dialect::Glsl, &mut dst, false, CastPadding::ZeroOrFalse);
    assert!(matches!(result, Err(TesseraError::CastNotSupported { .. })));
    assert!(dst.is_empty());
}

#[test]
fn widening_cast_pads_per_dialect() {
    let src = Variable::vector("n", BaseType::Int, 2, false);
    let dst_var = Variable::vector("m", BaseType::Float, 4, true);

    let mut hlsl = String::new();
    Variable::create_cast(&src, &dst_var, Dialect::Hlsl, &mut hlsl, false, CastPadding::ZeroOrFalse).unwrap();
    assert_eq!(hlsl, "float4 m = float4(float2(n), 0, 0)");

    let mut glsl = String::new();
    Variable::create_cast(&src, &dst_var, Dialect::Glsl, &mut glsl, true, CastPadding::OneOrTrue).unwrap();
    assert_eq!(glsl, "m = vec4(vec2(n), 1, 1)");
}

// ============================================================================
// Binding Slots
// ============================================================================

#[test]
fn resources_share_slots_by_name() {
    let mut ctx = Context::new(Dialect::Hlsl);
    let a = ctx.bind_resource(&ResourceBinding::texture("albedoTexture")).unwrap();
    let b = ctx.bind_resource(&ResourceBinding::texture("normalTexture")).unwrap();
    let again = ctx.bind_resource(&ResourceBinding::texture("albedoTexture")).unwrap();
    assert_eq!((a, b, again), (0, 1, 0));
    assert_eq!(ctx.slot_counters().bound_texture_idx, 2);

    let clash = ctx.bind_resource(&ResourceBinding::sampler("albedoTexture"));
    assert!(matches!(clash, Err(TesseraError::DeclarationConflict(_))));
}

#[test]
fn glsl_buffer_slots_exhaust() {
    let mut ctx = Context::new(Dialect::Glsl);
    let max = Dialect::Glsl.max_slots(SlotClass::Buffer);
    for i in 0..max {
        ctx.bind_resource(&ResourceBinding::structured_buffer(format!("buffer{i}"), "Light"))
            .unwrap();
    }
    let result = ctx.bind_resource(&ResourceBinding::structured_buffer("overflow", "Light"));
    assert!(matches!(
        result,
        Err(TesseraError::SlotsExhausted { dialect: Dialect::Glsl, class: SlotClass::Buffer, .. })
    ));
}

#[test]
fn metal_rejects_comparison_samplers() {
    let binding = ResourceBinding::comparison_sampler("shadowSampler");
    assert!(!binding.kind().is_supported(Dialect::Metal));
    let result = binding.declaration(Dialect::Metal, 0);
    assert!(matches!(result, Err(TesseraError::Unsupported { .. })));
}
