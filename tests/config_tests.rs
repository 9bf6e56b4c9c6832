//! Shader Config Tests
//!
//! Tests for:
//! - Descriptor formatting and strict parsing
//! - Flag propagation (idempotence, prerequisite resets, sample clamping)
//! - Config merging through `ShaderConfig::max`
//! - Variant enumeration from the vertex section
//! - JSON serialization with partial input

use tessera::shader_gen::config::{
    AlbedoColor, AlbedoSource, IndirectResolution, LightingModel, MAX_SHADOW_SAMPLES, SamplerFilter,
};
use tessera::{ShaderConfig, TesseraError, VertexDataFlags};

fn lit_config() -> ShaderConfig {
    let mut config = ShaderConfig::default();
    config.albedo.source = AlbedoSource::SampleTexMain;
    config.albedo.sampler = SamplerFilter::Anisotropic;
    config.normals.use_normal_maps = true;
    config.normals.use_parallax = true;
    config.lighting.apply_lighting = true;
    config.lighting.use_ambient = true;
    config.lighting.use_light_sources = true;
    config.lighting.use_shadow_maps = true;
    config.lighting.shadow_samples = 9;
    config.lighting.model = LightingModel::BlinnPhong;
    config.lighting.indirect = IndirectResolution::Half;
    config.vertex.extended = true;
    config
}

// ============================================================================
// Descriptor Tests
// ============================================================================

#[test]
fn default_descriptor() {
    let config = ShaderConfig::default();
    assert_eq!(config.create_description_txt(), "Ac00_Nnn0_Ln0000l0r0_V000");
}

#[test]
fn descriptor_round_trips_propagated_configs() {
    let config = lit_config().propagated();
    let text = config.create_description_txt();
    let parsed = ShaderConfig::try_parse_description_txt(&text).unwrap();
    assert_eq!(parsed, config);
    assert_eq!(parsed.create_description_txt(), text);
}

#[test]
fn descriptor_round_trips_every_config() {
    let mut surfaces = Vec::new();
    for &source in AlbedoSource::ALL {
        for &color in AlbedoColor::ALL {
            for &albedo_sampler in SamplerFilter::ALL {
                for &normal_sampler in SamplerFilter::ALL {
                    surfaces.push((source, color, albedo_sampler, normal_sampler));
                }
            }
        }
    }

    let mut checked = 0usize;
    for &model in LightingModel::ALL {
        for &indirect in IndirectResolution::ALL {
            for samples in [0u8, 1, 4, 9, 12, 200] {
                for bits in 0u32..(1 << 10) {
                    let flag = |bit: u32| bits & (1 << bit) != 0;
                    let (source, color, albedo_sampler, normal_sampler) = surfaces[checked % surfaces.len()];
                    checked += 1;

                    let mut config = ShaderConfig::default();
                    config.albedo.source = source;
                    config.albedo.color = color;
                    config.albedo.sampler = albedo_sampler;
                    config.normals.use_normal_maps = flag(0);
                    config.normals.use_parallax = flag(1);
                    config.normals.sampler = normal_sampler;
                    config.lighting.apply_lighting = flag(2);
                    config.lighting.use_ambient = flag(3);
                    config.lighting.use_light_maps = flag(4);
                    config.lighting.use_light_sources = flag(5);
                    config.lighting.use_shadow_maps = flag(6);
                    config.lighting.model = model;
                    config.lighting.shadow_samples = samples;
                    config.lighting.indirect = indirect;
                    config.vertex.extended = flag(7);
                    config.vertex.blend_shapes = flag(8);
                    config.vertex.animations = flag(9);

                    let propagated = config.propagated();
                    assert_eq!(propagated.propagated(), propagated, "propagation not idempotent for {config:?}");

                    let text = propagated.create_description_txt();
                    let parsed = ShaderConfig::try_parse_description_txt(&text).unwrap();
                    assert_eq!(parsed, propagated, "`{text}` does not round-trip");
                }
            }
        }
    }
    assert!(checked > surfaces.len());
}

#[test]
fn descriptor_sections_are_order_independent() {
    let a: ShaderConfig = "At20_Nyy1_Ly1111b9r2_V100".parse().unwrap();
    let b: ShaderConfig = "V100_Ly1111b9r2_At20_Nyy1".parse().unwrap();
    assert_eq!(a, b);
}

#[test]
fn descriptor_missing_sections_keep_defaults() {
    let config: ShaderConfig = "Av".parse().unwrap();
    assert_eq!(config.albedo.source, AlbedoSource::VertexColor);
    assert_eq!(config.lighting, ShaderConfig::default().lighting);
}

#[test]
fn descriptor_rejects_garbage() {
    for text in ["", "X", "Aq00", "Ac00_Ac00", "Ac00x", "Ln0000z"] {
        assert!(
            matches!(
                ShaderConfig::try_parse_description_txt(text),
                Err(TesseraError::InvalidDescriptor { .. })
            ),
            "`{text}` should be rejected"
        );
    }
}

#[test]
fn parse_or_default_falls_back() {
    assert_eq!(ShaderConfig::parse_or_default("not a descriptor"), ShaderConfig::default());
}

// ============================================================================
// Propagation Tests
// ============================================================================

#[test]
fn propagation_is_idempotent() {
    let once = lit_config().propagated();
    let twice = once.propagated();
    assert_eq!(once, twice);

    let mut noisy = lit_config();
    noisy.lighting.apply_lighting = false;
    let once = noisy.propagated();
    assert_eq!(once, once.propagated());
}

#[test]
fn lighting_off_clears_dependents() {
    let mut config = lit_config();
    config.lighting.apply_lighting = false;
    let config = config.propagated();
    let l = &config.lighting;
    assert!(!l.use_ambient && !l.use_light_maps && !l.use_light_sources && !l.use_shadow_maps);
    assert_eq!(l.model, LightingModel::default());
    assert_eq!(l.shadow_samples, 0);
    assert_eq!(l.indirect, IndirectResolution::Off);
}

#[test]
fn unused_colour_and_sampler_are_reset() {
    let mut config = ShaderConfig::default();
    config.albedo.source = AlbedoSource::VertexColor;
    config.albedo.color = AlbedoColor::Red;
    config.albedo.sampler = SamplerFilter::Point;
    config.normals.sampler = SamplerFilter::Point;
    let config = config.propagated();
    assert_eq!(config.albedo.color, AlbedoColor::default());
    assert_eq!(config.albedo.sampler, SamplerFilter::default());
    assert_eq!(config.normals.sampler, SamplerFilter::default());
}

#[test]
fn parallax_requires_normal_maps() {
    let mut config = ShaderConfig::default();
    config.normals.use_parallax = true;
    assert!(!config.propagated().normals.use_parallax);
}

#[test]
fn shadow_samples_clamped() {
    let mut config = lit_config();
    config.lighting.shadow_samples = 200;
    assert_eq!(config.propagated().lighting.shadow_samples, MAX_SHADOW_SAMPLES);

    config.lighting.shadow_samples = 0;
    let config = config.propagated();
    assert_eq!(config.lighting.shadow_samples, 1);
    assert_eq!(config.lighting.shadow_kernel(), 1);
}

#[test]
fn equivalent_configs_share_a_hash() {
    let mut noisy = ShaderConfig::default();
    noisy.lighting.use_ambient = true;
    noisy.albedo.sampler = SamplerFilter::Point;
    assert_ne!(noisy.compute_hash(), ShaderConfig::default().compute_hash());
    assert_eq!(noisy.propagated().compute_hash(), ShaderConfig::default().compute_hash());
}

// ============================================================================
// Merge Tests
// ============================================================================

#[test]
fn max_is_superset() {
    let mut a = ShaderConfig::default();
    a.lighting.apply_lighting = true;
    a.lighting.use_light_sources = true;
    a.lighting.model = LightingModel::Phong;
    a.vertex.extended = true;

    let mut b = ShaderConfig::default();
    b.albedo.source = AlbedoSource::SampleTexMain;
    b.vertex.animations = true;

    let merged = ShaderConfig::max(&a, &b, false);
    assert_eq!(merged.albedo.source, AlbedoSource::SampleTexMain);
    assert!(merged.lighting.use_light_sources);
    assert_eq!(merged.lighting.model, LightingModel::Phong);
    assert!(merged.vertex.extended && merged.vertex.animations);
    assert_eq!(ShaderConfig::max(&a, &b, false), ShaderConfig::max(&b, &a, false));
}

#[test]
fn max_propagation_is_caller_controlled() {
    let mut a = ShaderConfig::default();
    a.lighting.use_ambient = true;
    let raw = ShaderConfig::max(&a, &ShaderConfig::default(), false);
    assert!(raw.lighting.use_ambient);
    let propagated = ShaderConfig::max(&a, &ShaderConfig::default(), true);
    assert!(!propagated.lighting.use_ambient);
}

// ============================================================================
// Variant Enumeration Tests
// ============================================================================

#[test]
fn requested_variants_enumerate_optional_flags() {
    let mut config = ShaderConfig::default();
    assert_eq!(config.requested_variants().as_slice(), &[VertexDataFlags::BASIC]);

    config.vertex.extended = true;
    config.vertex.animations = true;
    let variants = config.requested_variants();
    assert_eq!(
        variants.as_slice(),
        &[
            VertexDataFlags::BASIC,
            VertexDataFlags::BASIC | VertexDataFlags::EXTENDED,
            VertexDataFlags::BASIC | VertexDataFlags::ANIMATIONS,
            VertexDataFlags::BASIC | VertexDataFlags::EXTENDED | VertexDataFlags::ANIMATIONS,
        ]
    );
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn json_partial_config_uses_defaults() -> anyhow::Result<()> {
    let config: ShaderConfig =
        serde_json::from_str(r#"{ "lighting": { "apply_lighting": true, "model": "Phong" } }"#)?;
    assert!(config.lighting.apply_lighting);
    assert_eq!(config.lighting.model, LightingModel::Phong);
    assert_eq!(config.albedo, ShaderConfig::default().albedo);
    Ok(())
}

#[test]
fn json_round_trip() -> anyhow::Result<()> {
    let config = lit_config().propagated();
    let json = serde_json::to_string(&config)?;
    let back: ShaderConfig = serde_json::from_str(&json)?;
    assert_eq!(back, config);
    Ok(())
}

#[test]
fn json_descriptor_agree() -> anyhow::Result<()> {
    let config = lit_config().propagated();
    let from_json: ShaderConfig = serde_json::from_str(&serde_json::to_string(&config)?)?;
    let from_text: ShaderConfig = config.create_description_txt().parse()?;
    assert_eq!(from_json, from_text);
    Ok(())
}
