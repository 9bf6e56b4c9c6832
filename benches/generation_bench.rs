//! Generation throughput: feature graph vs. legacy templates, per dialect.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tessera::{PlatformFlags, ShaderConfig, ShaderGenerator, ShaderManager};

fn configs() -> Vec<(&'static str, ShaderConfig)> {
    vec![
        ("unlit", ShaderConfig::default()),
        ("lit_textured", ShaderConfig::parse_or_default("At00_Nnn0_Ly1010b0r0_V100")),
        ("full", ShaderConfig::parse_or_default("At02_Nyy1_Ly1111b9r2_V111")),
    ]
}

fn platforms() -> [(&'static str, PlatformFlags); 2] {
    [("hlsl", PlatformFlags::DIRECT3D), ("glsl", PlatformFlags::VULKAN)]
}

fn bench_feature_graph(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let generator = ShaderGenerator::default();
    let mut group = c.benchmark_group("feature_graph");
    for (name, config) in configs() {
        for (dialect, platform) in platforms() {
            group.bench_with_input(BenchmarkId::new(name, dialect), &config, |b, config| {
                b.iter(|| generator.create_pixel_shader_variation(black_box(config), platform));
            });
        }
    }
    group.finish();
}

fn bench_legacy(c: &mut Criterion) {
    let generator = ShaderGenerator::default();
    let mut group = c.benchmark_group("legacy_template");
    for (name, config) in configs() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| generator.create_pixel_shader_variation_legacy(black_box(config), PlatformFlags::DIRECT3D));
        });
    }
    group.finish();
}

fn bench_descriptor(c: &mut Criterion) {
    let config = ShaderConfig::parse_or_default("At02_Nyy1_Ly1111b9r2_V111");
    let text = config.to_string();
    c.bench_function("descriptor_roundtrip", |b| {
        b.iter(|| ShaderConfig::try_parse_description_txt(black_box(&config.create_description_txt())));
    });
    c.bench_function("descriptor_parse", |b| {
        b.iter(|| ShaderConfig::try_parse_description_txt(black_box(&text)));
    });
}

fn bench_cached(c: &mut Criterion) {
    let mut manager = ShaderManager::default();
    let config = ShaderConfig::parse_or_default("At00_Nnn0_Ly1010b0r0_V100");
    c.bench_function("manager_cache_hit", |b| {
        b.iter(|| manager.get_or_generate(black_box(&config), PlatformFlags::DIRECT3D));
    });
}

criterion_group!(benches, bench_feature_graph, bench_legacy, bench_descriptor, bench_cached);
criterion_main!(benches);
