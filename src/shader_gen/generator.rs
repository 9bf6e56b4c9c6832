//! Shader Generator
//!
//! Entry point of the crate. Turns a [`ShaderConfig`] and the platform's
//! capability flags into pixel shader source.
//!
//! Two paths are provided:
//!
//! | Method | Source of truth |
//! |--------|-----------------|
//! | [`ShaderGenerator::generate`] / [`ShaderGenerator::create_pixel_shader_variation`] | feature graph |
//! | [`ShaderGenerator::create_pixel_shader_variation_legacy`] | `#define`-patched templates |
//!
//! Both are pure functions of `(config, platform, variant set)`: identical
//! inputs always yield byte-identical output.

use std::sync::Arc;

use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::config::{AlbedoSource, IndirectResolution, ShaderConfig};
use crate::shader_gen::context::Context;
use crate::shader_gen::dialect::{Dialect, PlatformFlags};
use crate::shader_gen::graph::FeatureGraph;
use crate::shader_gen::library::{FeatureLibrary, names};
use crate::shader_gen::templates::{FeatureDefines, PIXEL_TEMPLATE, TemplateCache, rewrite_feature_defines};
use crate::shader_gen::variant::VertexDataFlags;
use crate::utils::interner;

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    pub dialect: Dialect,
    pub descriptor: String,
    /// One entry point per requested variant, in request order.
    pub entry_points: Vec<String>,
    pub source: String,
    /// xxh3-128 of `source`.
    pub hash: u128,
}

impl GeneratedShader {
    /// Null-terminated source for native compiler entry points.
    #[must_use]
    pub fn to_bytes_with_nul(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.source.len() + 1);
        bytes.extend_from_slice(self.source.as_bytes());
        bytes.push(0);
        bytes
    }
}

#[derive(Debug, Clone)]
pub struct ShaderGenerator {
    templates: Arc<TemplateCache>,
}

impl Default for ShaderGenerator {
    fn default() -> Self {
        Self::new(Arc::new(TemplateCache::embedded()))
    }
}

impl ShaderGenerator {
    #[must_use]
    pub fn new(templates: Arc<TemplateCache>) -> Self {
        interner::preload_common_names();
        Self { templates }
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    /// Ordered feature requests for a propagated config.
    #[must_use]
    pub fn resolve_feature_names(config: &ShaderConfig) -> Vec<String> {
        let (a, n, l) = (&config.albedo, &config.normals, &config.lighting);
        let mut requested: Vec<String> = [
            names::STAGE_BASIC,
            names::STAGE_EXTENDED,
            names::STAGE_BLEND_SHAPES,
            names::STAGE_ANIMATIONS,
        ]
        .into_iter()
        .map(String::from)
        .collect();

        if l.apply_lighting || n.use_normal_maps {
            requested.push(names::BLEND_SHAPE_NORMAL.to_string());
            requested.push(names::SKINNED_NORMAL.to_string());
        }
        if n.use_parallax {
            requested.push(names::parallax(n.sampler));
        }

        requested.push(match a.source {
            AlbedoSource::Color => names::albedo_color(a.color),
            AlbedoSource::VertexColor => names::ALBEDO_VERTEX_COLOR.to_string(),
            AlbedoSource::SampleTexMain => names::albedo_texture(a.sampler),
        });

        if n.use_normal_maps {
            requested.push(names::normal_map(n.sampler));
        }

        if l.apply_lighting {
            requested.push(names::LIGHTING_INIT.to_string());
            if l.use_ambient {
                requested.push(names::AMBIENT_LIGHT.to_string());
            }
            if l.use_light_maps {
                requested.push(names::LIGHT_MAP.to_string());
            }
            if l.use_light_sources {
                if l.use_shadow_maps {
                    requested.push(names::shadow_map_pcf(l.shadow_kernel()));
                }
                requested.push(names::light_sources(l.model, l.use_shadow_maps));
                if l.indirect != IndirectResolution::Off {
                    requested.push(names::indirect_light(l.indirect));
                }
            }
            requested.push(names::APPLY_LIGHTING.to_string());
        }
        requested
    }

    /// Generates every variant the config's vertex section requests.
    pub fn generate(&self, config: &ShaderConfig, platform: PlatformFlags) -> Result<GeneratedShader> {
        let config = config.propagated();
        self.generate_variants(&config, platform, &config.requested_variants())
    }

    /// Generates one entry point per entry of `variants`.
    pub fn generate_variants(
        &self,
        config: &ShaderConfig,
        platform: PlatformFlags,
        variants: &[VertexDataFlags],
    ) -> Result<GeneratedShader> {
        let config = config.propagated();
        let dialect = Dialect::from_platform(platform);
        let library = FeatureLibrary::builtin(dialect);
        let requested = Self::resolve_feature_names(&config);
        Self::generate_features(library, &config.create_description_txt(), &requested, variants)
    }

    /// Core of the feature-graph path: resolves `requested` against `library`
    /// and emits every feature into every variant that can host it.
    pub fn generate_features<S: AsRef<str>>(
        library: &FeatureLibrary,
        descriptor: &str,
        requested: &[S],
        variants: &[VertexDataFlags],
    ) -> Result<GeneratedShader> {
        let dialect = library.dialect();
        let graph = FeatureGraph::resolve(library, requested)?;
        let features: Vec<_> = graph.iter().cloned().collect();

        let mut seen: SmallVec<[VertexDataFlags; 8]> = SmallVec::new();
        let mut ctx = Context::new(dialect);
        let mut entry_points = Vec::with_capacity(variants.len());

        for &flags in variants {
            let flags = flags | VertexDataFlags::BASIC;
            if seen.contains(&flags) {
                log::debug!("Variant {flags:?} requested twice, emitted once");
                continue;
            }
            seen.push(flags);

            ctx.begin_variant(flags);
            for feature in &features {
                if !feature.is_available_for(flags) {
                    log::debug!("Skipping `{}` for variant {flags:?}", feature.name());
                    continue;
                }
                feature.create_all_code(&mut ctx)?;
            }
            entry_points.push(ctx.finish_variant()?);
        }

        if entry_points.is_empty() {
            return Err(TesseraError::NoActiveVariant);
        }

        let header = format!("tessera {dialect} {descriptor}");
        let source = ctx.assemble(&header);
        let hash = xxh3_128(source.as_bytes());
        log::debug!("Generated {dialect} shader {descriptor} ({} bytes, {} entry points)", source.len(), entry_points.len());

        Ok(GeneratedShader {
            dialect,
            descriptor: descriptor.to_string(),
            entry_points,
            source,
            hash,
        })
    }

    /// Feature-graph path as a null-terminated byte buffer. Empty on failure.
    #[must_use]
    pub fn create_pixel_shader_variation(&self, config: &ShaderConfig, platform: PlatformFlags) -> Vec<u8> {
        match self.generate(config, platform) {
            Ok(shader) => shader.to_bytes_with_nul(),
            Err(e) => {
                log::error!("Shader generation failed for {}: {e}", config.propagated());
                Vec::new()
            }
        }
    }

    /// Template path as a null-terminated byte buffer. Empty on failure.
    #[must_use]
    pub fn create_pixel_shader_variation_legacy(&self, config: &ShaderConfig, platform: PlatformFlags) -> Vec<u8> {
        match self.legacy_source(config, platform) {
            Ok(source) => {
                let mut bytes = source.into_bytes();
                bytes.push(0);
                bytes
            }
            Err(e) => {
                log::error!("Legacy shader generation failed for {}: {e}", config.propagated());
                Vec::new()
            }
        }
    }

    fn legacy_source(&self, config: &ShaderConfig, platform: PlatformFlags) -> Result<String> {
        let config = config.propagated();
        let dialect = Dialect::from_platform(platform);

        if dialect == Dialect::Metal {
            let l = &config.lighting;
            if l.use_shadow_maps {
                return Err(TesseraError::Unsupported {
                    dialect,
                    what: "legacy shadow maps".to_string(),
                });
            }
            if l.indirect != IndirectResolution::Off {
                return Err(TesseraError::Unsupported {
                    dialect,
                    what: "legacy indirect light".to_string(),
                });
            }
        }

        let template = self.templates.get_or_load(PIXEL_TEMPLATE, dialect)?;
        Ok(rewrite_feature_defines(&template, &FeatureDefines::from_config(&config)))
    }
}
