//! Shader Cache
//!
//! [`ShaderManager`] memoises generation results by `(descriptor, dialect,
//! variant set)` so identical configs are generated once. Results with the
//! same source hash share one allocation.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::Result;
use crate::shader_gen::config::ShaderConfig;
use crate::shader_gen::dialect::{Dialect, PlatformFlags};
use crate::shader_gen::generator::{GeneratedShader, ShaderGenerator};
use crate::shader_gen::variant::VertexDataFlags;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub descriptor: String,
    pub dialect: Dialect,
    pub variants: SmallVec<[VertexDataFlags; 8]>,
}

/// Caller-owned cache of generated shaders.
#[derive(Debug, Default)]
pub struct ShaderManager {
    generator: ShaderGenerator,
    /// Request key → result.
    shader_cache: FxHashMap<ShaderKey, Arc<GeneratedShader>>,
    /// xxh3-128 of the source → result.
    source_cache: FxHashMap<u128, Arc<GeneratedShader>>,
}

impl ShaderManager {
    #[must_use]
    pub fn new(generator: ShaderGenerator) -> Self {
        Self {
            generator,
            shader_cache: FxHashMap::default(),
            source_cache: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn generator(&self) -> &ShaderGenerator {
        &self.generator
    }

    /// Shader for every variant the config requests (or a cached one).
    pub fn get_or_generate(&mut self, config: &ShaderConfig, platform: PlatformFlags) -> Result<Arc<GeneratedShader>> {
        let config = config.propagated();
        let variants = config.requested_variants();
        self.get_or_generate_variants(&config, platform, &variants)
    }

    /// Shader for an explicit variant set (or a cached one).
    pub fn get_or_generate_variants(
        &mut self,
        config: &ShaderConfig,
        platform: PlatformFlags,
        variants: &[VertexDataFlags],
    ) -> Result<Arc<GeneratedShader>> {
        let config = config.propagated();
        let key = ShaderKey {
            descriptor: config.create_description_txt(),
            dialect: Dialect::from_platform(platform),
            variants: variants.iter().copied().collect(),
        };

        if let Some(shader) = self.shader_cache.get(&key) {
            log::debug!("Shader cache hit for {} ({})", key.descriptor, key.dialect);
            return Ok(shader.clone());
        }

        let generated = self.generator.generate_variants(&config, platform, variants)?;
        let shader = self
            .source_cache
            .entry(generated.hash)
            .or_insert_with(|| Arc::new(generated))
            .clone();
        self.shader_cache.insert(key, shader.clone());
        Ok(shader)
    }

    /// Number of distinct requests cached.
    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shader_cache.len()
    }

    /// Number of distinct sources cached.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.source_cache.len()
    }

    pub fn clear(&mut self) {
        self.shader_cache.clear();
        self.source_cache.clear();
    }
}
