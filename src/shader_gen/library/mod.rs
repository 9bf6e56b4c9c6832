//! Feature Library
//!
//! Named feature templates for one dialect. The built-in libraries are built
//! lazily, once per dialect, and never change afterwards; custom libraries can
//! be assembled with [`FeatureLibrary::new`] and [`FeatureLibrary::insert`].

mod lighting;
mod surface;

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::config::{AlbedoColor, IndirectResolution, LightingModel, SamplerFilter};
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::Dialect;
use crate::shader_gen::feature::Feature;
use crate::shader_gen::variable::BaseType;

/// Names of the built-in features.
pub mod names {
    use super::{AlbedoColor, IndirectResolution, LightingModel, SamplerFilter};

    pub const STAGE_BASIC: &str = "StageBasic";
    pub const STAGE_EXTENDED: &str = "StageExtended";
    pub const STAGE_BLEND_SHAPES: &str = "StageBlendShapes";
    pub const STAGE_ANIMATIONS: &str = "StageAnimations";

    pub const FRAME_UNIFORMS: &str = "FrameUniforms";
    pub const ALBEDO_VERTEX_COLOR: &str = "AlbedoVertexColor";
    pub const BLEND_SHAPE_NORMAL: &str = "BlendShapeNormal";
    pub const SKINNED_NORMAL: &str = "SkinnedNormal";

    pub const LIGHTING_INIT: &str = "LightingInit";
    pub const AMBIENT_LIGHT: &str = "AmbientLight";
    pub const LIGHT_MAP: &str = "LightMap";
    pub const LIGHT_DATA: &str = "LightData";
    pub const APPLY_LIGHTING: &str = "ApplyLighting";

    #[must_use]
    pub fn albedo_color(color: AlbedoColor) -> String {
        format!("AlbedoColor{color}")
    }

    #[must_use]
    pub fn albedo_texture(sampler: SamplerFilter) -> String {
        format!("AlbedoTexture{sampler}")
    }

    #[must_use]
    pub fn parallax(sampler: SamplerFilter) -> String {
        format!("Parallax{sampler}")
    }

    #[must_use]
    pub fn normal_map(sampler: SamplerFilter) -> String {
        format!("NormalMap{sampler}")
    }

    #[must_use]
    pub fn shadow_map_pcf(kernel: u8) -> String {
        format!("ShadowMapPcf{kernel}")
    }

    #[must_use]
    pub fn light_sources(model: LightingModel, shadowed: bool) -> String {
        if shadowed {
            format!("LightSourcesShadowed{model}")
        } else {
            format!("LightSources{model}")
        }
    }

    #[must_use]
    pub fn indirect_light(resolution: IndirectResolution) -> String {
        format!("IndirectLight{resolution}")
    }
}

#[derive(Debug)]
pub struct FeatureLibrary {
    dialect: Dialect,
    features: FxHashMap<String, Feature>,
    unsupported: FxHashMap<String, String>,
}

static BUILTIN: [OnceLock<FeatureLibrary>; 3] = [OnceLock::new(), OnceLock::new(), OnceLock::new()];

impl FeatureLibrary {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            features: FxHashMap::default(),
            unsupported: FxHashMap::default(),
        }
    }

    /// The built-in library for `dialect`.
    pub fn builtin(dialect: Dialect) -> &'static FeatureLibrary {
        BUILTIN[dialect.index()].get_or_init(|| {
            let mut library = Self::new(dialect);
            surface::register(&mut library);
            lighting::register(&mut library);
            log::debug!("Built {dialect} feature library ({} features)", library.len());
            library
        })
    }

    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Adds a feature, returning the one it replaced.
    pub fn insert(&mut self, feature: Feature) -> Option<Feature> {
        self.features.insert(feature.name().to_string(), feature)
    }

    /// Records that `name` cannot be expressed in this dialect.
    pub fn mark_unsupported(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        let name = name.into();
        self.features.remove(&name);
        self.unsupported.insert(name, reason.into());
    }

    pub fn get(&self, name: &str) -> Result<&Feature> {
        if let Some(feature) = self.features.get(name) {
            return Ok(feature);
        }
        if let Some(reason) = self.unsupported.get(name) {
            log::error!("Feature `{name}` is not available for {}: {reason}", self.dialect);
            return Err(TesseraError::Unsupported {
                dialect: self.dialect,
                what: format!("feature `{name}` ({reason})"),
            });
        }
        log::error!("Unknown feature `{name}`");
        Err(TesseraError::UnknownFeature(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    #[must_use]
    pub fn is_unsupported(&self, name: &str) -> bool {
        self.unsupported.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

// Snippet helpers shared by the built-in features.

fn float_n(dialect: Dialect, n: u8) -> String {
    dialect.vector_name(BaseType::Float, n)
}

fn insert(name: &str, code: String, vars: &[&str]) -> CodeDeclaration {
    CodeDeclaration::templated(
        name.to_string(),
        code,
        vars.iter().map(|v| format!("{{{{{v}}}}}")).collect::<Vec<_>>(),
    )
}

fn mul(dialect: Dialect, matrix: &str, vector: &str) -> String {
    match dialect {
        Dialect::Hlsl => format!("mul({matrix}, {vector})"),
        Dialect::Metal | Dialect::Glsl => format!("{matrix} * {vector}"),
    }
}

fn sampler_name(filter: SamplerFilter) -> String {
    format!("sampler{filter}")
}
