//! Shader Source Generation
//!
//! Pixel shaders are assembled from [`Feature`]s: typed units of shading
//! behaviour that contribute global types, resources and functions plus a
//! snippet inserted into each entry point. A [`Context`] owns the global
//! namespace of one generation call and deduplicates declarations; each
//! [`Variant`] owns the local namespace of one entry point.
//!
//! Typical flow:
//!
//! 1. [`ShaderConfig`] selects features (and round-trips through a descriptor string)
//! 2. [`ShaderGenerator`] resolves them through the [`FeatureGraph`]
//! 3. every feature is emitted into every variant that can host it
//! 4. the result is a [`GeneratedShader`], optionally cached by a [`ShaderManager`]

pub mod config;
pub mod context;
pub mod declaration;
pub mod dialect;
pub mod feature;
pub mod generator;
pub mod graph;
pub mod library;
pub mod manager;
pub mod resource;
pub mod templates;
pub mod variable;
pub mod variant;

pub use config::{
    AlbedoColor, AlbedoConfig, AlbedoSource, IndirectResolution, LightingConfig, LightingModel, NormalsConfig,
    SamplerFilter, ShaderConfig, VertexConfig,
};
pub use context::{CodeTarget, Context, DeclarationKind, SlotCounters};
pub use declaration::CodeDeclaration;
pub use dialect::{Dialect, PlatformFlags, SlotClass};
pub use feature::{Feature, FeatureBuilder, VariableCategory};
pub use generator::{GeneratedShader, ShaderGenerator};
pub use graph::FeatureGraph;
pub use library::FeatureLibrary;
pub use manager::{ShaderKey, ShaderManager};
pub use resource::{ResourceBinding, ResourceKind};
pub use templates::{FeatureDefines, TemplateCache, rewrite_feature_defines};
pub use variable::{BaseType, CastPadding, TensorType, Variable};
pub use variant::{Variant, VertexDataFlags};
