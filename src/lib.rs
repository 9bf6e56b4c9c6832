#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Tessera generates HLSL, Metal and GLSL pixel shader source from a
//! compact, serializable configuration.

pub mod errors;
pub mod shader_gen;
pub mod utils;

pub use errors::{Result, TesseraError};
pub use shader_gen::{
    Dialect, Feature, FeatureLibrary, GeneratedShader, PlatformFlags, ShaderConfig, ShaderGenerator, ShaderManager,
    VertexDataFlags,
};
pub use utils::interner;
