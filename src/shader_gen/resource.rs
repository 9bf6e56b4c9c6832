//! Resource Bindings
//!
//! Textures, samplers and buffers a feature reads. HLSL and GLSL declare them
//! at file scope with explicit registers; Metal passes them as attributed
//! entry-point arguments. Slot indices come from the per-call `Context`.

use std::borrow::Cow;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::dialect::{Dialect, SlotClass};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture2D,
    DepthTexture2D,
    Sampler,
    ComparisonSampler,
    /// Read-only array of the named element type.
    StructuredBuffer(Cow<'static, str>),
    /// Single constant block of the named type.
    Uniform(Cow<'static, str>),
}

impl ResourceKind {
    #[must_use]
    pub fn slot_class(&self, dialect: Dialect) -> SlotClass {
        match (self, dialect) {
            (Self::Texture2D | Self::DepthTexture2D, _) => SlotClass::Texture,
            (Self::Sampler | Self::ComparisonSampler, _) => SlotClass::Sampler,
            (Self::StructuredBuffer(_), _) | (Self::Uniform(_), Dialect::Metal) => SlotClass::Buffer,
            (Self::Uniform(_), _) => SlotClass::Uniform,
        }
    }

    #[must_use]
    pub fn is_supported(&self, dialect: Dialect) -> bool {
        !(dialect == Dialect::Metal && matches!(self, Self::ComparisonSampler))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceBinding {
    name: Cow<'static, str>,
    kind: ResourceKind,
}

impl ResourceBinding {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    #[must_use]
    pub fn texture(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::Texture2D)
    }

    #[must_use]
    pub fn depth_texture(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::DepthTexture2D)
    }

    #[must_use]
    pub fn sampler(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::Sampler)
    }

    #[must_use]
    pub fn comparison_sampler(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::ComparisonSampler)
    }

    #[must_use]
    pub fn structured_buffer(name: impl Into<Cow<'static, str>>, element: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::StructuredBuffer(element.into()))
    }

    #[must_use]
    pub fn uniform(name: impl Into<Cow<'static, str>>, ty: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResourceKind::Uniform(ty.into()))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// File-scope statement (HLSL, GLSL) or entry-point argument (Metal).
    pub fn declaration(&self, dialect: Dialect, slot: u32) -> Result<String> {
        let name = &self.name;
        let text = match (dialect, &self.kind) {
            (Dialect::Hlsl, ResourceKind::Texture2D) => format!("Texture2D<float4> {name} : register(t{slot});\n"),
            (Dialect::Hlsl, ResourceKind::DepthTexture2D) => format!("Texture2D<float> {name} : register(t{slot});\n"),
            (Dialect::Hlsl, ResourceKind::Sampler) => format!("SamplerState {name} : register(s{slot});\n"),
            (Dialect::Hlsl, ResourceKind::ComparisonSampler) => {
                format!("SamplerComparisonState {name} : register(s{slot});\n")
            }
            // Structured buffers live in space1 so they never alias texture registers.
            (Dialect::Hlsl, ResourceKind::StructuredBuffer(ty)) => {
                format!("StructuredBuffer<{ty}> {name} : register(t{slot}, space1);\n")
            }
            (Dialect::Hlsl, ResourceKind::Uniform(ty)) => format!("ConstantBuffer<{ty}> {name} : register(b{slot});\n"),

            (Dialect::Glsl, ResourceKind::Texture2D | ResourceKind::DepthTexture2D) => {
                format!("layout(set = 0, binding = {slot}) uniform texture2D {name};\n")
            }
            (Dialect::Glsl, ResourceKind::Sampler) => format!("layout(set = 1, binding = {slot}) uniform sampler {name};\n"),
            (Dialect::Glsl, ResourceKind::ComparisonSampler) => {
                format!("layout(set = 1, binding = {slot}) uniform samplerShadow {name};\n")
            }
            (Dialect::Glsl, ResourceKind::StructuredBuffer(ty)) => {
                format!("layout(std430, set = 2, binding = {slot}) readonly buffer {name}Block {{ {ty} {name}[]; }};\n")
            }
            (Dialect::Glsl, ResourceKind::Uniform(ty)) => {
                format!("layout(std140, set = 3, binding = {slot}) uniform {name}Block {{ {ty} {name}; }};\n")
            }

            (Dialect::Metal, ResourceKind::Texture2D) => format!("texture2d<float> {name} [[texture({slot})]]"),
            (Dialect::Metal, ResourceKind::DepthTexture2D) => format!("depth2d<float> {name} [[texture({slot})]]"),
            (Dialect::Metal, ResourceKind::Sampler) => format!("sampler {name} [[sampler({slot})]]"),
            (Dialect::Metal, ResourceKind::StructuredBuffer(ty)) => format!("constant {ty}* {name} [[buffer({slot})]]"),
            (Dialect::Metal, ResourceKind::Uniform(ty)) => format!("constant {ty}& {name} [[buffer({slot})]]"),
            (Dialect::Metal, ResourceKind::ComparisonSampler) => {
                return Err(TesseraError::Unsupported {
                    dialect,
                    what: format!("comparison sampler `{name}`"),
                });
            }
        };
        Ok(text)
    }
}
