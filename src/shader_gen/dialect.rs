//! Target Dialects
//!
//! Maps platform capability flags to a shading-language dialect and owns every
//! spelling difference between HLSL, Metal and GLSL that the generator needs:
//! type names, literals, cast syntax, texture sampling and binding-slot limits.

use std::fmt;

use bitflags::bitflags;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::variable::{BaseType, TensorType, Variable};

bitflags! {
    /// Graphics backends available on the running platform.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PlatformFlags: u32 {
        const DIRECT3D  = 1 << 0;
        const METAL     = 1 << 1;
        const VULKAN    = 1 << 2;
        const OPENGL    = 1 << 3;
        const OPENGL_ES = 1 << 4;
    }
}

/// Shading language emitted by a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    Hlsl,
    Metal,
    Glsl,
}

/// Binding-slot namespace a resource consumes in a dialect's binding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotClass {
    Texture,
    Sampler,
    Buffer,
    Uniform,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hlsl => "HLSL",
            Self::Metal => "Metal",
            Self::Glsl => "GLSL",
        })
    }
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Hlsl, Dialect::Metal, Dialect::Glsl];

    /// Direct3D selects HLSL, Metal selects Metal, anything else falls back to GLSL.
    #[must_use]
    pub fn from_platform(flags: PlatformFlags) -> Self {
        if flags.contains(PlatformFlags::DIRECT3D) {
            Self::Hlsl
        } else if flags.contains(PlatformFlags::METAL) {
            Self::Metal
        } else {
            Self::Glsl
        }
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// File extension of legacy template sources for this dialect.
    #[must_use]
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Hlsl => "hlsl",
            Self::Metal => "metal",
            Self::Glsl => "glsl",
        }
    }

    /// Text that must open every generated file.
    #[must_use]
    pub fn preamble(self) -> &'static str {
        match self {
            Self::Hlsl => "",
            Self::Metal => "#include <metal_stdlib>\nusing namespace metal;\n",
            Self::Glsl => "#version 450\n",
        }
    }

    #[must_use]
    pub fn scalar_name(self, base: BaseType) -> &'static str {
        match (self, base) {
            (_, BaseType::Bool) => "bool",
            (_, BaseType::Int) => "int",
            (_, BaseType::Uint) => "uint",
            (Self::Glsl, BaseType::Half) | (_, BaseType::Float) => "float",
            (_, BaseType::Half) => "half",
        }
    }

    fn glsl_vector_prefix(base: BaseType) -> &'static str {
        match base {
            BaseType::Bool => "bvec",
            BaseType::Int => "ivec",
            BaseType::Uint => "uvec",
            BaseType::Float | BaseType::Half => "vec",
        }
    }

    /// Spells a vector of `size` components; a size of one spells the scalar.
    #[must_use]
    pub fn vector_name(self, base: BaseType, size: u8) -> String {
        match (self, size) {
            (_, 1) => self.scalar_name(base).to_string(),
            (Self::Glsl, _) => format!("{}{size}", Self::glsl_vector_prefix(base)),
            _ => format!("{}{size}", self.scalar_name(base)),
        }
    }

    /// Spells the declared type of `var` in this dialect.
    pub fn type_name(self, var: &Variable) -> Result<String> {
        let base = var.base_type();
        let (x, y) = (var.size_x(), var.size_y());

        match var.tensor_type() {
            TensorType::Scalar => Ok(self.scalar_name(base).to_string()),
            TensorType::Vector => Ok(self.vector_name(base, x)),
            TensorType::Matrix => {
                if self != Self::Hlsl && !base.is_floating_point() {
                    return Err(TesseraError::Unsupported {
                        dialect: self,
                        what: format!("{base:?} matrix `{}`", var.name()),
                    });
                }
                Ok(match self {
                    // HLSL spells rows x columns, Metal columns x rows.
                    Self::Hlsl => format!("{}{y}x{x}", self.scalar_name(base)),
                    Self::Metal => format!("{}{x}x{y}", self.scalar_name(base)),
                    Self::Glsl if x == y => format!("mat{x}"),
                    Self::Glsl => format!("mat{x}x{y}"),
                })
            }
        }
    }

    /// Literal used to pad widened vectors.
    #[must_use]
    pub fn padding_literal(self, base: BaseType, one: bool) -> &'static str {
        match (base, one) {
            (BaseType::Bool, true) => "true",
            (BaseType::Bool, false) => "false",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Literal spelled in the exact scalar type, for ternaries.
    #[must_use]
    pub fn typed_literal(self, base: BaseType, one: bool) -> &'static str {
        match (self, base, one) {
            (_, BaseType::Bool, true) => "true",
            (_, BaseType::Bool, false) => "false",
            (_, BaseType::Int, true) => "1",
            (_, BaseType::Int, false) => "0",
            (_, BaseType::Uint, true) => "1u",
            (_, BaseType::Uint, false) => "0u",
            (Self::Glsl, BaseType::Half, true) | (_, BaseType::Float, true) => "1.0",
            (Self::Glsl, BaseType::Half, false) | (_, BaseType::Float, false) => "0.0",
            (_, BaseType::Half, true) => "1.0h",
            (_, BaseType::Half, false) => "0.0h",
        }
    }

    /// Explicit scalar conversion of `expr` to `base`.
    #[must_use]
    pub fn scalar_cast(self, base: BaseType, expr: &str) -> String {
        let ty = self.scalar_name(base);
        match self {
            Self::Hlsl => format!("({ty})({expr})"),
            Self::Metal => format!("static_cast<{ty}>({expr})"),
            Self::Glsl => format!("{ty}({expr})"),
        }
    }

    /// Samples a 2D texture through a separate sampler object.
    #[must_use]
    pub fn sample(self, texture: &str, sampler: &str, uv: &str) -> String {
        match self {
            Self::Hlsl => format!("{texture}.Sample({sampler}, {uv})"),
            Self::Metal => format!("{texture}.sample({sampler}, {uv})"),
            Self::Glsl => format!("texture(sampler2D({texture}, {sampler}), {uv})"),
        }
    }

    /// Depth-compare sample of a shadow map.
    pub fn sample_compare(self, texture: &str, sampler: &str, uv: &str, depth: &str) -> Result<String> {
        match self {
            Self::Hlsl => Ok(format!("{texture}.SampleCmpLevelZero({sampler}, {uv}, {depth})")),
            Self::Glsl => Ok(format!(
                "texture(sampler2DShadow({texture}, {sampler}), vec3({uv}, {depth}))"
            )),
            Self::Metal => Err(TesseraError::Unsupported {
                dialect: self,
                what: "depth-compare sampling".to_string(),
            }),
        }
    }

    /// Upper bound (exclusive) of slot indices per class.
    #[must_use]
    pub fn max_slots(self, class: SlotClass) -> u32 {
        match (self, class) {
            (Self::Hlsl, SlotClass::Texture) => 128,
            (Self::Hlsl, SlotClass::Sampler) => 16,
            (Self::Hlsl, SlotClass::Buffer) => 64,
            (Self::Hlsl, SlotClass::Uniform) => 14,
            (Self::Metal, SlotClass::Texture | SlotClass::Buffer) => 31,
            (Self::Metal, SlotClass::Sampler) => 16,
            // Metal binds uniforms through the buffer table.
            (Self::Metal, SlotClass::Uniform) => 0,
            (Self::Glsl, SlotClass::Texture | SlotClass::Sampler) => 16,
            (Self::Glsl, SlotClass::Buffer) => 8,
            (Self::Glsl, SlotClass::Uniform) => 12,
        }
    }
}
