//! Shader Variants
//!
//! One [`Variant`] is one pixel entry point, specialised for a set of
//! vertex-output structures. It owns the function-local namespace (variables
//! and features already emitted) and the text of the entry-point body.

use std::fmt::Write as _;

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{Result, TesseraError};
use crate::shader_gen::context::Context;
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::Dialect;
use crate::shader_gen::resource::ResourceBinding;
use crate::shader_gen::variable::{BaseType, CastPadding, Variable};
use crate::utils::interner::{self, Symbol};

/// Base name of every generated pixel entry point.
pub const MAIN_PIXEL_NAME: &str = "MainPixel";

/// Local that every entry point returns.
pub const RESULT_VARIABLE: &str = "albedo";

bitflags! {
    /// Vertex-output structures available to a variant. `BASIC` is always set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct VertexDataFlags: u32 {
        const BASIC        = 1 << 0;
        const EXTENDED     = 1 << 1;
        const BLEND_SHAPES = 1 << 2;
        const ANIMATIONS   = 1 << 3;
    }
}

impl Default for VertexDataFlags {
    fn default() -> Self {
        Self::BASIC
    }
}

/// One member of a vertex-output structure and the local it feeds.
#[derive(Debug, Clone, Copy)]
pub struct StageField {
    pub field: &'static str,
    pub local: &'static str,
    pub base: BaseType,
    pub size: u8,
    pub semantic: &'static str,
    pub metal_attribute: Option<&'static str>,
    pub padding: CastPadding,
}

/// A vertex-output structure passed into the pixel stage.
#[derive(Debug, Clone, Copy)]
pub struct StageStruct {
    pub flag: VertexDataFlags,
    pub type_name: &'static str,
    pub param: &'static str,
    /// Appended to the entry-point name of variants that read this struct.
    pub suffix: &'static str,
    pub fields: &'static [StageField],
}

const fn field(
    field: &'static str,
    local: &'static str,
    size: u8,
    semantic: &'static str,
    padding: CastPadding,
) -> StageField {
    StageField {
        field,
        local,
        base: BaseType::Float,
        size,
        semantic,
        metal_attribute: None,
        padding,
    }
}

pub static STAGE_STRUCTS: [StageStruct; 4] = [
    StageStruct {
        flag: VertexDataFlags::BASIC,
        type_name: "VertexOutputBasic",
        param: "vBasic",
        suffix: "",
        fields: &[
            StageField {
                metal_attribute: Some("[[position]]"),
                ..field("position", "fragCoord", 4, "SV_Position", CastPadding::ZeroOrFalse)
            },
            // Positions are points: a widened w must be one.
            field("worldPosition", "worldPosition", 3, "POSITION1", CastPadding::OneOrTrue),
            field("normal", "normal", 3, "NORMAL", CastPadding::ZeroOrFalse),
            field("uv", "uv", 2, "TEXCOORD0", CastPadding::ZeroOrFalse),
            field("color", "vertexColor", 4, "COLOR0", CastPadding::ZeroOrFalse),
        ],
    },
    StageStruct {
        flag: VertexDataFlags::EXTENDED,
        type_name: "VertexOutputExtended",
        param: "vExtended",
        suffix: "Extended",
        fields: &[
            field("tangent", "tangent", 4, "TANGENT", CastPadding::ZeroOrFalse),
            field("uv1", "lightMapUv", 2, "TEXCOORD1", CastPadding::ZeroOrFalse),
        ],
    },
    StageStruct {
        flag: VertexDataFlags::BLEND_SHAPES,
        type_name: "VertexOutputBlendShapes",
        param: "vBlendShapes",
        suffix: "BlendShapes",
        fields: &[field("blendNormal", "blendNormal", 3, "NORMAL1", CastPadding::ZeroOrFalse)],
    },
    StageStruct {
        flag: VertexDataFlags::ANIMATIONS,
        type_name: "VertexOutputAnimations",
        param: "vAnimations",
        suffix: "Animations",
        fields: &[field("skinnedNormal", "skinnedNormal", 3, "NORMAL2", CastPadding::ZeroOrFalse)],
    },
];

impl StageField {
    /// The struct member as read through the entry-point parameter.
    #[must_use]
    pub fn source_variable(&self, param: &str) -> Variable {
        Variable::vector(format!("{param}.{}", self.field), self.base, self.size, false)
    }
}

impl StageStruct {
    #[must_use]
    pub fn for_flag(flag: VertexDataFlags) -> Option<&'static StageStruct> {
        STAGE_STRUCTS.iter().find(|s| s.flag == flag)
    }

    /// Type declaration of the struct in `dialect`.
    #[must_use]
    pub fn declaration(&self, dialect: Dialect) -> CodeDeclaration {
        let mut code = format!("struct {}\n{{\n", self.type_name);
        for f in self.fields {
            let ty = dialect.vector_name(f.base, f.size);
            let _ = match (dialect, f.metal_attribute) {
                (Dialect::Hlsl, _) => writeln!(code, "    {ty} {} : {};", f.field, f.semantic),
                (Dialect::Metal, Some(attr)) => writeln!(code, "    {ty} {} {attr};", f.field),
                _ => writeln!(code, "    {ty} {};", f.field),
            };
        }
        code.push_str("};\n");
        CodeDeclaration::new(self.type_name, code)
    }
}

/// Entry-point name for a variant: `base` plus the suffix of every extra struct.
#[must_use]
pub fn entry_point_name(base: &str, flags: VertexDataFlags) -> String {
    let mut name = base.to_string();
    for stage in &STAGE_STRUCTS {
        if flags.contains(stage.flag) {
            name.push_str(stage.suffix);
        }
    }
    name
}

#[derive(Debug)]
pub struct Variant {
    vertex_data_flags: VertexDataFlags,
    local_declarations: FxHashMap<Symbol, Variable>,
    local_features: FxHashSet<Symbol>,
    local_arguments: FxHashSet<Symbol>,

    pub(crate) code_buffer: String,
    header_buffer: String,
    arguments_buffer: String,
}

impl Variant {
    #[must_use]
    pub fn new(flags: VertexDataFlags) -> Self {
        Self {
            vertex_data_flags: flags | VertexDataFlags::BASIC,
            local_declarations: FxHashMap::default(),
            local_features: FxHashSet::default(),
            local_arguments: FxHashSet::default(),
            code_buffer: String::with_capacity(1024),
            header_buffer: String::new(),
            arguments_buffer: String::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> VertexDataFlags {
        self.vertex_data_flags
    }

    #[must_use]
    pub fn entry_point_name(&self) -> String {
        entry_point_name(MAIN_PIXEL_NAME, self.vertex_data_flags)
    }

    #[must_use]
    pub fn local_declaration(&self, name: &str) -> Option<&Variable> {
        interner::get(name).and_then(|sym| self.local_declarations.get(&sym))
    }

    #[must_use]
    pub fn has_local_declaration(&self, name: &str) -> bool {
        self.local_declaration(name).is_some()
    }

    /// Returns false if a variable of that name was already in scope.
    pub fn register_local_declaration(&mut self, var: &Variable) -> bool {
        let sym = interner::intern(var.name());
        if self.local_declarations.contains_key(&sym) {
            return false;
        }
        self.local_declarations.insert(sym, var.clone());
        true
    }

    #[must_use]
    pub fn has_local_feature(&self, name: &str) -> bool {
        interner::get(name).is_some_and(|sym| self.local_features.contains(&sym))
    }

    pub fn register_local_feature(&mut self, name: &str) -> bool {
        self.local_features.insert(interner::intern(name))
    }

    /// Appends an entry-point argument once per name.
    pub fn add_argument(&mut self, name: &str, text: &str) -> bool {
        if !self.local_arguments.insert(interner::intern(name)) {
            return false;
        }
        self.arguments_buffer.push_str(",\n    ");
        self.arguments_buffer.push_str(text);
        true
    }

    /// Finds the stage-struct member that feeds the local `name`, if this
    /// variant carries that struct.
    #[must_use]
    pub fn stage_input(&self, name: &str) -> Option<(&'static StageStruct, &'static StageField)> {
        STAGE_STRUCTS
            .iter()
            .filter(|stage| self.vertex_data_flags.contains(stage.flag))
            .find_map(|stage| stage.fields.iter().find(|f| f.local == name).map(|f| (stage, f)))
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code_buffer
    }

    /// Wraps the accumulated body into the entry-point function and appends it
    /// to `dst`. Returns the entry-point name.
    pub fn write_function_main_pixel(&mut self, ctx: &mut Context, dst: &mut String) -> Result<String> {
        let dialect = ctx.dialect();
        let name = self.entry_point_name();

        for stage in STAGE_STRUCTS.iter().filter(|s| self.vertex_data_flags.contains(s.flag)) {
            if !ctx.has_global_declaration(stage.type_name) {
                log::error!("`{name}` needs `{}`, which was never declared", stage.type_name);
                return Err(TesseraError::MissingVertexOutput {
                    variant: name,
                    declaration: stage.type_name.to_string(),
                });
            }
        }

        if !self.has_local_declaration(RESULT_VARIABLE) {
            return Err(TesseraError::UnresolvedInput {
                feature: name,
                variable: RESULT_VARIABLE.to_string(),
            });
        }

        let mut params = Vec::with_capacity(STAGE_STRUCTS.len());
        for stage in STAGE_STRUCTS.iter().filter(|s| self.vertex_data_flags.contains(s.flag)) {
            let param = match dialect {
                Dialect::Metal if stage.flag == VertexDataFlags::BASIC => {
                    format!("{} {} [[stage_in]]", stage.type_name, stage.param)
                }
                Dialect::Metal => {
                    let binding = ResourceBinding::uniform(stage.param, stage.type_name);
                    let slot = ctx.bind_resource(&binding)?;
                    binding.declaration(dialect, slot)?
                }
                Dialect::Hlsl | Dialect::Glsl => format!("in {} {}", stage.type_name, stage.param),
            };
            params.push(param);
        }

        self.header_buffer.clear();
        let _ = match dialect {
            Dialect::Hlsl => write!(self.header_buffer, "float4 {name}("),
            Dialect::Metal => write!(self.header_buffer, "fragment float4 {name}("),
            Dialect::Glsl => write!(self.header_buffer, "vec4 {name}("),
        };
        self.header_buffer.push_str(&params.join(", "));
        self.header_buffer.push_str(&self.arguments_buffer);
        self.header_buffer.push(')');
        if dialect == Dialect::Hlsl {
            self.header_buffer.push_str(" : SV_Target");
        }
        self.header_buffer.push_str("\n{\n");

        dst.push_str(&self.header_buffer);
        dst.push_str(&self.code_buffer);
        let _ = writeln!(dst, "    return {RESULT_VARIABLE};\n}}\n");
        Ok(name)
    }
}
