//! Generation Context
//!
//! Mutable state of a single generation call: the global namespace of type,
//! function and resource declarations, the output buffers they are written
//! into, binding-slot counters and the variant currently being assembled.
//! A context is never shared between calls.

use rustc_hash::FxHashMap;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::{Dialect, SlotClass};
use crate::shader_gen::resource::ResourceBinding;
use crate::shader_gen::variant::{Variant, VertexDataFlags};
use crate::utils::interner::{self, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Type,
    Function,
    Resource,
}

/// Buffer a declaration is emitted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTarget {
    Types,
    Resources,
    Functions,
    /// Body of the current variant's entry point.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GlobalDeclaration {
    kind: DeclarationKind,
    content_hash: u64,
}

/// Next free slot index per binding class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotCounters {
    pub bound_texture_idx: u32,
    pub bound_sampler_idx: u32,
    pub bound_buffer_idx: u32,
    pub bound_uniforms_idx: u32,
}

impl SlotCounters {
    fn counter_mut(&mut self, class: SlotClass) -> &mut u32 {
        match class {
            SlotClass::Texture => &mut self.bound_texture_idx,
            SlotClass::Sampler => &mut self.bound_sampler_idx,
            SlotClass::Buffer => &mut self.bound_buffer_idx,
            SlotClass::Uniform => &mut self.bound_uniforms_idx,
        }
    }
}

#[derive(Debug)]
pub struct Context {
    dialect: Dialect,
    global_declarations: FxHashMap<Symbol, GlobalDeclaration>,
    bound_resources: FxHashMap<Symbol, (ResourceBinding, u32)>,
    slots: SlotCounters,

    types_code: String,
    resources_code: String,
    functions_code: String,
    entry_points_code: String,
    scratch: String,

    variant: Option<Variant>,
}

impl Context {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            global_declarations: FxHashMap::default(),
            bound_resources: FxHashMap::default(),
            slots: SlotCounters::default(),
            types_code: String::with_capacity(2048),
            resources_code: String::with_capacity(512),
            functions_code: String::with_capacity(2048),
            entry_points_code: String::with_capacity(2048),
            scratch: String::with_capacity(256),
            variant: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[inline]
    #[must_use]
    pub fn slot_counters(&self) -> SlotCounters {
        self.slots
    }

    // === Global namespace ===

    #[must_use]
    pub fn has_global_declaration(&self, name: &str) -> bool {
        self.global_declaration_hash(name).is_some()
    }

    /// Content hash of the declaration registered under `name`.
    #[must_use]
    pub fn global_declaration_hash(&self, name: &str) -> Option<u64> {
        let sym = interner::get(name)?;
        self.global_declarations.get(&sym).map(|d| d.content_hash)
    }

    #[must_use]
    pub fn global_declaration_kind(&self, name: &str) -> Option<DeclarationKind> {
        let sym = interner::get(name)?;
        self.global_declarations.get(&sym).map(|d| d.kind)
    }

    /// Returns false if the name was already taken.
    pub fn register_type_declaration(&mut self, name: &str, content_hash: u64) -> bool {
        self.register_global(DeclarationKind::Type, name, content_hash)
    }

    /// Returns false if the name was already taken.
    pub fn register_function_declaration(&mut self, name: &str, content_hash: u64) -> bool {
        self.register_global(DeclarationKind::Function, name, content_hash)
    }

    pub(crate) fn register_global(&mut self, kind: DeclarationKind, name: &str, content_hash: u64) -> bool {
        let sym = interner::intern(name);
        if self.global_declarations.contains_key(&sym) {
            return false;
        }
        self.global_declarations.insert(sym, GlobalDeclaration { kind, content_hash });
        true
    }

    // === Binding slots ===

    /// Slot index of `binding`, allocating the next free one on first use.
    ///
    /// Rebinding a name with a different kind is a conflict.
    pub fn bind_resource(&mut self, binding: &ResourceBinding) -> Result<u32> {
        let sym = interner::intern(binding.name());
        if let Some((existing, slot)) = self.bound_resources.get(&sym) {
            if existing.kind() != binding.kind() {
                log::error!(
                    "Resource `{}` bound as {:?} and {:?}",
                    binding.name(),
                    existing.kind(),
                    binding.kind()
                );
                return Err(TesseraError::DeclarationConflict(binding.name().to_string()));
            }
            return Ok(*slot);
        }

        let class = binding.kind().slot_class(self.dialect);
        let max = self.dialect.max_slots(class);
        let counter = self.slots.counter_mut(class);
        if *counter >= max {
            log::error!("{} {class:?} slots exhausted binding `{}`", self.dialect, binding.name());
            return Err(TesseraError::SlotsExhausted {
                dialect: self.dialect,
                class,
                max,
            });
        }
        let slot = *counter;
        *counter += 1;

        self.bound_resources.insert(sym, (binding.clone(), slot));
        Ok(slot)
    }

    // === Emission ===

    /// Writes `decl` into `target`, substituting `replacements` if templated.
    pub fn emit(&mut self, target: CodeTarget, decl: &CodeDeclaration, replacements: &[&str]) -> Result<()> {
        let dst = match target {
            CodeTarget::Types => &mut self.types_code,
            CodeTarget::Resources => &mut self.resources_code,
            CodeTarget::Functions => &mut self.functions_code,
            CodeTarget::Local => match self.variant.as_mut() {
                Some(variant) => &mut variant.code_buffer,
                None => return Err(TesseraError::NoActiveVariant),
            },
        };
        decl.create_code(dst, &mut self.scratch, replacements)?;
        if matches!(target, CodeTarget::Types | CodeTarget::Functions) {
            dst.push('\n');
        }
        Ok(())
    }

    pub(crate) fn push_resource_line(&mut self, text: &str) {
        self.resources_code.push_str(text);
    }

    #[must_use]
    pub fn types_code(&self) -> &str {
        &self.types_code
    }

    #[must_use]
    pub fn resources_code(&self) -> &str {
        &self.resources_code
    }

    #[must_use]
    pub fn functions_code(&self) -> &str {
        &self.functions_code
    }

    // === Variants ===

    /// Starts a new variant; any unfinished one is discarded.
    pub fn begin_variant(&mut self, flags: VertexDataFlags) {
        if let Some(previous) = self.variant.replace(Variant::new(flags)) {
            log::warn!("Discarding unfinished variant {}", previous.entry_point_name());
        }
    }

    pub fn current_variant(&self) -> Result<&Variant> {
        self.variant.as_ref().ok_or(TesseraError::NoActiveVariant)
    }

    pub fn current_variant_mut(&mut self) -> Result<&mut Variant> {
        self.variant.as_mut().ok_or(TesseraError::NoActiveVariant)
    }

    /// Closes the current variant, appending its entry point to the output.
    /// Returns the entry-point name.
    pub fn finish_variant(&mut self) -> Result<String> {
        let mut variant = self.variant.take().ok_or(TesseraError::NoActiveVariant)?;
        let mut text = String::with_capacity(variant.code().len() + 256);
        let name = variant.write_function_main_pixel(self, &mut text)?;
        self.entry_points_code.push_str(&text);
        Ok(name)
    }

    /// Final source: preamble, a header comment, then types, resources,
    /// functions and entry points.
    #[must_use]
    pub fn assemble(&self, header: &str) -> String {
        let mut out = String::with_capacity(
            self.types_code.len()
                + self.resources_code.len()
                + self.functions_code.len()
                + self.entry_points_code.len()
                + 128,
        );
        out.push_str(self.dialect.preamble());
        out.push_str("// ");
        out.push_str(header);
        out.push_str("\n\n");
        out.push_str(&self.types_code);
        if !self.resources_code.is_empty() {
            out.push_str(&self.resources_code);
            out.push('\n');
        }
        out.push_str(&self.functions_code);
        out.push_str(&self.entry_points_code);
        out
    }
}
