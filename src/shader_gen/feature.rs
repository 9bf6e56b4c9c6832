//! Features
//!
//! A [`Feature`] is a unit of shading functionality: the variables it reads and
//! writes, the types, resources and functions it needs at file scope, and the
//! snippet it inserts into an entry point. Emitting a feature validates it
//! against the context's global namespace and the variant's local one.
//!
//! Library features are templates. A generation call clones them, which copies
//! the variable lists (so renames stay local) and shares the declarations.

use std::borrow::Cow;
use std::sync::Arc;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::context::{CodeTarget, Context, DeclarationKind};
use crate::shader_gen::declaration::CodeDeclaration;
use crate::shader_gen::dialect::Dialect;
use crate::shader_gen::resource::ResourceBinding;
use crate::shader_gen::variable::Variable;
use crate::shader_gen::variant::VertexDataFlags;

/// Where a variable sits in a feature's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableCategory {
    Input,
    Output,
    Internal,
}

#[derive(Debug, Clone)]
pub struct Feature {
    name: Cow<'static, str>,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    internals: Vec<Variable>,

    types_code: Arc<[Arc<CodeDeclaration>]>,
    resources: Arc<[ResourceBinding]>,
    functions_code: Arc<[Arc<CodeDeclaration>]>,
    insert_code: Option<Arc<CodeDeclaration>>,

    required_vertex_flags: VertexDataFlags,
    dependencies: Arc<[Cow<'static, str>]>,
}

/// Builder for [`Feature`].
#[derive(Debug, Default)]
pub struct FeatureBuilder {
    name: Cow<'static, str>,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    internals: Vec<Variable>,
    types_code: Vec<Arc<CodeDeclaration>>,
    resources: Vec<ResourceBinding>,
    functions_code: Vec<Arc<CodeDeclaration>>,
    insert_code: Option<Arc<CodeDeclaration>>,
    required_vertex_flags: VertexDataFlags,
    dependencies: Vec<Cow<'static, str>>,
}

impl FeatureBuilder {
    #[must_use]
    pub fn input(mut self, var: Variable) -> Self {
        self.inputs.push(var);
        self
    }

    #[must_use]
    pub fn output(mut self, var: Variable) -> Self {
        self.outputs.push(var);
        self
    }

    #[must_use]
    pub fn internal(mut self, var: Variable) -> Self {
        self.internals.push(var);
        self
    }

    #[must_use]
    pub fn types_code(mut self, decl: impl Into<Arc<CodeDeclaration>>) -> Self {
        self.types_code.push(decl.into());
        self
    }

    #[must_use]
    pub fn resource(mut self, binding: ResourceBinding) -> Self {
        self.resources.push(binding);
        self
    }

    #[must_use]
    pub fn functions_code(mut self, decl: impl Into<Arc<CodeDeclaration>>) -> Self {
        self.functions_code.push(decl.into());
        self
    }

    #[must_use]
    pub fn insert_code(mut self, decl: impl Into<Arc<CodeDeclaration>>) -> Self {
        self.insert_code = Some(decl.into());
        self
    }

    #[must_use]
    pub fn requires(mut self, flags: VertexDataFlags) -> Self {
        self.required_vertex_flags |= flags;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Feature {
        Feature {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            internals: self.internals,
            types_code: self.types_code.into(),
            resources: self.resources.into(),
            functions_code: self.functions_code.into(),
            insert_code: self.insert_code,
            required_vertex_flags: self.required_vertex_flags | VertexDataFlags::BASIC,
            dependencies: self.dependencies.into(),
        }
    }
}

impl Feature {
    #[must_use]
    pub fn builder(name: impl Into<Cow<'static, str>>) -> FeatureBuilder {
        FeatureBuilder {
            name: name.into(),
            ..FeatureBuilder::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[Variable] {
        &self.inputs
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[Variable] {
        &self.outputs
    }

    #[inline]
    #[must_use]
    pub fn internals(&self) -> &[Variable] {
        &self.internals
    }

    #[must_use]
    pub fn types_code(&self) -> &[Arc<CodeDeclaration>] {
        &self.types_code
    }

    #[must_use]
    pub fn resources(&self) -> &[ResourceBinding] {
        &self.resources
    }

    #[must_use]
    pub fn functions_code(&self) -> &[Arc<CodeDeclaration>] {
        &self.functions_code
    }

    #[must_use]
    pub fn insert_code(&self) -> Option<&CodeDeclaration> {
        self.insert_code.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn required_vertex_flags(&self) -> VertexDataFlags {
        self.required_vertex_flags
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Cow<'static, str>] {
        &self.dependencies
    }

    /// Whether a variant with `flags` provides everything this feature reads.
    #[must_use]
    pub fn is_available_for(&self, flags: VertexDataFlags) -> bool {
        flags.contains(self.required_vertex_flags)
    }

    /// Looks a variable up by name: inputs first, then outputs, then internals.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<(&Variable, VariableCategory)> {
        self.categorized().find(|(var, _)| var.name() == name)
    }

    pub fn get_variable_mut(&mut self, name: &str) -> Option<(&mut Variable, VariableCategory)> {
        let Self {
            inputs,
            outputs,
            internals,
            ..
        } = self;
        inputs
            .iter_mut()
            .map(|v| (v, VariableCategory::Input))
            .chain(outputs.iter_mut().map(|v| (v, VariableCategory::Output)))
            .chain(internals.iter_mut().map(|v| (v, VariableCategory::Internal)))
            .find(|(var, _)| var.name() == name)
    }

    /// Renames the value a variable binds to. Returns false if no variable is
    /// called `old`.
    pub fn rename_variable(&mut self, old: &str, new: impl Into<Cow<'static, str>>) -> bool {
        match self.get_variable_mut(old) {
            Some((var, _)) => {
                var.rename(new);
                true
            }
            None => false,
        }
    }

    fn categorized(&self) -> impl Iterator<Item = (&Variable, VariableCategory)> {
        self.inputs
            .iter()
            .map(|v| (v, VariableCategory::Input))
            .chain(self.outputs.iter().map(|v| (v, VariableCategory::Output)))
            .chain(self.internals.iter().map(|v| (v, VariableCategory::Internal)))
    }

    fn variable_for_token(&self, token: &str) -> Option<&Variable> {
        self.categorized()
            .map(|(var, _)| var)
            .find(|var| var.templated_name() == Some(token))
    }

    // === Emission ===

    pub fn create_types_code(&self, ctx: &mut Context) -> Result<()> {
        self.create_global_code(ctx, Context::register_type_declaration, CodeTarget::Types, &self.types_code)
    }

    pub fn create_functions_code(&self, ctx: &mut Context) -> Result<()> {
        self.create_global_code(
            ctx,
            Context::register_function_declaration,
            CodeTarget::Functions,
            &self.functions_code,
        )
    }

    fn create_global_code(
        &self,
        ctx: &mut Context,
        register: fn(&mut Context, &str, u64) -> bool,
        target: CodeTarget,
        decls: &[Arc<CodeDeclaration>],
    ) -> Result<()> {
        for decl in decls {
            let hash = decl.content_hash();
            if !register(ctx, decl.name(), hash) {
                if ctx.global_declaration_hash(decl.name()) != Some(hash) {
                    log::error!(
                        "Feature `{}` redeclares `{}` with a different body",
                        self.name,
                        decl.name()
                    );
                    return Err(TesseraError::DeclarationConflict(decl.name().to_string()));
                }
                continue;
            }
            ctx.emit(target, decl, &[])?;
        }
        Ok(())
    }

    /// Binds every resource. HLSL and GLSL get one file-scope declaration per
    /// name; Metal gets one argument per name on the current entry point.
    pub fn create_resources_code(&self, ctx: &mut Context) -> Result<()> {
        let dialect = ctx.dialect();
        for binding in self.resources.iter() {
            if !binding.kind().is_supported(dialect) {
                log::error!("Feature `{}` binds `{}`, unsupported on {dialect}", self.name, binding.name());
                return Err(TesseraError::Unsupported {
                    dialect,
                    what: format!("resource `{}` of feature `{}`", binding.name(), self.name),
                });
            }

            let slot = ctx.bind_resource(binding)?;
            let text = binding.declaration(dialect, slot)?;

            if dialect == Dialect::Metal {
                ctx.current_variant_mut()?.add_argument(binding.name(), &text);
            } else if !ctx.has_global_declaration(binding.name()) {
                ctx.register_global(DeclarationKind::Resource, binding.name(), u64::from(slot));
                ctx.push_resource_line(&text);
            }
        }
        Ok(())
    }

    /// Emits the feature's snippet into the current variant.
    ///
    /// Inputs come from local scope or, failing that, are cast in from the
    /// variant's vertex-output structs. A feature already present in the
    /// variant is skipped.
    pub fn create_insert_code(&self, ctx: &mut Context) -> Result<()> {
        let dialect = ctx.dialect();
        let variant = ctx.current_variant_mut()?;
        if variant.has_local_feature(&self.name) {
            log::debug!("Feature `{}` already in {}", self.name, variant.entry_point_name());
            return Ok(());
        }

        let mut prologue = String::new();
        for input in &self.inputs {
            if let Some(existing) = variant.local_declaration(input.name()) {
                if !Variable::is_directly_compatible(existing, input, true) {
                    return Err(self.local_conflict(input));
                }
                continue;
            }

            let Some((stage, field)) = variant.stage_input(input.name()) else {
                log::error!("Feature `{}` reads `{}` which nothing provides", self.name, input.name());
                return Err(TesseraError::UnresolvedInput {
                    feature: self.name.to_string(),
                    variable: input.name().to_string(),
                });
            };
            let source = field.source_variable(stage.param);
            let mut local = input.clone();
            local.set_mutable(true);
            prologue.push_str("    ");
            Variable::create_cast(&source, &local, dialect, &mut prologue, false, field.padding)?;
            prologue.push_str(";\n");
            variant.register_local_declaration(&local);
        }

        for var in self.outputs.iter().chain(&self.internals) {
            if let Some(existing) = variant.local_declaration(var.name()) {
                if !Variable::is_directly_compatible(existing, var, true) {
                    return Err(self.local_conflict(var));
                }
                continue;
            }
            variant.register_local_declaration(var);
        }

        variant.code_buffer.push_str(&prologue);
        variant.register_local_feature(&self.name);

        if let Some(insert) = &self.insert_code {
            let replacements: Vec<&str> = insert
                .template_names()
                .iter()
                .filter_map(|token| self.variable_for_token(token).map(Variable::name))
                .collect();
            ctx.emit(CodeTarget::Local, insert, &replacements)?;
        }
        Ok(())
    }

    fn local_conflict(&self, var: &Variable) -> TesseraError {
        log::error!("Feature `{}` redeclares local `{}` with a different signature", self.name, var.name());
        TesseraError::LocalConflict {
            feature: self.name.to_string(),
            variable: var.name().to_string(),
        }
    }

    /// Types, then resources, then functions, then the insert snippet.
    pub fn create_all_code(&self, ctx: &mut Context) -> Result<()> {
        self.create_types_code(ctx)?;
        self.create_resources_code(ctx)?;
        self.create_functions_code(ctx)?;
        self.create_insert_code(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_gen::variable::BaseType;

    fn albedo_feature() -> Feature {
        Feature::builder("TintAlbedo")
            .input(Variable::vector("albedo", BaseType::Float, 4, true).templated())
            .input(Variable::vector("vertexColor", BaseType::Float, 4, false).templated())
            .insert_code(CodeDeclaration::templated(
                "TintAlbedo",
                "    {{albedo}} *= {{vertexColor}};\n",
                ["{{albedo}}", "{{vertexColor}}"],
            ))
            .build()
    }

    #[test]
    fn test_variable_lookup_order() {
        let feature = Feature::builder("Lookup")
            .input(Variable::vector("n", BaseType::Float, 3, false))
            .output(Variable::vector("n", BaseType::Float, 4, false))
            .internal(Variable::scalar("k", BaseType::Float, false))
            .build();

        let (var, category) = feature.get_variable("n").unwrap();
        assert_eq!(category, VariableCategory::Input);
        assert_eq!(var.size_x(), 3);
        assert_eq!(feature.get_variable("k").unwrap().1, VariableCategory::Internal);
        assert!(feature.get_variable("missing").is_none());
    }

    #[test]
    fn test_rename_is_per_instance() {
        let template = albedo_feature();
        let mut instance = template.clone();
        assert!(instance.rename_variable("albedo", "surface"));
        assert!(instance.get_variable("surface").is_some());
        assert!(template.get_variable("albedo").is_some());
        assert!(!instance.rename_variable("missing", "x"));
    }

    #[test]
    fn test_identical_global_declaration_emitted_once() {
        let decl = Arc::new(CodeDeclaration::new("Light", "struct Light { float4 color; };\n"));
        let a = Feature::builder("A").types_code(decl.clone()).build();
        let b = Feature::builder("B").types_code(decl).build();

        let mut ctx = Context::new(Dialect::Hlsl);
        a.create_types_code(&mut ctx).unwrap();
        b.create_types_code(&mut ctx).unwrap();
        assert_eq!(ctx.types_code().matches("struct Light").count(), 1);
    }

    #[test]
    fn test_global_declarations_record_kind() {
        let feature = Feature::builder("Kinds")
            .types_code(CodeDeclaration::new("Light", "struct Light { float4 color; };\n"))
            .functions_code(CodeDeclaration::new("Shade", "float Shade() { return 1.0; }\n"))
            .build();

        let mut ctx = Context::new(Dialect::Hlsl);
        feature.create_types_code(&mut ctx).unwrap();
        feature.create_functions_code(&mut ctx).unwrap();
        assert_eq!(ctx.global_declaration_kind("Light"), Some(DeclarationKind::Type));
        assert_eq!(ctx.global_declaration_kind("Shade"), Some(DeclarationKind::Function));
        assert!(!ctx.register_type_declaration("Light", 0));
        assert!(!ctx.register_function_declaration("Shade", 0));
    }

    #[test]
    fn test_conflicting_global_declaration() {
        let a = Feature::builder("A")
            .functions_code(CodeDeclaration::new("Shade", "float Shade() { return 1.0; }\n"))
            .build();
        let b = Feature::builder("B")
            .functions_code(CodeDeclaration::new("Shade", "float Shade() { return 0.0; }\n"))
            .build();

        let mut ctx = Context::new(Dialect::Hlsl);
        a.create_functions_code(&mut ctx).unwrap();
        let err = b.create_functions_code(&mut ctx).unwrap_err();
        assert!(matches!(err, TesseraError::DeclarationConflict(name) if name == "Shade"));
    }

    #[test]
    fn test_insert_casts_stage_inputs() {
        let mut ctx = Context::new(Dialect::Hlsl);
        ctx.begin_variant(VertexDataFlags::BASIC);

        let seed = Feature::builder("Seed")
            .output(Variable::vector("albedo", BaseType::Float, 4, true))
            .build();
        seed.create_insert_code(&mut ctx).unwrap();
        albedo_feature().create_insert_code(&mut ctx).unwrap();

        let code = ctx.current_variant().unwrap().code();
        assert_eq!(
            code,
            "    float4 vertexColor = float4(vBasic.color);\n    albedo *= vertexColor;\n"
        );
    }

    #[test]
    fn test_insert_twice_is_noop() {
        let mut ctx = Context::new(Dialect::Glsl);
        ctx.begin_variant(VertexDataFlags::BASIC);
        let seed = Feature::builder("Seed")
            .output(Variable::vector("albedo", BaseType::Float, 4, true))
            .insert_code(CodeDeclaration::new("Seed", "    vec4 albedo = vec4(1.0);\n"))
            .build();
        seed.create_insert_code(&mut ctx).unwrap();
        seed.create_insert_code(&mut ctx).unwrap();
        assert_eq!(ctx.current_variant().unwrap().code().matches("vec4 albedo").count(), 1);
    }

    #[test]
    fn test_unresolved_input() {
        let mut ctx = Context::new(Dialect::Hlsl);
        ctx.begin_variant(VertexDataFlags::BASIC);
        let needs_tangent = Feature::builder("NeedsTangent")
            .input(Variable::vector("tangent", BaseType::Float, 4, false))
            .build();
        let err = needs_tangent.create_insert_code(&mut ctx).unwrap_err();
        assert!(matches!(err, TesseraError::UnresolvedInput { variable, .. } if variable == "tangent"));
    }

    #[test]
    fn test_local_signature_conflict() {
        let mut ctx = Context::new(Dialect::Hlsl);
        ctx.begin_variant(VertexDataFlags::BASIC);
        let a = Feature::builder("A")
            .output(Variable::vector("lighting", BaseType::Float, 3, true))
            .build();
        let b = Feature::builder("B")
            .output(Variable::vector("lighting", BaseType::Float, 4, true))
            .build();
        a.create_insert_code(&mut ctx).unwrap();
        assert!(matches!(
            b.create_insert_code(&mut ctx),
            Err(TesseraError::LocalConflict { .. })
        ));
    }

    #[test]
    fn test_metal_resources_become_arguments() {
        let sampled = Feature::builder("Sampled")
            .resource(ResourceBinding::texture("albedoTexture"))
            .resource(ResourceBinding::sampler("samplerLinear"))
            .build();

        let mut ctx = Context::new(Dialect::Metal);
        ctx.begin_variant(VertexDataFlags::BASIC);
        sampled.create_resources_code(&mut ctx).unwrap();
        assert!(ctx.resources_code().is_empty());

        let mut hlsl = Context::new(Dialect::Hlsl);
        sampled.create_resources_code(&mut hlsl).unwrap();
        sampled.create_resources_code(&mut hlsl).unwrap();
        assert_eq!(hlsl.resources_code().matches("albedoTexture").count(), 1);
    }
}
