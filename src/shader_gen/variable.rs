//! Typed Shader Variables
//!
//! A [`Variable`] describes one named scalar, vector or matrix value flowing
//! between features. Variables are cheap immutable descriptors; a feature
//! instantiation clones them because mutability is decided per use.
//!
//! Casting never loses data: vectors only widen (padding the new components),
//! scalars broadcast into vectors, and matrix casts are refused outright.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::dialect::Dialect;

/// Element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Bool,
    Int,
    Uint,
    Float,
    Half,
}

impl BaseType {
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool)
    }

    #[inline]
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(self, Self::Float | Self::Half)
    }
}

/// Shape class of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
    Scalar,
    Vector,
    Matrix,
}

/// Fill value for the components added when a cast widens a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CastPadding {
    #[default]
    ZeroOrFalse,
    OneOrTrue,
}

/// Named, typed value descriptor.
///
/// `size_x` counts vector components (or matrix columns), `size_y` counts
/// matrix rows and is 1 for scalars and vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: Cow<'static, str>,
    templated_name: Option<Cow<'static, str>>,
    base_type: BaseType,
    size_x: u8,
    size_y: u8,
    is_mutable: bool,
}

impl Variable {
    #[must_use]
    pub fn scalar(name: impl Into<Cow<'static, str>>, base_type: BaseType, is_mutable: bool) -> Self {
        Self {
            name: name.into(),
            templated_name: None,
            base_type,
            size_x: 1,
            size_y: 1,
            is_mutable,
        }
    }

    #[must_use]
    pub fn vector(
        name: impl Into<Cow<'static, str>>,
        base_type: BaseType,
        size: u8,
        is_mutable: bool,
    ) -> Self {
        Self {
            size_x: size,
            ..Self::scalar(name, base_type, is_mutable)
        }
    }

    #[must_use]
    pub fn matrix(
        name: impl Into<Cow<'static, str>>,
        base_type: BaseType,
        size_x: u8,
        size_y: u8,
        is_mutable: bool,
    ) -> Self {
        Self {
            size_x,
            size_y,
            ..Self::scalar(name, base_type, is_mutable)
        }
    }

    /// Marks the variable as templated with the `{{name}}` placeholder.
    #[must_use]
    pub fn templated(mut self) -> Self {
        self.templated_name = Some(Cow::Owned(format!("{{{{{}}}}}", self.name)));
        self
    }

    /// Marks the variable as templated with an explicit placeholder token.
    #[must_use]
    pub fn with_templated_name(mut self, token: impl Into<Cow<'static, str>>) -> Self {
        self.templated_name = Some(token.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn templated_name(&self) -> Option<&str> {
        self.templated_name.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    #[inline]
    #[must_use]
    pub fn size_x(&self) -> u8 {
        self.size_x
    }

    #[inline]
    #[must_use]
    pub fn size_y(&self) -> u8 {
        self.size_y
    }

    #[inline]
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.is_mutable
    }

    /// Renames the value this variable binds to; the placeholder is kept.
    pub fn rename(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = name.into();
    }

    pub fn set_mutable(&mut self, is_mutable: bool) {
        self.is_mutable = is_mutable;
    }

    #[must_use]
    pub fn tensor_type(&self) -> TensorType {
        if self.size_y > 1 {
            TensorType::Matrix
        } else if self.size_x > 1 {
            TensorType::Vector
        } else {
            TensorType::Scalar
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.name.is_empty() || !(1..=4).contains(&self.size_x) || !(1..=4).contains(&self.size_y) {
            return false;
        }
        match self.tensor_type() {
            TensorType::Scalar => true,
            TensorType::Vector | TensorType::Matrix => self.base_type.is_numeric(),
        }
    }

    fn same_signature(a: &Variable, b: &Variable, ignore_mutability: bool) -> bool {
        a.base_type == b.base_type
            && a.size_x == b.size_x
            && a.size_y == b.size_y
            && (ignore_mutability || a.is_mutable == b.is_mutable)
    }

    /// Same name, element type, shape and (unless ignored) mutability.
    #[must_use]
    pub fn is_directly_compatible(a: &Variable, b: &Variable, ignore_mutability: bool) -> bool {
        a.name == b.name && Self::same_signature(a, b, ignore_mutability)
    }

    /// Whether `a` can be converted into `b` without dropping components.
    #[must_use]
    pub fn is_compatible_after_casting(a: &Variable, b: &Variable, ignore_mutability: bool) -> bool {
        if !ignore_mutability && a.is_mutable != b.is_mutable {
            return false;
        }
        match (a.tensor_type(), b.tensor_type()) {
            (TensorType::Scalar, TensorType::Scalar | TensorType::Vector) => true,
            (TensorType::Vector, TensorType::Vector) => b.size_x >= a.size_x,
            (TensorType::Matrix, TensorType::Matrix) => a.size_x <= b.size_x && a.size_y == b.size_y,
            _ => false,
        }
    }

    /// Writes `"<type> <second> = <expr>"` (or `"<second> = <expr>"` when
    /// `second_already_declared`) converting `first` into `second`.
    ///
    /// Nothing is written when the cast is refused.
    pub fn create_cast(
        first: &Variable,
        second: &Variable,
        dialect: Dialect,
        dst: &mut String,
        second_already_declared: bool,
        padding: CastPadding,
    ) -> Result<()> {
        for var in [first, second] {
            if !var.is_valid() {
                return Err(TesseraError::InvalidVariable(var.name.to_string()));
            }
        }

        let refuse = |reason| TesseraError::CastNotSupported {
            from: first.name.to_string(),
            to: second.name.to_string(),
            reason,
        };

        if first.tensor_type() == TensorType::Matrix || second.tensor_type() == TensorType::Matrix {
            return Err(refuse("matrix casts are not implemented"));
        }
        if !Self::is_compatible_after_casting(first, second, true) {
            return Err(refuse("the cast would truncate"));
        }

        let src = first.name.as_ref();
        let expr = match second.tensor_type() {
            TensorType::Scalar => Self::scalar_expression(first, second.base_type, dialect),
            _ => {
                let ty = dialect.type_name(second)?;
                let src_size = first.size_x;
                if src_size == second.size_x {
                    format!("{ty}({src})")
                } else {
                    let inner = if first.base_type == second.base_type {
                        src.to_string()
                    } else if first.tensor_type() == TensorType::Scalar {
                        dialect.scalar_cast(second.base_type, src)
                    } else {
                        format!("{}({src})", dialect.vector_name(second.base_type, src_size))
                    };
                    let pad = dialect.padding_literal(second.base_type, padding == CastPadding::OneOrTrue);
                    let mut args = inner;
                    for _ in src_size..second.size_x {
                        let _ = write!(args, ", {pad}");
                    }
                    format!("{ty}({args})")
                }
            }
        };

        if second_already_declared {
            let _ = write!(dst, "{} = {expr}", second.name);
        } else {
            let ty = dialect.type_name(second)?;
            let _ = write!(dst, "{ty} {} = {expr}", second.name);
        }
        Ok(())
    }

    fn scalar_expression(first: &Variable, target: BaseType, dialect: Dialect) -> String {
        let src = first.name.as_ref();
        match (first.base_type, target) {
            (from, to) if from == to => src.to_string(),
            (BaseType::Bool, to) => format!(
                "{src} ? {} : {}",
                dialect.typed_literal(to, true),
                dialect.typed_literal(to, false)
            ),
            (from, BaseType::Bool) => format!("{src} != {}", dialect.typed_literal(from, false)),
            (_, to) => dialect.scalar_cast(to, src),
        }
    }
}
