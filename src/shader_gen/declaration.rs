//! Code Declarations
//!
//! A [`CodeDeclaration`] is a named block of source text: a type, a function,
//! or the call-site snippet a feature inserts into an entry point. Declarations
//! are immutable and shared between feature instantiations through `Arc`.

use std::borrow::Cow;

use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{Result, TesseraError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDeclaration {
    /// Global deduplication key.
    name: Cow<'static, str>,
    code: Cow<'static, str>,
    /// Placeholder tokens, substituted in declaration order.
    template_names: Vec<Cow<'static, str>>,
}

impl CodeDeclaration {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            template_names: Vec::new(),
        }
    }

    #[must_use]
    pub fn templated<I, S>(name: impl Into<Cow<'static, str>>, code: impl Into<Cow<'static, str>>, template_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            name: name.into(),
            code: code.into(),
            template_names: template_names.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    #[must_use]
    pub fn template_names(&self) -> &[Cow<'static, str>] {
        &self.template_names
    }

    #[inline]
    #[must_use]
    pub fn is_templated(&self) -> bool {
        !self.template_names.is_empty()
    }

    /// Hash of the body, used to tell identical re-declarations from conflicts.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        xxh3_64(self.code.as_bytes())
    }

    /// Appends the declaration's text to `dst`.
    ///
    /// Templated declarations substitute `replacements[i]` for `template_names[i]`
    /// into `scratch` first; too few replacements fail before anything is written.
    pub fn create_code(&self, dst: &mut String, scratch: &mut String, replacements: &[&str]) -> Result<()> {
        if self.code.is_empty() {
            log::warn!("Declaration `{}` has no code, nothing emitted", self.name);
            return Ok(());
        }

        if !self.is_templated() {
            dst.push_str(&self.code);
            return Ok(());
        }

        if replacements.len() < self.template_names.len() {
            log::error!(
                "Declaration `{}` expects {} replacements, got {}",
                self.name,
                self.template_names.len(),
                replacements.len()
            );
            return Err(TesseraError::MissingReplacements {
                declaration: self.name.to_string(),
                expected: self.template_names.len(),
                found: replacements.len(),
            });
        }

        scratch.clear();
        scratch.push_str(&self.code);
        for (token, replacement) in self.template_names.iter().zip(replacements) {
            if scratch.contains(token.as_ref()) {
                *scratch = scratch.replace(token.as_ref(), replacement);
            }
        }
        dst.push_str(scratch);
        Ok(())
    }
}
