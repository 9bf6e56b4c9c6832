//! Feature Dependency Graph
//!
//! Resolves requested feature names against a [`FeatureLibrary`] into one
//! deterministic emission order: every feature after its dependencies, and
//! otherwise in request order.

use rustc_hash::FxHashMap;

use crate::errors::{Result, TesseraError};
use crate::shader_gen::feature::Feature;
use crate::shader_gen::library::FeatureLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Topologically ordered features of one generation call.
#[derive(Debug)]
pub struct FeatureGraph<'a> {
    order: Vec<&'a Feature>,
}

impl<'a> FeatureGraph<'a> {
    pub fn resolve<S: AsRef<str>>(library: &'a FeatureLibrary, roots: &[S]) -> Result<Self> {
        let mut marks = FxHashMap::default();
        let mut order = Vec::with_capacity(roots.len() * 2);
        for root in roots {
            Self::visit(library, root.as_ref(), &mut marks, &mut order)?;
        }
        Ok(Self { order })
    }

    fn visit(
        library: &'a FeatureLibrary,
        name: &str,
        marks: &mut FxHashMap<String, Mark>,
        order: &mut Vec<&'a Feature>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                log::error!("Feature `{name}` depends on itself");
                return Err(TesseraError::DependencyCycle(name.to_string()));
            }
            None => {}
        }

        let feature = library.get(name)?;
        marks.insert(name.to_string(), Mark::Visiting);
        for dependency in feature.dependencies() {
            Self::visit(library, dependency, marks, order)?;
        }
        marks.insert(name.to_string(), Mark::Done);
        order.push(feature);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Feature> + '_ {
        self.order.iter().copied()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'a str> {
        self.order.iter().map(|f| f.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
