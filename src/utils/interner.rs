//! Global String Interner
//!
//! Declaration names are interned into compact [`Symbol`]s so the per-call
//! namespaces in `Context` and `Variant` hash and compare integers instead of strings.
//! The interner is process-wide and append-only; symbols stay valid for the
//! lifetime of the process.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer handle for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning its Symbol.
///
/// Returns the existing Symbol if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the Symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a Symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the declaration names every generation call touches.
pub fn preload_common_names() {
    let common = [
        "VertexOutputBasic",
        "VertexOutputExtended",
        "VertexOutputBlendShapes",
        "VertexOutputAnimations",
        "FrameUniforms",
        "Light",
        "lights",
        "albedo",
        "normal",
        "uv",
        "lighting",
    ];

    for name in common {
        intern(name);
    }
}
