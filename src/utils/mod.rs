//! Utility Module
//!
//! - [`interner`]: String interning for declaration and variable names
//!
//! # String Interning
//!
//! Per-call namespaces key their maps by interned [`interner::Symbol`]s, so
//! lookups hash a `u32` instead of the name.

pub mod interner;
