//! Error Types
//!
//! This module defines the error types used throughout the generator.
//!
//! # Overview
//!
//! The main error type [`TesseraError`] covers all failure modes including:
//! - Variable casting and validity errors
//! - Declaration conflicts in the global or local namespace
//! - Capability gaps of a target dialect
//! - Descriptor parsing and legacy template loading
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, TesseraError>`.
//! A generation call that returns an error has emitted nothing: partially assembled
//! source text is dropped together with the call's `Context`.
//!
//! ```rust,ignore
//! use tessera::errors::{TesseraError, Result};
//!
//! fn generate() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::shader_gen::dialect::{Dialect, SlotClass};

/// The main error type for the Tessera shader generator.
#[derive(Error, Debug)]
pub enum TesseraError {
    // ========================================================================
    // Variable Errors
    // ========================================================================
    /// A variable violates the scalar/vector/matrix shape invariants.
    #[error("Invalid variable `{0}`")]
    InvalidVariable(String),

    /// A cast between two variables cannot be expressed without losing data.
    #[error("Cannot cast `{from}` to `{to}`: {reason}")]
    CastNotSupported {
        from: String,
        to: String,
        reason: &'static str,
    },

    // ========================================================================
    // Declaration Errors
    // ========================================================================
    /// A templated declaration received fewer replacements than it has placeholders.
    #[error("Declaration `{declaration}` expects {expected} replacements, got {found}")]
    MissingReplacements {
        declaration: String,
        expected: usize,
        found: usize,
    },

    /// Two global declarations share a name but not a body.
    #[error("Conflicting global declaration `{0}`")]
    DeclarationConflict(String),

    /// Two local variables share a name but not a signature.
    #[error("Feature `{feature}` redeclares local `{variable}` with a different signature")]
    LocalConflict { feature: String, variable: String },

    /// A feature input is neither in local scope nor provided by the vertex stage.
    #[error("Feature `{feature}` reads `{variable}` which nothing provides")]
    UnresolvedInput { feature: String, variable: String },

    /// Local code was requested while no variant is being assembled.
    #[error("No active variant in the generation context")]
    NoActiveVariant,

    /// A variant was written before its vertex-output struct was declared.
    #[error("Variant `{variant}` requires undeclared vertex output `{declaration}`")]
    MissingVertexOutput {
        variant: String,
        declaration: String,
    },

    // ========================================================================
    // Feature Graph Errors
    // ========================================================================
    /// A feature name is not present in the library.
    #[error("Unknown feature `{0}`")]
    UnknownFeature(String),

    /// The dependency lists contain a cycle through the named feature.
    #[error("Dependency cycle through feature `{0}`")]
    DependencyCycle(String),

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// The target dialect cannot express the requested construct.
    #[error("{what} is not supported for {dialect}")]
    Unsupported { dialect: Dialect, what: String },

    /// The dialect's binding model has no free slot left.
    #[error("Out of {class:?} slots for {dialect} (max {max})")]
    SlotsExhausted {
        dialect: Dialect,
        class: SlotClass,
        max: u32,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Descriptor text could not be parsed.
    #[error("Invalid descriptor `{text}`: {reason}")]
    InvalidDescriptor { text: String, reason: String },

    // ========================================================================
    // Template Errors
    // ========================================================================
    /// A legacy template file could not be located.
    #[error("Shader template not found: {0}")]
    TemplateNotFound(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
