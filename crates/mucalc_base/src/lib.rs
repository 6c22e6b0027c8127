//! # mucalc-base
//!
//! Structural atoms for the mucalc workspace.
//!
//! This crate provides the foundational types used throughout mucalc:
//!
//! - [`Interner`]/[`Symbol`] — String interning for O(1) equality
//! - [`NameGenerator`] — Fresh identifiers disjoint from a context
//! - [`Diagnostics`] — The verbose/warning/error sink shared by all engines
//!
//! It has no knowledge of process algebra or modal logic; higher-level
//! crates build on these pieces.

pub mod diagnostics;
pub mod fresh;
pub mod intern;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use fresh::NameGenerator;
pub use intern::{Interner, Symbol};
