//! # mucalc-pbes
//!
//! Translation of a modal mu-calculus state formula and a linear process
//! specification into a parameterised boolean equation system encoding the
//! model-checking problem.
//!
//! The translation follows the classical `E` / `RHS` / `Sat` / `Par`
//! scheme, in a timed and an untimed variant; the timed variant threads a
//! fresh time parameter through every equation. The resulting PBES is
//! normalised (negations at the leaves), monotonous, and closed.
//!
//! Entry point: [`pbes_translate`].

pub mod error;
pub mod formula;
pub mod lps;
pub mod normalize;
pub mod translate;

pub use error::TranslateError;
pub use lps::{ActionSummand, DeadlockSummand, LinearProcess, LpsSpec};
pub use translate::pbes_translate;
