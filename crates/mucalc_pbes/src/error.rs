//! Errors of the formula-to-PBES translator.

use thiserror::Error;

/// Failure of a translation run. No equations are produced on failure.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The state formula has a propositional variable under an odd number
    /// of negations, so no monotonous equation system exists for it.
    #[error("the formula {0} is not monotonous")]
    NonMonotonousFormula(String),
}
