//! Errors of the alphabet-reduction driver.

use thiserror::Error;

/// Failure of a top-level alphabet reduction.
///
/// Recoverable situations (an unrecognised replication pattern, a redundant
/// or too strict `allow`, a non-converging iteration) are reported as
/// warnings on the diagnostics sink instead and never abort the run.
#[derive(Debug, Error)]
pub enum AlphaError {
    /// A process reference does not resolve to an equation of the
    /// specification.
    #[error("process reference {0} does not resolve to an equation")]
    UnresolvedReference(String),

    /// A `comm` operator violates the disjointness invariant on its
    /// left-hand sides.
    #[error("communication set has overlapping left-hand sides on {0}")]
    OverlappingComm(String),
}
