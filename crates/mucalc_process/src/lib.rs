//! # mucalc-process
//!
//! The alphabet-reduction engine for parallel process expressions.
//!
//! Restriction operators (`block`, `hide`, `rename`, `allow`, `comm`) are
//! driven inward through parallel and sequential composition wherever that
//! shrinks the alphabet of the composed behaviour. The engine
//!
//! 1. classifies every reachable process equation (sequential pCRL,
//!    n-parallel replication, or general parallel mCRL),
//! 2. expands recognised n-parallel replications into explicit parallel
//!    compositions,
//! 3. iterates the per-equation alphabets to a fixed point, and
//! 4. pushes the restrictions of the initial expression inward, cloning
//!    equations under `allow` where profitable.
//!
//! Entry point: [`alphabet_reduce`].

pub mod algebra;
pub mod alphabet;
pub mod classify;
pub mod driver;
pub mod error;
pub mod push;

pub use alphabet::Alphabet;
pub use classify::{ProcForm, ProcProps, Recursivity};
pub use driver::{alphabet_reduce, process_alphabet, AlphaReducer};
pub use error::AlphaError;
