//! # mucalc-terms
//!
//! The shared term store for the mucalc workspace.
//!
//! Every syntactic category — sorts, data expressions, action labels,
//! multi-actions, process expressions, state and action formulas, PBES
//! expressions — is hash-consed in a [`TermPool`]: constructing a term
//! returns the unique identifier of its structural equivalence class, so
//! identifier equality *is* semantic equality and identifiers are `Copy`
//! keys for the caches of the reduction engines.
//!
//! Terms are immutable. A "rewrite" builds new nodes that share subterms
//! with the originals by id; nodes live as long as the pool. The only
//! failure mode of construction is memory exhaustion.
//!
//! On top of the store this crate provides:
//!
//! - [`traverse`] — the enter/leave walk API used by every analysis
//! - [`subst`] — free variables and substitution for data and PBES terms
//! - [`print`] — compact renderings for diagnostics and tests

pub mod action;
pub mod data;
pub mod formula;
pub mod pbes;
pub mod pool;
pub mod print;
pub mod process;
pub mod sort;
pub mod spec;
pub mod subst;
pub mod traverse;

pub use action::{Action, ActionId, ActionLabel, LabelId, MultiActId, MultiNameId};
pub use data::{DataExpr, DataId, VarDecl};
pub use formula::{ActFormId, ActionFormula, StFormId, StateFormula};
pub use pbes::{FixpointSymbol, Pbes, PbesEquation, PbesExpr, PbesId, PropVarDecl};
pub use pool::TermPool;
pub use print::{display_act_formula, display_data, display_multi_name, display_proc, display_state_formula};
pub use process::{CommPair, ProcEquation, ProcExpr, ProcId, ProcNameId, RenamePair};
pub use sort::{ContainerKind, SortExpr, SortId, StructCons};
pub use spec::{DataEquation, DataSpec, ProcessSpec};

pub use mucalc_base::{Interner, Symbol};
