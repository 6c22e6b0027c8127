//! Action labels, actions, and the two multi-action projections.
//!
//! The alphabet machinery works on *typed labels* (name plus sort
//! signature): a multi-action in an alphabet records which labels fire
//! together, not their data arguments. The untyped projection drops the
//! signatures too, leaving a multiset of names. Both projections are
//! hash-consed and kept sorted so that multiset operations are linear
//! merges and id equality is multiset equality.
//!
//! Full actions with data arguments appear in process terms and in linear
//! process summands.

use crate::data::DataId;
use crate::sort::SortId;
use mucalc_base::Symbol;

/// Identifier of a hash-consed action label, `name : S1 # ... # Sn`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LabelId(pub(crate) u32);

/// Identifier of a hash-consed action instance, `label(args)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ActionId(pub(crate) u32);

/// Identifier of a hash-consed typed multi-action: a sorted list of labels.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MultiActId(pub(crate) u32);

/// Identifier of a hash-consed untyped multi-action name: a sorted list of
/// label names.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MultiNameId(pub(crate) u32);

/// An action label: two labels are equal iff both name and sorts match.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ActionLabel {
    pub name: Symbol,
    pub sorts: Vec<SortId>,
}

/// An action instance: a label applied to data arguments.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Action {
    pub label: LabelId,
    pub args: Vec<DataId>,
}
