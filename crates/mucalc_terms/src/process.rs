//! Process expressions and equations.

use crate::action::{ActionId, MultiNameId};
use crate::data::{DataId, VarDecl};
use crate::sort::SortId;
use mucalc_base::Symbol;

/// Identifier of a hash-consed process expression.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ProcId(pub(crate) u32);

/// Identifier of a hash-consed process name (name plus parameter sorts).
///
/// Two references denote the same process iff both components match, so a
/// name may be overloaded on its parameter signature.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ProcNameId(pub(crate) u32);

/// A process name as stored in the pool.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ProcName {
    pub name: Symbol,
    pub sorts: Vec<SortId>,
}

/// One rename pair `from -> to` of a `rename` operator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RenamePair {
    pub from: Symbol,
    pub to: Symbol,
}

/// One communication `a1 | ... | an -> c` of a `comm` operator.
///
/// `rhs == None` denotes synchronisation to τ. Left-hand sides are kept
/// sorted; across the pairs of one operator their names are disjoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CommPair {
    pub lhs: MultiNameId,
    pub rhs: Option<Symbol>,
}

/// A process expression.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ProcExpr {
    /// Deadlock.
    Delta,
    /// The internal action.
    Tau,
    /// An action instance `a(d1, ..., dn)`.
    Act(ActionId),
    /// A call `P(e1, ..., en)`.
    ProcRef(ProcNameId, Vec<DataId>),
    /// A call with named assignments, `P(x1 = e1, ..., xk = ek)`.
    ProcRefAssign(ProcNameId, Vec<(Symbol, DataId)>),
    /// `sum v1:S1, ..., vn:Sn . p`.
    Sum(Vec<VarDecl>, ProcId),
    /// `block({a, ...}, p)` — the name set is sorted and duplicate-free.
    Block(Vec<Symbol>, ProcId),
    /// `hide({a, ...}, p)` — the name set is sorted and duplicate-free.
    Hide(Vec<Symbol>, ProcId),
    /// `rename({a -> b, ...}, p)`.
    Rename(Vec<RenamePair>, ProcId),
    /// `allow({m1, ..., mk}, p)` — each `mi` a sorted multi-name.
    Allow(Vec<MultiNameId>, ProcId),
    /// `comm({c1, ..., ck}, p)`.
    Comm(Vec<CommPair>, ProcId),
    /// Synchronous composition `p | q`.
    Sync(ProcId, ProcId),
    /// Timing `p @ t`.
    At(ProcId, DataId),
    /// Sequence `p . q`.
    Seq(ProcId, ProcId),
    /// `c -> p`.
    IfThen(DataId, ProcId),
    /// `c -> p <> q`.
    IfThenElse(DataId, ProcId, ProcId),
    /// Bounded initialisation `p << q`.
    BoundedInit(ProcId, ProcId),
    /// Parallel composition `p || q`.
    Merge(ProcId, ProcId),
    /// Left merge `p ||_ q`.
    LeftMerge(ProcId, ProcId),
    /// Alternative composition `p + q`.
    Choice(ProcId, ProcId),
}

/// A process equation `P(x1:S1, ..., xn:Sn) = body`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProcEquation {
    pub name: ProcNameId,
    pub parameters: Vec<VarDecl>,
    pub body: ProcId,
}
