//! Sort expressions.

use mucalc_base::Symbol;

/// Identifier of a hash-consed sort expression.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SortId(pub(crate) u32);

/// The container family of a container sort.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContainerKind {
    List,
    Set,
    Bag,
}

/// One constructor of a structured sort: a name plus argument sorts.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StructCons {
    pub name: Symbol,
    pub args: Vec<SortId>,
}

/// A sort expression. Two sorts are equal iff their structure is equal,
/// which the pool collapses to id equality.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SortExpr {
    /// A named sort such as `Bool`, `Nat`, or a user declaration.
    Basic(Symbol),
    /// `List(S)`, `Set(S)`, `Bag(S)`.
    Container(ContainerKind, SortId),
    /// `S1 # ... # Sn -> T`.
    Function(Vec<SortId>, SortId),
    /// `struct c1(args) | c2(args) | ...`.
    Structured(Vec<StructCons>),
    /// Placeholder for a sort the type checker has not resolved.
    Unknown,
    /// A set of candidate sorts, produced during overload resolution.
    MultiplePossible(Vec<SortId>),
}
