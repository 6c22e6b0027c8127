//! Whole specifications: data specifications and process specifications.

use crate::action::LabelId;
use crate::data::{DataId, VarDecl};
use crate::process::{ProcEquation, ProcId};
use crate::sort::SortId;
use mucalc_base::Symbol;

/// A conditional rewrite equation `var ...; cond -> lhs = rhs`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DataEquation {
    pub variables: Vec<VarDecl>,
    pub condition: Option<DataId>,
    pub lhs: DataId,
    pub rhs: DataId,
}

/// The data part of a specification: declared sorts, constructors,
/// mappings, and rewrite equations.
#[derive(Clone, Default, Debug)]
pub struct DataSpec {
    pub sorts: Vec<SortId>,
    pub constructors: Vec<(Symbol, SortId)>,
    pub mappings: Vec<(Symbol, SortId)>,
    pub equations: Vec<DataEquation>,
}

/// A process specification: data, declared action labels, global
/// variables, process equations, and the initial expression.
#[derive(Clone, Debug)]
pub struct ProcessSpec {
    pub data: DataSpec,
    pub action_labels: Vec<LabelId>,
    pub global_variables: Vec<VarDecl>,
    pub equations: Vec<ProcEquation>,
    pub init: ProcId,
}
