//! Shared builders for the integration tests: tiny process
//! specifications and linear processes constructed directly on the pool,
//! since concrete-syntax parsing is outside this workspace.
#![allow(dead_code)]

use mucalc_terms::process::{CommPair, ProcEquation};
use mucalc_terms::spec::{DataSpec, ProcessSpec};
use mucalc_terms::{LabelId, MultiNameId, ProcId, ProcNameId, TermPool};

pub fn label(pool: &mut TermPool, name: &str) -> LabelId {
    pool.label_named(name, vec![])
}

/// An action instance without data arguments, as a process term.
pub fn act(pool: &mut TermPool, name: &str) -> ProcId {
    let l = label(pool, name);
    let a = pool.action(l, vec![]);
    pool.act(a)
}

pub fn mname(pool: &mut TermPool, names: &[&str]) -> MultiNameId {
    let syms = names.iter().map(|n| pool.intern(n)).collect();
    pool.multi_name(syms)
}

pub fn comm_pair(pool: &mut TermPool, lhs: &[&str], rhs: &str) -> CommPair {
    CommPair {
        lhs: mname(pool, lhs),
        rhs: Some(pool.intern(rhs)),
    }
}

pub fn proc_name(pool: &mut TermPool, name: &str) -> ProcNameId {
    let sym = pool.intern(name);
    pool.proc_name(sym, vec![])
}

/// A specification with the given equations (all without parameters) and
/// initial expression. Action-label declarations are irrelevant to the
/// reductions under test and left empty.
pub fn spec_with(equations: Vec<(ProcNameId, ProcId)>, init: ProcId) -> ProcessSpec {
    ProcessSpec {
        data: DataSpec::default(),
        action_labels: Vec::new(),
        global_variables: Vec::new(),
        equations: equations
            .into_iter()
            .map(|(name, body)| ProcEquation { name, parameters: Vec::new(), body })
            .collect(),
        init,
    }
}

/// A specification consisting of the initial expression only.
pub fn spec_of(init: ProcId) -> ProcessSpec {
    spec_with(Vec::new(), init)
}
