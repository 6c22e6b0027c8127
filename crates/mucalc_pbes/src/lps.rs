//! Linear processes.
//!
//! A linear process is a flat sum of condition-action-effect summands over
//! one vector of process parameters. The translator consumes this shape;
//! producing it (lineariser) is outside this crate.

use mucalc_base::NameGenerator;
use mucalc_terms::spec::DataSpec;
use mucalc_terms::subst::{free_action_vars, free_data_vars};
use mucalc_terms::{ActionId, DataId, LabelId, TermPool, VarDecl};

/// One action summand
/// `sum y. c -> a(e) [@ t] . P(g)`.
#[derive(Clone, Debug)]
pub struct ActionSummand {
    pub summation_variables: Vec<VarDecl>,
    pub condition: DataId,
    /// The multi-action fired by the summand; empty means τ.
    pub actions: Vec<ActionId>,
    pub time: Option<DataId>,
    /// Parameter updates; parameters without an entry keep their value.
    pub assignments: Vec<(VarDecl, DataId)>,
}

/// One deadlock summand `sum y. c -> delta [@ t]`.
#[derive(Clone, Debug)]
pub struct DeadlockSummand {
    pub summation_variables: Vec<VarDecl>,
    pub condition: DataId,
    pub time: Option<DataId>,
}

/// A linear process: parameters plus summands.
#[derive(Clone, Debug, Default)]
pub struct LinearProcess {
    pub parameters: Vec<VarDecl>,
    pub action_summands: Vec<ActionSummand>,
    pub deadlock_summands: Vec<DeadlockSummand>,
}

impl LinearProcess {
    /// True if any summand carries a time stamp.
    pub fn has_time(&self) -> bool {
        self.action_summands.iter().any(|s| s.time.is_some())
            || self.deadlock_summands.iter().any(|s| s.time.is_some())
    }
}

/// A linear process specification.
#[derive(Clone, Debug)]
pub struct LpsSpec {
    pub data: DataSpec,
    pub action_labels: Vec<LabelId>,
    pub global_variables: Vec<VarDecl>,
    pub process: LinearProcess,
    /// The initial values of the process parameters.
    pub initial_state: Vec<DataId>,
}

/// Associates a fresh time variable with every summand that lacks one,
/// adding it to the summand's summation variables.
pub fn make_timed(pool: &mut TermPool, process: &mut LinearProcess, names: &mut NameGenerator) {
    let real = pool.sort_real();
    for summand in &mut process.action_summands {
        if summand.time.is_none() {
            let fresh = names.fresh("t");
            let name = pool.intern(&fresh);
            let decl = VarDecl { name, sort: real };
            summand.summation_variables.push(decl);
            summand.time = Some(pool.var_decl(decl));
        }
    }
    for summand in &mut process.deadlock_summands {
        if summand.time.is_none() {
            let fresh = names.fresh("t");
            let name = pool.intern(&fresh);
            let decl = VarDecl { name, sort: real };
            summand.summation_variables.push(decl);
            summand.time = Some(pool.var_decl(decl));
        }
    }
}

/// Every identifier occurring in the specification, for seeding fresh-name
/// generation.
pub fn collect_identifiers(pool: &TermPool, spec: &LpsSpec, names: &mut NameGenerator) {
    let mut add_decl = |pool: &TermPool, names: &mut NameGenerator, decl: &VarDecl| {
        names.add_identifier(pool.name(decl.name));
    };
    for decl in spec.process.parameters.iter().chain(&spec.global_variables) {
        add_decl(pool, names, decl);
    }
    for &label in &spec.action_labels {
        names.add_identifier(pool.name(pool.untype_label(label)));
    }
    for summand in &spec.process.action_summands {
        for decl in &summand.summation_variables {
            add_decl(pool, names, decl);
        }
        for decl in free_data_vars(pool, summand.condition) {
            add_decl(pool, names, &decl);
        }
        for decl in free_action_vars(pool, &summand.actions) {
            add_decl(pool, names, &decl);
        }
        for (target, value) in &summand.assignments {
            add_decl(pool, names, target);
            for decl in free_data_vars(pool, *value) {
                add_decl(pool, names, &decl);
            }
        }
    }
    for summand in &spec.process.deadlock_summands {
        for decl in &summand.summation_variables {
            add_decl(pool, names, decl);
        }
    }
    for &value in &spec.initial_state {
        for decl in free_data_vars(pool, value) {
            add_decl(pool, names, &decl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_timed_adds_one_variable_per_untimed_summand() {
        let mut pool = TermPool::new();
        let t = pool.data_true();
        let mut process = LinearProcess {
            parameters: vec![],
            action_summands: vec![ActionSummand {
                summation_variables: vec![],
                condition: t,
                actions: vec![],
                time: None,
                assignments: vec![],
            }],
            deadlock_summands: vec![],
        };
        let mut names = NameGenerator::new();
        make_timed(&mut pool, &mut process, &mut names);
        let summand = &process.action_summands[0];
        assert!(summand.time.is_some());
        assert_eq!(summand.summation_variables.len(), 1);
        assert!(process.has_time());
    }
}
