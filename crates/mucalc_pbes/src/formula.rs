//! State-formula preprocessing: monotonicity, bound-variable renaming,
//! fixpoint wrapping, and time detection.

use std::collections::HashSet;

use fnv::FnvHashMap;
use mucalc_base::{NameGenerator, Symbol};
use mucalc_terms::subst::{free_act_formula_vars, free_data_vars};
use mucalc_terms::{
    print, ActFormId, ActionFormula, DataId, StFormId, StateFormula, TermPool, VarDecl,
};

/// True if the formula mentions time: a timed `yaled`/`delay` or an `@`
/// inside an action formula.
pub fn has_time(pool: &TermPool, f: StFormId) -> bool {
    match pool.st_expr(f).clone() {
        StateFormula::True
        | StateFormula::False
        | StateFormula::Data(_)
        | StateFormula::Yaled
        | StateFormula::Delay
        | StateFormula::Var(..) => false,
        StateFormula::YaledTimed(_) | StateFormula::DelayTimed(_) => true,
        StateFormula::Not(g) => has_time(pool, g),
        StateFormula::And(l, r) | StateFormula::Or(l, r) | StateFormula::Imp(l, r) => {
            has_time(pool, l) || has_time(pool, r)
        }
        StateFormula::Forall(_, body) | StateFormula::Exists(_, body) => has_time(pool, body),
        StateFormula::Must(alpha, body) | StateFormula::May(alpha, body) => {
            act_has_time(pool, alpha) || has_time(pool, body)
        }
        StateFormula::Mu(_, _, body) | StateFormula::Nu(_, _, body) => has_time(pool, body),
    }
}

fn act_has_time(pool: &TermPool, f: ActFormId) -> bool {
    match pool.af_expr(f).clone() {
        ActionFormula::True
        | ActionFormula::False
        | ActionFormula::Data(_)
        | ActionFormula::MultiAct(_) => false,
        ActionFormula::Not(g) => act_has_time(pool, g),
        ActionFormula::And(l, r) | ActionFormula::Or(l, r) | ActionFormula::Imp(l, r) => {
            act_has_time(pool, l) || act_has_time(pool, r)
        }
        ActionFormula::Forall(_, body) | ActionFormula::Exists(_, body) => act_has_time(pool, body),
        ActionFormula::At(..) => true,
    }
}

/// True if every occurrence of a fixpoint variable lies under an even
/// number of negations (counting the left side of `imp` as one).
pub fn is_monotonous(pool: &TermPool, f: StFormId) -> bool {
    monotonous(pool, f, &HashSet::new(), true)
}

fn monotonous(pool: &TermPool, f: StFormId, negated: &HashSet<Symbol>, positive: bool) -> bool {
    match pool.st_expr(f).clone() {
        StateFormula::True
        | StateFormula::False
        | StateFormula::Data(_)
        | StateFormula::Yaled
        | StateFormula::YaledTimed(_)
        | StateFormula::Delay
        | StateFormula::DelayTimed(_) => true,
        StateFormula::Not(g) => monotonous(pool, g, negated, !positive),
        StateFormula::And(l, r) | StateFormula::Or(l, r) => {
            monotonous(pool, l, negated, positive) && monotonous(pool, r, negated, positive)
        }
        StateFormula::Imp(l, r) => {
            monotonous(pool, l, negated, !positive) && monotonous(pool, r, negated, positive)
        }
        StateFormula::Forall(_, body)
        | StateFormula::Exists(_, body)
        | StateFormula::Must(_, body)
        | StateFormula::May(_, body) => monotonous(pool, body, negated, positive),
        StateFormula::Var(name, _) => positive != negated.contains(&name),
        StateFormula::Mu(name, _, body) | StateFormula::Nu(name, _, body) => {
            let mut negated = negated.clone();
            if positive {
                negated.remove(&name);
            } else {
                // the binder is itself negated, so its occurrences must be
                // negated too for the flipped equation to stay monotonous
                negated.insert(name);
            }
            monotonous(pool, body, &negated, positive)
        }
    }
}

/// Replaces every free occurrence of the fixpoint variable `name` by its
/// negation. Rebinding of the same name shadows.
pub fn negate_propositional_variable(pool: &mut TermPool, name: Symbol, f: StFormId) -> StFormId {
    match pool.st_expr(f).clone() {
        StateFormula::Var(x, args) if x == name => {
            let occurrence = pool.st(StateFormula::Var(x, args));
            pool.st_not(occurrence)
        }
        StateFormula::True
        | StateFormula::False
        | StateFormula::Data(_)
        | StateFormula::Yaled
        | StateFormula::YaledTimed(_)
        | StateFormula::Delay
        | StateFormula::DelayTimed(_)
        | StateFormula::Var(..) => f,
        StateFormula::Not(g) => {
            let g = negate_propositional_variable(pool, name, g);
            pool.st(StateFormula::Not(g))
        }
        StateFormula::And(l, r) => {
            let l = negate_propositional_variable(pool, name, l);
            let r = negate_propositional_variable(pool, name, r);
            pool.st(StateFormula::And(l, r))
        }
        StateFormula::Or(l, r) => {
            let l = negate_propositional_variable(pool, name, l);
            let r = negate_propositional_variable(pool, name, r);
            pool.st(StateFormula::Or(l, r))
        }
        StateFormula::Imp(l, r) => {
            let l = negate_propositional_variable(pool, name, l);
            let r = negate_propositional_variable(pool, name, r);
            pool.st(StateFormula::Imp(l, r))
        }
        StateFormula::Forall(vars, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::Forall(vars, body))
        }
        StateFormula::Exists(vars, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::Exists(vars, body))
        }
        StateFormula::Must(alpha, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::Must(alpha, body))
        }
        StateFormula::May(alpha, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::May(alpha, body))
        }
        StateFormula::Mu(x, _, _) | StateFormula::Nu(x, _, _) if x == name => f,
        StateFormula::Mu(x, assignments, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::Mu(x, assignments, body))
        }
        StateFormula::Nu(x, assignments, body) => {
            let body = negate_propositional_variable(pool, name, body);
            pool.st(StateFormula::Nu(x, assignments, body))
        }
    }
}

/// Renames every bound fixpoint variable to a fresh name from `names`, so
/// that all binders are distinct and disjoint from the recorded context.
pub fn rename_bound_variables(
    pool: &mut TermPool,
    f: StFormId,
    names: &mut NameGenerator,
) -> StFormId {
    rename_bound(pool, f, names, &FnvHashMap::default())
}

fn rename_bound(
    pool: &mut TermPool,
    f: StFormId,
    names: &mut NameGenerator,
    renaming: &FnvHashMap<Symbol, Symbol>,
) -> StFormId {
    match pool.st_expr(f).clone() {
        StateFormula::True
        | StateFormula::False
        | StateFormula::Data(_)
        | StateFormula::Yaled
        | StateFormula::YaledTimed(_)
        | StateFormula::Delay
        | StateFormula::DelayTimed(_) => f,
        StateFormula::Var(x, args) => match renaming.get(&x) {
            Some(&fresh) => pool.st(StateFormula::Var(fresh, args)),
            None => f,
        },
        StateFormula::Not(g) => {
            let g = rename_bound(pool, g, names, renaming);
            pool.st(StateFormula::Not(g))
        }
        StateFormula::And(l, r) => {
            let l = rename_bound(pool, l, names, renaming);
            let r = rename_bound(pool, r, names, renaming);
            pool.st(StateFormula::And(l, r))
        }
        StateFormula::Or(l, r) => {
            let l = rename_bound(pool, l, names, renaming);
            let r = rename_bound(pool, r, names, renaming);
            pool.st(StateFormula::Or(l, r))
        }
        StateFormula::Imp(l, r) => {
            let l = rename_bound(pool, l, names, renaming);
            let r = rename_bound(pool, r, names, renaming);
            pool.st(StateFormula::Imp(l, r))
        }
        StateFormula::Forall(vars, body) => {
            let body = rename_bound(pool, body, names, renaming);
            pool.st(StateFormula::Forall(vars, body))
        }
        StateFormula::Exists(vars, body) => {
            let body = rename_bound(pool, body, names, renaming);
            pool.st(StateFormula::Exists(vars, body))
        }
        StateFormula::Must(alpha, body) => {
            let body = rename_bound(pool, body, names, renaming);
            pool.st(StateFormula::Must(alpha, body))
        }
        StateFormula::May(alpha, body) => {
            let body = rename_bound(pool, body, names, renaming);
            pool.st(StateFormula::May(alpha, body))
        }
        StateFormula::Mu(x, assignments, body) => {
            let (fresh, body) = rename_binder(pool, x, body, names, renaming);
            pool.st(StateFormula::Mu(fresh, assignments, body))
        }
        StateFormula::Nu(x, assignments, body) => {
            let (fresh, body) = rename_binder(pool, x, body, names, renaming);
            pool.st(StateFormula::Nu(fresh, assignments, body))
        }
    }
}

fn rename_binder(
    pool: &mut TermPool,
    x: Symbol,
    body: StFormId,
    names: &mut NameGenerator,
    renaming: &FnvHashMap<Symbol, Symbol>,
) -> (Symbol, StFormId) {
    let fresh_text = names.fresh(pool.name(x).to_string().as_str());
    let fresh = pool.intern(&fresh_text);
    let mut renaming = renaming.clone();
    renaming.insert(x, fresh);
    let body = rename_bound(pool, body, names, &renaming);
    (fresh, body)
}

/// Resolves name clashes of bound fixpoint variables and wraps a formula
/// whose head is not a fixpoint in `nu X.` with fresh `X`.
pub fn preprocess_state_formula(
    pool: &mut TermPool,
    f: StFormId,
    names: &mut NameGenerator,
) -> StFormId {
    let f = rename_bound_variables(pool, f, names);
    match pool.st_expr(f) {
        StateFormula::Mu(..) | StateFormula::Nu(..) => f,
        _ => {
            let fresh = names.fresh("X");
            let x = pool.intern(&fresh);
            pool.st(StateFormula::Nu(x, Vec::new(), f))
        }
    }
}

/// The parameter declarations of a fixpoint's assignment list.
pub fn mu_variables(assignments: &[(VarDecl, DataId)]) -> Vec<VarDecl> {
    assignments.iter().map(|(d, _)| *d).collect()
}

/// The initial-value expressions of a fixpoint's assignment list.
pub fn mu_expressions(assignments: &[(VarDecl, DataId)]) -> Vec<DataId> {
    assignments.iter().map(|(_, e)| *e).collect()
}

/// Records every identifier of the formula on the generator: fixpoint
/// variables, data variables, and quantifier binders.
pub fn collect_identifiers(pool: &TermPool, f: StFormId, names: &mut NameGenerator) {
    match pool.st_expr(f).clone() {
        StateFormula::True
        | StateFormula::False
        | StateFormula::Yaled
        | StateFormula::Delay => {}
        StateFormula::Data(d) | StateFormula::YaledTimed(d) | StateFormula::DelayTimed(d) => {
            collect_data_identifiers(pool, d, names);
        }
        StateFormula::Not(g) => collect_identifiers(pool, g, names),
        StateFormula::And(l, r) | StateFormula::Or(l, r) | StateFormula::Imp(l, r) => {
            collect_identifiers(pool, l, names);
            collect_identifiers(pool, r, names);
        }
        StateFormula::Forall(vars, body) | StateFormula::Exists(vars, body) => {
            for decl in vars {
                names.add_identifier(pool.name(decl.name));
            }
            collect_identifiers(pool, body, names);
        }
        StateFormula::Must(alpha, body) | StateFormula::May(alpha, body) => {
            for decl in free_act_formula_vars(pool, alpha) {
                names.add_identifier(pool.name(decl.name));
            }
            collect_identifiers(pool, body, names);
        }
        // fixpoint variable names are not recorded: binders register
        // themselves during renaming, so a unique name stays unchanged
        StateFormula::Var(_, args) => {
            for arg in args {
                collect_data_identifiers(pool, arg, names);
            }
        }
        StateFormula::Mu(_, assignments, body) | StateFormula::Nu(_, assignments, body) => {
            for (decl, value) in assignments {
                names.add_identifier(pool.name(decl.name));
                collect_data_identifiers(pool, value, names);
            }
            collect_identifiers(pool, body, names);
        }
    }
}

fn collect_data_identifiers(pool: &TermPool, d: DataId, names: &mut NameGenerator) {
    for decl in free_data_vars(pool, d) {
        names.add_identifier(pool.name(decl.name));
    }
}

/// Renders a formula for error messages.
pub fn display(pool: &TermPool, f: StFormId) -> String {
    print::display_state_formula(pool, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(pool: &mut TermPool, name: &str) -> StFormId {
        let x = pool.intern(name);
        pool.st(StateFormula::Var(x, vec![]))
    }

    #[test]
    fn plain_nu_formula_is_monotonous() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let body = var(&mut pool, "X");
        let f = pool.st(StateFormula::Nu(x, vec![], body));
        assert!(is_monotonous(&pool, f));
    }

    #[test]
    fn negated_occurrence_is_not_monotonous() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let occurrence = var(&mut pool, "X");
        let negated = pool.st_not(occurrence);
        let f = pool.st(StateFormula::Nu(x, vec![], negated));
        assert!(!is_monotonous(&pool, f));
    }

    #[test]
    fn doubly_negated_occurrence_is_monotonous() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let occurrence = var(&mut pool, "X");
        let once = pool.st_not(occurrence);
        let twice = pool.st_not(once);
        let f = pool.st(StateFormula::Nu(x, vec![], twice));
        assert!(is_monotonous(&pool, f));
    }

    #[test]
    fn implication_negates_its_left_side() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let occurrence = var(&mut pool, "X");
        let t = pool.st(StateFormula::True);
        let imp = pool.st(StateFormula::Imp(occurrence, t));
        let f = pool.st(StateFormula::Nu(x, vec![], imp));
        assert!(!is_monotonous(&pool, f));
    }

    #[test]
    fn preprocess_wraps_non_binders() {
        let mut pool = TermPool::new();
        let t = pool.st(StateFormula::True);
        let mut names = NameGenerator::new();
        let f = preprocess_state_formula(&mut pool, t, &mut names);
        assert!(matches!(pool.st_expr(f), StateFormula::Nu(..)));
    }

    #[test]
    fn rename_makes_binders_distinct() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let inner_occurrence = var(&mut pool, "X");
        let inner = pool.st(StateFormula::Mu(x, vec![], inner_occurrence));
        let outer_body = inner;
        let outer = pool.st(StateFormula::Nu(x, vec![], outer_body));
        let mut names = NameGenerator::new();
        let renamed = rename_bound_variables(&mut pool, outer, &mut names);
        let (outer_name, inner_id) = match pool.st_expr(renamed).clone() {
            StateFormula::Nu(n, _, b) => (n, b),
            other => panic!("expected nu, got {other:?}"),
        };
        let inner_name = match pool.st_expr(inner_id).clone() {
            StateFormula::Mu(n, _, _) => n,
            other => panic!("expected mu, got {other:?}"),
        };
        assert_ne!(outer_name, inner_name);
    }

    #[test]
    fn negate_variable_respects_shadowing() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let occurrence = var(&mut pool, "X");
        let shadowing = pool.st(StateFormula::Mu(x, vec![], occurrence));
        let negated = negate_propositional_variable(&mut pool, x, shadowing);
        assert_eq!(negated, shadowing);
        let free = negate_propositional_variable(&mut pool, x, occurrence);
        assert_eq!(free, pool.st_not(occurrence));
    }

    #[test]
    fn timed_yaled_is_detected() {
        let mut pool = TermPool::new();
        let real = pool.sort_real();
        let zero = pool.number("0", real);
        let f = pool.st(StateFormula::YaledTimed(zero));
        assert!(has_time(&pool, f));
        let g = pool.st(StateFormula::Yaled);
        assert!(!has_time(&pool, g));
    }
}
