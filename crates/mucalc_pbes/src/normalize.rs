//! PBES normalisation and well-formedness checks.
//!
//! Normalisation pushes negations to the leaves, replaces implications,
//! and folds boolean constants. The checks mirror what the translator
//! guarantees: normalised shape, monotonicity, and closedness.

use std::collections::HashSet;

use fnv::FnvHashSet;
use mucalc_base::Symbol;
use mucalc_terms::{
    DataExpr, DataId, Pbes, PbesExpr, PbesId, SortExpr, SortId, TermPool, VarDecl,
};

// ---- optimised constructors -------------------------------------------

/// `l && r` with constant folding.
pub fn and_opt(pool: &mut TermPool, l: PbesId, r: PbesId) -> PbesId {
    if matches!(pool.pb_expr(l), PbesExpr::True) {
        return r;
    }
    if matches!(pool.pb_expr(r), PbesExpr::True) {
        return l;
    }
    if matches!(pool.pb_expr(l), PbesExpr::False) || matches!(pool.pb_expr(r), PbesExpr::False) {
        return pool.pb_false();
    }
    pool.pb_and(l, r)
}

/// `l || r` with constant folding.
pub fn or_opt(pool: &mut TermPool, l: PbesId, r: PbesId) -> PbesId {
    if matches!(pool.pb_expr(l), PbesExpr::False) {
        return r;
    }
    if matches!(pool.pb_expr(r), PbesExpr::False) {
        return l;
    }
    if matches!(pool.pb_expr(l), PbesExpr::True) || matches!(pool.pb_expr(r), PbesExpr::True) {
        return pool.pb_true();
    }
    pool.pb_or(l, r)
}

/// `!f` with constant folding and double-negation elimination.
pub fn not_opt(pool: &mut TermPool, f: PbesId) -> PbesId {
    match pool.pb_expr(f).clone() {
        PbesExpr::True => pool.pb_false(),
        PbesExpr::False => pool.pb_true(),
        PbesExpr::Not(g) => g,
        _ => pool.pb_not(f),
    }
}

/// The conjunction of all expressions, `true` when empty.
pub fn join_and(pool: &mut TermPool, exprs: impl IntoIterator<Item = PbesId>) -> PbesId {
    let mut result: Option<PbesId> = None;
    for expr in exprs {
        result = Some(match result {
            Some(acc) => and_opt(pool, acc, expr),
            None => expr,
        });
    }
    result.unwrap_or_else(|| pool.pb_true())
}

/// The disjunction of all expressions, `false` when empty.
pub fn join_or(pool: &mut TermPool, exprs: impl IntoIterator<Item = PbesId>) -> PbesId {
    let mut result: Option<PbesId> = None;
    for expr in exprs {
        result = Some(match result {
            Some(acc) => or_opt(pool, acc, expr),
            None => expr,
        });
    }
    result.unwrap_or_else(|| pool.pb_false())
}

// ---- normalisation -----------------------------------------------------

/// Pushes negations to the leaves and eliminates implications.
pub fn normalize_expr(pool: &mut TermPool, f: PbesId) -> PbesId {
    match pool.pb_expr(f).clone() {
        PbesExpr::True | PbesExpr::False | PbesExpr::Data(_) | PbesExpr::PropVar(..) => f,
        PbesExpr::Not(g) => normalize_negation(pool, g),
        PbesExpr::And(l, r) => {
            let l = normalize_expr(pool, l);
            let r = normalize_expr(pool, r);
            and_opt(pool, l, r)
        }
        PbesExpr::Or(l, r) => {
            let l = normalize_expr(pool, l);
            let r = normalize_expr(pool, r);
            or_opt(pool, l, r)
        }
        PbesExpr::Imp(l, r) => {
            let l = normalize_negation(pool, l);
            let r = normalize_expr(pool, r);
            or_opt(pool, l, r)
        }
        PbesExpr::Forall(vars, body) => {
            let body = normalize_expr(pool, body);
            pool.pb_forall(vars, body)
        }
        PbesExpr::Exists(vars, body) => {
            let body = normalize_expr(pool, body);
            pool.pb_exists(vars, body)
        }
    }
}

/// Normalises `!f`.
fn normalize_negation(pool: &mut TermPool, f: PbesId) -> PbesId {
    match pool.pb_expr(f).clone() {
        PbesExpr::True => pool.pb_false(),
        PbesExpr::False => pool.pb_true(),
        PbesExpr::Data(d) => {
            let negated = pool.op_not(d);
            pool.pb_data(negated)
        }
        PbesExpr::Not(g) => normalize_expr(pool, g),
        PbesExpr::And(l, r) => {
            let l = normalize_negation(pool, l);
            let r = normalize_negation(pool, r);
            or_opt(pool, l, r)
        }
        PbesExpr::Or(l, r) => {
            let l = normalize_negation(pool, l);
            let r = normalize_negation(pool, r);
            and_opt(pool, l, r)
        }
        PbesExpr::Imp(l, r) => {
            let l = normalize_expr(pool, l);
            let r = normalize_negation(pool, r);
            and_opt(pool, l, r)
        }
        PbesExpr::Forall(vars, body) => {
            let body = normalize_negation(pool, body);
            pool.pb_exists(vars, body)
        }
        PbesExpr::Exists(vars, body) => {
            let body = normalize_negation(pool, body);
            pool.pb_forall(vars, body)
        }
        // a monotonous PBES never reaches this point; keep the negation
        // rather than produce a wrong polarity
        PbesExpr::PropVar(..) => pool.pb_not(f),
    }
}

/// Normalises every equation of the system in place.
pub fn normalize(pool: &mut TermPool, pbes: &mut Pbes) {
    for eq in &mut pbes.equations {
        eq.formula = normalize_expr(pool, eq.formula);
    }
}

/// True if negations occur only on data leaves and no implication is
/// present.
pub fn is_normalized(pool: &TermPool, f: PbesId) -> bool {
    match pool.pb_expr(f).clone() {
        PbesExpr::True | PbesExpr::False | PbesExpr::Data(_) | PbesExpr::PropVar(..) => true,
        PbesExpr::Not(_) | PbesExpr::Imp(..) => false,
        PbesExpr::And(l, r) | PbesExpr::Or(l, r) => {
            is_normalized(pool, l) && is_normalized(pool, r)
        }
        PbesExpr::Forall(_, body) | PbesExpr::Exists(_, body) => is_normalized(pool, body),
    }
}

// ---- monotonicity ------------------------------------------------------

/// True if every propositional variable occurrence lies under an even
/// number of negations.
pub fn is_monotonous_expr(pool: &TermPool, f: PbesId) -> bool {
    monotonous(pool, f, true)
}

fn monotonous(pool: &TermPool, f: PbesId, positive: bool) -> bool {
    match pool.pb_expr(f).clone() {
        PbesExpr::True | PbesExpr::False | PbesExpr::Data(_) => true,
        PbesExpr::Not(g) => monotonous(pool, g, !positive),
        PbesExpr::And(l, r) | PbesExpr::Or(l, r) => {
            monotonous(pool, l, positive) && monotonous(pool, r, positive)
        }
        PbesExpr::Imp(l, r) => monotonous(pool, l, !positive) && monotonous(pool, r, positive),
        PbesExpr::Forall(_, body) | PbesExpr::Exists(_, body) => monotonous(pool, body, positive),
        PbesExpr::PropVar(..) => positive,
    }
}

/// True if every equation of the system is monotonous.
pub fn is_monotonous(pool: &TermPool, pbes: &Pbes) -> bool {
    pbes.equations
        .iter()
        .all(|eq| is_monotonous_expr(pool, eq.formula))
}

// ---- closedness --------------------------------------------------------

/// True if every propositional variable instance resolves to an equation
/// with the right arity, including the initial instance, and every free
/// data variable of an equation body is a parameter or global.
pub fn is_closed(pool: &TermPool, pbes: &Pbes) -> bool {
    let declared: Vec<(Symbol, usize)> = pbes
        .equations
        .iter()
        .map(|eq| (eq.variable.name, eq.variable.parameters.len()))
        .collect();
    let resolves =
        |name: Symbol, arity: usize| declared.iter().any(|&(n, a)| n == name && a == arity);

    for eq in &pbes.equations {
        let mut bound: Vec<VarDecl> = eq.variable.parameters.clone();
        bound.extend(pbes.global_variables.iter().copied());
        if !closed_expr(pool, eq.formula, &resolves, &bound) {
            return false;
        }
    }
    let (init_name, init_args) = &pbes.initial;
    resolves(*init_name, init_args.len())
}

fn closed_expr(
    pool: &TermPool,
    f: PbesId,
    resolves: &impl Fn(Symbol, usize) -> bool,
    bound: &[VarDecl],
) -> bool {
    match pool.pb_expr(f).clone() {
        PbesExpr::True | PbesExpr::False => true,
        PbesExpr::Data(d) => data_closed(pool, d, bound),
        PbesExpr::Not(g) => closed_expr(pool, g, resolves, bound),
        PbesExpr::And(l, r) | PbesExpr::Or(l, r) | PbesExpr::Imp(l, r) => {
            closed_expr(pool, l, resolves, bound) && closed_expr(pool, r, resolves, bound)
        }
        PbesExpr::Forall(vars, body) | PbesExpr::Exists(vars, body) => {
            let mut bound = bound.to_vec();
            bound.extend(vars);
            closed_expr(pool, body, resolves, &bound)
        }
        PbesExpr::PropVar(name, args) => {
            resolves(name, args.len()) && args.iter().all(|&a| data_closed(pool, a, bound))
        }
    }
}

fn data_closed(pool: &TermPool, d: DataId, bound: &[VarDecl]) -> bool {
    mucalc_terms::subst::free_data_vars(pool, d)
        .iter()
        .all(|v| bound.contains(v))
}

// ---- data-specification completion ------------------------------------

/// Declares every sort actually used by the equation system in the data
/// specification.
pub fn complete_data_specification(pool: &mut TermPool, pbes: &mut Pbes) {
    let mut used: FnvHashSet<SortId> = FnvHashSet::default();
    let equations = pbes.equations.clone();
    for eq in &equations {
        for decl in &eq.variable.parameters {
            add_sort(pool, decl.sort, &mut used);
        }
        collect_expr_sorts(pool, eq.formula, &mut used);
    }
    let initial_args = pbes.initial.1.clone();
    for arg in initial_args {
        collect_data_sorts(pool, arg, &mut used);
    }

    let declared: HashSet<SortId> = pbes.data.sorts.iter().copied().collect();
    let mut missing: Vec<SortId> = used.into_iter().filter(|s| !declared.contains(s)).collect();
    missing.sort_unstable();
    pbes.data.sorts.extend(missing);
}

fn add_sort(pool: &TermPool, sort: SortId, used: &mut FnvHashSet<SortId>) {
    if !used.insert(sort) {
        return;
    }
    match pool.sort_expr(sort).clone() {
        SortExpr::Basic(_) | SortExpr::Unknown => {}
        SortExpr::Container(_, element) => add_sort(pool, element, used),
        SortExpr::Function(domain, codomain) => {
            for s in domain {
                add_sort(pool, s, used);
            }
            add_sort(pool, codomain, used);
        }
        SortExpr::Structured(constructors) => {
            for cons in constructors {
                for s in cons.args {
                    add_sort(pool, s, used);
                }
            }
        }
        SortExpr::MultiplePossible(sorts) => {
            for s in sorts {
                add_sort(pool, s, used);
            }
        }
    }
}

fn collect_expr_sorts(pool: &TermPool, f: PbesId, used: &mut FnvHashSet<SortId>) {
    match pool.pb_expr(f).clone() {
        PbesExpr::True | PbesExpr::False => {}
        PbesExpr::Data(d) => collect_data_sorts(pool, d, used),
        PbesExpr::Not(g) => collect_expr_sorts(pool, g, used),
        PbesExpr::And(l, r) | PbesExpr::Or(l, r) | PbesExpr::Imp(l, r) => {
            collect_expr_sorts(pool, l, used);
            collect_expr_sorts(pool, r, used);
        }
        PbesExpr::Forall(vars, body) | PbesExpr::Exists(vars, body) => {
            for decl in vars {
                add_sort(pool, decl.sort, used);
            }
            collect_expr_sorts(pool, body, used);
        }
        PbesExpr::PropVar(_, args) => {
            for arg in args {
                collect_data_sorts(pool, arg, used);
            }
        }
    }
}

fn collect_data_sorts(pool: &TermPool, d: DataId, used: &mut FnvHashSet<SortId>) {
    match pool.data_expr(d).clone() {
        DataExpr::Variable(v) => add_sort(pool, v.sort, used),
        DataExpr::OpId(_, sort) => add_sort(pool, sort, used),
        DataExpr::Appl(head, args) => {
            collect_data_sorts(pool, head, used);
            for arg in args {
                collect_data_sorts(pool, arg, used);
            }
        }
        DataExpr::Forall(vars, body) | DataExpr::Exists(vars, body)
        | DataExpr::Lambda(vars, body) => {
            for decl in vars {
                add_sort(pool, decl.sort, used);
            }
            collect_data_sorts(pool, body, used);
        }
        DataExpr::Where(body, assignments) => {
            for (decl, value) in assignments {
                add_sort(pool, decl.sort, used);
                collect_data_sorts(pool, value, used);
            }
            collect_data_sorts(pool, body, used);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_pushed_to_data_leaves() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let prop = pool.pb_prop(x, vec![]);
        let t = pool.pb_true();
        let conj = pool.pb_and(t, prop);
        let and_not = pool.pb_not(conj);
        let normalized = normalize_expr(&mut pool, and_not);
        // !(true && X) -> !X, retained as a negation only on the variable
        assert_eq!(normalized, pool.pb_not(prop));
    }

    #[test]
    fn implication_is_eliminated() {
        let mut pool = TermPool::new();
        let b = pool.sort_bool();
        let c = pool.intern("c");
        let cond = pool.var(c, b);
        let cond = pool.pb_data(cond);
        let x = pool.intern("X");
        let prop = pool.pb_prop(x, vec![]);
        let imp = pool.pb_imp(cond, prop);
        let normalized = normalize_expr(&mut pool, imp);
        assert!(is_normalized(&pool, normalized));
        assert!(matches!(pool.pb_expr(normalized), PbesExpr::Or(..)));
    }

    #[test]
    fn join_and_of_nothing_is_true() {
        let mut pool = TermPool::new();
        let result = join_and(&mut pool, Vec::new());
        assert_eq!(result, pool.pb_true());
    }

    #[test]
    fn constant_folding() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let prop = pool.pb_prop(x, vec![]);
        let t = pool.pb_true();
        let f = pool.pb_false();
        assert_eq!(and_opt(&mut pool, t, prop), prop);
        assert_eq!(or_opt(&mut pool, f, prop), prop);
        assert_eq!(or_opt(&mut pool, t, prop), pool.pb_true());
        assert_eq!(and_opt(&mut pool, f, prop), pool.pb_false());
    }

    #[test]
    fn monotonicity_counts_imp_left_as_negation() {
        let mut pool = TermPool::new();
        let x = pool.intern("X");
        let prop = pool.pb_prop(x, vec![]);
        let t = pool.pb_true();
        let imp = pool.pb_imp(prop, t);
        assert!(!is_monotonous_expr(&pool, imp));
        let imp_right = pool.pb_imp(t, prop);
        assert!(is_monotonous_expr(&pool, imp_right));
    }
}
