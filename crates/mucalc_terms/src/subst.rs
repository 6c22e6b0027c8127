//! Free variables and substitution.
//!
//! Substitution replaces *free* occurrences only; binders shadow entries of
//! the substitution map for the extent of their body. It is not
//! capture-avoiding: callers that substitute terms with free variables
//! under binders rename the binders to fresh names first, which is what
//! the translator does for summand variables and quantified action
//! formulas.

use fnv::FnvHashMap;
use mucalc_base::Symbol;

use crate::action::ActionId;
use crate::data::{DataExpr, DataId, VarDecl};
use crate::formula::{ActFormId, ActionFormula};
use crate::pbes::{PbesExpr, PbesId};
use crate::pool::TermPool;
use crate::traverse::{walk_data_bound, BoundDataVisitor, BoundVars};

/// A finite map from variable names to replacement expressions.
pub type Substitution = FnvHashMap<Symbol, DataId>;

/// Builds a substitution from parallel declaration/expression lists.
pub fn substitution(decls: &[VarDecl], exprs: &[DataId]) -> Substitution {
    debug_assert_eq!(decls.len(), exprs.len());
    decls.iter().zip(exprs).map(|(d, &e)| (d.name, e)).collect()
}

// ---- free variables ----------------------------------------------------

struct FreeCollector {
    seen: Vec<VarDecl>,
}

impl BoundDataVisitor for FreeCollector {
    fn enter_data(&mut self, pool: &TermPool, id: DataId, bound: &BoundVars) {
        if let DataExpr::Variable(v) = pool.data_expr(id) {
            if !bound.is_bound(v.name) && !self.seen.contains(v) {
                self.seen.push(*v);
            }
        }
    }
}

/// The free variables of a data expression, in first-occurrence order.
pub fn free_data_vars(pool: &TermPool, id: DataId) -> Vec<VarDecl> {
    let mut collector = FreeCollector { seen: Vec::new() };
    let mut bound = BoundVars::new();
    walk_data_bound(pool, id, &mut bound, &mut collector);
    collector.seen
}

/// The free variables of the data arguments of a list of actions.
pub fn free_action_vars(pool: &TermPool, actions: &[ActionId]) -> Vec<VarDecl> {
    let mut result: Vec<VarDecl> = Vec::new();
    for &action in actions {
        for &arg in &pool.action_decl(action).args.clone() {
            for v in free_data_vars(pool, arg) {
                if !result.contains(&v) {
                    result.push(v);
                }
            }
        }
    }
    result
}

/// The free variables of an action formula.
pub fn free_act_formula_vars(pool: &TermPool, id: ActFormId) -> Vec<VarDecl> {
    fn go(pool: &TermPool, id: ActFormId, bound: &mut BoundVars, acc: &mut Vec<VarDecl>) {
        let add = |pool: &TermPool, data: DataId, bound: &BoundVars, acc: &mut Vec<VarDecl>| {
            for v in free_data_vars(pool, data) {
                if !bound.is_bound(v.name) && !acc.contains(&v) {
                    acc.push(v);
                }
            }
        };
        match pool.af_expr(id).clone() {
            ActionFormula::True | ActionFormula::False => {}
            ActionFormula::Data(d) => add(pool, d, bound, acc),
            ActionFormula::MultiAct(actions) => {
                for v in free_action_vars(pool, &actions) {
                    if !bound.is_bound(v.name) && !acc.contains(&v) {
                        acc.push(v);
                    }
                }
            }
            ActionFormula::Not(f) => go(pool, f, bound, acc),
            ActionFormula::And(l, r) | ActionFormula::Or(l, r) | ActionFormula::Imp(l, r) => {
                go(pool, l, bound, acc);
                go(pool, r, bound, acc);
            }
            ActionFormula::Forall(vars, body) | ActionFormula::Exists(vars, body) => {
                bound.push(&vars);
                go(pool, body, bound, acc);
                bound.pop(&vars);
            }
            ActionFormula::At(body, time) => {
                go(pool, body, bound, acc);
                add(pool, time, bound, acc);
            }
        }
    }
    let mut acc = Vec::new();
    let mut bound = BoundVars::new();
    go(pool, id, &mut bound, &mut acc);
    acc
}

// ---- substitution ------------------------------------------------------

/// Substitutes free variables of a data expression.
pub fn substitute_data(pool: &mut TermPool, id: DataId, subst: &Substitution) -> DataId {
    if subst.is_empty() {
        return id;
    }
    let mut shadowed = BoundVars::new();
    subst_data(pool, id, subst, &mut shadowed)
}

fn subst_data(
    pool: &mut TermPool,
    id: DataId,
    subst: &Substitution,
    shadowed: &mut BoundVars,
) -> DataId {
    match pool.data_expr(id).clone() {
        DataExpr::Variable(v) => {
            if !shadowed.is_bound(v.name) {
                if let Some(&replacement) = subst.get(&v.name) {
                    return replacement;
                }
            }
            id
        }
        DataExpr::OpId(..) => id,
        DataExpr::Appl(head, args) => {
            let head = subst_data(pool, head, subst, shadowed);
            let args = args
                .into_iter()
                .map(|a| subst_data(pool, a, subst, shadowed))
                .collect();
            pool.data(DataExpr::Appl(head, args))
        }
        DataExpr::Forall(vars, body) => {
            shadowed.push(&vars);
            let body = subst_data(pool, body, subst, shadowed);
            shadowed.pop(&vars);
            pool.data(DataExpr::Forall(vars, body))
        }
        DataExpr::Exists(vars, body) => {
            shadowed.push(&vars);
            let body = subst_data(pool, body, subst, shadowed);
            shadowed.pop(&vars);
            pool.data(DataExpr::Exists(vars, body))
        }
        DataExpr::Lambda(vars, body) => {
            shadowed.push(&vars);
            let body = subst_data(pool, body, subst, shadowed);
            shadowed.pop(&vars);
            pool.data(DataExpr::Lambda(vars, body))
        }
        DataExpr::Where(body, assignments) => {
            let assignments: Vec<(VarDecl, DataId)> = assignments
                .into_iter()
                .map(|(d, rhs)| (d, subst_data(pool, rhs, subst, shadowed)))
                .collect();
            let decls: Vec<VarDecl> = assignments.iter().map(|(d, _)| *d).collect();
            shadowed.push(&decls);
            let body = subst_data(pool, body, subst, shadowed);
            shadowed.pop(&decls);
            pool.data(DataExpr::Where(body, assignments))
        }
    }
}

/// Substitutes free variables in the data arguments of a list of actions.
pub fn substitute_actions(
    pool: &mut TermPool,
    actions: &[ActionId],
    subst: &Substitution,
) -> Vec<ActionId> {
    actions
        .iter()
        .map(|&a| {
            let action = pool.action_decl(a).clone();
            let args = action
                .args
                .iter()
                .map(|&arg| substitute_data(pool, arg, subst))
                .collect();
            pool.action(action.label, args)
        })
        .collect()
}

/// Substitutes free variables of an action formula.
pub fn substitute_act_formula(
    pool: &mut TermPool,
    id: ActFormId,
    subst: &Substitution,
) -> ActFormId {
    if subst.is_empty() {
        return id;
    }
    match pool.af_expr(id).clone() {
        ActionFormula::True | ActionFormula::False => id,
        ActionFormula::Data(d) => {
            let d = substitute_data(pool, d, subst);
            pool.af(ActionFormula::Data(d))
        }
        ActionFormula::MultiAct(actions) => {
            let actions = substitute_actions(pool, &actions, subst);
            pool.af(ActionFormula::MultiAct(actions))
        }
        ActionFormula::Not(f) => {
            let f = substitute_act_formula(pool, f, subst);
            pool.af(ActionFormula::Not(f))
        }
        ActionFormula::And(l, r) => {
            let l = substitute_act_formula(pool, l, subst);
            let r = substitute_act_formula(pool, r, subst);
            pool.af(ActionFormula::And(l, r))
        }
        ActionFormula::Or(l, r) => {
            let l = substitute_act_formula(pool, l, subst);
            let r = substitute_act_formula(pool, r, subst);
            pool.af(ActionFormula::Or(l, r))
        }
        ActionFormula::Imp(l, r) => {
            let l = substitute_act_formula(pool, l, subst);
            let r = substitute_act_formula(pool, r, subst);
            pool.af(ActionFormula::Imp(l, r))
        }
        ActionFormula::Forall(vars, body) => {
            let inner: Substitution = subst
                .iter()
                .filter(|(name, _)| !vars.iter().any(|v| v.name == **name))
                .map(|(&n, &e)| (n, e))
                .collect();
            let body = substitute_act_formula(pool, body, &inner);
            pool.af(ActionFormula::Forall(vars, body))
        }
        ActionFormula::Exists(vars, body) => {
            let inner: Substitution = subst
                .iter()
                .filter(|(name, _)| !vars.iter().any(|v| v.name == **name))
                .map(|(&n, &e)| (n, e))
                .collect();
            let body = substitute_act_formula(pool, body, &inner);
            pool.af(ActionFormula::Exists(vars, body))
        }
        ActionFormula::At(body, time) => {
            let body = substitute_act_formula(pool, body, subst);
            let time = substitute_data(pool, time, subst);
            pool.af(ActionFormula::At(body, time))
        }
    }
}

/// Substitutes free variables of a PBES expression.
pub fn substitute_pbes(pool: &mut TermPool, id: PbesId, subst: &Substitution) -> PbesId {
    if subst.is_empty() {
        return id;
    }
    let mut shadowed = BoundVars::new();
    subst_pbes(pool, id, subst, &mut shadowed)
}

fn subst_pbes(
    pool: &mut TermPool,
    id: PbesId,
    subst: &Substitution,
    shadowed: &mut BoundVars,
) -> PbesId {
    match pool.pb_expr(id).clone() {
        PbesExpr::True | PbesExpr::False => id,
        PbesExpr::Data(d) => {
            let filtered = filter_shadowed(subst, shadowed);
            let d = substitute_data(pool, d, &filtered);
            pool.pb(PbesExpr::Data(d))
        }
        PbesExpr::Not(f) => {
            let f = subst_pbes(pool, f, subst, shadowed);
            pool.pb(PbesExpr::Not(f))
        }
        PbesExpr::And(l, r) => {
            let l = subst_pbes(pool, l, subst, shadowed);
            let r = subst_pbes(pool, r, subst, shadowed);
            pool.pb(PbesExpr::And(l, r))
        }
        PbesExpr::Or(l, r) => {
            let l = subst_pbes(pool, l, subst, shadowed);
            let r = subst_pbes(pool, r, subst, shadowed);
            pool.pb(PbesExpr::Or(l, r))
        }
        PbesExpr::Imp(l, r) => {
            let l = subst_pbes(pool, l, subst, shadowed);
            let r = subst_pbes(pool, r, subst, shadowed);
            pool.pb(PbesExpr::Imp(l, r))
        }
        PbesExpr::Forall(vars, body) => {
            shadowed.push(&vars);
            let body = subst_pbes(pool, body, subst, shadowed);
            shadowed.pop(&vars);
            pool.pb(PbesExpr::Forall(vars, body))
        }
        PbesExpr::Exists(vars, body) => {
            shadowed.push(&vars);
            let body = subst_pbes(pool, body, subst, shadowed);
            shadowed.pop(&vars);
            pool.pb(PbesExpr::Exists(vars, body))
        }
        PbesExpr::PropVar(name, args) => {
            let filtered = filter_shadowed(subst, shadowed);
            let args = args
                .into_iter()
                .map(|a| substitute_data(pool, a, &filtered))
                .collect();
            pool.pb(PbesExpr::PropVar(name, args))
        }
    }
}

fn filter_shadowed(subst: &Substitution, shadowed: &BoundVars) -> Substitution {
    subst
        .iter()
        .filter(|(name, _)| !shadowed.is_bound(**name))
        .map(|(&n, &e)| (n, e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_vars_skip_bound_occurrences() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let m = pool.intern("m");
        let vn = pool.var(n, nat);
        let vm = pool.var(m, nat);
        let eq = pool.op_eq(vn, vm);
        let forall = pool.data(DataExpr::Forall(vec![VarDecl { name: n, sort: nat }], eq));

        let free = free_data_vars(&pool, forall);
        assert_eq!(free, vec![VarDecl { name: m, sort: nat }]);
    }

    #[test]
    fn substitution_respects_shadowing() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let vn = pool.var(n, nat);
        let zero = pool.number("0", nat);
        let forall = pool.data(DataExpr::Forall(vec![VarDecl { name: n, sort: nat }], vn));

        let subst = substitution(&[VarDecl { name: n, sort: nat }], &[zero]);
        // free occurrence is replaced
        assert_eq!(substitute_data(&mut pool, vn, &subst), zero);
        // bound occurrence is not
        assert_eq!(substitute_data(&mut pool, forall, &subst), forall);
    }

    #[test]
    fn pbes_substitution_reaches_propvar_arguments() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let x = pool.intern("X");
        let vn = pool.var(n, nat);
        let one = pool.number("1", nat);
        let prop = pool.pb_prop(x, vec![vn]);

        let subst = substitution(&[VarDecl { name: n, sort: nat }], &[one]);
        let result = substitute_pbes(&mut pool, prop, &subst);
        assert_eq!(result, pool.pb_prop(x, vec![one]));
    }
}
