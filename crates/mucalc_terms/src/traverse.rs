//! The walk API: post-order traversals with enter/leave hooks.
//!
//! Every analysis and rewrite in the workspace is one of these walks. A
//! visitor receives `enter_*` before and `leave_*` after the children of a
//! node; each subterm is visited exactly once. The binding-aware flavour
//! threads a [`BoundVars`] multiset that is incremented at `forall`,
//! `exists`, `lambda`, `where`, and `sum` binders and decremented on leave.

use fnv::FnvHashMap;
use mucalc_base::Symbol;

use crate::data::{DataExpr, DataId, VarDecl};
use crate::formula::{ActFormId, ActionFormula, StFormId, StateFormula};
use crate::pool::TermPool;
use crate::process::{ProcExpr, ProcId};

/// Multiset of currently bound variable names.
///
/// A multiset rather than a set: the same name may be bound by nested
/// binders, and leaving the inner one must not unbind the outer one.
#[derive(Default)]
pub struct BoundVars {
    counts: FnvHashMap<Symbol, u32>,
}

impl BoundVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, name: Symbol) -> bool {
        self.counts.get(&name).copied().unwrap_or(0) > 0
    }

    pub fn push(&mut self, decls: &[VarDecl]) {
        for decl in decls {
            *self.counts.entry(decl.name).or_insert(0) += 1;
        }
    }

    pub fn pop(&mut self, decls: &[VarDecl]) {
        for decl in decls {
            let count = self.counts.get_mut(&decl.name).expect("unbalanced pop");
            *count -= 1;
        }
    }
}

// ---- data expressions -------------------------------------------------

/// Plain data-expression visitor.
pub trait DataVisitor {
    fn enter_data(&mut self, _pool: &TermPool, _id: DataId) {}
    fn leave_data(&mut self, _pool: &TermPool, _id: DataId) {}
}

/// Walks `id` post-order, calling the hooks on every subexpression.
pub fn walk_data<V: DataVisitor>(pool: &TermPool, id: DataId, visitor: &mut V) {
    visitor.enter_data(pool, id);
    match pool.data_expr(id).clone() {
        DataExpr::Variable(_) | DataExpr::OpId(..) => {}
        DataExpr::Appl(head, args) => {
            walk_data(pool, head, visitor);
            for arg in args {
                walk_data(pool, arg, visitor);
            }
        }
        DataExpr::Forall(_, body) | DataExpr::Exists(_, body) | DataExpr::Lambda(_, body) => {
            walk_data(pool, body, visitor);
        }
        DataExpr::Where(body, assignments) => {
            for (_, rhs) in &assignments {
                walk_data(pool, *rhs, visitor);
            }
            walk_data(pool, body, visitor);
        }
    }
    visitor.leave_data(pool, id);
}

/// Binding-aware data-expression visitor.
pub trait BoundDataVisitor {
    fn enter_data(&mut self, _pool: &TermPool, _id: DataId, _bound: &BoundVars) {}
    fn leave_data(&mut self, _pool: &TermPool, _id: DataId, _bound: &BoundVars) {}
}

/// Walks `id` post-order while maintaining the bound-variable multiset.
pub fn walk_data_bound<V: BoundDataVisitor>(
    pool: &TermPool,
    id: DataId,
    bound: &mut BoundVars,
    visitor: &mut V,
) {
    visitor.enter_data(pool, id, bound);
    match pool.data_expr(id).clone() {
        DataExpr::Variable(_) | DataExpr::OpId(..) => {}
        DataExpr::Appl(head, args) => {
            walk_data_bound(pool, head, bound, visitor);
            for arg in args {
                walk_data_bound(pool, arg, bound, visitor);
            }
        }
        DataExpr::Forall(vars, body) | DataExpr::Exists(vars, body) | DataExpr::Lambda(vars, body) => {
            bound.push(&vars);
            walk_data_bound(pool, body, bound, visitor);
            bound.pop(&vars);
        }
        DataExpr::Where(body, assignments) => {
            // right-hand sides are outside the scope of the bindings
            for (_, rhs) in &assignments {
                walk_data_bound(pool, *rhs, bound, visitor);
            }
            let decls: Vec<VarDecl> = assignments.iter().map(|(d, _)| *d).collect();
            bound.push(&decls);
            walk_data_bound(pool, body, bound, visitor);
            bound.pop(&decls);
        }
    }
    visitor.leave_data(pool, id, bound);
}

// ---- process expressions ----------------------------------------------

/// Process-expression visitor. Data arguments are reported through
/// [`ProcVisitor::visit_data`] so implementations can continue into them
/// with [`walk_data`] when needed.
pub trait ProcVisitor {
    fn enter_proc(&mut self, _pool: &TermPool, _id: ProcId) {}
    fn leave_proc(&mut self, _pool: &TermPool, _id: ProcId) {}
    fn visit_data(&mut self, _pool: &TermPool, _id: DataId) {}
}

/// Walks a process expression post-order, visiting every subprocess once.
pub fn walk_proc<V: ProcVisitor>(pool: &TermPool, id: ProcId, visitor: &mut V) {
    visitor.enter_proc(pool, id);
    match pool.proc_expr(id).clone() {
        ProcExpr::Delta | ProcExpr::Tau => {}
        ProcExpr::Act(action) => {
            for &arg in &pool.action_decl(action).args.clone() {
                visitor.visit_data(pool, arg);
            }
        }
        ProcExpr::ProcRef(_, args) => {
            for arg in args {
                visitor.visit_data(pool, arg);
            }
        }
        ProcExpr::ProcRefAssign(_, assignments) => {
            for (_, rhs) in assignments {
                visitor.visit_data(pool, rhs);
            }
        }
        ProcExpr::Sum(_, body)
        | ProcExpr::Block(_, body)
        | ProcExpr::Hide(_, body)
        | ProcExpr::Rename(_, body)
        | ProcExpr::Allow(_, body)
        | ProcExpr::Comm(_, body) => {
            walk_proc(pool, body, visitor);
        }
        ProcExpr::At(body, time) => {
            walk_proc(pool, body, visitor);
            visitor.visit_data(pool, time);
        }
        ProcExpr::IfThen(cond, then) => {
            visitor.visit_data(pool, cond);
            walk_proc(pool, then, visitor);
        }
        ProcExpr::IfThenElse(cond, then, els) => {
            visitor.visit_data(pool, cond);
            walk_proc(pool, then, visitor);
            walk_proc(pool, els, visitor);
        }
        ProcExpr::Sync(l, r)
        | ProcExpr::Seq(l, r)
        | ProcExpr::BoundedInit(l, r)
        | ProcExpr::Merge(l, r)
        | ProcExpr::LeftMerge(l, r)
        | ProcExpr::Choice(l, r) => {
            walk_proc(pool, l, visitor);
            walk_proc(pool, r, visitor);
        }
    }
    visitor.leave_proc(pool, id);
}

// ---- state formulas ----------------------------------------------------

/// State-formula visitor. Action formulas and data subterms are reported
/// through dedicated hooks.
pub trait StateFormulaVisitor {
    fn enter_formula(&mut self, _pool: &TermPool, _id: StFormId) {}
    fn leave_formula(&mut self, _pool: &TermPool, _id: StFormId) {}
    fn visit_act_formula(&mut self, _pool: &TermPool, _id: ActFormId) {}
    fn visit_data(&mut self, _pool: &TermPool, _id: DataId) {}
}

/// Walks a state formula post-order, visiting every subformula once.
pub fn walk_state_formula<V: StateFormulaVisitor>(pool: &TermPool, id: StFormId, visitor: &mut V) {
    visitor.enter_formula(pool, id);
    match pool.st_expr(id).clone() {
        StateFormula::True | StateFormula::False | StateFormula::Yaled | StateFormula::Delay => {}
        StateFormula::Data(d) => visitor.visit_data(pool, d),
        StateFormula::YaledTimed(t) | StateFormula::DelayTimed(t) => visitor.visit_data(pool, t),
        StateFormula::Not(f) => walk_state_formula(pool, f, visitor),
        StateFormula::And(l, r) | StateFormula::Or(l, r) | StateFormula::Imp(l, r) => {
            walk_state_formula(pool, l, visitor);
            walk_state_formula(pool, r, visitor);
        }
        StateFormula::Forall(_, body) | StateFormula::Exists(_, body) => {
            walk_state_formula(pool, body, visitor);
        }
        StateFormula::Must(alpha, body) | StateFormula::May(alpha, body) => {
            visitor.visit_act_formula(pool, alpha);
            walk_state_formula(pool, body, visitor);
        }
        StateFormula::Var(_, args) => {
            for arg in args {
                visitor.visit_data(pool, arg);
            }
        }
        StateFormula::Mu(_, assignments, body) | StateFormula::Nu(_, assignments, body) => {
            for (_, rhs) in assignments {
                visitor.visit_data(pool, rhs);
            }
            walk_state_formula(pool, body, visitor);
        }
    }
    visitor.leave_formula(pool, id);
}

/// Walks an action formula post-order.
pub fn walk_act_formula<V: StateFormulaVisitor>(pool: &TermPool, id: ActFormId, visitor: &mut V) {
    match pool.af_expr(id).clone() {
        ActionFormula::True | ActionFormula::False => {}
        ActionFormula::Data(d) => visitor.visit_data(pool, d),
        ActionFormula::MultiAct(actions) => {
            for action in actions {
                for &arg in &pool.action_decl(action).args.clone() {
                    visitor.visit_data(pool, arg);
                }
            }
        }
        ActionFormula::Not(f) => walk_act_formula(pool, f, visitor),
        ActionFormula::And(l, r) | ActionFormula::Or(l, r) | ActionFormula::Imp(l, r) => {
            walk_act_formula(pool, l, visitor);
            walk_act_formula(pool, r, visitor);
        }
        ActionFormula::Forall(_, body) | ActionFormula::Exists(_, body) => {
            walk_act_formula(pool, body, visitor);
        }
        ActionFormula::At(body, time) => {
            walk_act_formula(pool, body, visitor);
            visitor.visit_data(pool, time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        enters: usize,
        leaves: usize,
    }

    impl DataVisitor for Counter {
        fn enter_data(&mut self, _pool: &TermPool, _id: DataId) {
            self.enters += 1;
        }
        fn leave_data(&mut self, _pool: &TermPool, _id: DataId) {
            self.leaves += 1;
        }
    }

    #[test]
    fn every_subterm_visited_once() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let v = pool.var(n, nat);
        let one = pool.number("1", nat);
        let plus_sort = pool.sort_function(vec![nat, nat], nat);
        let plus = pool.op_id("+", plus_sort);
        let sum = pool.appl(plus, vec![v, one]);

        let mut counter = Counter { enters: 0, leaves: 0 };
        walk_data(&pool, sum, &mut counter);
        // v, 1, the operator head, and the application itself
        assert_eq!(counter.enters, 4);
        assert_eq!(counter.enters, counter.leaves);
    }

    struct BoundProbe {
        saw_bound_n: bool,
        saw_free_n: bool,
        n: Symbol,
    }

    impl BoundDataVisitor for BoundProbe {
        fn enter_data(&mut self, pool: &TermPool, id: DataId, bound: &BoundVars) {
            if let DataExpr::Variable(v) = pool.data_expr(id) {
                if v.name == self.n {
                    if bound.is_bound(self.n) {
                        self.saw_bound_n = true;
                    } else {
                        self.saw_free_n = true;
                    }
                }
            }
        }
    }

    #[test]
    fn binders_are_tracked() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let decl = VarDecl { name: n, sort: nat };
        let occurrence = pool.var(n, nat);
        let body = pool.data(DataExpr::Forall(vec![decl], occurrence));

        let mut probe = BoundProbe { saw_bound_n: false, saw_free_n: false, n };
        let mut bound = BoundVars::new();
        walk_data_bound(&pool, body, &mut bound, &mut probe);
        assert!(probe.saw_bound_n);
        assert!(!probe.saw_free_n);
    }
}
