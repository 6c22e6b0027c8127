//! Equation classification and the n-parallel replication pattern.
//!
//! Every reachable equation is tagged with its form (sequential pCRL,
//! n-parallel replication, general parallel mCRL) and whether it depends
//! on itself. Recursive parallel equations matching the replication
//! template
//!
//! ```text
//! P(n:Pos, ...) = (n > 1) -> Q([n], ...) || P(max(n-1,1), ...) <> Q([1], ...)
//! ```
//!
//! are expanded per constant call site `P(k, ...)` into the explicit
//! composition `Q(1) || Q(2) || ... || Q(k)`, which the restriction
//! pushers can then reduce.

use fnv::FnvHashMap;
use mucalc_base::Symbol;
use mucalc_terms::spec::DataSpec;
use mucalc_terms::{DataExpr, DataId, ProcExpr, ProcId, ProcNameId, TermPool};

use crate::algebra::merge_list;
use crate::driver::AlphaReducer;

/// The operator discipline of an equation body.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProcForm {
    /// Only sequential operators.
    Pcrl,
    /// The recognised n-parallel replication template.
    NPcrl,
    /// General parallel or restriction operators on a recursive path.
    Mcrl,
}

/// Whether an equation (transitively) references itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Recursivity {
    Recursive,
    NonRecursive,
}

/// The classification of one equation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProcProps {
    pub form: ProcForm,
    pub recursivity: Recursivity,
}

/// Reads `c = k` constants with `c : Pos` from the data equations.
pub(crate) fn collect_pos_constants(
    pool: &mut TermPool,
    data: &DataSpec,
) -> FnvHashMap<Symbol, Symbol> {
    let pos = pool.sort_pos();
    let mut consts = FnvHashMap::default();
    for eq in &data.equations {
        let lhs = pool.data_expr(eq.lhs).clone();
        let rhs = pool.data_expr(eq.rhs).clone();
        if let (DataExpr::OpId(name, lsort), DataExpr::OpId(value, rsort)) = (lhs, rhs) {
            if lsort == pos && rsort == pos && pool.is_number(eq.rhs) {
                consts.insert(name, value);
            }
        }
    }
    consts
}

impl<'a> AlphaReducer<'a> {
    /// The process names a term references, one step deep: known
    /// dependencies of referenced names are merged in, so iterating this
    /// per equation converges on the transitive closure.
    pub(crate) fn proc_deps(&self, a: ProcId) -> Vec<ProcNameId> {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau | ProcExpr::Act(..) => Vec::new(),
            ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                let direct = vec![name];
                match self.deps.get(&name) {
                    Some(dep) => merge_list(&direct, dep),
                    None => direct,
                }
            }
            ProcExpr::Sum(_, p)
            | ProcExpr::At(p, _)
            | ProcExpr::IfThen(_, p)
            | ProcExpr::BoundedInit(p, _)
            | ProcExpr::Block(_, p)
            | ProcExpr::Hide(_, p)
            | ProcExpr::Rename(_, p)
            | ProcExpr::Allow(_, p)
            | ProcExpr::Comm(_, p) => self.proc_deps(p),
            ProcExpr::IfThenElse(_, p, q)
            | ProcExpr::Choice(p, q)
            | ProcExpr::Seq(p, q)
            | ProcExpr::Sync(p, q)
            | ProcExpr::Merge(p, q)
            | ProcExpr::LeftMerge(p, q) => {
                let l = self.proc_deps(p);
                let r = self.proc_deps(q);
                merge_list(&l, &r)
            }
        }
    }

    /// The form of a term in the context of the equation `context`.
    /// Parallelism only forces mCRL when it can recurse: when the context
    /// itself or a recursive equation is reachable from the operands.
    pub(crate) fn proc_form(&self, a: ProcId, context: ProcNameId) -> ProcForm {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau | ProcExpr::Act(..) => ProcForm::Pcrl,
            ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                self.props[&name].form
            }
            ProcExpr::Sum(_, p)
            | ProcExpr::At(p, _)
            | ProcExpr::IfThen(_, p)
            | ProcExpr::Block(_, p)
            | ProcExpr::Hide(_, p)
            | ProcExpr::Rename(_, p)
            | ProcExpr::Allow(_, p)
            | ProcExpr::Comm(_, p) => self.proc_form(p, context),
            ProcExpr::IfThenElse(_, p, q)
            | ProcExpr::Choice(p, q)
            | ProcExpr::Seq(p, q)
            | ProcExpr::BoundedInit(p, q) => {
                if self.proc_form(p, context) == ProcForm::Mcrl
                    || self.proc_form(q, context) == ProcForm::Mcrl
                {
                    ProcForm::Mcrl
                } else {
                    ProcForm::Pcrl
                }
            }
            ProcExpr::Sync(..) | ProcExpr::Merge(..) | ProcExpr::LeftMerge(..) => {
                let deps = self.proc_deps(a);
                if deps.contains(&context) {
                    return ProcForm::Mcrl;
                }
                for dep in deps {
                    if self.props[&dep].recursivity == Recursivity::Recursive {
                        return ProcForm::Mcrl;
                    }
                }
                ProcForm::Pcrl
            }
        }
    }

    /// Matches the n-parallel replication template against the body of
    /// `pn`. Returns true when every structural condition holds.
    pub(crate) fn recognize_n_parallel(&mut self, pn: ProcNameId) -> bool {
        let body = self.procs[&pn];
        let (cond, then, els) = match self.pool.proc_expr(body).clone() {
            ProcExpr::IfThenElse(cond, then, els) => (cond, then, els),
            _ => return false,
        };
        let (p_name, else_args) = match self.pool.proc_expr(els).clone() {
            ProcExpr::ProcRef(p_name, args) => (p_name, args),
            _ => return false,
        };
        if p_name == pn {
            return false;
        }

        let form_pars_np = match self.form_pars.get(&pn) {
            Some(pars) if !pars.is_empty() => pars.clone(),
            _ => return false,
        };
        let pos = self.pool.sort_pos();
        let counter = form_pars_np[0];
        if counter.sort != pos {
            return false;
        }

        // condition: n > 1
        let one = self.pool.number("1", pos);
        let n_var = self.pool.var(counter.name, pos);
        let expected_cond = self.pool.op_greater(n_var, one);
        if cond != expected_cond {
            return false;
        }

        let form_pars_p = match self.form_pars.get(&p_name) {
            Some(pars) => pars.clone(),
            None => return false,
        };
        let same_arity = form_pars_p.len() == form_pars_np.len();
        if !same_arity && form_pars_p.len() + 1 != form_pars_np.len() {
            return false;
        }

        let trailing: Vec<DataId> = form_pars_np[1..]
            .iter()
            .map(|d| self.pool.var_decl(*d))
            .collect();

        // else branch: Q([1], rest-of-formals)
        let rest_args: &[DataId] = if same_arity {
            match else_args.first() {
                Some(&first) if first == one => &else_args[1..],
                _ => return false,
            }
        } else {
            &else_args
        };
        if rest_args != trailing.as_slice() {
            return false;
        }

        // then branch: Q(formals) || P(max(n-1,1) or Int2Pos(n-1), rest)
        let (par_left, par_right) = match self.pool.proc_expr(then).clone() {
            ProcExpr::Merge(l, r) => (l, r),
            _ => return false,
        };
        let (left_name, left_args) = match self.pool.proc_expr(par_left).clone() {
            ProcExpr::ProcRef(name, args) => (name, args),
            _ => return false,
        };
        let (right_name, right_args) = match self.pool.proc_expr(par_right).clone() {
            ProcExpr::ProcRef(name, args) => (name, args),
            _ => return false,
        };
        if left_name != p_name || right_name != pn {
            return false;
        }

        if same_arity {
            let all_formals: Vec<DataId> = form_pars_np
                .iter()
                .map(|d| self.pool.var_decl(*d))
                .collect();
            if left_args != all_formals {
                return false;
            }
        } else if left_args != trailing {
            return false;
        }

        if right_args.len() != form_pars_np.len() || right_args[1..] != trailing[..] {
            return false;
        }

        // the decremented counter, in either accepted spelling
        let int_ = self.pool.sort_int();
        let minus_sort = self.pool.sort_function(vec![pos, pos], int_);
        let minus_op = self.pool.op_id("-", minus_sort);
        let n_minus_one = self.pool.appl(minus_op, vec![n_var, one]);
        let max_sort = self.pool.sort_function(vec![int_, pos], pos);
        let max_op = self.pool.op_id("max", max_sort);
        let max_form = self.pool.appl(max_op, vec![n_minus_one, one]);
        let int2pos_sort = self.pool.sort_function(vec![int_], pos);
        let int2pos_op = self.pool.op_id("Int2Pos", int2pos_sort);
        let int2pos_form = self.pool.appl(int2pos_op, vec![n_minus_one]);

        right_args[0] == max_form || right_args[0] == int2pos_form
    }

    /// Replaces calls of recognised replications `P(k, rest)` by calls of
    /// expansion processes `P_k(rest)`, recording each substitution.
    /// Returns `None` (after reporting an error) when a call cannot be
    /// resolved to a positive constant.
    pub(crate) fn subst_n_parallel(
        &mut self,
        subs: &mut FnvHashMap<ProcNameId, Vec<(Symbol, ProcNameId)>>,
        consts: &FnvHashMap<Symbol, Symbol>,
        a: ProcId,
    ) -> Option<ProcId> {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau | ProcExpr::Act(..) => Some(a),
            ProcExpr::ProcRef(name, args) => {
                if !subs.contains_key(&name) {
                    return Some(a);
                }
                let pos = self.pool.sort_pos();
                let par = *args.first()?;
                let k = match self.pool.data_expr(par).clone() {
                    DataExpr::OpId(text, sort) if sort == pos && self.pool.is_number(par) => {
                        Some(text)
                    }
                    DataExpr::OpId(text, sort) if sort == pos => consts.get(&text).copied(),
                    _ => None,
                };
                let k = match k {
                    Some(k) => k,
                    None => {
                        let shown = mucalc_terms::print::display_proc(self.pool, a);
                        self.diag.error(format!(
                            "cannot evaluate the parameter value in process term {shown} \
                             as a positive number"
                        ));
                        return None;
                    }
                };

                if let Some(pair) = subs[&name].iter().find(|(seen, _)| *seen == k) {
                    let expansion = pair.1;
                    return Some(self.pool.proc_ref(expansion, args[1..].to_vec()));
                }

                let decl = self.pool.proc_name_decl(name).clone();
                let sorts = decl.sorts[1..].to_vec();
                let k_text = self.pool.name(k).to_string();
                let mut base = self.pool.name(decl.name).to_string();
                let new_name = loop {
                    base = format!("{base}_{k_text}");
                    let sym = self.pool.intern(&base);
                    let candidate = self.pool.proc_name(sym, sorts.clone());
                    if !self.procs.contains_key(&candidate) {
                        break candidate;
                    }
                };
                subs.entry(name).or_default().push((k, new_name));
                Some(self.pool.proc_ref(new_name, args[1..].to_vec()))
            }
            ProcExpr::ProcRefAssign(name, _) => {
                if subs.contains_key(&name) {
                    self.diag.error(
                        "n-parallel processes in combination with short-hand assignments \
                         are not supported",
                    );
                    return None;
                }
                Some(a)
            }
            ProcExpr::Sum(vars, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Sum(vars, p)))
            }
            ProcExpr::At(p, t) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::At(p, t)))
            }
            ProcExpr::IfThen(c, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::IfThen(c, p)))
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::BoundedInit(p, q)))
            }
            ProcExpr::Block(h, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Block(h, p)))
            }
            ProcExpr::Hide(i, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Hide(i, p)))
            }
            ProcExpr::Rename(r, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Rename(r, p)))
            }
            ProcExpr::Allow(v, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Allow(v, p)))
            }
            ProcExpr::Comm(c, p) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                Some(self.pool.proc(ProcExpr::Comm(c, p)))
            }
            ProcExpr::IfThenElse(c, p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::IfThenElse(c, p, q)))
            }
            ProcExpr::Choice(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::Choice(p, q)))
            }
            ProcExpr::Seq(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::Seq(p, q)))
            }
            ProcExpr::Sync(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::Sync(p, q)))
            }
            ProcExpr::Merge(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::Merge(p, q)))
            }
            ProcExpr::LeftMerge(p, q) => {
                let p = self.subst_n_parallel(subs, consts, p)?;
                let q = self.subst_n_parallel(subs, consts, q)?;
                Some(self.pool.proc(ProcExpr::LeftMerge(p, q)))
            }
        }
    }

    /// The explicit composition `Q(1) || Q(2) || ... || Q(k)`.
    pub(crate) fn expand_n_parallel(
        &mut self,
        k: u64,
        q: ProcNameId,
        add_number: bool,
        extra: &[DataId],
    ) -> ProcId {
        let pos = self.pool.sort_pos();
        let call = |reducer: &mut Self, i: u64| {
            let mut params = extra.to_vec();
            if add_number {
                params.insert(0, reducer.pool.number(&i.to_string(), pos));
            }
            reducer.pool.proc_ref(q, params)
        };
        let mut result = call(self, 1);
        for i in 2..=k {
            let next = call(self, i);
            result = self.pool.merge(result, next);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::AlphaReducer;
    use mucalc_base::Diagnostics;
    use mucalc_terms::process::ProcEquation;
    use mucalc_terms::spec::ProcessSpec;

    fn act(pool: &mut TermPool, name: &str) -> ProcId {
        let l = pool.label_named(name, vec![]);
        let a = pool.action(l, vec![]);
        pool.act(a)
    }

    fn name(pool: &mut TermPool, text: &str) -> ProcNameId {
        let sym = pool.intern(text);
        pool.proc_name(sym, vec![])
    }

    fn spec_with(equations: Vec<(ProcNameId, ProcId)>, init: ProcId) -> ProcessSpec {
        ProcessSpec {
            data: Default::default(),
            action_labels: Vec::new(),
            global_variables: Vec::new(),
            equations: equations
                .into_iter()
                .map(|(name, body)| ProcEquation { name, parameters: Vec::new(), body })
                .collect(),
            init,
        }
    }

    #[test]
    fn sequential_recursion_is_pcrl() {
        let mut pool = TermPool::new();
        let mut diag = Diagnostics::new();
        let s = name(&mut pool, "S");
        let a = act(&mut pool, "a");
        let s_call = pool.proc_ref(s, vec![]);
        let s_body = pool.seq(a, s_call);
        let spec = spec_with(vec![(s, s_body)], s_call);

        let mut reducer = AlphaReducer::new(&mut pool, &mut diag);
        reducer.prepare(&spec).unwrap();
        assert_eq!(
            reducer.props[&s],
            ProcProps { form: ProcForm::Pcrl, recursivity: Recursivity::Recursive }
        );
    }

    #[test]
    fn parallel_over_a_recursive_process_is_mcrl() {
        let mut pool = TermPool::new();
        let mut diag = Diagnostics::new();
        let s = name(&mut pool, "S");
        let m = name(&mut pool, "M");
        let a = act(&mut pool, "a");
        let b = act(&mut pool, "b");
        let s_call = pool.proc_ref(s, vec![]);
        let s_body = pool.seq(a, s_call);
        let m_body = pool.merge(s_call, b);
        let m_call = pool.proc_ref(m, vec![]);
        let spec = spec_with(vec![(s, s_body), (m, m_body)], m_call);

        let mut reducer = AlphaReducer::new(&mut pool, &mut diag);
        reducer.prepare(&spec).unwrap();
        assert_eq!(
            reducer.props[&m],
            ProcProps { form: ProcForm::Mcrl, recursivity: Recursivity::NonRecursive }
        );
    }

    #[test]
    fn parallel_over_non_recursive_processes_stays_pcrl() {
        let mut pool = TermPool::new();
        let mut diag = Diagnostics::new();
        let p = name(&mut pool, "P");
        let q = name(&mut pool, "Q");
        let r = name(&mut pool, "R");
        let a = act(&mut pool, "a");
        let b = act(&mut pool, "b");
        let p_call = pool.proc_ref(p, vec![]);
        let q_call = pool.proc_ref(q, vec![]);
        let r_body = pool.merge(p_call, q_call);
        let r_call = pool.proc_ref(r, vec![]);
        let spec = spec_with(vec![(p, a), (q, b), (r, r_body)], r_call);

        let mut reducer = AlphaReducer::new(&mut pool, &mut diag);
        reducer.prepare(&spec).unwrap();
        assert_eq!(reducer.props[&r].form, ProcForm::Pcrl);
    }

    #[test]
    fn pos_constants_are_read_from_data_equations() {
        let mut pool = TermPool::new();
        let pos = pool.sort_pos();
        let c = pool.op_id("c", pos);
        let three = pool.number("3", pos);
        let data = mucalc_terms::spec::DataSpec {
            equations: vec![mucalc_terms::spec::DataEquation {
                variables: vec![],
                condition: None,
                lhs: c,
                rhs: three,
            }],
            ..Default::default()
        };
        let consts = collect_pos_constants(&mut pool, &data);
        let c_sym = pool.intern("c");
        let three_sym = pool.intern("3");
        assert_eq!(consts.get(&c_sym), Some(&three_sym));
    }
}
