//! The restriction pushers.
//!
//! Each pusher takes a restriction and a body and returns a semantically
//! equivalent term with the restriction driven inward where that shrinks
//! the alphabet. Every term a pusher constructs has its alphabet entered
//! into the cache at the point of construction, so enclosing pushers can
//! read it back without recomputation.
//!
//! `push_allow` and `push_comm` call back into each other through
//! `apply_alpha`; the `push_comm_through_allow` switch breaks the one
//! cycle that would otherwise not terminate, and is restored on every exit
//! path by an RAII guard.

use std::cell::Cell;
use std::rc::Rc;

use itertools::Itertools;
use mucalc_base::Symbol;
use mucalc_terms::process::{CommPair, RenamePair};
use mucalc_terms::{print, MultiNameId, ProcExpr, ProcId};

use crate::algebra::{
    apply_comms, apply_unrename_allow_list, can_split_comm, comm_lhs, comm_rhs,
    disjoint_multiaction, extend_allow_comm, extend_allow_comm_with_alpha, extend_hide,
    filter_allow_list, filter_block_list, filter_comm_list, filter_hide_list, filter_rename_list,
    get_comm_ignore_list, get_max_allowed_length, intersect_list, list_minus, merge_list,
    optimize_allow_list, split_allow, sync_alpha_union, sync_list, untype_mal, Alphabet,
};
use crate::alphabet::AlphaKey;
use crate::classify::{ProcForm, Recursivity};
use crate::driver::AlphaReducer;

/// Scoped disabling of `push_comm_through_allow`: the previous value is
/// restored when the guard is dropped, on every exit path.
pub(crate) struct CommThroughAllowGuard {
    cell: Rc<Cell<bool>>,
    prev: bool,
}

impl CommThroughAllowGuard {
    pub(crate) fn disable(cell: &Rc<Cell<bool>>) -> Self {
        let prev = cell.get();
        cell.set(false);
        CommThroughAllowGuard {
            cell: Rc::clone(cell),
            prev,
        }
    }
}

impl Drop for CommThroughAllowGuard {
    fn drop(&mut self) {
        self.cell.set(self.prev);
    }
}

impl<'a> AlphaReducer<'a> {
    /// The total alphabet of `p`, from the cache when present.
    pub(crate) fn alpha_of(&mut self, p: ProcId) -> Alphabet {
        match self.cached_alpha(p) {
            Some(l) => l,
            None => self.get_alpha(p, 0, &[]),
        }
    }

    // ---- block ---------------------------------------------------------

    /// Drives `block(h, _)` into `a`.
    pub(crate) fn push_block(&mut self, h: &[Symbol], a: ProcId) -> ProcId {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau => a,
            ProcExpr::Act(action) => {
                let name = self.pool.untype_label(self.pool.action_decl(action).label);
                if h.contains(&name) {
                    self.pool.delta()
                } else {
                    a
                }
            }
            ProcExpr::ProcRef(..) | ProcExpr::ProcRefAssign(..) => {
                let l = self.alpha_of(a);
                let l = filter_block_list(self.pool, &mut self.caches, &l, h);
                let blocked = self.pool.block(h.to_vec(), a);
                self.put_alpha(blocked, l);
                blocked
            }
            ProcExpr::Block(h2, p) => {
                let union = merge_list(h, &h2);
                self.push_block(&union, p)
            }
            ProcExpr::Hide(i, p) => {
                let h = list_minus(h, &i);
                let l = match self.cached_alpha(p) {
                    Some(l) => l,
                    None => self.get_alpha(a, 0, &[]),
                };
                let l = filter_block_list(self.pool, &mut self.caches, &l, &h);
                let p = self.push_block(&h, p);
                let hidden = self.pool.hide(i, p);
                self.put_alpha(hidden, l);
                hidden
            }
            ProcExpr::Rename(..) => {
                let l = self.alpha_of(a);
                let blocked = self.pool.block(h.to_vec(), a);
                self.put_alpha(blocked, l);
                blocked
            }
            ProcExpr::Comm(c, p) => {
                let lhs = comm_lhs(self.pool, &c);
                let rhs = comm_rhs(&c);
                let mut ha: Vec<Symbol> = Vec::new();
                let mut hc: Vec<Symbol> = Vec::new();
                for &name in h {
                    if lhs.contains(&name) || rhs.contains(&name) {
                        ha.push(name);
                    } else {
                        hc.push(name);
                    }
                }

                let mut a = a;
                if !hc.is_empty() {
                    let p = self.push_block(&hc, p);
                    a = self.pool.comm(c, p);
                }
                let a = self.apply_alpha(a);
                let l = self.alpha_of(a);

                if !ha.is_empty() {
                    let blocked = self.pool.block(ha.clone(), a);
                    let l = filter_block_list(self.pool, &mut self.caches, &l, &ha);
                    self.put_alpha(blocked, l);
                    return blocked;
                }
                a
            }
            ProcExpr::Allow(..) => {
                let l = self.alpha_of(a);
                let a = self.apply_alpha(a);
                let blocked = self.pool.block(h.to_vec(), a);
                self.put_alpha(blocked, l);
                blocked
            }
            ProcExpr::Sum(vars, p) => {
                let p = self.push_block(h, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::Sum(vars, p), l)
            }
            ProcExpr::At(p, t) => {
                let p = self.push_block(h, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::At(p, t), l)
            }
            ProcExpr::IfThen(c, p) => {
                let p = self.push_block(h, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::IfThen(c, p), l)
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.push_block(h, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::BoundedInit(p, q), l)
            }
            ProcExpr::IfThenElse(c, p, q) => {
                let p = self.push_block(h, p);
                let q = self.push_block(h, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::IfThenElse(c, p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Choice(p, q) => self.push_block_binary(h, p, q, ProcExpr::Choice, false),
            ProcExpr::Seq(p, q) => self.push_block_binary(h, p, q, ProcExpr::Seq, false),
            ProcExpr::Sync(p, q) => self.push_block_binary(h, p, q, ProcExpr::Sync, true),
            ProcExpr::Merge(p, q) => self.push_block_binary(h, p, q, ProcExpr::Merge, true),
            ProcExpr::LeftMerge(p, q) => self.push_block_binary(h, p, q, ProcExpr::LeftMerge, true),
        }
    }

    fn push_block_binary(
        &mut self,
        h: &[Symbol],
        p: ProcId,
        q: ProcId,
        rebuild: fn(ProcId, ProcId) -> ProcExpr,
        parallel: bool,
    ) -> ProcId {
        let p = self.push_block(h, p);
        let q = self.push_block(h, q);
        let l = self.binary_alpha(p, q, parallel);
        let a = self.pool.proc(rebuild(p, q));
        self.put_alpha(a, l);
        a
    }

    fn rebuild_unary(&mut self, node: ProcExpr, l: Alphabet) -> ProcId {
        let a = self.pool.proc(node);
        self.put_alpha(a, l);
        a
    }

    /// The alphabet of a rebuilt binary node: the union of the children's
    /// alphabets, plus their synchronisations for parallel operators.
    fn binary_alpha(&mut self, p: ProcId, q: ProcId, parallel: bool) -> Alphabet {
        let l1 = self.alpha_of(p);
        let l2 = self.alpha_of(q);
        if parallel {
            let s = sync_list(self.pool, &mut self.caches, &l1, &l2, 0, &[]);
            merge_list(&merge_list(&l1, &l2), &s)
        } else {
            merge_list(&l1, &l2)
        }
    }

    // ---- hide ----------------------------------------------------------

    /// Drives `hide(i, _)` into `a`.
    pub(crate) fn push_hide(&mut self, i: &[Symbol], a: ProcId) -> ProcId {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau => a,
            ProcExpr::Act(action) => {
                let name = self.pool.untype_label(self.pool.action_decl(action).label);
                if i.contains(&name) {
                    self.pool.tau()
                } else {
                    a
                }
            }
            ProcExpr::ProcRef(..) | ProcExpr::ProcRefAssign(..) => {
                let l = self.alpha_of(a);
                let l = filter_hide_list(self.pool, &l, i);
                let a = self.apply_alpha(a);
                let hidden = self.pool.hide(i.to_vec(), a);
                self.put_alpha(hidden, l);
                hidden
            }
            ProcExpr::Hide(i2, p) => {
                let union = merge_list(i, &i2);
                self.push_hide(&union, p)
            }
            ProcExpr::Block(..) | ProcExpr::Rename(..) | ProcExpr::Comm(..)
            | ProcExpr::Allow(..) => {
                let a = self.apply_alpha(a);
                let l = self.alpha_of(a);
                let l = filter_hide_list(self.pool, &l, i);
                let hidden = self.pool.hide(i.to_vec(), a);
                self.put_alpha(hidden, l);
                hidden
            }
            ProcExpr::Sum(vars, p) => {
                let p = self.push_hide(i, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::Sum(vars, p), l)
            }
            ProcExpr::At(p, t) => {
                let p = self.push_hide(i, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::At(p, t), l)
            }
            ProcExpr::IfThen(c, p) => {
                let p = self.push_hide(i, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::IfThen(c, p), l)
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.push_hide(i, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::BoundedInit(p, q), l)
            }
            ProcExpr::IfThenElse(c, p, q) => {
                let p = self.push_hide(i, p);
                let q = self.push_hide(i, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::IfThenElse(c, p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Choice(p, q) => self.push_hide_binary(i, p, q, ProcExpr::Choice, false),
            ProcExpr::Seq(p, q) => self.push_hide_binary(i, p, q, ProcExpr::Seq, false),
            ProcExpr::Sync(p, q) => self.push_hide_binary(i, p, q, ProcExpr::Sync, true),
            ProcExpr::Merge(p, q) => self.push_hide_binary(i, p, q, ProcExpr::Merge, true),
            ProcExpr::LeftMerge(p, q) => self.push_hide_binary(i, p, q, ProcExpr::LeftMerge, true),
        }
    }

    fn push_hide_binary(
        &mut self,
        i: &[Symbol],
        p: ProcId,
        q: ProcId,
        rebuild: fn(ProcId, ProcId) -> ProcExpr,
        parallel: bool,
    ) -> ProcId {
        let p = self.push_hide(i, p);
        let q = self.push_hide(i, q);
        let l = self.binary_alpha(p, q, parallel);
        let a = self.pool.proc(rebuild(p, q));
        self.put_alpha(a, l);
        a
    }

    // ---- allow ---------------------------------------------------------

    /// Drives `allow(v, _)` into `a`.
    pub(crate) fn push_allow(&mut self, v: &[MultiNameId], a: ProcId) -> ProcId {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau => a,
            ProcExpr::Act(action) => {
                let name = self.pool.untype_label(self.pool.action_decl(action).label);
                let singleton = self.pool.multi_name(vec![name]);
                if !v.contains(&singleton) {
                    self.pool.delta()
                } else {
                    self.apply_alpha(a)
                }
            }
            ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                self.push_allow_proc_ref(v, a, name)
            }
            ProcExpr::Block(h, p) => {
                let p = self.push_allow(v, p);
                let l = self.alpha_of(p);
                let l = filter_block_list(self.pool, &mut self.caches, &l, &h);
                let a = self.pool.proc(ProcExpr::Block(h, p));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Hide(i, p) => {
                let l = match self.cached_alpha(p) {
                    Some(l) => l,
                    None => self.get_alpha(p, 0, &[]),
                };
                let ul = untype_mal(self.pool, &mut self.caches, &l);
                let v1 = extend_hide(self.pool, v, &i, &ul);
                let p = self.push_allow(&v1, p);
                let l = self.alpha_of(p);
                let l = filter_hide_list(self.pool, &l, &i);
                let a = self.pool.hide(i, p);
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Rename(r, p) => {
                let v1 = apply_unrename_allow_list(self.pool, v, &r);
                let p = self.push_allow(&v1, p);
                let l = self.alpha_of(p);
                let l = filter_rename_list(self.pool, &l, &r);
                let a = self.pool.rename(r, p);
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Allow(v2, p) => {
                let both = intersect_list(v, &v2);
                self.push_allow(&both, p)
            }
            ProcExpr::Comm(c, p) => self.push_allow_comm(v, &c, p),
            ProcExpr::Sync(p, q) => self.push_allow_parallel(v, p, q, ProcExpr::Sync),
            ProcExpr::Merge(p, q) => self.push_allow_parallel(v, p, q, ProcExpr::Merge),
            ProcExpr::LeftMerge(p, q) => self.push_allow_parallel(v, p, q, ProcExpr::LeftMerge),
            ProcExpr::Sum(vars, p) => {
                let p = self.push_allow(v, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::Sum(vars, p), l)
            }
            ProcExpr::At(p, t) => {
                let p = self.push_allow(v, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::At(p, t), l)
            }
            ProcExpr::IfThen(c, p) => {
                let p = self.push_allow(v, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::IfThen(c, p), l)
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.push_allow(v, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::BoundedInit(p, q), l)
            }
            ProcExpr::IfThenElse(c, p, q) => {
                let p = self.push_allow(v, p);
                let q = self.push_allow(v, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::IfThenElse(c, p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Choice(p, q) => {
                let p = self.push_allow(v, p);
                let q = self.push_allow(v, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::Choice(p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Seq(p, q) => {
                let p = self.push_allow(v, p);
                let q = self.push_allow(v, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::Seq(p, q));
                self.put_alpha(a, l);
                a
            }
        }
    }

    /// `allow` over a process call: either the restriction is redundant,
    /// or a restricted clone of the equation is minted (for non-recursive
    /// parallel processes), or the `allow` stays wrapped.
    fn push_allow_proc_ref(
        &mut self,
        v: &[MultiNameId],
        a: ProcId,
        name: mucalc_terms::ProcNameId,
    ) -> ProcId {
        let mut full_alpha_known = true;
        let l = match self.alphas.get(&AlphaKey::Name(name)) {
            Some(l) => {
                let l = l.clone();
                self.put_alpha(a, l.clone());
                l
            }
            None => {
                full_alpha_known = false;
                let max_len = get_max_allowed_length(self.pool, v);
                self.get_alpha(a, max_len, v)
            }
        };

        let ll = l;
        let l = filter_allow_list(self.pool, &mut self.caches, &ll, v);
        if full_alpha_known && l == ll {
            // everything the process does is allowed; drop the operator
            self.put_alpha(a, l);
            return a;
        }

        let ul = untype_mal(self.pool, &mut self.caches, &l);
        let v = optimize_allow_list(v, &ul);

        let props = self.props[&name];
        if props.recursivity == Recursivity::NonRecursive && props.form != ProcForm::Pcrl {
            let key = (v.clone(), name);
            let mut call_alpha = l;
            let new_name = match self.subs_alpha.get(&key) {
                Some(&existing) => existing,
                None => {
                    let decl = self.pool.proc_name_decl(name).clone();
                    let base = self.pool.name(decl.name).to_string();
                    let mut i = 1usize;
                    let new_name = loop {
                        let candidate = format!("{base}_allow_{i}");
                        let sym = self.pool.intern(&candidate);
                        let candidate = self.pool.proc_name(sym, decl.sorts.clone());
                        if !self.procs.contains_key(&candidate) {
                            break candidate;
                        }
                        i += 1;
                    };
                    {
                        let shown = self.pool.name(self.pool.proc_name_decl(new_name).name);
                        self.diag.verbose(format!("- created process {shown}"));
                    }

                    let body = self.procs[&name];
                    let body = self.push_allow(&v, body);
                    self.procs.insert(new_name, body);
                    self.props.insert(new_name, props);
                    let body_alpha = self.alpha_of(body);
                    self.alphas.insert(AlphaKey::Name(new_name), body_alpha.clone());
                    self.subs_alpha.insert(key, new_name);
                    self.subs_alpha_rev.insert(new_name, name);
                    call_alpha = body_alpha;
                    new_name
                }
            };

            let call = match self.pool.proc_expr(a).clone() {
                ProcExpr::ProcRef(_, args) => self.pool.proc(ProcExpr::ProcRef(new_name, args)),
                ProcExpr::ProcRefAssign(_, assignments) => {
                    self.pool.proc(ProcExpr::ProcRefAssign(new_name, assignments))
                }
                _ => unreachable!("push_allow_proc_ref is only called on process references"),
            };
            self.put_alpha(call, call_alpha);
            return call;
        }

        if props.recursivity == Recursivity::NonRecursive && props.form == ProcForm::Pcrl {
            let reachable = untype_mal(self.pool, &mut self.caches, &ll);
            let disallowed = list_minus(&reachable, &v);
            if !disallowed.is_empty() {
                let shown_name = self.pool.name(self.pool.proc_name_decl(name).name).to_string();
                let allowed = v
                    .iter()
                    .map(|&m| print::display_multi_name(self.pool, m))
                    .join(", ");
                let lost = disallowed
                    .iter()
                    .map(|&m| print::display_multi_name(self.pool, m))
                    .join(", ");
                self.diag.warning(format!(
                    "an allow operation allowing only {{{allowed}}} is applied to sequential \
                     non-directly-recursive process {shown_name}; this disallows (multi-)action(s) \
                     {{{lost}}} of this process (a forgotten (multi-)action in the allow?)"
                ));
            }
        }

        let wrapped = self.pool.allow(v.clone(), a);
        let l = filter_allow_list(self.pool, &mut self.caches, &l, &v);
        self.put_alpha(wrapped, l);
        wrapped
    }

    /// The `allow` / `comm` interaction.
    fn push_allow_comm(&mut self, v: &[MultiNameId], c: &[CommPair], p: ProcId) -> ProcId {
        let mut l = self.cached_alpha(p);
        let mut v1 = Vec::new();
        if l.is_none() {
            if get_comm_ignore_list(c).is_empty() {
                v1 = extend_allow_comm(self.pool, v, c);
            } else {
                // a pair synchronises to tau; the alphabet is needed
                l = Some(self.get_alpha(p, 0, &[]));
            }
        }
        if let Some(known) = l {
            v1 = extend_allow_comm_with_alpha(self.pool, &mut self.caches, v, c, &known);
        }

        let p = self.push_allow(&v1, p);
        let l = self.alpha_of(p);
        let l = filter_comm_list(self.pool, &mut self.caches, &l, c);

        let a = self.pool.comm(c.to_vec(), p);
        let a = self.apply_alpha(a);
        self.put_alpha(a, l.clone());

        let ll = l;
        let l = filter_allow_list(self.pool, &mut self.caches, &ll, v);
        if l == ll {
            return a;
        }

        let ul = untype_mal(self.pool, &mut self.caches, &l);
        let v = optimize_allow_list(v, &ul);
        let wrapped = if matches!(self.pool.proc_expr(a), ProcExpr::Allow(..)) {
            let _guard = CommThroughAllowGuard::disable(&self.push_comm_through_allow);
            let wrapped = self.pool.allow(v.clone(), a);
            self.apply_alpha(wrapped)
        } else {
            self.pool.allow(v.clone(), a)
        };
        let l = filter_allow_list(self.pool, &mut self.caches, &l, &v);
        self.put_alpha(wrapped, l);
        wrapped
    }

    /// `allow` over a parallel composition: split the allow set along the
    /// two operand alphabets and push each part inward.
    fn push_allow_parallel(
        &mut self,
        v: &[MultiNameId],
        p: ProcId,
        q: ProcId,
        rebuild: fn(ProcId, ProcId) -> ProcExpr,
    ) -> ProcId {
        let max_len = get_max_allowed_length(self.pool, v);
        let lp = match self.cached_alpha(p) {
            Some(l) => l,
            None => self.get_alpha(p, max_len, v),
        };
        let lq = match self.cached_alpha(q) {
            Some(l) => l,
            None => self.get_alpha(q, max_len, v),
        };
        let ulp = untype_mal(self.pool, &mut self.caches, &lp);
        let ulq = untype_mal(self.pool, &mut self.caches, &lq);
        let vp = merge_list(v, &split_allow(self.pool, v, &ulp, &ulq));
        let vq = merge_list(v, &split_allow(self.pool, v, &ulq, &ulp));

        let p = self.push_allow(&vp, p);
        let q = self.push_allow(&vq, q);

        let l1 = self.alpha_of(p);
        let l2 = self.alpha_of(q);
        let s = sync_list(self.pool, &mut self.caches, &l1, &l2, 0, &[]);
        let l = merge_list(&merge_list(&l1, &l2), &s);

        let a = self.pool.proc(rebuild(p, q));

        let ll = l;
        let l = filter_allow_list(self.pool, &mut self.caches, &ll, v);
        if l == ll {
            self.put_alpha(a, l);
            return a;
        }

        let ul = untype_mal(self.pool, &mut self.caches, &l);
        let v = optimize_allow_list(v, &ul);
        let wrapped = self.pool.allow(v, a);
        self.put_alpha(wrapped, l);
        wrapped
    }

    // ---- comm ----------------------------------------------------------

    /// Drives `comm(c, _)` into `a`.
    pub(crate) fn push_comm(&mut self, c: &[CommPair], a: ProcId) -> ProcId {
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau | ProcExpr::Act(..) => a,
            ProcExpr::ProcRef(..) | ProcExpr::ProcRefAssign(..) => {
                let l = self.alpha_of(a);
                let l = filter_comm_list(self.pool, &mut self.caches, &l, c);
                let wrapped = self.pool.comm(c.to_vec(), a);
                self.put_alpha(wrapped, l);
                wrapped
            }
            ProcExpr::Block(..) | ProcExpr::Hide(..) | ProcExpr::Rename(..)
            | ProcExpr::Comm(..) => self.wrap_comm_after_alpha(c, a),
            ProcExpr::Allow(..) => {
                let a = self.apply_alpha(a);
                if !matches!(self.pool.proc_expr(a), ProcExpr::Allow(..)) {
                    return self.push_comm(c, a);
                }
                let l = self.alpha_of(a);

                if self.push_comm_through_allow.get() {
                    let (v, p) = match self.pool.proc_expr(a).clone() {
                        ProcExpr::Allow(v, p) => (v, p),
                        _ => unreachable!("checked above"),
                    };
                    let v2 = extend_allow_comm(self.pool, &v, c);
                    if v2 == v {
                        // the allow absorbs the communication: lift it
                        let lhs = comm_lhs(self.pool, c);
                        let mut v2 = v2;
                        for &ma in &l {
                            let images = apply_comms(self.pool, &mut self.caches, ma, c, &lhs);
                            let images = untype_mal(self.pool, &mut self.caches, &images);
                            v2 = merge_list(&v2, &images);
                        }
                        let p = self.push_comm(c, p);
                        let l1 = self.alpha_of(p);
                        let l1 = filter_allow_list(self.pool, &mut self.caches, &l1, &v2);
                        let ul = untype_mal(self.pool, &mut self.caches, &l1);
                        let v2 = optimize_allow_list(&v2, &ul);
                        let wrapped = self.pool.allow(v2, p);
                        self.put_alpha(wrapped, l1);
                        return wrapped;
                    }
                }

                let wrapped = self.pool.comm(c.to_vec(), a);
                let l = filter_comm_list(self.pool, &mut self.caches, &l, c);
                self.put_alpha(wrapped, l);
                wrapped
            }
            ProcExpr::Sync(p, q) => self.push_comm_parallel(c, a, p, q, ProcExpr::Sync),
            ProcExpr::Merge(p, q) => self.push_comm_parallel(c, a, p, q, ProcExpr::Merge),
            ProcExpr::LeftMerge(p, q) => self.push_comm_parallel(c, a, p, q, ProcExpr::LeftMerge),
            ProcExpr::Sum(vars, p) => {
                let p = self.push_comm(c, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::Sum(vars, p), l)
            }
            ProcExpr::At(p, t) => {
                let p = self.push_comm(c, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::At(p, t), l)
            }
            ProcExpr::IfThen(cond, p) => {
                let p = self.push_comm(c, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::IfThen(cond, p), l)
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.push_comm(c, p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::BoundedInit(p, q), l)
            }
            ProcExpr::IfThenElse(cond, p, q) => {
                let p = self.push_comm(c, p);
                let q = self.push_comm(c, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::IfThenElse(cond, p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Choice(p, q) => {
                let p = self.push_comm(c, p);
                let q = self.push_comm(c, q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::Choice(p, q));
                self.put_alpha(a, l);
                a
            }
            // not distributed over sequential composition
            ProcExpr::Seq(..) => self.wrap_comm_after_alpha(c, a),
        }
    }

    fn wrap_comm_after_alpha(&mut self, c: &[CommPair], a: ProcId) -> ProcId {
        let a = self.apply_alpha(a);
        let l = self.alpha_of(a);
        let wrapped = self.pool.comm(c.to_vec(), a);
        let l = filter_comm_list(self.pool, &mut self.caches, &l, c);
        self.put_alpha(wrapped, l);
        wrapped
    }

    /// `comm` over a parallel composition: when the left- and right-hand
    /// names of `c` are disjoint, partition the pairs by the operand
    /// alphabets they touch and recurse; pairs touching both sides stay on
    /// the composition.
    fn push_comm_parallel(
        &mut self,
        c: &[CommPair],
        a: ProcId,
        p: ProcId,
        q: ProcId,
        rebuild: fn(ProcId, ProcId) -> ProcExpr,
    ) -> ProcId {
        if !can_split_comm(self.pool, c) {
            let l = self.alpha_of(a);
            let wrapped = self.pool.comm(c.to_vec(), a);
            let l = filter_comm_list(self.pool, &mut self.caches, &l, c);
            self.put_alpha(wrapped, l);
            return wrapped;
        }

        let lp = self.alpha_of(p);
        let lq = self.alpha_of(q);
        let ulp = untype_mal(self.pool, &mut self.caches, &lp);
        let ulq = untype_mal(self.pool, &mut self.caches, &lq);

        let mut cp: Vec<CommPair> = Vec::new();
        let mut cq: Vec<CommPair> = Vec::new();
        let mut ca: Vec<CommPair> = Vec::new();
        for &pair in c {
            let bp = disjoint_multiaction(self.pool, pair.lhs, &ulp);
            let bq = disjoint_multiaction(self.pool, pair.lhs, &ulq);
            if !bp {
                if !bq {
                    ca.push(pair);
                } else {
                    cp.push(pair);
                }
            } else if !bq {
                cq.push(pair);
            }
        }

        let mut a = a;
        let mut l;
        if !(cp.is_empty() && cq.is_empty()) {
            let p = if cp.is_empty() {
                self.apply_alpha(p)
            } else {
                self.push_comm(&cp, p)
            };
            let q = if cq.is_empty() {
                self.apply_alpha(q)
            } else {
                self.push_comm(&cq, q)
            };
            let l1 = self.alpha_of(p);
            let l2 = self.alpha_of(q);
            l = sync_alpha_union(self.pool, &mut self.caches, &l1, &l2);
            a = self.pool.proc(rebuild(p, q));
            self.put_alpha(a, l.clone());
        } else {
            l = self.alpha_of(a);
        }

        if !ca.is_empty() {
            let wrapped = self.pool.comm(ca.clone(), a);
            l = filter_comm_list(self.pool, &mut self.caches, &l, &ca);
            self.put_alpha(wrapped, l);
            a = wrapped;
        }
        a
    }

    // ---- dispatch ------------------------------------------------------

    /// Applies the alphabet reductions to `a`: restriction operators are
    /// dispatched to their pushers, other operators are rebuilt around
    /// their reduced operands. The returned term always has its alphabet
    /// cached.
    pub(crate) fn apply_alpha(&mut self, a: ProcId) -> ProcId {
        debug_assert!(self.all_stable, "apply_alpha requires stable alphabets");
        match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta | ProcExpr::Tau => {
                self.put_alpha(a, Vec::new());
                a
            }
            ProcExpr::Act(action) => {
                let label = self.pool.action_decl(action).label;
                let l = match self.alphas.get(&AlphaKey::Label(label)) {
                    Some(l) => l.clone(),
                    None => {
                        let l = vec![self.pool.multi_act(vec![label])];
                        self.alphas.insert(AlphaKey::Label(label), l.clone());
                        l
                    }
                };
                self.put_alpha(a, l);
                a
            }
            ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                let mut l = self.alphas.get(&AlphaKey::Name(name)).cloned();
                if self.props[&name].recursivity == Recursivity::NonRecursive {
                    let body = self.procs[&name];
                    let body = self.apply_alpha(body);
                    self.procs.insert(name, body);
                    let body_alpha = self.alpha_of(body);
                    self.alphas.insert(AlphaKey::Name(name), body_alpha.clone());
                    if l.is_none() {
                        l = Some(body_alpha);
                    }
                }
                let l = match l {
                    Some(l) => l,
                    None => self.get_alpha(a, 0, &[]),
                };
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Block(h, p) => self.push_block(&h, p),
            ProcExpr::Hide(i, p) => self.push_hide(&i, p),
            ProcExpr::Rename(r, p) => self.apply_alpha_rename(&r, p),
            ProcExpr::Allow(v, p) => self.push_allow(&v, p),
            ProcExpr::Comm(c, p) => self.push_comm(&c, p),
            ProcExpr::Sum(vars, p) => {
                let p = self.apply_alpha(p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::Sum(vars, p), l)
            }
            ProcExpr::At(p, t) => {
                let p = self.apply_alpha(p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::At(p, t), l)
            }
            ProcExpr::IfThen(c, p) => {
                let p = self.apply_alpha(p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::IfThen(c, p), l)
            }
            ProcExpr::BoundedInit(p, q) => {
                let p = self.apply_alpha(p);
                let l = self.alpha_of(p);
                self.rebuild_unary(ProcExpr::BoundedInit(p, q), l)
            }
            ProcExpr::IfThenElse(c, p, q) => {
                let p = self.apply_alpha(p);
                let q = self.apply_alpha(q);
                let l = self.binary_alpha(p, q, false);
                let a = self.pool.proc(ProcExpr::IfThenElse(c, p, q));
                self.put_alpha(a, l);
                a
            }
            ProcExpr::Choice(p, q) => self.apply_alpha_binary(p, q, ProcExpr::Choice, false),
            ProcExpr::Seq(p, q) => self.apply_alpha_binary(p, q, ProcExpr::Seq, false),
            ProcExpr::Sync(p, q) => self.apply_alpha_binary(p, q, ProcExpr::Sync, true),
            ProcExpr::Merge(p, q) => self.apply_alpha_binary(p, q, ProcExpr::Merge, true),
            ProcExpr::LeftMerge(p, q) => self.apply_alpha_binary(p, q, ProcExpr::LeftMerge, true),
        }
    }

    fn apply_alpha_rename(&mut self, r: &[RenamePair], p: ProcId) -> ProcId {
        let p = self.apply_alpha(p);
        let l = self.alpha_of(p);
        let a = self.pool.rename(r.to_vec(), p);
        let l = filter_rename_list(self.pool, &l, r);
        self.put_alpha(a, l);
        a
    }

    fn apply_alpha_binary(
        &mut self,
        p: ProcId,
        q: ProcId,
        rebuild: fn(ProcId, ProcId) -> ProcExpr,
        parallel: bool,
    ) -> ProcId {
        let p = self.apply_alpha(p);
        let q = self.apply_alpha(q);
        let l1 = self.alpha_of(p);
        let l2 = self.alpha_of(q);
        let l = if parallel {
            sync_alpha_union(self.pool, &mut self.caches, &l1, &l2)
        } else {
            merge_list(&l1, &l2)
        };
        let a = self.pool.proc(rebuild(p, q));
        self.put_alpha(a, l);
        a
    }
}
