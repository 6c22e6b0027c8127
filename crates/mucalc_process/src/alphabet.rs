//! The alphabet calculator.
//!
//! `get_alpha` computes the set of multi-actions a process term may
//! perform, bounded by an optional maximum length and an optional list of
//! allowed untyped patterns. Both bounds exist for performance only: the
//! result may be a superset of what the bounds require, never a subset of
//! the true alphabet under them.
//!
//! Until the driver has marked every equation alphabet stable, results are
//! under-approximations and nothing is memoised; once `all_stable` holds,
//! total queries are cached per process identity and bounded queries per
//! `(identity, length, allowed)` tuple.

use mucalc_terms::{LabelId, MultiNameId, ProcExpr, ProcId, ProcNameId};

pub use crate::algebra::Alphabet;
use crate::algebra::{
    self, extend_allow_comm, filter_allow_list, filter_block_list, filter_comm_list,
    filter_hide_list, filter_rename_list, get_comm_ignore_list, get_max_allowed_length,
    get_max_comm_length, merge_list, sync_list,
};
use crate::driver::AlphaReducer;

/// Identity under which an alphabet is cached: an action label, a process
/// name, or a concrete process term.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum AlphaKey {
    Label(LabelId),
    Name(ProcNameId),
    Proc(ProcId),
}

impl<'a> AlphaReducer<'a> {
    /// The identity a term's alphabet is cached under.
    pub(crate) fn alpha_key(&self, a: ProcId) -> AlphaKey {
        match self.pool.proc_expr(a) {
            ProcExpr::Act(action) => AlphaKey::Label(self.pool.action_decl(*action).label),
            ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => AlphaKey::Name(*name),
            _ => AlphaKey::Proc(a),
        }
    }

    /// The cached total alphabet of a concrete term, if any.
    pub(crate) fn cached_alpha(&self, a: ProcId) -> Option<Alphabet> {
        self.alphas.get(&AlphaKey::Proc(a)).cloned()
    }

    pub(crate) fn put_alpha(&mut self, a: ProcId, l: Alphabet) {
        self.alphas.insert(AlphaKey::Proc(a), l);
    }

    /// Computes the alphabet of `a`, keeping only multi-actions of at most
    /// `length` components (0 = unbounded) and, when `allowed` is
    /// non-empty, only those whose untyped projection is covered by it.
    pub(crate) fn get_alpha(
        &mut self,
        a: ProcId,
        length: usize,
        allowed: &[MultiNameId],
    ) -> Alphabet {
        if self.all_stable {
            let key = self.alpha_key(a);
            if let Some(l) = self.alphas.get(&key) {
                return l.clone();
            }
            if length != 0 {
                if let Some(l) = self.partial.get(&(key, length, allowed.to_vec())) {
                    return l.clone();
                }
            }
        }

        let mut result: Option<Alphabet> = None;
        if matches!(self.pool.proc_expr(a), ProcExpr::Sync(..)) {
            result = self.get_sync_alpha(a, length, allowed);
        }

        let l = match result {
            Some(l) => l,
            None => match self.pool.proc_expr(a).clone() {
                ProcExpr::Delta | ProcExpr::Tau => Vec::new(),
                ProcExpr::Act(action) => {
                    let label = self.pool.action_decl(action).label;
                    match self.alphas.get(&AlphaKey::Label(label)) {
                        Some(l) => l.clone(),
                        None => vec![self.pool.multi_act(vec![label])],
                    }
                }
                ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                    match self.alphas.get(&AlphaKey::Name(name)) {
                        Some(l) => l.clone(),
                        None => {
                            // an mCRL process; sequential processes always
                            // have an entry after driver initialisation
                            let body = self.procs[&name];
                            self.get_alpha(body, length, allowed)
                        }
                    }
                }
                ProcExpr::Block(h, p) => {
                    let l = self.get_alpha(p, length, allowed);
                    filter_block_list(self.pool, &mut self.caches, &l, &h)
                }
                ProcExpr::Hide(i, p) => {
                    let l = self.get_alpha(p, 0, &[]);
                    filter_hide_list(self.pool, &l, &i)
                }
                ProcExpr::Rename(r, p) => {
                    let l = self.get_alpha(p, length, &[]);
                    filter_rename_list(self.pool, &l, &r)
                }
                ProcExpr::Allow(v, p) => {
                    let mut max_len = get_max_allowed_length(self.pool, &v);
                    if length != 0 && max_len > length {
                        max_len = length;
                    }
                    let l = self.get_alpha(p, max_len, &v);
                    filter_allow_list(self.pool, &mut self.caches, &l, &v)
                }
                ProcExpr::Comm(c, p) => {
                    let inner_allowed = if length != 0 && !allowed.is_empty() {
                        if get_comm_ignore_list(&c).is_empty() {
                            extend_allow_comm(self.pool, allowed, &c)
                        } else {
                            Vec::new()
                        }
                    } else {
                        allowed.to_vec()
                    };
                    let factor = get_max_comm_length(self.pool, &c);
                    let l = self.get_alpha(p, length * factor, &inner_allowed);
                    filter_comm_list(self.pool, &mut self.caches, &l, &c)
                }
                ProcExpr::Sum(_, p)
                | ProcExpr::At(p, _)
                | ProcExpr::IfThen(_, p)
                | ProcExpr::BoundedInit(p, _) => self.get_alpha(p, length, allowed),
                ProcExpr::IfThenElse(_, p, q)
                | ProcExpr::Seq(p, q)
                | ProcExpr::Choice(p, q) => {
                    let l1 = self.get_alpha(p, length, allowed);
                    let l2 = self.get_alpha(q, length, allowed);
                    merge_list(&l1, &l2)
                }
                ProcExpr::Sync(p, q) | ProcExpr::Merge(p, q) | ProcExpr::LeftMerge(p, q) => {
                    let l1 = self.get_alpha(p, length, allowed);
                    let l2 = self.get_alpha(q, length, allowed);
                    let merged = merge_list(&l1, &l2);
                    let s = sync_list(self.pool, &mut self.caches, &l1, &l2, length, allowed);
                    merge_list(&merged, &s)
                }
            },
        };

        if self.all_stable {
            let key = self.alpha_key(a);
            if length == 0 {
                self.alphas.insert(key, l.clone());
            } else {
                self.partial.insert((key, length, allowed.to_vec()), l.clone());
            }
        }
        l
    }

    /// Fast path for pure `sync` combinations of actions: computes their
    /// alphabet directly and declines (`None`) on every construct that
    /// would need the general computation.
    pub(crate) fn get_sync_alpha(
        &mut self,
        a: ProcId,
        length: usize,
        allowed: &[MultiNameId],
    ) -> Option<Alphabet> {
        let l = match self.pool.proc_expr(a).clone() {
            ProcExpr::Delta => Vec::new(),
            // τ is the empty multi-action, the unit of synchronisation
            ProcExpr::Tau => vec![self.pool.empty_multi_act()],
            ProcExpr::Act(action) => {
                let label = self.pool.action_decl(action).label;
                match self.alphas.get(&AlphaKey::Label(label)) {
                    Some(l) => l.clone(),
                    None => vec![self.pool.multi_act(vec![label])],
                }
            }
            ProcExpr::Sync(p, q) => {
                let l1 = self.get_sync_alpha(p, length, &[])?;
                let l2 = self.get_sync_alpha(q, length, &[])?;
                let l = algebra::sync_list(self.pool, &mut self.caches, &l1, &l2, length, allowed);
                if length == 0 {
                    self.put_alpha(a, l.clone());
                }
                return Some(l);
            }
            _ => return None,
        };
        Some(l)
    }
}
