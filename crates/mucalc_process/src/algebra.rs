//! The multi-action algebra.
//!
//! Alphabets are ordered, duplicate-free lists of typed multi-actions.
//! Synchronisation merges two sorted multi-actions; the result is memoised
//! symmetrically. The untyped projection is memoised per multi-action.
//! Every operation is pure up to the memo tables.

use std::cmp::Ordering;

use fnv::{FnvHashMap, FnvHashSet};
use mucalc_base::Symbol;
use mucalc_terms::process::{CommPair, RenamePair};
use mucalc_terms::{LabelId, MultiActId, MultiNameId, TermPool};

/// An alphabet: the multi-actions a process may perform, without
/// duplicates, in first-derivation order.
pub type Alphabet = Vec<MultiActId>;

/// Memo tables shared by the algebra: the symmetric synchronisation cache
/// and the untyped-projection cache.
#[derive(Default)]
pub struct AlgebraCaches {
    syncs: FnvHashMap<(MultiActId, MultiActId), MultiActId>,
    untypes: FnvHashMap<MultiActId, MultiNameId>,
}

impl AlgebraCaches {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---- generic ordered-set helpers --------------------------------------

/// `l` followed by the elements of `m` not already in `l`.
pub fn merge_list<T: Copy + PartialEq>(l: &[T], m: &[T]) -> Vec<T> {
    let mut result = l.to_vec();
    for &x in m {
        if !l.contains(&x) {
            result.push(x);
        }
    }
    result
}

/// The elements of `l` not in `m`, in order.
pub fn list_minus<T: Copy + PartialEq>(l: &[T], m: &[T]) -> Vec<T> {
    l.iter().copied().filter(|x| !m.contains(x)).collect()
}

/// The elements of `l` that also occur in `m`, in order.
pub fn intersect_list<T: Copy + PartialEq>(l: &[T], m: &[T]) -> Vec<T> {
    l.iter().copied().filter(|x| m.contains(x)).collect()
}

fn push_unique<T: Copy + PartialEq>(v: &mut Vec<T>, x: T) {
    if !v.contains(&x) {
        v.push(x);
    }
}

// ---- projections and synchronisation ----------------------------------

/// The untyped projection of a typed multi-action. Memoised.
pub fn untype_ma(pool: &mut TermPool, caches: &mut AlgebraCaches, ma: MultiActId) -> MultiNameId {
    if let Some(&r) = caches.untypes.get(&ma) {
        return r;
    }
    let names: Vec<Symbol> = pool
        .multi_act_labels(ma)
        .iter()
        .map(|&l| pool.untype_label(l))
        .collect();
    let r = pool.multi_name(names);
    caches.untypes.insert(ma, r);
    r
}

/// The distinct untyped projections of a list of multi-actions, in first
/// occurrence order.
pub fn untype_mal(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
) -> Vec<MultiNameId> {
    let mut seen = FnvHashSet::default();
    let mut result = Vec::new();
    for &ma in l {
        let u = untype_ma(pool, caches, ma);
        if seen.insert(u) {
            result.push(u);
        }
    }
    result
}

/// Merges two sorted multi-actions, preserving duplicates. Memoised in
/// both argument orders, so the operation is observably commutative.
pub fn sync_mact(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    a: MultiActId,
    b: MultiActId,
) -> MultiActId {
    if pool.multi_act_labels(a).is_empty() {
        return b;
    }
    if pool.multi_act_labels(b).is_empty() {
        return a;
    }
    if let Some(&c) = caches.syncs.get(&(a, b)) {
        return c;
    }
    let mut merged: Vec<LabelId> = Vec::new();
    {
        let la = pool.multi_act_labels(a);
        let lb = pool.multi_act_labels(b);
        let (mut i, mut j) = (0, 0);
        while i < la.len() && j < lb.len() {
            if pool.cmp_labels(la[i], lb[j]) != Ordering::Greater {
                merged.push(la[i]);
                i += 1;
            } else {
                merged.push(lb[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&la[i..]);
        merged.extend_from_slice(&lb[j..]);
    }
    let c = pool.multi_act(merged);
    caches.syncs.insert((a, b), c);
    caches.syncs.insert((b, a), c);
    c
}

/// Merges two sorted untyped multi-action names.
pub fn sync_mname(pool: &mut TermPool, a: MultiNameId, b: MultiNameId) -> MultiNameId {
    let mut names = pool.multi_name_syms(a).to_vec();
    names.extend_from_slice(&pool.multi_name_syms(b).to_vec());
    pool.multi_name(names)
}

// ---- multiset inclusion ------------------------------------------------

/// Multiset inclusion of sorted untyped multi-actions.
pub fn sub_multiaction(pool: &TermPool, l: MultiNameId, m: MultiNameId) -> bool {
    if l == m {
        return true;
    }
    let ls = pool.multi_name_syms(l);
    let ms = pool.multi_name_syms(m);
    let (mut i, mut j) = (0, 0);
    while i < ls.len() {
        if j >= ms.len() {
            return false;
        }
        match pool.cmp_names(ls[i], ms[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Less => return false,
        }
    }
    true
}

/// True if `ma` is a sub-multi-action of some element of `list`.
pub fn sub_multiaction_list(pool: &TermPool, ma: MultiNameId, list: &[MultiNameId]) -> bool {
    list.iter().any(|&m| sub_multiaction(pool, ma, m))
}

/// True if no name of `ma` occurs in any element of `list`.
pub fn disjoint_multiaction(pool: &TermPool, ma: MultiNameId, list: &[MultiNameId]) -> bool {
    let names = pool.multi_name_syms(ma);
    list.iter().all(|&m| {
        let ms = pool.multi_name_syms(m);
        !names.iter().any(|n| ms.contains(n))
    })
}

// ---- cartesian synchronisation ----------------------------------------

/// Cartesian synchronisation of two alphabets. Results longer than
/// `length` (when non-zero) are discarded, and so are results whose
/// untyped projection is not covered by `allowed` (when non-empty).
pub fn sync_list(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
    m: &[MultiActId],
    length: usize,
    allowed: &[MultiNameId],
) -> Alphabet {
    let mut result: Alphabet = Vec::new();
    for &ll in l {
        for &oo in m {
            let ma = sync_mact(pool, caches, ll, oo);
            if length != 0 && pool.multi_act_len(ma) > length {
                continue;
            }
            if !allowed.is_empty() {
                let u = untype_ma(pool, caches, ma);
                if !sub_multiaction_list(pool, u, allowed) {
                    continue;
                }
            }
            push_unique(&mut result, ma);
        }
    }
    result
}

/// The union of `l`, `m`, and their cartesian synchronisation, without
/// duplicates.
pub fn sync_alpha_union(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
    m: &[MultiActId],
) -> Alphabet {
    let mut seen: FnvHashSet<MultiActId> = FnvHashSet::default();
    let mut result = Vec::new();
    for &x in l.iter().chain(m.iter()) {
        if seen.insert(x) {
            result.push(x);
        }
    }
    for &ll in l {
        for &oo in m {
            let ma = sync_mact(pool, caches, ll, oo);
            if seen.insert(ma) {
                result.push(ma);
            }
        }
    }
    result
}

/// Cartesian synchronisation of untyped multi-action lists.
pub fn mname_sync_list(
    pool: &mut TermPool,
    l: &[MultiNameId],
    m: &[MultiNameId],
) -> Vec<MultiNameId> {
    let mut result = Vec::new();
    for &ll in l {
        for &oo in m {
            push_unique(&mut result, sync_mname(pool, ll, oo));
        }
    }
    result
}

// ---- filters for the pushers ------------------------------------------

/// Drops the multi-actions that mention a name of `h`.
pub fn filter_block_list(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
    h: &[Symbol],
) -> Alphabet {
    let mut result = Vec::new();
    for &ma in l {
        let u = untype_ma(pool, caches, ma);
        let names = pool.multi_name_syms(u);
        if !h.iter().any(|n| names.contains(n)) {
            result.push(ma);
        }
    }
    result
}

/// Renames the actions of `i` to τ, dropping multi-actions that become
/// empty and merging duplicates.
pub fn filter_hide_list(pool: &mut TermPool, l: &[MultiActId], i: &[Symbol]) -> Alphabet {
    let mut result: Alphabet = Vec::new();
    for &ma in l {
        let kept: Vec<LabelId> = pool
            .multi_act_labels(ma)
            .iter()
            .copied()
            .filter(|&lbl| !i.contains(&pool.untype_label(lbl)))
            .collect();
        if kept.is_empty() {
            continue;
        }
        let new_ma = pool.multi_act(kept);
        push_unique(&mut result, new_ma);
    }
    result
}

/// Keeps the multi-actions whose untyped projection is an element of `v`.
pub fn filter_allow_list(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
    v: &[MultiNameId],
) -> Alphabet {
    let mut result = Vec::new();
    for &ma in l {
        let u = untype_ma(pool, caches, ma);
        if v.contains(&u) {
            result.push(ma);
        }
    }
    result
}

/// Applies a rename set to every multi-action of an alphabet.
pub fn filter_rename_list(pool: &mut TermPool, l: &[MultiActId], r: &[RenamePair]) -> Alphabet {
    let mut result = Vec::new();
    for &ma in l {
        push_unique(&mut result, apply_rename(pool, ma, r));
    }
    result
}

/// Applies a communication set to every multi-action of an alphabet. The
/// empty multi-action (a communication to τ) is not recorded.
pub fn filter_comm_list(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    l: &[MultiActId],
    c: &[CommPair],
) -> Alphabet {
    let lhs = comm_lhs(pool, c);
    let empty = pool.empty_multi_act();
    let mut seen: FnvHashSet<MultiActId> = FnvHashSet::default();
    let mut result = Vec::new();
    for &ma in l {
        for res in apply_comms(pool, caches, ma, c, &lhs) {
            if res != empty && seen.insert(res) {
                result.push(res);
            }
        }
    }
    result
}

// ---- allow / comm support ---------------------------------------------

/// The length of the longest allowed multi-action, at least 1.
pub fn get_max_allowed_length(pool: &TermPool, v: &[MultiNameId]) -> usize {
    v.iter()
        .map(|&ma| pool.multi_name_len(ma))
        .fold(1, usize::max)
}

/// The factor by which a communication set can lengthen tracked
/// multi-actions: the longest left-hand side, or 0 (unbounded) when some
/// pair synchronises to τ.
pub fn get_max_comm_length(pool: &TermPool, c: &[CommPair]) -> usize {
    let mut m = 1;
    for pair in c {
        if pair.rhs.is_none() {
            return 0;
        }
        m = m.max(pool.multi_name_len(pair.lhs));
    }
    m
}

/// The subset of `v` that occurs in `ul`.
pub fn optimize_allow_list(v: &[MultiNameId], ul: &[MultiNameId]) -> Vec<MultiNameId> {
    v.iter().copied().filter(|ma| ul.contains(ma)).collect()
}

/// The part of `v` relevant on the side with alphabet `ulp` when the
/// opposite side has alphabet `ulq`: those `up` for which some `uq` makes
/// `up · uq` allowed.
pub fn split_allow(
    pool: &mut TermPool,
    v: &[MultiNameId],
    ulp: &[MultiNameId],
    ulq: &[MultiNameId],
) -> Vec<MultiNameId> {
    let vv: FnvHashSet<MultiNameId> = v.iter().copied().collect();
    let mut m = Vec::new();
    for &up in ulp {
        for &uq in ulq {
            if vv.contains(&sync_mname(pool, up, uq)) {
                push_unique(&mut m, up);
                break;
            }
        }
    }
    m
}

/// Removes the names of `i` from an untyped multi-action.
pub fn apply_hide_names(pool: &mut TermPool, i: &[Symbol], ma: MultiNameId) -> MultiNameId {
    let kept: Vec<Symbol> = pool
        .multi_name_syms(ma)
        .iter()
        .copied()
        .filter(|n| !i.contains(n))
        .collect();
    pool.multi_name(kept)
}

/// Extends `v` so that hiding `i` afterwards allows the same behaviour:
/// keeps those elements of `l` whose `i`-hiding is empty or in `v`.
pub fn extend_hide(
    pool: &mut TermPool,
    v: &[MultiNameId],
    i: &[Symbol],
    l: &[MultiNameId],
) -> Vec<MultiNameId> {
    let empty = pool.empty_multi_name();
    let mut result = Vec::new();
    for &ma in l {
        let hidden = apply_hide_names(pool, i, ma);
        if (hidden == empty || v.contains(&hidden)) && !result.contains(&ma) {
            result.push(ma);
        }
    }
    result
}

/// All left-hand-side names of a communication set, with multiplicities.
pub fn comm_lhs(pool: &TermPool, c: &[CommPair]) -> Vec<Symbol> {
    let mut result = Vec::new();
    for pair in c {
        result.extend_from_slice(pool.multi_name_syms(pair.lhs));
    }
    result
}

/// All right-hand-side names of a communication set; τ targets are
/// skipped.
pub fn comm_rhs(c: &[CommPair]) -> Vec<Symbol> {
    c.iter().filter_map(|pair| pair.rhs).collect()
}

/// True if the left- and right-hand-side names of `c` are disjoint, which
/// permits partitioning the set over a parallel composition.
pub fn can_split_comm(pool: &TermPool, c: &[CommPair]) -> bool {
    let rhs = comm_rhs(c);
    comm_lhs(pool, c).iter().all(|n| !rhs.contains(n))
}

/// The left-hand sides of the pairs that synchronise to τ.
pub fn get_comm_ignore_list(c: &[CommPair]) -> Vec<MultiNameId> {
    c.iter()
        .filter(|pair| pair.rhs.is_none())
        .map(|pair| pair.lhs)
        .collect()
}

// ---- rename ------------------------------------------------------------

/// Applies a rename set to a typed multi-action.
pub fn apply_rename(pool: &mut TermPool, ma: MultiActId, r: &[RenamePair]) -> MultiActId {
    let labels: Vec<LabelId> = pool.multi_act_labels(ma).to_vec();
    let renamed: Vec<LabelId> = labels
        .into_iter()
        .map(|lbl| {
            let decl = pool.label_decl(lbl).clone();
            match r.iter().find(|pair| pair.from == decl.name) {
                Some(pair) => pool.label(pair.to, decl.sorts),
                None => lbl,
            }
        })
        .collect();
    pool.multi_act(renamed)
}

/// The inverse image of an untyped multi-action under a rename set: every
/// name is replaced by each of its preimages (or kept when it has none),
/// and the combinations are synchronised.
pub fn apply_unrename(pool: &mut TermPool, ma: MultiNameId, r: &[RenamePair]) -> Vec<MultiNameId> {
    let mut m = vec![pool.empty_multi_name()];
    let names = pool.multi_name_syms(ma).to_vec();
    for a in names {
        let mut preimages: Vec<MultiNameId> = Vec::new();
        for pair in r {
            if pair.to == a {
                push_unique(&mut preimages, pool.multi_name(vec![pair.from]));
            }
        }
        if preimages.is_empty() {
            preimages.push(pool.multi_name(vec![a]));
        }
        m = mname_sync_list(pool, &m, &preimages);
    }
    m
}

/// The inverse image of a whole allow set under a rename set.
pub fn apply_unrename_allow_list(
    pool: &mut TermPool,
    v: &[MultiNameId],
    r: &[RenamePair],
) -> Vec<MultiNameId> {
    let mut m: Vec<MultiNameId> = Vec::new();
    for &ma in v {
        for x in apply_unrename(pool, ma, r) {
            push_unique(&mut m, x);
        }
    }
    m
}

// ---- communication -----------------------------------------------------

fn multiset_minus(l: &[LabelId], m: &[LabelId]) -> Vec<LabelId> {
    let mut result = l.to_vec();
    for &x in m {
        if let Some(pos) = result.iter().position(|&y| y == x) {
            result.remove(pos);
        }
    }
    result
}

/// All possible results of applying a communication set to one typed
/// multi-action. When the participating actions carry data, the
/// communication may or may not fire depending on the argument values, so
/// the result is an alphabet rather than a single multi-action.
pub fn apply_comms(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    ma: MultiActId,
    c: &[CommPair],
    lhs: &[Symbol],
) -> Vec<MultiActId> {
    let labels: Vec<LabelId> = pool.multi_act_labels(ma).to_vec();
    let untouched: Vec<LabelId> = labels
        .iter()
        .copied()
        .filter(|&l| !lhs.contains(&pool.untype_label(l)))
        .collect();
    if untouched.len() == labels.len() {
        return vec![ma]; // the communication set does not apply
    }
    let touched = multiset_minus(&labels, &untouched);

    let empty = pool.empty_multi_act();
    let mut m: Vec<MultiActId> = vec![empty];
    let mut worklist = touched;
    while !worklist.is_empty() {
        let a = worklist.remove(0);
        let a_name = pool.untype_label(a);
        let s = pool.label_decl(a).sorts.clone();
        let mut applied = false;
        for pair in c {
            let cl = pool.multi_name_syms(pair.lhs).to_vec();
            if !cl.contains(&a_name) {
                continue;
            }
            let mut rest = cl.clone();
            if let Some(pos) = rest.iter().position(|&n| n == a_name) {
                rest.remove(pos);
            }

            // the remaining partners must be present with the same type
            let mut remaining = worklist.clone();
            let mut complete = true;
            for &name in &rest {
                let partner = pool.label(name, s.clone());
                match remaining.iter().position(|&x| x == partner) {
                    Some(p) => {
                        remaining.remove(p);
                    }
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                applied = true;
                worklist = remaining;
                let mut tm: Vec<MultiActId> = Vec::new();
                if !s.is_empty() {
                    // data arguments may differ, so the unsynchronised
                    // combination stays possible
                    let full: Vec<LabelId> =
                        cl.iter().map(|&n| pool.label(n, s.clone())).collect();
                    tm.push(pool.multi_act(full));
                }
                let fired = match pair.rhs {
                    Some(rhs) => {
                        let lbl = pool.label(rhs, s.clone());
                        pool.multi_act(vec![lbl])
                    }
                    None => empty,
                };
                push_unique(&mut tm, fired);
                m = sync_list(pool, caches, &m, &tm, 0, &[]);
                break;
            }
        }
        if !applied {
            let single = pool.multi_act(vec![a]);
            m = sync_list(pool, caches, &m, &[single], 0, &[]);
        }
    }

    if !untouched.is_empty() {
        let rest_ma = pool.multi_act(untouched);
        m = sync_list(pool, caches, &[rest_ma], &m, 0, &[]);
    }
    m
}

/// Extends `v` to `v1` such that `allow_v ∘ comm_c = allow_v ∘ comm_c ∘
/// allow_v1`, using only the communication set.
pub fn extend_allow_comm(
    pool: &mut TermPool,
    v: &[MultiNameId],
    c: &[CommPair],
) -> Vec<MultiNameId> {
    let mut rev: FnvHashMap<Symbol, Vec<MultiNameId>> = FnvHashMap::default();
    for pair in c {
        if let Some(target) = pair.rhs {
            rev.entry(target).or_default().push(pair.lhs);
        }
    }

    let mut m: Vec<MultiNameId> = Vec::new();
    for &tv in v {
        push_unique(&mut m, tv);
    }
    for &tv in v {
        let names = pool.multi_name_syms(tv).to_vec();
        let mut res = vec![pool.empty_multi_name()];
        for a in names {
            let single = pool.multi_name(vec![a]);
            let preimages = match rev.get(&a) {
                Some(list) => {
                    let mut list = list.clone();
                    push_unique(&mut list, single);
                    list
                }
                None => vec![single],
            };
            res = mname_sync_list(pool, &res, &preimages);
        }
        for x in res {
            push_unique(&mut m, x);
        }
    }
    m
}

/// Extends `v` as [`extend_allow_comm`] but against the known alphabet `l`
/// of the operand: keeps exactly the projections of `l` whose
/// communication images intersect `v ∪ {τ}`.
pub fn extend_allow_comm_with_alpha(
    pool: &mut TermPool,
    caches: &mut AlgebraCaches,
    v: &[MultiNameId],
    c: &[CommPair],
    l: &[MultiActId],
) -> Vec<MultiNameId> {
    let mut nv: Vec<MultiNameId> = Vec::with_capacity(v.len() + 1);
    nv.push(pool.empty_multi_name()); // communications to τ stay allowed
    nv.extend_from_slice(v);

    let lhs = comm_lhs(pool, c);
    let mut result: Vec<MultiNameId> = Vec::new();
    for &ma in l {
        let man = untype_ma(pool, caches, ma);
        if result.contains(&man) {
            continue;
        }
        let images = apply_comms(pool, caches, ma, c, &lhs);
        let images_untyped = untype_mal(pool, caches, &images);
        if images_untyped.iter().any(|u| nv.contains(u)) {
            result.push(man);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(pool: &mut TermPool, name: &str) -> LabelId {
        pool.label_named(name, vec![])
    }

    fn mact(pool: &mut TermPool, names: &[&str]) -> MultiActId {
        let labels = names.iter().map(|n| label(pool, n)).collect();
        pool.multi_act(labels)
    }

    fn mname(pool: &mut TermPool, names: &[&str]) -> MultiNameId {
        let syms = names.iter().map(|n| pool.intern(n)).collect();
        pool.multi_name(syms)
    }

    #[test]
    fn sync_mact_is_commutative() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let ab = mact(&mut pool, &["a", "b"]);
        let c = mact(&mut pool, &["c"]);
        let left = sync_mact(&mut pool, &mut caches, ab, c);
        let right = sync_mact(&mut pool, &mut caches, c, ab);
        assert_eq!(left, right);
        assert_eq!(left, mact(&mut pool, &["a", "b", "c"]));
    }

    #[test]
    fn sync_with_tau_is_neutral() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let tau = pool.empty_multi_act();
        let a = mact(&mut pool, &["a"]);
        assert_eq!(sync_mact(&mut pool, &mut caches, tau, a), a);
        assert_eq!(sync_mact(&mut pool, &mut caches, a, tau), a);
    }

    #[test]
    fn sync_preserves_duplicates() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let a = mact(&mut pool, &["a"]);
        let aa = sync_mact(&mut pool, &mut caches, a, a);
        assert_eq!(aa, mact(&mut pool, &["a", "a"]));
    }

    #[test]
    fn untype_is_idempotent_on_projections() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let nat = pool.sort_nat();
        let a_typed = pool.label_named("a", vec![nat]);
        let b = label(&mut pool, "b");
        let ma = pool.multi_act(vec![a_typed, b]);
        let u = untype_ma(&mut pool, &mut caches, ma);
        assert_eq!(u, mname(&mut pool, &["a", "b"]));
        // memo hit returns the identical id
        assert_eq!(untype_ma(&mut pool, &mut caches, ma), u);
    }

    #[test]
    fn untype_is_monotone_for_sub_multiactions() {
        let mut pool = TermPool::new();
        let sub = mname(&mut pool, &["a"]);
        let sup = mname(&mut pool, &["a", "b"]);
        assert!(sub_multiaction(&pool, sub, sup));
        assert!(!sub_multiaction(&pool, sup, sub));
        let dup = mname(&mut pool, &["a", "a"]);
        assert!(!sub_multiaction(&pool, dup, sup));
    }

    #[test]
    fn sync_list_respects_length_bound() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let a = mact(&mut pool, &["a"]);
        let bc = mact(&mut pool, &["b", "c"]);
        let all = sync_list(&mut pool, &mut caches, &[a, bc], &[a, bc], 0, &[]);
        assert_eq!(all.len(), 3); // a|a, a|b|c, b|b|c|c
        let bounded = sync_list(&mut pool, &mut caches, &[a, bc], &[a, bc], 2, &[]);
        assert_eq!(bounded, vec![mact(&mut pool, &["a", "a"])]);
    }

    #[test]
    fn sync_list_respects_allowed_patterns() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let a = mact(&mut pool, &["a"]);
        let b = mact(&mut pool, &["b"]);
        let ab = mname(&mut pool, &["a", "b"]);
        let filtered = sync_list(&mut pool, &mut caches, &[a, b], &[a, b], 0, &[ab]);
        // a|a and b|b are not sub-multi-actions of a|b
        assert_eq!(filtered, vec![mact(&mut pool, &["a", "b"])]);
    }

    #[test]
    fn block_filter_drops_touching_multiactions() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let ab = mact(&mut pool, &["a", "b"]);
        let c = mact(&mut pool, &["c"]);
        let h = vec![pool.intern("a")];
        let kept = filter_block_list(&mut pool, &mut caches, &[ab, c], &h);
        assert_eq!(kept, vec![c]);
    }

    #[test]
    fn hide_filter_removes_names_and_empties() {
        let mut pool = TermPool::new();
        let ab = mact(&mut pool, &["a", "b"]);
        let a = mact(&mut pool, &["a"]);
        let i = vec![pool.intern("a")];
        let hidden = filter_hide_list(&mut pool, &[ab, a], &i);
        assert_eq!(hidden, vec![mact(&mut pool, &["b"])]);
    }

    #[test]
    fn rename_applies_and_resorts() {
        let mut pool = TermPool::new();
        let cb = mact(&mut pool, &["c", "b"]);
        let r = vec![RenamePair { from: pool.intern("c"), to: pool.intern("a") }];
        let renamed = apply_rename(&mut pool, cb, &r);
        assert_eq!(renamed, mact(&mut pool, &["a", "b"]));
    }

    #[test]
    fn unrename_yields_all_preimages() {
        let mut pool = TermPool::new();
        let c = mname(&mut pool, &["c"]);
        let r = vec![
            RenamePair { from: pool.intern("a"), to: pool.intern("c") },
            RenamePair { from: pool.intern("b"), to: pool.intern("c") },
        ];
        let pre = apply_unrename(&mut pool, c, &r);
        assert_eq!(pre.len(), 2);
        assert!(pre.contains(&mname(&mut pool, &["a"])));
        assert!(pre.contains(&mname(&mut pool, &["b"])));
    }

    #[test]
    fn apply_comms_without_data_fires_definitely() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let ab = mact(&mut pool, &["a", "b"]);
        let c = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("c")),
        }];
        let lhs = comm_lhs(&pool, &c);
        let images = apply_comms(&mut pool, &mut caches, ab, &c, &lhs);
        assert_eq!(images, vec![mact(&mut pool, &["c"])]);
    }

    #[test]
    fn apply_comms_with_data_keeps_both_outcomes() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let nat = pool.sort_nat();
        let a = pool.label_named("a", vec![nat]);
        let b = pool.label_named("b", vec![nat]);
        let ab = pool.multi_act(vec![a, b]);
        let c = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("c")),
        }];
        let lhs = comm_lhs(&pool, &c);
        let images = apply_comms(&mut pool, &mut caches, ab, &c, &lhs);
        // either the data matched (c) or it did not (a|b stays)
        let c_typed = pool.label_named("c", vec![nat]);
        let fired = pool.multi_act(vec![c_typed]);
        assert_eq!(images.len(), 2);
        assert!(images.contains(&fired));
        assert!(images.contains(&ab));
    }

    #[test]
    fn apply_comms_leaves_foreign_actions_alone() {
        let mut pool = TermPool::new();
        let mut caches = AlgebraCaches::new();
        let abd = mact(&mut pool, &["a", "b", "d"]);
        let c = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("c")),
        }];
        let lhs = comm_lhs(&pool, &c);
        let images = apply_comms(&mut pool, &mut caches, abd, &c, &lhs);
        assert_eq!(images, vec![mact(&mut pool, &["c", "d"])]);
    }

    #[test]
    fn comm_split_detection() {
        let mut pool = TermPool::new();
        let good = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("c")),
        }];
        assert!(can_split_comm(&pool, &good));
        let bad = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("a")),
        }];
        assert!(!can_split_comm(&pool, &bad));
    }

    #[test]
    fn extend_allow_comm_adds_preimages() {
        let mut pool = TermPool::new();
        let c_name = mname(&mut pool, &["c"]);
        let comm = vec![CommPair {
            lhs: mname(&mut pool, &["a", "b"]),
            rhs: Some(pool.intern("c")),
        }];
        let extended = extend_allow_comm(&mut pool, &[c_name], &comm);
        assert!(extended.contains(&c_name));
        assert!(extended.contains(&mname(&mut pool, &["a", "b"])));
    }

    #[test]
    fn split_allow_keeps_joinable_parts() {
        let mut pool = TermPool::new();
        let ab = mname(&mut pool, &["a", "b"]);
        let a = mname(&mut pool, &["a"]);
        let b = mname(&mut pool, &["b"]);
        let d = mname(&mut pool, &["d"]);
        let vp = split_allow(&mut pool, &[ab], &[a, d], &[b]);
        assert_eq!(vp, vec![a]);
    }
}
