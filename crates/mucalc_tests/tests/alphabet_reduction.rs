//! End-to-end tests of the alphabet calculator and the reduction driver.

mod common;

use common::{act, comm_pair, mname, proc_name, spec_of, spec_with};
use mucalc_base::Diagnostics;
use mucalc_process::algebra::{untype_ma, AlgebraCaches};
use mucalc_process::{alphabet_reduce, process_alphabet};
use mucalc_terms::process::CommPair;
use mucalc_terms::{MultiNameId, ProcExpr, ProcId, TermPool};

fn untyped_set(pool: &mut TermPool, alpha: &[mucalc_terms::MultiActId]) -> Vec<MultiNameId> {
    let mut caches = AlgebraCaches::new();
    let mut names: Vec<MultiNameId> = alpha
        .iter()
        .map(|&ma| untype_ma(pool, &mut caches, ma))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// `a || (b || c)` may do every non-empty combination of its components.
#[test]
fn alphabet_of_three_way_parallel() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let c = act(&mut pool, "c");
    let bc = pool.merge(b, c);
    let init = pool.merge(a, bc);
    let spec = spec_of(init);

    let alpha = process_alphabet(&mut pool, &spec, init, &mut diag).unwrap();
    assert_eq!(alpha.len(), 7);

    let mut expected: Vec<MultiNameId> = [
        vec!["a"],
        vec!["b"],
        vec!["c"],
        vec!["b", "c"],
        vec!["a", "b"],
        vec!["a", "c"],
        vec!["a", "b", "c"],
    ]
    .iter()
    .map(|names| mname(&mut pool, &names.iter().copied().collect::<Vec<_>>()))
    .collect();
    expected.sort_unstable();
    assert_eq!(untyped_set(&mut pool, &alpha), expected);
}

#[test]
fn block_filters_touching_multiactions() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let h = vec![pool.intern("a")];
    let blocked = pool.block(h, par);
    let spec = spec_of(blocked);

    let alpha = process_alphabet(&mut pool, &spec, blocked, &mut diag).unwrap();
    let expected = vec![mname(&mut pool, &["b"])];
    assert_eq!(untyped_set(&mut pool, &alpha), expected);
}

#[test]
fn hide_renames_to_tau_and_drops_empties() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let i = vec![pool.intern("a")];
    let hidden = pool.hide(i, par);
    let spec = spec_of(hidden);

    // {a}, {b}, {a|b} hiding a leaves {b} twice and the empty trace once
    let alpha = process_alphabet(&mut pool, &spec, hidden, &mut diag).unwrap();
    let expected = vec![mname(&mut pool, &["b"])];
    assert_eq!(untyped_set(&mut pool, &alpha), expected);
}

/// Restricting a process to its own alphabet changes nothing.
#[test]
fn allow_of_own_alphabet_is_identity() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let spec = spec_of(par);

    let alpha = process_alphabet(&mut pool, &spec, par, &mut diag).unwrap();
    let own = untyped_set(&mut pool, &alpha);
    let allowed = pool.allow(own.clone(), par);
    let spec = spec_of(allowed);
    let restricted = process_alphabet(&mut pool, &spec, allowed, &mut diag).unwrap();
    assert_eq!(untyped_set(&mut pool, &restricted), own);
}

#[test]
fn sync_with_tau_is_neutral_for_alphabets() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let tau = pool.tau();
    let sync = pool.proc(ProcExpr::Sync(tau, a));
    let spec = spec_of(sync);

    let alpha = process_alphabet(&mut pool, &spec, sync, &mut diag).unwrap();
    let expected = vec![mname(&mut pool, &["a"])];
    assert_eq!(untyped_set(&mut pool, &alpha), expected);
}

#[test]
fn empty_allow_reduces_to_deadlock() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let restricted = pool.allow(vec![], a);
    let spec = spec_of(restricted);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    assert!(matches!(pool.proc_expr(reduced.init), ProcExpr::Delta));
}

#[test]
fn empty_comm_reduces_to_operand() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let wrapped = pool.comm(vec![], par);
    let spec = spec_of(wrapped);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    assert!(matches!(pool.proc_expr(reduced.init), ProcExpr::Merge(..)));
}

/// A redundant allow around a sequential process call is dropped.
#[test]
fn redundant_allow_around_call_is_dropped() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let s = proc_name(&mut pool, "S");
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let body = pool.choice(a, b);
    let call = pool.proc_ref(s, vec![]);
    let va = mname(&mut pool, &["a"]);
    let vb = mname(&mut pool, &["b"]);
    let init = pool.allow(vec![va, vb], call);
    let spec = spec_with(vec![(s, body)], init);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    assert!(matches!(pool.proc_expr(reduced.init), ProcExpr::ProcRef(..)));
    assert!(diag.warnings().count() == 0);
}

/// Nested identical allows collapse to a single operator.
#[test]
fn nested_allow_collapses() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let ab = mname(&mut pool, &["a", "b"]);
    let inner = pool.allow(vec![ab], par);
    let outer = pool.allow(vec![ab], inner);
    let spec = spec_of(outer);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    let body = match pool.proc_expr(reduced.init).clone() {
        ProcExpr::Allow(v, body) => {
            assert_eq!(v, vec![ab]);
            body
        }
        other => panic!("expected a single allow, got {other:?}"),
    };
    assert!(matches!(pool.proc_expr(body), ProcExpr::Merge(..)));
}

/// An allow that forbids reachable behaviour of a sequential process is
/// kept, with a warning.
#[test]
fn too_strict_allow_warns() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let s = proc_name(&mut pool, "S");
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let body = pool.choice(a, b);
    let call = pool.proc_ref(s, vec![]);
    let va = mname(&mut pool, &["a"]);
    let init = pool.allow(vec![va], call);
    let spec = spec_with(vec![(s, body)], init);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    assert!(matches!(pool.proc_expr(reduced.init), ProcExpr::Allow(..)));
    assert!(diag.warnings().any(|w| w.message.contains("disallows")));
}

/// Splitting a block around a communication: names used by the
/// communication stay outside, the rest moves inside.
#[test]
fn block_splits_around_comm() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let d = act(&mut pool, "d");
    let ab = pool.sync(a, b);
    let body = pool.merge(ab, d);
    let pair = comm_pair(&mut pool, &["a", "b"], "c");
    let comm = pool.comm(vec![pair], body);
    let h = vec![pool.intern("a"), pool.intern("e")];
    let init = pool.block(h, comm);
    let spec = spec_of(init);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    // `a` participates in the communication, so only it stays blocked
    // outside; `e` is pushed into the operand and evaporates there, and
    // the communication itself moves onto the synchronising operand
    let (outer_h, inner) = match pool.proc_expr(reduced.init).clone() {
        ProcExpr::Block(h, inner) => (h, inner),
        other => panic!("expected block at the top, got {other:?}"),
    };
    assert_eq!(outer_h, vec![pool.intern("a")]);
    fn contains_comm(pool: &TermPool, id: ProcId) -> bool {
        match pool.proc_expr(id).clone() {
            ProcExpr::Comm(..) => true,
            ProcExpr::Merge(l, r) | ProcExpr::Sync(l, r) => {
                contains_comm(pool, l) || contains_comm(pool, r)
            }
            _ => false,
        }
    }
    assert!(matches!(pool.proc_expr(inner), ProcExpr::Merge(..)));
    assert!(contains_comm(&pool, inner));
}

/// A non-recursive parallel equation under an allow is cloned into a
/// restricted equation, and the result stays closed.
#[test]
fn allow_clones_parallel_equation() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let r = proc_name(&mut pool, "R");
    let m = proc_name(&mut pool, "M");
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let r_call = pool.proc_ref(r, vec![]);
    let r_body = pool.seq(a, r_call);
    let m_body = pool.merge(r_call, b);
    let m_call = pool.proc_ref(m, vec![]);
    let va = mname(&mut pool, &["a"]);
    let init = pool.allow(vec![va], m_call);
    let spec = spec_with(vec![(r, r_body), (m, m_body)], init);

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();

    // the initial expression now calls the restricted clone
    let clone_name = match pool.proc_expr(reduced.init).clone() {
        ProcExpr::ProcRef(name, _) => name,
        other => panic!("expected a call to the clone, got {other:?}"),
    };
    assert_ne!(clone_name, m);
    let shown = pool.name(pool.proc_name_decl(clone_name).name).to_string();
    assert!(shown.contains("_allow_"), "unexpected clone name {shown}");

    // closedness: every referenced equation is part of the result
    let defined: Vec<_> = reduced.equations.iter().map(|eq| eq.name).collect();
    assert!(defined.contains(&clone_name));
    assert!(defined.contains(&r));
}

/// Rerunning the driver on its own output changes nothing.
#[test]
fn reduction_is_idempotent() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let d = act(&mut pool, "d");
    let ab = pool.sync(a, b);
    let body = pool.merge(ab, d);
    let pair = comm_pair(&mut pool, &["a", "b"], "c");
    let comm = pool.comm(vec![pair], body);
    let vc = mname(&mut pool, &["c"]);
    let vd = mname(&mut pool, &["d"]);
    let init = pool.allow(vec![vc, vd], comm);
    let spec = spec_of(init);

    let once = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();
    let twice = alphabet_reduce(&mut pool, &once, &mut diag).unwrap();
    assert_eq!(once.init, twice.init);
    let first: Vec<_> = once.equations.iter().map(|eq| (eq.name, eq.body)).collect();
    let second: Vec<_> = twice.equations.iter().map(|eq| (eq.name, eq.body)).collect();
    assert_eq!(first, second);
}

/// The n-parallel replication pattern is recognised and expanded per
/// constant call site.
#[test]
fn n_parallel_replication_expands() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();

    let pos = pool.sort_pos();
    let n_sym = pool.intern("n");
    let n_decl = mucalc_terms::VarDecl { name: n_sym, sort: pos };
    let np = {
        let sym = pool.intern("NP");
        pool.proc_name(sym, vec![pos])
    };
    let q = proc_name(&mut pool, "Q");

    // NP(n: Pos) = (n > 1) -> Q() || NP(max(n - 1, 1)) <> Q()
    let q_call = pool.proc_ref(q, vec![]);
    let n_var = pool.var(n_sym, pos);
    let one = pool.number("1", pos);
    let cond = pool.op_greater(n_var, one);
    let int_ = pool.sort_int();
    let minus_sort = pool.sort_function(vec![pos, pos], int_);
    let minus_op = pool.op_id("-", minus_sort);
    let n_minus_one = pool.appl(minus_op, vec![n_var, one]);
    let max_sort = pool.sort_function(vec![int_, pos], pos);
    let max_op = pool.op_id("max", max_sort);
    let decremented = pool.appl(max_op, vec![n_minus_one, one]);
    let rec_call = pool.proc_ref(np, vec![decremented]);
    let then = pool.merge(q_call, rec_call);
    let np_body = pool.proc(ProcExpr::IfThenElse(cond, then, q_call));

    let q_body = {
        let a = act(&mut pool, "a");
        let q_ref = pool.proc_ref(q, vec![]);
        pool.seq(a, q_ref)
    };

    let three = pool.number("3", pos);
    let init = pool.proc_ref(np, vec![three]);
    let mut spec = spec_with(vec![(q, q_body)], init);
    spec.equations.push(mucalc_terms::process::ProcEquation {
        name: np,
        parameters: vec![n_decl],
        body: np_body,
    });

    let reduced = alphabet_reduce(&mut pool, &spec, &mut diag).unwrap();

    // the initial expression calls the expansion, which composes three Qs
    let expansion = match pool.proc_expr(reduced.init).clone() {
        ProcExpr::ProcRef(name, args) => {
            assert!(args.is_empty());
            name
        }
        other => panic!("expected a call to the expansion, got {other:?}"),
    };
    assert_ne!(expansion, np);

    let body = reduced
        .equations
        .iter()
        .find(|eq| eq.name == expansion)
        .map(|eq| eq.body)
        .expect("the expansion equation is part of the output");
    fn count_q_calls(pool: &TermPool, id: ProcId, q: mucalc_terms::ProcNameId) -> usize {
        match pool.proc_expr(id).clone() {
            ProcExpr::ProcRef(name, _) => usize::from(name == q),
            ProcExpr::Merge(l, r) => count_q_calls(pool, l, q) + count_q_calls(pool, r, q),
            _ => 0,
        }
    }
    assert_eq!(count_q_calls(&pool, body, q), 3);

    // the replication equation itself is gone
    assert!(reduced.equations.iter().all(|eq| eq.name != np));
}

/// Overlapping communication left-hand sides are rejected as malformed.
#[test]
fn overlapping_comm_is_malformed() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let a = act(&mut pool, "a");
    let b = act(&mut pool, "b");
    let par = pool.merge(a, b);
    let first = comm_pair(&mut pool, &["a", "b"], "c");
    let second: CommPair = comm_pair(&mut pool, &["a"], "d");
    let init = pool.comm(vec![first, second], par);
    let spec = spec_of(init);

    assert!(alphabet_reduce(&mut pool, &spec, &mut diag).is_err());
}
