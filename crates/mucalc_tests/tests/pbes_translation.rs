//! End-to-end tests of the formula-to-PBES translation.

mod common;

use common::label;
use mucalc_base::Diagnostics;
use mucalc_pbes::normalize::{is_closed, is_monotonous, is_normalized};
use mucalc_pbes::{pbes_translate, ActionSummand, LinearProcess, LpsSpec, TranslateError};
use mucalc_terms::spec::DataSpec;
use mucalc_terms::{
    ActionFormula, DataId, FixpointSymbol, PbesExpr, PbesId, StateFormula, Symbol, TermPool,
    VarDecl,
};

/// Collects the argument lists of every instantiation of `name`.
fn instantiations(pool: &TermPool, id: PbesId, name: Symbol) -> Vec<Vec<DataId>> {
    let mut found = Vec::new();
    collect(pool, id, name, &mut found);
    return found;

    fn collect(pool: &TermPool, id: PbesId, name: Symbol, found: &mut Vec<Vec<DataId>>) {
        match pool.pb_expr(id).clone() {
            PbesExpr::True | PbesExpr::False | PbesExpr::Data(_) => {}
            PbesExpr::Not(g) => collect(pool, g, name, found),
            PbesExpr::And(l, r) | PbesExpr::Or(l, r) | PbesExpr::Imp(l, r) => {
                collect(pool, l, name, found);
                collect(pool, r, name, found);
            }
            PbesExpr::Forall(_, body) | PbesExpr::Exists(_, body) => {
                collect(pool, body, name, found)
            }
            PbesExpr::PropVar(x, args) => {
                if x == name {
                    found.push(args);
                }
            }
        }
    }
}

fn has_forall_over(pool: &TermPool, id: PbesId, var: Symbol) -> bool {
    match pool.pb_expr(id).clone() {
        PbesExpr::True | PbesExpr::False | PbesExpr::Data(_) | PbesExpr::PropVar(..) => false,
        PbesExpr::Not(g) => has_forall_over(pool, g, var),
        PbesExpr::And(l, r) | PbesExpr::Or(l, r) | PbesExpr::Imp(l, r) => {
            has_forall_over(pool, l, var) || has_forall_over(pool, r, var)
        }
        PbesExpr::Forall(vars, body) => {
            vars.iter().any(|d| d.name == var) || has_forall_over(pool, body, var)
        }
        PbesExpr::Exists(_, body) => has_forall_over(pool, body, var),
    }
}

/// `proc S = a.S` as a linear process: one summand, condition true, no
/// parameters.
fn loop_spec(pool: &mut TermPool) -> LpsSpec {
    let a = label(pool, "a");
    let action = pool.action(a, vec![]);
    let cond = pool.data_true();
    LpsSpec {
        data: DataSpec::default(),
        action_labels: vec![a],
        global_variables: Vec::new(),
        process: LinearProcess {
            parameters: Vec::new(),
            action_summands: vec![ActionSummand {
                summation_variables: Vec::new(),
                condition: cond,
                actions: vec![action],
                time: None,
                assignments: Vec::new(),
            }],
            deadlock_summands: Vec::new(),
        },
        initial_state: Vec::new(),
    }
}

/// Scenario: `nu X. [a] X` over `proc S = a.S` gives a single equation
/// `nu X() = ... X() ...` with initial instance `X()`.
#[test]
fn invariant_formula_over_action_loop() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let spec = loop_spec(&mut pool);

    let a = label(&mut pool, "a");
    let action = pool.action(a, vec![]);
    let x = pool.intern("X");
    let occurrence = pool.st(StateFormula::Var(x, vec![]));
    let alpha = pool.af(ActionFormula::MultiAct(vec![action]));
    let must = pool.st(StateFormula::Must(alpha, occurrence));
    let formula = pool.st(StateFormula::Nu(x, vec![], must));

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    assert_eq!(pbes.equations.len(), 1);
    let eq = &pbes.equations[0];
    assert_eq!(eq.symbol, FixpointSymbol::Nu);
    assert_eq!(eq.variable.name, x);
    assert!(eq.variable.parameters.is_empty());
    assert!(is_normalized(&pool, eq.formula));

    let calls = instantiations(&pool, eq.formula, x);
    assert_eq!(calls, vec![Vec::<DataId>::new()]);

    assert_eq!(pbes.initial.0, x);
    assert!(pbes.initial.1.is_empty());
    assert!(is_monotonous(&pool, &pbes));
    assert!(is_closed(&pool, &pbes));
}

/// Scenario: a guarded counter. Every box-clause instantiates the process
/// parameter with the summand's assignment.
#[test]
fn box_clauses_apply_summand_assignments() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();

    let nat = pool.sort_nat();
    let n = pool.intern("n");
    let n_decl = VarDecl { name: n, sort: nat };
    let n_var = pool.var(n, nat);
    let two = pool.number("2", nat);
    let cond = pool.op_greater(n_var, two);
    let one = pool.number("1", nat);
    let plus_sort = pool.sort_function(vec![nat, nat], nat);
    let plus = pool.op_id("+", plus_sort);
    let n_plus_one = pool.appl(plus, vec![n_var, one]);

    let a = label(&mut pool, "a");
    let action = pool.action(a, vec![]);
    let three = pool.number("3", nat);
    let spec = LpsSpec {
        data: DataSpec::default(),
        action_labels: vec![a],
        global_variables: Vec::new(),
        process: LinearProcess {
            parameters: vec![n_decl],
            action_summands: vec![ActionSummand {
                summation_variables: Vec::new(),
                condition: cond,
                actions: vec![action],
                time: None,
                assignments: vec![(n_decl, n_plus_one)],
            }],
            deadlock_summands: Vec::new(),
        },
        initial_state: vec![three],
    };

    // nu X. ([true] X && forall m:Nat. [a] false)
    let x = pool.intern("X");
    let m = pool.intern("m");
    let occurrence = pool.st(StateFormula::Var(x, vec![]));
    let truth = pool.af(ActionFormula::True);
    let keep = pool.st(StateFormula::Must(truth, occurrence));
    let a_literal = pool.af(ActionFormula::MultiAct(vec![action]));
    let falsity = pool.st(StateFormula::False);
    let forbid = pool.st(StateFormula::Must(a_literal, falsity));
    let all = pool.st(StateFormula::Forall(vec![VarDecl { name: m, sort: nat }], forbid));
    let body = pool.st(StateFormula::And(keep, all));
    let formula = pool.st(StateFormula::Nu(x, vec![], body));

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    assert_eq!(pbes.equations.len(), 1);
    let eq = &pbes.equations[0];
    assert_eq!(eq.symbol, FixpointSymbol::Nu);
    assert_eq!(eq.variable.parameters, vec![n_decl]);

    // every recursive instance carries the updated parameter
    let calls = instantiations(&pool, eq.formula, x);
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|args| args == &[n_plus_one]));

    assert!(has_forall_over(&pool, eq.formula, m));
    assert_eq!(pbes.initial.1, vec![three]);
    assert!(is_monotonous(&pool, &pbes));
    assert!(is_closed(&pool, &pbes));
}

/// Scenario: a formula without a leading fixpoint is wrapped in a fresh
/// `nu`, and the outer equation is a `nu` equation.
#[test]
fn bare_formula_is_wrapped_in_nu() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let spec = loop_spec(&mut pool);

    // <a>[a]false
    let a = label(&mut pool, "a");
    let action = pool.action(a, vec![]);
    let literal = pool.af(ActionFormula::MultiAct(vec![action]));
    let falsity = pool.st(StateFormula::False);
    let boxed = pool.st(StateFormula::Must(literal, falsity));
    let formula = pool.st(StateFormula::May(literal, boxed));

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    assert_eq!(pbes.equations.len(), 1);
    let eq = &pbes.equations[0];
    assert_eq!(eq.symbol, FixpointSymbol::Nu);
    assert_eq!(pbes.initial.0, eq.variable.name);
    assert!(is_normalized(&pool, eq.formula));
    assert!(is_monotonous(&pool, &pbes));
    assert!(is_closed(&pool, &pbes));
}

#[test]
fn non_monotonous_formula_is_rejected() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let spec = loop_spec(&mut pool);

    let x = pool.intern("X");
    let occurrence = pool.st(StateFormula::Var(x, vec![]));
    let negated = pool.st_not(occurrence);
    let formula = pool.st(StateFormula::Nu(x, vec![], negated));

    let result = pbes_translate(&mut pool, &spec, formula, false, &mut diag);
    assert!(matches!(result, Err(TranslateError::NonMonotonousFormula(_))));
    assert!(diag.has_errors());
}

/// A negated fixpoint flips the symbol of its equation while staying
/// monotonous.
#[test]
fn negation_flips_the_fixpoint_symbol() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let spec = loop_spec(&mut pool);

    // !(mu X. <true> X)
    let x = pool.intern("X");
    let occurrence = pool.st(StateFormula::Var(x, vec![]));
    let truth = pool.af(ActionFormula::True);
    let step = pool.st(StateFormula::May(truth, occurrence));
    let mu = pool.st(StateFormula::Mu(x, vec![], step));
    let formula = pool.st_not(mu);

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    // the wrapper plus the flipped inner equation
    assert_eq!(pbes.equations.len(), 2);
    assert_eq!(pbes.equations[0].symbol, FixpointSymbol::Nu);
    assert_eq!(pbes.equations[1].symbol, FixpointSymbol::Nu);
    assert_eq!(pbes.equations[1].variable.name, x);
    assert!(is_monotonous(&pool, &pbes));
    assert!(is_closed(&pool, &pbes));
}

/// A timed process forces the timed translation: a warning is emitted,
/// every equation gains a leading time parameter, and the initial
/// instance starts at time zero.
#[test]
fn timed_process_switches_to_timed_translation() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();

    let a = label(&mut pool, "a");
    let action = pool.action(a, vec![]);
    let cond = pool.data_true();
    let real = pool.sort_real();
    let stamp = pool.number("1", real);
    let spec = LpsSpec {
        data: DataSpec::default(),
        action_labels: vec![a],
        global_variables: Vec::new(),
        process: LinearProcess {
            parameters: Vec::new(),
            action_summands: vec![ActionSummand {
                summation_variables: Vec::new(),
                condition: cond,
                actions: vec![action],
                time: Some(stamp),
                assignments: Vec::new(),
            }],
            deadlock_summands: Vec::new(),
        },
        initial_state: Vec::new(),
    };

    let x = pool.intern("X");
    let occurrence = pool.st(StateFormula::Var(x, vec![]));
    let truth = pool.af(ActionFormula::True);
    let must = pool.st(StateFormula::Must(truth, occurrence));
    let formula = pool.st(StateFormula::Nu(x, vec![], must));

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    assert!(diag.warnings().any(|w| w.message.contains("timed")));
    let eq = &pbes.equations[0];
    assert_eq!(eq.variable.parameters.len(), 1);
    assert_eq!(eq.variable.parameters[0].sort, real);
    let zero = pool.number("0", real);
    assert_eq!(pbes.initial.1.first(), Some(&zero));
    assert!(is_monotonous(&pool, &pbes));
    assert!(is_closed(&pool, &pbes));
}

/// Untimed `delay` unfolds to the disjunction of the summand guards.
#[test]
fn delay_unfolds_to_enabledness() {
    let mut pool = TermPool::new();
    let mut diag = Diagnostics::new();
    let spec = loop_spec(&mut pool);

    let x = pool.intern("X");
    let delay = pool.st(StateFormula::Delay);
    let formula = pool.st(StateFormula::Nu(x, vec![], delay));

    let pbes = pbes_translate(&mut pool, &spec, formula, false, &mut diag).unwrap();

    let eq = &pbes.equations[0];
    let truth = pool.data_true();
    assert_eq!(eq.formula, pool.pb_data(truth));
}
