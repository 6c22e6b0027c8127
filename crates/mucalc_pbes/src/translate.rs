//! The formula-to-PBES translation: `Par`, `Sat`, `RHS`, and `E`.
//!
//! One equation is generated per fixpoint binder of the preprocessed
//! formula. `RHS` maps a formula body to a PBES expression against the
//! summands of the linear process; negation is handled by explicit dual
//! rules, so the produced system is monotonous by construction. The timed
//! variant threads a fresh time parameter `T` through every equation and
//! instantiation.

use mucalc_base::{Diagnostics, NameGenerator, Symbol};
use mucalc_terms::subst::{
    free_act_formula_vars, free_action_vars, substitute_act_formula, substitute_actions,
    substitute_data, substitute_pbes, substitution, Substitution,
};
use mucalc_terms::{
    ActFormId, ActionFormula, ActionId, DataId, FixpointSymbol, Pbes, PbesEquation, PbesId,
    PropVarDecl, StFormId, StateFormula, TermPool, VarDecl,
};

use crate::error::TranslateError;
use crate::formula;
use crate::lps::{self, LinearProcess, LpsSpec};
use crate::normalize::{
    and_opt, complete_data_specification, is_closed, is_monotonous, is_normalized, join_and,
    join_or, normalize, not_opt, or_opt,
};

/// The data variables bound by quantifiers and fixpoints of `f` that are
/// in scope at an occurrence of the fixpoint variable `x`, extended with
/// the explicit context `l`.
pub fn par(pool: &TermPool, x: Symbol, l: &[VarDecl], f: StFormId) -> Vec<VarDecl> {
    match pool.st_expr(f).clone() {
        StateFormula::True
        | StateFormula::False
        | StateFormula::Data(_)
        | StateFormula::Yaled
        | StateFormula::YaledTimed(_)
        | StateFormula::Delay
        | StateFormula::DelayTimed(_)
        | StateFormula::Var(..) => Vec::new(),
        StateFormula::Not(g) => par(pool, x, l, g),
        StateFormula::And(a, b) | StateFormula::Or(a, b) | StateFormula::Imp(a, b) => {
            let mut left = par(pool, x, l, a);
            left.extend(par(pool, x, l, b));
            left
        }
        StateFormula::Forall(vars, body) | StateFormula::Exists(vars, body) => {
            let mut extended = l.to_vec();
            extended.extend(vars);
            par(pool, x, &extended, body)
        }
        StateFormula::Must(_, body) | StateFormula::May(_, body) => par(pool, x, l, body),
        StateFormula::Mu(name, assignments, body) | StateFormula::Nu(name, assignments, body) => {
            if name == x {
                l.to_vec()
            } else {
                let mut extended = l.to_vec();
                extended.extend(formula::mu_variables(&assignments));
                par(pool, x, &extended, body)
            }
        }
    }
}

/// A PBES expression stating that two multi-actions are equal: their
/// labels must form the same multiset and the data arguments of matched
/// actions must be pairwise equal. The result is a disjunction over the
/// possible matchings.
pub fn equal_multi_actions(pool: &mut TermPool, a: &[ActionId], b: &[ActionId]) -> PbesId {
    if a.len() != b.len() {
        return pool.pb_false();
    }
    if a.is_empty() {
        return pool.pb_true();
    }
    let first = pool.action_decl(a[0]).clone();
    let mut cases = Vec::new();
    for (i, &candidate) in b.iter().enumerate() {
        let cand = pool.action_decl(candidate).clone();
        if cand.label != first.label {
            continue;
        }
        let mut conjuncts = Vec::new();
        for (&x, &y) in first.args.iter().zip(&cand.args) {
            let eq = pool.op_eq(x, y);
            conjuncts.push(pool.pb_data(eq));
        }
        let args_equal = join_and(pool, conjuncts);
        let mut rest_b = b.to_vec();
        rest_b.remove(i);
        let rest = equal_multi_actions(pool, &a[1..], &rest_b);
        cases.push(and_opt(pool, args_equal, rest));
    }
    join_or(pool, cases)
}

struct Translator<'a> {
    pool: &'a mut TermPool,
    process: &'a LinearProcess,
    /// The whole preprocessed formula, for `Par`.
    f0: StFormId,
    /// The time parameter of the timed variant.
    t: Option<VarDecl>,
    /// Identifiers of the specification and formula; cloned into the
    /// fresh-name generator of every equation.
    base_names: NameGenerator,
}

impl<'a> Translator<'a> {
    // ---- Sat -----------------------------------------------------------

    /// A PBES expression witnessing that the multi-action `actions`
    /// (with optional time stamp) satisfies the action formula `alpha`.
    fn sat(&mut self, actions: &[ActionId], time: Option<DataId>, alpha: ActFormId) -> PbesId {
        match self.pool.af_expr(alpha).clone() {
            ActionFormula::True => self.pool.pb_true(),
            ActionFormula::False => self.pool.pb_false(),
            ActionFormula::Data(d) => self.pool.pb_data(d),
            ActionFormula::MultiAct(literal) => {
                equal_multi_actions(self.pool, actions, &literal)
            }
            ActionFormula::Not(g) => {
                let inner = self.sat(actions, time, g);
                self.pool.pb_not(inner)
            }
            ActionFormula::And(l, r) => {
                let l = self.sat(actions, time, l);
                let r = self.sat(actions, time, r);
                self.pool.pb_and(l, r)
            }
            ActionFormula::Or(l, r) => {
                let l = self.sat(actions, time, l);
                let r = self.sat(actions, time, r);
                self.pool.pb_or(l, r)
            }
            ActionFormula::Imp(l, r) => {
                let l = self.sat(actions, time, l);
                let r = self.sat(actions, time, r);
                self.pool.pb_imp(l, r)
            }
            ActionFormula::Forall(vars, body) => {
                let (fresh, body) = self.rename_quantifier(actions, alpha, &vars, body);
                let inner = self.sat(actions, time, body);
                self.pool.pb_forall(fresh, inner)
            }
            ActionFormula::Exists(vars, body) => {
                let (fresh, body) = self.rename_quantifier(actions, alpha, &vars, body);
                let inner = self.sat(actions, time, body);
                self.pool.pb_exists(fresh, inner)
            }
            ActionFormula::At(body, u) => {
                let inner = self.sat(actions, time, body);
                debug_assert!(time.is_some(), "timed action formula over an untimed action");
                match time {
                    Some(t) => {
                        let eq = self.pool.op_eq(t, u);
                        let eq = self.pool.pb_data(eq);
                        and_opt(self.pool, inner, eq)
                    }
                    None => inner,
                }
            }
        }
    }

    /// Renames the variables of a quantified action formula to names
    /// disjoint from the free variables of the multi-action and of the
    /// formula, so the quantifier cannot capture either.
    fn rename_quantifier(
        &mut self,
        actions: &[ActionId],
        alpha: ActFormId,
        vars: &[VarDecl],
        body: ActFormId,
    ) -> (Vec<VarDecl>, ActFormId) {
        let mut names = NameGenerator::new();
        for decl in free_action_vars(self.pool, actions) {
            names.add_identifier(self.pool.name(decl.name));
        }
        for decl in free_act_formula_vars(self.pool, alpha) {
            names.add_identifier(self.pool.name(decl.name));
        }
        let mut fresh = Vec::with_capacity(vars.len());
        let mut renaming = Substitution::default();
        for decl in vars {
            let text = names.fresh(self.pool.name(decl.name).to_string().as_str());
            let sym = self.pool.intern(&text);
            let new_decl = VarDecl { name: sym, sort: decl.sort };
            fresh.push(new_decl);
            let replacement = self.pool.var_decl(new_decl);
            renaming.insert(decl.name, replacement);
        }
        let body = substitute_act_formula(self.pool, body, &renaming);
        (fresh, body)
    }

    // ---- RHS -----------------------------------------------------------

    fn rhs(&mut self, f: StFormId, names: &mut NameGenerator) -> PbesId {
        if let StateFormula::Not(g) = self.pool.st_expr(f).clone() {
            return self.rhs_negated(g, names);
        }
        match self.pool.st_expr(f).clone() {
            StateFormula::Data(d) => self.pool.pb_data(d),
            StateFormula::True => self.pool.pb_true(),
            StateFormula::False => self.pool.pb_false(),
            StateFormula::And(l, r) => {
                let l = self.rhs(l, names);
                let r = self.rhs(r, names);
                and_opt(self.pool, l, r)
            }
            StateFormula::Or(l, r) => {
                let l = self.rhs(l, names);
                let r = self.rhs(r, names);
                or_opt(self.pool, l, r)
            }
            StateFormula::Imp(l, r) => {
                // translated as !l || r so the result stays negation-normal
                let nl = self.rhs_negated(l, names);
                let r = self.rhs(r, names);
                or_opt(self.pool, nl, r)
            }
            StateFormula::Forall(vars, body) => {
                for decl in &vars {
                    names.add_identifier(self.pool.name(decl.name));
                }
                let body = self.rhs(body, names);
                self.pool.pb_forall(vars, body)
            }
            StateFormula::Exists(vars, body) => {
                for decl in &vars {
                    names.add_identifier(self.pool.name(decl.name));
                }
                let body = self.rhs(body, names);
                self.pool.pb_exists(vars, body)
            }
            StateFormula::Must(alpha, phi) => self.modal(alpha, phi, names, true),
            StateFormula::May(alpha, phi) => self.modal(alpha, phi, names, false),
            StateFormula::Delay => self.delay(None),
            StateFormula::DelayTimed(t) => self.delay(Some(t)),
            StateFormula::Yaled => self.yaled(None),
            StateFormula::YaledTimed(t) => self.yaled(Some(t)),
            StateFormula::Var(x, args) => self.instantiate(x, args),
            StateFormula::Mu(x, assignments, _) | StateFormula::Nu(x, assignments, _) => {
                let args = formula::mu_expressions(&assignments);
                self.instantiate(x, args)
            }
            StateFormula::Not(_) => unreachable!("negations are handled above"),
        }
    }

    /// `RHS(!g)`: the explicit dual rules.
    fn rhs_negated(&mut self, g: StFormId, names: &mut NameGenerator) -> PbesId {
        match self.pool.st_expr(g).clone() {
            StateFormula::Data(d) => {
                let negated = self.pool.op_not(d);
                self.pool.pb_data(negated)
            }
            StateFormula::True => self.pool.pb_false(),
            StateFormula::False => self.pool.pb_true(),
            StateFormula::Not(h) => self.rhs(h, names),
            StateFormula::And(l, r) => {
                let nl = self.rhs_negated(l, names);
                let nr = self.rhs_negated(r, names);
                or_opt(self.pool, nl, nr)
            }
            StateFormula::Or(l, r) => {
                let nl = self.rhs_negated(l, names);
                let nr = self.rhs_negated(r, names);
                and_opt(self.pool, nl, nr)
            }
            StateFormula::Imp(l, r) => {
                let l = self.rhs(l, names);
                let nr = self.rhs_negated(r, names);
                and_opt(self.pool, l, nr)
            }
            StateFormula::Forall(vars, body) => {
                for decl in &vars {
                    names.add_identifier(self.pool.name(decl.name));
                }
                let body = self.rhs_negated(body, names);
                self.pool.pb_exists(vars, body)
            }
            StateFormula::Exists(vars, body) => {
                for decl in &vars {
                    names.add_identifier(self.pool.name(decl.name));
                }
                let body = self.rhs_negated(body, names);
                self.pool.pb_forall(vars, body)
            }
            StateFormula::Must(alpha, phi) => {
                // !([a]phi) = <a>!phi
                let negated = self.pool.st_not(phi);
                let may = self.pool.st(StateFormula::May(alpha, negated));
                self.rhs(may, names)
            }
            StateFormula::May(alpha, phi) => {
                let negated = self.pool.st_not(phi);
                let must = self.pool.st(StateFormula::Must(alpha, negated));
                self.rhs(must, names)
            }
            StateFormula::Delay => {
                let yaled = self.pool.st(StateFormula::Yaled);
                self.rhs(yaled, names)
            }
            StateFormula::Yaled => {
                let delay = self.pool.st(StateFormula::Delay);
                self.rhs(delay, names)
            }
            StateFormula::DelayTimed(t) => {
                let yaled = self.pool.st(StateFormula::YaledTimed(t));
                self.rhs(yaled, names)
            }
            StateFormula::YaledTimed(t) => {
                let delay = self.pool.st(StateFormula::DelayTimed(t));
                self.rhs(delay, names)
            }
            StateFormula::Var(..) => {
                let positive = self.rhs(g, names);
                not_opt(self.pool, positive)
            }
            StateFormula::Mu(x, assignments, phi) => {
                let negated = self.pool.st_not(phi);
                let mu = self.pool.st(StateFormula::Mu(x, assignments, negated));
                self.rhs(mu, names)
            }
            StateFormula::Nu(x, assignments, phi) => {
                let negated = self.pool.st_not(phi);
                let nu = self.pool.st(StateFormula::Nu(x, assignments, negated));
                self.rhs(nu, names)
            }
        }
    }

    /// The instantiation `X([T ·] d · xp · Par(X, ∅, f0))`.
    fn instantiate(&mut self, x: Symbol, args: Vec<DataId>) -> PbesId {
        let mut all = Vec::new();
        if let Some(t) = self.t {
            all.push(self.pool.var_decl(t));
        }
        all.extend(args);
        for decl in self.process.parameters.clone() {
            all.push(self.pool.var_decl(decl));
        }
        for decl in par(self.pool, x, &[], self.f0) {
            all.push(self.pool.var_decl(decl));
        }
        self.pool.pb_prop(x, all)
    }

    /// `[alpha]phi` (must) and `<alpha>phi` (may): one clause per action
    /// summand, with the summand variables renamed fresh and the
    /// assignment substitution applied before the time substitution.
    fn modal(
        &mut self,
        alpha: ActFormId,
        phi: StFormId,
        names: &mut NameGenerator,
        is_must: bool,
    ) -> PbesId {
        let summands = self.process.action_summands.clone();
        let mut clauses = Vec::new();
        for summand in &summands {
            let rhs_phi = self.rhs(phi, names);

            let mut fresh = Vec::with_capacity(summand.summation_variables.len());
            let mut renaming = Substitution::default();
            for decl in &summand.summation_variables {
                let text = names.fresh(self.pool.name(decl.name).to_string().as_str());
                let sym = self.pool.intern(&text);
                let new_decl = VarDecl { name: sym, sort: decl.sort };
                fresh.push(new_decl);
                let replacement = self.pool.var_decl(new_decl);
                renaming.insert(decl.name, replacement);
            }

            let condition = substitute_data(self.pool, summand.condition, &renaming);
            let actions = substitute_actions(self.pool, &summand.actions, &renaming);
            let time = summand
                .time
                .map(|t| substitute_data(self.pool, t, &renaming));
            let assignments: Vec<(VarDecl, DataId)> = summand
                .assignments
                .iter()
                .map(|(d, e)| (*d, substitute_data(self.pool, *e, &renaming)))
                .collect();

            let p1 = self.sat(&actions, time, alpha);
            let p2 = self.pool.pb_data(condition);
            let mut lhs = and_opt(self.pool, p1, p2);
            if let Some(t_par) = self.t {
                if let Some(ti) = time {
                    let t_ref = self.pool.var_decl(t_par);
                    let after = self.pool.op_greater(ti, t_ref);
                    let after = self.pool.pb_data(after);
                    lhs = and_opt(self.pool, lhs, after);
                }
            }

            // the assignment substitution must precede the time
            // substitution: assignments may mention the old time
            let state_subst: Substitution =
                assignments.iter().map(|(d, e)| (d.name, *e)).collect();
            let mut rhs_term = substitute_pbes(self.pool, rhs_phi, &state_subst);
            if let (Some(t_par), Some(ti)) = (self.t, time) {
                let time_subst = substitution(&[t_par], &[ti]);
                rhs_term = substitute_pbes(self.pool, rhs_term, &time_subst);
            }

            let clause = if is_must {
                let body = self.pool.pb_imp(lhs, rhs_term);
                self.pool.pb_forall(fresh, body)
            } else {
                let body = and_opt(self.pool, lhs, rhs_term);
                self.pool.pb_exists(fresh, body)
            };
            clauses.push(clause);
        }
        if is_must {
            join_and(self.pool, clauses)
        } else {
            join_or(self.pool, clauses)
        }
    }

    /// `delay` / `delay @ t`: some summand is enabled (not later than `t`
    /// in the timed reading).
    fn delay(&mut self, t: Option<DataId>) -> PbesId {
        let mut clauses = Vec::new();
        let action: Vec<(Vec<VarDecl>, DataId, Option<DataId>)> = self
            .process
            .action_summands
            .iter()
            .map(|s| (s.summation_variables.clone(), s.condition, s.time))
            .collect();
        let deadlock: Vec<(Vec<VarDecl>, DataId, Option<DataId>)> = self
            .process
            .deadlock_summands
            .iter()
            .map(|s| (s.summation_variables.clone(), s.condition, s.time))
            .collect();
        for (vars, condition, time) in action.into_iter().chain(deadlock) {
            let mut body = self.pool.pb_data(condition);
            if let (Some(t0), Some(tk)) = (t, time) {
                let before = self.pool.op_less_equal(t0, tk);
                let before = self.pool.pb_data(before);
                body = and_opt(self.pool, body, before);
            }
            clauses.push(self.pool.pb_exists(vars, body));
        }
        let mut result = join_or(self.pool, clauses);
        if let (Some(t0), Some(t_par)) = (t, self.t) {
            let t_ref = self.pool.var_decl(t_par);
            let idle = self.pool.op_less_equal(t0, t_ref);
            let idle = self.pool.pb_data(idle);
            result = or_opt(self.pool, result, idle);
        }
        result
    }

    /// `yaled` / `yaled @ t`: the dual of `delay`.
    fn yaled(&mut self, t: Option<DataId>) -> PbesId {
        let mut clauses = Vec::new();
        let action: Vec<(Vec<VarDecl>, DataId, Option<DataId>)> = self
            .process
            .action_summands
            .iter()
            .map(|s| (s.summation_variables.clone(), s.condition, s.time))
            .collect();
        let deadlock: Vec<(Vec<VarDecl>, DataId, Option<DataId>)> = self
            .process
            .deadlock_summands
            .iter()
            .map(|s| (s.summation_variables.clone(), s.condition, s.time))
            .collect();
        for (vars, condition, time) in action.into_iter().chain(deadlock) {
            let negated = self.pool.op_not(condition);
            let mut body = self.pool.pb_data(negated);
            if let (Some(t0), Some(tk)) = (t, time) {
                let later = self.pool.op_greater(t0, tk);
                let later = self.pool.pb_data(later);
                body = or_opt(self.pool, body, later);
            }
            clauses.push(self.pool.pb_forall(vars, body));
        }
        let mut result = join_and(self.pool, clauses);
        if let (Some(t0), Some(t_par)) = (t, self.t) {
            let t_ref = self.pool.var_decl(t_par);
            let after = self.pool.op_greater(t0, t_ref);
            let after = self.pool.pb_data(after);
            result = and_opt(self.pool, result, after);
        }
        result
    }

    // ---- E -------------------------------------------------------------

    /// One PBES equation per fixpoint binder of `f`, outermost first.
    fn equations(&mut self, f: StFormId) -> Vec<PbesEquation> {
        if let StateFormula::Not(g) = self.pool.st_expr(f).clone() {
            return self.equations_negated(g);
        }
        match self.pool.st_expr(f).clone() {
            StateFormula::True
            | StateFormula::False
            | StateFormula::Data(_)
            | StateFormula::Var(..)
            | StateFormula::Yaled
            | StateFormula::YaledTimed(_)
            | StateFormula::Delay
            | StateFormula::DelayTimed(_) => Vec::new(),
            StateFormula::And(l, r) | StateFormula::Or(l, r) => {
                let mut result = self.equations(l);
                result.extend(self.equations(r));
                result
            }
            StateFormula::Imp(l, r) => {
                let nl = self.pool.st_not(l);
                let mut result = self.equations(nl);
                result.extend(self.equations(r));
                result
            }
            StateFormula::Forall(_, body)
            | StateFormula::Exists(_, body)
            | StateFormula::Must(_, body)
            | StateFormula::May(_, body) => self.equations(body),
            StateFormula::Mu(x, assignments, body) => {
                self.fixpoint_equation(FixpointSymbol::Mu, x, &assignments, body)
            }
            StateFormula::Nu(x, assignments, body) => {
                self.fixpoint_equation(FixpointSymbol::Nu, x, &assignments, body)
            }
            StateFormula::Not(_) => unreachable!("negations are handled above"),
        }
    }

    fn equations_negated(&mut self, g: StFormId) -> Vec<PbesEquation> {
        match self.pool.st_expr(g).clone() {
            StateFormula::True
            | StateFormula::False
            | StateFormula::Data(_)
            | StateFormula::Var(..)
            | StateFormula::Yaled
            | StateFormula::YaledTimed(_)
            | StateFormula::Delay
            | StateFormula::DelayTimed(_) => Vec::new(),
            StateFormula::Not(h) => self.equations(h),
            StateFormula::And(l, r) | StateFormula::Or(l, r) => {
                let nl = self.pool.st_not(l);
                let nr = self.pool.st_not(r);
                let mut result = self.equations(nl);
                result.extend(self.equations(nr));
                result
            }
            StateFormula::Imp(l, r) => {
                let nr = self.pool.st_not(r);
                let mut result = self.equations(l);
                result.extend(self.equations(nr));
                result
            }
            StateFormula::Forall(_, body)
            | StateFormula::Exists(_, body)
            | StateFormula::Must(_, body)
            | StateFormula::May(_, body) => {
                let nb = self.pool.st_not(body);
                self.equations(nb)
            }
            StateFormula::Mu(x, assignments, body) => {
                // the negation flips the fixpoint and negates the bound
                // variable so the equation stays monotonous
                let negated_body = self.pool.st_not(body);
                let g = formula::negate_propositional_variable(self.pool, x, negated_body);
                self.fixpoint_equation(FixpointSymbol::Nu, x, &assignments, g)
            }
            StateFormula::Nu(x, assignments, body) => {
                let negated_body = self.pool.st_not(body);
                let g = formula::negate_propositional_variable(self.pool, x, negated_body);
                self.fixpoint_equation(FixpointSymbol::Mu, x, &assignments, g)
            }
        }
    }

    fn fixpoint_equation(
        &mut self,
        symbol: FixpointSymbol,
        x: Symbol,
        assignments: &[(VarDecl, DataId)],
        body: StFormId,
    ) -> Vec<PbesEquation> {
        let mut parameters = Vec::new();
        if let Some(t) = self.t {
            parameters.push(t);
        }
        parameters.extend(formula::mu_variables(assignments));
        parameters.extend(self.process.parameters.iter().copied());
        parameters.extend(par(self.pool, x, &[], self.f0));

        let mut names = self.base_names.clone();
        let expr = self.rhs(body, &mut names);
        let equation = PbesEquation {
            symbol,
            variable: PropVarDecl { name: x, parameters },
            formula: expr,
        };

        let mut result = vec![equation];
        result.extend(self.equations(body));
        result
    }
}

/// Translates a state formula and a linear process specification to a
/// PBES. When either side mentions time the timed variant is chosen, with
/// a warning if the caller asked for the untimed one.
pub fn pbes_translate(
    pool: &mut TermPool,
    spec: &LpsSpec,
    formula: StFormId,
    timed: bool,
    diag: &mut Diagnostics,
) -> Result<Pbes, TranslateError> {
    let formula_timed = formula::has_time(pool, formula);
    let process_timed = spec.process.has_time();
    let mut timed = timed;
    if (formula_timed || process_timed) && !timed {
        diag.warning(format!(
            "switching to the timed translation because the formula has {} time and the \
             process has {} time",
            if formula_timed { "" } else { "no " },
            if process_timed { "" } else { "no " },
        ));
        timed = true;
    }

    if !formula::is_monotonous(pool, formula) {
        let shown = formula::display(pool, formula);
        diag.error(format!("the formula {shown} is not monotonous"));
        return Err(TranslateError::NonMonotonousFormula(shown));
    }

    let mut names = NameGenerator::new();
    lps::collect_identifiers(pool, spec, &mut names);
    formula::collect_identifiers(pool, formula, &mut names);
    let f = formula::preprocess_state_formula(pool, formula, &mut names);

    let mut process = spec.process.clone();
    let t = if timed {
        let text = names.fresh("T");
        let sym = pool.intern(&text);
        let real = pool.sort_real();
        lps::make_timed(pool, &mut process, &mut names);
        Some(VarDecl { name: sym, sort: real })
    } else {
        None
    };

    let equations = {
        let mut translator = Translator {
            pool: &mut *pool,
            process: &process,
            f0: f,
            t,
            base_names: names,
        };
        translator.equations(f)
    };

    // the initial instantiation targets the first (outermost) equation
    let (x_f, fi) = match pool.st_expr(f).clone() {
        StateFormula::Mu(x, assignments, _) | StateFormula::Nu(x, assignments, _) => {
            (x, formula::mu_expressions(&assignments))
        }
        _ => unreachable!("preprocessing wraps the formula in a fixpoint"),
    };
    let x_e = equations
        .first()
        .map(|eq| eq.variable.name)
        .unwrap_or(x_f);

    let mut args = Vec::new();
    if timed {
        let real = pool.sort_real();
        args.push(pool.number("0", real));
    }
    args.extend(fi);
    args.extend(spec.initial_state.iter().copied());
    for decl in par(pool, x_f, &[], f) {
        args.push(pool.var_decl(decl));
    }

    let mut pbes = Pbes {
        data: spec.data.clone(),
        equations,
        global_variables: spec.global_variables.clone(),
        initial: (x_e, args),
    };
    debug_assert!(is_monotonous(pool, &pbes));
    normalize(pool, &mut pbes);
    debug_assert!(pbes.equations.iter().all(|eq| is_normalized(pool, eq.formula)));
    debug_assert!(is_closed(pool, &pbes));
    complete_data_specification(pool, &mut pbes);
    Ok(pbes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn par_stops_at_the_variables_own_binder() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let x = pool.intern("X");
        let y = pool.intern("Y");
        let n = pool.intern("n");
        let n_decl = VarDecl { name: n, sort: nat };

        // nu X. forall n:Nat. mu Y. X
        let occurrence = pool.st(StateFormula::Var(x, vec![]));
        let inner = pool.st(StateFormula::Mu(y, vec![], occurrence));
        let quantified = pool.st(StateFormula::Forall(vec![n_decl], inner));
        let f = pool.st(StateFormula::Nu(x, vec![], quantified));

        // the outer binder is X itself, so nothing is in scope at X
        assert_eq!(par(&pool, x, &[], f), vec![]);
        // at Y the quantified variable is in scope
        assert_eq!(par(&pool, y, &[], f), vec![n_decl]);
    }

    #[test]
    fn fixpoint_assignments_contribute_to_par() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let x = pool.intern("X");
        let y = pool.intern("Y");
        let m = pool.intern("m");
        let m_decl = VarDecl { name: m, sort: nat };
        let zero = pool.number("0", nat);

        // nu X(m:Nat = 0). mu Y. Y
        let occurrence = pool.st(StateFormula::Var(y, vec![]));
        let inner = pool.st(StateFormula::Mu(y, vec![], occurrence));
        let f = pool.st(StateFormula::Nu(x, vec![(m_decl, zero)], inner));
        assert_eq!(par(&pool, y, &[], f), vec![m_decl]);
    }

    #[test]
    fn equal_multi_actions_requires_matching_labels() {
        let mut pool = TermPool::new();
        let a = pool.label_named("a", vec![]);
        let b = pool.label_named("b", vec![]);
        let aa = pool.action(a, vec![]);
        let bb = pool.action(b, vec![]);
        let yes = equal_multi_actions(&mut pool, &[aa], &[aa]);
        assert_eq!(yes, pool.pb_true());
        let no = equal_multi_actions(&mut pool, &[aa], &[bb]);
        assert_eq!(no, pool.pb_false());
        let arity = equal_multi_actions(&mut pool, &[aa], &[aa, bb]);
        assert_eq!(arity, pool.pb_false());
    }

    #[test]
    fn equal_multi_actions_compares_data_arguments() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let a = pool.label_named("a", vec![nat]);
        let one = pool.number("1", nat);
        let n = pool.intern("n");
        let n_var = pool.var(n, nat);
        let a_one = pool.action(a, vec![one]);
        let a_n = pool.action(a, vec![n_var]);

        let result = equal_multi_actions(&mut pool, &[a_one], &[a_n]);
        let eq = pool.op_eq(one, n_var);
        assert_eq!(result, pool.pb_data(eq));
    }
}
