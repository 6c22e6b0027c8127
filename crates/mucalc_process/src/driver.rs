//! The alphabet driver.
//!
//! `alphabet_reduce` takes a process specification to an equivalent one in
//! which the restriction operators reachable from `init` have been driven
//! inward. The run proceeds in phases: validate the input, build the
//! process dependency graph to a fixed point, classify every reachable
//! equation, expand recognised n-parallel replications, iterate the
//! sequential equations' alphabets until stable, reduce the initial
//! expression, and emit the surviving equations in declaration order
//! followed by the freshly minted ones.

use std::cell::Cell;
use std::rc::Rc;

use fnv::{FnvHashMap, FnvHashSet};
use mucalc_base::{Diagnostics, Symbol};
use mucalc_terms::process::ProcEquation;
use mucalc_terms::spec::ProcessSpec;
use mucalc_terms::traverse::{walk_proc, ProcVisitor};
use mucalc_terms::{MultiNameId, ProcExpr, ProcId, ProcNameId, TermPool, VarDecl};

use crate::algebra::{list_minus, merge_list, AlgebraCaches, Alphabet};
use crate::alphabet::AlphaKey;
use crate::classify::{collect_pos_constants, ProcForm, ProcProps, Recursivity};
use crate::error::AlphaError;

/// Upper bound on alphabet-iteration rounds. The iteration is monotone on
/// a finite lattice and terminates by itself on well-formed input; the
/// bound turns a runaway case into a warning instead of a hang.
const MAX_ALPHA_ITERATIONS: usize = 1000;

/// State of one alphabet-reduction run.
pub struct AlphaReducer<'a> {
    pub(crate) pool: &'a mut TermPool,
    pub(crate) diag: &'a mut Diagnostics,
    pub(crate) caches: AlgebraCaches,
    /// Total alphabets, keyed on labels, process names, and terms.
    pub(crate) alphas: FnvHashMap<AlphaKey, Alphabet>,
    /// Bounded alphabets, keyed on `(identity, length, allowed)`.
    pub(crate) partial: FnvHashMap<(AlphaKey, usize, Vec<MultiNameId>), Alphabet>,
    /// Current body of every equation, including minted ones.
    pub(crate) procs: FnvHashMap<ProcNameId, ProcId>,
    pub(crate) form_pars: FnvHashMap<ProcNameId, Vec<VarDecl>>,
    pub(crate) props: FnvHashMap<ProcNameId, ProcProps>,
    pub(crate) deps: FnvHashMap<ProcNameId, Vec<ProcNameId>>,
    /// `(allow set, original) -> clone` for equations cloned under allow.
    pub(crate) subs_alpha: FnvHashMap<(Vec<MultiNameId>, ProcNameId), ProcNameId>,
    pub(crate) subs_alpha_rev: FnvHashMap<ProcNameId, ProcNameId>,
    pub(crate) all_stable: bool,
    pub(crate) push_comm_through_allow: Rc<Cell<bool>>,
    init_key: ProcNameId,
}

/// Applies the alphabet reductions to `spec`.
///
/// Warnings (unrecognised replication patterns, redundant or too strict
/// allows, a non-converging iteration) go to `diag`; the function only
/// fails on malformed input.
pub fn alphabet_reduce(
    pool: &mut TermPool,
    spec: &ProcessSpec,
    diag: &mut Diagnostics,
) -> Result<ProcessSpec, AlphaError> {
    AlphaReducer::new(pool, diag).run(spec)
}

/// Computes the total alphabet of `term` in the equation context of
/// `spec`, stabilising the per-equation alphabets first.
pub fn process_alphabet(
    pool: &mut TermPool,
    spec: &ProcessSpec,
    term: ProcId,
    diag: &mut Diagnostics,
) -> Result<Alphabet, AlphaError> {
    let mut reducer = AlphaReducer::new(pool, diag);
    reducer.prepare(spec)?;
    Ok(reducer.get_alpha(term, 0, &[]))
}

impl<'a> AlphaReducer<'a> {
    pub fn new(pool: &'a mut TermPool, diag: &'a mut Diagnostics) -> Self {
        let init_sym = pool.intern("init");
        let init_key = pool.proc_name(init_sym, Vec::new());
        AlphaReducer {
            pool,
            diag,
            caches: AlgebraCaches::new(),
            alphas: FnvHashMap::default(),
            partial: FnvHashMap::default(),
            procs: FnvHashMap::default(),
            form_pars: FnvHashMap::default(),
            props: FnvHashMap::default(),
            deps: FnvHashMap::default(),
            subs_alpha: FnvHashMap::default(),
            subs_alpha_rev: FnvHashMap::default(),
            all_stable: false,
            push_comm_through_allow: Rc::new(Cell::new(true)),
            init_key,
        }
    }

    pub fn run(&mut self, spec: &ProcessSpec) -> Result<ProcessSpec, AlphaError> {
        self.diag.verbose("applying alphabet reductions");
        self.prepare(spec)?;

        // reduce the initial expression; this recursively triggers every
        // mCRL equation it reaches
        let init_body = self.procs[&self.init_key];
        let new_init = self.apply_alpha(init_body);
        self.procs.insert(self.init_key, new_init);
        let init_alpha = self.alpha_of(new_init);
        self.alphas.insert(AlphaKey::Name(self.init_key), init_alpha);

        self.rebuild_deps();
        Ok(self.emit(spec, new_init))
    }

    /// Runs the phases up to and including alphabet stabilisation:
    /// validation, table setup, the dependency fixed point,
    /// classification, n-parallel expansion, and the alphabet iteration.
    pub fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), AlphaError> {
        self.validate(spec)?;

        for eq in &spec.equations {
            self.procs.insert(eq.name, eq.body);
            self.form_pars.insert(eq.name, eq.parameters.clone());
        }
        self.procs.insert(self.init_key, spec.init);

        self.rebuild_deps();
        self.classify();
        if self.expand_replications(spec) {
            self.rebuild_deps();
        }
        self.stabilise_alphabets();
        Ok(())
    }

    // ---- validation ----------------------------------------------------

    fn validate(&mut self, spec: &ProcessSpec) -> Result<(), AlphaError> {
        let mut known: FnvHashSet<ProcNameId> = spec.equations.iter().map(|eq| eq.name).collect();
        known.insert(self.init_key);

        struct Validator<'k> {
            known: &'k FnvHashSet<ProcNameId>,
            missing: Option<ProcNameId>,
            overlapping: Option<ProcId>,
        }

        impl ProcVisitor for Validator<'_> {
            fn enter_proc(&mut self, pool: &TermPool, id: ProcId) {
                match pool.proc_expr(id) {
                    ProcExpr::ProcRef(name, _) | ProcExpr::ProcRefAssign(name, _) => {
                        if !self.known.contains(name) && self.missing.is_none() {
                            self.missing = Some(*name);
                        }
                    }
                    ProcExpr::Comm(pairs, _) => {
                        for (i, a) in pairs.iter().enumerate() {
                            for b in &pairs[i + 1..] {
                                let la = pool.multi_name_syms(a.lhs);
                                let lb = pool.multi_name_syms(b.lhs);
                                if la.iter().any(|n| lb.contains(n)) && self.overlapping.is_none() {
                                    self.overlapping = Some(id);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut validator = Validator { known: &known, missing: None, overlapping: None };
        for eq in &spec.equations {
            walk_proc(self.pool, eq.body, &mut validator);
        }
        walk_proc(self.pool, spec.init, &mut validator);

        if let Some(name) = validator.missing {
            let shown = self.pool.name(self.pool.proc_name_decl(name).name).to_string();
            self.diag.error(format!("process reference {shown} does not resolve"));
            return Err(AlphaError::UnresolvedReference(shown));
        }
        if let Some(term) = validator.overlapping {
            let shown = mucalc_terms::print::display_proc(self.pool, term);
            self.diag.error(format!("overlapping communication left-hand sides in {shown}"));
            return Err(AlphaError::OverlappingComm(shown));
        }
        Ok(())
    }

    // ---- dependency graph ----------------------------------------------

    /// The equations currently reachable from `init`: `init` itself
    /// followed by its recorded dependencies.
    fn reachable(&self) -> Vec<ProcNameId> {
        let mut todo = vec![self.init_key];
        if let Some(dep) = self.deps.get(&self.init_key) {
            todo.extend(dep.iter().copied());
        }
        todo
    }

    /// Recomputes the dependency graph from scratch, iterating until the
    /// per-equation dependency sets stop changing.
    fn rebuild_deps(&mut self) {
        self.deps.clear();
        loop {
            let mut stable = true;
            for pn in self.reachable() {
                let old = self.deps.get(&pn).cloned().unwrap_or_else(|| {
                    self.deps.insert(pn, Vec::new());
                    Vec::new()
                });
                let mut dep = self.proc_deps(self.procs[&pn]);
                dep.sort_unstable();
                if old != dep {
                    stable = false;
                    self.deps.insert(pn, dep);
                }
            }
            if stable {
                break;
            }
        }
    }

    // ---- classification ------------------------------------------------

    fn classify(&mut self) {
        self.props.clear();
        for pn in self.reachable() {
            let dep = self.deps.get(&pn).cloned().unwrap_or_default();
            let recursivity = if dep.contains(&pn) {
                Recursivity::Recursive
            } else {
                Recursivity::NonRecursive
            };
            self.props.insert(pn, ProcProps { form: ProcForm::Pcrl, recursivity });
        }
        loop {
            let mut stable = true;
            for pn in self.reachable() {
                let prop = self.props[&pn];
                let form = self.proc_form(self.procs[&pn], pn);
                if form != prop.form {
                    self.props.insert(pn, ProcProps { form, ..prop });
                    stable = false;
                }
            }
            if stable {
                break;
            }
        }
    }

    // ---- n-parallel expansion ------------------------------------------

    /// Detects and expands n-parallel replications. Returns true when any
    /// substitution was made, in which case the dependency graph must be
    /// rebuilt.
    fn expand_replications(&mut self, spec: &ProcessSpec) -> bool {
        let mut subs: FnvHashMap<ProcNameId, Vec<(Symbol, ProcNameId)>> = FnvHashMap::default();
        for pn in self.reachable() {
            let props = self.props[&pn];
            if props.form == ProcForm::Mcrl && props.recursivity == Recursivity::Recursive {
                let shown = self.pool.name(self.pool.proc_name_decl(pn).name).to_string();
                if self.recognize_n_parallel(pn) {
                    self.diag.verbose(format!(
                        "- process {shown} is a recursive parallel process in n-parallel format"
                    ));
                    self.props.insert(
                        pn,
                        ProcProps { form: ProcForm::NPcrl, recursivity: Recursivity::Recursive },
                    );
                    subs.insert(pn, Vec::new());
                } else {
                    self.diag.warning(format!(
                        "process {shown} is a recursive parallel process not in n-parallel \
                         format; alphabet reductions may not stop, or may not be performed \
                         completely"
                    ));
                }
            }
        }
        if subs.is_empty() {
            return false;
        }

        let consts = collect_pos_constants(self.pool, &spec.data);
        let mut success = true;
        for pn in self.reachable() {
            if self.props[&pn].form == ProcForm::NPcrl {
                continue;
            }
            let body = self.procs[&pn];
            match self.subst_n_parallel(&mut subs, &consts, body) {
                Some(new_body) => {
                    self.procs.insert(pn, new_body);
                }
                None => {
                    self.diag.warning(
                        "could not replace all n-parallel processes; alphabet reductions may \
                         not stop, or may not be performed completely",
                    );
                    success = false;
                }
            }
        }

        for (np, pairs) in subs {
            let body = self.procs[&np];
            let (q_name, q_params) = match self.pool.proc_expr(body).clone() {
                ProcExpr::IfThenElse(_, _, els) => match self.pool.proc_expr(els).clone() {
                    ProcExpr::ProcRef(q, params) => (q, params),
                    _ => continue, // shape was checked during recognition
                },
                _ => continue,
            };
            let n = self.pool.proc_name_decl(np).sorts.len();
            let m = self.pool.proc_name_decl(q_name).sorts.len();
            let extra = if n == m { q_params[1..].to_vec() } else { q_params.clone() };
            let np_pars = self.form_pars.get(&np).cloned().unwrap_or_default();

            for (k_sym, new_name) in &pairs {
                let text = self.pool.name(*k_sym).to_string();
                let k: u64 = match text.parse() {
                    Ok(k) => k,
                    Err(_) => {
                        self.diag.error(format!(
                            "cannot expand n-parallel process for parameter value {text}"
                        ));
                        success = false;
                        continue;
                    }
                };
                let expansion = self.expand_n_parallel(k, q_name, n == m, &extra);
                self.procs.insert(*new_name, expansion);
                self.form_pars.insert(*new_name, np_pars[1..].to_vec());
                self.props.insert(
                    *new_name,
                    ProcProps { form: ProcForm::Mcrl, recursivity: Recursivity::NonRecursive },
                );
                let q_deps = self.deps.get(&q_name).cloned().unwrap_or_default();
                self.deps.insert(*new_name, merge_list(&[q_name], &q_deps));
            }

            if success {
                self.procs.remove(&np);
                self.props.remove(&np);
                self.deps.remove(&np);
            }
        }
        true
    }

    // ---- alphabet stabilisation ----------------------------------------

    /// Iterates the alphabets of the sequential equations to a fixed
    /// point; alphabets only grow, so the loop is monotone on a finite
    /// lattice.
    fn stabilise_alphabets(&mut self) {
        for pn in self.reachable() {
            if self.props[&pn].form != ProcForm::Mcrl {
                self.alphas.insert(AlphaKey::Name(pn), Vec::new());
            }
        }
        let delta = self.pool.delta();
        self.put_alpha(delta, Vec::new());
        let tau = self.pool.tau();
        self.put_alpha(tau, Vec::new());

        self.all_stable = false;
        let todo = self.reachable();
        let mut rounds = 0usize;
        loop {
            let mut stable = true;
            for &pn in &todo {
                if self.props[&pn].form == ProcForm::Mcrl {
                    continue;
                }
                let old = self
                    .alphas
                    .get(&AlphaKey::Name(pn))
                    .cloned()
                    .unwrap_or_default();
                let body = self.procs[&pn];
                let l = self.get_alpha(body, 0, &[]);
                self.alphas.insert(AlphaKey::Name(pn), l.clone());
                if old.len() != l.len() || !list_minus(&old, &l).is_empty() {
                    stable = false;
                }
            }
            if stable {
                break;
            }
            rounds += 1;
            if rounds >= MAX_ALPHA_ITERATIONS {
                self.diag.warning(format!(
                    "alphabet iteration did not converge within {MAX_ALPHA_ITERATIONS} rounds; \
                     subsequent reductions are sound but may be over-restricted"
                ));
                break;
            }
        }
        self.all_stable = true;
    }

    // ---- emission ------------------------------------------------------

    /// The reduced specification: the equations still referenced from the
    /// initial expression, originals in declaration order first, then the
    /// equations minted during reduction, each with its formal parameters.
    fn emit(&mut self, spec: &ProcessSpec, new_init: ProcId) -> ProcessSpec {
        let referenced: FnvHashSet<ProcNameId> = self
            .deps
            .get(&self.init_key)
            .map(|dep| dep.iter().copied().collect())
            .unwrap_or_default();
        let mut remaining = self.procs.clone();
        let mut equations = Vec::new();
        for eq in &spec.equations {
            if !referenced.contains(&eq.name) {
                continue;
            }
            if let Some(&body) = remaining.get(&eq.name) {
                equations.push(ProcEquation {
                    name: eq.name,
                    parameters: eq.parameters.clone(),
                    body,
                });
                remaining.remove(&eq.name);
            }
        }
        for pn in self.deps.get(&self.init_key).cloned().unwrap_or_default() {
            if pn == self.init_key {
                continue;
            }
            if let Some(&body) = remaining.get(&pn) {
                let mut parameters = self.form_pars.get(&pn).cloned().unwrap_or_default();
                if let Some(&original) = self.subs_alpha_rev.get(&pn) {
                    if let Some(original_pars) = self.form_pars.get(&original) {
                        parameters = original_pars.clone();
                    }
                }
                equations.push(ProcEquation { name: pn, parameters, body });
                remaining.remove(&pn);
            }
        }

        ProcessSpec {
            data: spec.data.clone(),
            action_labels: spec.action_labels.clone(),
            global_variables: spec.global_variables.clone(),
            equations,
            init: new_init,
        }
    }
}
