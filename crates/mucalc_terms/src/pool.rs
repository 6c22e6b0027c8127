//! The hash-consing term pool.
//!
//! One cons table per syntactic category. Constructing a term first
//! normalises the node (multi-actions sorted, block/hide sets sorted and
//! duplicate-free) and then returns the id of its structural equivalence
//! class, interning the node when it is new. Id equality therefore implies
//! semantic equality, and all caches of the engines key on ids.

use std::cmp::Ordering;
use std::hash::Hash;

use fnv::FnvHashMap;
use mucalc_base::{Interner, Symbol};

use crate::action::{Action, ActionId, ActionLabel, LabelId, MultiActId, MultiNameId};
use crate::data::{DataExpr, DataId, VarDecl};
use crate::formula::{ActFormId, ActionFormula, StFormId, StateFormula};
use crate::pbes::{PbesExpr, PbesId};
use crate::process::{CommPair, ProcExpr, ProcId, ProcName, ProcNameId, RenamePair};
use crate::sort::{SortExpr, SortId};

/// Map-plus-vector interning table, the same discipline as the string
/// interner generalised to structured nodes.
struct ConsTable<N> {
    map: FnvHashMap<N, u32>,
    vec: Vec<N>,
}

impl<N: Clone + Eq + Hash> ConsTable<N> {
    fn new() -> Self {
        ConsTable {
            map: FnvHashMap::default(),
            vec: Vec::new(),
        }
    }

    fn intern(&mut self, node: N) -> u32 {
        if let Some(&id) = self.map.get(&node) {
            return id;
        }
        let id = self.vec.len() as u32;
        self.vec.push(node.clone());
        self.map.insert(node, id);
        id
    }

    fn get(&self, id: u32) -> &N {
        &self.vec[id as usize]
    }
}

/// The shared structural-equality pool for every syntactic category.
pub struct TermPool {
    strings: Interner,
    sorts: ConsTable<SortExpr>,
    datas: ConsTable<DataExpr>,
    labels: ConsTable<ActionLabel>,
    actions: ConsTable<Action>,
    multi_acts: ConsTable<Vec<LabelId>>,
    multi_names: ConsTable<Vec<Symbol>>,
    proc_names: ConsTable<ProcName>,
    procs: ConsTable<ProcExpr>,
    st_forms: ConsTable<StateFormula>,
    act_forms: ConsTable<ActionFormula>,
    pbes_exprs: ConsTable<PbesExpr>,
}

impl TermPool {
    pub fn new() -> Self {
        TermPool {
            strings: Interner::new(),
            sorts: ConsTable::new(),
            datas: ConsTable::new(),
            labels: ConsTable::new(),
            actions: ConsTable::new(),
            multi_acts: ConsTable::new(),
            multi_names: ConsTable::new(),
            proc_names: ConsTable::new(),
            procs: ConsTable::new(),
            st_forms: ConsTable::new(),
            act_forms: ConsTable::new(),
            pbes_exprs: ConsTable::new(),
        }
    }

    // ---- strings -------------------------------------------------------

    pub fn intern(&mut self, s: &str) -> Symbol {
        self.strings.intern(s)
    }

    pub fn name(&self, sym: Symbol) -> &str {
        self.strings.resolve(sym)
    }

    /// Lexicographic order on the resolved names of two symbols.
    pub fn cmp_names(&self, a: Symbol, b: Symbol) -> Ordering {
        self.name(a).cmp(self.name(b))
    }

    // ---- sorts ---------------------------------------------------------

    pub fn sort(&mut self, node: SortExpr) -> SortId {
        SortId(self.sorts.intern(node))
    }

    pub fn sort_expr(&self, id: SortId) -> &SortExpr {
        self.sorts.get(id.0)
    }

    pub fn sort_basic(&mut self, name: &str) -> SortId {
        let sym = self.intern(name);
        self.sort(SortExpr::Basic(sym))
    }

    pub fn sort_bool(&mut self) -> SortId {
        self.sort_basic("Bool")
    }

    pub fn sort_pos(&mut self) -> SortId {
        self.sort_basic("Pos")
    }

    pub fn sort_nat(&mut self) -> SortId {
        self.sort_basic("Nat")
    }

    pub fn sort_int(&mut self) -> SortId {
        self.sort_basic("Int")
    }

    pub fn sort_real(&mut self) -> SortId {
        self.sort_basic("Real")
    }

    pub fn sort_function(&mut self, domain: Vec<SortId>, codomain: SortId) -> SortId {
        self.sort(SortExpr::Function(domain, codomain))
    }

    // ---- data expressions ---------------------------------------------

    pub fn data(&mut self, node: DataExpr) -> DataId {
        DataId(self.datas.intern(node))
    }

    pub fn data_expr(&self, id: DataId) -> &DataExpr {
        self.datas.get(id.0)
    }

    pub fn var(&mut self, name: Symbol, sort: SortId) -> DataId {
        self.data(DataExpr::Variable(VarDecl { name, sort }))
    }

    pub fn var_decl(&mut self, decl: VarDecl) -> DataId {
        self.data(DataExpr::Variable(decl))
    }

    pub fn op_id(&mut self, name: &str, sort: SortId) -> DataId {
        let sym = self.intern(name);
        self.data(DataExpr::OpId(sym, sort))
    }

    pub fn appl(&mut self, head: DataId, args: Vec<DataId>) -> DataId {
        self.data(DataExpr::Appl(head, args))
    }

    /// A numeric literal of the given sort. Literals are operation ids
    /// whose name is the literal text.
    pub fn number(&mut self, text: &str, sort: SortId) -> DataId {
        debug_assert!(is_numeric(text));
        self.op_id(text, sort)
    }

    /// True if `id` is an operation id with a numeric name.
    pub fn is_number(&self, id: DataId) -> bool {
        match self.data_expr(id) {
            DataExpr::OpId(name, _) => is_numeric(self.name(*name)),
            _ => false,
        }
    }

    /// The sort of a data expression, as far as it can be read off the
    /// node structure.
    pub fn data_sort(&mut self, id: DataId) -> SortId {
        match self.data_expr(id).clone() {
            DataExpr::Variable(v) => v.sort,
            DataExpr::OpId(_, sort) => sort,
            DataExpr::Appl(head, _) => {
                let head_sort = self.data_sort(head);
                match self.sort_expr(head_sort).clone() {
                    SortExpr::Function(_, codomain) => codomain,
                    _ => self.sort(SortExpr::Unknown),
                }
            }
            DataExpr::Forall(..) | DataExpr::Exists(..) => self.sort_bool(),
            DataExpr::Lambda(vars, body) => {
                let codomain = self.data_sort(body);
                let domain = vars.iter().map(|v| v.sort).collect();
                self.sort_function(domain, codomain)
            }
            DataExpr::Where(body, _) => self.data_sort(body),
        }
    }

    fn binary_op(&mut self, name: &str, lhs: DataId, rhs: DataId, codomain: SortId) -> DataId {
        let ls = self.data_sort(lhs);
        let rs = self.data_sort(rhs);
        let op_sort = self.sort_function(vec![ls, rs], codomain);
        let op = self.op_id(name, op_sort);
        self.appl(op, vec![lhs, rhs])
    }

    pub fn op_eq(&mut self, lhs: DataId, rhs: DataId) -> DataId {
        let b = self.sort_bool();
        self.binary_op("==", lhs, rhs, b)
    }

    pub fn op_greater(&mut self, lhs: DataId, rhs: DataId) -> DataId {
        let b = self.sort_bool();
        self.binary_op(">", lhs, rhs, b)
    }

    pub fn op_less_equal(&mut self, lhs: DataId, rhs: DataId) -> DataId {
        let b = self.sort_bool();
        self.binary_op("<=", lhs, rhs, b)
    }

    pub fn op_not(&mut self, arg: DataId) -> DataId {
        let b = self.sort_bool();
        let op_sort = self.sort_function(vec![b], b);
        let op = self.op_id("!", op_sort);
        self.appl(op, vec![arg])
    }

    pub fn data_true(&mut self) -> DataId {
        let b = self.sort_bool();
        self.op_id("true", b)
    }

    pub fn data_false(&mut self) -> DataId {
        let b = self.sort_bool();
        self.op_id("false", b)
    }

    // ---- actions and multi-actions ------------------------------------

    pub fn label(&mut self, name: Symbol, sorts: Vec<SortId>) -> LabelId {
        LabelId(self.labels.intern(ActionLabel { name, sorts }))
    }

    pub fn label_named(&mut self, name: &str, sorts: Vec<SortId>) -> LabelId {
        let sym = self.intern(name);
        self.label(sym, sorts)
    }

    pub fn label_decl(&self, id: LabelId) -> &ActionLabel {
        self.labels.get(id.0)
    }

    /// The untyped projection of a label: its name.
    pub fn untype_label(&self, id: LabelId) -> Symbol {
        self.label_decl(id).name
    }

    pub fn action(&mut self, label: LabelId, args: Vec<DataId>) -> ActionId {
        ActionId(self.actions.intern(Action { label, args }))
    }

    pub fn action_decl(&self, id: ActionId) -> &Action {
        self.actions.get(id.0)
    }

    /// The fixed total order on labels: lexicographic on the name, then on
    /// the structural keys of the sort signature.
    pub fn cmp_labels(&self, a: LabelId, b: LabelId) -> Ordering {
        let la = self.label_decl(a);
        let lb = self.label_decl(b);
        self.cmp_names(la.name, lb.name)
            .then_with(|| la.sorts.cmp(&lb.sorts))
    }

    /// Order on action instances: the label order, then the argument keys.
    pub fn cmp_actions(&self, a: ActionId, b: ActionId) -> Ordering {
        let aa = self.action_decl(a);
        let ab = self.action_decl(b);
        self.cmp_labels(aa.label, ab.label)
            .then_with(|| aa.args.cmp(&ab.args))
    }

    /// Interns a typed multi-action; the label list is sorted first.
    pub fn multi_act(&mut self, mut labels: Vec<LabelId>) -> MultiActId {
        labels.sort_by(|&a, &b| self.cmp_labels(a, b));
        MultiActId(self.multi_acts.intern(labels))
    }

    pub fn multi_act_labels(&self, id: MultiActId) -> &[LabelId] {
        self.multi_acts.get(id.0)
    }

    pub fn empty_multi_act(&mut self) -> MultiActId {
        self.multi_act(Vec::new())
    }

    pub fn multi_act_len(&self, id: MultiActId) -> usize {
        self.multi_act_labels(id).len()
    }

    /// Interns an untyped multi-action name; sorted by label name.
    pub fn multi_name(&mut self, mut names: Vec<Symbol>) -> MultiNameId {
        names.sort_by(|&a, &b| self.cmp_names(a, b));
        MultiNameId(self.multi_names.intern(names))
    }

    pub fn multi_name_syms(&self, id: MultiNameId) -> &[Symbol] {
        self.multi_names.get(id.0)
    }

    pub fn empty_multi_name(&mut self) -> MultiNameId {
        self.multi_name(Vec::new())
    }

    pub fn multi_name_len(&self, id: MultiNameId) -> usize {
        self.multi_name_syms(id).len()
    }

    // ---- process expressions ------------------------------------------

    pub fn proc_name(&mut self, name: Symbol, sorts: Vec<SortId>) -> ProcNameId {
        ProcNameId(self.proc_names.intern(ProcName { name, sorts }))
    }

    pub fn proc_name_decl(&self, id: ProcNameId) -> &ProcName {
        self.proc_names.get(id.0)
    }

    /// Interns a process expression, normalising restriction sets: block
    /// and hide name sets are sorted and deduplicated.
    pub fn proc(&mut self, node: ProcExpr) -> ProcId {
        let node = match node {
            ProcExpr::Block(names, body) => ProcExpr::Block(self.name_set(names), body),
            ProcExpr::Hide(names, body) => ProcExpr::Hide(self.name_set(names), body),
            other => other,
        };
        ProcId(self.procs.intern(node))
    }

    fn name_set(&self, mut names: Vec<Symbol>) -> Vec<Symbol> {
        names.sort_by(|&a, &b| self.cmp_names(a, b));
        names.dedup();
        names
    }

    pub fn proc_expr(&self, id: ProcId) -> &ProcExpr {
        self.procs.get(id.0)
    }

    pub fn delta(&mut self) -> ProcId {
        self.proc(ProcExpr::Delta)
    }

    pub fn tau(&mut self) -> ProcId {
        self.proc(ProcExpr::Tau)
    }

    pub fn act(&mut self, action: ActionId) -> ProcId {
        self.proc(ProcExpr::Act(action))
    }

    pub fn proc_ref(&mut self, name: ProcNameId, args: Vec<DataId>) -> ProcId {
        self.proc(ProcExpr::ProcRef(name, args))
    }

    pub fn seq(&mut self, l: ProcId, r: ProcId) -> ProcId {
        self.proc(ProcExpr::Seq(l, r))
    }

    pub fn choice(&mut self, l: ProcId, r: ProcId) -> ProcId {
        self.proc(ProcExpr::Choice(l, r))
    }

    pub fn merge(&mut self, l: ProcId, r: ProcId) -> ProcId {
        self.proc(ProcExpr::Merge(l, r))
    }

    pub fn sync(&mut self, l: ProcId, r: ProcId) -> ProcId {
        self.proc(ProcExpr::Sync(l, r))
    }

    pub fn block(&mut self, names: Vec<Symbol>, body: ProcId) -> ProcId {
        self.proc(ProcExpr::Block(names, body))
    }

    pub fn hide(&mut self, names: Vec<Symbol>, body: ProcId) -> ProcId {
        self.proc(ProcExpr::Hide(names, body))
    }

    pub fn rename(&mut self, pairs: Vec<RenamePair>, body: ProcId) -> ProcId {
        self.proc(ProcExpr::Rename(pairs, body))
    }

    pub fn allow(&mut self, names: Vec<MultiNameId>, body: ProcId) -> ProcId {
        self.proc(ProcExpr::Allow(names, body))
    }

    pub fn comm(&mut self, pairs: Vec<CommPair>, body: ProcId) -> ProcId {
        self.proc(ProcExpr::Comm(pairs, body))
    }

    // ---- state and action formulas ------------------------------------

    pub fn st(&mut self, node: StateFormula) -> StFormId {
        StFormId(self.st_forms.intern(node))
    }

    pub fn st_expr(&self, id: StFormId) -> &StateFormula {
        self.st_forms.get(id.0)
    }

    pub fn st_not(&mut self, f: StFormId) -> StFormId {
        self.st(StateFormula::Not(f))
    }

    pub fn af(&mut self, node: ActionFormula) -> ActFormId {
        ActFormId(self.act_forms.intern(node))
    }

    pub fn af_expr(&self, id: ActFormId) -> &ActionFormula {
        self.act_forms.get(id.0)
    }

    // ---- PBES expressions ---------------------------------------------

    pub fn pb(&mut self, node: PbesExpr) -> PbesId {
        PbesId(self.pbes_exprs.intern(node))
    }

    pub fn pb_expr(&self, id: PbesId) -> &PbesExpr {
        self.pbes_exprs.get(id.0)
    }

    pub fn pb_true(&mut self) -> PbesId {
        self.pb(PbesExpr::True)
    }

    pub fn pb_false(&mut self) -> PbesId {
        self.pb(PbesExpr::False)
    }

    pub fn pb_not(&mut self, f: PbesId) -> PbesId {
        self.pb(PbesExpr::Not(f))
    }

    pub fn pb_and(&mut self, l: PbesId, r: PbesId) -> PbesId {
        self.pb(PbesExpr::And(l, r))
    }

    pub fn pb_or(&mut self, l: PbesId, r: PbesId) -> PbesId {
        self.pb(PbesExpr::Or(l, r))
    }

    pub fn pb_imp(&mut self, l: PbesId, r: PbesId) -> PbesId {
        self.pb(PbesExpr::Imp(l, r))
    }

    pub fn pb_forall(&mut self, vars: Vec<VarDecl>, body: PbesId) -> PbesId {
        if vars.is_empty() {
            return body;
        }
        self.pb(PbesExpr::Forall(vars, body))
    }

    pub fn pb_exists(&mut self, vars: Vec<VarDecl>, body: PbesId) -> PbesId {
        if vars.is_empty() {
            return body;
        }
        self.pb(PbesExpr::Exists(vars, body))
    }

    pub fn pb_prop(&mut self, name: Symbol, args: Vec<DataId>) -> PbesId {
        self.pb(PbesExpr::PropVar(name, args))
    }

    pub fn pb_data(&mut self, d: DataId) -> PbesId {
        self.pb(PbesExpr::Data(d))
    }
}

impl Default for TermPool {
    fn default() -> Self {
        Self::new()
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consing_collapses_equal_terms() {
        let mut pool = TermPool::new();
        let d1 = pool.delta();
        let d2 = pool.delta();
        assert_eq!(d1, d2);

        let nat = pool.sort_nat();
        let n = pool.intern("n");
        let v1 = pool.var(n, nat);
        let v2 = pool.var(n, nat);
        assert_eq!(v1, v2);
    }

    #[test]
    fn distinct_terms_get_distinct_ids() {
        let mut pool = TermPool::new();
        let nat = pool.sort_nat();
        let bool_ = pool.sort_bool();
        let n = pool.intern("n");
        assert_ne!(pool.var(n, nat), pool.var(n, bool_));
    }

    #[test]
    fn multi_act_is_sorted_on_construction() {
        let mut pool = TermPool::new();
        let a = pool.label_named("a", vec![]);
        let b = pool.label_named("b", vec![]);
        let ab = pool.multi_act(vec![b, a]);
        let ba = pool.multi_act(vec![a, b]);
        assert_eq!(ab, ba);
        let names: Vec<&str> = pool
            .multi_act_labels(ab)
            .iter()
            .map(|&l| pool.name(pool.untype_label(l)))
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn multi_act_keeps_duplicates() {
        let mut pool = TermPool::new();
        let a = pool.label_named("a", vec![]);
        let aa = pool.multi_act(vec![a, a]);
        assert_eq!(pool.multi_act_len(aa), 2);
    }

    #[test]
    fn block_sets_are_normalised() {
        let mut pool = TermPool::new();
        let a = pool.intern("a");
        let b = pool.intern("b");
        let body = pool.tau();
        let p1 = pool.block(vec![b, a, a], body);
        let p2 = pool.block(vec![a, b], body);
        assert_eq!(p1, p2);
    }

    #[test]
    fn number_recognition() {
        let mut pool = TermPool::new();
        let pos = pool.sort_pos();
        let three = pool.number("3", pos);
        assert!(pool.is_number(three));
        let t = pool.data_true();
        assert!(!pool.is_number(t));
    }
}
