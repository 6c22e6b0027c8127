//! Compact textual renderings for diagnostics and test assertions.
//!
//! These printers aim for readability, not parsability: parentheses are
//! emitted around every compound operand instead of tracking precedence.

use crate::action::{ActionId, MultiActId, MultiNameId};
use crate::data::{DataExpr, DataId, VarDecl};
use crate::formula::{ActFormId, ActionFormula, StFormId, StateFormula};
use crate::pbes::{PbesExpr, PbesId};
use crate::pool::TermPool;
use crate::process::{ProcExpr, ProcId};

pub fn display_data(pool: &TermPool, id: DataId) -> String {
    match pool.data_expr(id).clone() {
        DataExpr::Variable(v) => pool.name(v.name).to_string(),
        DataExpr::OpId(name, _) => pool.name(name).to_string(),
        DataExpr::Appl(head, args) => {
            let head = display_data(pool, head);
            match head.as_str() {
                "==" | ">" | "<" | ">=" | "<=" | "+" | "-" | "&&" | "||" if args.len() == 2 => {
                    format!(
                        "({} {} {})",
                        display_data(pool, args[0]),
                        head,
                        display_data(pool, args[1])
                    )
                }
                "!" if args.len() == 1 => format!("!({})", display_data(pool, args[0])),
                _ => format!("{}({})", head, display_data_list(pool, &args)),
            }
        }
        DataExpr::Forall(vars, body) => {
            format!("forall {}. {}", display_decls(pool, &vars), display_data(pool, body))
        }
        DataExpr::Exists(vars, body) => {
            format!("exists {}. {}", display_decls(pool, &vars), display_data(pool, body))
        }
        DataExpr::Lambda(vars, body) => {
            format!("lambda {}. {}", display_decls(pool, &vars), display_data(pool, body))
        }
        DataExpr::Where(body, assignments) => {
            let assignments: Vec<String> = assignments
                .iter()
                .map(|(d, rhs)| format!("{} = {}", pool.name(d.name), display_data(pool, *rhs)))
                .collect();
            format!("{} whr {} end", display_data(pool, body), assignments.join(", "))
        }
    }
}

pub fn display_data_list(pool: &TermPool, ids: &[DataId]) -> String {
    ids.iter()
        .map(|&d| display_data(pool, d))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn display_decls(pool: &TermPool, decls: &[VarDecl]) -> String {
    decls
        .iter()
        .map(|d| pool.name(d.name).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn display_action(pool: &TermPool, id: ActionId) -> String {
    let action = pool.action_decl(id);
    let name = pool.name(pool.untype_label(action.label));
    if action.args.is_empty() {
        name.to_string()
    } else {
        format!("{}({})", name, display_data_list(pool, &action.args.clone()))
    }
}

pub fn display_multi_act(pool: &TermPool, id: MultiActId) -> String {
    let labels = pool.multi_act_labels(id);
    if labels.is_empty() {
        return "tau".to_string();
    }
    labels
        .iter()
        .map(|&l| pool.name(pool.untype_label(l)).to_string())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn display_multi_name(pool: &TermPool, id: MultiNameId) -> String {
    let names = pool.multi_name_syms(id);
    if names.is_empty() {
        return "tau".to_string();
    }
    names
        .iter()
        .map(|&n| pool.name(n).to_string())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn display_proc(pool: &TermPool, id: ProcId) -> String {
    match pool.proc_expr(id).clone() {
        ProcExpr::Delta => "delta".to_string(),
        ProcExpr::Tau => "tau".to_string(),
        ProcExpr::Act(a) => display_action(pool, a),
        ProcExpr::ProcRef(name, args) => {
            let decl = pool.proc_name_decl(name);
            if args.is_empty() {
                pool.name(decl.name).to_string()
            } else {
                format!("{}({})", pool.name(decl.name), display_data_list(pool, &args))
            }
        }
        ProcExpr::ProcRefAssign(name, assignments) => {
            let decl = pool.proc_name_decl(name);
            let assignments: Vec<String> = assignments
                .iter()
                .map(|(n, rhs)| format!("{} = {}", pool.name(*n), display_data(pool, *rhs)))
                .collect();
            format!("{}({})", pool.name(decl.name), assignments.join(", "))
        }
        ProcExpr::Sum(vars, body) => {
            format!("sum {}. {}", display_decls(pool, &vars), display_proc(pool, body))
        }
        ProcExpr::Block(names, body) => {
            format!("block({{{}}}, {})", display_names(pool, &names), display_proc(pool, body))
        }
        ProcExpr::Hide(names, body) => {
            format!("hide({{{}}}, {})", display_names(pool, &names), display_proc(pool, body))
        }
        ProcExpr::Rename(pairs, body) => {
            let pairs: Vec<String> = pairs
                .iter()
                .map(|p| format!("{} -> {}", pool.name(p.from), pool.name(p.to)))
                .collect();
            format!("rename({{{}}}, {})", pairs.join(", "), display_proc(pool, body))
        }
        ProcExpr::Allow(names, body) => {
            let names: Vec<String> = names.iter().map(|&v| display_multi_name(pool, v)).collect();
            format!("allow({{{}}}, {})", names.join(", "), display_proc(pool, body))
        }
        ProcExpr::Comm(pairs, body) => {
            let pairs: Vec<String> = pairs
                .iter()
                .map(|p| {
                    let lhs = display_multi_name(pool, p.lhs);
                    match p.rhs {
                        Some(rhs) => format!("{} -> {}", lhs, pool.name(rhs)),
                        None => format!("{} -> tau", lhs),
                    }
                })
                .collect();
            format!("comm({{{}}}, {})", pairs.join(", "), display_proc(pool, body))
        }
        ProcExpr::Sync(l, r) => binop(pool, "|", l, r),
        ProcExpr::At(body, time) => {
            format!("({}) @ {}", display_proc(pool, body), display_data(pool, time))
        }
        ProcExpr::Seq(l, r) => binop(pool, ".", l, r),
        ProcExpr::IfThen(cond, then) => {
            format!("({}) -> ({})", display_data(pool, cond), display_proc(pool, then))
        }
        ProcExpr::IfThenElse(cond, then, els) => format!(
            "({}) -> ({}) <> ({})",
            display_data(pool, cond),
            display_proc(pool, then),
            display_proc(pool, els)
        ),
        ProcExpr::BoundedInit(l, r) => binop(pool, "<<", l, r),
        ProcExpr::Merge(l, r) => binop(pool, "||", l, r),
        ProcExpr::LeftMerge(l, r) => binop(pool, "||_", l, r),
        ProcExpr::Choice(l, r) => binop(pool, "+", l, r),
    }
}

fn binop(pool: &TermPool, op: &str, l: ProcId, r: ProcId) -> String {
    format!("({}) {} ({})", display_proc(pool, l), op, display_proc(pool, r))
}

fn display_names(pool: &TermPool, names: &[mucalc_base::Symbol]) -> String {
    names
        .iter()
        .map(|&n| pool.name(n).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn display_act_formula(pool: &TermPool, id: ActFormId) -> String {
    match pool.af_expr(id).clone() {
        ActionFormula::True => "true".to_string(),
        ActionFormula::False => "false".to_string(),
        ActionFormula::Data(d) => display_data(pool, d),
        ActionFormula::MultiAct(actions) => actions
            .iter()
            .map(|&a| display_action(pool, a))
            .collect::<Vec<_>>()
            .join("|"),
        ActionFormula::Not(f) => format!("!({})", display_act_formula(pool, f)),
        ActionFormula::And(l, r) => {
            format!("({}) && ({})", display_act_formula(pool, l), display_act_formula(pool, r))
        }
        ActionFormula::Or(l, r) => {
            format!("({}) || ({})", display_act_formula(pool, l), display_act_formula(pool, r))
        }
        ActionFormula::Imp(l, r) => {
            format!("({}) => ({})", display_act_formula(pool, l), display_act_formula(pool, r))
        }
        ActionFormula::Forall(vars, body) => {
            format!("forall {}. {}", display_decls(pool, &vars), display_act_formula(pool, body))
        }
        ActionFormula::Exists(vars, body) => {
            format!("exists {}. {}", display_decls(pool, &vars), display_act_formula(pool, body))
        }
        ActionFormula::At(body, time) => {
            format!("({}) @ {}", display_act_formula(pool, body), display_data(pool, time))
        }
    }
}

pub fn display_state_formula(pool: &TermPool, id: StFormId) -> String {
    match pool.st_expr(id).clone() {
        StateFormula::True => "true".to_string(),
        StateFormula::False => "false".to_string(),
        StateFormula::Data(d) => display_data(pool, d),
        StateFormula::Not(f) => format!("!({})", display_state_formula(pool, f)),
        StateFormula::And(l, r) => {
            format!("({}) && ({})", display_state_formula(pool, l), display_state_formula(pool, r))
        }
        StateFormula::Or(l, r) => {
            format!("({}) || ({})", display_state_formula(pool, l), display_state_formula(pool, r))
        }
        StateFormula::Imp(l, r) => {
            format!("({}) => ({})", display_state_formula(pool, l), display_state_formula(pool, r))
        }
        StateFormula::Forall(vars, body) => {
            format!("forall {}. {}", display_decls(pool, &vars), display_state_formula(pool, body))
        }
        StateFormula::Exists(vars, body) => {
            format!("exists {}. {}", display_decls(pool, &vars), display_state_formula(pool, body))
        }
        StateFormula::Must(alpha, body) => {
            format!("[{}]{}", display_act_formula(pool, alpha), display_state_formula(pool, body))
        }
        StateFormula::May(alpha, body) => {
            format!("<{}>{}", display_act_formula(pool, alpha), display_state_formula(pool, body))
        }
        StateFormula::Yaled => "yaled".to_string(),
        StateFormula::YaledTimed(t) => format!("yaled @ {}", display_data(pool, t)),
        StateFormula::Delay => "delay".to_string(),
        StateFormula::DelayTimed(t) => format!("delay @ {}", display_data(pool, t)),
        StateFormula::Var(name, args) => {
            if args.is_empty() {
                pool.name(name).to_string()
            } else {
                format!("{}({})", pool.name(name), display_data_list(pool, &args))
            }
        }
        StateFormula::Mu(name, assignments, body) => {
            display_fixpoint(pool, "mu", name, &assignments, body)
        }
        StateFormula::Nu(name, assignments, body) => {
            display_fixpoint(pool, "nu", name, &assignments, body)
        }
    }
}

fn display_fixpoint(
    pool: &TermPool,
    symbol: &str,
    name: mucalc_base::Symbol,
    assignments: &[(VarDecl, DataId)],
    body: StFormId,
) -> String {
    if assignments.is_empty() {
        format!("{} {}. {}", symbol, pool.name(name), display_state_formula(pool, body))
    } else {
        let assignments: Vec<String> = assignments
            .iter()
            .map(|(d, rhs)| format!("{} = {}", pool.name(d.name), display_data(pool, *rhs)))
            .collect();
        format!(
            "{} {}({}). {}",
            symbol,
            pool.name(name),
            assignments.join(", "),
            display_state_formula(pool, body)
        )
    }
}

pub fn display_pbes_expr(pool: &TermPool, id: PbesId) -> String {
    match pool.pb_expr(id).clone() {
        PbesExpr::True => "true".to_string(),
        PbesExpr::False => "false".to_string(),
        PbesExpr::Data(d) => display_data(pool, d),
        PbesExpr::Not(f) => format!("!({})", display_pbes_expr(pool, f)),
        PbesExpr::And(l, r) => {
            format!("({}) && ({})", display_pbes_expr(pool, l), display_pbes_expr(pool, r))
        }
        PbesExpr::Or(l, r) => {
            format!("({}) || ({})", display_pbes_expr(pool, l), display_pbes_expr(pool, r))
        }
        PbesExpr::Imp(l, r) => {
            format!("({}) => ({})", display_pbes_expr(pool, l), display_pbes_expr(pool, r))
        }
        PbesExpr::Forall(vars, body) => {
            format!("forall {}. {}", display_decls(pool, &vars), display_pbes_expr(pool, body))
        }
        PbesExpr::Exists(vars, body) => {
            format!("exists {}. {}", display_decls(pool, &vars), display_pbes_expr(pool, body))
        }
        PbesExpr::PropVar(name, args) => {
            if args.is_empty() {
                format!("{}()", pool.name(name))
            } else {
                format!("{}({})", pool.name(name), display_data_list(pool, &args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_small_process() {
        let mut pool = TermPool::new();
        let a = pool.label_named("a", vec![]);
        let act = pool.action(a, vec![]);
        let p = pool.act(act);
        let d = pool.delta();
        let choice = pool.choice(p, d);
        assert_eq!(display_proc(&pool, choice), "(a) + (delta)");
    }

    #[test]
    fn tau_is_the_empty_multi_action() {
        let mut pool = TermPool::new();
        let empty = pool.empty_multi_act();
        assert_eq!(display_multi_act(&pool, empty), "tau");
    }
}
