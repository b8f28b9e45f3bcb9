//! Wildcard matching of expressions against pattern templates, plus
//! free-variable scans.
//!
//! A pattern is an ordinary expression in which variables named `x<digits>`
//! or `y<digits>` are wildcards; every other node must match structurally.
//! A wildcard may appear several times, in which case all occurrences must
//! bind equal subexpressions.

use im_rc::{OrdMap, OrdSet};

use crate::data::expr::{Expr, ExprKind};
use crate::expr_eq::equal;

pub fn is_wildcard(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some('x') | Some('y') => {}
        _ => return false,
    }
    let mut any_digit = false;
    for c in chars {
        if !c.is_ascii_digit() {
            return false;
        }
        any_digit = true;
    }
    any_digit
}

/// Match `subject` against `pattern`, returning the wildcard bindings on
/// success.
pub fn expr_match(pattern: &Expr, subject: &Expr) -> Option<OrdMap<String, Expr>> {
    let mut bindings = OrdMap::new();
    if match_inner(pattern, subject, &mut bindings) {
        Some(bindings)
    } else {
        None
    }
}

fn match_inner(pattern: &Expr, subject: &Expr, bindings: &mut OrdMap<String, Expr>) -> bool {
    if pattern.ty() != subject.ty() {
        return false;
    }
    match (pattern.kind(), subject.kind()) {
        (ExprKind::Var(name), _) if is_wildcard(name) => match bindings.get(name) {
            Some(prev) => equal(prev, subject),
            None => {
                bindings.insert(name.clone(), subject.clone());
                true
            }
        },
        (ExprKind::Var(a), ExprKind::Var(b)) => a == b,
        (ExprKind::IntLit(a), ExprKind::IntLit(b)) => a == b,
        (ExprKind::UIntLit(a), ExprKind::UIntLit(b)) => a == b,
        (ExprKind::FloatLit(a), ExprKind::FloatLit(b)) => a.to_bits() == b.to_bits(),
        (ExprKind::StrLit(a), ExprKind::StrLit(b)) => a == b,
        (ExprKind::Cast(a), ExprKind::Cast(b)) => match_inner(a, b, bindings),
        (ExprKind::Add(a0, a1), ExprKind::Add(b0, b1))
        | (ExprKind::Sub(a0, a1), ExprKind::Sub(b0, b1))
        | (ExprKind::Mul(a0, a1), ExprKind::Mul(b0, b1))
        | (ExprKind::Div(a0, a1), ExprKind::Div(b0, b1))
        | (ExprKind::Mod(a0, a1), ExprKind::Mod(b0, b1))
        | (ExprKind::Min(a0, a1), ExprKind::Min(b0, b1))
        | (ExprKind::Max(a0, a1), ExprKind::Max(b0, b1))
        | (ExprKind::Eq(a0, a1), ExprKind::Eq(b0, b1))
        | (ExprKind::Ne(a0, a1), ExprKind::Ne(b0, b1))
        | (ExprKind::Lt(a0, a1), ExprKind::Lt(b0, b1))
        | (ExprKind::Le(a0, a1), ExprKind::Le(b0, b1))
        | (ExprKind::Gt(a0, a1), ExprKind::Gt(b0, b1))
        | (ExprKind::Ge(a0, a1), ExprKind::Ge(b0, b1))
        | (ExprKind::And(a0, a1), ExprKind::And(b0, b1))
        | (ExprKind::Or(a0, a1), ExprKind::Or(b0, b1)) => {
            match_inner(a0, b0, bindings) && match_inner(a1, b1, bindings)
        }
        (ExprKind::Not(a), ExprKind::Not(b)) => match_inner(a, b, bindings),
        (
            ExprKind::Select {
                cond: ac,
                true_value: at,
                false_value: af,
            },
            ExprKind::Select {
                cond: bc,
                true_value: bt,
                false_value: bf,
            },
        ) => {
            match_inner(ac, bc, bindings)
                && match_inner(at, bt, bindings)
                && match_inner(af, bf, bindings)
        }
        (
            ExprKind::Call {
                name: an,
                args: aa,
                value_index: ai,
                call_kind: ak,
            },
            ExprKind::Call {
                name: bn,
                args: ba,
                value_index: bi,
                call_kind: bk,
            },
        ) => {
            an == bn
                && ai == bi
                && ak == bk
                && aa.len() == ba.len()
                && aa
                    .iter()
                    .zip(ba)
                    .all(|(a, b)| match_inner(a, b, bindings))
        }
        _ => false,
    }
}

/// Does `e` reference the free variable `name`? `Let` bindings of the same
/// name shadow it.
pub fn expr_uses_var(e: &Expr, name: &str) -> bool {
    match e.kind() {
        ExprKind::Var(var) => var == name,
        ExprKind::Let {
            name: bound,
            value,
            body,
        } => expr_uses_var(value, name) || (bound != name && expr_uses_var(body, name)),
        _ => {
            let mut used = false;
            crate::data::expr::for_each_child(e, |child| {
                used = used || expr_uses_var(child, name);
            });
            used
        }
    }
}

/// Does `e` reference any free variable in `scope`?
pub fn expr_uses_vars(e: &Expr, scope: &OrdSet<String>) -> bool {
    match e.kind() {
        ExprKind::Var(var) => scope.contains(var),
        ExprKind::Let {
            name: bound,
            value,
            body,
        } => {
            if expr_uses_vars(value, scope) {
                return true;
            }
            if scope.contains(bound) {
                let narrowed = scope.without(bound);
                expr_uses_vars(body, &narrowed)
            } else {
                expr_uses_vars(body, scope)
            }
        }
        _ => {
            let mut used = false;
            crate::data::expr::for_each_child(e, |child| {
                used = used || expr_uses_vars(child, scope);
            });
            used
        }
    }
}
