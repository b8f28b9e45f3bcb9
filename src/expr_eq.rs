//! Structural equality of expressions, modulo alpha-renaming of `Let`-bound
//! names. Types participate in equality at every node; float literals compare
//! by bit pattern.

use crate::data::expr::{Expr, ExprKind};

pub fn equal(a: &Expr, b: &Expr) -> bool {
    equal_in(a, b, &mut Vec::new())
}

pub fn equal_opt(a: &Option<Expr>, b: &Option<Expr>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => equal(a, b),
        _ => false,
    }
}

// Each entry pairs a binder from the left expression with the corresponding
// binder from the right; variables bound at the same depth are equal
// regardless of their names.
fn equal_in(a: &Expr, b: &Expr, env: &mut Vec<(String, String)>) -> bool {
    if a.ty() != b.ty() {
        return false;
    }
    match (a.kind(), b.kind()) {
        (ExprKind::IntLit(x), ExprKind::IntLit(y)) => x == y,
        (ExprKind::UIntLit(x), ExprKind::UIntLit(y)) => x == y,
        (ExprKind::FloatLit(x), ExprKind::FloatLit(y)) => x.to_bits() == y.to_bits(),
        (ExprKind::StrLit(x), ExprKind::StrLit(y)) => x == y,
        (ExprKind::Var(x), ExprKind::Var(y)) => {
            for (bound_a, bound_b) in env.iter().rev() {
                let hit_a = bound_a == x;
                let hit_b = bound_b == y;
                if hit_a || hit_b {
                    return hit_a && hit_b;
                }
            }
            x == y
        }
        (ExprKind::Cast(x), ExprKind::Cast(y)) => equal_in(x, y, env),
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
            equal_in(a0, b0, env) && equal_in(a1, b1, env)
        }
        (ExprKind::Not(x), ExprKind::Not(y)) => equal_in(x, y, env),
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
        ) => equal_in(ac, bc, env) && equal_in(at, bt, env) && equal_in(af, bf, env),
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
                && aa.iter().zip(ba).all(|(x, y)| equal_in(x, y, env))
        }
        (
            ExprKind::Let {
                name: an,
                value: av,
                body: ab,
            },
            ExprKind::Let {
                name: bn,
                value: bv,
                body: bb,
            },
        ) => {
            if !equal_in(av, bv, env) {
                return false;
            }
            env.push((an.clone(), bn.clone()));
            let result = equal_in(ab, bb, env);
            env.pop();
            result
        }
        _ => false,
    }
}
