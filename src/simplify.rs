//! Expression simplification: constant folding, algebraic identities, and
//! operand-order canonicalisation (literals migrate to the right of
//! commutative operators; `>` and `>=` are rewritten to `<` and `<=`).
//!
//! The prover depends on the canonical forms, not on aggressive rewriting:
//! the goal is that equal updates reach equal shapes, not that every
//! expression reaches a minimal one.

use crate::data::expr::{make_zero, map_children, Expr, ExprKind, Type};
use crate::expr_eq::equal;

pub fn simplify(e: &Expr) -> Expr {
    let simplified = map_children(e, |child| simplify(child));
    match rewrite(&simplified) {
        Some(better) => simplify(&better),
        None => simplified,
    }
}

#[derive(Clone, Copy, Debug)]
enum Lit {
    I(i64),
    U(u64),
    F(f64),
}

fn as_lit(e: &Expr) -> Option<Lit> {
    match e.kind() {
        ExprKind::IntLit(v) => Some(Lit::I(*v)),
        ExprKind::UIntLit(v) => Some(Lit::U(*v)),
        ExprKind::FloatLit(v) => Some(Lit::F(*v)),
        _ => None,
    }
}

// Two's-complement truncation into the width of `ty`.
fn norm_int(ty: Type, value: i128) -> i64 {
    let bits = ty.bits() as u32;
    if bits >= 64 {
        return value as i64;
    }
    let modulus = 1i128 << bits;
    let r = value.rem_euclid(modulus);
    if r >= modulus / 2 {
        (r - modulus) as i64
    } else {
        r as i64
    }
}

fn norm_uint(ty: Type, value: u128) -> u64 {
    let bits = ty.bits() as u32;
    if bits >= 64 {
        value as u64
    } else {
        (value & ((1u128 << bits) - 1)) as u64
    }
}

fn norm_float(ty: Type, value: f64) -> f64 {
    if ty.bits() == 32 {
        value as f32 as f64
    } else {
        value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

fn fold_arith(op: ArithOp, ty: Type, a: &Expr, b: &Expr) -> Option<Expr> {
    let (la, lb) = (as_lit(a)?, as_lit(b)?);
    match (la, lb) {
        (Lit::I(x), Lit::I(y)) => {
            let (x, y) = (x as i128, y as i128);
            let value = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div if y != 0 => x / y,
                ArithOp::Mod if y != 0 => x % y,
                ArithOp::Div | ArithOp::Mod => return None,
                ArithOp::Min => x.min(y),
                ArithOp::Max => x.max(y),
            };
            Some(Expr::int_lit(ty, norm_int(ty, value)))
        }
        (Lit::U(x), Lit::U(y)) => {
            let (x, y) = (x as u128, y as u128);
            let value = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x.wrapping_sub(y),
                ArithOp::Mul => x * y,
                ArithOp::Div if y != 0 => x / y,
                ArithOp::Mod if y != 0 => x % y,
                ArithOp::Div | ArithOp::Mod => return None,
                ArithOp::Min => x.min(y),
                ArithOp::Max => x.max(y),
            };
            Some(Expr::uint_lit(ty, norm_uint(ty, value)))
        }
        (Lit::F(x), Lit::F(y)) => {
            let value = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div => x / y,
                ArithOp::Mod => x % y,
                ArithOp::Min => x.min(y),
                ArithOp::Max => x.max(y),
            };
            Some(Expr::float_lit(ty, norm_float(ty, value)))
        }
        _ => None,
    }
}

#[derive(Clone, Copy, Debug)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
}

fn fold_cmp(op: CmpOp, a: &Expr, b: &Expr) -> Option<Expr> {
    let ordering = match (as_lit(a)?, as_lit(b)?) {
        (Lit::I(x), Lit::I(y)) => x.partial_cmp(&y),
        (Lit::U(x), Lit::U(y)) => x.partial_cmp(&y),
        (Lit::F(x), Lit::F(y)) => x.partial_cmp(&y),
        _ => return None,
    };
    let result = match (op, ordering) {
        (CmpOp::Eq, Some(ord)) => ord.is_eq(),
        (CmpOp::Ne, Some(ord)) => ord.is_ne(),
        (CmpOp::Lt, Some(ord)) => ord.is_lt(),
        (CmpOp::Le, Some(ord)) => ord.is_le(),
        // Incomparable floats (NaN): every comparison is false except !=.
        (CmpOp::Ne, None) => true,
        (_, None) => false,
    };
    Some(Expr::bool_lit(result))
}

fn is_zero(e: &Expr) -> bool {
    matches!(e.kind(), ExprKind::IntLit(0) | ExprKind::UIntLit(0))
}

fn is_one(e: &Expr) -> bool {
    matches!(e.kind(), ExprKind::IntLit(1) | ExprKind::UIntLit(1))
}

fn as_bool(e: &Expr) -> Option<bool> {
    if !e.ty().is_bool() {
        return None;
    }
    match e.kind() {
        ExprKind::UIntLit(v) => Some(*v != 0),
        _ => None,
    }
}

// Literal operands of commutative operators move to the right.
fn swap_lit_left(
    a: &Expr,
    b: &Expr,
    make: impl FnOnce(Expr, Expr) -> Expr,
) -> Option<Expr> {
    if a.is_literal() && !b.is_literal() {
        Some(make(b.clone(), a.clone()))
    } else {
        None
    }
}

// (e op c1) op c2 folds the constants together when op is associative and
// both literals are already on the right.
fn fold_lit_chain(
    op: ArithOp,
    ty: Type,
    a: &Expr,
    b: &Expr,
    make: impl FnOnce(Expr, Expr) -> Expr,
) -> Option<Expr> {
    if !b.is_literal() {
        return None;
    }
    let (inner_a, inner_b) = match (op, a.kind()) {
        (ArithOp::Add, ExprKind::Add(x, y))
        | (ArithOp::Mul, ExprKind::Mul(x, y))
        | (ArithOp::Min, ExprKind::Min(x, y))
        | (ArithOp::Max, ExprKind::Max(x, y)) => (x, y),
        _ => return None,
    };
    let folded = fold_arith(op, ty, inner_b, b)?;
    Some(make(inner_a.clone(), folded))
}

fn rewrite(e: &Expr) -> Option<Expr> {
    let ty = e.ty();
    match e.kind() {
        ExprKind::Add(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Add, ty, a, b) {
                return Some(v);
            }
            if is_zero(b) {
                return Some(a.clone());
            }
            if is_zero(a) {
                return Some(b.clone());
            }
            // a + (0 - b) is a - b
            if let ExprKind::Sub(z, neg) = b.kind() {
                if is_zero(z) {
                    return Some(Expr::sub(a.clone(), neg.clone()));
                }
            }
            if let ExprKind::Sub(z, neg) = a.kind() {
                if is_zero(z) {
                    return Some(Expr::sub(b.clone(), neg.clone()));
                }
            }
            swap_lit_left(a, b, Expr::add)
                .or_else(|| fold_lit_chain(ArithOp::Add, ty, a, b, Expr::add))
        }
        ExprKind::Sub(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Sub, ty, a, b) {
                return Some(v);
            }
            if is_zero(b) {
                return Some(a.clone());
            }
            if !ty.is_float() && equal(a, b) {
                return Some(make_zero(ty));
            }
            None
        }
        ExprKind::Mul(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Mul, ty, a, b) {
                return Some(v);
            }
            if is_one(b) {
                return Some(a.clone());
            }
            if is_one(a) {
                return Some(b.clone());
            }
            if !ty.is_float() && (is_zero(a) || is_zero(b)) {
                return Some(make_zero(ty));
            }
            swap_lit_left(a, b, Expr::mul)
                .or_else(|| fold_lit_chain(ArithOp::Mul, ty, a, b, Expr::mul))
        }
        ExprKind::Div(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Div, ty, a, b) {
                return Some(v);
            }
            if is_one(b) {
                return Some(a.clone());
            }
            None
        }
        ExprKind::Mod(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Mod, ty, a, b) {
                return Some(v);
            }
            if is_one(b) {
                return Some(make_zero(ty));
            }
            None
        }
        ExprKind::Min(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Min, ty, a, b) {
                return Some(v);
            }
            if equal(a, b) {
                return Some(a.clone());
            }
            // min(max(p, q), b) is b when b is one of p, q.
            if !ty.is_float() {
                if let ExprKind::Max(p, q) = a.kind() {
                    if equal(p, b) || equal(q, b) {
                        return Some(b.clone());
                    }
                }
                if let ExprKind::Max(p, q) = b.kind() {
                    if equal(p, a) || equal(q, a) {
                        return Some(a.clone());
                    }
                }
            }
            // The type extremes are absorbing and neutral only where they
            // really are the extremes; float types still have infinities
            // beyond t.max().
            if !ty.is_float() && (equal(b, &ty.max()) || equal(a, &ty.max())) {
                return Some(if equal(b, &ty.max()) {
                    a.clone()
                } else {
                    b.clone()
                });
            }
            if !ty.is_float() && (equal(b, &ty.min()) || equal(a, &ty.min())) {
                return Some(ty.min());
            }
            swap_lit_left(a, b, Expr::min)
                .or_else(|| fold_lit_chain(ArithOp::Min, ty, a, b, Expr::min))
        }
        ExprKind::Max(a, b) => {
            if let Some(v) = fold_arith(ArithOp::Max, ty, a, b) {
                return Some(v);
            }
            if equal(a, b) {
                return Some(a.clone());
            }
            // max(min(p, q), b) is b when b is one of p, q.
            if !ty.is_float() {
                if let ExprKind::Min(p, q) = a.kind() {
                    if equal(p, b) || equal(q, b) {
                        return Some(b.clone());
                    }
                }
                if let ExprKind::Min(p, q) = b.kind() {
                    if equal(p, a) || equal(q, a) {
                        return Some(a.clone());
                    }
                }
            }
            if !ty.is_float() && (equal(b, &ty.min()) || equal(a, &ty.min())) {
                return Some(if equal(b, &ty.min()) {
                    a.clone()
                } else {
                    b.clone()
                });
            }
            if !ty.is_float() && (equal(b, &ty.max()) || equal(a, &ty.max())) {
                return Some(ty.max());
            }
            swap_lit_left(a, b, Expr::max)
                .or_else(|| fold_lit_chain(ArithOp::Max, ty, a, b, Expr::max))
        }
        ExprKind::Eq(a, b) => {
            if let Some(v) = fold_cmp(CmpOp::Eq, a, b) {
                return Some(v);
            }
            if !a.ty().is_float() && equal(a, b) {
                return Some(Expr::bool_lit(true));
            }
            None
        }
        ExprKind::Ne(a, b) => {
            if let Some(v) = fold_cmp(CmpOp::Ne, a, b) {
                return Some(v);
            }
            if !a.ty().is_float() && equal(a, b) {
                return Some(Expr::bool_lit(false));
            }
            None
        }
        ExprKind::Lt(a, b) => {
            if let Some(v) = fold_cmp(CmpOp::Lt, a, b) {
                return Some(v);
            }
            if !a.ty().is_float() && equal(a, b) {
                return Some(Expr::bool_lit(false));
            }
            None
        }
        ExprKind::Le(a, b) => {
            if let Some(v) = fold_cmp(CmpOp::Le, a, b) {
                return Some(v);
            }
            if !a.ty().is_float() && equal(a, b) {
                return Some(Expr::bool_lit(true));
            }
            None
        }
        ExprKind::Gt(a, b) => Some(Expr::lt(b.clone(), a.clone())),
        ExprKind::Ge(a, b) => Some(Expr::le(b.clone(), a.clone())),
        ExprKind::And(a, b) => match (as_bool(a), as_bool(b)) {
            (Some(false), _) | (_, Some(false)) => Some(Expr::bool_lit(false)),
            (Some(true), _) => Some(b.clone()),
            (_, Some(true)) => Some(a.clone()),
            _ => None,
        },
        ExprKind::Or(a, b) => match (as_bool(a), as_bool(b)) {
            (Some(true), _) | (_, Some(true)) => Some(Expr::bool_lit(true)),
            (Some(false), _) => Some(b.clone()),
            (_, Some(false)) => Some(a.clone()),
            _ => None,
        },
        ExprKind::Not(a) => match a.kind() {
            ExprKind::UIntLit(v) => Some(Expr::bool_lit(*v == 0)),
            ExprKind::Not(inner) => Some(inner.clone()),
            _ => None,
        },
        ExprKind::Select {
            cond,
            true_value,
            false_value,
        } => {
            if let Some(c) = as_bool(cond) {
                return Some(if c {
                    true_value.clone()
                } else {
                    false_value.clone()
                });
            }
            if equal(true_value, false_value) {
                return Some(true_value.clone());
            }
            None
        }
        ExprKind::Cast(value) => {
            if value.ty() == ty {
                return Some(value.clone());
            }
            let lit = as_lit(value)?;
            match ty {
                Type::Int(_) => {
                    let wide = match lit {
                        Lit::I(v) => v as i128,
                        Lit::U(v) => v as i128,
                        Lit::F(v) => v as i128,
                    };
                    Some(Expr::int_lit(ty, norm_int(ty, wide)))
                }
                Type::UInt(_) => {
                    let wide = match lit {
                        Lit::I(v) => v as u128,
                        Lit::U(v) => v as u128,
                        Lit::F(v) => v as u128,
                    };
                    Some(Expr::uint_lit(ty, norm_uint(ty, wide)))
                }
                Type::Float(_) => {
                    let value = match lit {
                        Lit::I(v) => v as f64,
                        Lit::U(v) => v as f64,
                        Lit::F(v) => v,
                    };
                    Some(Expr::float_lit(ty, norm_float(ty, value)))
                }
                Type::Str => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::expr::{make_const, make_one, CallKind};

    const T: Type = Type::Int(32);

    fn var(name: &str) -> Expr {
        Expr::var(T, name)
    }

    #[test]
    fn folds_constants() {
        assert!(equal(
            &simplify(&(make_const(T, 2) + make_const(T, 3))),
            &make_const(T, 5)
        ));
        assert!(equal(
            &simplify(&Expr::min(make_const(T, 2), make_const(T, 3))),
            &make_const(T, 2)
        ));
        assert!(equal(
            &simplify(&Expr::lt(make_const(T, 2), make_const(T, 3))),
            &Expr::bool_lit(true)
        ));
        // i32 arithmetic wraps
        let big = make_const(T, i32::MAX as i64);
        assert!(equal(
            &simplify(&(big + make_one(T))),
            &make_const(T, i32::MIN as i64)
        ));
    }

    #[test]
    fn division_by_zero_is_left_alone() {
        let e = Expr::div(make_const(T, 1), make_const(T, 0));
        assert!(equal(&simplify(&e), &e));
    }

    #[test]
    fn arithmetic_identities() {
        assert!(equal(&simplify(&(var("a") + make_zero(T))), &var("a")));
        assert!(equal(&simplify(&(var("a") * make_one(T))), &var("a")));
        assert!(equal(&simplify(&(var("a") - var("a"))), &make_zero(T)));
        assert!(equal(
            &simplify(&(var("a") + (make_zero(T) - var("b")))),
            &(var("a") - var("b"))
        ));
    }

    #[test]
    fn lattice_identities() {
        assert!(equal(&simplify(&Expr::min(var("a"), T.max())), &var("a")));
        assert!(equal(&simplify(&Expr::max(var("a"), T.min())), &var("a")));
        assert!(equal(&simplify(&Expr::max(var("a"), var("a"))), &var("a")));
        assert!(equal(
            &simplify(&Expr::and(var_bool("p"), Expr::bool_lit(true))),
            &var_bool("p")
        ));
        assert!(equal(
            &simplify(&Expr::or(var_bool("p"), Expr::bool_lit(true))),
            &Expr::bool_lit(true)
        ));
    }

    fn var_bool(name: &str) -> Expr {
        Expr::var(crate::data::expr::BOOL, name)
    }

    #[test]
    fn min_max_absorption() {
        let clamp = Expr::min(var("a"), var("b"));
        assert!(equal(
            &simplify(&Expr::max(clamp.clone(), var("a"))),
            &var("a")
        ));
        assert!(equal(&simplify(&Expr::max(var("b"), clamp)), &var("b")));

        let cover = Expr::max(var("a"), var("b"));
        assert!(equal(
            &simplify(&Expr::min(cover.clone(), var("b"))),
            &var("b")
        ));
        assert!(equal(&simplify(&Expr::min(var("a"), cover)), &var("a")));
    }

    #[test]
    fn literals_move_right() {
        assert!(equal(
            &simplify(&(make_const(T, 4) + var("a"))),
            &(var("a") + make_const(T, 4))
        ));
        let g = Expr::call(T, "g", vec![var("rx")], 0, CallKind::Internal);
        assert!(equal(
            &simplify(&Expr::min(make_const(T, 4), g.clone())),
            &Expr::min(g, make_const(T, 4))
        ));
    }

    #[test]
    fn literal_chains_fold() {
        let e = (var("a") + make_const(T, 2)) + make_const(T, 3);
        assert!(equal(&simplify(&e), &(var("a") + make_const(T, 5))));
    }

    #[test]
    fn comparisons_canonicalise() {
        assert!(equal(
            &simplify(&Expr::gt(var("a"), var("b"))),
            &Expr::lt(var("b"), var("a"))
        ));
        assert!(equal(
            &simplify(&Expr::ge(var("a"), var("b"))),
            &Expr::le(var("b"), var("a"))
        ));
    }

    #[test]
    fn select_folds() {
        let picked = simplify(&Expr::select(Expr::bool_lit(true), var("a"), var("b")));
        assert!(equal(&picked, &var("a")));
        let same = simplify(&Expr::select(
            Expr::lt(var("a"), var("b")),
            var("c"),
            var("c"),
        ));
        assert!(equal(&same, &var("c")));
    }

    #[test]
    fn casts_fold_on_literals_only() {
        assert!(equal(
            &simplify(&Expr::cast(Type::Int(16), make_const(T, 70000))),
            &make_const(Type::Int(16), 4464)
        ));
        // A value-narrowing cast of a variable stays put.
        let e = Expr::cast(T, Expr::cast(Type::Int(16), var("z")));
        assert!(equal(&simplify(&e), &e));
    }
}
