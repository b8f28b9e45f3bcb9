//! A single-variable solver: rewrite an expression so the target variable
//! appears as the left operand of the outermost operator where possible.
//!
//! The solver handles the fragment the associativity prover needs: commuting
//! and reassociating `Add`/`Mul`/`Min`/`Max`/`And`/`Or`, pushing through the
//! left side of `Sub`, and combining `min`/`max` over `Add` when the target
//! occurs on both sides (`max(x + a, x + b)` becomes `x + max(a, b)`). The
//! variable is never moved out of `Select`, `Cast`, comparisons, `Div`,
//! `Mod`, or the right side of `Sub`; such expressions are reported as
//! failures and returned unchanged.

use crate::data::expr::{make_zero, Expr, ExprKind};
use crate::expr_match::expr_uses_var;
use crate::simplify::simplify;

pub struct SolveResult {
    pub expr: Expr,
    pub solved: bool,
}

pub fn solve_expression(e: &Expr, var: &str) -> SolveResult {
    match solve(e, var) {
        Some(expr) => SolveResult { expr, solved: true },
        None => SolveResult {
            expr: e.clone(),
            solved: false,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommutativeOp {
    Add,
    Mul,
    Min,
    Max,
    And,
    Or,
}

impl CommutativeOp {
    fn of(e: &Expr) -> Option<(CommutativeOp, &Expr, &Expr)> {
        match e.kind() {
            ExprKind::Add(a, b) => Some((CommutativeOp::Add, a, b)),
            ExprKind::Mul(a, b) => Some((CommutativeOp::Mul, a, b)),
            ExprKind::Min(a, b) => Some((CommutativeOp::Min, a, b)),
            ExprKind::Max(a, b) => Some((CommutativeOp::Max, a, b)),
            ExprKind::And(a, b) => Some((CommutativeOp::And, a, b)),
            ExprKind::Or(a, b) => Some((CommutativeOp::Or, a, b)),
            _ => None,
        }
    }

    fn make(self, a: Expr, b: Expr) -> Expr {
        match self {
            CommutativeOp::Add => Expr::add(a, b),
            CommutativeOp::Mul => Expr::mul(a, b),
            CommutativeOp::Min => Expr::min(a, b),
            CommutativeOp::Max => Expr::max(a, b),
            CommutativeOp::And => Expr::and(a, b),
            CommutativeOp::Or => Expr::or(a, b),
        }
    }
}

fn solve(e: &Expr, var: &str) -> Option<Expr> {
    if !expr_uses_var(e, var) {
        return None;
    }
    match e.kind() {
        ExprKind::Var(name) if name == var => Some(e.clone()),
        ExprKind::Sub(a, b) => {
            if expr_uses_var(b, var) {
                return None;
            }
            let a = solve(a, var)?;
            match a.kind() {
                // (x + r) - b becomes x + (r - b)
                ExprKind::Add(x, r) if is_var(x, var) => {
                    Some(Expr::add(x.clone(), Expr::sub(r.clone(), b.clone())))
                }
                _ => Some(Expr::sub(a, b.clone())),
            }
        }
        _ => {
            let (op, a, b) = CommutativeOp::of(e)?;
            let in_a = expr_uses_var(a, var);
            let in_b = expr_uses_var(b, var);
            match (in_a, in_b) {
                (true, false) => Some(reassociate(op, solve(a, var)?, b.clone(), var)),
                (false, true) => Some(reassociate(op, solve(b, var)?, a.clone(), var)),
                (true, true) => combine_over_add(op, a, b, var),
                (false, false) => unreachable!("expr_uses_var said the variable is present"),
            }
        }
    }
}

fn is_var(e: &Expr, var: &str) -> bool {
    matches!(e.kind(), ExprKind::Var(name) if name == var)
}

// `solved` has the target leftmost. If its own operator is the same as the
// enclosing one, flatten so the target ends up at the outermost left:
// op(op(x, r), rest) becomes op(x, op(r, rest)).
fn reassociate(op: CommutativeOp, solved: Expr, rest: Expr, var: &str) -> Expr {
    if let Some((inner_op, x, r)) = CommutativeOp::of(&solved) {
        if inner_op == op && is_var(x, var) {
            let (x, r) = (x.clone(), r.clone());
            return op.make(x, op.make(r, rest));
        }
    }
    op.make(solved, rest)
}

// min/max distribute over a shared additive term: max(x + a, x + b) becomes
// x + max(a, b). The degenerate bare-x side contributes a zero.
fn combine_over_add(op: CommutativeOp, a: &Expr, b: &Expr, var: &str) -> Option<Expr> {
    if op != CommutativeOp::Min && op != CommutativeOp::Max {
        return None;
    }
    let ra = additive_rest(&solve(a, var)?, var)?;
    let rb = additive_rest(&solve(b, var)?, var)?;
    let ty = a.ty();
    let x = Expr::var(ty, var);
    Some(Expr::add(
        x,
        op.make(
            ra.unwrap_or_else(|| make_zero(ty)),
            rb.unwrap_or_else(|| make_zero(ty)),
        ),
    ))
}

// Decompose a solved operand as x, x + r, or x - r, yielding the additive
// remainder (negated for the subtraction form).
fn additive_rest(solved: &Expr, var: &str) -> Option<Option<Expr>> {
    match solved.kind() {
        ExprKind::Var(name) if name == var => Some(None),
        ExprKind::Add(x, r) if is_var(x, var) && !expr_uses_var(r, var) => Some(Some(r.clone())),
        ExprKind::Sub(x, r) if is_var(x, var) && !expr_uses_var(r, var) => {
            Some(Some(simplify(&Expr::sub(make_zero(solved.ty()), r.clone()))))
        }
        _ => None,
    }
}
