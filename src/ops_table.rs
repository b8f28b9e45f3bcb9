//! Static tables of known-associative operator patterns, keyed by element
//! type, tuple arity, and the root constructor of the first element.
//!
//! Every entry is a genuinely associative binary operator on its argument
//! types: the `x` wildcards stand for the accumulator tuple, the `y`
//! wildcards for the incoming element. Entries are tried in authoring order;
//! more constrained patterns come first.

use once_cell::sync::Lazy;

use crate::associativity::AssociativePattern;
use crate::data::expr::{make_const, Expr, ExprKind, Type};

const I32: Type = Type::Int(32);

fn x(i: usize) -> Expr {
    Expr::var(I32, format!("x{}", i))
}

fn y(i: usize) -> Expr {
    Expr::var(I32, format!("y{}", i))
}

fn int(value: i64) -> Expr {
    make_const(I32, value)
}

static SINGLE_ADD: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        AssociativePattern::single(x(0) + y(0), int(0), true),
        // (1 + x) * (1 + y) - 1, associative over wrapping arithmetic.
        AssociativePattern::single(x(0) + y(0) + x(0) * y(0), int(0), true),
    ]
});

static SINGLE_MUL: Lazy<Vec<AssociativePattern>> =
    Lazy::new(|| vec![AssociativePattern::single(x(0) * y(0), int(1), true)]);

static SINGLE_MIN: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        AssociativePattern::single(Expr::min(x(0), y(0)), I32.max(), true),
        AssociativePattern::single(Expr::min(Expr::min(x(0), y(0)), y(1)), I32.max(), true),
    ]
});

static SINGLE_MAX: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        AssociativePattern::single(Expr::max(x(0), y(0)), I32.min(), true),
        AssociativePattern::single(Expr::max(Expr::max(x(0), y(0)), y(1)), I32.min(), true),
    ]
});

static DOUBLE_SUB: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        // Complex multiplication.
        AssociativePattern::new(
            vec![x(0) * y(0) - x(1) * y(1), x(1) * y(0) + x(0) * y(1)],
            vec![int(1), int(0)],
            true,
        ),
    ]
});

static DOUBLE_MUL: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        // Composition of affine maps t -> y0 * t + y1.
        AssociativePattern::new(
            vec![x(0) * y(0), x(1) * y(0) + y(1)],
            vec![int(1), int(0)],
            false,
        ),
    ]
});

static DOUBLE_MIN: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        // Argmin, keeping the incumbent on ties.
        AssociativePattern::new(
            vec![
                Expr::min(x(0), y(0)),
                Expr::select(Expr::lt(x(0), y(0)), x(1), y(1)),
            ],
            vec![I32.max(), int(0)],
            true,
        ),
        // Argmin, yielding to the newcomer on ties.
        AssociativePattern::new(
            vec![
                Expr::min(x(0), y(0)),
                Expr::select(Expr::le(x(0), y(0)), x(1), y(1)),
            ],
            vec![I32.max(), int(0)],
            false,
        ),
    ]
});

static DOUBLE_MAX: Lazy<Vec<AssociativePattern>> = Lazy::new(|| {
    vec![
        AssociativePattern::new(
            vec![
                Expr::max(x(0), y(0)),
                Expr::select(Expr::lt(y(0), x(0)), x(1), y(1)),
            ],
            vec![I32.min(), int(0)],
            true,
        ),
        AssociativePattern::new(
            vec![
                Expr::max(x(0), y(0)),
                Expr::select(Expr::le(y(0), x(0)), x(1), y(1)),
            ],
            vec![I32.min(), int(0)],
            false,
        ),
    ]
});

/// The ordered pattern table for a tuple of canonicalised expressions, keyed
/// by arity and the root constructor of the first element. Unsupported
/// combinations get an empty table, which simply fails to match.
pub fn get_ops_table(exprs: &[Expr]) -> &'static [AssociativePattern] {
    if exprs.is_empty() || !exprs.iter().all(|e| e.ty() == I32) {
        return &[];
    }
    match (exprs.len(), exprs[0].kind()) {
        (1, ExprKind::Add(..)) => SINGLE_ADD.as_slice(),
        (1, ExprKind::Mul(..)) => SINGLE_MUL.as_slice(),
        (1, ExprKind::Min(..)) => SINGLE_MIN.as_slice(),
        (1, ExprKind::Max(..)) => SINGLE_MAX.as_slice(),
        (2, ExprKind::Sub(..)) => DOUBLE_SUB.as_slice(),
        (2, ExprKind::Mul(..)) => DOUBLE_MUL.as_slice(),
        (2, ExprKind::Min(..)) => DOUBLE_MIN.as_slice(),
        (2, ExprKind::Max(..)) => DOUBLE_MAX.as_slice(),
        _ => &[],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::expr::for_each_child;
    use crate::expr_eq::equal;
    use crate::expr_match::is_wildcard;
    use crate::simplify::simplify;
    use crate::substitute::substitute_map;
    use im_rc::OrdMap;

    fn all_tables() -> Vec<&'static [AssociativePattern]> {
        vec![
            SINGLE_ADD.as_slice(),
            SINGLE_MUL.as_slice(),
            SINGLE_MIN.as_slice(),
            SINGLE_MAX.as_slice(),
            DOUBLE_SUB.as_slice(),
            DOUBLE_MUL.as_slice(),
            DOUBLE_MIN.as_slice(),
            DOUBLE_MAX.as_slice(),
        ]
    }

    fn free_vars(e: &Expr, out: &mut Vec<String>) {
        if let ExprKind::Var(name) = e.kind() {
            out.push(name.clone());
        }
        for_each_child(e, |child| free_vars(child, out));
    }

    #[test]
    fn entries_are_well_formed() {
        for table in all_tables() {
            for pattern in table {
                assert_eq!(pattern.ops.len(), pattern.identities.len());
                for op in &pattern.ops {
                    let mut vars = Vec::new();
                    free_vars(op, &mut vars);
                    assert!(!vars.is_empty());
                    for var in vars {
                        assert!(is_wildcard(&var), "non-wildcard {} in a table entry", var);
                    }
                }
                for identity in &pattern.identities {
                    assert!(identity.is_literal());
                    assert_eq!(identity.ty(), I32);
                }
            }
        }
    }

    #[test]
    fn single_element_entries_satisfy_the_identity_law() {
        for table in [
            SINGLE_ADD.as_slice(),
            SINGLE_MUL.as_slice(),
            SINGLE_MIN.as_slice(),
            SINGLE_MAX.as_slice(),
        ] {
            for pattern in table {
                let op = &pattern.ops[0];
                let identity = &pattern.identities[0];

                let mut ys: OrdMap<String, Expr> = OrdMap::new();
                for i in 0..4 {
                    ys.insert(format!("y{}", i), identity.clone());
                }
                let folded = simplify(&substitute_map(&ys, op));
                assert!(
                    equal(&folded, &x(0)),
                    "op {} with identity {} does not fold back to the accumulator (got {})",
                    op,
                    identity,
                    folded
                );
            }
        }
    }

    #[test]
    fn dispatch_is_keyed_on_arity_and_root() {
        let acc = Expr::var(I32, "_x_0");
        let value = Expr::var(I32, "v");

        let single_min = [Expr::min(acc.clone(), value.clone())];
        assert_eq!(get_ops_table(&single_min).len(), SINGLE_MIN.len());

        let double = [
            Expr::min(acc.clone(), value.clone()),
            Expr::select(
                Expr::lt(acc.clone(), value.clone()),
                Expr::var(I32, "_x_1"),
                Expr::var(I32, "r"),
            ),
        ];
        assert_eq!(get_ops_table(&double).len(), DOUBLE_MIN.len());

        // A bare variable has no table, and non-i32 elements have no table.
        assert!(get_ops_table(&[acc.clone()]).is_empty());
        let wide = [Expr::min(
            Expr::var(Type::Int(64), "a"),
            Expr::var(Type::Int(64), "b"),
        )];
        assert!(get_ops_table(&wide).is_empty());
    }
}
