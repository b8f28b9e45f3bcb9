//! Substitution over expressions: by variable name (binding-aware) and by
//! whole subtree (simultaneous across a list of replacement pairs).

use im_rc::OrdMap;

use crate::data::expr::{map_children, Expr, ExprKind};
use crate::expr_eq::equal;

/// Replace free occurrences of the variable `name` with `value`. Occurrences
/// shadowed by a `Let` binding of the same name are left alone.
pub fn substitute(name: &str, value: &Expr, e: &Expr) -> Expr {
    let map = OrdMap::unit(name.to_owned(), value.clone());
    substitute_map(&map, e)
}

/// Simultaneously replace free occurrences of every variable in `map`.
pub fn substitute_map(map: &OrdMap<String, Expr>, e: &Expr) -> Expr {
    if map.is_empty() {
        return e.clone();
    }
    match e.kind() {
        ExprKind::Var(name) => match map.get(name) {
            Some(value) => value.clone(),
            None => e.clone(),
        },
        ExprKind::Let { name, value, body } => {
            let new_value = substitute_map(map, value);
            let new_body = if map.contains_key(name) {
                let inner = map.without(name);
                substitute_map(&inner, body)
            } else {
                substitute_map(map, body)
            };
            Expr::let_(name.clone(), new_value, new_body)
        }
        _ => map_children(e, |child| substitute_map(map, child)),
    }
}

/// Replace every subtree structurally equal to `find` with `replacement`.
pub fn substitute_expr(find: &Expr, replacement: &Expr, e: &Expr) -> Expr {
    let pairs = [(find.clone(), replacement.clone())];
    substitute_exprs(&pairs, e)
}

/// Simultaneously replace subtrees: at each node the pairs are consulted in
/// order, and a replaced subtree is never re-entered. This makes the
/// substitution safe when one pair's needle occurs inside another's (the
/// argmin patterns, where one `y` binding is a subexpression of another).
pub fn substitute_exprs(pairs: &[(Expr, Expr)], e: &Expr) -> Expr {
    if pairs.is_empty() {
        return e.clone();
    }
    for (find, replacement) in pairs {
        if equal(find, e) {
            return replacement.clone();
        }
    }
    map_children(e, |child| substitute_exprs(pairs, child))
}
