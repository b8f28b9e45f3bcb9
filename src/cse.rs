//! Common-subexpression elimination and let elimination.
//!
//! CSE lifts repeated subtrees into `Let` bindings; `substitute_in_all_lets`
//! inlines every binding. The prover runs the two back to back, so the only
//! contract it leans on is that the final expression is let-free and
//! semantically unchanged.

use std::collections::BTreeSet;

use crate::data::expr::{for_each_child, map_children, Expr, ExprKind};
use crate::expr_eq::equal;
use crate::substitute::{substitute, substitute_expr};
use crate::util::fresh_name::unique_name;

/// Inline every `Let` binding, innermost last, producing a let-free
/// expression.
pub fn substitute_in_all_lets(e: &Expr) -> Expr {
    match e.kind() {
        ExprKind::Let { name, value, body } => {
            let value = substitute_in_all_lets(value);
            let body = substitute_in_all_lets(body);
            substitute(name, &value, &body)
        }
        _ => map_children(e, |child| substitute_in_all_lets(child)),
    }
}

fn contains_let(e: &Expr) -> bool {
    if matches!(e.kind(), ExprKind::Let { .. }) {
        return true;
    }
    let mut found = false;
    for_each_child(e, |child| {
        found = found || contains_let(child);
    });
    found
}

fn collect_bound_names(e: &Expr, names: &mut BTreeSet<String>) {
    if let ExprKind::Let { name, .. } = e.kind() {
        names.insert(name.clone());
    }
    for_each_child(e, |child| collect_bound_names(child, names));
}

fn uses_any(e: &Expr, names: &BTreeSet<String>) -> bool {
    if let ExprKind::Var(name) = e.kind() {
        if names.contains(name) {
            return true;
        }
    }
    let mut used = false;
    for_each_child(e, |child| {
        used = used || uses_any(child, names);
    });
    used
}

// Count subtrees equal to `needle`, without descending into a match (the
// replacement pass will not descend either).
fn count_occurrences(e: &Expr, needle: &Expr) -> usize {
    if equal(e, needle) {
        return 1;
    }
    let mut count = 0;
    for_each_child(e, |child| {
        count += count_occurrences(child, needle);
    });
    count
}

fn collect_candidates(e: &Expr, bound: &BTreeSet<String>, seen: &mut Vec<(Expr, usize)>) {
    for_each_child(e, |child| collect_candidates(child, bound, seen));
    if e.size() < 2 || contains_let(e) || uses_any(e, bound) {
        return;
    }
    for (candidate, count) in seen.iter_mut() {
        if equal(candidate, e) {
            *count += 1;
            return;
        }
    }
    seen.push((e.clone(), 1));
}

/// Bind repeated subtrees to fresh `Let` variables, largest first. Subtrees
/// that mention let-bound names are left alone so extraction can never move
/// a use out of its binder's scope.
pub fn common_subexpression_elimination(e: &Expr) -> Expr {
    let mut bound = BTreeSet::new();
    collect_bound_names(e, &mut bound);

    let mut seen = Vec::new();
    collect_candidates(e, &bound, &mut seen);

    let mut candidates: Vec<Expr> = seen
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(candidate, _)| candidate)
        .collect();
    candidates.sort_by_key(|candidate| std::cmp::Reverse(candidate.size()));

    let mut body = e.clone();
    let mut bindings: Vec<(String, Expr)> = Vec::new();
    for candidate in candidates {
        if count_occurrences(&body, &candidate) < 2 {
            continue;
        }
        let name = unique_name("t");
        let fresh = Expr::var(candidate.ty(), name.as_str());
        body = substitute_expr(&candidate, &fresh, &body);
        for (_, value) in bindings.iter_mut() {
            *value = substitute_expr(&candidate, &fresh, value);
        }
        bindings.push((name, candidate));
    }

    // A binding extracted later (smaller) may appear inside the value of one
    // extracted earlier, so later bindings must enclose earlier ones.
    for (name, value) in bindings {
        body = Expr::let_(name, value, body);
    }
    body
}
