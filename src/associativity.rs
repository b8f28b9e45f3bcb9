//! Proving that a reduction update definition is a sequence of applications
//! of an associative operator with a known identity.
//!
//! Given `f(args) = exprs` (a tuple of update expressions that may reference
//! `f(args)` itself), the prover rewrites the self-references into
//! accumulator variables, canonicalises each element, and then either
//! recognises a built-in associative operator per element or matches the
//! whole tuple against a table of known-associative patterns. A successful
//! proof yields, per element, the canonical operator `op(x, y)`, its
//! identity, and the replacements for the `x` (accumulator) and `y`
//! (incoming value) wildcards, which the scheduler uses to reorder and
//! parallelise the reduction. Failure to prove is not an error; the caller
//! falls back to serial scheduling.

use std::collections::BTreeSet;

use id_collections::IdVec;
use im_rc::{OrdMap, OrdSet};
use tracing::trace;

use crate::cse::{common_subexpression_elimination, substitute_in_all_lets};
use crate::data::expr::{make_const, make_zero, map_children, CallKind, Expr, ExprKind, Type};
use crate::expr_eq::{equal, equal_opt};
use crate::expr_match::{expr_match, expr_uses_var, expr_uses_vars};
use crate::graph::{minimal_subgraphs, reachable_sets, Graph, NodeId};
use crate::ops_table::get_ops_table;
use crate::simplify::simplify;
use crate::solve::solve_expression;
use crate::substitute::substitute_exprs;
use crate::util::fresh_name::unique_name;

/// A wildcard's concrete binding: the variable standing for it in the
/// canonical operator, and the subexpression it replaces. An empty `var`
/// with no expression encodes "no self-reference at this tuple index".
#[derive(Clone, Debug, Default)]
pub struct Replacement {
    pub var: String,
    pub expr: Option<Expr>,
}

impl Replacement {
    pub fn new(var: impl Into<String>, expr: Expr) -> Replacement {
        Replacement {
            var: var.into(),
            expr: Some(expr),
        }
    }

    pub fn none() -> Replacement {
        Replacement::default()
    }
}

fn replacement_eq(a: &Replacement, b: &Replacement) -> bool {
    a.var == b.var && equal_opt(&a.expr, &b.expr)
}

/// An associative operator template over wildcards `x0..`/`y0..`, one
/// operator and one identity per tuple element.
#[derive(Clone, Debug)]
pub struct AssociativePattern {
    pub ops: Vec<Expr>,
    pub identities: Vec<Expr>,
    pub is_commutative: bool,
}

impl AssociativePattern {
    pub fn new(ops: Vec<Expr>, identities: Vec<Expr>, is_commutative: bool) -> AssociativePattern {
        assert!(
            ops.len() == identities.len(),
            "a pattern needs one identity per operator"
        );
        AssociativePattern {
            ops,
            identities,
            is_commutative,
        }
    }

    pub fn single(op: Expr, identity: Expr, is_commutative: bool) -> AssociativePattern {
        AssociativePattern::new(vec![op], vec![identity], is_commutative)
    }

    pub fn size(&self) -> usize {
        self.ops.len()
    }
}

/// The prover's result. When `is_associative` is false the remaining fields
/// are meaningless.
#[derive(Clone, Debug)]
pub struct AssociativeOp {
    pub pattern: AssociativePattern,
    pub xs: Vec<Replacement>,
    pub ys: Vec<Replacement>,
    pub is_associative: bool,
}

impl AssociativeOp {
    /// The "could not prove it" value.
    pub fn failure() -> AssociativeOp {
        AssociativeOp {
            pattern: AssociativePattern::new(Vec::new(), Vec::new(), false),
            xs: Vec::new(),
            ys: Vec::new(),
            is_associative: false,
        }
    }

    pub fn associative(&self) -> bool {
        self.is_associative
    }

    pub fn size(&self) -> usize {
        self.pattern.size()
    }
}

// Per-element result slots, filled in as the proof proceeds. Every slot must
// be full before a success value is assembled.
#[derive(Clone, Debug)]
struct Partial {
    ops: Vec<Option<Expr>>,
    identities: Vec<Option<Expr>>,
    xs: Vec<Option<Replacement>>,
    ys: Vec<Option<Replacement>>,
    commutative: Vec<Option<bool>>,
}

impl Partial {
    fn new(size: usize) -> Partial {
        Partial {
            ops: vec![None; size],
            identities: vec![None; size],
            xs: vec![None; size],
            ys: vec![None; size],
            commutative: vec![None; size],
        }
    }

    fn size(&self) -> usize {
        self.ops.len()
    }

    fn finish(self) -> AssociativeOp {
        let fill = "every tuple element must be proven before assembly";
        let ops: Vec<Expr> = self.ops.into_iter().map(|slot| slot.expect(fill)).collect();
        let identities: Vec<Expr> = self
            .identities
            .into_iter()
            .map(|slot| slot.expect(fill))
            .collect();
        let xs: Vec<Replacement> = self.xs.into_iter().map(|slot| slot.expect(fill)).collect();
        let ys: Vec<Replacement> = self.ys.into_iter().map(|slot| slot.expect(fill)).collect();

        // Commutativity is a by-product, reported only when every
        // self-referencing element is commutative.
        let mut any_self_ref = false;
        let mut is_commutative = true;
        for (x, commutative) in xs.iter().zip(&self.commutative) {
            if x.expr.is_some() {
                any_self_ref = true;
                is_commutative = is_commutative && commutative.unwrap_or(false);
            }
        }

        AssociativeOp {
            pattern: AssociativePattern::new(ops, identities, any_self_ref && is_commutative),
            xs,
            ys,
            is_associative: true,
        }
    }
}

// Replace self-references to `func` at any tuple index with the
// corresponding accumulator variable, recording which indices this element
// depends on (C1).
struct ConvertSelfRef<'a> {
    func: &'a str,
    args: &'a [Expr],
    value_index: usize,
    op_x_names: &'a [String],
    is_solvable: bool,
    x_dependencies: BTreeSet<usize>,
    x_part: Option<Expr>,
}

impl<'a> ConvertSelfRef<'a> {
    fn new(
        func: &'a str,
        args: &'a [Expr],
        value_index: usize,
        op_x_names: &'a [String],
    ) -> ConvertSelfRef<'a> {
        ConvertSelfRef {
            func,
            args,
            value_index,
            op_x_names,
            is_solvable: true,
            x_dependencies: BTreeSet::new(),
            x_part: None,
        }
    }

    // `in_cond` is true while we are lexically inside the condition of a
    // `Select`, including conditions of selects nested inside one.
    fn rewrite(&mut self, e: &Expr, in_cond: bool) -> Expr {
        if !self.is_solvable {
            return e.clone();
        }
        match e.kind() {
            ExprKind::Call {
                name,
                args,
                value_index,
                call_kind,
            } => {
                let new_args: Vec<Expr> =
                    args.iter().map(|arg| self.rewrite(arg, in_cond)).collect();
                if !self.is_solvable {
                    return e.clone();
                }
                if name != self.func {
                    return Expr::call(e.ty(), name.clone(), new_args, *value_index, *call_kind);
                }
                if *call_kind != CallKind::Internal {
                    trace!(
                        "self-reference of {} has a non-internal call kind; not solvable",
                        name
                    );
                    self.is_solvable = false;
                    return e.clone();
                }
                if in_cond && *value_index == self.value_index {
                    trace!(
                        "self-reference of {} inside a select condition; not solvable",
                        name
                    );
                    self.is_solvable = false;
                    return e.clone();
                }
                assert!(
                    new_args.len() == self.args.len(),
                    "self-reference of {} must have the same arity as the definition",
                    name
                );
                if !new_args.iter().zip(self.args).all(|(a, b)| equal(a, b)) {
                    trace!(
                        "self-reference of {} with different args from the definition; not solvable",
                        name
                    );
                    self.is_solvable = false;
                    return e.clone();
                }
                assert!(
                    *value_index < self.op_x_names.len(),
                    "self-reference value index {} out of range",
                    value_index
                );
                trace!(
                    "substituting call {} at value index {} with {}",
                    name,
                    value_index,
                    self.op_x_names[*value_index]
                );
                if *value_index == self.value_index {
                    self.x_part = Some(e.clone());
                } else {
                    self.x_dependencies.insert(*value_index);
                }
                Expr::var(e.ty(), self.op_x_names[*value_index].as_str())
            }
            ExprKind::Select {
                cond,
                true_value,
                false_value,
            } => {
                let cond = self.rewrite(cond, true);
                let true_value = self.rewrite(true_value, in_cond);
                let false_value = self.rewrite(false_value, in_cond);
                if !self.is_solvable {
                    return e.clone();
                }
                Expr::select(cond, true_value, false_value)
            }
            _ => map_children(e, |child| self.rewrite(child, in_cond)),
        }
    }
}

// Check one element of a candidate pattern against one canonicalised
// expression, accumulating wildcard bindings shared across elements (C4).
fn associative_op_pattern_match(
    pattern_op: &Expr,
    e: &Expr,
    op_x_names: &[String],
    x_scope: &OrdSet<String>,
    bindings: &mut OrdMap<String, Expr>,
) -> bool {
    let Some(result) = expr_match(pattern_op, e) else {
        return false;
    };
    trace!("candidate associative op for {}: {}", e, pattern_op);

    for (i, x_name) in op_x_names.iter().enumerate() {
        if let Some(bound) = result.get(format!("x{}", i).as_str()) {
            let is_accumulator = matches!(bound.kind(), ExprKind::Var(name) if name == x_name);
            if !is_accumulator {
                trace!(
                    "skipping the match: x{} bound to {} instead of {}",
                    i,
                    bound,
                    x_name
                );
                return false;
            }
        }
    }
    for i in 0..op_x_names.len() {
        if let Some(bound) = result.get(format!("y{}", i).as_str()) {
            if expr_uses_vars(bound, x_scope) {
                trace!("skipping the match: y{} ({}) depends on the accumulator", i, bound);
                return false;
            }
        }
    }
    for (name, bound) in &result {
        match bindings.get(name) {
            None => {
                bindings.insert(name.clone(), bound.clone());
            }
            Some(previous) => {
                if !equal(previous, bound) {
                    trace!("skipping the match: {} bound inconsistently", name);
                    return false;
                }
            }
        }
    }
    true
}

// Match a tuple of canonicalised expressions against an ordered table of
// associative patterns, writing the first full match into `partial` (C4).
fn find_match(
    table: &[AssociativePattern],
    op_x_names: &[String],
    op_y_names: &[String],
    x_parts: &[Option<Expr>],
    exprs: &[Expr],
    partial: &mut Partial,
) -> bool {
    assert!(op_x_names.len() == op_y_names.len());
    assert!(op_x_names.len() == x_parts.len());
    assert!(op_x_names.len() == exprs.len());
    assert!(op_x_names.len() == partial.size());

    let x_scope: OrdSet<String> = op_x_names.iter().cloned().collect();

    'candidates: for pattern in table {
        assert!(
            pattern.size() == exprs.len(),
            "table entry arity must match its key"
        );

        let mut bindings = OrdMap::new();
        for (pattern_op, e) in pattern.ops.iter().zip(exprs) {
            if !associative_op_pattern_match(pattern_op, e, op_x_names, &x_scope, &mut bindings) {
                continue 'candidates;
            }
        }

        let mut ys = Vec::new();
        let mut replacement = Vec::new();
        for (index, op_y) in op_y_names.iter().enumerate() {
            let Some(y_part) = bindings.get(format!("y{}", index).as_str()) else {
                // The pattern never bound this element's y; try the next one.
                continue 'candidates;
            };
            trace!("pattern binds {} -> {}", op_y, y_part);
            ys.push(Replacement::new(op_y.clone(), y_part.clone()));
            replacement.push((y_part.clone(), Expr::var(y_part.ty(), op_y.as_str())));
        }

        for (index, e) in exprs.iter().enumerate() {
            // All y bindings are substituted simultaneously; one binding's
            // expression may occur inside another's.
            partial.ops[index] = Some(substitute_exprs(&replacement, e));
            partial.identities[index] = Some(pattern.identities[index].clone());
            partial.xs[index] = Some(Replacement {
                var: op_x_names[index].clone(),
                expr: x_parts[index].clone(),
            });
            partial.ys[index] = Some(ys[index].clone());
            partial.commutative[index] = Some(pattern.is_commutative);
        }
        return true;
    }

    false
}

// Recognise a built-in associative operator for a single canonicalised
// element, falling back to the single-element pattern table for i32 (C3).
// Returns (is_associative, is_commutative).
fn extract_associative_op_single_element(
    index: usize,
    op_x_names: &[String],
    op_y_names: &[String],
    x_part: &Option<Expr>,
    e: &Expr,
    partial: &mut Partial,
) -> (bool, bool) {
    let ty = e.ty();
    let op_x = &op_x_names[index];
    let op_y = &op_y_names[index];
    let x = Expr::var(ty, op_x.as_str());
    let y = Expr::var(ty, op_y.as_str());

    let Some(x_part) = x_part else {
        // No self-recurrence: the update replaces the running value outright,
        // which is associative under any merge that keeps the newest value,
        // but not commutative.
        partial.ops[index] = Some(y);
        partial.identities[index] = Some(make_const(ty, 0));
        partial.xs[index] = Some(Replacement::none());
        partial.ys[index] = Some(Replacement::new(op_y.clone(), e.clone()));
        partial.commutative[index] = Some(false);
        return (true, false);
    };

    let builtin = match e.kind() {
        ExprKind::Add(a, b) => Some((x.clone() + y.clone(), make_const(ty, 0), false, true, a, b)),
        // x - rhs merges as x + y with the negated rhs.
        ExprKind::Sub(a, b) => Some((x.clone() + y.clone(), make_const(ty, 0), true, false, a, b)),
        ExprKind::Mul(a, b) => Some((x.clone() * y.clone(), make_const(ty, 1), false, true, a, b)),
        ExprKind::Min(a, b) => Some((Expr::min(x.clone(), y.clone()), ty.max(), false, true, a, b)),
        ExprKind::Max(a, b) => Some((Expr::max(x.clone(), y.clone()), ty.min(), false, true, a, b)),
        ExprKind::And(a, b) => Some((
            Expr::and(x.clone(), y.clone()),
            Expr::bool_lit(true),
            false,
            true,
            a,
            b,
        )),
        ExprKind::Or(a, b) => Some((
            Expr::or(x.clone(), y.clone()),
            Expr::bool_lit(false),
            false,
            true,
            a,
            b,
        )),
        ExprKind::Let { .. } => {
            panic!("lets should have been substituted before extraction")
        }
        _ => None,
    };

    let mut proved = (false, false);
    if let Some((op, identity, negate_rhs, commutative, lhs, rhs)) = builtin {
        let lhs_is_accumulator = matches!(lhs.kind(), ExprKind::Var(name) if *name == *op_x);
        if lhs_is_accumulator && !expr_uses_var(rhs, op_x) {
            let y_expr = if negate_rhs {
                simplify(&Expr::sub(make_zero(ty), rhs.clone()))
            } else {
                rhs.clone()
            };
            partial.ops[index] = Some(op);
            partial.identities[index] = Some(identity);
            partial.xs[index] = Some(Replacement::new(op_x.clone(), x_part.clone()));
            partial.ys[index] = Some(Replacement::new(op_y.clone(), y_expr));
            partial.commutative[index] = Some(commutative);
            proved = (true, commutative);
        } else {
            trace!("cannot prove associativity of {} directly", e);
        }
    }

    if !proved.0 && ty == Type::Int(32) {
        trace!("looking up the associativity table for {}", e);
        let sub_exprs = [e.clone()];
        let sub_x_names = [op_x.clone()];
        let sub_y_names = [op_y.clone()];
        let sub_x_parts = [Some(x_part.clone())];
        let mut sub = Partial::new(1);
        if find_match(
            get_ops_table(&sub_exprs),
            &sub_x_names,
            &sub_y_names,
            &sub_x_parts,
            &sub_exprs,
            &mut sub,
        ) {
            let commutative = sub.commutative[0].unwrap_or(false);
            partial.ops[index] = sub.ops[0].take();
            partial.identities[index] = sub.identities[0].take();
            partial.xs[index] = sub.xs[0].take();
            partial.ys[index] = sub.ys[0].take();
            partial.commutative[index] = sub.commutative[0];
            proved = (true, commutative);
        }
    }

    trace!(
        "{} -> is associative? {}, is commutative? {}",
        e,
        proved.0,
        proved.1
    );
    proved
}

/// Decide whether the update definition `f(args) = exprs` is a sequence of
/// applications of an associative operator, and if so return the canonical
/// operator, identity, and `x`/`y` replacements per tuple element (C6).
pub fn prove_associativity(func: &str, args: &[Expr], exprs: &[Expr]) -> AssociativeOp {
    assert!(!exprs.is_empty(), "an update definition has at least one value");
    let n = exprs.len();

    let args: Vec<Expr> = args
        .iter()
        .map(|arg| {
            let arg = common_subexpression_elimination(arg);
            let arg = simplify(&arg);
            substitute_in_all_lets(&arg)
        })
        .collect();

    let op_x_names: Vec<String> = (0..n).map(|i| unique_name(&format!("_x_{}", i))).collect();
    let op_y_names: Vec<String> = (0..n).map(|i| unique_name(&format!("_y_{}", i))).collect();

    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut x_parts: Vec<Option<Expr>> = vec![None; n];
    let mut canon: Vec<Option<Expr>> = vec![None; n];
    let mut all_independent = true;

    // For the tuple to be associative every element has to be. Elements are
    // visited from the highest index down, so fresh names drawn late cannot
    // collide with ones already embedded in lower elements.
    for idx in (0..n).rev() {
        let e = simplify(&exprs[idx]);
        let e = common_subexpression_elimination(&e);
        let e = substitute_in_all_lets(&e);

        let mut convert = ConvertSelfRef::new(func, &args, idx, &op_x_names);
        let e = convert.rewrite(&e, false);
        if !convert.is_solvable {
            return AssociativeOp::failure();
        }
        if !convert.x_dependencies.is_empty() {
            all_independent = false;
        }
        x_parts[idx] = convert.x_part;
        dependencies[idx] = convert.x_dependencies;
        if x_parts[idx].is_some() {
            dependencies[idx].insert(idx);
        }

        let e = simplify(&e);
        let e = common_subexpression_elimination(&e);
        let e = substitute_in_all_lets(&e);
        // Move the accumulator to the left of the outermost operator where
        // possible; on failure the expression is left as it stands.
        let e = solve_expression(&e, &op_x_names[idx]).expr;
        canon[idx] = Some(e);
    }

    let exprs: Vec<Expr> = canon
        .into_iter()
        .map(|slot| slot.expect("every element is canonicalised before analysis"))
        .collect();

    let graph = Graph {
        edges_out: IdVec::from_vec(
            dependencies
                .iter()
                .map(|deps| deps.iter().map(|&j| NodeId(j)).collect())
                .collect(),
        ),
    };
    let reach = reachable_sets(&graph);

    let mut partial = Partial::new(n);

    if all_independent || n == 1 {
        trace!("all tuple elements are independent; proving each separately");
        for idx in 0..n {
            let (is_associative, _) = extract_associative_op_single_element(
                idx,
                &op_x_names,
                &op_y_names,
                &x_parts[idx],
                &exprs[idx],
                &mut partial,
            );
            if !is_associative {
                return AssociativeOp::failure();
            }
        }
    } else {
        trace!("cross-element dependencies present; proving jointly per subgraph");
        let subgraphs = minimal_subgraphs(&reach);
        let mut covered = vec![false; n];

        for subgraph in &subgraphs {
            if subgraph.len() > 2 {
                trace!("subgraph has more than two elements; giving up");
                return AssociativeOp::failure();
            }

            let indices: Vec<usize> = subgraph.iter().map(|node| node.0).collect();
            let sub_exprs: Vec<Expr> = indices.iter().map(|&i| exprs[i].clone()).collect();
            let sub_x_names: Vec<String> = indices.iter().map(|&i| op_x_names[i].clone()).collect();
            let sub_y_names: Vec<String> = indices.iter().map(|&i| op_y_names[i].clone()).collect();
            let sub_x_parts: Vec<Option<Expr>> =
                indices.iter().map(|&i| x_parts[i].clone()).collect();

            let mut sub = Partial::new(indices.len());
            if !find_match(
                get_ops_table(&sub_exprs),
                &sub_x_names,
                &sub_y_names,
                &sub_x_parts,
                &sub_exprs,
                &mut sub,
            ) {
                trace!("no table entry matches the subgraph");
                return AssociativeOp::failure();
            }

            // An element shared between subgraphs must be assigned the same
            // operator, identity, and replacements by each of them.
            for (j, &index) in indices.iter().enumerate() {
                let filled = "find_match fills every slot of a matched subgraph";
                if partial.ops[index].is_some() {
                    let consistent = equal_opt(&partial.ops[index], &sub.ops[j])
                        && equal_opt(&partial.identities[index], &sub.identities[j])
                        && replacement_eq(
                            partial.xs[index].as_ref().expect(filled),
                            sub.xs[j].as_ref().expect(filled),
                        )
                        && replacement_eq(
                            partial.ys[index].as_ref().expect(filled),
                            sub.ys[j].as_ref().expect(filled),
                        );
                    if !consistent {
                        trace!("conflicting results for element {} across subgraphs", index);
                        return AssociativeOp::failure();
                    }
                }
                partial.ops[index] = sub.ops[j].clone();
                partial.identities[index] = sub.identities[j].clone();
                partial.xs[index] = sub.xs[j].clone();
                partial.ys[index] = sub.ys[j].clone();
                partial.commutative[index] = sub.commutative[j];
                covered[index] = true;
            }
        }

        for idx in 0..n {
            if covered[idx] {
                continue;
            }
            if dependencies[idx].is_empty() && x_parts[idx].is_none() {
                // A dependency-free element gets the trivial result.
                let (is_associative, _) = extract_associative_op_single_element(
                    idx,
                    &op_x_names,
                    &op_y_names,
                    &x_parts[idx],
                    &exprs[idx],
                    &mut partial,
                );
                assert!(is_associative, "the trivial element result cannot fail");
            } else {
                // A dead cross-reference with no own-recursion: proving it
                // jointly would need more y slots than the arity provides.
                trace!("element {} is not covered by any subgraph; giving up", idx);
                return AssociativeOp::failure();
            }
        }
    }

    partial.finish()
}
