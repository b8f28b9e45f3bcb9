//! The associativity prover of the Tessel array compiler.
//!
//! Reduction update definitions that can be reinterpreted as repeated
//! applications of an associative operator may be legally reordered, split,
//! and parallelised by the scheduler. [`prove_associativity`] decides that
//! question for a definition `f(args) = exprs` and, on success, hands back
//! the canonical operator, its identity, and the accumulator/value
//! replacements per tuple element.

pub mod data;

mod pretty_print;

pub mod expr_eq;

pub mod expr_match;

pub mod substitute;

pub mod simplify;

pub mod cse;

pub mod solve;

pub mod graph;

pub mod ops_table;

pub mod associativity;

pub mod util;

pub use associativity::{prove_associativity, AssociativeOp, AssociativePattern, Replacement};
pub use data::expr::{CallKind, Expr, ExprKind, Type};
