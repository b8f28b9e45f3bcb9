//! Rendering of expressions and types, used by trace output and test
//! failure messages.

use std::fmt;

use crate::data::expr::{CallKind, Expr, ExprKind, Type};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::UInt(1) => write!(f, "bool"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::UInt(bits) => write!(f, "u{}", bits),
            Type::Float(bits) => write!(f, "f{}", bits),
            Type::Str => write!(f, "str"),
        }
    }
}

fn write_binop(f: &mut fmt::Formatter<'_>, op: &str, a: &Expr, b: &Expr) -> fmt::Result {
    write!(f, "({} {} {})", a, op, b)
}

fn write_fn2(f: &mut fmt::Formatter<'_>, name: &str, a: &Expr, b: &Expr) -> fmt::Result {
    write!(f, "{}({}, {})", name, a, b)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::IntLit(v) => write!(f, "{}", v),
            ExprKind::UIntLit(v) => {
                if self.ty().is_bool() {
                    write!(f, "{}", *v != 0)
                } else {
                    write!(f, "{}u", v)
                }
            }
            ExprKind::FloatLit(v) => write!(f, "{:?}", v),
            ExprKind::StrLit(s) => write!(f, "{:?}", s),
            ExprKind::Var(name) => write!(f, "{}", name),
            ExprKind::Cast(value) => write!(f, "cast<{}>({})", self.ty(), value),
            ExprKind::Add(a, b) => write_binop(f, "+", a, b),
            ExprKind::Sub(a, b) => write_binop(f, "-", a, b),
            ExprKind::Mul(a, b) => write_binop(f, "*", a, b),
            ExprKind::Div(a, b) => write_binop(f, "/", a, b),
            ExprKind::Mod(a, b) => write_binop(f, "%", a, b),
            ExprKind::Min(a, b) => write_fn2(f, "min", a, b),
            ExprKind::Max(a, b) => write_fn2(f, "max", a, b),
            ExprKind::Eq(a, b) => write_binop(f, "==", a, b),
            ExprKind::Ne(a, b) => write_binop(f, "!=", a, b),
            ExprKind::Lt(a, b) => write_binop(f, "<", a, b),
            ExprKind::Le(a, b) => write_binop(f, "<=", a, b),
            ExprKind::Gt(a, b) => write_binop(f, ">", a, b),
            ExprKind::Ge(a, b) => write_binop(f, ">=", a, b),
            ExprKind::And(a, b) => write_binop(f, "&&", a, b),
            ExprKind::Or(a, b) => write_binop(f, "||", a, b),
            ExprKind::Not(a) => write!(f, "!({})", a),
            ExprKind::Select {
                cond,
                true_value,
                false_value,
            } => write!(f, "select({}, {}, {})", cond, true_value, false_value),
            ExprKind::Call {
                name,
                args,
                value_index,
                call_kind,
            } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")[{}]", value_index)?;
                if *call_kind == CallKind::External {
                    write!(f, "!")?;
                }
                Ok(())
            }
            ExprKind::Let { name, value, body } => {
                write!(f, "(let {} = {} in {})", name, value, body)
            }
        }
    }
}
