use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr},
    context::Context,
    value::Value,
};

/// Errors that can occur while running a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Call to a name with no registered native function
    #[error("unknown function <{0}> called")]
    UnknownFunction(String),

    /// Value of the wrong variant for the operation
    #[error("invalid conversion to {expected} from {found}")]
    InvalidConversion {
        expected: &'static str,
        found: String,
    },

    /// Read of a symbol that was never set
    #[error("value <{0}> undefined, cannot use it yet")]
    UndefinedSymbol(String),

    #[error("{function} expects {expected} argument(s), got {found}")]
    InvalidArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Integer division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Too many nested program runs in one cascade
    #[error("cascade depth limit of {0} exceeded")]
    CascadeDepthExceeded(usize),

    /// Failure reported by a native function
    #[error("{function}: {message}")]
    Native { function: String, message: String },
}

/// Evaluates an expression against the context.
///
/// Assignments update symbols through [`Context::set`], so evaluation can
/// start nested cascades before it returns.
///
/// # Examples
///
/// ```
/// use loglang::{Context, Value, evaluator::eval, parser::parse_program};
///
/// let mut ctx = Context::new();
/// ctx.set("a", Value::Int(4));
///
/// let expr = parse_program("b = a * 2").unwrap();
/// assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(8));
/// assert_eq!(ctx.value("b"), Some(&Value::Int(8)));
/// ```
pub fn eval(expr: &Expr, ctx: &mut Context) -> Result<Value, EvalError> {
    match expr {
        Expr::Const(value) => Ok(value.clone()),
        Expr::Var(name) => ctx
            .get_value(name)
            .value()
            .cloned()
            .ok_or_else(|| EvalError::UndefinedSymbol(name.clone())),
        Expr::Glob(pattern) => Ok(ctx.get_glob_values(pattern)),
        Expr::Assign { target, value } => {
            let value = eval(value, ctx)?;
            ctx.set(target, value.clone());
            Ok(value)
        }
        Expr::BinaryOp { op, left, right } => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            apply_binop(*op, &left, &right)
        }
        Expr::Negate(inner) => match eval(inner, ctx)? {
            Value::Int(n) => Ok(n
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Double(-(n as f64)))),
            Value::Double(n) => Ok(Value::Double(-n)),
            other => Err(EvalError::InvalidConversion {
                expected: "number",
                found: other.to_string(),
            }),
        },
        Expr::Sequence(first, second) => {
            eval(first, ctx)?;
            eval(second, ctx)
        }
        Expr::Block(stmts) => {
            let mut last = Value::neutral();
            for stmt in stmts {
                last = eval(stmt, ctx)?;
            }
            Ok(last)
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval(cond, ctx)?.to_bool()? {
                eval(then_branch, ctx)
            } else if let Some(branch) = else_branch {
                eval(branch, ctx)
            } else {
                Ok(Value::neutral())
            }
        }
        Expr::EdgeIf {
            cond,
            on_true,
            on_false,
            previous,
        } => {
            let current = eval(cond, ctx)?.to_bool()?;
            if current == previous.get() {
                return Ok(Value::neutral());
            }
            previous.set(current);
            if current {
                eval(on_true, ctx)
            } else {
                eval(on_false, ctx)
            }
        }
        Expr::At {
            watch,
            action,
            previous,
        } => {
            let current = eval(watch, ctx)?;
            if previous.borrow().as_ref() == Some(&current) {
                return Ok(Value::neutral());
            }
            previous.replace(Some(current));
            eval(action, ctx)
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            ctx.call_function(name, &values)
        }
    }
}

/// Applies a binary operator to two evaluated operands.
///
/// Two integers stay integers for `+ - *` and for exact division; any
/// double operand makes the result a double. Strings concatenate with `+`.
pub fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => arithmetic(left, right, i64::checked_add, Decimal::checked_add, |a, b| a + b),
        },
        BinOp::Subtract => {
            arithmetic(left, right, i64::checked_sub, Decimal::checked_sub, |a, b| a - b)
        }
        BinOp::Multiply => {
            arithmetic(left, right, i64::checked_mul, Decimal::checked_mul, |a, b| a * b)
        }
        BinOp::Divide => {
            if let (Value::Int(_), Value::Int(0)) = (left, right) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic(left, right, exact_div, Decimal::checked_div, |a, b| a / b)
        }
        BinOp::Equal => Ok(Value::Bool(values_equal(left, right))),
        BinOp::NotEqual => Ok(Value::Bool(!values_equal(left, right))),
        BinOp::LessThan => Ok(Value::Bool(left.compare(right)? == Ordering::Less)),
        BinOp::GreaterThan => Ok(Value::Bool(left.compare(right)? == Ordering::Greater)),
        BinOp::LessEqual => Ok(Value::Bool(left.compare(right)? != Ordering::Greater)),
        BinOp::GreaterEqual => Ok(Value::Bool(left.compare(right)? != Ordering::Less)),
        BinOp::And => Ok(Value::Bool(left.to_bool()? && right.to_bool()?)),
        BinOp::Or => Ok(Value::Bool(left.to_bool()? || right.to_bool()?)),
    }
}

/// Numbers compare by value across variants; everything else structurally.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => *a as f64 == *b,
        _ => left == right,
    }
}

fn exact_div(a: i64, b: i64) -> Option<i64> {
    match a.checked_rem(b) {
        Some(0) => a.checked_div(b),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(n) => Decimal::from_i64(*n),
        Value::Double(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    decimal_op: fn(Decimal, Decimal) -> Option<Decimal>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(match int_op(*a, *b) {
            Some(n) => Value::Int(n),
            // Overflow or inexact division
            None => Value::Double(float_op(*a as f64, *b as f64)),
        }),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(float_op(*a, *b))),
        (Value::Int(_), Value::Double(_)) | (Value::Double(_), Value::Int(_)) => {
            if let Some(ad) = to_decimal(left)
                && let Some(bd) = to_decimal(right)
                && let Some(rd) = decimal_op(ad, bd)
                && let Some(r) = rd.to_f64()
            {
                return Ok(Value::Double(r));
            }
            Ok(Value::Double(float_op(left.to_double()?, right.to_double()?)))
        }
        (a, b) => Err(EvalError::InvalidConversion {
            expected: "number",
            found: if a.is_numeric() { b } else { a }.to_string(),
        }),
    }
}
