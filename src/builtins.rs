//! Native functions registered on every new [`Context`] unless
//! [`Config::builtins`](crate::Config::builtins) is off.
//!
//! | Function | Result |
//! |---|---|
//! | `sum(args...)` | double total; list arguments are summed element-wise |
//! | `print(args...)` | int count of lines written to the output sink |
//! | `round(value, digits)` | double, truncated after scaling |
//! | `debug(args...)` | logs the arguments, returns `true` |
//! | `to_int(value)` | int, numbers truncated, strings read up to the first non-digit |

use tracing::info;

use crate::{context::Context, evaluator::EvalError, value::Value};

pub fn register(ctx: &mut Context) {
    ctx.register_function("sum", sum);
    ctx.register_function("print", print);
    ctx.register_function("round", round);
    ctx.register_function("debug", debug);
    ctx.register_function("to_int", to_int);
}

fn expect_args(function: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::InvalidArgumentCount {
            function: function.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

/// sum(args...) - total of every numeric argument, lists flattened
fn sum(_ctx: &mut Context, args: &[Value]) -> Result<Value, EvalError> {
    fn add(total: &mut f64, value: &Value) -> Result<(), EvalError> {
        match value {
            Value::List(items) => items.iter().try_for_each(|item| add(total, item)),
            other => {
                *total += other.to_double()?;
                Ok(())
            }
        }
    }

    let mut total = 0.0;
    for arg in args {
        add(&mut total, arg)?;
    }
    Ok(Value::Double(total))
}

/// print(args...) - string arguments are glob patterns over the symbol
/// table and print `name value` per set symbol; anything else prints its
/// rendered value.
fn print(ctx: &mut Context, args: &[Value]) -> Result<Value, EvalError> {
    let mut lines = vec![];
    for arg in args {
        match arg {
            Value::String(pattern) => lines.extend(
                ctx.symboltable_filter(pattern)
                    .into_iter()
                    .filter_map(|symbol| {
                        symbol
                            .value()
                            .map(|value| format!("{} {}", symbol.name(), value))
                    }),
            ),
            other => lines.push(other.to_string()),
        }
    }

    for line in &lines {
        ctx.output(line);
    }
    Ok(Value::Int(lines.len() as i64))
}

/// round(value, digits) - scales by `10^digits`, truncates toward zero and
/// scales back, so `round(2.999, 2)` is `2.99`. A fractional digit count is
/// truncated.
fn round(_ctx: &mut Context, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("round", args, 2)?;
    let value = args[0].to_double()?;
    let digits = args[1].to_double()?.trunc();
    if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&digits) {
        return Err(EvalError::Native {
            function: "round".to_string(),
            message: format!("digit count {} out of range", args[1]),
        });
    }
    let digits = digits as i32;

    let scale = 10f64.powi(digits);
    Ok(Value::Double((value * scale).trunc() / scale))
}

/// debug(args...) - logs the arguments at info level
fn debug(_ctx: &mut Context, args: &[Value]) -> Result<Value, EvalError> {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    info!(target: "loglang::debug", "{}", rendered.join(" "));
    Ok(Value::Bool(true))
}

/// to_int(value) - converts a number or a leading-digits string to an int
fn to_int(_ctx: &mut Context, args: &[Value]) -> Result<Value, EvalError> {
    expect_args("to_int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Double(n) if n.is_finite() => Ok(Value::Int(n.trunc() as i64)),
        Value::String(s) => leading_int(s).map(Value::Int).ok_or_else(|| {
            EvalError::InvalidConversion {
                expected: "int",
                found: args[0].to_string(),
            }
        }),
        other => Err(EvalError::InvalidConversion {
            expected: "int",
            found: other.to_string(),
        }),
    }
}

/// Parses the optional sign and digits at the start of `text`.
fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['-', '+']));
    let digits = text[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |end| sign_len + end);
    text[..digits].parse().ok()
}

#[test]
fn test_leading_int() {
    assert_eq!(leading_int("42"), Some(42));
    assert_eq!(leading_int(" -7ms"), Some(-7));
    assert_eq!(leading_int("+3.9"), Some(3));
    assert_eq!(leading_int("abc"), None);
    assert_eq!(leading_int("-"), None);
}
