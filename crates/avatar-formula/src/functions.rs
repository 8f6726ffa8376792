//! Built-in functions callable from formulas.

use std::cmp::Ordering;

use avatar_core::value::Value;

use crate::engine::{Num, arithmetic, compare, truthy};
use crate::types::{BinaryOp, FormulaError, Result};

/// Names of every built-in, in the order they are documented.
pub const BUILTINS: &[&str] = &[
    "abs", "min", "max", "round", "floor", "ceil", "sqrt", "len", "sum", "float", "int", "str",
    "bool", "clamp",
];

/// Returns `true` if `name` is a built-in function.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Calls the built-in `name` with already evaluated arguments.
pub fn call(name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "abs" => {
            let [x] = exact(name, "1", args)?;
            match number(name, &x)? {
                Num::Int(i) => i.checked_abs().map(Value::Int).ok_or(FormulaError::Overflow),
                Num::Float(f) => Ok(Value::Float(f.abs())),
            }
        }
        "min" => extremum(name, args, Ordering::Less),
        "max" => extremum(name, args, Ordering::Greater),
        "round" => round(args),
        "floor" => {
            let [x] = exact(name, "1", args)?;
            to_int(number(name, &x)?.as_f64().floor())
        }
        "ceil" => {
            let [x] = exact(name, "1", args)?;
            to_int(number(name, &x)?.as_f64().ceil())
        }
        "sqrt" => {
            let [x] = exact(name, "1", args)?;
            let f = number(name, &x)?.as_f64();
            if f < 0.0 {
                return Err(FormulaError::Domain(format!("sqrt of negative number {f}")));
            }
            Ok(Value::Float(f.sqrt()))
        }
        "len" => {
            let [x] = exact(name, "1", args)?;
            let len = match &x {
                Value::List(items) => items.len(),
                Value::Str(s) => s.chars().count(),
                other => {
                    return Err(FormulaError::type_error(format!(
                        "{} has no len()",
                        other.type_tag()
                    )));
                }
            };
            Ok(Value::Int(len as i64))
        }
        "sum" => {
            let [x] = exact(name, "1", args)?;
            let items = match x {
                Value::List(items) => items,
                other => {
                    return Err(FormulaError::type_error(format!(
                        "sum() expects a list, got {}",
                        other.type_tag()
                    )));
                }
            };
            let mut total = Num::Int(0);
            for item in &items {
                total = arithmetic(BinaryOp::Add, total, number(name, item)?)?;
            }
            Ok(total.into_value())
        }
        "float" => {
            let [x] = exact(name, "1", args)?;
            match &x {
                Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    FormulaError::type_error(format!("could not convert {s:?} to float"))
                }),
                Value::List(_) => Err(FormulaError::type_error("float() of a list")),
            }
        }
        "int" => {
            let [x] = exact(name, "1", args)?;
            match &x {
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) => to_int(f.trunc()),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    FormulaError::type_error(format!("could not convert {s:?} to int"))
                }),
                Value::List(_) => Err(FormulaError::type_error("int() of a list")),
            }
        }
        "str" => {
            let [x] = exact(name, "1", args)?;
            match x {
                Value::Str(s) => Ok(Value::Str(s)),
                other => Ok(Value::Str(other.to_string())),
            }
        }
        "bool" => {
            let [x] = exact(name, "1", args)?;
            Ok(Value::Bool(truthy(&x)))
        }
        "clamp" => {
            let [x, lo, hi] = exact(name, "3", args)?;
            let (x, lo, hi) = (number(name, &x)?, number(name, &lo)?, number(name, &hi)?);
            if ordering(&lo.into_value(), &hi.into_value())? == Ordering::Greater {
                return Err(FormulaError::Domain(format!(
                    "clamp() lower bound {} exceeds upper bound {}",
                    lo.into_value(),
                    hi.into_value()
                )));
            }
            let x_value = x.into_value();
            if ordering(&x_value, &lo.into_value())? == Ordering::Less {
                Ok(lo.into_value())
            } else if ordering(&x_value, &hi.into_value())? == Ordering::Greater {
                Ok(hi.into_value())
            } else {
                Ok(x_value)
            }
        }
        other => Err(FormulaError::UnknownFunction(other.to_owned())),
    }
}

/// Unpacks exactly `N` arguments.
fn exact<const N: usize>(
    name: &str,
    expected: &'static str,
    args: Vec<Value>,
) -> Result<[Value; N]> {
    let found = args.len();
    args.try_into().map_err(|_| FormulaError::Arity {
        function: name.to_owned(),
        expected,
        found,
    })
}

fn number(name: &str, value: &Value) -> Result<Num> {
    Num::of(value).ok_or_else(|| {
        FormulaError::type_error(format!(
            "{name}() expects a number, got {}",
            value.type_tag()
        ))
    })
}

fn to_int(f: f64) -> Result<Value> {
    if !f.is_finite() {
        return Err(FormulaError::Domain(format!("cannot convert {f} to int")));
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(FormulaError::Overflow);
    }
    Ok(Value::Int(f as i64))
}

fn ordering(a: &Value, b: &Value) -> Result<Ordering> {
    match compare(a, b) {
        Some(Some(ord)) => Ok(ord),
        Some(None) => Err(FormulaError::Domain("cannot order NaN".into())),
        None => Err(FormulaError::type_error(format!(
            "cannot compare {} with {}",
            a.type_tag(),
            b.type_tag()
        ))),
    }
}

/// `min`/`max` over a single list argument or over several arguments.
fn extremum(name: &str, args: Vec<Value>, keep: Ordering) -> Result<Value> {
    let candidates = match args.len() {
        0 => {
            return Err(FormulaError::Arity {
                function: name.to_owned(),
                expected: "at least 1",
                found: 0,
            });
        }
        1 => match args.into_iter().next() {
            Some(Value::List(items)) => items,
            Some(other) => {
                return Err(FormulaError::type_error(format!(
                    "{name}() of a single {} argument",
                    other.type_tag()
                )));
            }
            None => Vec::new(),
        },
        _ => args,
    };

    let mut iter = candidates.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(FormulaError::type_error(format!("{name}() of an empty list")));
    };
    for candidate in iter {
        if ordering(&candidate, &best)? == keep {
            best = candidate;
        }
    }
    Ok(best)
}

/// `round(x)` rounds half to even and returns an int; `round(x, n)`
/// returns a float rounded to `n` decimal places.
fn round(args: Vec<Value>) -> Result<Value> {
    match args.len() {
        1 => {
            let [x] = exact("round", "1 or 2", args)?;
            match number("round", &x)? {
                Num::Int(i) => Ok(Value::Int(i)),
                Num::Float(f) => to_int(f.round_ties_even()),
            }
        }
        2 => {
            let [x, digits] = exact("round", "1 or 2", args)?;
            let f = number("round", &x)?.as_f64();
            let Value::Int(n) = digits else {
                return Err(FormulaError::type_error("round() digits must be an int"));
            };
            let n = i32::try_from(n.clamp(-308, 308)).unwrap_or(0);
            let scale = 10f64.powi(n);
            Ok(Value::Float((f * scale).round_ties_even() / scale))
        }
        found => Err(FormulaError::Arity {
            function: "round".into(),
            expected: "1 or 2",
            found,
        }),
    }
}
