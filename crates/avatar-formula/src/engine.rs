//! Evaluate parsed expressions against an [`EvalContext`].
//!
//! Only three names are bound: `value`, `trigger_value` and `avatar` (also
//! spelled `person`). `avatar.<organ>.<indicator>` reads any indicator's
//! current value. There is no assignment, iteration, or I/O.

use std::borrow::Cow;
use std::cmp::Ordering;

use avatar_core::eval::EvalContext;
use avatar_core::organ::Organ;
use avatar_core::value::Value;

use crate::functions;
use crate::types::{BinaryOp, Expr, FormulaError, ListItem, LogicalOp, Result, UnaryOp};

/// Longest list or string an expression may build.
pub const MAX_SEQUENCE_LEN: usize = 1_000_000;

/// Intermediate result: a value, or a step along `avatar.<organ>.<indicator>`.
enum Operand<'a> {
    Value(Cow<'a, Value>),
    Avatar,
    Organ(&'a Organ),
}

/// Evaluates `expr` with the bindings in `ctx`.
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    eval_value(expr, ctx).map(Cow::into_owned)
}

fn eval_value<'a>(expr: &Expr, ctx: &EvalContext<'a>) -> Result<Cow<'a, Value>> {
    match eval(expr, ctx)? {
        Operand::Value(v) => Ok(v),
        Operand::Avatar => Err(FormulaError::type_error(
            "avatar is not a value; use avatar.<organ>.<indicator>",
        )),
        Operand::Organ(organ) => Err(FormulaError::type_error(format!(
            "organ {} is not a value; use avatar.{}.<indicator>",
            organ.name(),
            organ.name()
        ))),
    }
}

fn owned<'a>(value: Value) -> Result<Operand<'a>> {
    Ok(Operand::Value(Cow::Owned(value)))
}

fn eval<'a>(expr: &Expr, ctx: &EvalContext<'a>) -> Result<Operand<'a>> {
    match expr {
        Expr::Literal(v) => owned(v.clone()),
        Expr::Name(name) => match name.as_str() {
            "value" => Ok(Operand::Value(Cow::Borrowed(ctx.value))),
            "trigger_value" => Ok(Operand::Value(Cow::Borrowed(ctx.trigger_value))),
            "avatar" | "person" => Ok(Operand::Avatar),
            other => Err(FormulaError::UnknownName(other.to_owned())),
        },
        Expr::List(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    ListItem::Single(e) => list.push(eval_value(e, ctx)?.into_owned()),
                    ListItem::Spread(e) => match eval_value(e, ctx)?.into_owned() {
                        Value::List(inner) => list.extend(inner),
                        other => {
                            return Err(FormulaError::type_error(format!(
                                "cannot spread a {}",
                                other.type_tag()
                            )));
                        }
                    },
                }
                check_len(list.len())?;
            }
            owned(Value::List(list))
        }
        Expr::Unary { op, operand } => {
            let v = eval_value(operand, ctx)?;
            owned(unary(*op, &v)?)
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_value(lhs, ctx)?;
            let r = eval_value(rhs, ctx)?;
            owned(binary(*op, &l, &r)?)
        }
        Expr::Logical { op, lhs, rhs } => {
            let l = eval_value(lhs, ctx)?;
            let short_circuit = match op {
                LogicalOp::And => !truthy(&l),
                LogicalOp::Or => truthy(&l),
            };
            if short_circuit {
                Ok(Operand::Value(l))
            } else {
                eval_value(rhs, ctx).map(Operand::Value)
            }
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            let condition = eval_value(condition, ctx)?;
            if truthy(&condition) {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|a| eval_value(a, ctx).map(Cow::into_owned))
                .collect::<Result<Vec<_>>>()?;
            owned(functions::call(function, args)?)
        }
        Expr::Index { target, index } => {
            let target = eval_value(target, ctx)?;
            let index = eval_value(index, ctx)?;
            owned(index_value(&target, &index)?)
        }
        Expr::Attribute { target, name } => match eval(target, ctx)? {
            Operand::Avatar => ctx
                .avatar
                .organ(name)
                .map(Operand::Organ)
                .map_err(|_| FormulaError::UnknownIndicator(name.clone())),
            Operand::Organ(organ) => organ
                .indicator(name)
                .map(|ind| Operand::Value(Cow::Borrowed(ind.value())))
                .map_err(|_| FormulaError::UnknownIndicator(format!("{}.{}", organ.name(), name))),
            Operand::Value(v) => Err(FormulaError::type_error(format!(
                "{} has no attribute {}",
                v.type_tag(),
                name
            ))),
        },
    }
}

// ---------------------------------------------------------------------------
// Value semantics
// ---------------------------------------------------------------------------

/// `false`, `0`, `0.0`, `""` and `[]` are false; everything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
    }
}

/// A numeric operand after promotion.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(x) => Some(Self::Float(*x)),
            _ => None,
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(x) => x,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Self::Int(i) => Value::Int(i),
            Self::Float(x) => Value::Float(x),
        }
    }
}

fn unsupported(op: &str, l: &Value, r: &Value) -> FormulaError {
    FormulaError::type_error(format!(
        "unsupported operand types for {}: {} and {}",
        op,
        l.type_tag(),
        r.type_tag()
    ))
}

pub(crate) fn check_len(len: usize) -> Result<()> {
    if len > MAX_SEQUENCE_LEN {
        Err(FormulaError::TooLarge(len))
    } else {
        Ok(())
    }
}

fn unary(op: UnaryOp, v: &Value) -> Result<Value> {
    match (op, v) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!truthy(v))),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(FormulaError::Overflow),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Value::Int(_) | Value::Float(_)) => Ok(v.clone()),
        (op, v) => Err(FormulaError::type_error(format!(
            "bad operand type for unary {}: {}",
            if op == UnaryOp::Neg { "-" } else { "+" },
            v.type_tag()
        ))),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(l, r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = compare(l, r).ok_or_else(|| unsupported(op.symbol(), l, r))?;
            // NaN compares false against everything.
            let result = match (op, ord) {
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => add(l, r),
        BinaryOp::Mul => mul(l, r),
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Pow => {
            let (Some(a), Some(b)) = (Num::of(l), Num::of(r)) else {
                return Err(unsupported(op.symbol(), l, r));
            };
            arithmetic(op, a, b).map(Num::into_value)
        }
    }
}

fn add(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => {
            check_len(a.len() + b.len())?;
            Ok(Value::Str(format!("{a}{b}")))
        }
        (Value::List(a), Value::List(b)) => {
            check_len(a.len() + b.len())?;
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        _ => match (Num::of(l), Num::of(r)) {
            (Some(a), Some(b)) => arithmetic(BinaryOp::Add, a, b).map(Num::into_value),
            _ => Err(unsupported("+", l, r)),
        },
    }
}

fn mul(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            if items.is_empty() || times == 0 {
                return Ok(Value::List(Vec::new()));
            }
            check_len(items.len().saturating_mul(times))?;
            Ok(Value::List(
                std::iter::repeat_n(items.iter(), times).flatten().cloned().collect(),
            ))
        }
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            if s.is_empty() || times == 0 {
                return Ok(Value::Str(String::new()));
            }
            check_len(s.len().saturating_mul(times))?;
            Ok(Value::Str(s.repeat(times)))
        }
        _ => match (Num::of(l), Num::of(r)) {
            (Some(a), Some(b)) => arithmetic(BinaryOp::Mul, a, b).map(Num::into_value),
            _ => Err(unsupported("*", l, r)),
        },
    }
}

/// Numeric arithmetic. `Int op Int` stays integral except for `/` and
/// negative powers; anything involving a float is a float.
pub(crate) fn arithmetic(op: BinaryOp, a: Num, b: Num) -> Result<Num> {
    use Num::{Float, Int};

    match (a, b) {
        (Int(x), Int(y)) => match op {
            BinaryOp::Add => x.checked_add(y).map(Int).ok_or(FormulaError::Overflow),
            BinaryOp::Sub => x.checked_sub(y).map(Int).ok_or(FormulaError::Overflow),
            BinaryOp::Mul => x.checked_mul(y).map(Int).ok_or(FormulaError::Overflow),
            BinaryOp::Div => {
                if y == 0 {
                    return Err(FormulaError::DivisionByZero);
                }
                Ok(Float(x as f64 / y as f64))
            }
            BinaryOp::Rem => {
                if y == 0 {
                    return Err(FormulaError::DivisionByZero);
                }
                let r = x.checked_rem(y).ok_or(FormulaError::Overflow)?;
                // Result takes the sign of the divisor.
                Ok(Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
            }
            BinaryOp::Pow => {
                if y < 0 {
                    return Ok(Float((x as f64).powf(y as f64)));
                }
                let exp = u32::try_from(y).map_err(|_| FormulaError::Overflow)?;
                x.checked_pow(exp).map(Int).ok_or(FormulaError::Overflow)
            }
            _ => unreachable!("comparison passed to arithmetic"),
        },
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => {
                    if y == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    x / y
                }
                BinaryOp::Rem => {
                    if y == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    let r = x % y;
                    if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }
                }
                BinaryOp::Pow => {
                    if x < 0.0 && y.fract() != 0.0 {
                        return Err(FormulaError::Domain(format!(
                            "negative base {x} with fractional exponent {y}"
                        )));
                    }
                    x.powf(y)
                }
                _ => unreachable!("comparison passed to arithmetic"),
            };
            Ok(Float(result))
        }
    }
}

/// Equality used by `==`: numbers compare by value across int/float,
/// lists element-wise, everything else by variant and value.
pub fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        _ => match (Num::of(l), Num::of(r)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => x == y,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => l == r,
        },
    }
}

/// Ordering used by `<` and friends, `min` and `max`.
///
/// Returns `None` if the two values cannot be ordered at all, and
/// `Some(None)` if they are comparable numbers but one is NaN.
pub(crate) fn compare(l: &Value, r: &Value) -> Option<Option<Ordering>> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Some(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare(x, y)? {
                    Some(Ordering::Equal) => continue,
                    other => return Some(other),
                }
            }
            Some(Some(a.len().cmp(&b.len())))
        }
        _ => match (Num::of(l), Num::of(r)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => Some(Some(x.cmp(&y))),
            (Some(a), Some(b)) => Some(a.as_f64().partial_cmp(&b.as_f64())),
            _ => None,
        },
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value> {
    let Value::Int(i) = index else {
        return Err(FormulaError::type_error(format!(
            "indices must be int, not {}",
            index.type_tag()
        )));
    };
    match target {
        Value::List(items) => Ok(items[resolve_index(*i, items.len())?].clone()),
        Value::Str(s) => {
            let len = s.chars().count();
            let at = resolve_index(*i, len)?;
            Ok(Value::Str(s.chars().nth(at).map(String::from).unwrap_or_default()))
        }
        other => Err(FormulaError::type_error(format!(
            "{} is not indexable",
            other.type_tag()
        ))),
    }
}

/// Maps a possibly negative index into `0..len`.
fn resolve_index(index: i64, len: usize) -> Result<usize> {
    let out_of_range = || FormulaError::IndexOutOfRange { index, len };
    let len_i = i64::try_from(len).map_err(|_| out_of_range())?;
    let resolved = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(out_of_range())
    }
}
