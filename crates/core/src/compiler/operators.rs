//! Operator semantics for constant expressions.
//!
//! Every operator is a pure function over already-compiled operands and
//! follows the host's coercion rules. `??` and `instanceof` have no entry:
//! they are rejected outright.

use std::cmp::Ordering;

use thiserror::Error;

use crate::ast::node::{BinaryOp, UnaryOp};
use crate::compiler::value::{parse_numeric, Number, PhpArray, PhpString, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Modulo by zero")]
    ModuloByZero,

    #[error("Bit shift by negative number")]
    NegativeShift,

    #[error("Unsupported operand types: {left} {op} {right}")]
    UnsupportedOperands { op: &'static str, left: &'static str, right: &'static str },

    #[error("Unsupported operand type {operand} for operator {op}")]
    UnsupportedOperand { op: &'static str, operand: &'static str },

    #[error("Non-numeric value \"{value}\" used with operator {op}")]
    NonNumeric { op: &'static str, value: String },

    #[error("Operator {0} is not supported in constant expressions")]
    NotConstantOperator(&'static str),
}

pub type OperatorResult<T> = Result<T, OperatorError>;

/// Apply `op` to two compiled operands.
///
/// The short-circuiting operators are accepted here too; callers that need
/// laziness evaluate the right operand themselves.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> OperatorResult<Value> {
    let symbol = op.symbol();
    match op {
        BinaryOp::Add => {
            if let (Value::Array(l), Value::Array(r)) = (left, right) {
                return Ok(Value::Array(union(l, r)));
            }
            let (a, b) = numeric_operands(symbol, left, right)?;
            Ok(add(a, b))
        }
        BinaryOp::Sub => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            Ok(match (a, b) {
                (Number::Int(x), Number::Int(y)) => {
                    x.checked_sub(y).map_or(Value::Float(x as f64 - y as f64), Value::Int)
                }
                _ => Value::Float(a.as_f64() - b.as_f64()),
            })
        }
        BinaryOp::Mul => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            Ok(match (a, b) {
                (Number::Int(x), Number::Int(y)) => {
                    x.checked_mul(y).map_or(Value::Float(x as f64 * y as f64), Value::Int)
                }
                _ => Value::Float(a.as_f64() * b.as_f64()),
            })
        }
        BinaryOp::Div => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            divide(a, b)
        }
        BinaryOp::Mod => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            let divisor = to_int(b);
            if divisor == 0 {
                return Err(OperatorError::ModuloByZero);
            }
            Ok(Value::Int(to_int(a).wrapping_rem(divisor)))
        }
        BinaryOp::Pow => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            Ok(power(a, b))
        }
        BinaryOp::Concat => {
            Ok(Value::String(left.to_php_string().concat(&right.to_php_string())))
        }
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
            let (a, b) = numeric_operands(symbol, left, right)?;
            shift(op, to_int(a), to_int(b))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => bitwise(op, left, right),
        BinaryOp::BooleanAnd | BinaryOp::LogicalAnd => {
            Ok(Value::Bool(left.to_bool() && right.to_bool()))
        }
        BinaryOp::BooleanOr | BinaryOp::LogicalOr => {
            Ok(Value::Bool(left.to_bool() || right.to_bool()))
        }
        BinaryOp::LogicalXor => Ok(Value::Bool(left.to_bool() != right.to_bool())),
        BinaryOp::Equal => Ok(Value::Bool(loose_equals(left, right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!loose_equals(left, right))),
        BinaryOp::Identical => Ok(Value::Bool(left == right)),
        BinaryOp::NotIdentical => Ok(Value::Bool(left != right)),
        BinaryOp::Less => Ok(Value::Bool(compare(left, right) == Some(Ordering::Less))),
        BinaryOp::LessEqual => {
            Ok(Value::Bool(matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal))))
        }
        BinaryOp::Greater => Ok(Value::Bool(compare(right, left) == Some(Ordering::Less))),
        BinaryOp::GreaterEqual => {
            Ok(Value::Bool(matches!(compare(right, left), Some(Ordering::Less | Ordering::Equal))))
        }
        BinaryOp::Spaceship => Ok(Value::Int(match compare(left, right) {
            Some(Ordering::Less) => -1,
            Some(Ordering::Equal) => 0,
            _ => 1,
        })),
        BinaryOp::Coalesce | BinaryOp::Instanceof => Err(OperatorError::NotConstantOperator(symbol)),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> OperatorResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.to_bool())),
        UnaryOp::Plus => Ok(to_number("+", operand)?.into()),
        UnaryOp::Neg => Ok(match to_number("-", operand)? {
            Number::Int(i) => i.checked_neg().map_or(Value::Float(-(i as f64)), Value::Int),
            Number::Float(f) => Value::Float(-f),
        }),
        UnaryOp::BitNot => match operand {
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Float(f) => Ok(Value::Int(!to_int(Number::Float(*f)))),
            Value::String(s) => {
                let bytes: Vec<u8> = s.as_bytes().iter().map(|b| !b).collect();
                Ok(Value::from(bytes))
            }
            other => Err(OperatorError::UnsupportedOperand { op: "~", operand: other.type_name() }),
        },
    }
}

/// `==` under the host's loose comparison rules.
pub fn loose_equals(left: &Value, right: &Value) -> bool {
    compare(left, right) == Some(Ordering::Equal)
}

/// Loose three-way comparison; `None` when the operands are uncomparable
/// (NaN, or arrays with differing keys).
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(_), _) | (_, Value::Bool(_)) => Some(left.to_bool().cmp(&right.to_bool())),
        (Value::Null, Value::String(s)) => {
            Some(if s.is_empty() { Ordering::Equal } else { Ordering::Less })
        }
        (Value::String(s), Value::Null) => {
            Some(if s.is_empty() { Ordering::Equal } else { Ordering::Greater })
        }
        (Value::Null, _) | (_, Value::Null) => Some(left.to_bool().cmp(&right.to_bool())),
        (Value::String(a), Value::String(b)) => compare_strings(a, b),
        (Value::Array(a), Value::Array(b)) => compare_arrays(a, b),
        (Value::Array(_), _) => Some(Ordering::Greater),
        (_, Value::Array(_)) => Some(Ordering::Less),
        (Value::String(s), _) => {
            number_of(right).and_then(|n| compare_number_string(n, s)).map(Ordering::reverse)
        }
        (_, Value::String(s)) => number_of(left).and_then(|n| compare_number_string(n, s)),
        _ => compare_numbers(number_of(left)?, number_of(right)?),
    }
}

fn number_of(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn compare_strings(a: &PhpString, b: &PhpString) -> Option<Ordering> {
    match (parse_numeric(a.as_bytes()), parse_numeric(b.as_bytes())) {
        (Some((x, true)), Some((y, true))) => compare_numbers(x, y),
        _ => Some(a.as_bytes().cmp(b.as_bytes())),
    }
}

/// A number against a non-numeric string compares as strings.
fn compare_number_string(number: Number, text: &PhpString) -> Option<Ordering> {
    match parse_numeric(text.as_bytes()) {
        Some((parsed, true)) => compare_numbers(number, parsed),
        _ => Some(Value::from(number).to_php_string().as_bytes().cmp(text.as_bytes())),
    }
}

fn compare_arrays(a: &PhpArray, b: &PhpArray) -> Option<Ordering> {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        unequal => return Some(unequal),
    }
    for (key, value) in a.iter() {
        let other = b.get(key)?;
        match compare(value, other)? {
            Ordering::Equal => continue,
            unequal => return Some(unequal),
        }
    }
    Some(Ordering::Equal)
}

fn to_number(op: &'static str, value: &Value) -> OperatorResult<Number> {
    match value {
        Value::Null => Ok(Number::Int(0)),
        Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        Value::String(s) => parse_numeric(s.as_bytes())
            .map(|(number, _)| number)
            .ok_or_else(|| OperatorError::NonNumeric { op, value: s.to_string() }),
        Value::Array(_) => Err(OperatorError::UnsupportedOperand { op, operand: "array" }),
    }
}

fn numeric_operands(
    op: &'static str,
    left: &Value,
    right: &Value,
) -> OperatorResult<(Number, Number)> {
    if matches!(left, Value::Array(_)) || matches!(right, Value::Array(_)) {
        return Err(OperatorError::UnsupportedOperands {
            op,
            left: left.type_name(),
            right: right.type_name(),
        });
    }
    Ok((to_number(op, left)?, to_number(op, right)?))
}

fn to_int(number: Number) -> i64 {
    match number {
        Number::Int(i) => i,
        Number::Float(f) if f.is_finite() => f.trunc() as i64,
        Number::Float(_) => 0,
    }
}

fn add(a: Number, b: Number) -> Value {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            x.checked_add(y).map_or(Value::Float(x as f64 + y as f64), Value::Int)
        }
        _ => Value::Float(a.as_f64() + b.as_f64()),
    }
}

fn divide(a: Number, b: Number) -> OperatorResult<Value> {
    if b.as_f64() == 0.0 {
        return Err(OperatorError::DivisionByZero);
    }
    Ok(match (a, b) {
        (Number::Int(x), Number::Int(y)) if x.checked_rem(y) == Some(0) => {
            x.checked_div(y).map_or(Value::Float(x as f64 / y as f64), Value::Int)
        }
        _ => Value::Float(a.as_f64() / b.as_f64()),
    })
}

fn power(a: Number, b: Number) -> Value {
    if let (Number::Int(base), Number::Int(exp)) = (a, b) {
        if exp >= 0 {
            if let Some(result) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                return Value::Int(result);
            }
        }
    }
    Value::Float(a.as_f64().powf(b.as_f64()))
}

fn shift(op: BinaryOp, value: i64, by: i64) -> OperatorResult<Value> {
    if by < 0 {
        return Err(OperatorError::NegativeShift);
    }
    let shifted = match op {
        BinaryOp::ShiftLeft if by >= 64 => 0,
        BinaryOp::ShiftLeft => ((value as u64) << by) as i64,
        _ if by >= 64 => {
            if value < 0 {
                -1
            } else {
                0
            }
        }
        _ => value >> by,
    };
    Ok(Value::Int(shifted))
}

fn bitwise(op: BinaryOp, left: &Value, right: &Value) -> OperatorResult<Value> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(Value::String(bytewise(op, a.as_bytes(), b.as_bytes())));
    }
    let (a, b) = numeric_operands(op.symbol(), left, right)?;
    let (x, y) = (to_int(a), to_int(b));
    Ok(Value::Int(match op {
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        _ => x ^ y,
    }))
}

/// `&` and `^` stop at the shorter operand; `|` keeps the longer tail.
fn bytewise(op: BinaryOp, a: &[u8], b: &[u8]) -> PhpString {
    let bytes: Vec<u8> = match op {
        BinaryOp::BitOr => {
            let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
            long.iter()
                .enumerate()
                .map(|(i, &byte)| short.get(i).map_or(byte, |&other| byte | other))
                .collect()
        }
        BinaryOp::BitAnd => a.iter().zip(b).map(|(x, y)| x & y).collect(),
        _ => a.iter().zip(b).map(|(x, y)| x ^ y).collect(),
    };
    PhpString::from(bytes)
}

fn union(left: &PhpArray, right: &PhpArray) -> PhpArray {
    let mut result = left.clone();
    for (key, value) in right.iter() {
        if !result.contains_key(key) {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}
