//! Pure expression evaluation.
//!
//! Number literal scaling and arithmetic live here so that full
//! interpretation and eager evaluation agree on every result. Nothing in
//! this module touches the host.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crisp_types::Value;

use crate::ast::{BinaryOp, Node, NodeKind, NumberLiteral};
use crate::bindings::{BindingSpace, BindingsManager, Memo};

/// Errors that can occur during pure evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Operand of an arithmetic operator is not a number.
    NotANumber { op: BinaryOp, got: &'static str },
    DivisionByZero,
    /// Exponent is negative or does not fit in 32 bits.
    ExponentRange(String),
    /// More decimal places than the `eN` power can absorb: `1.55e1`.
    FractionalDigits(String),
    InvalidNumber(String),
    /// Result would not fit in [`MAX_BITS`] bits.
    Overflow(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::NotANumber { op, got } => {
                write!(f, "operator '{op}' expects numbers, got {got}")
            }
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::ExponentRange(exp) => {
                write!(f, "exponent must be a non-negative 32-bit integer, got {exp}")
            }
            EvalError::FractionalDigits(n) => {
                write!(f, "number {n} has more decimal places than its power allows")
            }
            EvalError::InvalidNumber(n) => write!(f, "invalid number: {n}"),
            EvalError::Overflow(what) => {
                write!(f, "{what} exceeds the {MAX_BITS}-bit number range")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Magnitude limit for every number: amounts are 256-bit words.
pub const MAX_BITS: u64 = 256;

/// Largest `eN` power that stays within [`MAX_BITS`]: 10^77 < 2^256.
const MAX_POWER: u32 = 77;

fn bounded(value: BigInt, what: impl fmt::Display) -> EvalResult<BigInt> {
    if value.bits() > MAX_BITS {
        return Err(EvalError::Overflow(what.to_string()));
    }
    Ok(value)
}

/// Value of a number literal: mantissa × 10^power × unit seconds.
pub fn number_literal(literal: &NumberLiteral) -> EvalResult<BigInt> {
    let (int_part, frac_part) = literal
        .value
        .split_once('.')
        .unwrap_or((literal.value.as_str(), ""));
    let power = literal.power.unwrap_or(0);
    let frac_digits = frac_part.len() as u32;
    if frac_digits > power {
        return Err(EvalError::FractionalDigits(literal.to_string()));
    }

    let digits = format!("{int_part}{frac_part}");
    let mantissa: BigInt = digits
        .parse()
        .map_err(|_| EvalError::InvalidNumber(literal.to_string()))?;
    let scale = power - frac_digits;
    if scale > MAX_POWER || mantissa.bits() > MAX_BITS {
        return Err(EvalError::Overflow(literal.to_string()));
    }
    let mut value = mantissa * BigInt::from(10u32).pow(scale);
    if let Some(unit) = literal.unit {
        value *= BigInt::from(unit.seconds());
    }
    bounded(value, literal)
}

/// Apply an arithmetic operator. Division truncates toward zero.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<BigInt> {
    let (l, r) = match (left, right) {
        (Value::Number(l), Value::Number(r)) => (l, r),
        (Value::Number(_), other) | (other, _) => {
            return Err(EvalError::NotANumber {
                op,
                got: other.type_name(),
            });
        }
    };

    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div if r.is_zero() => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => l / r,
        BinaryOp::Pow => {
            let exp = r.to_u32().ok_or_else(|| EvalError::ExponentRange(r.to_string()))?;
            // |l| >= 2^(bits - 1), so the result has at least (bits - 1) * exp bits.
            if l.bits() > 1 && (l.bits() - 1) * u64::from(exp) >= MAX_BITS {
                return Err(EvalError::Overflow(format!("{l} {op} {r}")));
            }
            l.pow(exp)
        }
    };
    bounded(result, format_args!("{l} {op} {r}"))
}

/// Statically evaluate a node against known bindings.
///
/// Returns `None` whenever the value depends on something only full
/// interpretation can know: helpers, calls, unbound or absent variables,
/// or an evaluation error.
pub fn eval_pure(node: &Node, bindings: &BindingsManager) -> Option<Value> {
    match &node.kind {
        NodeKind::Address(a) => Some(Value::Address(*a)),
        NodeKind::Bool(b) => Some(Value::Bool(*b)),
        NodeKind::Bytes(b) => Some(Value::Bytes(b.clone())),
        NodeKind::String(s) => Some(Value::String(s.clone())),
        NodeKind::Number(n) => number_literal(n).ok().map(Value::Number),
        NodeKind::Array(items) => items
            .iter()
            .map(|item| eval_pure(item, bindings))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        NodeKind::Binary { op, left, right } => {
            let l = eval_pure(left, bindings)?;
            let r = eval_pure(right, bindings)?;
            binary(*op, &l, &r).ok().map(Value::Number)
        }
        NodeKind::Variable(name) => bindings
            .get_binding_value(name, BindingSpace::User)
            .value()
            .cloned(),
        NodeKind::Identifier(id) => match bindings.get_binding_value(id, BindingSpace::Address) {
            Memo::Present(value) => Some(value.clone()),
            Memo::Absent => None,
            Memo::Unset => Some(Value::String(id.clone())),
        },
        NodeKind::As { left, .. } => eval_pure(left, bindings),
        NodeKind::Block(_) | NodeKind::Call { .. } | NodeKind::Helper { .. } => None,
    }
}
