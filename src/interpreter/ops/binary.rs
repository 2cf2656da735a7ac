//! Binary operator evaluation
//!
//! Operands follow the usual arithmetic conversions of the subset: `char`
//! promotes to `int`, and if either side is floating the operation is done in
//! `f64`. Integer arithmetic wraps on overflow (two's complement). Pointer
//! arithmetic counts slots, so `p + 1` is the next element of an array.
//!
//! `&&` and `||` arrive here only when the left operand did not settle the
//! result; the evaluator skips the right operand otherwise.

use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::{BinOp, SourceLocation};
use std::cmp::Ordering;

/// Apply `op` to two evaluated operands
pub(crate) fn binary_op(
    op: BinOp,
    left: Value,
    right: Value,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic(op, left, right, location)
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(op, left, right, location)?;
            let result = match op {
                BinOp::Eq => ordering == Some(Ordering::Equal),
                BinOp::Ne => ordering != Some(Ordering::Equal),
                BinOp::Lt => ordering == Some(Ordering::Less),
                BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinOp::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };
            Ok(Value::Int(result as i32))
        }
        BinOp::And | BinOp::Or => {
            let (Some(a), Some(b)) = (left.is_truthy(), right.is_truthy()) else {
                return Err(mismatch(op, left, right, location));
            };
            let result = if op == BinOp::And { a && b } else { a || b };
            Ok(Value::Int(result as i32))
        }
    }
}

fn mismatch(op: BinOp, left: Value, right: Value, location: SourceLocation) -> RuntimeError {
    RuntimeError::type_mismatch(
        format!("operands valid for '{}'", op.symbol()),
        format!("{} and {}", left.type_name(), right.type_name()),
        location,
    )
}

fn division_by_zero(op: BinOp, location: SourceLocation) -> RuntimeError {
    RuntimeError::DivisionByZero {
        operation: if op == BinOp::Mod { "modulo" } else { "division" },
        location,
    }
}

fn arithmetic(
    op: BinOp,
    left: Value,
    right: Value,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        // Pointer arithmetic
        (Value::Address(addr), offset) if op == BinOp::Add || op == BinOp::Sub => {
            if let Value::Address(other) = offset {
                if op == BinOp::Sub {
                    return Ok(Value::Int(addr.wrapping_sub(other) as i64 as i32));
                }
                return Err(mismatch(op, left, right, location));
            }
            let n = offset
                .as_int()
                .ok_or_else(|| mismatch(op, left, right, location))? as i64;
            let n = if op == BinOp::Sub { -n } else { n };
            Ok(Value::Address(addr.wrapping_add_signed(n)))
        }
        (offset, Value::Address(addr)) if op == BinOp::Add => {
            let n = offset
                .as_int()
                .ok_or_else(|| mismatch(op, left, right, location))?;
            Ok(Value::Address(addr.wrapping_add_signed(n as i64)))
        }
        (Value::Address(_), _) | (_, Value::Address(_)) => Err(mismatch(op, left, right, location)),

        // Floating arithmetic
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(mismatch(op, left, right, location));
            };
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div if b == 0.0 => return Err(division_by_zero(op, location)),
                BinOp::Div => a / b,
                _ => return Err(mismatch(op, left, right, location)),
            };
            Ok(Value::Float(result))
        }

        // Integer arithmetic
        _ => {
            let (Some(a), Some(b)) = (left.as_int(), right.as_int()) else {
                return Err(mismatch(op, left, right, location));
            };
            let result = match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Mul => a.wrapping_mul(b),
                BinOp::Div | BinOp::Mod if b == 0 => return Err(division_by_zero(op, location)),
                BinOp::Div => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            };
            Ok(Value::Int(result))
        }
    }
}

/// Order two operands; `None` when they are unordered (NaN)
fn compare(
    op: BinOp,
    left: Value,
    right: Value,
    location: SourceLocation,
) -> Result<Option<Ordering>, RuntimeError> {
    match (left, right) {
        (Value::Address(a), Value::Address(b)) => Ok(Some(a.cmp(&b))),
        // the null pointer constant
        (Value::Address(a), Value::Int(0)) | (Value::Int(0), Value::Address(a))
            if matches!(op, BinOp::Eq | BinOp::Ne) =>
        {
            Ok(Some(if a == 0 { Ordering::Equal } else { Ordering::Greater }))
        }
        (Value::Address(_), _) | (_, Value::Address(_)) => Err(mismatch(op, left, right, location)),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(mismatch(op, left, right, location));
            };
            Ok(a.partial_cmp(&b))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_int(), right.as_int()) else {
                return Err(mismatch(op, left, right, location));
            };
            Ok(Some(a.cmp(&b)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::errors::RuntimeErrorKind;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    fn eval(op: BinOp, l: Value, r: Value) -> Result<Value, RuntimeError> {
        binary_op(op, l, r, loc())
    }

    #[test]
    fn test_integer_arithmetic_truncates_and_wraps() {
        assert_eq!(eval(BinOp::Div, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(eval(BinOp::Div, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-3)));
        assert_eq!(eval(BinOp::Mod, Value::Int(-7), Value::Int(3)), Ok(Value::Int(-1)));
        assert_eq!(
            eval(BinOp::Add, Value::Int(i32::MAX), Value::Int(1)),
            Ok(Value::Int(i32::MIN))
        );
        assert_eq!(
            eval(BinOp::Add, Value::Char(b'a' as i8), Value::Int(1)),
            Ok(Value::Int(98))
        );
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(eval(BinOp::Div, Value::Int(7), Value::Float(2.0)), Ok(Value::Float(3.5)));
        assert_eq!(eval(BinOp::Lt, Value::Float(1.5), Value::Int(2)), Ok(Value::Int(1)));
        assert!(eval(BinOp::Mod, Value::Float(1.0), Value::Int(2)).is_err());
    }

    #[test]
    fn test_logical_operands_after_left_side() {
        assert_eq!(eval(BinOp::And, Value::Int(3), Value::Float(0.5)), Ok(Value::Int(1)));
        assert_eq!(eval(BinOp::And, Value::Address(8), Value::Int(0)), Ok(Value::Int(0)));
        assert_eq!(eval(BinOp::Or, Value::Int(0), Value::Char(1)), Ok(Value::Int(1)));
        assert_eq!(eval(BinOp::Or, Value::Int(0), Value::Address(0)), Ok(Value::Int(0)));
        assert!(eval(BinOp::Or, Value::Int(0), Value::Undefined).is_err());
    }

    #[test]
    fn test_division_by_zero() {
        for (op, l, r) in [
            (BinOp::Div, Value::Int(1), Value::Int(0)),
            (BinOp::Mod, Value::Int(1), Value::Int(0)),
            (BinOp::Div, Value::Float(1.0), Value::Float(0.0)),
        ] {
            let err = eval(op, l, r).unwrap_err();
            assert_eq!(err.kind(), Some(RuntimeErrorKind::DivisionByZero));
        }
    }

    #[test]
    fn test_pointer_arithmetic_and_null_comparison() {
        assert_eq!(eval(BinOp::Add, Value::Address(16), Value::Int(2)), Ok(Value::Address(18)));
        assert_eq!(eval(BinOp::Add, Value::Int(2), Value::Address(16)), Ok(Value::Address(18)));
        assert_eq!(eval(BinOp::Sub, Value::Address(20), Value::Address(16)), Ok(Value::Int(4)));
        assert_eq!(eval(BinOp::Eq, Value::NULL, Value::Int(0)), Ok(Value::Int(1)));
        assert_eq!(eval(BinOp::Ne, Value::Address(8), Value::NULL), Ok(Value::Int(1)));
        assert!(eval(BinOp::Mul, Value::Address(8), Value::Int(2)).is_err());
        assert!(eval(BinOp::Lt, Value::Address(8), Value::Int(3)).is_err());
    }
}
