//! Unary operator evaluation

use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::{SourceLocation, UnOp};

/// Apply `-` or `!` to an evaluated operand
///
/// Increment and decrement need a place to write back and are handled by
/// [`Interpreter::execute_increment`](crate::interpreter::engine::Interpreter).
pub(crate) fn unary_op(op: UnOp, value: Value, location: SourceLocation) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnOp::Neg, Value::Char(c)) => Ok(Value::Int(-(c as i32))),
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Not, v) => v
            .is_truthy()
            .map(|truthy| Value::Int((!truthy) as i32))
            .ok_or_else(|| RuntimeError::type_mismatch("scalar", v.type_name(), location)),
        (_, v) => Err(RuntimeError::type_mismatch("number", v.type_name(), location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_and_not() {
        let loc = SourceLocation::new(1, 1);
        assert_eq!(unary_op(UnOp::Neg, Value::Int(5), loc), Ok(Value::Int(-5)));
        assert_eq!(unary_op(UnOp::Neg, Value::Float(0.5), loc), Ok(Value::Float(-0.5)));
        assert_eq!(unary_op(UnOp::Not, Value::Int(0), loc), Ok(Value::Int(1)));
        assert_eq!(unary_op(UnOp::Not, Value::Address(12), loc), Ok(Value::Int(0)));
        assert!(unary_op(UnOp::Neg, Value::NULL, loc).is_err());
    }
}
