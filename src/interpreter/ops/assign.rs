//! Assignment and increment/decrement
//!
//! Both write back through a resolved [`Place`](crate::interpreter::memory_ops::Place)
//! and convert the result to the place's declared type, so `char c = 300`
//! wraps and `int n = 2.9` truncates exactly as a store in C would.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::ops::binary::binary_op;
use crate::memory::value::Value;
use crate::parser::ast::{AstNode, BinOp, SourceLocation, UnOp};

impl Interpreter<'_> {
    /// `target = value` or `target op= value`; returns the stored value
    pub(crate) fn execute_assignment(
        &mut self,
        target: &AstNode,
        op: Option<BinOp>,
        value: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let rhs = self.evaluate_operand(value)?;
        let place = self.resolve_place(target)?;

        let new_value = match op {
            Some(op) => {
                let current = self.read_place(&place, target)?;
                binary_op(op, current, rhs, location)?
            }
            None => rhs,
        };

        self.write_place(&place, new_value, location)
    }

    /// `++x`, `--x`, `x++`, `x--`
    ///
    /// Returns the expression's value and the value written back. The operand
    /// is resolved once, so side effects inside it (`a[i++]++`) happen once.
    pub(crate) fn execute_increment(
        &mut self,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<(Value, Value), RuntimeError> {
        let place = self.resolve_place(operand)?;
        let old = self.read_place(&place, operand)?;

        let step = match op {
            UnOp::PreInc | UnOp::PostInc => BinOp::Add,
            UnOp::PreDec | UnOp::PostDec => BinOp::Sub,
            UnOp::Neg | UnOp::Not => {
                return Err(RuntimeError::type_mismatch(
                    "increment or decrement",
                    format!("{:?}", op),
                    location,
                ))
            }
        };
        let new = binary_op(step, old, Value::Int(1), location)?;
        let stored = self.write_place(&place, new, location)?;

        let result = match op {
            UnOp::PostInc | UnOp::PostDec => old,
            _ => stored,
        };
        Ok((result, stored))
    }
}
