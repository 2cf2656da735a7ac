//! Expression evaluation implementation
//!
//! This module handles evaluation of all C expression types, including:
//!
//! - Literals (integers, floats, characters, `NULL`)
//! - Variables, array subscripts, dereferences and node field access
//! - Binary operators with short-circuit `&&` and `||`
//! - Unary operators, including the four increment/decrement forms
//! - Function calls (user-defined and `free`)
//! - Casts, `sizeof`, node allocation and formatted I/O
//!
//! Reads go through [`Place`](super::memory_ops::Place) resolution, so every
//! access is checked against the memory table. Evaluation never records a
//! Step by itself; the enclosing statement (or a called function) does.

use crate::interpreter::constants::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::ops::{binary::binary_op, unary::unary_op};
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter<'_> {
    /// Evaluate an expression and return its value
    pub(crate) fn evaluate_expr(&mut self, expr: &AstNode) -> Result<Value, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &AstNode) -> Result<Value, RuntimeError> {
        match expr {
            AstNode::IntLiteral(n, _) => Ok(Value::Int(*n)),

            AstNode::FloatLiteral(x, _) => Ok(Value::Float(*x)),

            AstNode::CharLiteral(c, _) => Ok(Value::Char(*c)),

            AstNode::Null { .. } => Ok(Value::NULL),

            AstNode::Variable(..)
            | AstNode::Index { .. }
            | AstNode::Deref { .. }
            | AstNode::FieldAccess { .. } => {
                let place = self.resolve_place(expr)?;
                if place.array_len.is_none() && place.ty.struct_name().is_some() && !place.ty.is_pointer() {
                    return Err(RuntimeError::type_mismatch(
                        "scalar value",
                        place.ty.to_string(),
                        expr.location(),
                    ));
                }
                self.read_place(&place, expr)
            }

            AstNode::BinaryExpr {
                op: op @ (BinOp::And | BinOp::Or),
                left,
                right,
                location,
            } => {
                let lhs = self.evaluate_operand(left)?;
                // the right side only runs when the left does not decide
                match (op, lhs.is_truthy()) {
                    (BinOp::And, Some(false)) => Ok(Value::Int(0)),
                    (BinOp::Or, Some(true)) => Ok(Value::Int(1)),
                    _ => {
                        let rhs = self.evaluate_operand(right)?;
                        binary_op(*op, lhs, rhs, *location)
                    }
                }
            }

            AstNode::BinaryExpr {
                op,
                left,
                right,
                location,
            } => {
                let lhs = self.evaluate_operand(left)?;
                let rhs = self.evaluate_operand(right)?;
                binary_op(*op, lhs, rhs, *location)
            }

            AstNode::UnaryExpr {
                op: op @ (UnOp::Neg | UnOp::Not),
                operand,
                location,
            } => {
                let value = self.evaluate_operand(operand)?;
                unary_op(*op, value, *location)
            }

            AstNode::UnaryExpr {
                op,
                operand,
                location,
            } => Ok(self.execute_increment(*op, operand, *location)?.0),

            AstNode::AddressOf { operand, .. } => {
                let place = self.resolve_place(operand)?;
                Ok(Value::Address(place.address))
            }

            AstNode::Call {
                name,
                args,
                location,
            } => self.execute_call(name, args, *location),

            AstNode::Cast {
                target_type,
                expr: inner,
                location,
            } => {
                let value = self.evaluate_operand(inner)?;
                value.convert_to(target_type).ok_or_else(|| {
                    RuntimeError::type_mismatch(
                        format!("value convertible to {}", target_type),
                        value.type_name(),
                        *location,
                    )
                })
            }

            AstNode::SizeofType { target_type, .. } => {
                Ok(Value::Int(self.env.sizeof(target_type) as i32))
            }

            AstNode::SizeofExpr { expr: inner, .. } => {
                Ok(Value::Int(self.sizeof_expr(inner)? as i32))
            }

            AstNode::NewNode {
                struct_name,
                location,
            } => self.execute_new_node(struct_name, *location),

            AstNode::PrintCall {
                format,
                args,
                location,
            } => {
                let text = self.execute_print(format, args, *location)?;
                Ok(Value::Int(text.len() as i32))
            }

            AstNode::ReadCall {
                format,
                targets,
                location,
            } => {
                let read = self.execute_read(format, targets, *location)?;
                Ok(Value::Int(read.count))
            }

            other => Err(RuntimeError::type_mismatch(
                "expression",
                other.render(),
                other.location(),
            )),
        }
    }

    /// Evaluate an operand that must carry a value (not a `void` call)
    pub(crate) fn evaluate_operand(&mut self, expr: &AstNode) -> Result<Value, RuntimeError> {
        let value = self.evaluate_expr(expr)?;
        self.require_defined(value, expr)?;
        Ok(value)
    }

    /// Evaluate an expression for its truth value
    pub(crate) fn evaluate_condition(
        &mut self,
        expr: &AstNode,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        let value = self.evaluate_operand(expr)?;
        value
            .is_truthy()
            .ok_or_else(|| RuntimeError::type_mismatch("condition", value.type_name(), location))
    }

    /// Evaluate call arguments left to right, then call
    fn execute_call(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_operand(arg)?);
        }

        if name == "free" {
            return self.execute_free(&values, location);
        }

        let func = self.function(name, location)?;
        self.call_function(func, values, location.line, location)
    }
}
