//! Statement execution
//!
//! Adds `impl Interpreter` methods for every statement form. Each statement
//! that changes visible state finishes by emitting exactly one Step:
//!
//! - declarations (one Step per declarator, locals and globals alike)
//! - assignments and expression statements (including `printf`/`scanf`)
//! - `if`: entering a branch; the condition alone is not a Step
//! - `break`, `continue`, `return`
//!
//! Loops live in [`super::loops`], function entry and exit in
//! [`super::engine`].

use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::table::AllocKind;
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter<'_> {
    pub(crate) fn execute_statement_inner(&mut self, stmt: &AstNode) -> Result<Flow, RuntimeError> {
        match stmt {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                let description = self.execute_var_decl(name, var_type, init.as_deref(), *location)?;
                self.emit(location.line, description, None)?;
                Ok(Flow::Normal)
            }

            AstNode::ArrayDecl {
                name,
                elem_type,
                size,
                init,
                location,
            } => {
                let description =
                    self.execute_array_decl(name, elem_type, *size, init.as_deref(), *location)?;
                self.emit(location.line, description, None)?;
                Ok(Flow::Normal)
            }

            AstNode::Assignment {
                target,
                op,
                value,
                location,
            } => {
                let stored = self.execute_assignment(target, *op, value, *location)?;
                self.emit(
                    location.line,
                    format!("assign {} = {}", target.render(), stored),
                    None,
                )?;
                Ok(Flow::Normal)
            }

            AstNode::ExpressionStatement { expr, location } => {
                let description = self.execute_expression_statement(expr)?;
                self.emit(location.line, description, None)?;
                Ok(Flow::Normal)
            }

            AstNode::Block { statements, .. } => self.execute_scoped(statements),

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => {
                if self.evaluate_condition(condition, *location)? {
                    self.emit(
                        location.line,
                        format!("condition {} is true, entering if branch", condition.render()),
                        None,
                    )?;
                    self.execute_scoped(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.emit(
                        location.line,
                        format!("condition {} is false, entering else branch", condition.render()),
                        None,
                    )?;
                    self.execute_scoped(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            AstNode::While {
                condition,
                body,
                location,
            } => self.execute_while(condition, body, *location),

            AstNode::For {
                init,
                condition,
                increment,
                body,
                location,
            } => self.execute_for(
                init.as_deref(),
                condition.as_deref(),
                increment.as_deref(),
                body,
                *location,
            ),

            AstNode::Return { expr, location } => self.execute_return(expr.as_deref(), *location),

            AstNode::Break { location } => {
                self.emit(location.line, "break".to_string(), None)?;
                Ok(Flow::Break)
            }

            AstNode::Continue { location } => {
                self.emit(location.line, "continue".to_string(), None)?;
                Ok(Flow::Continue)
            }

            // Struct and function definitions are indexed up front
            AstNode::StructDecl { .. } | AstNode::FunctionDecl { .. } => Ok(Flow::Normal),

            other => {
                let description = self.execute_expression_statement(other)?;
                self.emit(other.location().line, description, None)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Whether declarations currently land in the global scope
    fn at_file_scope(&self) -> bool {
        self.env.stack.is_empty()
    }

    /// Allocate and bind a scalar in the innermost scope
    pub(crate) fn declare_scalar(&mut self, name: &str, ty: &Type, value: Value) {
        let address = self.env.memory.allocate(AllocKind::Scalar, ty, 1, value);
        self.env.declare(name, address);
    }

    pub(crate) fn execute_var_decl(
        &mut self,
        name: &str,
        var_type: &Type,
        init: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        let value = match init {
            Some(expr) => {
                let value = self.evaluate_expr(expr)?;
                self.require_defined(value, expr)?;
                self.convert_for_store(value, var_type, location)?
            }
            // C zero-initializes file-scope variables; locals hold garbage
            None if self.at_file_scope() => Value::zero_for(var_type),
            None => Value::Undefined,
        };

        self.declare_scalar(name, var_type, value);

        let scope = if self.at_file_scope() { "global " } else { "" };
        Ok(match value {
            Value::Undefined => format!("declare {}{} {}", scope, var_type, name),
            _ => format!("declare {}{} {} = {}", scope, var_type, name, value),
        })
    }

    pub(crate) fn execute_array_decl(
        &mut self,
        name: &str,
        elem_type: &Type,
        size: usize,
        init: Option<&[AstNode]>,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        let global = self.at_file_scope();
        let fill = if global || init.is_some() {
            // a partial initializer list zero-fills the rest, as in C
            Value::zero_for(elem_type)
        } else {
            Value::Undefined
        };

        let mut values = Vec::with_capacity(init.map_or(0, <[AstNode]>::len));
        for expr in init.unwrap_or_default() {
            let value = self.evaluate_expr(expr)?;
            self.require_defined(value, expr)?;
            values.push(self.convert_for_store(value, elem_type, location)?);
        }

        let base = self
            .env
            .memory
            .allocate(AllocKind::Array, elem_type, size, fill);
        for (i, value) in values.iter().enumerate() {
            self.write_slot(base + i as u64, *value, location)?;
        }
        self.env.declare(name, base);

        let scope = if global { "global " } else { "" };
        Ok(if init.is_some() {
            let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
            format!(
                "declare {}{} {}[{}] = {{{}}}",
                scope,
                elem_type,
                name,
                size,
                rendered.join(", ")
            )
        } else {
            format!("declare {}{} {}[{}]", scope, elem_type, name, size)
        })
    }

    /// Run an expression for its effect and describe what it did
    fn execute_expression_statement(&mut self, expr: &AstNode) -> Result<String, RuntimeError> {
        match expr {
            AstNode::PrintCall {
                format,
                args,
                location,
            } => {
                let text = self.execute_print(format, args, *location)?;
                Ok(format!("print {:?}", text))
            }
            AstNode::ReadCall {
                format,
                targets,
                location,
            } => {
                let bound = self.execute_read(format, targets, *location)?.bound;
                if bound.is_empty() {
                    Ok("read (no value bound)".to_string())
                } else {
                    let parts: Vec<String> = bound
                        .iter()
                        .map(|(name, value)| format!("{} = {}", name, value))
                        .collect();
                    Ok(format!("read {}", parts.join(", ")))
                }
            }
            AstNode::UnaryExpr {
                op: op @ (UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec),
                operand,
                location,
            } => {
                let (_, stored) = self.execute_increment(*op, operand, *location)?;
                Ok(format!("update {} = {}", operand.render(), stored))
            }
            AstNode::Call { name, .. } => {
                let value = self.evaluate_expr(expr)?;
                match value {
                    Value::Undefined => Ok(format!("call {}", expr.render())),
                    _ => Ok(format!("call {} returned {}", name, value)),
                }
            }
            _ => {
                let value = self.evaluate_expr(expr)?;
                Ok(format!("evaluate {} = {}", expr.render(), value))
            }
        }
    }

    fn execute_return(
        &mut self,
        expr: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        let return_type = self.current_return_type();
        let value = match (expr, return_type) {
            (Some(expr), Some(ty)) if ty.base != BaseType::Void || ty.is_pointer() => {
                let value = self.evaluate_expr(expr)?;
                self.require_defined(value, expr)?;
                self.convert_for_store(value, ty, location)?
            }
            (Some(expr), _) => {
                return Err(RuntimeError::type_mismatch(
                    "no return value",
                    expr.render(),
                    location,
                ))
            }
            (None, _) => Value::Undefined,
        };

        let description = match value {
            Value::Undefined => "return".to_string(),
            _ => format!("return {}", value),
        };
        let shown = value.is_defined().then_some(value);
        self.emit(location.line, description, shown)?;
        Ok(Flow::Return(value))
    }
}
