//! Loop statement execution (`while`, `for`).
//!
//! Every evaluation of a loop condition is a Step, including the final one
//! that ends the loop, so a loop with N iterations records N + 1 condition
//! Steps plus whatever its body emits. The `for` initializer and increment
//! run silently: their effect shows up in the next condition Step. A header
//! clause that prints or reads is the exception and records its own Step.
//!
//! The body runs in a fresh scope per iteration. `break` and `continue` are
//! consumed here; `return` is passed up to the enclosing call.

use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::{AstNode, SourceLocation};

/// What the loop driver does after one pass over the body
enum LoopBodyResult {
    Next,
    Break,
    Exit(Flow),
}

impl Interpreter<'_> {
    fn execute_loop_body(&mut self, body: &[AstNode]) -> Result<LoopBodyResult, RuntimeError> {
        Ok(match self.execute_scoped(body)? {
            Flow::Normal | Flow::Continue => LoopBodyResult::Next,
            Flow::Break => LoopBodyResult::Break,
            flow @ Flow::Return(_) => LoopBodyResult::Exit(flow),
        })
    }

    /// Evaluate a loop condition and record it as a Step
    fn check_loop_condition(
        &mut self,
        condition: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        let (holds, text) = match condition {
            Some(cond) => (self.evaluate_condition(cond, location)?, cond.render()),
            None => (true, String::from("(empty)")),
        };
        let verdict = if holds { "true" } else { "false" };
        self.emit(
            location.line,
            format!("loop condition {} is {}", text, verdict),
            None,
        )?;
        Ok(holds)
    }

    pub(crate) fn execute_while(
        &mut self,
        condition: &AstNode,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        while self.check_loop_condition(Some(condition), location)? {
            match self.execute_loop_body(body)? {
                LoopBodyResult::Next => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(flow) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn execute_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        // The init declaration is scoped to the loop
        self.env.push_scope();
        let flow = self.run_for(init, condition, increment, body, location);
        self.env.pop_scope();
        flow
    }

    fn run_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        if let Some(init) = init {
            self.execute_silently(init)?;
        }

        while self.check_loop_condition(condition, location)? {
            match self.execute_loop_body(body)? {
                LoopBodyResult::Next => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(flow) => return Ok(flow),
            }
            if let Some(increment) = increment {
                self.execute_silently(increment)?;
            }
        }
        Ok(Flow::Normal)
    }

    /// Run a `for` header clause without recording a Step, unless it does I/O
    fn execute_silently(&mut self, clause: &AstNode) -> Result<(), RuntimeError> {
        if clause.performs_io() {
            self.execute_statement(clause)?;
            return Ok(());
        }

        match clause {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                location,
            } => {
                self.execute_var_decl(name, var_type, init.as_deref(), *location)?;
            }
            AstNode::ArrayDecl {
                name,
                elem_type,
                size,
                init,
                location,
            } => {
                self.execute_array_decl(name, elem_type, *size, init.as_deref(), *location)?;
            }
            AstNode::Assignment {
                target,
                op,
                value,
                location,
            } => {
                self.execute_assignment(target, *op, value, *location)?;
            }
            AstNode::ExpressionStatement { expr, .. } => {
                self.evaluate_expr(expr)?;
            }
            other => {
                self.evaluate_expr(other)?;
            }
        }
        Ok(())
    }
}
