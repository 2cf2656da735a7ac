// Execution engine for the tracing interpreter

use crate::config::TraceConfig;
use crate::interpreter::cancel::CancelToken;
use crate::interpreter::constants::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatter::InputBuffer;
use crate::memory::stack::StackFrame;
use crate::memory::value::Value;
use crate::memory::Environment;
use crate::parser::ast::*;
use crate::snapshot::capture::{capture, StepContext};
use crate::snapshot::{Console, TraceAssembler, TraceResult};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// How a statement finished
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// A function definition borrowed from the program
#[derive(Debug, Clone, Copy)]
pub(crate) struct FunctionRef<'a> {
    pub name: &'a str,
    pub params: &'a [Param],
    pub body: &'a [AstNode],
    pub return_type: &'a Type,
    pub location: SourceLocation,
    pub end_location: SourceLocation,
}

/// Executes one program against one stdin buffer, recording a Step at every
/// point of visible progress
///
/// An interpreter is single-use: [`Interpreter::run`] consumes it and returns
/// the finished [`TraceResult`].
pub struct Interpreter<'a> {
    pub(crate) program: &'a Program,
    pub(crate) functions: FxHashMap<&'a str, FunctionRef<'a>>,
    source_lines: Vec<&'a str>,
    pub(crate) env: Environment,
    pub(crate) console: Console,
    pub(crate) input: InputBuffer,
    trace: TraceAssembler,
    max_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        program: &'a Program,
        source: &'a str,
        stdin: &str,
        config: &TraceConfig,
        cancel: CancelToken,
    ) -> Self {
        let mut struct_defs = FxHashMap::default();
        let mut functions = FxHashMap::default();

        for node in &program.nodes {
            match node {
                AstNode::StructDecl { name, fields, .. } => {
                    struct_defs.insert(
                        name.clone(),
                        StructDef {
                            name: name.clone(),
                            fields: fields.clone(),
                        },
                    );
                }
                AstNode::FunctionDecl {
                    name,
                    params,
                    body,
                    return_type,
                    location,
                    end_location,
                } => {
                    functions.insert(
                        name.as_str(),
                        FunctionRef {
                            name,
                            params,
                            body,
                            return_type,
                            location: *location,
                            end_location: *end_location,
                        },
                    );
                }
                _ => {}
            }
        }

        Interpreter {
            program,
            functions,
            source_lines: source.lines().collect(),
            env: Environment::new(struct_defs),
            console: Console::new(),
            input: InputBuffer::new(stdin),
            trace: TraceAssembler::new(
                config.step_budget,
                config.snapshot_memory_limit,
                cancel,
            ),
            max_depth: config.max_recursion_depth,
        }
    }

    /// Run the program from start to finish
    pub fn run(mut self) -> TraceResult {
        info!(
            functions = self.functions.len(),
            max_depth = self.max_depth,
            "trace started"
        );
        let outcome = self.execute();
        self.trace.finish(outcome)
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        let program = self.program;

        // Globals are initialized in source order before main is entered
        for node in &program.nodes {
            if matches!(node, AstNode::VarDecl { .. } | AstNode::ArrayDecl { .. }) {
                self.execute_statement(node)?;
            }
        }

        let main = self
            .functions
            .get("main")
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: "main".to_string(),
                location: SourceLocation::new(1, 1),
            })?;

        self.call_function(main, Vec::new(), 0, main.location)?;
        Ok(())
    }

    /// Record a Step for the current state
    pub(crate) fn emit(
        &mut self,
        line: usize,
        description: String,
        return_value: Option<Value>,
    ) -> Result<(), RuntimeError> {
        let ordinal = self.trace.reserve()?;
        let code = self
            .source_lines
            .get(line.wrapping_sub(1))
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        let ctx = StepContext {
            line,
            code,
            description,
            return_value,
        };
        let step = capture(&self.env, self.console.snapshot(), ordinal, ctx);
        self.trace.push(step)
    }

    /// Execute a statement, growing the native stack when deep recursion
    /// gets close to its end
    pub(crate) fn execute_statement(&mut self, stmt: &AstNode) -> Result<Flow, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.execute_statement_inner(stmt)
        })
    }

    /// Execute statements in order until one leaves the normal flow
    pub(crate) fn execute_statements(&mut self, stmts: &[AstNode]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            let flow = self.execute_statement(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Execute statements in a fresh block scope
    pub(crate) fn execute_scoped(&mut self, stmts: &[AstNode]) -> Result<Flow, RuntimeError> {
        self.env.push_scope();
        let flow = self.execute_statements(stmts);
        self.env.pop_scope();
        flow
    }

    /// Look up a user-defined function
    pub(crate) fn function(&self, name: &str, location: SourceLocation) -> Result<FunctionRef<'a>, RuntimeError> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })
    }

    /// Call a user-defined function with already-evaluated arguments
    ///
    /// Emits the entry Step once the parameters are bound, and an exit Step
    /// when the body falls off its closing brace. `return` statements emit
    /// their own Step while the frame is still live.
    pub(crate) fn call_function(
        &mut self,
        func: FunctionRef<'a>,
        args: Vec<Value>,
        call_line: usize,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if self.env.depth() >= self.max_depth {
            return Err(RuntimeError::RecursionDepthExceeded {
                limit: self.max_depth,
                function: func.name.to_string(),
                location,
            });
        }

        if args.len() != func.params.len() {
            return Err(RuntimeError::type_mismatch(
                format!("{} argument(s) to {}", func.params.len(), func.name),
                format!("{}", args.len()),
                location,
            ));
        }

        self.env.push_frame(StackFrame::new(
            func.name.to_string(),
            call_line,
            func.location.line,
        ));
        debug!(function = func.name, depth = self.env.depth(), "enter");

        let mut bound = Vec::with_capacity(args.len());
        for (param, arg) in func.params.iter().zip(args) {
            let value = self.convert_for_store(arg, &param.param_type, location)?;
            self.declare_scalar(&param.name, &param.param_type, value);
            bound.push(format!("{} = {}", param.name, value));
        }
        self.emit(
            func.location.line,
            format!("enter {}({})", func.name, bound.join(", ")),
            None,
        )?;

        let result = match self.execute_statements(func.body)? {
            Flow::Return(value) => value,
            _ => {
                let value = if func.name == "main" {
                    Value::Int(0)
                } else {
                    Value::Undefined
                };
                self.emit(
                    func.end_location.line,
                    format!("exit {}", func.name),
                    None,
                )?;
                value
            }
        };

        self.env.pop_frame();
        debug!(function = func.name, depth = self.env.depth(), returned = %result, "exit");
        Ok(result)
    }

    /// Convert a value to a declared type, failing when C has no conversion
    pub(crate) fn convert_for_store(
        &self,
        value: Value,
        ty: &Type,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        value
            .convert_to(ty)
            .ok_or_else(|| RuntimeError::type_mismatch(ty.to_string(), value.type_name(), location))
    }

    /// Return type of the function whose frame is on top of the stack
    pub(crate) fn current_return_type(&self) -> Option<&'a Type> {
        let frame = self.env.stack.current_frame()?;
        self.functions
            .get(frame.function_name.as_str())
            .map(|f| f.return_type)
    }
}
