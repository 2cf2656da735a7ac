//! C interpreter execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`Interpreter`](engine::Interpreter), step emission and function calls
//! - [`errors`]: runtime error types
//! - [`formatter`]: `printf` rendering and `scanf` tokenizing
//! - [`cancel`]: whole-run cancellation
//! - [`constants`]: address-space layout and default limits
//!
//! Statement, loop, expression, lvalue, built-in and typing logic extend the
//! interpreter through `impl Interpreter` blocks in private modules.
//!
//! # Execution Model
//!
//! The interpreter walks the AST once, start to finish. Whenever a statement
//! makes visible progress it captures a Step, so the whole trace exists before
//! anything is displayed and can be navigated by index without re-execution.

pub mod cancel;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod formatter;

mod builtins;
mod expressions;
mod loops;
mod memory_ops;
mod ops;
mod statements;
mod type_system;
