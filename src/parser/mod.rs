//! C source code parser
//!
//! This module transforms C source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), with `impl Parser` blocks in
//!   `declarations`, `statements` and `expressions`
//! - [`resolve`]: Cross-reference checks over the finished AST
//! - [`ast`]: AST node definitions
//!
//! # Supported C Subset
//!
//! - Types: `int`, `char`, `float`, `double`, `void`, `struct T*`, one pointer level
//! - Declarations: scalars, fixed-size arrays with initializer lists, globals
//! - Statements: assignment (`=`, `+=`, ...), `if`/`else`, `while`, `for`,
//!   `break`, `continue`, `return`, blocks
//! - Expressions: arithmetic, comparison, logical, `&`, `*`, `->`, `++`/`--`,
//!   casts, `sizeof`, function calls
//! - Built-ins: `printf`, `scanf`, `malloc(sizeof(struct T))`, `free`
//! - No preprocessor (directive lines are skipped)
//!
//! Everything else is rejected with an "unsupported construct" [`ParseError`].
//! Parsing is atomic: [`parse`] returns either a fully resolved [`Program`] or
//! an error, never a partial tree.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
pub mod resolve;
mod statements;

pub use ast::Program;
pub use parse::ParseError;

/// Parse and resolve a complete program
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut parser = parse::Parser::new(source)?;
    let program = parser.parse_program()?;
    resolve::resolve(&program)?;
    Ok(program)
}
