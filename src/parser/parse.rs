//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: struct, function and variable declarations, types
//! - `statements`: statements (if, while, for, return, ...)
//! - `expressions`: expressions with precedence climbing
//! - `resolve`: the post-parse check of names, arity and struct references
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            message: message.into(),
            location,
        }
    }

    /// A recognized C construct that the interpreter does not execute
    pub fn unsupported(what: impl std::fmt::Display, location: SourceLocation) -> Self {
        ParseError {
            message: format!("unsupported construct: {}", what),
            location,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the C subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire program (top-level declarations)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            let decls = self.parse_top_level_declaration()?;
            program.nodes.extend(decls);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn is_type_keyword(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::Char(_)
                | Token::Float(_)
                | Token::Double(_)
                | Token::Void(_)
                | Token::Struct(_)
        )
    }

    /// Fail on a keyword the interpreter recognizes but does not support
    pub(crate) fn reject_reserved(&self) -> Result<(), ParseError> {
        if let Token::Reserved(word, loc) = self.peek() {
            return Err(ParseError::unsupported(format!("'{}'", word), *loc));
        }
        Ok(())
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof, and advance() never
        // moves past it.
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.peek().clone()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        ParseError::new(
            format!("{}, found {}", message, self.peek()),
            self.current_location(),
        )
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            &format!("Expected '(' {ctx}"),
        )
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        )
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LBrace(self.current_location()),
            &format!("Expected '{{' {ctx}"),
        )
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBrace(self.current_location()),
            &format!("Expected '}}' {ctx}"),
        )
    }

    pub(crate) fn expect_rbracket(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBracket(self.current_location()),
            &format!("Expected ']' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        )
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        self.reject_reserved()?;
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here("Expected identifier"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program, ParseError> {
        Parser::new(source)?.parse_program()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }").unwrap();

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::FunctionDecl {
                name,
                params,
                return_type,
                body,
                end_location,
                ..
            } => {
                assert_eq!(name, "main");
                assert_eq!(params.len(), 0);
                assert_eq!(return_type.base, BaseType::Int);
                assert_eq!(body.len(), 1);
                assert_eq!(end_location.column, 24);
            }
            _ => panic!("Expected function declaration"),
        }
    }

    #[test]
    fn test_parse_struct() {
        let program = parse("struct Node { int data; struct Node* next; };").unwrap();

        match &program.nodes[0] {
            AstNode::StructDecl { name, fields, .. } => {
                assert_eq!(name, "Node");
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].field_type.to_string(), "struct Node*");
            }
            _ => panic!("Expected struct declaration"),
        }
    }

    #[test]
    fn test_globals_and_prototypes() {
        let program = parse("int count = 3, limit;\nint f(int n);\nint f(int n) { return n; }").unwrap();

        // two global declarators plus one definition; the prototype is dropped
        assert_eq!(program.nodes.len(), 3);
        assert!(matches!(&program.nodes[0], AstNode::VarDecl { name, .. } if name == "count"));
        assert!(matches!(&program.nodes[1], AstNode::VarDecl { name, init: None, .. } if name == "limit"));
        assert!(program.function("f").is_some());
    }

    #[test]
    fn test_reserved_keyword_is_unsupported() {
        let err = parse("int main() {\n  switch (1) { }\n}").unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 3));
        assert!(err.message.starts_with("unsupported construct"));
    }

    #[test]
    fn test_lex_error_becomes_parse_error() {
        let err = parse("int main() { int x = $; }").unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 22));
    }
}
