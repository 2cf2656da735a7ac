//! Statement parsing implementation
//!
//! This module handles parsing of the supported C statement types:
//!
//! - Variable declarations: `int x = 42, y;` (one node per declarator)
//! - Control flow: `if`/`else`, `while`, `for`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Assignments (`=`, `+=`, ...) and expression statements
//!
//! # Grammar
//!
//! ```text
//! statement ::= declaration | if_stmt | while_stmt | for_stmt
//!             | return_stmt | break_stmt | continue_stmt | block
//!             | simple_stmt ";"
//! simple_stmt ::= lvalue assign_op expression | expression
//! ```
//!
//! Assignment is a statement here, not an expression, so every store lands on
//! its own statement boundary.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            if self.is_type_keyword() {
                statements.extend(self.parse_declaration_group()?);
            } else {
                statements.push(self.parse_statement()?);
            }
        }

        Ok(statements)
    }

    /// Parse a statement (declarations are handled by the enclosing block)
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        self.reject_reserved()?;
        let loc = self.current_location();

        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement();
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement();
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement();
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement();
        }

        if self.match_token(&Token::Break(loc)) {
            self.expect_semicolon("after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            return Ok(AstNode::Block {
                statements,
                location: loc,
            });
        }

        if self.is_type_keyword() {
            return Err(ParseError::new(
                "a declaration is not allowed here; wrap it in braces",
                loc,
            ));
        }

        if let Token::Ident(_, _) = self.peek() {
            if matches!(self.peek_ahead(1), Some(Token::Colon(_))) {
                return Err(ParseError::unsupported("label", loc));
            }
        }

        let stmt = self.parse_simple_statement()?;
        self.expect_semicolon("after expression")?;
        Ok(stmt)
    }

    /// Parse an assignment or expression statement without its ';'
    pub(crate) fn parse_simple_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();
        let expr = self.parse_expression()?;

        let op = match self.peek() {
            Token::Eq(_) => None,
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            _ => {
                return Ok(AstNode::ExpressionStatement {
                    expr: Box::new(expr),
                    location: loc,
                })
            }
        };
        let op_loc = self.current_location();
        self.advance();

        if !matches!(
            expr,
            AstNode::Variable(..)
                | AstNode::Index { .. }
                | AstNode::Deref { .. }
                | AstNode::FieldAccess { .. }
        ) {
            return Err(ParseError::new("invalid assignment target", op_loc));
        }

        let value = self.parse_expression()?;

        if matches!(
            self.peek(),
            Token::Eq(_)
                | Token::PlusEq(_)
                | Token::MinusEq(_)
                | Token::StarEq(_)
                | Token::SlashEq(_)
                | Token::PercentEq(_)
        ) {
            return Err(ParseError::unsupported(
                "chained assignment",
                self.current_location(),
            ));
        }

        Ok(AstNode::Assignment {
            target: Box::new(expr),
            op,
            value: Box::new(value),
            location: loc,
        })
    }

    /// Parse a loop or branch body: a braced block or a single statement
    fn parse_body(&mut self) -> Result<Vec<AstNode>, ParseError> {
        if self.match_token(&Token::LBrace(self.current_location())) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            Ok(statements)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parse return statement
    fn parse_return_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let expr = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_semicolon("after return")?;

        Ok(AstNode::Return {
            expr,
            location: loc,
        })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after if condition")?;

        let then_branch = self.parse_body()?;

        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(self.parse_body()?)
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after while condition")?;

        let body = self.parse_body()?;

        Ok(AstNode::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'for'")?;

        // Init (optional): a single declarator or a simple statement
        let init = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else if self.is_type_keyword() {
            let base = self.parse_base_type()?;
            let decl = self.parse_declarator(&base)?;
            if self.check(&Token::Comma(self.current_location())) {
                return Err(ParseError::unsupported(
                    "several declarations in a for initializer",
                    self.current_location(),
                ));
            }
            Some(Box::new(decl))
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect_semicolon("after for initializer")?;

        // Condition (optional)
        let condition = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        // Increment (optional)
        let increment = if self.check(&Token::RParen(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect_rparen("after for clauses")?;

        let body = self.parse_body()?;

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn main_body(body: &str) -> Vec<AstNode> {
        let source = format!("int main() {{ {} }}", body);
        let program = Parser::new(&source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().next() {
            Some(AstNode::FunctionDecl { body, .. }) => body,
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_compound_assignment() {
        let body = main_body("int x = 1; x += 2;");
        assert!(matches!(
            &body[1],
            AstNode::Assignment {
                op: Some(BinOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn test_for_loop_parts() {
        let body = main_body("for (int i = 0; i < 3; i++) { }");
        match &body[0] {
            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                assert!(matches!(init.as_deref(), Some(AstNode::VarDecl { .. })));
                assert!(condition.is_some());
                assert!(matches!(
                    increment.as_deref(),
                    Some(AstNode::ExpressionStatement { .. })
                ));
                assert!(body.is_empty());
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_single_statements() {
        let body = main_body("int x = 0; if (x > 0) x = 1; else x = 2;");
        match &body[1] {
            AstNode::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert_eq!(then_branch.len(), 1);
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_statement_errors() {
        for body in [
            "int x; x = x = 1;",
            "1 = 2;",
            "if (1) int y = 2;",
            "do { } while (0);",
            "int x = 1 ? 2 : 3;",
            "int x = 1 << 2;",
        ] {
            let source = format!("int main() {{ {} }}", body);
            let parsed = Parser::new(&source).and_then(|mut p| p.parse_program());
            assert!(parsed.is_err(), "should reject: {}", body);
        }
    }
}
