//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, `NULL`
//! - Identifiers and variables
//! - Binary operators: arithmetic, comparison, logical
//! - Unary operators: `-`, `!`, `&`, `*`, `++`, `--`, casts, `sizeof`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Built-in calls: `printf`, `scanf`, `malloc(sizeof(struct T))`
//!
//! # Precedence
//!
//! From loosest to tightest: `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* / %`, then unary and postfix forms. All binary operators are
//! left-associative.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Token, MIN_INT_MAGNITUDE};
use crate::parser::parse::{ParseError, Parser};

/// Binding power of a binary operator token
fn binary_operator(token: &Token) -> Option<(BinOp, u8)> {
    let entry = match token {
        Token::OrOr(_) => (BinOp::Or, 1),
        Token::AndAnd(_) => (BinOp::And, 2),
        Token::EqEq(_) => (BinOp::Eq, 3),
        Token::NotEq(_) => (BinOp::Ne, 3),
        Token::Lt(_) => (BinOp::Lt, 4),
        Token::Le(_) => (BinOp::Le, 4),
        Token::Gt(_) => (BinOp::Gt, 4),
        Token::Ge(_) => (BinOp::Ge, 4),
        Token::Plus(_) => (BinOp::Add, 5),
        Token::Minus(_) => (BinOp::Sub, 5),
        Token::Star(_) => (BinOp::Mul, 6),
        Token::Slash(_) => (BinOp::Div, 6),
        Token::Percent(_) => (BinOp::Mod, 6),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_binary(1)?;

        // Operators that stop every precedence level but are not executable
        let loc = self.current_location();
        match self.peek() {
            Token::Question(_) | Token::Colon(_) => {
                Err(ParseError::unsupported("conditional operator '?:'", loc))
            }
            Token::Amp(_) | Token::Pipe(_) | Token::Caret(_) | Token::LtLt(_) | Token::GtGt(_) => {
                Err(ParseError::unsupported(
                    format!("bitwise operator {}", self.peek()),
                    loc,
                ))
            }
            _ => Ok(expr),
        }
    }

    /// Precedence climbing over binary operators of at least `min_prec`
    fn parse_binary(&mut self, min_prec: u8) -> Result<AstNode, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = binary_operator(self.peek()) {
            if prec < min_prec {
                break;
            }
            let loc = self.current_location();
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = AstNode::BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse unary operators, casts and sizeof
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        let prefix = match self.peek() {
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Bang(_) => Some(UnOp::Not),
            Token::PlusPlus(_) => Some(UnOp::PreInc),
            Token::MinusMinus(_) => Some(UnOp::PreDec),
            _ => None,
        };
        if let Some(op) = prefix {
            // INT_MIN written as a literal
            if op == UnOp::Neg
                && matches!(self.peek_ahead(1), Some(Token::IntLiteral(MIN_INT_MAGNITUDE, _)))
            {
                self.advance();
                self.advance();
                return Ok(AstNode::IntLiteral(i32::MIN, loc));
            }
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(AstNode::UnaryExpr {
                op,
                operand: Box::new(operand),
                location: loc,
            });
        }

        match self.peek() {
            Token::Plus(_) => {
                self.advance();
                self.parse_unary()
            }
            Token::Amp(_) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(AstNode::AddressOf {
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            Token::Star(_) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(AstNode::Deref {
                    operand: Box::new(operand),
                    location: loc,
                })
            }
            Token::Tilde(_) => Err(ParseError::unsupported("bitwise operator '~'", loc)),
            Token::Sizeof(_) => {
                self.advance();
                self.parse_sizeof(loc)
            }
            Token::LParen(_) if self.is_cast_ahead() => {
                self.advance();
                self.parse_cast(loc)
            }
            _ => self.parse_postfix(),
        }
    }

    /// True when the '(' under the cursor opens a type name
    fn is_cast_ahead(&self) -> bool {
        matches!(
            self.peek_ahead(1),
            Some(
                Token::Int(_)
                    | Token::Char(_)
                    | Token::Float(_)
                    | Token::Double(_)
                    | Token::Void(_)
                    | Token::Struct(_)
                    | Token::Reserved(..)
            )
        )
    }

    /// Parse `(type) operand` after the '('
    fn parse_cast(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        let target_type = self.parse_type()?;
        self.expect_rparen("after cast type")?;
        let expr = self.parse_unary()?;

        if target_type.is_pointer() {
            // The only pointer cast is the one wrapped around a node allocation
            return match expr {
                AstNode::NewNode {
                    ref struct_name, ..
                } if target_type.struct_name() == Some(struct_name.as_str()) => Ok(expr),
                _ => Err(ParseError::unsupported(
                    format!("pointer cast to {}", target_type),
                    loc,
                )),
            };
        }

        if matches!(target_type.base, BaseType::Void | BaseType::Struct(_)) {
            return Err(ParseError::unsupported(
                format!("cast to {}", target_type),
                loc,
            ));
        }

        Ok(AstNode::Cast {
            target_type,
            expr: Box::new(expr),
            location: loc,
        })
    }

    /// Parse `sizeof(type)`, `sizeof(expr)` or `sizeof expr` after the keyword
    fn parse_sizeof(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        if self.check(&Token::LParen(loc)) && self.is_cast_ahead() {
            self.advance();
            let target_type = self.parse_type()?;
            self.expect_rparen("after sizeof type")?;
            return Ok(AstNode::SizeofType {
                target_type,
                location: loc,
            });
        }

        let expr = self.parse_unary()?;
        Ok(AstNode::SizeofExpr {
            expr: Box::new(expr),
            location: loc,
        })
    }

    /// Parse postfix forms: indexing, member access, calls, `++`/`--`
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();
            match self.peek() {
                Token::LBracket(_) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect_rbracket("after index")?;
                    expr = AstNode::Index {
                        array: Box::new(expr),
                        index: Box::new(index),
                        location: loc,
                    };
                }
                Token::Dot(_) | Token::Arrow(_) => {
                    let through_pointer = matches!(self.peek(), Token::Arrow(_));
                    self.advance();
                    let field = self.expect_identifier()?;
                    expr = AstNode::FieldAccess {
                        object: Box::new(expr),
                        field,
                        through_pointer,
                        location: loc,
                    };
                }
                Token::PlusPlus(_) | Token::MinusMinus(_) => {
                    let op = if matches!(self.peek(), Token::PlusPlus(_)) {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    self.advance();
                    expr = AstNode::UnaryExpr {
                        op,
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                Token::LParen(_) => {
                    let (name, call_loc) = match &expr {
                        AstNode::Variable(name, call_loc) => (name.clone(), *call_loc),
                        _ => return Err(ParseError::unsupported("call through an expression", loc)),
                    };
                    self.advance();
                    expr = self.parse_call(name, call_loc)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse call arguments after '(' and build the call node, recognizing the
    /// built-in functions
    fn parse_call(&mut self, name: String, loc: SourceLocation) -> Result<AstNode, ParseError> {
        let format = match (name.as_str(), self.peek()) {
            ("printf" | "scanf", Token::StringLiteral(text, _)) => {
                let text = text.clone();
                self.advance();
                if !self.check(&Token::RParen(loc)) {
                    self.expect_token(&Token::Comma(loc), "Expected ',' after format string")?;
                }
                Some(text)
            }
            ("printf" | "scanf", _) => {
                return Err(ParseError::new(
                    format!("{} needs a string literal format", name),
                    self.current_location(),
                ))
            }
            _ => None,
        };

        let mut args = Vec::new();
        if !self.check(&Token::RParen(self.current_location())) {
            loop {
                if let Token::StringLiteral(_, str_loc) = self.peek() {
                    return Err(ParseError::unsupported(
                        "string literal outside a format string",
                        *str_loc,
                    ));
                }
                args.push(self.parse_expression()?);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.expect_rparen("after arguments")?;

        match name.as_str() {
            "printf" => Ok(AstNode::PrintCall {
                format: format.unwrap_or_default(),
                args,
                location: loc,
            }),
            "scanf" => {
                let mut targets = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        AstNode::AddressOf { operand, .. } => targets.push(*operand),
                        other => {
                            return Err(ParseError::unsupported(
                                "scanf target that is not '&lvalue'",
                                other.location(),
                            ))
                        }
                    }
                }
                Ok(AstNode::ReadCall {
                    format: format.unwrap_or_default(),
                    targets,
                    location: loc,
                })
            }
            "malloc" => match args.as_slice() {
                [AstNode::SizeofType {
                    target_type:
                        Type {
                            base: BaseType::Struct(struct_name),
                            pointer_depth: 0,
                        },
                    ..
                }] => Ok(AstNode::NewNode {
                    struct_name: struct_name.clone(),
                    location: loc,
                }),
                _ => Err(ParseError::unsupported(
                    "malloc other than malloc(sizeof(struct T))",
                    loc,
                )),
            },
            _ => Ok(AstNode::Call {
                name,
                args,
                location: loc,
            }),
        }
    }

    /// Parse primary expression: literal, identifier or parenthesized expression
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        self.reject_reserved()?;
        let loc = self.current_location();

        match self.peek_token() {
            Token::IntLiteral(n, _) => {
                self.advance();
                let value = i32::try_from(n).map_err(|_| {
                    ParseError::new(format!("Integer literal out of range: {}", n), loc)
                })?;
                Ok(AstNode::IntLiteral(value, loc))
            }
            Token::FloatLiteral(x, _) => {
                self.advance();
                Ok(AstNode::FloatLiteral(x, loc))
            }
            Token::CharLiteral(c, _) => {
                self.advance();
                Ok(AstNode::CharLiteral(c, loc))
            }
            Token::Null(_) => {
                self.advance();
                Ok(AstNode::Null { location: loc })
            }
            Token::Ident(name, _) => {
                self.advance();
                Ok(AstNode::Variable(name, loc))
            }
            Token::StringLiteral(..) => Err(ParseError::unsupported(
                "string literal outside a format string",
                loc,
            )),
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn expr(text: &str) -> AstNode {
        let source = format!("int main() {{ {}; }}", text);
        let program = Parser::new(&source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().next() {
            Some(AstNode::FunctionDecl { mut body, .. }) => match body.remove(0) {
                AstNode::ExpressionStatement { expr, .. } => *expr,
                other => panic!("Expected expression statement, got {:?}", other),
            },
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(expr("1 + 2 * 3").render(), "1 + 2 * 3");
        match expr("1 + 2 * 3") {
            AstNode::BinaryExpr { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(*right, AstNode::BinaryExpr { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        match expr("a < b && c == d || e") {
            AstNode::BinaryExpr { op, left, .. } => {
                assert_eq!(op, BinOp::Or);
                assert!(matches!(*left, AstNode::BinaryExpr { op: BinOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_left_associative() {
        match expr("10 - 4 - 3") {
            AstNode::BinaryExpr { left, right, .. } => {
                assert!(matches!(*left, AstNode::BinaryExpr { op: BinOp::Sub, .. }));
                assert!(matches!(*right, AstNode::IntLiteral(3, _)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_int_min_literal() {
        assert!(matches!(expr("-2147483648"), AstNode::IntLiteral(i32::MIN, _)));
        assert!(matches!(expr("-5"), AstNode::UnaryExpr { op: UnOp::Neg, .. }));

        let source = "int main() { int x = 2147483648; }";
        let err = Parser::new(source).unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("out of range"), "{}", err.message);
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(expr("head->next->data").render(), "head->next->data");
        assert!(matches!(expr("i++"), AstNode::UnaryExpr { op: UnOp::PostInc, .. }));
        assert!(matches!(expr("*p"), AstNode::Deref { .. }));
        assert!(matches!(expr("&arr[2]"), AstNode::AddressOf { .. }));
    }

    #[test]
    fn test_builtin_calls() {
        assert!(matches!(
            expr("(struct Node*)malloc(sizeof(struct Node))"),
            AstNode::NewNode { ref struct_name, .. } if struct_name == "Node"
        ));
        assert!(matches!(
            expr("printf(\"%d\\n\", x)"),
            AstNode::PrintCall { ref args, .. } if args.len() == 1
        ));
        assert!(matches!(
            expr("scanf(\"%d\", &x)"),
            AstNode::ReadCall { ref targets, .. } if matches!(targets[0], AstNode::Variable(..))
        ));
        assert!(matches!(expr("sizeof(arr) / sizeof(arr[0])"), AstNode::BinaryExpr { .. }));
        assert!(matches!(expr("(double)x"), AstNode::Cast { .. }));
    }

    #[test]
    fn test_unsupported_expressions() {
        for text in ["malloc(16)", "x & 1", "~x", "puts(\"hi\")", "(int*)p"] {
            let source = format!("int main() {{ {}; }}", text);
            let result = Parser::new(&source).and_then(|mut p| p.parse_program());
            let err = result.expect_err(text);
            assert!(err.message.contains("unsupported"), "{}: {}", text, err.message);
        }
    }
}
