//! Declaration parsing implementation
//!
//! This module handles parsing of declarations in C programs:
//!
//! - Struct definitions: `struct Name { ... };`
//! - Function definitions and prototypes: `type name(params) { ... }`
//! - Variable declarations with several declarators: `int a = 3, *p, arr[4];`
//! - Type parsing: base types and a single pointer level
//!
//! # Grammar
//!
//! ```text
//! top_level    ::= struct_def | function_def | prototype | declaration
//! struct_def   ::= "struct" identifier "{" (type identifier ";")* "}" ";"
//! function_def ::= type identifier "(" params ")" "{" statements "}"
//! declaration  ::= base_type declarator ("," declarator)* ";"
//! declarator   ::= "*"? identifier ("[" int? "]")? ("=" initializer)?
//! type         ::= base_type "*"?
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse a top-level declaration. Prototypes produce no nodes and a
    /// multi-declarator global declaration produces one node per name.
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<Vec<AstNode>, ParseError> {
        self.reject_reserved()?;

        // struct Name { ... };  versus  struct Name* func(...) / struct Name* global;
        if self.check(&Token::Struct(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::Ident(..)))
            && matches!(self.peek_ahead(2), Some(Token::LBrace(_)))
        {
            self.advance(); // consume 'struct'
            return Ok(vec![self.parse_struct_definition()?]);
        }

        let start = self.position;
        let base = self.parse_base_type()?;
        let is_pointer = self.match_token(&Token::Star(self.current_location()));
        let is_function = matches!(self.peek(), Token::Ident(..))
            && matches!(self.peek_ahead(1), Some(Token::LParen(_)));

        if is_function {
            let mut return_type = Type::new(base);
            if is_pointer {
                return_type = return_type.with_pointer();
            }
            return Ok(self.parse_function_definition(return_type)?.into_iter().collect());
        }

        // Global variable declaration: rewind so declarators see their own '*'
        self.position = start;
        self.parse_declaration_group()
    }

    /// Parse struct definition: struct Name { fields };
    pub(crate) fn parse_struct_definition(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();
        let name = self.expect_identifier()?;

        self.expect_lbrace("after struct name")?;

        let mut fields: Vec<Field> = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            let field_loc = self.current_location();
            let field_type = self.parse_type()?;
            self.check_storable(&field_type, field_loc)?;
            let field_name = self.expect_identifier()?;
            if self.check(&Token::LBracket(self.current_location())) {
                return Err(ParseError::unsupported(
                    "array field in struct",
                    self.current_location(),
                ));
            }
            if fields.iter().any(|f| f.name == field_name) {
                return Err(ParseError::new(
                    format!("duplicate field '{}' in struct {}", field_name, name),
                    field_loc,
                ));
            }
            self.expect_semicolon("after struct field")?;

            fields.push(Field {
                name: field_name,
                field_type,
            });
        }

        self.expect_rbrace("after struct fields")?;
        self.expect_semicolon("after struct definition")?;

        if fields.is_empty() {
            return Err(ParseError::new(
                format!("struct {} has no fields", name),
                loc,
            ));
        }

        Ok(AstNode::StructDecl {
            name,
            fields,
            location: loc,
        })
    }

    /// Parse function definition after its return type. Returns `None` for a
    /// prototype (`int f(int n);`), which carries nothing to execute.
    pub(crate) fn parse_function_definition(
        &mut self,
        return_type: Type,
    ) -> Result<Option<AstNode>, ParseError> {
        let loc = self.current_location();
        let name = self.expect_identifier()?;

        if return_type.pointer_depth == 0 && return_type.struct_name().is_some() {
            return Err(ParseError::unsupported("struct returned by value", loc));
        }

        self.expect_lparen("after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_rparen("after parameters")?;

        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(None);
        }

        self.expect_lbrace("before function body")?;
        let body = self.parse_block_statements()?;
        let end_location = self.current_location();
        self.expect_rbrace("after function body")?;

        Ok(Some(AstNode::FunctionDecl {
            name,
            params,
            body,
            return_type,
            location: loc,
            end_location,
        }))
    }

    /// Parse parameter list: (type name, type name[], ...)
    pub(crate) fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params: Vec<Param> = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(params);
        }

        // (void) means no parameters in C
        if self.check(&Token::Void(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::RParen(_)))
        {
            self.advance();
            return Ok(params);
        }

        loop {
            let param_loc = self.current_location();
            let mut param_type = self.parse_type()?;
            let param_name = self.expect_identifier()?;

            // Array parameters decay to pointers
            if self.match_token(&Token::LBracket(self.current_location())) {
                if !self.check(&Token::RBracket(self.current_location())) {
                    self.parse_array_size()?;
                }
                self.expect_rbracket("after array parameter")?;
                if param_type.is_pointer() {
                    return Err(ParseError::unsupported("array of pointers parameter", param_loc));
                }
                param_type = param_type.with_pointer();
            }
            self.check_storable(&param_type, param_loc)?;

            if params.iter().any(|p| p.name == param_name) {
                return Err(ParseError::new(
                    format!("duplicate parameter '{}'", param_name),
                    param_loc,
                ));
            }
            params.push(Param {
                name: param_name,
                param_type,
            });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse a declaration statement with one or more declarators, consuming
    /// the trailing ';'. Each declarator becomes its own node.
    pub(crate) fn parse_declaration_group(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let base = self.parse_base_type()?;
        let mut decls = vec![self.parse_declarator(&base)?];

        while self.match_token(&Token::Comma(self.current_location())) {
            decls.push(self.parse_declarator(&base)?);
        }

        self.expect_semicolon("after declaration")?;
        Ok(decls)
    }

    /// Parse one declarator: `*? name ([N])? (= init)?`
    pub(crate) fn parse_declarator(&mut self, base: &BaseType) -> Result<AstNode, ParseError> {
        let mut var_type = Type::new(base.clone());
        if self.match_token(&Token::Star(self.current_location())) {
            var_type = var_type.with_pointer();
        }
        if self.check(&Token::Star(self.current_location())) {
            return Err(ParseError::unsupported(
                "pointer to pointer",
                self.current_location(),
            ));
        }

        let location = self.current_location();
        let name = self.expect_identifier()?;
        self.check_storable(&var_type, location)?;

        if self.match_token(&Token::LBracket(self.current_location())) {
            return self.parse_array_declarator(name, var_type, location);
        }

        let init = if self.match_token(&Token::Eq(self.current_location())) {
            if self.check(&Token::LBrace(self.current_location())) {
                return Err(ParseError::new(
                    format!("initializer list for non-array '{}'", name),
                    self.current_location(),
                ));
            }
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(AstNode::VarDecl {
            name,
            var_type,
            init,
            location,
        })
    }

    /// Parse the rest of `name[N] = {...}` after the '['
    fn parse_array_declarator(
        &mut self,
        name: String,
        elem_type: Type,
        location: SourceLocation,
    ) -> Result<AstNode, ParseError> {
        let declared_size = if self.check(&Token::RBracket(self.current_location())) {
            None
        } else {
            Some(self.parse_array_size()?)
        };
        self.expect_rbracket("after array size")?;

        if self.check(&Token::LBracket(self.current_location())) {
            return Err(ParseError::unsupported(
                "multi-dimensional array",
                self.current_location(),
            ));
        }

        let init = if self.match_token(&Token::Eq(self.current_location())) {
            if let Token::StringLiteral(_, loc) = self.peek() {
                return Err(ParseError::unsupported(
                    "string literal outside a format string",
                    *loc,
                ));
            }
            self.expect_lbrace("to open array initializer")?;
            let mut items = Vec::new();
            while !self.check(&Token::RBrace(self.current_location())) {
                items.push(self.parse_expression()?);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
            self.expect_rbrace("to close array initializer")?;
            Some(items)
        } else {
            None
        };

        let size = match (declared_size, &init) {
            (Some(size), Some(items)) if items.len() > size => {
                return Err(ParseError::new(
                    format!(
                        "too many initializers for '{}[{}]' ({} given)",
                        name,
                        size,
                        items.len()
                    ),
                    location,
                ));
            }
            (Some(size), _) => size,
            (None, Some(items)) if !items.is_empty() => items.len(),
            (None, _) => {
                return Err(ParseError::new(
                    format!("array '{}' needs a size or an initializer", name),
                    location,
                ));
            }
        };

        Ok(AstNode::ArrayDecl {
            name,
            elem_type,
            size,
            init,
            location,
        })
    }

    /// Array sizes are positive integer constants
    fn parse_array_size(&mut self) -> Result<usize, ParseError> {
        match self.peek_token() {
            Token::IntLiteral(n, loc) => {
                self.advance();
                if n <= 0 || n > i32::MAX as i64 {
                    return Err(ParseError::new("array size must be a positive int", loc));
                }
                Ok(n as usize)
            }
            _ => Err(ParseError::unsupported(
                "array size that is not an integer constant",
                self.current_location(),
            )),
        }
    }

    /// Parse base type keyword(s): int | char | float | double | void | struct Name
    pub(crate) fn parse_base_type(&mut self) -> Result<BaseType, ParseError> {
        self.reject_reserved()?;

        let base = if self.match_token(&Token::Int(self.current_location())) {
            BaseType::Int
        } else if self.match_token(&Token::Char(self.current_location())) {
            BaseType::Char
        } else if self.match_token(&Token::Float(self.current_location())) {
            BaseType::Float
        } else if self.match_token(&Token::Double(self.current_location())) {
            BaseType::Double
        } else if self.match_token(&Token::Void(self.current_location())) {
            BaseType::Void
        } else if self.match_token(&Token::Struct(self.current_location())) {
            BaseType::Struct(self.expect_identifier()?)
        } else {
            return Err(self.error_here("Expected type"));
        };

        Ok(base)
    }

    /// Parse type: base_type [*]
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        let mut ty = Type::new(self.parse_base_type()?);

        if self.match_token(&Token::Star(self.current_location())) {
            ty = ty.with_pointer();
        }
        if self.check(&Token::Star(self.current_location())) {
            return Err(ParseError::unsupported(
                "pointer to pointer",
                self.current_location(),
            ));
        }

        Ok(ty)
    }

    /// Reject types that cannot hold a value: `void` and struct values
    pub(crate) fn check_storable(&self, ty: &Type, loc: SourceLocation) -> Result<(), ParseError> {
        if ty.pointer_depth > 0 {
            return Ok(());
        }
        match ty.base {
            BaseType::Void => Err(ParseError::new("variable declared void", loc)),
            BaseType::Struct(_) => Err(ParseError::unsupported("struct value variable", loc)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn body_of(source: &str) -> Vec<AstNode> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().last() {
            Some(AstNode::FunctionDecl { body, .. }) => body,
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_multiple_declarators() {
        let body = body_of("int main() { int a = 3, *p, arr[4]; }");
        assert_eq!(body.len(), 3);
        assert!(matches!(&body[0], AstNode::VarDecl { name, init: Some(_), .. } if name == "a"));
        assert!(matches!(&body[1], AstNode::VarDecl { var_type, .. } if var_type.is_pointer()));
        assert!(matches!(&body[2], AstNode::ArrayDecl { size: 4, .. }));
    }

    #[test]
    fn test_array_size_inferred_from_initializer() {
        let body = body_of("int main() { int arr[] = {5, 1, 4, 2, 8}; }");
        match &body[0] {
            AstNode::ArrayDecl { size, init, .. } => {
                assert_eq!(*size, 5);
                assert_eq!(init.as_ref().map(|i| i.len()), Some(5));
            }
            other => panic!("Expected array declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_array_parameter_decays_to_pointer() {
        let program = Parser::new("int sum(int arr[], int n) { return n; }")
            .unwrap()
            .parse_program()
            .unwrap();
        match &program.nodes[0] {
            AstNode::FunctionDecl { params, .. } => {
                assert_eq!(params[0].param_type.to_string(), "int*");
                assert_eq!(params[1].param_type.to_string(), "int");
            }
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_declaration_errors() {
        let cases = [
            "int main() { int arr[2] = {1, 2, 3}; }",
            "int main() { int m[2][2]; }",
            "int main() { int **pp; }",
            "struct P { int x; };\nint main() { struct P p; }",
            "int main() { void v; }",
        ];
        for source in cases {
            assert!(
                Parser::new(source).unwrap().parse_program().is_err(),
                "should reject: {}",
                source
            );
        }
    }
}
