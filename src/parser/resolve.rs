//! Post-parse name resolution
//!
//! Runs once over a freshly parsed [`Program`] before anything executes, so a
//! program that calls a missing function or names an unknown struct fails as
//! a whole with a [`ParseError`] and never produces a partial trace.
//!
//! Checks:
//! - struct and function names are unique
//! - every `struct T` mentioned anywhere is defined
//! - every call names a defined function (or `free`) with matching arity
//! - `main` exists and takes no parameters

use crate::parser::ast::*;
use crate::parser::parse::ParseError;
use rustc_hash::FxHashMap;

/// Functions the interpreter provides itself
const BUILTINS: &[&str] = &["printf", "scanf", "malloc", "free"];

struct Resolver<'a> {
    structs: FxHashMap<&'a str, &'a [Field]>,
    functions: FxHashMap<&'a str, usize>,
}

/// Validate cross-references in a parsed program
pub fn resolve(program: &Program) -> Result<(), ParseError> {
    let mut resolver = Resolver {
        structs: FxHashMap::default(),
        functions: FxHashMap::default(),
    };

    for node in &program.nodes {
        match node {
            AstNode::StructDecl {
                name,
                fields,
                location,
            } => {
                if resolver.structs.insert(name.as_str(), fields.as_slice()).is_some() {
                    return Err(ParseError::new(
                        format!("redefinition of struct {}", name),
                        *location,
                    ));
                }
            }
            AstNode::FunctionDecl {
                name,
                params,
                location,
                ..
            } => {
                if BUILTINS.contains(&name.as_str()) {
                    return Err(ParseError::new(
                        format!("'{}' is a built-in function and cannot be redefined", name),
                        *location,
                    ));
                }
                if resolver.functions.insert(name.as_str(), params.len()).is_some() {
                    return Err(ParseError::new(
                        format!("redefinition of function '{}'", name),
                        *location,
                    ));
                }
            }
            _ => {}
        }
    }

    match program.function("main") {
        None => {
            return Err(ParseError::new(
                "program has no 'main' function",
                SourceLocation::new(1, 1),
            ))
        }
        Some(AstNode::FunctionDecl {
            params, location, ..
        }) if !params.is_empty() => {
            return Err(ParseError::unsupported("parameters on 'main'", *location));
        }
        Some(_) => {}
    }

    for node in &program.nodes {
        resolver.visit(node)?;
    }

    Ok(())
}

impl<'a> Resolver<'a> {
    fn check_type(&self, ty: &Type, location: SourceLocation) -> Result<(), ParseError> {
        match ty.struct_name() {
            Some(name) if !self.structs.contains_key(name) => Err(ParseError::new(
                format!("unknown struct '{}'", name),
                location,
            )),
            _ => Ok(()),
        }
    }

    fn visit(&self, node: &AstNode) -> Result<(), ParseError> {
        match node {
            AstNode::FunctionDecl {
                params,
                return_type,
                location,
                ..
            } => {
                self.check_type(return_type, *location)?;
                for param in params {
                    self.check_type(&param.param_type, *location)?;
                }
            }
            AstNode::StructDecl {
                fields, location, ..
            } => {
                for field in fields {
                    self.check_type(&field.field_type, *location)?;
                }
            }
            AstNode::VarDecl {
                var_type, location, ..
            } => self.check_type(var_type, *location)?,
            AstNode::ArrayDecl {
                elem_type,
                location,
                ..
            } => self.check_type(elem_type, *location)?,
            AstNode::Cast {
                target_type,
                location,
                ..
            }
            | AstNode::SizeofType {
                target_type,
                location,
            } => self.check_type(target_type, *location)?,
            AstNode::NewNode {
                struct_name,
                location,
            } => {
                if !self.structs.contains_key(struct_name.as_str()) {
                    return Err(ParseError::new(
                        format!("unknown struct '{}'", struct_name),
                        *location,
                    ));
                }
            }
            AstNode::Call {
                name,
                args,
                location,
            } => {
                let expected = match name.as_str() {
                    "free" => Some(1),
                    other => self.functions.get(other).copied(),
                };
                match expected {
                    None => {
                        return Err(ParseError::new(
                            format!("call to undefined function '{}'", name),
                            *location,
                        ))
                    }
                    Some(arity) if arity != args.len() => {
                        return Err(ParseError::new(
                            format!(
                                "'{}' expects {} argument(s) but {} given",
                                name,
                                arity,
                                args.len()
                            ),
                            *location,
                        ))
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }

        for child in node.children() {
            self.visit(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn check(source: &str) -> Result<(), ParseError> {
        let program = Parser::new(source)?.parse_program()?;
        resolve(&program)
    }

    #[test]
    fn test_valid_program_resolves() {
        let source = "struct Node { int data; struct Node* next; };\n\
                      int len(struct Node* n) { return 0; }\n\
                      int main() { struct Node* h = malloc(sizeof(struct Node)); free(h); return len(h); }";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_missing_main() {
        let err = check("int f() { return 1; }").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn test_undefined_function_and_arity() {
        let err = check("int main() {\n  foo(1);\n}").unwrap_err();
        assert_eq!(err.location, SourceLocation::new(2, 3));

        let err = check("int f(int a) { return a; }\nint main() { f(1, 2); }").unwrap_err();
        assert!(err.message.contains("expects 1"));
    }

    #[test]
    fn test_unknown_struct() {
        let err = check("int main() { struct Missing* p = NULL; }").unwrap_err();
        assert!(err.message.contains("Missing"));
    }
}
