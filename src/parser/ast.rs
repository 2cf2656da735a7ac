// AST (Abstract Syntax Tree) definitions for the tracing interpreter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Base types supported by the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Int,
    Char,
    Float,
    Double,
    Void,
    Struct(String), // Struct name
}

/// Type representation: a base type behind zero or one pointer level.
///
/// Array-ness is a property of the declaration ([`AstNode::ArrayDecl`]), not of
/// the type, so an element type is just a `Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub pointer_depth: usize, // 0 = not pointer, 1 = *
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            pointer_depth: 0,
        }
    }

    pub fn int() -> Self {
        Type::new(BaseType::Int)
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    pub fn is_floating(&self) -> bool {
        self.pointer_depth == 0 && matches!(self.base, BaseType::Float | BaseType::Double)
    }

    /// Name of the struct this type is (or points to), if any
    pub fn struct_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Struct(name) => Some(name),
            _ => None,
        }
    }

    /// The type obtained by dereferencing this one
    pub fn pointee(&self) -> Type {
        Type {
            base: self.base.clone(),
            pointer_depth: self.pointer_depth.saturating_sub(1),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            BaseType::Int => write!(f, "int")?,
            BaseType::Char => write!(f, "char")?,
            BaseType::Float => write!(f, "float")?,
            BaseType::Double => write!(f, "double")?,
            BaseType::Void => write!(f, "void")?,
            BaseType::Struct(name) => write!(f, "struct {}", name)?,
        }
        for _ in 0..self.pointer_depth {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators
///
/// `&` and `*` have their own nodes ([`AstNode::AddressOf`], [`AstNode::Deref`])
/// because they produce and consume addresses rather than values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Not,     // !x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub param_type: Type,
}

/// Struct field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub field_type: Type,
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
}

impl StructDef {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// AST nodes representing statements and expressions
#[derive(Debug, Clone)]
pub enum AstNode {
    // Top-level declarations
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        body: Vec<AstNode>,
        return_type: Type,
        location: SourceLocation,
        end_location: SourceLocation, // closing brace
    },
    StructDecl {
        name: String,
        fields: Vec<Field>,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        name: String,
        var_type: Type,
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    ArrayDecl {
        name: String,
        elem_type: Type,
        size: usize,
        init: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    /// `target = value`, or `target op= value` when `op` is set
    Assignment {
        target: Box<AstNode>,
        op: Option<BinOp>,
        value: Box<AstNode>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(i32, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    CharLiteral(i8, SourceLocation),
    Null {
        location: SourceLocation,
    },
    Variable(String, SourceLocation),
    BinaryExpr {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryExpr {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    AddressOf {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Deref {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Call {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    Index {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    /// `object.field`, or `object->field` when `through_pointer` is set
    FieldAccess {
        object: Box<AstNode>,
        field: String,
        through_pointer: bool,
        location: SourceLocation,
    },
    Cast {
        target_type: Type,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    SizeofType {
        target_type: Type,
        location: SourceLocation,
    },
    SizeofExpr {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    /// `malloc(sizeof(struct Name))`
    NewNode {
        struct_name: String,
        location: SourceLocation,
    },
    /// `printf(format, args...)`
    PrintCall {
        format: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    /// `scanf(format, &target...)`; targets hold the lvalues, not the `&` nodes
    ReadCall {
        format: String,
        targets: Vec<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::FunctionDecl { location, .. }
            | AstNode::StructDecl { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::ArrayDecl { location, .. }
            | AstNode::Assignment { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Null { location }
            | AstNode::BinaryExpr { location, .. }
            | AstNode::UnaryExpr { location, .. }
            | AstNode::AddressOf { location, .. }
            | AstNode::Deref { location, .. }
            | AstNode::Call { location, .. }
            | AstNode::Index { location, .. }
            | AstNode::FieldAccess { location, .. }
            | AstNode::Cast { location, .. }
            | AstNode::SizeofType { location, .. }
            | AstNode::SizeofExpr { location, .. }
            | AstNode::NewNode { location, .. }
            | AstNode::PrintCall { location, .. }
            | AstNode::ReadCall { location, .. } => *location,
            AstNode::IntLiteral(_, loc)
            | AstNode::FloatLiteral(_, loc)
            | AstNode::CharLiteral(_, loc)
            | AstNode::Variable(_, loc) => *loc,
        }
    }

    /// Direct child nodes, in source order
    pub fn children(&self) -> Vec<&AstNode> {
        let mut out: Vec<&AstNode> = Vec::new();
        match self {
            AstNode::FunctionDecl { body, .. } => out.extend(body),
            AstNode::VarDecl { init, .. } => out.extend(init.as_deref()),
            AstNode::ArrayDecl { init, .. } => {
                if let Some(items) = init {
                    out.extend(items);
                }
            }
            AstNode::Assignment { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            AstNode::Block { statements, .. } => out.extend(statements),
            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                out.push(condition);
                out.extend(then_branch);
                if let Some(stmts) = else_branch {
                    out.extend(stmts);
                }
            }
            AstNode::While {
                condition, body, ..
            } => {
                out.push(condition);
                out.extend(body);
            }
            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                out.extend(init.as_deref());
                out.extend(condition.as_deref());
                out.extend(increment.as_deref());
                out.extend(body);
            }
            AstNode::Return { expr, .. } => out.extend(expr.as_deref()),
            AstNode::ExpressionStatement { expr, .. } => out.push(expr),
            AstNode::BinaryExpr { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            AstNode::UnaryExpr { operand, .. }
            | AstNode::AddressOf { operand, .. }
            | AstNode::Deref { operand, .. } => out.push(operand),
            AstNode::Call { args, .. } | AstNode::PrintCall { args, .. } => out.extend(args),
            AstNode::ReadCall { targets, .. } => out.extend(targets),
            AstNode::Index { array, index, .. } => {
                out.push(array);
                out.push(index);
            }
            AstNode::FieldAccess { object, .. } => out.push(object),
            AstNode::Cast { expr, .. } | AstNode::SizeofExpr { expr, .. } => out.push(expr),
            AstNode::StructDecl { .. }
            | AstNode::Break { .. }
            | AstNode::Continue { .. }
            | AstNode::IntLiteral(..)
            | AstNode::FloatLiteral(..)
            | AstNode::CharLiteral(..)
            | AstNode::Null { .. }
            | AstNode::Variable(..)
            | AstNode::SizeofType { .. }
            | AstNode::NewNode { .. } => {}
        }
        out
    }

    /// Whether this node or any node under it prints or reads
    pub fn performs_io(&self) -> bool {
        matches!(self, AstNode::PrintCall { .. } | AstNode::ReadCall { .. })
            || self.children().into_iter().any(AstNode::performs_io)
    }

    /// Render an expression back to C-like text (used in step descriptions)
    pub fn render(&self) -> String {
        match self {
            AstNode::IntLiteral(n, _) => n.to_string(),
            AstNode::FloatLiteral(x, _) => format!("{:?}", x),
            AstNode::CharLiteral(c, _) => format!("'{}'", *c as u8 as char),
            AstNode::Null { .. } => "NULL".to_string(),
            AstNode::Variable(name, _) => name.clone(),
            AstNode::BinaryExpr {
                op, left, right, ..
            } => format!("{} {} {}", left.render(), op.symbol(), right.render()),
            AstNode::UnaryExpr { op, operand, .. } => match op {
                UnOp::Neg => format!("-{}", operand.render()),
                UnOp::Not => format!("!{}", operand.render()),
                UnOp::PreInc => format!("++{}", operand.render()),
                UnOp::PreDec => format!("--{}", operand.render()),
                UnOp::PostInc => format!("{}++", operand.render()),
                UnOp::PostDec => format!("{}--", operand.render()),
            },
            AstNode::AddressOf { operand, .. } => format!("&{}", operand.render()),
            AstNode::Deref { operand, .. } => format!("*{}", operand.render()),
            AstNode::Call { name, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| a.render()).collect();
                format!("{}({})", name, args.join(", "))
            }
            AstNode::Index { array, index, .. } => {
                format!("{}[{}]", array.render(), index.render())
            }
            AstNode::FieldAccess {
                object,
                field,
                through_pointer,
                ..
            } => {
                let sep = if *through_pointer { "->" } else { "." };
                format!("{}{}{}", object.render(), sep, field)
            }
            AstNode::Cast {
                target_type, expr, ..
            } => format!("({}){}", target_type, expr.render()),
            AstNode::SizeofType { target_type, .. } => format!("sizeof({})", target_type),
            AstNode::SizeofExpr { expr, .. } => format!("sizeof({})", expr.render()),
            AstNode::NewNode { struct_name, .. } => {
                format!("malloc(sizeof(struct {}))", struct_name)
            }
            AstNode::PrintCall { format, .. } => format!("printf({:?})", format),
            AstNode::ReadCall { format, .. } => format!("scanf({:?})", format),
            AstNode::Assignment {
                target, op, value, ..
            } => match op {
                Some(op) => format!("{} {}= {}", target.render(), op.symbol(), value.render()),
                None => format!("{} = {}", target.render(), value.render()),
            },
            _ => String::from("<statement>"),
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // FunctionDecl, StructDecl and global declarations
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn function(&self, name: &str) -> Option<&AstNode> {
        self.nodes
            .iter()
            .find(|n| matches!(n, AstNode::FunctionDecl { name: fname, .. } if fname == name))
    }
}
