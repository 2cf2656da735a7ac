//! Static typing of expressions for `sizeof`
//!
//! `sizeof(expr)` is answered from the expression's type alone; the operand is
//! never evaluated, as in C. Types come from the live bindings (a variable's
//! allocation records its declared type) and from the usual promotion rules:
//!
//! - integer and character literals are `int`, floating literals `double`
//! - arithmetic on a floating operand is `double`, otherwise `int`
//! - pointer plus integer keeps the pointer type; pointer minus pointer is `int`
//! - comparisons, logical operators, calls to `printf`/`scanf` are `int`
//! - `*p`, `p[i]` and `p->f` yield the pointee, element or field type

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::table::AllocKind;
use crate::parser::ast::*;

/// An expression's static type, with the length when it names a whole array
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StaticType {
    pub ty: Type,
    pub array_len: Option<usize>,
}

impl From<Type> for StaticType {
    fn from(ty: Type) -> Self {
        StaticType { ty, array_len: None }
    }
}

impl Interpreter<'_> {
    /// Size in bytes of an expression's type
    pub(crate) fn sizeof_expr(&self, expr: &AstNode) -> Result<usize, RuntimeError> {
        let st = self.static_type(expr)?;
        let elem = self.env.sizeof(&st.ty);
        Ok(st.array_len.map_or(elem, |len| elem * len))
    }

    pub(crate) fn static_type(&self, expr: &AstNode) -> Result<StaticType, RuntimeError> {
        let ty = match expr {
            AstNode::IntLiteral(..) | AstNode::CharLiteral(..) => Type::int(),
            AstNode::FloatLiteral(..) => Type::new(BaseType::Double),
            AstNode::Null { .. } => Type::new(BaseType::Void).with_pointer(),

            AstNode::Variable(name, location) => {
                let (address, _) =
                    self.env
                        .lookup(name)
                        .ok_or_else(|| RuntimeError::UndefinedVariable {
                            name: name.clone(),
                            location: *location,
                        })?;
                let alloc = self.env.memory.allocation(address).ok_or(
                    RuntimeError::InvalidAddress {
                        address,
                        location: *location,
                    },
                )?;
                return Ok(StaticType {
                    ty: alloc.ty.clone(),
                    array_len: (alloc.kind == AllocKind::Array).then_some(alloc.len),
                });
            }

            AstNode::Index {
                array, location, ..
            } => {
                let st = self.static_type(array)?;
                if st.array_len.is_some() {
                    st.ty
                } else if st.ty.is_pointer() {
                    st.ty.pointee()
                } else {
                    return Err(RuntimeError::type_mismatch(
                        "array or pointer",
                        st.ty.to_string(),
                        *location,
                    ));
                }
            }

            AstNode::Deref { operand, location } => {
                let st = self.static_type(operand)?;
                if st.array_len.is_some() {
                    st.ty
                } else if st.ty.is_pointer() {
                    st.ty.pointee()
                } else {
                    return Err(RuntimeError::type_mismatch(
                        "pointer",
                        st.ty.to_string(),
                        *location,
                    ));
                }
            }

            AstNode::FieldAccess {
                object,
                field,
                location,
                ..
            } => {
                let object_type = self.static_type(object)?.ty;
                let struct_name = object_type.struct_name().ok_or_else(|| {
                    RuntimeError::type_mismatch("struct", object_type.to_string(), *location)
                })?;
                let def = self.env.struct_def(struct_name).ok_or_else(|| {
                    RuntimeError::type_mismatch("defined struct", object_type.to_string(), *location)
                })?;
                def.fields
                    .iter()
                    .find(|f| f.name == *field)
                    .map(|f| f.field_type.clone())
                    .ok_or_else(|| RuntimeError::MissingStructField {
                        struct_name: struct_name.to_string(),
                        field_name: field.clone(),
                        location: *location,
                    })?
            }

            AstNode::AddressOf { operand, .. } => self.static_type(operand)?.ty.with_pointer(),

            AstNode::BinaryExpr {
                op, left, right, ..
            } => match op {
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                    let l = self.decayed(left)?;
                    let r = self.decayed(right)?;
                    match (l.is_pointer(), r.is_pointer()) {
                        (true, true) => Type::int(),
                        (true, false) => l,
                        (false, true) => r,
                        _ if l.is_floating() || r.is_floating() => Type::new(BaseType::Double),
                        _ => Type::int(),
                    }
                }
                _ => Type::int(),
            },

            AstNode::UnaryExpr { op, operand, .. } => match op {
                UnOp::Not => Type::int(),
                UnOp::Neg => {
                    let ty = self.decayed(operand)?;
                    if ty.is_floating() {
                        ty
                    } else {
                        Type::int()
                    }
                }
                _ => self.decayed(operand)?,
            },

            AstNode::Call { name, location, .. } => self.function(name, *location)?.return_type.clone(),
            AstNode::Cast { target_type, .. } => target_type.clone(),
            AstNode::NewNode { struct_name, .. } => {
                Type::new(BaseType::Struct(struct_name.clone())).with_pointer()
            }
            AstNode::SizeofType { .. }
            | AstNode::SizeofExpr { .. }
            | AstNode::PrintCall { .. }
            | AstNode::ReadCall { .. } => Type::int(),

            other => {
                return Err(RuntimeError::type_mismatch(
                    "expression",
                    other.render(),
                    other.location(),
                ))
            }
        };
        Ok(ty.into())
    }

    /// Static type after array-to-pointer decay
    fn decayed(&self, expr: &AstNode) -> Result<Type, RuntimeError> {
        let st = self.static_type(expr)?;
        Ok(match st.array_len {
            Some(_) => st.ty.with_pointer(),
            None => st.ty,
        })
    }
}
