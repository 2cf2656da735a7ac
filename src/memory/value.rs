//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents every runtime value
//! the interpreter stores in a memory slot. Values are tagged, `Copy`, and carry
//! no references, so a value copied into a Step can never alias live state.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 32-bit signed integer
//! - [`Value::Float`]: `float` and `double` (both held as `f64`)
//! - [`Value::Char`]: 8-bit signed character
//! - [`Value::Address`]: pointer; address 0 is `NULL`
//! - [`Value::Undefined`]: a slot that was never written
//!
//! # Initialization Tracking
//!
//! Locals start as `Undefined`, so reading one before assignment is detected
//! instead of yielding garbage. Globals are zero-initialized like in C.

use crate::parser::ast::{BaseType, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory address type: one slot in the simulated address space
pub type Address = u64;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Int(i32),
    Float(f64),
    Char(i8),
    Address(Address),
    #[default]
    Undefined,
}

impl Value {
    pub const NULL: Value = Value::Address(0);

    /// Zero value for a type (used for globals and array padding)
    pub fn zero_for(ty: &Type) -> Value {
        if ty.is_pointer() {
            return Value::NULL;
        }
        match ty.base {
            BaseType::Char => Value::Char(0),
            BaseType::Float | BaseType::Double => Value::Float(0.0),
            _ => Value::Int(0),
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "floating",
            Value::Char(_) => "char",
            Value::Address(_) => "pointer",
            Value::Undefined => "undefined",
        }
    }

    /// Integer view of a non-pointer scalar
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Char(c) => Some(*c as i32),
            _ => None,
        }
    }

    /// Floating view of a numeric scalar
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Char(c) => Some(*c as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// C truthiness: nonzero numbers and non-NULL pointers are true
    pub fn is_truthy(&self) -> Option<bool> {
        match self {
            Value::Int(n) => Some(*n != 0),
            Value::Char(c) => Some(*c != 0),
            Value::Float(x) => Some(*x != 0.0),
            Value::Address(addr) => Some(*addr != 0),
            Value::Undefined => None,
        }
    }

    /// Convert a value for storage in (or a cast to) `ty`.
    ///
    /// Returns `None` when no implicit or explicit C conversion exists in this
    /// subset, e.g. a float into a pointer. `Undefined` converts to itself.
    pub fn convert_to(&self, ty: &Type) -> Option<Value> {
        if let Value::Undefined = self {
            return Some(Value::Undefined);
        }

        if ty.is_pointer() {
            return match self {
                Value::Address(addr) => Some(Value::Address(*addr)),
                // the null pointer constant
                Value::Int(0) => Some(Value::NULL),
                _ => None,
            };
        }

        match (&ty.base, self) {
            (_, Value::Address(_)) => None,
            (BaseType::Int, Value::Float(x)) => Some(Value::Int(float_to_int(*x))),
            (BaseType::Int, v) => v.as_int().map(Value::Int),
            (BaseType::Char, Value::Float(x)) => Some(Value::Char(float_to_int(*x) as i8)),
            (BaseType::Char, v) => v.as_int().map(|n| Value::Char(n as i8)),
            (BaseType::Float, v) => v.as_float().map(|x| Value::Float(x as f32 as f64)),
            (BaseType::Double, v) => v.as_float().map(Value::Float),
            (BaseType::Void | BaseType::Struct(_), _) => None,
        }
    }
}

/// C-style truncation toward zero, saturating at the `int` range
fn float_to_int(x: f64) -> i32 {
    x.trunc() as i32
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Char(c) => {
                let byte = *c as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "'{}'", byte as char)
                } else {
                    write!(f, "{}", c)
                }
            }
            Value::Address(0) => write!(f, "NULL"),
            Value::Address(addr) => write!(f, "0x{:08x}", addr),
            Value::Undefined => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_follow_declared_type() {
        let int = Type::int();
        let float = Type::new(BaseType::Float);
        let char_ty = Type::new(BaseType::Char);
        let ptr = Type::int().with_pointer();

        assert_eq!(Value::Float(3.9).convert_to(&int), Some(Value::Int(3)));
        assert_eq!(Value::Float(-3.9).convert_to(&int), Some(Value::Int(-3)));
        assert_eq!(Value::Int(65).convert_to(&char_ty), Some(Value::Char(65)));
        assert_eq!(Value::Int(300).convert_to(&char_ty), Some(Value::Char(44)));
        assert_eq!(
            Value::Float(0.1).convert_to(&float),
            Some(Value::Float(0.1f32 as f64))
        );
        assert_eq!(Value::Int(0).convert_to(&ptr), Some(Value::NULL));
        assert_eq!(Value::Int(7).convert_to(&ptr), None);
        assert_eq!(Value::Address(12).convert_to(&int), None);
        assert_eq!(Value::Undefined.convert_to(&int), Some(Value::Undefined));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::Int(0).is_truthy(), Some(false));
        assert_eq!(Value::Float(0.5).is_truthy(), Some(true));
        assert_eq!(Value::NULL.is_truthy(), Some(false));
        assert_eq!(Value::Undefined.is_truthy(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Char(b'a' as i8).to_string(), "'a'");
        assert_eq!(Value::NULL.to_string(), "NULL");
        assert_eq!(Value::Address(0x1000_0000).to_string(), "0x10000000");
    }
}
