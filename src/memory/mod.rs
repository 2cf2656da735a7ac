//! Memory model for the tracing interpreter
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Runtime value representation (Int, Float, Char, Address, Undefined)
//! - [`table`]: The flat address → value table with allocation metadata
//! - [`stack`]: Call stack with frames and block scopes
//!
//! [`Environment`] ties them together and owns all live state of one run. It is
//! created fresh by each trace and dropped when the trace ends.
//!
//! # Type Sizes
//!
//! `sizeof` uses fixed, platform-independent sizes:
//! - `int`: 4 bytes
//! - `char`: 1 byte
//! - `float`: 4 bytes, `double`: 8 bytes
//! - `pointer`: 8 bytes (regardless of pointee type)
//! - `struct`: sum of field sizes (no padding or alignment)
//!
//! Addresses, by contrast, count slots: `p + 1` is the next element.

pub mod stack;
pub mod table;
pub mod value;

use crate::parser::ast::{BaseType, StructDef, Type};
use rustc_hash::FxHashMap;
use stack::{Stack, StackFrame};
use table::MemoryTable;
use value::Address;

/// Calculate the size of a type in bytes
pub fn sizeof_type(t: &Type, struct_defs: &FxHashMap<String, StructDef>) -> usize {
    if t.pointer_depth > 0 {
        return 8;
    }

    match &t.base {
        BaseType::Int => 4,
        BaseType::Char => 1,
        BaseType::Float => 4,
        BaseType::Double => 8,
        BaseType::Void => 1, // GNU C convention
        BaseType::Struct(name) => struct_defs
            .get(name)
            .map(|def| {
                def.fields
                    .iter()
                    .map(|f| sizeof_type(&f.field_type, struct_defs))
                    .sum()
            })
            .unwrap_or(0),
    }
}

/// Whether a name is bound in the global scope or a function frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Local,
}

/// All mutable state of one interpreter run
#[derive(Debug, Clone)]
pub struct Environment {
    pub memory: MemoryTable,
    pub stack: Stack,
    globals: FxHashMap<String, Address>,
    struct_defs: FxHashMap<String, StructDef>,
}

impl Environment {
    pub fn new(struct_defs: FxHashMap<String, StructDef>) -> Self {
        Environment {
            memory: MemoryTable::new(),
            stack: Stack::new(),
            globals: FxHashMap::default(),
            struct_defs,
        }
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.struct_defs.get(name)
    }

    pub fn struct_defs(&self) -> &FxHashMap<String, StructDef> {
        &self.struct_defs
    }

    pub fn sizeof(&self, ty: &Type) -> usize {
        sizeof_type(ty, &self.struct_defs)
    }

    /// Bind a name in the innermost scope: the current block of the current
    /// frame, or the global scope before any function is entered
    pub fn declare(&mut self, name: &str, address: Address) {
        match self.stack.current_frame_mut() {
            Some(frame) => frame.declare_var(name.to_string(), address),
            None => {
                self.globals.insert(name.to_string(), address);
            }
        }
    }

    /// Resolve a name: current frame first, then globals
    pub fn lookup(&self, name: &str) -> Option<(Address, ScopeKind)> {
        if let Some(addr) = self.stack.current_frame().and_then(|f| f.get_var(name)) {
            return Some((addr, ScopeKind::Local));
        }
        self.globals
            .get(name)
            .map(|addr| (*addr, ScopeKind::Global))
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, Address)> {
        self.globals.iter().map(|(name, addr)| (name, *addr))
    }

    pub fn push_scope(&mut self) {
        if let Some(frame) = self.stack.current_frame_mut() {
            frame.push_scope();
        }
    }

    /// Leave a block scope; its locals' addresses become dangling
    pub fn pop_scope(&mut self) {
        if let Some(frame) = self.stack.current_frame_mut() {
            for addr in frame.pop_scope() {
                self.memory.retire(addr);
            }
        }
    }

    pub fn push_frame(&mut self, frame: StackFrame) {
        self.stack.push_frame(frame);
    }

    /// Pop the current frame and retire every local it owned
    pub fn pop_frame(&mut self) {
        if let Some(mut frame) = self.stack.pop_frame() {
            for addr in frame.unwind() {
                self.memory.retire(addr);
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Field;
    use table::AllocKind;
    use value::Value;

    fn node_defs() -> FxHashMap<String, StructDef> {
        let node = Type::new(BaseType::Struct("Node".into()));
        let mut defs = FxHashMap::default();
        defs.insert(
            "Node".to_string(),
            StructDef {
                name: "Node".to_string(),
                fields: vec![
                    Field {
                        name: "data".into(),
                        field_type: Type::int(),
                    },
                    Field {
                        name: "next".into(),
                        field_type: node.with_pointer(),
                    },
                ],
            },
        );
        defs
    }

    #[test]
    fn test_sizeof() {
        let defs = node_defs();
        assert_eq!(sizeof_type(&Type::int(), &defs), 4);
        assert_eq!(sizeof_type(&Type::new(BaseType::Double), &defs), 8);
        assert_eq!(sizeof_type(&Type::new(BaseType::Char).with_pointer(), &defs), 8);
        assert_eq!(
            sizeof_type(&Type::new(BaseType::Struct("Node".into())), &defs),
            12
        );
    }

    #[test]
    fn test_locals_shadow_globals_and_die_with_frame() {
        let mut env = Environment::new(node_defs());
        let g = env
            .memory
            .allocate(AllocKind::Scalar, &Type::int(), 1, Value::Int(0));
        env.declare("x", g);

        env.push_frame(StackFrame::new("main".into(), 0, 1));
        let l = env
            .memory
            .allocate(AllocKind::Scalar, &Type::int(), 1, Value::Int(5));
        env.declare("x", l);
        assert_eq!(env.lookup("x"), Some((l, ScopeKind::Local)));

        env.pop_frame();
        assert_eq!(env.lookup("x"), Some((g, ScopeKind::Global)));
        assert!(env.memory.read(l).is_err());
    }
}
