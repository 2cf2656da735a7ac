//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single function's activation record
//!
//! # Scoping
//!
//! Each frame keeps one name → address map plus a stack of block scopes. A
//! declaration that shadows an outer name records the outer binding so that
//! leaving the block restores it; leaving a block also hands back every
//! address the block allocated so the caller can retire it.

use super::value::Address;
use rustc_hash::FxHashMap;

/// Stack frame for a function call
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    /// Line of the call expression in the caller (0 for the entry call)
    pub call_line: usize,
    /// Line of the function's declaration
    pub entry_line: usize,
    locals: FxHashMap<String, Address>,
    scope_stack: Vec<ScopeData>,
}

#[derive(Debug, Clone, Default)]
struct ScopeData {
    shadowed: Vec<(String, Address)>,
    declared: Vec<String>,
    allocations: Vec<Address>,
}

impl StackFrame {
    pub fn new(function_name: String, call_line: usize, entry_line: usize) -> Self {
        StackFrame {
            function_name,
            call_line,
            entry_line,
            locals: FxHashMap::default(),
            // the function body scope
            scope_stack: vec![ScopeData::default()],
        }
    }

    /// Enter a new scope
    pub fn push_scope(&mut self) {
        self.scope_stack.push(ScopeData::default());
    }

    /// Exit the current scope, returning the allocations it owned
    pub fn pop_scope(&mut self) -> Vec<Address> {
        let Some(scope) = self.scope_stack.pop() else {
            return Vec::new();
        };

        for name in scope.declared {
            self.locals.remove(&name);
        }
        for (name, address) in scope.shadowed {
            self.locals.insert(name, address);
        }
        scope.allocations
    }

    /// Exit every scope, returning all allocations owned by the frame
    pub fn unwind(&mut self) -> Vec<Address> {
        let mut released = Vec::new();
        while !self.scope_stack.is_empty() {
            released.extend(self.pop_scope());
        }
        released
    }

    /// Bind `name` to `address` in the innermost scope
    pub fn declare_var(&mut self, name: String, address: Address) {
        let Some(scope) = self.scope_stack.last_mut() else {
            return;
        };
        scope.allocations.push(address);

        if let Some(outer) = self.locals.insert(name.clone(), address) {
            if scope.declared.contains(&name) || scope.shadowed.iter().any(|(n, _)| *n == name) {
                // redeclared in the same block: the first binding is simply gone
                return;
            }
            scope.shadowed.push((name, outer));
        } else {
            scope.declared.push(name);
        }
    }

    /// Get a local variable's address
    pub fn get_var(&self, name: &str) -> Option<Address> {
        self.locals.get(name).copied()
    }

    /// Visible local bindings (innermost shadowing wins)
    pub fn locals(&self) -> impl Iterator<Item = (&String, Address)> {
        self.locals.iter().map(|(name, addr)| (name, *addr))
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<StackFrame>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { frames: Vec::new() }
    }

    /// Push a new stack frame
    pub fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// All frames, outermost first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_restored_on_scope_exit() {
        let mut frame = StackFrame::new("main".to_string(), 0, 1);
        frame.declare_var("x".to_string(), 4);
        frame.push_scope();
        frame.declare_var("x".to_string(), 5);
        frame.declare_var("y".to_string(), 6);
        assert_eq!(frame.get_var("x"), Some(5));

        let released = frame.pop_scope();
        assert_eq!(released, vec![5, 6]);
        assert_eq!(frame.get_var("x"), Some(4));
        assert_eq!(frame.get_var("y"), None);
    }

    #[test]
    fn test_unwind_releases_everything() {
        let mut frame = StackFrame::new("f".to_string(), 3, 1);
        frame.declare_var("a".to_string(), 10);
        frame.push_scope();
        frame.declare_var("b".to_string(), 11);

        let mut released = frame.unwind();
        released.sort();
        assert_eq!(released, vec![10, 11]);
        assert_eq!(frame.locals().count(), 0);
    }

    #[test]
    fn test_stack_depth() {
        let mut stack = Stack::new();
        stack.push_frame(StackFrame::new("main".to_string(), 0, 1));
        stack.push_frame(StackFrame::new("f".to_string(), 4, 1));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop_frame().map(|f| f.function_name), Some("f".to_string()));
        assert_eq!(stack.current_frame().map(|f| f.call_line), Some(0));
    }
}
