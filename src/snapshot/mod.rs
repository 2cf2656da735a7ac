//! Step snapshots for step-through replay
//!
//! A [`Step`] is a frozen, self-contained picture of program state at one point
//! of visible progress. Everything in it is owned data built from the
//! [`Environment`](crate::memory::Environment) at capture time, so later
//! execution can never change a Step that was already recorded.
//!
//! - [`capture`]: builds a Step from the live environment
//! - [`trace`]: collects Steps under resource limits into a [`TraceResult`]

pub mod capture;
pub mod trace;

pub use trace::{TraceAssembler, TraceResult, TraceStatus};

use crate::memory::value::{Address, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Accumulating console output for one run
///
/// The full text is kept, never a delta, so any Step shows everything printed
/// up to it. The shared snapshot is only re-materialized after a print, which
/// lets consecutive Steps share one buffer.
#[derive(Debug, Clone)]
pub struct Console {
    text: String,
    shared: Arc<str>,
    dirty: bool,
}

impl Console {
    pub fn new() -> Self {
        Console {
            text: String::new(),
            shared: Arc::from(""),
            dirty: false,
        }
    }

    /// Append output without adding a newline
    pub fn print(&mut self, text: &str) {
        if !text.is_empty() {
            self.text.push_str(text);
            self.dirty = true;
        }
    }

    /// Everything printed so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Immutable copy of the buffer for a Step
    pub fn snapshot(&mut self) -> Arc<str> {
        if self.dirty {
            self.shared = Arc::from(self.text.as_str());
            self.dirty = false;
        }
        Arc::clone(&self.shared)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a variable lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Local,
}

/// A scalar variable (pointers included)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableView {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Value,
    pub address: Address,
    pub scope: Scope,
}

/// One array element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementView {
    pub index: usize,
    pub value: Value,
    pub address: Address,
}

/// An array variable with all its elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayView {
    pub elem_type: String,
    pub address: Address,
    pub scope: Scope,
    pub elements: Vec<ElementView>,
}

impl ArrayView {
    /// Element values in index order
    pub fn values(&self) -> Vec<Value> {
        self.elements.iter().map(|e| e.value).collect()
    }
}

/// A pointer variable and what it points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerView {
    #[serde(rename = "type")]
    pub ty: String,
    /// The pointer variable's own address
    pub address: Address,
    /// The address it holds (0 for NULL)
    pub target: Address,
    /// Rendered value at the target, absent for NULL or dead targets
    pub preview: Option<String>,
}

/// One field of a heap node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldView {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Value,
}

/// A live heap node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapNodeView {
    pub struct_name: String,
    pub fields: Vec<FieldView>,
    /// Non-NULL pointer fields: field name → target address
    pub links: BTreeMap<String, Address>,
}

/// One call-stack frame, outermost first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameView {
    pub function: String,
    pub call_line: usize,
    pub entry_line: usize,
}

/// Immutable snapshot of program state at one point of visible progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub ordinal: usize,
    pub line: usize,
    /// Trimmed source text of `line`
    pub code: String,
    pub description: String,
    pub variables: BTreeMap<String, VariableView>,
    pub arrays: BTreeMap<String, ArrayView>,
    pub pointers: BTreeMap<String, PointerView>,
    pub heap_nodes: BTreeMap<Address, HeapNodeView>,
    pub console: Arc<str>,
    pub call_stack: Vec<FrameView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

impl Step {
    /// Estimate the memory held by this step in bytes, excluding the console
    /// buffer (which is shared between steps and counted once by the assembler)
    pub fn estimated_size(&self) -> usize {
        // Rough per-entry costs, including map node overhead
        let base = std::mem::size_of::<Step>() + self.code.len() + self.description.len();

        let variables: usize = self
            .variables
            .iter()
            .map(|(name, v)| 64 + name.len() + v.ty.len())
            .sum();

        let arrays: usize = self
            .arrays
            .iter()
            .map(|(name, a)| 64 + name.len() + a.elements.len() * std::mem::size_of::<ElementView>())
            .sum();

        let pointers: usize = self
            .pointers
            .iter()
            .map(|(name, p)| 80 + name.len() + p.ty.len() + p.preview.as_ref().map_or(0, String::len))
            .sum();

        let nodes: usize = self
            .heap_nodes
            .values()
            .map(|n| 64 + n.struct_name.len() + n.fields.len() * 64 + n.links.len() * 48)
            .sum();

        let frames: usize = self
            .call_stack
            .iter()
            .map(|f| std::mem::size_of::<FrameView>() + f.function.len())
            .sum();

        base + variables + arrays + pointers + nodes + frames
    }

    pub fn variable(&self, name: &str) -> Option<&VariableView> {
        self.variables.get(name)
    }

    pub fn array(&self, name: &str) -> Option<&ArrayView> {
        self.arrays.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_snapshot_is_frozen() {
        let mut console = Console::new();
        console.print("a");
        let first = console.snapshot();
        let again = console.snapshot();
        console.print("b\n");
        let second = console.snapshot();

        assert_eq!(&*first, "a");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(&*second, "ab\n");
        assert_eq!(console.text(), "ab\n");
    }
}
