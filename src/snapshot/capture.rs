//! Building a [`Step`] from the live environment
//!
//! Capture walks the visible bindings (globals, then the current frame's
//! locals, which shadow them), every live heap node, and the call stack, and
//! copies each value out. Nothing in the result borrows from the environment.

use super::{
    ArrayView, ElementView, FieldView, FrameView, HeapNodeView, PointerView, Scope, Step,
    VariableView,
};
use crate::memory::table::{AllocKind, Allocation};
use crate::memory::value::{Address, Value};
use crate::memory::Environment;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the evaluator knows about the step being recorded
#[derive(Debug, Clone)]
pub struct StepContext {
    pub line: usize,
    pub code: String,
    pub description: String,
    pub return_value: Option<Value>,
}

/// Snapshot the environment into a frozen Step
pub fn capture(env: &Environment, console: Arc<str>, ordinal: usize, ctx: StepContext) -> Step {
    let mut visible: BTreeMap<&str, (Address, Scope)> = BTreeMap::new();
    for (name, addr) in env.globals() {
        visible.insert(name, (addr, Scope::Global));
    }
    if let Some(frame) = env.stack.current_frame() {
        for (name, addr) in frame.locals() {
            visible.insert(name, (addr, Scope::Local));
        }
    }

    let mut variables = BTreeMap::new();
    let mut arrays = BTreeMap::new();
    let mut pointers = BTreeMap::new();

    for (name, (addr, scope)) in visible {
        let Some(alloc) = env.memory.allocation(addr) else {
            continue;
        };
        match alloc.kind {
            AllocKind::Array => {
                arrays.insert(name.to_string(), array_view(env, alloc, scope));
            }
            AllocKind::Scalar => {
                let value = env.memory.read(addr).unwrap_or_default();
                if alloc.ty.is_pointer() {
                    let target = value.as_address().unwrap_or(0);
                    pointers.insert(
                        name.to_string(),
                        PointerView {
                            ty: alloc.ty.to_string(),
                            address: addr,
                            target,
                            preview: preview(env, target),
                        },
                    );
                }
                variables.insert(
                    name.to_string(),
                    VariableView {
                        ty: alloc.ty.to_string(),
                        value,
                        address: addr,
                        scope,
                    },
                );
            }
            AllocKind::Node { .. } => {}
        }
    }

    let heap_nodes = env
        .memory
        .live_nodes()
        .map(|node| (node.base, node_view(env, node)))
        .collect();

    let call_stack = env
        .stack
        .frames()
        .iter()
        .map(|frame| FrameView {
            function: frame.function_name.clone(),
            call_line: frame.call_line,
            entry_line: frame.entry_line,
        })
        .collect();

    Step {
        ordinal,
        line: ctx.line,
        code: ctx.code,
        description: ctx.description,
        variables,
        arrays,
        pointers,
        heap_nodes,
        console,
        call_stack,
        return_value: ctx.return_value,
    }
}

fn array_view(env: &Environment, alloc: &Allocation, scope: Scope) -> ArrayView {
    let elements = (0..alloc.len)
        .map(|index| {
            let address = alloc.base + index as Address;
            ElementView {
                index,
                value: env.memory.read(address).unwrap_or_default(),
                address,
            }
        })
        .collect();

    ArrayView {
        elem_type: alloc.ty.to_string(),
        address: alloc.base,
        scope,
        elements,
    }
}

fn node_view(env: &Environment, node: &Allocation) -> HeapNodeView {
    let struct_name = match &node.kind {
        AllocKind::Node { struct_name } => struct_name.clone(),
        _ => String::new(),
    };
    let field_names: Vec<String> = env
        .struct_def(&struct_name)
        .map(|def| def.fields.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(node.len);
    let mut links = BTreeMap::new();
    for (offset, name) in field_names.into_iter().enumerate().take(node.len) {
        let address = node.base + offset as Address;
        let ty = node.slot_type(address);
        let value = env.memory.read(address).unwrap_or_default();
        if let Value::Address(target) = value {
            if ty.is_pointer() && target != 0 {
                links.insert(name.clone(), target);
            }
        }
        fields.push(FieldView {
            name,
            ty: ty.to_string(),
            value,
        });
    }

    HeapNodeView {
        struct_name,
        fields,
        links,
    }
}

/// Render what a pointer currently points at
fn preview(env: &Environment, target: Address) -> Option<String> {
    let alloc = env.memory.live_allocation(target).ok()?;
    if let AllocKind::Node { struct_name } = &alloc.kind {
        if target == alloc.base {
            let def = env.struct_def(struct_name)?;
            let fields: Vec<String> = def
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let value = env
                        .memory
                        .read(alloc.base + i as Address)
                        .unwrap_or_default();
                    format!("{}: {}", f.name, value)
                })
                .collect();
            return Some(format!("struct {} {{ {} }}", struct_name, fields.join(", ")));
        }
    }
    env.memory.read(target).ok().map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stack::StackFrame;
    use crate::parser::ast::{BaseType, Field, StructDef, Type};
    use rustc_hash::FxHashMap;

    fn env_with_node() -> Environment {
        let node = Type::new(BaseType::Struct("Node".into()));
        let mut defs = FxHashMap::default();
        defs.insert(
            "Node".to_string(),
            StructDef {
                name: "Node".into(),
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
        Environment::new(defs)
    }

    fn ctx() -> StepContext {
        StepContext {
            line: 1,
            code: String::new(),
            description: String::new(),
            return_value: None,
        }
    }

    #[test]
    fn test_capture_is_a_deep_copy() {
        let mut env = env_with_node();
        env.push_frame(StackFrame::new("main".into(), 0, 1));
        let x = env
            .memory
            .allocate(AllocKind::Scalar, &Type::int(), 1, Value::Int(1));
        env.declare("x", x);

        let step = capture(&env, Arc::from(""), 0, ctx());
        env.memory.write(x, Value::Int(2)).unwrap();
        let later = capture(&env, Arc::from(""), 1, ctx());

        assert_eq!(step.variable("x").map(|v| v.value), Some(Value::Int(1)));
        assert_eq!(later.variable("x").map(|v| v.value), Some(Value::Int(2)));
        assert_eq!(step.call_stack.len(), 1);
    }

    #[test]
    fn test_pointers_and_heap_links() {
        let mut env = env_with_node();
        env.push_frame(StackFrame::new("main".into(), 0, 1));
        let node_ty = Type::new(BaseType::Struct("Node".into()));
        let ptr_ty = node_ty.clone().with_pointer();

        let a = env
            .memory
            .allocate_node(&node_ty, vec![Type::int(), ptr_ty.clone()]);
        let b = env
            .memory
            .allocate_node(&node_ty, vec![Type::int(), ptr_ty.clone()]);
        env.memory.write(a, Value::Int(1)).unwrap();
        env.memory.write(a + 1, Value::Address(b)).unwrap();
        env.memory.write(b, Value::Int(2)).unwrap();
        env.memory.write(b + 1, Value::NULL).unwrap();

        let head = env
            .memory
            .allocate(AllocKind::Scalar, &ptr_ty, 1, Value::Address(a));
        env.declare("head", head);

        let step = capture(&env, Arc::from(""), 0, ctx());
        let view = &step.pointers["head"];
        assert_eq!(view.target, a);
        assert_eq!(view.ty, "struct Node*");
        assert_eq!(
            view.preview.as_deref(),
            Some(format!("struct Node {{ data: 1, next: {} }}", Value::Address(b)).as_str())
        );
        assert_eq!(step.heap_nodes[&a].links.get("next"), Some(&b));
        assert!(step.heap_nodes[&b].links.is_empty());
    }
}
