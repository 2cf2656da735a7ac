//! Built-in function implementations
//!
//! This module provides the C built-ins that are handled by the interpreter
//! rather than defined in user code.
//!
//! # Supported Built-ins
//!
//! - `printf(format, ...)`: formatted output appended to the console buffer
//! - `scanf(format, &x, ...)`: whitespace-delimited tokens from stdin
//! - `malloc(sizeof(struct T))`: allocates one heap node
//! - `free(p)`: retires a heap node
//!
//! # Implementation Notes
//!
//! - Template rendering and input tokenizing live in [`super::formatter`];
//!   this module evaluates arguments, resolves targets and maps failures
//! - A node's fields start uninitialized, like fresh `malloc` memory
//! - `free` keeps the node's addresses reserved, so later use is detected as
//!   a dangling access instead of reading some other node

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatter::{format_output, Conversion, FormatError};
use crate::memory::table::AllocKind;
use crate::memory::value::Value;
use crate::parser::ast::{AstNode, BaseType, SourceLocation, Type};
use tracing::debug;

/// What one `scanf` call did
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReadResult {
    /// The call's value: conversions bound, or -1 on exhausted input
    pub count: i32,
    /// Rendered target and stored value, in order
    pub bound: Vec<(String, Value)>,
}

fn format_error(err: FormatError, location: SourceLocation) -> RuntimeError {
    RuntimeError::InvalidFormat {
        message: err.message,
        location,
    }
}

/// Whether a scanned conversion may be stored into `ty`
fn accepts(conversion: Conversion, ty: &Type) -> bool {
    if ty.is_pointer() {
        return false;
    }
    match conversion {
        Conversion::Int | Conversion::Unsigned | Conversion::Hex | Conversion::Char => {
            matches!(ty.base, BaseType::Int | BaseType::Char)
        }
        Conversion::Float | Conversion::Exp => ty.is_floating(),
        Conversion::Pointer => false,
    }
}

impl Interpreter<'_> {
    /// Evaluate and render a `printf`, appending the text to the console
    pub(crate) fn execute_print(
        &mut self,
        format: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_operand(arg)?);
        }

        let text = format_output(format, &values).map_err(|err| format_error(err, location))?;
        self.console.print(&text);
        Ok(text)
    }

    /// Consume stdin tokens for a `scanf` and store them into its targets
    pub(crate) fn execute_read(
        &mut self,
        format: &str,
        targets: &[AstNode],
        location: SourceLocation,
    ) -> Result<ReadResult, RuntimeError> {
        let mut places = Vec::with_capacity(targets.len());
        for target in targets {
            places.push(self.resolve_place(target)?);
        }

        let (conversions, outcome) = self
            .input
            .scan(format)
            .map_err(|err| format_error(err, location))?;

        if conversions.len() != places.len() {
            return Err(RuntimeError::InvalidFormat {
                message: format!(
                    "format has {} conversion(s) but {} target(s) given",
                    conversions.len(),
                    places.len()
                ),
                location,
            });
        }
        for (conversion, place) in conversions.iter().zip(&places) {
            if place.array_len.is_some() || !accepts(*conversion, &place.ty) {
                return Err(RuntimeError::type_mismatch(
                    format!("target for {:?} input", conversion),
                    place.ty.to_string(),
                    location,
                ));
            }
        }

        let mut bound = Vec::with_capacity(outcome.values.len());
        for ((value, place), target) in outcome.values.iter().zip(&places).zip(targets) {
            let stored = self.write_place(place, *value, location)?;
            bound.push((target.render(), stored));
        }

        debug!(bound = bound.len(), remaining = self.input.remaining().len(), "read input");
        Ok(ReadResult {
            count: outcome.result(),
            bound,
        })
    }

    /// `malloc(sizeof(struct T))`: a fresh node with uninitialized fields
    pub(crate) fn execute_new_node(
        &mut self,
        struct_name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let def = self.env.struct_def(struct_name).ok_or_else(|| {
            RuntimeError::type_mismatch("defined struct", format!("struct {}", struct_name), location)
        })?;
        let field_types: Vec<Type> = def.fields.iter().map(|f| f.field_type.clone()).collect();
        let struct_type = Type::new(BaseType::Struct(struct_name.to_string()));

        let address = self.env.memory.allocate_node(&struct_type, field_types);
        debug!(node = %format!("0x{:08x}", address), struct_name, "allocated node");
        Ok(Value::Address(address))
    }

    /// `free(p)`: retire the node `p` points at; `free(NULL)` does nothing
    pub(crate) fn execute_free(
        &mut self,
        args: &[Value],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let address = match args {
            [Value::Address(address)] => *address,
            [other] => {
                return Err(RuntimeError::type_mismatch("pointer", other.type_name(), location))
            }
            _ => {
                return Err(RuntimeError::type_mismatch(
                    "1 argument to free",
                    args.len().to_string(),
                    location,
                ))
            }
        };
        if address == 0 {
            return Ok(Value::Undefined);
        }

        match self.env.memory.allocation(address) {
            Some(alloc) if matches!(alloc.kind, AllocKind::Node { .. }) => {
                if !alloc.live {
                    return Err(RuntimeError::DanglingPointer { address, location });
                }
            }
            _ => return Err(RuntimeError::InvalidFree { address, location }),
        }

        self.env.memory.retire(address);
        debug!(node = %format!("0x{:08x}", address), "freed node");
        Ok(Value::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_targets_must_match_conversion() {
        let int = Type::int();
        let double = Type::new(BaseType::Double);
        let char_ty = Type::new(BaseType::Char);

        assert!(accepts(Conversion::Int, &int));
        assert!(accepts(Conversion::Char, &char_ty));
        assert!(accepts(Conversion::Float, &double));
        assert!(!accepts(Conversion::Float, &int));
        assert!(!accepts(Conversion::Int, &double));
        assert!(!accepts(Conversion::Int, &int.with_pointer()));
    }
}
