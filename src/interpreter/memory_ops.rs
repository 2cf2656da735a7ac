//! Lvalue resolution and checked memory access
//!
//! Every read or write the evaluator performs goes through a [`Place`]: the
//! slot address of a variable, array element, dereferenced pointer or node
//! field, together with the type stored there. Resolving a place is where
//! bounds, NULL and dangling-pointer checks happen, so the rest of the
//! evaluator never touches raw addresses.
//!
//! # Fault mapping
//!
//! - address 0: [`RuntimeError::NullDereference`]
//! - a retired allocation (scope exit or `free`): [`RuntimeError::DanglingPointer`]
//! - an address no allocation ever covered: [`RuntimeError::InvalidAddress`]

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::table::{AllocKind, Allocation, MemoryFault};
use crate::memory::value::{Address, Value};
use crate::parser::ast::*;

/// A resolved storage location
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Place {
    pub address: Address,
    pub ty: Type,
    /// Set when the place is a whole array, which decays to its base address
    pub array_len: Option<usize>,
}

impl Place {
    fn slot(address: Address, ty: Type) -> Self {
        Place {
            address,
            ty,
            array_len: None,
        }
    }
}

/// Map a memory fault onto the runtime error for `address`
pub(crate) fn fault_error(fault: MemoryFault, address: Address, location: SourceLocation) -> RuntimeError {
    match fault {
        MemoryFault::Null => RuntimeError::NullDereference { location },
        MemoryFault::Dangling => RuntimeError::DanglingPointer { address, location },
        MemoryFault::Unmapped => RuntimeError::InvalidAddress { address, location },
    }
}

impl Interpreter<'_> {
    /// Resolve an lvalue expression to the slot it denotes
    pub(crate) fn resolve_place(&mut self, expr: &AstNode) -> Result<Place, RuntimeError> {
        match expr {
            AstNode::Variable(name, location) => {
                let (address, _) =
                    self.env
                        .lookup(name)
                        .ok_or_else(|| RuntimeError::UndefinedVariable {
                            name: name.clone(),
                            location: *location,
                        })?;
                let alloc = self
                    .env
                    .memory
                    .allocation(address)
                    .ok_or(RuntimeError::InvalidAddress {
                        address,
                        location: *location,
                    })?;
                Ok(Place {
                    address,
                    ty: alloc.ty.clone(),
                    array_len: (alloc.kind == AllocKind::Array).then_some(alloc.len),
                })
            }

            AstNode::Index {
                array,
                index,
                location,
            } => {
                let (start, elem_type, available) = self.element_run(array, *location)?;
                let index_value = self.evaluate_expr(index)?;
                let i = index_value.as_int().ok_or_else(|| {
                    RuntimeError::type_mismatch("integer index", index_value.type_name(), *location)
                })?;
                if i < 0 || i as usize >= available {
                    return Err(RuntimeError::IndexOutOfBounds {
                        index: i as i64,
                        size: available,
                        location: *location,
                    });
                }
                Ok(Place::slot(start + i as Address, elem_type))
            }

            AstNode::Deref { operand, location } => {
                let target = self.evaluate_pointer(operand, *location)?;
                let alloc = self.live_allocation(target, *location)?;
                let ty = match alloc.kind {
                    AllocKind::Node { .. } if alloc.base == target => alloc.ty.clone(),
                    _ => alloc.slot_type(target).clone(),
                };
                Ok(Place::slot(target, ty))
            }

            AstNode::FieldAccess {
                object,
                field,
                through_pointer,
                location,
            } => {
                let base = if *through_pointer {
                    self.evaluate_pointer(object, *location)?
                } else {
                    let place = self.resolve_place(object)?;
                    if place.ty.is_pointer() || place.ty.struct_name().is_none() {
                        return Err(RuntimeError::type_mismatch(
                            "struct",
                            place.ty.to_string(),
                            *location,
                        ));
                    }
                    place.address
                };
                self.field_place(base, field, *location)
            }

            other => Err(RuntimeError::type_mismatch(
                "assignable location",
                other.render(),
                other.location(),
            )),
        }
    }

    /// Start address, element type and number of reachable elements for the
    /// left side of an index expression
    fn element_run(
        &mut self,
        array: &AstNode,
        location: SourceLocation,
    ) -> Result<(Address, Type, usize), RuntimeError> {
        if let AstNode::Variable(..) = array {
            let place = self.resolve_place(array)?;
            if let Some(len) = place.array_len {
                return Ok((place.address, place.ty, len));
            }
        }

        // A pointer (e.g. a decayed array parameter) indexes the allocation
        // it points into
        let start = self.evaluate_pointer(array, location)?;
        let alloc = self.live_allocation(start, location)?;
        if let AllocKind::Node { .. } = alloc.kind {
            return Err(RuntimeError::type_mismatch(
                "array or pointer to element",
                alloc.ty.to_string(),
                location,
            ));
        }
        let available = (alloc.base + alloc.len as Address - start) as usize;
        Ok((start, alloc.slot_type(start).clone(), available))
    }

    /// The slot of `field` in the node starting at `base`
    fn field_place(
        &self,
        base: Address,
        field: &str,
        location: SourceLocation,
    ) -> Result<Place, RuntimeError> {
        let alloc = self.live_allocation(base, location)?;
        let struct_name = match &alloc.kind {
            AllocKind::Node { struct_name } if alloc.base == base => struct_name,
            _ => {
                return Err(RuntimeError::type_mismatch(
                    "pointer to struct",
                    alloc.ty.to_string(),
                    location,
                ))
            }
        };

        let def = self
            .env
            .struct_def(struct_name)
            .ok_or_else(|| RuntimeError::type_mismatch("defined struct", struct_name.clone(), location))?;
        let index = def
            .field_index(field)
            .ok_or_else(|| RuntimeError::MissingStructField {
                struct_name: struct_name.clone(),
                field_name: field.to_string(),
                location,
            })?;

        Ok(Place::slot(
            base + index as Address,
            def.fields[index].field_type.clone(),
        ))
    }

    /// Evaluate an expression that must produce an address
    pub(crate) fn evaluate_pointer(
        &mut self,
        expr: &AstNode,
        location: SourceLocation,
    ) -> Result<Address, RuntimeError> {
        match self.evaluate_expr(expr)? {
            Value::Address(address) => Ok(address),
            other => Err(RuntimeError::type_mismatch("pointer", other.type_name(), location)),
        }
    }

    pub(crate) fn live_allocation(
        &self,
        address: Address,
        location: SourceLocation,
    ) -> Result<&Allocation, RuntimeError> {
        self.env
            .memory
            .live_allocation(address)
            .map_err(|fault| fault_error(fault, address, location))
    }

    /// Read a place; arrays decay to their base address
    pub(crate) fn read_place(&self, place: &Place, expr: &AstNode) -> Result<Value, RuntimeError> {
        if place.array_len.is_some() {
            return Ok(Value::Address(place.address));
        }
        let location = expr.location();
        let value = self
            .env
            .memory
            .read(place.address)
            .map_err(|fault| fault_error(fault, place.address, location))?;
        if !value.is_defined() {
            return Err(RuntimeError::UninitializedRead {
                name: expr.render(),
                location,
            });
        }
        Ok(value)
    }

    /// Convert `value` to the place's type and store it; returns what was stored
    pub(crate) fn write_place(
        &mut self,
        place: &Place,
        value: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if place.array_len.is_some() {
            return Err(RuntimeError::type_mismatch(
                "assignable location",
                format!("array of {}", place.ty),
                location,
            ));
        }
        let stored = self.convert_for_store(value, &place.ty, location)?;
        self.write_slot(place.address, stored, location)?;
        Ok(stored)
    }

    pub(crate) fn write_slot(
        &mut self,
        address: Address,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.env
            .memory
            .write(address, value)
            .map_err(|fault| fault_error(fault, address, location))
    }

    /// Reject the result of a `void` call used as a value
    pub(crate) fn require_defined(&self, value: Value, expr: &AstNode) -> Result<(), RuntimeError> {
        if value.is_defined() {
            Ok(())
        } else {
            Err(RuntimeError::type_mismatch(
                "a value",
                format!("void ({})", expr.render()),
                expr.location(),
            ))
        }
    }
}
