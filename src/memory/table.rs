//! Flat memory table: the simulated address space
//!
//! Every allocation (a scalar, an array's run of slots, or one heap node) gets
//! a contiguous run of slot addresses from a monotonically increasing counter.
//! Stack-style allocations and heap nodes draw from separate regions (see
//! [`STACK_ADDRESS_START`] and [`HEAP_ADDRESS_START`]), so a pointer's region
//! alone tells a local from a node. Addresses are never recycled: retiring an
//! allocation only marks it dead, which is how dangling pointers are detected.
//!
//! # Slot Layout
//!
//! ```text
//! scalar      base
//! array[n]    base + i            for i in 0..n
//! node        base + field_index  in struct declaration order
//! ```

use super::value::{Address, Value};
use crate::interpreter::constants::{HEAP_ADDRESS_START, STACK_ADDRESS_START};
use crate::parser::ast::Type;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// What an allocation holds
#[derive(Debug, Clone, PartialEq)]
pub enum AllocKind {
    Scalar,
    Array,
    /// A heap node of the named struct; slot i holds field i
    Node { struct_name: String },
}

/// One allocation in the table
#[derive(Debug, Clone)]
pub struct Allocation {
    pub base: Address,
    pub len: usize,
    pub kind: AllocKind,
    /// Scalar type, array element type, or the struct type for nodes
    pub ty: Type,
    /// Per-slot types; only differs from `ty` for node fields
    pub slot_types: Vec<Type>,
    pub live: bool,
}

impl Allocation {
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr < self.base + self.len as Address
    }

    pub fn slot_type(&self, addr: Address) -> &Type {
        let offset = (addr - self.base) as usize;
        self.slot_types.get(offset).unwrap_or(&self.ty)
    }
}

/// Why a memory access failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFault {
    /// Address 0
    Null,
    /// The allocation existed but has been retired (scope exit or `free`)
    Dangling,
    /// No allocation ever covered this address
    Unmapped,
}

/// Address → value table plus allocation metadata
#[derive(Debug, Clone)]
pub struct MemoryTable {
    slots: FxHashMap<Address, Value>,
    allocations: BTreeMap<Address, Allocation>,
    next_stack: Address,
    next_heap: Address,
}

impl MemoryTable {
    pub fn new() -> Self {
        MemoryTable {
            slots: FxHashMap::default(),
            allocations: BTreeMap::new(),
            next_stack: STACK_ADDRESS_START,
            next_heap: HEAP_ADDRESS_START,
        }
    }

    /// Allocate `len` stack-region slots of type `ty`, filled with `init`
    pub fn allocate(&mut self, kind: AllocKind, ty: &Type, len: usize, init: Value) -> Address {
        let base = self.next_stack;
        self.next_stack += len.max(1) as Address;
        self.insert(base, kind, ty.clone(), vec![ty.clone(); len], init);
        base
    }

    /// Allocate one heap node with a slot per field
    pub fn allocate_node(&mut self, struct_type: &Type, field_types: Vec<Type>) -> Address {
        let base = self.next_heap;
        let len = field_types.len();
        self.next_heap += len.max(1) as Address;
        let kind = AllocKind::Node {
            struct_name: struct_type.struct_name().unwrap_or_default().to_string(),
        };
        self.insert(base, kind, struct_type.clone(), field_types, Value::Undefined);
        base
    }

    fn insert(
        &mut self,
        base: Address,
        kind: AllocKind,
        ty: Type,
        slot_types: Vec<Type>,
        init: Value,
    ) {
        let len = slot_types.len();
        for offset in 0..len {
            self.slots.insert(base + offset as Address, init);
        }
        self.allocations.insert(
            base,
            Allocation {
                base,
                len,
                kind,
                ty,
                slot_types,
                live: true,
            },
        );
    }

    /// The allocation whose slot run covers `addr`, live or not
    pub fn allocation_containing(&self, addr: Address) -> Option<&Allocation> {
        self.allocations
            .range(..=addr)
            .next_back()
            .map(|(_, alloc)| alloc)
            .filter(|alloc| alloc.contains(addr))
    }

    /// The allocation starting exactly at `base`
    pub fn allocation(&self, base: Address) -> Option<&Allocation> {
        self.allocations.get(&base)
    }

    /// The live allocation covering `addr`, or the reason there is none
    pub fn live_allocation(&self, addr: Address) -> Result<&Allocation, MemoryFault> {
        if addr == 0 {
            return Err(MemoryFault::Null);
        }
        match self.allocation_containing(addr) {
            Some(alloc) if alloc.live => Ok(alloc),
            Some(_) => Err(MemoryFault::Dangling),
            None => Err(MemoryFault::Unmapped),
        }
    }

    pub fn read(&self, addr: Address) -> Result<Value, MemoryFault> {
        self.live_allocation(addr)?;
        Ok(self.slots.get(&addr).copied().unwrap_or_default())
    }

    pub fn write(&mut self, addr: Address, value: Value) -> Result<(), MemoryFault> {
        self.live_allocation(addr)?;
        self.slots.insert(addr, value);
        Ok(())
    }

    /// Mark the allocation at `base` dead. Its addresses stay reserved.
    pub fn retire(&mut self, base: Address) {
        if let Some(alloc) = self.allocations.get_mut(&base) {
            alloc.live = false;
            for offset in 0..alloc.len {
                self.slots.remove(&(base + offset as Address));
            }
        }
    }

    /// Live heap nodes in address order
    pub fn live_nodes(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations
            .range(HEAP_ADDRESS_START..)
            .map(|(_, alloc)| alloc)
            .filter(|alloc| alloc.live)
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BaseType;

    #[test]
    fn test_addresses_are_monotonic_and_never_reused() {
        let mut mem = MemoryTable::new();
        let a = mem.allocate(AllocKind::Scalar, &Type::int(), 1, Value::Int(1));
        let arr = mem.allocate(AllocKind::Array, &Type::int(), 5, Value::Int(0));
        mem.retire(a);
        let b = mem.allocate(AllocKind::Scalar, &Type::int(), 1, Value::Undefined);

        assert_eq!(a, STACK_ADDRESS_START);
        assert_eq!(arr, a + 1);
        assert_eq!(b, arr + 5);
    }

    #[test]
    fn test_array_slots_and_containing_allocation() {
        let mut mem = MemoryTable::new();
        let arr = mem.allocate(AllocKind::Array, &Type::int(), 3, Value::Int(0));
        mem.write(arr + 2, Value::Int(9)).unwrap();

        assert_eq!(mem.read(arr + 2), Ok(Value::Int(9)));
        assert_eq!(mem.allocation_containing(arr + 1).map(|a| a.base), Some(arr));
        assert_eq!(mem.read(arr + 3), Err(MemoryFault::Unmapped));
    }

    #[test]
    fn test_dangling_and_null() {
        let mut mem = MemoryTable::new();
        let node_ty = Type::new(BaseType::Struct("Node".into()));
        let node = mem.allocate_node(&node_ty, vec![Type::int(), node_ty.clone().with_pointer()]);

        assert!(node >= HEAP_ADDRESS_START);
        assert_eq!(mem.read(node), Ok(Value::Undefined));
        assert_eq!(mem.live_nodes().count(), 1);

        mem.retire(node);
        assert_eq!(mem.read(node + 1), Err(MemoryFault::Dangling));
        assert_eq!(mem.read(0), Err(MemoryFault::Null));
        assert_eq!(mem.live_nodes().count(), 0);
    }
}
