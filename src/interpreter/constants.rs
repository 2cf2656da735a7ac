// Constants for the tracing interpreter

/// Starting address for heap node allocations
/// Heap addresses start at 0x10000000 to clearly distinguish them from stack addresses
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Starting address for stack variable addresses
/// Stack addresses start at 0x00000004 so that 0 is never a valid address
pub const STACK_ADDRESS_START: u64 = 0x0000_0004;

/// Default maximum number of Steps a single trace may record
pub const DEFAULT_STEP_BUDGET: usize = 200_000;

/// Default maximum call-stack depth (the entry call counts as depth 1)
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 5_000;

/// Default cap on the estimated memory held by recorded Steps (1 GiB)
pub const DEFAULT_SNAPSHOT_MEMORY_LIMIT: usize = 1024 * 1024 * 1024;

/// Remaining native stack below which evaluation grows a new segment
pub const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each native stack segment allocated for deep recursion
pub const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;
