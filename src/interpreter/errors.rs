//! Runtime error types for the tracing interpreter
//!
//! This module defines [`RuntimeError`], which represents every way a run can
//! stop early (as opposed to parse errors, which stop it before it starts).
//!
//! All runtime errors are fatal: they halt execution, and the trace assembler
//! records them as the terminal status of the Steps produced so far. Each
//! variant maps onto one of two public taxonomies:
//! - [`RuntimeErrorKind`] for program faults ([`RuntimeError::kind`])
//! - [`LimitKind`] for resource guards ([`RuntimeError::limit`])

use crate::parser::ast::SourceLocation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Program fault categories reported in a trace status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeErrorKind {
    DivisionByZero,
    NullDereference,
    IndexOutOfBounds,
    UndefinedVariable,
    TypeMismatch,
}

/// Resource guards that can truncate a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    StepBudgetExceeded,
    RecursionDepthExceeded,
    SnapshotMemoryExceeded,
    /// Wall-clock timeout; only seen on runs the caller has already discarded
    TimeLimitExceeded,
}

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{operation} by zero at {location}")]
    DivisionByZero {
        operation: &'static str,
        location: SourceLocation,
    },

    #[error("null pointer dereference at {location}")]
    NullDereference { location: SourceLocation },

    /// Access through a pointer whose target left scope or was freed
    #[error("dangling pointer 0x{address:08x} dereferenced at {location}")]
    DanglingPointer {
        address: u64,
        location: SourceLocation,
    },

    /// Access through a pointer that never pointed at an allocation
    #[error("invalid address 0x{address:08x} dereferenced at {location}")]
    InvalidAddress {
        address: u64,
        location: SourceLocation,
    },

    #[error("index {index} out of bounds for array of size {size} at {location}")]
    IndexOutOfBounds {
        index: i64,
        size: usize,
        location: SourceLocation,
    },

    #[error("undefined variable '{name}' at {location}")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("'{name}' is read before it is initialized at {location}")]
    UninitializedRead {
        name: String,
        location: SourceLocation,
    },

    #[error("type mismatch at {location}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("struct {struct_name} has no field '{field_name}' at {location}")]
    MissingStructField {
        struct_name: String,
        field_name: String,
        location: SourceLocation,
    },

    #[error("invalid format at {location}: {message}")]
    InvalidFormat {
        message: String,
        location: SourceLocation,
    },

    #[error("free of 0x{address:08x}, which is not a live heap node, at {location}")]
    InvalidFree {
        address: u64,
        location: SourceLocation,
    },

    #[error("step budget of {limit} steps exhausted")]
    StepBudgetExceeded { limit: usize },

    #[error("recursion depth limit of {limit} exceeded calling '{function}' at {location}")]
    RecursionDepthExceeded {
        limit: usize,
        function: String,
        location: SourceLocation,
    },

    #[error("snapshot memory limit of {limit} bytes exceeded ({used} bytes recorded)")]
    SnapshotMemoryExceeded { used: usize, limit: usize },

    /// The caller abandoned the run (wall-clock timeout)
    #[error("run cancelled")]
    Cancelled,
}

impl RuntimeError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::NullDereference { location }
            | RuntimeError::DanglingPointer { location, .. }
            | RuntimeError::InvalidAddress { location, .. }
            | RuntimeError::IndexOutOfBounds { location, .. }
            | RuntimeError::UndefinedVariable { location, .. }
            | RuntimeError::UninitializedRead { location, .. }
            | RuntimeError::TypeMismatch { location, .. }
            | RuntimeError::MissingStructField { location, .. }
            | RuntimeError::InvalidFormat { location, .. }
            | RuntimeError::InvalidFree { location, .. }
            | RuntimeError::RecursionDepthExceeded { location, .. } => Some(*location),
            RuntimeError::StepBudgetExceeded { .. }
            | RuntimeError::SnapshotMemoryExceeded { .. }
            | RuntimeError::Cancelled => None,
        }
    }

    /// Program fault category, or `None` for resource guards and cancellation
    pub fn kind(&self) -> Option<RuntimeErrorKind> {
        let kind = match self {
            RuntimeError::DivisionByZero { .. } => RuntimeErrorKind::DivisionByZero,
            RuntimeError::NullDereference { .. }
            | RuntimeError::DanglingPointer { .. }
            | RuntimeError::InvalidAddress { .. } => RuntimeErrorKind::NullDereference,
            RuntimeError::IndexOutOfBounds { .. } => RuntimeErrorKind::IndexOutOfBounds,
            RuntimeError::UndefinedVariable { .. } | RuntimeError::UninitializedRead { .. } => {
                RuntimeErrorKind::UndefinedVariable
            }
            RuntimeError::TypeMismatch { .. }
            | RuntimeError::MissingStructField { .. }
            | RuntimeError::InvalidFormat { .. }
            | RuntimeError::InvalidFree { .. } => RuntimeErrorKind::TypeMismatch,
            RuntimeError::StepBudgetExceeded { .. }
            | RuntimeError::RecursionDepthExceeded { .. }
            | RuntimeError::SnapshotMemoryExceeded { .. }
            | RuntimeError::Cancelled => return None,
        };
        Some(kind)
    }

    /// Resource guard category, or `None` for program faults
    pub fn limit(&self) -> Option<LimitKind> {
        match self {
            RuntimeError::StepBudgetExceeded { .. } => Some(LimitKind::StepBudgetExceeded),
            RuntimeError::RecursionDepthExceeded { .. } => Some(LimitKind::RecursionDepthExceeded),
            RuntimeError::SnapshotMemoryExceeded { .. } => Some(LimitKind::SnapshotMemoryExceeded),
            _ => None,
        }
    }

    /// Shorthand for the common type error
    pub fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        RuntimeError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_has_exactly_one_category() {
        let loc = SourceLocation::new(3, 7);
        let errors = [
            RuntimeError::DivisionByZero {
                operation: "division",
                location: loc,
            },
            RuntimeError::DanglingPointer {
                address: 8,
                location: loc,
            },
            RuntimeError::UninitializedRead {
                name: "x".into(),
                location: loc,
            },
            RuntimeError::InvalidFormat {
                message: "bad".into(),
                location: loc,
            },
            RuntimeError::StepBudgetExceeded { limit: 10 },
            RuntimeError::RecursionDepthExceeded {
                limit: 5,
                function: "f".into(),
                location: loc,
            },
        ];
        for err in &errors {
            assert!(err.kind().is_some() != err.limit().is_some(), "{:?}", err);
        }
        assert_eq!(errors[1].kind(), Some(RuntimeErrorKind::NullDereference));
        assert_eq!(errors[2].kind(), Some(RuntimeErrorKind::UndefinedVariable));
        assert!(RuntimeError::Cancelled.kind().is_none() && RuntimeError::Cancelled.limit().is_none());
    }

    #[test]
    fn test_display_includes_location() {
        let err = RuntimeError::DivisionByZero {
            operation: "division",
            location: SourceLocation::new(4, 9),
        };
        assert_eq!(err.to_string(), "division by zero at line 4, column 9");
    }
}
