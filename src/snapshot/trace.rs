//! Trace assembly under resource limits
//!
//! [`TraceAssembler`] appends Steps with strictly increasing ordinals and
//! enforces the step budget, the snapshot memory limit and cancellation before
//! each append, so a limit never leaves a half-recorded Step behind. It is
//! consumed by [`TraceAssembler::finish`], which turns the run's outcome into
//! the terminal [`TraceStatus`] exactly once.

use super::Step;
use crate::interpreter::cancel::CancelToken;
use crate::interpreter::errors::{LimitKind, RuntimeError, RuntimeErrorKind};
use crate::parser::ParseError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, trace, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TraceStatus {
    Completed,
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },
    RuntimeError {
        kind: RuntimeErrorKind,
        message: String,
        /// Ordinal the failing statement's Step would have had
        step_index: usize,
        line: Option<usize>,
        column: Option<usize>,
    },
    LimitExceeded {
        kind: LimitKind,
        message: String,
    },
}

/// Every Step of one run plus its terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub steps: Vec<Step>,
    pub status: TraceStatus,
}

impl TraceResult {
    /// A run that never started because the source did not parse
    pub fn parse_failure(err: &ParseError) -> Self {
        TraceResult {
            steps: Vec::new(),
            status: TraceStatus::ParseError {
                line: err.location.line,
                column: err.location.column,
                message: err.message.clone(),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, TraceStatus::Completed)
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Collects Steps for one run
#[derive(Debug)]
pub struct TraceAssembler {
    steps: Vec<Step>,
    step_budget: usize,
    max_memory: usize,
    current_memory: usize,
    cancel: CancelToken,
}

impl TraceAssembler {
    pub fn new(step_budget: usize, max_memory: usize, cancel: CancelToken) -> Self {
        TraceAssembler {
            steps: Vec::new(),
            step_budget,
            max_memory,
            current_memory: 0,
            cancel,
        }
    }

    /// Check the limits that do not depend on the Step's contents and return
    /// the ordinal the next Step will get
    pub fn reserve(&self) -> Result<usize, RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        if self.steps.len() >= self.step_budget {
            return Err(RuntimeError::StepBudgetExceeded {
                limit: self.step_budget,
            });
        }
        Ok(self.steps.len())
    }

    /// Append a Step if it fits in the snapshot memory limit
    pub fn push(&mut self, step: Step) -> Result<(), RuntimeError> {
        let shares_console = self
            .steps
            .last()
            .is_some_and(|prev| Arc::ptr_eq(&prev.console, &step.console));
        let console_size = if shares_console { 0 } else { step.console.len() };
        let step_size = step.estimated_size() + console_size;

        if self.current_memory + step_size > self.max_memory {
            return Err(RuntimeError::SnapshotMemoryExceeded {
                used: self.current_memory,
                limit: self.max_memory,
            });
        }

        trace!(
            ordinal = step.ordinal,
            line = step.line,
            description = %step.description,
            "step recorded"
        );
        self.current_memory += step_size;
        self.steps.push(step);
        Ok(())
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get current memory usage estimate
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    /// Finalize the trace with the run's outcome
    pub fn finish(self, outcome: Result<(), RuntimeError>) -> TraceResult {
        let step_count = self.steps.len();
        let status = match outcome {
            Ok(()) => TraceStatus::Completed,
            Err(err) => {
                warn!(steps = step_count, error = %err, "run halted");
                status_for(&err, step_count)
            }
        };

        info!(steps = step_count, memory = self.current_memory, ?status, "trace finished");
        TraceResult {
            steps: self.steps,
            status,
        }
    }
}

fn status_for(err: &RuntimeError, step_index: usize) -> TraceStatus {
    if let Some(kind) = err.limit() {
        return TraceStatus::LimitExceeded {
            kind,
            message: err.to_string(),
        };
    }

    match err.kind() {
        Some(kind) => TraceStatus::RuntimeError {
            kind,
            message: err.to_string(),
            step_index,
            line: err.location().map(|l| l.line),
            column: err.location().map(|l| l.column),
        },
        // Cancellation: the caller discards this result
        None => TraceStatus::LimitExceeded {
            kind: LimitKind::TimeLimitExceeded,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;
    use std::collections::BTreeMap;

    fn step(ordinal: usize, console: Arc<str>) -> Step {
        Step {
            ordinal,
            line: 1,
            code: "x = 1;".into(),
            description: "assign x = 1".into(),
            variables: BTreeMap::new(),
            arrays: BTreeMap::new(),
            pointers: BTreeMap::new(),
            heap_nodes: BTreeMap::new(),
            console,
            call_stack: Vec::new(),
            return_value: None,
        }
    }

    #[test]
    fn test_budget_checked_before_append() {
        let mut asm = TraceAssembler::new(2, usize::MAX, CancelToken::new());
        let console: Arc<str> = Arc::from("");
        for _ in 0..2 {
            let ordinal = asm.reserve().unwrap();
            asm.push(step(ordinal, console.clone())).unwrap();
        }
        let err = asm.reserve().unwrap_err();
        assert_eq!(err.limit(), Some(LimitKind::StepBudgetExceeded));

        let result = asm.finish(Err(err));
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].ordinal, 1);
        assert!(matches!(
            result.status,
            TraceStatus::LimitExceeded {
                kind: LimitKind::StepBudgetExceeded,
                ..
            }
        ));
    }

    #[test]
    fn test_memory_limit() {
        let one = step(0, Arc::from("")).estimated_size();
        let mut asm = TraceAssembler::new(100, one * 2 + one / 2, CancelToken::new());
        let console: Arc<str> = Arc::from("");
        asm.push(step(0, console.clone())).unwrap();
        asm.push(step(1, console.clone())).unwrap();
        let err = asm.push(step(2, console)).unwrap_err();
        assert_eq!(err.limit(), Some(LimitKind::SnapshotMemoryExceeded));
        assert_eq!(asm.len(), 2);
        assert_eq!(asm.memory_usage(), one * 2);
    }

    #[test]
    fn test_runtime_error_status_points_at_next_step() {
        let mut asm = TraceAssembler::new(10, usize::MAX, CancelToken::new());
        asm.push(step(0, Arc::from(""))).unwrap();
        let result = asm.finish(Err(RuntimeError::DivisionByZero {
            operation: "division",
            location: SourceLocation::new(5, 11),
        }));

        assert_eq!(
            result.status,
            TraceStatus::RuntimeError {
                kind: RuntimeErrorKind::DivisionByZero,
                message: "division by zero at line 5, column 11".into(),
                step_index: 1,
                line: Some(5),
                column: Some(11),
            }
        );
    }

    #[test]
    fn test_cancellation_stops_reservation() {
        let token = CancelToken::new();
        let asm = TraceAssembler::new(10, usize::MAX, token.clone());
        token.cancel();
        assert_eq!(asm.reserve(), Err(RuntimeError::Cancelled));
    }

    #[test]
    fn test_json_round_trip() {
        let result = TraceResult {
            steps: vec![step(0, Arc::from("hello\n"))],
            status: TraceStatus::Completed,
        };
        let json = result.to_json().unwrap();
        assert!(json.contains("\"status\":\"Completed\""));
        assert_eq!(TraceResult::from_json(&json).unwrap(), result);
    }
}
