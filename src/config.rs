//! Run configuration
//!
//! [`TraceConfig`] carries the resource limits of one trace. Defaults come from
//! [`crate::interpreter::constants`]; [`TraceConfig::from_env`] lets the binary
//! (or an embedding service) override them without recompiling.

use crate::interpreter::constants::{
    DEFAULT_MAX_RECURSION_DEPTH, DEFAULT_SNAPSHOT_MEMORY_LIMIT, DEFAULT_STEP_BUDGET,
};
use std::env;
use tracing::warn;

pub const STEP_BUDGET_VAR: &str = "CTRACE_STEP_BUDGET";
pub const MAX_DEPTH_VAR: &str = "CTRACE_MAX_DEPTH";
pub const SNAPSHOT_MEMORY_VAR: &str = "CTRACE_SNAPSHOT_MEMORY";

/// Resource limits for one trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    /// Maximum number of Steps recorded before the run is halted
    pub step_budget: usize,
    /// Maximum call-stack depth; `main` counts as depth 1
    pub max_recursion_depth: usize,
    /// Cap on the estimated bytes held by recorded Steps
    pub snapshot_memory_limit: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            step_budget: DEFAULT_STEP_BUDGET,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            snapshot_memory_limit: DEFAULT_SNAPSHOT_MEMORY_LIMIT,
        }
    }
}

impl TraceConfig {
    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_snapshot_memory_limit(mut self, bytes: usize) -> Self {
        self.snapshot_memory_limit = bytes;
        self
    }

    /// Defaults, overridden by `CTRACE_STEP_BUDGET`, `CTRACE_MAX_DEPTH` and
    /// `CTRACE_SNAPSHOT_MEMORY` when they are set to valid numbers
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = TraceConfig::default();
        let read = |key: &str, default: usize| match lookup(key) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) => value,
                Err(_) => {
                    warn!(variable = key, value = %raw, "ignoring unparsable limit");
                    default
                }
            },
            None => default,
        };

        TraceConfig {
            step_budget: read(STEP_BUDGET_VAR, defaults.step_budget),
            max_recursion_depth: read(MAX_DEPTH_VAR, defaults.max_recursion_depth),
            snapshot_memory_limit: read(SNAPSHOT_MEMORY_VAR, defaults.snapshot_memory_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_defaults() {
        let config = TraceConfig::default();
        assert_eq!(config.step_budget, 200_000);
        assert_eq!(config.max_recursion_depth, 5_000);
        assert_eq!(config.snapshot_memory_limit, 1 << 30);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let mut vars = FxHashMap::default();
        vars.insert(STEP_BUDGET_VAR, "50".to_string());
        vars.insert(MAX_DEPTH_VAR, "lots".to_string());

        let config = TraceConfig::from_lookup(|key| vars.get(key).cloned());
        assert_eq!(config.step_budget, 50);
        assert_eq!(config.max_recursion_depth, DEFAULT_MAX_RECURSION_DEPTH);
        assert_eq!(config.snapshot_memory_limit, DEFAULT_SNAPSHOT_MEMORY_LIMIT);
    }

    #[test]
    fn test_builder() {
        let config = TraceConfig::default()
            .with_step_budget(10)
            .with_max_recursion_depth(3)
            .with_snapshot_memory_limit(1024);
        assert_eq!(
            config,
            TraceConfig {
                step_budget: 10,
                max_recursion_depth: 3,
                snapshot_memory_limit: 1024
            }
        );
    }
}
