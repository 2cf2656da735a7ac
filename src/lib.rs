//! # Introduction
//!
//! ctrace parses and executes a small subset of C, capturing a snapshot of the
//! full program state at every point of visible progress. The result is a
//! precomputed, immutable trace that a viewer can step through forward and
//! backward, or seek into, without ever re-running the program.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter → Steps → TraceResult
//! ```
//!
//! 1. [`parser`]: tokenises the source, builds and resolves the AST.
//! 2. [`interpreter`]: walks the AST and emits a Step at each boundary.
//! 3. [`memory`]: the per-run memory model: tagged [`memory::value::Value`]s
//!    in a flat address table, scoped bindings and a call stack.
//! 4. [`snapshot`]: Step capture, the console buffer and trace assembly under
//!    the step budget and snapshot memory limit.
//!
//! ## Example
//!
//! ```
//! let result = ctrace::trace("int main() { int x = 6 * 7; return 0; }", "");
//! assert!(result.is_completed());
//! let x = result.steps[1].variable("x").unwrap();
//! assert_eq!(x.value, ctrace::Value::Int(42));
//! ```

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;

pub use config::TraceConfig;
pub use interpreter::cancel::CancelToken;
pub use interpreter::errors::{LimitKind, RuntimeErrorKind};
pub use memory::value::Value;
pub use snapshot::{Step, TraceResult, TraceStatus};

use interpreter::engine::Interpreter;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// A run abandoned because it outlived its wall-clock limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("trace did not finish within {limit:?}")]
pub struct TraceTimeout {
    pub limit: Duration,
}

/// Trace a program with the default limits
pub fn trace(source: &str, stdin: &str) -> TraceResult {
    trace_with_config(source, stdin, &TraceConfig::default())
}

/// Trace a program with explicit limits
pub fn trace_with_config(source: &str, stdin: &str, config: &TraceConfig) -> TraceResult {
    run(source, stdin, config, CancelToken::new())
}

fn run(source: &str, stdin: &str, config: &TraceConfig, cancel: CancelToken) -> TraceResult {
    let program = match parser::parse(source) {
        Ok(program) => program,
        Err(err) => {
            warn!(error = %err, "parse failed");
            return TraceResult::parse_failure(&err);
        }
    };
    Interpreter::new(&program, source, stdin, config, cancel).run()
}

/// Trace a program on a worker thread, giving up after `limit`
///
/// On timeout the worker is cancelled at its next Step boundary and its
/// partial trace is discarded.
pub fn trace_with_timeout(
    source: &str,
    stdin: &str,
    config: TraceConfig,
    limit: Duration,
) -> Result<TraceResult, TraceTimeout> {
    let cancel = CancelToken::new();
    let (sender, receiver) = mpsc::channel();

    let worker_cancel = cancel.clone();
    let source = source.to_string();
    let stdin = stdin.to_string();
    thread::spawn(move || {
        let result = run(&source, &stdin, &config, worker_cancel);
        // the receiver is gone when the caller already timed out
        let _ = sender.send(result);
    });

    match receiver.recv_timeout(limit) {
        Ok(result) => Ok(result),
        Err(_) => {
            cancel.cancel();
            warn!(?limit, "trace timed out");
            Err(TraceTimeout { limit })
        }
    }
}
