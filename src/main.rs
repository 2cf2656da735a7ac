// ctrace: record a step-by-step execution trace of a small C program

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use ctrace::{TraceConfig, TraceResult, TraceStatus};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
enum CliError {
    #[error("usage: ctrace <file.c> [stdin-file|-]")]
    Usage,

    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read standard input: {0}")]
    Stdin(#[source] io::Error),

    #[error("cannot serialize trace: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(formatter)
        .init();
}

fn read_file(path: PathBuf) -> Result<String, CliError> {
    fs::read_to_string(&path).map_err(|source| CliError::Read { path, source })
}

fn read_stdin_arg(arg: Option<String>) -> Result<String, CliError> {
    match arg.as_deref() {
        None => Ok(String::new()),
        Some("-") => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(CliError::Stdin)?;
            Ok(input)
        }
        Some(path) => read_file(PathBuf::from(path)),
    }
}

fn summary(result: &TraceResult) -> (String, u8) {
    let steps = result.steps.len();
    match &result.status {
        TraceStatus::Completed => (format!("completed: {} steps", steps), 0),
        TraceStatus::ParseError {
            line,
            column,
            message,
        } => (
            format!("parse error at line {}, column {}: {}", line, column, message),
            1,
        ),
        TraceStatus::RuntimeError {
            message, step_index, ..
        } => (
            format!("runtime error at step {}: {}", step_index, message),
            2,
        ),
        TraceStatus::LimitExceeded { kind, message } => (
            format!("limit exceeded ({:?}) after {} steps: {}", kind, steps, message),
            3,
        ),
    }
}

fn run() -> Result<u8, CliError> {
    let mut args = std::env::args().skip(1);
    let source_path = args.next().map(PathBuf::from).ok_or(CliError::Usage)?;
    let stdin_arg = args.next();
    if args.next().is_some() {
        return Err(CliError::Usage);
    }

    let source = read_file(source_path)?;
    let stdin = read_stdin_arg(stdin_arg)?;

    let result = ctrace::trace_with_config(&source, &stdin, &TraceConfig::from_env());
    println!("{}", result.to_json_pretty()?);

    let (line, code) = summary(&result);
    eprintln!("{}", line);
    Ok(code)
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(64)
        }
    }
}
