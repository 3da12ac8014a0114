//! Runtime arguments
//!
//! Only `--test_input`, `--rp_debugger` and the positional log level belong
//! to the worker. Every other token is handed back untouched, in order, so
//! the user's own code can parse it.

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{BootstrapError, Result};

const TEST_INPUT_FLAG: &str = "--test_input";
const DEBUGGER_FLAG: &str = "--rp_debugger";

#[derive(Parser, Debug)]
#[command(name = "runpod", bin_name = "runpod", args_override_self = true)]
#[command(about = "Runpod Serverless Worker Arguments.", long_about = None)]
struct RuntimeArgsCli {
    /// Test input for the worker, formatted as JSON.
    #[arg(long = "test_input", allow_hyphen_values = true)]
    test_input: Option<String>,

    /// Flag to enable the Debugger.
    #[arg(long = "rp_debugger")]
    rp_debugger: bool,

    /// Controls what level of logs are printed to the console.
    /// Options: ERROR, WARN, INFO, and DEBUG.
    rp_log_level: String,
}

/// Parsed worker arguments, stored in the config as `rp_args`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeArgs {
    pub test_input: Option<Value>,
    /// `Some(true)` when `--rp_debugger` was given, `None` otherwise.
    pub rp_debugger: Option<bool>,
    pub rp_log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArgs {
    pub args: RuntimeArgs,
    /// Program name followed by every unrecognised token.
    pub residual: Vec<String>,
}

/// Partition argv (without program name) into worker tokens and the rest.
///
/// The first token that does not start with `-` is taken as the log level.
pub fn split_known_args(args: &[String]) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut residual = Vec::new();
    let mut have_level = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == TEST_INPUT_FLAG {
            known.push(arg.clone());
            if let Some(value) = iter.next() {
                known.push(value.clone());
            }
        } else if arg == DEBUGGER_FLAG || arg.starts_with("--test_input=") {
            known.push(arg.clone());
        } else if !have_level && !arg.starts_with('-') {
            known.push(arg.clone());
            have_level = true;
        } else {
            residual.push(arg.clone());
        }
    }

    (known, residual)
}

/// Parse the worker's tokens out of a full argv and decode `--test_input`.
pub fn parse_runtime_args<I, T>(argv: I) -> Result<ParsedArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut argv = argv.into_iter().map(Into::into);
    let program = argv.next().unwrap_or_else(|| "runpod".to_string());
    let rest: Vec<String> = argv.collect();

    let (known, unknown) = split_known_args(&rest);
    let cli = RuntimeArgsCli::try_parse_from(std::iter::once(program.clone()).chain(known))?;

    // An empty `--test_input` is kept as the raw empty string.
    let test_input = match cli.test_input {
        Some(raw) if raw.is_empty() => Some(Value::String(raw)),
        Some(raw) => Some(serde_json::from_str(&raw).map_err(BootstrapError::TestInput)?),
        None => None,
    };

    let mut residual = Vec::with_capacity(unknown.len() + 1);
    residual.push(program);
    residual.extend(unknown);

    Ok(ParsedArgs {
        args: RuntimeArgs {
            test_input,
            rp_debugger: cli.rp_debugger.then_some(true),
            rp_log_level: Some(cli.rp_log_level),
        },
        residual,
    })
}
