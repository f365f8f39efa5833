//! Command-line parsing and the immutable run configuration.

use crate::error::BuspassError;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Multi-letter flags that are historically spelled with a single dash.
const SINGLE_DASH_LONG_FLAGS: [&str; 3] = ["ns", "stdin", "rep"];

/// Flags whose value may follow as the next argument.
const VALUE_FLAGS: [&str; 10] = [
    "n",
    "name",
    "ns",
    "namespace",
    "f",
    "file",
    "p",
    "priority",
    "rep",
    "repeat",
];

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "buspass",
    version,
    about = "Send a message to an Azure Service Bus queue or topic"
)]
pub struct Cli {
    /// Queue/topic name
    #[arg(
        short = 'n',
        long = "name",
        alias = "n",
        default_value = "",
        allow_hyphen_values = true
    )]
    pub name: String,

    /// Service Bus namespace name (e.g. myns)
    #[arg(
        long = "ns",
        visible_alias = "namespace",
        default_value = "",
        allow_hyphen_values = true
    )]
    pub namespace: String,

    /// File containing the message body
    #[arg(
        short = 'f',
        long = "file",
        alias = "f",
        default_value = "",
        allow_hyphen_values = true
    )]
    pub file: String,

    /// Read the message body from standard input instead of a file
    /// (`-stdin`, `-stdin=true` or `-stdin=false`)
    #[arg(
        long = "stdin",
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub stdin: bool,

    /// Message priority; 0 sends no priority property
    #[arg(
        short = 'p',
        long = "priority",
        alias = "p",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub priority: i64,

    /// Number of times to send the message
    #[arg(
        long = "rep",
        visible_alias = "repeat",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub repeat: i64,
}

/// Rewrite `-ns`, `-stdin` and `-rep` (also `-ns=value`) to their `--` forms.
///
/// The argument after a value-taking flag is its value and is never rewritten,
/// so `-n -rep` names a queue `-rep`. Arguments after a bare `--` are passed
/// through unchanged.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    let mut value_next = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if std::mem::take(&mut value_next) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            let (single_dash, rest) = match rest.strip_prefix('-') {
                Some(long) => (false, long),
                None => (true, rest),
            };
            let (flag, inline_value) = match rest.split_once('=') {
                Some((flag, _)) => (flag, true),
                None => (rest, false),
            };
            value_next = !inline_value && VALUE_FLAGS.contains(&flag);
            if single_dash && SINGLE_DASH_LONG_FLAGS.contains(&flag) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Stdin,
    File(PathBuf),
}

/// Validated settings for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub entity: String,
    pub namespace: String,
    pub body: BodySource,
    pub priority: i64,
    pub repeat: u32,
}

impl Config {
    /// Validate every required field before any I/O happens.
    pub fn from_cli(cli: Cli) -> Result<Self, BuspassError> {
        if cli.name.is_empty() {
            return Err(BuspassError::usage("queue/topic name is required"));
        }
        if cli.namespace.is_empty() {
            return Err(BuspassError::usage("service bus namespace is required"));
        }

        let body = match (cli.stdin, cli.file.is_empty()) {
            (true, false) => {
                tracing::debug!(path = %cli.file, "--stdin given, ignoring body file");
                BodySource::Stdin
            }
            (true, true) => BodySource::Stdin,
            (false, false) => BodySource::File(PathBuf::from(cli.file)),
            (false, true) => {
                return Err(BuspassError::usage("path to message body file is required"));
            }
        };

        let repeat = match u32::try_from(cli.repeat) {
            Ok(0) => return Err(BuspassError::usage("repeat count must be at least 1")),
            Ok(n) => n,
            Err(_) if cli.repeat < 0 => {
                return Err(BuspassError::usage("repeat count must be at least 1"));
            }
            Err(_) => {
                return Err(BuspassError::usage(format!(
                    "repeat count must be at most {}",
                    u32::MAX
                )));
            }
        };

        Ok(Self {
            entity: cli.name,
            namespace: cli.namespace,
            body,
            priority: cli.priority,
            repeat,
        })
    }

    /// Parse and validate process-style arguments (first item is the program name).
    pub fn try_from_args<I, T>(args: I) -> Result<Result<Self, BuspassError>, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let cli = Cli::try_parse_from(normalize_args(args))?;
        Ok(Self::from_cli(cli))
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
