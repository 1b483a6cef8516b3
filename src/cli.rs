//! CLI argument parsing (spec.md §6.1).
//!
//! Grounded on the teacher's `src/bin/why/cli.rs`: a `clap` derive
//! struct plus a `LogLevel` enum wired to `simple_logger`. Harlock has
//! no subcommands (no build/setup split), just a flat set of flags: a
//! script filename, trailing `args…` forwarded to the script, and an
//! `-embed` flag that reports its out-of-scope collaborator rather
//! than reimplementing an external build toolchain (spec.md §1).

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "A small dynamically-typed scripting language for ELF/Intel-HEX/raw-byte post-processing.")]
pub struct Cli {
    /// The script to run. With no filename, Harlock would start a REPL,
    /// which is out of scope for this interpreter (spec.md §1).
    pub filename: Option<std::path::PathBuf>,

    /// Arguments forwarded to the script as the `args` array.
    pub args: Vec<String>,

    /// Wrap the script into a redistributable binary via the external
    /// builder collaborator. Out of scope (spec.md §1): reports that
    /// the collaborator is missing rather than reimplementing it.
    #[arg(long)]
    pub embed: Option<std::path::PathBuf>,

    /// Specify the log level of the interpreter.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
