//! `main()`: parses CLI args, drives `harlock::exec`, and reports
//! diagnostics (spec.md §6.1). Grounded on the teacher's
//! `src/bin/why/main.rs` shape (`Cli::init()` → `simple_logger::init`
//! → dispatch), flattened since Harlock has no subcommands.

use std::fs::File;
use std::io;
use std::process::ExitCode;

use log::error;

use harlock::cli::Cli;

fn main() -> ExitCode {
    let args = Cli::init();
    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    if let Some(embed_target) = args.embed {
        error!(
            "-embed {} is not supported: the external builder collaborator is out of scope for this interpreter",
            embed_target.display()
        );
        return ExitCode::FAILURE;
    }

    let Some(filename) = args.filename else {
        error!("no filename given: Harlock's interactive REPL is out of scope for this interpreter");
        return ExitCode::FAILURE;
    };

    let file = match File::open(&filename) {
        Ok(file) => file,
        Err(e) => {
            error!("could not open {}: {e}", filename.display());
            return ExitCode::FAILURE;
        }
    };

    match harlock::exec(file, io::stderr(), args.args) {
        None => ExitCode::SUCCESS,
        Some(_) => ExitCode::FAILURE,
    }
}
