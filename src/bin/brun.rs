//! # brun
//!
//! Execution stage: loads the `_intermediate.txt` artifact and interprets
//! it, wiring `READ`/`WRITE` to the standard streams, then reports the final
//! variable state.

use std::{
    error::Error,
    io::{self, Write},
};

use clap::Parser;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    interpreter::Executor,
    tac::Program,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "TAC interpreter stage for Bora source files.")]
struct Cli {
    /// The path to the Bora source file.
    #[arg(index = 1)]
    file: std::path::PathBuf,

    /// Specify the log level of the stage.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    cli::init_logging(&args.verbosity);

    let paths = ArtifactPaths::for_source(&args.file);
    let text = artifact::load_text(&paths.intermediate())?;

    let mut executor = Executor::new(Program::from_text(&text));

    let stdin = io::stdin();
    let stdout = io::stdout();
    executor.run(&mut stdin.lock(), &mut stdout.lock())?;

    for diagnostic in executor.diagnostics() {
        eprintln!("runtime error: {diagnostic}");
    }

    let mut out = stdout.lock();
    writeln!(out, "\nfinal variable state:")?;
    let state = executor.final_state();
    if state.is_empty() {
        writeln!(out, "  (no variables)")?;
    }
    for (name, value) in state {
        writeln!(out, "  {name:<20} = {value}")?;
    }

    Ok(())
}
