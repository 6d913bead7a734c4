//! # btac
//!
//! Intermediate code generation stage: loads the `_annotated_ast.json`
//! artifact, lowers it to three-address code, prints the program and writes
//! the `_intermediate.txt` artifact.

use std::error::Error;

use clap::Parser;
use log::info;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    parser::AstNode,
    tac::CodeGenerator,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "TAC generation stage for Bora source files.")]
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
    let ast: AstNode = artifact::load_json(&paths.annotated_ast())?;

    let program = CodeGenerator::new().generate(&ast);

    print!("{program}");
    artifact::save_text(&paths.intermediate(), &program.to_text())?;
    info!(
        "intermediate code written to '{}'",
        paths.intermediate().display()
    );

    Ok(())
}
