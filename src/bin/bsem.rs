//! # bsem
//!
//! Semantic analysis stage: loads the `_ast.json` artifact, annotates the
//! tree, and writes the `_annotated_ast.json` and `_symbol_table.json`
//! artifacts.

use std::error::Error;

use clap::Parser;
use log::info;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    diagnostics,
    parser::AstNode,
    semantic::SemanticAnalyzer,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Semantic analysis stage for Bora source files.")]
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
    let mut ast: AstNode = artifact::load_json(&paths.ast())?;

    let analysis = SemanticAnalyzer::new().analyze(&mut ast);

    artifact::save_json(&paths.annotated_ast(), &ast)?;
    artifact::save_json(&paths.symbol_table(), &analysis.cross_references)?;
    info!(
        "annotated AST and symbol table written next to '{}'",
        args.file.display()
    );

    println!("{}", serde_json::to_string_pretty(&analysis.cross_references)?);

    diagnostics::report("semantic", &analysis.errors);
    Ok(())
}
