//! # bparse
//!
//! Syntactic analysis stage: consumes the token stream (the `_tokens.json`
//! sidecar when present, otherwise a fresh scan of the source), prints the
//! AST as JSON and writes the `_ast.json` artifact.

use std::{error::Error, fs};

use clap::Parser as CliParser;
use log::info;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    diagnostics,
    lexer::{Lexer, Token},
    parser::Parser,
};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Syntactic analysis stage for Bora source files.")]
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

    let tokens: Vec<Token> = if paths.tokens().exists() {
        info!("loading token sidecar '{}'", paths.tokens().display());
        artifact::load_json(&paths.tokens())?
    } else {
        let source = fs::read_to_string(&args.file)?;
        Lexer::new(&source).scan().filtered_tokens()
    };

    let (ast, errors) = Parser::new(tokens).parse();

    println!("{}", serde_json::to_string_pretty(&ast)?);
    artifact::save_json(&paths.ast(), &ast)?;
    info!("AST written to '{}'", paths.ast().display());

    diagnostics::report("syntax", &errors);
    Ok(())
}
