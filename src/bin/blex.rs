//! # blex
//!
//! Lexical analysis stage: scans a Bora source file, prints the token table
//! and a per-kind summary, and writes the `_tokens.json` sidecar.

use std::{collections::BTreeMap, error::Error, fs};

use clap::Parser;
use log::info;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    diagnostics,
    lexer::Lexer,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lexical analysis stage for Bora source files.")]
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

    let source = fs::read_to_string(&args.file)?;
    let result = Lexer::new(&source).scan();
    let tokens = result.filtered_tokens();

    println!("{:<15} {:<24} {:>5} {:>7}", "Kind", "Lexeme", "Line", "Column");
    println!("{}", "-".repeat(54));
    for token in &tokens {
        println!(
            "{:<15} {:<24} {:>5} {:>7}",
            token.kind.to_string(),
            token.lexeme,
            token.line,
            token.column
        );
    }

    println!("\ntotal tokens: {}", tokens.len());
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for token in &tokens {
        *distribution.entry(token.kind.to_string()).or_default() += 1;
    }
    println!("token distribution:");
    for (kind, count) in &distribution {
        println!("  {kind:<15} {count}");
    }

    let paths = ArtifactPaths::for_source(&args.file);
    artifact::save_json(&paths.tokens(), &tokens)?;
    info!("token sidecar written to '{}'", paths.tokens().display());

    diagnostics::report("lexical", &result.errors);
    Ok(())
}
