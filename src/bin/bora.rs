//! # bora
//!
//! The pipeline driver. Runs all five stages on a source file in order —
//! scan, parse, semantic analysis, TAC generation, execution — persisting
//! every artifact along the way and stopping at the first stage that reports
//! diagnostics, so a broken program never reaches the interpreter.

use std::{
    error::Error,
    fs,
    io::{self, Write},
};

use clap::Parser as CliParser;
use log::info;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    cli::{self, LogLevel},
    diagnostics,
    interpreter::Executor,
    lexer::Lexer,
    parser::Parser,
    semantic::SemanticAnalyzer,
    tac::CodeGenerator,
};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Run the whole Bora pipeline on a source file.")]
struct Cli {
    /// The path to the Bora source file.
    #[arg(index = 1)]
    file: std::path::PathBuf,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    dump_ast: bool,

    /// Whether to dump the annotated AST (for debugging).
    #[arg(long)]
    dump_annotated: bool,

    /// Specify the log level of the pipeline.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    cli::init_logging(&args.verbosity);

    let source = fs::read_to_string(&args.file)?;
    let paths = ArtifactPaths::for_source(&args.file);

    // Stage 1: scan.
    let scan = Lexer::new(&source).scan();
    let tokens = scan.filtered_tokens();
    artifact::save_json(&paths.tokens(), &tokens)?;
    if !scan.errors.is_empty() {
        diagnostics::report("lexical", &scan.errors);
        return Ok(());
    }
    info!("scanned {} tokens", tokens.len());

    // Stage 2: parse.
    let (mut ast, syntax_errors) = Parser::new(tokens).parse();
    artifact::save_json(&paths.ast(), &ast)?;
    if args.dump_ast {
        info!("parsed AST:\n{}", serde_json::to_string_pretty(&ast)?);
    }
    if !syntax_errors.is_empty() {
        diagnostics::report("syntax", &syntax_errors);
        return Ok(());
    }

    // Stage 3: semantic analysis.
    let analysis = SemanticAnalyzer::new().analyze(&mut ast);
    artifact::save_json(&paths.annotated_ast(), &ast)?;
    artifact::save_json(&paths.symbol_table(), &analysis.cross_references)?;
    if args.dump_annotated {
        info!("annotated AST:\n{}", serde_json::to_string_pretty(&ast)?);
    }
    if !analysis.errors.is_empty() {
        diagnostics::report("semantic", &analysis.errors);
        return Ok(());
    }

    // Stage 4: TAC generation.
    let program = CodeGenerator::new().generate(&ast);
    artifact::save_text(&paths.intermediate(), &program.to_text())?;
    info!("generated {} TAC instructions", program.instructions.len());

    // Stage 5: execution.
    let mut executor = Executor::new(program);
    let stdin = io::stdin();
    let stdout = io::stdout();
    executor.run(&mut stdin.lock(), &mut stdout.lock())?;

    for diagnostic in executor.diagnostics() {
        eprintln!("runtime error: {diagnostic}");
    }

    let mut out = stdout.lock();
    writeln!(out, "\nfinal variable state:")?;
    for (name, value) in executor.final_state() {
        writeln!(out, "  {name:<20} = {value}")?;
    }

    Ok(())
}
