//! Artifact persistence: every stage's product is written next to the
//! source file and can be reloaded by the next stage without loss.

use std::fs;

use bora_lang::{
    artifact::{self, ArtifactPaths},
    lexer::{Lexer, Token},
    parser::{AstNode, Parser},
    semantic::SemanticAnalyzer,
    tac::{CodeGenerator, Program},
};

const SOURCE: &str = "main { int a; float b; a = 7; b = a / 2; cout << b; }";

#[test]
fn artifacts_round_trip_through_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("program.txt");
    fs::write(&source_path, SOURCE).unwrap();

    let paths = ArtifactPaths::for_source(&source_path);

    // Stage 1: tokens.
    let tokens = Lexer::new(SOURCE).scan().filtered_tokens();
    artifact::save_json(&paths.tokens(), &tokens).unwrap();
    let loaded_tokens: Vec<Token> = artifact::load_json(&paths.tokens()).unwrap();
    assert_eq!(tokens, loaded_tokens);

    // Stage 2: AST, structural equality across serialization.
    let (ast, errors) = Parser::new(loaded_tokens).parse();
    assert!(errors.is_empty());
    artifact::save_json(&paths.ast(), &ast).unwrap();
    let mut loaded_ast: AstNode = artifact::load_json(&paths.ast()).unwrap();
    assert_eq!(ast, loaded_ast);

    // Stage 3: annotated AST and symbol table.
    let analysis = SemanticAnalyzer::new().analyze(&mut loaded_ast);
    assert!(analysis.errors.is_empty());
    artifact::save_json(&paths.annotated_ast(), &loaded_ast).unwrap();
    artifact::save_json(&paths.symbol_table(), &analysis.cross_references).unwrap();

    let annotated: AstNode = artifact::load_json(&paths.annotated_ast()).unwrap();
    assert_eq!(annotated, loaded_ast);

    // Stage 4: TAC text survives a write/read cycle byte for byte.
    let program = CodeGenerator::new().generate(&annotated);
    artifact::save_text(&paths.intermediate(), &program.to_text()).unwrap();
    let reloaded = Program::from_text(&artifact::load_text(&paths.intermediate()).unwrap());
    assert_eq!(program, reloaded);

    // All five artifacts exist under the documented names.
    for path in [
        paths.tokens(),
        paths.ast(),
        paths.annotated_ast(),
        paths.symbol_table(),
        paths.intermediate(),
    ] {
        assert!(path.exists(), "missing artifact {}", path.display());
    }
}

#[test]
fn symbol_table_artifact_has_the_documented_shape() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("shape.txt");
    fs::write(&source_path, SOURCE).unwrap();
    let paths = ArtifactPaths::for_source(&source_path);

    let tokens = Lexer::new(SOURCE).scan().filtered_tokens();
    let (mut ast, _) = Parser::new(tokens).parse();
    let analysis = SemanticAnalyzer::new().analyze(&mut ast);
    artifact::save_json(&paths.symbol_table(), &analysis.cross_references).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(paths.symbol_table()).unwrap()).unwrap();

    assert_eq!(raw["a"]["type"], "int");
    assert_eq!(raw["a"]["address"], 1);
    assert_eq!(raw["b"]["type"], "float");
    assert_eq!(raw["b"]["address"], 2);
    let lines: Vec<u64> = raw["a"]["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);
}

#[test]
fn annotated_ast_carries_semantic_fields_in_json() {
    let tokens = Lexer::new("main { int a; a = 2 + 3; }").scan().filtered_tokens();
    let (mut ast, _) = Parser::new(tokens).parse();
    SemanticAnalyzer::new().analyze(&mut ast);

    let json = serde_json::to_value(&ast).unwrap();
    let list = &json["children"][2];
    let assignment = &list["children"][1];
    let rhs = &assignment["children"][1];

    assert_eq!(rhs["node_type"], "expresion_simple");
    assert_eq!(rhs["semantic_type"], "int");
    assert_eq!(rhs["semantic_value"], 5);
}
