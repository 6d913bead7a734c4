//! Semantic analysis for Bora.
//!
//! A single top-down visitor over the parser's AST that builds the flat
//! symbol table and the cross-reference table, assigns a semantic type to
//! every visited node (and a value where it is statically computable), and
//! collects semantic errors. The tree is annotated in place and never
//! restructured.
//!
//! The `error` type is absorbing: once a subtree is poisoned, operations on
//! it yield `error` without piling further diagnostics onto the same cause.

mod symbol;
mod types;

pub use symbol::{CrossReference, CrossReferenceTable, Symbol, SymbolTable};
pub use types::{SemType, SemValue};

use log::debug;

use crate::{
    diagnostics::Diagnostic,
    parser::{AstNode, NodeKind},
};

/// Result of analyzing a program.
#[derive(Debug, Default)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub cross_references: CrossReferenceTable,
    pub errors: Vec<Diagnostic>,
}

#[derive(Default)]
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    cross_references: CrossReferenceTable,
    errors: Vec<Diagnostic>,
}

fn is_expression(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ExpresionSimple
            | NodeKind::Termino
            | NodeKind::Factor
            | NodeKind::ExpresionRelacional
            | NodeKind::ExpresionLogica
            | NodeKind::Id
            | NodeKind::Numero
            | NodeKind::Bool
            | NodeKind::Cadena
    )
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze and annotate the tree, consuming the analyzer.
    pub fn analyze(mut self, ast: &mut AstNode) -> Analysis {
        self.visit(ast);
        debug!(
            "semantic analysis: {} symbols, {} errors",
            self.symbols.len(),
            self.errors.len()
        );

        Analysis {
            symbols: self.symbols,
            cross_references: self.cross_references,
            errors: self.errors,
        }
    }

    fn error(&mut self, message: String, line: usize, column: usize) {
        self.errors.push(Diagnostic::new(message, line, column));
    }

    /// Dispatch on the node kind, then stamp the node with the result.
    fn visit(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        let (ty, value) = match node.kind {
            NodeKind::Programa | NodeKind::ListaDeclaracion => {
                for child in node.children.iter_mut() {
                    self.visit(child);
                }
                (SemType::Void, None)
            }
            NodeKind::DeclaracionVariable => self.visit_declaracion(node),
            NodeKind::Asignacion => self.visit_asignacion(node),
            NodeKind::Seleccion => self.visit_seleccion(node),
            NodeKind::Iteracion => self.visit_iteracion(node),
            NodeKind::Repeticion => self.visit_repeticion(node),
            NodeKind::SentIn => self.visit_sent_in(node),
            NodeKind::SentOut => self.visit_sent_out(node),
            NodeKind::ExpresionSimple | NodeKind::Termino | NodeKind::Factor => {
                self.visit_arithmetic(node)
            }
            NodeKind::ExpresionRelacional => self.visit_relational(node),
            NodeKind::ExpresionLogica => self.visit_logical(node),
            NodeKind::Id => self.visit_id(node),
            NodeKind::Numero => self.visit_numero(node),
            NodeKind::Bool => {
                let value = node.value_str() == "true";
                (SemType::Bool, Some(SemValue::Bool(value)))
            }
            NodeKind::Cadena => (
                SemType::String,
                Some(SemValue::Str(node.value_str().to_string())),
            ),
            _ => {
                // Structural and keyword nodes: recurse and move on.
                for child in node.children.iter_mut() {
                    self.visit(child);
                }
                (SemType::Structural, None)
            }
        };

        node.semantic_type = Some(ty);
        node.semantic_value = value.clone();
        (ty, value)
    }

    fn visit_declaracion(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        let Some(ty) = SemType::from_name(node.value_str()) else {
            return (SemType::Void, None);
        };

        for child in node.children.iter_mut() {
            if child.kind != NodeKind::Id {
                continue;
            }
            let name = child.value_str().to_string();
            let (line, column) = child.position();

            if self.symbols.contains(&name) {
                self.error(format!("duplicate identifier '{name}'"), line, column);
            } else {
                self.symbols.insert(Symbol {
                    name: name.clone(),
                    ty,
                    declared_line: line,
                    declared_column: column,
                    is_initialized: false,
                    const_value: None,
                });
                self.cross_references.declare(&name, ty, line);
            }

            child.semantic_type = Some(ty);
        }

        (SemType::Void, None)
    }

    fn visit_asignacion(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if node.children.len() < 2 {
            return (SemType::Void, None);
        }

        let name = node.value_str().to_string();
        let (line, column) = node.position();

        self.cross_references.record_use(&name, line);

        let lhs_type = match self.symbols.get(&name) {
            Some(symbol) => symbol.ty,
            None => {
                self.error(
                    format!("undeclared variable '{name}' in assignment"),
                    line,
                    column,
                );
                SemType::Error
            }
        };
        node.children[0].semantic_type = Some(lhs_type);

        let (rhs_type, rhs_value) = self.visit(&mut node.children[1]);

        if lhs_type != SemType::Error && rhs_type != SemType::Error {
            let promotes = lhs_type == SemType::Float && rhs_type == SemType::Int;
            if lhs_type != rhs_type && !promotes {
                self.error(
                    format!("type mismatch: cannot assign '{rhs_type}' to '{lhs_type}'"),
                    line,
                    column,
                );
            }
        }

        if lhs_type != SemType::Error {
            if let Some(symbol) = self.symbols.get_mut(&name) {
                symbol.is_initialized = true;
                symbol.const_value = rhs_value.clone();
            }
        }

        (SemType::Void, rhs_value)
    }

    fn check_condition(&mut self, node: &mut AstNode, construct: &str) {
        let (line, column) = node.position();
        let (ty, _) = self.visit(node);
        if !matches!(ty, SemType::Bool | SemType::Error) {
            self.error(
                format!("'{construct}' condition must be 'bool', but found '{ty}'"),
                line,
                column,
            );
        }
    }

    fn visit_seleccion(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if let Some(condition) = node
            .children
            .iter_mut()
            .find(|child| is_expression(child.kind))
        {
            self.check_condition(condition, "if");
        }

        if let Some(then_block) = node.find_child_mut(NodeKind::ThenBlock) {
            self.visit(then_block);
        }
        if let Some(else_block) = node.find_child_mut(NodeKind::ElseBlock) {
            self.visit(else_block);
        }

        (SemType::Void, None)
    }

    fn visit_iteracion(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if let Some(condition) = node.find_child_mut(NodeKind::Condicion) {
            if let Some(expression) = condition.children.first_mut() {
                self.check_condition(expression, "while");
            }
        }

        if let Some(body) = node.find_child_mut(NodeKind::Cuerpo) {
            self.visit(body);
        }

        (SemType::Void, None)
    }

    fn visit_repeticion(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if let Some(body) = node.find_child_mut(NodeKind::Cuerpo) {
            self.visit(body);
        }

        if let Some(condition) = node.find_child_mut(NodeKind::Condicion) {
            if let Some(expression) = condition.children.first_mut() {
                self.check_condition(expression, "until");
            }
        }

        (SemType::Void, None)
    }

    fn visit_sent_in(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        for child in node.children.iter_mut() {
            if child.kind != NodeKind::Id {
                continue;
            }
            let name = child.value_str().to_string();
            let (line, column) = child.position();

            self.cross_references.record_use(&name, line);

            match self.symbols.get_mut(&name) {
                Some(symbol) => {
                    child.semantic_type = Some(symbol.ty);
                    symbol.is_initialized = true;
                    symbol.const_value = None;
                }
                None => {
                    self.error(format!("undeclared variable '{name}' in 'cin'"), line, column);
                    child.semantic_type = Some(SemType::Error);
                }
            }
        }

        (SemType::Void, None)
    }

    fn visit_sent_out(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        for child in node.children.iter_mut() {
            if matches!(child.kind, NodeKind::Cout | NodeKind::StreamWrite) {
                continue;
            }
            let (line, column) = child.position();
            let (ty, _) = self.visit(child);
            if !ty.is_printable() {
                self.error(format!("non-printable type '{ty}' in 'cout'"), line, column);
            }
        }

        (SemType::Void, None)
    }

    /// `+ - * / % ^` over `expresion_simple`, `termino` and `factor` nodes.
    fn visit_arithmetic(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if node.children.len() < 2 {
            return (SemType::Error, None);
        }

        let op = node.value_str().to_string();
        let (line, column) = node.position();

        let (left_type, left_value) = self.visit(&mut node.children[0]);
        let (right_type, right_value) = self.visit(&mut node.children[1]);

        if left_type == SemType::Error || right_type == SemType::Error {
            return (SemType::Error, None);
        }

        if !left_type.is_numeric() || !right_type.is_numeric() {
            self.error(
                format!(
                    "arithmetic operator '{op}' cannot be applied to '{left_type}' and '{right_type}'"
                ),
                line,
                column,
            );
            return (SemType::Error, None);
        }

        let result_type = if left_type == SemType::Float || right_type == SemType::Float {
            SemType::Float
        } else {
            SemType::Int
        };

        if op == "%" && result_type == SemType::Float {
            self.error(
                "operator '%' cannot be applied to 'float'".to_string(),
                line,
                column,
            );
            return (SemType::Error, None);
        }

        let value = self.fold_arithmetic(&op, left_value, right_value, result_type, line, column);
        (result_type, value)
    }

    /// Compile-time evaluation of an arithmetic node whose operand values
    /// are both known.
    fn fold_arithmetic(
        &mut self,
        op: &str,
        left: Option<SemValue>,
        right: Option<SemValue>,
        result_type: SemType,
        line: usize,
        column: usize,
    ) -> Option<SemValue> {
        let left = left?;
        let right = right?;

        if result_type == SemType::Float {
            let l = left.as_f64()?;
            let r = right.as_f64()?;
            let value = match op {
                "+" => l + r,
                "-" => l - r,
                "*" => l * r,
                "/" => {
                    if r == 0.0 {
                        self.error("division by zero at compile time".to_string(), line, column);
                        return None;
                    }
                    l / r
                }
                "^" => l.powf(r),
                _ => return None,
            };
            return Some(SemValue::Float(value));
        }

        let l = left.as_i64()?;
        let r = right.as_i64()?;
        let value = match op {
            "+" => l.checked_add(r),
            "-" => l.checked_sub(r),
            "*" => l.checked_mul(r),
            "/" => {
                if r == 0 {
                    self.error("division by zero at compile time".to_string(), line, column);
                    return None;
                }
                l.checked_div(r)
            }
            "%" => {
                if r == 0 {
                    self.error("modulo by zero at compile time".to_string(), line, column);
                    return None;
                }
                l.checked_rem(r)
            }
            "^" => u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp)),
            _ => None,
        };
        value.map(SemValue::Int)
    }

    fn visit_relational(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        if node.children.len() < 2 {
            return (SemType::Bool, None);
        }

        let op = node.value_str().to_string();
        let (line, column) = node.position();

        let (left_type, left_value) = self.visit(&mut node.children[0]);
        let (right_type, right_value) = self.visit(&mut node.children[1]);

        if left_type == SemType::Error || right_type == SemType::Error {
            return (SemType::Bool, None);
        }

        let numeric = left_type.is_numeric() && right_type.is_numeric();
        let booleans = left_type == SemType::Bool && right_type == SemType::Bool;
        if !numeric && !booleans {
            self.error(
                format!(
                    "relational operator '{op}' cannot be applied to '{left_type}' and '{right_type}'"
                ),
                line,
                column,
            );
            return (SemType::Bool, None);
        }

        let value = match (left_value, right_value) {
            (Some(l), Some(r)) => fold_comparison(&op, &l, &r).map(SemValue::Bool),
            _ => None,
        };
        (SemType::Bool, value)
    }

    fn visit_logical(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        let op = node.value_str().to_string();
        let (line, column) = node.position();

        if op == "!" {
            let Some(operand) = node.children.first_mut() else {
                return (SemType::Bool, None);
            };
            let (ty, value) = self.visit(operand);
            if !matches!(ty, SemType::Bool | SemType::Error) {
                self.error(
                    format!("logical operator '!' cannot be applied to '{ty}'"),
                    line,
                    column,
                );
                return (SemType::Bool, None);
            }
            let value = match value {
                Some(SemValue::Bool(v)) => Some(SemValue::Bool(!v)),
                _ => None,
            };
            return (SemType::Bool, value);
        }

        if node.children.len() < 2 {
            return (SemType::Bool, None);
        }

        let (left_type, left_value) = self.visit(&mut node.children[0]);
        let (right_type, right_value) = self.visit(&mut node.children[1]);

        if !matches!(left_type, SemType::Bool | SemType::Error) {
            self.error(
                format!("logical operator '{op}' requires 'bool', but found '{left_type}'"),
                line,
                column,
            );
        }
        if !matches!(right_type, SemType::Bool | SemType::Error) {
            self.error(
                format!("logical operator '{op}' requires 'bool', but found '{right_type}'"),
                line,
                column,
            );
        }
        if left_type == SemType::Error || right_type == SemType::Error {
            return (SemType::Bool, None);
        }

        let value = match (left_value, right_value) {
            (Some(SemValue::Bool(l)), Some(SemValue::Bool(r))) => match op.as_str() {
                "&&" => Some(SemValue::Bool(l && r)),
                "||" => Some(SemValue::Bool(l || r)),
                _ => None,
            },
            _ => None,
        };
        (SemType::Bool, value)
    }

    fn visit_id(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        let name = node.value_str().to_string();
        let (line, column) = node.position();

        self.cross_references.record_use(&name, line);

        let Some(symbol) = self.symbols.get(&name) else {
            self.error(format!("undeclared variable '{name}'"), line, column);
            return (SemType::Error, None);
        };

        let ty = symbol.ty;
        let const_value = symbol.const_value.clone();

        if !symbol.is_initialized {
            self.error(
                format!("variable '{name}' used before initialization"),
                line,
                column,
            );
            return (ty, None);
        }

        (ty, const_value)
    }

    fn visit_numero(&mut self, node: &mut AstNode) -> (SemType, Option<SemValue>) {
        let text = node.value_str();
        if text.contains('.') {
            match text.parse::<f64>() {
                Ok(value) => (SemType::Float, Some(SemValue::Float(value))),
                Err(_) => {
                    let (line, column) = node.position();
                    self.error(format!("malformed numeric literal '{text}'"), line, column);
                    (SemType::Error, None)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => (SemType::Int, Some(SemValue::Int(value))),
                Err(_) => {
                    let (line, column) = node.position();
                    self.error(format!("malformed numeric literal '{text}'"), line, column);
                    (SemType::Error, None)
                }
            }
        }
    }
}

fn fold_comparison(op: &str, left: &SemValue, right: &SemValue) -> Option<bool> {
    use SemValue::*;

    let ordering = match (left, right) {
        (Bool(l), Bool(r)) => l.partial_cmp(r),
        (Str(l), Str(r)) => l.partial_cmp(r),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }?;

    Some(match op {
        "==" => ordering.is_eq(),
        "!=" => !ordering.is_eq(),
        "<" => ordering.is_lt(),
        ">" => ordering.is_gt(),
        "<=" => ordering.is_le(),
        ">=" => ordering.is_ge(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};

    fn analyze_source(source: &str) -> (AstNode, Analysis) {
        let tokens = Lexer::new(source).scan().filtered_tokens();
        let (mut ast, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "unexpected syntax errors: {parse_errors:?}");
        let analysis = SemanticAnalyzer::new().analyze(&mut ast);
        (ast, analysis)
    }

    fn first_error(analysis: &Analysis) -> &str {
        &analysis.errors[0].description
    }

    #[test]
    fn test_int_to_float_promotion_is_silent() {
        let (_, analysis) = analyze_source("main { float b; b = 7; }");
        assert!(analysis.errors.is_empty());
    }

    #[test]
    fn test_float_to_int_is_a_mismatch() {
        let (_, analysis) = analyze_source("main { int a; a = 1.5; }");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(
            first_error(&analysis),
            "type mismatch: cannot assign 'float' to 'int'"
        );
    }

    #[test]
    fn test_bool_to_int_is_exactly_one_diagnostic() {
        let (_, analysis) = analyze_source("main { int a; bool b; b = true; a = b; }");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(
            first_error(&analysis),
            "type mismatch: cannot assign 'bool' to 'int'"
        );
    }

    #[test]
    fn test_undeclared_variable() {
        let (_, analysis) = analyze_source("main { x = 1; }");
        assert_eq!(analysis.errors.len(), 1);
        assert!(first_error(&analysis).contains("undeclared variable 'x'"));
    }

    #[test]
    fn test_duplicate_declaration_keeps_first() {
        let (_, analysis) = analyze_source("main { int a; float a; }");
        assert_eq!(analysis.errors.len(), 1);
        assert!(first_error(&analysis).contains("duplicate identifier 'a'"));
        assert_eq!(analysis.symbols.get("a").unwrap().ty, SemType::Int);
    }

    #[test]
    fn test_use_before_initialization_does_not_poison() {
        let (ast, analysis) = analyze_source("main { int a, b; b = a + 1; }");
        assert_eq!(analysis.errors.len(), 1);
        assert!(first_error(&analysis).contains("used before initialization"));

        // The assignment's RHS still types as int.
        let list = ast.find_child(NodeKind::ListaDeclaracion).unwrap();
        let rhs = &list.children[1].children[1];
        assert_eq!(rhs.semantic_type, Some(SemType::Int));
    }

    #[test]
    fn test_non_boolean_condition() {
        let (_, analysis) = analyze_source("main { int a; a = 1; if a + 1 then a = 2; end }");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(
            first_error(&analysis),
            "'if' condition must be 'bool', but found 'int'"
        );
    }

    #[test]
    fn test_error_type_is_absorbing() {
        // `x` is undeclared; the arithmetic and the assignment stay silent.
        let (_, analysis) = analyze_source("main { int a; a = x + 1; }");
        assert_eq!(analysis.errors.len(), 1);
    }

    #[test]
    fn test_modulo_requires_integers() {
        let (_, analysis) = analyze_source("main { float f; f = 1.5; f = f % 2; }");
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(first_error(&analysis), "operator '%' cannot be applied to 'float'");
    }

    #[test]
    fn test_arithmetic_result_type_promotes() {
        let (ast, analysis) = analyze_source("main { float f; f = 1.5 + 2; }");
        assert!(analysis.errors.is_empty());

        let list = ast.find_child(NodeKind::ListaDeclaracion).unwrap();
        let rhs = &list.children[1].children[1];
        assert_eq!(rhs.semantic_type, Some(SemType::Float));
        assert_eq!(rhs.semantic_value, Some(SemValue::Float(3.5)));
    }

    #[test]
    fn test_integer_division_truncates_during_folding() {
        let (ast, analysis) = analyze_source("main { int a; a = 7 / 2; }");
        assert!(analysis.errors.is_empty());

        let list = ast.find_child(NodeKind::ListaDeclaracion).unwrap();
        let rhs = &list.children[1].children[1];
        assert_eq!(rhs.semantic_type, Some(SemType::Int));
        assert_eq!(rhs.semantic_value, Some(SemValue::Int(3)));
    }

    #[test]
    fn test_static_division_by_zero() {
        let (_, analysis) = analyze_source("main { int a; a = 1 / 0; }");
        assert!(analysis
            .errors
            .iter()
            .any(|e| e.description == "division by zero at compile time"));
    }

    #[test]
    fn test_constant_tracking_follows_assignments() {
        let (_, analysis) = analyze_source("main { int a; a = 2; a = a + 3; }");
        assert!(analysis.errors.is_empty());
        assert_eq!(
            analysis.symbols.get("a").unwrap().const_value,
            Some(SemValue::Int(5))
        );
    }

    #[test]
    fn test_read_clears_constant_and_initializes() {
        let (_, analysis) = analyze_source("main { int a; a = 2; cin >> a; }");
        assert!(analysis.errors.is_empty());
        let symbol = analysis.symbols.get("a").unwrap();
        assert!(symbol.is_initialized);
        assert_eq!(symbol.const_value, None);
    }

    #[test]
    fn test_cross_reference_records_every_line() {
        let (_, analysis) = analyze_source("main { int a;\na = 1;\ncout << a; }");
        let entry = analysis.cross_references.get("a").unwrap();
        let lines: Vec<usize> = entry.lines.iter().copied().collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert_eq!(entry.address, 1);
    }

    #[test]
    fn test_relational_mixed_numeric_is_bool() {
        let (ast, analysis) = analyze_source("main { float f; f = 1.5; if f > 1 then f = 0.0; end }");
        assert!(analysis.errors.is_empty());

        let list = ast.find_child(NodeKind::ListaDeclaracion).unwrap();
        let seleccion = &list.children[2];
        let condition = seleccion
            .children
            .iter()
            .find(|c| c.kind == NodeKind::ExpresionRelacional)
            .unwrap();
        assert_eq!(condition.semantic_type, Some(SemType::Bool));
        assert_eq!(condition.semantic_value, Some(SemValue::Bool(true)));
    }

    #[test]
    fn test_logical_operands_must_be_bool() {
        let (_, analysis) = analyze_source("main { bool b; b = true && 1 > 0; }");
        assert!(analysis.errors.is_empty());

        let (_, analysis) = analyze_source("main { bool b; b = true; b = b && 1; }");
        assert_eq!(analysis.errors.len(), 1);
        assert!(first_error(&analysis).contains("requires 'bool'"));
    }

    #[test]
    fn test_string_assignment_to_numeric_is_mismatch() {
        let (_, analysis) = analyze_source("main { int a; a = \"hi\"; }");
        assert_eq!(analysis.errors.len(), 1);
        assert!(first_error(&analysis).contains("cannot assign 'string'"));
    }

    #[test]
    fn test_every_typed_id_has_a_symbol() {
        let (ast, analysis) = analyze_source("main { int a, b; a = 1; b = a; cout << b; }");
        assert!(analysis.errors.is_empty());

        fn walk(node: &AstNode, symbols: &SymbolTable) {
            if node.kind == NodeKind::Id {
                if let Some(ty) = node.semantic_type {
                    if ty != SemType::Error {
                        let symbol = symbols.get(node.value_str()).expect("id without symbol");
                        assert_eq!(symbol.ty, ty);
                    }
                }
            }
            for child in &node.children {
                walk(child, symbols);
            }
        }
        walk(&ast, &analysis.symbols);
    }
}
