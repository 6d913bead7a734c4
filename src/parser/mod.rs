//! Syntactic analysis for Bora.
//!
//! A hand-written recursive-descent LL(1) parser over the filtered token
//! stream. Every production returns either a (possibly partial) subtree or
//! `None`; unexpected tokens record one diagnostic and synchronize to the
//! next statement boundary, so the parser always finishes a pass over the
//! whole input. The parse is considered successful only when the error list
//! is empty.

mod ast;

pub use ast::{AstNode, NodeKind};

use std::collections::HashSet;

use log::debug;

use crate::{
    diagnostics::Diagnostic,
    lexer::{Token, TokenKind},
};

/// Token spellings at which the parser resumes after an error.
const SYNC_TOKENS: &[&str] = &[
    ";", "}", "end", "while", "do", "if", "else", "cin", "cout", "then", "main", "int", "float",
    "bool", "string", "until",
];

const TYPE_NAMES: &[&str] = &["int", "float", "bool"];

/// Where a statement list is being parsed; decides its stop tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    IfThen,
    IfElse,
    While,
    DoUntil,
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    errors: Vec<Diagnostic>,
    reported: HashSet<(usize, usize, String)>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            errors: vec![],
            reported: HashSet::new(),
        }
    }

    /// Parse the whole token stream into an AST, collecting syntax errors.
    pub fn parse(mut self) -> (AstNode, Vec<Diagnostic>) {
        let ast = self.parse_programa();

        if self.current().is_some() {
            self.error("unexpected tokens after the main program".to_string());
        }

        debug!("parsed program with {} errors", self.errors.len());
        (ast, self.errors)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn matches(&self, kind: TokenKind, value: Option<&str>) -> bool {
        match self.current() {
            Some(token) => {
                token.kind == kind && value.map(|v| token.lexeme == v).unwrap_or(true)
            }
            None => false,
        }
    }

    fn consume(&mut self, kind: TokenKind, value: Option<&str>, optional: bool) -> Option<Token> {
        if self.matches(kind, value) {
            let token = self.current().cloned();
            self.advance();
            return token;
        }

        if !optional {
            let found = self
                .current()
                .map(|t| t.lexeme.clone())
                .unwrap_or_else(|| "EOF".to_string());
            let expected = value.map(str::to_string).unwrap_or_else(|| kind.to_string());
            self.error(format!("expected '{expected}' but found '{found}'"));
        }
        None
    }

    /// Record a diagnostic at the current token, suppressing duplicates at
    /// the same position with the same message.
    fn error(&mut self, message: String) {
        let (line, column) = self
            .current()
            .map(Token::position)
            .unwrap_or((0, 0));
        self.error_at(message, line, column);
    }

    fn error_at(&mut self, message: String, line: usize, column: usize) {
        if self.reported.insert((line, column, message.clone())) {
            self.errors.push(Diagnostic::new(message, line, column));
        }
    }

    /// Skip tokens until the recovery token or any synchronization token is
    /// reached; synchronization tokens are consumed.
    fn synchronize(&mut self, recover: Option<&str>) {
        while let Some(token) = self.current() {
            let value = token.lexeme.clone();
            if recover.map(|r| value == r).unwrap_or(false) || SYNC_TOKENS.contains(&value.as_str())
            {
                if SYNC_TOKENS.contains(&value.as_str()) {
                    self.advance();
                }
                break;
            }
            self.advance();
        }
    }

    /// `programa → 'main' '{' lista_declaracion '}'`
    fn parse_programa(&mut self) -> AstNode {
        let mut node = AstNode::positioned(NodeKind::Programa, 1, 1);

        let Some(main_token) = self.consume(TokenKind::Keyword, Some("main"), false) else {
            return node;
        };
        node.add_child(AstNode::leaf(
            NodeKind::Main,
            main_token.lexeme.clone(),
            main_token.line,
            main_token.column,
        ));

        if self
            .consume(TokenKind::Delimiter, Some("{"), false)
            .is_none()
        {
            return node;
        }
        node.add_child(AstNode::leaf(
            NodeKind::LBrace,
            "{",
            main_token.line,
            main_token.column,
        ));

        if let Some(declarations) = self.parse_lista_declaracion() {
            node.add_child(declarations);
        }

        let closing = match self.consume(TokenKind::Delimiter, Some("}"), true) {
            Some(token) => Some(token),
            None => {
                self.synchronize(Some("}"));
                self.consume(TokenKind::Delimiter, Some("}"), true)
            }
        };
        let mut brace = AstNode::new(NodeKind::RBrace);
        brace.value = Some("}".to_string());
        if let Some(token) = closing {
            brace.line = Some(token.line);
            brace.column = Some(token.column);
        }
        node.add_child(brace);

        node
    }

    /// `lista_declaracion → (declaracion_variable | sentencia)*`
    fn parse_lista_declaracion(&mut self) -> Option<AstNode> {
        let mut node = AstNode::new(NodeKind::ListaDeclaracion);

        while self.current().map(|t| t.lexeme != "}").unwrap_or(false) {
            let before = self.index;

            let is_declaration = self
                .current()
                .map(|t| t.kind == TokenKind::Keyword && TYPE_NAMES.contains(&t.lexeme.as_str()))
                .unwrap_or(false);

            let child = if is_declaration {
                Some(self.parse_declaracion_variable())
            } else {
                self.parse_sentencia()
            };
            if let Some(child) = child {
                node.add_child(child);
            }

            // A production that consumed nothing would loop forever.
            if self.index == before {
                self.advance();
            }
        }

        (!node.children.is_empty()).then_some(node)
    }

    /// `declaracion_variable → tipo IDENT (',' IDENT)* ';'`
    fn parse_declaracion_variable(&mut self) -> AstNode {
        let tipo = self.consume(TokenKind::Keyword, None, false);
        let Some(tipo) = tipo.filter(|t| TYPE_NAMES.contains(&t.lexeme.as_str())) else {
            self.error("invalid data type in declaration".to_string());
            self.synchronize(Some(";"));
            let mut node = AstNode::new(NodeKind::DeclaracionVariable);
            node.value = Some("unknown".to_string());
            return node;
        };

        let mut node = AstNode::leaf(
            NodeKind::DeclaracionVariable,
            tipo.lexeme.clone(),
            tipo.line,
            tipo.column,
        );

        if let Some(id) = self.consume(TokenKind::Identifier, None, false) {
            node.add_child(AstNode::leaf(NodeKind::Id, id.lexeme, id.line, id.column));
        }

        while self.matches(TokenKind::Delimiter, Some(",")) {
            self.advance();
            match self.consume(TokenKind::Identifier, None, true) {
                Some(id) => {
                    node.add_child(AstNode::leaf(NodeKind::Id, id.lexeme, id.line, id.column))
                }
                None => {
                    self.error("expected an identifier after ','".to_string());
                    break;
                }
            }
        }

        match self.current() {
            Some(token) if token.lexeme == ";" => {
                self.advance();
            }
            Some(token)
                if token.kind == TokenKind::Keyword
                    && TYPE_NAMES.contains(&token.lexeme.as_str()) =>
            {
                // The next declaration already started; report and let it parse.
                let found = token.lexeme.clone();
                self.error(format!("expected ';' but found '{found}'"));
            }
            _ => {
                self.error("expected ';'".to_string());
                self.synchronize(Some(";"));
            }
        }

        node
    }

    /// `sentencia → seleccion | iteracion | repeticion | sent_in | sent_out
    /// | asignacion | ';'`
    fn parse_sentencia(&mut self) -> Option<AstNode> {
        let token = self.current()?.clone();

        if token.kind == TokenKind::Delimiter && token.lexeme == ";" {
            self.advance();
            return Some(AstNode::new(NodeKind::SentExpresion));
        }

        match (token.kind, token.lexeme.as_str()) {
            (TokenKind::Keyword, "if") => Some(self.parse_seleccion()),
            (TokenKind::Keyword, "while") => Some(self.parse_iteracion()),
            (TokenKind::Keyword, "do") => Some(self.parse_repeticion()),
            (TokenKind::Keyword, "cin") => Some(self.parse_sent_in()),
            (TokenKind::Keyword, "cout") => Some(self.parse_sent_out()),
            (TokenKind::Identifier, _) => Some(self.parse_asignacion()),
            _ => {
                self.error(format!("invalid statement: '{}'", token.lexeme));
                self.synchronize(Some(";"));
                None
            }
        }
    }

    /// `seleccion → 'if' expresion 'then' lista_sentencias
    /// ('else' lista_sentencias)? 'end'`
    fn parse_seleccion(&mut self) -> AstNode {
        let (line, column) = self.current().map(Token::position).unwrap_or((0, 0));
        let mut node = AstNode::positioned(NodeKind::Seleccion, line, column);

        if let Some(token) = self.consume(TokenKind::Keyword, Some("if"), false) {
            node.add_child(AstNode::leaf(NodeKind::If, token.lexeme, token.line, token.column));
        }

        if let Some(condition) = self.parse_expresion() {
            node.add_child(condition);
        }

        if let Some(token) = self.consume(TokenKind::Keyword, Some("then"), false) {
            node.add_child(AstNode::leaf(
                NodeKind::Then,
                token.lexeme,
                token.line,
                token.column,
            ));
        }

        if let Some(block) = self.parse_lista_sentencias(Context::IfThen) {
            let mut then_block = AstNode::new(NodeKind::ThenBlock);
            then_block.children = block.children;
            node.add_child(then_block);
        }

        if self.matches(TokenKind::Keyword, Some("else")) {
            if let Some(token) = self.consume(TokenKind::Keyword, Some("else"), false) {
                node.add_child(AstNode::leaf(
                    NodeKind::Else,
                    token.lexeme,
                    token.line,
                    token.column,
                ));
                if let Some(block) = self.parse_lista_sentencias(Context::IfElse) {
                    let mut else_block = AstNode::new(NodeKind::ElseBlock);
                    else_block.children = block.children;
                    node.add_child(else_block);
                }
            }
        }

        if let Some(token) = self.consume(TokenKind::Keyword, Some("end"), true) {
            node.add_child(AstNode::leaf(NodeKind::End, token.lexeme, token.line, token.column));
        }

        node
    }

    /// `iteracion → 'while' expresion lista_sentencias 'end'`
    fn parse_iteracion(&mut self) -> AstNode {
        let (line, column) = self.current().map(Token::position).unwrap_or((0, 0));
        let mut node = AstNode::positioned(NodeKind::Iteracion, line, column);

        if let Some(token) = self.consume(TokenKind::Keyword, Some("while"), false) {
            node.add_child(AstNode::leaf(
                NodeKind::While,
                token.lexeme,
                token.line,
                token.column,
            ));
        }

        if let Some(expression) = self.parse_expresion() {
            let mut condition = AstNode::new(NodeKind::Condicion);
            condition.add_child(expression);
            node.add_child(condition);
        }

        if let Some(block) = self.parse_lista_sentencias(Context::While) {
            let mut body = AstNode::new(NodeKind::Cuerpo);
            body.children = block.children;
            node.add_child(body);
        }

        self.consume(TokenKind::Keyword, Some("end"), true);

        node
    }

    /// `repeticion → 'do' lista_sentencias 'until' expresion ';'`
    fn parse_repeticion(&mut self) -> AstNode {
        let (line, column) = self.current().map(Token::position).unwrap_or((0, 0));
        let mut node = AstNode::positioned(NodeKind::Repeticion, line, column);

        if let Some(token) = self.consume(TokenKind::Keyword, Some("do"), false) {
            node.add_child(AstNode::leaf(NodeKind::Do, token.lexeme, token.line, token.column));
        }

        if let Some(block) = self.parse_lista_sentencias(Context::DoUntil) {
            let mut body = AstNode::new(NodeKind::Cuerpo);
            body.children = block.children;
            node.add_child(body);
        }

        if let Some(token) = self.consume(TokenKind::Keyword, Some("until"), false) {
            node.add_child(AstNode::leaf(
                NodeKind::Until,
                token.lexeme,
                token.line,
                token.column,
            ));
        }

        if let Some(expression) = self.parse_expresion() {
            let mut condition = AstNode::new(NodeKind::Condicion);
            condition.add_child(expression);
            node.add_child(condition);
        }

        self.consume(TokenKind::Delimiter, Some(";"), true);

        node
    }

    /// `sent_in → 'cin' ('>>' IDENT)+ ';'`
    fn parse_sent_in(&mut self) -> AstNode {
        let (line, column) = self.current().map(Token::position).unwrap_or((0, 0));
        let mut node = AstNode::positioned(NodeKind::SentIn, line, column);

        if let Some(token) = self.consume(TokenKind::Keyword, Some("cin"), false) {
            node.add_child(AstNode::leaf(NodeKind::Cin, token.lexeme, token.line, token.column));
        }

        while self.matches(TokenKind::StreamOp, Some(">>")) {
            if let Some(op) = self.consume(TokenKind::StreamOp, Some(">>"), false) {
                node.add_child(AstNode::leaf(
                    NodeKind::StreamRead,
                    op.lexeme,
                    op.line,
                    op.column,
                ));
            }

            match self.consume(TokenKind::Identifier, None, true) {
                Some(id) => {
                    node.add_child(AstNode::leaf(NodeKind::Id, id.lexeme, id.line, id.column))
                }
                None => {
                    self.error("expected an identifier after '>>'".to_string());
                    break;
                }
            }
        }

        self.consume(TokenKind::Delimiter, Some(";"), true);
        node
    }

    /// `sent_out → 'cout' ('<<' (STRING | expresion))+ ';'`
    fn parse_sent_out(&mut self) -> AstNode {
        let (line, column) = self.current().map(Token::position).unwrap_or((0, 0));
        let mut node = AstNode::positioned(NodeKind::SentOut, line, column);

        if let Some(token) = self.consume(TokenKind::Keyword, Some("cout"), false) {
            node.add_child(AstNode::leaf(
                NodeKind::Cout,
                token.lexeme,
                token.line,
                token.column,
            ));
        }

        while self.matches(TokenKind::StreamOp, Some("<<")) {
            if let Some(op) = self.consume(TokenKind::StreamOp, Some("<<"), false) {
                node.add_child(AstNode::leaf(
                    NodeKind::StreamWrite,
                    op.lexeme,
                    op.line,
                    op.column,
                ));
            }

            if self.matches(TokenKind::String, None) {
                if let Some(token) = self.consume(TokenKind::String, None, false) {
                    node.add_child(AstNode::leaf(
                        NodeKind::Cadena,
                        token.lexeme,
                        token.line,
                        token.column,
                    ));
                }
            } else if let Some(expression) = self.parse_expresion() {
                node.add_child(expression);
            } else {
                self.error("expected a string or expression after '<<'".to_string());
                break;
            }
        }

        self.consume(TokenKind::Delimiter, Some(";"), true);
        node
    }

    /// `asignacion → IDENT ('=' (STRING | expresion) | '++' | '--'
    /// | compound_op expresion) ';'`
    ///
    /// Compound operators desugar to `id = id <op> rhs`; `++`/`--` to
    /// `id = id ± 1`.
    fn parse_asignacion(&mut self) -> AstNode {
        let Some(id) = self.consume(TokenKind::Identifier, None, false) else {
            let mut node = AstNode::new(NodeKind::Asignacion);
            node.value = Some("error".to_string());
            return node;
        };

        let op = self.current().cloned();
        let Some(op) = op.filter(|t| {
            matches!(
                t.kind,
                TokenKind::AssignOp
                    | TokenKind::IncrementOp
                    | TokenKind::DecrementOp
                    | TokenKind::ArithOp
            )
        }) else {
            self.error("expected '=', '++', '--' or a compound operator in assignment".to_string());
            self.synchronize(Some(";"));
            let mut node = AstNode::new(NodeKind::Asignacion);
            node.value = Some(id.lexeme);
            return node;
        };
        self.advance();

        let mut node = AstNode::leaf(NodeKind::Asignacion, id.lexeme.clone(), op.line, op.column);
        node.add_child(AstNode::leaf(NodeKind::Id, id.lexeme.clone(), id.line, id.column));

        match op.lexeme.as_str() {
            "++" | "--" => {
                let base = if op.lexeme == "++" { "+" } else { "-" };
                let mut operation =
                    AstNode::leaf(NodeKind::ExpresionSimple, base, op.line, op.column);
                operation.add_child(AstNode::leaf(
                    NodeKind::Id,
                    id.lexeme.clone(),
                    id.line,
                    id.column,
                ));
                operation.add_child(AstNode::leaf(NodeKind::Numero, "1", op.line, op.column));
                node.add_child(operation);
            }
            "+=" | "-=" | "*=" | "/=" | "%=" | "^=" => {
                let base = &op.lexeme[..1];
                match self.parse_expresion() {
                    Some(rhs) => {
                        let mut operation =
                            AstNode::leaf(NodeKind::ExpresionSimple, base, op.line, op.column);
                        operation.add_child(AstNode::leaf(
                            NodeKind::Id,
                            id.lexeme.clone(),
                            id.line,
                            id.column,
                        ));
                        operation.add_child(rhs);
                        node.add_child(operation);
                    }
                    None => {
                        self.error(format!("expected an expression after '{}'", op.lexeme));
                    }
                }
            }
            "=" => {
                if self.matches(TokenKind::String, None) {
                    if let Some(token) = self.consume(TokenKind::String, None, false) {
                        node.add_child(AstNode::leaf(
                            NodeKind::Cadena,
                            token.lexeme,
                            token.line,
                            token.column,
                        ));
                    }
                } else {
                    match self.parse_expresion() {
                        Some(rhs) => node.add_child(rhs),
                        None => {
                            self.error("expected an expression or string after '='".to_string())
                        }
                    }
                }
            }
            _ => {}
        }

        self.consume(TokenKind::Delimiter, Some(";"), true);
        node
    }

    /// `lista_sentencias → sentencia*`, bounded by the context's stop tokens.
    fn parse_lista_sentencias(&mut self, context: Context) -> Option<AstNode> {
        let mut node = AstNode::new(NodeKind::ListaSentencias);

        while self.current().is_some() && !self.should_stop(context) {
            let before = self.index;
            if let Some(statement) = self.parse_sentencia() {
                node.add_child(statement);
            }
            if self.index == before {
                self.advance();
            }
        }

        (!node.children.is_empty()).then_some(node)
    }

    fn should_stop(&self, context: Context) -> bool {
        let Some(token) = self.current() else {
            return true;
        };

        if token.kind == TokenKind::Keyword && TYPE_NAMES.contains(&token.lexeme.as_str()) {
            return true;
        }

        let value = token.lexeme.as_str();
        match context {
            Context::While => value == "end",
            Context::DoUntil => value == "until",
            Context::IfThen => value == "else" || value == "end",
            Context::IfElse => value == "end",
        }
    }

    /// `expresion → expresion_simple ((rel_op | log_op) …)*`; relational
    /// operators chain left-to-right, logical ones recurse to the right.
    fn parse_expresion(&mut self) -> Option<AstNode> {
        let mut left = self.parse_expresion_simple()?;

        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::RelOp => {
                    let op = self.consume(TokenKind::RelOp, None, false)?;
                    match self.parse_expresion_simple() {
                        Some(right) => {
                            let mut node = AstNode::leaf(
                                NodeKind::ExpresionRelacional,
                                op.lexeme,
                                op.line,
                                op.column,
                            );
                            node.add_child(left);
                            node.add_child(right);
                            left = node;
                        }
                        None => {
                            self.error(format!("expected an expression after '{}'", op.lexeme));
                            break;
                        }
                    }
                }
                TokenKind::LogicOp => {
                    let op = self.consume(TokenKind::LogicOp, None, false)?;
                    match self.parse_expresion() {
                        Some(right) => {
                            let mut node = AstNode::leaf(
                                NodeKind::ExpresionLogica,
                                op.lexeme,
                                op.line,
                                op.column,
                            );
                            node.add_child(left);
                            node.add_child(right);
                            left = node;
                        }
                        None => {
                            self.error(format!("expected an expression after '{}'", op.lexeme));
                            break;
                        }
                    }
                }
                _ => break,
            }
        }

        Some(left)
    }

    /// `expresion_simple → termino (('+' | '-') termino)*`
    fn parse_expresion_simple(&mut self) -> Option<AstNode> {
        let mut left = self.parse_termino()?;

        loop {
            let op = match self.current() {
                Some(t)
                    if t.kind == TokenKind::ArithOp && (t.lexeme == "+" || t.lexeme == "-") =>
                {
                    t.clone()
                }
                _ => break,
            };
            self.advance();

            match self.parse_termino() {
                Some(right) => {
                    let mut node = AstNode::leaf(
                        NodeKind::ExpresionSimple,
                        op.lexeme,
                        op.line,
                        op.column,
                    );
                    node.add_child(left);
                    node.add_child(right);
                    left = node;
                }
                None => {
                    self.error(format!("expected a term after '{}'", op.lexeme));
                    break;
                }
            }
        }

        Some(left)
    }

    /// `termino → factor (('*' | '/' | '%') factor)*`
    fn parse_termino(&mut self) -> Option<AstNode> {
        let mut left = self.parse_factor()?;

        while self
            .current()
            .map(|t| t.kind == TokenKind::ArithOp && matches!(t.lexeme.as_str(), "*" | "/" | "%"))
            .unwrap_or(false)
        {
            let op = self.consume(TokenKind::ArithOp, None, false)?;
            match self.parse_factor() {
                Some(right) => {
                    let mut node =
                        AstNode::leaf(NodeKind::Termino, op.lexeme, op.line, op.column);
                    node.add_child(left);
                    node.add_child(right);
                    left = node;
                }
                None => {
                    self.error(format!("expected a factor after '{}'", op.lexeme));
                    return Some(left);
                }
            }
        }

        Some(left)
    }

    /// `factor → componente ('^' factor)?` — exponentiation nests to the
    /// right.
    fn parse_factor(&mut self) -> Option<AstNode> {
        let left = self.parse_componente()?;

        if self.matches(TokenKind::ArithOp, Some("^")) {
            let op = self.consume(TokenKind::ArithOp, Some("^"), false)?;
            match self.parse_factor() {
                Some(right) => {
                    let mut node = AstNode::leaf(NodeKind::Factor, op.lexeme, op.line, op.column);
                    node.add_child(left);
                    node.add_child(right);
                    return Some(node);
                }
                None => {
                    self.error("expected a component after '^'".to_string());
                }
            }
        }

        Some(left)
    }

    /// `componente → '(' expresion ')' | INT | FLOAT | IDENT | 'true'
    /// | 'false' | STRING | '!' componente`
    fn parse_componente(&mut self) -> Option<AstNode> {
        let token = self.current()?.clone();

        match (token.kind, token.lexeme.as_str()) {
            (TokenKind::Delimiter, "(") => {
                self.advance();
                let expression = self.parse_expresion();
                if self.consume(TokenKind::Delimiter, Some(")"), true).is_none() {
                    self.error(format!(
                        "expected ')' to close the parenthesis opened at line {}, column {}",
                        token.line, token.column
                    ));
                    self.synchronize(Some(";"));
                }
                expression
            }
            (TokenKind::Int, _) | (TokenKind::Float, _) => {
                self.advance();
                Some(AstNode::leaf(
                    NodeKind::Numero,
                    token.lexeme,
                    token.line,
                    token.column,
                ))
            }
            (TokenKind::Keyword, "true") | (TokenKind::Keyword, "false") => {
                self.advance();
                Some(AstNode::leaf(
                    NodeKind::Bool,
                    token.lexeme,
                    token.line,
                    token.column,
                ))
            }
            // A lexer that tags the boolean literals as identifiers is still
            // accepted here.
            (TokenKind::Identifier, "true") | (TokenKind::Identifier, "false") => {
                self.advance();
                Some(AstNode::leaf(
                    NodeKind::Bool,
                    token.lexeme,
                    token.line,
                    token.column,
                ))
            }
            (TokenKind::Identifier, _) => {
                self.advance();
                Some(AstNode::leaf(NodeKind::Id, token.lexeme, token.line, token.column))
            }
            (TokenKind::String, _) => {
                self.advance();
                Some(AstNode::leaf(
                    NodeKind::Cadena,
                    token.lexeme,
                    token.line,
                    token.column,
                ))
            }
            (TokenKind::LogicOp, "!") => {
                self.advance();
                match self.parse_componente() {
                    Some(component) => {
                        let mut node = AstNode::leaf(
                            NodeKind::ExpresionLogica,
                            "!",
                            token.line,
                            token.column,
                        );
                        node.add_child(component);
                        Some(node)
                    }
                    None => {
                        self.error("expected a component after '!'".to_string());
                        None
                    }
                }
            }
            _ => {
                self.error(format!("invalid component: '{}'", token.lexeme));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_source(source: &str) -> (AstNode, Vec<Diagnostic>) {
        let tokens = Lexer::new(source).scan().filtered_tokens();
        Parser::new(tokens).parse()
    }

    fn statements(ast: &AstNode) -> &[AstNode] {
        ast.find_child(NodeKind::ListaDeclaracion)
            .map(|list| list.children.as_slice())
            .unwrap_or(&[])
    }

    #[test]
    fn test_program_shape() {
        let (ast, errors) = parse_source("main { int a; }");

        assert!(errors.is_empty());
        assert_eq!(ast.kind, NodeKind::Programa);
        let kinds: Vec<NodeKind> = ast.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Main,
                NodeKind::LBrace,
                NodeKind::ListaDeclaracion,
                NodeKind::RBrace
            ]
        );
    }

    #[test]
    fn test_declaration_with_multiple_names() {
        let (ast, errors) = parse_source("main { float x, y, z; }");

        assert!(errors.is_empty());
        let decl = &statements(&ast)[0];
        assert_eq!(decl.kind, NodeKind::DeclaracionVariable);
        assert_eq!(decl.value_str(), "float");
        let names: Vec<&str> = decl.children.iter().map(AstNode::value_str).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_selection_children_shape() {
        let (ast, errors) =
            parse_source("main { int n; if n > 0 then n = 1; else n = 2; end }");

        assert!(errors.is_empty());
        let seleccion = &statements(&ast)[1];
        let kinds: Vec<NodeKind> = seleccion.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::If,
                NodeKind::ExpresionRelacional,
                NodeKind::Then,
                NodeKind::ThenBlock,
                NodeKind::Else,
                NodeKind::ElseBlock,
                NodeKind::End
            ]
        );
    }

    #[test]
    fn test_while_children_shape() {
        let (ast, errors) = parse_source("main { int i; while i < 3 i = i + 1; end }");

        assert!(errors.is_empty());
        let iteracion = &statements(&ast)[1];
        let kinds: Vec<NodeKind> = iteracion.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::While, NodeKind::Condicion, NodeKind::Cuerpo]
        );
    }

    #[test]
    fn test_do_until_children_shape() {
        let (ast, errors) = parse_source("main { int i; do i = i + 1; until i == 2; }");

        assert!(errors.is_empty());
        let repeticion = &statements(&ast)[1];
        let kinds: Vec<NodeKind> = repeticion.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Do,
                NodeKind::Cuerpo,
                NodeKind::Until,
                NodeKind::Condicion
            ]
        );
    }

    #[test]
    fn test_increment_desugars_to_plus_one() {
        let (ast, errors) = parse_source("main { int i; i++; }");

        assert!(errors.is_empty());
        let asignacion = &statements(&ast)[1];
        assert_eq!(asignacion.kind, NodeKind::Asignacion);
        let operation = &asignacion.children[1];
        assert_eq!(operation.kind, NodeKind::ExpresionSimple);
        assert_eq!(operation.value_str(), "+");
        assert_eq!(operation.children[0].value_str(), "i");
        assert_eq!(operation.children[1].value_str(), "1");
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let (ast, errors) = parse_source("main { int a; a *= 2 + 1; }");

        assert!(errors.is_empty());
        let asignacion = &statements(&ast)[1];
        let operation = &asignacion.children[1];
        assert_eq!(operation.kind, NodeKind::ExpresionSimple);
        assert_eq!(operation.value_str(), "*");
        assert_eq!(operation.children[0].value_str(), "a");
        assert_eq!(operation.children[1].kind, NodeKind::ExpresionSimple);
    }

    #[test]
    fn test_precedence_multiplication_binds_tighter() {
        let (ast, errors) = parse_source("main { int a; a = 1 + 2 * 3; }");

        assert!(errors.is_empty());
        let rhs = &statements(&ast)[1].children[1];
        assert_eq!(rhs.kind, NodeKind::ExpresionSimple);
        assert_eq!(rhs.value_str(), "+");
        assert_eq!(rhs.children[1].kind, NodeKind::Termino);
        assert_eq!(rhs.children[1].value_str(), "*");
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let (ast, errors) = parse_source("main { int a; a = 2 ^ 3 ^ 2; }");

        assert!(errors.is_empty());
        let rhs = &statements(&ast)[1].children[1];
        assert_eq!(rhs.kind, NodeKind::Factor);
        // 2 ^ (3 ^ 2): the nested factor hangs off the right child.
        assert_eq!(rhs.children[0].value_str(), "2");
        assert_eq!(rhs.children[1].kind, NodeKind::Factor);
    }

    #[test]
    fn test_sent_out_mixes_strings_and_expressions() {
        let (ast, errors) = parse_source("main { int a; cout << \"x=\" << a + 1; }");

        assert!(errors.is_empty());
        let sent_out = &statements(&ast)[1];
        let kinds: Vec<NodeKind> = sent_out.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Cout,
                NodeKind::StreamWrite,
                NodeKind::Cadena,
                NodeKind::StreamWrite,
                NodeKind::ExpresionSimple
            ]
        );
        assert_eq!(sent_out.children[2].value_str(), "\"x=\"");
    }

    #[test]
    fn test_error_recovery_continues_parsing() {
        let (ast, errors) = parse_source("main { int a; a = ; a = 2; }");

        assert!(!errors.is_empty());
        // The statement after the bad one still parses.
        let last = statements(&ast).last().unwrap();
        assert_eq!(last.kind, NodeKind::Asignacion);
        assert_eq!(last.children[1].value_str(), "2");
    }

    #[test]
    fn test_duplicate_errors_are_suppressed() {
        let (_, errors) = parse_source("main { @ }");

        let mut seen = std::collections::HashSet::new();
        for error in &errors {
            assert!(seen.insert((error.line, error.column, error.description.clone())));
        }
    }

    #[test]
    fn test_missing_semicolon_before_next_declaration() {
        let (ast, errors) = parse_source("main { int a\nfloat b; }");

        assert!(errors.iter().any(|e| e.description.contains("expected ';'")));
        assert_eq!(statements(&ast).len(), 2);
    }

    #[test]
    fn test_postfix_increment_inside_expression_is_rejected() {
        // `++`/`--` are only valid as a whole assignment body (`i++;`),
        // never as an infix operator.
        let (_, errors) = parse_source("main { int i; i = i++; }");

        assert!(errors
            .iter()
            .any(|e| e.description == "invalid statement: '++'"));
    }

    #[test]
    fn test_parser_never_loops_on_garbage() {
        let (_, errors) = parse_source("main { ) ) then until + }");
        assert!(!errors.is_empty());
    }
}
