use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Closed set of token categories produced by the scanner.
///
/// Trivia kinds (whitespace, newlines, comments) are part of the scan output
/// but are stripped before the token stream reaches the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    String,
    Char,
    Int,
    Float,
    /// Error carrier for a digits-and-dot prefix that never became a float.
    PartialFloat,
    Keyword,
    Identifier,
    LogicOp,
    RelOp,
    AssignOp,
    ArithOp,
    IncrementOp,
    DecrementOp,
    StreamOp,
    Delimiter,
    CommentSingle,
    CommentMulti,
    Newline,
    Whitespace,
    Mismatch,
}

impl TokenKind {
    /// Whether tokens of this kind are dropped before parsing.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::CommentSingle
                | TokenKind::CommentMulti
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::String => "STRING",
            TokenKind::Char => "CHAR",
            TokenKind::Int => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::PartialFloat => "PARTIAL_FLOAT",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::LogicOp => "LOGIC_OP",
            TokenKind::RelOp => "REL_OP",
            TokenKind::AssignOp => "ASSIGN_OP",
            TokenKind::ArithOp => "ARITH_OP",
            TokenKind::IncrementOp => "INCREMENT_OP",
            TokenKind::DecrementOp => "DECREMENT_OP",
            TokenKind::StreamOp => "STREAM_OP",
            TokenKind::Delimiter => "DELIMITER",
            TokenKind::CommentSingle => "COMMENT_SINGLE",
            TokenKind::CommentMulti => "COMMENT_MULTI",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Whitespace => "WHITESPACE",
            TokenKind::Mismatch => "MISMATCH",
        };
        f.write_str(name)
    }
}

/// A single scanned token with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}
