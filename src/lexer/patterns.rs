//! The ordered token pattern list.
//!
//! The scanner tries these patterns at the current position in declared
//! order; the first match wins. The order is load-bearing: stream arrows
//! come before the relational operators (so `<<` never splits into two `<`),
//! `!=` before the bare `!`, compound assignments before the plain
//! arithmetic operators, and the keyword pattern before the identifier one.

use once_cell::sync::Lazy;
use regex::Regex;

use super::token::TokenKind;

/// Identifiers longer than this are flagged by the scanner.
pub const MAX_IDENTIFIER_LENGTH: usize = 31;

/// Reserved words of the language, whole-word anchored in [`PATTERNS`].
///
/// `switch`, `case`, `for`, `return`, `char` and `real` are reserved without
/// having productions; `true` and `false` are the boolean literals.
pub const RESERVED_WORDS: &[&str] = &[
    "if", "else", "end", "do", "while", "switch", "case", "int", "float", "main", "cin", "cout",
    "for", "return", "char", "bool", "real", "then", "until", "true", "false",
];

/// One entry of the ordered pattern list.
pub struct TokenPattern {
    pub kind: TokenKind,
    pub regex: Regex,
    /// Error text recorded when this pattern matches (error-carrying
    /// patterns only).
    pub error: Option<&'static str>,
}

impl TokenPattern {
    fn new(kind: TokenKind, pattern: &str) -> Self {
        Self {
            kind,
            regex: Regex::new(pattern).expect("token pattern must compile"),
            error: None,
        }
    }

    fn with_error(kind: TokenKind, pattern: &str, error: &'static str) -> Self {
        Self {
            error: Some(error),
            ..Self::new(kind, pattern)
        }
    }
}

/// Matches the digits-and-dot prefix of a partial float, so the scanner can
/// resume right after it and re-scan the trailing suffix.
pub static PARTIAL_FLOAT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.").expect("token pattern must compile"));

pub static PATTERNS: Lazy<Vec<TokenPattern>> = Lazy::new(|| {
    vec![
        TokenPattern::new(TokenKind::CommentMulti, r"^/\*(?s:.)*?\*/"),
        TokenPattern::new(TokenKind::CommentSingle, r"^//[^\n]*"),
        TokenPattern::new(TokenKind::String, r#"^"(?:\\.|[^"\\\n])*""#),
        TokenPattern::with_error(
            TokenKind::String,
            r#"^"(?:\\.|[^"\\\n])*"#,
            "unclosed string",
        ),
        TokenPattern::new(TokenKind::Char, r"^'(?:\\.|[^'\\\n])'"),
        TokenPattern::new(TokenKind::Float, r"^\d+\.\d+(?:[eE][+-]?\d+)?"),
        TokenPattern::with_error(
            TokenKind::PartialFloat,
            r"^\d+\.[a-zA-Z_\d]*",
            "incomplete floating-point number",
        ),
        TokenPattern::new(TokenKind::Int, r"^\d+"),
        TokenPattern::new(
            TokenKind::Keyword,
            r"^(?:if|else|end|do|while|switch|case|int|float|main|cin|cout|for|return|char|bool|real|then|until|true|false)\b",
        ),
        TokenPattern::new(TokenKind::LogicOp, r"^(?:&&|\|\|)"),
        TokenPattern::new(TokenKind::IncrementOp, r"^\+\+"),
        TokenPattern::new(TokenKind::DecrementOp, r"^--"),
        TokenPattern::new(TokenKind::StreamOp, r"^(?:<<|>>)"),
        TokenPattern::new(TokenKind::RelOp, r"^(?:<=|>=|==|!=|<|>)"),
        TokenPattern::new(TokenKind::LogicOp, r"^!"),
        TokenPattern::new(TokenKind::ArithOp, r"^[-+*/%^]="),
        TokenPattern::new(TokenKind::AssignOp, r"^="),
        TokenPattern::new(TokenKind::ArithOp, r"^[-+*/%^]"),
        TokenPattern::new(TokenKind::Delimiter, r"^[(){}\[\],:;]"),
        TokenPattern::new(TokenKind::Identifier, r"^[a-zA-Z_][a-zA-Z0-9_]*"),
        TokenPattern::new(TokenKind::Newline, r"^\n"),
        TokenPattern::new(TokenKind::Whitespace, r"^[ \t\r]+"),
        TokenPattern::with_error(TokenKind::Mismatch, r"^(?s:.)", "unrecognized character"),
    ]
});
