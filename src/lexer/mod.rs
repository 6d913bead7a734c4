//! Lexical analysis for Bora.
//!
//! The scanner walks the source left to right, trying the ordered pattern
//! list of [`patterns::PATTERNS`] at the current position; the first pattern
//! that matches wins. Bad input never aborts the scan: error-carrying
//! patterns (partial floats, unclosed strings, stray characters) record a
//! diagnostic and scanning continues.

mod patterns;
mod token;

pub use patterns::{MAX_IDENTIFIER_LENGTH, RESERVED_WORDS};
pub use token::{Token, TokenKind};

use log::debug;

use crate::diagnostics::Diagnostic;

use self::patterns::{PARTIAL_FLOAT_PREFIX, PATTERNS};

/// Everything one scan produces: the complete token sequence (trivia
/// included), the lexical error list, and the comment byte regions.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
    comment_regions: Vec<(usize, usize)>,
}

impl ScanResult {
    /// The token stream handed to the parser: trivia stripped, nothing from
    /// inside a comment region.
    pub fn filtered_tokens(&self) -> Vec<Token> {
        self.tokens
            .iter()
            .filter(|token| !token.kind.is_trivia())
            .cloned()
            .collect()
    }

    /// Whether a byte offset lies within a scanned comment.
    pub fn in_comment(&self, offset: usize) -> bool {
        self.comment_regions
            .iter()
            .any(|(start, end)| (*start..*end).contains(&offset))
    }
}

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn scan(self) -> ScanResult {
        let mut result = ScanResult::default();
        let mut pos = 0;
        let mut line = 1;
        let mut column = 1;

        while pos < self.source.len() {
            let rest = &self.source[pos..];

            let Some((pattern, matched)) = PATTERNS
                .iter()
                .find_map(|pattern| pattern.regex.find(rest).map(|m| (pattern, m.as_str())))
            else {
                // The catch-all pattern matches any character, so this only
                // happens on an empty remainder.
                break;
            };

            // A partial float only consumes its digits-and-dot prefix; the
            // trailing suffix is re-scanned on the next iteration.
            let lexeme = if pattern.kind == TokenKind::PartialFloat {
                PARTIAL_FLOAT_PREFIX
                    .find(matched)
                    .map(|m| m.as_str())
                    .unwrap_or(matched)
            } else {
                matched
            };

            if let Some(message) = pattern.error {
                result.errors.push(Diagnostic::new(message, line, column));
            }

            if pattern.kind == TokenKind::Identifier && lexeme.chars().count() > MAX_IDENTIFIER_LENGTH
            {
                result.errors.push(Diagnostic::new(
                    "identifier exceeds maximum length",
                    line,
                    column,
                ));
            }

            if matches!(
                pattern.kind,
                TokenKind::CommentSingle | TokenKind::CommentMulti
            ) {
                result.comment_regions.push((pos, pos + lexeme.len()));
            }

            result
                .tokens
                .push(Token::new(pattern.kind, lexeme, line, column));

            pos += lexeme.len();
            for c in lexeme.chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }
        }

        debug!(
            "scanned {} tokens ({} errors)",
            result.tokens.len(),
            result.errors.len()
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(source)
            .scan()
            .filtered_tokens()
            .into_iter()
            .map(|token| (token.kind, token.lexeme))
            .collect()
    }

    #[test]
    fn test_keyword_prefix_is_still_identifier() {
        assert_eq!(
            kinds("iffy if"),
            vec![
                (TokenKind::Identifier, "iffy".to_string()),
                (TokenKind::Keyword, "if".to_string()),
            ]
        );
    }

    #[test]
    fn test_positions_are_one_based() {
        let result = Lexer::new("int a;\na = 1;").scan();
        let tokens = result.filtered_tokens();

        assert_eq!(tokens[0].position(), (1, 1));
        assert_eq!(tokens[1].position(), (1, 5));
        assert_eq!(tokens[3].position(), (2, 1));
    }

    #[test]
    fn test_lexeme_matches_source_slice() {
        let source = "main {\n  int abc;\n  abc = 4 + 2;\n}";
        let result = Lexer::new(source).scan();

        for token in &result.tokens {
            let line = source.lines().nth(token.line - 1).unwrap();
            let start = token.column - 1;
            let slice: String = line
                .chars()
                .skip(start)
                .take(token.lexeme.chars().count())
                .collect();
            if token.kind != TokenKind::Newline {
                assert_eq!(slice, token.lexeme, "token {token:?}");
            }
        }
    }

    #[test]
    fn test_comments_are_excluded() {
        let result = Lexer::new("a // b = 1;\n/* int c;\nx */ d").scan();
        let tokens = result.filtered_tokens();

        assert_eq!(
            tokens
                .iter()
                .map(|t| t.lexeme.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "d"]
        );
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_operator_sequences_inside_comment_are_not_tokens() {
        let result = Lexer::new("// not / an * op\nx").scan();

        assert!(result
            .filtered_tokens()
            .iter()
            .all(|t| t.kind != TokenKind::ArithOp));
        assert!(result.in_comment(5));
    }

    #[test]
    fn test_partial_float_resumes_after_prefix() {
        let result = Lexer::new("12.a3").scan();
        let tokens = result.filtered_tokens();

        assert_eq!(tokens[0].kind, TokenKind::PartialFloat);
        assert_eq!(tokens[0].lexeme, "12.");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "a3");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].description, "incomplete floating-point number");
    }

    #[test]
    fn test_float_with_exponent() {
        assert_eq!(
            kinds("1.5e+3"),
            vec![(TokenKind::Float, "1.5e+3".to_string())]
        );
    }

    #[test]
    fn test_unclosed_string_is_an_error() {
        let result = Lexer::new("\"abc\nx").scan();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].description, "unclosed string");
        assert_eq!(result.tokens[0].kind, TokenKind::String);
    }

    #[test]
    fn test_string_with_escape() {
        assert_eq!(
            kinds(r#""a \"quoted\" b""#),
            vec![(TokenKind::String, r#""a \"quoted\" b""#.to_string())]
        );
    }

    #[test]
    fn test_long_identifier_is_flagged_but_kept() {
        let name = "a".repeat(32);
        let result = Lexer::new(&name).scan();

        assert_eq!(result.tokens[0].kind, TokenKind::Identifier);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].description,
            "identifier exceeds maximum length"
        );
    }

    #[test]
    fn test_compound_assignment_is_single_arith_token() {
        assert_eq!(
            kinds("a += 2"),
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::ArithOp, "+=".to_string()),
                (TokenKind::Int, "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_stream_and_relational_operators() {
        assert_eq!(
            kinds("cin >> x; a <= b; a != b; !c; a < b"),
            vec![
                (TokenKind::Keyword, "cin".to_string()),
                (TokenKind::StreamOp, ">>".to_string()),
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::Delimiter, ";".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::RelOp, "<=".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Delimiter, ";".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::RelOp, "!=".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Delimiter, ";".to_string()),
                (TokenKind::LogicOp, "!".to_string()),
                (TokenKind::Identifier, "c".to_string()),
                (TokenKind::Delimiter, ";".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::RelOp, "<".to_string()),
                (TokenKind::Identifier, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_increment_and_decrement() {
        assert_eq!(
            kinds("i++; i--"),
            vec![
                (TokenKind::Identifier, "i".to_string()),
                (TokenKind::IncrementOp, "++".to_string()),
                (TokenKind::Delimiter, ";".to_string()),
                (TokenKind::Identifier, "i".to_string()),
                (TokenKind::DecrementOp, "--".to_string()),
            ]
        );
    }

    #[test]
    fn test_mismatch_records_error_and_continues() {
        let result = Lexer::new("a @ b").scan();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].description, "unrecognized character");
        assert_eq!(result.filtered_tokens().len(), 3);
    }

    #[test]
    fn test_true_false_are_keywords() {
        assert_eq!(
            kinds("true false"),
            vec![
                (TokenKind::Keyword, "true".to_string()),
                (TokenKind::Keyword, "false".to_string()),
            ]
        );
    }
}
