//! Token stream adapter over the sqlparser tokenizer.
//!
//! Produces byte-addressed [`SqlToken`]s with whitespace removed. Comments are
//! kept so a cursor inside one can be recognised. Tokenizer failures are
//! recovered by tokenizing the longest prefix that succeeds and covering the
//! rest of the input with a single [`TokenKind::Invalid`] token.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer, Whitespace, Word};
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::SyntaxError;
use crate::types::{Dialect, Span};

/// Upper bound on prefix retries after a tokenizer failure.
const MAX_TOKENIZE_ATTEMPTS: usize = 8;

/// Words that give a statement its clause structure.
///
/// Only these are classified as [`TokenKind::Keyword`]; every other word,
/// including non-reserved sqlparser keywords such as `USER` or `NAME`, is an
/// identifier as far as completion is concerned.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "ALL",
    "AND",
    "AS",
    "ASC",
    "BETWEEN",
    "BY",
    "CASE",
    "CROSS",
    "DESC",
    "DISTINCT",
    "ELSE",
    "END",
    "EXCEPT",
    "EXISTS",
    "FALSE",
    "FETCH",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "ILIKE",
    "IN",
    "INNER",
    "INTERSECT",
    "IS",
    "JOIN",
    "LATERAL",
    "LEFT",
    "LIKE",
    "LIMIT",
    "NATURAL",
    "NOT",
    "NULL",
    "NULLS",
    "OFFSET",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "OVER",
    "RECURSIVE",
    "RIGHT",
    "SELECT",
    "THEN",
    "TRUE",
    "UNION",
    "USING",
    "WHEN",
    "WHERE",
    "WITH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Operator,
    Comma,
    Dot,
    LParen,
    RParen,
    Semicolon,
    Star,
    Comment,
    /// Unrecognisable tail left behind by a tokenizer failure.
    Invalid,
}

/// A token with its byte span and position in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlToken {
    pub index: usize,
    pub kind: TokenKind,
    /// Source text exactly as written.
    pub text: String,
    /// Unquoted identifier value, uppercase keyword, or the raw text otherwise.
    pub value: String,
    pub quoted: bool,
    pub span: Span,
}

impl SqlToken {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.value == keyword
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        self.kind == TokenKind::Keyword && keywords.contains(&self.value.as_str())
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }
}

/// Output of [`tokenize`]: the tokens plus the recovered failure, if any.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    pub tokens: Vec<SqlToken>,
    pub error: Option<SyntaxError>,
}

/// Converts sqlparser's 1-based line/column locations into byte offsets.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(sql: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            sql.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { sql, line_starts }
    }

    /// Offset one past the last byte of the text.
    pub fn end(&self) -> usize {
        self.sql.len()
    }

    /// Byte offset of a line/column pair, or `None` when it lies outside the text.
    pub fn offset(&self, line: u64, column: u64) -> Option<usize> {
        let line = usize::try_from(line).ok()?;
        let column = usize::try_from(column).ok()?;
        if line == 0 || column == 0 {
            return None;
        }

        let line_start = *self.line_starts.get(line - 1)?;
        let line_end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.sql.len());
        let line_slice = self.sql.get(line_start..line_end)?;

        // sqlparser reports columns in characters, so iterate char_indices to convert
        // the 1-based column into a byte offset.
        let mut current_column = 1;
        for (rel_offset, _) in line_slice.char_indices() {
            if current_column == column {
                return Some(line_start + rel_offset);
            }
            current_column += 1;
        }

        if column == current_column {
            return Some(line_end);
        }

        None
    }
}

/// Tokenizes `sql` for `dialect`. Never fails; see [`TokenStream::error`].
pub fn tokenize(sql: &str, dialect: Dialect) -> TokenStream {
    let dialect_impl = dialect.to_sqlparser_dialect();
    let index = LineIndex::new(sql);
    let mut end = sql.len();
    let mut first_error: Option<SyntaxError> = None;

    for _ in 0..MAX_TOKENIZE_ATTEMPTS {
        let prefix = &sql[..end];
        let mut tokenizer = Tokenizer::new(dialect_impl.as_ref(), prefix);
        match tokenizer.tokenize_with_location() {
            Ok(raw) => {
                let mut tokens = convert_tokens(sql, &index, raw);
                if end < sql.len() {
                    push_invalid_tail(sql, end, &mut tokens);
                }
                return TokenStream {
                    tokens,
                    error: first_error,
                };
            }
            Err(err) => {
                let error = SyntaxError::from_tokenizer(&err, &index);
                #[cfg(feature = "tracing")]
                debug!(%error, end, "tokenizer failed, retrying on a shorter prefix");
                let cut = recovery_cut(prefix, error.offset());
                first_error.get_or_insert(error);
                match cut {
                    Some(cut) => end = cut,
                    None => break,
                }
            }
        }
    }

    let mut tokens = Vec::new();
    push_invalid_tail(sql, 0, &mut tokens);
    TokenStream {
        tokens,
        error: first_error,
    }
}

/// Picks a strictly shorter prefix to retry after a failure on `prefix`.
///
/// Prefers the reported failure offset; when that is not inside the prefix,
/// cuts before the last character that opens a quoted construct or comment.
fn recovery_cut(prefix: &str, reported: Option<usize>) -> Option<usize> {
    if let Some(offset) = reported.filter(|&o| o < prefix.len() && prefix.is_char_boundary(o)) {
        return Some(offset);
    }
    prefix
        .rfind(['\'', '"', '`', '$', '/', '['])
        .or_else(|| prefix.char_indices().next_back().map(|(i, _)| i))
}

fn push_invalid_tail(sql: &str, start: usize, tokens: &mut Vec<SqlToken>) {
    if start >= sql.len() {
        return;
    }
    let text = sql[start..].to_string();
    tokens.push(SqlToken {
        index: tokens.len(),
        kind: TokenKind::Invalid,
        value: text.clone(),
        text,
        quoted: false,
        span: Span::new(start, sql.len()),
    });
}

fn convert_tokens(sql: &str, index: &LineIndex<'_>, raw: Vec<TokenWithSpan>) -> Vec<SqlToken> {
    let mut tokens = Vec::with_capacity(raw.len());
    for token in raw {
        let Some((kind, value, quoted)) = classify(&token.token) else {
            continue;
        };
        let start = index.offset(token.span.start.line, token.span.start.column);
        let end = index.offset(token.span.end.line, token.span.end.column);
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        let Some(text) = sql.get(start..end) else {
            continue;
        };
        tokens.push(SqlToken {
            index: tokens.len(),
            kind,
            value: value.unwrap_or_else(|| text.to_string()),
            text: text.to_string(),
            quoted,
            span: Span::new(start, end),
        });
    }
    tokens
}

/// Kind, optional normalized value and quoting of a raw token; `None` drops it.
fn classify(token: &Token) -> Option<(TokenKind, Option<String>, bool)> {
    let classified = match token {
        Token::EOF => return None,
        Token::Whitespace(Whitespace::SingleLineComment { .. })
        | Token::Whitespace(Whitespace::MultiLineComment(_)) => (TokenKind::Comment, None, false),
        Token::Whitespace(_) => return None,
        Token::Word(word) => classify_word(word),
        Token::Number(_, _)
        | Token::SingleQuotedString(_)
        | Token::DoubleQuotedString(_)
        | Token::DollarQuotedString(_)
        | Token::NationalStringLiteral(_)
        | Token::EscapedStringLiteral(_)
        | Token::HexStringLiteral(_)
        | Token::Placeholder(_) => (TokenKind::Literal, None, false),
        Token::Comma => (TokenKind::Comma, None, false),
        Token::Period => (TokenKind::Dot, None, false),
        Token::LParen => (TokenKind::LParen, None, false),
        Token::RParen => (TokenKind::RParen, None, false),
        Token::SemiColon => (TokenKind::Semicolon, None, false),
        Token::Mul => (TokenKind::Star, None, false),
        _ => (TokenKind::Operator, None, false),
    };
    Some(classified)
}

fn classify_word(word: &Word) -> (TokenKind, Option<String>, bool) {
    if word.quote_style.is_some() {
        return (TokenKind::Identifier, Some(word.value.clone()), true);
    }
    let upper = word.value.to_uppercase();
    if STRUCTURAL_KEYWORDS.binary_search(&upper.as_str()).is_ok() {
        (TokenKind::Keyword, Some(upper), false)
    } else {
        (TokenKind::Identifier, Some(word.value.clone()), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<(TokenKind, String)> {
        tokenize(sql, Dialect::Generic)
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn structural_keywords_are_sorted() {
        let mut sorted = STRUCTURAL_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STRUCTURAL_KEYWORDS);
    }

    #[test]
    fn tokenizes_with_byte_spans() {
        let stream = tokenize("SELECT u.id FROM users u", Dialect::Generic);
        assert!(stream.error.is_none());
        let tokens = stream.tokens;
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].value, "SELECT");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].span, Span::new(7, 8));
        assert_eq!(tokens[2].kind, TokenKind::Dot);
        assert_eq!(tokens[3].text, "id");
        assert_eq!(tokens[5].span, Span::new(17, 22));
        assert!(tokens.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn non_structural_keywords_are_identifiers() {
        let tokens = kinds("SELECT name FROM user");
        assert_eq!(tokens[1], (TokenKind::Identifier, "name".to_string()));
        assert_eq!(tokens[3], (TokenKind::Identifier, "user".to_string()));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = tokenize("select * from t", Dialect::Generic).tokens;
        assert!(tokens[0].is_keyword("SELECT"));
        assert_eq!(tokens[1].kind, TokenKind::Star);
        assert!(tokens[2].is_keyword("FROM"));
    }

    #[test]
    fn quoted_words_are_identifiers() {
        let tokens = tokenize("SELECT \"from\" FROM t", Dialect::Generic).tokens;
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].value, "from");
        assert!(tokens[1].quoted);
    }

    #[test]
    fn keeps_comments_and_drops_whitespace() {
        let tokens = kinds("SELECT /* hi */ a\n  FROM t");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[1].0, TokenKind::Comment);
    }

    #[test]
    fn multiline_offsets_account_for_previous_lines() {
        let sql = "SELECT a\nFROM users";
        let tokens = tokenize(sql, Dialect::Generic).tokens;
        let users = &tokens[3];
        assert_eq!(users.text, "users");
        assert_eq!(&sql[users.span.start..users.span.end], "users");
    }

    #[test]
    fn multibyte_characters_map_to_byte_offsets() {
        let sql = "SELECT 'é' , x FROM t";
        let tokens = tokenize(sql, Dialect::Generic).tokens;
        let x = tokens.iter().find(|t| t.text == "x").unwrap();
        assert_eq!(&sql[x.span.start..x.span.end], "x");
    }

    #[test]
    fn unterminated_string_recovers_prefix() {
        let sql = "SELECT * FROM users WHERE name = 'abc";
        let stream = tokenize(sql, Dialect::Generic);
        assert!(matches!(stream.error, Some(SyntaxError::Tokenize { .. })));
        let last = stream.tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Invalid);
        assert_eq!(last.span.end, sql.len());
        assert!(stream
            .tokens
            .iter()
            .any(|t| t.is_keyword("WHERE")));
    }

    #[test]
    fn empty_input_has_no_tokens() {
        let stream = tokenize("", Dialect::Generic);
        assert!(stream.tokens.is_empty());
        assert!(stream.error.is_none());
    }

    #[test]
    fn line_index_handles_line_ends() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset(1, 1), Some(0));
        assert_eq!(index.offset(1, 3), Some(2));
        assert_eq!(index.offset(2, 1), Some(3));
        assert_eq!(index.offset(2, 3), Some(5));
        assert_eq!(index.offset(2, 4), None);
        assert_eq!(index.offset(3, 1), None);
        assert_eq!(index.offset(0, 1), None);
    }
}
