//! Locating the cursor within the token stream.

use crate::syntax::{SqlToken, TokenKind};
use crate::types::CursorLocation;

/// Byte offset of the `cursor`-th character; past the end clamps to `sql.len()`.
pub fn char_to_byte_offset(sql: &str, cursor: usize) -> usize {
    sql.char_indices().nth(cursor).map_or(sql.len(), |(i, _)| i)
}

/// Resolves a byte offset to a gap or a partial-token position.
///
/// The cursor is within a token when it lies strictly inside its span, or at
/// the end of an identifier that is still being typed.
pub fn locate(sql: &str, tokens: &[SqlToken], cursor: usize) -> CursorLocation {
    let within = tokens.iter().find(|token| {
        let span = token.span;
        (span.start < cursor && cursor < span.end)
            || (token.kind == TokenKind::Identifier && span.start < cursor && cursor == span.end)
    });

    if let Some(token) = within {
        let prefix = sql
            .get(token.span.start..cursor)
            .unwrap_or_default()
            .to_string();
        return CursorLocation::Within {
            token: token.index,
            prefix,
        };
    }

    let significant = || tokens.iter().filter(|t| !t.is_comment());
    CursorLocation::Gap {
        before: significant()
            .take_while(|t| t.span.end <= cursor)
            .last()
            .map(|t| t.index),
        after: significant()
            .find(|t| t.span.start >= cursor)
            .map(|t| t.index),
    }
}
