//! SQL syntax collaborator: tokens, an error-tolerant parser and its tree.
//!
//! The completion engine consumes the [`SyntaxTree`] and token stream as-is;
//! recovery decisions are made here and nowhere else.

mod parser;
mod tokens;
mod tree;
pub mod walk;

pub use parser::parse_tokens;
pub use tokens::{tokenize, LineIndex, SqlToken, TokenKind, TokenStream};
pub use tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};

use crate::error::SyntaxError;
use crate::types::Dialect;

/// A best-effort tree plus the tokenizer failure it recovered from, if any.
#[derive(Debug, Clone)]
pub struct Parse {
    pub tree: SyntaxTree,
    pub error: Option<SyntaxError>,
}

/// Tokenizes and parses `sql`. Never fails.
pub fn parse(sql: &str, dialect: Dialect) -> Parse {
    let TokenStream { tokens, error } = tokenize(sql, dialect);
    Parse {
        tree: parse_tokens(tokens),
        error,
    }
}
