//! Error types for SQL tokenization.
//!
//! Completion never fails: these errors are recovered from internally and
//! surfaced only as the optional `error` diagnostic on
//! [`crate::types::CompletionResult`].

use thiserror::Error;

use crate::syntax::LineIndex;

/// Problems encountered while turning SQL text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// The tokenizer stopped at `offset`; everything from there on is opaque.
    #[error("tokenizer error at byte {offset}: {message}")]
    Tokenize { message: String, offset: usize },

    /// The input exceeds the size the engine is willing to scan.
    #[error("SQL exceeds maximum length of {max} bytes ({actual} bytes provided)")]
    InputTooLarge { max: usize, actual: usize },
}

impl SyntaxError {
    /// Converts a sqlparser tokenizer error, translating its line/column into a byte offset.
    pub fn from_tokenizer(err: &sqlparser::tokenizer::TokenizerError, index: &LineIndex) -> Self {
        let offset = index
            .offset(err.location.line, err.location.column)
            .unwrap_or(index.end());
        Self::Tokenize {
            message: err.message.clone(),
            offset,
        }
    }

    /// Byte offset the error points at, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Tokenize { offset, .. } => Some(*offset),
            Self::InputTooLarge { .. } => None,
        }
    }
}
