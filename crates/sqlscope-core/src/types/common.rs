//! Common types shared between request and response.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::request::Dialect;

/// Case sensitivity for identifier matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    /// Use dialect default
    #[default]
    Dialect,
    /// Lowercase normalization (Postgres)
    Lower,
    /// Uppercase normalization (Snowflake)
    Upper,
    /// Case-sensitive as-is (BigQuery)
    Exact,
}

/// Concrete folding rule applied to unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationStrategy {
    Lowercase,
    Uppercase,
    CaseSensitive,
}

impl NormalizationStrategy {
    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            Self::Lowercase if name.chars().any(char::is_uppercase) => {
                Cow::Owned(name.to_lowercase())
            }
            Self::Uppercase if name.chars().any(char::is_lowercase) => {
                Cow::Owned(name.to_uppercase())
            }
            _ => Cow::Borrowed(name),
        }
    }
}

impl CaseSensitivity {
    /// Resolves this case sensitivity setting to a concrete normalization strategy.
    ///
    /// When `self` is `Dialect`, uses the dialect's default strategy.
    /// Otherwise, returns the explicit strategy requested.
    pub fn resolve(&self, dialect: Dialect) -> NormalizationStrategy {
        match self {
            Self::Dialect => dialect.normalization_strategy(),
            Self::Lower => NormalizationStrategy::Lowercase,
            Self::Upper => NormalizationStrategy::Uppercase,
            Self::Exact => NormalizationStrategy::CaseSensitive,
        }
    }
}

/// A byte range in the source SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of SQL string (inclusive)
    pub start: usize,
    /// Byte offset from start of SQL string (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
