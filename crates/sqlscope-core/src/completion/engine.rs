//! Completion entry points.
//!
//! One request is one pass: tokenize and parse, locate the cursor, fold scope
//! snapshots down the path to the cursor, classify, then generate. Nothing is
//! shared between requests and nothing is observable before generation ends.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::debug;

use super::context::{classify, Anchor, Context};
use super::cursor::{char_to_byte_offset, locate};
use super::scope::{NameResolver, ScopeEnv, ScopeFold};
use super::suggest::generate;
use crate::error::SyntaxError;
use crate::syntax::walk::fold_path;
use crate::syntax::{parse, Parse};
use crate::types::{CompletionRequest, CompletionResult, CompletionToken, CursorLocation};

/// Maximum SQL input size (10MB) to prevent memory exhaustion.
const MAX_SQL_LENGTH: usize = 10 * 1024 * 1024;

/// Everything known about the cursor position before suggestions are generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CursorContext {
    pub location: CursorLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CompletionToken>,
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CursorContext {
    fn from_error(message: impl Into<String>) -> Self {
        Self {
            location: CursorLocation::Gap {
                before: None,
                after: None,
            },
            token: None,
            context: Context::Unknown,
            error: Some(message.into()),
        }
    }
}

/// Classifies the cursor position of `request`. Never fails.
#[must_use]
pub fn completion_context(request: &CompletionRequest) -> CursorContext {
    let sql = request.sql.as_str();
    if sql.len() > MAX_SQL_LENGTH {
        return CursorContext::from_error(
            SyntaxError::InputTooLarge {
                max: MAX_SQL_LENGTH,
                actual: sql.len(),
            }
            .to_string(),
        );
    }

    let resolver = NameResolver::from_request(request);
    let Parse { tree, error } = parse(sql, request.dialect);
    let cursor = char_to_byte_offset(sql, request.cursor_offset);
    let location = locate(sql, tree.tokens(), cursor);

    let token = match &location {
        CursorLocation::Within { token, .. } => tree.token(*token).map(|t| CompletionToken {
            value: t.value.clone(),
            kind: t.kind,
            span: t.span,
        }),
        CursorLocation::Gap { .. } => None,
    };

    let context = match Anchor::from_location(&location, tree.tokens()) {
        Some(anchor) => {
            let path = tree.path_to_token(anchor.token);
            let envs = fold_path(&ScopeFold::new(&resolver), &tree, &path, ScopeEnv::default());
            classify(&tree, &path, &envs, anchor)
        }
        None => Context::Unknown,
    };

    #[cfg(feature = "tracing")]
    debug!(cursor, context = ?context.kind(), "classified cursor position");

    CursorContext {
        location,
        token,
        context,
        error: error.map(|e| e.to_string()),
    }
}

/// Computes completion suggestions for `request`. Never fails.
///
/// Tokenizer problems are reported in [`CompletionResult::error`] alongside
/// whatever suggestions the recovered tree supports.
#[must_use]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        skip(request),
        fields(
            dialect = ?request.dialect,
            sql_len = request.sql.len(),
            cursor = request.cursor_offset
        )
    )
)]
pub fn completion_items(request: &CompletionRequest) -> CompletionResult {
    let CursorContext {
        location,
        token,
        context,
        error,
    } = completion_context(request);

    let resolver = NameResolver::from_request(request);
    let suggestions = generate(&context, &resolver);

    #[cfg(feature = "tracing")]
    debug!(count = suggestions.len(), "generated suggestions");

    CompletionResult {
        context: context.kind(),
        location,
        token,
        suggestions,
        error,
    }
}

/// JSON in, JSON out: a [`CompletionRequest`] to a [`CompletionResult`].
///
/// Malformed requests produce a result whose `error` describes the problem.
pub fn completion_items_json(request_json: &str) -> String {
    let request: CompletionRequest = match serde_json::from_str(request_json) {
        Ok(request) => request,
        Err(e) => {
            let result = CompletionResult::from_error(format!("Invalid request format: {e}"));
            return serde_json::to_string(&result)
                .unwrap_or_else(|_| r#"{"error":"Failed to serialize error result"}"#.to_string());
        }
    };

    let result = completion_items(&request);
    serde_json::to_string(&result).unwrap_or_else(|_| {
        let error_result = CompletionResult::from_error("Failed to serialize result");
        serde_json::to_string(&error_result)
            .unwrap_or_else(|_| r#"{"error":"Failed to serialize error result"}"#.to_string())
    })
}
