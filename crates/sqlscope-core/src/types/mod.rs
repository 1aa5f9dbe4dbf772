//! Types for the SQL completion API.
//!
//! Requests carry the SQL text, the cursor offset and the schema snapshot;
//! results carry the classified context and the suggestion list. Every type
//! round-trips through JSON with camelCase field names.

mod common;
mod completion;
mod request;

// Re-export all public types
pub use common::{CaseSensitivity, NormalizationStrategy, Span};
pub use completion::{
    filter_suggestions, CompletionResult, CompletionToken, ContextKind, CursorLocation,
    Suggestion, SuggestionKind,
};
pub use request::{CompletionOptions, CompletionRequest, Dialect, Schema, SchemaTable};
