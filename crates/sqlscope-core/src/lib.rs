//! Cursor-aware SQL completion.
//!
//! Given a possibly incomplete SQL statement, a cursor offset and a schema,
//! [`completion_items`] classifies what the cursor expects (a table, a
//! column, a qualified column) and returns matching [`Suggestion`]s.
//!
//! ```
//! use sqlscope_core::{completion_items, CompletionRequest, Schema};
//!
//! let schema = Schema::from_iter([("users", vec!["id", "name"])]);
//! let sql = "SELECT * FROM users WHERE ";
//! let result = completion_items(&CompletionRequest::new(sql, sql.len(), schema));
//! assert!(result.suggestions.iter().any(|s| s.label == "name"));
//! ```

pub mod completion;
pub mod error;
pub mod syntax;
pub mod types;

pub use completion::{
    completion_context, completion_items, completion_items_json, Context, CursorContext,
};
pub use error::SyntaxError;
pub use syntax::{parse, Parse, SyntaxTree};

pub use types::{
    filter_suggestions, CaseSensitivity, CompletionOptions, CompletionRequest, CompletionResult,
    CompletionToken, ContextKind, CursorLocation, Dialect, NormalizationStrategy, Schema,
    SchemaTable, Span, Suggestion, SuggestionKind,
};
