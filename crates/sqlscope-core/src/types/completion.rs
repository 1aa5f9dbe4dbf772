use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Span;
use crate::syntax::TokenKind;

/// Category of a completion suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Table,
    Column,
    Alias,
    /// Reserved for keyword completion.
    Keyword,
    /// Reserved for schema/namespace completion.
    Schema,
}

/// One candidate completion item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub label: String,
    pub kind: SuggestionKind,
    pub detail: String,
    pub insert_text: String,
}

impl Suggestion {
    pub fn table(name: &str) -> Self {
        Self {
            label: name.to_string(),
            kind: SuggestionKind::Table,
            detail: format!("{name} (schema)"),
            insert_text: name.to_string(),
        }
    }

    /// A column of `owner`; `origin` says what `owner` is ("table", "subquery", "cte").
    pub fn column(owner: &str, column: &str, origin: &str) -> Self {
        Self {
            label: column.to_string(),
            kind: SuggestionKind::Column,
            detail: format!("{owner}.{column} ({origin})"),
            insert_text: column.to_string(),
        }
    }

    pub fn alias(alias: &str, target: &str, origin: &str) -> Self {
        Self {
            label: alias.to_string(),
            kind: SuggestionKind::Alias,
            detail: format!("{target} ({origin})"),
            insert_text: alias.to_string(),
        }
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, &str) {
        (&self.label, &self.insert_text)
    }
}

/// Where the cursor sits relative to the token stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CursorLocation {
    /// Between two tokens; either side is absent at the start or end of the text.
    #[serde(rename_all = "camelCase")]
    Gap {
        before: Option<usize>,
        after: Option<usize>,
    },
    /// Inside (or at the end of an identifier) token, with the text typed so far.
    #[serde(rename_all = "camelCase")]
    Within { token: usize, prefix: String },
}

impl CursorLocation {
    /// Text already typed for the token under the cursor.
    pub fn prefix(&self) -> &str {
        match self {
            Self::Gap { .. } => "",
            Self::Within { prefix, .. } => prefix,
        }
    }
}

/// Grammatical category of the cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ContextKind {
    TableRef,
    ColumnRef,
    ColumnOf,
    Unknown,
}

/// The token under the cursor, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionToken {
    pub value: String,
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub context: ContextKind,
    pub location: CursorLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<CompletionToken>,
    pub suggestions: Vec<Suggestion>,
    /// Diagnostic for input that was only partially understood. Never fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionResult {
    pub fn empty() -> Self {
        Self {
            context: ContextKind::Unknown,
            location: CursorLocation::Gap {
                before: None,
                after: None,
            },
            token: None,
            suggestions: Vec::new(),
            error: None,
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Text typed so far at the cursor, for caller-side filtering.
    pub fn prefix(&self) -> &str {
        self.location.prefix()
    }
}

/// Keeps suggestions whose label starts with `prefix`, ignoring ASCII case.
///
/// The engine never filters by prefix itself; this is for presentation layers.
pub fn filter_suggestions(suggestions: &[Suggestion], prefix: &str) -> Vec<Suggestion> {
    suggestions
        .iter()
        .filter(|s| {
            s.label
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_details_follow_display_format() {
        assert_eq!(Suggestion::table("users").detail, "users (schema)");
        assert_eq!(
            Suggestion::column("users", "id", "table").detail,
            "users.id (table)"
        );
        assert_eq!(Suggestion::alias("u", "users", "alias").detail, "users (alias)");
    }

    #[test]
    fn filter_is_case_insensitive_prefix_match() {
        let items = vec![
            Suggestion::table("users"),
            Suggestion::table("documents"),
            Suggestion::table("UserRoles"),
        ];
        let labels: Vec<_> = filter_suggestions(&items, "us")
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["users", "UserRoles"]);
        assert_eq!(filter_suggestions(&items, "").len(), 3);
        assert!(filter_suggestions(&items, "usersx").is_empty());
    }

    #[test]
    fn filter_handles_multibyte_labels() {
        let items = vec![Suggestion::table("ünits"), Suggestion::table("users")];
        let labels: Vec<_> = filter_suggestions(&items, "u")
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["users"]);
    }

    #[test]
    fn location_serializes_with_type_tag() {
        let json = serde_json::to_value(CursorLocation::Within {
            token: 3,
            prefix: "us".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "within");
        assert_eq!(json["prefix"], "us");
    }
}
