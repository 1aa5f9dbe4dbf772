use std::collections::HashSet;

use proptest::collection::{hash_set, vec};
use proptest::prelude::*;
use sqlscope_core::{completion_items, CompletionRequest, ContextKind, Schema, SuggestionKind};

fn schema_of(tables: &[(String, Vec<String>)]) -> Schema {
    tables
        .iter()
        .map(|(name, columns)| (name.clone(), columns.clone()))
        .collect()
}

proptest! {
    #[test]
    fn any_input_and_cursor_is_handled(sql in "\\PC{0,64}", cursor in 0usize..96) {
        let schema = Schema::from_iter([("users", vec!["id", "name"])]);
        let request = CompletionRequest::new(sql, cursor, schema);
        let first = completion_items(&request);
        let second = completion_items(&request);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn table_position_lists_each_schema_table_once(
        names in hash_set("t_[a-z]{1,6}", 1..6),
    ) {
        let tables: Vec<(String, Vec<String>)> =
            names.iter().map(|n| (n.clone(), vec!["id".to_string()])).collect();
        let sql = "SELECT * FROM ";
        let result = completion_items(&CompletionRequest::new(sql, sql.len(), schema_of(&tables)));

        prop_assert_eq!(result.context, ContextKind::TableRef);
        prop_assert_eq!(result.suggestions.len(), tables.len());
        for (name, _) in &tables {
            let count = result
                .suggestions
                .iter()
                .filter(|s| &s.label == name && s.kind == SuggestionKind::Table)
                .count();
            prop_assert_eq!(count, 1);
        }
    }

    #[test]
    fn aliased_table_only_offers_its_own_columns(
        left in vec("a_[a-z]{1,6}", 1..5),
        right in vec("b_[a-z]{1,6}", 1..5),
        alias in "x_[a-z]{1,4}",
    ) {
        let tables = vec![
            ("t_left".to_string(), left.clone()),
            ("t_right".to_string(), right.clone()),
        ];
        let sql = format!("SELECT * FROM t_left {alias} WHERE ");
        let request = CompletionRequest::new(sql.clone(), sql.len(), schema_of(&tables));
        let result = completion_items(&request);

        prop_assert_eq!(result.context, ContextKind::ColumnRef);
        for column in &left {
            prop_assert!(result.suggestions.iter().any(|s| &s.label == column));
        }
        for suggestion in &result.suggestions {
            prop_assert!(!suggestion.label.starts_with("b_"));
            prop_assert!(suggestion.label != "t_right");
        }
        prop_assert!(result
            .suggestions
            .iter()
            .any(|s| s.label == alias && s.kind == SuggestionKind::Alias));
    }

    #[test]
    fn suggestions_are_unique(
        left in vec("[a-c]{1,2}", 1..6),
        right in vec("[a-c]{1,2}", 1..6),
        qualified in any::<bool>(),
    ) {
        let tables = vec![
            ("t_one".to_string(), left),
            ("t_two".to_string(), right),
        ];
        let sql = if qualified {
            "SELECT o. FROM t_one o JOIN t_two w ON o.a = w.a".to_string()
        } else {
            "SELECT * FROM t_one o JOIN t_two w ON ".to_string()
        };
        let cursor = if qualified { "SELECT o.".len() } else { sql.len() };
        let result = completion_items(&CompletionRequest::new(sql, cursor, schema_of(&tables)));

        let mut seen = HashSet::new();
        for suggestion in &result.suggestions {
            prop_assert!(
                seen.insert((suggestion.label.clone(), suggestion.insert_text.clone())),
                "duplicate suggestion {:?}",
                suggestion
            );
        }
    }
}
