//! Suggestion generation from a classified context.
//!
//! Generation is a pure function of the context, the schema and the options.
//! It never looks at the text typed so far; prefix filtering is left to the
//! caller (see [`crate::types::filter_suggestions`]).

use std::collections::HashSet;

use super::context::Context;
use super::scope::{
    BindingSource, DerivedOrigin, NameResolver, ResolvedColumns, Scope, TableBinding,
};
use crate::types::{CompletionOptions, Schema, Suggestion};

/// Suggestions for `context`, deduplicated by `(label, insert_text)`.
pub fn generate(context: &Context, resolver: &NameResolver<'_>) -> Vec<Suggestion> {
    let suggestions = match context {
        Context::TableRef { ctes } => {
            let mut items = schema_tables(resolver.schema());
            items.extend(ctes.iter().map(|cte| Suggestion::alias(cte, cte, "cte")));
            items
        }
        Context::ColumnRef { scope } => column_ref(scope, resolver),
        Context::ColumnOf {
            qualifier,
            quoted,
            scope,
        } => resolver
            .lookup(scope, qualifier, *quoted)
            .and_then(|binding| resolver.resolve(binding))
            .map(|resolved| columns(resolved).collect())
            .unwrap_or_default(),
        Context::Unknown => Vec::new(),
    };
    dedup(suggestions)
}

fn schema_tables(schema: &Schema) -> Vec<Suggestion> {
    schema
        .tables
        .iter()
        .map(|table| Suggestion::table(&table.name))
        .collect()
}

fn columns(resolved: ResolvedColumns<'_>) -> impl Iterator<Item = Suggestion> + '_ {
    resolved
        .columns
        .iter()
        .map(move |column| Suggestion::column(resolved.owner, column, resolved.origin))
}

/// Columns of every resolvable binding, then the names they can be qualified by.
fn column_ref(scope: &Scope, resolver: &NameResolver<'_>) -> Vec<Suggestion> {
    if scope.is_empty() {
        return Vec::new();
    }
    let resolved: Vec<(&TableBinding, ResolvedColumns<'_>)> = scope
        .bindings
        .iter()
        .filter_map(|binding| resolver.resolve(binding).map(|r| (binding, r)))
        .collect();

    let options = resolver.options();
    if resolved.is_empty() {
        return if options.schema_fallback {
            schema_tables(resolver.schema())
        } else {
            Vec::new()
        };
    }

    let mut items: Vec<Suggestion> = resolved.iter().flat_map(|(_, r)| columns(*r)).collect();
    if options.qualifier_suggestions {
        for (binding, r) in &resolved {
            items.extend(qualifiers(binding, r, options));
        }
    }
    items
}

fn qualifiers(
    binding: &TableBinding,
    resolved: &ResolvedColumns<'_>,
    options: &CompletionOptions,
) -> Vec<Suggestion> {
    let bare = || match binding.source {
        BindingSource::Table => Suggestion::table(resolved.owner),
        BindingSource::Derived { .. } => {
            Suggestion::alias(resolved.owner, resolved.owner, resolved.origin)
        }
    };
    match (&binding.alias, &binding.source) {
        (
            Some(alias),
            BindingSource::Derived {
                origin: DerivedOrigin::Subquery,
                ..
            },
        ) => vec![Suggestion::alias(alias, alias, "subquery")],
        (Some(alias), _) => {
            let mut items = vec![Suggestion::alias(alias, resolved.owner, "alias")];
            if !options.alias_shadows_table {
                items.push(bare());
            }
            items
        }
        (None, _) => vec![bare()],
    }
}

fn dedup(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| {
            let (label, insert_text) = s.key();
            seen.insert((label.to_string(), insert_text.to_string()))
        })
        .collect()
}
