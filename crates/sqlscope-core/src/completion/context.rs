//! Context classification: what kind of reference the cursor is expecting.
//!
//! The classifier starts at the deepest node containing the anchor token and
//! walks outward. Expression wrappers defer to their parent; the first clause
//! that recognises the anchor decides. A clause keyword belongs to the clause
//! it introduces, so `WHERE |` is a column position of the WHERE clause.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::scope::{Qualifier, Scope, ScopeEnv, TableRefParts};
use crate::syntax::{NodeId, NodeKind, SqlToken, SyntaxTree, TokenKind};
use crate::types::{ContextKind, CursorLocation};

/// Grammatical context at the cursor, with what suggestion generation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Context {
    /// A table is expected; carries the CTE names visible here.
    TableRef { ctes: Vec<String> },
    /// An unqualified column is expected.
    ColumnRef { scope: Scope },
    /// A column of `qualifier` is expected (`qualifier.|`).
    ColumnOf {
        qualifier: String,
        quoted: bool,
        scope: Scope,
    },
    Unknown,
}

impl Context {
    pub fn kind(&self) -> ContextKind {
        match self {
            Self::TableRef { .. } => ContextKind::TableRef,
            Self::ColumnRef { .. } => ContextKind::ColumnRef,
            Self::ColumnOf { .. } => ContextKind::ColumnOf,
            Self::Unknown => ContextKind::Unknown,
        }
    }
}

/// The token classification reasons from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub token: usize,
    /// The cursor is inside this token rather than after it.
    pub typing: bool,
}

impl Anchor {
    /// The identifier being typed, or the token before a gap.
    ///
    /// `None` at the start of the text and inside anything that is not an
    /// identifier (comments, literals, keywords, invalid input).
    pub fn from_location(location: &CursorLocation, tokens: &[SqlToken]) -> Option<Anchor> {
        match location {
            CursorLocation::Within { token, .. } => tokens
                .get(*token)
                .filter(|t| t.kind == TokenKind::Identifier)
                .map(|_| Anchor {
                    token: *token,
                    typing: true,
                }),
            CursorLocation::Gap { before, .. } => before.map(|token| Anchor {
                token,
                typing: false,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Defer,
    Unknown,
    TableRef,
    ColumnRef,
    ColumnOf(Qualifier),
}

/// Classifies the cursor given the root-to-anchor `path` and the scope
/// snapshot taken at each node on it.
pub fn classify(tree: &SyntaxTree, path: &[NodeId], envs: &[ScopeEnv], anchor: Anchor) -> Context {
    for (&node, env) in path.iter().zip(envs).rev() {
        match decide(tree, node, anchor) {
            Decision::Defer => continue,
            Decision::Unknown => return Context::Unknown,
            Decision::TableRef => {
                return Context::TableRef {
                    ctes: env.visible_cte_names(),
                }
            }
            Decision::ColumnRef => {
                return Context::ColumnRef {
                    scope: env.current(),
                }
            }
            Decision::ColumnOf(qualifier) => {
                return Context::ColumnOf {
                    qualifier: qualifier.name,
                    quoted: qualifier.quoted,
                    scope: env.current(),
                }
            }
        }
    }
    Context::Unknown
}

fn decide(tree: &SyntaxTree, node: NodeId, anchor: Anchor) -> Decision {
    let Some(token) = tree.token(anchor.token) else {
        return Decision::Unknown;
    };
    let own = tree.is_own_token(node, anchor.token);

    match tree.kind(node) {
        NodeKind::ColumnRef => column_ref(tree, node, anchor),
        NodeKind::Expr | NodeKind::Subquery => Decision::Defer,
        NodeKind::SelectItem if own => Decision::Unknown,
        NodeKind::SelectItem => Decision::Defer,
        NodeKind::SelectList => Decision::ColumnRef,
        NodeKind::FromClause
            if own
                && (matches!(token.kind, TokenKind::Comma | TokenKind::LParen)
                    || token.is_any_keyword(&["FROM", "LATERAL"])) =>
        {
            Decision::TableRef
        }
        NodeKind::TableRef => table_ref(tree, node, anchor),
        NodeKind::Join if own && token.is_any_keyword(&["JOIN", "LATERAL"]) => Decision::TableRef,
        NodeKind::JoinCondition
            if own && (token.is_keyword("USING") || token.kind == TokenKind::RParen) =>
        {
            Decision::Unknown
        }
        NodeKind::JoinCondition | NodeKind::WhereClause | NodeKind::HavingClause => {
            Decision::ColumnRef
        }
        NodeKind::GroupByClause | NodeKind::OrderByClause
            if own && token.is_any_keyword(&["GROUP", "ORDER"]) =>
        {
            Decision::Unknown
        }
        NodeKind::GroupByClause | NodeKind::OrderByClause => Decision::ColumnRef,
        _ => Decision::Unknown,
    }
}

/// `q.|` and `q.co|` are qualified positions; anything else defers.
fn column_ref(tree: &SyntaxTree, node: NodeId, anchor: Anchor) -> Decision {
    let own = tree.own_tokens(node);
    let Some(pos) = own.iter().position(|t| t.index == anchor.token) else {
        return Decision::Defer;
    };
    let after_dot = match own[pos].kind {
        TokenKind::Dot => true,
        TokenKind::Identifier => anchor.typing && pos > 0 && own[pos - 1].kind == TokenKind::Dot,
        _ => false,
    };
    if !after_dot {
        return Decision::Defer;
    }
    match Qualifier::from_tokens(&own[..pos]) {
        Some(qualifier) => Decision::ColumnOf(qualifier),
        None => Decision::Unknown,
    }
}

/// Typing a table name (or right after one of its dots) expects a table;
/// a completed name, `AS` or the alias does not.
fn table_ref(tree: &SyntaxTree, node: NodeId, anchor: Anchor) -> Decision {
    let own = tree.own_tokens(node);
    let Some(pos) = own.iter().position(|t| t.index == anchor.token) else {
        return Decision::Unknown;
    };
    let parts = TableRefParts::from_tokens(&own);
    if pos < parts.name_len && (anchor.typing || own[pos].kind == TokenKind::Dot) {
        Decision::TableRef
    } else {
        Decision::Unknown
    }
}
