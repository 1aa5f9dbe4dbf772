//! Concrete syntax tree produced by the recovering parser.
//!
//! Nodes are stored in an arena and refer to contiguous token ranges. A node's
//! children are ordered and never overlap; the tokens of a node not covered by
//! any child are its "own" tokens (keywords, punctuation, names).

use std::ops::Range;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::tokens::SqlToken;
use crate::types::Span;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Script,
    Query,
    WithClause,
    Cte,
    Select,
    SelectList,
    SelectItem,
    FromClause,
    TableRef,
    DerivedTable,
    Join,
    JoinCondition,
    WhereClause,
    GroupByClause,
    HavingClause,
    OrderByClause,
    LimitClause,
    Expr,
    ColumnRef,
    Subquery,
    /// Tokens the parser could not place.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Token indices covered by this node.
    pub tokens: Range<usize>,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub(crate) nodes: Vec<SyntaxNode>,
    pub(crate) tokens: Vec<SqlToken>,
}

impl SyntaxTree {
    pub const ROOT: NodeId = 0;

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tokens(&self) -> &[SqlToken] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&SqlToken> {
        self.tokens.get(index)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Children of `id` with the given kind, in source order.
    pub fn children_of_kind(
        &self,
        id: NodeId,
        kind: NodeKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.kind(child) == kind)
    }

    pub fn first_child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children_of_kind(id, kind).next()
    }

    pub fn contains_token(&self, id: NodeId, token: usize) -> bool {
        self.nodes[id].tokens.contains(&token)
    }

    /// Non-comment tokens of `id` that no child covers, in source order.
    pub fn own_tokens(&self, id: NodeId) -> Vec<&SqlToken> {
        let node = &self.nodes[id];
        node.tokens
            .clone()
            .filter(|&index| !node.children.iter().any(|&c| self.contains_token(c, index)))
            .filter_map(|index| self.tokens.get(index))
            .filter(|token| !token.is_comment())
            .collect()
    }

    /// Whether `token` belongs to `id` directly rather than to one of its children.
    pub fn is_own_token(&self, id: NodeId, token: usize) -> bool {
        self.contains_token(id, token)
            && !self.children(id).iter().any(|&c| self.contains_token(c, token))
    }

    /// Nodes from the root down to the deepest node containing `token`.
    ///
    /// Empty when the token lies outside every node, which only happens for
    /// out-of-range indices.
    pub fn path_to_token(&self, token: usize) -> Vec<NodeId> {
        if self.nodes.is_empty() || !self.contains_token(Self::ROOT, token) {
            return Vec::new();
        }
        let mut path = vec![Self::ROOT];
        let mut current = Self::ROOT;
        while let Some(&child) = self
            .children(current)
            .iter()
            .find(|&&c| self.contains_token(c, token))
        {
            path.push(child);
            current = child;
        }
        path
    }

    /// Indented outline of the tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if !self.nodes.is_empty() {
            self.dump_node(Self::ROOT, 0, &mut out);
        }
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!(
            "{:?} {}..{}\n",
            node.kind, node.tokens.start, node.tokens.end
        ));
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}
