//! Generic traversals over a [`SyntaxTree`].

use super::tree::{NodeId, SyntaxTree};

/// A top-down fold along a root-to-node path.
///
/// Each node maps the state of its parent to its own immutable state; nothing
/// is accumulated across siblings.
pub trait PathFold {
    type State: Clone;

    fn enter(&self, tree: &SyntaxTree, node: NodeId, outer: &Self::State) -> Self::State;
}

/// Folds `path` from the outermost node inward, returning one snapshot per node.
pub fn fold_path<F: PathFold>(
    fold: &F,
    tree: &SyntaxTree,
    path: &[NodeId],
    init: F::State,
) -> Vec<F::State> {
    let mut states: Vec<F::State> = Vec::with_capacity(path.len());
    for &node in path {
        let next = fold.enter(tree, node, states.last().unwrap_or(&init));
        states.push(next);
    }
    states
}

/// Preorder iterator that only descends into nodes accepted by `descend`.
pub struct Preorder<'t, D> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
    descend: D,
}

pub fn preorder<D>(tree: &SyntaxTree, start: NodeId, descend: D) -> Preorder<'_, D>
where
    D: Fn(&SyntaxTree, NodeId) -> bool,
{
    Preorder {
        tree,
        stack: vec![start],
        descend,
    }
}

impl<D> Iterator for Preorder<'_, D>
where
    D: Fn(&SyntaxTree, NodeId) -> bool,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        if (self.descend)(self.tree, node) {
            self.stack
                .extend(self.tree.children(node).iter().rev().copied());
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, NodeKind};
    use crate::types::Dialect;

    struct DepthCount;

    impl PathFold for DepthCount {
        type State = usize;

        fn enter(&self, tree: &SyntaxTree, node: NodeId, outer: &usize) -> usize {
            if tree.kind(node) == NodeKind::Select {
                outer + 1
            } else {
                *outer
            }
        }
    }

    #[test]
    fn fold_produces_one_snapshot_per_node() {
        let parsed = parse("SELECT * FROM t WHERE a IN (SELECT b FROM s)", Dialect::Generic);
        let tree = &parsed.tree;
        let token = tree.tokens().iter().position(|t| t.text == "s").unwrap();
        let path = tree.path_to_token(token);
        let states = fold_path(&DepthCount, tree, &path, 0);
        assert_eq!(states.len(), path.len());
        assert_eq!(states.last(), Some(&2));
        assert_eq!(states[0], 0);
    }

    #[test]
    fn preorder_respects_pruning() {
        let parsed = parse("SELECT a FROM t JOIN (SELECT b FROM s) x ON a = b", Dialect::Generic);
        let tree = &parsed.tree;
        let all: Vec<_> = preorder(tree, SyntaxTree::ROOT, |_, _| true)
            .map(|n| tree.kind(n))
            .collect();
        assert_eq!(all.len(), tree.len());
        assert_eq!(all[0], NodeKind::Script);

        let pruned: Vec<_> = preorder(tree, SyntaxTree::ROOT, |t, n| {
            t.kind(n) != NodeKind::DerivedTable
        })
        .filter(|&n| tree.kind(n) == NodeKind::TableRef)
        .collect();
        assert_eq!(pruned.len(), 1);
    }
}
