use itertools::Itertools;

use super::identity::NodeId;
use super::process_tree_struct::{OperatorType, ProcessTree};

impl ProcessTree {
    ///
    /// Absorbs children with the same operator type as their parent into the parent
    ///
    /// Works bottom-up: the children of an absorbed child are spliced into the parent at the
    /// position of that child, keeping their order. Loop nodes never absorb their children,
    /// since the position of a child in a loop carries meaning.
    ///
    pub fn flatten(&mut self) {
        self.flatten_subtree(self.root);
    }

    fn flatten_subtree(&mut self, id: NodeId) {
        let children = self.children_of(id).to_vec();
        for child in &children {
            self.flatten_subtree(*child);
        }
        let Some(operator_type) = self.operator_type_of(id) else {
            return;
        };
        if operator_type == OperatorType::Loop {
            return;
        }
        let mut flattened = Vec::with_capacity(children.len());
        for child in children {
            if self.operator_type_of(child) == Some(operator_type) {
                flattened.extend_from_slice(self.children_of(child));
                self.nodes.remove(&child);
            } else {
                flattened.push(child);
            }
        }
        for child in &flattened {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(id);
            }
        }
        if let Some(children) = self.children_mut(id) {
            *children = flattened;
        }
    }

    ///
    /// Sorts the children of all order-insensitive operators (choice and concurrency)
    ///
    /// Children are ordered by their label (empty for operators and silent leaves), then by
    /// operator rank, then by subtree size. The sort is stable.
    ///
    pub fn sort(&mut self) {
        for id in self.prefix_order() {
            let Some(operator_type) = self.operator_type_of(id) else {
                continue;
            };
            if operator_type.is_order_sensitive() {
                continue;
            }
            let sorted = self
                .children_of(id)
                .iter()
                .copied()
                .sorted_by_cached_key(|child| self.sort_key(*child))
                .collect_vec();
            if let Some(children) = self.children_mut(id) {
                *children = sorted;
            }
        }
    }

    fn sort_key(&self, id: NodeId) -> (String, u8, usize) {
        let label = self
            .node(id)
            .and_then(|n| n.label())
            .and_then(|l| l.as_activity())
            .unwrap_or_default()
            .to_string();
        let rank = self
            .operator_type_of(id)
            .map(OperatorType::sort_ordinal)
            .unwrap_or(0);
        (label, rank, self.subtree_size(id))
    }

    ///
    /// Flattens and then sorts the tree, giving behaviorally equivalent trees a common shape
    ///
    pub fn normalize(&mut self) {
        self.flatten();
        self.sort();
    }
}

#[cfg(test)]
mod tests {
    use crate::process_tree::identity::IdGenerator;
    use crate::process_tree::nested_tree::NestedNode;
    use crate::process_tree::process_tree_struct::OperatorType::*;

    use super::*;

    fn build(nested: NestedNode) -> ProcessTree {
        ProcessTree::from_nested(IdGenerator::new_shared(), &nested)
    }

    fn op(operator_type: OperatorType, children: Vec<NestedNode>) -> NestedNode {
        NestedNode::operator(operator_type, children)
    }

    fn a(name: &str) -> NestedNode {
        NestedNode::leaf(name)
    }

    #[test]
    fn flatten_absorbs_nested_sequences() {
        let mut tree = build(op(
            Sequence,
            vec![op(Sequence, vec![a("a"), a("b")]), a("c")],
        ));
        tree.flatten();
        assert_eq!(tree.to_string(), "->( 'a', 'b', 'c' )");
        assert!(tree.is_valid());
    }

    fn mixed_tree() -> ProcessTree {
        build(op(
            ExclusiveChoice,
            vec![
                op(Sequence, vec![a("d"), op(Sequence, vec![a("c"), a("b")])]),
                op(ExclusiveChoice, vec![a("z"), NestedNode::tau()]),
                op(Loop, vec![op(Loop, vec![a("y"), a("x")]), a("w")]),
                a("a"),
            ],
        ))
    }

    #[test]
    fn flatten_twice_equals_flatten_once() {
        let mut tree = mixed_tree();
        tree.flatten();
        let once = tree.to_string();
        let size = tree.tree_size();
        tree.flatten();
        assert_eq!(tree.to_string(), once);
        assert_eq!(tree.tree_size(), size);
        assert!(tree.is_valid());
    }

    #[test]
    fn sort_twice_equals_sort_once() {
        let mut tree = mixed_tree();
        tree.sort();
        let once = tree.to_string();
        tree.sort();
        assert_eq!(tree.to_string(), once);
        assert!(tree.is_valid());
    }

    #[test]
    fn flatten_is_transitive_and_keeps_positions() {
        let mut tree = build(op(
            Concurrency,
            vec![
                a("x"),
                op(Concurrency, vec![a("a"), op(Concurrency, vec![a("b"), a("c")])]),
                a("y"),
            ],
        ));
        tree.flatten();
        assert_eq!(tree.to_string(), "+( 'x', 'a', 'b', 'c', 'y' )");
        assert!(tree.is_valid());
    }

    #[test]
    fn flatten_skips_loops() {
        let mut tree = build(op(Loop, vec![op(Loop, vec![a("a"), a("b")]), a("c")]));
        let before = tree.to_string();
        tree.flatten();
        assert_eq!(tree.to_string(), before);
    }

    #[test]
    fn sort_orders_choice_children() {
        let mut tree = build(op(
            ExclusiveChoice,
            vec![
                a("c"),
                op(Loop, vec![a("x"), a("y")]),
                a("a"),
                NestedNode::tau(),
                op(Sequence, vec![a("z"), a("w")]),
            ],
        ));
        tree.sort();
        assert_eq!(
            tree.to_string(),
            "X( tau, ->( 'z', 'w' ), *( 'x', 'y' ), 'a', 'c' )"
        );
    }

    #[test]
    fn sort_uses_subtree_size_as_tie_breaker() {
        let mut tree = build(op(
            Concurrency,
            vec![
                op(Sequence, vec![a("a"), a("b"), a("c")]),
                op(Sequence, vec![a("d"), a("e")]),
            ],
        ));
        tree.sort();
        assert_eq!(tree.to_string(), "+( ->( 'd', 'e' ), ->( 'a', 'b', 'c' ) )");
    }

    #[test]
    fn sort_leaves_sequences_untouched() {
        let mut tree = build(op(Sequence, vec![a("b"), a("a")]));
        tree.sort();
        assert_eq!(tree.to_string(), "->( 'b', 'a' )");
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut tree = build(op(
            ExclusiveChoice,
            vec![
                op(ExclusiveChoice, vec![a("d"), a("b")]),
                op(Sequence, vec![a("c"), op(Sequence, vec![a("e"), a("a")])]),
            ],
        ));
        tree.normalize();
        let once = tree.to_string();
        assert_eq!(once, "X( ->( 'c', 'e', 'a' ), 'b', 'd' )");
        tree.normalize();
        assert_eq!(tree.to_string(), once);
        assert!(tree.is_valid());
    }
}
