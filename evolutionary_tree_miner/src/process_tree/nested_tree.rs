use std::collections::HashMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::identity::{IdGenerator, NodeId};
use super::process_tree_struct::{LeafLabel, Node, NodeKind, OperatorType, ProcessTree};

///
/// Owned, nested representation of a process tree without node identities
///
/// Used for (de-)serialization and as a convenient way to construct trees.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum NestedNode {
    /// Operator node with its children in order
    Operator {
        /// Type of the operator
        operator_type: OperatorType,
        /// Children of the operator
        children: Vec<NestedNode>,
    },
    /// Leaf node
    Leaf {
        /// Label of the leaf
        label: LeafLabel,
    },
}

impl NestedNode {
    /// Non-silent leaf with the given activity
    pub fn leaf<S: Into<String>>(activity: S) -> Self {
        NestedNode::Leaf {
            label: LeafLabel::activity(activity),
        }
    }

    /// Silent leaf
    pub fn tau() -> Self {
        NestedNode::Leaf {
            label: LeafLabel::Tau,
        }
    }

    /// Operator node with the given children
    pub fn operator(operator_type: OperatorType, children: Vec<NestedNode>) -> Self {
        NestedNode::Operator {
            operator_type,
            children,
        }
    }

    /// Number of nodes in this nested tree
    pub fn size(&self) -> usize {
        match self {
            NestedNode::Leaf { .. } => 1,
            NestedNode::Operator { children, .. } => {
                1 + children.iter().map(NestedNode::size).sum::<usize>()
            }
        }
    }
}

impl ProcessTree {
    ///
    /// Builds a tree from its nested representation, drawing identities from `ids`
    ///
    pub fn from_nested(ids: Arc<IdGenerator>, nested: &NestedNode) -> Self {
        let mut nodes = HashMap::new();
        let root = insert_nested(&ids, &mut nodes, nested, None);
        ProcessTree { root, nodes, ids }
    }

    ///
    /// Nested representation of the tree (identities are dropped)
    ///
    pub fn to_nested(&self) -> NestedNode {
        self.nested_from(self.root)
    }

    fn nested_from(&self, id: NodeId) -> NestedNode {
        match self.node(id).map(Node::kind) {
            Some(NodeKind::Operator {
                operator_type,
                children,
            }) => NestedNode::Operator {
                operator_type: *operator_type,
                children: children.iter().map(|c| self.nested_from(*c)).collect(),
            },
            Some(NodeKind::Leaf(label)) => NestedNode::Leaf {
                label: label.clone(),
            },
            None => NestedNode::tau(),
        }
    }
}

fn insert_nested(
    ids: &IdGenerator,
    nodes: &mut HashMap<NodeId, Node>,
    nested: &NestedNode,
    parent: Option<NodeId>,
) -> NodeId {
    let id = ids.next_id();
    let kind = match nested {
        NestedNode::Leaf { label } => NodeKind::Leaf(label.clone()),
        NestedNode::Operator {
            operator_type,
            children,
        } => NodeKind::Operator {
            operator_type: *operator_type,
            children: children
                .iter()
                .map(|c| insert_nested(ids, nodes, c, Some(id)))
                .collect(),
        },
    };
    nodes.insert(id, Node { id, parent, kind });
    id
}

impl Serialize for ProcessTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_nested().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_round_trip_keeps_structure() {
        let nested = NestedNode::operator(
            OperatorType::Loop,
            vec![
                NestedNode::leaf("a"),
                NestedNode::operator(
                    OperatorType::Concurrency,
                    vec![NestedNode::leaf("b"), NestedNode::tau()],
                ),
            ],
        );
        let tree = ProcessTree::from_nested(IdGenerator::new_shared(), &nested);
        assert!(tree.is_valid());
        assert_eq!(tree.tree_size(), nested.size());
        assert_eq!(tree.to_nested(), nested);
        assert_eq!(tree.to_string(), "*( 'a', +( 'b', tau ) )");
    }

    #[test]
    fn serializes_as_nested_json() {
        let nested = NestedNode::operator(
            OperatorType::Sequence,
            vec![NestedNode::leaf("a"), NestedNode::tau()],
        );
        let tree = ProcessTree::from_nested(IdGenerator::new_shared(), &nested);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "Operator");
        assert_eq!(json["operator_type"], "Sequence");
        assert_eq!(json["children"][0]["label"]["Activity"], "a");
        assert_eq!(json["children"][1]["label"], "Tau");
        let parsed: NestedNode = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, nested);
    }
}
