use rand::seq::IndexedRandom;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::identity::NodeId;
use super::process_tree_struct::{OperatorType, ProcessTree, TreeError};

///
/// Reason why a node does not contribute to the behavior of its tree
///
/// Rules are checked in the order 1, 2, 4, 5, 6, 7, 3; the first matching rule wins.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Uselessness {
    /// `0`: the node is needed
    NotUseless,
    /// `1`: silent leaf directly below a sequence or concurrency
    SilentInSequenceOrConcurrency,
    /// `2`: operator node with exactly one child
    SingleChildOperator,
    /// `3`: operator node whose children are all useless (reported only, never repaired)
    OnlyUselessChildren,
    /// `4`: silent leaf below a choice that already has an earlier silent child
    RedundantSilentChoice,
    /// `5`: loop with exactly one loop child and otherwise only silent children (see
    /// [`ProcessTree::starts_useless_double_loop`])
    RedundantNestedLoop,
    /// `6`: silent leaf whose parent starts a useless double loop
    SilentInRedundantLoop,
    /// `7`: non-loop operator with the same operator type as its parent
    SameOperatorAsParent,
}

impl Uselessness {
    /// Numeric code of the classification (`0` to `7`)
    pub fn code(self) -> u8 {
        match self {
            Uselessness::NotUseless => 0,
            Uselessness::SilentInSequenceOrConcurrency => 1,
            Uselessness::SingleChildOperator => 2,
            Uselessness::OnlyUselessChildren => 3,
            Uselessness::RedundantSilentChoice => 4,
            Uselessness::RedundantNestedLoop => 5,
            Uselessness::SilentInRedundantLoop => 6,
            Uselessness::SameOperatorAsParent => 7,
        }
    }

    /// Returns `true` for all codes but `0`
    pub fn is_useless(self) -> bool {
        self != Uselessness::NotUseless
    }
}

impl ProcessTree {
    ///
    /// Returns `true` if `id` is a loop whose children are exactly one loop and otherwise only
    /// silent leaves
    ///
    /// Such a loop behaves like its inner loop.
    ///
    pub fn starts_useless_double_loop(&self, id: NodeId) -> bool {
        if self.operator_type_of(id) != Some(OperatorType::Loop) {
            return false;
        }
        let children = self.children_of(id);
        let loops = children
            .iter()
            .filter(|c| self.operator_type_of(**c) == Some(OperatorType::Loop))
            .count();
        let silent = children.iter().filter(|c| self.is_silent(**c)).count();
        loops == 1 && silent == children.len() - 1
    }

    fn single_loop_child(&self, id: NodeId) -> Option<NodeId> {
        self.children_of(id)
            .iter()
            .copied()
            .find(|c| self.operator_type_of(*c) == Some(OperatorType::Loop))
    }

    ///
    /// Classifies a node according to the uselessness rules
    ///
    /// A root leaf is never useless.
    ///
    pub fn classify_uselessness(&self, id: NodeId) -> Uselessness {
        let Some(node) = self.node(id) else {
            return Uselessness::NotUseless;
        };
        if self.is_root(id) && node.is_leaf() {
            return Uselessness::NotUseless;
        }
        let parent = node.parent();
        let parent_type = parent.and_then(|p| self.operator_type_of(p));
        let silent = node.is_silent();
        let operator_type = node.operator_type();

        if silent
            && matches!(
                parent_type,
                Some(OperatorType::Sequence | OperatorType::Concurrency)
            )
        {
            return Uselessness::SilentInSequenceOrConcurrency;
        }
        if operator_type.is_some() && node.children().len() == 1 {
            return Uselessness::SingleChildOperator;
        }
        if silent && parent_type == Some(OperatorType::ExclusiveChoice) {
            let siblings = parent.map(|p| self.children_of(p)).unwrap_or(&[]);
            let earlier_silent = siblings
                .iter()
                .take_while(|s| **s != id)
                .any(|s| self.is_silent(*s));
            if earlier_silent {
                return Uselessness::RedundantSilentChoice;
            }
        }
        if operator_type == Some(OperatorType::Loop) && self.starts_useless_double_loop(id) {
            return Uselessness::RedundantNestedLoop;
        }
        if silent && parent.is_some_and(|p| self.starts_useless_double_loop(p)) {
            return Uselessness::SilentInRedundantLoop;
        }
        if let Some(op) = operator_type {
            if op != OperatorType::Loop && parent_type == Some(op) {
                return Uselessness::SameOperatorAsParent;
            }
            if node
                .children()
                .iter()
                .all(|c| self.classify_uselessness(*c).is_useless())
            {
                return Uselessness::OnlyUselessChildren;
            }
        }
        Uselessness::NotUseless
    }

    ///
    /// All useless nodes in prefix order together with their classification
    ///
    pub fn list_useless_nodes(&self) -> Vec<(NodeId, Uselessness)> {
        self.prefix_order()
            .into_iter()
            .map(|id| (id, self.classify_uselessness(id)))
            .filter(|(_, u)| u.is_useless())
            .collect()
    }

    ///
    /// Uniformly samples one useless node, or returns `None` if every node is needed
    ///
    pub fn find_any_useless_node<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<(NodeId, Uselessness)> {
        self.list_useless_nodes().choose(rng).copied()
    }

    ///
    /// Applies the repair belonging to `reason` at node `id`
    ///
    /// * `1`, `4`: the node is removed from its parent (with collapse);
    /// * `2`: the node is replaced by its only child;
    /// * `5`: the node is replaced by its loop child;
    /// * `6`: the parent of the node is replaced by its loop child;
    /// * `7`: the children of the node are spliced into its parent in place of the node;
    /// * `0`, `3`: nothing happens.
    ///
    /// Returns `true` if the tree changed.
    ///
    pub fn repair_useless_node(
        &mut self,
        id: NodeId,
        reason: Uselessness,
    ) -> Result<bool, TreeError> {
        self.get(id)?;
        match reason {
            Uselessness::NotUseless | Uselessness::OnlyUselessChildren => return Ok(false),
            Uselessness::SilentInSequenceOrConcurrency | Uselessness::RedundantSilentChoice => {
                if self.is_root(id) {
                    return Ok(false);
                }
                self.remove_node_from_tree(id)?;
            }
            Uselessness::SingleChildOperator => {
                let Some(first) = self.children_of(id).first().copied() else {
                    return Ok(false);
                };
                self.replace_node_with(id, first)?;
            }
            Uselessness::RedundantNestedLoop => {
                let Some(inner) = self.single_loop_child(id) else {
                    return Ok(false);
                };
                self.replace_node_with(id, inner)?;
            }
            Uselessness::SilentInRedundantLoop => {
                let Some(parent) = self.parent_of(id) else {
                    return Ok(false);
                };
                let Some(inner) = self.single_loop_child(parent) else {
                    return Ok(false);
                };
                self.replace_node_with(parent, inner)?;
            }
            Uselessness::SameOperatorAsParent => {
                if self.parent_of(id).is_none() {
                    return Ok(false);
                }
                self.absorb_into_parent(id)?;
            }
        }
        Ok(true)
    }
}
