use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use itertools::Itertools;
use rand::seq::IndexedRandom;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::identity::{IdGenerator, NodeId};
use super::random_generation::choose_random_operator;

///
/// Label of a leaf in a process tree
///
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, JsonSchema)]
pub enum LeafLabel {
    /// Non-silent activity leaf
    Activity(String),
    /// Silent activity leaf
    Tau,
}

impl LeafLabel {
    /// Creates a non-silent label
    pub fn activity<S: Into<String>>(name: S) -> Self {
        LeafLabel::Activity(name.into())
    }

    /// Returns the activity name, or `None` for a silent leaf
    pub fn as_activity(&self) -> Option<&str> {
        match self {
            LeafLabel::Activity(name) => Some(name.as_str()),
            LeafLabel::Tau => None,
        }
    }

    /// Returns `true` if this is the silent label
    pub fn is_tau(&self) -> bool {
        matches!(self, LeafLabel::Tau)
    }
}

impl From<Option<String>> for LeafLabel {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) => LeafLabel::Activity(name),
            None => LeafLabel::Tau,
        }
    }
}

///
/// Operator type of an inner node of a process tree
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, JsonSchema)]
pub enum OperatorType {
    /// Sequence operator
    Sequence,
    /// Exclusive choice operator
    ExclusiveChoice,
    /// Concurrency (parallel) operator
    Concurrency,
    /// Loop operator: the first child is the _do_ part, all other children are _redo_ parts
    Loop,
}

impl OperatorType {
    /// All operator types
    pub const ALL: [OperatorType; 4] = [
        OperatorType::Sequence,
        OperatorType::Concurrency,
        OperatorType::ExclusiveChoice,
        OperatorType::Loop,
    ];

    /// All operator types except [`OperatorType::Loop`]
    pub const WITHOUT_LOOP: [OperatorType; 3] = [
        OperatorType::Sequence,
        OperatorType::Concurrency,
        OperatorType::ExclusiveChoice,
    ];

    ///
    /// Rank of the operator when children are sorted, leaves rank `0`
    ///
    pub fn sort_ordinal(self) -> u8 {
        match self {
            OperatorType::Sequence => 1,
            OperatorType::ExclusiveChoice => 2,
            OperatorType::Concurrency => 3,
            OperatorType::Loop => 4,
        }
    }

    /// Whether the order of the children changes the behavior
    pub fn is_order_sensitive(self) -> bool {
        matches!(self, OperatorType::Sequence | OperatorType::Loop)
    }

    /// Symbol used when printing a tree
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorType::Sequence => "->",
            OperatorType::ExclusiveChoice => "X",
            OperatorType::Concurrency => "+",
            OperatorType::Loop => "*",
        }
    }
}

///
/// Content of a node: either a leaf or an operator with (ordered) children
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf node with its label
    Leaf(LeafLabel),
    /// Operator node
    Operator {
        /// The [`OperatorType`] of the node
        operator_type: OperatorType,
        /// Identifiers of the children, owned by this node
        children: Vec<NodeId>,
    },
}

///
/// Node stored in the arena of a [`ProcessTree`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Identifier of the node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent of the node (`None` for the root or for detached nodes)
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Content of the node
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` if the node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Returns `true` if the node is a silent leaf
    pub fn is_silent(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(LeafLabel::Tau))
    }

    /// Label of the node if it is a leaf
    pub fn label(&self) -> Option<&LeafLabel> {
        match &self.kind {
            NodeKind::Leaf(label) => Some(label),
            NodeKind::Operator { .. } => None,
        }
    }

    /// Operator type of the node if it is an operator node
    pub fn operator_type(&self) -> Option<OperatorType> {
        match &self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Operator { operator_type, .. } => Some(*operator_type),
        }
    }

    /// Children of the node (empty for leaves)
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Operator { children, .. } => children,
        }
    }
}

///
/// Error raised by structural operations on a [`ProcessTree`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node does not exist in the tree
    UnknownNode(NodeId),
    /// The node is not a child of the given parent
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Node that is not a child of `parent`
        child: NodeId,
    },
    /// An operation requiring an operator node received a leaf
    NotAnOperator(NodeId),
    /// An operation requiring a leaf received an operator node
    NotALeaf(NodeId),
    /// The node already has a parent (or is the root) and cannot be attached again
    AlreadyAttached(NodeId),
    /// Attaching would make a node its own ancestor
    WouldCreateCycle {
        /// Prospective parent
        parent: NodeId,
        /// Prospective child
        child: NodeId,
    },
    /// A node had to be selected, but no node was eligible
    NoEligibleNode,
    /// A structural invariant does not hold
    InvariantViolated(String),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::UnknownNode(id) => write!(f, "Unknown node {}", id),
            TreeError::NotAChild { parent, child } => {
                write!(f, "Node {} is not a child of {}", child, parent)
            }
            TreeError::NotAnOperator(id) => write!(f, "Node {} is not an operator node", id),
            TreeError::NotALeaf(id) => write!(f, "Node {} is not a leaf", id),
            TreeError::AlreadyAttached(id) => write!(f, "Node {} is already attached", id),
            TreeError::WouldCreateCycle { parent, child } => write!(
                f,
                "Attaching {} below {} would create a cycle",
                child, parent
            ),
            TreeError::NoEligibleNode => {
                write!(f, "No eligible node to select (tree lost all of its nodes)")
            }
            TreeError::InvariantViolated(s) => write!(f, "Invariant violated: {}", s),
        }
    }
}

impl std::error::Error for TreeError {}

///
/// Filters applied when listing or sampling nodes of a [`ProcessTree`]
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeSelection {
    /// Omit nodes whose immediate parent is a [`OperatorType::Loop`]
    pub exclude_loop_children: bool,
    /// Omit the root
    pub exclude_root: bool,
}

impl NodeSelection {
    /// Select every node
    pub const ALL: NodeSelection = NodeSelection {
        exclude_loop_children: false,
        exclude_root: false,
    };

    /// Select every node except the root and children of loops
    pub const REMOVABLE: NodeSelection = NodeSelection {
        exclude_loop_children: true,
        exclude_root: true,
    };
}

///
/// Process tree with uniquely identified nodes
///
/// Nodes live in an arena keyed by their [`NodeId`]. Each node stores the identifiers of its
/// children and of its parent, so the ownership edge (parent to children) and the back-reference
/// (child to parent) are plain identifiers.
///
/// Structural operations keep the following invariants after every public call:
/// every node is either a leaf or an operator node, the parent of every child refers back to the
/// node listing it, and the tree never becomes empty (the minimal tree is a single silent leaf).
///
/// Cloning a tree assigns fresh identifiers to all nodes, drawn from the same [`IdGenerator`].
///
#[derive(Debug)]
pub struct ProcessTree {
    pub(crate) root: NodeId,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) ids: Arc<IdGenerator>,
}

impl ProcessTree {
    ///
    /// Creates the minimal tree: a single silent leaf
    ///
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self::new_leaf(ids, LeafLabel::Tau)
    }

    ///
    /// Creates a tree consisting of a single leaf
    ///
    pub fn new_leaf(ids: Arc<IdGenerator>, label: LeafLabel) -> Self {
        Self::with_root(ids, NodeKind::Leaf(label))
    }

    ///
    /// Creates a tree whose root is an operator node without children
    ///
    /// The caller is expected to attach at least two children before handing the tree on.
    ///
    pub fn new_operator(ids: Arc<IdGenerator>, operator_type: OperatorType) -> Self {
        Self::with_root(
            ids,
            NodeKind::Operator {
                operator_type,
                children: Vec::new(),
            },
        )
    }

    fn with_root(ids: Arc<IdGenerator>, kind: NodeKind) -> Self {
        let root = ids.next_id();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                parent: None,
                kind,
            },
        );
        Self { root, nodes, ids }
    }

    /// The identifier generator shared by this tree
    pub fn id_generator(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// Identifier of the root
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by its identifier
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a node by its identifier, failing with [`TreeError::UnknownNode`]
    pub fn get(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))
    }

    /// Returns `true` if the node exists in the arena
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Parent of a node
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Children of a node (empty for leaves and unknown nodes)
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|n| n.children()).unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Operator { children, .. }) => Some(children),
            _ => None,
        }
    }

    /// Operator type of a node (`None` for leaves and unknown nodes)
    pub fn operator_type_of(&self, id: NodeId) -> Option<OperatorType> {
        self.nodes.get(&id).and_then(|n| n.operator_type())
    }

    /// Returns `true` if the node is a leaf
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.is_leaf())
    }

    /// Returns `true` if the node is a silent leaf
    pub fn is_silent(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.is_silent())
    }

    /// Returns `true` if the node is the root of this tree
    pub fn is_root(&self, id: NodeId) -> bool {
        self.root == id
    }

    /// Returns `true` if the parent of the node is a loop operator
    pub fn has_loop_parent(&self, id: NodeId) -> bool {
        self.parent_of(id)
            .and_then(|p| self.operator_type_of(p))
            .is_some_and(|op| op == OperatorType::Loop)
    }

    ///
    /// Creates a new leaf that is not yet attached to the tree
    ///
    pub fn create_leaf(&mut self, label: LeafLabel) -> NodeId {
        self.insert_detached(NodeKind::Leaf(label))
    }

    ///
    /// Creates a new operator node without children that is not yet attached to the tree
    ///
    pub fn create_operator(&mut self, operator_type: OperatorType) -> NodeId {
        self.insert_detached(NodeKind::Operator {
            operator_type,
            children: Vec::new(),
        })
    }

    fn insert_detached(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ids.next_id();
        self.nodes.insert(
            id,
            Node {
                id,
                parent: None,
                kind,
            },
        );
        id
    }

    ///
    /// Changes the label of a leaf
    ///
    pub fn set_leaf_label(&mut self, id: NodeId, label: LeafLabel) -> Result<(), TreeError> {
        let node = self.get_mut(id)?;
        match &mut node.kind {
            NodeKind::Leaf(old) => {
                *old = label;
                Ok(())
            }
            NodeKind::Operator { .. } => Err(TreeError::NotALeaf(id)),
        }
    }

    ///
    /// Changes the operator type of an operator node
    ///
    pub fn set_operator_type(
        &mut self,
        id: NodeId,
        operator_type: OperatorType,
    ) -> Result<(), TreeError> {
        let node = self.get_mut(id)?;
        match &mut node.kind {
            NodeKind::Operator {
                operator_type: old, ..
            } => {
                *old = operator_type;
                Ok(())
            }
            NodeKind::Leaf(_) => Err(TreeError::NotAnOperator(id)),
        }
    }

    ///
    /// Appends a detached node as the last child of `parent`
    ///
    /// No arity validation happens here: callers must not leave an operator node with fewer than
    /// two children beyond one compound operation.
    ///
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let position = self.children_of(parent).len();
        self.attach_at(parent, child, position)
    }

    fn attach_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        position: usize,
    ) -> Result<(), TreeError> {
        let child_node = self.get(child)?;
        if child_node.parent.is_some() || child == self.root {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::WouldCreateCycle { parent, child });
        }
        match &mut self.get_mut(parent)?.kind {
            NodeKind::Operator { children, .. } => {
                let position = position.min(children.len());
                children.insert(position, child);
            }
            NodeKind::Leaf(_) => return Err(TreeError::NotAnOperator(parent)),
        }
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    ///
    /// Detaches `child` from `parent` without any repair and returns its former position
    ///
    /// The detached subtree stays in the arena until it is attached again or discarded.
    ///
    pub(crate) fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        let position = match &mut self.get_mut(parent)?.kind {
            NodeKind::Operator { children, .. } => {
                let position = children
                    .iter()
                    .position(|c| *c == child)
                    .ok_or(TreeError::NotAChild { parent, child })?;
                children.remove(position);
                position
            }
            NodeKind::Leaf(_) => return Err(TreeError::NotAChild { parent, child }),
        };
        self.get_mut(child)?.parent = None;
        Ok(position)
    }

    ///
    /// Removes `child` (and its subtree) from `parent`
    ///
    /// If `parent` is left with fewer than two children, it is collapsed:
    /// * no child left and `parent` is the root: the root becomes a silent leaf;
    /// * no child left otherwise: `parent` is removed from its own parent (recursively);
    /// * one child left and `parent` is the root: the child becomes the new root;
    /// * one child left otherwise: the child takes the place of `parent` below the grandparent.
    ///
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.detach(parent, child)?;
        self.discard_subtree(child);
        self.collapse(parent)
    }

    fn collapse(&mut self, node: NodeId) -> Result<(), TreeError> {
        let remaining = match &self.get(node)?.kind {
            NodeKind::Leaf(_) => return Ok(()),
            NodeKind::Operator { children, .. } if children.len() >= 2 => return Ok(()),
            NodeKind::Operator { children, .. } => children.first().copied(),
        };
        let parent = self.parent_of(node);
        if parent.is_none() && node != self.root {
            // detached subtrees are left as they are
            return Ok(());
        }
        match (parent, remaining) {
            (Some(parent), None) => self.remove_child(parent, node),
            (Some(parent), Some(only_child)) => {
                self.detach(node, only_child)?;
                self.swap_child(parent, node, only_child)?;
                self.discard_subtree(node);
                Ok(())
            }
            (None, None) => {
                self.get_mut(node)?.kind = NodeKind::Leaf(LeafLabel::Tau);
                Ok(())
            }
            (None, Some(only_child)) => {
                self.detach(node, only_child)?;
                self.nodes.remove(&node);
                self.root = only_child;
                Ok(())
            }
        }
    }

    ///
    /// Replaces the child `old` of `parent` by the detached node `new`
    ///
    /// `new` takes the position of `old`. No collapse is applied, since the number of children
    /// does not change. `old` stays in the arena as a detached subtree.
    ///
    pub fn swap_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), TreeError> {
        self.get(new)?;
        let position = self.detach(parent, old)?;
        self.attach_at(parent, new, position)
    }

    ///
    /// Replaces the node `target` (and its subtree) by `replacement`
    ///
    /// `replacement` is first detached from its current parent (without collapse); typically it
    /// is a descendant of `target`. If `target` is the root, `replacement` becomes the new root.
    /// Whatever remains of the subtree of `target` is discarded.
    ///
    pub fn replace_node_with(
        &mut self,
        target: NodeId,
        replacement: NodeId,
    ) -> Result<(), TreeError> {
        if target == replacement {
            return Ok(());
        }
        self.get(target)?;
        if let Some(current_parent) = self.parent_of(replacement) {
            self.detach(current_parent, replacement)?;
        }
        match self.parent_of(target) {
            Some(parent) => {
                self.swap_child(parent, target, replacement)?;
            }
            None if target == self.root => {
                self.root = replacement;
            }
            None => {}
        }
        self.discard_subtree(target);
        Ok(())
    }

    ///
    /// Inserts a new operator node with a uniformly chosen operator type as the parent of `target`
    ///
    /// Returns the identifier of the inserted operator node.
    ///
    pub fn insert_operator_parent<R: Rng + ?Sized>(
        &mut self,
        target: NodeId,
        sibling: NodeId,
        rng: &mut R,
    ) -> Result<NodeId, TreeError> {
        let operator_type = choose_random_operator(true, rng);
        self.insert_operator_parent_with(target, sibling, operator_type)
    }

    ///
    /// Inserts a new operator node of the given type as the parent of `target`
    ///
    /// The new node takes the place of `target` (becoming the root if `target` was the root) and
    /// gets `target` and `sibling` as its two children, in that order.
    ///
    pub fn insert_operator_parent_with(
        &mut self,
        target: NodeId,
        sibling: NodeId,
        operator_type: OperatorType,
    ) -> Result<NodeId, TreeError> {
        self.get(target)?;
        self.get(sibling)?;
        let new_operator = self.create_operator(operator_type);
        match self.parent_of(target) {
            Some(parent) => self.swap_child(parent, target, new_operator)?,
            None if target == self.root => self.root = new_operator,
            None => {}
        }
        self.add_child(new_operator, target)?;
        self.add_child(new_operator, sibling)?;
        Ok(new_operator)
    }

    ///
    /// Removes the node from the tree (with collapse of its parent)
    ///
    /// The root cannot be removed; calling this for the root does nothing.
    ///
    pub fn remove_node_from_tree(&mut self, id: NodeId) -> Result<(), TreeError> {
        match self.parent_of(id) {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    ///
    /// Moves all children of `id` into the parent of `id` at the position `id` occupied and
    /// drops `id`
    ///
    pub(crate) fn absorb_into_parent(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.parent_of(id) else {
            return Ok(());
        };
        let position = self.detach(parent, id)?;
        let children = self.children_mut(id).map(std::mem::take).unwrap_or_default();
        for (offset, child) in children.into_iter().enumerate() {
            self.get_mut(child)?.parent = None;
            self.attach_at(parent, child, position + offset)?;
        }
        self.nodes.remove(&id);
        Ok(())
    }

    fn discard_subtree(&mut self, id: NodeId) {
        for node in self.prefix_order_from(id) {
            self.nodes.remove(&node);
        }
    }

    ///
    /// All node identifiers below (and including) `start` in prefix order
    ///
    pub fn prefix_order_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                result.push(id);
                stack.extend(node.children().iter().rev());
            }
        }
        result
    }

    /// All node identifiers of the tree in prefix order
    pub fn prefix_order(&self) -> Vec<NodeId> {
        self.prefix_order_from(self.root)
    }

    /// Number of nodes in the tree (the root included)
    pub fn tree_size(&self) -> usize {
        self.subtree_size(self.root)
    }

    /// Number of nodes in the subtree rooted at `id` (`id` included)
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.prefix_order_from(id).len()
    }

    ///
    /// Labels of all leaves in prefix order, `None` standing for silent leaves
    ///
    pub fn list_leaf_labels(&self) -> Vec<Option<&str>> {
        self.prefix_order()
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .filter_map(|n| n.label())
            .map(|l| l.as_activity())
            .collect()
    }

    ///
    /// All nodes in prefix order, filtered according to `selection`
    ///
    pub fn list_all_nodes(&self, selection: NodeSelection) -> Vec<NodeId> {
        self.prefix_order()
            .into_iter()
            .filter(|id| !(selection.exclude_root && self.is_root(*id)))
            .filter(|id| !(selection.exclude_loop_children && self.has_loop_parent(*id)))
            .collect()
    }

    ///
    /// All operator nodes (prefix order) whose operator type is one of `kinds`
    ///
    pub fn list_connector_nodes_of_kind(&self, kinds: &[OperatorType]) -> Vec<NodeId> {
        self.prefix_order()
            .into_iter()
            .filter(|id| self.operator_type_of(*id).is_some_and(|op| kinds.contains(&op)))
            .collect()
    }

    ///
    /// Uniformly samples one node among those matching `selection`
    ///
    /// Returns `None` if no node matches.
    ///
    pub fn choose_uniform_random<R: Rng + ?Sized>(
        &self,
        selection: NodeSelection,
        rng: &mut R,
    ) -> Option<NodeId> {
        self.list_all_nodes(selection).choose(rng).copied()
    }

    ///
    /// Uniformly samples one operator node whose type is one of `kinds`
    ///
    pub fn choose_random_connector<R: Rng + ?Sized>(
        &self,
        kinds: &[OperatorType],
        rng: &mut R,
    ) -> Option<NodeId> {
        self.list_connector_nodes_of_kind(kinds).choose(rng).copied()
    }

    ///
    /// Checks all structural invariants
    ///
    /// * the root exists and has no parent,
    /// * every child refers back to the node listing it and is listed only once,
    /// * every operator node has at least two children,
    /// * the arena holds no node unreachable from the root.
    ///
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let root = self.get(self.root)?;
        if root.parent.is_some() {
            return Err(TreeError::InvariantViolated(format!(
                "root {} has a parent",
                self.root
            )));
        }
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(TreeError::InvariantViolated(format!(
                    "node {} is reachable twice",
                    id
                )));
            }
            let node = self.get(id)?;
            if let NodeKind::Operator { children, .. } = &node.kind {
                if children.len() < 2 {
                    return Err(TreeError::InvariantViolated(format!(
                        "operator node {} has {} children",
                        id,
                        children.len()
                    )));
                }
                for child in children {
                    if self.get(*child)?.parent != Some(id) {
                        return Err(TreeError::InvariantViolated(format!(
                            "parent of {} is not {}",
                            child, id
                        )));
                    }
                    stack.push(*child);
                }
            }
        }
        if visited.len() != self.nodes.len() {
            return Err(TreeError::InvariantViolated(format!(
                "{} nodes are not reachable from the root",
                self.nodes.len() - visited.len()
            )));
        }
        Ok(())
    }

    /// Returns `true` if [`ProcessTree::check_invariants`] succeeds
    pub fn is_valid(&self) -> bool {
        self.check_invariants().is_ok()
    }

    fn fmt_subtree(&self, id: NodeId, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Leaf(LeafLabel::Activity(name))) => write!(f, "'{}'", name),
            Some(NodeKind::Leaf(LeafLabel::Tau)) => write!(f, "tau"),
            Some(NodeKind::Operator {
                operator_type,
                children,
            }) => {
                write!(f, "{}( ", operator_type.symbol())?;
                for (pos, child) in children.iter().enumerate() {
                    if pos > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_subtree(*child, f)?;
                }
                write!(f, " )")
            }
            None => Ok(()),
        }
    }
}

impl Clone for ProcessTree {
    ///
    /// Deep copy with fresh identifiers for all nodes
    ///
    /// Detached nodes that are not reachable from the root are not copied.
    ///
    fn clone(&self) -> Self {
        let order = self.prefix_order();
        let mapping: HashMap<NodeId, NodeId> =
            order.iter().map(|id| (*id, self.ids.next_id())).collect();
        let nodes = order
            .iter()
            .filter_map(|old| self.nodes.get(old))
            .filter_map(|node| {
                let id = *mapping.get(&node.id)?;
                let kind = match &node.kind {
                    NodeKind::Leaf(label) => NodeKind::Leaf(label.clone()),
                    NodeKind::Operator {
                        operator_type,
                        children,
                    } => NodeKind::Operator {
                        operator_type: *operator_type,
                        children: children
                            .iter()
                            .filter_map(|c| mapping.get(c).copied())
                            .collect(),
                    },
                };
                let parent = node.parent.and_then(|p| mapping.get(&p).copied());
                Some((id, Node { id, parent, kind }))
            })
            .collect();
        Self {
            root: mapping.get(&self.root).copied().unwrap_or(self.root),
            nodes,
            ids: Arc::clone(&self.ids),
        }
    }
}

impl Display for ProcessTree {
    ///
    /// Writes the tree in bracket notation, e.g. `->( 'a', X( 'b', tau ) )`
    ///
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_subtree(self.root, f)
    }
}

impl ProcessTree {
    /// Comma-separated activity labels in prefix order (silent leaves as `tau`)
    pub fn leaf_summary(&self) -> String {
        self.list_leaf_labels()
            .into_iter()
            .map(|l| l.unwrap_or("tau"))
            .join(",")
    }
}
