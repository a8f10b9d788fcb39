//! Mutation Operators on Process Trees
//!
//! Every operator works on a copy (with fresh identities) of the passed tree and returns it,
//! the passed tree itself is never changed.
use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::process_tree::process_tree_struct::{
    LeafLabel, NodeSelection, OperatorType, ProcessTree, TreeError,
};
use crate::process_tree::random_generation::{choose_random_operator, generate_random_tree};

///
/// Uniformly picks a leaf label among all activities and the silent label
///
pub fn choose_random_label<R: Rng + ?Sized>(activities: &[String], rng: &mut R) -> LeafLabel {
    let pos = rng.random_range(0..=activities.len());
    match activities.get(pos) {
        Some(activity) => LeafLabel::Activity(activity.clone()),
        None => LeafLabel::Tau,
    }
}

///
/// Removes a uniformly chosen node, never the root and never a child of a loop
///
/// The parent of the removed node is collapsed if needed. If no node is eligible, the copy is
/// returned unchanged.
///
pub fn remove_random_node_mutation<R: Rng + ?Sized>(
    tree: &ProcessTree,
    rng: &mut R,
) -> Result<ProcessTree, TreeError> {
    let mut result = tree.clone();
    if let Some(node) = result.choose_uniform_random(NodeSelection::REMOVABLE, rng) {
        trace!("Removing node {} from {}", node, result);
        result.remove_node_from_tree(node)?;
    }
    Ok(result)
}

///
/// Adds a new leaf with a random label (an activity or silent) next to a uniformly chosen node
///
/// If the chosen node is a leaf, a new operator node becomes the parent of the leaf and the new
/// leaf. If it is an operator node, with equal probability the new leaf is appended as its last
/// child or such a new parent is inserted above it.
///
pub fn add_random_node_mutation<R: Rng + ?Sized>(
    tree: &ProcessTree,
    activities: &[String],
    rng: &mut R,
) -> Result<ProcessTree, TreeError> {
    let mut result = tree.clone();
    let change_node = result
        .choose_uniform_random(NodeSelection::ALL, rng)
        .ok_or(TreeError::NoEligibleNode)?;
    let label = choose_random_label(activities, rng);
    let new_leaf = result.create_leaf(label);
    if result.is_leaf(change_node) || rng.random_bool(0.5) {
        result.insert_operator_parent(change_node, new_leaf, rng)?;
    } else {
        result.add_child(change_node, new_leaf)?;
    }
    Ok(result)
}

///
/// Changes the type of a uniformly chosen node
///
/// A leaf gets a random label (an activity or silent), an operator node a random operator type
/// other than loop.
///
pub fn random_node_mutation<R: Rng + ?Sized>(
    tree: &ProcessTree,
    activities: &[String],
    rng: &mut R,
) -> Result<ProcessTree, TreeError> {
    let mut result = tree.clone();
    let change_node = result
        .choose_uniform_random(NodeSelection::ALL, rng)
        .ok_or(TreeError::NoEligibleNode)?;
    if result.is_leaf(change_node) {
        let label = choose_random_label(activities, rng);
        result.set_leaf_label(change_node, label)?;
    } else {
        result.set_operator_type(change_node, choose_random_operator(false, rng))?;
    }
    Ok(result)
}

///
/// Flattens and sorts the tree
///
pub fn normalization_mutation(tree: &ProcessTree) -> ProcessTree {
    let mut result = tree.clone();
    result.normalize();
    result
}

///
/// Repairs a uniformly chosen useless node, if there is any
///
pub fn remove_useless_node_mutation<R: Rng + ?Sized>(
    tree: &ProcessTree,
    rng: &mut R,
) -> Result<ProcessTree, TreeError> {
    let mut result = tree.clone();
    if let Some((node, reason)) = result.find_any_useless_node(rng) {
        trace!("Repairing node {} (useless code {})", node, reason.code());
        result.repair_useless_node(node, reason)?;
    }
    Ok(result)
}

///
/// Discards the tree and generates a new random tree over `alphabet`
///
/// The new tree draws its identities from the same generator as `tree`.
///
pub fn replace_tree_mutation<R: Rng + ?Sized>(
    tree: &ProcessTree,
    alphabet: &[String],
    rng: &mut R,
) -> ProcessTree {
    generate_random_tree(alphabet, tree.id_generator().clone(), rng)
}

///
/// Shuffles the children of a uniformly chosen choice or concurrency node
///
/// Trees without such a node are returned unchanged.
///
pub fn shuffle_mutation<R: Rng + ?Sized>(tree: &ProcessTree, rng: &mut R) -> ProcessTree {
    let mut result = tree.clone();
    let candidate = result.choose_random_connector(
        &[OperatorType::ExclusiveChoice, OperatorType::Concurrency],
        rng,
    );
    if let Some(node) = candidate {
        if let Some(children) = result.children_mut(node) {
            children.shuffle(rng);
        }
    }
    result
}
