use std::fmt::Display;

use log::debug;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::operators::{
    add_random_node_mutation, normalization_mutation, random_node_mutation,
    remove_random_node_mutation, remove_useless_node_mutation, replace_tree_mutation,
    shuffle_mutation,
};
use crate::process_tree::process_tree_struct::{ProcessTree, TreeError};

///
/// Error raised when mutating a process tree
///
#[derive(Debug)]
pub enum MutationError {
    /// The mutation weights are negative or sum up to more than `1`
    InvalidWeights(String),
    /// A structural operation on the tree failed
    Tree(TreeError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationError::InvalidWeights(s) => write!(f, "Invalid mutation weights: {}", s),
            MutationError::Tree(e) => write!(f, "Mutation failed: {}", e),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutationError::InvalidWeights(_) => None,
            MutationError::Tree(e) => Some(e),
        }
    }
}

impl From<TreeError> for MutationError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

///
/// The available mutation operators
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum MutationKind {
    /// See [`remove_random_node_mutation`]
    RemoveRandomNode,
    /// See [`add_random_node_mutation`]
    AddRandomNode,
    /// See [`random_node_mutation`]
    RetypeRandomNode,
    /// See [`normalization_mutation`]
    Normalize,
    /// See [`remove_useless_node_mutation`]
    RemoveUselessNode,
    /// See [`replace_tree_mutation`]
    ReplaceTree,
    /// See [`shuffle_mutation`]
    ShuffleChildren,
}

///
/// Probabilities of the mutation operators
///
/// The weights of the first six operators are given explicitly. Shuffling receives the remaining
/// probability mass, `1 - (sum of all weights)`.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MutationWeights {
    /// Weight of [`MutationKind::RemoveRandomNode`]
    pub remove: f64,
    /// Weight of [`MutationKind::AddRandomNode`]
    pub add: f64,
    /// Weight of [`MutationKind::RetypeRandomNode`]
    pub retype: f64,
    /// Weight of [`MutationKind::Normalize`]
    pub normalize: f64,
    /// Weight of [`MutationKind::RemoveUselessNode`]
    pub remove_useless: f64,
    /// Weight of [`MutationKind::ReplaceTree`]
    pub replace: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            remove: 0.15,
            add: 0.30,
            retype: 0.15,
            normalize: 0.15,
            remove_useless: 0.15,
            replace: 0.05,
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl MutationWeights {
    fn explicit(&self) -> [(MutationKind, f64); 6] {
        [
            (MutationKind::RemoveRandomNode, self.remove),
            (MutationKind::AddRandomNode, self.add),
            (MutationKind::RetypeRandomNode, self.retype),
            (MutationKind::Normalize, self.normalize),
            (MutationKind::RemoveUselessNode, self.remove_useless),
            (MutationKind::ReplaceTree, self.replace),
        ]
    }

    ///
    /// Checks that no weight is negative (or NaN) and that the weights sum up to at most `1`
    ///
    pub fn validate(&self) -> Result<(), MutationError> {
        for (kind, weight) in self.explicit() {
            if weight.is_nan() || weight < 0.0 {
                return Err(MutationError::InvalidWeights(format!(
                    "weight of {:?} is {}",
                    kind, weight
                )));
            }
        }
        let sum: f64 = self.explicit().iter().map(|(_, w)| w).sum();
        if sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(MutationError::InvalidWeights(format!(
                "weights sum up to {} > 1",
                sum
            )));
        }
        Ok(())
    }

    /// Probability of [`MutationKind::ShuffleChildren`]
    pub fn shuffle_weight(&self) -> f64 {
        (1.0 - self.explicit().iter().map(|(_, w)| w).sum::<f64>()).max(0.0)
    }

    ///
    /// Maps a number `r` in `[0, 1)` onto a mutation operator
    ///
    /// The interval is partitioned cumulatively in the order remove, add, retype, normalize,
    /// remove useless, replace; the first operator with `r < cumulative weight` is selected,
    /// shuffling otherwise.
    ///
    pub fn select(&self, r: f64) -> MutationKind {
        let mut cumulative = 0.0;
        for (kind, weight) in self.explicit() {
            cumulative += weight;
            if r < cumulative {
                return kind;
            }
        }
        MutationKind::ShuffleChildren
    }
}

///
/// Applies the given mutation operator to a copy of `tree`
///
pub fn apply_mutation<R: Rng + ?Sized>(
    kind: MutationKind,
    tree: &ProcessTree,
    alphabet: &[String],
    rng: &mut R,
) -> Result<ProcessTree, MutationError> {
    let result = match kind {
        MutationKind::RemoveRandomNode => remove_random_node_mutation(tree, rng)?,
        MutationKind::AddRandomNode => add_random_node_mutation(tree, alphabet, rng)?,
        MutationKind::RetypeRandomNode => random_node_mutation(tree, alphabet, rng)?,
        MutationKind::Normalize => normalization_mutation(tree),
        MutationKind::RemoveUselessNode => remove_useless_node_mutation(tree, rng)?,
        MutationKind::ReplaceTree => replace_tree_mutation(tree, alphabet, rng),
        MutationKind::ShuffleChildren => shuffle_mutation(tree, rng),
    };
    Ok(result)
}

///
/// Draws one mutation operator according to `weights` and applies it to a copy of `tree`
///
/// `alphabet` is used both for new leaf labels and for replacing the whole tree.
///
pub fn mutate<R: Rng + ?Sized>(
    tree: &ProcessTree,
    alphabet: &[String],
    weights: &MutationWeights,
    rng: &mut R,
) -> Result<ProcessTree, MutationError> {
    weights.validate()?;
    let kind = weights.select(rng.random::<f64>());
    debug!("Applying mutation {:?}", kind);
    apply_mutation(kind, tree, alphabet, rng)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::process_tree::identity::IdGenerator;
    use crate::process_tree::nested_tree::NestedNode;
    use crate::process_tree::process_tree_struct::OperatorType;

    fn zero() -> MutationWeights {
        MutationWeights {
            remove: 0.0,
            add: 0.0,
            retype: 0.0,
            normalize: 0.0,
            remove_useless: 0.0,
            replace: 0.0,
        }
    }

    #[test]
    fn default_weights_leave_room_for_shuffle() {
        let weights = MutationWeights::default();
        assert!(weights.validate().is_ok());
        assert!((weights.shuffle_weight() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn cumulative_selection() {
        let weights = MutationWeights::default();
        assert_eq!(weights.select(0.0), MutationKind::RemoveRandomNode);
        assert_eq!(weights.select(0.149), MutationKind::RemoveRandomNode);
        assert_eq!(weights.select(0.15), MutationKind::AddRandomNode);
        assert_eq!(weights.select(0.449), MutationKind::AddRandomNode);
        assert_eq!(weights.select(0.5), MutationKind::RetypeRandomNode);
        assert_eq!(weights.select(0.65), MutationKind::Normalize);
        assert_eq!(weights.select(0.8), MutationKind::RemoveUselessNode);
        assert_eq!(weights.select(0.92), MutationKind::ReplaceTree);
        assert_eq!(weights.select(0.96), MutationKind::ShuffleChildren);
        assert_eq!(weights.select(0.999), MutationKind::ShuffleChildren);
    }

    #[test]
    fn zero_weights_never_fire() {
        let weights = MutationWeights { add: 1.0, ..zero() };
        for r in [0.0, 0.3, 0.999_999] {
            assert_eq!(weights.select(r), MutationKind::AddRandomNode);
        }
        assert_eq!(zero().select(0.0), MutationKind::ShuffleChildren);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let negative = MutationWeights {
            remove: -0.1,
            ..MutationWeights::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(MutationError::InvalidWeights(_))
        ));
        let too_much = MutationWeights {
            add: 0.9,
            ..MutationWeights::default()
        };
        assert!(matches!(
            too_much.validate(),
            Err(MutationError::InvalidWeights(_))
        ));
        let tree = ProcessTree::new(IdGenerator::new_shared());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(mutate(&tree, &[], &too_much, &mut rng).is_err());
    }

    #[test]
    fn remove_only_weights_shrink_tree() {
        let nested = NestedNode::operator(
            OperatorType::Sequence,
            vec![
                NestedNode::leaf("a"),
                NestedNode::leaf("b"),
                NestedNode::leaf("c"),
            ],
        );
        let tree = ProcessTree::from_nested(IdGenerator::new_shared(), &nested);
        let weights = MutationWeights {
            remove: 1.0,
            ..zero()
        };
        let mut rng = StdRng::seed_from_u64(21);
        let result = mutate(&tree, &["a".to_string()], &weights, &mut rng).unwrap();
        assert_eq!(result.tree_size(), 3);
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let weights: MutationWeights = serde_json::from_str(r#"{"add": 0.1}"#).unwrap();
        assert_eq!(weights.add, 0.1);
        assert_eq!(weights.remove, 0.15);
    }
}
