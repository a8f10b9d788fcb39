use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::complexity::{average_connector_degree, connector_heterogeneity, size};
use crate::petri_net::conversion::convert_to_petri_net;
use crate::petri_net::petri_net_struct::PetriNet;
use crate::process_tree::process_tree_struct::ProcessTree;

///
/// Complexity measure a [`Simplicity`] score is based on
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SimplicityMode {
    /// Number of places and transitions
    #[default]
    Size,
    /// Average connector degree
    AverageConnectorDegree,
    /// Connector heterogeneity (already in `[0, 1]`, no reference needed)
    ConnectorHeterogeneity,
}

/// Simplicity assumed for the reference model if not specified otherwise
pub const DEFAULT_REFERENCE_SIMPLICITY: f64 = 0.75;

///
/// Simplicity score relative to a reference model of known simplicity
///
/// If the reference model has complexity `c` and simplicity `s`, a model with complexity
/// `N = ceil(c / (1 - s))` or more scores `0`, and smaller models score linearly closer to `1`.
///
#[derive(Debug, Clone)]
pub struct Simplicity {
    reference: PetriNet,
    reference_simplicity: f64,
    mode: SimplicityMode,
}

impl Simplicity {
    /// Create a new simplicity measure with [`DEFAULT_REFERENCE_SIMPLICITY`]
    pub fn new(reference: PetriNet, mode: SimplicityMode) -> Self {
        Self {
            reference,
            reference_simplicity: DEFAULT_REFERENCE_SIMPLICITY,
            mode,
        }
    }

    /// Create a new simplicity measure using the workflow net of a reference tree
    pub fn from_reference_tree(reference: &ProcessTree, mode: SimplicityMode) -> Self {
        Self::new(convert_to_petri_net(reference), mode)
    }

    /// Set the simplicity assumed for the reference model
    pub fn with_reference_simplicity(mut self, reference_simplicity: f64) -> Self {
        self.reference_simplicity = reference_simplicity;
        self
    }

    /// The complexity measure in use
    pub fn mode(&self) -> SimplicityMode {
        self.mode
    }

    ///
    /// Raw complexity of a net according to the mode (missing connector measures count as `0`)
    ///
    pub fn complexity(&self, net: &PetriNet) -> f64 {
        match self.mode {
            SimplicityMode::Size => size(net) as f64,
            SimplicityMode::AverageConnectorDegree => average_connector_degree(net).unwrap_or(0.0),
            SimplicityMode::ConnectorHeterogeneity => connector_heterogeneity(net).unwrap_or(0.0),
        }
    }

    /// Raw complexity of the workflow net of a tree
    pub fn complexity_of(&self, tree: &ProcessTree) -> f64 {
        self.complexity(&convert_to_petri_net(tree))
    }

    ///
    /// Simplicity score in `[0, 1]` of a net
    ///
    /// A degenerate reference (complexity bound `0`) scores every net with `0`.
    ///
    pub fn score(&self, net: &PetriNet) -> f64 {
        let complexity = self.complexity(net);
        let score = match self.mode {
            SimplicityMode::ConnectorHeterogeneity => complexity,
            SimplicityMode::Size | SimplicityMode::AverageConnectorDegree => {
                let bound =
                    (self.complexity(&self.reference) / (1.0 - self.reference_simplicity)).ceil();
                if !bound.is_finite() || bound <= 0.0 {
                    return 0.0;
                }
                1.0 - (complexity / bound).min(1.0)
            }
        };
        score.clamp(0.0, 1.0)
    }

    /// Simplicity score of the workflow net of a tree
    pub fn score_tree(&self, tree: &ProcessTree) -> f64 {
        self.score(&convert_to_petri_net(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_tree::identity::IdGenerator;
    use crate::process_tree::nested_tree::NestedNode;
    use crate::process_tree::process_tree_struct::OperatorType;

    fn tree(nested: NestedNode) -> ProcessTree {
        ProcessTree::from_nested(IdGenerator::new_shared(), &nested)
    }

    fn sequence(n: usize) -> ProcessTree {
        tree(NestedNode::operator(
            OperatorType::Sequence,
            (0..n).map(|i| NestedNode::leaf(format!("a{}", i))).collect(),
        ))
    }

    #[test]
    fn size_relative_to_reference() {
        // reference: single leaf, size 3, bound ceil(3 / 0.25) = 12
        let simplicity = Simplicity::from_reference_tree(
            &tree(NestedNode::leaf("a")),
            SimplicityMode::Size,
        );
        assert_eq!(simplicity.complexity_of(&sequence(1)), 3.0);
        assert!((simplicity.score_tree(&sequence(1)) - 0.75).abs() < 1e-12);
        // 2 leaves: 4 places + 3 transitions = 7
        assert!((simplicity.score_tree(&sequence(2)) - (1.0 - 7.0 / 12.0)).abs() < 1e-12);
        assert_eq!(simplicity.score_tree(&sequence(5)), 0.0);
    }

    #[test]
    fn degenerate_reference_scores_zero() {
        let simplicity = Simplicity::from_reference_tree(
            &tree(NestedNode::leaf("a")),
            SimplicityMode::AverageConnectorDegree,
        );
        assert_eq!(simplicity.score_tree(&sequence(3)), 0.0);
        let certain = Simplicity::from_reference_tree(&sequence(2), SimplicityMode::Size)
            .with_reference_simplicity(1.0);
        assert_eq!(certain.score_tree(&sequence(2)), 0.0);
    }

    #[test]
    fn heterogeneity_is_used_directly() {
        let simplicity = Simplicity::new(PetriNet::new(), SimplicityMode::ConnectorHeterogeneity);
        assert_eq!(simplicity.score_tree(&sequence(3)), 0.0);
        assert_eq!(simplicity.mode(), SimplicityMode::ConnectorHeterogeneity);
    }
}
