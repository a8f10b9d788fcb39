//! Complexity Measures of Petri Nets
//!
//! A _connector_ is a place or transition with more than one incoming or more than one outgoing
//! arc. Connector transitions split or join concurrent behavior, connector places split or join
//! alternative behavior.
use uuid::Uuid;

use crate::petri_net::petri_net_struct::PetriNet;

/// Number of places plus number of transitions
pub fn size(net: &PetriNet) -> usize {
    net.places.len() + net.transitions.len()
}

fn is_connector((incoming, outgoing): (usize, usize)) -> bool {
    incoming > 1 || outgoing > 1
}

///
/// Mean number of arcs (incoming plus outgoing) over all connectors
///
/// Returns `None` if the net has no connectors.
///
pub fn average_connector_degree(net: &PetriNet) -> Option<f64> {
    let (count, degree_sum) = net
        .node_degrees()
        .into_values()
        .filter(|d| is_connector(*d))
        .fold((0usize, 0usize), |(count, sum), (i, o)| (count + 1, sum + i + o));
    if count == 0 {
        return None;
    }
    Some(degree_sum as f64 / count as f64)
}

///
/// Entropy of the connector types (place connectors vs. transition connectors)
///
/// `0` if only one type of connector occurs, `1` if both occur equally often.
/// Returns `None` if the net has no connectors.
///
pub fn connector_heterogeneity(net: &PetriNet) -> Option<f64> {
    let degrees = net.node_degrees();
    let is_connector_node = |id: &&Uuid| degrees.get(*id).copied().is_some_and(is_connector);
    let place_connectors = net.places.keys().filter(is_connector_node).count();
    let transition_connectors = net.transitions.keys().filter(is_connector_node).count();
    let total = place_connectors + transition_connectors;
    if total == 0 {
        return None;
    }
    let entropy = [place_connectors, transition_connectors]
        .into_iter()
        .filter(|c| *c > 0)
        .map(|c| {
            let share = c as f64 / total as f64;
            -share * share.log2()
        })
        .sum::<f64>();
    Some(entropy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri_net::conversion::convert_to_petri_net;
    use crate::process_tree::identity::IdGenerator;
    use crate::process_tree::nested_tree::NestedNode;
    use crate::process_tree::process_tree_struct::{OperatorType, ProcessTree};

    fn net_of(nested: NestedNode) -> PetriNet {
        convert_to_petri_net(&ProcessTree::from_nested(
            IdGenerator::new_shared(),
            &nested,
        ))
    }

    #[test]
    fn leaf_net_has_no_connectors() {
        let net = net_of(NestedNode::leaf("a"));
        assert_eq!(size(&net), 3);
        assert_eq!(average_connector_degree(&net), None);
        assert_eq!(connector_heterogeneity(&net), None);
    }

    #[test]
    fn concurrency_has_transition_connectors_only() {
        let net = net_of(NestedNode::operator(
            OperatorType::Concurrency,
            vec![NestedNode::leaf("a"), NestedNode::leaf("b")],
        ));
        // split (1 in, 2 out) and join (2 in, 1 out)
        assert_eq!(average_connector_degree(&net), Some(3.0));
        assert_eq!(connector_heterogeneity(&net), Some(0.0));
    }

    #[test]
    fn mixed_connectors_have_positive_entropy() {
        let net = net_of(NestedNode::operator(
            OperatorType::Sequence,
            vec![
                NestedNode::operator(
                    OperatorType::Concurrency,
                    vec![NestedNode::leaf("a"), NestedNode::leaf("b")],
                ),
                NestedNode::operator(
                    OperatorType::ExclusiveChoice,
                    vec![NestedNode::leaf("c"), NestedNode::leaf("d")],
                ),
            ],
        ));
        // two transition connectors, two place connectors
        let entropy = connector_heterogeneity(&net).unwrap();
        assert!((entropy - 1.0).abs() < 1e-12);
        // the final place of the choice has no outgoing arc
        assert_eq!(average_connector_degree(&net), Some(2.75));
    }
}
