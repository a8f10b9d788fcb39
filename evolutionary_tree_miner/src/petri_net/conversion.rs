//! Conversion of Process Trees to Workflow Nets
use super::petri_net_struct::{ArcType, Marking, PetriNet, PlaceID, TransitionID};
use crate::process_tree::identity::NodeId;
use crate::process_tree::process_tree_struct::{NodeKind, OperatorType, ProcessTree};

///
/// Converts a process tree into a block-structured workflow net
///
/// Each subtree becomes a block with one initial and one final place. Blocks are composed with
/// silent transitions, which are not reduced afterwards. The resulting net has the initial marking
/// `{p_i: 1}` and the single final marking `{p_o: 1}`.
///
pub fn convert_to_petri_net(tree: &ProcessTree) -> PetriNet {
    let mut net = PetriNet::new();
    let (initial, last) = add_block(&mut net, tree, tree.root());
    net.initial_marking = Some(Marking::from([(initial, 1)]));
    net.final_markings = Some(vec![Marking::from([(last, 1)])]);
    net
}

type Block = (PlaceID, PlaceID);

fn add_block(net: &mut PetriNet, tree: &ProcessTree, id: NodeId) -> Block {
    match tree.node(id).map(|n| n.kind()) {
        Some(NodeKind::Operator {
            operator_type,
            children,
        }) if !children.is_empty() => {
            let blocks: Vec<Block> = children
                .iter()
                .map(|child| add_block(net, tree, *child))
                .collect();
            match operator_type {
                OperatorType::Sequence => sequence_block(net, &blocks),
                OperatorType::Concurrency => concurrency_block(net, &blocks),
                OperatorType::ExclusiveChoice => choice_block(net, &blocks),
                OperatorType::Loop => loop_block(net, &blocks),
            }
        }
        node => {
            let label = match node {
                Some(NodeKind::Leaf(label)) => label.as_activity().map(str::to_string),
                _ => None,
            };
            let initial = net.add_place();
            let transition = net.add_transition(label);
            let last = net.add_place();
            connect(net, initial, transition, last);
            (initial, last)
        }
    }
}

fn connect(net: &mut PetriNet, from: PlaceID, via: TransitionID, to: PlaceID) {
    net.add_arc(ArcType::place_to_transition(from, via), None);
    net.add_arc(ArcType::transition_to_place(via, to), None);
}

fn silent_link(net: &mut PetriNet, from: PlaceID, to: PlaceID) {
    let tau = net.add_transition(None);
    connect(net, from, tau, to);
}

fn sequence_block(net: &mut PetriNet, blocks: &[Block]) -> Block {
    for pair in blocks.windows(2) {
        silent_link(net, pair[0].1, pair[1].0);
    }
    (blocks[0].0, blocks[blocks.len() - 1].1)
}

fn concurrency_block(net: &mut PetriNet, blocks: &[Block]) -> Block {
    let initial = net.add_place();
    let split = net.add_transition(None);
    let join = net.add_transition(None);
    let last = net.add_place();
    net.add_arc(ArcType::place_to_transition(initial, split), None);
    net.add_arc(ArcType::transition_to_place(join, last), None);
    for (child_initial, child_last) in blocks {
        net.add_arc(ArcType::transition_to_place(split, *child_initial), None);
        net.add_arc(ArcType::place_to_transition(*child_last, join), None);
    }
    (initial, last)
}

fn choice_block(net: &mut PetriNet, blocks: &[Block]) -> Block {
    let initial = net.add_place();
    let last = net.add_place();
    for (child_initial, child_last) in blocks {
        silent_link(net, initial, *child_initial);
        silent_link(net, *child_last, last);
    }
    (initial, last)
}

fn loop_block(net: &mut PetriNet, blocks: &[Block]) -> Block {
    let initial = net.add_place();
    let last = net.add_place();
    let loop_start = net.add_place();
    let loop_end = net.add_place();
    silent_link(net, initial, loop_start);
    silent_link(net, loop_end, last);
    let (do_initial, do_last) = blocks[0];
    silent_link(net, loop_start, do_initial);
    silent_link(net, do_last, loop_end);
    for (redo_initial, redo_last) in &blocks[1..] {
        silent_link(net, *redo_last, loop_start);
        silent_link(net, loop_end, *redo_initial);
    }
    (initial, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_tree::identity::IdGenerator;
    use crate::process_tree::nested_tree::NestedNode;
    use crate::process_tree::process_tree_struct::LeafLabel;

    fn convert(nested: NestedNode) -> PetriNet {
        convert_to_petri_net(&ProcessTree::from_nested(
            IdGenerator::new_shared(),
            &nested,
        ))
    }

    fn leaves(names: &[&str]) -> Vec<NestedNode> {
        names.iter().map(|n| NestedNode::leaf(*n)).collect()
    }

    fn marked_place(marking: &Marking) -> PlaceID {
        *marking.keys().next().unwrap()
    }

    #[test]
    fn leaf_becomes_single_transition() {
        let net = convert_to_petri_net(&ProcessTree::new_leaf(
            IdGenerator::new_shared(),
            LeafLabel::activity("a"),
        ));
        assert_eq!(net.places.len(), 2);
        assert_eq!(net.transitions.len(), 1);
        assert_eq!(net.arcs.len(), 2);
        assert_eq!(net.visible_labels(), vec!["a"]);
        let initial = marked_place(net.initial_marking.as_ref().unwrap());
        assert_eq!(net.preset_of_place(initial), vec![]);
    }

    #[test]
    fn silent_leaf_becomes_invisible_transition() {
        let net = convert(NestedNode::tau());
        assert_eq!(net.transitions.len(), 1);
        assert!(net.visible_labels().is_empty());
    }

    #[test]
    fn sequence_chains_children() {
        let net = convert(NestedNode::operator(
            OperatorType::Sequence,
            leaves(&["a", "b", "c"]),
        ));
        // 3 leaf blocks + 2 silent links
        assert_eq!(net.places.len(), 6);
        assert_eq!(net.transitions.len(), 5);
        assert_eq!(net.arcs.len(), 10);
    }

    #[test]
    fn concurrency_splits_and_joins() {
        let net = convert(NestedNode::operator(
            OperatorType::Concurrency,
            leaves(&["a", "b"]),
        ));
        assert_eq!(net.places.len(), 6);
        assert_eq!(net.transitions.len(), 4);
        let initial = marked_place(net.initial_marking.as_ref().unwrap());
        let split = net.postset_of_place(initial);
        assert_eq!(split.len(), 1);
        assert_eq!(net.postset_of_transition(split[0]).len(), 2);
    }

    #[test]
    fn choice_branches_from_initial_place() {
        let net = convert(NestedNode::operator(
            OperatorType::ExclusiveChoice,
            leaves(&["a", "b", "c"]),
        ));
        assert_eq!(net.places.len(), 8);
        assert_eq!(net.transitions.len(), 9);
        let initial = marked_place(net.initial_marking.as_ref().unwrap());
        assert_eq!(net.postset_of_place(initial).len(), 3);
        let last = marked_place(&net.final_markings.as_ref().unwrap()[0]);
        assert_eq!(net.preset_of_place(last).len(), 3);
    }

    #[test]
    fn loop_connects_do_and_redo_parts() {
        let net = convert(NestedNode::operator(OperatorType::Loop, leaves(&["a", "b"])));
        // 2 leaf blocks (4 places, 2 transitions) + 4 places + 6 silent transitions
        assert_eq!(net.places.len(), 8);
        assert_eq!(net.transitions.len(), 8);
        assert_eq!(net.arcs.len(), 16);
        let initial = marked_place(net.initial_marking.as_ref().unwrap());
        let start = net.postset_of_place(initial);
        let loop_start = net.postset_of_transition(start[0])[0];
        // entered from the initial place and from the redo part
        assert_eq!(net.preset_of_place(loop_start).len(), 2);
    }
}
