use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::mutation::mutate::{mutate, MutationWeights};
use crate::process_tree::identity::IdGenerator;
use crate::process_tree::nested_tree::NestedNode;
use crate::process_tree::process_tree_struct::OperatorType;
use crate::process_tree::random_generation::generate_random_tree;
use crate::{convert_to_petri_net, json_to_process_tree, process_tree_to_json, ProcessTree};

fn alphabet() -> Vec<String> {
    ["register", "check", "decide", "pay", "reject"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn random_mutation_chains_keep_trees_valid() {
    let alphabet = alphabet();
    let known: HashSet<&str> = alphabet.iter().map(String::as_str).collect();
    let weights = MutationWeights::default();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tree = generate_random_tree(&alphabet, IdGenerator::new_shared(), &mut rng);
        for _ in 0..60 {
            tree = mutate(&tree, &alphabet, &weights, &mut rng).unwrap();
            if let Err(e) = tree.check_invariants() {
                panic!("seed {}: {} in {}", seed, e, tree);
            }
            // Leaves only carry activities of the alphabet (or are silent)
            assert!(tree
                .list_leaf_labels()
                .into_iter()
                .flatten()
                .all(|l| known.contains(l)));
        }
    }
}

#[test]
fn identities_stay_unique_across_copies() {
    let alphabet = alphabet();
    let ids = IdGenerator::new_shared();
    let mut rng = StdRng::seed_from_u64(3);
    let tree = generate_random_tree(&alphabet, ids.clone(), &mut rng);
    let mut seen = HashSet::new();
    for id in tree.prefix_order() {
        assert!(seen.insert(id));
    }
    let mut copy = tree.clone();
    for _ in 0..10 {
        copy = mutate(&copy, &alphabet, &MutationWeights::default(), &mut rng).unwrap();
        for id in copy.prefix_order() {
            assert!(seen.insert(id), "identity {} issued twice", id);
        }
    }
    assert!(ids.issued() >= seen.len() as u64);
}

#[test]
fn random_trees_convert_to_sound_looking_nets() {
    let alphabet = alphabet();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..10 {
        let tree = generate_random_tree(&alphabet, IdGenerator::new_shared(), &mut rng);
        let net = convert_to_petri_net(&tree);
        let mut labels = net.visible_labels();
        labels.sort();
        let mut expected = alphabet.clone();
        expected.sort();
        assert_eq!(labels, expected);
        assert!(net.initial_marking.is_some());
        assert!(net.final_markings.as_ref().is_some_and(|m| m.len() == 1));
    }
}

#[test]
fn json_round_trip_of_random_trees() {
    let mut rng = StdRng::seed_from_u64(8);
    let tree = generate_random_tree(&alphabet(), IdGenerator::new_shared(), &mut rng);
    let json = process_tree_to_json(&tree).unwrap();
    let parsed = json_to_process_tree(&json).unwrap();
    assert_eq!(parsed.to_string(), tree.to_string());
    assert!(parsed.is_valid());
}

#[test]
fn removing_from_two_leaf_sequence_leaves_single_leaf() {
    let alphabet = vec!["a".to_string(), "b".to_string()];
    let weights = MutationWeights {
        remove: 1.0,
        add: 0.0,
        retype: 0.0,
        normalize: 0.0,
        remove_useless: 0.0,
        replace: 0.0,
    };
    let tree = ProcessTree::from_nested(
        IdGenerator::new_shared(),
        &NestedNode::operator(
            OperatorType::Sequence,
            vec![NestedNode::leaf("a"), NestedNode::leaf("b")],
        ),
    );
    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = mutate(&tree, &alphabet, &weights, &mut rng).unwrap();
        assert_eq!(result.tree_size(), 1);
        assert!(result.is_leaf(result.root()));
        assert!(result.is_valid());
        let label = result.list_leaf_labels()[0].map(str::to_string);
        assert!(matches!(label.as_deref(), Some("a") | Some("b")));
    }
    assert_eq!(tree.to_string(), "->( 'a', 'b' )");
}
