//! Random Process Tree Generation
use std::sync::Arc;

use rand::distr::{Distribution, Uniform};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use super::identity::IdGenerator;
use super::nested_tree::NestedNode;
use super::process_tree_struct::{OperatorType, ProcessTree};

///
/// Uniformly picks an operator type, optionally excluding [`OperatorType::Loop`]
///
pub fn choose_random_operator<R: Rng + ?Sized>(allow_loop: bool, rng: &mut R) -> OperatorType {
    let candidates: &[OperatorType] = if allow_loop {
        &OperatorType::ALL
    } else {
        &OperatorType::WITHOUT_LOOP
    };
    candidates
        .choose(rng)
        .copied()
        .unwrap_or(OperatorType::Sequence)
}

///
/// Distributes the symbols of `alphabet` over `parts` non-empty parts
///
/// The symbols are shuffled, the first `parts` symbols each seed one part and all remaining
/// symbols are assigned to a uniformly chosen part. `parts` is clamped to `[1, |alphabet|]`, so
/// the result is empty only for an empty alphabet.
///
/// # Examples
///
/// ```
/// use evolutionary_tree_miner::process_tree::random_generation::randomly_split_alphabet;
///
/// let alphabet = vec!["a", "b", "c", "d"];
/// let parts = randomly_split_alphabet(&alphabet, 2, &mut rand::rng());
/// assert_eq!(parts.len(), 2);
/// assert!(parts.iter().all(|p| !p.is_empty()));
/// assert_eq!(parts.iter().map(Vec::len).sum::<usize>(), 4);
/// ```
pub fn randomly_split_alphabet<T: Clone, R: Rng + ?Sized>(
    alphabet: &[T],
    parts: usize,
    rng: &mut R,
) -> Vec<Vec<T>> {
    if alphabet.is_empty() {
        return Vec::new();
    }
    let parts = parts.clamp(1, alphabet.len());
    let mut to_distribute: Vec<T> = alphabet.to_vec();
    to_distribute.shuffle(rng);

    let mut split: Vec<Vec<T>> = vec![Vec::new(); parts];
    let Ok(part_dist) = Uniform::new(0, parts) else {
        return vec![to_distribute];
    };
    for (pos, symbol) in to_distribute.into_iter().enumerate() {
        if pos < parts {
            split[pos].push(symbol);
        } else {
            split[part_dist.sample(rng)].push(symbol);
        }
    }
    split
}

///
/// Generates a random process tree whose leaves are exactly the symbols of `alphabet`
///
/// * an empty alphabet yields a single silent leaf,
/// * a single symbol yields a single leaf labeled with that symbol,
/// * otherwise a random operator (loops included) with `k` children is created, where `k` is
///   uniform in `[2, |alphabet|]`; the alphabet is split into `k` parts using
///   [`randomly_split_alphabet`] and each part generates one child recursively.
///
/// Every symbol appears in exactly one leaf and every operator node has at least two children.
///
pub fn generate_random_tree<R: Rng + ?Sized>(
    alphabet: &[String],
    ids: Arc<IdGenerator>,
    rng: &mut R,
) -> ProcessTree {
    ProcessTree::from_nested(ids, &generate_random_nested(alphabet, rng))
}

fn generate_random_nested<R: Rng + ?Sized>(alphabet: &[String], rng: &mut R) -> NestedNode {
    match alphabet {
        [] => NestedNode::tau(),
        [single] => NestedNode::leaf(single.clone()),
        _ => {
            let operator_type = choose_random_operator(true, rng);
            let num_children = rng.random_range(2..=alphabet.len());
            let children = randomly_split_alphabet(alphabet, num_children, rng)
                .iter()
                .map(|part| generate_random_nested(part, rng))
                .collect();
            NestedNode::operator(operator_type, children)
        }
    }
}
