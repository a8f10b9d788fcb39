#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]

#![doc = include_str!("../README.md")]

///
/// Process trees (arena-based [`ProcessTree`] with identity-aware editing)
///
pub mod process_tree {
    /// Node identities ([`NodeId`], [`IdGenerator`])
    pub mod identity;
    /// Nested (serializable) representation of process trees
    pub mod nested_tree;
    /// Flattening and sorting of process trees
    pub mod normalization;
    /// [`ProcessTree`] struct and structural editing
    pub mod process_tree_struct;
    /// Random process trees and random partitions of alphabets
    pub mod random_generation;
    /// Detection and repair of useless nodes
    pub mod uselessness;

    #[doc(inline)]
    pub use identity::{IdGenerator, NodeId};

    #[doc(inline)]
    pub use nested_tree::NestedNode;

    #[doc(inline)]
    pub use process_tree_struct::{LeafLabel, OperatorType, ProcessTree, TreeError};

    #[doc(inline)]
    pub use uselessness::Uselessness;
}

///
/// Mutation operators on process trees
///
pub mod mutation {
    /// Weighted random choice of a mutation operator
    pub mod mutate;
    /// Single mutation operators
    pub mod operators;

    #[doc(inline)]
    pub use mutate::{mutate, MutationError, MutationKind, MutationWeights};
}

///
/// Event logs
///
pub mod event_log {
    /// Constants
    pub mod constants;
    /// [`EventLog`] struct and sub-structs
    pub mod event_log_struct;

    #[doc(inline)]
    pub use event_log_struct::{Attribute, AttributeValue, Attributes, Event, EventLog, Trace};
}

///
/// Petri nets
///
pub mod petri_net {
    /// Conversion of process trees to workflow nets
    pub mod conversion;
    /// [`PetriNet`] struct
    pub mod petri_net_struct;

    #[doc(inline)]
    pub use petri_net_struct::PetriNet;
}

///
/// Quality of process trees
///
pub mod quality {
    /// Structural complexity metrics of Petri nets
    pub mod complexity;
    /// Quality oracle backed by a conformance checker
    pub mod conformance_oracle;
    /// [`QualityOracle`] and the combined quality
    pub mod oracle;
    /// Simplicity scores relative to a reference model
    pub mod simplicity;

    #[doc(inline)]
    pub use oracle::{calculate_quality, QualityOracle, QualityScores, QualityWeights};
}

///
/// Evolutionary Tree Miner
///
pub mod etm {
    /// Search driver
    pub mod miner;
    /// Options of the search
    pub mod options;
    /// Outcome of a search
    pub mod result;

    #[doc(inline)]
    pub use miner::{discover_process_tree, EtmError, EtmState, EvolutionaryTreeMiner};

    #[doc(inline)]
    pub use options::EtmOptions;

    #[doc(inline)]
    pub use result::EtmResult;
}

#[doc(inline)]
pub use process_tree::process_tree_struct::ProcessTree;

#[doc(inline)]
pub use event_log::event_log_struct::EventLog;

#[doc(inline)]
pub use petri_net::petri_net_struct::PetriNet;

#[doc(inline)]
pub use petri_net::conversion::convert_to_petri_net;

#[doc(inline)]
pub use etm::miner::{discover_process_tree, EvolutionaryTreeMiner};

#[doc(inline)]
pub use etm::options::EtmOptions;

///
/// Serialize a [`ProcessTree`] as a JSON [`String`]
///
pub fn process_tree_to_json(tree: &ProcessTree) -> Result<String, serde_json::Error> {
    serde_json::to_string(tree)
}

///
/// Deserialize a [`ProcessTree`] from a JSON [`String`]
///
/// The nodes of the tree get fresh identities.
///
pub fn json_to_process_tree(tree_json: &str) -> Result<ProcessTree, serde_json::Error> {
    let nested: process_tree::NestedNode = serde_json::from_str(tree_json)?;
    Ok(ProcessTree::from_nested(
        process_tree::IdGenerator::new_shared(),
        &nested,
    ))
}

#[cfg(test)]
mod tests;
