use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::process_tree::process_tree_struct::ProcessTree;

///
/// Scores of a process tree in the four quality dimensions
///
/// Valid scores are in `[0, 1]`; any other value (including NaN) counts as _not known_.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityScores {
    /// Share of the log behavior the model can replay
    pub fitness: f64,
    /// Share of the model behavior seen in the log
    pub precision: f64,
    /// Likelihood of the model to reproduce unseen behavior of the process
    pub generalization: f64,
    /// Simplicity of the model
    pub simplicity: f64,
}

/// Sentinel for a score that is not known
pub const UNKNOWN_SCORE: f64 = -1.0;

impl QualityScores {
    /// No score known
    pub const UNKNOWN: QualityScores = QualityScores {
        fitness: UNKNOWN_SCORE,
        precision: UNKNOWN_SCORE,
        generalization: UNKNOWN_SCORE,
        simplicity: UNKNOWN_SCORE,
    };
}

/// Returns `true` if `score` is a valid score in `[0, 1]`
pub fn is_known_score(score: f64) -> bool {
    (0.0..=1.0).contains(&score)
}

///
/// Weights of the quality dimensions in the combined quality
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct QualityWeights {
    /// Weight of fitness
    pub fitness: f64,
    /// Weight of precision
    pub precision: f64,
    /// Weight of generalization
    pub generalization: f64,
    /// Weight of simplicity
    pub simplicity: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            fitness: 0.5,
            precision: 0.25,
            generalization: 0.1,
            simplicity: 0.15,
        }
    }
}

impl QualityWeights {
    /// Weighted sum of the scores
    pub fn combine(&self, scores: &QualityScores) -> f64 {
        self.fitness * scores.fitness
            + self.precision * scores.precision
            + self.generalization * scores.generalization
            + self.simplicity * scores.simplicity
    }
}

///
/// Source of quality scores for process trees
///
/// Implementations usually replay an event log on the model. Each method should return a value
/// in `[0, 1]`.
///
pub trait QualityOracle {
    /// Fitness of the tree
    fn fitness(&self, tree: &ProcessTree) -> f64;
    /// Precision of the tree
    fn precision(&self, tree: &ProcessTree) -> f64;
    /// Generalization of the tree
    fn generalization(&self, tree: &ProcessTree) -> f64;
    /// Simplicity of the tree
    fn simplicity(&self, tree: &ProcessTree) -> f64;

    ///
    /// All four scores at once
    ///
    /// Override this if the scores share expensive preparation (e.g., model conversion).
    ///
    fn scores(&self, tree: &ProcessTree) -> QualityScores {
        QualityScores {
            fitness: self.fitness(tree),
            precision: self.precision(tree),
            generalization: self.generalization(tree),
            simplicity: self.simplicity(tree),
        }
    }
}

///
/// Computes the scores of a tree, reusing the valid scores of `known`
///
/// Scores of `known` outside of `[0, 1]` are recomputed by the oracle.
///
pub fn complete_scores<O: QualityOracle + ?Sized>(
    oracle: &O,
    tree: &ProcessTree,
    known: &QualityScores,
) -> QualityScores {
    QualityScores {
        fitness: reuse_or_compute("fitness", known.fitness, || oracle.fitness(tree)),
        precision: reuse_or_compute("precision", known.precision, || oracle.precision(tree)),
        generalization: reuse_or_compute("generalization", known.generalization, || {
            oracle.generalization(tree)
        }),
        simplicity: reuse_or_compute("simplicity", known.simplicity, || oracle.simplicity(tree)),
    }
}

fn reuse_or_compute<F: FnOnce() -> f64>(name: &str, value: f64, compute: F) -> f64 {
    if is_known_score(value) {
        return value;
    }
    if value != UNKNOWN_SCORE {
        warn!("Discarding {} score {} outside of [0, 1]", name, value);
    }
    compute()
}

///
/// Combined quality `w_f * f + w_p * p + w_g * g + w_s * s` of a tree
///
/// Precomputed scores are used where they are valid, all other scores are computed by the
/// oracle. Without precomputed scores, [`QualityOracle::scores`] is used.
///
pub fn calculate_quality<O: QualityOracle + ?Sized>(
    oracle: &O,
    tree: &ProcessTree,
    weights: &QualityWeights,
    precomputed: Option<&QualityScores>,
) -> f64 {
    let scores = match precomputed {
        Some(known) => complete_scores(oracle, tree, known),
        None => oracle.scores(tree),
    };
    let quality = weights.combine(&scores);
    debug!("Quality {:.4} ({:?}) of {}", quality, scores, tree);
    quality
}
