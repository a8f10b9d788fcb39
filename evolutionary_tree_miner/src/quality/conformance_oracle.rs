use std::collections::HashSet;

use log::trace;

use super::oracle::{QualityOracle, QualityScores};
use super::simplicity::Simplicity;
use crate::event_log::event_log_struct::EventLog;
use crate::petri_net::conversion::convert_to_petri_net;
use crate::petri_net::petri_net_struct::PetriNet;
use crate::process_tree::process_tree_struct::ProcessTree;

///
/// Conformance checking backend comparing a (fixed) event log with workflow nets
///
/// The initial and final marking are part of the passed [`PetriNet`].
///
pub trait ConformanceChecker {
    /// Log fitness in `[0, 1]`
    fn fitness(&self, net: &PetriNet) -> f64;
    /// Precision in `[0, 1]`
    fn precision(&self, net: &PetriNet) -> f64;
    /// Generalization in `[0, 1]`
    fn generalization(&self, net: &PetriNet) -> f64;
}

///
/// [`QualityOracle`] converting trees to workflow nets and asking a [`ConformanceChecker`]
///
/// A tree that misses any activity of the log gets fitness `0`, so that trees covering only a
/// fragment of the log cannot reach a perfect score.
/// Simplicity is computed with a [`Simplicity`] measure.
///
#[derive(Debug)]
pub struct ConformanceOracle<C: ConformanceChecker> {
    checker: C,
    simplicity: Simplicity,
    log_activities: Vec<String>,
}

impl<C: ConformanceChecker> ConformanceOracle<C> {
    /// Create a new oracle for the activities of `log`
    pub fn new(checker: C, simplicity: Simplicity, log: &EventLog) -> Self {
        Self::with_activities(checker, simplicity, log.get_set_of_activities())
    }

    /// Create a new oracle for the given log activities
    pub fn with_activities(
        checker: C,
        simplicity: Simplicity,
        log_activities: Vec<String>,
    ) -> Self {
        Self {
            checker,
            simplicity,
            log_activities,
        }
    }

    /// The underlying checker
    pub fn checker(&self) -> &C {
        &self.checker
    }

    ///
    /// Returns `true` if every log activity is the label of some leaf of `tree`
    ///
    pub fn covers_log_activities(&self, tree: &ProcessTree) -> bool {
        let labels: HashSet<&str> = tree.list_leaf_labels().into_iter().flatten().collect();
        self.log_activities
            .iter()
            .all(|a| labels.contains(a.as_str()))
    }

    fn gated_fitness(&self, tree: &ProcessTree, net: &PetriNet) -> f64 {
        if self.covers_log_activities(tree) {
            self.checker.fitness(net)
        } else {
            trace!("Tree {} misses log activities, fitness 0", tree);
            0.0
        }
    }
}

impl<C: ConformanceChecker> QualityOracle for ConformanceOracle<C> {
    fn fitness(&self, tree: &ProcessTree) -> f64 {
        if !self.covers_log_activities(tree) {
            return 0.0;
        }
        self.checker.fitness(&convert_to_petri_net(tree))
    }

    fn precision(&self, tree: &ProcessTree) -> f64 {
        self.checker.precision(&convert_to_petri_net(tree))
    }

    fn generalization(&self, tree: &ProcessTree) -> f64 {
        self.checker.generalization(&convert_to_petri_net(tree))
    }

    fn simplicity(&self, tree: &ProcessTree) -> f64 {
        self.simplicity.score_tree(tree)
    }

    fn scores(&self, tree: &ProcessTree) -> QualityScores {
        let net = convert_to_petri_net(tree);
        QualityScores {
            fitness: self.gated_fitness(tree, &net),
            precision: self.checker.precision(&net),
            generalization: self.checker.generalization(&net),
            simplicity: self.simplicity.score(&net),
        }
    }
}
