use std::fmt::Display;
use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::options::EtmOptions;
use super::result::{EtmResult, LineageTrace};
use crate::event_log::event_log_struct::EventLog;
use crate::mutation::mutate::{mutate, MutationError};
use crate::process_tree::identity::IdGenerator;
use crate::process_tree::process_tree_struct::ProcessTree;
use crate::process_tree::random_generation::generate_random_tree;
use crate::quality::oracle::{calculate_quality, QualityOracle};

///
/// Error raised by the evolutionary search
///
#[derive(Debug)]
pub enum EtmError {
    /// The options are not valid
    InvalidOptions(String),
    /// There are no activities to build trees from
    EmptyAlphabet,
    /// Mutating a tree failed
    Mutation(MutationError),
    /// The search has not terminated, so there is no result yet
    NotTerminated,
    /// IO Error
    Io(std::io::Error),
    /// JSON Error
    Json(serde_json::Error),
    /// CSV Error
    Csv(csv::Error),
}

impl Display for EtmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EtmError::InvalidOptions(s) => write!(f, "Invalid options: {}", s),
            EtmError::EmptyAlphabet => write!(f, "No activities to discover a tree from"),
            EtmError::Mutation(e) => write!(f, "{}", e),
            EtmError::NotTerminated => write!(f, "The search has not terminated yet"),
            EtmError::Io(e) => write!(f, "IO Error: {}", e),
            EtmError::Json(e) => write!(f, "JSON Error: {}", e),
            EtmError::Csv(e) => write!(f, "CSV Error: {}", e),
        }
    }
}

impl std::error::Error for EtmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EtmError::InvalidOptions(_) | EtmError::EmptyAlphabet | EtmError::NotTerminated => {
                None
            }
            EtmError::Mutation(e) => Some(e),
            EtmError::Io(e) => Some(e),
            EtmError::Json(e) => Some(e),
            EtmError::Csv(e) => Some(e),
        }
    }
}

impl From<MutationError> for EtmError {
    fn from(e: MutationError) -> Self {
        EtmError::Mutation(e)
    }
}

impl From<std::io::Error> for EtmError {
    fn from(e: std::io::Error) -> Self {
        EtmError::Io(e)
    }
}

impl From<serde_json::Error> for EtmError {
    fn from(e: serde_json::Error) -> Self {
        EtmError::Json(e)
    }
}

impl From<csv::Error> for EtmError {
    fn from(e: csv::Error) -> Self {
        EtmError::Csv(e)
    }
}

///
/// Why a search stopped
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// A tree reached the desired quality
    DesiredQualityReached {
        /// Generation of the tree (`0` is the initial population)
        generation: usize,
        /// Lineage of the tree
        lineage: usize,
    },
    /// All mutation rounds were run
    MaxIterationsReached,
}

///
/// State of an [`EvolutionaryTreeMiner`]
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtmState {
    /// No tree created yet
    Initializing,
    /// Population is alive; `completed_generations` mutation rounds are done
    Evaluating {
        /// Number of completed mutation rounds
        completed_generations: usize,
    },
    /// Search is over
    Terminated(TerminationReason),
}

#[derive(Debug, Clone)]
struct Candidate {
    tree: ProcessTree,
    quality: f64,
}

///
/// Evolutionary search for a process tree of high quality
///
/// The population consists of `population_size` lineages. Each lineage starts with a random tree
/// over the alphabet; in every generation its tree is replaced (unconditionally) by a mutated
/// copy. The best tree seen so far is kept aside and only replaced by strictly better trees.
/// The search stops as soon as a tree reaches the desired quality, or after `max_iterations`
/// generations.
///
/// Use [`EvolutionaryTreeMiner::step`] to drive the search one phase at a time, or
/// [`EvolutionaryTreeMiner::run`] to run it to completion.
///
pub struct EvolutionaryTreeMiner<'a, O: QualityOracle + ?Sized, R: Rng = StdRng> {
    alphabet: Vec<String>,
    oracle: &'a O,
    options: EtmOptions,
    rng: R,
    ids: Arc<IdGenerator>,
    state: EtmState,
    population: Vec<ProcessTree>,
    best: Option<Candidate>,
    best_quality_history: Vec<f64>,
    lineage_traces: Vec<LineageTrace>,
}

impl<O: QualityOracle + ?Sized, R: Rng> std::fmt::Debug for EvolutionaryTreeMiner<'_, O, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionaryTreeMiner")
            .field("alphabet", &self.alphabet)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("population_size", &self.population.len())
            .field("best_quality", &self.best.as_ref().map(|c| c.quality))
            .finish()
    }
}

impl<'a, O: QualityOracle + ?Sized> EvolutionaryTreeMiner<'a, O, StdRng> {
    ///
    /// Create a miner over `alphabet`, seeding its random number generator from the options
    /// (or from the operating system if no seed is set)
    ///
    pub fn new(
        alphabet: Vec<String>,
        oracle: &'a O,
        options: EtmOptions,
    ) -> Result<Self, EtmError> {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(alphabet, oracle, options, rng)
    }

    ///
    /// Create a miner over the activities of `log`
    ///
    pub fn from_event_log(
        log: &EventLog,
        oracle: &'a O,
        options: EtmOptions,
    ) -> Result<Self, EtmError> {
        Self::new(log.get_set_of_activities(), oracle, options)
    }
}

impl<'a, O: QualityOracle + ?Sized, R: Rng> EvolutionaryTreeMiner<'a, O, R> {
    ///
    /// Create a miner using the given random number generator (the seed option is ignored)
    ///
    pub fn with_rng(
        alphabet: Vec<String>,
        oracle: &'a O,
        options: EtmOptions,
        rng: R,
    ) -> Result<Self, EtmError> {
        options.validate()?;
        if alphabet.is_empty() {
            return Err(EtmError::EmptyAlphabet);
        }
        Ok(Self {
            alphabet,
            oracle,
            options,
            rng,
            ids: IdGenerator::new_shared(),
            state: EtmState::Initializing,
            population: Vec::new(),
            best: None,
            best_quality_history: Vec::new(),
            lineage_traces: Vec::new(),
        })
    }

    /// Current state
    pub fn state(&self) -> EtmState {
        self.state
    }

    /// Current population (one tree per lineage)
    pub fn population(&self) -> &[ProcessTree] {
        &self.population
    }

    /// Best tree so far and its quality
    pub fn best(&self) -> Option<(&ProcessTree, f64)> {
        self.best.as_ref().map(|c| (&c.tree, c.quality))
    }

    fn quality_of(&self, tree: &ProcessTree) -> f64 {
        calculate_quality(self.oracle, tree, &self.options.quality_weights, None)
    }

    fn reaches_desired_quality(&self, quality: f64) -> bool {
        quality >= self.options.desired_quality
    }

    fn record_if_better(&mut self, tree: &ProcessTree, quality: f64) {
        let improves = self.best.as_ref().is_none_or(|best| quality > best.quality);
        if improves {
            debug!("New best quality {:.4}: {}", quality, tree);
            self.best = Some(Candidate {
                tree: tree.clone(),
                quality,
            });
        }
    }

    fn finish_with_winner(
        &mut self,
        tree: ProcessTree,
        quality: f64,
        generation: usize,
        lineage: usize,
    ) {
        info!(
            "Desired quality reached in generation {} (lineage {}): {:.4}",
            generation, lineage, quality
        );
        self.best = Some(Candidate { tree, quality });
        self.state = EtmState::Terminated(TerminationReason::DesiredQualityReached {
            generation,
            lineage,
        });
    }

    ///
    /// Advances the search by one phase
    ///
    /// * `Initializing`: creates and scores the initial population;
    /// * `Evaluating`: mutates and scores every lineage once (one generation);
    /// * `Terminated`: does nothing.
    ///
    pub fn step(&mut self) -> Result<EtmState, EtmError> {
        match self.state {
            EtmState::Initializing => self.initialize(),
            EtmState::Evaluating {
                completed_generations,
            } => self.evaluate_generation(completed_generations + 1)?,
            EtmState::Terminated(_) => {}
        }
        Ok(self.state)
    }

    fn initialize(&mut self) {
        info!(
            "Creating {} random trees over {} activities",
            self.options.population_size,
            self.alphabet.len()
        );
        for lineage in 0..self.options.population_size {
            let tree = generate_random_tree(&self.alphabet, Arc::clone(&self.ids), &mut self.rng);
            let quality = self.quality_of(&tree);
            let mut trace = LineageTrace::new(lineage);
            trace.push(0, quality);
            self.lineage_traces.push(trace);
            if self.reaches_desired_quality(quality) {
                self.population.push(tree.clone());
                self.finish_with_winner(tree, quality, 0, lineage);
                self.push_history();
                return;
            }
            self.record_if_better(&tree, quality);
            self.population.push(tree);
        }
        self.push_history();
        self.state = if self.options.max_iterations == 0 {
            EtmState::Terminated(TerminationReason::MaxIterationsReached)
        } else {
            EtmState::Evaluating {
                completed_generations: 0,
            }
        };
    }

    fn evaluate_generation(&mut self, generation: usize) -> Result<(), EtmError> {
        debug!("Generation {}", generation);
        for lineage in 0..self.population.len() {
            let mutated = mutate(
                &self.population[lineage],
                &self.alphabet,
                &self.options.mutation_weights,
                &mut self.rng,
            )?;
            let quality = self.quality_of(&mutated);
            if let Some(trace) = self.lineage_traces.get_mut(lineage) {
                trace.push(generation, quality);
            }
            if self.reaches_desired_quality(quality) {
                self.population[lineage] = mutated.clone();
                self.finish_with_winner(mutated, quality, generation, lineage);
                self.push_history();
                return Ok(());
            }
            self.record_if_better(&mutated, quality);
            self.population[lineage] = mutated;
        }
        self.push_history();
        if let Some(best) = &self.best {
            info!(
                "Generation {} done, best quality {:.4}",
                generation, best.quality
            );
        }
        self.state = if generation >= self.options.max_iterations {
            EtmState::Terminated(TerminationReason::MaxIterationsReached)
        } else {
            EtmState::Evaluating {
                completed_generations: generation,
            }
        };
        Ok(())
    }

    fn push_history(&mut self) {
        if let Some(best) = &self.best {
            self.best_quality_history.push(best.quality);
        }
    }

    ///
    /// Runs the search until it terminates and returns the best tree with the run artifacts
    ///
    pub fn run(mut self) -> Result<EtmResult, EtmError> {
        while !matches!(self.state, EtmState::Terminated(_)) {
            self.step()?;
        }
        self.into_result()
    }

    ///
    /// Consumes a terminated miner and returns its result
    ///
    /// Fails with [`EtmError::NotTerminated`] while the search is still running.
    ///
    pub fn into_result(self) -> Result<EtmResult, EtmError> {
        let (EtmState::Terminated(termination), Some(best)) = (self.state, self.best) else {
            return Err(EtmError::NotTerminated);
        };
        let generations = match termination {
            TerminationReason::DesiredQualityReached { generation, .. } => generation,
            TerminationReason::MaxIterationsReached => self.options.max_iterations,
        };
        Ok(EtmResult {
            best_tree: best.tree,
            best_quality: best.quality,
            termination,
            generations,
            best_quality_history: self.best_quality_history,
            lineage_traces: self.lineage_traces,
        })
    }
}

///
/// Discovers a process tree for the activities of `log`, using `oracle` to rate candidates
///
pub fn discover_process_tree<O: QualityOracle + ?Sized>(
    log: &EventLog,
    oracle: &O,
    options: EtmOptions,
) -> Result<EtmResult, EtmError> {
    EvolutionaryTreeMiner::from_event_log(log, oracle, options)?.run()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::quality::oracle::QualityWeights;

    /// Rates trees by how few nodes they have beyond their leaves
    struct CompactnessOracle;

    impl QualityOracle for CompactnessOracle {
        fn fitness(&self, _tree: &ProcessTree) -> f64 {
            1.0
        }
        fn precision(&self, _tree: &ProcessTree) -> f64 {
            1.0
        }
        fn generalization(&self, _tree: &ProcessTree) -> f64 {
            1.0
        }
        fn simplicity(&self, tree: &ProcessTree) -> f64 {
            1.0 / tree.tree_size() as f64
        }
    }

    struct CountingOracle {
        value: f64,
        calls: Cell<usize>,
    }

    impl QualityOracle for CountingOracle {
        fn fitness(&self, _tree: &ProcessTree) -> f64 {
            self.calls.set(self.calls.get() + 1);
            self.value
        }
        fn precision(&self, _tree: &ProcessTree) -> f64 {
            self.value
        }
        fn generalization(&self, _tree: &ProcessTree) -> f64 {
            self.value
        }
        fn simplicity(&self, _tree: &ProcessTree) -> f64 {
            self.value
        }
    }

    fn alphabet() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    fn options(population_size: usize, max_iterations: usize, desired_quality: f64) -> EtmOptions {
        EtmOptions {
            population_size,
            max_iterations,
            desired_quality,
            seed: Some(17),
            ..Default::default()
        }
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let oracle = CompactnessOracle;
        assert!(matches!(
            EvolutionaryTreeMiner::new(Vec::new(), &oracle, EtmOptions::default()),
            Err(EtmError::EmptyAlphabet)
        ));
    }

    #[test]
    fn step_moves_through_states() {
        let oracle = CompactnessOracle;
        let mut miner =
            EvolutionaryTreeMiner::new(alphabet(), &oracle, options(3, 2, 2.0)).unwrap();
        assert_eq!(miner.state(), EtmState::Initializing);
        assert_eq!(
            miner.step().unwrap(),
            EtmState::Evaluating {
                completed_generations: 0
            }
        );
        assert_eq!(miner.population().len(), 3);
        assert_eq!(
            miner.step().unwrap(),
            EtmState::Evaluating {
                completed_generations: 1
            }
        );
        assert_eq!(
            miner.step().unwrap(),
            EtmState::Terminated(TerminationReason::MaxIterationsReached)
        );
        let terminated = miner.step().unwrap();
        assert_eq!(
            terminated,
            EtmState::Terminated(TerminationReason::MaxIterationsReached)
        );
    }

    #[test]
    fn result_only_after_termination() {
        let oracle = CompactnessOracle;
        let mut miner =
            EvolutionaryTreeMiner::new(alphabet(), &oracle, options(2, 1, 2.0)).unwrap();
        miner.step().unwrap();
        assert!(matches!(
            miner.into_result(),
            Err(EtmError::NotTerminated)
        ));

        let mut miner =
            EvolutionaryTreeMiner::new(alphabet(), &oracle, options(2, 1, 2.0)).unwrap();
        miner.step().unwrap();
        miner.step().unwrap();
        let result = miner.into_result().unwrap();
        assert_eq!(result.termination, TerminationReason::MaxIterationsReached);
        assert_eq!(result.generations, 1);
    }

    #[test]
    fn run_records_history_and_traces() {
        let oracle = CompactnessOracle;
        let miner = EvolutionaryTreeMiner::new(alphabet(), &oracle, options(4, 6, 2.0)).unwrap();
        let result = miner.run().unwrap();
        assert_eq!(
            result.termination,
            TerminationReason::MaxIterationsReached
        );
        assert_eq!(result.generations, 6);
        assert_eq!(result.best_quality_history.len(), 7);
        assert!(result
            .best_quality_history
            .windows(2)
            .all(|w| w[0] <= w[1]));
        assert_eq!(result.best_quality_history.last(), Some(&result.best_quality));
        assert_eq!(result.lineage_traces.len(), 4);
        for trace in &result.lineage_traces {
            let generations: Vec<usize> = trace.points.iter().map(|p| p.generation).collect();
            assert_eq!(generations, (0..=6).collect::<Vec<usize>>());
            let best_in_trace = trace
                .points
                .iter()
                .map(|p| p.quality)
                .fold(f64::MIN, f64::max);
            assert!(best_in_trace <= result.best_quality);
        }
        assert!(result.best_tree.is_valid());
    }

    #[test]
    fn zero_desired_quality_stops_on_first_tree() {
        let oracle = CountingOracle {
            value: 0.0,
            calls: Cell::new(0),
        };
        let result = EvolutionaryTreeMiner::new(alphabet(), &oracle, options(5, 10, 0.0))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(
            result.termination,
            TerminationReason::DesiredQualityReached {
                generation: 0,
                lineage: 0
            }
        );
        assert_eq!(oracle.calls.get(), 1);
        assert_eq!(result.generations, 0);
        assert_eq!(result.lineage_traces.len(), 1);
    }

    #[test]
    fn zero_iterations_only_scores_initial_population() {
        let oracle = CountingOracle {
            value: 0.5,
            calls: Cell::new(0),
        };
        let result = EvolutionaryTreeMiner::new(alphabet(), &oracle, options(3, 0, 1.0))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(oracle.calls.get(), 3);
        assert_eq!(result.best_quality_history, vec![0.5]);
        assert_eq!(result.best_quality, 0.5);
    }

    #[test]
    fn out_of_range_scores_do_not_fail_the_search() {
        let oracle = CountingOracle {
            value: 7.0,
            calls: Cell::new(0),
        };
        let mut opts = options(2, 2, f64::INFINITY);
        opts.quality_weights = QualityWeights::default();
        let result = EvolutionaryTreeMiner::new(alphabet(), &oracle, opts)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(result.termination, TerminationReason::MaxIterationsReached);
        assert!((result.best_quality - 7.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_gives_same_result() {
        let oracle = CompactnessOracle;
        let first = EvolutionaryTreeMiner::new(alphabet(), &oracle, options(3, 5, 2.0))
            .unwrap()
            .run()
            .unwrap();
        let second = EvolutionaryTreeMiner::new(alphabet(), &oracle, options(3, 5, 2.0))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(first.best_tree.to_string(), second.best_tree.to_string());
        assert_eq!(first.best_quality_history, second.best_quality_history);
    }

    #[test]
    fn discover_from_event_log_and_export() {
        let log = EventLog::from_activity_sequences(&[vec!["a", "b"], vec!["b", "c"]]);
        let oracle = CompactnessOracle;
        let result = discover_process_tree(&log, &oracle, options(2, 3, 2.0)).unwrap();
        let mut json = Vec::new();
        result.export_json(&mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert!(value["best_tree"]["type"].is_string());
        assert_eq!(value["generations"], 3);
        let mut csv = Vec::new();
        result.write_lineage_traces_csv(&mut csv).unwrap();
        // header + 2 lineages * 4 generations
        assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 9);
    }
}
