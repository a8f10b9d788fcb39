use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::miner::EtmError;
use crate::mutation::mutate::MutationWeights;
use crate::quality::oracle::QualityWeights;

///
/// Options of the [`EvolutionaryTreeMiner`](super::miner::EvolutionaryTreeMiner)
///
/// All fields are optional when deserializing; missing fields take their default value.
///
/// ```
/// use evolutionary_tree_miner::etm::options::EtmOptions;
///
/// let options: EtmOptions =
///     serde_json::from_str(r#"{"population_size": 4, "seed": 7}"#).unwrap();
/// assert_eq!(options.population_size, 4);
/// assert_eq!(options.max_iterations, 50);
/// assert!(options.validate().is_ok());
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EtmOptions {
    /// Number of lineages evolved in parallel
    pub population_size: usize,
    /// Number of mutation rounds after initialization
    pub max_iterations: usize,
    /// Quality at which the search stops early
    pub desired_quality: f64,
    /// Weights of the quality dimensions
    pub quality_weights: QualityWeights,
    /// Probabilities of the mutation operators
    pub mutation_weights: MutationWeights,
    /// Seed of the random number generator (a random seed is used if absent)
    pub seed: Option<u64>,
}

impl Default for EtmOptions {
    fn default() -> Self {
        Self {
            population_size: 10,
            max_iterations: 50,
            desired_quality: 1.0,
            quality_weights: QualityWeights::default(),
            mutation_weights: MutationWeights::default(),
            seed: None,
        }
    }
}

impl EtmOptions {
    ///
    /// Checks the options
    ///
    /// The population must not be empty, the desired quality must be a number and the mutation
    /// weights must be valid (see [`MutationWeights::validate`]).
    ///
    pub fn validate(&self) -> Result<(), EtmError> {
        if self.population_size == 0 {
            return Err(EtmError::InvalidOptions(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.desired_quality.is_nan() {
            return Err(EtmError::InvalidOptions(
                "desired_quality must be a number".to_string(),
            ));
        }
        self.mutation_weights.validate()?;
        Ok(())
    }

    /// Read options from a JSON file
    pub fn import_json_from_path<P: AsRef<Path>>(path: P) -> Result<Self, EtmError> {
        let reader = BufReader::new(File::open(path)?);
        let options: EtmOptions = serde_json::from_reader(reader)?;
        options.validate()?;
        Ok(options)
    }
}
