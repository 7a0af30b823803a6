use super::traits::ConfigSection;
use crate::engine::operators::DepthLimitPolicy;
use crate::error::{GramevoError, Result};
use serde::{Deserialize, Serialize};

/// Flat parameter surface for the evolutionary engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Number of top-ranked individuals carried unchanged into the next
    /// generation (and never re-evaluated).
    pub elitism: usize,
    pub prob_crossover: f64,
    pub prob_mutation: f64,
    pub tournament_size: usize,
    /// `None` derives a seed from the clock; the engine logs whichever seed
    /// it ends up using.
    pub seed: Option<u64>,
    /// Depth bound for random individual creation.
    pub max_init_depth: usize,
    /// Depth bound for mapping; past it, derivations are forced onto
    /// non-recursive alternatives.
    pub max_tree_depth: usize,
    pub depth_limit_policy: DepthLimitPolicy,
    /// Per-chromosome self-adaptive mutation rates.
    pub meta_mutation: bool,
    /// Stddev of the Gaussian perturbation applied to self-adapted rates.
    pub meta_mutation_sigma: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 50,
            elitism: 10,
            prob_crossover: 0.9,
            prob_mutation: 0.1,
            tournament_size: 3,
            seed: None,
            max_init_depth: 6,
            max_tree_depth: 17,
            depth_limit_policy: DepthLimitPolicy::default(),
            meta_mutation: false,
            meta_mutation_sigma: 0.05,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(GramevoError::Configuration(
                "population size must be positive".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(GramevoError::Configuration(
                "generation count must be positive".to_string(),
            ));
        }
        if self.elitism > self.population_size {
            return Err(GramevoError::Configuration(format!(
                "elitism {} exceeds population size {}",
                self.elitism, self.population_size
            )));
        }
        if !(0.0..=1.0).contains(&self.prob_crossover) {
            return Err(GramevoError::Configuration(
                "crossover probability must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.prob_mutation) {
            return Err(GramevoError::Configuration(
                "mutation probability must be within [0, 1]".to_string(),
            ));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(GramevoError::Configuration(format!(
                "tournament size {} invalid for population of {}",
                self.tournament_size, self.population_size
            )));
        }
        if self.max_init_depth > self.max_tree_depth {
            return Err(GramevoError::Configuration(format!(
                "max_init_depth {} exceeds max_tree_depth {}",
                self.max_init_depth, self.max_tree_depth
            )));
        }
        if self.meta_mutation && self.meta_mutation_sigma <= 0.0 {
            return Err(GramevoError::Configuration(
                "meta-mutation sigma must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = EvolutionConfig::default();
        config.prob_mutation = 1.5;
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.elitism = config.population_size + 1;
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.tournament_size = 0;
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.max_init_depth = config.max_tree_depth + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_names_deserialize_from_snake_case() {
        let config: EvolutionConfig =
            toml::from_str("depth_limit_policy = \"shortest_path\"").unwrap();
        assert_eq!(config.depth_limit_policy, DepthLimitPolicy::ShortestPath);
    }
}
