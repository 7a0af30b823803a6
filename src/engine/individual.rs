use crate::engine::genotype::Genotype;
use crate::error::Result;
use crate::grammar::Grammar;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sentinel fitness for individuals the evaluator could not score.
/// Lower is better everywhere, so this sorts last.
pub const INVALID_FITNESS: f64 = f64::INFINITY;

/// One member of the population.
///
/// `fitness == None` marks the individual as needing evaluation; every
/// operator that touches genotype content clears it. `mapping_values` records
/// how many codons of each chromosome the most recent mapping consumed, which
/// is what restricts mutation to positions that actually influenced the
/// phenotype. `other_info` is an opaque payload from the external evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub genotype: Genotype,
    pub fitness: Option<f64>,
    pub phenotype: Option<String>,
    pub tree_depth: usize,
    pub mapping_values: Vec<usize>,
    pub other_info: serde_json::Value,
    /// Per-chromosome mutation rates, present only when meta-mutation is
    /// enabled. Inherited through crossover and self-adapted by Gaussian
    /// perturbation before each mutation.
    pub mutation_rates: Option<Vec<f64>>,
}

impl Individual {
    /// Fresh random individual; all chromosomes fully populated by the
    /// depth-bounded creation routine, fitness pending.
    pub fn random<R: Rng>(grammar: &Grammar, max_init_depth: usize, rng: &mut R) -> Result<Self> {
        let (genotype, tree_depth) = Genotype::random(grammar, max_init_depth, rng)?;
        Ok(Self {
            mapping_values: vec![0; genotype.len()],
            genotype,
            fitness: None,
            phenotype: None,
            tree_depth,
            other_info: serde_json::Value::Null,
            mutation_rates: None,
        })
    }

    pub fn needs_evaluation(&self) -> bool {
        self.fitness.is_none()
    }

    /// Fitness for ranking purposes; unevaluated individuals sort last.
    pub fn fitness_or_invalid(&self) -> f64 {
        self.fitness.unwrap_or(INVALID_FITNESS)
    }

    /// Marks the genotype as changed: fitness and phenotype are stale.
    pub fn clear_fitness(&mut self) {
        self.fitness = None;
        self.phenotype = None;
    }
}
