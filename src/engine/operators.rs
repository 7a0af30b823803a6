use crate::engine::genotype::Genotype;
use crate::engine::individual::Individual;
use crate::engine::mapper::DerivationMapper;
use crate::error::{GramevoError, Result};
use crate::grammar::Grammar;
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Probability that a chromosome is inherited from the first parent.
pub const CROSSOVER_MIX: f64 = 0.5;

/// Bounds for self-adapted per-chromosome mutation rates.
pub const META_RATE_MIN: f64 = 0.001;
pub const META_RATE_MAX: f64 = 0.5;

/// What mutation draws from when the parent's derivation already sits at or
/// beyond the grammar's depth limit. Observed across versions of the original
/// system; kept as a configuration choice rather than collapsed to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthLimitPolicy {
    /// Draw from the non-terminal's non-recursive alternatives, falling back
    /// to all alternatives when that set is empty.
    #[default]
    NonRecursive,
    /// Draw from all alternatives except the current codon value, keeping the
    /// guaranteed-change property even at the limit.
    ExcludeCurrent,
    /// Draw from the alternatives with the minimal termination depth.
    ShortestPath,
}

/// Tournament selection: `tournament_size` distinct individuals drawn without
/// replacement; the minimal-fitness member wins, first encountered on ties.
pub fn tournament<R: Rng>(
    population: &[Individual],
    tournament_size: usize,
    rng: &mut R,
) -> Result<Individual> {
    if tournament_size == 0 || tournament_size > population.len() {
        return Err(GramevoError::Configuration(format!(
            "tournament size {tournament_size} invalid for population of {}",
            population.len()
        )));
    }

    let mut winner: Option<&Individual> = None;
    for index in sample(rng, population.len(), tournament_size) {
        let candidate = &population[index];
        let better = winner
            .map(|w| candidate.fitness_or_invalid() < w.fitness_or_invalid())
            .unwrap_or(true);
        if better {
            winner = Some(candidate);
        }
    }
    winner.cloned().ok_or_else(|| {
        GramevoError::Configuration("empty tournament pool".to_string())
    })
}

/// Chromosome-wise crossover: each chromosome index is copied whole from one
/// parent, chosen by an independent coin flip, preserving per-non-terminal
/// locality. The child is re-mapped from fresh cursors for its tree depth
/// (which may lazily grow some chromosomes) and left unevaluated.
pub fn crossover<R: Rng>(
    first: &Individual,
    second: &Individual,
    mapper: &DerivationMapper<'_>,
    rng: &mut R,
) -> Result<Individual> {
    let n = first.genotype.len();
    let mut chromosomes = Vec::with_capacity(n);
    let inherit_rates = first.mutation_rates.is_some() && second.mutation_rates.is_some();
    let mut rates = inherit_rates.then(|| Vec::with_capacity(n));

    for index in 0..n {
        let parent = if rng.gen::<f64>() < CROSSOVER_MIX {
            first
        } else {
            second
        };
        chromosomes.push(parent.genotype.chromosome(index).to_vec());
        if let (Some(rates), Some(parent_rates)) = (rates.as_mut(), parent.mutation_rates.as_ref())
        {
            rates.push(parent_rates[index]);
        }
    }

    let mut genotype = Genotype::from_chromosomes(chromosomes);
    let mut cursors = vec![0; n];
    let (_, tree_depth) = mapper.map(&mut genotype, &mut cursors, rng)?;

    Ok(Individual {
        genotype,
        fitness: None,
        phenotype: None,
        tree_depth,
        mapping_values: cursors,
        other_info: serde_json::Value::Null,
        mutation_rates: rates,
    })
}

/// Position-wise mutation over the codons consumed by the parent's last
/// mapping. Only non-terminals with more than one alternative are eligible.
/// Below the depth limit a replacement always differs from the current value;
/// at or beyond the limit the replacement set follows `policy`. Clears the
/// individual's fitness.
pub fn mutate<R: Rng>(
    individual: &mut Individual,
    rate: f64,
    grammar: &Grammar,
    max_depth: usize,
    policy: DepthLimitPolicy,
    rng: &mut R,
) {
    individual.clear_fitness();
    let at_limit = individual.tree_depth >= max_depth;

    for index in 0..grammar.non_terminal_count() {
        if grammar.alternative_count(index) <= 1 {
            continue;
        }
        let consumed = individual
            .mapping_values
            .get(index)
            .copied()
            .unwrap_or(0)
            .min(individual.genotype.chromosome(index).len());
        if consumed == 0 {
            continue;
        }
        let rate = individual
            .mutation_rates
            .as_ref()
            .and_then(|rates| rates.get(index))
            .copied()
            .unwrap_or(rate);

        for position in 0..consumed {
            if rng.gen::<f64>() >= rate {
                continue;
            }
            let current = individual.genotype.chromosome(index)[position];
            let choices = replacement_choices(grammar, index, current, at_limit, policy);
            let replacement = choices[rng.gen_range(0..choices.len())];
            individual.genotype.set_codon(index, position, replacement);
        }
    }
}

/// Never empty for an eligible non-terminal: restricted sets fall back to the
/// full alternative range.
fn replacement_choices(
    grammar: &Grammar,
    index: usize,
    current: usize,
    at_limit: bool,
    policy: DepthLimitPolicy,
) -> Vec<usize> {
    let all = || (0..grammar.alternative_count(index)).collect::<Vec<_>>();
    let exclude_current = || {
        (0..grammar.alternative_count(index))
            .filter(|choice| *choice != current)
            .collect::<Vec<_>>()
    };

    let choices = if at_limit {
        match policy {
            DepthLimitPolicy::NonRecursive => grammar.non_recursive_alternatives(index).to_vec(),
            DepthLimitPolicy::ExcludeCurrent => exclude_current(),
            DepthLimitPolicy::ShortestPath => grammar.shortest_alternatives(index).to_vec(),
        }
    } else {
        exclude_current()
    };

    if choices.is_empty() {
        all()
    } else {
        choices
    }
}

/// Meta-mutation stage: perturbs each per-chromosome rate with Gaussian noise
/// before it is used, clamped to a sane range. No-op for individuals without
/// a rate vector.
pub fn self_adapt_rates<R: Rng>(individual: &mut Individual, sigma: f64, rng: &mut R) {
    let Some(rates) = individual.mutation_rates.as_mut() else {
        return;
    };
    let Ok(noise) = Normal::new(0.0, sigma) else {
        log::warn!("invalid meta-mutation sigma {sigma}; rates left unchanged");
        return;
    };
    for rate in rates.iter_mut() {
        *rate = (*rate + noise.sample(rng)).clamp(META_RATE_MIN, META_RATE_MAX);
    }
}
