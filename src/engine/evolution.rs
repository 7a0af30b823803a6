use crate::config::traits::ConfigSection;
use crate::config::EvolutionConfig;
use crate::engine::individual::{Individual, INVALID_FITNESS};
use crate::engine::mapper::DerivationMapper;
use crate::engine::operators::{crossover, mutate, self_adapt_rates, tournament};
use crate::error::{GramevoError, Result};
use crate::grammar::Grammar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What the external evaluator returns for one phenotype: a scalar to
/// minimize plus an opaque structured payload kept on the individual.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub fitness: f64,
    pub info: serde_json::Value,
}

impl Evaluation {
    pub fn new(fitness: f64) -> Self {
        Self {
            fitness,
            info: serde_json::Value::Null,
        }
    }
}

/// External fitness contract. Lower fitness is better. Implementations that
/// can score a whole generation at once override `evaluate_batch`; a batch
/// result of the wrong length makes the engine fall back to `evaluate` for
/// that generation rather than abort.
pub trait FitnessEvaluator {
    fn evaluate(&mut self, phenotype: &str) -> Result<Evaluation>;

    /// `None` means batching is unsupported.
    fn evaluate_batch(&mut self, _phenotypes: &[String]) -> Option<Result<Vec<Evaluation>>> {
        None
    }
}

/// Hooks for external progress reporting and snapshot logging. The ranked
/// population handed to `on_generation_complete` is the per-generation
/// snapshot; the engine defines no artifact schema of its own.
pub trait ProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _generation: usize, _population: &[Individual]) {}
    fn on_individual_evaluated(&mut self, _evaluated: usize, _total: usize) {}
}

/// Generational evolutionary engine over a shared read-only grammar.
///
/// Single-threaded and synchronous: the only blocking point is the external
/// evaluator. All randomness flows through one seeded `StdRng`, so a run is
/// reproducible given the same seed, grammar, and evaluator.
pub struct EvolutionEngine<'a> {
    grammar: &'a Grammar,
    config: EvolutionConfig,
    rng: StdRng,
}

impl<'a> EvolutionEngine<'a> {
    /// Validates the configuration and seeds the RNG. A missing seed is
    /// derived from the clock's sub-second microseconds and logged so the
    /// run can still be replayed.
    pub fn new(grammar: &'a Grammar, config: EvolutionConfig) -> Result<Self> {
        config.validate()?;
        let seed = config
            .seed
            .unwrap_or_else(|| u64::from(chrono::Utc::now().timestamp_subsec_micros()));
        log::info!("evolution rng seed: {seed}");
        Ok(Self {
            grammar,
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Runs the full generational loop and returns the final population,
    /// ranked best-first.
    pub fn run<E, C>(&mut self, evaluator: &mut E, callback: &mut C) -> Result<Vec<Individual>>
    where
        E: FitnessEvaluator,
        C: ProgressCallback,
    {
        let mut population = self.initial_population()?;

        for generation in 0..self.config.generations {
            callback.on_generation_start(generation);
            self.evaluate_population(&mut population, evaluator, callback)?;
            rank(&mut population);
            callback.on_generation_complete(generation, &population);

            if generation + 1 < self.config.generations {
                population = self.reproduce(&population)?;
            }
        }

        Ok(population)
    }

    fn initial_population(&mut self) -> Result<Vec<Individual>> {
        (0..self.config.population_size)
            .map(|_| {
                let mut individual =
                    Individual::random(self.grammar, self.config.max_init_depth, &mut self.rng)?;
                if self.config.meta_mutation {
                    individual.mutation_rates =
                        Some(vec![self.config.prob_mutation; individual.genotype.len()]);
                }
                Ok(individual)
            })
            .collect()
    }

    /// Maps and scores every individual with pending fitness. Carried-over
    /// elites keep their fitness and are never re-evaluated. A failed batch
    /// degrades to sequential evaluation; a failed single evaluation marks
    /// that individual with the invalid sentinel instead of aborting.
    fn evaluate_population<E, C>(
        &mut self,
        population: &mut [Individual],
        evaluator: &mut E,
        callback: &mut C,
    ) -> Result<()>
    where
        E: FitnessEvaluator,
        C: ProgressCallback,
    {
        let mapper = DerivationMapper::new(self.grammar, self.config.max_tree_depth);

        let mut pending = Vec::new();
        for (index, individual) in population.iter_mut().enumerate() {
            if !individual.needs_evaluation() {
                continue;
            }
            let mut cursors = vec![0; individual.genotype.len()];
            let (phenotype, tree_depth) =
                mapper.map(&mut individual.genotype, &mut cursors, &mut self.rng)?;
            individual.phenotype = Some(phenotype);
            individual.tree_depth = tree_depth;
            individual.mapping_values = cursors;
            pending.push(index);
        }
        if pending.is_empty() {
            return Ok(());
        }

        let phenotypes: Vec<String> = pending
            .iter()
            .map(|&index| population[index].phenotype.clone().unwrap_or_default())
            .collect();

        if let Some(batch) = evaluator.evaluate_batch(&phenotypes) {
            match batch {
                Ok(results) if results.len() == pending.len() => {
                    for (n, (&index, result)) in pending.iter().zip(results).enumerate() {
                        population[index].fitness = Some(result.fitness);
                        population[index].other_info = result.info;
                        callback.on_individual_evaluated(n + 1, pending.len());
                    }
                    return Ok(());
                }
                Ok(results) => {
                    let mismatch = GramevoError::BatchFormat {
                        expected: pending.len(),
                        actual: results.len(),
                    };
                    log::warn!("{mismatch}; falling back to sequential evaluation");
                }
                Err(error) => {
                    log::warn!("batch evaluation failed: {error}; falling back to sequential");
                }
            }
        }

        for (n, (&index, phenotype)) in pending.iter().zip(&phenotypes).enumerate() {
            match evaluator.evaluate(phenotype) {
                Ok(result) => {
                    population[index].fitness = Some(result.fitness);
                    population[index].other_info = result.info;
                }
                Err(error) => {
                    log::warn!("evaluation failed for individual {index}: {error}");
                    population[index].fitness = Some(INVALID_FITNESS);
                    population[index].other_info = serde_json::Value::Null;
                }
            }
            callback.on_individual_evaluated(n + 1, pending.len());
        }
        Ok(())
    }

    /// Elites pass through unchanged; the rest of the next generation comes
    /// from tournament-selected parents, crossed over with probability
    /// `prob_crossover` or cloned otherwise, then mutated.
    fn reproduce(&mut self, population: &[Individual]) -> Result<Vec<Individual>> {
        let mapper = DerivationMapper::new(self.grammar, self.config.max_tree_depth);
        let mut next: Vec<Individual> = population
            .iter()
            .take(self.config.elitism)
            .cloned()
            .collect();

        while next.len() < self.config.population_size {
            let mut offspring = if self.rng.gen::<f64>() < self.config.prob_crossover {
                let first = tournament(population, self.config.tournament_size, &mut self.rng)?;
                let second = tournament(population, self.config.tournament_size, &mut self.rng)?;
                crossover(&first, &second, &mapper, &mut self.rng)?
            } else {
                tournament(population, self.config.tournament_size, &mut self.rng)?
            };

            if self.config.meta_mutation {
                if offspring.mutation_rates.is_none() {
                    offspring.mutation_rates =
                        Some(vec![self.config.prob_mutation; offspring.genotype.len()]);
                }
                self_adapt_rates(&mut offspring, self.config.meta_mutation_sigma, &mut self.rng);
            }
            mutate(
                &mut offspring,
                self.config.prob_mutation,
                self.grammar,
                self.config.max_tree_depth,
                self.config.depth_limit_policy,
                &mut self.rng,
            );
            next.push(offspring);
        }
        Ok(next)
    }
}

/// Stable ascending sort by fitness; minimization, unevaluated last.
fn rank(population: &mut [Individual]) {
    population.sort_by(|a, b| {
        a.fitness_or_invalid()
            .partial_cmp(&b.fitness_or_invalid())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::operators::DepthLimitPolicy;

    fn grammar() -> Grammar {
        Grammar::parse(
            "<string> ::= <char><string> | <char>\n<char> ::= a | b",
            false,
        )
        .unwrap()
    }

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 12,
            generations: 4,
            elitism: 2,
            prob_crossover: 0.9,
            prob_mutation: 0.2,
            tournament_size: 3,
            seed: Some(2024),
            max_init_depth: 4,
            max_tree_depth: 8,
            depth_limit_policy: DepthLimitPolicy::NonRecursive,
            meta_mutation: false,
            meta_mutation_sigma: 0.05,
        }
    }

    /// Minimizes the distance to a run of five 'a's.
    struct CountA;

    impl FitnessEvaluator for CountA {
        fn evaluate(&mut self, phenotype: &str) -> Result<Evaluation> {
            let a = phenotype.chars().filter(|c| *c == 'a').count() as f64;
            Ok(Evaluation::new((5.0 - a).abs() + phenotype.len() as f64 * 0.01))
        }
    }

    struct Noop;
    impl ProgressCallback for Noop {}

    #[test]
    fn seeded_runs_are_reproducible() {
        let grammar = grammar();
        let first = EvolutionEngine::new(&grammar, config())
            .unwrap()
            .run(&mut CountA, &mut Noop)
            .unwrap();
        let second = EvolutionEngine::new(&grammar, config())
            .unwrap()
            .run(&mut CountA, &mut Noop)
            .unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.fitness, b.fitness);
            assert_eq!(a.phenotype, b.phenotype);
            assert_eq!(a.genotype, b.genotype);
        }
    }

    #[test]
    fn final_population_is_ranked_and_evaluated() {
        let grammar = grammar();
        let population = EvolutionEngine::new(&grammar, config())
            .unwrap()
            .run(&mut CountA, &mut Noop)
            .unwrap();

        assert_eq!(population.len(), 12);
        let mut previous = f64::NEG_INFINITY;
        for individual in &population {
            let fitness = individual.fitness.expect("individual left unevaluated");
            assert!(fitness >= previous);
            previous = fitness;
        }
    }

    #[test]
    fn evaluator_errors_become_invalid_sentinels() {
        struct AlwaysFails;
        impl FitnessEvaluator for AlwaysFails {
            fn evaluate(&mut self, _phenotype: &str) -> Result<Evaluation> {
                Err(GramevoError::Evaluation("simulator crashed".to_string()))
            }
        }

        let grammar = grammar();
        let population = EvolutionEngine::new(&grammar, config())
            .unwrap()
            .run(&mut AlwaysFails, &mut Noop)
            .unwrap();
        for individual in &population {
            assert_eq!(individual.fitness, Some(INVALID_FITNESS));
        }
    }

    #[test]
    fn meta_mutation_populates_and_adapts_rate_vectors() {
        let grammar = grammar();
        let mut cfg = config();
        cfg.meta_mutation = true;
        let population = EvolutionEngine::new(&grammar, cfg)
            .unwrap()
            .run(&mut CountA, &mut Noop)
            .unwrap();
        for individual in &population {
            let rates = individual
                .mutation_rates
                .as_ref()
                .expect("meta-mutation rates missing");
            assert_eq!(rates.len(), grammar.non_terminal_count());
        }
    }
}
