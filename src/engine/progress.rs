use crate::engine::evolution::ProgressCallback;
use crate::engine::individual::{Individual, INVALID_FITNESS};

/// Default progress reporter: per-generation best/mean/std fitness through
/// the `log` facade. Applications wanting persistence implement their own
/// `ProgressCallback` over the population snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_generation_complete(&mut self, generation: usize, population: &[Individual]) {
        let fitnesses: Vec<f64> = population
            .iter()
            .map(Individual::fitness_or_invalid)
            .filter(|f| f.is_finite())
            .collect();
        if fitnesses.is_empty() {
            log::info!("generation {generation}: no valid fitness in population");
            return;
        }

        let best = fitnesses[0];
        let mean = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;
        let std = (fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>()
            / fitnesses.len() as f64)
            .sqrt();
        let invalid = population
            .iter()
            .filter(|i| i.fitness_or_invalid() == INVALID_FITNESS)
            .count();

        log::info!(
            "generation {generation}: best {best:.6}, mean {mean:.6}, std {std:.6}, invalid {invalid}"
        );
        if let Some(champion) = population.first() {
            log::debug!(
                "generation {generation} champion (depth {}): {:?}",
                champion.tree_depth,
                champion.phenotype.as_deref().unwrap_or("")
            );
        }
    }

    fn on_individual_evaluated(&mut self, evaluated: usize, total: usize) {
        if evaluated % 50 == 0 || evaluated == total {
            log::debug!("evaluated {evaluated}/{total} individuals");
        }
    }
}
