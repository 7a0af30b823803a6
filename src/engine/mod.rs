pub mod evolution;
pub mod genotype;
pub mod individual;
pub mod mapper;
pub mod operators;
pub mod progress;

pub use evolution::{Evaluation, EvolutionEngine, FitnessEvaluator, ProgressCallback};
pub use genotype::{Codon, Genotype};
pub use individual::{Individual, INVALID_FITNESS};
pub use mapper::DerivationMapper;
pub use operators::{crossover, mutate, self_adapt_rates, tournament, DepthLimitPolicy};
pub use progress::LogProgress;
