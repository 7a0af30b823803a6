//! Structured grammatical evolution.
//!
//! Populations of integer-vector genotypes are deterministically decoded
//! through a context-free grammar into program-text phenotypes, scored by an
//! external fitness function, and selected/recombined/mutated across
//! generations. The encoding is structured: each grammar non-terminal owns
//! one growable codon chromosome, and a depth-bounded mapper grows
//! chromosomes lazily instead of wrapping a flat genome.

pub mod config;
pub mod engine;
pub mod error;
pub mod grammar;

pub use config::{AppConfig, ConfigManager, EvolutionConfig, GrammarConfig};
pub use engine::{
    DepthLimitPolicy, DerivationMapper, Evaluation, EvolutionEngine, FitnessEvaluator, Genotype,
    Individual, LogProgress, ProgressCallback, INVALID_FITNESS,
};
pub use error::{GramevoError, Result};
pub use grammar::Grammar;
