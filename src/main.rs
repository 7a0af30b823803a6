use anyhow::Context;
use gramevo::{
    ConfigManager, Evaluation, EvolutionEngine, FitnessEvaluator, LogProgress,
};
use std::path::Path;

/// Demo evaluator: distance between the phenotype and a fixed target string.
/// Counts per-position character mismatches plus the length difference, so an
/// exact match scores 0.
struct TargetMatch {
    target: String,
}

impl FitnessEvaluator for TargetMatch {
    fn evaluate(&mut self, phenotype: &str) -> gramevo::Result<Evaluation> {
        let mismatches = phenotype
            .chars()
            .zip(self.target.chars())
            .filter(|(a, b)| a != b)
            .count();
        let length_gap = phenotype.len().abs_diff(self.target.len());
        Ok(Evaluation {
            fitness: (mismatches + length_gap) as f64,
            info: serde_json::json!({ "length": phenotype.len() }),
        })
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gramevo.toml".to_string());
    let app = ConfigManager::load(Path::new(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;
    let grammar = app
        .grammar
        .load_grammar()
        .with_context(|| format!("loading grammar from {}", app.grammar.path))?;

    let mut evaluator = TargetMatch {
        target: "gramevo".to_string(),
    };
    let mut engine = EvolutionEngine::new(&grammar, app.evolution.clone())?;
    let population = engine.run(&mut evaluator, &mut LogProgress)?;

    let best = population
        .first()
        .context("engine returned an empty population")?;
    println!(
        "best fitness {:?} (depth {}):\n{}",
        best.fitness,
        best.tree_depth,
        best.phenotype.as_deref().unwrap_or("<unmapped>")
    );
    Ok(())
}
