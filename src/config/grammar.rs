use super::traits::ConfigSection;
use crate::error::{GramevoError, Result};
use crate::grammar::Grammar;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the grammar comes from and how its output is post-processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub path: String,
    /// Overrides the `.pybnf`-extension heuristic for the indentation
    /// formatter when set.
    pub indent_aware: Option<bool>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            path: "grammars/letters.bnf".to_string(),
            indent_aware: None,
        }
    }
}

impl GrammarConfig {
    /// Loads and parses the configured grammar file.
    pub fn load_grammar(&self) -> Result<Grammar> {
        match self.indent_aware {
            None => Grammar::load(Path::new(&self.path)),
            Some(indent_aware) => {
                let source = std::fs::read_to_string(&self.path)?;
                Grammar::parse(&source, indent_aware)
            }
        }
    }
}

impl ConfigSection for GrammarConfig {
    fn section_name() -> &'static str {
        "grammar"
    }

    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(GramevoError::Configuration(
                "grammar path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
