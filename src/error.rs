use thiserror::Error;

#[derive(Error, Debug)]
pub enum GramevoError {
    #[error("Grammar format error: {0}")]
    GrammarFormat(String),

    #[error("non-terminal {0} cannot terminate: no non-recursive alternative at the depth limit")]
    UnreachableTermination(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Batch result shape mismatch: expected {expected} results, got {actual}")]
    BatchFormat { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GramevoError>;
