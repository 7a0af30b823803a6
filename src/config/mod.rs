pub mod evolution;
pub mod grammar;
pub mod manager;
pub mod traits;

pub use evolution::EvolutionConfig;
pub use grammar::GrammarConfig;
pub use manager::{AppConfig, ConfigManager};
pub use traits::ConfigSection;
