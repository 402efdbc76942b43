//! Entity extractor implementations

mod llm_extractor;
mod resources;
mod rule_based;

pub use llm_extractor::LlmEntityExtractor;
pub use resources::LanguageResources;
pub use rule_based::{RuleBasedExtractor, MENTIONED_WITH};
