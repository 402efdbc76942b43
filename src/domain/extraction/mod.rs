//! Entity extraction domain models and traits

mod entity;
mod extractor;

pub use entity::{
    normalize_name, normalize_relation_type, EntityKey, EntityType, ExtractedEntity,
    ExtractedRelation, Extraction, SourceSpan,
};
pub use extractor::{EntityExtractor, ExtractionTier, FastOutcome};

#[cfg(test)]
pub use extractor::MockEntityExtractor;
