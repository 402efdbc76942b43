//! Entity extractor trait and fallback outcomes

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Extraction;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Recognizes entities and relations in free text
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Extract entities and relations from `text`
    async fn extract_entities(&self, text: &str) -> Result<Extraction, DomainError>;

    /// Name used in logs and metrics
    fn name(&self) -> &'static str;
}

/// Which extractor produced the final result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionTier {
    Fast,
    Precise,
}

impl ExtractionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionTier::Fast => "fast",
            ExtractionTier::Precise => "precise",
        }
    }
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the fast pass, deciding whether to escalate
#[derive(Debug, Clone, PartialEq)]
pub enum FastOutcome {
    /// Enough entities were found; the result is accepted
    Found(Extraction),
    /// The pass ran but produced too few entities
    NoEntities,
    /// The pass raised an error
    Failed(String),
    /// The fast extractor could not be constructed
    Unavailable,
}

impl FastOutcome {
    pub fn should_escalate(&self) -> bool {
        !matches!(self, FastOutcome::Found(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            FastOutcome::Found(_) => "found",
            FastOutcome::NoEntities => "no_entities",
            FastOutcome::Failed(_) => "failed",
            FastOutcome::Unavailable => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{EntityType, ExtractedEntity};

    #[test]
    fn test_fast_outcome_escalation() {
        let found = FastOutcome::Found(Extraction::new(
            vec![ExtractedEntity::new("Acme", EntityType::Org)],
            vec![],
        ));

        assert!(!found.should_escalate());
        assert!(FastOutcome::NoEntities.should_escalate());
        assert!(FastOutcome::Failed("boom".to_string()).should_escalate());
        assert!(FastOutcome::Unavailable.should_escalate());
        assert_eq!(FastOutcome::Unavailable.label(), "unavailable");
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(ExtractionTier::Fast.to_string(), "fast");
        assert_eq!(
            serde_json::to_string(&ExtractionTier::Precise).unwrap(),
            "\"precise\""
        );
    }

    #[tokio::test]
    async fn test_mock_extractor() {
        let mut mock = MockEntityExtractor::new();
        mock.expect_extract_entities()
            .times(1)
            .returning(|_| Ok(Extraction::empty()));
        mock.expect_name().return_const("mock");

        let extraction = mock.extract_entities("text").await.unwrap();
        assert!(extraction.is_empty());
        assert_eq!(mock.name(), "mock");
    }
}
