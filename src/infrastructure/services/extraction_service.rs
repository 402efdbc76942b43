//! Two-tier entity extraction and knowledge graph building
//!
//! Every text goes through the fast extractor first. Only when it is
//! unavailable, fails, or finds fewer entities than required is the
//! precise extractor invoked, and its answer is final.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::extraction::{
    EntityExtractor, ExtractedEntity, ExtractedRelation, Extraction, ExtractionTier, FastOutcome,
};
use crate::domain::graph::{
    GraphEdge, GraphNode, GraphScope, GraphStore, GraphWriteSummary, Namespace, Provenance,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_extraction, record_graph_write, GraphWriteKind};

/// The fast extractor, or why it could not be built
pub enum FastTier {
    Ready(Arc<dyn EntityExtractor>),
    Unavailable { reason: String },
}

impl FastTier {
    /// Wrap the result of building the fast extractor
    ///
    /// A construction failure is logged here, once, and every later
    /// extraction escalates straight to the precise tier.
    pub fn from_result(result: Result<Arc<dyn EntityExtractor>, DomainError>) -> Self {
        match result {
            Ok(extractor) => FastTier::Ready(extractor),
            Err(e) => {
                warn!(error = %e, "Fast entity extractor unavailable, running escalated-only");
                FastTier::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FastTier::Ready(_))
    }
}

impl fmt::Debug for FastTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastTier::Ready(extractor) => f.debug_tuple("Ready").field(&extractor.name()).finish(),
            FastTier::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Full result of an extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub entities: Vec<ExtractedEntity>,
    pub relations: Vec<ExtractedRelation>,
    pub tier: ExtractionTier,
    #[serde(skip)]
    pub fast_outcome: FastOutcome,
}

/// Extraction coordinator
pub struct ExtractionService {
    fast: FastTier,
    precise: Arc<dyn EntityExtractor>,
    graph: Arc<dyn GraphStore>,
    scope: GraphScope,
    min_fast_entities: usize,
}

impl fmt::Debug for ExtractionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionService")
            .field("fast", &self.fast)
            .field("precise", &self.precise.name())
            .field("graph", &self.graph)
            .field("scope", &self.scope)
            .field("min_fast_entities", &self.min_fast_entities)
            .finish()
    }
}

impl ExtractionService {
    pub fn new(
        fast: FastTier,
        precise: Arc<dyn EntityExtractor>,
        graph: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            fast,
            precise,
            graph,
            scope: GraphScope::default(),
            min_fast_entities: 1,
        }
    }

    pub fn with_scope(mut self, scope: GraphScope) -> Self {
        self.scope = scope;
        self
    }

    /// Minimum number of fast-tier entities for its result to be accepted
    pub fn with_min_fast_entities(mut self, min: usize) -> Self {
        self.min_fast_entities = min.max(1);
        self
    }

    pub fn scope(&self) -> GraphScope {
        self.scope
    }

    pub fn fast_tier(&self) -> &FastTier {
        &self.fast
    }

    /// Deduplicated entities of `text`
    pub async fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>, DomainError> {
        Ok(self.extract_detailed(text).await?.entities)
    }

    /// Entities and relations of `text` along with the tier that produced them
    pub async fn extract_detailed(&self, text: &str) -> Result<ExtractionReport, DomainError> {
        let fast_outcome = self.run_fast(text).await;

        let (extraction, tier) = match &fast_outcome {
            FastOutcome::Found(extraction) => (extraction.clone(), ExtractionTier::Fast),
            outcome => {
                info!(
                    fast_outcome = outcome.label(),
                    precise = self.precise.name(),
                    "Escalating entity extraction"
                );
                (self.run_precise(text).await?, ExtractionTier::Precise)
            }
        };

        let (entities, relations) = extraction.into_parts();

        Ok(ExtractionReport {
            entities,
            relations,
            tier,
            fast_outcome,
        })
    }

    async fn run_fast(&self, text: &str) -> FastOutcome {
        let extractor = match &self.fast {
            FastTier::Ready(extractor) => extractor,
            FastTier::Unavailable { .. } => return FastOutcome::Unavailable,
        };

        let started = Instant::now();
        let result = extractor.extract_entities(text).await;
        record_extraction(ExtractionTier::Fast.as_str(), started.elapsed(), result.is_ok());

        match result {
            Ok(extraction) if extraction.len() >= self.min_fast_entities => {
                debug!(entities = extraction.len(), "Fast extraction accepted");
                FastOutcome::Found(extraction)
            }
            Ok(extraction) => {
                debug!(
                    entities = extraction.len(),
                    required = self.min_fast_entities,
                    "Fast extraction found too few entities"
                );
                FastOutcome::NoEntities
            }
            Err(e) => {
                warn!(extractor = extractor.name(), error = %e, "Fast extraction failed");
                FastOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_precise(&self, text: &str) -> Result<Extraction, DomainError> {
        let started = Instant::now();
        let result = self.precise.extract_entities(text).await;
        record_extraction(
            ExtractionTier::Precise.as_str(),
            started.elapsed(),
            result.is_ok(),
        );

        result.map_err(|e| {
            DomainError::extraction(format!(
                "{} extractor failed: {}",
                self.precise.name(),
                e
            ))
        })
    }

    /// Extract `text` and merge the result into the knowledge graph
    ///
    /// Returns how many nodes and edges this call newly created; a repeat
    /// call with the same input only refreshes provenance and returns zeros.
    pub async fn build_knowledge_graph(
        &self,
        text: &str,
        document_id: &str,
        user_id: &str,
    ) -> Result<GraphWriteSummary, DomainError> {
        if document_id.trim().is_empty() {
            return Err(DomainError::validation("document_id must not be empty"));
        }

        let namespace = Namespace::for_scope(self.scope, user_id, document_id)?;
        let report = self.extract_detailed(text).await?;
        let provenance = Provenance::new(document_id.trim());

        let mut summary = GraphWriteSummary::default();

        for entity in &report.entities {
            let outcome = self
                .graph
                .upsert_node(&namespace, &GraphNode::from(entity), &provenance)
                .await
                .map_err(as_graph_error)?;

            if outcome.is_created() {
                summary.nodes_created += 1;
                record_graph_write(GraphWriteKind::NodeCreated);
            } else {
                record_graph_write(GraphWriteKind::NodeExisting);
            }
        }

        for relation in &report.relations {
            let outcome = self
                .graph
                .upsert_edge(&namespace, &GraphEdge::from(relation), &provenance)
                .await
                .map_err(as_graph_error)?;

            if outcome.is_created() {
                summary.edges_created += 1;
                record_graph_write(GraphWriteKind::EdgeCreated);
            } else {
                record_graph_write(GraphWriteKind::EdgeExisting);
            }
        }

        info!(
            %namespace,
            document_id,
            tier = %report.tier,
            entities = report.entities.len(),
            relations = report.relations.len(),
            nodes_created = summary.nodes_created,
            edges_created = summary.edges_created,
            "Knowledge graph updated"
        );

        Ok(summary)
    }
}

fn as_graph_error(error: DomainError) -> DomainError {
    match error {
        DomainError::Graph { .. } => error,
        other => DomainError::graph(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{EntityKey, EntityType, MockEntityExtractor};
    use crate::domain::graph::UpsertOutcome;
    use crate::infrastructure::graph::InMemoryGraphStore;
    use async_trait::async_trait;

    fn paris_extraction() -> Extraction {
        Extraction::new(
            vec![
                ExtractedEntity::new("Paris", EntityType::Location),
                ExtractedEntity::new("paris", EntityType::Location),
                ExtractedEntity::new("Paris", EntityType::Person),
            ],
            vec![],
        )
    }

    fn acme_extraction() -> Extraction {
        let alice = ExtractedEntity::new("Alice Smith", EntityType::Person);
        let acme = ExtractedEntity::new("Acme Corp", EntityType::Org);
        let relation = ExtractedRelation::new(alice.key(), "WORKS_FOR", acme.key());
        Extraction::new(vec![alice, acme], vec![relation])
    }

    fn fast_returning(extraction: Extraction) -> MockEntityExtractor {
        let mut fast = MockEntityExtractor::new();
        fast.expect_extract_entities()
            .times(1)
            .returning(move |_| Ok(extraction.clone()));
        fast.expect_name().return_const("rule_based");
        fast
    }

    fn precise_returning(times: usize, extraction: Extraction) -> MockEntityExtractor {
        let mut precise = MockEntityExtractor::new();
        precise
            .expect_extract_entities()
            .times(times)
            .returning(move |_| Ok(extraction.clone()));
        precise.expect_name().return_const("llm");
        precise
    }

    fn service(fast: FastTier, precise: MockEntityExtractor) -> ExtractionService {
        ExtractionService::new(fast, Arc::new(precise), Arc::new(InMemoryGraphStore::new()))
    }

    fn ready(fast: MockEntityExtractor) -> FastTier {
        FastTier::Ready(Arc::new(fast))
    }

    #[tokio::test]
    async fn test_fast_result_is_accepted_without_escalation() {
        let service = service(
            ready(fast_returning(acme_extraction())),
            precise_returning(0, Extraction::empty()),
        );

        let report = service.extract_detailed("Alice Smith works for Acme Corp.").await.unwrap();

        assert_eq!(report.tier, ExtractionTier::Fast);
        assert_eq!(report.entities.len(), 2);
        assert_eq!(report.relations.len(), 1);
        assert!(!report.fast_outcome.should_escalate());
    }

    #[tokio::test]
    async fn test_empty_fast_result_escalates_once() {
        let service = service(
            ready(fast_returning(Extraction::empty())),
            precise_returning(1, acme_extraction()),
        );

        let report = service.extract_detailed("alice works for acme").await.unwrap();

        assert_eq!(report.tier, ExtractionTier::Precise);
        assert_eq!(report.fast_outcome, FastOutcome::NoEntities);
        assert_eq!(report.entities.len(), 2);
    }

    #[tokio::test]
    async fn test_fast_failure_escalates() {
        let mut fast = MockEntityExtractor::new();
        fast.expect_extract_entities()
            .times(1)
            .returning(|_| Err(DomainError::internal("tokenizer crashed")));
        fast.expect_name().return_const("rule_based");

        let service = service(ready(fast), precise_returning(1, acme_extraction()));
        let report = service.extract_detailed("text").await.unwrap();

        assert_eq!(report.tier, ExtractionTier::Precise);
        assert!(matches!(report.fast_outcome, FastOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_unavailable_fast_tier_always_escalates() {
        let fast = FastTier::from_result(Err(DomainError::configuration("no resources for 'xx'")));
        assert!(!fast.is_available());

        let service = service(fast, precise_returning(2, acme_extraction()));

        let first = service.extract_detailed("one").await.unwrap();
        let second = service.extract("two").await.unwrap();

        assert_eq!(first.fast_outcome, FastOutcome::Unavailable);
        assert_eq!(first.tier, ExtractionTier::Precise);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_precise_failure_is_extraction_error() {
        let mut precise = MockEntityExtractor::new();
        precise
            .expect_extract_entities()
            .times(1)
            .returning(|_| Err(DomainError::provider("ollama", "connection refused")));
        precise.expect_name().return_const("llm");

        let service = service(ready(fast_returning(Extraction::empty())), precise);
        let result = service.extract("text").await;

        assert!(matches!(result, Err(DomainError::Extraction { .. })));
    }

    #[tokio::test]
    async fn test_precise_empty_result_is_final() {
        let service = service(
            ready(fast_returning(Extraction::empty())),
            precise_returning(1, Extraction::empty()),
        );

        let entities = service.extract("nothing here").await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn test_min_fast_entities_raises_acceptance_bar() {
        let one = Extraction::new(vec![ExtractedEntity::new("Paris", EntityType::Location)], vec![]);

        let service = service(
            ready(fast_returning(one)),
            precise_returning(1, acme_extraction()),
        )
        .with_min_fast_entities(2);

        let report = service.extract_detailed("Paris").await.unwrap();
        assert_eq!(report.tier, ExtractionTier::Precise);
        assert_eq!(report.fast_outcome, FastOutcome::NoEntities);
    }

    #[tokio::test]
    async fn test_duplicate_entities_merge_into_two_nodes() {
        let service = service(
            ready(fast_returning(paris_extraction())),
            precise_returning(0, Extraction::empty()),
        );

        let summary = service
            .build_knowledge_graph("Paris, paris and Paris.", "doc-1", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.as_tuple(), (2, 0));
    }

    #[tokio::test]
    async fn test_repeat_build_creates_nothing() {
        let mut fast = MockEntityExtractor::new();
        fast.expect_extract_entities()
            .times(2)
            .returning(|_| Ok(acme_extraction()));
        fast.expect_name().return_const("rule_based");

        let graph = Arc::new(InMemoryGraphStore::new());
        let service = ExtractionService::new(
            ready(fast),
            Arc::new(precise_returning(0, Extraction::empty())),
            graph.clone(),
        );

        let text = "Alice Smith works for Acme Corp.";
        let first = service.build_knowledge_graph(text, "doc-1", "user-1").await.unwrap();
        let second = service.build_knowledge_graph(text, "doc-1", "user-1").await.unwrap();

        assert_eq!(first.as_tuple(), (2, 1));
        assert_eq!(second.as_tuple(), (0, 0));

        let namespace = Namespace::for_scope(GraphScope::User, "user-1", "doc-1").unwrap();
        assert_eq!(graph.node_count(&namespace), 2);
        assert_eq!(graph.edge_count(&namespace), 1);
    }

    #[tokio::test]
    async fn test_document_scope_separates_documents() {
        let mut fast = MockEntityExtractor::new();
        fast.expect_extract_entities()
            .times(2)
            .returning(|_| Ok(acme_extraction()));
        fast.expect_name().return_const("rule_based");

        let service = service(ready(fast), precise_returning(0, Extraction::empty()))
            .with_scope(GraphScope::Document);

        let text = "Alice Smith works for Acme Corp.";
        let first = service.build_knowledge_graph(text, "doc-1", "user-1").await.unwrap();
        let second = service.build_knowledge_graph(text, "doc-2", "user-1").await.unwrap();

        assert_eq!(first.as_tuple(), (2, 1));
        assert_eq!(second.as_tuple(), (2, 1));
    }

    #[tokio::test]
    async fn test_empty_ids_are_rejected() {
        let service = service(
            ready(MockEntityExtractor::new()),
            precise_returning(0, Extraction::empty()),
        );

        let result = service.build_knowledge_graph("text", " ", "user-1").await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let result = service.build_knowledge_graph("text", "doc-1", "").await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[derive(Debug)]
    struct BrokenGraphStore;

    #[async_trait]
    impl GraphStore for BrokenGraphStore {
        async fn upsert_node(
            &self,
            _namespace: &Namespace,
            _node: &GraphNode,
            _provenance: &Provenance,
        ) -> Result<UpsertOutcome, DomainError> {
            Err(DomainError::storage("connection reset"))
        }

        async fn upsert_edge(
            &self,
            _namespace: &Namespace,
            _edge: &GraphEdge,
            _provenance: &Provenance,
        ) -> Result<UpsertOutcome, DomainError> {
            Err(DomainError::storage("connection reset"))
        }

        async fn ping(&self) -> Result<(), DomainError> {
            Err(DomainError::storage("connection reset"))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_graph_write_failure_is_graph_error() {
        let service = ExtractionService::new(
            ready(fast_returning(acme_extraction())),
            Arc::new(precise_returning(0, Extraction::empty())),
            Arc::new(BrokenGraphStore),
        );

        let result = service
            .build_knowledge_graph("Alice Smith works for Acme Corp.", "doc-1", "user-1")
            .await;

        assert!(matches!(result, Err(DomainError::Graph { .. })));
    }

    #[test]
    fn test_paris_keys_are_distinct_by_type() {
        let extraction = paris_extraction();
        let keys: Vec<EntityKey> = extraction.entities().iter().map(|e| e.key()).collect();

        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }
}
