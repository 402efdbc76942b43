//! LLM-based entity extraction
//!
//! The text is sent to the model with a prompt describing the entity types
//! and the JSON output schema. The answer is parsed leniently: markdown
//! fences are stripped, trailing commas tolerated and unknown entity types
//! mapped to MISC. Output that still cannot be parsed yields an empty
//! extraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::domain::extraction::{
    normalize_name, EntityExtractor, EntityKey, EntityType, ExtractedEntity, ExtractedRelation,
    Extraction,
};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::DomainError;

/// Raw JSON structures for LLM response parsing
mod raw {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct RawEntity {
        pub name: Option<String>,
        #[serde(alias = "type", alias = "entityType", alias = "label")]
        pub entity_type: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawRelation {
        #[serde(alias = "from", alias = "head")]
        pub source: Option<String>,
        #[serde(alias = "to", alias = "tail")]
        pub target: Option<String>,
        #[serde(alias = "type", alias = "relationship_type", alias = "relation")]
        pub relation_type: Option<String>,
        #[serde(default, alias = "from_type", alias = "head_type")]
        pub source_type: Option<String>,
        #[serde(default, alias = "to_type", alias = "tail_type")]
        pub target_type: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawExtraction {
        #[serde(default)]
        pub entities: Vec<RawEntity>,
        #[serde(default, alias = "relationships")]
        pub relations: Vec<RawRelation>,
    }
}

/// Precise extractor backed by a chat model
#[derive(Debug)]
pub struct LlmEntityExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmEntityExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn system_prompt() -> String {
        let entity_types: Vec<&str> = EntityType::ALL.iter().map(|t| t.as_str()).collect();

        format!(
            r#"You are an entity extraction system. Extract named entities and the relations between them.

ENTITY TYPES: {}

Output JSON in this exact format:
{{
  "entities": [
    {{"name": "surface form as written in the text", "type": "PERSON"}}
  ],
  "relations": [
    {{"source": "entity name", "source_type": "PERSON", "type": "WORKS_FOR", "target": "entity name", "target_type": "ORG"}}
  ]
}}

Rules:
1. Only extract entities explicitly mentioned in the text
2. Copy entity names exactly as they appear in the text
3. Relation types are UPPER_SNAKE_CASE verbs such as WORKS_FOR or LOCATED_IN
4. Relations may only reference extracted entities
5. If no entities are found, return empty arrays

Return ONLY valid JSON, no other text."#,
            entity_types.join(", ")
        )
    }

    fn parse_response(content: &str, text: &str) -> Extraction {
        let content = content.trim();
        if content.is_empty() {
            return Extraction::empty();
        }

        let json_str = Self::extract_json(content);

        let raw: raw::RawExtraction = match serde_json::from_str(json_str) {
            Ok(raw) => raw,
            Err(e) => match Self::lenient_parse(json_str) {
                Some(raw) => raw,
                None => {
                    warn!("Failed to parse extraction response: {}", e);
                    return Extraction::empty();
                }
            },
        };

        let entities: Vec<ExtractedEntity> = raw
            .entities
            .into_iter()
            .filter_map(|entity| Self::convert_entity(entity, text))
            .collect();

        // Relations name their endpoints; resolve them against the extracted entities
        let mut keys_by_name: HashMap<String, Vec<EntityKey>> = HashMap::new();
        for entity in &entities {
            let keys = keys_by_name.entry(entity.name.clone()).or_default();
            let key = entity.key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let relations: Vec<ExtractedRelation> = raw
            .relations
            .into_iter()
            .filter_map(|relation| {
                let source = resolve_endpoint(
                    &keys_by_name,
                    relation.source.as_deref()?,
                    relation.source_type.as_deref(),
                )?;
                let target = resolve_endpoint(
                    &keys_by_name,
                    relation.target.as_deref()?,
                    relation.target_type.as_deref(),
                )?;
                let relation_type = relation.relation_type.as_deref().unwrap_or("RELATED_TO");

                Some(ExtractedRelation::new(source, relation_type, target))
            })
            .collect();

        Extraction::new(entities, relations)
    }

    /// Extract JSON from response (handles markdown code blocks)
    fn extract_json(content: &str) -> &str {
        static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").expect("valid code block regex")
        });

        if let Some(m) = JSON_BLOCK.captures(content).and_then(|caps| caps.get(1)) {
            return m.as_str().trim();
        }

        content
    }

    /// Retry with trailing commas removed, then with single quotes swapped
    fn lenient_parse(json_str: &str) -> Option<raw::RawExtraction> {
        static TRAILING_COMMA: Lazy<Regex> =
            Lazy::new(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"));

        let fixed = TRAILING_COMMA.replace_all(json_str, "$1");
        if let Ok(raw) = serde_json::from_str(&fixed) {
            return Some(raw);
        }

        serde_json::from_str(&fixed.replace('\'', "\"")).ok()
    }

    fn convert_entity(raw: raw::RawEntity, text: &str) -> Option<ExtractedEntity> {
        let surface = raw.name?;
        let surface = surface.trim();
        if surface.is_empty() {
            return None;
        }

        let entity_type = raw
            .entity_type
            .as_deref()
            .map(EntityType::from_label)
            .unwrap_or(EntityType::Misc);

        let entity = ExtractedEntity::new(surface, entity_type);

        Some(match locate(text, surface) {
            Some((start, end)) => entity.with_span(start, end),
            None => entity,
        })
    }
}

/// Key of the entity a relation endpoint refers to
///
/// A name extracted under several types needs a type hint; without one the
/// endpoint is ambiguous and the relation is dropped.
fn resolve_endpoint(
    keys_by_name: &HashMap<String, Vec<EntityKey>>,
    name: &str,
    type_hint: Option<&str>,
) -> Option<EntityKey> {
    let candidates = keys_by_name.get(&normalize_name(name))?;

    match type_hint.map(EntityType::from_label) {
        Some(entity_type) => candidates
            .iter()
            .find(|key| key.entity_type == entity_type)
            .cloned(),
        None if candidates.len() == 1 => candidates.first().cloned(),
        None => {
            debug!(name, "Dropping relation with ambiguous endpoint");
            None
        }
    }
}

/// Byte offsets of the first case-insensitive occurrence of `surface` in `text`
fn locate(text: &str, surface: &str) -> Option<(usize, usize)> {
    if let Some(start) = text.find(surface) {
        return Some((start, start + surface.len()));
    }

    let pattern = surface
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?
        .find(text)
        .map(|m| (m.start(), m.end()))
}

#[async_trait]
impl EntityExtractor for LlmEntityExtractor {
    async fn extract_entities(&self, text: &str) -> Result<Extraction, DomainError> {
        if text.trim().is_empty() {
            return Ok(Extraction::empty());
        }

        let request = LlmRequest::builder()
            .system(Self::system_prompt())
            .user(format!(
                "Extract entities and relations from this text:\n\n{}",
                text
            ))
            .temperature(0.0)
            .json()
            .build();

        let response = self.llm.chat(request).await?;
        let extraction = Self::parse_response(response.content(), text);

        debug!(
            model = self.llm.model_name(),
            entities = extraction.len(),
            relations = extraction.relations().len(),
            "LLM extraction parsed"
        );

        Ok(extraction)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
