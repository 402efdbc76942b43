//! Extracted entities and relations

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Location,
    Event,
    Product,
    Misc,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Person,
        EntityType::Org,
        EntityType::Location,
        EntityType::Event,
        EntityType::Product,
        EntityType::Misc,
    ];

    /// Map an extractor label onto the closed set; unknown labels become `Misc`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERSON" | "PER" | "PEOPLE" => EntityType::Person,
            "ORG" | "ORGANIZATION" | "ORGANISATION" | "COMPANY" => EntityType::Org,
            "LOCATION" | "LOC" | "GPE" | "PLACE" | "CITY" | "COUNTRY" => EntityType::Location,
            "EVENT" => EntityType::Event,
            "PRODUCT" => EntityType::Product,
            _ => EntityType::Misc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Location => "LOCATION",
            EntityType::Event => "EVENT",
            EntityType::Product => "PRODUCT",
            EntityType::Misc => "MISC",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize an entity name: case-fold, trim and collapse inner whitespace
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a relation label to UPPER_SNAKE_CASE
pub fn normalize_relation_type(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !label.is_empty() {
                label.push('_');
            }
            pending_separator = false;
            label.extend(c.to_uppercase());
        } else {
            pending_separator = true;
        }
    }

    label
}

/// Byte offsets of an entity mention in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Identity of an entity within one extraction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub name: String,
    pub entity_type: EntityType,
}

impl EntityKey {
    /// Build a key from a surface form, normalizing the name
    pub fn new(name: &str, entity_type: EntityType) -> Self {
        Self {
            name: normalize_name(name),
            entity_type,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.entity_type)
    }
}

/// A recognized entity mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub display_name: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl ExtractedEntity {
    pub fn new(surface: &str, entity_type: EntityType) -> Self {
        Self {
            name: normalize_name(surface),
            display_name: surface.trim().to_string(),
            entity_type,
            span: None,
        }
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(SourceSpan::new(start, end));
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            name: self.name.clone(),
            entity_type: self.entity_type,
        }
    }
}

/// A typed, directed relation between two extracted entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: EntityKey,
    pub relation_type: String,
    pub target: EntityKey,
}

impl ExtractedRelation {
    pub fn new(source: EntityKey, relation_type: &str, target: EntityKey) -> Self {
        Self {
            source,
            relation_type: normalize_relation_type(relation_type),
            target,
        }
    }
}

/// Deduplicated result of one extraction call
///
/// No two entities share a key, every relation connects two distinct
/// entities of the extraction and no relation is repeated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    entities: Vec<ExtractedEntity>,
    relations: Vec<ExtractedRelation>,
}

impl Extraction {
    pub fn new(entities: Vec<ExtractedEntity>, relations: Vec<ExtractedRelation>) -> Self {
        let mut seen = HashSet::new();
        let entities: Vec<ExtractedEntity> = entities
            .into_iter()
            .filter(|entity| !entity.name.is_empty())
            .filter(|entity| seen.insert(entity.key()))
            .collect();

        let mut seen_relations = HashSet::new();
        let relations = relations
            .into_iter()
            .filter(|relation| !relation.relation_type.is_empty())
            .filter(|relation| relation.source != relation.target)
            .filter(|relation| seen.contains(&relation.source) && seen.contains(&relation.target))
            .filter(|relation| seen_relations.insert(relation.clone()))
            .collect();

        Self {
            entities,
            relations,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[ExtractedEntity] {
        &self.entities
    }

    pub fn relations(&self) -> &[ExtractedRelation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_parts(self) -> (Vec<ExtractedEntity>, Vec<ExtractedRelation>) {
        (self.entities, self.relations)
    }
}
