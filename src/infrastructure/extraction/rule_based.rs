//! Rule-based entity extractor
//!
//! Finds runs of capitalized words sentence by sentence and classifies
//! them with gazetteers: a leading title marks a person, an organization
//! suffix marks an organization, a known place marks a location and any
//! other run falls back to MISC. Entities sharing a sentence are linked
//! with `MENTIONED_WITH`.

use std::path::Path;

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use super::resources::LanguageResources;
use crate::domain::extraction::{
    normalize_name, EntityExtractor, EntityType, ExtractedEntity, ExtractedRelation, Extraction,
};
use crate::domain::DomainError;

pub const MENTIONED_WITH: &str = "MENTIONED_WITH";

type Token<'a> = (usize, &'a str);

/// Fast gazetteer-driven extractor
#[derive(Debug)]
pub struct RuleBasedExtractor {
    language: String,
    resources: LanguageResources,
}

impl RuleBasedExtractor {
    /// Build the extractor; fails when resources for `language` are missing
    pub fn new(language: &str, resources_dir: Option<&Path>) -> Result<Self, DomainError> {
        let resources = LanguageResources::load(language, resources_dir)?;

        Ok(Self {
            language: language.trim().to_lowercase(),
            resources,
        })
    }

    pub fn with_resources(language: impl Into<String>, resources: LanguageResources) -> Self {
        Self {
            language: language.into(),
            resources: resources.normalized(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn extract(&self, text: &str) -> Extraction {
        let mut entities = Vec::new();
        let mut relations = Vec::new();

        for (offset, sentence) in self.sentences(text) {
            let found = self.scan_sentence(offset, sentence);

            for (i, source) in found.iter().enumerate() {
                for target in &found[i + 1..] {
                    if source.key() != target.key() {
                        relations.push(ExtractedRelation::new(
                            source.key(),
                            MENTIONED_WITH,
                            target.key(),
                        ));
                    }
                }
            }

            entities.extend(found);
        }

        Extraction::new(entities, relations)
    }

    /// Sentence segments with their byte offsets, re-joining breaks after title abbreviations
    fn sentences<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut sentences: Vec<(usize, &'a str)> = Vec::new();
        let mut glue_next = false;

        for (offset, segment) in text.split_sentence_bound_indices() {
            let previous = if glue_next { sentences.pop() } else { None };

            match previous {
                Some((start, _)) => sentences.push((start, &text[start..offset + segment.len()])),
                None => sentences.push((offset, segment)),
            }

            glue_next = self.ends_with_title(segment);
        }

        sentences
    }

    fn ends_with_title(&self, segment: &str) -> bool {
        let Some(stem) = segment.trim_end().strip_suffix('.') else {
            return false;
        };

        stem.unicode_words()
            .last()
            .is_some_and(|word| self.resources.titles.contains(&word.to_lowercase()))
    }

    fn scan_sentence(&self, offset: usize, sentence: &str) -> Vec<ExtractedEntity> {
        let tokens: Vec<Token<'_>> = sentence.split_word_bound_indices().collect();
        let mut found = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let word = tokens[i].1;
            if !is_word(word) || !is_capitalized(word) {
                i += 1;
                continue;
            }

            let run = self.grow_run(&tokens, i);
            i = run.last().map_or(i, |&last| last) + 1;

            if let Some(entity) = self.classify_run(&tokens, &run, offset, sentence) {
                found.push(entity);
            }
        }

        found
    }

    /// Token indices of the capitalized run starting at `start`
    fn grow_run(&self, tokens: &[Token<'_>], start: usize) -> Vec<usize> {
        let mut run = vec![start];
        let mut current = start;

        loop {
            if is_possessive(tokens[current].1) {
                break;
            }

            let mut next = current + 1;

            // "Dr." keeps the run going
            if next < tokens.len()
                && tokens[next].1 == "."
                && self.resources.titles.contains(&tokens[current].1.to_lowercase())
            {
                next += 1;
            }

            if next >= tokens.len() || !is_inline_space(tokens[next].1) {
                break;
            }
            next += 1;

            let Some(&(_, candidate)) = tokens.get(next) else {
                break;
            };

            if is_word(candidate) && is_capitalized(candidate) {
                run.push(next);
                current = next;
                continue;
            }

            // "Bank of America": a connector only joins when a capitalized word follows
            if self.resources.connectors.contains(&candidate.to_lowercase()) {
                let after = next + 2;
                if after < tokens.len()
                    && is_inline_space(tokens[next + 1].1)
                    && is_word(tokens[after].1)
                    && is_capitalized(tokens[after].1)
                {
                    run.push(next);
                    run.push(after);
                    current = after;
                    continue;
                }
            }

            break;
        }

        run
    }

    fn classify_run(
        &self,
        tokens: &[Token<'_>],
        run: &[usize],
        offset: usize,
        sentence: &str,
    ) -> Option<ExtractedEntity> {
        let lower = |index: &usize| strip_possessive(tokens[*index].1).to_lowercase();
        let is_connector = |index: &usize| self.resources.connectors.contains(&lower(index));

        let mut words = run;
        while let Some((first, rest)) = words.split_first() {
            if self.resources.stop_words.contains(&lower(first)) || is_connector(first) {
                words = rest;
            } else {
                break;
            }
        }

        let mut entity_type = None;
        if words.len() > 1 && self.resources.titles.contains(&lower(&words[0])) {
            entity_type = Some(EntityType::Person);
            words = &words[1..];
        }

        let (first, last) = (words.first()?, words.last()?);
        let start = tokens[*first].0;
        let last_word = strip_possessive(tokens[*last].1);
        let end = tokens[*last].0 + last_word.len();
        let surface = &sentence[start..end];
        let name = normalize_name(surface);

        let entity_type = entity_type.unwrap_or_else(|| {
            if self.resources.locations.contains(&name) {
                EntityType::Location
            } else if words.len() > 1
                && (self.resources.org_suffixes.contains(&lower(last))
                    || self.resources.org_suffixes.contains(&lower(first)))
            {
                EntityType::Org
            } else {
                EntityType::Misc
            }
        });

        Some(ExtractedEntity::new(surface, entity_type).with_span(offset + start, offset + end))
    }
}

fn is_word(token: &str) -> bool {
    token.chars().any(char::is_alphanumeric)
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

fn is_inline_space(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_whitespace() && c != '\n' && c != '\r')
}

fn is_possessive(token: &str) -> bool {
    token.ends_with("'s") || token.ends_with("\u{2019}s")
}

fn strip_possessive(token: &str) -> &str {
    token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("\u{2019}s"))
        .unwrap_or(token)
}

#[async_trait]
impl EntityExtractor for RuleBasedExtractor {
    async fn extract_entities(&self, text: &str) -> Result<Extraction, DomainError> {
        if text.trim().is_empty() {
            return Ok(Extraction::empty());
        }

        Ok(self.extract(text))
    }

    fn name(&self) -> &'static str {
        "rule_based"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::EntityKey;

    fn extractor() -> RuleBasedExtractor {
        RuleBasedExtractor::new("en", None).unwrap()
    }

    fn find<'a>(extraction: &'a Extraction, name: &str) -> Option<&'a ExtractedEntity> {
        extraction.entities().iter().find(|e| e.name == name)
    }

    #[tokio::test]
    async fn test_classifies_title_suffix_and_gazetteer() {
        let text = "Dr. Alice Smith joined Acme Corp in Paris.";
        let extraction = extractor().extract_entities(text).await.unwrap();

        let alice = find(&extraction, "alice smith").unwrap();
        assert_eq!(alice.entity_type, EntityType::Person);
        assert_eq!(alice.display_name, "Alice Smith");

        assert_eq!(find(&extraction, "acme corp").unwrap().entity_type, EntityType::Org);
        assert_eq!(find(&extraction, "paris").unwrap().entity_type, EntityType::Location);
        assert_eq!(extraction.len(), 3);
    }

    #[tokio::test]
    async fn test_spans_point_at_surface_forms() {
        let text = "Yesterday the team met in New York. Bob Jones works at Bank of America.";
        let extraction = extractor().extract_entities(text).await.unwrap();

        assert!(!extraction.is_empty());
        for entity in extraction.entities() {
            let span = entity.span.unwrap();
            assert_eq!(&text[span.start..span.end], entity.display_name);
        }

        assert_eq!(find(&extraction, "new york").unwrap().entity_type, EntityType::Location);
        assert_eq!(find(&extraction, "bank of america").unwrap().entity_type, EntityType::Org);
        assert_eq!(find(&extraction, "bob jones").unwrap().entity_type, EntityType::Misc);
    }

    #[tokio::test]
    async fn test_stop_words_are_ignored() {
        let extraction = extractor()
            .extract_entities("It rained. The weather was bad. However it cleared.")
            .await
            .unwrap();

        assert!(extraction.is_empty());
    }

    #[tokio::test]
    async fn test_leading_stop_word_is_trimmed() {
        let extraction = extractor()
            .extract_entities("The Eiffel Tower is in Paris.")
            .await
            .unwrap();

        let tower = find(&extraction, "eiffel tower").unwrap();
        assert_eq!(tower.entity_type, EntityType::Misc);
        assert_eq!(tower.display_name, "Eiffel Tower");
    }

    #[tokio::test]
    async fn test_possessive_ends_run() {
        let extraction = extractor()
            .extract_entities("We visited Acme Inc's CEO Jane Doe.")
            .await
            .unwrap();

        assert_eq!(find(&extraction, "acme inc").unwrap().entity_type, EntityType::Org);
        assert!(find(&extraction, "ceo jane doe").is_some());
    }

    #[tokio::test]
    async fn test_no_capitalized_words_yields_nothing() {
        let extraction = extractor()
            .extract_entities("nothing here is capitalized at all")
            .await
            .unwrap();

        assert!(extraction.is_empty());
        assert!(extractor().extract_entities("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_co_occurrence_stays_within_sentence() {
        let text = "Alice Smith lives in London. Bob Jones works at Acme Inc.";
        let extraction = extractor().extract_entities(text).await.unwrap();

        assert_eq!(extraction.relations().len(), 2);
        assert!(extraction
            .relations()
            .iter()
            .all(|r| r.relation_type == MENTIONED_WITH));

        let alice = EntityKey::new("Alice Smith", EntityType::Misc);
        let london = EntityKey::new("London", EntityType::Location);
        assert!(extraction
            .relations()
            .iter()
            .any(|r| r.source == alice && r.target == london));
    }

    #[tokio::test]
    async fn test_repeated_mentions_are_merged() {
        let text = "Paris is big. I love Paris.";
        let extraction = extractor().extract_entities(text).await.unwrap();

        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.entities()[0].span.unwrap().start, 0);
    }

    #[test]
    fn test_missing_language_fails_construction() {
        let result = RuleBasedExtractor::new("zz", None);
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_sentences_rejoin_after_titles() {
        let extractor = extractor();
        let sentences = extractor.sentences("Dr. Who arrived. Then he left.");

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].1.trim(), "Dr. Who arrived.");
        assert_eq!(sentences[1].0, "Dr. Who arrived. ".len());
    }

    #[test]
    fn test_custom_resources() {
        let mut resources = LanguageResources::default();
        resources.locations.insert("Gotham".to_string());

        let extractor = RuleBasedExtractor::with_resources("custom", resources);
        let extraction = extractor.extract("Batman guards Gotham.");

        assert_eq!(extractor.language(), "custom");
        assert_eq!(find(&extraction, "gotham").unwrap().entity_type, EntityType::Location);
        assert_eq!(find(&extraction, "batman").unwrap().entity_type, EntityType::Misc);
    }

    #[tokio::test]
    async fn test_capitalized_gazetteer_file_entries_match() {
        let dir = std::env::temp_dir().join(format!("semgraph-rb-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("fr.json"),
            r#"{"titles": ["Mme"], "locations": ["Lyon", "Saint  Etienne"], "stop_words": ["Le"]}"#,
        )
        .unwrap();

        let extractor = RuleBasedExtractor::new("fr", Some(&dir)).unwrap();
        let extraction = extractor
            .extract_entities("Mme Dupont habite Lyon. Le club joue Saint Etienne.")
            .await
            .unwrap();

        assert_eq!(find(&extraction, "lyon").unwrap().entity_type, EntityType::Location);
        assert_eq!(
            find(&extraction, "saint etienne").unwrap().entity_type,
            EntityType::Location
        );
        assert_eq!(find(&extraction, "dupont").unwrap().entity_type, EntityType::Person);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
