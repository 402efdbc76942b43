//! Gazetteers for the rule-based extractor

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::domain::extraction::normalize_name;
use crate::domain::DomainError;

const EN_TITLES: &[&str] = &[
    "mr", "mrs", "ms", "miss", "dr", "prof", "professor", "sir", "dame", "lord", "lady",
    "president", "senator", "governor", "mayor", "judge", "captain", "general", "rev",
];

const EN_ORG_SUFFIXES: &[&str] = &[
    "inc", "corp", "corporation", "co", "company", "ltd", "llc", "plc", "gmbh", "ag", "sa",
    "group", "holdings", "labs", "foundation", "institute", "university", "bank", "agency",
    "association", "society", "partners", "technologies", "systems",
];

const EN_LOCATIONS: &[&str] = &[
    "paris", "london", "berlin", "madrid", "rome", "tokyo", "beijing", "moscow", "new york",
    "los angeles", "san francisco", "chicago", "boston", "seattle", "toronto", "sydney",
    "amsterdam", "vienna", "zurich", "dublin", "lisbon", "singapore", "mumbai", "cairo",
    "france", "germany", "spain", "italy", "japan", "china", "russia", "india", "brazil",
    "canada", "australia", "mexico", "egypt", "ireland", "portugal", "switzerland",
    "united states", "united kingdom", "europe", "asia", "africa", "america", "california",
    "texas",
];

const EN_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "it", "its", "i", "we", "you", "he",
    "she", "they", "our", "my", "his", "her", "their", "in", "on", "at", "of", "for", "to",
    "from", "by", "with", "and", "or", "but", "if", "when", "while", "after", "before",
    "yesterday", "today", "tomorrow", "there", "here", "however", "also", "then", "so",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

const EN_CONNECTORS: &[&str] = &["of", "de", "la", "von", "van", "der", "&"];

/// Word lists driving the rule-based extractor, all lowercase
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageResources {
    #[serde(default)]
    pub titles: HashSet<String>,
    #[serde(default)]
    pub org_suffixes: HashSet<String>,
    #[serde(default)]
    pub locations: HashSet<String>,
    #[serde(default)]
    pub stop_words: HashSet<String>,
    /// Lowercase words allowed inside a capitalized run ("Bank of America")
    #[serde(default)]
    pub connectors: HashSet<String>,
}

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl LanguageResources {
    /// Resources bundled with the crate
    pub fn builtin(language: &str) -> Option<Self> {
        match language {
            "en" => Some(Self {
                titles: to_set(EN_TITLES),
                org_suffixes: to_set(EN_ORG_SUFFIXES),
                locations: to_set(EN_LOCATIONS),
                stop_words: to_set(EN_STOP_WORDS),
                connectors: to_set(EN_CONNECTORS),
            }),
            _ => None,
        }
    }

    /// Load resources for `language`
    ///
    /// A `<resources_dir>/<language>.json` file takes precedence over the
    /// bundled resources. A language with neither is a configuration error.
    pub fn load(language: &str, resources_dir: Option<&Path>) -> Result<Self, DomainError> {
        let language = language.trim().to_lowercase();
        if language.is_empty() {
            return Err(DomainError::configuration("Extraction language must not be empty"));
        }

        if let Some(dir) = resources_dir {
            let path = dir.join(format!("{}.json", language));
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        Self::builtin(&language).ok_or_else(|| {
            DomainError::configuration(format!(
                "No language resources for '{}' (expected {}/{}.json)",
                language,
                resources_dir
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "<resources_dir>".to_string()),
                language
            ))
        })
    }

    fn from_file(path: &Path) -> Result<Self, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read language resources {}: {}",
                path.display(),
                e
            ))
        })?;

        let resources: Self = serde_json::from_str(&content).map_err(|e| {
            DomainError::configuration(format!(
                "Invalid language resources {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(resources.normalized())
    }

    /// Lowercase every word and collapse inner whitespace to match lookups
    pub fn normalized(self) -> Self {
        let lower = |set: HashSet<String>| -> HashSet<String> {
            set.into_iter()
                .map(|w| normalize_name(&w))
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            titles: lower(self.titles),
            org_suffixes: lower(self.org_suffixes),
            locations: lower(self.locations),
            stop_words: lower(self.stop_words),
            connectors: lower(self.connectors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_english() {
        let resources = LanguageResources::load("EN", None).unwrap();

        assert!(resources.titles.contains("dr"));
        assert!(resources.org_suffixes.contains("inc"));
        assert!(resources.locations.contains("paris"));
        assert!(resources.stop_words.contains("the"));
    }

    #[test]
    fn test_missing_language_is_configuration_error() {
        let result = LanguageResources::load("xx", None);
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        let result = LanguageResources::load("  ", None);
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_load_from_resources_dir() {
        let dir = std::env::temp_dir().join(format!("semgraph-res-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("fr.json"),
            r#"{"titles": ["M", "Mme"], "locations": ["Lyon", " Saint  Etienne "], "stop_words": ["Le"]}"#,
        )
        .unwrap();

        let resources = LanguageResources::load("fr", Some(&dir)).unwrap();
        assert!(resources.titles.contains("mme"));
        assert!(resources.locations.contains("lyon"));
        assert!(resources.locations.contains("saint etienne"));
        assert!(resources.stop_words.contains("le"));
        assert!(resources.org_suffixes.is_empty());

        assert!(LanguageResources::load("de", Some(&dir)).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_resource_file() {
        let dir = std::env::temp_dir().join(format!("semgraph-res-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("es.json"), "{not json").unwrap();

        let result = LanguageResources::load("es", Some(&dir));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
