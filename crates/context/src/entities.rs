//! Entity resolution
//!
//! Maps company mentions in a question to the entity ids passages are
//! tagged with, so a sub-query about one company searches only its filings.

use std::collections::HashMap;

/// Built-in alias table: lower-cased mention → entity id
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("microsoft", "MSFT"),
    ("msft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("googl", "GOOGL"),
    ("goog", "GOOGL"),
    ("nvidia", "NVDA"),
    ("nvda", "NVDA"),
];

/// Word-bounded, case-insensitive alias matcher
#[derive(Debug, Clone)]
pub struct EntityResolver {
    aliases: HashMap<String, String>,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ALIASES.iter().copied())
    }
}

impl EntityResolver {
    /// Create a resolver from `(alias, entity)` pairs. Aliases are single words.
    pub fn new<A, E>(aliases: impl IntoIterator<Item = (A, E)>) -> Self
    where
        A: Into<String>,
        E: Into<String>,
    {
        let aliases = aliases
            .into_iter()
            .map(|(alias, entity)| (alias.into().to_lowercase(), entity.into()))
            .collect();
        Self { aliases }
    }

    /// Distinct entities mentioned in `text`, in order of first mention
    pub fn resolve(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            if let Some(entity) = self.aliases.get(&token.to_lowercase()) {
                if !found.contains(entity) {
                    found.push(entity.clone());
                }
            }
        }
        found
    }

    /// The entity when `text` mentions exactly one
    pub fn single_entity(&self, text: &str) -> Option<String> {
        let mut entities = self.resolve(text);
        if entities.len() == 1 {
            entities.pop()
        } else {
            None
        }
    }
}
