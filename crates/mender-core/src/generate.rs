//! Candidate generation boundary.
//!
//! Concrete rule sets live outside this crate. The controller only sees
//! [`CandidateGenerator`]s registered per language, and narrows what they
//! return with a [`RuleFilter`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use mender_sandbox::Language;
use serde::{Deserialize, Serialize};

use crate::domain::{ErrorRecord, PatchCandidate};

/// Produces candidate fixes for one diagnosis.
///
/// Implementations must be deterministic: the same diagnosis and source
/// must yield the same candidates in the same order.
pub trait CandidateGenerator: Send + Sync {
    fn generate(
        &self,
        diagnosis: &ErrorRecord,
        source: &str,
        allow_efficiency_variants: bool,
    ) -> Vec<PatchCandidate>;
}

impl<F> CandidateGenerator for F
where
    F: Fn(&ErrorRecord, &str, bool) -> Vec<PatchCandidate> + Send + Sync,
{
    fn generate(
        &self,
        diagnosis: &ErrorRecord,
        source: &str,
        allow_efficiency_variants: bool,
    ) -> Vec<PatchCandidate> {
        self(diagnosis, source, allow_efficiency_variants)
    }
}

/// Generators keyed by language. A language with no generator yields no
/// candidates.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<Language, Arc<dyn CandidateGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the generator for `language` (builder pattern).
    pub fn with_generator(
        mut self,
        language: Language,
        generator: Arc<dyn CandidateGenerator>,
    ) -> Self {
        self.generators.insert(language, generator);
        self
    }

    pub fn register(&mut self, language: Language, generator: Arc<dyn CandidateGenerator>) {
        self.generators.insert(language, generator);
    }

    pub fn get(&self, language: Language) -> Option<&Arc<dyn CandidateGenerator>> {
        self.generators.get(&language)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.generators.keys().copied()
    }

    /// Candidates for `diagnosis`, or none when no generator is registered.
    pub fn generate(
        &self,
        language: Language,
        diagnosis: &ErrorRecord,
        source: &str,
        allow_efficiency_variants: bool,
    ) -> Vec<PatchCandidate> {
        self.get(language)
            .map(|g| g.generate(diagnosis, source, allow_efficiency_variants))
            .unwrap_or_default()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("languages", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Allow/deny lists over candidate ids.
///
/// A rule is allowed when `allow` is empty or contains it, and `deny` does
/// not contain it. Deny always wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleFilter {
    pub allow: BTreeSet<String>,
    pub deny: BTreeSet<String>,
}

impl RuleFilter {
    /// A filter that allows everything.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Add a rule to the allow list (builder pattern).
    pub fn allowing(mut self, rule: impl Into<String>) -> Self {
        self.allow.insert(rule.into());
        self
    }

    /// Add a rule to the deny list (builder pattern).
    pub fn denying(mut self, rule: impl Into<String>) -> Self {
        self.deny.insert(rule.into());
        self
    }

    pub fn allows(&self, rule: &str) -> bool {
        !self.deny.contains(rule) && (self.allow.is_empty() || self.allow.contains(rule))
    }

    /// Keep the candidates whose id is allowed, in order.
    pub fn apply(&self, candidates: Vec<PatchCandidate>) -> Vec<PatchCandidate> {
        candidates
            .into_iter()
            .filter(|c| self.allows(&c.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn candidates(ids: &[&str]) -> Vec<PatchCandidate> {
        ids.iter()
            .map(|id| PatchCandidate::new(*id, "test", "a\n", format!("{id}\n")))
            .collect()
    }

    #[test]
    fn test_permissive_filter_allows_everything() {
        let filter = RuleFilter::permissive();
        assert!(filter.allows("anything"));
        assert_eq!(filter.apply(candidates(&["a", "b"])).len(), 2);
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let filter = RuleFilter::default().allowing("a").allowing("b").denying("b");
        let kept: Vec<String> = filter
            .apply(candidates(&["a", "b", "c"]))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(kept, vec!["a".to_string()]);
    }

    #[test]
    fn test_filter_from_toml_defaults() {
        let filter: RuleFilter = toml::from_str("deny = [\"risky\"]").unwrap();
        assert!(filter.allow.is_empty());
        assert!(!filter.allows("risky"));
        assert!(filter.allows("safe"));
    }

    #[test]
    fn test_registry_dispatch() {
        let generator = |_: &ErrorRecord, source: &str, _: bool| {
            vec![PatchCandidate::new("noop", "append newline", source, format!("{source}\n"))]
        };
        let registry = GeneratorRegistry::new().with_generator(Language::Python, Arc::new(generator));
        let diagnosis = ErrorRecord::new(ErrorKind::DivideByZero);

        assert_eq!(registry.generate(Language::Python, &diagnosis, "x", false).len(), 1);
        assert!(registry.generate(Language::Go, &diagnosis, "x", false).is_empty());
        assert_eq!(registry.languages().collect::<Vec<_>>(), vec![Language::Python]);
    }
}
