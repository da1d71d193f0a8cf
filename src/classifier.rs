use crate::provider::{Matching, ProviderDefinition, ResolutionMode, SupportedMode};
use crate::registry::Registry;
use crate::resolver::{JumpUrls, ValidPid};
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use tracing::debug;

/// Type reported when nothing matched
pub const UNKNOWN_TYPE: &str = "unknown";

/// Minimum similarity for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdStatus {
    /// Final pattern passed
    Valid,
    /// Scheme recognized but the pattern failed
    Invalid,
    /// Umbrella prefix recognized, no sub-scheme fits yet
    Ambiguous,
    /// No provider recognized the input
    Unknown,
}

impl std::fmt::Display for IdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdStatus::Valid => write!(f, "VALID"),
            IdStatus::Invalid => write!(f, "INVALID"),
            IdStatus::Ambiguous => write!(f, "AMBIGUOUS"),
            IdStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Outcome of identifying one input string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub input: String,
    pub status: IdStatus,
    /// Matched type, the umbrella key when ambiguous, or [`UNKNOWN_TYPE`]
    pub pid_type: String,
    /// One canonical example, or one per sub-scheme when ambiguous
    pub examples: Vec<String>,
    /// Supported modes; empty unless valid
    pub modes: Vec<SupportedMode>,
    pub jump_urls: JumpUrls,
}

impl Classification {
    pub fn unknown(input: &str) -> Self {
        Self {
            input: input.to_string(),
            status: IdStatus::Unknown,
            pid_type: UNKNOWN_TYPE.to_string(),
            examples: Vec::new(),
            modes: Vec::new(),
            jump_urls: JumpUrls::disabled(),
        }
    }

    fn invalid(input: &str, provider: &ProviderDefinition) -> Self {
        Self {
            input: input.to_string(),
            status: IdStatus::Invalid,
            pid_type: provider.pid_type.clone(),
            examples: provider.example.iter().cloned().collect(),
            modes: Vec::new(),
            jump_urls: JumpUrls::disabled(),
        }
    }

    fn ambiguous(input: &str, umbrella: &ProviderDefinition, sub_schemes: &[String], registry: &Registry) -> Self {
        Self {
            input: input.to_string(),
            status: IdStatus::Ambiguous,
            pid_type: umbrella.pid_type.clone(),
            examples: sub_schemes
                .iter()
                .filter_map(|s| registry.get(s))
                .filter_map(|s| s.example.clone())
                .collect(),
            modes: Vec::new(),
            jump_urls: JumpUrls::disabled(),
        }
    }

    fn valid(pid: ValidPid, provider: &ProviderDefinition, registry: &Registry) -> Self {
        let jump_urls = JumpUrls::build(&provider.builder, &provider.modes, &pid, registry.resolve_base());
        Self {
            input: pid.as_str().to_string(),
            status: IdStatus::Valid,
            pid_type: provider.pid_type.clone(),
            examples: provider.example.iter().cloned().collect(),
            modes: provider.modes.clone(),
            jump_urls,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == IdStatus::Valid
    }

    /// URL for `mode`, if this classification can be resolved that way
    pub fn url(&self, mode: ResolutionMode) -> Option<&str> {
        if self.is_valid() && self.modes.iter().any(|m| m.mode == mode) {
            Some(self.jump_urls.get(mode))
        } else {
            None
        }
    }
}

/// Identify `input` against `registry`.
///
/// Input is matched prefix-first: the text before the first `:` selects a
/// provider, or an umbrella whose sub-schemes are told apart by their
/// prefilters. Only input without any `:` is matched structurally, against
/// the prefixless candidates in priority order.
pub fn classify(input: &str, registry: &Registry) -> Classification {
    let input = input.trim();
    if input.is_empty() {
        return Classification::unknown(input);
    }

    let result = match input.split_once(':') {
        Some((prefix, _)) if !prefix.is_empty() => match registry.lookup_by_prefix(prefix) {
            Some(provider) => classify_prefixed(input, provider, registry),
            None => Classification::unknown(input),
        },
        Some(_) => Classification::unknown(input),
        None => classify_structural(input, registry),
    };

    debug!("Classified {:?} as {} ({})", input, result.pid_type, result.status);
    result
}

fn classify_prefixed(input: &str, provider: &ProviderDefinition, registry: &Registry) -> Classification {
    if let Matching::Umbrella { sub_schemes } = &provider.matching {
        return sub_schemes
            .iter()
            .filter_map(|s| registry.get(s))
            .find(|sub| sub.prefilter_matches(input))
            .map(|sub| evaluate(input, sub, registry))
            .unwrap_or_else(|| Classification::ambiguous(input, provider, sub_schemes, registry));
    }

    if let Some(pid) = ValidPid::confirm(provider, input) {
        return Classification::valid(pid, provider, registry);
    }

    // One level only: the legacy scheme's own fallback is never followed
    if let Some(legacy) = provider.fallback.as_deref().and_then(|k| registry.get(k)) {
        if legacy.prefilter_matches(input) {
            return evaluate(input, legacy, registry);
        }
    }

    Classification::invalid(input, provider)
}

fn classify_structural(input: &str, registry: &Registry) -> Classification {
    registry
        .prefixless_candidates()
        .find(|candidate| candidate.claims(input))
        .map(|candidate| evaluate(input, candidate, registry))
        .unwrap_or_else(|| Classification::unknown(input))
}

fn evaluate(input: &str, provider: &ProviderDefinition, registry: &Registry) -> Classification {
    match ValidPid::confirm(provider, input) {
        Some(pid) => Classification::valid(pid, provider, registry),
        None => Classification::invalid(input, provider),
    }
}

/// Closest registered type for an unrecognized prefix
pub fn suggest_type<'r>(input: &str, registry: &'r Registry) -> Option<&'r str> {
    let (prefix, _) = input.trim().split_once(':')?;
    let prefix = prefix.to_lowercase();
    if prefix.is_empty() || registry.lookup_by_prefix(&prefix).is_some() {
        return None;
    }

    registry
        .iter()
        .filter(|p| !p.pid_type.contains(':'))
        .map(|p| (p.pid_type.as_str(), jaro_winkler(&prefix, &p.pid_type)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(pid_type, _)| pid_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PLACEHOLDER_URL;

    const BASE: &str = "https://api.example.org/v1/metaresolvers/resolve";

    fn registry() -> Registry {
        Registry::builtin(BASE).unwrap()
    }

    #[test]
    fn test_empty_input_is_unknown() {
        let result = classify("   ", &registry());
        assert_eq!(result.status, IdStatus::Unknown);
        assert_eq!(result.pid_type, UNKNOWN_TYPE);
        assert_eq!(result.jump_urls, JumpUrls::disabled());
    }

    #[test]
    fn test_ark_modes() {
        let result = classify("ark:/13030/tf5p30086k", &registry());
        assert!(result.is_valid());
        assert_eq!(result.pid_type, "ark");
        assert!(result.url(ResolutionMode::LandingPage).is_some());
        assert!(result.url(ResolutionMode::Metadata).is_some());
        assert_eq!(result.url(ResolutionMode::Resource), None);
        assert_eq!(result.jump_urls.resource, PLACEHOLDER_URL);
    }

    #[test]
    fn test_arxiv_legacy_fallback() {
        let registry = registry();
        let modern = classify("arxiv:1512.00135", &registry);
        assert!(modern.is_valid());
        assert_eq!(modern.pid_type, "arxiv");

        let legacy = classify("arXiv:math.RT/0309136", &registry);
        assert!(legacy.is_valid());
        assert_eq!(legacy.pid_type, "arxiv.old");
    }

    #[test]
    fn test_arxiv_invalid_without_legacy_shape_stays_arxiv() {
        let result = classify("arxiv:9999", &registry());
        assert_eq!(result.status, IdStatus::Invalid);
        assert_eq!(result.pid_type, "arxiv");
        assert_eq!(result.examples, vec!["arxiv:1512.00135".to_string()]);
    }

    #[test]
    fn test_arxiv_legacy_shape_but_bad_archive() {
        let result = classify("arxiv:notanarchive/0309136", &registry());
        assert_eq!(result.status, IdStatus::Invalid);
        assert_eq!(result.pid_type, "arxiv.old");
    }

    #[test]
    fn test_urn_sub_schemes() {
        let registry = registry();
        let de = classify("urn:nbn:de:hbz:6-85659524771", &registry);
        assert!(de.is_valid());
        assert_eq!(de.pid_type, "urn:nbn:de");

        let fi = classify("URN:NBN:FI-fe2021080942632", &registry);
        assert!(fi.is_valid());
        assert_eq!(fi.pid_type, "urn:nbn:fi");
        assert_eq!(fi.url(ResolutionMode::Metadata), None);
    }

    #[test]
    fn test_urn_umbrella_is_ambiguous() {
        let result = classify("urn:nbn:xx:something", &registry());
        assert_eq!(result.status, IdStatus::Ambiguous);
        assert_eq!(result.pid_type, "urn");
        assert_eq!(
            result.examples,
            vec![
                "urn:nbn:de:hbz:6-85659524771".to_string(),
                "urn:nbn:fi-fe2021080942632".to_string()
            ]
        );
        assert_eq!(result.jump_urls, JumpUrls::disabled());
    }

    #[test]
    fn test_doi_strips_tag() {
        let result = classify("doi:10.3352/jeehp.2013.10.3", &registry());
        assert!(result.is_valid());
        assert_eq!(result.pid_type, "doi");
        let landing = result.url(ResolutionMode::LandingPage).unwrap();
        assert_eq!(landing, "https://doi.org/10.3352/jeehp.2013.10.3");
        assert!(!landing.contains("doi:"));
    }

    #[test]
    fn test_structural_priority() {
        let registry = registry();
        assert_eq!(classify("10.5281/zenodo.8056361", &registry).pid_type, "zenodo");
        assert_eq!(classify("21.T11148/f5e68cc7718a6af2a96c", &registry).pid_type, "epic");
        assert_eq!(classify("11500/ATHENA-0000-0000-2401-6", &registry).pid_type, "epic.old");
    }

    #[test]
    fn test_partial_structural_input_is_never_valid() {
        let registry = registry();
        for partial in ["1", "10.", "10.52", "2", "21.", "21.T"] {
            let result = classify(partial, &registry);
            assert!(!result.is_valid(), "{} should not be valid", partial);
            assert_ne!(result.pid_type, UNKNOWN_TYPE, "{} should be claimed", partial);
        }
    }

    #[test]
    fn test_structural_only_without_colon() {
        let registry = registry();
        assert_eq!(classify("hello", &registry).status, IdStatus::Unknown);
        assert_eq!(classify(":21.T11148/abc", &registry).status, IdStatus::Unknown);
        assert_eq!(classify("isbn:978-3-16-148410-0", &registry).status, IdStatus::Unknown);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let registry = registry();
        let first = classify("swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2", &registry);
        let second = classify("swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2", &registry);
        assert_eq!(first, second);
        assert_eq!(
            first.jump_urls.landing,
            "https://archive.softwareheritage.org/swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2"
        );
    }

    #[test]
    fn test_suggestion_for_misspelled_prefix() {
        let registry = registry();
        assert_eq!(suggest_type("arxv:1512.00135", &registry), Some("arxiv"));
        assert_eq!(suggest_type("arxiv:1512.00135", &registry), None);
        assert_eq!(suggest_type("zzzzzz:1", &registry), None);
    }
}
