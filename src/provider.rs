use crate::resolver::UrlBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kind of target representation a resolve request should open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionMode {
    #[serde(rename = "landingpage")]
    LandingPage,
    #[serde(rename = "metadata")]
    Metadata,
    #[serde(rename = "resource")]
    Resource,
}

impl ResolutionMode {
    /// All modes, in button order
    pub const ALL: [ResolutionMode; 3] = [
        ResolutionMode::LandingPage,
        ResolutionMode::Metadata,
        ResolutionMode::Resource,
    ];

    /// Wire name used in query strings and registry records
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMode::LandingPage => "landingpage",
            ResolutionMode::Metadata => "metadata",
            ResolutionMode::Resource => "resource",
        }
    }

    /// Default human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionMode::LandingPage => "Landing Page",
            ResolutionMode::Metadata => "Metadata",
            ResolutionMode::Resource => "Resource",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resolution mode '{0}' (expected landingpage, metadata or resource)")]
pub struct UnknownModeError(pub String);

impl FromStr for ResolutionMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "landingpage" | "landing" => Ok(ResolutionMode::LandingPage),
            "metadata" => Ok(ResolutionMode::Metadata),
            "resource" => Ok(ResolutionMode::Resource),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// A resolution mode a provider supports, with its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedMode {
    pub mode: ResolutionMode,
    pub name: String,
}

impl SupportedMode {
    pub fn new(mode: ResolutionMode) -> Self {
        Self {
            mode,
            name: mode.label().to_string(),
        }
    }
}

/// Sort modes into the fixed landingpage, metadata, resource order and drop duplicates
pub fn sort_modes(mut modes: Vec<SupportedMode>) -> Vec<SupportedMode> {
    modes.sort_by_key(|m| m.mode);
    modes.dedup_by_key(|m| m.mode);
    modes
}

/// How a structural (prefixless) candidate claims an input
#[derive(Debug, Clone)]
pub enum StructuralClaim {
    /// Claimed while the input and the literal agree on their common prefix,
    /// so that partially typed input is not reported as unknown
    Literal(String),
    /// Claimed when the provider's prefilter matches
    Prefilter,
}

/// How a provider is reached from raw input
#[derive(Debug, Clone)]
pub enum Matching {
    /// Found through the text before the first `:`
    Prefixed,
    /// Groups sub-schemes sharing one prefix; has no patterns of its own
    Umbrella { sub_schemes: Vec<String> },
    /// Identified by the shape of the whole string
    Structural(StructuralClaim),
}

/// One supported PID scheme
#[derive(Debug, Clone)]
pub struct ProviderDefinition {
    /// Unique lowercase scheme key, e.g. "ark" or "urn:nbn:de"
    pub pid_type: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    /// Membership patterns; any match confirms the scheme
    pub patterns: Vec<Regex>,
    /// Coarse structural check used to pick between sibling schemes
    pub prefilter: Option<Regex>,
    /// Canonical valid literal
    pub example: Option<String>,
    pub modes: Vec<SupportedMode>,
    pub builder: UrlBuilder,
    pub matching: Matching,
    /// Legacy-format scheme tried when the patterns fail
    pub fallback: Option<String>,
    pub relies_on_dois: bool,
}

impl ProviderDefinition {
    pub fn new(pid_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pid_type: pid_type.into().trim().to_lowercase(),
            name: name.into(),
            description: None,
            patterns: Vec::new(),
            prefilter: None,
            example: None,
            modes: Vec::new(),
            builder: UrlBuilder::DefaultProxy,
            matching: Matching::Prefixed,
            fallback: None,
            relies_on_dois: false,
        }
    }

    /// Check the full patterns
    pub fn is_match(&self, input: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(input))
    }

    /// Check the coarse prefilter, falling back to the full patterns
    pub fn prefilter_matches(&self, input: &str) -> bool {
        match &self.prefilter {
            Some(prefilter) => prefilter.is_match(input),
            None => self.is_match(input),
        }
    }

    pub fn supports(&self, mode: ResolutionMode) -> bool {
        self.modes.iter().any(|m| m.mode == mode)
    }

    pub fn is_umbrella(&self) -> bool {
        matches!(self.matching, Matching::Umbrella { .. })
    }

    /// Whether this structural candidate lays claim to `input`
    pub fn claims(&self, input: &str) -> bool {
        match &self.matching {
            Matching::Structural(StructuralClaim::Literal(literal)) => {
                let n = input.len().min(literal.len());
                !input.is_empty() && literal.is_char_boundary(n) && input.starts_with(&literal[..n])
            }
            Matching::Structural(StructuralClaim::Prefilter) => self.prefilter_matches(input),
            _ => false,
        }
    }
}

impl fmt::Display for ProviderDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.pid_type)
    }
}
