use crate::builtin;
use crate::provider::{sort_modes, Matching, ProviderDefinition, StructuralClaim};
use crate::remote::records::ProviderRecord;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Record status that makes a remote provider public
const APPROVED_STATUS: &str = "APPROVED";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate provider type: {0}")]
    DuplicateType(String),
    #[error("Umbrella '{umbrella}' names unknown sub-scheme '{sub_scheme}'")]
    UnknownSubScheme { umbrella: String, sub_scheme: String },
    #[error("Umbrella '{umbrella}' cannot contain umbrella '{sub_scheme}'")]
    NestedUmbrella { umbrella: String, sub_scheme: String },
    #[error("Provider '{provider}' falls back to unknown type '{fallback}'")]
    UnknownFallback { provider: String, fallback: String },
    #[error("Fallback '{fallback}' of '{provider}' declares a fallback of its own")]
    ChainedFallback { provider: String, fallback: String },
    #[error("Provider '{0}' has no patterns")]
    MissingPatterns(String),
    #[error("Umbrella '{0}' must not declare patterns")]
    UmbrellaWithPatterns(String),
}

/// The authoritative, read-only set of provider definitions
#[derive(Debug, Clone)]
pub struct Registry {
    providers: Vec<ProviderDefinition>,
    index: HashMap<String, usize>,
    structural: Vec<usize>,
    resolve_base: String,
}

impl Registry {
    /// Build and validate a registry. `resolve_base` is the proxy endpoint used
    /// by the default URL builder.
    pub fn new(
        providers: Vec<ProviderDefinition>,
        resolve_base: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        let mut structural = Vec::new();

        for (i, provider) in providers.iter().enumerate() {
            if index.insert(provider.pid_type.clone(), i).is_some() {
                return Err(RegistryError::DuplicateType(provider.pid_type.clone()));
            }
            if matches!(provider.matching, Matching::Structural(_)) {
                structural.push(i);
            }
        }

        let registry = Self {
            providers,
            index,
            structural,
            resolve_base: resolve_base.into(),
        };
        registry.check()?;
        Ok(registry)
    }

    /// The compiled-in table
    pub fn builtin(resolve_base: impl Into<String>) -> Result<Self, RegistryError> {
        Self::new(builtin::definitions(), resolve_base)
    }

    /// Flatten records fetched from a provider collection into a registry.
    ///
    /// Records that cannot be used are skipped and logged rather than failing
    /// the whole load.
    pub fn from_records(
        records: &[ProviderRecord],
        resolve_base: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let mut providers: Vec<ProviderDefinition> = Vec::new();

        for record in records {
            let Some(def) = definition_from_record(record) else {
                continue;
            };
            if providers.iter().any(|p| p.pid_type == def.pid_type) {
                warn!("Skipping duplicate provider record '{}'", def.pid_type);
                continue;
            }
            providers.push(def);
        }

        attach_legacy_fallbacks(&mut providers);
        group_under_umbrellas(&mut providers);

        debug!("Loaded {} providers from {} records", providers.len(), records.len());
        Self::new(providers, resolve_base)
    }

    fn check(&self) -> Result<(), RegistryError> {
        for provider in &self.providers {
            match &provider.matching {
                Matching::Umbrella { sub_schemes } => {
                    if !provider.patterns.is_empty() {
                        return Err(RegistryError::UmbrellaWithPatterns(
                            provider.pid_type.clone(),
                        ));
                    }
                    for sub in sub_schemes {
                        match self.get(sub) {
                            None => {
                                return Err(RegistryError::UnknownSubScheme {
                                    umbrella: provider.pid_type.clone(),
                                    sub_scheme: sub.clone(),
                                })
                            }
                            Some(s) if s.is_umbrella() => {
                                return Err(RegistryError::NestedUmbrella {
                                    umbrella: provider.pid_type.clone(),
                                    sub_scheme: sub.clone(),
                                })
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ if provider.patterns.is_empty() => {
                    return Err(RegistryError::MissingPatterns(provider.pid_type.clone()));
                }
                _ => {}
            }

            if let Some(fallback) = &provider.fallback {
                let target = self.get(fallback).filter(|t| !t.is_umbrella()).ok_or_else(|| {
                    RegistryError::UnknownFallback {
                        provider: provider.pid_type.clone(),
                        fallback: fallback.clone(),
                    }
                })?;
                if target.fallback.is_some() {
                    return Err(RegistryError::ChainedFallback {
                        provider: provider.pid_type.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a provider by the text preceding the first `:`, ignoring case
    pub fn lookup_by_prefix(&self, prefix: &str) -> Option<&ProviderDefinition> {
        self.get(&prefix.to_lowercase())
    }

    /// Look up a provider by its exact type key
    pub fn get(&self, pid_type: &str) -> Option<&ProviderDefinition> {
        self.index.get(pid_type).map(|&i| &self.providers[i])
    }

    /// Structural candidates, in priority order
    pub fn prefixless_candidates(&self) -> impl Iterator<Item = &ProviderDefinition> {
        self.structural.iter().map(|&i| &self.providers[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDefinition> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn resolve_base(&self) -> &str {
        &self.resolve_base
    }
}

fn definition_from_record(record: &ProviderRecord) -> Option<ProviderDefinition> {
    let def_type = record.pid_type.trim().to_lowercase();
    if def_type.is_empty() {
        warn!("Skipping provider record {:?} with empty type", record.id);
        return None;
    }

    if let Some(status) = &record.status {
        if !status.eq_ignore_ascii_case(APPROVED_STATUS) {
            debug!("Skipping provider '{}' with status {}", def_type, status);
            return None;
        }
    }

    let patterns: Vec<Regex> = record
        .regexes
        .iter()
        .filter_map(|source| match Regex::new(source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Provider '{}' has an unusable pattern {:?}: {}", def_type, source, e);
                None
            }
        })
        .collect();

    if patterns.is_empty() {
        warn!("Skipping provider '{}' without usable patterns", def_type);
        return None;
    }

    let modes = record
        .resolution_modes
        .iter()
        .filter_map(|m| m.to_supported_mode())
        .collect();

    let mut def = ProviderDefinition::new(def_type, record.name.clone());
    def.description = record.description.clone().filter(|d| !d.is_empty());
    def.patterns = patterns;
    def.example = record.example.clone().or_else(|| record.examples.first().cloned());
    def.modes = sort_modes(modes);
    def.relies_on_dois = record.relies_on_dois;

    if def.pid_type.contains(':') {
        let tag = regex::escape(&def.pid_type);
        def.prefilter = Regex::new(&format!("(?i)^{}", tag)).ok();
    } else if def.example.as_deref().is_some_and(|e| !e.contains(':')) {
        def.matching = Matching::Structural(StructuralClaim::Prefilter);
    }

    Some(def)
}

/// `x.old` becomes the legacy fallback of `x`
fn attach_legacy_fallbacks(providers: &mut [ProviderDefinition]) {
    let legacy: Vec<(String, String)> = providers
        .iter()
        .filter_map(|p| {
            p.pid_type
                .strip_suffix(".old")
                .map(|base| (base.to_string(), p.pid_type.clone()))
        })
        .collect();

    for (base, old) in legacy {
        let old_has_fallback = providers
            .iter()
            .any(|p| p.pid_type == old && p.fallback.is_some());
        let base_is_fallback = providers
            .iter()
            .any(|p| p.fallback.as_deref() == Some(base.as_str()));
        if old_has_fallback || base_is_fallback {
            warn!("Not attaching '{}' to '{}': fallbacks cannot be chained", old, base);
            continue;
        }

        if let Some(p) = providers.iter_mut().find(|p| p.pid_type == base) {
            if matches!(p.matching, Matching::Prefixed) {
                p.fallback = Some(old);
            }
        }
    }
}

/// Types like `urn:nbn:de` are only reachable through an umbrella keyed by
/// their first segment
fn group_under_umbrellas(providers: &mut Vec<ProviderDefinition>) {
    let nested: Vec<String> = providers
        .iter()
        .filter(|p| p.pid_type.contains(':'))
        .map(|p| p.pid_type.clone())
        .collect();

    for sub in nested {
        let Some((key, _)) = sub.split_once(':') else {
            continue;
        };
        match providers.iter_mut().find(|p| p.pid_type == key) {
            Some(umbrella) => match &mut umbrella.matching {
                Matching::Umbrella { sub_schemes } => sub_schemes.push(sub),
                _ => warn!(
                    "Provider '{}' is unreachable: '{}' is not an umbrella scheme",
                    sub, key
                ),
            },
            None => {
                let mut umbrella = ProviderDefinition::new(key, key.to_uppercase());
                umbrella.matching = Matching::Umbrella {
                    sub_schemes: vec![sub],
                };
                providers.push(umbrella);
            }
        }
    }
}
