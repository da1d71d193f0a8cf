use crate::provider::{ProviderDefinition, ResolutionMode, SupportedMode};
use serde::{Deserialize, Serialize};

/// URL handed out for modes that cannot be resolved
pub const PLACEHOLDER_URL: &str = "#";

/// A PID that passed its provider's patterns.
///
/// Only the classifier (or a VALID verdict from the identify service) can
/// produce one, so URL builders never see unconfirmed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPid {
    value: String,
    pid_type: String,
}

impl ValidPid {
    pub(crate) fn confirm(provider: &ProviderDefinition, input: &str) -> Option<Self> {
        if provider.is_match(input) {
            Some(Self {
                value: input.to_string(),
                pid_type: provider.pid_type.clone(),
            })
        } else {
            None
        }
    }

    pub(crate) fn confirmed_remotely(input: &str, pid_type: &str) -> Self {
        Self {
            value: input.to_string(),
            pid_type: pid_type.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn pid_type(&self) -> &str {
        &self.pid_type
    }
}

/// How a provider turns a valid PID into outbound URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UrlBuilder {
    /// The metaresolver proxy with a mode query parameter
    DefaultProxy,
    /// Drop the first `len` bytes (e.g. a `doi:` tag) and append to `base`
    StripPrefix { len: usize, base: String },
    /// Append the PID unchanged to `base`
    PassThrough { base: String },
    /// Per-mode templates on the scheme's own host; `{pid}` is substituted.
    /// Modes without a template go through the proxy.
    DirectApiHost {
        landing: Option<String>,
        metadata: Option<String>,
        resource: Option<String>,
    },
}

impl UrlBuilder {
    pub fn url(&self, mode: ResolutionMode, pid: &ValidPid, resolve_base: &str) -> String {
        let raw = pid.as_str();
        match self {
            UrlBuilder::DefaultProxy => build_resolve_url(resolve_base, mode, raw),
            UrlBuilder::StripPrefix { len, base } => {
                format!("{}{}", base, encode_path(raw.get(*len..).unwrap_or(raw)))
            }
            UrlBuilder::PassThrough { base } => format!("{}{}", base, encode_path(raw)),
            UrlBuilder::DirectApiHost {
                landing,
                metadata,
                resource,
            } => {
                let template = match mode {
                    ResolutionMode::LandingPage => landing,
                    ResolutionMode::Metadata => metadata,
                    ResolutionMode::Resource => resource,
                };
                match template {
                    Some(t) => t.replace("{pid}", &encode_path(raw)),
                    None => build_resolve_url(resolve_base, mode, raw),
                }
            }
        }
    }
}

/// The three candidate URLs for one classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpUrls {
    pub landing: String,
    pub metadata: String,
    pub resource: String,
}

impl JumpUrls {
    pub fn disabled() -> Self {
        Self {
            landing: PLACEHOLDER_URL.to_string(),
            metadata: PLACEHOLDER_URL.to_string(),
            resource: PLACEHOLDER_URL.to_string(),
        }
    }

    /// Build URLs for the supported modes; the rest stay disabled
    pub fn build(
        builder: &UrlBuilder,
        modes: &[SupportedMode],
        pid: &ValidPid,
        resolve_base: &str,
    ) -> Self {
        let mut urls = Self::disabled();
        for supported in modes {
            let url = builder.url(supported.mode, pid, resolve_base);
            match supported.mode {
                ResolutionMode::LandingPage => urls.landing = url,
                ResolutionMode::Metadata => urls.metadata = url,
                ResolutionMode::Resource => urls.resource = url,
            }
        }
        urls
    }

    pub fn get(&self, mode: ResolutionMode) -> &str {
        match mode {
            ResolutionMode::LandingPage => &self.landing,
            ResolutionMode::Metadata => &self.metadata,
            ResolutionMode::Resource => &self.resource,
        }
    }

    pub fn is_enabled(&self, mode: ResolutionMode) -> bool {
        self.get(mode) != PLACEHOLDER_URL
    }
}

impl Default for JumpUrls {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Percent-encode `pid` for a URL path, keeping its `/` and `:` separators
fn encode_path(pid: &str) -> String {
    pid.split('/')
        .map(|segment| {
            segment
                .split(':')
                .map(urlencoding::encode)
                .collect::<Vec<_>>()
                .join(":")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve URL on the metaresolver proxy
pub fn build_resolve_url(resolve_base: &str, mode: ResolutionMode, pid: &str) -> String {
    format!(
        "{}?pidMode={}&redirect=true&pid={}",
        resolve_base,
        mode,
        urlencoding::encode(pid)
    )
}
