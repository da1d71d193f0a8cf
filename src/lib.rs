pub mod builtin;
pub mod cache;
pub mod classifier;
pub mod debounce;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod report;
pub mod resolver;

pub use classifier::{classify, suggest_type, Classification, IdStatus};
pub use provider::{ResolutionMode, SupportedMode};
pub use registry::{Registry, RegistryError};

use cache::{Cache, CacheError};
use remote::file::FileSource;
use remote::identify::IdentifyClient;
use remote::providers::ProvidersClient;
use remote::records::ProviderRecord;
use remote::{api_endpoint, RegistrySource, RemoteError};
use report::{InputReport, Report};

use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Public metaresolver API
pub const DEFAULT_API_BASE: &str = "https://api.pidmr.devel.argo.grnet.gr";

const RESOLVE_PATH: &str = "v1/metaresolvers/resolve";
const PROVIDERS_NAMESPACE: &str = "providers";

#[derive(Error, Debug)]
pub enum MetaresolverError {
    #[error("Invalid provider registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Configuration for the metaresolver
pub struct MetaresolverConfig {
    pub api_base: String,
    /// Load providers from the remote collection instead of the builtin table
    pub remote_registry: bool,
    /// Ask the server to identify input instead of matching locally
    pub remote_identify: bool,
    /// Load providers from a JSON file; takes precedence over `remote_registry`
    pub registry_file: Option<PathBuf>,
    pub cache_enabled: bool,
    pub debounce: Duration,
}

impl Default for MetaresolverConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            remote_registry: false,
            remote_identify: false,
            registry_file: None,
            cache_enabled: true,
            debounce: debounce::DEFAULT_DELAY,
        }
    }
}

/// Identifies PIDs and builds their resolution URLs
pub struct Metaresolver {
    registry: Registry,
    identify: Option<IdentifyClient>,
    debounce: Duration,
}

impl Metaresolver {
    /// Metaresolver over an already built registry, matching locally
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            identify: None,
            debounce: debounce::DEFAULT_DELAY,
        }
    }

    pub async fn load(config: MetaresolverConfig) -> Result<Self, MetaresolverError> {
        let resolve_base = api_endpoint(&config.api_base, RESOLVE_PATH);

        let registry = if let Some(path) = &config.registry_file {
            let source = FileSource::new(path);
            let records = source.fetch_records().await?;
            Registry::from_records(&records, resolve_base)?
        } else if config.remote_registry {
            let cache = Cache::new(config.cache_enabled)?;
            let client = ProvidersClient::new(&config.api_base)?;
            let key = client.url().to_string();
            load_registry(&client, &cache, &key, &resolve_base).await?
        } else {
            Registry::builtin(resolve_base)?
        };

        let identify = if config.remote_identify {
            Some(IdentifyClient::new(&config.api_base)?)
        } else {
            None
        };

        debug!("Metaresolver ready with {} providers", registry.len());
        Ok(Self {
            registry,
            identify,
            debounce: config.debounce,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce
    }

    /// Identify `input` against the local registry
    pub fn classify(&self, input: &str) -> Classification {
        classify(input, &self.registry)
    }

    /// Identify `input`, remotely when configured.
    ///
    /// A failed remote call yields a single unknown result.
    pub async fn identify(&self, input: &str) -> Vec<Classification> {
        let input = input.trim();
        let Some(client) = self.identify.as_ref().filter(|_| !input.is_empty()) else {
            return vec![self.classify(input)];
        };

        match client.identify(input).await {
            Ok(responses) if !responses.is_empty() => responses
                .iter()
                .map(|r| r.to_classification(input, self.registry.resolve_base()))
                .collect(),
            Ok(_) => vec![Classification::unknown(input)],
            Err(e) => {
                warn!("Remote identification of {:?} failed: {}", input, e);
                vec![Classification::unknown(input)]
            }
        }
    }

    /// Identify `input` and attach a type suggestion when nothing matched
    pub async fn identify_input(&self, input: &str) -> InputReport {
        let results = self.identify(input).await;
        let suggestion = if results.iter().all(|r| r.status == IdStatus::Unknown) {
            suggest_type(input, &self.registry).map(String::from)
        } else {
            None
        };

        InputReport {
            input: input.trim().to_string(),
            results,
            suggestion,
        }
    }

    /// Identify a batch of inputs and return a report in input order
    pub async fn identify_all(&self, inputs: Vec<String>, show_progress: bool) -> Report {
        const CONCURRENCY_LIMIT: usize = 10;

        let pb = if show_progress {
            ProgressBar::new(inputs.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut results: Vec<(usize, InputReport)> = stream::iter(inputs.into_iter().enumerate())
            .map(|(i, input)| async move { (i, self.identify_input(&input).await) })
            .buffer_unordered(CONCURRENCY_LIMIT)
            .inspect(|_| pb.inc(1))
            .collect()
            .await;

        pb.finish_and_clear();
        results.sort_by_key(|(i, _)| *i);

        let mut report = Report::new();
        for (_, entry) in results {
            report.add(entry);
        }
        report
    }

    /// Proxy URL resolving `pid` in `mode`, whatever its type
    pub fn resolve_url(&self, mode: ResolutionMode, pid: &str) -> String {
        resolver::build_resolve_url(self.registry.resolve_base(), mode, pid.trim())
    }
}

/// Build a registry from `source`, going through the cache.
///
/// A fresh cached copy is used without fetching. When the fetch fails the
/// stale copy is used, and failing that the builtin table.
async fn load_registry(
    source: &dyn RegistrySource,
    cache: &Cache,
    key: &str,
    resolve_base: &str,
) -> Result<Registry, RegistryError> {
    if let Some(records) = cache.get::<Vec<ProviderRecord>>(PROVIDERS_NAMESPACE, key) {
        debug!("Using cached provider records for {}", key);
        return Registry::from_records(&records, resolve_base);
    }

    match source.fetch_records().await {
        Ok(records) if !records.is_empty() => {
            if let Err(e) = cache.set(PROVIDERS_NAMESPACE, key, &records) {
                warn!("Failed to cache provider records: {}", e);
            }
            Registry::from_records(&records, resolve_base)
        }
        Ok(_) => {
            warn!("{} returned no providers, using builtin table", source.name());
            Registry::builtin(resolve_base)
        }
        Err(e) => {
            warn!("{} unavailable: {}", source.name(), e);
            match cache.get_stale::<Vec<ProviderRecord>>(PROVIDERS_NAMESPACE, key) {
                Some(records) => {
                    warn!("Using stale cached provider records");
                    Registry::from_records(&records, resolve_base)
                }
                None => {
                    warn!("Using builtin provider table");
                    Registry::builtin(resolve_base)
                }
            }
        }
    }
}
