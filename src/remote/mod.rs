pub use async_trait::async_trait;

pub mod file;
pub mod identify;
pub mod providers;
pub mod records;

use records::ProviderRecord;
use thiserror::Error;

const USER_AGENT: &str = concat!("pidmr/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Rate limited, try again later")]
    RateLimited,
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Somewhere provider records can be loaded from
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetch every provider record, in registry order
    async fn fetch_records(&self) -> Result<Vec<ProviderRecord>, RemoteError>;

    /// Get the name of this source
    fn name(&self) -> &'static str;
}

/// Join the API base and an endpoint path
pub fn api_endpoint(api_base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        api_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn http_client() -> Result<reqwest::Client, RemoteError> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Map rate limiting and other failures onto [`RemoteError`]
fn check_status(response: &reqwest::Response) -> Result<(), RemoteError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(RemoteError::RateLimited);
    }
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }
    Ok(())
}
