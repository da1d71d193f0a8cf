use super::records::{ProviderRecord, ProvidersPage};
use super::{api_endpoint, async_trait, check_status, http_client, RegistrySource, RemoteError};
use reqwest::Client;
use std::future::Future;
use tracing::debug;

const PROVIDERS_PATH: &str = "v1/providers";
/// Largest page size the collection endpoint serves
const PAGE_SIZE: u32 = 100;
/// Stop following pages after this many, whatever the server claims
const MAX_PAGES: u32 = 1000;

/// Reads the paginated public provider collection
pub struct ProvidersClient {
    client: Client,
    url: String,
}

impl ProvidersClient {
    pub fn new(api_base: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            client: http_client()?,
            url: api_endpoint(api_base, PROVIDERS_PATH),
        })
    }

    /// Collection endpoint, without paging parameters
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_page(&self, page: u32, size: u32) -> Result<ProvidersPage, RemoteError> {
        let url = format!("{}?size={}&page={}", self.url, size, page);
        debug!("Fetching providers page {}", page);

        let response = self.client.get(&url).send().await?;
        check_status(&response)?;

        response.json().await.map_err(|e| {
            RemoteError::ParseError(format!("Failed to parse providers page {}: {}", page, e))
        })
    }
}

#[async_trait]
impl RegistrySource for ProvidersClient {
    async fn fetch_records(&self) -> Result<Vec<ProviderRecord>, RemoteError> {
        let records = collect_pages(|page| self.fetch_page(page, PAGE_SIZE), MAX_PAGES).await?;
        debug!("Fetched {} provider records", records.len());
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "Provider collection"
    }
}

/// Follow pages from 1 until the last page, an empty page, or `max_pages`
async fn collect_pages<F, Fut>(
    mut fetch: F,
    max_pages: u32,
) -> Result<Vec<ProviderRecord>, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ProvidersPage, RemoteError>>,
{
    let mut records = Vec::new();
    let mut next = Some(1);

    while let Some(page_number) = next.filter(|&n| n <= max_pages) {
        let page = fetch(page_number).await?;
        next = page.next_page();
        records.extend(page.content);
    }

    Ok(records)
}
