use super::records::IdResponse;
use super::{api_endpoint, check_status, http_client, RemoteError};
use crate::classifier::{Classification, IdStatus, UNKNOWN_TYPE};
use crate::provider::sort_modes;
use crate::resolver::{JumpUrls, UrlBuilder, ValidPid};
use reqwest::Client;
use tracing::debug;

const IDENTIFY_PATH: &str = "v2/providers/identify";

/// Server-side identification
pub struct IdentifyClient {
    client: Client,
    url: String,
}

impl IdentifyClient {
    pub fn new(api_base: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            client: http_client()?,
            url: api_endpoint(api_base, IDENTIFY_PATH),
        })
    }

    pub async fn identify(&self, text: &str) -> Result<Vec<IdResponse>, RemoteError> {
        let url = format!("{}?text={}", self.url, urlencoding::encode(text));
        debug!("Identifying {:?} remotely", text);

        let response = self.client.get(&url).send().await?;
        check_status(&response)?;

        response.json().await.map_err(|e| {
            RemoteError::ParseError(format!("Failed to parse identify response: {}", e))
        })
    }
}

fn parse_status(status: &str) -> IdStatus {
    match status.trim().to_uppercase().as_str() {
        "VALID" => IdStatus::Valid,
        "INVALID" => IdStatus::Invalid,
        "AMBIGUOUS" => IdStatus::Ambiguous,
        _ => IdStatus::Unknown,
    }
}

impl IdResponse {
    /// Convert to a classification of `input`; URLs go through the proxy
    pub fn to_classification(&self, input: &str, resolve_base: &str) -> Classification {
        let status = parse_status(&self.status);
        let pid_type = if self.pid_type.is_empty() {
            UNKNOWN_TYPE.to_string()
        } else {
            self.pid_type.to_lowercase()
        };

        let mut result = Classification::unknown(input);
        result.status = status;
        result.pid_type = pid_type;
        result.examples = self.examples.clone();

        if status == IdStatus::Valid {
            let modes = sort_modes(
                self.resolution_modes
                    .iter()
                    .filter_map(|m| m.to_supported_mode())
                    .collect(),
            );
            let pid = ValidPid::confirmed_remotely(input, &result.pid_type);
            result.jump_urls = JumpUrls::build(&UrlBuilder::DefaultProxy, &modes, &pid, resolve_base);
            result.modes = modes;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResolutionMode;
    use crate::remote::records::ResolutionModeRecord;
    use crate::resolver::PLACEHOLDER_URL;

    const BASE: &str = "https://api.example.org/v1/metaresolvers/resolve";

    fn response(status: &str, modes: &[&str]) -> IdResponse {
        IdResponse {
            status: status.to_string(),
            pid_type: "ARXIV".to_string(),
            examples: vec!["arxiv:1512.00135".to_string()],
            resolution_modes: modes
                .iter()
                .map(|m| ResolutionModeRecord {
                    mode: m.to_string(),
                    name: String::new(),
                    endpoints: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_response_builds_proxy_urls() {
        let result = response("VALID", &["resource", "landingpage"])
            .to_classification("arxiv:1512.00135", BASE);
        assert!(result.is_valid());
        assert_eq!(result.pid_type, "arxiv");
        assert_eq!(result.modes[0].mode, ResolutionMode::LandingPage);
        assert_eq!(result.modes[0].name, "Landing Page");
        assert_eq!(
            result.jump_urls.resource,
            format!("{}?pidMode=resource&redirect=true&pid=arxiv%3A1512.00135", BASE)
        );
        assert_eq!(result.jump_urls.metadata, PLACEHOLDER_URL);
    }

    #[test]
    fn test_invalid_response_has_no_urls() {
        let result = response("INVALID", &["landingpage"]).to_classification("arxiv:1", BASE);
        assert_eq!(result.status, IdStatus::Invalid);
        assert!(result.modes.is_empty());
        assert_eq!(result.jump_urls, JumpUrls::disabled());
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        assert_eq!(parse_status(""), IdStatus::Unknown);
        assert_eq!(parse_status("ambiguous"), IdStatus::Ambiguous);
    }
}
