use crate::provider::{ResolutionMode, SupportedMode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One provider as stored by the registry service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub pid_type: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub relies_on_dois: bool,
    #[serde(default)]
    pub resolution_modes: Vec<ResolutionModeRecord>,
    #[serde(default)]
    pub regexes: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionModeRecord {
    pub mode: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl ResolutionModeRecord {
    /// Parse into a supported mode; unknown mode names are logged and dropped
    pub fn to_supported_mode(&self) -> Option<SupportedMode> {
        match self.mode.parse::<ResolutionMode>() {
            Ok(mode) => Some(SupportedMode {
                mode,
                name: if self.name.is_empty() {
                    mode.label().to_string()
                } else {
                    self.name.clone()
                },
            }),
            Err(e) => {
                warn!("Ignoring resolution mode: {}", e);
                None
            }
        }
    }
}

/// A page of the provider collection. Page numbers start at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersPage {
    #[serde(default)]
    pub size_of_page: u32,
    pub number_of_page: u32,
    #[serde(default)]
    pub total_elements: u64,
    pub total_pages: u32,
    #[serde(default)]
    pub content: Vec<ProviderRecord>,
    #[serde(default)]
    pub links: Vec<PageLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLink {
    pub href: String,
    pub rel: String,
}

impl ProvidersPage {
    /// Number of the page after this one, if any
    pub fn next_page(&self) -> Option<u32> {
        if self.content.is_empty() || self.number_of_page >= self.total_pages {
            None
        } else {
            Some(self.number_of_page + 1)
        }
    }
}

/// A records document: either a single page or a bare list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordsDocument {
    Page(ProvidersPage),
    List(Vec<ProviderRecord>),
}

impl RecordsDocument {
    pub fn into_records(self) -> Vec<ProviderRecord> {
        match self {
            RecordsDocument::Page(page) => page.content,
            RecordsDocument::List(records) => records,
        }
    }
}

/// One entry of an identify response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdResponse {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub pid_type: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub resolution_modes: Vec<ResolutionModeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "size_of_page": 2,
        "number_of_page": 1,
        "total_elements": 3,
        "total_pages": 2,
        "content": [
            {
                "id": 1,
                "type": "ark",
                "name": "Archival Resource Key",
                "description": "ARK identifiers",
                "relies_on_dois": false,
                "resolution_modes": [
                    {"mode": "landingpage", "name": "Landing Page", "endpoints": []},
                    {"mode": "metadata", "name": "Metadata"}
                ],
                "regexes": ["^(a|A)(r|R)(k|K):(?:/\\d{5,9})+/[a-zA-Z\\d]+(-[a-zA-Z\\d]+)*$"],
                "user_id": null
            },
            {
                "id": 2,
                "type": "doi",
                "name": "DOI",
                "description": null,
                "relies_on_dois": true,
                "resolution_modes": [{"mode": "landingpage", "name": "Landing Page"}],
                "regexes": ["^(d|D)(o|O)(i|I):10\\.\\d+/.+$"],
                "status": "APPROVED",
                "examples": ["doi:10.3352/jeehp.2013.10.3"]
            }
        ],
        "links": [{"href": "/v1/providers?page=2&size=2", "rel": "next"}]
    }"#;

    #[test]
    fn test_parse_providers_page() {
        let page: ProvidersPage = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[0].pid_type, "ark");
        assert_eq!(page.content[0].resolution_modes[1].endpoints.len(), 0);
        assert_eq!(page.content[1].description, None);
        assert_eq!(page.content[1].status.as_deref(), Some("APPROVED"));
        assert_eq!(page.next_page(), Some(2));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let mut page: ProvidersPage = serde_json::from_str(PAGE).unwrap();
        page.number_of_page = 2;
        assert_eq!(page.next_page(), None);
        page.number_of_page = 1;
        page.content.clear();
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn test_records_document_accepts_list() {
        let json = r#"[{"type": "swh", "name": "Software Heritage", "regexes": ["^swh:.+$"]}]"#;
        let records = serde_json::from_str::<RecordsDocument>(json)
            .unwrap()
            .into_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].resolution_modes.is_empty());
    }

    #[test]
    fn test_parse_identify_response() {
        let json = r#"[
            {"status": "VALID", "type": "arxiv", "examples": ["arxiv:1512.00135"],
             "resolution_modes": [{"mode": "resource", "name": "Resource"}]},
            {"status": "INVALID", "type": "doi", "examples": []}
        ]"#;
        let responses: Vec<IdResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].resolution_modes[0].mode, "resource");
        assert!(responses[1].resolution_modes.is_empty());
    }
}
