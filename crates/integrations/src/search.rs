use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slotdesk_core::errors::{BookingError, BookingResult};
use slotdesk_core::ports::KnowledgeSearch;
use tracing::debug;

use crate::config::SearchConfig;
use crate::{check_status, request_failed};

const SERVICE: &str = "Azure Search";

#[derive(Debug, Serialize)]
pub struct SearchRequest {
    pub search: String,
    pub top: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub value: Vec<SearchDocument>,
}

/// Indexed pages carry their text in `content` or, in older indexes, `text`.
#[derive(Debug, Deserialize)]
pub struct SearchDocument {
    pub content: Option<String>,
    pub text: Option<String>,
}

impl SearchResponse {
    pub fn into_texts(self) -> Vec<String> {
        self.value
            .into_iter()
            .filter_map(|doc| doc.content.or(doc.text))
            .filter(|text| !text.trim().is_empty())
            .collect()
    }
}

/// Full-text queries against an Azure Cognitive Search index.
pub struct AzureSearch {
    config: SearchConfig,
    http: Client,
}

impl AzureSearch {
    pub fn new(config: SearchConfig, http: Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl KnowledgeSearch for AzureSearch {
    async fn search(&self, query: &str, top: usize) -> BookingResult<Vec<String>> {
        let response = self
            .http
            .post(self.config.search_url())
            .header("api-key", &self.config.api_key)
            .json(&SearchRequest {
                search: query.to_string(),
                top,
            })
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        let results: SearchResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| BookingError::Upstream(format!("Invalid search response: {}", e)))?;
        let texts = results.into_texts();
        debug!("Search for {:?} returned {} documents", query, texts.len());
        Ok(texts)
    }
}
