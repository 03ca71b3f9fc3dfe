//! Web lookup collaborator for the researcher stage.
//!
//! Uses the DuckDuckGo instant answer API (no API key required). The result
//! is a plain text blob: the researcher embeds it directly in its prompt and
//! quotes it in substitute claims, so no structured result type is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::LookupError;

/// A web-search backend returning a plain-text result blob.
#[async_trait]
pub trait WebLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, LookupError>;
}

/// DuckDuckGo instant-answer search.
pub struct DuckDuckGoLookup {
    client: Client,
    max_results: usize,
}

impl DuckDuckGoLookup {
    /// Create a new lookup from configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| LookupError::RequestFailed {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebLookup for DuckDuckGoLookup {
    async fn search(&self, query: &str) -> Result<String, LookupError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::RequestFailed {
                message: format!("Search request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| LookupError::ResponseParse {
            message: format!("Failed to parse search response: {}", e),
        })?;

        let results = collect_results(&body, self.max_results);
        if results.is_empty() {
            Ok(format!(
                "No instant answers found for \"{}\". Try refining the query.",
                query
            ))
        } else {
            Ok(format!(
                "Search results for \"{}\":\n\n{}",
                query,
                results.join("\n\n")
            ))
        }
    }
}

/// Pull the abstract, related topics, and direct results out of an instant
/// answer response, keeping at most `max_results` snippets.
fn collect_results(body: &Value, max_results: usize) -> Vec<String> {
    let mut results = Vec::new();

    // Abstract (main answer)
    if let Some(abstract_text) = body.get("AbstractText").and_then(|v| v.as_str()) {
        if !abstract_text.is_empty() {
            let source = body
                .get("AbstractSource")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown");
            let url = body
                .get("AbstractURL")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            results.push(format!("[{}] {}\n  URL: {}", source, abstract_text, url));
        }
    }

    // Related topics
    if let Some(topics) = body.get("RelatedTopics").and_then(|v| v.as_array()) {
        for topic in topics
            .iter()
            .take(max_results.saturating_sub(results.len()))
        {
            if let Some(text) = topic.get("Text").and_then(|v| v.as_str()) {
                let url = topic.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
                results.push(format!("- {}\n  URL: {}", text, url));
            }
        }
    }

    // Direct results
    if let Some(res_array) = body.get("Results").and_then(|v| v.as_array()) {
        for result in res_array
            .iter()
            .take(max_results.saturating_sub(results.len()))
        {
            if let Some(text) = result.get("Text").and_then(|v| v.as_str()) {
                let url = result.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
                results.push(format!("- {}\n  URL: {}", text, url));
            }
        }
    }

    results
}

/// Scripted lookup for tests: returns a fixed reply and records queries.
pub struct MockLookup {
    reply: Result<String, LookupError>,
    queries: Mutex<Vec<String>>,
}

impl MockLookup {
    /// A lookup that always succeeds with the given text.
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A lookup that always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(LookupError::RequestFailed {
                message: message.into(),
            }),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebLookup for MockLookup {
    async fn search(&self, query: &str) -> Result<String, LookupError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.reply.clone()
    }
}
