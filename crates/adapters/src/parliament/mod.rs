//! Assembleia da República open-data adapter

mod feed;

pub use feed::FeedParser;

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use vote_herald_domain::{SourceError, VoteRecord, VoteSource};

/// Vote source reading the initiatives export of each legislature.
///
/// Feed locations are plain URLs, or `file://` paths for a locally saved
/// export.
pub struct ParliamentVoteSource {
    client: Client,
    feeds: HashMap<String, String>,
    parser: FeedParser,
}

impl ParliamentVoteSource {
    pub fn new(feeds: HashMap<String, String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            feeds,
            parser: FeedParser::new(),
        }
    }

    async fn fetch_body(&self, location: &str) -> Result<String, SourceError> {
        if let Some(path) = location.strip_prefix("file://") {
            return tokio::fs::read_to_string(path)
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read {}: {}", path, e)));
        }

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "Feed returned {}: {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))
    }
}

#[async_trait]
impl VoteSource for ParliamentVoteSource {
    async fn fetch_votes(&self, legislature: &str) -> Result<Vec<VoteRecord>, SourceError> {
        let location = self
            .feeds
            .get(legislature)
            .ok_or_else(|| SourceError::UnknownLegislature(legislature.to_string()))?;

        tracing::info!(legislature = %legislature, "Fetching initiatives");
        let body = self.fetch_body(location).await?;

        let votes = self.parser.parse(&body)?;
        tracing::info!(legislature = %legislature, count = votes.len(), "Parsed votes");

        Ok(votes)
    }
}
