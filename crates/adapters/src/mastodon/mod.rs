//! Mastodon API adapter for posting vote threads

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use vote_herald_domain::{DeliveryError, PostHandle, Poster, ThreadHandle};

/// Page size when listing the account's statuses
const STATUSES_PAGE_SIZE: u32 = 40;

/// How statuses are posted
#[derive(Debug, Clone)]
pub struct PostingOptions {
    pub visibility: String,
    /// Two-letter ISO 639-1 language tag
    pub language: String,
}

impl Default for PostingOptions {
    fn default() -> Self {
        Self {
            visibility: "unlisted".to_string(),
            language: "pt".to_string(),
        }
    }
}

/// Mastodon poster.
///
/// In dry-run mode nothing is sent: intended posts are logged and no handle
/// is returned.
pub struct MastodonPoster {
    client: Client,
    access_token: SecretString,
    base_url: String,
    options: PostingOptions,
    dry_run: bool,
}

impl MastodonPoster {
    pub fn new(access_token: SecretString, base_url: String, options: PostingOptions) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            dry_run: false,
        }
    }

    /// Create a poster that only logs (for dry-run)
    pub fn dry_run() -> Self {
        Self {
            client: Client::new(),
            access_token: SecretString::new("".into()),
            base_url: String::new(),
            options: PostingOptions::default(),
            dry_run: true,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            "Authorization",
            format!("Bearer {}", self.access_token.expose_secret()),
        )
    }

    async fn create_status(
        &self,
        text: &str,
        in_reply_to_id: Option<&str>,
        idempotency_key: &str,
    ) -> Result<StatusResponse, DeliveryError> {
        let request = CreateStatusRequest {
            status: text,
            visibility: &self.options.visibility,
            language: &self.options.language,
            in_reply_to_id,
        };

        let response = self
            .authorized(self.client.post(format!("{}/api/v1/statuses", self.base_url)))
            .header("Idempotency-Key", idempotency_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| DeliveryError::Api(e.to_string()))
    }

    /// Look up the account the access token belongs to
    pub async fn verify_credentials(&self) -> Result<Account, DeliveryError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/api/v1/accounts/verify_credentials", self.base_url)),
            )
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::Api(e.to_string()))
    }

    /// List the account's statuses created at or after `since`, newest first
    pub async fn recent_statuses(
        &self,
        account_id: &str,
        since: OffsetDateTime,
    ) -> Result<Vec<StatusSummary>, DeliveryError> {
        let mut statuses = Vec::new();
        let mut max_id: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/api/v1/accounts/{}/statuses?limit={}",
                self.base_url, account_id, STATUSES_PAGE_SIZE
            );
            if let Some(max_id) = &max_id {
                url.push_str(&format!("&max_id={}", max_id));
            }

            let response = self
                .authorized(self.client.get(&url))
                .send()
                .await
                .map_err(|e| DeliveryError::Network(e.to_string()))?;

            let page: Vec<StatusSummary> = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| DeliveryError::Api(e.to_string()))?;

            let Some(last) = page.last() else {
                break;
            };
            max_id = Some(last.id.clone());

            let page_len = page.len();
            let mut reached_older = false;
            for status in page {
                if status.created_at >= since {
                    statuses.push(status);
                } else {
                    reached_older = true;
                }
            }

            if reached_older || page_len < STATUSES_PAGE_SIZE as usize {
                break;
            }
        }

        Ok(statuses)
    }

    /// Delete one of the account's statuses
    pub async fn delete_status(&self, status_id: &str) -> Result<(), DeliveryError> {
        let response = self
            .authorized(
                self.client
                    .delete(format!("{}/api/v1/statuses/{}", self.base_url, status_id)),
            )
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, DeliveryError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(DeliveryError::Auth("Invalid access token".to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(DeliveryError::RateLimited),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
        _ => Ok(response),
    }
}

#[derive(Serialize)]
struct CreateStatusRequest<'a> {
    status: &'a str,
    visibility: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    account: Account,
    #[serde(default)]
    mentions: Vec<Mention>,
}

/// Account a status belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub acct: String,
    #[serde(default)]
    pub statuses_count: u64,
}

#[derive(Debug, Deserialize)]
struct Mention {
    acct: String,
}

/// A status listed from the account's timeline
#[derive(Debug, Clone, Deserialize)]
pub struct StatusSummary {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
impl Poster for MastodonPoster {
    async fn start_thread(
        &self,
        text: &str,
        idempotency_key: &str,
    ) -> Result<Option<ThreadHandle>, DeliveryError> {
        if self.dry_run {
            tracing::info!(idempotency_key = %idempotency_key, text = %text, "[DRY RUN] Would start thread");
            return Ok(None);
        }

        let status = self.create_status(text, None, idempotency_key).await?;
        tracing::debug!(
            status_id = %status.id,
            account = %status.account.acct,
            mentions = ?status.mentions.iter().map(|m| &m.acct).collect::<Vec<_>>(),
            "Started thread"
        );

        Ok(Some(ThreadHandle { id: status.id }))
    }

    async fn post_reply(
        &self,
        text: &str,
        thread: Option<&ThreadHandle>,
        idempotency_key: &str,
    ) -> Result<Option<PostHandle>, DeliveryError> {
        if self.dry_run {
            tracing::info!(idempotency_key = %idempotency_key, text = %text, "[DRY RUN] Would post reply");
            return Ok(None);
        }

        let in_reply_to_id = thread.map(|t| t.id.as_str());
        let status = self
            .create_status(text, in_reply_to_id, idempotency_key)
            .await?;

        Ok(Some(PostHandle {
            id: status.id,
            url: status.url,
        }))
    }
}
