//! GitHub Actions repository variable used as a remote state mirror

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vote_herald_domain::{PublicationState, StateError, StateMirror};

/// Mirror storing the serialized state in one repository variable per legislature
pub struct GithubVariableMirror {
    client: Client,
    token: SecretString,
    base_url: String,
    owner: String,
    repo: String,
    variable_prefix: String,
}

impl GithubVariableMirror {
    pub fn new(token: SecretString, owner: String, repo: String, variable_prefix: String) -> Self {
        Self::with_base_url(
            token,
            "https://api.github.com".to_string(),
            owner,
            repo,
            variable_prefix,
        )
    }

    pub fn with_base_url(
        token: SecretString,
        base_url: String,
        owner: String,
        repo: String,
        variable_prefix: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("vote-herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner,
            repo,
            variable_prefix,
        }
    }

    /// Name of the variable holding the state of `legislature`
    pub fn variable_name(&self, legislature: &str) -> String {
        format!("{}{}", self.variable_prefix, legislature)
    }

    fn variable_url(&self, name: &str) -> String {
        format!(
            "{}/repos/{}/{}/actions/variables/{}",
            self.base_url, self.owner, self.repo, name
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

#[derive(Serialize, Deserialize)]
struct Variable {
    name: String,
    value: String,
}

#[async_trait]
impl StateMirror for GithubVariableMirror {
    async fn fetch(&self, legislature: &str) -> Result<Option<PublicationState>, StateError> {
        let name = self.variable_name(legislature);

        let response = self
            .authorized(self.client.get(self.variable_url(&name)))
            .send()
            .await
            .map_err(|e| StateError::Mirror(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(variable = %name, "State variable not found");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StateError::Mirror(format!(
                "Failed to read variable {} ({}): {}",
                name, status, body
            )));
        }

        let variable: Variable = response
            .json()
            .await
            .map_err(|e| StateError::Mirror(e.to_string()))?;

        if variable.value.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&variable.value)
            .map(Some)
            .map_err(|e| StateError::Serialization(format!("Variable {}: {}", name, e)))
    }

    async fn store(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError> {
        let name = self.variable_name(legislature);
        let value =
            serde_json::to_string(state).map_err(|e| StateError::Serialization(e.to_string()))?;

        let response = self
            .authorized(self.client.patch(self.variable_url(&name)))
            .json(&Variable {
                name: name.clone(),
                value,
            })
            .send()
            .await
            .map_err(|e| StateError::Mirror(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(variable = %name, status = %status, body = %body, "Failed to update state variable");
            return Err(StateError::Mirror(format!(
                "Failed to update variable {} ({}): {}",
                name, status, body
            )));
        }

        tracing::info!(variable = %name, votes = state.len(), "Updated state variable");
        Ok(())
    }
}
