//! Spike REST API client.
//!
//! Every request carries the account-wide `x-api-key` header. Team-scoped
//! requests also carry `x-team-id`, which selects the team whose incidents
//! and users are visible.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ReportConfig, TeamContext};
use crate::error::{Result, SpikeError};
use crate::models::{incident_values, team_values, Incident, TeamSummary, User};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Header selecting the team.
const TEAM_ID_HEADER: &str = "x-team-id";

/// Looks up users by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one user as seen by `team`.
    async fn fetch_user(&self, user_id: &str, team: &TeamContext) -> Result<User>;
}

/// Lists incidents for a team.
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    /// Fetch every incident visible to `team`.
    async fn list_incidents(&self, team: &TeamContext) -> Result<Vec<Incident>>;
}

/// Spike API client.
#[derive(Debug, Clone)]
pub struct SpikeClient {
    /// HTTP client.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// Base URL without trailing slash.
    base_url: String,
}

impl SpikeClient {
    /// Create a client for `base_url` using the default request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(
            api_key,
            base_url,
            std::time::Duration::from_secs(crate::config::DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    /// Create a client with an explicit request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_timeout(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the resolved configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        Self::with_timeout(&config.api_key, &config.api_url, config.http_timeout)
    }

    /// Build an authenticated GET request.
    fn get(&self, path: &str, team: Option<&TeamContext>) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, team = team.map(|t| t.name.as_str()), "GET request");

        let request = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json");

        match team {
            Some(team) => request.header(TEAM_ID_HEADER, &team.id),
            None => request,
        }
    }

    /// Send a request and decode the JSON body, mapping non-success statuses to errors.
    async fn fetch_json(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, "Failed to parse response");
                SpikeError::Serialization(e)
            })
        } else {
            Err(SpikeError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// List every team the API key can see.
    ///
    /// # Errors
    /// Returns error if the request fails or the API rejects it.
    pub async fn list_teams(&self) -> Result<Vec<TeamSummary>> {
        let body = self.fetch_json(self.get("/teams/get-all-teams", None)).await?;

        Ok(team_values(body)
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(team) => Some(team),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable team");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl UserDirectory for SpikeClient {
    async fn fetch_user(&self, user_id: &str, team: &TeamContext) -> Result<User> {
        let body = self
            .fetch_json(self.get(&format!("/users/{user_id}"), Some(team)))
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl IncidentFeed for SpikeClient {
    async fn list_incidents(&self, team: &TeamContext) -> Result<Vec<Incident>> {
        let body = self.fetch_json(self.get("/incidents", Some(team))).await?;

        let incidents: Vec<Incident> = incident_values(body)
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(incident) => Some(incident),
                Err(e) => {
                    warn!(team = %team.name, error = %e, "Skipping undecodable incident");
                    None
                }
            })
            .collect();

        debug!(team = %team.name, count = incidents.len(), "Fetched incidents");
        Ok(incidents)
    }
}
