use std::{collections::HashSet, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{error::SyncError, session::Session};
use crate::auth::dto::{
    AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest, RegisterRequest,
};
use crate::goals::{
    dto::{GoalCreate, GoalUpdate, SavedAmountUpdate},
    Goal, GoalCategory, GoalSummary,
};

const API_PREFIX: &str = "/api/v1";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Largest page the server hands out for `GET /goals`.
const PAGE_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let base_url = std::env::var("GOALPLANNER_API_URL").unwrap_or(defaults.base_url);
        let timeout_seconds = match std::env::var("GOALPLANNER_API_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("GOALPLANNER_API_TIMEOUT_SECS is not a number: {raw}"))?,
            Err(_) => defaults.timeout_seconds,
        };
        Ok(Self {
            base_url,
            timeout_seconds,
        })
    }
}

/// The goals endpoints the synchronization layer depends on.
#[async_trait]
pub trait GoalsApi: Send + Sync {
    /// Every goal of the current user, optionally restricted to one category.
    async fn list(&self, category: Option<GoalCategory>) -> Result<Vec<Goal>, SyncError>;
    async fn summary(&self) -> Result<GoalSummary, SyncError>;
    async fn create(&self, data: &GoalCreate) -> Result<Goal, SyncError>;
    async fn update(&self, id: Uuid, data: &GoalUpdate) -> Result<Goal, SyncError>;
    async fn update_saved(&self, id: Uuid, amount: f64) -> Result<Goal, SyncError>;
    async fn delete(&self, id: Uuid) -> Result<(), SyncError>;
}

/// `GoalsApi` over HTTP, authenticated with the session's bearer token.
#[derive(Debug, Clone)]
pub struct HttpGoalsApi {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpGoalsApi {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn token(&self) -> Result<String, SyncError> {
        self.session.access_token().ok_or(SyncError::Unauthenticated)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "api error response");
            return Err(SyncError::from_status(status, body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn post_auth<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<PublicUser, SyncError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let auth: AuthResponse = Self::parse(response).await?;
        let user = auth.user.clone();
        self.session.init(auth);
        Ok(user)
    }

    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<PublicUser, SyncError> {
        let body = RegisterRequest {
            email: email.into(),
            display_name: display_name.into(),
            password: password.into(),
        };
        self.post_auth("/auth/register", &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, SyncError> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        self.post_auth("/auth/login", &body).await
    }

    /// Swaps the stored refresh token for a new pair. A rejected refresh
    /// clears the session.
    pub async fn refresh(&self) -> Result<PublicUser, SyncError> {
        let refresh_token = self.session.refresh_token().ok_or(SyncError::Unauthenticated)?;
        let result = self
            .post_auth("/auth/refresh", &RefreshRequest { refresh_token })
            .await;
        if matches!(result, Err(SyncError::Unauthenticated)) {
            self.session.reset();
        }
        result
    }

    /// Revokes the access token server-side. The local session is cleared
    /// whatever the server answers.
    pub async fn logout(&self) -> Result<(), SyncError> {
        let result = match self.token() {
            Ok(token) => {
                let sent = self
                    .client
                    .post(self.url("/auth/logout"))
                    .bearer_auth(token)
                    .send()
                    .await;
                match sent {
                    Ok(response) => Self::parse::<MessageResponse>(response).await.map(|_| ()),
                    Err(e) => Err(e.into()),
                }
            }
            Err(_) => Ok(()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "logout request failed");
        }
        self.session.reset();
        result
    }

    async fn list_page(
        &self,
        token: &str,
        category: Option<GoalCategory>,
        skip: usize,
    ) -> Result<Vec<Goal>, SyncError> {
        let mut query = vec![("skip", skip.to_string()), ("limit", PAGE_LIMIT.to_string())];
        if let Some(c) = category {
            query.push(("category", c.as_str().to_string()));
        }
        let response = self
            .client
            .get(self.url("/goals"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;
        Self::parse(response).await
    }
}

/// Appends the goals of `page` not collected yet, keeping server order.
///
/// Pages are offset-based over newest-first rows, so a goal created between
/// two requests pushes an already-seen goal onto the next page. A goal
/// deleted between requests can likewise hide one until the next refetch.
fn merge_page(goals: &mut Vec<Goal>, seen: &mut HashSet<Uuid>, page: Vec<Goal>) {
    goals.extend(page.into_iter().filter(|g| seen.insert(g.id)));
}

#[async_trait]
impl GoalsApi for HttpGoalsApi {
    async fn list(&self, category: Option<GoalCategory>) -> Result<Vec<Goal>, SyncError> {
        let token = self.token()?;
        let mut goals = Vec::new();
        let mut seen = HashSet::new();
        let mut skip = 0;
        loop {
            let page = self.list_page(&token, category, skip).await?;
            let last = page.len() < PAGE_LIMIT;
            skip += page.len();
            merge_page(&mut goals, &mut seen, page);
            if last {
                break;
            }
        }
        debug!(count = goals.len(), category = ?category, "goals fetched");
        Ok(goals)
    }

    async fn summary(&self) -> Result<GoalSummary, SyncError> {
        let response = self
            .client
            .get(self.url("/goals/summary"))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn create(&self, data: &GoalCreate) -> Result<Goal, SyncError> {
        let response = self
            .client
            .post(self.url("/goals"))
            .bearer_auth(self.token()?)
            .json(data)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn update(&self, id: Uuid, data: &GoalUpdate) -> Result<Goal, SyncError> {
        let response = self
            .client
            .patch(self.url(&format!("/goals/{id}")))
            .bearer_auth(self.token()?)
            .json(data)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn update_saved(&self, id: Uuid, amount: f64) -> Result<Goal, SyncError> {
        let response = self
            .client
            .patch(self.url(&format!("/goals/{id}/saved")))
            .bearer_auth(self.token()?)
            .json(&SavedAmountUpdate { amount })
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.url(&format!("/goals/{id}")))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::from_status(status, body))
    }
}
