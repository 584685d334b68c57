use std::{collections::BTreeMap, time::Duration};

use {
    anyhow::Context,
    async_trait::async_trait,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::{debug, warn},
    url::Url,
    weblib_common::{BackendError, Item, LoginRequest, SessionApi, SessionResult, StatusReply},
    weblib_config::BackendConfig,
};

use crate::session_store::SessionStore;

#[cfg(feature = "metrics")]
use weblib_metrics::{backend as backend_metrics, counter, histogram, labels};

pub const LOGIN_PATH: &str = "/api/users/login";
pub const LOGOUT_PATH: &str = "/api/users/logout";
pub const SAVE_PATH: &str = "/api/item/save";
pub const UNSAVE_PATH: &str = "/api/item/unsave";
pub const RECENT_VIEWED_PATH: &str = "/api/recent/viewed";
pub const SEARCH_PATH: &str = "/api/browse/search";

/// Default number of results asked of the search endpoint.
pub const DEFAULT_NUM_RESULTS: u32 = 5;

/// Body of `POST /api/browse/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub num_results: u32,
    /// Filter form values keyed by filter name (e.g. `source => wikipedia`).
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: DEFAULT_NUM_RESULTS,
            filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    // Older backends answered with `result`.
    #[serde(default, alias = "result")]
    results: Option<Vec<Item>>,
}

#[derive(Debug, Serialize)]
struct ItemRequest<'a> {
    item_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    csrf_token: Option<&'a str>,
}

/// HTTP client for the weblib backend.
///
/// Keeps a cookie store so the session established by `login` is sent with
/// later item requests. Built from config, the store is saved to disk after a
/// successful login and removed on logout.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    csrf_token: Option<String>,
    session: SessionStore,
}

impl HttpBackend {
    /// Client whose session lasts only as long as the process.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_session(base_url, timeout, SessionStore::in_memory())
    }

    pub fn with_session(
        base_url: &str,
        timeout: Duration,
        session: SessionStore,
    ) -> anyhow::Result<Self> {
        Url::parse(base_url).with_context(|| format!("invalid backend URL '{base_url}'"))?;
        let client = reqwest::Client::builder()
            .cookie_provider(session.jar())
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
            session,
        })
    }

    /// Client that resumes the session saved by an earlier `login`.
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let session = match config.session_path() {
            Some(path) => SessionStore::open(path),
            None => {
                warn!("no config directory, the login session will not be kept");
                SessionStore::in_memory()
            },
        };
        let backend = Self::with_session(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
            session,
        )?;
        Ok(match &config.csrf_token {
            Some(token) => backend.with_csrf_token(token.clone()),
            None => backend,
        })
    }

    /// Echo `token` as `csrf_token` in item request bodies.
    #[must_use]
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B, R>(&self, path: &'static str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(backend_metrics::REQUESTS_TOTAL, labels::ENDPOINT => path).increment(1);

        let result = self.send_json(path, body).await;

        #[cfg(feature = "metrics")]
        {
            histogram!(backend_metrics::REQUEST_DURATION_SECONDS, labels::ENDPOINT => path)
                .record(started.elapsed().as_secs_f64());
            if result.is_err() {
                counter!(backend_metrics::REQUEST_ERRORS_TOTAL, labels::ENDPOINT => path)
                    .increment(1);
            }
        }
        result
    }

    async fn send_json<B, R>(&self, path: &'static str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "backend request");
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        Ok(resp.json().await?)
    }

    async fn item_action(&self, path: &'static str, item_id: &str) -> Result<(), BackendError> {
        let body = ItemRequest {
            item_id,
            csrf_token: self.csrf_token.as_deref(),
        };
        let reply: StatusReply = self.post_json(path, &body).await?;
        if reply.status {
            Ok(())
        } else {
            Err(BackendError::Rejected(
                reply.error.unwrap_or_else(|| "request was not accepted".into()),
            ))
        }
    }

    /// Add an item to the user's saved list.
    pub async fn save(&self, item_id: &str) -> Result<(), BackendError> {
        self.item_action(SAVE_PATH, item_id).await
    }

    /// Remove an item from the user's saved list.
    pub async fn unsave(&self, item_id: &str) -> Result<(), BackendError> {
        self.item_action(UNSAVE_PATH, item_id).await
    }

    /// Record that the user opened an item. Failures are only logged.
    pub async fn record_view(&self, item_id: &str) {
        let body = ItemRequest {
            item_id,
            csrf_token: self.csrf_token.as_deref(),
        };
        if let Err(e) = self
            .post_json::<_, serde_json::Value>(RECENT_VIEWED_PATH, &body)
            .await
        {
            warn!(item_id, error = %e, "failed to record recently viewed item");
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Item>, BackendError> {
        let resp: SearchResponse = self.post_json(SEARCH_PATH, query).await?;
        resp.results.ok_or(BackendError::MissingResults)
    }

    async fn end_session(&self) -> Result<(), BackendError> {
        let resp = self.client.get(self.url(LOGOUT_PATH)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionApi for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<SessionResult, BackendError> {
        let result: SessionResult = self.post_json(LOGIN_PATH, request).await?;
        if result.status {
            if let Err(e) = self.session.persist().await {
                warn!(error = %e, "could not save the login session");
            }
        }
        Ok(result)
    }

    /// End the backend session. The local cookie copy is dropped even when the
    /// request fails.
    async fn logout(&self) -> Result<(), BackendError> {
        let outcome = self.end_session().await;
        if let Err(e) = self.session.clear().await {
            warn!(error = %e, "could not remove the saved session");
        }
        outcome
    }
}
