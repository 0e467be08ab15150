//! Backend data API client
//!
//! Every application gets its own `AppClient`, created lazily and cached
//! for the process lifetime. The cached clients hold no credentials: the
//! caller's token and notify flag travel with each request as a `Scope`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{RequestBuilder, Response, Url};
use serde_json::{Map, Value};
use tracing::debug;

use crate::messaging::Message;
use crate::utils::error::ApiError;

pub const NOTIFY_HEADER: &str = "X-Realtime-Notify";

/// Who a backend request is made for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub app: String,
    pub token: String,
    pub notify: bool,
}

impl Scope {
    /// The scope a message's call runs under.
    pub fn of(message: &Message) -> Self {
        Self {
            app: message.app.clone(),
            token: message.token.clone(),
            notify: message.notify(),
        }
    }
}

/// CRUD over one entity type of one application.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn get_item(&self, scope: &Scope, kind: &str, id: &str) -> Result<Value, ApiError>;

    async fn get_items(&self, scope: &Scope, kind: &str) -> Result<Value, ApiError>;

    /// Returns the created record, including its `_id`.
    async fn create_item(
        &self,
        scope: &Scope,
        kind: &str,
        item: &Map<String, Value>,
    ) -> Result<Value, ApiError>;

    async fn update_item(
        &self,
        scope: &Scope,
        kind: &str,
        id: &str,
        item: &Map<String, Value>,
    ) -> Result<(), ApiError>;

    async fn delete_item(&self, scope: &Scope, kind: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug)]
pub struct AppClient {
    http: reqwest::Client,
    api_url: Url,
    app: String,
}

impl AppClient {
    fn new(http: reqwest::Client, api_url: &Url, app: &str) -> Self {
        Self {
            http,
            api_url: api_url.clone(),
            app: app.to_string(),
        }
    }

    /// `{api_url}/v1/app/{app}/data/{segments..}`, each caller-supplied
    /// segment percent-encoded so it cannot leave the app's routes. Empty,
    /// `.` and `..` segments are rejected.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let caller = std::iter::once(self.app.as_str()).chain(segments.iter().copied());
        for segment in caller {
            if matches!(segment, "" | "." | "..") {
                return Err(ApiError::InvalidSegment(segment.to_string()));
            }
        }

        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v1", "app", self.app.as_str(), "data"])
                .extend(segments);
        }
        Ok(url)
    }

    fn collection(&self, kind: &str) -> Result<Url, ApiError> {
        self.url(&[kind])
    }

    fn item(&self, kind: &str, id: &str) -> Result<Url, ApiError> {
        self.url(&[kind, id])
    }

    async fn send(&self, request: RequestBuilder, scope: &Scope) -> Result<Response, ApiError> {
        let response = request
            .bearer_auth(&scope.token)
            .header(NOTIFY_HEADER, scope.notify.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// `DataApi` over HTTP.
#[derive(Debug)]
pub struct HttpDataApi {
    http: reqwest::Client,
    api_url: Url,
    apps: DashMap<String, Arc<AppClient>>,
}

impl HttpDataApi {
    /// Fails unless `api_url` is an absolute http(s) URL.
    pub fn new(api_url: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Like [`HttpDataApi::new`], sharing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, api_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{api_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_url.to_string()));
        }
        Ok(Self {
            http,
            api_url: parsed,
            apps: DashMap::new(),
        })
    }

    /// The cached client for `app`, built on first use.
    pub fn app(&self, app: &str) -> Arc<AppClient> {
        if let Some(client) = self.apps.get(app) {
            return client.clone();
        }
        self.apps
            .entry(app.to_string())
            .or_insert_with(|| {
                debug!(app, "creating api client");
                Arc::new(AppClient::new(self.http.clone(), &self.api_url, app))
            })
            .clone()
    }

    /// Number of applications with a cached client.
    pub fn cached_apps(&self) -> usize {
        self.apps.len()
    }
}

#[async_trait]
impl DataApi for HttpDataApi {
    async fn get_item(&self, scope: &Scope, kind: &str, id: &str) -> Result<Value, ApiError> {
        let client = self.app(&scope.app);
        let request = client.http.get(client.item(kind, id)?);
        Ok(client.send(request, scope).await?.json().await?)
    }

    async fn get_items(&self, scope: &Scope, kind: &str) -> Result<Value, ApiError> {
        let client = self.app(&scope.app);
        let request = client.http.get(client.collection(kind)?);
        Ok(client.send(request, scope).await?.json().await?)
    }

    async fn create_item(
        &self,
        scope: &Scope,
        kind: &str,
        item: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let client = self.app(&scope.app);
        let request = client.http.post(client.collection(kind)?).json(item);
        Ok(client.send(request, scope).await?.json().await?)
    }

    async fn update_item(
        &self,
        scope: &Scope,
        kind: &str,
        id: &str,
        item: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        let client = self.app(&scope.app);
        let request = client.http.put(client.item(kind, id)?).json(item);
        client.send(request, scope).await?;
        Ok(())
    }

    async fn delete_item(&self, scope: &Scope, kind: &str, id: &str) -> Result<(), ApiError> {
        let client = self.app(&scope.app);
        let request = client.http.delete(client.item(kind, id)?);
        client.send(request, scope).await?;
        Ok(())
    }
}
