//! A peer reached over the depot HTTP interface.

use crate::error::{SyncError, SyncResult};
use crate::peer::{ItemList, Peer};
use async_trait::async_trait;
use depot_types::{IndexDefinition, Stamp, SyncSummary};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Credentials sent with every request.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: usize,
}

/// Peer backed by a remote depot service.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    name: String,
    base_url: String,
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpPeer {
    /// Default request timeout.
    pub const TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a peer for the service rooted at `base_url`.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            credentials: None,
        })
    }

    /// Sends basic-auth credentials with every request.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }

    /// Sends a request and maps non-success statuses to errors. A 404 is
    /// returned as `None` when `allow_missing` is set.
    async fn send(
        &self,
        request: RequestBuilder,
        allow_missing: bool,
    ) -> SyncResult<Option<Response>> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{}: request failed: {e}", self.name)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::NOT_FOUND && allow_missing {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::AuthRejected {
                peer: self.name.clone(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { detail: Value::String(s) }) => s,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) => body,
        };
        Err(SyncError::Http {
            peer: self.name.clone(),
            status: status.as_u16(),
            detail,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        let response = self
            .send(request, false)
            .await?
            .ok_or_else(|| {
                SyncError::Protocol(format!("{}: unexpected missing resource", self.name))
            })?;
        response
            .json()
            .await
            .map_err(|e| SyncError::Protocol(format!("{}: invalid response body: {e}", self.name)))
    }
}

#[async_trait]
impl Peer for HttpPeer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn summary(&self, bin: Option<&str>) -> SyncResult<SyncSummary> {
        let url = match bin {
            Some(bin) => self.url(&[bin, "_sync"]),
            None => self.url(&["_sync"]),
        };
        debug!(peer = %self.name, %url, "fetch summary");
        self.fetch(self.client.get(url)).await
    }

    async fn list_items(&self, bin: &str) -> SyncResult<ItemList> {
        let request = self
            .client
            .get(self.url(&[bin]))
            .query(&[("full", "1"), ("index", "1")]);
        self.fetch(request).await
    }

    async fn get_item(&self, bin: &str, id: &str) -> SyncResult<Option<Value>> {
        match self.send(self.client.get(self.url(&[bin, id])), true).await? {
            Some(response) => {
                let content = response
                    .json()
                    .await
                    .map_err(|e| {
                        SyncError::Protocol(format!("{}: invalid item body: {e}", self.name))
                    })?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    async fn put_item(&self, bin: &str, id: &str, content: &Value, stamp: Stamp) -> SyncResult<()> {
        let request = self
            .client
            .put(self.url(&[bin, id]))
            .query(&[("dttm", stamp.to_storage_string())])
            .json(content);
        self.send(request, false).await?;
        Ok(())
    }

    async fn delete_item(&self, bin: &str, id: &str, stamp: Stamp) -> SyncResult<()> {
        let request = self
            .client
            .delete(self.url(&[bin, id]))
            .query(&[("dttm", stamp.to_storage_string())]);
        self.send(request, false).await?;
        Ok(())
    }

    async fn put_index(&self, bin: &str, def: &IndexDefinition) -> SyncResult<()> {
        let request = self.client.put(self.url(&[bin, "_index"])).json(&def.to_json());
        self.send(request, false).await?;
        Ok(())
    }

    async fn cleanup(&self, days: u32) -> SyncResult<usize> {
        let request = self
            .client
            .get(self.url(&["_cleanup"]))
            .query(&[("days", days)]);
        let body: CountBody = self.fetch(request).await?;
        Ok(body.count)
    }
}
