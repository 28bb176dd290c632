//! HTTP client for the heatmap backend.
//!
//! All endpoints the sync engine consumes live here, including the
//! conditional (`If-None-Match`) dataset fetch that backs polling.

use anyhow::Result;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;

use crate::models::{MetaPayload, SearchSuggestion, ShowIdentity, ShowMetadata, ShowPayload};

/// Build the shared HTTP client. One instance is reused everywhere to get
/// connection pooling instead of per-call sockets.
pub fn build_http_client(timeout_seconds: u64) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Heatarr/0.1")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Outcome of a conditional dataset fetch. `NotModified` is a normal result
/// meaning "no new information", not an error and not an empty dataset.
#[derive(Debug)]
pub enum ShowFetch {
    NotModified,
    Fresh {
        payload: ShowPayload,
        /// New revalidation token, when the server sent one. Absence means
        /// the caller keeps whatever token it already holds.
        etag: Option<String>,
    },
}

/// Server-side refresh triggers. Fire-and-forget on the backend; the client
/// follows up with its own authoritative re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Missing,
    Show,
    Metadata,
}

impl RefreshKind {
    const fn path(self) -> &'static str {
        match self {
            Self::Missing => "/refresh/missing",
            Self::Show => "/refresh/show",
            Self::Metadata => "/refresh/metadata",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Clone)]
pub struct HeatmapClient {
    client: Client,
    base_url: String,
}

impl HeatmapClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// GET `/getShowMeta?imdbID=`, the fast metadata path.
    pub async fn show_meta(&self, id: &ShowIdentity) -> Result<ShowMetadata> {
        let url = format!(
            "{}/getShowMeta?imdbID={}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        self.fetch_meta(&url).await
    }

    /// GET `/getShowByTitle?title=`, a free-text fallback when no id is known.
    pub async fn show_meta_by_title(&self, title: &str) -> Result<ShowMetadata> {
        let url = format!(
            "{}/getShowByTitle?title={}",
            self.base_url,
            urlencoding::encode(title)
        );
        self.fetch_meta(&url).await
    }

    async fn fetch_meta(&self, url: &str) -> Result<ShowMetadata> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let payload: MetaPayload = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                anyhow::bail!("Heatmap API error: {status} - {body}")
            }
            Err(e) => anyhow::bail!("Malformed metadata payload: {e}"),
        };

        if let Some(error) = payload.error.as_deref() {
            anyhow::bail!("{error}");
        }
        if !status.is_success() {
            anyhow::bail!("Heatmap API error: {status}");
        }

        Ok(ShowMetadata::from(payload))
    }

    /// GET `/getShow?imdbID=&trackView=` with optional revalidation.
    ///
    /// Sends `If-None-Match` when an ETag is held and maps HTTP 304 to
    /// [`ShowFetch::NotModified`]. `track_view` is `1` only on the initial
    /// user-driven load; polls and refreshes pass `0` so they do not inflate
    /// the backend popularity counter.
    pub async fn fetch_show(
        &self,
        id: &ShowIdentity,
        track_view: bool,
        etag: Option<&str>,
    ) -> Result<ShowFetch> {
        let url = format!(
            "{}/getShow?imdbID={}&trackView={}",
            self.base_url,
            urlencoding::encode(id.as_str()),
            u8::from(track_view)
        );

        let mut request = self
            .client
            .get(&url)
            .header(header::CACHE_CONTROL, "no-cache");
        if let Some(tag) = etag {
            request = request.header(header::IF_NONE_MATCH, tag);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(ShowFetch::NotModified);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(&body) {
                anyhow::bail!("{error}");
            }
            anyhow::bail!("Heatmap API error: {status} - {body}");
        }

        let new_etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let payload: ShowPayload = response.json().await?;
        if let Some(error) = payload.error.as_deref() {
            anyhow::bail!("{error}");
        }

        Ok(ShowFetch::Fresh {
            payload,
            etag: new_etag,
        })
    }

    /// POST one of the `/refresh/*` triggers. The response body is ignored;
    /// progress is observed through the dataset flags afterwards.
    pub async fn trigger_refresh(&self, kind: RefreshKind, id: &ShowIdentity) -> Result<()> {
        let url = format!(
            "{}{}?imdbID={}",
            self.base_url,
            kind.path(),
            urlencoding::encode(id.as_str())
        );
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Refresh trigger failed: {status} - {body}");
        }

        Ok(())
    }

    /// GET `/search?q=` autocomplete proxy.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchSuggestion>> {
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Search failed: {status}");
        }

        let suggestions: Vec<SearchSuggestion> = response.json().await?;
        Ok(suggestions)
    }
}
