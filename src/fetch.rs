use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ListResponse, RawItem};
use crate::collections::Collection;

/// Query parameters accepted by every collection list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn search(term: &str, limit: u32) -> Self {
        Self {
            search: Some(term.to_string()).filter(|s| !s.trim().is_empty()),
            page: Some(1),
            limit: Some(limit),
        }
    }
}

/// One backend source of catalog items. Implemented over HTTP for the real
/// service; the trait is the seam test doubles plug into.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    async fn fetch_list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<RawItem>>;
    async fn fetch_detail(&self, collection: Collection, slug: &str) -> Result<RawItem>;
}

/// Per-collection outcome of one fan-out cycle. Failures are values, not
/// propagated errors: a failing collection never short-circuits its
/// siblings.
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    pub collection: Collection,
    pub result: Result<Vec<RawItem>, String>,
}

/// Issue one list request per collection concurrently and collect all
/// outcomes in input order. Wall-clock time is bounded by the slowest
/// request, and network failure, timeout, non-2xx, and malformed bodies all
/// reduce to that collection's failure marker.
pub async fn fetch_all(
    backend: &dyn CollectionBackend,
    collections: &[Collection],
    query: &ListQuery,
) -> Vec<CollectionOutcome> {
    let requests = collections.iter().map(|&collection| async move {
        match backend.fetch_list(collection, query).await {
            Ok(items) => {
                debug!(collection = %collection, count = items.len(), "collection fetched");
                CollectionOutcome {
                    collection,
                    result: Ok(items),
                }
            }
            Err(e) => {
                warn!(collection = %collection, error = %format!("{e:#}"), "collection fetch failed");
                CollectionOutcome {
                    collection,
                    result: Err(format!("{e:#}")),
                }
            }
        }
    });
    join_all(requests).await
}

/// HTTP implementation over the catalog service: one GET endpoint per
/// collection, JSON bodies.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` applies per request; the backend cold-starts, so callers
    /// should leave generous room (20s default in `Config`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Validate early so a bad config fails at connect, not first search.
        Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
        let client = Client::builder()
            .user_agent(concat!("multiverse/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.as_str())
    }
}

#[async_trait]
impl CollectionBackend for HttpBackend {
    async fn fetch_list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<RawItem>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let url = self.endpoint(collection);
        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status from {url}"))?;
        let body: ListResponse = resp
            .json()
            .await
            .with_context(|| format!("malformed response body from {url}"))?;
        Ok(body.into_items())
    }

    async fn fetch_detail(&self, collection: Collection, slug: &str) -> Result<RawItem> {
        let url = format!("{}/{}", self.endpoint(collection), slug);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status from {url}"))?;
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("malformed response body from {url}"))?;

        // Some revisions wrap the item, some return it bare.
        let obj = ["result", "data", "item"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_object))
            .or_else(|| body.as_object());
        obj.cloned()
            .ok_or_else(|| anyhow!("detail response from {url} is not an object"))
    }
}
