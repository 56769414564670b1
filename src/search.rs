use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::Elastic;
use crate::error::{ReconcileError, Result};

/// One retrieved log hit: the embedded event body plus the request id used
/// to join it against the other query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub payload: String,
    pub correlation_key: String,
}

impl LogRecord {
    pub fn new(correlation_key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            correlation_key: correlation_key.into(),
        }
    }
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one bounded query and return the non-empty hits in backend order.
    async fn search(&self, query: &str) -> Result<Vec<LogRecord>>;
}

#[derive(Clone)]
pub struct ElasticClient {
    http: Client,
    base_url: Url,
    index: String,
    max_hits: u32,
}

impl fmt::Debug for ElasticClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticClient")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl ElasticClient {
    pub fn new(host: &str, index: &str, max_hits: u32) -> Result<Self> {
        let base_url = parse_base_url(host)?;
        let http = Client::builder()
            .user_agent("promo-reconcile/0.1")
            .no_proxy()
            .build()
            .map_err(|err| {
                ReconcileError::BackendUnavailable(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            http,
            base_url,
            index: index.to_string(),
            max_hits,
        })
    }

    pub fn from_config(cfg: &Elastic) -> Result<Self> {
        Self::new(&cfg.host, &cfg.index, cfg.max_hits)
    }

    /// Build the client and check that the node answers before any query runs.
    pub async fn connect(cfg: &Elastic) -> Result<Self> {
        let client = Self::from_config(cfg)?;
        client.ping().await?;
        Ok(client)
    }

    pub async fn ping(&self) -> Result<()> {
        debug!(url=%self.base_url, "pinging elasticsearch");
        let res = self
            .http
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|err| unavailable("failed to reach elasticsearch", err))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ReconcileError::BackendUnavailable(format!(
                "elasticsearch health check returned {status}: {body}"
            )));
        }
        Ok(())
    }

    pub fn build_request(&self, query: &str) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(&format!("{}/_search", self.index))
            .map_err(|err| unavailable("invalid search endpoint", err))?;
        self.http
            .post(endpoint)
            .json(&build_search_body(query, self.max_hits))
            .build()
            .map_err(|err| unavailable("failed to build search request", err))
    }
}

#[async_trait]
impl SearchService for ElasticClient {
    async fn search(&self, query: &str) -> Result<Vec<LogRecord>> {
        let request = self.build_request(query)?;
        debug!(url=%request.url(), query, "sending search request");
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| unavailable("search request failed", err))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!("Elasticsearch error - Status: {}, Body: {}", status, body);
            return Err(ReconcileError::BackendUnavailable(format!(
                "search returned {status}: {body}"
            )));
        }

        let body: Value = res
            .json()
            .await
            .map_err(|err| unavailable("invalid search response", err))?;
        parse_search_response(body)
    }
}

/// Request body for a single page starting at offset 0.
pub fn build_search_body(query: &str, max_hits: u32) -> Value {
    json!({
        "query": { "query_string": { "query": query } },
        "from": 0,
        "size": max_hits,
    })
}

/// Turn a `_search` response into records, dropping hits that cannot be read
/// or carry an empty message.
pub fn parse_search_response(body: Value) -> Result<Vec<LogRecord>> {
    let envelope: SearchResponse = serde_json::from_value(body).map_err(|err| {
        ReconcileError::BackendUnavailable(format!("unexpected search response shape: {err}"))
    })?;

    if envelope.hits.total.count() == 0 {
        info!("no hits found for query");
        return Ok(Vec::new());
    }

    let mut records = Vec::with_capacity(envelope.hits.hits.len());
    for (position, hit) in envelope.hits.hits.into_iter().enumerate() {
        let Some(source) = hit.source else {
            warn!(position, id = ?hit.id, "hit without _source; skipping");
            continue;
        };
        match serde_json::from_value::<HitSource>(source) {
            Ok(src) => {
                if let Some(record) = src.into_record() {
                    records.push(record);
                }
            }
            Err(err) => warn!(position, id = ?hit.id, %err, "unparsable hit; skipping"),
        }
    }
    Ok(records)
}

fn parse_base_url(host: &str) -> Result<Url> {
    // `Url::join` drops the last path segment unless it ends with '/'.
    let normalized = if host.ends_with('/') {
        host.to_string()
    } else {
        format!("{host}/")
    };
    Url::parse(&normalized).map_err(|err| {
        ReconcileError::BackendUnavailable(format!("invalid elasticsearch host '{host}': {err}"))
    })
}

fn unavailable(context: &str, err: impl fmt::Display) -> ReconcileError {
    ReconcileError::BackendUnavailable(format!("{context}: {err}"))
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    total: TotalHits,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Elasticsearch 6 reports a bare number, 7+ an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl Default for TotalHits {
    fn default() -> Self {
        TotalHits::Count(0)
    }
}

impl TotalHits {
    fn count(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value } => *value,
        }
    }
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

#[derive(Deserialize)]
struct HitSource {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "requestId", default)]
    request_id: Option<String>,
    #[serde(rename = "RequestId", default)]
    request_id_alt: Option<String>,
}

impl HitSource {
    /// `RequestId` is used when `requestId` is missing or empty, so hits
    /// logged with either spelling join. Earlier versions of this report
    /// compared `requestId` only and gave such hits an empty key.
    fn into_record(self) -> Option<LogRecord> {
        let payload = self.message.filter(|m| !m.is_empty())?;
        let correlation_key = self
            .request_id
            .filter(|id| !id.is_empty())
            .or(self.request_id_alt)
            .unwrap_or_default();
        Some(LogRecord {
            payload,
            correlation_key,
        })
    }
}
