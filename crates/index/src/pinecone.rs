use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{IndexError, IndexSpec, QueryMatch, QueryRequest, VectorIndex, VectorRecord};

pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_API_VERSION: &str = "2024-07";

/// Records per upsert request; the service caps request size.
const UPSERT_BATCH: usize = 100;

/// Connection settings for a Pinecone project.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub controller_url: String,
    pub api_version: String,
    /// Serverless placement used when the index has to be created.
    pub cloud: String,
    pub region: String,
    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            controller_url: DEFAULT_CONTROLLER_URL.into(),
            api_version: DEFAULT_API_VERSION.into(),
            cloud: "aws".into(),
            region: "us-east-1".into(),
            timeout_secs: 30,
        }
    }
}

impl PineconeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_controller_url(mut self, url: impl Into<String>) -> Self {
        self.controller_url = url.into();
        self
    }

    pub fn with_region(mut self, cloud: impl Into<String>, region: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self.region = region.into();
        self
    }
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &"<redacted>")
            .field("controller_url", &self.controller_url)
            .field("api_version", &self.api_version)
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// REST client for one serverless Pinecone index.
///
/// The data-plane host is resolved by [`create_index_if_missing`]; data calls
/// made before that fail with [`IndexError::NotInitialized`].
///
/// [`create_index_if_missing`]: VectorIndex::create_index_if_missing
pub struct PineconeIndex {
    client: reqwest::Client,
    cfg: PineconeConfig,
    host: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

impl PineconeIndex {
    pub fn new(cfg: PineconeConfig) -> Result<Self, IndexError> {
        if cfg.api_key.trim().is_empty() {
            return Err(IndexError::InvalidConfig(
                "Pinecone API key is not set".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| IndexError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            cfg,
            host: RwLock::new(None),
        })
    }

    /// Skip index discovery and talk to a known data-plane host.
    pub fn with_host(self, host: impl Into<String>) -> Self {
        if let Ok(mut guard) = self.host.write() {
            *guard = Some(normalize_host(&host.into()));
        }
        self
    }

    fn host(&self) -> Result<String, IndexError> {
        self.host
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .clone()
            .ok_or_else(|| {
                IndexError::NotInitialized("call create_index_if_missing first".into())
            })
    }

    fn set_host(&self, host: &str) -> Result<(), IndexError> {
        *self
            .host
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))? = Some(normalize_host(host));
        Ok(())
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.cfg.api_key)
            .header("X-Pinecone-API-Version", &self.cfg.api_version)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, IndexError> {
        let response = builder
            .send()
            .await
            .map_err(|e| IndexError::Http(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Http(format!("HTTP error {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| IndexError::Decode(e.to_string()))
    }

    fn controller(&self, path: &str) -> String {
        format!("{}{}", self.cfg.controller_url.trim_end_matches('/'), path)
    }

    async fn describe(&self, name: &str) -> Result<IndexDescription, IndexError> {
        let url = self.controller(&format!("/indexes/{name}"));
        self.send(self.request(reqwest::Method::GET, &url)).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn create_index_if_missing(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        let list: IndexList = self
            .send(self.request(reqwest::Method::GET, &self.controller("/indexes")))
            .await?;

        let mut host = list
            .indexes
            .into_iter()
            .find(|idx| idx.name == spec.name)
            .and_then(|idx| idx.host);

        if host.is_none() {
            tracing::info!(
                index = %spec.name,
                dimension = spec.dimension,
                metric = spec.metric.as_str(),
                "creating Pinecone index"
            );
            let body = json!({
                "name": spec.name,
                "dimension": spec.dimension,
                "metric": spec.metric.as_str(),
                "spec": { "serverless": { "cloud": self.cfg.cloud, "region": self.cfg.region } },
            });
            let created = self
                .request(reqwest::Method::POST, &self.controller("/indexes"))
                .json(&body)
                .send()
                .await
                .map_err(|e| IndexError::Http(format!("create index failed: {e}")))?;
            let status = created.status();
            if status.is_success() {
                host = created
                    .json::<IndexDescription>()
                    .await
                    .ok()
                    .and_then(|d| d.host);
            } else if status != reqwest::StatusCode::CONFLICT {
                let body = created.text().await.unwrap_or_default();
                return Err(IndexError::Http(format!("HTTP error {status}: {body}")));
            }
        }

        let host = match host.filter(|h| !h.is_empty()) {
            Some(host) => host,
            None => self
                .describe(&spec.name)
                .await?
                .host
                .filter(|h| !h.is_empty())
                .ok_or_else(|| {
                    IndexError::NotInitialized(format!("index `{}` has no host yet", spec.name))
                })?,
        };
        self.set_host(&host)
    }

    async fn upsert(
        &self,
        vectors: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<usize, IndexError> {
        let url = format!("{}/vectors/upsert", self.host()?);
        let mut written = 0;
        for batch in vectors.chunks(UPSERT_BATCH) {
            let body = json!({ "vectors": batch, "namespace": namespace });
            let response: UpsertResponse = self
                .send(self.request(reqwest::Method::POST, &url).json(&body))
                .await?;
            written += response.upserted_count.unwrap_or(batch.len());
        }
        Ok(written)
    }

    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<QueryMatch>, IndexError> {
        if request.top_k == 0 {
            return Ok(Vec::new());
        }
        let url = format!("{}/query", self.host()?);
        let body = json!({
            "vector": request.vector,
            "topK": request.top_k,
            "namespace": request.namespace,
            "includeMetadata": request.include_metadata,
            "includeValues": false,
        });
        let response: QueryResponse = self
            .send(self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        Ok(response
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete(&self, ids: &[String], namespace: &str) -> Result<(), IndexError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = format!("{}/vectors/delete", self.host()?);
        let body = json!({ "ids": ids, "namespace": namespace });
        let _: Value = self
            .send(self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        Ok(())
    }

    async fn count(&self, namespace: &str) -> Result<usize, IndexError> {
        let url = format!("{}/describe_index_stats", self.host()?);
        let stats: IndexStats = self
            .send(self.request(reqwest::Method::POST, &url).json(&json!({})))
            .await?;
        Ok(stats
            .namespaces
            .get(namespace)
            .map_or(0, |ns| ns.vector_count))
    }
}
