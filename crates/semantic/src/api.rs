use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::DEFAULT_OPENAI_EMBEDDINGS_URL;
use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingProvider, SemanticConfig, SemanticError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiProviderKind {
    OpenAI,
    HuggingFace,
    Custom,
}

/// Embedding provider backed by a remote HTTP endpoint.
///
/// One request per [`embed`](EmbeddingProvider::embed) call, no retries.
#[derive(Debug, Clone)]
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    provider: ApiProviderKind,
    api_key: String,
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl ApiEmbedder {
    pub fn new(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let api_key = cfg
            .api_key()
            .ok_or_else(|| SemanticError::Unavailable("no API key configured".into()))?
            .to_string();
        let provider = api_provider_kind(cfg);
        let url = match (cfg.api_url.as_deref(), provider) {
            (Some(url), _) => url.to_string(),
            (None, ApiProviderKind::OpenAI) => DEFAULT_OPENAI_EMBEDDINGS_URL.to_string(),
            (None, _) => {
                return Err(SemanticError::InvalidConfig(
                    "api_url is required for non-OpenAI providers".into(),
                ))
            }
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            provider,
            api_key,
            model_name: cfg.model_name.clone(),
            dimension: cfg.dimension,
            normalize: cfg.normalize,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmbeddingProvider for ApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let payload = build_api_payload(self.provider, texts, &self.model_name);
        let response = send_api_request(&self.client, &self.url, &self.api_key, payload).await?;
        let mut vectors = parse_embeddings_from_value(response)?;

        if vectors.len() != texts.len() {
            return Err(SemanticError::Inference(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in vectors.iter_mut() {
            if vector.len() != self.dimension {
                return Err(SemanticError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
            if self.normalize {
                l2_normalize_in_place(vector);
            }
        }

        tracing::debug!(
            model = %self.model_name,
            count = vectors.len(),
            "embedded batch via API"
        );
        Ok(vectors)
    }
}

pub(crate) fn api_provider_kind(cfg: &SemanticConfig) -> ApiProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("openai")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

pub(crate) fn build_api_payload(
    provider: ApiProviderKind,
    texts: &[String],
    model_name: &str,
) -> Value {
    match provider {
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": model_name }),
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::Custom => json!({ "texts": texts, "model": model_name }),
    }
}

async fn send_api_request(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: Value,
) -> Result<Value, SemanticError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|e| SemanticError::Http(format!("HTTP request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SemanticError::Http(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SemanticError::Inference(format!("Invalid JSON response: {e}")))
}

/// Accepts the OpenAI shape (`data[].embedding`, ordered by `data[].index`),
/// a top-level `embeddings` array, or a bare array of vectors.
pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut indexed = Vec::with_capacity(items.len());
                for (position, item) in items.into_iter().enumerate() {
                    let Value::Object(mut obj) = item else {
                        return Err(SemanticError::Inference(
                            "unexpected entry inside `data` array".into(),
                        ));
                    };
                    let embedding = obj.remove("embedding").ok_or_else(|| {
                        SemanticError::Inference("missing `embedding` field in data item".into())
                    })?;
                    let index = obj
                        .get("index")
                        .and_then(Value::as_u64)
                        .map(|i| i as usize)
                        .unwrap_or(position);
                    indexed.push((index, parse_embedding_vector(embedding)?));
                }
                indexed.sort_by_key(|(index, _)| *index);
                return Ok(indexed.into_iter().map(|(_, v)| v).collect());
            }

            Err(SemanticError::Inference(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
