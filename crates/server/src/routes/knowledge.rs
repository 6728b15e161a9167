use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Query, State};
use axum::Json;
use knowledge::{KnowledgeStore, RetrievalMatch, UpsertReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Largest `k` accepted by the search endpoint.
const MAX_SEARCH_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub docs: Vec<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub namespace: String,
    pub results: Vec<RetrievalMatch>,
}

fn enabled(store: &KnowledgeStore) -> ServerResult<()> {
    match store.disabled_reason() {
        Some(reason) => Err(ServerError::StoreDisabled(reason.to_string())),
        None => Ok(()),
    }
}

/// Add documents, skipping near-duplicates of what is already stored
pub async fn ingest_documents(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IngestRequest>,
) -> ServerResult<Json<UpsertReport>> {
    if request.docs.iter().any(|doc| doc.trim().is_empty()) {
        return Err(ServerError::BadRequest("documents must not be blank".into()));
    }

    let store = state.store.get().await;
    enabled(&store)?;
    let namespace = request
        .namespace
        .as_deref()
        .unwrap_or(&store.config().namespace);
    let report = store.upsert(&request.docs, namespace).await?;
    Ok(Json(report))
}

/// Top-`k` documents for `query`
pub async fn search_knowledge(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<SearchResponse>> {
    let store = state.store.get().await;
    enabled(&store)?;

    let k = params.k.unwrap_or(store.config().default_top_k);
    if k > MAX_SEARCH_K {
        return Err(ServerError::BadRequest(format!(
            "k must be at most {MAX_SEARCH_K}"
        )));
    }
    let namespace = params
        .namespace
        .unwrap_or_else(|| store.config().namespace.clone());
    let results = store.retrieve(&params.query, k, &namespace).await?;

    Ok(Json(SearchResponse {
        query: params.query,
        namespace,
        results,
    }))
}
