use crate::error::ServerResult;
use crate::explain::{answer_question, NO_CONTEXT};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Characters of each source document echoed back to the client.
const SOURCE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Retrieve context from the knowledge store (default: true)
    #[serde(default = "default_true")]
    pub use_rag: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatSource {
    pub id: String,
    pub similarity: f32,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub cot: Vec<String>,
    pub sources: Vec<ChatSource>,
}

/// Answer a question, grounded on the top retrieved documents
pub async fn chat_message(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ChatRequest>,
) -> ServerResult<Json<ChatResponse>> {
    let mut context_blocks = Vec::new();
    let mut sources = Vec::new();

    if request.use_rag {
        let store = state.store.get().await;
        match store.retrieve_default(&request.message).await {
            Ok(matches) => {
                for hit in matches {
                    sources.push(ChatSource {
                        id: hit.id,
                        similarity: hit.similarity,
                        text: preview(&hit.text),
                    });
                    context_blocks.push(hit.text);
                }
            }
            Err(err) => tracing::warn!(error = %err, "retrieval failed, answering without context"),
        }
    }

    let context = if context_blocks.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        context_blocks.join("\n\n")
    };
    let explanation = answer_question(state.explainer(), &request.message, &context).await;

    Ok(Json(ChatResponse {
        answer: explanation.text,
        cot: explanation.cot,
        sources,
    }))
}

fn preview(text: &str) -> String {
    text.chars().take(SOURCE_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(300);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn use_rag_defaults_on() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(req.use_rag);
        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "hi", "use_rag": false}"#).unwrap();
        assert!(!req.use_rag);
    }
}
