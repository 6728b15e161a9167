//! LLM explanations for spectra and chat answers.
//!
//! The server talks to a language model through the [`Explainer`] trait. The
//! production implementation calls the OpenAI Responses API; tests plug in
//! stubs. Every failure along the way (transport, status, missing text,
//! unparsable JSON) degrades to fixed "unavailable" texts so the surrounding
//! request still succeeds.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use xrag::SpectrumAnalysis;

pub const SPECTRUM_SUMMARY_FALLBACK: &str = "LLM summary unavailable.";
pub const SPECTRUM_COT_FALLBACK: &str = "Chain-of-thought unavailable due to API error.";
pub const CHAT_ANSWER_FALLBACK: &str = "LLM response unavailable due to an API error.";
pub const CHAT_COT_FALLBACK: &str = "Chain-of-thought unavailable due to error.";
pub const NO_CONTEXT: &str = "No retrieved context.";

const SPECTRUM_MAX_OUTPUT_TOKENS: u32 = 350;
const CHAT_MAX_OUTPUT_TOKENS: u32 = 300;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("model returned no text output")]
    EmptyOutput,

    #[error("no JSON object in model output")]
    MissingJson,

    #[error("invalid JSON in model output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid explainer configuration: {0}")]
    InvalidConfig(String),
}

/// A text-completion backend.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn complete(&self, prompt: &str, max_output_tokens: u32)
        -> Result<String, ExplainError>;
}

/// Client for the OpenAI Responses API (`POST {base}/responses`).
pub struct OpenAiExplainer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiExplainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiExplainer")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

impl OpenAiExplainer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExplainError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ExplainError::InvalidConfig("empty API key".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplainError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Explainer for OpenAiExplainer {
    async fn complete(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, ExplainError> {
        let body = json!({
            "model": self.model,
            "input": prompt,
            "max_output_tokens": max_output_tokens,
        });
        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExplainError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Http(format!("HTTP error {status}: {body}")));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| ExplainError::Http(format!("decode: {e}")))?;
        reply
            .output
            .into_iter()
            .flat_map(|item| item.content)
            .find_map(|content| content.text)
            .map(|text| text.trim().to_string())
            .ok_or(ExplainError::EmptyOutput)
    }
}

/// Strip markdown fences and return the span from the first `{` to the last `}`.
pub fn extract_json_block(raw: &str) -> Option<String> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| cleaned[start..=end].to_string())
}

#[derive(Debug, Deserialize)]
struct SummaryReply {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    cot: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    cot: Vec<String>,
}

/// Model output reduced to a headline text plus condensed reasoning steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub text: String,
    pub cot: Vec<String>,
}

impl Explanation {
    fn fallback(text: &str, cot: &str) -> Self {
        Self {
            text: text.to_string(),
            cot: vec![cot.to_string()],
        }
    }
}

/// Peak list as it appears in the spectrum prompt.
pub fn describe_peaks(analysis: &SpectrumAnalysis) -> String {
    if analysis.peaks.is_empty() {
        return "No clear peaks detected.".to_string();
    }
    analysis
        .peaks
        .iter()
        .map(|p| {
            format!(
                "- Peak at {:.3} eV with normalized intensity {:.2}",
                p.peak_energy, p.peak_intensity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt statistics come from the normalized curve, so the max intensity is at most 1.
pub fn spectrum_prompt(analysis: &SpectrumAnalysis) -> String {
    let curve = &analysis.curve;
    let min_energy = curve.iter().map(|p| p.energy).fold(f64::INFINITY, f64::min);
    let max_energy = curve
        .iter()
        .map(|p| p.energy)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_intensity = analysis
        .normalized_intensity()
        .fold(f64::NEG_INFINITY, f64::max);

    let mut prompt = String::from(
        "You are an X-ray spectroscopy analysis expert.\n\n\
         Analyze the following spectral statistics and detected peaks.\n\
         Provide:\n\
         1. A short scientific explanation (4-7 sentences).\n\
         2. A short, condensed chain-of-thought (CoT) reasoning (3-6 steps maximum).\n\n\
         IMPORTANT:\n\
         - The *summary* may be long (up to 250 tokens).\n\
         - Keep the chain-of-thought SHORT and CONDENSED (3-6 steps, no long essays).\n\n",
    );
    let _ = write!(
        prompt,
        "Spectrum statistics:\n\
         Number of points: {}\n\
         Energy range: {:.3} - {:.3}\n\
         Max intensity: {:.3}\n\
         Detected peaks: {}\n\n",
        curve.len(),
        min_energy,
        max_energy,
        max_intensity,
        describe_peaks(analysis),
    );
    prompt.push_str(
        "Format your answer as JSON:\n\
         {\n  \"summary\": \"...\",\n  \"cot\": [\"step1\", \"step2\", ...]\n}\n",
    );
    prompt
}

pub fn chat_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an AI assistant specializing in X-ray spectroscopy.\n\n\
         If the answer is based on approximate toy models or simplified rules,\n\
         be explicit and conservative. Do not overclaim scientific accuracy.\n\n\
         Use the retrieved context (may be partial or noisy) to answer the user question.\n\n\
         User question:\n{question}\n\n\
         Retrieved context:\n{context}\n\n\
         Produce:\n\
         1. \"answer\": a helpful final answer (5-8 sentences max).\n\
         2. \"cot\": a short chain-of-thought (3-6 steps).\n\n\
         IMPORTANT:\n\
         - The chain-of-thought MUST be short and condensed.\n\
         - Output ONLY valid JSON.\n\
         - Do NOT include markdown or code fences.\n\n\
         Return JSON:\n\
         {{\n  \"answer\": \"...\",\n  \"cot\": [\"step1\", \"step2\"]\n}}\n"
    )
}

async fn complete_json<T: serde::de::DeserializeOwned>(
    explainer: &dyn Explainer,
    prompt: &str,
    max_output_tokens: u32,
) -> Result<T, ExplainError> {
    let raw = explainer.complete(prompt, max_output_tokens).await?;
    let block = extract_json_block(&raw).ok_or(ExplainError::MissingJson)?;
    Ok(serde_json::from_str(&block)?)
}

/// Summarise an analysed spectrum. Never fails; see the fallback constants.
pub async fn explain_spectrum(
    explainer: Option<&dyn Explainer>,
    analysis: &SpectrumAnalysis,
) -> Explanation {
    let fallback = || Explanation::fallback(SPECTRUM_SUMMARY_FALLBACK, SPECTRUM_COT_FALLBACK);
    let Some(explainer) = explainer else {
        return fallback();
    };
    let prompt = spectrum_prompt(analysis);
    match complete_json::<SummaryReply>(explainer, &prompt, SPECTRUM_MAX_OUTPUT_TOKENS).await {
        Ok(reply) => Explanation {
            text: reply.summary.trim().to_string(),
            cot: reply.cot,
        },
        Err(err) => {
            tracing::warn!(error = %err, "spectrum explanation unavailable");
            fallback()
        }
    }
}

/// Answer a question against retrieved context. Never fails.
pub async fn answer_question(
    explainer: Option<&dyn Explainer>,
    question: &str,
    context: &str,
) -> Explanation {
    let fallback = || Explanation::fallback(CHAT_ANSWER_FALLBACK, CHAT_COT_FALLBACK);
    let Some(explainer) = explainer else {
        return fallback();
    };
    let prompt = chat_prompt(question, context);
    match complete_json::<ChatReply>(explainer, &prompt, CHAT_MAX_OUTPUT_TOKENS).await {
        Ok(reply) => Explanation {
            text: reply.answer,
            cot: reply.cot,
        },
        Err(err) => {
            tracing::warn!(error = %err, "chat answer unavailable");
            fallback()
        }
    }
}
