use crate::error::{ServerError, ServerResult};
use crate::explain::explain_spectrum;
use crate::state::ServerState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use spectrum::{PeakFeature, Spectrum, SpectrumPoint};
use std::sync::Arc;
use xrag::SpectrumAnalysis;

/// Upload field that carries the CSV file.
const FILE_FIELD: &str = "file";

/// Request to analyse samples sent inline
#[derive(Debug, Deserialize)]
pub struct AnalyzePointsRequest {
    pub points: Vec<SpectrumPoint>,
}

/// Analysis result with the model's explanation
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub num_points: usize,
    pub min_energy: f64,
    pub max_energy: f64,
    /// Raw (un-normalized) maximum
    pub max_intensity: f64,
    pub normalized: bool,
    pub peaks: Vec<PeakFeature>,
    pub llm_summary: String,
    pub llm_cot: Vec<String>,
    /// Energy vs normalized intensity, for plotting
    pub curve: Vec<SpectrumPoint>,
}

/// Analyse a CSV spectrum uploaded as multipart field `file`
pub async fn analyze_spectrum(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<AnalysisResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload
        .ok_or_else(|| ServerError::BadRequest(format!("missing multipart field `{FILE_FIELD}`")))?;

    let analysis = xrag::analyze_csv(&bytes, &state.peak_config)?;
    Ok(Json(explained(&state, analysis).await))
}

/// Analyse `{points: [{energy, intensity}]}`
pub async fn analyze_points(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AnalyzePointsRequest>,
) -> ServerResult<Json<AnalysisResponse>> {
    let spectrum = Spectrum::from_points(&request.points);
    let analysis = xrag::analyze_spectrum(&spectrum, &state.peak_config)?;
    Ok(Json(explained(&state, analysis).await))
}

async fn explained(state: &ServerState, analysis: SpectrumAnalysis) -> AnalysisResponse {
    let explanation = explain_spectrum(state.explainer(), &analysis).await;
    let SpectrumAnalysis {
        summary,
        peaks,
        curve,
    } = analysis;

    tracing::info!(
        points = summary.num_points,
        peaks = peaks.len(),
        "spectrum analysed"
    );
    AnalysisResponse {
        num_points: summary.num_points,
        min_energy: summary.min_energy,
        max_energy: summary.max_energy,
        max_intensity: summary.max_intensity,
        normalized: true,
        peaks,
        llm_summary: explanation.text,
        llm_cot: explanation.cot,
        curve,
    }
}
