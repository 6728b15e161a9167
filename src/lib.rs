//! Workspace umbrella crate for xrag, X-ray spectrum analysis with
//! retrieval-grounded explanations.
//!
//! This crate stitches the spectrum stages (parse, normalize, peak detection,
//! summary) into a single entry point and re-exports the building blocks of the
//! retrieval side so callers can depend on one crate.

pub mod config;

pub use config::{ConfigLoadError, XragConfig};
pub use index::{
    cosine_similarity, BackendConfig, IndexError, IndexSpec, InMemoryIndex, Metric,
    PineconeConfig, VectorIndex,
};
pub use knowledge::{
    BatchDedup, KnowledgeConfig, KnowledgeError, KnowledgeStore, RetrievalMatch, SharedStore,
    StoreSettings, UpsertReport, BOOTSTRAP_DOCS,
};
pub use semantic::{
    build_provider, EmbeddingProvider, HashingEmbedder, SemanticConfig, SemanticError,
};
pub use spectrum::{
    detect_peaks, normalize_intensity, parse_spectrum_csv, write_spectrum_csv, PeakConfig,
    PeakFeature, PeakPolicy, Spectrum, SpectrumError, SpectrumPoint, SpectrumSummary,
    SyntheticSpectrum,
};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors that can occur while running a spectrum through the analysis pipeline,
/// tagged with the stage that failed.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Parse(SpectrumError),
    Normalize(SpectrumError),
    Peaks(SpectrumError),
}

impl PipelineError {
    pub fn spectrum_error(&self) -> &SpectrumError {
        match self {
            PipelineError::Parse(err) | PipelineError::Normalize(err) | PipelineError::Peaks(err) => {
                err
            }
        }
    }

    /// `true` when the input held no samples.
    pub fn is_empty_input(&self) -> bool {
        self.spectrum_error().is_empty_input()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Parse(err) => write!(f, "failed to parse spectrum: {err}"),
            PipelineError::Normalize(err) => write!(f, "normalization failed: {err}"),
            PipelineError::Peaks(err) => write!(f, "peak detection failed: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.spectrum_error())
    }
}

/// Metrics observer for analysis stages.
pub trait AnalysisMetrics: Send + Sync {
    fn record_parse(&self, latency: Duration, result: Result<(), SpectrumError>);
    fn record_normalize(&self, latency: Duration, result: Result<(), SpectrumError>);
    /// `Ok` carries the number of peaks found.
    fn record_peaks(&self, latency: Duration, result: Result<usize, SpectrumError>);
}

/// Install or clear the global analysis metrics recorder.
pub fn set_analysis_metrics(recorder: Option<Arc<dyn AnalysisMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn AnalysisMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn AnalysisMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn AnalysisMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn AnalysisMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_parse<T>(self, result: &Result<T, SpectrumError>) {
        self.recorder
            .record_parse(self.start.elapsed(), unit_result(result));
    }

    fn record_normalize<T>(self, result: &Result<T, SpectrumError>) {
        self.recorder
            .record_normalize(self.start.elapsed(), unit_result(result));
    }

    fn record_peaks(self, result: &Result<Vec<PeakFeature>, SpectrumError>) {
        let outcome = match result {
            Ok(peaks) => Ok(peaks.len()),
            Err(err) => Err(err.clone()),
        };
        self.recorder.record_peaks(self.start.elapsed(), outcome);
    }
}

fn unit_result<T>(result: &Result<T, SpectrumError>) -> Result<(), SpectrumError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(err.clone()),
    }
}

/// Result of analysing one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumAnalysis {
    /// Statistics over the raw, un-normalized samples.
    pub summary: SpectrumSummary,
    /// Peaks found on the normalized curve, in ascending sample order.
    pub peaks: Vec<PeakFeature>,
    /// Energy against normalized intensity, one point per input sample.
    pub curve: Vec<SpectrumPoint>,
}

impl SpectrumAnalysis {
    pub fn normalized_intensity(&self) -> impl Iterator<Item = f64> + '_ {
        self.curve.iter().map(|p| p.intensity)
    }
}

/// Normalize `spectrum`, detect peaks on the normalized curve and summarize the
/// raw samples.
pub fn analyze_spectrum(
    spectrum: &Spectrum,
    peaks_cfg: &PeakConfig,
) -> Result<SpectrumAnalysis, PipelineError> {
    let summary = spectrum
        .summary()
        .ok_or(PipelineError::Normalize(SpectrumError::EmptySpectrum))?;

    let span = MetricsSpan::start();
    let normalized = normalize_intensity(spectrum.intensity());
    if let Some(span) = span {
        span.record_normalize(&normalized);
    }
    let normalized = normalized.map_err(PipelineError::Normalize)?;

    let span = MetricsSpan::start();
    let peaks = detect_peaks(spectrum.energy(), &normalized, peaks_cfg);
    if let Some(span) = span {
        span.record_peaks(&peaks);
    }
    let peaks = peaks.map_err(PipelineError::Peaks)?;

    let curve = spectrum
        .energy()
        .iter()
        .zip(&normalized)
        .map(|(&energy, &intensity)| SpectrumPoint { energy, intensity })
        .collect();

    tracing::debug!(
        points = summary.num_points,
        peaks = peaks.len(),
        "spectrum analysed"
    );
    Ok(SpectrumAnalysis {
        summary,
        peaks,
        curve,
    })
}

/// Parse CSV bytes with `energy` and `intensity` columns, then
/// [`analyze_spectrum`].
pub fn analyze_csv(bytes: &[u8], peaks_cfg: &PeakConfig) -> Result<SpectrumAnalysis, PipelineError> {
    let span = MetricsSpan::start();
    let parsed = parse_spectrum_csv(bytes);
    if let Some(span) = span {
        span.record_parse(&parsed);
    }
    let spectrum = parsed.map_err(PipelineError::Parse)?;
    analyze_spectrum(&spectrum, peaks_cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const CSV: &str = "energy,intensity\n\
        1,0.1\n2,0.2\n3,0.3\n4,0.4\n5,0.5\n6,2.0\n7,0.5\n8,0.4\n9,0.3\n10,0.2\n11,0.1\n";

    #[test]
    fn analyze_csv_normalizes_and_finds_the_peak() {
        let analysis = analyze_csv(CSV.as_bytes(), &PeakConfig::default()).unwrap();

        assert_eq!(analysis.summary.num_points, 11);
        assert_eq!(analysis.summary.min_energy, 1.0);
        assert_eq!(analysis.summary.max_energy, 11.0);
        assert_eq!(analysis.summary.max_intensity, 2.0);

        assert_eq!(analysis.peaks.len(), 1);
        assert_eq!(analysis.peaks[0].peak_energy, 6.0);
        assert_eq!(analysis.peaks[0].peak_intensity, 1.0);

        assert_eq!(analysis.curve.len(), 11);
        assert!(analysis.normalized_intensity().all(|v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn empty_and_malformed_input_report_the_stage() {
        let err = analyze_csv(b"energy,intensity\n", &PeakConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(SpectrumError::EmptySpectrum)));
        assert!(err.is_empty_input());

        let err = analyze_csv(b"wavelength,counts\n1,2\n", &PeakConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Parse(SpectrumError::MissingColumn { .. })
        ));
        assert!(!err.is_empty_input());
    }

    #[test]
    fn empty_spectrum_value_is_rejected() {
        let err = analyze_spectrum(&Spectrum::default(), &PeakConfig::default()).unwrap_err();
        assert!(err.is_empty_input());
    }

    #[test]
    fn nan_intensity_fails_in_peak_stage() {
        let spectrum = Spectrum::new(
            (0..11).map(f64::from).collect(),
            vec![0.1, 0.2, 0.3, 0.4, 0.5, f64::NAN, 0.5, 0.4, 0.3, 0.2, 0.1],
        )
        .unwrap();
        let err = analyze_spectrum(&spectrum, &PeakConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Peaks(SpectrumError::NonFiniteIntensity { index: 5 })
        );
    }

    #[derive(Default)]
    struct CountingMetrics {
        events: Mutex<Vec<&'static str>>,
    }

    impl CountingMetrics {
        fn snapshot(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl AnalysisMetrics for CountingMetrics {
        fn record_parse(&self, _latency: Duration, result: Result<(), SpectrumError>) {
            let label = if result.is_ok() { "parse_ok" } else { "parse_err" };
            self.events.lock().unwrap().push(label);
        }

        fn record_normalize(&self, _latency: Duration, result: Result<(), SpectrumError>) {
            let label = if result.is_ok() {
                "normalize_ok"
            } else {
                "normalize_err"
            };
            self.events.lock().unwrap().push(label);
        }

        fn record_peaks(&self, _latency: Duration, result: Result<usize, SpectrumError>) {
            let label = match result {
                Ok(1) => "peaks_one",
                Ok(_) => "peaks_other",
                Err(_) => "peaks_err",
            };
            self.events.lock().unwrap().push(label);
        }
    }

    #[test]
    fn metrics_recorder_tracks_stage_outcomes() {
        let metrics = Arc::new(CountingMetrics::default());
        set_analysis_metrics(Some(metrics.clone()));

        analyze_csv(CSV.as_bytes(), &PeakConfig::default()).unwrap();

        let events = metrics.snapshot();
        assert!(events.contains(&"parse_ok"));
        assert!(events.contains(&"normalize_ok"));
        assert!(events.contains(&"peaks_one"));

        set_analysis_metrics(None);
    }
}
