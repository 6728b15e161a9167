use std::collections::VecDeque;

use crate::{PeakConfig, PeakFeature, PeakPolicy, SpectrumError};

/// Find local maxima of `intensity` using a sliding-window maximum.
///
/// Index `i` is a peak when it lies at least `window` samples from either end,
/// equals the maximum of `intensity[i - window ..= i + window]`, and is at
/// least `threshold`. Peaks come back in ascending index order. Runs in O(n)
/// via a monotonic deque and always agrees with [`detect_peaks_naive`].
pub fn detect_peaks(
    energy: &[f64],
    intensity: &[f64],
    cfg: &PeakConfig,
) -> Result<Vec<PeakFeature>, SpectrumError> {
    check_inputs(energy, intensity, cfg)?;
    let indices = window_max_indices(intensity, cfg.window, cfg.threshold);
    Ok(features(energy, intensity, apply_policy(indices, intensity, cfg.policy)))
}

/// Straightforward O(n * window) scan. Kept as the executable definition of
/// a peak; [`detect_peaks`] must produce identical output.
pub fn detect_peaks_naive(
    energy: &[f64],
    intensity: &[f64],
    cfg: &PeakConfig,
) -> Result<Vec<PeakFeature>, SpectrumError> {
    check_inputs(energy, intensity, cfg)?;
    let indices = scan_indices(intensity, cfg.window, cfg.threshold);
    Ok(features(energy, intensity, apply_policy(indices, intensity, cfg.policy)))
}

fn check_inputs(energy: &[f64], intensity: &[f64], cfg: &PeakConfig) -> Result<(), SpectrumError> {
    cfg.validate()?;
    if energy.len() != intensity.len() {
        return Err(SpectrumError::LengthMismatch {
            energy: energy.len(),
            intensity: intensity.len(),
        });
    }
    if let Some(index) = intensity.iter().position(|v| v.is_nan()) {
        return Err(SpectrumError::NonFiniteIntensity { index });
    }
    Ok(())
}

/// Full window length, or `None` when no index has a complete neighbourhood.
fn span(n: usize, window: usize) -> Option<usize> {
    let span = window.checked_mul(2)?.checked_add(1)?;
    (n >= span).then_some(span)
}

fn scan_indices(intensity: &[f64], window: usize, threshold: f64) -> Vec<usize> {
    let n = intensity.len();
    if span(n, window).is_none() {
        return Vec::new();
    }
    (window..n - window)
        .filter(|&i| {
            let local_max = intensity[i - window..=i + window]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            intensity[i] == local_max && intensity[i] >= threshold
        })
        .collect()
}

fn window_max_indices(intensity: &[f64], window: usize, threshold: f64) -> Vec<usize> {
    let n = intensity.len();
    let Some(span) = span(n, window) else {
        return Vec::new();
    };

    // Front of the deque is the index of the current window maximum; values
    // are strictly decreasing front to back.
    let mut deque: VecDeque<usize> = VecDeque::with_capacity(span);
    let mut peaks = Vec::new();

    for j in 0..n {
        while let Some(&back) = deque.back() {
            if intensity[back] <= intensity[j] {
                deque.pop_back();
            } else {
                break;
            }
        }
        deque.push_back(j);

        while let Some(&front) = deque.front() {
            if front + span <= j {
                deque.pop_front();
            } else {
                break;
            }
        }

        if j + 1 < span {
            continue;
        }
        let centre = j - window;
        if let Some(&top) = deque.front() {
            let value = intensity[centre];
            if value == intensity[top] && value >= threshold {
                peaks.push(centre);
            }
        }
    }

    peaks
}

fn apply_policy(indices: Vec<usize>, intensity: &[f64], policy: PeakPolicy) -> Vec<usize> {
    match policy {
        PeakPolicy::KeepTies => indices,
        PeakPolicy::SuppressPlateaus => {
            let mut kept = Vec::with_capacity(indices.len());
            let mut previous: Option<usize> = None;
            for i in indices {
                let continues_run =
                    previous.is_some_and(|p| p + 1 == i && intensity[p] == intensity[i]);
                if !continues_run {
                    kept.push(i);
                }
                previous = Some(i);
            }
            kept
        }
    }
}

fn features(energy: &[f64], intensity: &[f64], indices: Vec<usize>) -> Vec<PeakFeature> {
    indices
        .into_iter()
        .map(|i| PeakFeature {
            peak_energy: energy[i],
            peak_intensity: intensity[i],
        })
        .collect()
}
