use serde::{Deserialize, Serialize};

use crate::SpectrumError;

/// One `(energy, intensity)` sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    pub energy: f64,
    pub intensity: f64,
}

/// A measured spectrum stored column-wise.
///
/// Both columns always have the same length. Samples keep the order they were
/// read in; nothing here sorts by energy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    energy: Vec<f64>,
    intensity: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum from parallel columns.
    pub fn new(energy: Vec<f64>, intensity: Vec<f64>) -> Result<Self, SpectrumError> {
        if energy.len() != intensity.len() {
            return Err(SpectrumError::LengthMismatch {
                energy: energy.len(),
                intensity: intensity.len(),
            });
        }
        Ok(Self { energy, intensity })
    }

    pub fn from_points(points: &[SpectrumPoint]) -> Self {
        let (energy, intensity) = points.iter().map(|p| (p.energy, p.intensity)).unzip();
        Self { energy, intensity }
    }

    pub fn energy(&self) -> &[f64] {
        &self.energy
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = SpectrumPoint> + '_ {
        self.energy
            .iter()
            .zip(&self.intensity)
            .map(|(&energy, &intensity)| SpectrumPoint { energy, intensity })
    }

    /// Summary statistics over the raw samples, or `None` for an empty spectrum.
    pub fn summary(&self) -> Option<SpectrumSummary> {
        if self.is_empty() {
            return None;
        }
        let (min_energy, max_energy) = self
            .energy
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
                (lo.min(e), hi.max(e))
            });
        let max_intensity = self
            .intensity
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Some(SpectrumSummary {
            num_points: self.len(),
            min_energy,
            max_energy,
            max_intensity,
        })
    }
}

/// A detected local maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakFeature {
    pub peak_energy: f64,
    pub peak_intensity: f64,
}

/// Headline statistics of a raw (un-normalized) spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSummary {
    pub num_points: usize,
    pub min_energy: f64,
    pub max_energy: f64,
    pub max_intensity: f64,
}
