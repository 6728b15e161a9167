use serde::{Deserialize, Serialize};

use crate::{Spectrum, SpectrumError};

/// Generator for a single Gaussian absorption line with additive uniform noise.
///
/// Output is fully determined by the fields, including `seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpectrum {
    pub points: usize,
    pub energy_min: f64,
    pub energy_max: f64,
    pub center: f64,
    pub width: f64,
    pub amplitude: f64,
    /// Upper bound of the uniform noise added to every sample, `[0, noise)`.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticSpectrum {
    fn default() -> Self {
        Self {
            points: 100,
            energy_min: 1.0,
            energy_max: 10.0,
            center: 5.0,
            width: 0.5,
            amplitude: 1.0,
            noise: 0.05,
            seed: 42,
        }
    }
}

impl SyntheticSpectrum {
    /// Default line with the centre shifted by up to ±0.5 and the width
    /// widened by up to 0.3, both drawn from `seed`.
    pub fn jittered(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let base = Self::default();
        Self {
            center: base.center + rng.f64() - 0.5,
            width: base.width + rng.f64() * 0.3,
            seed,
            ..base
        }
    }

    pub fn generate(&self) -> Result<Spectrum, SpectrumError> {
        self.validate()?;
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let energy = linspace(self.energy_min, self.energy_max, self.points);
        let two_var = 2.0 * self.width * self.width;
        let intensity = energy
            .iter()
            .map(|&e| {
                let d = e - self.center;
                self.amplitude * (-(d * d) / two_var).exp() + self.noise * rng.f64()
            })
            .collect();
        Spectrum::new(energy, intensity)
    }

    fn validate(&self) -> Result<(), SpectrumError> {
        if self.points == 0 {
            return Err(SpectrumError::InvalidSynthetic("points must be >= 1".into()));
        }
        if !(self.energy_max > self.energy_min) {
            return Err(SpectrumError::InvalidSynthetic(format!(
                "energy range {}..{} is empty",
                self.energy_min, self.energy_max
            )));
        }
        if !(self.width > 0.0) {
            return Err(SpectrumError::InvalidSynthetic(format!(
                "width must be positive (got {})",
                self.width
            )));
        }
        if !(self.noise >= 0.0) {
            return Err(SpectrumError::InvalidSynthetic(format!(
                "noise must be non-negative (got {})",
                self.noise
            )));
        }
        Ok(())
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
