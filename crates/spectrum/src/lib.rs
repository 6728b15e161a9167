//! # Spectrum (`spectrum`)
//!
//! Pure, synchronous building blocks for one-dimensional X-ray spectra:
//!
//! - [`parse_spectrum_csv`] reads `energy` / `intensity` columns out of a CSV
//!   upload into a column-wise [`Spectrum`].
//! - [`normalize_intensity`] scales a curve so its maximum is 1.0 (curves
//!   with no positive values pass through untouched).
//! - [`detect_peaks`] finds windowed local maxima above a threshold in O(n).
//!   [`detect_peaks_naive`] is the slow reference it is tested against.
//! - [`SyntheticSpectrum`] produces noisy Gaussian test spectra.
//!
//! Nothing here does IO beyond the reader/writer you hand in, and nothing is
//! shared between calls, so every function is safe to call from any thread.
//!
//! ```
//! use spectrum::{detect_peaks, normalize_intensity, parse_spectrum_csv, PeakConfig};
//!
//! let csv = b"energy,intensity\n1,0\n2,1\n3,4\n4,1\n5,0\n";
//! let spectrum = parse_spectrum_csv(csv).unwrap();
//! let normalized = normalize_intensity(spectrum.intensity()).unwrap();
//! let peaks = detect_peaks(
//!     spectrum.energy(),
//!     &normalized,
//!     &PeakConfig::default().with_window(1),
//! )
//! .unwrap();
//! assert_eq!(peaks[0].peak_energy, 3.0);
//! assert_eq!(peaks[0].peak_intensity, 1.0);
//! ```

mod config;
mod error;
mod normalize;
mod parse;
mod peaks;
mod synthetic;
mod types;

pub use config::{PeakConfig, PeakPolicy};
pub use error::SpectrumError;
pub use normalize::normalize_intensity;
pub use parse::{
    parse_spectrum_csv, read_spectrum_csv, write_spectrum_csv, ENERGY_COLUMN, INTENSITY_COLUMN,
};
pub use peaks::{detect_peaks, detect_peaks_naive};
pub use synthetic::{linspace, SyntheticSpectrum};
pub use types::{PeakFeature, Spectrum, SpectrumPoint, SpectrumSummary};
