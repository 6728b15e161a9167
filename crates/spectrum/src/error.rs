use thiserror::Error;

/// Errors produced while reading or analysing a spectrum.
///
/// Everything except [`SpectrumError::EmptySpectrum`] is a validation failure
/// of the caller's input; the empty case is reported separately so the HTTP
/// layer can tell "nothing uploaded" apart from "uploaded garbage".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpectrumError {
    #[error("missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("row {row}: column `{column}` has non-numeric value {value:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("malformed CSV: {0}")]
    Csv(String),

    #[error("column length mismatch: {energy} energy values vs {intensity} intensity values")]
    LengthMismatch { energy: usize, intensity: usize },

    #[error("spectrum is empty")]
    EmptySpectrum,

    #[error("intensity at index {index} is NaN")]
    NonFiniteIntensity { index: usize },

    #[error("invalid config: threshold must be finite (got {threshold})")]
    InvalidThreshold { threshold: f64 },

    #[error("invalid synthetic spectrum: {0}")]
    InvalidSynthetic(String),
}

impl SpectrumError {
    /// `true` when the input parsed cleanly but held no rows.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, SpectrumError::EmptySpectrum)
    }
}

impl From<csv::Error> for SpectrumError {
    fn from(err: csv::Error) -> Self {
        SpectrumError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_column() {
        let err = SpectrumError::MissingColumn {
            column: "intensity".into(),
        };
        assert_eq!(err.to_string(), "missing required column `intensity`");
    }

    #[test]
    fn only_empty_spectrum_counts_as_empty_input() {
        assert!(SpectrumError::EmptySpectrum.is_empty_input());
        assert!(!SpectrumError::Csv("bad quote".into()).is_empty_input());
        assert!(!SpectrumError::LengthMismatch {
            energy: 3,
            intensity: 2
        }
        .is_empty_input());
    }
}
