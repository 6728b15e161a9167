use crate::SpectrumError;

/// Scale intensities so the maximum becomes 1.0.
///
/// When the maximum is not positive (all-zero or all-negative input) the
/// values are returned unchanged; dividing would flip signs or blow up.
/// NaN samples are ignored when looking for the maximum and stay NaN, so one
/// bad sample does not turn the whole trace into NaN.
pub fn normalize_intensity(intensity: &[f64]) -> Result<Vec<f64>, SpectrumError> {
    if intensity.is_empty() {
        return Err(SpectrumError::EmptySpectrum);
    }

    let max = intensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 {
        return Ok(intensity.to_vec());
    }

    Ok(intensity.iter().map(|v| v / max).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_becomes_one() {
        let out = normalize_intensity(&[2.0, 8.0, 4.0]).unwrap();
        assert_eq!(out, vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn preserves_length_and_order() {
        let input = [0.3, 0.9, 0.1, 0.6, 0.9];
        let out = normalize_intensity(&input).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out[1] == 1.0 && out[4] == 1.0);
        assert!(out[2] < out[0] && out[0] < out[3]);
    }

    #[test]
    fn all_zero_passes_through() {
        let input = [0.0, 0.0, 0.0];
        assert_eq!(normalize_intensity(&input).unwrap(), input.to_vec());
    }

    #[test]
    fn all_negative_passes_through() {
        let input = [-3.0, -1.0, -2.0];
        assert_eq!(normalize_intensity(&input).unwrap(), input.to_vec());
    }

    #[test]
    fn mixed_signs_scale_by_positive_max() {
        let out = normalize_intensity(&[-2.0, 4.0]).unwrap();
        assert_eq!(out, vec![-0.5, 1.0]);
    }

    #[test]
    fn nan_samples_do_not_poison_the_scale() {
        let out = normalize_intensity(&[f64::NAN, 2.0, 1.0]).unwrap();
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.0, 0.5]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            normalize_intensity(&[]).unwrap_err(),
            SpectrumError::EmptySpectrum
        );
    }
}
