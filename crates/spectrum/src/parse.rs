use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, Trim, Writer};

use crate::{Spectrum, SpectrumError};

pub const ENERGY_COLUMN: &str = "energy";
pub const INTENSITY_COLUMN: &str = "intensity";

/// Parse CSV bytes with a header row containing `energy` and `intensity`.
///
/// Columns are located by name and may appear anywhere; extra columns are
/// ignored. Every cell in the two required columns must be a finite number.
pub fn parse_spectrum_csv(bytes: &[u8]) -> Result<Spectrum, SpectrumError> {
    read_spectrum_csv(bytes)
}

/// Streaming variant of [`parse_spectrum_csv`].
pub fn read_spectrum_csv<R: Read>(reader: R) -> Result<Spectrum, SpectrumError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let energy_col = column_position(&headers, ENERGY_COLUMN)?;
    let intensity_col = column_position(&headers, INTENSITY_COLUMN)?;

    let mut energy = Vec::new();
    let mut intensity = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        energy.push(parse_cell(&record, energy_col, row, ENERGY_COLUMN)?);
        intensity.push(parse_cell(&record, intensity_col, row, INTENSITY_COLUMN)?);
    }

    if energy.is_empty() {
        return Err(SpectrumError::EmptySpectrum);
    }
    Spectrum::new(energy, intensity)
}

/// Write `energy,intensity` CSV, one row per sample.
pub fn write_spectrum_csv<W: Write>(spectrum: &Spectrum, writer: W) -> Result<(), SpectrumError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record([ENERGY_COLUMN, INTENSITY_COLUMN])?;
    for point in spectrum.points() {
        writer.write_record([point.energy.to_string(), point.intensity.to_string()])?;
    }
    writer
        .flush()
        .map_err(|e| SpectrumError::Csv(e.to_string()))
}

fn column_position(headers: &StringRecord, name: &str) -> Result<usize, SpectrumError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| SpectrumError::MissingColumn {
            column: name.to_string(),
        })
}

fn parse_cell(
    record: &StringRecord,
    col: usize,
    row: usize,
    column: &str,
) -> Result<f64, SpectrumError> {
    let raw = record.get(col).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SpectrumError::InvalidValue {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_columns_in_any_order() {
        let csv = b"intensity,sample,energy\n0.5,a,1.0\n1.5,b,2.0\n";
        let spectrum = parse_spectrum_csv(csv).unwrap();
        assert_eq!(spectrum.energy(), &[1.0, 2.0]);
        assert_eq!(spectrum.intensity(), &[0.5, 1.5]);
    }

    #[test]
    fn trims_whitespace_around_headers_and_cells() {
        let csv = b" energy , intensity \n 1.0 , 2.5 \n";
        let spectrum = parse_spectrum_csv(csv).unwrap();
        assert_eq!(spectrum.intensity(), &[2.5]);
    }

    #[test]
    fn missing_intensity_column() {
        let err = parse_spectrum_csv(b"energy,counts\n1.0,2.0\n").unwrap_err();
        assert_eq!(
            err,
            SpectrumError::MissingColumn {
                column: "intensity".into()
            }
        );
    }

    #[test]
    fn header_only_is_empty() {
        let err = parse_spectrum_csv(b"energy,intensity\n").unwrap_err();
        assert_eq!(err, SpectrumError::EmptySpectrum);
    }

    #[test]
    fn completely_empty_input_is_missing_columns() {
        let err = parse_spectrum_csv(b"").unwrap_err();
        assert!(matches!(err, SpectrumError::MissingColumn { .. }));
    }

    #[test]
    fn non_numeric_cell_reports_row_and_column() {
        let err = parse_spectrum_csv(b"energy,intensity\n1.0,0.2\n2.0,high\n").unwrap_err();
        assert_eq!(
            err,
            SpectrumError::InvalidValue {
                row: 2,
                column: "intensity".into(),
                value: "high".into()
            }
        );
    }

    #[test]
    fn nan_and_infinite_cells_are_rejected() {
        assert!(parse_spectrum_csv(b"energy,intensity\n1.0,NaN\n").is_err());
        assert!(parse_spectrum_csv(b"energy,intensity\ninf,0.1\n").is_err());
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = parse_spectrum_csv(b"energy,intensity\n1.0,0.2,9\n").unwrap_err();
        assert!(matches!(err, SpectrumError::Csv(_)));
    }

    #[test]
    fn written_csv_parses_back() {
        let spectrum = Spectrum::new(vec![1.0, 1.5], vec![0.25, 0.75]).unwrap();
        let mut buf = Vec::new();
        write_spectrum_csv(&spectrum, &mut buf).unwrap();
        assert!(buf.starts_with(b"energy,intensity\n"));
        assert_eq!(parse_spectrum_csv(&buf).unwrap(), spectrum);
    }
}
