#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use fp_columnar::{Column, ColumnError};
use fp_frame::{DataFrame, FrameError};
use fp_types::{NullKind, Scalar};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("csv header {0:?} appears more than once")]
    DuplicateHeader(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Parse CSV text into a frame with a `0..n` index.
///
/// Column order follows the header row. Empty fields are missing; other
/// fields become the narrowest of Int64, Float64, Bool or Utf8 and each
/// column takes the common dtype of its values.
pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().cloned().map_err(IoError::from)?;

    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let mut names = Vec::<String>::with_capacity(headers.len());
    for header in &headers {
        if names.iter().any(|name| name == header) {
            return Err(IoError::DuplicateHeader(header.to_owned()));
        }
        names.push(header.to_owned());
    }

    let mut columns = vec![Vec::<Scalar>::new(); names.len()];
    for row in reader.records() {
        let record = row?;
        for (idx, values) in columns.iter_mut().enumerate() {
            let field = record.get(idx).unwrap_or_default();
            values.push(parse_scalar(field));
        }
    }

    let pairs = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Ok((name, Column::from_values(values)?)))
        .collect::<Result<Vec<_>, IoError>>()?;

    Ok(DataFrame::from_columns(pairs)?)
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    let input = fs::read_to_string(path)?;
    read_csv_str(&input)
}

/// Render a frame as CSV in observable column order. Missing values are
/// written as empty fields. A zero-column frame renders as an empty string.
pub fn write_csv_string(frame: &DataFrame) -> Result<String, IoError> {
    if frame.num_columns() == 0 {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let headers = frame.column_names();
    writer.write_record(&headers)?;

    for row_idx in 0..frame.len() {
        let row = headers
            .iter()
            .map(|name| {
                frame
                    .column(name)
                    .and_then(|column| column.value(row_idx))
                    .map_or_else(String::new, scalar_to_csv)
            })
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn parse_scalar(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null(NullKind::Null);
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Scalar::Float64(value);
    }
    if let Ok(value) = trimmed.parse::<bool>() {
        return Scalar::Bool(value);
    }

    Scalar::Utf8(trimmed.to_owned())
}

fn scalar_to_csv(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Null(_) => String::new(),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Int64(v) => v.to_string(),
        Scalar::Float64(v) => {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }
        Scalar::Utf8(v) => v.clone(),
    }
}
