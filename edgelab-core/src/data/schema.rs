//! Price table schemas.
//!
//! Two shapes are validated here:
//! - the *raw* shape of an incoming price file, where every column is text and
//!   only column presence is checked (values are coerced later, row by row);
//! - the *typed* shape stored in the Parquet cache, where dtypes must match.

use polars::prelude::*;

/// Accepted names for the timestamp column. A table must carry exactly one.
pub const TIMESTAMP_ALIASES: [&str; 3] = ["datetime", "timestamp", "date"];

/// Numeric columns every price table must carry.
pub const NUMERIC_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Column names of a raw price table after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPriceColumns {
    /// Name of the column holding timestamps (one of [`TIMESTAMP_ALIASES`]).
    pub timestamp: String,
}

/// Expected schema for price data.
pub struct PriceSchema;

impl PriceSchema {
    /// Canonical typed schema used by the Parquet cache.
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(
                "timestamp".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::Float64),
        ])
    }

    /// Check a raw (lower-cased) price table carries exactly one timestamp
    /// column and every numeric column. Dtypes are not checked.
    pub fn validate_raw(df: &DataFrame) -> Result<RawPriceColumns, SchemaError> {
        let actual = df.schema();
        let present: Vec<&str> = TIMESTAMP_ALIASES
            .iter()
            .copied()
            .filter(|name| actual.contains(name))
            .collect();
        let timestamp = match present.as_slice() {
            [] => return Err(SchemaError::MissingColumn(TIMESTAMP_ALIASES.join("|"))),
            [one] => *one,
            many => return Err(SchemaError::AmbiguousColumn(many.join(", "))),
        };

        for name in NUMERIC_COLUMNS {
            if !actual.contains(name) {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }

        Ok(RawPriceColumns {
            timestamp: timestamp.to_string(),
        })
    }

    /// Validate a typed DataFrame against [`PriceSchema::schema`].
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Ambiguous timestamp columns: {0}")]
    AmbiguousColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

impl From<SchemaError> for super::DataError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::MissingColumn(c) => super::DataError::MissingColumn(c),
            SchemaError::AmbiguousColumn(c) => super::DataError::AmbiguousColumn(c),
            other => super::DataError::Parquet(other.to_string()),
        }
    }
}
