use crate::domain::{Field as SeriesField, OptionalFields};
use polars::prelude::*;

/// Expected schema of a normalized output table
pub struct SeriesSchema;

impl SeriesSchema {
    /// Canonical output schema for the given optional fields.
    pub fn schema(fields: OptionalFields, include_symbol: bool) -> Schema {
        let mut columns = Vec::new();
        if include_symbol {
            columns.push(Field::new("symbol".into(), DataType::String));
        }
        columns.push(Field::new("date".into(), DataType::Date));
        for field in SeriesField::ALL {
            if fields.contains(field) {
                columns.push(Field::new(field.name().into(), DataType::Float64));
            }
        }
        Schema::from_iter(columns)
    }

    /// Validate a DataFrame against the schema
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
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

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
