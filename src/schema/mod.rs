//! Typed table schemas and record batch adaptation.
//!
//! Every input table is described by a serde record type. The Arrow schema is
//! traced from the type, incoming batches are adapted to it (columns selected
//! by name and cast to the declared type), and rows are deserialized with
//! `serde_arrow`.

use std::sync::Arc;

use arrow::array::{ArrayRef, new_null_array};
use arrow::compute::kernels::cast;
use arrow::datatypes::{FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::{MortalityError, Result};

/// A record type backed by one input table
pub trait TableRecord: Serialize + DeserializeOwned + Sized {
    /// File stem of the table in the data directory
    const TABLE_NAME: &'static str;

    /// Arrow fields traced from the record type
    fn fields() -> Result<Vec<FieldRef>> {
        Ok(Vec::<FieldRef>::from_type::<Self>(
            TracingOptions::default(),
        )?)
    }

    /// Arrow schema traced from the record type
    fn schema() -> Result<Schema> {
        Ok(Schema::new(Self::fields()?))
    }

    /// Deserialize all rows of a batch, adapting column types first
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let fields = Self::fields()?;
        let adapted = adapt_record_batch(Self::TABLE_NAME, batch, &fields)?;
        Ok(serde_arrow::from_record_batch(&adapted)?)
    }

    /// Deserialize rows from several batches
    fn from_batches(batches: &[RecordBatch]) -> Result<Vec<Self>> {
        let mut records = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
        for batch in batches {
            records.extend(Self::from_batch(batch)?);
        }
        Ok(records)
    }

    /// Serialize records into a single batch
    fn to_batch(records: &[Self]) -> Result<RecordBatch> {
        let fields = Self::fields()?;
        Ok(serde_arrow::to_record_batch(&fields, &records)?)
    }
}

/// Adapt a batch to the target fields
///
/// Columns are matched by name. A column whose type differs is cast to the
/// target type; a missing nullable column becomes all-null; a missing
/// required column is an error. Extra columns are dropped.
pub fn adapt_record_batch(
    table: &str,
    batch: &RecordBatch,
    fields: &[FieldRef],
) -> Result<RecordBatch> {
    let source_schema = batch.schema();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let column = match source_schema.index_of(field.name()) {
            Ok(idx) => convert_array(batch.column(idx), field)?,
            Err(_) if field.is_nullable() => {
                log::debug!(
                    "Column {} absent from {table}, filling with nulls",
                    field.name()
                );
                new_null_array(field.data_type(), batch.num_rows())
            }
            Err(_) => return Err(MortalityError::missing_column(table, field.name())),
        };
        columns.push(column);
    }

    let schema = Arc::new(Schema::new(fields.to_vec()));
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Cast an array to the data type of a field when they differ
fn convert_array(array: &ArrayRef, field: &FieldRef) -> Result<ArrayRef> {
    if array.data_type() == field.data_type() {
        return Ok(array.clone());
    }
    Ok(cast::cast(array, field.data_type())?)
}
