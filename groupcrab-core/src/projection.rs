//! Group-key extraction.

use crate::error::{Error, Result};
use crate::types::{Record, Schema};

/// Projects input records onto the group-by fields.
///
/// The window field, when one is designated, is never part of the key: the
/// window assignment carries it instead.
#[derive(Debug, Clone)]
pub struct FieldProjector {
    indices: Vec<usize>,
    key_schema: Schema,
}

impl FieldProjector {
    pub fn new(
        input_schema: &Schema,
        group_set: &[usize],
        window_field: Option<usize>,
    ) -> Result<Self> {
        let indices: Vec<usize> = group_set
            .iter()
            .copied()
            .filter(|&idx| Some(idx) != window_field)
            .collect();
        let key_schema = input_schema.project(&indices)?;
        Ok(Self {
            indices,
            key_schema,
        })
    }

    /// Input positions that make up the key, in key order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn key_schema(&self) -> &Schema {
        &self.key_schema
    }

    /// Build the key record for `record`.
    ///
    /// Panics if `record` is shorter than a projected position; records are
    /// validated against the input schema before they get here.
    pub fn project(&self, record: &Record) -> Record {
        let values = self
            .indices
            .iter()
            .map(|&idx| record.value(idx).clone())
            .collect();
        match Record::new(&self.key_schema, values) {
            Ok(key) => key,
            Err(err) => panic!("record does not match the projector's input schema: {err}"),
        }
    }
}

/// Project `record` onto `indices` of `schema` without a prebuilt projector.
pub fn project(record: &Record, schema: &Schema, indices: &[usize]) -> Result<Record> {
    let key_schema = schema.project(indices)?;
    let values = indices
        .iter()
        .map(|&idx| {
            record
                .values()
                .get(idx)
                .cloned()
                .ok_or(Error::FieldIndexOutOfRange {
                    index: idx,
                    len: record.len(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Record::new(&key_schema, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, FieldType, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("k", FieldType::Int32),
            Field::new("t", FieldType::Timestamp),
            Field::new("v", FieldType::Int32),
        ])
    }

    fn record() -> Record {
        Record::new(
            &schema(),
            vec![Value::Int32(5), Value::Timestamp(1_000), Value::Int32(7)],
        )
        .unwrap()
    }

    #[test]
    fn test_window_field_excluded_from_key() {
        let projector = FieldProjector::new(&schema(), &[0, 1], Some(1)).unwrap();
        assert_eq!(projector.indices(), &[0]);
        assert_eq!(projector.key_schema().len(), 1);
        assert_eq!(projector.project(&record()).values(), &[Value::Int32(5)]);
    }

    #[test]
    fn test_key_order_follows_group_set() {
        let projector = FieldProjector::new(&schema(), &[2, 0], None).unwrap();
        assert_eq!(
            projector.project(&record()).values(),
            &[Value::Int32(7), Value::Int32(5)]
        );
        assert_eq!(projector.key_schema().fields()[0].name, "v");
    }

    #[test]
    fn test_empty_group_set_gives_empty_key() {
        let projector = FieldProjector::new(&schema(), &[], None).unwrap();
        assert!(projector.project(&record()).is_empty());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let err = FieldProjector::new(&schema(), &[0, 9], None).unwrap_err();
        assert!(matches!(err, Error::FieldIndexOutOfRange { index: 9, len: 3 }));
    }

    #[test]
    fn test_free_project() {
        let key = project(&record(), &schema(), &[1]).unwrap();
        assert_eq!(key.values(), &[Value::Timestamp(1_000)]);
        assert!(project(&record(), &schema(), &[3]).is_err());
    }
}
