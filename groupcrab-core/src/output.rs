//! Final record assembly.

use crate::error::{Error, Result};
use crate::types::{EventTime, Record, Schema, Value};

/// Joins a group key, its aggregate values and the window start into one
/// output record.
#[derive(Debug, Clone)]
pub struct OutputAssembler {
    output_schema: Schema,
    window_field_position: Option<usize>,
}

impl OutputAssembler {
    pub fn new(output_schema: Schema, window_field_position: Option<usize>) -> Self {
        Self {
            output_schema,
            window_field_position,
        }
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn window_field_position(&self) -> Option<usize> {
        self.window_field_position
    }

    /// Key values, then aggregate values, with the window start inserted at
    /// the window position when one is configured. A missing window start is
    /// written as `Null`.
    pub fn assemble(
        &self,
        key: &Record,
        aggregates: &Record,
        window_start: Option<EventTime>,
    ) -> Result<Record> {
        let mut values = Vec::with_capacity(key.len() + aggregates.len() + 1);
        values.extend_from_slice(key.values());
        values.extend_from_slice(aggregates.values());

        if let Some(position) = self.window_field_position {
            if position > values.len() {
                return Err(Error::FieldIndexOutOfRange {
                    index: position,
                    len: values.len(),
                });
            }
            let start = window_start.map_or(Value::Null, Value::Timestamp);
            values.insert(position, start);
        }

        Record::new(&self.output_schema, values)
    }
}
