use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Event time in milliseconds since epoch.
pub type EventTime = i64;

/// Type of a single field in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Int32,
    Int64,
    Float64,
    Decimal,
    String,
    Timestamp,
}

impl FieldType {
    /// Return true for types the numeric aggregates accept.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Int64 | FieldType::Float64 | FieldType::Decimal
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::Int32 => "INT32",
            FieldType::Int64 => "INT64",
            FieldType::Float64 => "FLOAT64",
            FieldType::Decimal => "DECIMAL",
            FieldType::String => "STRING",
            FieldType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

/// A single typed value. `Null` conforms to every [`FieldType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    Timestamp(EventTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type of this value, or `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(FieldType::Boolean),
            Value::Int32(_) => Some(FieldType::Int32),
            Value::Int64(_) => Some(FieldType::Int64),
            Value::Float64(_) => Some(FieldType::Float64),
            Value::Decimal(_) => Some(FieldType::Decimal),
            Value::String(_) => Some(FieldType::String),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
        }
    }

    /// Return true if this value may be stored in a field of type `ty`.
    pub fn conforms_to(&self, ty: FieldType) -> bool {
        self.field_type().is_none_or(|own| own == ty)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<EventTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Compare two non-null values of the same type.
    ///
    /// Floats use IEEE total ordering so that `NaN` has a stable position.
    /// Returns `None` for nulls and for values of different types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => Some(a.total_cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}ms"),
        }
    }
}

/// A named, typed column of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered list of fields. Field order defines positional addressing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(Error::FieldIndexOutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the sub-schema made of `indices`, in the given order.
    pub fn project(&self, indices: &[usize]) -> Result<Schema> {
        let fields = indices
            .iter()
            .map(|&i| self.field(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An immutable row of values conforming to a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Build a record, checking arity and per-position type compatibility.
    pub fn new(schema: &Schema, values: Vec<Value>) -> Result<Self> {
        let record = Self { values };
        record.validate(schema)?;
        Ok(record)
    }

    /// Check that this record still fits `schema`, as [`Record::new`] does.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.values.len() != schema.len() {
            return Err(Error::SchemaMismatch(format!(
                "record has {} values but schema has {} fields",
                self.values.len(),
                schema.len()
            )));
        }
        for (value, field) in self.values.iter().zip(schema.fields()) {
            if !value.conforms_to(field.field_type) {
                return Err(Error::SchemaMismatch(format!(
                    "field '{}' expects {} but got {value:?}",
                    field.name, field.field_type
                )));
            }
        }
        Ok(())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at `index`. Panics if the index is out of range.
    pub fn value(&self, index: usize) -> &Value {
        &self.values[index]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("}")
    }
}
