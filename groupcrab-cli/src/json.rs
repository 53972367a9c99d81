//! JSON rendering of records.
//!
//! A record is a JSON array of field values in schema order. Timestamps are
//! epoch milliseconds; decimals are accepted as strings or numbers and always
//! written as strings so no precision is lost.

use anyhow::{Context, Result, anyhow, bail};
use groupcrab_core::types::{Field, FieldType, Record, Schema, Value};
use rust_decimal::Decimal;
use serde_json::Value as Json;

pub fn value_from_json(json: &Json, field: &Field) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let mismatch = || anyhow!("field '{}' expects {}, got {json}", field.name, field.field_type);
    let value = match field.field_type {
        FieldType::Boolean => Value::Boolean(json.as_bool().ok_or_else(mismatch)?),
        FieldType::Int32 => {
            let v = json.as_i64().ok_or_else(mismatch)?;
            Value::Int32(i32::try_from(v).with_context(|| {
                format!("field '{}': {v} does not fit in INT32", field.name)
            })?)
        }
        FieldType::Int64 => Value::Int64(json.as_i64().ok_or_else(mismatch)?),
        FieldType::Float64 => Value::Float64(json.as_f64().ok_or_else(mismatch)?),
        FieldType::Decimal => {
            let text = match json {
                Json::String(s) => s.clone(),
                Json::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            let d = text
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .with_context(|| format!("field '{}': invalid decimal {text}", field.name))?;
            Value::Decimal(d)
        }
        FieldType::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        FieldType::Timestamp => Value::Timestamp(json.as_i64().ok_or_else(mismatch)?),
    };
    Ok(value)
}

pub fn record_from_json(json: &Json, schema: &Schema) -> Result<Record> {
    let Json::Array(items) = json else {
        bail!("expected a JSON array of field values, got {json}");
    };
    if items.len() != schema.len() {
        bail!(
            "record has {} values but the input schema has {} fields",
            items.len(),
            schema.len()
        );
    }
    let values = items
        .iter()
        .zip(schema.fields())
        .map(|(item, field)| value_from_json(item, field))
        .collect::<Result<Vec<_>>>()?;
    Ok(Record::new(schema, values)?)
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) | Value::Timestamp(v) => Json::from(*v),
        // Non-finite floats have no JSON form and become null.
        Value::Float64(v) => Json::from(*v),
        Value::Decimal(v) => Json::String(v.to_string()),
        Value::String(v) => Json::String(v.clone()),
    }
}

pub fn record_to_json(record: &Record) -> Json {
    Json::Array(record.values().iter().map(value_to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("k", FieldType::String),
            Field::new("t", FieldType::Timestamp),
            Field::new("d", FieldType::Decimal),
            Field::new("i", FieldType::Int32),
        ])
    }

    #[test]
    fn test_record_from_json() {
        let record = record_from_json(&json!(["a", 1000, "1.25", null]), &schema()).unwrap();
        assert_eq!(
            record.values(),
            &[
                Value::String("a".into()),
                Value::Timestamp(1000),
                Value::Decimal(Decimal::new(125, 2)),
                Value::Null
            ]
        );
    }

    #[test]
    fn test_decimal_from_number() {
        let field = Field::new("d", FieldType::Decimal);
        assert_eq!(
            value_from_json(&json!(2.5), &field).unwrap(),
            Value::Decimal(Decimal::new(25, 1))
        );
    }

    #[test]
    fn test_type_mismatch_rejected() {
        assert!(record_from_json(&json!([1, 1000, "1", 1]), &schema()).is_err());
        assert!(record_from_json(&json!(["a", 1000, "1", 3_000_000_000i64]), &schema()).is_err());
        assert!(record_from_json(&json!(["a", 1000]), &schema()).is_err());
        assert!(record_from_json(&json!({"k": "a"}), &schema()).is_err());
    }

    #[test]
    fn test_record_to_json() {
        let record = Record::new(
            &schema(),
            vec![
                Value::String("a".into()),
                Value::Timestamp(60_000),
                Value::Decimal(Decimal::new(15, 1)),
                Value::Null,
            ],
        )
        .unwrap();
        assert_eq!(record_to_json(&record), json!(["a", 60000, "1.5", null]));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(value_to_json(&Value::Float64(f64::NAN)), Json::Null);
    }
}
