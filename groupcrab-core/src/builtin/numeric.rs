use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::*;

/// Numeric family an aggregate is specialized for.
///
/// Integer and decimal accumulators merge exactly; float accumulators follow
/// IEEE addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Integer,
    Float,
    Decimal,
}

impl NumericKind {
    /// Numeric kind of a source field type, `None` for non-numeric types.
    pub fn of(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Int32 | FieldType::Int64 => Some(NumericKind::Integer),
            FieldType::Float64 => Some(NumericKind::Float),
            FieldType::Decimal => Some(NumericKind::Decimal),
            _ => None,
        }
    }
}

/// A number tagged with its [`NumericKind`].
///
/// Decimals are held unbounded, so decimal sums never saturate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
    Decimal(ExactDecimal),
}

impl Numeric {
    pub fn zero(kind: NumericKind) -> Self {
        match kind {
            NumericKind::Integer => Numeric::Integer(0),
            NumericKind::Float => Numeric::Float(0.0),
            NumericKind::Decimal => Numeric::Decimal(ExactDecimal::default()),
        }
    }

    /// Read `value` as a number of `kind`. Nulls and non-numeric values yield `None`.
    pub fn from_value(value: &Value, kind: NumericKind) -> Option<Self> {
        match (kind, value) {
            (NumericKind::Integer, v) => v.as_i64().map(Numeric::Integer),
            (NumericKind::Float, v) => v.as_f64().map(Numeric::Float),
            (NumericKind::Decimal, Value::Decimal(d)) => {
                Some(Numeric::Decimal(ExactDecimal::from(*d)))
            }
            (NumericKind::Decimal, v) => v
                .as_i64()
                .map(|i| Numeric::Decimal(ExactDecimal::from(i))),
        }
    }

    /// Add two numbers of the same kind.
    ///
    /// Integers wrap on overflow, decimals are exact.
    pub fn add(&self, other: &Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Numeric::Integer(a.wrapping_add(*b)),
            (Numeric::Float(a), Numeric::Float(b)) => Numeric::Float(a + b),
            (Numeric::Decimal(a), Numeric::Decimal(b)) => Numeric::Decimal(a + b),
            (a, b) => panic!("numeric kind mismatch: {a:?} + {b:?}"),
        }
    }

    /// Exact decimal form. Non-finite floats have none.
    pub fn to_exact(&self) -> Option<ExactDecimal> {
        match self {
            Numeric::Integer(i) => Some(ExactDecimal::from(*i)),
            Numeric::Float(f) => ExactDecimal::from_f64(*f),
            Numeric::Decimal(d) => Some(d.clone()),
        }
    }

    /// Render as a value of the declared output type.
    ///
    /// Integer targets truncate toward zero; out-of-range results become `Null`.
    /// A non-numeric target keeps the number's natural type.
    pub fn to_value(&self, target: FieldType) -> Value {
        match (self, target) {
            (Numeric::Integer(i), FieldType::Int32) => {
                i32::try_from(*i).map_or(Value::Null, Value::Int32)
            }
            (Numeric::Integer(i), FieldType::Float64) => Value::Float64(*i as f64),
            (Numeric::Integer(i), FieldType::Decimal) => Value::Decimal(Decimal::from(*i)),
            (Numeric::Integer(i), _) => Value::Int64(*i),
            (Numeric::Float(f), FieldType::Int32) => f.to_i32().map_or(Value::Null, Value::Int32),
            (Numeric::Float(f), FieldType::Int64) => f.to_i64().map_or(Value::Null, Value::Int64),
            (Numeric::Float(f), FieldType::Decimal) => {
                Decimal::from_f64(*f).map_or(Value::Null, Value::Decimal)
            }
            (Numeric::Float(f), _) => Value::Float64(*f),
            (Numeric::Decimal(d), target) => d.to_value(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of() {
        assert_eq!(NumericKind::of(FieldType::Int32), Some(NumericKind::Integer));
        assert_eq!(NumericKind::of(FieldType::Float64), Some(NumericKind::Float));
        assert_eq!(NumericKind::of(FieldType::Decimal), Some(NumericKind::Decimal));
        assert_eq!(NumericKind::of(FieldType::String), None);
    }

    #[test]
    fn test_integer_add_wraps() {
        let sum = Numeric::Integer(i64::MAX).add(&Numeric::Integer(1));
        assert_eq!(sum, Numeric::Integer(i64::MIN));
    }

    #[test]
    fn test_decimal_add_does_not_saturate() {
        let max = Numeric::from_value(&Value::Decimal(Decimal::MAX), NumericKind::Decimal).unwrap();
        let one = Numeric::from_value(&Value::Decimal(Decimal::ONE), NumericKind::Decimal).unwrap();
        let minus_one = Numeric::from_value(&Value::Int64(-1), NumericKind::Decimal).unwrap();
        let overflowed = max.add(&one);
        assert_eq!(overflowed.to_value(FieldType::Decimal), Value::Null);
        assert_eq!(
            overflowed.add(&minus_one).to_value(FieldType::Decimal),
            Value::Decimal(Decimal::MAX)
        );
    }

    #[test]
    fn test_to_value_targets() {
        assert_eq!(Numeric::Integer(6).to_value(FieldType::Int32), Value::Int32(6));
        assert_eq!(Numeric::Integer(6).to_value(FieldType::Float64), Value::Float64(6.0));
        assert_eq!(Numeric::Integer(i64::MAX).to_value(FieldType::Int32), Value::Null);
        assert_eq!(Numeric::Float(2.9).to_value(FieldType::Int64), Value::Int64(2));
        assert_eq!(
            Numeric::Decimal(ExactDecimal::from(Decimal::new(150, 2))).to_value(FieldType::Decimal),
            Value::Decimal(Decimal::new(15, 1))
        );
    }

    #[test]
    fn test_from_value_skips_null() {
        assert_eq!(Numeric::from_value(&Value::Null, NumericKind::Integer), None);
        assert_eq!(
            Numeric::from_value(&Value::Int32(3), NumericKind::Decimal),
            Some(Numeric::Decimal(ExactDecimal::from(3i64)))
        );
    }
}
