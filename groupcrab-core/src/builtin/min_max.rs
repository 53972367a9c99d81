use super::*;

/// Which extremum a [`MinMaxFn`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extremum {
    Min,
    Max,
}

impl Extremum {
    fn keeps(self, ordering: Ordering) -> bool {
        match self {
            Extremum::Min => ordering == Ordering::Less,
            Extremum::Max => ordering == Ordering::Greater,
        }
    }
}

/// `MIN(x)` / `MAX(x)` over any orderable field type.
///
/// Nulls are skipped; an empty group yields `Null`. Floats are ordered with
/// IEEE total ordering, so a `NaN` input is the maximum.
#[derive(Debug, Clone)]
pub struct MinMaxFn {
    extremum: Extremum,
    output_type: FieldType,
}

impl MinMaxFn {
    pub fn min(output_type: FieldType) -> Self {
        Self {
            extremum: Extremum::Min,
            output_type,
        }
    }

    pub fn max(output_type: FieldType) -> Self {
        Self {
            extremum: Extremum::Max,
            output_type,
        }
    }

    /// Types MIN/MAX can order.
    pub fn accepts(field_type: FieldType) -> bool {
        field_type.is_numeric()
            || matches!(
                field_type,
                FieldType::String | FieldType::Timestamp | FieldType::Boolean
            )
    }

    fn pick(&self, current: &Option<Value>, candidate: &Value) -> Option<Value> {
        if candidate.is_null() {
            return current.clone();
        }
        match current {
            Some(existing) => {
                let replace = candidate
                    .compare(existing)
                    .is_some_and(|ord| self.extremum.keeps(ord));
                let kept = if replace { candidate } else { existing };
                Some(kept.clone())
            }
            None => Some(candidate.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxAccumulator {
    pub value: Option<Value>,
}

impl CombineFn for MinMaxFn {
    type Accumulator = MinMaxAccumulator;

    fn name(&self) -> &str {
        match self.extremum {
            Extremum::Min => "MIN",
            Extremum::Max => "MAX",
        }
    }

    fn create_accumulator(&self) -> MinMaxAccumulator {
        MinMaxAccumulator { value: None }
    }

    fn add_input(&self, acc: &MinMaxAccumulator, input: AggregateInput<'_>) -> MinMaxAccumulator {
        MinMaxAccumulator {
            value: self.pick(&acc.value, input.single()),
        }
    }

    fn merge_accumulators(&self, accs: &[&MinMaxAccumulator]) -> MinMaxAccumulator {
        let value = accs
            .iter()
            .filter_map(|acc| acc.value.as_ref())
            .fold(None, |best, candidate| self.pick(&best, candidate));
        MinMaxAccumulator { value }
    }

    fn extract_output(&self, acc: &MinMaxAccumulator) -> Value {
        match &acc.value {
            None => Value::Null,
            Some(value) if self.output_type.is_numeric() => {
                let kind = value.field_type().and_then(NumericKind::of);
                match kind.and_then(|kind| Numeric::from_value(value, kind)) {
                    Some(n) => n.to_value(self.output_type),
                    None => value.clone(),
                }
            }
            Some(value) => value.clone(),
        }
    }
}
