use super::*;

/// `SUM(x)` specialized by numeric kind.
///
/// Nulls are skipped and a group without any non-null input sums to `Null`.
/// Integer sums wrap on `i64` overflow. Decimal sums are exact and only
/// become `Null` when the total does not fit the output type. Float sums
/// follow IEEE addition and are therefore only order-independent up to
/// rounding.
#[derive(Debug, Clone)]
pub struct SumFn {
    kind: NumericKind,
    output_type: FieldType,
}

impl SumFn {
    pub fn new(kind: NumericKind, output_type: FieldType) -> Self {
        Self { kind, output_type }
    }
}

/// Running sum; `None` until the first non-null input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumAccumulator {
    pub sum: Option<Numeric>,
}

fn add_opt(a: Option<&Numeric>, b: Option<&Numeric>) -> Option<Numeric> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.add(b)),
        (a, b) => a.or(b).cloned(),
    }
}

impl CombineFn for SumFn {
    type Accumulator = SumAccumulator;

    fn name(&self) -> &str {
        "SUM"
    }

    fn create_accumulator(&self) -> SumAccumulator {
        SumAccumulator { sum: None }
    }

    fn add_input(&self, acc: &SumAccumulator, input: AggregateInput<'_>) -> SumAccumulator {
        let value = Numeric::from_value(input.single(), self.kind);
        SumAccumulator {
            sum: add_opt(acc.sum.as_ref(), value.as_ref()),
        }
    }

    fn merge_accumulators(&self, accs: &[&SumAccumulator]) -> SumAccumulator {
        let sum = accs
            .iter()
            .fold(None::<Numeric>, |total, acc| add_opt(total.as_ref(), acc.sum.as_ref()));
        SumAccumulator { sum }
    }

    fn extract_output(&self, acc: &SumAccumulator) -> Value {
        acc.sum
            .as_ref()
            .map_or(Value::Null, |sum| sum.to_value(self.output_type))
    }
}
