use super::*;

/// `AVG(x)` specialized by numeric kind.
///
/// Keeps `(sum, count)` over non-null inputs. An empty group averages to
/// `Null` (no division by zero). Integer averages truncate toward zero.
#[derive(Debug, Clone)]
pub struct AvgFn {
    kind: NumericKind,
    output_type: FieldType,
}

impl AvgFn {
    pub fn new(kind: NumericKind, output_type: FieldType) -> Self {
        Self { kind, output_type }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvgAccumulator {
    pub sum: Numeric,
    pub count: i64,
}

impl CombineFn for AvgFn {
    type Accumulator = AvgAccumulator;

    fn name(&self) -> &str {
        "AVG"
    }

    fn create_accumulator(&self) -> AvgAccumulator {
        AvgAccumulator {
            sum: Numeric::zero(self.kind),
            count: 0,
        }
    }

    fn add_input(&self, acc: &AvgAccumulator, input: AggregateInput<'_>) -> AvgAccumulator {
        match Numeric::from_value(input.single(), self.kind) {
            Some(value) => AvgAccumulator {
                sum: acc.sum.add(&value),
                count: acc.count + 1,
            },
            None => acc.clone(),
        }
    }

    fn merge_accumulators(&self, accs: &[&AvgAccumulator]) -> AvgAccumulator {
        accs.iter().fold(self.create_accumulator(), |total, acc| AvgAccumulator {
            sum: total.sum.add(&acc.sum),
            count: total.count + acc.count,
        })
    }

    fn extract_output(&self, acc: &AvgAccumulator) -> Value {
        if acc.count == 0 {
            return Value::Null;
        }
        let avg = match &acc.sum {
            Numeric::Integer(sum) => Numeric::Integer(sum / acc.count),
            Numeric::Float(sum) => Numeric::Float(sum / acc.count as f64),
            Numeric::Decimal(sum) => {
                return quotient_into_value(sum, &ExactDecimal::from(acc.count), self.output_type);
            }
        };
        avg.to_value(self.output_type)
    }
}
